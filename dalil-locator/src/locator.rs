//! # The Locator
//!
//! Builds services on first request from their configuration, and hands
//! out the same instance on every later request.
//!
//! # Architecture
//! ```text
//! get(name) ──> cache hit? ──yes──> instance
//!                   │ no
//!                   ▼
//!             config lookup ──> constructor lookup ──> resolve arguments
//!                                                        │  (get() for every "%dep%")
//!                                                        ▼
//!                                        invoke ──> cache ──> instance
//! ```
//!
//! # Examples
//! ```rust
//! use dalil_locator::prelude::*;
//! use serde_json::json;
//!
//! struct Database {
//!     url: String,
//! }
//!
//! struct UserRepository {
//!     db: std::sync::Arc<Database>,
//!     table: String,
//! }
//!
//! let mut locator = Locator::new();
//! locator
//!     .register("NewDatabase", Constructor::variadic(|args: Arguments| Database {
//!         url: args[0].as_str().unwrap_or_default().to_string(),
//!     }))
//!     .unwrap();
//! locator
//!     .register("NewUserRepository", Constructor::variadic(|args: Arguments| UserRepository {
//!         db: args[0].service::<Database>().expect("database service"),
//!         table: args[1].as_str().unwrap_or("users").to_string(),
//!     }))
//!     .unwrap();
//! locator.set_config("db", "NewDatabase", vec![json!("postgres://localhost")]).unwrap();
//! locator.set_config("users", "NewUserRepository", vec![json!("%db%"), json!("users")]).unwrap();
//!
//! let users = locator.get_as::<UserRepository>("users").expect("Failed to resolve");
//! assert_eq!(users.db.url, "postgres://localhost");
//! assert_eq!(users.table, "users");
//! ```

use std::any::type_name;
use std::fmt;
use std::rc::Rc;
use std::sync::Arc;

use dalil_support::logging::{Logger, TracingLogger};
use dalil_support::rendering::{shorten_type_name, suggest_similar};
use serde_json::Value;
use tracing::{info, instrument};

use crate::argument::Instance;
use crate::cache::ServiceCache;
use crate::config::{ConfigSource, ConfigStore, ServiceConfig};
use crate::error::{DuplicateNameError, LocatorError, NameKind, NotRegisteredError, Result};
use crate::policy::FailureMode;
use crate::provider::{Provider, ProviderRegistry, submitted_constructors};
use crate::registry::{Constructor, ConstructorRegistry, InvokeError, Registrant};
use crate::resolver::{DependencyResolver, ServiceLookup};

const MAX_SUGGESTIONS: usize = 3;

// ═══════════════════════════════════════════
// Locator
// ═══════════════════════════════════════════

/// Lazily builds and caches named services.
///
/// Not thread-safe: wire services up front, then hand the built
/// instances (which are `Send + Sync`) to other threads.
pub struct Locator {
    registry: ConstructorRegistry,
    cache: ServiceCache,
    config: ConfigStore,
    resolver: Rc<DependencyResolver>,
    mode: FailureMode,
    logger: Box<dyn Logger>,
}

impl Locator {
    /// A locator with no configuration source, in lenient mode.
    ///
    /// Services are configured with [`Locator::set_config`].
    pub fn new() -> Self {
        Self::with_store(ConfigStore::empty())
    }

    /// A locator that loads its configuration from `source` on first use.
    pub fn with_source(source: impl ConfigSource + 'static) -> Self {
        Self::with_store(ConfigStore::from_source(Box::new(source)))
    }

    /// Create a new builder.
    pub fn builder() -> LocatorBuilder {
        LocatorBuilder::new()
    }

    fn with_store(config: ConfigStore) -> Self {
        Self {
            registry: ConstructorRegistry::new(),
            cache: ServiceCache::new(),
            config,
            resolver: Rc::new(DependencyResolver::new()),
            mode: FailureMode::default(),
            logger: Box::new(TracingLogger),
        }
    }

    // ── Settings ──

    /// Switches between strict (failures are hard faults) and lenient mode.
    pub fn set_strict_mode(&mut self, strict: bool) {
        self.mode = FailureMode::from_strict(strict);
    }

    pub fn failure_mode(&self) -> FailureMode {
        self.mode
    }

    /// Replaces the logger events are reported to.
    pub fn set_logger(&mut self, logger: impl Logger + 'static) {
        self.logger = Box::new(logger);
    }

    // ── Registration ──

    /// Registers a constructor, or an already built service.
    ///
    /// # Errors
    /// - [`LocatorError::DuplicateName`] if `name` already denotes a
    ///   constructor or a service. Logged as a warning, the existing entry
    ///   is kept, never a fault.
    /// - [`LocatorError::InvalidConstructorShape`] if a dynamic
    ///   constructor declares an unsupported signature.
    pub fn register(&mut self, name: impl Into<String>, entry: impl Into<Registrant>) -> Result<()> {
        let name = name.into();

        if self.registry.contains(&name) {
            return Err(self.duplicate(name, NameKind::Constructor));
        }
        if self.cache.contains(&name) {
            return Err(self.duplicate(name, NameKind::Service));
        }

        match entry.into() {
            Registrant::Service(instance) => {
                self.cache.insert(name, instance);
            }
            Registrant::Constructor(constructor) => {
                if let Err(reason) = constructor.validate() {
                    return Err(self.fail(LocatorError::InvalidConstructorShape { name, reason }));
                }
                self.registry.insert(name, constructor);
            }
        }
        Ok(())
    }

    /// Registers a constructor under `name`.
    pub fn register_constructor(&mut self, name: impl Into<String>, constructor: Constructor) -> Result<()> {
        self.register(name, constructor)
    }

    /// Registers `value` as the already built service `name`.
    pub fn register_service<T: Send + Sync + 'static>(&mut self, name: impl Into<String>, value: T) -> Result<()> {
        self.register(name, Registrant::service(value))
    }

    /// Adds the config of service `name`, loading the configuration first.
    ///
    /// # Errors
    /// - [`LocatorError::DuplicateName`] if `name` is already a built
    ///   service or already configured. Logged as a warning, nothing is
    ///   overwritten, never a fault.
    /// - [`LocatorError::ConfigLoad`] if the configuration cannot be loaded.
    pub fn set_config(
        &mut self,
        name: impl Into<String>,
        constructor: impl Into<String>,
        arguments: Vec<Value>,
    ) -> Result<()> {
        self.insert_config(name.into(), ServiceConfig::new(constructor, arguments))
    }

    fn insert_config(&mut self, name: String, config: ServiceConfig) -> Result<()> {
        if self.cache.contains(&name) {
            return Err(self.duplicate(name, NameKind::Service));
        }

        match self.config.insert_new(name.clone(), config) {
            Ok(true) => Ok(()),
            Ok(false) => Err(self.duplicate(name, NameKind::Config)),
            Err(source) => Err(self.fail(LocatorError::ConfigLoad { source })),
        }
    }

    // ── Resolution ──

    /// Returns the service `name`, building it and its dependencies on
    /// first request.
    ///
    /// Every later call returns the same instance.
    ///
    /// # Errors
    /// In lenient mode every failure is returned here, however deep in the
    /// dependency graph it happened. In strict mode failures unwind with a
    /// [`Fault`](crate::policy::Fault) instead.
    ///
    /// A dependency cycle is not detected and recurses until the stack is
    /// exhausted.
    pub fn get(&mut self, name: &str) -> Result<Instance> {
        self.resolve_service(name, None)
    }

    /// Like [`Locator::get`], downcast to `T`.
    ///
    /// # Errors
    /// [`LocatorError::TypeMismatch`] if the service is not a `T`.
    pub fn get_as<T: Send + Sync + 'static>(&mut self, name: &str) -> Result<Arc<T>> {
        let instance = self.get(name)?;
        instance.downcast::<T>().map_err(|_| {
            self.fail(LocatorError::TypeMismatch {
                service: name.to_string(),
                expected: shorten_type_name(type_name::<T>()),
            })
        })
    }

    fn resolve_service(&mut self, name: &str, required_by: Option<&str>) -> Result<Instance> {
        self.logger.debug(&format!("Get service: {name}"));

        if let Some(instance) = self.cache.get(name) {
            return Ok(instance.clone());
        }

        let config = match self.config.lookup(name) {
            Ok(Some(config)) => config,
            Ok(None) => {
                let error = self.not_registered(name, required_by);
                return Err(self.fail(error));
            }
            Err(source) => return Err(self.fail(LocatorError::ConfigLoad { source })),
        };

        let Some(constructor) = self.registry.get(&config.constructor).cloned() else {
            return Err(self.fail(LocatorError::ConstructorNotFound {
                service: name.to_string(),
                constructor: config.constructor,
            }));
        };

        self.logger.debug(&format!("Build service: {name}"));

        let resolver = Rc::clone(&self.resolver);
        let arguments = resolver.resolve(name, &config.arguments, self)?;

        let instance = match constructor.invoke(arguments) {
            Ok(instance) => instance,
            Err(InvokeError::Reported(source)) => {
                return Err(self.fail(LocatorError::Construction {
                    service: name.to_string(),
                    source,
                }));
            }
            Err(InvokeError::Shape { expected, found }) => {
                return Err(self.fail(LocatorError::UnexpectedResultShape {
                    service: name.to_string(),
                    constructor: config.constructor,
                    expected,
                    found,
                }));
            }
        };

        let instance = self.cache.insert(name.to_string(), instance);
        self.logger.debug(&format!("Service ok: {name}"));
        Ok(instance)
    }

    // ── Introspection ──

    /// Returns `true` if `name` is built or configured.
    pub fn contains(&mut self, name: &str) -> Result<bool> {
        if self.cache.contains(name) {
            return Ok(true);
        }
        self.config
            .contains(name)
            .map_err(|source| self.fail(LocatorError::ConfigLoad { source }))
    }

    /// Returns `true` if `name` has been built or registered directly.
    pub fn is_built(&self, name: &str) -> bool {
        self.cache.contains(name)
    }

    /// Names of the services `name` references in its arguments, in order.
    ///
    /// Directly registered services have no dependencies.
    pub fn dependencies_of(&mut self, name: &str) -> Result<Vec<String>> {
        let config = match self.config.lookup(name) {
            Ok(config) => config,
            Err(source) => return Err(self.fail(LocatorError::ConfigLoad { source })),
        };

        match config {
            Some(config) => Ok(self
                .resolver
                .references(&config.arguments)
                .into_iter()
                .map(str::to_string)
                .collect()),
            None if self.cache.contains(name) => Ok(Vec::new()),
            None => {
                let error = self.not_registered(name, None);
                Err(self.fail(error))
            }
        }
    }

    // ── Internal ──

    fn fail(&self, error: LocatorError) -> LocatorError {
        self.mode.escalate(&*self.logger, error)
    }

    fn duplicate(&self, name: String, existing: NameKind) -> LocatorError {
        let error = LocatorError::DuplicateName(DuplicateNameError { name, existing });
        self.logger.warn(&error.to_string());
        error
    }

    fn not_registered(&self, name: &str, required_by: Option<&str>) -> LocatorError {
        let mut known = self.cache.names();
        known.extend(self.config.names());

        LocatorError::NotRegistered(NotRegisteredError {
            requested: name.to_string(),
            required_by: required_by.map(str::to_string),
            suggestions: suggest_similar(name, &known, MAX_SUGGESTIONS),
        })
    }
}

impl Default for Locator {
    fn default() -> Self {
        Self::new()
    }
}

impl ServiceLookup for Locator {
    fn lookup(&mut self, name: &str, required_by: &str) -> Result<Instance> {
        self.resolve_service(name, Some(required_by))
    }
}

// Providers register straight into a live locator
impl ProviderRegistry for Locator {
    fn register_constructor(&mut self, name: &str, constructor: Constructor) {
        let _ = self.register(name, constructor);
    }

    fn register_service(&mut self, name: &str, service: Registrant) {
        let _ = self.register(name, service);
    }

    fn set_config(&mut self, name: &str, config: ServiceConfig) {
        let _ = self.insert_config(name.to_string(), config);
    }
}

impl fmt::Debug for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Locator")
            .field("constructors", &self.registry.len())
            .field("built", &self.cache.len())
            .field("config_loaded", &self.config.is_loaded())
            .field("mode", &self.mode)
            .finish()
    }
}

// ============================================================
// LocatorBuilder
// ============================================================

enum Pending {
    Entry(String, Registrant),
    Config(String, ServiceConfig),
}

/// Builds a [`Locator`].
///
/// Registrations are replayed in order into the new locator, so they go
/// through the same duplicate checks and logging as direct calls.
///
/// # Examples
/// ```rust,ignore
/// let mut locator = Locator::builder()
///     .source(FileSource::new("services", Format::Yaml).add_search_path("config"))
///     .strict_mode(true)
///     .provider(&StorageProvider)
///     .with_submitted_constructors()
///     .build();
/// ```
pub struct LocatorBuilder {
    source: Option<Box<dyn ConfigSource>>,
    mode: FailureMode,
    logger: Option<Box<dyn Logger>>,
    pending: Vec<Pending>,
}

impl LocatorBuilder {
    fn new() -> Self {
        Self {
            source: None,
            mode: FailureMode::default(),
            logger: None,
            pending: Vec::new(),
        }
    }

    /// Load configuration from `source` on first use.
    pub fn source(mut self, source: impl ConfigSource + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn strict_mode(mut self, strict: bool) -> Self {
        self.mode = FailureMode::from_strict(strict);
        self
    }

    pub fn logger(mut self, logger: impl Logger + 'static) -> Self {
        self.logger = Some(Box::new(logger));
        self
    }

    pub fn constructor(mut self, name: impl Into<String>, constructor: Constructor) -> Self {
        self.pending.push(Pending::Entry(name.into(), Registrant::Constructor(constructor)));
        self
    }

    pub fn service<T: Send + Sync + 'static>(mut self, name: impl Into<String>, value: T) -> Self {
        self.pending.push(Pending::Entry(name.into(), Registrant::service(value)));
        self
    }

    pub fn config(mut self, name: impl Into<String>, config: ServiceConfig) -> Self {
        self.pending.push(Pending::Config(name.into(), config));
        self
    }

    /// Add a [`Provider`] module.
    pub fn provider(mut self, provider: &dyn Provider) -> Self {
        provider.register(&mut self);
        self
    }

    /// Register every [`ConstructorSubmission`](crate::provider::ConstructorSubmission)
    /// in the program.
    pub fn with_submitted_constructors(mut self) -> Self {
        for submission in submitted_constructors() {
            self.pending.push(Pending::Entry(
                submission.name.to_string(),
                Registrant::Constructor((submission.make)()),
            ));
        }
        self
    }

    #[instrument(skip(self), name = "locator_build")]
    pub fn build(self) -> Locator {
        let mut locator = match self.source {
            Some(source) => Locator::with_store(ConfigStore::from_source(source)),
            None => Locator::new(),
        };
        locator.mode = self.mode;
        if let Some(logger) = self.logger {
            locator.logger = logger;
        }

        info!(pending = self.pending.len(), mode = %locator.mode, "Building locator");
        for pending in self.pending {
            // Failures were reported by the locator itself
            let _ = match pending {
                Pending::Entry(name, entry) => locator.register(name, entry),
                Pending::Config(name, config) => locator.insert_config(name, config),
            };
        }

        locator
    }
}

impl ProviderRegistry for LocatorBuilder {
    fn register_constructor(&mut self, name: &str, constructor: Constructor) {
        self.pending.push(Pending::Entry(name.to_string(), Registrant::Constructor(constructor)));
    }

    fn register_service(&mut self, name: &str, service: Registrant) {
        self.pending.push(Pending::Entry(name.to_string(), service));
    }

    fn set_config(&mut self, name: &str, config: ServiceConfig) {
        self.pending.push(Pending::Config(name.to_string(), config));
    }
}

impl fmt::Debug for LocatorBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocatorBuilder")
            .field("source", &self.source.as_ref().map(|s| s.describe()))
            .field("mode", &self.mode)
            .field("pending", &self.pending.len())
            .finish()
    }
}

// ═══════════════════════════════════════════
// Prelude
// ═══════════════════════════════════════════

pub mod prelude {
    pub use super::{Locator, LocatorBuilder};
    pub use crate::argument::{Argument, Arguments, BoxError, Instance, instance};
    pub use crate::config::{ConfigSource, ServiceConfig, ServiceConfigMap};
    pub use crate::error::{LocatorError, Result};
    pub use crate::policy::{FailureMode, Fault};
    pub use crate::provider::{ConstructorSubmission, Provider};
    pub use crate::registry::{Constructor, Registrant, Signature, Slot, SlotKind};
    pub use crate::source::{FileSource, Format, InlineSource};
    pub use dalil_support::logging::Logger;
}

// ═══════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argument::{Argument, Arguments, instance};
    use crate::config::ServiceConfigMap;
    use crate::policy::Fault;
    use crate::registry::{Signature, Slot, SlotKind};
    use dalil_support::logging::{Level, MemoryLogger};
    use serde_json::json;
    use std::cell::Cell;
    use std::panic::{AssertUnwindSafe, catch_unwind};
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug, thiserror::Error)]
    #[error("database is down")]
    struct DatabaseDown;

    fn echo() -> Constructor {
        Constructor::variadic(|args: Arguments| args)
    }

    /// The a/b/c graph: b and c return their resolved arguments verbatim.
    fn abc_config() -> ServiceConfigMap {
        let mut map = ServiceConfigMap::new();
        map.insert("a".into(), ServiceConfig::new("NewA", vec![]));
        map.insert("b".into(), ServiceConfig::new("NewB", vec![json!("%a%"), json!("data_b")]));
        map.insert(
            "c".into(),
            ServiceConfig::new("NewC", vec![json!("%a%"), json!("%b%"), json!("data_c")]),
        );
        map
    }

    fn abc_locator() -> Locator {
        let mut locator = Locator::with_source(abc_config());
        locator.register("NewA", Constructor::nullary(|| "A")).unwrap();
        locator.register("NewB", echo()).unwrap();
        locator.register("NewC", echo()).unwrap();
        locator
    }

    fn logged(locator: &mut Locator) -> Arc<MemoryLogger> {
        let logger = Arc::new(MemoryLogger::new());
        locator.set_logger(logger.clone());
        logger
    }

    fn strict_fault<T: fmt::Debug>(f: impl FnOnce() -> T) -> LocatorError {
        let payload = catch_unwind(AssertUnwindSafe(f)).expect_err("expected a strict mode fault");
        Fault::from_panic(payload).expect("payload is a Fault").error
    }

    fn args_of(instance: &Instance) -> Arguments {
        instance.downcast_ref::<Arguments>().cloned().expect("instance is an argument list")
    }

    #[test]
    fn get_returns_same_instance() {
        let counter = Arc::new(AtomicU32::new(0));
        let mut locator = Locator::new();
        locator
            .register("NewCounter", Constructor::nullary({
                let counter = counter.clone();
                move || counter.fetch_add(1, Ordering::SeqCst)
            }))
            .unwrap();
        locator.set_config("counter", "NewCounter", vec![]).unwrap();

        let first = locator.get("counter").unwrap();
        let second = locator.get("counter").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
        assert!(locator.is_built("counter"));
    }

    #[test]
    fn resolves_reference_and_literal() {
        let mut locator = abc_locator();

        let a = locator.get("a").unwrap();
        let b = args_of(&locator.get("b").unwrap());

        assert_eq!(b.len(), 2);
        assert!(b[0].same_as(&Argument::Service(a)));
        assert_eq!(b[1].as_str(), Some("data_b"));
    }

    #[test]
    fn transitive_chain_end_to_end() {
        let mut locator = abc_locator();

        let c = args_of(&locator.get("c").unwrap());
        let a = locator.get("a").unwrap();
        let b = locator.get("b").unwrap();

        assert_eq!(c.len(), 3);
        assert!(c[0].same_as(&Argument::Service(a.clone())));
        assert!(c[1].same_as(&Argument::Service(b.clone())));
        assert_eq!(c[2].as_str(), Some("data_c"));
        assert_eq!(a.downcast_ref::<&str>(), Some(&"A"));

        // b was built with the very same a
        let b_args = args_of(&b);
        assert!(b_args[0].same_as(&Argument::Service(a)));
    }

    #[test]
    fn shared_dependency_built_once() {
        let builds = Arc::new(AtomicU32::new(0));
        let mut locator = Locator::with_source(abc_config());
        locator
            .register("NewA", Constructor::nullary({
                let builds = builds.clone();
                move || builds.fetch_add(1, Ordering::SeqCst)
            }))
            .unwrap();
        locator.register("NewB", echo()).unwrap();
        locator.register("NewC", echo()).unwrap();
        let logger = logged(&mut locator);

        locator.get("c").unwrap();

        assert_eq!(builds.load(Ordering::SeqCst), 1);
        assert_eq!(logger.messages(Level::Debug).iter().filter(|m| *m == "Build service: a").count(), 1);
        assert_eq!(logger.messages(Level::Debug).iter().filter(|m| *m == "Get service: a").count(), 2);
    }

    #[test]
    fn embedded_reference_is_literal() {
        let mut locator = abc_locator();
        locator
            .set_config("d", "NewB", vec![json!("prefix_%a%_suffix"), json!(""), json!(5)])
            .unwrap();

        let d = args_of(&locator.get("d").unwrap());
        assert_eq!(d[0].as_str(), Some("prefix_%a%_suffix"));
        assert_eq!(d[1].as_str(), Some(""));
        assert_eq!(d[2].as_literal(), Some(&json!(5)));
        assert!(!locator.is_built("a"));
    }

    #[test]
    fn debug_events_in_order() {
        let mut locator = abc_locator();
        let logger = logged(&mut locator);

        locator.get("a").unwrap();
        locator.get("a").unwrap();

        assert_eq!(
            logger.messages(Level::Debug),
            vec!["Get service: a", "Build service: a", "Service ok: a", "Get service: a"]
        );
    }

    // ── Missing constructor ──

    #[test]
    fn missing_constructor_lenient() {
        let mut locator = Locator::new();
        let logger = logged(&mut locator);
        locator.set_config("x", "Missing", vec![]).unwrap();

        let result = locator.get("x");
        match result {
            Err(LocatorError::ConstructorNotFound { service, constructor }) => {
                assert_eq!(service, "x");
                assert_eq!(constructor, "Missing");
            }
            other => panic!("Expected ConstructorNotFound, got: {other:?}"),
        }
        assert!(logger.contains(Level::Error, "Missing"));
        assert!(!locator.is_built("x"));
    }

    #[test]
    fn missing_constructor_strict() {
        let mut locator = Locator::new();
        let logger = logged(&mut locator);
        locator.set_config("x", "Missing", vec![]).unwrap();
        locator.set_strict_mode(true);

        let error = strict_fault(|| locator.get("x"));
        assert!(matches!(error, LocatorError::ConstructorNotFound { .. }));
        assert!(logger.contains(Level::Fatal, "Missing"));
    }

    // ── Missing config ──

    #[test]
    fn unregistered_service() {
        let mut locator = abc_locator();
        match locator.get("unregistered") {
            Err(LocatorError::NotRegistered(e)) => {
                assert_eq!(e.requested, "unregistered");
                assert!(e.required_by.is_none());
            }
            other => panic!("Expected NotRegistered, got: {other:?}"),
        }
    }

    #[test]
    fn unregistered_service_suggests_similar() {
        let mut locator = Locator::new();
        locator.register("NewMailer", echo()).unwrap();
        locator.set_config("mailer", "NewMailer", vec![]).unwrap();

        match locator.get("mailr") {
            Err(LocatorError::NotRegistered(e)) => assert_eq!(e.suggestions, vec!["mailer"]),
            other => panic!("Expected NotRegistered, got: {other:?}"),
        }
    }

    #[test]
    fn unregistered_service_strict() {
        let mut locator = Locator::new();
        locator.set_strict_mode(true);
        let error = strict_fault(|| locator.get("unregistered"));
        assert!(matches!(error, LocatorError::NotRegistered(_)));
    }

    // ── Constructor-reported failure ──

    fn failing_locator() -> Locator {
        let mut locator = Locator::new();
        locator
            .register("NewDb", Constructor::fallible(|_| Err::<(), _>(DatabaseDown)))
            .unwrap();
        locator.set_config("db", "NewDb", vec![]).unwrap();
        locator
    }

    #[test]
    fn constructor_failure_lenient() {
        let mut locator = failing_locator();

        let err = locator.get("db").unwrap_err();
        match &err {
            LocatorError::Construction { service, source } => {
                assert_eq!(service, "db");
                assert!(source.downcast_ref::<DatabaseDown>().is_some());
            }
            other => panic!("Expected Construction, got: {other:?}"),
        }
        assert!(err.to_string().contains("database is down"));
        assert!(!locator.is_built("db"));
    }

    #[test]
    fn constructor_failure_strict() {
        let mut locator = failing_locator();
        locator.set_strict_mode(true);

        let error = strict_fault(|| locator.get("db"));
        assert!(matches!(error, LocatorError::Construction { .. }));
    }

    #[test]
    fn failure_is_not_cached() {
        let attempts = Arc::new(AtomicU32::new(0));
        let mut locator = Locator::new();
        locator
            .register("NewFlaky", Constructor::fallible({
                let attempts = attempts.clone();
                move |_| match attempts.fetch_add(1, Ordering::SeqCst) {
                    0 => Err("first attempt fails"),
                    n => Ok(n),
                }
            }))
            .unwrap();
        locator.set_config("flaky", "NewFlaky", vec![]).unwrap();

        assert!(locator.get("flaky").is_err());
        assert_eq!(locator.get_as::<u32>("flaky").unwrap().as_ref(), &1);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    // ── Deep failures ──

    #[test]
    fn deep_failure_reaches_outer_caller() {
        let mut locator = Locator::new();
        locator.register("Echo", echo()).unwrap();
        locator.set_config("top", "Echo", vec![json!("%middle%")]).unwrap();
        locator.set_config("middle", "Echo", vec![json!("%bottom%")]).unwrap();
        locator.set_config("bottom", "Echo", vec![json!("%nowhere%")]).unwrap();
        let logger = logged(&mut locator);

        let err = locator.get("top").unwrap_err();

        assert_eq!(err.dependency_chain(), vec!["top", "middle", "bottom", "nowhere"]);
        match err.root_cause() {
            LocatorError::NotRegistered(e) => {
                assert_eq!(e.requested, "nowhere");
                assert_eq!(e.required_by.as_deref(), Some("bottom"));
            }
            other => panic!("Expected NotRegistered, got: {other:?}"),
        }
        // reported once, where it happened
        assert_eq!(logger.count(Level::Error), 1);
        assert!(!locator.is_built("top"));
    }

    #[test]
    fn deep_failure_strict_faults_with_origin() {
        let mut locator = Locator::new();
        locator.register("Echo", echo()).unwrap();
        locator
            .register("NewDb", Constructor::fallible(|_| Err::<(), _>(DatabaseDown)))
            .unwrap();
        locator.set_config("repo", "Echo", vec![json!("%db%")]).unwrap();
        locator.set_config("db", "NewDb", vec![]).unwrap();
        locator.set_strict_mode(true);

        let error = strict_fault(|| locator.get("repo"));
        assert!(matches!(error, LocatorError::Construction { ref service, .. } if service == "db"));
    }

    #[test]
    fn partial_graph_survives_failure() {
        let mut locator = Locator::new();
        locator.register("Echo", echo()).unwrap();
        locator.register("NewA", Constructor::nullary(|| "A")).unwrap();
        locator.set_config("a", "NewA", vec![]).unwrap();
        locator.set_config("broken", "Echo", vec![json!("%a%"), json!("%missing%")]).unwrap();

        assert!(locator.get("broken").is_err());
        // a was built before the failing reference and stays cached
        assert!(locator.is_built("a"));
    }

    // ── Registration ──

    #[test]
    fn duplicate_service_registration_keeps_first() {
        let mut locator = Locator::new();
        let logger = logged(&mut locator);

        locator.register_service("settings", String::from("first")).unwrap();
        let err = locator.register_service("settings", String::from("second")).unwrap_err();

        assert!(err.is_duplicate());
        assert!(logger.contains(Level::Warn, "settings"));
        assert_eq!(logger.count(Level::Error), 0);
        assert_eq!(locator.get_as::<String>("settings").unwrap().as_str(), "first");
    }

    #[test]
    fn duplicate_is_a_warning_in_strict_mode() {
        let mut locator = Locator::new();
        let logger = logged(&mut locator);
        locator.set_strict_mode(true);

        locator.register("NewA", Constructor::nullary(|| 1)).unwrap();
        let err = locator.register("NewA", Constructor::nullary(|| 2)).unwrap_err();

        assert!(matches!(
            err,
            LocatorError::DuplicateName(ref e) if e.existing == crate::error::NameKind::Constructor
        ));
        assert_eq!(logger.count(Level::Fatal), 0);
        assert_eq!(logger.count(Level::Warn), 1);
    }

    #[test]
    fn shortcut_service_bypasses_config() {
        let mut locator = Locator::new();
        locator.register("Echo", echo()).unwrap();
        locator.register("dsn", instance("postgres://localhost")).unwrap();
        locator.set_config("pool", "Echo", vec![json!("%dsn%")]).unwrap();

        let pool = args_of(&locator.get("pool").unwrap());
        assert_eq!(pool[0].service::<&str>().as_deref(), Some(&"postgres://localhost"));
        assert_eq!(locator.dependencies_of("dsn").unwrap(), Vec::<String>::new());
    }

    #[test]
    fn invalid_dynamic_shape_rejected() {
        let mut locator = Locator::new();
        let bad = Constructor::dynamic(Signature::new(vec![SlotKind::Value, SlotKind::Value]), |_| vec![]);

        let err = locator.register("Bad", bad).unwrap_err();
        assert!(matches!(err, LocatorError::InvalidConstructorShape { ref name, .. } if name == "Bad"));
        assert!(!locator.registry.contains("Bad"));
    }

    #[test]
    fn invalid_dynamic_shape_strict() {
        let mut locator = Locator::new();
        locator.set_strict_mode(true);
        let bad = Constructor::dynamic(Signature::new(Vec::<SlotKind>::new()), |_| Vec::new());

        let error = strict_fault(|| locator.register("Bad", bad));
        assert!(matches!(error, LocatorError::InvalidConstructorShape { .. }));
    }

    #[test]
    fn dynamic_constructor_results() {
        let mut locator = Locator::new();
        locator
            .register(
                "NewDyn",
                Constructor::dynamic(Signature::fallible(), |args: Arguments| match args.first().and_then(Argument::as_str) {
                    Some("ok") => vec![Slot::Value(Some(instance(1u8))), Slot::Failure(None)],
                    Some("fail") => vec![Slot::Value(None), Slot::Failure(Some("refused".into()))],
                    _ => vec![Slot::Value(None), Slot::Failure(None)],
                }),
            )
            .unwrap();
        locator.set_config("ok", "NewDyn", vec![json!("ok")]).unwrap();
        locator.set_config("fail", "NewDyn", vec![json!("fail")]).unwrap();
        locator.set_config("nil", "NewDyn", vec![]).unwrap();

        assert_eq!(*locator.get_as::<u8>("ok").unwrap(), 1);
        assert!(matches!(locator.get("fail"), Err(LocatorError::Construction { .. })));
        match locator.get("nil") {
            Err(LocatorError::UnexpectedResultShape { service, constructor, .. }) => {
                assert_eq!(service, "nil");
                assert_eq!(constructor, "NewDyn");
            }
            other => panic!("Expected UnexpectedResultShape, got: {other:?}"),
        }
    }

    #[test]
    fn dynamic_shape_strict() {
        let mut locator = Locator::new();
        let logger = logged(&mut locator);
        locator
            .register("NewHalf", Constructor::dynamic(Signature::value(), |_| vec![Slot::Value(None)]))
            .unwrap();
        locator.set_config("half", "NewHalf", vec![]).unwrap();
        locator.set_strict_mode(true);

        let error = strict_fault(|| locator.get("half"));
        match error {
            LocatorError::UnexpectedResultShape { service, constructor, .. } => {
                assert_eq!(service, "half");
                assert_eq!(constructor, "NewHalf");
            }
            other => panic!("Expected UnexpectedResultShape, got: {other:?}"),
        }
        assert_eq!(logger.count(Level::Fatal), 1);
        assert!(!locator.is_built("half"));
    }

    // ── Config ──

    #[test]
    fn set_config_does_not_overwrite() {
        let mut locator = abc_locator();
        let logger = logged(&mut locator);

        let err = locator.set_config("a", "NewB", vec![json!("other")]).unwrap_err();
        assert!(err.is_duplicate());
        assert!(logger.contains(Level::Warn, "\"a\""));

        let a = locator.get("a").unwrap();
        assert_eq!(a.downcast_ref::<&str>(), Some(&"A"));
    }

    #[test]
    fn set_config_rejects_live_service() {
        let mut locator = Locator::new();
        locator.register_service("clock", 0u64).unwrap();
        let err = locator.set_config("clock", "NewClock", vec![]).unwrap_err();
        assert!(matches!(err, LocatorError::DuplicateName(ref e) if e.existing == crate::error::NameKind::Service));
    }

    struct BrokenSource {
        loads: Rc<Cell<u32>>,
    }

    impl ConfigSource for BrokenSource {
        fn load(&self) -> std::result::Result<ServiceConfigMap, crate::config::ConfigError> {
            self.loads.set(self.loads.get() + 1);
            crate::source::Format::Json.decode("{broken", "broken.json")
        }
    }

    #[test]
    fn config_load_failure_lenient() {
        let loads = Rc::new(Cell::new(0));
        let mut locator = Locator::with_source(BrokenSource { loads: loads.clone() });
        locator.register_service("seeded", 1u8).unwrap();

        assert!(matches!(locator.get("a"), Err(LocatorError::ConfigLoad { .. })));
        assert!(matches!(locator.get("b"), Err(LocatorError::ConfigLoad { .. })));
        assert!(matches!(locator.set_config("c", "NewC", vec![]), Err(LocatorError::ConfigLoad { .. })));
        assert_eq!(loads.get(), 1);

        // cached services never need the config
        assert!(locator.get("seeded").is_ok());
    }

    #[test]
    fn config_load_failure_strict() {
        let mut locator = Locator::with_source(BrokenSource { loads: Rc::new(Cell::new(0)) });
        locator.set_strict_mode(true);

        let error = strict_fault(|| locator.get("a"));
        assert!(matches!(error, LocatorError::ConfigLoad { .. }));
    }

    #[test]
    fn config_loads_lazily() {
        let mut locator = abc_locator();
        assert!(!locator.config.is_loaded());
        assert!(locator.contains("c").unwrap());
        assert!(locator.config.is_loaded());
        assert!(!locator.contains("z").unwrap());
    }

    // ── Introspection ──

    #[test]
    fn dependencies_in_argument_order() {
        let mut locator = abc_locator();
        assert_eq!(locator.dependencies_of("c").unwrap(), vec!["a", "b"]);
        assert!(locator.dependencies_of("a").unwrap().is_empty());
        assert!(matches!(locator.dependencies_of("zz"), Err(LocatorError::NotRegistered(_))));
        assert!(!locator.is_built("c"));
    }

    #[test]
    fn get_as_type_mismatch() {
        let mut locator = abc_locator();
        match locator.get_as::<String>("a") {
            Err(LocatorError::TypeMismatch { service, expected }) => {
                assert_eq!(service, "a");
                assert_eq!(expected, "String");
            }
            other => panic!("Expected TypeMismatch, got: {other:?}"),
        }
    }

    #[test]
    fn get_as_type_mismatch_strict() {
        let mut locator = abc_locator();
        locator.set_strict_mode(true);

        let error = strict_fault(|| locator.get_as::<String>("a"));
        assert!(matches!(error, LocatorError::TypeMismatch { ref service, .. } if service == "a"));
        // the service itself was built fine
        assert!(locator.is_built("a"));
    }

    #[test]
    fn nullary_still_builds_its_references() {
        let mut locator = abc_locator();
        locator.register("NewReady", Constructor::nullary(|| true)).unwrap();
        locator.set_config("ready", "NewReady", vec![json!("%a%")]).unwrap();

        assert!(*locator.get_as::<bool>("ready").unwrap());
        assert!(locator.is_built("a"));
    }

    // ── Builder & providers ──

    struct EchoProvider;

    impl Provider for EchoProvider {
        fn register(&self, registry: &mut dyn ProviderRegistry) {
            registry.register_constructor("Echo", echo());
            registry.register_service("greeting", Registrant::service("hello"));
            registry.set_config("echoed", ServiceConfig::new("Echo", vec![json!("%greeting%")]));
        }
    }

    fn new_submitted_clock() -> Constructor {
        Constructor::nullary(|| 1_700_000_000u64)
    }

    inventory::submit! {
        crate::provider::ConstructorSubmission::new("NewLocatorTestClock", new_submitted_clock)
    }

    #[test]
    fn builder_applies_settings_and_providers() {
        let logger = Arc::new(MemoryLogger::new());
        let mut locator = Locator::builder()
            .logger(logger.clone())
            .strict_mode(false)
            .provider(&EchoProvider)
            .constructor("NewA", Constructor::nullary(|| "A"))
            .service("port", 8080u16)
            .config("a", ServiceConfig::new("NewA", vec![]))
            .build();

        let echoed = args_of(&locator.get("echoed").unwrap());
        assert_eq!(echoed[0].service::<&str>().as_deref(), Some(&"hello"));
        assert_eq!(*locator.get_as::<u16>("port").unwrap(), 8080);
        assert!(locator.get("a").is_ok());
        assert!(logger.contains(Level::Debug, "Service ok: echoed"));
        assert_eq!(locator.failure_mode(), FailureMode::Lenient);
    }

    #[test]
    fn builder_with_source_and_submissions() {
        let mut locator = Locator::builder()
            .source(abc_config())
            .with_submitted_constructors()
            .config("clock", ServiceConfig::new("NewLocatorTestClock", vec![]))
            .build();

        assert_eq!(*locator.get_as::<u64>("clock").unwrap(), 1_700_000_000);
        assert!(locator.contains("c").unwrap());
    }

    #[test]
    fn builder_duplicates_keep_first() {
        let logger = Arc::new(MemoryLogger::new());
        let mut locator = Locator::builder()
            .logger(logger.clone())
            .service("name", "first")
            .service("name", "second")
            .build();

        assert_eq!(*locator.get_as::<&str>("name").unwrap(), "first");
        assert_eq!(logger.count(Level::Warn), 1);
    }

    #[test]
    fn builder_strict_mode() {
        let mut locator = Locator::builder().strict_mode(true).build();
        assert!(locator.failure_mode().is_strict());

        let error = strict_fault(|| locator.get("anything"));
        assert!(matches!(error, LocatorError::NotRegistered(_)));
    }

    #[test]
    fn debug_display() {
        let mut locator = abc_locator();
        locator.get("a").unwrap();

        let debug = format!("{locator:?}");
        assert!(debug.contains("Locator"));
        assert!(debug.contains("constructors: 3"));
        assert!(debug.contains("built: 1"));

        let builder = format!("{:?}", Locator::builder().service("x", 1));
        assert!(builder.contains("pending: 1"));
    }
}
