//! Provider trait: a module of related registrations.
//!
//! Providers group the constructors, ready-made services and service
//! configs of one part of an application.
//!
//! # Examples
//! ```rust
//! use dalil_locator::prelude::*;
//! use dalil_locator::provider::ProviderRegistry;
//!
//! struct MailProvider;
//!
//! impl Provider for MailProvider {
//!     fn register(&self, registry: &mut dyn ProviderRegistry) {
//!         registry.register_constructor("NewMailer", Constructor::variadic(|args| args.len()));
//!         registry.set_config("mailer", ServiceConfig::new("NewMailer", vec![]));
//!     }
//! }
//!
//! let mut locator = Locator::builder().provider(&MailProvider).build();
//! assert!(locator.get("mailer").is_ok());
//! ```
//!
//! Constructors can also be submitted from anywhere in the program and
//! picked up with
//! [`LocatorBuilder::with_submitted_constructors`](crate::locator::LocatorBuilder::with_submitted_constructors):
//!
//! ```rust,ignore
//! fn new_clock() -> Constructor {
//!     Constructor::nullary(SystemClock::default)
//! }
//!
//! dalil_locator::inventory::submit! {
//!     ConstructorSubmission::new("NewClock", new_clock)
//! }
//! ```

use crate::config::ServiceConfig;
use crate::registry::{Constructor, Registrant};

/// A module that registers related entries into a locator.
pub trait Provider {
    /// Register entries. Called once, when the locator is built.
    fn register(&self, registry: &mut dyn ProviderRegistry);

    /// Human-readable name for log messages.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Interface that providers register through.
///
/// Duplicates are reported by the implementation as warnings and the
/// existing entry is kept, so providers do not handle them.
pub trait ProviderRegistry {
    /// Register a constructor under `name`.
    fn register_constructor(&mut self, name: &str, constructor: Constructor);

    /// Register an already built service under `name`.
    fn register_service(&mut self, name: &str, service: Registrant);

    /// Add the config of service `name`.
    fn set_config(&mut self, name: &str, config: ServiceConfig);
}

/// A constructor registered at compile time with [`inventory::submit!`].
pub struct ConstructorSubmission {
    pub name: &'static str,
    pub make: fn() -> Constructor,
}

impl ConstructorSubmission {
    pub const fn new(name: &'static str, make: fn() -> Constructor) -> Self {
        Self { name, make }
    }
}

inventory::collect!(ConstructorSubmission);

/// All constructors submitted anywhere in the program.
pub fn submitted_constructors() -> impl Iterator<Item = &'static ConstructorSubmission> {
    inventory::iter::<ConstructorSubmission>.into_iter()
}
