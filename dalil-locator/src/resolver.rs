//! Dependency resolver: turns configured arguments into constructor
//! arguments.
//!
//! An argument that is *exactly* `%name%` is a reference to service
//! `name` and is replaced by that service's instance. Everything else,
//! including strings that merely contain `%name%`, is passed through
//! untouched.
//!
//! ```text
//! ["%db%", "users", 25]  ──resolve──>  [Service(db), Literal("users"), Literal(25)]
//! ```

use regex::Regex;
use serde_json::Value;
use tracing::trace;

use crate::argument::{Argument, Arguments, Instance};
use crate::error::{LocatorError, Result};

/// Whole-string dependency reference: `%` ASCII word characters `%`.
pub const REFERENCE_PATTERN: &str = r"^%([0-9A-Za-z_]+)%$";

/// Something that can produce a service by name.
///
/// Implemented by the locator; the resolver calls back into it for
/// every reference it meets, which may recurse into further resolution.
pub trait ServiceLookup {
    fn lookup(&mut self, name: &str, required_by: &str) -> Result<Instance>;
}

/// Rewrites argument lists, substituting dependency references.
#[derive(Debug, Clone)]
pub struct DependencyResolver {
    pattern: Regex,
}

impl DependencyResolver {
    pub fn new() -> Self {
        Self {
            pattern: Regex::new(REFERENCE_PATTERN).expect("Invalid dependency reference pattern"),
        }
    }

    /// Returns the referenced service name if `value` is a reference.
    pub fn reference<'v>(&self, value: &'v Value) -> Option<&'v str> {
        let text = value.as_str().filter(|s| !s.is_empty())?;
        self.pattern
            .captures(text)
            .and_then(|captures| captures.get(1))
            .map(|name| name.as_str())
    }

    /// Referenced service names in `arguments`, in argument order.
    pub fn references<'v>(&self, arguments: &'v [Value]) -> Vec<&'v str> {
        arguments.iter().filter_map(|value| self.reference(value)).collect()
    }

    /// Resolves the arguments of `service`.
    ///
    /// Order is preserved. The first failing reference stops resolution
    /// and is returned wrapped in [`LocatorError::DependencyResolution`].
    pub fn resolve(
        &self,
        service: &str,
        arguments: &[Value],
        lookup: &mut dyn ServiceLookup,
    ) -> Result<Arguments> {
        arguments
            .iter()
            .map(|value| match self.reference(value) {
                Some(dependency) => {
                    trace!(service = %service, dependency = %dependency, "Resolving dependency reference");
                    lookup
                        .lookup(dependency, service)
                        .map(Argument::Service)
                        .map_err(|source| LocatorError::DependencyResolution {
                            service: service.to_string(),
                            dependency: dependency.to_string(),
                            source: Box::new(source),
                        })
                }
                None => Ok(Argument::Literal(value.clone())),
            })
            .collect()
    }
}

impl Default for DependencyResolver {
    fn default() -> Self {
        Self::new()
    }
}
