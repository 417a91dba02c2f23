//! Error types for locator operations.
//!
//! Every failure names the service it happened in, and where it helps,
//! what the caller probably meant.

use std::fmt;
use std::sync::Arc;

use dalil_support::rendering::{render_chain, render_list};

use crate::argument::BoxError;
use crate::config::ConfigError;

/// Main error type for all locator operations.
#[derive(Debug, thiserror::Error)]
pub enum LocatorError {
    /// Name already denotes a constructor, a service or a config entry.
    #[error("{}", .0)]
    DuplicateName(DuplicateNameError),

    /// Constructor declares a result shape the locator cannot invoke.
    #[error("Invalid constructor shape for {name:?}: {reason}")]
    InvalidConstructorShape { name: String, reason: String },

    /// The configuration source could not be read or decoded.
    #[error("Failed to load service configuration: {source}")]
    ConfigLoad {
        #[source]
        source: Arc<ConfigError>,
    },

    /// Neither the cache nor the configuration knows the service.
    #[error("{}", .0)]
    NotRegistered(NotRegisteredError),

    /// The service's configured constructor was never registered.
    #[error(
        "Constructor {constructor:?} not found for service {service:?}\n  Hint: Register it with .register({constructor:?}, ...)"
    )]
    ConstructorNotFound { service: String, constructor: String },

    /// A dependency reference in the service's arguments failed to resolve.
    #[error("Failed to resolve dependency {dependency:?} of service {service:?}: {source}")]
    DependencyResolution {
        service: String,
        dependency: String,
        #[source]
        source: Box<LocatorError>,
    },

    /// The constructor itself reported a failure.
    #[error("Failed to construct service {service:?}: {source}")]
    Construction {
        service: String,
        #[source]
        source: BoxError,
    },

    /// A constructor produced results that do not match its signature.
    #[error("Constructor {constructor:?} of service {service:?} returned {found}, expected {expected}")]
    UnexpectedResultShape {
        service: String,
        constructor: String,
        expected: String,
        found: String,
    },

    /// The service exists but is not of the requested type.
    #[error("Service {service:?} is not a {expected}")]
    TypeMismatch { service: String, expected: String },
}

impl LocatorError {
    /// Follows nested dependency failures down to the one that started it.
    pub fn root_cause(&self) -> &LocatorError {
        let mut current = self;
        while let LocatorError::DependencyResolution { source, .. } = current {
            current = &**source;
        }
        current
    }

    /// Names of the services on the failing resolution path, outermost first.
    ///
    /// For `c` depending on `b` depending on a missing `a`, this is
    /// `["c", "b", "a"]`. Empty for errors that did not occur while
    /// resolving dependencies.
    pub fn dependency_chain(&self) -> Vec<&str> {
        let mut chain = Vec::new();
        let mut current = self;
        while let LocatorError::DependencyResolution {
            service,
            dependency,
            source,
        } = current
        {
            if chain.is_empty() {
                chain.push(service.as_str());
            }
            chain.push(dependency.as_str());
            current = &**source;
        }
        chain
    }

    /// The dependency chain rendered as `c → b → a`.
    pub fn render_dependency_chain(&self) -> String {
        render_chain(&self.dependency_chain())
    }

    /// Returns `true` for the warning-level duplicate notices.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, LocatorError::DuplicateName(_))
    }
}

/// What an already taken name currently denotes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameKind {
    Constructor,
    Service,
    Config,
}

impl fmt::Display for NameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameKind::Constructor => write!(f, "constructor"),
            NameKind::Service => write!(f, "service"),
            NameKind::Config => write!(f, "service config"),
        }
    }
}

/// Error when a name is registered a second time.
///
/// The first registration is always kept.
#[derive(Debug)]
pub struct DuplicateNameError {
    pub name: String,
    pub existing: NameKind,
}

impl fmt::Display for DuplicateNameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Name already registered as a {}: {:?}", self.existing, self.name)?;
        write!(f, "\n  The existing {} is kept", self.existing)
    }
}

/// Error when a requested service is neither built nor configured.
#[derive(Debug)]
pub struct NotRegisteredError {
    /// The service that was requested
    pub requested: String,
    /// The service whose arguments referenced it, if any
    pub required_by: Option<String>,
    /// Known names that look similar
    pub suggestions: Vec<String>,
}

impl fmt::Display for NotRegisteredError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Service not registered: {:?}", self.requested)?;

        if let Some(ref parent) = self.required_by {
            write!(f, "\n  Required by: {parent:?}")?;
        }

        if !self.suggestions.is_empty() {
            write!(f, "\n  Did you mean one of: {}", render_list(&self.suggestions))?;
        }

        write!(
            f,
            "\n  Hint: Add {:?} to the service configuration or register it directly",
            self.requested
        )
    }
}

/// Convenient Result type for locator operations.
pub type Result<T> = std::result::Result<T, LocatorError>;
