//! Values flowing into and out of constructors.
//!
//! A built service is an [`Instance`]: a shared, type-erased value.
//! Constructors receive their configured arguments as a list of
//! [`Argument`]s, where every dependency reference has already been
//! replaced by the referenced service's instance.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

/// A built service, shared between everything that depends on it.
pub type Instance = Arc<dyn Any + Send + Sync>;

/// Error type constructors report failures with.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Positional argument list handed to a constructor.
pub type Arguments = Vec<Argument>;

/// Wraps a value into an [`Instance`].
#[inline]
pub fn instance<T: Send + Sync + 'static>(value: T) -> Instance {
    Arc::new(value)
}

/// One resolved constructor argument.
#[derive(Clone)]
pub enum Argument {
    /// A value taken verbatim from the service configuration.
    Literal(Value),
    /// The instance of a referenced service (`"%name%"` in configuration).
    Service(Instance),
}

impl Argument {
    /// Returns the literal value, if this argument is one.
    pub fn as_literal(&self) -> Option<&Value> {
        match self {
            Argument::Literal(value) => Some(value),
            Argument::Service(_) => None,
        }
    }

    /// Returns the literal string, if this argument is one.
    pub fn as_str(&self) -> Option<&str> {
        self.as_literal().and_then(Value::as_str)
    }

    /// Returns the service instance, if this argument is one.
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Argument::Service(instance) => Some(instance),
            Argument::Literal(_) => None,
        }
    }

    /// Returns the service instance downcast to `T`.
    ///
    /// `None` if this is a literal or the service is not a `T`.
    pub fn service<T: Send + Sync + 'static>(&self) -> Option<Arc<T>> {
        self.as_instance()
            .and_then(|instance| instance.clone().downcast::<T>().ok())
    }

    /// Returns `true` if both arguments are the same literal, or the very
    /// same service instance.
    pub fn same_as(&self, other: &Argument) -> bool {
        match (self, other) {
            (Argument::Literal(a), Argument::Literal(b)) => a == b,
            (Argument::Service(a), Argument::Service(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Value> for Argument {
    fn from(value: Value) -> Self {
        Argument::Literal(value)
    }
}

impl From<Instance> for Argument {
    fn from(instance: Instance) -> Self {
        Argument::Service(instance)
    }
}

impl fmt::Debug for Argument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Argument::Literal(value) => f.debug_tuple("Literal").field(value).finish(),
            Argument::Service(instance) => {
                write!(f, "Service({:p})", Arc::as_ptr(instance) as *const ())
            }
        }
    }
}
