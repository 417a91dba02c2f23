//! Core service locator implementation for Dalil.
//!
//! Services are described by configuration: a constructor name plus an
//! argument list, where `"%name%"` refers to another service. The
//! [`Locator`] builds each service on first request and caches it.

pub mod argument;
pub mod cache;
pub mod config;
pub mod error;
pub mod locator;
pub mod policy;
pub mod provider;
pub mod registry;
pub mod resolver;
pub mod source;

pub use argument::{Argument, Arguments, BoxError, Instance, instance};
pub use config::{ConfigError, ConfigSource, ServiceConfig, ServiceConfigMap};
pub use error::{LocatorError, Result};
pub use locator::{Locator, LocatorBuilder, prelude};
pub use policy::{FailureMode, Fault};
pub use provider::{ConstructorSubmission, Provider, ProviderRegistry};
pub use registry::{Constructor, Registrant, Signature, Slot, SlotKind};
pub use resolver::DependencyResolver;
pub use source::{FileSource, Format, InlineSource};

pub use inventory;
