//! # Dalil, a configuration-driven service locator for Rust
//!
//! Services are described by name in a configuration file: which
//! registered constructor builds them and with which arguments. An
//! argument written as `"%name%"` is replaced by the service `name`,
//! built first if needed. Every service is built once and then shared.
//!
//! ```rust
//! use dalil::prelude::*;
//! use serde_json::json;
//!
//! let mut config = ServiceConfigMap::new();
//! config.insert("greeting".into(), ServiceConfig::new("NewGreeting", vec![json!("hello")]));
//!
//! let mut locator = Locator::with_source(config);
//! locator
//!     .register("NewGreeting", Constructor::variadic(|args: Arguments| {
//!         args[0].as_str().unwrap_or_default().to_uppercase()
//!     }))
//!     .unwrap();
//!
//! assert_eq!(locator.get_as::<String>("greeting").unwrap().as_str(), "HELLO");
//! ```

pub use dalil_locator::*;
pub use dalil_support::*;
