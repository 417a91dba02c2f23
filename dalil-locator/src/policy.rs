//! Failure policy: what happens when an operation fails.
//!
//! - [`FailureMode::Lenient`]: the failure is logged and returned to the
//!   caller as an ordinary [`LocatorError`]
//! - [`FailureMode::Strict`]: the failure is logged as fatal and the
//!   current thread unwinds with a [`Fault`] payload
//!
//! Both modes share one path: every failure is created once, at the point
//! it happens, and handed to [`FailureMode::escalate`]. Wrapping it on
//! the way out of a recursive resolution never re-escalates.
//!
//! Duplicate-name notices are warnings and never pass through here.

use std::any::Any;
use std::fmt;
use std::panic;

use dalil_support::logging::Logger;

use crate::error::LocatorError;

/// How the locator reports failures.
///
/// # Examples
/// ```
/// use dalil_locator::policy::FailureMode;
///
/// assert_eq!(FailureMode::default(), FailureMode::Lenient);
/// assert!(FailureMode::from_strict(true).is_strict());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FailureMode {
    /// Failures are returned as values. Callers must check them.
    ///
    /// # When to use
    /// - Long-running processes that look up services on demand
    /// - Optional services the caller can do without
    #[default]
    Lenient,

    /// Failures halt the current operation as a hard fault.
    ///
    /// # When to use
    /// - Start-up wiring, where misconfiguration should stop the process
    Strict,
}

impl FailureMode {
    #[inline]
    pub fn from_strict(strict: bool) -> Self {
        if strict { FailureMode::Strict } else { FailureMode::Lenient }
    }

    #[inline]
    pub fn is_strict(&self) -> bool {
        matches!(self, FailureMode::Strict)
    }

    /// Reports `error` through `logger` and applies the mode.
    ///
    /// Lenient mode logs at error level and hands the error back.
    /// Strict mode logs at fatal level and never returns.
    pub fn escalate(&self, logger: &dyn Logger, error: LocatorError) -> LocatorError {
        match self {
            FailureMode::Lenient => {
                logger.error(&error.to_string());
                error
            }
            FailureMode::Strict => {
                logger.fatal(&error.to_string());
                panic::panic_any(Fault { error })
            }
        }
    }
}

impl fmt::Display for FailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureMode::Lenient => write!(f, "Lenient"),
            FailureMode::Strict => write!(f, "Strict"),
        }
    }
}

/// Panic payload of a strict-mode failure.
///
/// Recover it with [`std::panic::catch_unwind`] and [`Fault::from_panic`].
#[derive(Debug)]
pub struct Fault {
    pub error: LocatorError,
}

impl Fault {
    /// Extracts the fault from a caught panic payload.
    ///
    /// Hands the payload back unchanged if the panic was not a fault.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Result<Fault, Box<dyn Any + Send>> {
        payload.downcast::<Fault>().map(|fault| *fault)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Strict mode fault: {}", self.error)
    }
}
