//! Constructor registry: maps constructor names to callables.
//!
//! A [`Constructor`] is one of a closed set of shapes. The shape is
//! checked once, at registration, and invocation never inspects the
//! callable again.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::argument::{Arguments, BoxError, Instance};

type NullaryFn = Arc<dyn Fn() -> Instance + Send + Sync>;
type VariadicFn = Arc<dyn Fn(Arguments) -> Instance + Send + Sync>;
type FallibleFn = Arc<dyn Fn(Arguments) -> Result<Instance, BoxError> + Send + Sync>;
type DynamicFn = Arc<dyn Fn(Arguments) -> Vec<Slot> + Send + Sync>;

/// A callable that produces a service instance.
///
/// Cheap to clone: the locator clones a constructor out of the registry
/// before running it.
#[derive(Clone)]
pub enum Constructor {
    /// Takes no arguments.
    Nullary(NullaryFn),
    /// Takes the resolved argument list, cannot fail.
    Variadic(VariadicFn),
    /// Takes the resolved argument list, may report a failure.
    Fallible(FallibleFn),
    /// Result slots described at runtime, e.g. a constructor bridged in
    /// from a plugin host. Validated against `signature` on registration
    /// and on every call.
    Dynamic { signature: Signature, call: DynamicFn },
}

impl Constructor {
    /// A constructor that ignores its arguments.
    pub fn nullary<T, F>(f: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn() -> T + Send + Sync + 'static,
    {
        Constructor::Nullary(Arc::new(move || Arc::new(f()) as Instance))
    }

    /// A constructor receiving the resolved argument list.
    pub fn variadic<T, F>(f: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(Arguments) -> T + Send + Sync + 'static,
    {
        Constructor::Variadic(Arc::new(move |args| Arc::new(f(args)) as Instance))
    }

    /// A constructor receiving the resolved argument list that may fail.
    pub fn fallible<T, E, F>(f: F) -> Self
    where
        T: Send + Sync + 'static,
        E: Into<BoxError>,
        F: Fn(Arguments) -> Result<T, E> + Send + Sync + 'static,
    {
        Constructor::Fallible(Arc::new(move |args| {
            f(args).map(|value| Arc::new(value) as Instance).map_err(Into::into)
        }))
    }

    /// A constructor whose result slots are described by `signature`.
    pub fn dynamic<F>(signature: Signature, f: F) -> Self
    where
        F: Fn(Arguments) -> Vec<Slot> + Send + Sync + 'static,
    {
        Constructor::Dynamic { signature, call: Arc::new(f) }
    }

    /// Number of declared results: 1, or 2 when a failure slot follows.
    pub fn result_arity(&self) -> usize {
        match self {
            Constructor::Nullary(_) | Constructor::Variadic(_) => 1,
            Constructor::Fallible(_) => 2,
            Constructor::Dynamic { signature, .. } => signature.len(),
        }
    }

    /// Checks the declared result shape.
    ///
    /// The typed shapes are valid by construction. A dynamic signature
    /// must be `[Value]` or `[Value, Failure]`.
    pub fn validate(&self) -> Result<(), String> {
        match self {
            Constructor::Dynamic { signature, .. } => signature.validate(),
            _ => Ok(()),
        }
    }

    /// Calls the constructor.
    pub(crate) fn invoke(&self, arguments: Arguments) -> Result<Instance, InvokeError> {
        match self {
            Constructor::Nullary(f) => Ok(f()),
            Constructor::Variadic(f) => Ok(f(arguments)),
            Constructor::Fallible(f) => f(arguments).map_err(InvokeError::Reported),
            Constructor::Dynamic { signature, call } => signature.unpack(call(arguments)),
        }
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constructor::Nullary(_) => write!(f, "Constructor::Nullary"),
            Constructor::Variadic(_) => write!(f, "Constructor::Variadic"),
            Constructor::Fallible(_) => write!(f, "Constructor::Fallible"),
            Constructor::Dynamic { signature, .. } => {
                write!(f, "Constructor::Dynamic({signature})")
            }
        }
    }
}

/// Why an invocation did not produce an instance.
#[derive(Debug)]
pub(crate) enum InvokeError {
    /// The constructor returned a failure.
    Reported(BoxError),
    /// The results did not fit the declared signature.
    Shape { expected: String, found: String },
}

/// Kind of a declared result slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Value,
    Failure,
}

/// One result produced by a dynamic constructor. `None` is the nil value.
pub enum Slot {
    Value(Option<Instance>),
    Failure(Option<BoxError>),
}

impl Slot {
    fn kind(&self) -> SlotKind {
        match self {
            Slot::Value(_) => SlotKind::Value,
            Slot::Failure(_) => SlotKind::Failure,
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Slot::Value(Some(_)) => "value",
            Slot::Value(None) => "nil value",
            Slot::Failure(Some(_)) => "failure",
            Slot::Failure(None) => "nil failure",
        }
    }
}

impl fmt::Debug for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.describe())
    }
}

/// Declared result slots of a dynamic constructor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature(Vec<SlotKind>);

impl Signature {
    pub fn new(slots: impl Into<Vec<SlotKind>>) -> Self {
        Self(slots.into())
    }

    /// `[Value]`
    pub fn value() -> Self {
        Self(vec![SlotKind::Value])
    }

    /// `[Value, Failure]`
    pub fn fallible() -> Self {
        Self(vec![SlotKind::Value, SlotKind::Failure])
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn slots(&self) -> &[SlotKind] {
        &self.0
    }

    fn validate(&self) -> Result<(), String> {
        match self.0.as_slice() {
            [SlotKind::Value] | [SlotKind::Value, SlotKind::Failure] => Ok(()),
            [] | [_, _, _, ..] => Err(format!(
                "a constructor returns 1 or 2 results, this one declares {}",
                self.0.len()
            )),
            [SlotKind::Value, SlotKind::Value] => {
                Err("the second result must be a failure indicator".to_string())
            }
            _ => Err("the first result must be the service value".to_string()),
        }
    }

    fn unpack(&self, results: Vec<Slot>) -> Result<Instance, InvokeError> {
        let found = format!("{results:?}");
        let fits = results.len() == self.0.len()
            && results.iter().zip(&self.0).all(|(slot, kind)| slot.kind() == *kind);
        if !fits {
            return Err(self.shape_error(found));
        }

        let mut results = results.into_iter();
        let value = results.next();
        if let Some(Slot::Failure(Some(error))) = results.next() {
            return Err(InvokeError::Reported(error));
        }

        match value {
            Some(Slot::Value(Some(instance))) => Ok(instance),
            _ => Err(self.shape_error(found)),
        }
    }

    fn shape_error(&self, found: String) -> InvokeError {
        InvokeError::Shape { expected: self.to_string(), found }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kinds: Vec<&str> = self
            .0
            .iter()
            .map(|kind| match kind {
                SlotKind::Value => "value",
                SlotKind::Failure => "failure",
            })
            .collect();
        write!(f, "[{}]", kinds.join(", "))
    }
}

/// What a name is registered as.
///
/// Anything that is not a [`Constructor`] is stored directly as a built
/// service, bypassing construction.
#[derive(Debug, Clone)]
pub enum Registrant {
    Constructor(Constructor),
    Service(Instance),
}

impl Registrant {
    /// Registers `value` as an already built service.
    pub fn service<T: Send + Sync + 'static>(value: T) -> Self {
        Registrant::Service(Arc::new(value))
    }
}

impl From<Constructor> for Registrant {
    fn from(constructor: Constructor) -> Self {
        Registrant::Constructor(constructor)
    }
}

impl From<Instance> for Registrant {
    fn from(instance: Instance) -> Self {
        Registrant::Service(instance)
    }
}

/// Stores registered constructors by name.
#[derive(Debug, Default)]
pub(crate) struct ConstructorRegistry {
    constructors: HashMap<String, Constructor>,
}

impl ConstructorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a validated constructor. The caller checks for duplicates.
    pub fn insert(&mut self, name: String, constructor: Constructor) {
        debug!(constructor = %name, arity = constructor.result_arity(), "Registered constructor");
        self.constructors.insert(name, constructor);
    }

    pub fn get(&self, name: &str) -> Option<&Constructor> {
        trace!(constructor = %name, "Looking up constructor");
        self.constructors.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.constructors.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }
}
