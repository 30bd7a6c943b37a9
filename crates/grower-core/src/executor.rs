//! # Handler Executor
//!
//! The one seam through which outside logic enters the reducer.
//!
//! The engine never knows what a handler does. It hands the queue head and a
//! read-only view of the scratch space to an [`Executor`], and takes back
//! zero or more value changes or an [`ExecutionFailure`].
//!
//! Two implementations ship with the crate:
//! - [`HandlerRegistry`]: maps handler names to boxed functions
//! - [`FnExecutor`]: adapts a single closure, mostly for tests

use crate::{ExecutionFailure, Handler, HandlerName, Key, Params, Value, ValuePair};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

// =============================================================================
// EXECUTOR TRAIT
// =============================================================================

/// Executes one handler against the current scratch space.
///
/// An empty `Ok` is a valid success meaning "no change". Side effects beyond
/// the returned changes are the implementor's business, not the engine's.
pub trait Executor {
    /// Run `handler` against `snapshot`.
    fn execute(
        &self,
        handler: &Handler,
        snapshot: &[ValuePair],
    ) -> Result<Vec<ValuePair>, ExecutionFailure>;
}

impl<E: Executor + ?Sized> Executor for &E {
    fn execute(
        &self,
        handler: &Handler,
        snapshot: &[ValuePair],
    ) -> Result<Vec<ValuePair>, ExecutionFailure> {
        (**self).execute(handler, snapshot)
    }
}

impl<E: Executor + ?Sized> Executor for Box<E> {
    fn execute(
        &self,
        handler: &Handler,
        snapshot: &[ValuePair],
    ) -> Result<Vec<ValuePair>, ExecutionFailure> {
        (**self).execute(handler, snapshot)
    }
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
    fn execute(
        &self,
        handler: &Handler,
        snapshot: &[ValuePair],
    ) -> Result<Vec<ValuePair>, ExecutionFailure> {
        (**self).execute(handler, snapshot)
    }
}

/// Adapts a closure over the full handler record into an [`Executor`].
pub struct FnExecutor<F>(pub F);

impl<F> Executor for FnExecutor<F>
where
    F: Fn(&Handler, &[ValuePair]) -> Result<Vec<ValuePair>, ExecutionFailure>,
{
    fn execute(
        &self,
        handler: &Handler,
        snapshot: &[ValuePair],
    ) -> Result<Vec<ValuePair>, ExecutionFailure> {
        (self.0)(handler, snapshot)
    }
}

// =============================================================================
// SNAPSHOT VIEW
// =============================================================================

/// Read-only view of the scratch space handed to handler functions.
#[derive(Debug, Clone, Copy)]
pub struct Snapshot<'a> {
    pairs: &'a [ValuePair],
}

impl<'a> Snapshot<'a> {
    /// Wrap a scratch space slice.
    #[must_use]
    pub fn new(pairs: &'a [ValuePair]) -> Self {
        Self { pairs }
    }

    /// Current value of `key`, if present.
    #[must_use]
    pub fn get(&self, key: impl Into<Key>) -> Option<&'a Value> {
        let key = key.into();
        self.pairs
            .iter()
            .find(|pair| pair.key == key)
            .map(|pair| &pair.value)
    }

    /// Current value of `key`, or a message naming the missing key.
    pub fn require(&self, key: impl Into<Key>) -> Result<&'a Value, String> {
        let key = key.into();
        self.get(key.clone())
            .ok_or_else(|| format!("key '{}' is not in the scratch space", key))
    }

    /// Current integer value of `key`.
    pub fn require_int(&self, key: impl Into<Key>) -> Result<i64, String> {
        let key = key.into();
        let value = self.require(key.clone())?;
        value
            .as_int()
            .ok_or_else(|| format!("key '{}' holds {} which is not an integer", key, value))
    }
}

// =============================================================================
// HANDLER REGISTRY
// =============================================================================

/// Signature of a registered handler function.
///
/// Receives the handler's static `data` and the snapshot; an `Err` carries the
/// reason and becomes [`ExecutionFailure::Handler`].
pub type HandlerFn =
    dyn Fn(&Params, &Snapshot<'_>) -> Result<Vec<ValuePair>, String> + Send + Sync;

/// An [`Executor`] that resolves handlers by name.
#[derive(Default)]
pub struct HandlerRegistry {
    functions: BTreeMap<HandlerName, Box<HandlerFn>>,
}

impl HandlerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `function` under `name`, replacing any previous entry.
    #[must_use]
    pub fn register<F>(mut self, name: impl Into<HandlerName>, function: F) -> Self
    where
        F: Fn(&Params, &Snapshot<'_>) -> Result<Vec<ValuePair>, String> + Send + Sync + 'static,
    {
        self.functions.insert(name.into(), Box::new(function));
        self
    }

    /// Registered names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &HandlerName> {
        self.functions.keys()
    }

    /// Number of registered functions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.functions.len()
    }

    /// Check if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("names", &self.functions.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl Executor for HandlerRegistry {
    fn execute(
        &self,
        handler: &Handler,
        snapshot: &[ValuePair],
    ) -> Result<Vec<ValuePair>, ExecutionFailure> {
        let function = self
            .functions
            .get(&handler.name)
            .ok_or_else(|| ExecutionFailure::UnknownHandler(handler.name.clone()))?;

        function(&handler.data, &Snapshot::new(snapshot))
            .map_err(|reason| ExecutionFailure::handler(&handler.name, reason))
    }
}

/// Read a required key-valued parameter from handler data.
///
/// Parameters that name scratch-space keys hold the key itself: text for
/// text keys, an integer for integer keys.
pub fn param_key(data: &Params, name: &str) -> Result<Key, String> {
    match data.get(name) {
        Some(Value::Text(key)) => Ok(Key::new(key.as_str())),
        Some(Value::Int(key)) => Ok(Key::Int(*key)),
        Some(other) => Err(format!("parameter '{}' must be a key name, got {}", name, other)),
        None => Err(format!("missing parameter '{}'", name)),
    }
}

// =============================================================================
// TESTS
// =============================================================================
