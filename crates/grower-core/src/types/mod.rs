//! # Core Type Definitions
//!
//! This module contains all core records for the Grower reducer:
//! - Facts (`Key`, `Value`, `ValuePair`)
//! - Handler descriptions (`HandlerName`, `Params`, `Condition`, `Handler`)
//! - Error types (`ExecutionFailure`, `GrowerError`)
//!
//! ## Determinism Guarantees
//!
//! All types in this module:
//! - Compare by value (two handlers with equal name, data and conditions are the same handler)
//! - Use integer values only (no floating-point)
//! - Use `BTreeMap`/`BTreeSet` so iteration order never depends on hashing

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

// =============================================================================
// KEYS & VALUES
// =============================================================================

/// Key of a fact in the scratch space.
///
/// Keys are integers or text and compare exactly: `Int(1) != Text("1")`, and
/// `"1"` and `"01"` are different keys. Human-readable formats carry keys
/// untagged, as `1` or `"name"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Key {
    /// Integer key.
    Int(i64),
    /// Text key.
    Text(String),
}

impl Key {
    /// Create a text key.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Key::Text(s.into())
    }

    /// Get the key as a string slice, if it is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Key::Text(s) => Some(s),
            Key::Int(_) => None,
        }
    }

    /// Get the key as an integer, if it is one.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Key::Int(i) => Some(*i),
            Key::Text(_) => None,
        }
    }
}

impl From<i64> for Key {
    fn from(i: i64) -> Self {
        Key::Int(i)
    }
}

impl From<i32> for Key {
    fn from(i: i32) -> Self {
        Key::Int(i64::from(i))
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Text(s)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(i) => write!(f, "{}", i),
            Key::Text(s) => f.write_str(s),
        }
    }
}

/// Value stored under a key.
///
/// Human-readable formats (JSON, TOML) carry values untagged, so `1`, `true`
/// and `"text"` map to the three variants. Binary formats carry an explicit tag.
/// No coercion happens between variants: `Int(1) != Text("1")`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Value {
    /// Signed integer.
    Int(i64),
    /// Boolean flag.
    Bool(bool),
    /// Free-form text.
    Text(String),
}

impl Value {
    /// Get the integer payload, if this is an `Int`.
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get the text payload, if this is a `Text`.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Get the boolean payload, if this is a `Bool`.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

// Bare integer literals default to i32.
impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(i) => write!(f, "{}", i),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Text(s) => write!(f, "{:?}", s),
        }
    }
}

/// Tagged wire form used by non-self-describing formats (postcard).
#[derive(Serialize)]
enum TaggedRef<'a> {
    Int(i64),
    Bool(bool),
    Text(&'a str),
}

#[derive(Deserialize)]
enum Tagged {
    Int(i64),
    Bool(bool),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Untagged {
    Int(i64),
    Bool(bool),
    Text(String),
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            match self {
                Value::Int(i) => serializer.serialize_i64(*i),
                Value::Bool(b) => serializer.serialize_bool(*b),
                Value::Text(s) => serializer.serialize_str(s),
            }
        } else {
            let tagged = match self {
                Value::Int(i) => TaggedRef::Int(*i),
                Value::Bool(b) => TaggedRef::Bool(*b),
                Value::Text(s) => TaggedRef::Text(s),
            };
            tagged.serialize(serializer)
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            Ok(match Untagged::deserialize(deserializer)? {
                Untagged::Int(i) => Value::Int(i),
                Untagged::Bool(b) => Value::Bool(b),
                Untagged::Text(s) => Value::Text(s),
            })
        } else {
            Ok(match Tagged::deserialize(deserializer)? {
                Tagged::Int(i) => Value::Int(i),
                Tagged::Bool(b) => Value::Bool(b),
                Tagged::Text(s) => Value::Text(s),
            })
        }
    }
}

#[derive(Serialize)]
enum KeyRef<'a> {
    Int(i64),
    Text(&'a str),
}

#[derive(Deserialize)]
enum TaggedKey {
    Int(i64),
    Text(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum UntaggedKey {
    Int(i64),
    Text(String),
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match (self, serializer.is_human_readable()) {
            (Key::Int(i), true) => serializer.serialize_i64(*i),
            (Key::Text(s), true) => serializer.serialize_str(s),
            (Key::Int(i), false) => KeyRef::Int(*i).serialize(serializer),
            (Key::Text(s), false) => KeyRef::Text(s).serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        if deserializer.is_human_readable() {
            Ok(match UntaggedKey::deserialize(deserializer)? {
                UntaggedKey::Int(i) => Key::Int(i),
                UntaggedKey::Text(s) => Key::Text(s),
            })
        } else {
            Ok(match TaggedKey::deserialize(deserializer)? {
                TaggedKey::Int(i) => Key::Int(i),
                TaggedKey::Text(s) => Key::Text(s),
            })
        }
    }
}

// =============================================================================
// VALUE PAIR
// =============================================================================

/// A ValuePair is a single key/value fact.
///
/// It is both the unit of pending change (`value_changes`) and the unit of
/// storage (`scratch_space`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValuePair {
    /// The key this fact is stored under.
    pub key: Key,
    /// The value of the fact.
    pub value: Value,
}

impl ValuePair {
    /// Create a new value pair.
    #[must_use]
    pub fn new(key: impl Into<Key>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

// =============================================================================
// HANDLER
// =============================================================================

/// Name under which an executor resolves a handler's logic.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HandlerName(pub String);

impl HandlerName {
    /// Create a new handler name.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for HandlerName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for HandlerName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for HandlerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Static parameters of a handler. Opaque to the reducer.
pub type Params = BTreeMap<String, Value>;

/// A trigger key a handler declares interest in.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Condition {
    /// The key whose change fires the handler.
    pub key: Key,
}

impl Condition {
    /// Create a new condition on a key.
    #[must_use]
    pub fn new(key: impl Into<Key>) -> Self {
        Self { key: key.into() }
    }
}

/// A Handler is a named, parameterized unit of work plus its trigger conditions.
///
/// A handler with no conditions is unconditional: it is relevant whenever any
/// change occurs.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Handler {
    /// Name the executor resolves.
    pub name: HandlerName,
    /// Static parameters passed to the executor.
    #[serde(default)]
    pub data: Params,
    /// Keys this handler is interested in.
    #[serde(default)]
    pub conditions: BTreeSet<Condition>,
}

impl Handler {
    /// Create an unconditional handler with no parameters.
    #[must_use]
    pub fn new(name: impl Into<HandlerName>) -> Self {
        Self {
            name: name.into(),
            data: Params::new(),
            conditions: BTreeSet::new(),
        }
    }

    /// Add a parameter.
    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(name.into(), value.into());
        self
    }

    /// Add a trigger condition on `key`.
    #[must_use]
    pub fn when(mut self, key: impl Into<Key>) -> Self {
        self.conditions.insert(Condition::new(key));
        self
    }

    /// Check if this handler has no declared conditions.
    #[must_use]
    pub fn is_unconditional(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Check if this handler declares interest in `key`.
    #[must_use]
    pub fn watches(&self, key: &Key) -> bool {
        self.conditions.iter().any(|c| &c.key == key)
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Failure of a single handler execution.
///
/// Returned by `Executor::execute` and surfaced unchanged by
/// `TransitionEngine::step`. A failed tick produces no new State.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionFailure {
    /// The executor has no implementation registered under this name.
    #[error("Unknown handler: {0}")]
    UnknownHandler(HandlerName),

    /// The handler's own logic failed.
    #[error("Handler '{handler}' failed: {reason}")]
    Handler {
        /// The failing handler.
        handler: HandlerName,
        /// What went wrong.
        reason: String,
    },

    /// The handler did not finish within the driver's time limit.
    #[error("Handler '{handler}' timed out after {timeout_ms} ms")]
    Timeout {
        /// The handler that was running.
        handler: HandlerName,
        /// The limit that elapsed.
        timeout_ms: u64,
    },
}

impl ExecutionFailure {
    /// Build a handler-logic failure.
    #[must_use]
    pub fn handler(handler: &HandlerName, reason: impl Into<String>) -> Self {
        Self::Handler {
            handler: handler.clone(),
            reason: reason.into(),
        }
    }
}

/// Errors that can occur in the Grower system.
///
/// - No silent failures
/// - Use `Result<T, GrowerError>` for fallible operations
/// - The reducer never panics; all errors are recoverable by the caller
#[derive(Debug, Error)]
pub enum GrowerError {
    /// A tick failed while executing a handler.
    #[error(transparent)]
    Execution(#[from] ExecutionFailure),

    /// The State violates a structural invariant.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// The same tick failed more times in a row than the retry budget allows.
    #[error("Gave up after {attempts} failed attempts: {source}")]
    RetriesExhausted {
        /// Consecutive failed attempts of the same tick.
        attempts: u32,
        /// The last failure.
        source: ExecutionFailure,
    },

    /// The run did not reach a terminal State within the tick budget.
    #[error("No fixed point after {0} ticks")]
    TickLimitExceeded(u64),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    ConfigError(String),
}

// =============================================================================
// TESTS
// =============================================================================
