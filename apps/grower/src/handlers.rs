//! # Built-in Handlers
//!
//! The handler functions the `grower` binary registers by default.
//!
//! | name       | data                          | effect                               |
//! |------------|-------------------------------|--------------------------------------|
//! | `random`   | `output`, `min`=0, `max`=100  | random int in `[min, max]`           |
//! | `subtract` | `left`, `right`, `output`     | `left - right`, checked              |
//! | `copy`     | `from`, `to`                  | copy one stored value to another key |
//! | `set`      | `key`, `value`                | write a literal value                |
//!
//! Key-valued parameters hold the key itself, as text or an integer.

use grower_core::{HandlerRegistry, Params, Snapshot, Value, ValuePair, param_key};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

const DEFAULT_RANDOM_MIN: i64 = 0;
const DEFAULT_RANDOM_MAX: i64 = 100;

/// Build the registry of built-in handlers.
///
/// With `seed`, the `random` handler is reproducible across runs.
#[must_use]
pub fn builtin_registry(seed: Option<u64>) -> HandlerRegistry {
    let rng = Mutex::new(match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    });

    HandlerRegistry::new()
        .register("copy", copy)
        .register("random", move |data, _| random(data, &rng))
        .register("set", set)
        .register("subtract", subtract)
}

fn random(data: &Params, rng: &Mutex<StdRng>) -> Result<Vec<ValuePair>, String> {
    let output = param_key(data, "output")?;
    let min = int_param(data, "min", DEFAULT_RANDOM_MIN)?;
    let max = int_param(data, "max", DEFAULT_RANDOM_MAX)?;
    if min > max {
        return Err(format!("empty range: min {} > max {}", min, max));
    }

    let mut rng = rng
        .lock()
        .map_err(|_| "random number generator is poisoned".to_string())?;
    let drawn = rng.gen_range(min..=max);
    Ok(vec![ValuePair::new(output, drawn)])
}

fn subtract(data: &Params, snapshot: &Snapshot<'_>) -> Result<Vec<ValuePair>, String> {
    let left = param_key(data, "left")?;
    let right = param_key(data, "right")?;
    let output = param_key(data, "output")?;

    let a = snapshot.require_int(left)?;
    let b = snapshot.require_int(right)?;
    let difference = a
        .checked_sub(b)
        .ok_or_else(|| format!("{} - {} overflows", a, b))?;

    Ok(vec![ValuePair::new(output, difference)])
}

fn copy(data: &Params, snapshot: &Snapshot<'_>) -> Result<Vec<ValuePair>, String> {
    let from = param_key(data, "from")?;
    let to = param_key(data, "to")?;
    let value = snapshot.require(from)?.clone();
    Ok(vec![ValuePair::new(to, value)])
}

fn set(data: &Params, _: &Snapshot<'_>) -> Result<Vec<ValuePair>, String> {
    let key = param_key(data, "key")?;
    let value = data
        .get("value")
        .cloned()
        .ok_or_else(|| "missing parameter 'value'".to_string())?;
    Ok(vec![ValuePair::new(key, value)])
}

/// Integer parameter with a default when absent.
fn int_param(data: &Params, name: &str, default: i64) -> Result<i64, String> {
    match data.get(name) {
        None => Ok(default),
        Some(Value::Int(n)) => Ok(*n),
        Some(other) => Err(format!("parameter '{}' must be an int, got {}", name, other)),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use grower_core::{Executor, Handler, HandlerName};

    #[test]
    fn registry_lists_every_builtin() {
        let registry = builtin_registry(Some(0));
        let names: Vec<&str> = registry.names().map(HandlerName::as_str).collect();
        assert_eq!(names, ["copy", "random", "set", "subtract"]);
    }

    #[test]
    fn int_param_defaults_and_rejects_text() {
        let mut data = Params::new();
        assert_eq!(int_param(&data, "min", 3), Ok(3));
        data.insert("min".to_string(), Value::from("low"));
        assert!(int_param(&data, "min", 3).is_err());
    }

    #[test]
    fn set_requires_value() {
        let registry = builtin_registry(None);
        let handler = Handler::new("set").with_param("key", "k");
        assert!(registry.execute(&handler, &[]).is_err());
    }
}
