//! Built-in compute kinds.
//!
//! The CPU-bound kinds exist to load the engine with real work when
//! comparing strategies; the diagnostics kinds deliberately misbehave so the
//! timeout and crash-recovery paths can be exercised end to end.

use serde_json::{json, Value};

use crate::error::TaskError;
use crate::registry::ComputeRegistry;

/// Register the CPU-bound kinds: `fib`, `primes`.
pub fn register_builtin(registry: &mut ComputeRegistry) {
    registry.register("fib", fib);
    registry.register("primes", primes);
}

/// Register the diagnostics kinds: `sleep_ms` (blocks the executing thread),
/// `abort` (terminates the executing process abnormally).
pub fn register_diagnostics(registry: &mut ComputeRegistry) {
    registry.register("sleep_ms", sleep_ms);
    registry.register("abort", |_payload| std::process::abort());
}

/// Iterative Fibonacci over u128 with a step cap to keep runtimes bounded.
fn fib(payload: &Value) -> Result<Value, TaskError> {
    let n = payload["n"]
        .as_u64()
        .ok_or_else(|| TaskError::compute("fib: missing integer field 'n'"))?;
    if n > 180 {
        return Err(TaskError::compute("fib: n exceeds 180 (u128 overflow)"));
    }
    let (mut a, mut b): (u128, u128) = (0, 1);
    for _ in 0..n {
        let next = a + b;
        a = b;
        b = next;
    }
    Ok(json!({ "n": n, "value": a.to_string() }))
}

/// Count primes below `limit` with a trial-division sieve.
fn primes(payload: &Value) -> Result<Value, TaskError> {
    let limit = payload["limit"]
        .as_u64()
        .ok_or_else(|| TaskError::compute("primes: missing integer field 'limit'"))?
        as usize;
    if limit > 10_000_000 {
        return Err(TaskError::compute("primes: limit exceeds 10_000_000"));
    }
    if limit < 2 {
        return Ok(json!({ "limit": limit, "count": 0 }));
    }
    let mut sieve = vec![true; limit];
    sieve[0] = false;
    sieve[1] = false;
    let mut i = 2;
    while i * i < limit {
        if sieve[i] {
            let mut j = i * i;
            while j < limit {
                sieve[j] = false;
                j += i;
            }
        }
        i += 1;
    }
    let count = sieve.iter().filter(|p| **p).count();
    Ok(json!({ "limit": limit, "count": count }))
}

/// Block the executing thread for `ms` milliseconds.
///
/// A stand-in for a long compute step. Blocking (not awaiting) is the point:
/// task compute functions are synchronous.
fn sleep_ms(payload: &Value) -> Result<Value, TaskError> {
    let ms = payload["ms"]
        .as_u64()
        .ok_or_else(|| TaskError::compute("sleep_ms: missing integer field 'ms'"))?;
    std::thread::sleep(std::time::Duration::from_millis(ms));
    Ok(json!({ "slept_ms": ms }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fib_known_values() {
        assert_eq!(fib(&json!({"n": 0})).unwrap()["value"], "0");
        assert_eq!(fib(&json!({"n": 10})).unwrap()["value"], "55");
        assert_eq!(fib(&json!({"n": 90})).unwrap()["value"], "2880067194370816120");
    }

    #[test]
    fn fib_rejects_bad_payload() {
        assert!(fib(&json!({})).is_err());
        assert!(fib(&json!({"n": 200})).is_err());
    }

    #[test]
    fn primes_known_counts() {
        assert_eq!(primes(&json!({"limit": 10})).unwrap()["count"], 4);
        assert_eq!(primes(&json!({"limit": 100})).unwrap()["count"], 25);
        assert_eq!(primes(&json!({"limit": 2})).unwrap()["count"], 0);
    }

    #[test]
    fn sleep_returns_after_blocking() {
        let start = std::time::Instant::now();
        sleep_ms(&json!({"ms": 10})).unwrap();
        assert!(start.elapsed() >= std::time::Duration::from_millis(10));
    }
}
