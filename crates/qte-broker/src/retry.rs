//! Bounded retry for transient broker I/O errors.
//!
//! Transience is judged from the error's rendered message, matching the
//! connection-level failure classes a broker client actually raises
//! (remote-disconnected, connection-reset, protocol-error). Anything else is
//! treated as non-transient and propagated immediately.

use std::thread::sleep;
use std::time::Duration;

use anyhow::Error;

fn is_transient(err: &Error) -> bool {
    let msg = err.to_string().to_ascii_lowercase();
    ["remote disconnected", "connection reset", "connection refused", "protocol error", "broken pipe"]
        .iter()
        .any(|needle| msg.contains(needle))
}

/// Retries `f` up to `attempts` times total, sleeping `delay` between
/// attempts, as long as the error is judged transient. The last error is
/// surfaced once retries are exhausted or a non-transient error occurs.
pub fn with_retry<T>(attempts: u32, delay: Duration, mut f: impl FnMut() -> Result<T, Error>) -> Result<T, Error> {
    let attempts = attempts.max(1);
    let mut last_err = None;
    for attempt in 1..=attempts {
        match f() {
            Ok(v) => return Ok(v),
            Err(e) => {
                if attempt == attempts || !is_transient(&e) {
                    return Err(e);
                }
                last_err = Some(e);
                sleep(delay);
            }
        }
    }
    Err(last_err.expect("loop always runs at least once"))
}
