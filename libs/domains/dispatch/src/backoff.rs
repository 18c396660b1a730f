use std::time::Duration;

use rand::Rng;

const INITIAL: Duration = Duration::from_secs(1);
const MULTIPLIER: f64 = 2.0;
const CAP: Duration = Duration::from_secs(5);
const RANDOMIZATION_FACTOR: f64 = 0.2;

/// The jittered delay for the `attempt`-th backoff step (1-based: `attempt`
/// is the retry row's `retry_count` before it is bumped for this pass).
/// Mirrors an exponential-backoff generator stepped forward `attempt` times:
/// step 1 is the initial interval, each subsequent step multiplies by
/// [`MULTIPLIER`] up to [`CAP`], and every step is jittered by
/// ±[`RANDOMIZATION_FACTOR`].
pub fn delay_for_attempt(attempt: u32) -> Duration {
    let attempt = attempt.max(1);
    let exponent = (attempt - 1) as i32;
    let base_secs = (INITIAL.as_secs_f64() * MULTIPLIER.powi(exponent)).min(CAP.as_secs_f64());
    jitter(base_secs)
}

fn jitter(base_secs: f64) -> Duration {
    let delta = base_secs * RANDOMIZATION_FACTOR;
    let low = base_secs - delta;
    let high = base_secs + delta;
    let jittered = rand::rng().random_range(low..=high);
    Duration::from_secs_f64(jittered.max(0.0))
}
