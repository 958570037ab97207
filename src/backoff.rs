//! Sleep policy for both stages of a check.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::time::Duration;
use tokio::time::Instant;

/// Base sleep between page resolution attempts, and the floor jitter can fall back to.
pub const RESOLVE_BASE_DELAY: Duration = Duration::from_secs(60);
/// Largest jitter, as a fraction of the clamped delay.
pub const JITTER_RATIO: f64 = 0.1;
/// Consecutive indeterminate polls tolerated before giving up.
pub const GIVE_UP_THRESHOLD: u32 = 10;
/// Flat sleep after an indeterminate poll.
pub const INDETERMINATE_DELAY: Duration = Duration::from_secs(60);
/// Sleep after an offline poll when no start time is announced.
pub const OFFLINE_POLL_DELAY: Duration = Duration::from_secs(5);

/// Attempt bookkeeping for one stage. Each stage starts from a fresh value.
#[derive(Debug, Clone)]
pub struct AttemptState {
    pub attempts: u32,
    pub started: Instant,
    /// Total time spent sleeping between attempts.
    pub wasted: Duration,
}

impl AttemptState {
    pub fn new() -> Self {
        Self {
            attempts: 0,
            started: Instant::now(),
            wasted: Duration::ZERO,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl Default for AttemptState {
    fn default() -> Self {
        Self::new()
    }
}

/// `60 + 30 * attempts` seconds, clamped to `ceiling` when one is set.
pub fn base_delay(attempts: u32, ceiling: Option<Duration>) -> Duration {
    let base_secs = RESOLVE_BASE_DELAY.as_secs();
    let secs = base_secs.saturating_add(base_secs.saturating_mul(u64::from(attempts)) / 2);
    let delay = Duration::from_secs(secs);
    match ceiling {
        Some(ceiling) if delay > ceiling => ceiling,
        _ => delay,
    }
}

/// Moves `delay` up or down by a uniform amount of at most [`JITTER_RATIO`] of it.
///
/// The ceiling bounds `delay` before jitter, so an upward move may land up to
/// [`JITTER_RATIO`] past it. It is only used as the fallback when the
/// downward move would go negative.
pub fn jitter<R: Rng + ?Sized>(delay: Duration, ceiling: Option<Duration>, rng: &mut R) -> Duration {
    let magnitude = delay.mul_f64(rng.gen_range(0.0..=JITTER_RATIO));
    if rng.gen_bool(0.5) {
        delay + magnitude
    } else {
        delay
            .checked_sub(magnitude)
            .unwrap_or_else(|| ceiling.unwrap_or(RESOLVE_BASE_DELAY))
    }
}

/// Sleep before the next page resolution attempt.
pub fn resolve_delay<R: Rng + ?Sized>(
    attempts: u32,
    ceiling: Option<Duration>,
    rng: &mut R,
) -> Duration {
    jitter(base_delay(attempts, ceiling), ceiling, rng)
}

/// Sleep after an offline poll.
///
/// Wakes one second ahead of an announced start time that is still in the
/// future, never sooner than one second from now.
pub fn offline_delay(scheduled_start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> Duration {
    let until_start = scheduled_start
        .filter(|start| *start > now)
        .and_then(|start| (start - now).to_std().ok());

    match until_start {
        Some(remaining) => remaining
            .saturating_sub(Duration::from_secs(1))
            .max(Duration::from_secs(1)),
        None => OFFLINE_POLL_DELAY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn test_base_delay_grows_linearly() {
        for n in 0..100u32 {
            assert_eq!(
                base_delay(n, None),
                Duration::from_secs(60 + 30 * u64::from(n))
            );
        }
    }

    #[test]
    fn test_base_delay_respects_ceiling() {
        let ceiling = Some(Duration::from_secs(100));
        assert_eq!(base_delay(0, ceiling), Duration::from_secs(60));
        assert_eq!(base_delay(1, ceiling), Duration::from_secs(90));
        assert_eq!(base_delay(2, ceiling), Duration::from_secs(100));
        assert_eq!(base_delay(u32::MAX, ceiling), Duration::from_secs(100));
    }

    #[test]
    fn test_ceiling_below_base_clamps_every_attempt() {
        let ceiling = Some(Duration::from_secs(30));
        for n in 0..10 {
            assert_eq!(base_delay(n, ceiling), Duration::from_secs(30));
        }
    }

    #[test]
    fn test_jitter_stays_within_ten_percent() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut saw_above = false;
        let mut saw_below = false;

        for n in 0..500u32 {
            let ceiling = (n % 3 == 0).then(|| Duration::from_secs(120));
            let base = base_delay(n % 20, ceiling);
            let delay = jitter(base, ceiling, &mut rng);
            let spread = base.mul_f64(JITTER_RATIO);

            assert!(delay <= base + spread, "{delay:?} above {base:?}");
            if let Some(ceiling) = ceiling {
                assert!(base <= ceiling, "{base:?} above ceiling");
                assert!(
                    delay <= ceiling.mul_f64(1.0 + JITTER_RATIO),
                    "{delay:?} more than jitter past ceiling"
                );
            }
            assert!(delay + spread >= base, "{delay:?} below {base:?}");
            saw_above |= delay > base;
            saw_below |= delay < base;
        }

        assert!(saw_above && saw_below, "jitter should move in both directions");
    }

    #[test]
    fn test_jitter_is_seed_deterministic() {
        let first = resolve_delay(3, None, &mut StdRng::seed_from_u64(42));
        let second = resolve_delay(3, None, &mut StdRng::seed_from_u64(42));
        assert_eq!(first, second);
    }

    #[test]
    fn test_offline_delay_wakes_before_schedule() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let start = now + TimeDelta::seconds(30);
        assert_eq!(offline_delay(Some(start), now), Duration::from_secs(29));
    }

    #[test]
    fn test_offline_delay_falls_back_to_fixed_interval() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(offline_delay(None, now), OFFLINE_POLL_DELAY);
        assert_eq!(
            offline_delay(Some(now - TimeDelta::seconds(10)), now),
            OFFLINE_POLL_DELAY
        );
        assert_eq!(offline_delay(Some(now), now), OFFLINE_POLL_DELAY);
    }

    #[test]
    fn test_offline_delay_is_at_least_one_second() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let soon = now + TimeDelta::milliseconds(1500);
        assert_eq!(offline_delay(Some(soon), now), Duration::from_secs(1));
    }
}
