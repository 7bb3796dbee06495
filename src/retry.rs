//! When and how long to wait before re-sending a failed call.
//!
//! A [`RetryStrategy`] decides the delay for each retry; a [`RetryPredicate`]
//! decides whether a given error is worth retrying at all. The reporting
//! service throttles per organisation, so the client additionally honours
//! rate limit headers (see [`crate::rate_limit`]).

use crate::Error;
use rand::Rng;
use std::time::Duration;

/// Delay schedule for retries.
///
/// ```
/// use cja_client::RetryStrategy;
/// use std::time::Duration;
///
/// let strategy = RetryStrategy::Linear { delay: Duration::from_secs(2), max_retries: 2 };
/// assert_eq!(strategy.delay_for_attempt(2), Some(Duration::from_secs(2)));
/// assert_eq!(strategy.delay_for_attempt(3), None);
/// ```
#[derive(Debug, Clone, Default)]
pub enum RetryStrategy {
    #[default]
    None,

    /// Waits `initial_delay * 2^(attempt - 1)`, capped at `max_delay`.
    ///
    /// With `jitter` the delay is scaled by a random factor in `[0.5, 1.0]`.
    ExponentialBackoff {
        initial_delay: Duration,
        max_delay: Duration,
        max_retries: usize,
        jitter: bool,
    },

    /// Waits the same `delay` before every retry.
    Linear { delay: Duration, max_retries: usize },

    /// `delay_fn(attempt)` returns the delay, or `None` to give up.
    /// Attempts are 1-indexed.
    Custom {
        delay_fn: fn(attempt: usize) -> Option<Duration>,
    },
}

impl RetryStrategy {
    /// The schedule used by [`crate::Cja::new`]: up to three retries starting
    /// at half a second.
    pub fn standard() -> Self {
        RetryStrategy::ExponentialBackoff {
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            max_retries: 3,
            jitter: true,
        }
    }

    /// Delay before retry number `attempt` (1 = first retry), or `None` once
    /// retries are exhausted.
    pub fn delay_for_attempt(&self, attempt: usize) -> Option<Duration> {
        match self {
            RetryStrategy::None => None,
            RetryStrategy::ExponentialBackoff {
                initial_delay,
                max_delay,
                max_retries,
                jitter,
            } => {
                if attempt > *max_retries {
                    return None;
                }
                let exponent = u32::try_from(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
                let factor = 2u32.checked_pow(exponent).unwrap_or(u32::MAX);
                let delay = initial_delay.saturating_mul(factor).min(*max_delay);

                if *jitter {
                    let scale = rand::thread_rng().gen_range(0.5..=1.0);
                    Some(delay.mul_f64(scale))
                } else {
                    Some(delay)
                }
            }
            RetryStrategy::Linear { delay, max_retries } => {
                (attempt <= *max_retries).then_some(*delay)
            }
            RetryStrategy::Custom { delay_fn } => delay_fn(attempt),
        }
    }

    /// Upper bound on retries, `None` for custom schedules.
    pub fn max_retries(&self) -> Option<usize> {
        match self {
            RetryStrategy::None => Some(0),
            RetryStrategy::ExponentialBackoff { max_retries, .. }
            | RetryStrategy::Linear { max_retries, .. } => Some(*max_retries),
            RetryStrategy::Custom { .. } => None,
        }
    }
}

/// Decides whether a failed call should be retried.
///
/// ```
/// use cja_client::{Error, RetryPredicate};
///
/// /// Retries throttled calls only.
/// struct OnThrottle;
///
/// impl RetryPredicate for OnThrottle {
///     fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
///         error.status().map_or(false, |s| s.as_u16() == 429)
///     }
/// }
/// ```
pub trait RetryPredicate: Send + Sync {
    /// `attempt` is the 1-indexed number of the attempt that just failed.
    fn should_retry(&self, error: &Error, attempt: usize) -> bool;
}

/// Retries whatever [`Error::is_retryable`] accepts. The default.
#[derive(Debug, Clone, Copy)]
pub struct RetryOnRetryable;

impl RetryPredicate for RetryOnRetryable {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        error.is_retryable()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryOn5xx;

impl RetryPredicate for RetryOn5xx {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        matches!(error, Error::HttpError { status, .. } if status.is_server_error())
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryOnTimeout;

impl RetryPredicate for RetryOnTimeout {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        matches!(error, Error::Timeout)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryOnConnectionError;

impl RetryPredicate for RetryOnConnectionError {
    fn should_retry(&self, error: &Error, _attempt: usize) -> bool {
        matches!(error, Error::Network(_))
    }
}

/// Retries if any inner predicate does.
pub struct OrPredicate {
    predicates: Vec<Box<dyn RetryPredicate>>,
}

impl OrPredicate {
    pub fn new(predicates: Vec<Box<dyn RetryPredicate>>) -> Self {
        Self { predicates }
    }
}

impl RetryPredicate for OrPredicate {
    fn should_retry(&self, error: &Error, attempt: usize) -> bool {
        self.predicates
            .iter()
            .any(|p| p.should_retry(error, attempt))
    }
}

/// Retries only if every inner predicate does.
pub struct AndPredicate {
    predicates: Vec<Box<dyn RetryPredicate>>,
}

impl AndPredicate {
    pub fn new(predicates: Vec<Box<dyn RetryPredicate>>) -> Self {
        Self { predicates }
    }
}

impl RetryPredicate for AndPredicate {
    fn should_retry(&self, error: &Error, attempt: usize) -> bool {
        self.predicates
            .iter()
            .all(|p| p.should_retry(error, attempt))
    }
}
