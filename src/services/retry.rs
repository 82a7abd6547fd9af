//! Retry classification and policy for outbound HTTP calls.

use futures_retry_policies::{RetryPolicy, ShouldRetry};
use std::ops::ControlFlow;
use std::time::Duration;

/// Failed attempt, tagged with how the retry policy should treat it.
#[derive(Debug, PartialEq)]
pub enum MaybeRetry<T> {
    /// Transient failure, retried on the backoff schedule.
    MaybeRetry(T),
    /// Quota exhausted, retried once the given wait has passed.
    WaitFor(T, Duration),
    NoRetry(T),
}

impl<T> MaybeRetry<T> {
    pub fn into_inner(self) -> T {
        match self {
            Self::MaybeRetry(inner) | Self::WaitFor(inner, _) | Self::NoRetry(inner) => inner,
        }
    }
}

impl<T> ShouldRetry for MaybeRetry<T> {
    fn should_retry(&self, _: u32) -> bool {
        matches!(self, Self::MaybeRetry(_))
    }
}

/// Caps the total number of attempts and honours rate-limit waits up to
/// `max_wait`. Everything else goes to the wrapped backoff policy.
pub struct CappedRetry<P> {
    inner: P,
    attempts: u32,
    max_attempts: u32,
    max_wait: Duration,
}

impl<P> CappedRetry<P> {
    pub fn new(inner: P, max_attempts: u32, max_wait: Duration) -> Self {
        Self {
            inner,
            attempts: 0,
            max_attempts,
            max_wait,
        }
    }
}

impl<T, E, P> RetryPolicy<Result<T, MaybeRetry<E>>> for CappedRetry<P>
where
    P: RetryPolicy<Result<T, MaybeRetry<E>>>,
{
    fn should_retry(
        &mut self,
        result: Result<T, MaybeRetry<E>>,
    ) -> ControlFlow<Result<T, MaybeRetry<E>>, Duration> {
        self.attempts += 1;
        if result.is_ok() || self.attempts >= self.max_attempts {
            return ControlFlow::Break(result);
        }

        match result {
            Err(MaybeRetry::WaitFor(err, wait)) => {
                if wait <= self.max_wait {
                    tracing::warn!(wait_secs = wait.as_secs(), "Rate limit exceeded, waiting for reset");
                    ControlFlow::Continue(wait)
                } else {
                    ControlFlow::Break(Err(MaybeRetry::WaitFor(err, wait)))
                }
            }
            other => {
                let flow = self.inner.should_retry(other);
                if let ControlFlow::Continue(delay) = &flow {
                    tracing::warn!(attempt = self.attempts, delay_ms = delay.as_millis() as u64, "Retrying request");
                }
                flow
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Retries every `MaybeRetry` after a fixed delay.
    struct Fixed(Duration);

    impl<T, E> RetryPolicy<Result<T, MaybeRetry<E>>> for Fixed {
        fn should_retry(
            &mut self,
            result: Result<T, MaybeRetry<E>>,
        ) -> ControlFlow<Result<T, MaybeRetry<E>>, Duration> {
            match result {
                Err(MaybeRetry::MaybeRetry(_)) => ControlFlow::Continue(self.0),
                other => ControlFlow::Break(other),
            }
        }
    }

    type Attempt = Result<u8, MaybeRetry<&'static str>>;

    fn policy() -> CappedRetry<Fixed> {
        CappedRetry::new(Fixed(Duration::from_millis(500)), 3, Duration::from_secs(60))
    }

    #[test]
    fn success_stops_immediately() {
        let mut p = policy();
        assert!(matches!(p.should_retry(Attempt::Ok(1)), ControlFlow::Break(Ok(1))));
    }

    #[test]
    fn transient_errors_use_backoff_until_cap() {
        let mut p = policy();
        let err = || Attempt::Err(MaybeRetry::MaybeRetry("502"));
        assert_eq!(p.should_retry(err()), ControlFlow::Continue(Duration::from_millis(500)));
        assert_eq!(p.should_retry(err()), ControlFlow::Continue(Duration::from_millis(500)));
        assert!(matches!(p.should_retry(err()), ControlFlow::Break(Err(_))));
    }

    #[test]
    fn rate_limit_waits_for_reset() {
        let mut p = policy();
        let flow = p.should_retry(Attempt::Err(MaybeRetry::WaitFor("403", Duration::from_secs(31))));
        assert_eq!(flow, ControlFlow::Continue(Duration::from_secs(31)));
    }

    #[test]
    fn long_rate_limit_wait_gives_up() {
        let mut p = policy();
        let flow = p.should_retry(Attempt::Err(MaybeRetry::WaitFor("403", Duration::from_secs(600))));
        assert!(matches!(flow, ControlFlow::Break(Err(MaybeRetry::WaitFor(_, _)))));
    }

    #[test]
    fn client_errors_are_not_retried() {
        let mut p = policy();
        let flow = p.should_retry(Attempt::Err(MaybeRetry::NoRetry("404")));
        assert!(matches!(flow, ControlFlow::Break(Err(MaybeRetry::NoRetry("404")))));
    }

    #[test]
    fn only_transient_errors_report_should_retry() {
        assert!(MaybeRetry::MaybeRetry(()).should_retry(0));
        assert!(!MaybeRetry::WaitFor((), Duration::ZERO).should_retry(0));
        assert!(!MaybeRetry::NoRetry(()).should_retry(0));
    }
}
