//! Blocking HTTP GET with retry, backoff and circuit-breaker bookkeeping.

use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::StatusCode;

use super::circuit_breaker::CircuitBreaker;
use super::provider::DataError;

/// Retry policy shared by the HTTP providers.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    /// Delay before retry `attempt` (1-based): base, 2x base, 4x base...
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
    }
}

pub fn build_client() -> Result<Client, DataError> {
    Client::builder()
        .timeout(Duration::from_secs(30))
        .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
        .cookie_store(true)
        .build()
        .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))
}

/// GET `url`, retrying transient failures.
///
/// 403 trips the breaker at once and 401 fails without retrying. 429, 5xx,
/// connect errors and timeouts are retried. 404 maps to `not_found`. A request
/// that exhausts its retries counts as one breaker failure and reports its
/// last error. The successful response is returned unread so callers can
/// parse JSON or CSV.
pub fn get_with_retry(
    client: &Client,
    url: &str,
    breaker: &CircuitBreaker,
    policy: RetryPolicy,
    not_found: impl Fn() -> DataError,
) -> Result<Response, DataError> {
    if !breaker.is_allowed() {
        return Err(DataError::CircuitBreakerTripped {
            provider: breaker.name().to_string(),
        });
    }

    let mut last_error = None;

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            let delay = policy.delay_for(attempt);
            tracing::debug!(attempt, ?delay, url, "retrying request");
            std::thread::sleep(delay);
            // Another request may have opened the breaker meanwhile.
            if !breaker.is_allowed() {
                break;
            }
        }

        tracing::debug!(url, "GET");
        match client.get(url).send() {
            Ok(resp) => {
                let status = resp.status();

                if status == StatusCode::FORBIDDEN {
                    breaker.trip();
                    return Err(DataError::CircuitBreakerTripped {
                        provider: breaker.name().to_string(),
                    });
                }

                if status == StatusCode::UNAUTHORIZED {
                    return Err(DataError::Unauthorized {
                        provider: breaker.name().to_string(),
                    });
                }

                if status == StatusCode::NOT_FOUND {
                    breaker.record_success();
                    return Err(not_found());
                }

                if status == StatusCode::TOO_MANY_REQUESTS {
                    let retry_after = resp
                        .headers()
                        .get("retry-after")
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse::<u64>().ok())
                        .unwrap_or(60);
                    last_error = Some(DataError::RateLimited {
                        retry_after_secs: retry_after,
                    });
                    continue;
                }

                if !status.is_success() {
                    last_error = Some(DataError::Other(format!("HTTP {status} for {url}")));
                    continue;
                }

                breaker.record_success();
                return Ok(resp);
            }
            Err(e) if e.is_connect() || e.is_timeout() => {
                last_error = Some(DataError::NetworkUnreachable(e.to_string()));
            }
            Err(e) => {
                breaker.record_failure();
                return Err(DataError::NetworkUnreachable(e.to_string()));
            }
        }
    }

    breaker.record_failure();
    Err(last_error.unwrap_or_else(|| DataError::Other("max retries exceeded".into())))
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::data::circuit_breaker::BreakerState;
    use crate::data::fixture_server::{closed_port_url, FixtureServer};

    fn fast() -> RetryPolicy {
        RetryPolicy {
            max_retries: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    fn get(url: &str, breaker: &CircuitBreaker) -> Result<Response, DataError> {
        let client = build_client().unwrap();
        get_with_retry(&client, url, breaker, fast(), || DataError::Other("nf".into()))
    }

    #[test]
    fn backoff_doubles() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_millis(500));
        assert_eq!(policy.delay_for(2), Duration::from_millis(1000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(2000));
    }

    #[test]
    fn open_breaker_short_circuits() {
        let client = build_client().unwrap();
        let breaker = CircuitBreaker::new("test", Duration::from_secs(60));
        breaker.trip();
        let err = get_with_retry(
            &client,
            "http://127.0.0.1:9/unreachable",
            &breaker,
            RetryPolicy::default(),
            || DataError::Other("nf".into()),
        )
        .unwrap_err();
        assert!(matches!(err, DataError::CircuitBreakerTripped { .. }));
    }

    #[test]
    fn transient_failures_are_retried() {
        let hits = AtomicUsize::new(0);
        let server = FixtureServer::start(move |_| {
            if hits.fetch_add(1, Ordering::SeqCst) < 2 {
                (503, "busy".into())
            } else {
                (200, "ok".into())
            }
        });
        let breaker = CircuitBreaker::default_provider("test");

        let resp = get(&format!("{}/series", server.url()), &breaker).unwrap();
        assert_eq!(resp.text().unwrap(), "ok");
        assert_eq!(server.requests().len(), 3);
        assert_eq!(breaker.state(), BreakerState::Closed);
    }

    #[test]
    fn unreachable_host_is_a_network_error_not_a_ban() {
        let url = format!("{}/x", closed_port_url());
        let breaker = CircuitBreaker::default_provider("test");

        let err = get(&url, &breaker).unwrap_err();
        assert!(matches!(err, DataError::NetworkUnreachable(_)), "{err}");
        assert!(breaker.is_allowed());

        // Each exhausted request counts once; the third one opens the breaker.
        for _ in 0..2 {
            assert!(matches!(get(&url, &breaker), Err(DataError::NetworkUnreachable(_))));
        }
        assert!(!breaker.is_allowed());
        assert!(matches!(
            get(&url, &breaker),
            Err(DataError::CircuitBreakerTripped { .. })
        ));
    }

    #[test]
    fn unauthorized_is_not_retried() {
        let server = FixtureServer::start(|_| (401, "Unauthorized".into()));
        let breaker = CircuitBreaker::default_provider("test");

        let err = get(&format!("{}/quote", server.url()), &breaker).unwrap_err();
        assert!(matches!(err, DataError::Unauthorized { .. }));
        assert_eq!(server.requests().len(), 1);
        assert!(breaker.is_allowed());
    }

    #[test]
    fn forbidden_trips_the_breaker() {
        let server = FixtureServer::start(|_| (403, "banned".into()));
        let breaker = CircuitBreaker::default_provider("test");

        let err = get(&format!("{}/quote", server.url()), &breaker).unwrap_err();
        assert!(matches!(err, DataError::CircuitBreakerTripped { .. }));
        assert!(!breaker.is_allowed());
    }
}
