//! Blocking HTTP access and the fixed-delay retry loop
//!
//! All remote services are reached through the [`Transport`] trait. The
//! production implementation is [`HttpTransport`], backed by a blocking
//! `reqwest` client. Tests provide their own implementation that replays
//! canned responses.
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::{EnrichError, EnrichResult};

/// Status code and body of an HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub body: String,
}

impl Reply {
    /// Creates a new `Reply`
    pub fn new<S: Into<String>>(status: u16, body: S) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    /// Returns `true` for a `200 OK` reply
    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    /// Returns the body if the status is `200`
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError::Status`] for any other status code
    pub fn ok_body(&self, url: &str) -> EnrichResult<&str> {
        if self.is_ok() {
            Ok(&self.body)
        } else {
            Err(EnrichError::Status {
                status: self.status,
                url: url.to_string(),
            })
        }
    }
}

/// Sends requests to remote services
///
/// Every call is a single attempt. Retrying is the job of [`RetryPolicy`].
pub trait Transport {
    /// Sends a `GET` request with additional headers
    ///
    /// # Errors
    ///
    /// Returns an error if no response was received
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> EnrichResult<Reply>;

    /// Sends a `POST` request with a JSON body
    ///
    /// # Errors
    ///
    /// Returns an error if no response was received
    fn post_json(&self, url: &str, body: &serde_json::Value) -> EnrichResult<Reply>;
}

/// [`Transport`] backed by a blocking `reqwest` client
pub struct HttpTransport {
    client: reqwest::blocking::Client,
}

impl HttpTransport {
    /// Builds the client with the configured timeout and user agent
    ///
    /// # Errors
    ///
    /// Returns [`EnrichError::Http`] if the TLS backend cannot be initialized
    pub fn new(config: &HttpConfig) -> EnrichResult<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()?;
        Ok(Self { client })
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &str, headers: &[(&str, &str)]) -> EnrichResult<Reply> {
        let mut request = self.client.get(url);
        for (key, value) in headers {
            request = request.header(*key, *value);
        }
        let response = request.send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        debug!("GET {url} -> {status}");
        Ok(Reply { status, body })
    }

    fn post_json(&self, url: &str, body: &serde_json::Value) -> EnrichResult<Reply> {
        let response = self.client.post(url).json(body).send()?;
        let status = response.status().as_u16();
        let body = response.text()?;
        debug!("POST {url} -> {status}");
        Ok(Reply { status, body })
    }
}

/// Bounded retry with a fixed delay between attempts
///
/// The delay is a blocking sleep, it does not grow between attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Maximum number of attempts, including the first one
    #[serde(default = "default_attempts")]
    pub attempts: u32,
    /// Delay after each failed attempt, in milliseconds
    #[serde(default = "default_delay_ms")]
    pub delay_ms: u64,
}

fn default_attempts() -> u32 {
    3
}

fn default_delay_ms() -> u64 {
    2000
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: default_attempts(),
            delay_ms: default_delay_ms(),
        }
    }
}

impl RetryPolicy {
    /// Creates a new `RetryPolicy`
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self {
            attempts,
            delay_ms: u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
        }
    }

    /// A policy that tries once and never sleeps
    pub fn once() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// The delay after a failed attempt
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }

    /// Runs `op` until it succeeds or all attempts are used up
    ///
    /// `op` receives the 1-based attempt number. Every failed attempt is
    /// followed by the fixed delay, including the last one.
    ///
    /// # Errors
    ///
    /// Returns the error of the last attempt
    pub fn run<T, F>(&self, label: &str, mut op: F) -> EnrichResult<T>
    where
        F: FnMut(u32) -> EnrichResult<T>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 1;
        loop {
            match op(attempt) {
                Ok(res) => return Ok(res),
                Err(err) => {
                    warn!("{label}: attempt {attempt}/{attempts} failed: {err}");
                    if !self.delay().is_zero() {
                        thread::sleep(self.delay());
                    }
                    if attempt >= attempts {
                        return Err(err);
                    }
                    attempt += 1;
                }
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod test {
    use std::cell::RefCell;
    use std::collections::{HashMap, VecDeque};

    use super::*;

    /// Replays queued replies per URL and records every request
    #[derive(Default)]
    pub(crate) struct FakeTransport {
        replies: RefCell<HashMap<String, VecDeque<EnrichResult<Reply>>>>,
        pub(crate) calls: RefCell<Vec<String>>,
        pub(crate) bodies: RefCell<Vec<serde_json::Value>>,
    }

    impl FakeTransport {
        pub(crate) fn push(&self, url: &str, reply: EnrichResult<Reply>) {
            self.replies
                .borrow_mut()
                .entry(url.to_string())
                .or_default()
                .push_back(reply);
        }

        pub(crate) fn push_ok(&self, url: &str, body: &str) {
            self.push(url, Ok(Reply::new(200, body)));
        }

        pub(crate) fn calls_to(&self, url: &str) -> usize {
            self.calls.borrow().iter().filter(|u| *u == url).count()
        }

        fn next(&self, url: &str) -> EnrichResult<Reply> {
            self.calls.borrow_mut().push(url.to_string());
            self.replies
                .borrow_mut()
                .get_mut(url)
                .and_then(VecDeque::pop_front)
                .unwrap_or_else(|| Ok(Reply::new(404, "")))
        }
    }

    impl Transport for FakeTransport {
        fn get(&self, url: &str, _headers: &[(&str, &str)]) -> EnrichResult<Reply> {
            self.next(url)
        }

        fn post_json(&self, url: &str, body: &serde_json::Value) -> EnrichResult<Reply> {
            self.bodies.borrow_mut().push(body.clone());
            self.next(url)
        }
    }

    #[test]
    fn retry_returns_first_success() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let mut seen = Vec::new();
        let res = policy.run("test", |attempt| {
            seen.push(attempt);
            if attempt < 2 {
                Err(EnrichError::Status {
                    status: 500,
                    url: "x".to_string(),
                })
            } else {
                Ok(attempt)
            }
        });
        assert_eq!(res.unwrap(), 2);
        assert_eq!(seen, vec![1, 2]);
    }

    #[test]
    fn retry_exhausts_attempts() {
        let policy = RetryPolicy::new(3, Duration::ZERO);
        let mut count = 0;
        let res: EnrichResult<()> = policy.run("test", |_| {
            count += 1;
            Err(EnrichError::Status {
                status: 503,
                url: "x".to_string(),
            })
        });
        assert!(matches!(res, Err(EnrichError::Status { status: 503, .. })));
        assert_eq!(count, 3);
    }

    #[test]
    fn zero_attempts_still_tries_once() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        let mut count = 0;
        let _: EnrichResult<()> = policy.run("test", |_| {
            count += 1;
            Err(EnrichError::Config("x".to_string()))
        });
        assert_eq!(count, 1);
    }

    #[test]
    fn reply_status() {
        assert_eq!(Reply::new(200, "ok").ok_body("u").unwrap(), "ok");
        assert!(matches!(
            Reply::new(429, "").ok_body("u"),
            Err(EnrichError::Status { status: 429, .. })
        ));
    }
}
