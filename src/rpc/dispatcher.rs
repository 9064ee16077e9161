/*!
 * Request dispatcher.
 *
 * One `dispatch` is one logical call: the session token is injected when the
 * endpoint needs it, the response status is classified, overload statuses are
 * retried with exponential backoff under a wall-clock budget, and anything
 * other than success becomes a typed `ClientError`.
 */

use std::fmt::Debug;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, warn};
use parking_lot::Mutex;

use crate::errors::{ClientError, Result, TransportError};
use crate::rpc::{Endpoint, Record, Transport, Value};

/// Statuses that are worth waiting out
const RETRYABLE_CODES: [&str; 4] = ["429", "503", "506", "520"];

/// Time source and sleeper used by the retry loop
pub trait Clock: Send + Sync + Debug {
    fn now(&self) -> Instant;
    fn sleep(&self, duration: Duration);
}

/// Real monotonic clock, sleeps the calling thread
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, duration: Duration) {
        thread::sleep(duration);
    }
}

/// Virtual clock whose `sleep` advances time instantly
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
    sleeps: Mutex<Vec<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
            sleeps: Mutex::new(Vec::new()),
        }
    }

    /// Move time forward without recording a sleep
    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock() += by;
    }

    /// Every sleep requested so far, in order
    pub fn sleeps(&self) -> Vec<Duration> {
        self.sleeps.lock().clone()
    }

    /// Virtual time elapsed since creation
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.elapsed.lock()
    }

    fn sleep(&self, duration: Duration) {
        self.sleeps.lock().push(duration);
        self.advance(duration);
    }
}

/// Backoff parameters for overload statuses
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Wall-clock budget measured from the first attempt
    pub timeout: Duration,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Multiplier applied to the delay after every retry
    pub factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            initial_delay: Duration::from_millis(1500),
            factor: 2.0,
        }
    }
}

impl RetryPolicy {
    /// The factor must be finite and at least 1, the initial delay non-zero
    pub fn validate(&self) -> Result<()> {
        if !self.factor.is_finite() || self.factor < 1.0 {
            return Err(ClientError::InvalidInput(format!(
                "retry factor must be a finite number of at least 1, got {}",
                self.factor
            )));
        }
        if self.initial_delay.is_zero() {
            return Err(ClientError::InvalidInput("retry initial delay must be positive".to_string()));
        }
        Ok(())
    }
}

/// Retry state: when we started and how long the next wait would be
#[derive(Debug)]
struct Backoff {
    started: Instant,
    next_delay: Duration,
    timeout: Duration,
    factor: f64,
}

impl Backoff {
    fn start(now: Instant, policy: &RetryPolicy) -> Self {
        Self {
            started: now,
            next_delay: policy.initial_delay,
            timeout: policy.timeout,
            factor: policy.factor,
        }
    }

    /// Delay to sleep before the next attempt, or `None` once the budget can't cover it
    fn next_delay(&mut self, now: Instant) -> Option<Duration> {
        let elapsed = now.saturating_duration_since(self.started);
        let remaining = self.timeout.saturating_sub(elapsed);
        if remaining <= self.next_delay {
            return None;
        }

        let delay = self.next_delay;
        // An unrepresentable next delay ends the retries after this one
        self.next_delay = Duration::try_from_secs_f64(delay.as_secs_f64() * self.factor).unwrap_or(Duration::MAX);
        Some(delay)
    }
}

/// Parsed `"<3-digit code> <message>"` status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Status {
    code: String,
    message: String,
    raw: String,
}

impl Status {
    /// Split a raw status into code (first 3 chars) and message (from offset 4)
    pub fn parse(raw: &str) -> Self {
        let code = raw.get(..3).unwrap_or(raw).to_string();
        let message = raw.get(4..).unwrap_or("").to_string();
        Self { code, message, raw: raw.to_string() }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn is_success(&self) -> bool {
        self.code == "200"
    }

    pub fn is_retryable(&self) -> bool {
        RETRYABLE_CODES.contains(&self.code.as_str())
    }
}

/// What one attempt produced
enum Reply {
    /// Endpoint never reports a status, hand the response back untouched
    Unchecked(Record),
    /// Response (possibly synthesized) with its status
    Checked(Record, Status),
}

/// Performs logical RPC calls over a transport
#[derive(Debug, Clone)]
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    policy: RetryPolicy,
}

impl Dispatcher {
    /// Dispatcher with the real clock and default retry policy
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            clock: Arc::new(SystemClock),
            policy: RetryPolicy::default(),
        }
    }

    /// Replace the clock used for backoff
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the retry policy, rejecting one [`RetryPolicy::validate`] refuses
    pub fn with_policy(mut self, policy: RetryPolicy) -> Result<Self> {
        policy.validate()?;
        self.policy = policy;
        Ok(self)
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Call `endpoint` with `params`, prepending `token` when the endpoint requires one
    ///
    /// A missing token on an authenticated endpoint is sent as nil and left for
    /// the service to reject.
    pub fn dispatch(&self, endpoint: Endpoint, token: Option<&str>, params: Vec<Value>) -> Result<Record> {
        let args = if endpoint.requires_token() {
            let mut args = Vec::with_capacity(params.len() + 1);
            args.push(token.map_or(Value::Null, |t| Value::String(t.to_string())));
            args.extend(params);
            args
        } else {
            params
        };

        let mut backoff = Backoff::start(self.clock.now(), &self.policy);
        let mut attempt = 1;

        let (response, status) = loop {
            debug!("Dispatching {} (attempt {})", endpoint, attempt);

            let (response, status) = match self.attempt(endpoint, &args)? {
                Reply::Unchecked(response) => return Ok(response),
                Reply::Checked(response, status) => (response, status),
            };

            if !status.is_retryable() {
                break (response, status);
            }

            match backoff.next_delay(self.clock.now()) {
                Some(delay) => {
                    warn!(
                        "{} answered '{}', retrying in {:.1}s",
                        endpoint,
                        status.raw(),
                        delay.as_secs_f64()
                    );
                    self.clock.sleep(delay);
                    attempt += 1;
                }
                None => {
                    warn!("{} still answering '{}' after {} attempts, giving up", endpoint, status.raw(), attempt);
                    break (response, status);
                }
            }
        };

        if status.is_success() {
            return Ok(response);
        }

        match ClientError::from_status(status.code(), status.message()) {
            Some(error) => Err(error),
            None => Err(ClientError::Library { status: status.raw().to_string() }),
        }
    }

    /// Exactly one outbound call
    fn attempt(&self, endpoint: Endpoint, args: &[Value]) -> Result<Reply> {
        let value = match self.transport.call(endpoint.method_name(), args) {
            Ok(value) => value,
            Err(fault) => {
                let status = synthesize_status(&fault)?;
                let mut response = Record::new();
                response.insert("status".to_string(), Value::String(status.raw().to_string()));
                return Ok(Reply::Checked(response, status));
            }
        };

        let response = match value {
            Value::Object(response) => response,
            other => {
                return Err(ClientError::LibraryContract(format!(
                    "{} returned a non-struct response: {}",
                    endpoint, other
                )));
            }
        };

        if !endpoint.reports_status() {
            return Ok(Reply::Unchecked(response));
        }

        let status = match response.get("status") {
            Some(Value::String(raw)) => Status::parse(raw),
            Some(other) => {
                return Err(ClientError::LibraryContract(format!(
                    "{} returned a non-string status: {}",
                    endpoint, other
                )));
            }
            None => {
                return Err(ClientError::LibraryContract(format!(
                    "{} should return a status and didn't",
                    endpoint
                )));
            }
        };

        Ok(Reply::Checked(response, status))
    }
}

/// Fold a transport fault into the status path so retries treat it uniformly
fn synthesize_status(fault: &TransportError) -> Result<Status> {
    let code = match fault {
        TransportError::Protocol { code, .. } => i64::from(*code),
        TransportError::Fault { code, .. } => *code,
        TransportError::Connection(detail) => return Ok(Status::parse(&format!("503 {}", detail))),
        TransportError::Malformed(detail) => return Ok(Status::parse(&format!("520 {}", detail))),
    };

    let raw = match code {
        503 => "503 Service Unavailable",
        506 => "506 Server under maintenance",
        520 => "520 Unknown internal error",
        _ => {
            return Err(ClientError::Library {
                status: format!("unhandled protocol error ({})", fault),
            });
        }
    };
    Ok(Status::parse(raw))
}
