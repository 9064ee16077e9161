/*!
 * Mock transport for testing.
 *
 * This module provides a transport that never touches the network:
 * - `MockTransport::scripted()` - Replays queued replies in order
 * - `MockTransport::always(..)` - Answers every call with the same reply
 * - `MockTransport::with_handler(..)` - Computes replies from the method and params
 *
 * Every call is recorded so tests can assert on what was sent.
 */

use std::collections::VecDeque;
use std::fmt;

use parking_lot::Mutex;

use crate::errors::TransportError;
use crate::rpc::{Transport, Value};

/// Reply produced by the mock for one call
pub type MockReply = Result<Value, TransportError>;

type Handler = Box<dyn Fn(&str, &[Value]) -> MockReply + Send + Sync>;

/// One recorded call
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    /// Method name as sent
    pub method: String,
    /// Parameters as sent, token included when one was injected
    pub params: Vec<Value>,
}

/// Behavior mode for the mock transport
enum MockBehavior {
    /// Pop replies from the queue, fail when it runs dry
    Scripted,
    /// Same reply for every call once the queue is empty
    Always(MockReply),
    /// Custom reply computed per call once the queue is empty
    Handler(Handler),
}

/// Transport double that replays canned responses
pub struct MockTransport {
    behavior: MockBehavior,
    queue: Mutex<VecDeque<MockReply>>,
    calls: Mutex<Vec<MockCall>>,
}

impl MockTransport {
    fn new(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            queue: Mutex::new(VecDeque::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Mock that only answers with queued replies
    pub fn scripted() -> Self {
        Self::new(MockBehavior::Scripted)
    }

    /// Mock that answers every call with `reply`
    pub fn always(reply: MockReply) -> Self {
        Self::new(MockBehavior::Always(reply))
    }

    /// Mock that builds each reply with `handler`
    pub fn with_handler(handler: impl Fn(&str, &[Value]) -> MockReply + Send + Sync + 'static) -> Self {
        Self::new(MockBehavior::Handler(Box::new(handler)))
    }

    /// Queue a successful reply
    pub fn push_value(self, value: Value) -> Self {
        self.queue.lock().push_back(Ok(value));
        self
    }

    /// Queue a transport fault
    pub fn push_error(self, error: TransportError) -> Self {
        self.queue.lock().push_back(Err(error));
        self
    }

    /// Queue a reply on a shared mock
    pub fn enqueue(&self, reply: MockReply) {
        self.queue.lock().push_back(reply);
    }

    /// All calls seen so far
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().clone()
    }

    /// Number of calls seen so far
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Calls made to one method
    pub fn calls_to(&self, method: &str) -> Vec<MockCall> {
        self.calls.lock().iter().filter(|c| c.method == method).cloned().collect()
    }
}

impl fmt::Debug for MockTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mode = match self.behavior {
            MockBehavior::Scripted => "scripted",
            MockBehavior::Always(_) => "always",
            MockBehavior::Handler(_) => "handler",
        };
        f.debug_struct("MockTransport")
            .field("mode", &mode)
            .field("queued", &self.queue.lock().len())
            .field("calls", &self.calls.lock().len())
            .finish()
    }
}

impl Transport for MockTransport {
    fn call(&self, method: &str, params: &[Value]) -> Result<Value, TransportError> {
        self.calls.lock().push(MockCall {
            method: method.to_string(),
            params: params.to_vec(),
        });

        if let Some(reply) = self.queue.lock().pop_front() {
            return reply;
        }

        match &self.behavior {
            MockBehavior::Scripted => Err(TransportError::Connection(format!(
                "mock transport has no reply queued for {}",
                method
            ))),
            MockBehavior::Always(reply) => reply.clone(),
            MockBehavior::Handler(handler) => handler(method, params),
        }
    }
}
