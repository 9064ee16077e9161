/*!
 * RPC plumbing for the subtitle service.
 *
 * - `endpoint`: the closed set of remote operations and their static metadata
 * - `dispatcher`: token injection, status interpretation and retry
 * - `xmlrpc`: XML-RPC request/response codec
 * - `http`: blocking HTTP transport speaking XML-RPC
 * - `mock`: scripted transport for tests
 */

use std::fmt::Debug;

use crate::errors::TransportError;

pub mod dispatcher;
pub mod endpoint;
pub mod http;
pub mod mock;
pub mod xmlrpc;

pub use dispatcher::{Clock, Dispatcher, ManualClock, RetryPolicy, Status, SystemClock};
pub use endpoint::{Endpoint, EndpointMeta};

/// Dynamic value exchanged with the service
pub type Value = serde_json::Value;

/// A raw response or record: string keys to dynamic values
pub type Record = serde_json::Map<String, Value>;

/// Invokes a remote procedure by name with ordered parameters
///
/// Implementations own the wire encoding; the dispatcher only decides what to
/// call and how to interpret the answer.
pub trait Transport: Send + Sync + Debug {
    /// Perform one call and return the decoded response value
    fn call(&self, method: &str, params: &[Value]) -> Result<Value, TransportError>;
}
