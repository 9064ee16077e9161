use std::time::Duration;

use log::trace;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use url::Url;

use crate::errors::{ClientError, Result, TransportError};
use crate::rpc::{Transport, Value, xmlrpc};

/// Default endpoint of the subtitle service
pub const DEFAULT_API_URL: &str = "https://api.opensubtitles.org/xml-rpc";

/// Blocking XML-RPC over HTTP transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    /// Endpoint receiving every call
    url: Url,
    /// HTTP client for making requests
    client: Client,
}

impl HttpTransport {
    /// Create a transport posting to `url`
    pub fn new(url: &str, user_agent: &str, timeout: Duration) -> Result<Self> {
        let url = Url::parse(url)
            .map_err(|e| ClientError::InvalidInput(format!("invalid API URL '{}': {}", url, e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent.to_string())
            .build()
            .map_err(|e| ClientError::InvalidInput(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { url, client })
    }

    /// Endpoint this transport posts to
    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl Transport for HttpTransport {
    fn call(&self, method: &str, params: &[Value]) -> std::result::Result<Value, TransportError> {
        let body = xmlrpc::encode_call(method, params);
        trace!("POST {} ({} bytes) for {}", self.url, body.len(), method);

        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "text/xml")
            .body(body)
            .send()
            .map_err(|e| TransportError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Protocol {
                code: status.as_u16(),
                message: status.canonical_reason().unwrap_or("unknown status").to_string(),
            });
        }

        let text = response
            .text()
            .map_err(|e| TransportError::Malformed(format!("failed to read body: {}", e)))?;

        xmlrpc::decode_response(&text)
    }
}
