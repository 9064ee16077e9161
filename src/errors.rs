/*!
 * Error types for the subwire client.
 *
 * This module contains the error taxonomy surfaced to library users and the
 * lower-level transport faults, using the thiserror crate for ergonomic error
 * definitions.
 */

use thiserror::Error;

/// Where users should report service behavior the client doesn't understand yet
pub const REPO_URL: &str = "https://github.com/subwire/subwire";

/// Result alias used throughout the client
pub type Result<T> = std::result::Result<T, ClientError>;

/// Faults raised by an RPC transport before any application status is seen
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The HTTP layer answered with a non-success code
    #[error("protocol error {code}: {message}")]
    Protocol {
        /// HTTP status code
        code: u16,
        /// Reason phrase or body excerpt
        message: String,
    },

    /// The service answered with an XML-RPC fault instead of a value
    #[error("RPC fault {code}: {message}")]
    Fault {
        /// Fault code from the response
        code: i64,
        /// Fault string from the response
        message: String,
    },

    /// The response body could not be decoded
    #[error("malformed response: {0}")]
    Malformed(String),

    /// The request never got a response (reset, refused, timed out)
    #[error("connection error: {0}")]
    Connection(String),
}

/// Fieldless view of [`ClientError`] for matching on the taxonomy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Auth,
    Upload,
    Download,
    LibraryContract,
    ServerOverload,
    HashTooSmall,
    LanguageNotFound,
    Library,
    InvalidInput,
    Decode,
    Io,
}

/// Errors returned by every public client operation
#[derive(Error, Debug)]
pub enum ClientError {
    /// Bad credentials or useragent
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The service rejected an upload
    #[error("Upload error: {0}")]
    Upload(String),

    /// The service rejected a download, or there's not enough context to save one
    #[error("Download error: {0}")]
    Download(String),

    /// Client and service disagree on an assumption
    #[error("Library contract violated: {0}")]
    LibraryContract(String),

    /// Retries ran out while the service kept reporting overload
    #[error("Server overloaded: {0}")]
    ServerOverload(String),

    /// File is below the fingerprint minimum
    #[error("File of {size} bytes is below the fingerprint minimum of {minimum} bytes")]
    HashTooSmall {
        /// Size of the offending file
        size: u64,
        /// Smallest size that can be fingerprinted
        minimum: u64,
    },

    /// Language code missing from the service's language table
    #[error("Language '{code}' not found in the {format} language list")]
    LanguageNotFound {
        /// Code that was looked up
        code: String,
        /// Format it was looked up in
        format: String,
    },

    /// The service answered with a status this client doesn't know
    #[error(
        "The API returned an unhandled response, consider raising an issue at {}. Response status: '{status}'",
        REPO_URL
    )]
    Library {
        /// Raw status text (or protocol fault description)
        status: String,
    },

    /// The caller passed something the operation can't accept
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A payload from the service couldn't be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Local file operation failed
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// Taxonomy of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Auth(_) => ErrorKind::Auth,
            Self::Upload(_) => ErrorKind::Upload,
            Self::Download(_) => ErrorKind::Download,
            Self::LibraryContract(_) => ErrorKind::LibraryContract,
            Self::ServerOverload(_) => ErrorKind::ServerOverload,
            Self::HashTooSmall { .. } => ErrorKind::HashTooSmall,
            Self::LanguageNotFound { .. } => ErrorKind::LanguageNotFound,
            Self::Library { .. } => ErrorKind::Library,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Decode(_) => ErrorKind::Decode,
            Self::Io(_) => ErrorKind::Io,
        }
    }

    /// Build the error mapped to a 3-digit status code, if the code is known
    ///
    /// Codes 403, 404, 405, 406 and 409 can't be produced by a well-formed
    /// client and are left unmapped.
    pub fn from_status(code: &str, message: &str) -> Option<Self> {
        let message = message.to_string();
        let error = match code {
            "401" | "411" | "414" | "415" => Self::Auth(message),
            "402" | "416" => Self::Upload(message),
            "407" => Self::Download(message),
            "408" | "410" | "412" | "413" => Self::LibraryContract(message),
            "429" | "503" | "506" | "520" => Self::ServerOverload(message),
            _ => return None,
        };
        Some(error)
    }
}

impl From<base64::DecodeError> for ClientError {
    fn from(error: base64::DecodeError) -> Self {
        Self::Decode(error.to_string())
    }
}
