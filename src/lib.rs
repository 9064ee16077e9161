/*!
 * # subwire - client core for the OpenSubtitles XML-RPC service
 *
 * Finds, ranks and downloads subtitles for local video files or known titles.
 *
 * ## Features
 *
 * - Fingerprint video files the way the service indexes them
 * - Search by file fingerprint or IMDb id, ranked by score and format
 * - Download and preview subtitles, with daily quota checks
 * - Comments, votes and wrong-match reports
 * - Title guessing from free-form strings
 * - Cached language table converting between 2-letter, 3-letter and display names
 * - Automatic backoff when the service reports overload
 *
 * ## Architecture
 *
 * - `rpc`: transport seam, XML-RPC codec, HTTP transport and the retrying dispatcher
 * - `client`: `Client` (no session) and `AuthClient` (logged-in) facades
 * - `batch`: splitting requests to the service's per-call caps
 * - `ranking`: picking the best candidate out of raw results
 * - `language`: time-bounded language table cache
 * - `models`: typed records parsed from responses
 * - `naming`: file name templates for downloads
 * - `fingerprint`: 64-bit media fingerprint and MD5 of subtitle files
 * - `file_utils`: payload decoding and file writes
 * - `app_config`: configuration file and environment fallback
 * - `errors`: error taxonomy
 */

// Global lints configuration
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod app_config;
pub mod batch;
pub mod client;
pub mod errors;
pub mod file_utils;
pub mod fingerprint;
pub mod language;
pub mod models;
pub mod naming;
pub mod ranking;
pub mod rpc;

// Re-export main types for easier usage
pub use app_config::Config;
pub use client::{AuthClient, Client, Credentials, SearchQuery};
pub use errors::{ClientError, ErrorKind, TransportError};
pub use language::{LanguageConverter, LanguageFormat};
pub use models::{Media, MediaFile, SearchResult, Subtitles};
pub use naming::NameFormatter;
pub use ranking::RankOptions;
