/*!
 * Common test utilities for the subwire test suite
 */

#![allow(dead_code)]

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::write::GzEncoder;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde_json::{Value, json};
use tempfile::TempDir;

use subwire::client::{AuthClient, Client, Credentials};
use subwire::language::{LanguageConverter, LanguageTable};
use subwire::rpc::mock::{MockReply, MockTransport};
use subwire::rpc::{Dispatcher, ManualClock};

/// Useragent used by logged-in test clients; not the restricted development one
pub const TEST_USERAGENT: &str = "subwire-tests v1";

/// Token handed out by [`login_reply`]
pub const TEST_TOKEN: &str = "tok-3f2a";

/// Route library logs to the test harness; set RUST_LOG to see them
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Creates a temporary directory for test files
pub fn create_temp_dir() -> Result<TempDir> {
    Ok(TempDir::new()?)
}

/// Creates a file of `size` pseudo-random bytes, reproducible per `seed`
pub fn create_media_file(dir: &Path, filename: &str, size: usize, seed: u64) -> Result<PathBuf> {
    let mut content = vec![0u8; size];
    StdRng::seed_from_u64(seed).fill_bytes(&mut content);
    let path = dir.join(filename);
    fs::write(&path, content)?;
    Ok(path)
}

/// Creates a test file with the given content in the specified directory
pub fn create_test_file(dir: &Path, filename: &str, content: &str) -> Result<PathBuf> {
    let path = dir.join(filename);
    fs::write(&path, content)?;
    Ok(path)
}

/// A small language table: English, German, French
pub fn language_table() -> LanguageTable {
    LanguageTable::new([
        ("en", "eng", "English"),
        ("de", "ger", "German"),
        ("fr", "fre", "French"),
    ])
}

/// `GetSubLanguages` reply matching [`language_table`]
pub fn languages_reply() -> Value {
    json!({
        "data": [
            {"ISO639": "en", "SubLanguageID": "eng", "LanguageName": "English"},
            {"ISO639": "de", "SubLanguageID": "ger", "LanguageName": "German"},
            {"ISO639": "fr", "SubLanguageID": "fre", "LanguageName": "French"}
        ]
    })
}

/// Converter preloaded with [`language_table`], fresh for the next hour
pub fn preloaded_converter() -> Arc<LanguageConverter> {
    let converter = LanguageConverter::new();
    converter.inject(language_table(), Instant::now());
    Arc::new(converter)
}

/// `status` plus `data`, the shape of most replies
pub fn ok(data: Value) -> Value {
    json!({"status": "200 OK", "data": data})
}

pub fn status_only(status: &str) -> Value {
    json!({"status": status})
}

pub fn login_reply() -> Value {
    json!({"status": "200 OK", "token": TEST_TOKEN, "seconds": 0.01})
}

/// `ServerInfo` reply with `remaining` downloads left today
pub fn server_info_reply(remaining: u64) -> Value {
    json!({
        "application": "OpenSuber v0.2",
        "users_online_total": "4421",
        "users_loggedin": "83",
        "users_max_alltime": "27449",
        "users_registered": "1057210",
        "users_online_program": "3812",
        "subs_downloads": "3296524612",
        "subs_subtitle_files": "5372712",
        "movies_total": "193720",
        "download_limits": {
            "client_ip": "10.0.0.7",
            "client_24h_download_count": "3",
            "client_download_quota": remaining.to_string(),
            "client_24h_download_limit": "200",
            "limit_check_by": "user"
        }
    })
}

/// One `SearchSubtitles` hit
pub fn search_hit(query: usize, file_id: &str, format: &str, score: f64, bad: &str) -> Value {
    json!({
        "QueryNumber": query.to_string(),
        "IDSubtitle": format!("10{}", file_id),
        "IDSubtitleFile": file_id,
        "IDSubMovieFile": "77",
        "SubFileName": format!("Movie.2015.{}.{}", file_id, format),
        "SubFormat": format,
        "SubSize": "42000",
        "ISO639": "de",
        "SubEncoding": "UTF-8",
        "SubBad": bad,
        "Score": score,
        "SubDownloadsCnt": "1234",
        "SubComments": "2",
        "SubRating": "8.5",
        "SubHearingImpaired": "0",
        "SubAddDate": "2016-02-01 17:30:02",
        "UserID": "99",
        "UserNickName": "uploader",
        "MovieName": "Movie",
        "MovieYear": "2015",
        "IDMovieImdb": "1234567",
        "MovieKind": "movie"
    })
}

/// Base64 of the gzip of `content`, the way the service ships files
pub fn gzip_base64(content: &[u8]) -> String {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content).unwrap();
    STANDARD.encode(encoder.finish().unwrap())
}

/// Dispatcher over `transport` with a virtual clock
pub fn mock_dispatcher(transport: &Arc<MockTransport>) -> (Dispatcher, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new());
    let dispatcher = Dispatcher::new(transport.clone()).with_clock(clock.clone());
    (dispatcher, clock)
}

/// Session-less client over `transport` with languages preloaded
pub fn mock_client(transport: &Arc<MockTransport>) -> Client {
    let (dispatcher, _) = mock_dispatcher(transport);
    Client::new(dispatcher).with_language_converter(preloaded_converter())
}

pub fn test_credentials() -> Credentials {
    Credentials::new("alice", "s3cret", TEST_USERAGENT)
}

/// Logged-in client whose transport answers through `handler`
///
/// `LogIn` is answered with [`login_reply`] before `handler` is consulted.
pub fn logged_in_with<F>(handler: F) -> (AuthClient, Arc<MockTransport>)
where
    F: Fn(&str, &[Value]) -> MockReply + Send + Sync + 'static,
{
    let transport = Arc::new(MockTransport::with_handler(move |method, params| match method {
        "LogIn" => Ok(login_reply()),
        "LogOut" => Ok(status_only("200 OK")),
        _ => handler(method, params),
    }));
    let client = AuthClient::login(mock_client(&transport), &test_credentials()).unwrap();
    (client, transport)
}
