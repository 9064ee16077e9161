/*!
 * Tests for file and payload helpers
 */

use std::fs;

use subwire::errors::ErrorKind;
use subwire::file_utils::FileManager;

use crate::common;

#[test]
fn test_decodePayload_shouldGunzipBase64() {
    let encoded = common::gzip_base64(b"1\n00:00:01,000 --> 00:00:02,000\nHallo\n");
    let decoded = FileManager::decode_payload(&encoded).unwrap();
    assert_eq!(decoded, b"1\n00:00:01,000 --> 00:00:02,000\nHallo\n");
}

#[test]
fn test_decodePayload_withWrappedLines_shouldIgnoreWhitespace() {
    let encoded = common::gzip_base64(&[0xAB; 500]);
    let wrapped: String = encoded
        .as_bytes()
        .chunks(20)
        .map(|line| format!("{}\n", String::from_utf8_lossy(line)))
        .collect();

    assert_eq!(FileManager::decode_payload(&wrapped).unwrap(), vec![0xAB; 500]);
}

#[test]
fn test_decodePayload_withGarbage_shouldBeDecodeError() {
    assert_eq!(FileManager::decode_payload("%%%").unwrap_err().kind(), ErrorKind::Decode);
}

#[test]
fn test_decodeText_withCp1252_shouldUseDeclaredEncoding() {
    assert_eq!(FileManager::decode_text(b"Gr\xfc\xdfe", "CP1252"), "Grüße");
    assert_eq!(FileManager::decode_text(b"Caf\xE9", "cp1252"), "Café");
    assert_eq!(FileManager::decode_text(b"\xB9koda", "ISO-8859-2"), "škoda");
    assert_eq!(FileManager::decode_text("Grüße".as_bytes(), "UTF-8"), "Grüße");
    assert_eq!(FileManager::decode_text("Grüße".as_bytes(), ""), "Grüße");
}

#[test]
fn test_decodeText_withUnknownEncoding_shouldFallBackToLossyUtf8() {
    let text = FileManager::decode_text(b"Gr\xfc\xdfe", "x-not-a-charset");
    assert!(text.starts_with("Gr"));
    assert!(text.contains('\u{FFFD}'));
}

#[test]
fn test_writeBytes_atomic_shouldCreateParentsAndReplace() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("a").join("b").join("movie.srt");

    FileManager::write_bytes(&path, b"first", true).unwrap();
    FileManager::write_bytes(&path, b"second", true).unwrap();

    assert_eq!(fs::read(&path).unwrap(), b"second");
    // Only the target remains, no leftover temporary files
    assert_eq!(fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
}

#[test]
fn test_writeBytes_direct_shouldWriteFile() {
    let dir = common::create_temp_dir().unwrap();
    let path = dir.path().join("movie.srt");
    FileManager::write_bytes(&path, b"plain", false).unwrap();
    assert!(FileManager::file_exists(&path));
}

#[test]
fn test_findVideos_shouldSkipOtherFilesAndSort() {
    let dir = common::create_temp_dir().unwrap();
    common::create_test_file(dir.path(), "b.mkv", "x").unwrap();
    common::create_test_file(dir.path(), "a.MP4", "x").unwrap();
    common::create_test_file(dir.path(), "a.srt", "x").unwrap();
    fs::create_dir(dir.path().join("season.mkv")).unwrap();

    let videos = FileManager::find_videos(dir.path()).unwrap();
    let names: Vec<_> = videos
        .iter()
        .filter_map(|p| p.file_name())
        .map(|n| n.to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.MP4", "b.mkv"]);
}
