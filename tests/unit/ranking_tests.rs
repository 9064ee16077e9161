/*!
 * Tests for ranking search and guess results
 */

use serde_json::{Value, json};
use subwire::client::SearchQuery;
use subwire::models::MediaFile;
use subwire::ranking::{RankOptions, best_index, rank_guess_media, rank_search_subtitles};
use subwire::rpc::Record;

fn query() -> SearchQuery {
    SearchQuery::from(MediaFile::from_parts("18379ac9af039390", 366_876_694))
}

fn record(value: Value) -> Record {
    value.as_object().cloned().unwrap_or_default()
}

fn candidate(id: &str, format: &str, score: Value, bad: &str) -> Record {
    record(json!({"IDSubtitleFile": id, "SubFormat": format, "Score": score, "SubBad": bad}))
}

fn id_of(record: &Record) -> &str {
    record.get("IDSubtitleFile").and_then(Value::as_str).unwrap_or_default()
}

#[test]
fn test_rankSearch_withTie_shouldPickEarliest() {
    let candidates = vec![
        candidate("a", "srt", json!(5.0), "0"),
        candidate("b", "srt", json!(9.0), "0"),
        candidate("c", "srt", json!(9.0), "0"),
    ];
    let best = rank_search_subtitles(&candidates, &query(), &RankOptions::default()).unwrap();
    assert_eq!(id_of(best), "b");
}

#[test]
fn test_rankSearch_shouldSkipBadByDefault() {
    let candidates = vec![
        candidate("bad", "srt", json!(20.0), "1"),
        candidate("good", "srt", json!(3.0), "0"),
    ];
    assert_eq!(best_index(&candidates, &RankOptions::default()), Some(1));
    assert_eq!(best_index(&candidates, &RankOptions::default().include_bad()), Some(0));
}

#[test]
fn test_rankSearch_withFormats_shouldFilterCaseInsensitively() {
    let candidates = vec![
        candidate("sub", "sub", json!(10.0), "0"),
        candidate("srt", "SRT", json!(2.0), "0"),
    ];
    let options = RankOptions::default().with_formats(["srt"]);
    assert_eq!(best_index(&candidates, &options), Some(1));

    let none = RankOptions::default().with_formats(["ass"]);
    assert_eq!(best_index(&candidates, &none), None);
}

#[test]
fn test_rankSearch_withEmptyGroup_shouldBeNone() {
    let candidates: Vec<Record> = Vec::new();
    assert!(rank_search_subtitles(&candidates, &query(), &RankOptions::default()).is_none());
}

#[test]
fn test_rankSearch_withStringOrMissingScores_shouldTreatMissingAsZero() {
    let candidates = vec![
        record(json!({"IDSubtitleFile": "none", "SubFormat": "srt", "SubBad": "0"})),
        candidate("text", "srt", json!("0.5"), "0"),
    ];
    let best = rank_search_subtitles(&candidates, &query(), &RankOptions::default()).unwrap();
    assert_eq!(id_of(best), "text");
}

#[test]
fn test_rankSearch_shouldNotModifyCandidates() {
    let candidates = vec![candidate("a", "srt", json!(1.0), "0")];
    let before = candidates.clone();
    let _ = rank_search_subtitles(&candidates, &query(), &RankOptions::default());
    assert_eq!(candidates, before);
}

#[test]
fn test_rankGuess_shouldReturnBestGuess() {
    let guess = record(json!({
        "BestGuess": {"MovieName": "The Matrix", "IDMovieImdb": "133093"},
        "GuessMovieFromString": {}
    }));
    let best = rank_guess_media(&guess, "the matrix").unwrap();
    assert_eq!(best.get("MovieName"), Some(&json!("The Matrix")));

    assert!(rank_guess_media(&record(json!({"GetIMDBSuggest": {}})), "matrix").is_none());
}
