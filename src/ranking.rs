/*!
 * Default policies for picking one result out of many.
 *
 * Both functions are pure: candidates are never modified and nothing here
 * fails. An empty or fully filtered input simply yields `None`.
 */

use crate::client::SearchQuery;
use crate::rpc::{Record, Value};

/// What the search ranking needs to know about a raw candidate
pub trait Candidate {
    /// Someone reported the subtitles as bad
    fn is_bad(&self) -> bool;
    /// Subtitle format / extension, e.g. `srt`
    fn format(&self) -> Option<&str>;
    /// Service relevance score, higher is better
    fn score(&self) -> f64;
}

impl Candidate for Record {
    fn is_bad(&self) -> bool {
        match self.get("SubBad") {
            Some(Value::String(flag)) => flag != "0",
            Some(Value::Number(flag)) => flag.as_f64() != Some(0.0),
            Some(Value::Bool(flag)) => *flag,
            _ => false,
        }
    }

    fn format(&self) -> Option<&str> {
        self.get("SubFormat").and_then(Value::as_str)
    }

    fn score(&self) -> f64 {
        let score = match self.get("Score") {
            Some(Value::Number(score)) => score.as_f64(),
            Some(Value::String(score)) => score.trim().parse().ok(),
            _ => None,
        };
        score.filter(|s: &f64| s.is_finite()).unwrap_or(0.0)
    }
}

/// Filters applied before scores are compared
#[derive(Debug, Clone, PartialEq)]
pub struct RankOptions {
    /// Skip candidates reported as bad
    pub exclude_bad: bool,
    /// Only keep these formats (case-insensitive); `None` keeps all
    pub allowed_formats: Option<Vec<String>>,
}

impl Default for RankOptions {
    fn default() -> Self {
        Self {
            exclude_bad: true,
            allowed_formats: None,
        }
    }
}

impl RankOptions {
    /// Restrict to `formats`
    pub fn with_formats<I, S>(mut self, formats: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_formats = Some(formats.into_iter().map(|f| f.as_ref().to_lowercase()).collect());
        self
    }

    pub fn include_bad(mut self) -> Self {
        self.exclude_bad = false;
        self
    }

    fn keeps<C: Candidate>(&self, candidate: &C) -> bool {
        if self.exclude_bad && candidate.is_bad() {
            return false;
        }
        match &self.allowed_formats {
            None => true,
            Some(allowed) => candidate
                .format()
                .is_some_and(|format| allowed.iter().any(|a| a.eq_ignore_ascii_case(format))),
        }
    }
}

/// Index of the best candidate: highest score among survivors, earliest on ties
pub fn best_index<C: Candidate>(candidates: &[C], options: &RankOptions) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;

    for (index, candidate) in candidates.iter().enumerate() {
        if !options.keeps(candidate) {
            continue;
        }

        let score = candidate.score();
        match best {
            Some((_, max)) if score <= max => {}
            _ => best = Some((index, score)),
        }
    }

    best.map(|(index, _)| index)
}

/// Best candidate in a search group
///
/// Has the shape custom policies take in
/// [`AuthClient::search_subtitles_with`](crate::client::AuthClient::search_subtitles_with);
/// the query itself plays no part in the default policy.
pub fn rank_search_subtitles<'a, C: Candidate>(
    candidates: &'a [C],
    _query: &SearchQuery,
    options: &RankOptions,
) -> Option<&'a C> {
    best_index(candidates, options).map(|index| &candidates[index])
}

/// The service's own pick for a title guess, when it made one
pub fn rank_guess_media<'a>(result: &'a Record, _query: &str) -> Option<&'a Record> {
    result.get("BestGuess").and_then(Value::as_object)
}
