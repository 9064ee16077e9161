/*!
 * Language code conversion backed by the service's language table.
 *
 * The table is fetched with one token-exempt call and reused for an hour.
 * All three columns live in one immutable `LanguageTable` behind an `Arc`, so
 * a refresh swaps every column at once and readers never see a torn table.
 */

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use log::{debug, info};
use once_cell::sync::Lazy;
use parking_lot::Mutex;

use crate::errors::{ClientError, Result};
use crate::rpc::{Clock, Dispatcher, Endpoint, SystemClock, Value};

/// How long a fetched table stays fresh
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(3600);

/// One of the three language columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LanguageFormat {
    /// 2-letter ISO 639-1 code, e.g. `de`
    Lang2,
    /// 3-letter code used by search queries, e.g. `ger`
    Lang3,
    /// Display name, e.g. `German`
    LangLong,
}

impl LanguageFormat {
    /// Field holding this column in `GetSubLanguages` records
    pub fn field(self) -> &'static str {
        match self {
            Self::Lang2 => "ISO639",
            Self::Lang3 => "SubLanguageID",
            Self::LangLong => "LanguageName",
        }
    }
}

impl fmt::Display for LanguageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Lang2 => "2-letter",
            Self::Lang3 => "3-letter",
            Self::LangLong => "long name",
        };
        f.write_str(name)
    }
}

impl FromStr for LanguageFormat {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "2" | "lang2" | "short" => Ok(Self::Lang2),
            "3" | "lang3" => Ok(Self::Lang3),
            "long" | "name" => Ok(Self::LangLong),
            _ => Err(ClientError::InvalidInput(format!("unknown language format '{}'", s))),
        }
    }
}

/// Index-aligned language columns
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageTable {
    lang_2: Vec<String>,
    lang_3: Vec<String>,
    lang_long: Vec<String>,
}

impl LanguageTable {
    /// Build a table from `(lang_2, lang_3, lang_long)` triples
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, S, S)>,
        S: Into<String>,
    {
        let mut table = Self::default();
        for (lang_2, lang_3, lang_long) in entries {
            table.lang_2.push(lang_2.into());
            table.lang_3.push(lang_3.into());
            table.lang_long.push(lang_long.into());
        }
        table
    }

    /// Parse the `data` list of a `GetSubLanguages` response
    pub fn from_records(records: &[Value]) -> Result<Self> {
        let mut entries = Vec::with_capacity(records.len());
        for record in records {
            let column = |format: LanguageFormat| {
                record
                    .get(format.field())
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .ok_or_else(|| {
                        ClientError::LibraryContract(format!(
                            "language record is missing '{}': {}",
                            format.field(),
                            record
                        ))
                    })
            };
            entries.push((
                column(LanguageFormat::Lang2)?,
                column(LanguageFormat::Lang3)?,
                column(LanguageFormat::LangLong)?,
            ));
        }
        Ok(Self::new(entries))
    }

    pub fn column(&self, format: LanguageFormat) -> &[String] {
        match format {
            LanguageFormat::Lang2 => &self.lang_2,
            LanguageFormat::Lang3 => &self.lang_3,
            LanguageFormat::LangLong => &self.lang_long,
        }
    }

    pub fn len(&self) -> usize {
        self.lang_2.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lang_2.is_empty()
    }

    /// Rows as `(lang_2, lang_3, lang_long)`
    pub fn entries(&self) -> impl Iterator<Item = (&str, &str, &str)> + '_ {
        self.lang_2
            .iter()
            .zip(&self.lang_3)
            .zip(&self.lang_long)
            .map(|((a, b), c)| (a.as_str(), b.as_str(), c.as_str()))
    }

    /// Look `code` up in one column and return the same row from another
    pub fn convert(&self, code: &str, from: LanguageFormat, to: LanguageFormat) -> Result<String> {
        let index = self
            .column(from)
            .iter()
            .position(|c| c == code)
            .ok_or_else(|| ClientError::LanguageNotFound {
                code: code.to_string(),
                format: from.to_string(),
            })?;
        Ok(self.column(to)[index].clone())
    }
}

/// Where fresh language tables come from
pub trait LanguageSource {
    fn fetch_languages(&self) -> Result<LanguageTable>;
}

impl LanguageSource for Dispatcher {
    fn fetch_languages(&self) -> Result<LanguageTable> {
        let response = self.dispatch(Endpoint::GetSubLanguages, None, Vec::new())?;
        match response.get("data") {
            Some(Value::Array(records)) => LanguageTable::from_records(records),
            _ => Err(ClientError::LibraryContract(
                "GetSubLanguages returned no language list".to_string(),
            )),
        }
    }
}

/// Cached table and when it was fetched
#[derive(Debug, Clone, Default)]
pub struct LanguageSnapshot {
    table: Option<Arc<LanguageTable>>,
    refreshed_at: Option<Instant>,
}

/// Time-bounded cache converting between language formats
#[derive(Debug)]
pub struct LanguageConverter {
    state: Mutex<LanguageSnapshot>,
    clock: Arc<dyn Clock>,
}

static GLOBAL: Lazy<Arc<LanguageConverter>> = Lazy::new(|| Arc::new(LanguageConverter::new()));

impl LanguageConverter {
    /// Empty converter on the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            state: Mutex::new(LanguageSnapshot::default()),
            clock,
        }
    }

    /// Process-wide converter shared by every client that doesn't bring its own
    pub fn global() -> Arc<LanguageConverter> {
        Arc::clone(&GLOBAL)
    }

    /// Current table, fetching it first when missing or stale
    ///
    /// The lock is held across the fetch so concurrent callers trigger one call.
    pub fn table(&self, source: &dyn LanguageSource) -> Result<Arc<LanguageTable>> {
        let mut state = self.state.lock();
        let now = self.clock.now();

        if let (Some(table), Some(refreshed_at)) = (&state.table, state.refreshed_at) {
            if now.saturating_duration_since(refreshed_at) <= FRESHNESS_WINDOW {
                return Ok(Arc::clone(table));
            }
            debug!("Language table is stale, refreshing");
        }

        let table = Arc::new(source.fetch_languages()?);
        info!("Fetched {} languages from the service", table.len());
        *state = LanguageSnapshot {
            table: Some(Arc::clone(&table)),
            refreshed_at: Some(now),
        };
        Ok(table)
    }

    /// Convert `code` between formats
    pub fn convert(
        &self,
        source: &dyn LanguageSource,
        code: &str,
        from: LanguageFormat,
        to: LanguageFormat,
    ) -> Result<String> {
        if from == to {
            return Ok(code.to_string());
        }
        self.table(source)?.convert(code, from, to)
    }

    /// Every code in `format`, in service order
    pub fn list(&self, source: &dyn LanguageSource, format: LanguageFormat) -> Result<Vec<String>> {
        Ok(self.table(source)?.column(format).to_vec())
    }

    pub fn contains(&self, source: &dyn LanguageSource, code: &str, format: LanguageFormat) -> Result<bool> {
        Ok(self.table(source)?.column(format).iter().any(|c| c == code))
    }

    /// Fetch now regardless of freshness
    pub fn force_refresh(&self, source: &dyn LanguageSource) -> Result<()> {
        self.invalidate();
        self.table(source).map(|_| ())
    }

    /// Drop the cached table; the next read fetches
    pub fn invalidate(&self) {
        *self.state.lock() = LanguageSnapshot::default();
    }

    /// Install `table` as if it had been fetched at `refreshed_at`
    pub fn inject(&self, table: LanguageTable, refreshed_at: Instant) {
        *self.state.lock() = LanguageSnapshot {
            table: Some(Arc::new(table)),
            refreshed_at: Some(refreshed_at),
        };
    }

    /// Copy of the cache state, for [`restore`](Self::restore)
    pub fn snapshot(&self) -> LanguageSnapshot {
        self.state.lock().clone()
    }

    pub fn restore(&self, snapshot: LanguageSnapshot) {
        *self.state.lock() = snapshot;
    }
}

impl Default for LanguageConverter {
    fn default() -> Self {
        Self::new()
    }
}
