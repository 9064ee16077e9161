/*!
 * Typed views over raw service records.
 *
 * The service is loose about types: counters arrive as strings or numbers,
 * absent values as `""`, `"0"` or a missing key. Parsing here is lenient for
 * optional data and strict (`LibraryContract`) for fields a record can't do
 * without.
 */

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::errors::{ClientError, Result};
use crate::fingerprint;
use crate::rpc::{Record, Value};

/// Timestamp format used across responses
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Read-only accessors with the service's loose typing
struct Fields<'a> {
    record: &'a Record,
    kind: &'static str,
}

impl<'a> Fields<'a> {
    fn new(record: &'a Record, kind: &'static str) -> Self {
        Self { record, kind }
    }

    fn missing(&self, key: &str) -> ClientError {
        ClientError::LibraryContract(format!("{} record is missing '{}'", self.kind, key))
    }

    fn opt_str(&self, key: &str) -> Option<String> {
        match self.record.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn string(&self, key: &str) -> Result<String> {
        self.opt_str(key).ok_or_else(|| self.missing(key))
    }

    /// First present key wins; the service spells some fields two ways
    fn string_any(&self, keys: &[&str]) -> Result<String> {
        keys.iter()
            .find_map(|key| self.opt_str(key).filter(|s| !s.is_empty()))
            .ok_or_else(|| self.missing(keys[0]))
    }

    /// Id where `""` and `"0"` mean "none"
    fn opt_id(&self, key: &str) -> Option<String> {
        self.opt_str(key).filter(|id| !id.is_empty() && id != "0")
    }

    fn opt_u64(&self, key: &str) -> Option<u64> {
        match self.record.get(key)? {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn u64(&self, key: &str) -> Result<u64> {
        self.opt_u64(key).ok_or_else(|| self.missing(key))
    }

    fn opt_f64(&self, key: &str) -> Option<f64> {
        match self.record.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn flag(&self, key: &str) -> bool {
        match self.record.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => s == "1",
            Some(Value::Number(n)) => n.as_u64() == Some(1),
            _ => false,
        }
    }

    fn datetime(&self, key: &str) -> Result<NaiveDateTime> {
        let raw = self.string(key)?;
        NaiveDateTime::parse_from_str(&raw, TIME_FORMAT).map_err(|e| {
            ClientError::LibraryContract(format!("{} '{}' has an unexpected date '{}': {}", self.kind, key, raw, e))
        })
    }

    fn object(&self, key: &str) -> Option<&'a Record> {
        self.record.get(key).and_then(Value::as_object)
    }
}

/// Public identity of a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: String,
    pub nickname: String,
}

impl User {
    /// Author of a search result, `None` for anonymous uploads
    fn author_of(fields: &Fields<'_>) -> Option<Self> {
        let id = fields.opt_id("UserID")?;
        Some(Self {
            id,
            nickname: fields.opt_str("UserNickName").unwrap_or_default(),
        })
    }
}

/// Account details of the logged in user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullUser {
    pub id: String,
    pub nickname: String,
    pub rank: String,
    pub uploads: u64,
    pub downloads: u64,
    /// 3-letter codes as stored by the service
    pub preferred_languages: Vec<String>,
    pub web_language: String,
}

impl FullUser {
    pub fn from_record(record: &Record) -> Result<Self> {
        let fields = Fields::new(record, "user");
        Ok(Self {
            id: fields.string("IDUser")?,
            nickname: fields.string("UserNickName")?,
            rank: fields.opt_str("UserRank").unwrap_or_default(),
            uploads: fields.opt_u64("UploadCnt").unwrap_or_default(),
            downloads: fields.opt_u64("DownloadCnt").unwrap_or_default(),
            preferred_languages: fields
                .opt_str("UserPreferedLanguages")
                .unwrap_or_default()
                .split(',')
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string)
                .collect(),
            web_language: fields.opt_str("UserWebLanguage").unwrap_or_default(),
        })
    }
}

/// What kind of media a record describes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Movie,
    Episode,
    TvSeries,
}

impl MediaKind {
    fn parse(raw: &str) -> Result<Self> {
        match raw.to_lowercase().as_str() {
            "movie" => Ok(Self::Movie),
            "episode" => Ok(Self::Episode),
            "tv series" => Ok(Self::TvSeries),
            other => Err(ClientError::LibraryContract(format!("undefined MovieKind '{}'", other))),
        }
    }
}

/// A movie, episode or series known to the service
#[derive(Debug, Clone, PartialEq)]
pub struct Media {
    pub kind: MediaKind,
    pub name: String,
    pub year: Option<i32>,
    pub imdb_id: String,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    /// Local directory the media lives in, if known
    pub dirname: Option<PathBuf>,
    /// Local file name of the media, if known
    pub filename: Option<PathBuf>,
}

impl Media {
    pub fn movie(name: impl Into<String>, year: Option<i32>, imdb_id: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Movie,
            name: name.into(),
            year,
            imdb_id: imdb_id.into(),
            season: None,
            episode: None,
            dirname: None,
            filename: None,
        }
    }

    pub fn episode(
        name: impl Into<String>,
        year: Option<i32>,
        imdb_id: impl Into<String>,
        season: u32,
        episode: u32,
    ) -> Self {
        Self {
            kind: MediaKind::Episode,
            season: Some(season),
            episode: Some(episode),
            ..Self::movie(name, year, imdb_id)
        }
    }

    /// Build from a record carrying `MovieKind`; defaults to a movie when absent
    pub fn from_record(record: &Record) -> Result<Self> {
        let fields = Fields::new(record, "media");
        let kind = match fields.opt_str("MovieKind") {
            Some(kind) => MediaKind::parse(&kind)?,
            None => MediaKind::Movie,
        };

        let (season, episode) = match kind {
            MediaKind::Episode => (
                fields.opt_u64("SeriesSeason").or_else(|| fields.opt_u64("Season")),
                fields.opt_u64("SeriesEpisode").or_else(|| fields.opt_u64("Episode")),
            ),
            _ => (None, None),
        };

        Ok(Self {
            kind,
            name: fields.string("MovieName")?,
            year: fields.opt_u64("MovieYear").and_then(|y| i32::try_from(y).ok()),
            imdb_id: fields.string_any(&["IDMovieImdb", "IDMovieIMDB", "IDMovie"])?,
            season: season.and_then(|s| u32::try_from(s).ok()),
            episode: episode.and_then(|e| u32::try_from(e).ok()),
            dirname: None,
            filename: None,
        })
    }

    /// Attach local file context
    pub fn with_location(mut self, dirname: Option<PathBuf>, filename: Option<PathBuf>) -> Self {
        self.dirname = dirname;
        self.filename = filename;
        self
    }
}

/// One subtitle file on the service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subtitles {
    pub size: u64,
    pub id: String,
    pub file_id: String,
    /// Only set when the subtitles were matched by file fingerprint
    pub sub_to_movie_id: Option<String>,
    pub filename: PathBuf,
    pub lang_2: String,
    pub ext: String,
    pub encoding: String,
}

impl Subtitles {
    pub fn from_record(record: &Record) -> Result<Self> {
        let fields = Fields::new(record, "subtitles");
        Ok(Self {
            size: fields.opt_u64("SubSize").unwrap_or_default(),
            id: fields.string("IDSubtitle")?,
            file_id: fields.string("IDSubtitleFile")?,
            sub_to_movie_id: fields.opt_id("IDSubMovieFile"),
            filename: PathBuf::from(fields.string("SubFileName")?),
            lang_2: fields.string("ISO639")?,
            ext: fields.string("SubFormat")?.to_lowercase(),
            encoding: fields.opt_str("SubEncoding").unwrap_or_else(|| "UTF-8".to_string()),
        })
    }
}

/// A ranked search hit
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    pub author: Option<User>,
    pub media: Media,
    pub subtitles: Subtitles,
    pub upload_date: NaiveDateTime,
    pub num_bad_reports: u64,
    pub num_downloads: u64,
    pub num_comments: u64,
    /// `None` until someone rated the subtitles
    pub rating: Option<f64>,
    pub score: f64,
    pub hearing_impaired: bool,
}

impl SearchResult {
    pub fn from_record(record: &Record) -> Result<Self> {
        let fields = Fields::new(record, "search result");
        Ok(Self {
            author: User::author_of(&fields),
            media: Media::from_record(record)?,
            subtitles: Subtitles::from_record(record)?,
            upload_date: fields.datetime("SubAddDate")?,
            num_bad_reports: fields.opt_u64("SubBad").unwrap_or_default(),
            num_downloads: fields.opt_u64("SubDownloadsCnt").unwrap_or_default(),
            num_comments: fields.opt_u64("SubComments").unwrap_or_default(),
            rating: fields.opt_f64("SubRating").filter(|r| *r > 0.0),
            score: fields.opt_f64("Score").unwrap_or_default(),
            hearing_impaired: fields.flag("SubHearingImpaired"),
        })
    }
}

/// Comment left on subtitles
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comment {
    pub author: User,
    pub created: NaiveDateTime,
    pub text: String,
}

impl Comment {
    pub fn from_record(record: &Record) -> Result<Self> {
        let fields = Fields::new(record, "comment");
        Ok(Self {
            author: User {
                id: fields.string("UserID")?,
                nickname: fields.opt_str("UserNickName").unwrap_or_default(),
            },
            created: fields.datetime("Created")?,
            text: fields.string_any(&["Comment", "comment"])?,
        })
    }
}

/// Daily download quota of the current client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadInfo {
    pub ip: String,
    pub downloaded: u64,
    pub remaining: u64,
    pub limit: u64,
    /// `user` or `user_ip`
    pub limit_checked_by: String,
}

impl DownloadInfo {
    pub fn from_record(record: &Record) -> Result<Self> {
        let fields = Fields::new(record, "download limits");
        Ok(Self {
            ip: fields.opt_str("client_ip").unwrap_or_default(),
            downloaded: fields.opt_u64("client_24h_download_count").unwrap_or_default(),
            remaining: fields.u64("client_download_quota")?,
            limit: fields.opt_u64("client_24h_download_limit").unwrap_or_default(),
            limit_checked_by: fields.opt_str("limit_check_by").unwrap_or_default(),
        })
    }
}

/// Service statistics from `ServerInfo`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerInfo {
    pub application: String,
    pub users_online: u64,
    pub users_logged_in: u64,
    pub users_online_peak: u64,
    pub users_registered: u64,
    pub bots_online: u64,
    pub total_subtitles_downloaded: u64,
    pub total_subtitle_files: u64,
    pub total_movies: u64,
    pub daily_download_info: DownloadInfo,
}

impl ServerInfo {
    pub fn from_record(record: &Record) -> Result<Self> {
        let fields = Fields::new(record, "server info");
        let limits = fields.object("download_limits").ok_or_else(|| fields.missing("download_limits"))?;
        Ok(Self {
            application: fields.opt_str("application").unwrap_or_default(),
            users_online: fields.opt_u64("users_online_total").unwrap_or_default(),
            users_logged_in: fields.opt_u64("users_loggedin").unwrap_or_default(),
            users_online_peak: fields.opt_u64("users_max_alltime").unwrap_or_default(),
            users_registered: fields.opt_u64("users_registered").unwrap_or_default(),
            bots_online: fields.opt_u64("users_online_program").unwrap_or_default(),
            total_subtitles_downloaded: fields.opt_u64("subs_downloads").unwrap_or_default(),
            total_subtitle_files: fields.opt_u64("subs_subtitle_files").unwrap_or_default(),
            total_movies: fields.opt_u64("movies_total").unwrap_or_default(),
            daily_download_info: DownloadInfo::from_record(limits)?,
        })
    }
}

/// Everything the service guessed for one title string
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GuessMediaResult {
    pub best_guess: Option<Media>,
    pub from_string: Option<Media>,
    pub from_imdb: Vec<Media>,
}

impl GuessMediaResult {
    pub fn from_record(record: &Record) -> Result<Self> {
        let fields = Fields::new(record, "guess");

        let best_guess = fields.object("BestGuess").map(Media::from_record).transpose()?;

        let from_string = match fields.object("GuessMovieFromString") {
            Some(guesses) => guesses
                .values()
                .filter_map(Value::as_object)
                .next()
                .map(Media::from_record)
                .transpose()?,
            None => None,
        };

        let from_imdb = match fields.object("GetIMDBSuggest") {
            Some(suggestions) => suggestions
                .values()
                .filter_map(Value::as_object)
                .map(Media::from_record)
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            best_guess,
            from_string,
            from_imdb,
        })
    }
}

/// A local media file identified by its fingerprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub fingerprint: String,
    pub size: u64,
    pub dirname: Option<PathBuf>,
    pub filename: Option<PathBuf>,
}

impl MediaFile {
    /// Fingerprint the file at `path`, keeping its location for naming downloads
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let size = std::fs::metadata(path)?.len();
        let fingerprint = fingerprint::fingerprint(path)?;
        Ok(Self {
            fingerprint,
            size,
            dirname: path.parent().map(Path::to_path_buf),
            filename: path.file_name().map(PathBuf::from),
        })
    }

    /// Known fingerprint and size, no local context
    pub fn from_parts(fingerprint: impl Into<String>, size: u64) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            size,
            dirname: None,
            filename: None,
        }
    }

    pub fn with_location(mut self, dirname: Option<PathBuf>, filename: Option<PathBuf>) -> Self {
        self.dirname = dirname;
        self.filename = filename;
        self
    }

    /// Full path when both parts are known
    pub fn path(&self) -> Option<PathBuf> {
        match (&self.dirname, &self.filename) {
            (Some(dir), Some(file)) => Some(dir.join(file)),
            _ => None,
        }
    }
}

/// Anything that carries a subtitle reference and maybe the media it belongs to
pub trait SubtitleContainer {
    fn subtitles(&self) -> &Subtitles;

    /// Media context used for naming downloads
    fn media(&self) -> Option<&Media> {
        None
    }
}

impl SubtitleContainer for Subtitles {
    fn subtitles(&self) -> &Subtitles {
        self
    }
}

impl SubtitleContainer for SearchResult {
    fn subtitles(&self) -> &Subtitles {
        &self.subtitles
    }

    fn media(&self) -> Option<&Media> {
        Some(&self.media)
    }
}
