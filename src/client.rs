/*!
 * Client facade.
 *
 * `Client` covers the calls that need no session. `AuthClient` owns a session
 * token from `LogIn` until `logout` and exposes the domain operations, each
 * going through the dispatcher and, where the service caps request sizes, the
 * batcher.
 */

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};

use crate::app_config::{Config, PASSWORD_ENV, USERAGENT_ENV, USERNAME_ENV};
use crate::batch::{self, BatchLimits};
use crate::errors::{ClientError, Result};
use crate::file_utils::FileManager;
use crate::fingerprint;
use crate::language::{LanguageConverter, LanguageFormat};
use crate::models::{
    Comment, DownloadInfo, FullUser, GuessMediaResult, Media, MediaFile, MediaKind, SearchResult, ServerInfo,
    SubtitleContainer,
};
use crate::naming::{NameFormatter, NamingContext};
use crate::ranking::{self, RankOptions};
use crate::rpc::http::HttpTransport;
use crate::rpc::{Dispatcher, Endpoint, Record, Value};

/// HTTP user agent when the config doesn't name one
const FALLBACK_HTTP_AGENT: &str = concat!("subwire/", env!("CARGO_PKG_VERSION"));

/// Client for calls that don't need a session
#[derive(Debug, Clone)]
pub struct Client {
    dispatcher: Dispatcher,
    languages: Arc<LanguageConverter>,
}

impl Client {
    /// Client sharing the process-wide language cache
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            languages: LanguageConverter::global(),
        }
    }

    /// Client speaking HTTP to the configured endpoint
    pub fn from_config(config: &Config) -> Result<Self> {
        let agent = config.useragent.as_deref().unwrap_or(FALLBACK_HTTP_AGENT);
        let transport = HttpTransport::new(&config.api_url, agent, config.http_timeout())?;
        let dispatcher = Dispatcher::new(Arc::new(transport)).with_policy(config.retry.policy())?;
        Ok(Self::new(dispatcher))
    }

    /// Use `converter` instead of the shared language cache
    pub fn with_language_converter(mut self, converter: Arc<LanguageConverter>) -> Self {
        self.languages = converter;
        self
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn language_converter(&self) -> &LanguageConverter {
        &self.languages
    }

    /// Convert a language code, refreshing the cached table if stale
    pub fn convert_language(&self, code: &str, from: LanguageFormat, to: LanguageFormat) -> Result<String> {
        self.languages.convert(&self.dispatcher, code, from, to)
    }

    /// Supported languages as `(lang_2, lang_3, lang_long)`
    pub fn languages(&self) -> Result<Vec<(String, String, String)>> {
        let table = self.languages.table(&self.dispatcher)?;
        Ok(table
            .entries()
            .map(|(l2, l3, long)| (l2.to_string(), l3.to_string(), long.to_string()))
            .collect())
    }

    pub fn server_info(&self) -> Result<ServerInfo> {
        let response = self.dispatcher.dispatch(Endpoint::ServerInfo, None, Vec::new())?;
        ServerInfo::from_record(&response)
    }

    /// Download quota of this client for the current day
    pub fn daily_download_info(&self) -> Result<DownloadInfo> {
        Ok(self.server_info()?.daily_download_info)
    }

    /// Version and download info published for `program`
    pub fn auto_update(&self, program: &str) -> Result<Record> {
        self.dispatcher
            .dispatch(Endpoint::AutoUpdate, None, vec![Value::from(program)])
    }
}

/// Login details
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub useragent: String,
    /// 2-letter interface language
    pub language: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>, useragent: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            useragent: useragent.into(),
            language: "en".to_string(),
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Take credentials from `config`, falling back to `lookup` for missing values
    pub fn resolve<F>(config: &Config, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pick = |configured: &Option<String>, key: &str| {
            configured
                .clone()
                .filter(|v| !v.is_empty())
                .or_else(|| lookup(key).filter(|v| !v.is_empty()))
        };

        let username = pick(&config.username, USERNAME_ENV).ok_or_else(|| {
            ClientError::Auth(format!("missing username, set it in the config or the {} env var", USERNAME_ENV))
        })?;
        let password = pick(&config.password, PASSWORD_ENV).ok_or_else(|| {
            ClientError::Auth(format!("missing password, set it in the config or the {} env var", PASSWORD_ENV))
        })?;
        let useragent = pick(&config.useragent, USERAGENT_ENV).ok_or_else(|| {
            ClientError::Auth(format!(
                "missing useragent, set it in the config or the {} env var. A useragent must be registered \
                 for your app, see https://trac.opensubtitles.org/projects/opensubtitles/wiki/DevReadFirst",
                USERAGENT_ENV
            ))
        })?;

        Ok(Self::new(username, password, useragent).with_language(config.language.clone()))
    }

    /// [`resolve`](Self::resolve) against the process environment
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::resolve(config, |key| std::env::var(key).ok())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("useragent", &self.useragent)
            .field("language", &self.language)
            .finish()
    }
}

/// What to look subtitles up by
#[derive(Debug, Clone, PartialEq)]
pub enum SearchQuery {
    /// Local file, matched by fingerprint and size
    File(MediaFile),
    /// Known movie or episode, matched by IMDb id
    Media(Media),
}

impl SearchQuery {
    /// Local file context carried onto results
    fn location(&self) -> (Option<PathBuf>, Option<PathBuf>) {
        match self {
            Self::File(file) => (file.dirname.clone(), file.filename.clone()),
            Self::Media(media) => (media.dirname.clone(), media.filename.clone()),
        }
    }

    fn to_request(&self, lang_3: &str) -> Result<Value> {
        let mut request = Record::new();
        request.insert("sublanguageid".to_string(), Value::from(lang_3));

        match self {
            Self::File(file) => {
                request.insert("moviehash".to_string(), Value::from(file.fingerprint.as_str()));
                request.insert("moviebytesize".to_string(), Value::from(file.size.to_string()));
            }
            Self::Media(media) => {
                request.insert("imdbid".to_string(), Value::from(media.imdb_id.as_str()));
                match media.kind {
                    MediaKind::Movie => {}
                    MediaKind::Episode => {
                        if let (Some(season), Some(episode)) = (media.season, media.episode) {
                            request.insert("season".to_string(), Value::from(season));
                            request.insert("episode".to_string(), Value::from(episode));
                        }
                    }
                    MediaKind::TvSeries => {
                        return Err(ClientError::InvalidInput(format!(
                            "'{}' is a TV series; search one of its episodes instead",
                            media.name
                        )));
                    }
                }
            }
        }

        Ok(Value::Object(request))
    }
}

impl From<MediaFile> for SearchQuery {
    fn from(file: MediaFile) -> Self {
        Self::File(file)
    }
}

impl From<Media> for SearchQuery {
    fn from(media: Media) -> Self {
        Self::Media(media)
    }
}

/// Client holding a live session
#[derive(Debug)]
pub struct AuthClient {
    client: Client,
    token: Option<String>,
    limits: BatchLimits,
    atomic_downloads: bool,
}

impl AuthClient {
    /// Open a session for `credentials`
    pub fn login(client: Client, credentials: &Credentials) -> Result<Self> {
        let response = client.dispatcher.dispatch(
            Endpoint::LogIn,
            None,
            vec![
                Value::from(credentials.username.as_str()),
                Value::from(credentials.password.as_str()),
                Value::from(credentials.language.as_str()),
                Value::from(credentials.useragent.as_str()),
            ],
        )?;

        let token = response
            .get("token")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ClientError::LibraryContract("LogIn succeeded without a token".to_string()))?
            .to_string();

        let limits = BatchLimits::for_useragent(&credentials.useragent);
        if limits == BatchLimits::restricted() {
            warn!("Development useragent in use, requests are limited to one item each");
        }
        info!("Logged in as {}", credentials.username);

        Ok(Self {
            client,
            token: Some(token),
            limits,
            atomic_downloads: true,
        })
    }

    /// Build the HTTP client and log in with the configured credentials
    pub fn from_config(config: &Config) -> Result<Self> {
        let credentials = Credentials::from_config(config)?;
        let client = Client::from_config(config)?;
        Ok(Self::login(client, &credentials)?.with_atomic_downloads(config.download.atomic))
    }

    /// End the session
    pub fn logout(mut self) -> Result<()> {
        self.request(Endpoint::LogOut, Vec::new())?;
        self.token = None;
        info!("Logged out");
        Ok(())
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    /// Session-less operations on the same connection
    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn limits(&self) -> BatchLimits {
        self.limits
    }

    pub fn with_limits(mut self, limits: BatchLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_atomic_downloads(mut self, atomic: bool) -> Self {
        self.atomic_downloads = atomic;
        self
    }

    fn request(&self, endpoint: Endpoint, params: Vec<Value>) -> Result<Record> {
        self.client.dispatcher.dispatch(endpoint, self.token.as_deref(), params)
    }

    /// Keep the session alive; it expires after 15 idle minutes
    pub fn ping(&self) -> Result<()> {
        self.request(Endpoint::NoOperation, Vec::new()).map(|_| ())
    }

    pub fn user_info(&self) -> Result<FullUser> {
        let response = self.request(Endpoint::GetUserInfo, Vec::new())?;
        let data = data_object(&response, Endpoint::GetUserInfo)?;
        FullUser::from_record(data)
    }

    /// Every candidate for each `(query, lang_2)` pair, grouped in query order
    ///
    /// All languages are validated before any search request is sent.
    pub fn search_subtitles_unranked(&self, queries: &[(SearchQuery, String)]) -> Result<Vec<Vec<Record>>> {
        for (_, lang_2) in queries {
            let known = self
                .client
                .languages
                .contains(&self.client.dispatcher, lang_2, LanguageFormat::Lang2)?;
            if !known {
                return Err(ClientError::LanguageNotFound {
                    code: lang_2.clone(),
                    format: LanguageFormat::Lang2.to_string(),
                });
            }
        }

        batch::batch(queries, self.limits.search, |chunk| self.search_chunk(chunk).map(Some))
    }

    fn search_chunk(&self, queries: &[(SearchQuery, String)]) -> Result<Vec<Vec<Record>>> {
        let mut requests = Vec::with_capacity(queries.len());
        for (query, lang_2) in queries {
            let lang_3 = self
                .client
                .convert_language(lang_2, LanguageFormat::Lang2, LanguageFormat::Lang3)?;
            requests.push(query.to_request(&lang_3)?);
        }

        let response = self.request(Endpoint::SearchSubtitles, vec![Value::Array(requests)])?;

        // Hits come back in arbitrary order, tagged with their query's index
        let mut groups = vec![Vec::new(); queries.len()];
        if let Some(Value::Array(hits)) = response.get("data") {
            for hit in hits {
                let record = hit.as_object().ok_or_else(|| {
                    ClientError::LibraryContract(format!("SearchSubtitles returned a non-struct hit: {}", hit))
                })?;
                let index = query_number(record)?;
                let group = groups.get_mut(index).ok_or_else(|| {
                    ClientError::LibraryContract(format!(
                        "SearchSubtitles answered query {} of a {} query request",
                        index,
                        queries.len()
                    ))
                })?;
                group.push(record.clone());
            }
        }

        debug!(
            "SearchSubtitles returned {} hits for {} queries",
            groups.iter().map(Vec::len).sum::<usize>(),
            queries.len()
        );
        Ok(groups)
    }

    /// Best result per query, `None` where nothing survived ranking
    pub fn search_subtitles(
        &self,
        queries: &[(SearchQuery, String)],
        options: &RankOptions,
    ) -> Result<Vec<Option<SearchResult>>> {
        self.search_subtitles_with(queries, |group, query| {
            ranking::rank_search_subtitles(group, query, options)
        })
    }

    /// Like [`search_subtitles`](Self::search_subtitles) with a custom ranking policy
    ///
    /// `rank` sees each query's raw hits in service order along with the query.
    pub fn search_subtitles_with<F>(
        &self,
        queries: &[(SearchQuery, String)],
        rank: F,
    ) -> Result<Vec<Option<SearchResult>>>
    where
        F: for<'r> Fn(&'r [Record], &SearchQuery) -> Option<&'r Record>,
    {
        let groups = self.search_subtitles_unranked(queries)?;

        groups
            .iter()
            .zip(queries)
            .map(|(group, (query, _))| -> Result<Option<SearchResult>> {
                let Some(best) = rank(group, query) else {
                    return Ok(None);
                };
                let mut result = SearchResult::from_record(best)?;
                let (dirname, filename) = query.location();
                result.media = result.media.with_location(dirname, filename);
                Ok(Some(result))
            })
            .collect()
    }

    /// Download and save subtitles, returning where each one was written
    ///
    /// Destinations are resolved and the daily quota checked before anything is
    /// downloaded. A failure mid-way leaves the files of earlier chunks in place.
    pub fn download_subtitles<T: SubtitleContainer>(
        &self,
        items: &[T],
        download_dir: Option<&Path>,
        formatter: &NameFormatter,
    ) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::with_capacity(items.len());
        for item in items {
            let subtitles = item.subtitles();
            let media = item.media();
            let lang_3 = self
                .client
                .convert_language(&subtitles.lang_2, LanguageFormat::Lang2, LanguageFormat::Lang3)?;
            let lang_long = self
                .client
                .convert_language(&subtitles.lang_2, LanguageFormat::Lang2, LanguageFormat::LangLong)?;

            let context = NamingContext {
                subtitles,
                lang_3: &lang_3,
                lang_long: &lang_long,
                media_filename: media.and_then(|m| m.filename.as_deref()),
                media_dirname: media.and_then(|m| m.dirname.as_deref()),
            };
            paths.push(formatter.generate(&context, download_dir)?);
        }

        if items.is_empty() {
            return Ok(paths);
        }

        let remaining = self.client.daily_download_info()?.remaining;
        if remaining < items.len() as u64 {
            return Err(ClientError::Download(format!(
                "not enough daily downloads remaining ({} < {})",
                remaining,
                items.len()
            )));
        }

        let _: Vec<()> = batch::batch_pairs(items, &paths, self.limits.download, |items, paths| {
            self.download_chunk(items, paths)?;
            Ok(None)
        })?;

        Ok(paths)
    }

    fn download_chunk<T: SubtitleContainer>(&self, items: &[T], paths: &[PathBuf]) -> Result<()> {
        let ids = items
            .iter()
            .map(|item| Value::from(item.subtitles().file_id.as_str()))
            .collect();
        let response = self.request(Endpoint::DownloadSubtitles, vec![Value::Array(ids)])?;

        let files = data_array(&response, Endpoint::DownloadSubtitles)?;
        if files.len() != items.len() {
            return Err(ClientError::LibraryContract(format!(
                "DownloadSubtitles returned {} files for {} requested",
                files.len(),
                items.len()
            )));
        }

        for (file, path) in files.iter().zip(paths) {
            let encoded = file.get("data").and_then(Value::as_str).ok_or_else(|| {
                ClientError::LibraryContract("DownloadSubtitles entry is missing 'data'".to_string())
            })?;
            let content = FileManager::decode_payload(encoded)?;
            FileManager::write_bytes(path, &content, self.atomic_downloads)?;
            info!("Saved subtitles to {:?}", path);
        }
        Ok(())
    }

    /// Text previews that don't count against the download quota
    pub fn preview_subtitles<T: SubtitleContainer>(&self, items: &[T]) -> Result<Vec<String>> {
        let ids: Vec<String> = items.iter().map(|i| i.subtitles().file_id.clone()).collect();
        batch::batch(&ids, self.limits.preview, |chunk| self.preview_chunk(chunk).map(Some))
    }

    fn preview_chunk(&self, ids: &[String]) -> Result<Vec<String>> {
        let params = ids.iter().map(|id| Value::from(id.as_str())).collect();
        let response = self.request(Endpoint::PreviewSubtitles, vec![Value::Array(params)])?;

        data_array(&response, Endpoint::PreviewSubtitles)?
            .iter()
            .map(|preview| -> Result<String> {
                let contents = preview.get("contents").and_then(Value::as_str).ok_or_else(|| {
                    ClientError::LibraryContract("PreviewSubtitles entry is missing 'contents'".to_string())
                })?;
                let encoding = preview.get("encoding").and_then(Value::as_str).unwrap_or("UTF-8");
                let bytes = FileManager::decode_payload(contents)?;
                Ok(FileManager::decode_text(&bytes, encoding))
            })
            .collect()
    }

    /// Comments for each item, in input order; empty when there are none
    pub fn get_comments<T: SubtitleContainer>(&self, items: &[T]) -> Result<Vec<Vec<Comment>>> {
        let ids: Vec<String> = items.iter().map(|i| i.subtitles().id.clone()).collect();
        batch::batch(&ids, self.limits.comments, |chunk| self.comments_chunk(chunk).map(Some))
    }

    fn comments_chunk(&self, ids: &[String]) -> Result<Vec<Vec<Comment>>> {
        let params = ids.iter().map(|id| Value::from(id.as_str())).collect();
        let response = self.request(Endpoint::GetComments, vec![Value::Array(params)])?;

        let mut groups = vec![Vec::new(); ids.len()];
        // No comments at all comes back as `false` or an empty list
        let Some(Value::Object(by_id)) = response.get("data") else {
            return Ok(groups);
        };

        for (key, raw_comments) in by_id {
            // Keys are the subtitle id with a leading underscore
            let id = key.strip_prefix('_').unwrap_or(key);
            let comments = match raw_comments {
                Value::Array(list) => list
                    .iter()
                    .filter_map(Value::as_object)
                    .map(Comment::from_record)
                    .collect::<Result<Vec<_>>>()?,
                _ => Vec::new(),
            };

            let mut matched = false;
            for (index, _) in ids.iter().enumerate().filter(|(_, requested)| *requested == id) {
                groups[index] = comments.clone();
                matched = true;
            }
            if !matched {
                return Err(ClientError::LibraryContract(format!(
                    "GetComments returned comments for unrequested subtitles '{}'",
                    key
                )));
            }
        }

        Ok(groups)
    }

    pub fn add_comment<T: SubtitleContainer>(&self, item: &T, text: &str, bad: bool) -> Result<()> {
        let id = item.subtitles().id.as_str();
        self.request(Endpoint::AddComment, vec![Value::from(id), Value::from(text), Value::from(bad)])
            .map(|_| ())
    }

    /// Rate subtitles from 1 to 10
    pub fn vote<T: SubtitleContainer>(&self, item: &T, score: u8) -> Result<()> {
        if !(1..=10).contains(&score) {
            return Err(ClientError::InvalidInput(format!(
                "subtitle vote must be between 1 and 10, got {}",
                score
            )));
        }
        let id = item.subtitles().id.as_str();
        self.request(Endpoint::SubtitlesVote, vec![Value::from(id), Value::from(score)])
            .map(|_| ())
    }

    /// Report subtitles as wrongly matched to the file they were found by
    pub fn report_media<T: SubtitleContainer>(&self, item: &T) -> Result<()> {
        let sub_to_movie_id = item.subtitles().sub_to_movie_id.as_deref().ok_or_else(|| {
            ClientError::InvalidInput(
                "only subtitles matched by a file fingerprint search can be reported".to_string(),
            )
        })?;
        self.request(Endpoint::ReportWrongMovieHash, vec![Value::from(sub_to_movie_id)])
            .map(|_| ())
    }

    fn guess_raw<S: AsRef<str>>(&self, queries: &[S]) -> Result<Vec<Record>> {
        batch::batch(queries, self.limits.guess, |chunk| self.guess_chunk(chunk).map(Some))
    }

    fn guess_chunk<S: AsRef<str>>(&self, queries: &[S]) -> Result<Vec<Record>> {
        let params = queries.iter().map(|q| Value::from(q.as_ref())).collect();
        let response = self.request(Endpoint::GuessMovieFromString, vec![Value::Array(params)])?;
        let data = response.get("data").and_then(Value::as_object);

        queries
            .iter()
            .map(|query| {
                let query = query.as_ref();
                match data.and_then(|d| d.get(query)) {
                    Some(Value::Object(guess)) => Ok(guess.clone()),
                    // The service silently drops empty queries
                    _ if query.is_empty() => Ok(Record::new()),
                    _ => Err(ClientError::LibraryContract(format!(
                        "GuessMovieFromString returned nothing for '{}'",
                        query
                    ))),
                }
            })
            .collect()
    }

    /// Everything the service guessed for each title string
    pub fn guess_media_unranked<S: AsRef<str>>(&self, queries: &[S]) -> Result<Vec<GuessMediaResult>> {
        self.guess_raw(queries)?
            .iter()
            .map(GuessMediaResult::from_record)
            .collect()
    }

    /// The service's best guess for each title string
    pub fn guess_media<S: AsRef<str>>(&self, queries: &[S]) -> Result<Vec<Option<Media>>> {
        self.guess_media_with(queries, ranking::rank_guess_media)
    }

    /// Like [`guess_media`](Self::guess_media) picking from each raw guess with `rank`
    pub fn guess_media_with<S, F>(&self, queries: &[S], rank: F) -> Result<Vec<Option<Media>>>
    where
        S: AsRef<str>,
        F: for<'r> Fn(&'r Record, &str) -> Option<&'r Record>,
    {
        self.guess_raw(queries)?
            .iter()
            .zip(queries)
            .map(|(guess, query)| rank(guess, query.as_ref()).map(Media::from_record).transpose())
            .collect()
    }

    /// Titles the service suggests for `query`
    pub fn suggest_media(&self, query: &str) -> Result<Vec<Media>> {
        let response = self.request(Endpoint::SuggestMovie, vec![Value::from(query)])?;

        // No suggestions comes back as an empty list instead of a struct
        let Some(Value::Object(by_query)) = response.get("data") else {
            return Ok(Vec::new());
        };
        match by_query.get(query) {
            Some(Value::Array(suggestions)) => suggestions
                .iter()
                .filter_map(Value::as_object)
                .map(Media::from_record)
                .collect(),
            _ => Ok(Vec::new()),
        }
    }

    /// Subtitle ids known for local subtitle files, `None` when unknown
    pub fn check_subtitles<P: AsRef<Path>>(&self, paths: &[P]) -> Result<Vec<Option<String>>> {
        let hashes = paths
            .iter()
            .map(fingerprint::md5_file)
            .collect::<Result<Vec<_>>>()?;

        let params = hashes.iter().map(|h| Value::from(h.as_str())).collect();
        let response = self.request(Endpoint::CheckSubHash, vec![Value::Array(params)])?;
        let data = response.get("data").and_then(Value::as_object);

        Ok(hashes
            .iter()
            .map(|hash| {
                let id = match data.and_then(|d| d.get(hash)) {
                    Some(Value::String(id)) => id.clone(),
                    Some(Value::Number(id)) => id.to_string(),
                    _ => return None,
                };
                (id != "0").then_some(id)
            })
            .collect())
    }
}

fn data_object(response: &Record, endpoint: Endpoint) -> Result<&Record> {
    response
        .get("data")
        .and_then(Value::as_object)
        .ok_or_else(|| ClientError::LibraryContract(format!("{} returned no data", endpoint)))
}

fn data_array(response: &Record, endpoint: Endpoint) -> Result<&Vec<Value>> {
    response
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| ClientError::LibraryContract(format!("{} returned no data", endpoint)))
}

fn query_number(record: &Record) -> Result<usize> {
    let index = match record.get("QueryNumber") {
        Some(Value::String(n)) => n.trim().parse().ok(),
        Some(Value::Number(n)) => n.as_u64().and_then(|n| usize::try_from(n).ok()),
        _ => None,
    };
    index.ok_or_else(|| ClientError::LibraryContract("search hit without a valid QueryNumber".to_string()))
}
