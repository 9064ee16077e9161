/*!
 * Named remote operations exposed by the subtitle service.
 */

use std::fmt;

/// Static per-endpoint behavior the dispatcher relies on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointMeta {
    /// Whether the session token is prepended to the parameters
    pub requires_token: bool,
    /// Whether a successful response carries a `status` field
    pub reports_status: bool,
}

impl EndpointMeta {
    const AUTHENTICATED: Self = Self { requires_token: true, reports_status: true };
    const TOKENLESS: Self = Self { requires_token: false, reports_status: true };
    const TOKENLESS_SILENT: Self = Self { requires_token: false, reports_status: false };
}

/// Every remote procedure the service exposes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    AddComment,
    AddRequest,
    AutoUpdate,
    CheckMovieHash,
    CheckMovieHash2,
    CheckSubHash,
    DetectLanguage,
    DownloadSubtitles,
    GetAvailableTranslations,
    GetComments,
    GetImdbMovieDetails,
    GetSubLanguages,
    GetTranslation,
    GetUserInfo,
    GuessMovieFromString,
    InsertMovie,
    InsertMovieHash,
    LogIn,
    LogOut,
    NoOperation,
    PreviewSubtitles,
    QuickSuggest,
    ReportWrongImdbMovie,
    ReportWrongMovieHash,
    SearchMoviesOnImdb,
    SearchSubtitles,
    SearchToMail,
    SetSubscribeUrl,
    ServerInfo,
    SubscribeToHash,
    SubtitlesVote,
    SuggestMovie,
    TryUploadSubtitles,
    UploadSubtitles,
}

impl Endpoint {
    /// Method name on the wire
    pub fn method_name(self) -> &'static str {
        match self {
            Self::AddComment => "AddComment",
            Self::AddRequest => "AddRequest",
            Self::AutoUpdate => "AutoUpdate",
            Self::CheckMovieHash => "CheckMovieHash",
            Self::CheckMovieHash2 => "CheckMovieHash2",
            Self::CheckSubHash => "CheckSubHash",
            Self::DetectLanguage => "DetectLanguage",
            Self::DownloadSubtitles => "DownloadSubtitles",
            Self::GetAvailableTranslations => "GetAvailableTranslations",
            Self::GetComments => "GetComments",
            Self::GetImdbMovieDetails => "GetIMDBMovieDetails",
            Self::GetSubLanguages => "GetSubLanguages",
            Self::GetTranslation => "GetTranslation",
            Self::GetUserInfo => "GetUserInfo",
            Self::GuessMovieFromString => "GuessMovieFromString",
            Self::InsertMovie => "InsertMovie",
            Self::InsertMovieHash => "InsertMovieHash",
            Self::LogIn => "LogIn",
            Self::LogOut => "LogOut",
            Self::NoOperation => "NoOperation",
            Self::PreviewSubtitles => "PreviewSubtitles",
            Self::QuickSuggest => "QuickSuggest",
            Self::ReportWrongImdbMovie => "ReportWrongImdbMovie",
            Self::ReportWrongMovieHash => "ReportWrongMovieHash",
            Self::SearchMoviesOnImdb => "SearchMoviesOnIMDB",
            Self::SearchSubtitles => "SearchSubtitles",
            Self::SearchToMail => "SearchToMail",
            Self::SetSubscribeUrl => "SetSubscribeUrl",
            Self::ServerInfo => "ServerInfo",
            Self::SubscribeToHash => "SubscribeToHash",
            Self::SubtitlesVote => "SubtitlesVote",
            Self::SuggestMovie => "SuggestMovie",
            Self::TryUploadSubtitles => "TryUploadSubtitles",
            Self::UploadSubtitles => "UploadSubtitles",
        }
    }

    /// Token and status behavior, fixed per endpoint
    pub fn meta(self) -> EndpointMeta {
        match self {
            Self::GetSubLanguages | Self::ServerInfo => EndpointMeta::TOKENLESS_SILENT,
            Self::AutoUpdate | Self::LogIn => EndpointMeta::TOKENLESS,
            _ => EndpointMeta::AUTHENTICATED,
        }
    }

    pub fn requires_token(self) -> bool {
        self.meta().requires_token
    }

    pub fn reports_status(self) -> bool {
        self.meta().reports_status
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.method_name())
    }
}
