// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, debug, info, warn};
use std::io::Write;
use std::path::{Path, PathBuf};

use subwire::app_config::{self, Config};
use subwire::client::{AuthClient, Client, SearchQuery};
use subwire::file_utils::FileManager;
use subwire::fingerprint;
use subwire::language::LanguageFormat;
use subwire::models::MediaFile;
use subwire::naming::NameFormatter;
use subwire::ranking::RankOptions;

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for app_config::LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => app_config::LogLevel::Error,
            CliLogLevel::Warn => app_config::LogLevel::Warn,
            CliLogLevel::Info => app_config::LogLevel::Info,
            CliLogLevel::Debug => app_config::LogLevel::Debug,
            CliLogLevel::Trace => app_config::LogLevel::Trace,
        }
    }
}

/// Search options shared by `search` and `download`
#[derive(Parser, Debug)]
struct SearchArgs {
    /// Video files or directories of video files
    #[arg(value_name = "PATH", required = true)]
    paths: Vec<PathBuf>,

    /// Subtitle language as a 2-letter code (e.g., 'en', 'de')
    #[arg(short, long, default_value = "en")]
    lang: String,

    /// Only accept these subtitle formats (e.g., 'srt')
    #[arg(short, long = "format")]
    formats: Vec<String>,

    /// Also consider subtitles reported as bad
    #[arg(long)]
    include_bad: bool,
}

impl SearchArgs {
    fn rank_options(&self) -> RankOptions {
        let options = if self.formats.is_empty() {
            RankOptions::default()
        } else {
            RankOptions::default().with_formats(self.formats.iter().cloned())
        };
        if self.include_bad { options.include_bad() } else { options }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the fingerprint of video files
    Hash {
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,
    },

    /// List the languages the service knows
    Languages {
        /// Only print codes in this format ('2', '3' or 'long')
        #[arg(short, long)]
        format: Option<LanguageFormat>,
    },

    /// Show service statistics and the daily download quota
    ServerInfo,

    /// Find the best subtitles for video files
    Search(SearchArgs),

    /// Find and download the best subtitles for video files
    Download {
        #[command(flatten)]
        search: SearchArgs,

        /// Directory to save into (defaults to next to each video)
        #[arg(short, long)]
        dir: Option<PathBuf>,

        /// File name template, e.g. '{media_name}.{lang_2}.{ext}'
        #[arg(short, long)]
        name_format: Option<String>,
    },

    /// Guess movies or episodes from free-form titles
    Guess {
        #[arg(value_name = "TITLE", required = true)]
        queries: Vec<String>,
    },

    /// Generate shell completions for subwire
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// subwire - subtitle lookup from the command line
///
/// Fingerprints local videos and finds, ranks and downloads matching
/// subtitles from OpenSubtitles.
#[derive(Parser, Debug)]
#[command(name = "subwire")]
#[command(version)]
#[command(about = "Subtitle lookup and download for local video files")]
#[command(long_about = "subwire fingerprints video files and finds matching subtitles on OpenSubtitles.

EXAMPLES:
    subwire hash movie.mkv                          # Print the file fingerprint
    subwire search -l de movie.mkv                  # Best German subtitles for a file
    subwire download -l en -f srt /movies/          # Download English SRTs for a folder
    subwire download -n '{media_name}.{lang_2}.{ext}' movie.mkv
    subwire guess 'the matrix 1999'                 # Guess a title
    subwire completions bash > subwire.bash         # Generate bash completions

CONFIGURATION:
    Settings are read from conf.json in the user config directory, or from the
    file given with --config. Credentials missing from the file are taken from
    OPEN_SUBTITLES_USERNAME, OPEN_SUBTITLES_PASSWORD and OPEN_SUBTITLES_USERAGENT.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Set logging level
    #[arg(long, value_enum, global = true)]
    log_level: Option<CliLogLevel>,
}

// @struct: Custom logger implementation
struct CustomLogger {
    level: LevelFilter,
}

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger { level: LevelFilter::Trace }))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: Prefix and ANSI color for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("❌ ", "1;31"),
            Level::Warn => ("🚧 ", "1;33"),
            Level::Info => (" ", "1;32"),
            Level::Debug => ("🔍 ", "1;36"),
            Level::Trace => ("📋 ", "1;35"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= self.level
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (prefix, color) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                color,
                now,
                prefix,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn main() -> Result<()> {
    // Info until the config says otherwise
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(*shell, &mut cmd, "subwire", &mut std::io::stdout());
        return Ok(());
    }

    let mut config = Config::load_or_default(cli.config.as_deref())?;
    config.apply_process_env();
    if let Some(level) = cli.log_level.clone() {
        config.log_level = level.into();
    }
    config.validate().context("Configuration validation failed")?;
    log::set_max_level(config.log_level.to_level_filter());

    match cli.command {
        Commands::Hash { paths } => run_hash(&paths),
        Commands::Languages { format } => run_languages(&config, format),
        Commands::ServerInfo => run_server_info(&config),
        Commands::Search(args) => run_search(&config, &args),
        Commands::Download { search, dir, name_format } => {
            if let Some(format) = name_format {
                config.download.name_format = format;
            }
            run_download(&config, &search, dir.as_deref())
        }
        Commands::Guess { queries } => run_guess(&config, &queries),
        Commands::Completions { .. } => Ok(()),
    }
}

/// Expand directories into the video files they contain
fn collect_videos(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut videos = Vec::new();
    for path in paths {
        if path.is_dir() {
            let found = FileManager::find_videos(path)?;
            debug!("Found {} video file(s) in {:?}", found.len(), path);
            videos.extend(found);
        } else if FileManager::file_exists(path) {
            videos.push(path.clone());
        } else {
            return Err(anyhow!("Input path does not exist: {:?}", path));
        }
    }
    if videos.is_empty() {
        return Err(anyhow!("No video files found"));
    }
    Ok(videos)
}

fn run_hash(paths: &[PathBuf]) -> Result<()> {
    for path in collect_videos(paths)? {
        let hash = fingerprint::fingerprint(&path).with_context(|| format!("Failed to hash {:?}", path))?;
        println!("{}  {}", hash, path.display());
    }
    Ok(())
}

fn run_languages(config: &Config, format: Option<LanguageFormat>) -> Result<()> {
    let client = Client::from_config(config)?;
    let languages = client.languages()?;
    for (lang_2, lang_3, lang_long) in languages {
        match format {
            Some(LanguageFormat::Lang2) => println!("{}", lang_2),
            Some(LanguageFormat::Lang3) => println!("{}", lang_3),
            Some(LanguageFormat::LangLong) => println!("{}", lang_long),
            None => println!("{:<4}{:<5}{}", lang_2, lang_3, lang_long),
        }
    }
    Ok(())
}

fn run_server_info(config: &Config) -> Result<()> {
    let info = Client::from_config(config)?.server_info()?;
    let quota = &info.daily_download_info;
    println!("{}", info.application);
    println!("Users online: {} ({} logged in)", info.users_online, info.users_logged_in);
    println!("Subtitle files: {}", info.total_subtitle_files);
    println!("Movies: {}", info.total_movies);
    println!(
        "Downloads today: {} of {} ({} remaining, checked by {})",
        quota.downloaded, quota.limit, quota.remaining, quota.limit_checked_by
    );
    Ok(())
}

fn search_queries(paths: &[PathBuf], lang: &str) -> Result<Vec<(SearchQuery, String)>> {
    collect_videos(paths)?
        .iter()
        .map(|path| -> Result<(SearchQuery, String)> {
            let file = MediaFile::open(path).with_context(|| format!("Failed to fingerprint {:?}", path))?;
            Ok((SearchQuery::File(file), lang.to_string()))
        })
        .collect()
}

fn run_search(config: &Config, args: &SearchArgs) -> Result<()> {
    let queries = search_queries(&args.paths, &args.lang)?;
    let client = AuthClient::from_config(config)?;
    let results = client.search_subtitles(&queries, &args.rank_options());

    // Log out even when the search failed
    let logout = client.logout();
    let results = results?;
    logout?;

    for ((query, _), result) in queries.iter().zip(results) {
        let SearchQuery::File(file) = query else { continue };
        let name = file.filename.as_deref().unwrap_or(Path::new("?")).display();
        match result {
            Some(result) => println!(
                "{}: {} ({}, {} downloads, score {:.1})",
                name,
                result.subtitles.filename.display(),
                result.media.name,
                result.num_downloads,
                result.score
            ),
            None => println!("{}: no subtitles found", name),
        }
    }
    Ok(())
}

fn run_download(config: &Config, args: &SearchArgs, dir: Option<&Path>) -> Result<()> {
    let formatter = NameFormatter::new(config.download.name_format.clone())?;
    let queries = search_queries(&args.paths, &args.lang)?;
    let client = AuthClient::from_config(config)?;

    let outcome = (|| -> Result<Vec<PathBuf>> {
        let found: Vec<_> = client
            .search_subtitles(&queries, &args.rank_options())?
            .into_iter()
            .flatten()
            .collect();
        if found.len() < queries.len() {
            warn!("No subtitles found for {} file(s)", queries.len() - found.len());
        }
        Ok(client.download_subtitles(&found, dir, &formatter)?)
    })();

    let logout = client.logout();
    let saved = outcome?;
    logout?;

    info!("Downloaded {} subtitle file(s)", saved.len());
    for path in saved {
        println!("{}", path.display());
    }
    Ok(())
}

fn run_guess(config: &Config, queries: &[String]) -> Result<()> {
    let client = AuthClient::from_config(config)?;
    let guesses = client.guess_media(queries);
    let logout = client.logout();
    let guesses = guesses?;
    logout?;

    for (query, guess) in queries.iter().zip(guesses) {
        match guess {
            Some(media) => println!(
                "{}: {} ({}) imdb {}",
                query,
                media.name,
                media.year.map_or_else(|| "?".to_string(), |y| y.to_string()),
                media.imdb_id
            ),
            None => println!("{}: no guess", query),
        }
    }
    Ok(())
}
