/*!
 * File names for downloaded subtitles.
 *
 * A name format is a template with `{placeholder}` fields; `{{` and `}}`
 * produce literal braces.
 *
 * Placeholders:
 * - `media_name`: local media file name without extension
 * - `lang_2`, `lang_3`, `lang_long`: subtitle language in each format
 * - `ext`: subtitle format, e.g. `srt`
 * - `upload_name`: uploaded subtitle file name without extension
 * - `upload_filename`: uploaded subtitle file name
 */

use std::path::{Component, Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::errors::{ClientError, Result};
use crate::models::Subtitles;

/// Default format: keep the uploader's file name
pub const DEFAULT_NAME_FORMAT: &str = "{upload_filename}";

const PLACEHOLDERS: [&str; 7] = [
    "media_name",
    "lang_2",
    "lang_3",
    "lang_long",
    "ext",
    "upload_name",
    "upload_filename",
];

static TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{|\}\}|\{([^{}]*)\}").expect("placeholder pattern is a valid regex"));

/// Everything a name can be built from
#[derive(Debug, Clone)]
pub struct NamingContext<'a> {
    pub subtitles: &'a Subtitles,
    pub lang_3: &'a str,
    pub lang_long: &'a str,
    /// Local media file name, if the subtitles came from a file search
    pub media_filename: Option<&'a Path>,
    /// Directory of the local media file
    pub media_dirname: Option<&'a Path>,
}

/// Renders download paths from a name format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameFormatter {
    format: String,
}

impl NameFormatter {
    /// Validate `format` and build a formatter for it
    pub fn new(format: impl Into<String>) -> Result<Self> {
        let format = format.into();
        for captures in TOKEN.captures_iter(&format) {
            if let Some(name) = captures.get(1) {
                if !PLACEHOLDERS.contains(&name.as_str()) {
                    return Err(ClientError::InvalidInput(format!(
                        "unknown placeholder '{{{}}}' in name format '{}'",
                        name.as_str(),
                        format
                    )));
                }
            }
        }
        Ok(Self { format })
    }

    pub fn format(&self) -> &str {
        &self.format
    }

    /// Whether the format needs the local media file name
    pub fn uses_media_name(&self) -> bool {
        TOKEN
            .captures_iter(&self.format)
            .any(|c| c.get(1).is_some_and(|m| m.as_str() == "media_name"))
    }

    /// Full destination path for one download
    ///
    /// Files go into `download_dir` when given, else next to the media file.
    pub fn generate(&self, context: &NamingContext<'_>, download_dir: Option<&Path>) -> Result<PathBuf> {
        let dir = download_dir.or(context.media_dirname).ok_or_else(|| {
            ClientError::Download(format!(
                "insufficient context: set a download directory or the media directory for '{}'",
                context.subtitles.filename.display()
            ))
        })?;

        let media_name = match context.media_filename {
            Some(filename) => Some(stem(filename)),
            None if self.uses_media_name() => {
                return Err(ClientError::Download(format!(
                    "insufficient context: '{{media_name}}' needs the media file name for '{}'",
                    context.subtitles.filename.display()
                )));
            }
            None => None,
        };

        // Service-supplied values never contribute more than one path component
        let upload_filename = last_component(&context.subtitles.filename.to_string_lossy());
        let upload_name = stem(Path::new(&upload_filename));

        let value = |name: &str| -> String {
            match name {
                "media_name" => media_name.clone().unwrap_or_default(),
                "lang_2" => last_component(&context.subtitles.lang_2),
                "lang_3" => last_component(context.lang_3),
                "lang_long" => last_component(context.lang_long),
                "ext" => last_component(&context.subtitles.ext),
                "upload_name" => upload_name.clone(),
                _ => upload_filename.clone(),
            }
        };

        let name = self.render(value);
        if !is_contained(&name) {
            return Err(ClientError::Download(format!(
                "refusing to write '{}' outside of '{}' for '{}'",
                name,
                dir.display(),
                context.subtitles.filename.display()
            )));
        }
        Ok(dir.join(name))
    }

    fn render(&self, value: impl Fn(&str) -> String) -> String {
        let mut out = String::with_capacity(self.format.len());
        let mut last = 0;
        for captures in TOKEN.captures_iter(&self.format) {
            let Some(whole) = captures.get(0) else { continue };
            out.push_str(&self.format[last..whole.start()]);
            match (whole.as_str(), captures.get(1)) {
                ("{{", _) => out.push('{'),
                ("}}", _) => out.push('}'),
                (_, Some(name)) => out.push_str(&value(name.as_str())),
                _ => {}
            }
            last = whole.end();
        }
        out.push_str(&self.format[last..]);
        out
    }
}

impl Default for NameFormatter {
    fn default() -> Self {
        Self {
            format: DEFAULT_NAME_FORMAT.to_string(),
        }
    }
}

fn stem(path: &Path) -> String {
    path.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_default()
}

/// Last `/` or `\` separated segment of `value`; `.` and `..` become empty
fn last_component(value: &str) -> String {
    let last = value.rsplit(['/', '\\']).next().unwrap_or_default();
    match last {
        "." | ".." => String::new(),
        _ => last.to_string(),
    }
}

/// A non-empty relative path made only of plain components
fn is_contained(name: &str) -> bool {
    let path = Path::new(name);
    !name.contains('\\')
        && path.file_name().is_some()
        && path.components().all(|c| matches!(c, Component::Normal(_)))
}
