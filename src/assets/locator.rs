use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Where a source clip lives: a local file or a network URL `ffmpeg` can open.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum SourceLocator {
    /// Local filesystem path.
    Path(PathBuf),
    /// `http(s)://` or other URL understood by `ffmpeg`.
    Url(String),
}

const URL_SCHEMES: &[&str] = &["http://", "https://", "rtmp://", "rtsp://", "s3://"];

impl SourceLocator {
    /// Parse a user-supplied locator. Blank input yields `None`.
    ///
    /// `file://` URLs are treated as local paths.
    pub fn parse(raw: &str) -> Option<Self> {
        let s = raw.trim();
        if s.is_empty() {
            return None;
        }
        if let Some(rest) = s.strip_prefix("file://") {
            return (!rest.is_empty()).then(|| Self::Path(PathBuf::from(rest)));
        }
        let lower = s.to_ascii_lowercase();
        if URL_SCHEMES.iter().any(|scheme| lower.starts_with(scheme)) {
            return Some(Self::Url(s.to_string()));
        }
        Some(Self::Path(PathBuf::from(s)))
    }

    /// Local path, when the clip is on disk.
    pub fn local_path(&self) -> Option<&Path> {
        match self {
            Self::Path(p) => Some(p),
            Self::Url(_) => None,
        }
    }

    /// Argument to hand to `ffmpeg -i`.
    pub fn as_ffmpeg_input(&self) -> OsString {
        match self {
            Self::Path(p) => p.clone().into_os_string(),
            Self::Url(u) => OsString::from(u),
        }
    }

    /// `true` when the locator names an `.mp4` file (ignoring any URL query or fragment).
    pub fn has_mp4_extension(&self) -> bool {
        let name = match self {
            Self::Path(p) => p.to_string_lossy().into_owned(),
            Self::Url(u) => u
                .split(['?', '#'])
                .next()
                .unwrap_or_default()
                .to_string(),
        };
        name.to_ascii_lowercase().ends_with(".mp4")
    }
}

impl fmt::Display for SourceLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::Url(u) => f.write_str(u),
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/locator.rs"]
mod tests;
