use crate::config::Config;
use crate::core::deps::DOWNLOADER_PROGRAM;
use crate::core::outcome::Outcome;
use crate::core::runner::{StreamedOutput, ToolRunner};
use crate::utils::last_meaningful_line;
use regex::Regex;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

const SINGLE_TEMPLATE: &str = "%(title)s.%(ext)s";
const COLLECTION_TEMPLATE: &str = "%(playlist_title)s/%(playlist_index)s - %(title)s.%(ext)s";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Single,
    Collection,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Single => "single",
            Mode::Collection => "collection",
        }
    }
}

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("URL must not be empty")]
    EmptyUrl,

    #[error("invalid URL: {0}")]
    Malformed(#[from] url::ParseError),

    #[error("unsupported URL scheme \"{0}\": only http and https are accepted")]
    BadScheme(String),

    #[error("destination {} is not writable: {source}", .path.display())]
    Unwritable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// One validated download job. Owned by the orchestrator for the duration of
/// a single invocation, never persisted.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    pub url: Url,
    pub mode: Mode,
    pub dest: PathBuf,
    pub audio_only: bool,
}

impl DownloadRequest {
    pub fn new(
        url: &str,
        mode: Mode,
        dest: &Path,
        audio_only: bool,
    ) -> Result<Self, RequestError> {
        let trimmed = url.trim();
        if trimmed.is_empty() {
            return Err(RequestError::EmptyUrl);
        }
        let url = Url::parse(trimmed)?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RequestError::BadScheme(url.scheme().to_string()));
        }
        Ok(Self {
            url,
            mode,
            dest: dest.to_path_buf(),
            audio_only,
        })
    }

    /// Create the destination if absent and prove it is writable before any
    /// subprocess is spawned.
    pub fn prepare_dest(&self) -> Result<(), RequestError> {
        let unwritable = |source| RequestError::Unwritable {
            path: self.dest.clone(),
            source,
        };
        std::fs::create_dir_all(&self.dest).map_err(unwritable)?;
        let marker = self.dest.join(".ytgrab-write-check");
        std::fs::write(&marker, b"").map_err(unwritable)?;
        let _ = std::fs::remove_file(&marker);
        Ok(())
    }
}

/// Deterministic argument construction: same request and config always yield
/// the same argv. Single and Collection differ in how the downloader
/// interprets the target, which shows up here as different invocation shapes.
pub fn build_args(request: &DownloadRequest, config: &Config) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();

    match request.mode {
        Mode::Single => {
            args.push("--no-playlist".to_string());
            args.push("-o".to_string());
            args.push(request.dest.join(SINGLE_TEMPLATE).display().to_string());
        }
        Mode::Collection => {
            args.push("--yes-playlist".to_string());
            // One dead playlist item must not abort the rest.
            args.push("--ignore-errors".to_string());
            args.push("-o".to_string());
            args.push(request.dest.join(COLLECTION_TEMPLATE).display().to_string());
        }
    }

    args.push("-f".to_string());
    if request.audio_only {
        args.push(config.audio_format.clone());
        for flag in [
            "--extract-audio",
            "--audio-format",
            "mp3",
            "--audio-quality",
            "0",
        ] {
            args.push(flag.to_string());
        }
    } else {
        args.push(config.video_format.clone());
    }

    args.push(request.url.to_string());
    args
}

/// Runs the external downloader and classifies what came back. All failures
/// are returned as Outcome values; nothing escapes as an error.
pub struct Orchestrator<'a> {
    runner: &'a dyn ToolRunner,
    config: &'a Config,
    error_line: Regex,
    success_line: Regex,
}

impl<'a> Orchestrator<'a> {
    pub fn new(runner: &'a dyn ToolRunner, config: &'a Config) -> anyhow::Result<Self> {
        Ok(Self {
            runner,
            config,
            error_line: Regex::new(&config.heuristics.error_line)?,
            success_line: Regex::new(&config.heuristics.success_line)?,
        })
    }

    pub async fn run(&self, request: &DownloadRequest) -> Outcome {
        if let Err(err) = request.prepare_dest() {
            warn!("{err}");
            return Outcome::DownloadFailure {
                code: None,
                message: err.to_string(),
            };
        }

        let args = build_args(request, self.config);
        info!("invoking {DOWNLOADER_PROGRAM} {}", args.join(" "));

        match self.runner.run_streaming(DOWNLOADER_PROGRAM, &args).await {
            Ok(output) => self.classify(request, &output),
            Err(err) => Outcome::DownloadFailure {
                code: None,
                message: err.to_string(),
            },
        }
    }

    /// Exit 0 is success. A non-zero collection run where the output shows
    /// both finished items and per-item errors is a partial success; the
    /// matching patterns are configuration, not gospel, since the external
    /// tool's phrasing changes across versions.
    fn classify(&self, request: &DownloadRequest, output: &StreamedOutput) -> Outcome {
        if output.cancelled {
            return Outcome::DownloadFailure {
                code: output.status,
                message: "cancelled".to_string(),
            };
        }
        if output.status == Some(0) {
            return Outcome::Success;
        }

        let failed = output
            .lines
            .iter()
            .filter(|l| self.error_line.is_match(l))
            .count();
        let succeeded = output
            .lines
            .iter()
            .filter(|l| self.success_line.is_match(l))
            .count();

        if request.mode == Mode::Collection && failed > 0 && succeeded > 0 {
            let reason = format!("{failed} of {} items failed", failed + succeeded);
            warn!("collection finished partially: {reason}");
            return Outcome::PartialSuccess { reason };
        }

        Outcome::DownloadFailure {
            code: output.status,
            message: last_meaningful_line(&output.lines)
                .unwrap_or_else(|| "downloader produced no output".to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(mode: Mode, audio_only: bool) -> DownloadRequest {
        DownloadRequest::new(
            "https://example.com/watch?v=abc",
            mode,
            Path::new("./downloads"),
            audio_only,
        )
        .unwrap()
    }

    #[test]
    fn test_empty_url_rejected() {
        let err = DownloadRequest::new("  ", Mode::Single, Path::new("."), false);
        assert!(matches!(err, Err(RequestError::EmptyUrl)));
    }

    #[test]
    fn test_non_http_scheme_rejected() {
        let err = DownloadRequest::new("ftp://example.com/x", Mode::Single, Path::new("."), false);
        assert!(matches!(err, Err(RequestError::BadScheme(_))));
    }

    #[test]
    fn test_single_and_collection_shapes_differ() {
        let config = Config::default();
        let single = build_args(&request(Mode::Single, false), &config);
        let collection = build_args(&request(Mode::Collection, false), &config);

        assert_ne!(single, collection);
        assert!(single.contains(&"--no-playlist".to_string()));
        assert!(collection.contains(&"--yes-playlist".to_string()));
        assert!(collection.contains(&"--ignore-errors".to_string()));
    }

    #[test]
    fn test_args_are_deterministic() {
        let config = Config::default();
        let req = request(Mode::Collection, false);
        assert_eq!(build_args(&req, &config), build_args(&req, &config));
    }

    #[test]
    fn test_audio_only_swaps_format_and_extracts() {
        let config = Config::default();
        let args = build_args(&request(Mode::Single, true), &config);
        assert!(args.contains(&"--extract-audio".to_string()));
        assert!(args.contains(&config.audio_format));
        assert!(!args.contains(&config.video_format));
    }

    #[test]
    fn test_url_is_last_argument() {
        let config = Config::default();
        let args = build_args(&request(Mode::Single, false), &config);
        assert_eq!(args.last().unwrap(), "https://example.com/watch?v=abc");
    }
}
