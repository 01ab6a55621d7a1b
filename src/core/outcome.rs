use crate::core::deps::{DepName, DepState, Dependency};
use crate::core::download::DownloadRequest;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use tracing::warn;

/// Usage errors (bad URL, bad mode, unwritable destination) exit before any
/// probing happens; everything else maps through `Outcome::exit_code`.
pub const EXIT_USAGE: u8 = 2;

/// Final classification of a run, produced once and consumed by the reporter.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "kebab-case")]
pub enum Outcome {
    Success,
    PartialSuccess {
        reason: String,
    },
    DependencyFailure {
        name: DepName,
    },
    PermissionFailure,
    DownloadFailure {
        code: Option<i32>,
        message: String,
    },
}

impl Outcome {
    /// Distinct non-zero codes per failure class so wrapping scripts can
    /// branch on cause. Partial success still exits 0.
    pub fn exit_code(&self) -> u8 {
        match self {
            Outcome::Success | Outcome::PartialSuccess { .. } => 0,
            Outcome::DependencyFailure { .. } => 3,
            Outcome::PermissionFailure => 4,
            Outcome::DownloadFailure { .. } => 5,
        }
    }

    pub fn summary(&self) -> String {
        match self {
            Outcome::Success => "Download completed.".to_string(),
            Outcome::PartialSuccess { reason } => {
                format!("Download finished with errors: {reason}.")
            }
            Outcome::DependencyFailure { name } => {
                format!("Could not resolve required tool: {name}.")
            }
            Outcome::PermissionFailure => {
                "Elevated privileges are required to install missing tools; \
                 re-run as root/administrator."
                    .to_string()
            }
            Outcome::DownloadFailure {
                code: Some(code),
                message,
            } => format!("Download failed (exit code {code}): {message}"),
            Outcome::DownloadFailure {
                code: None,
                message,
            } => format!("Download failed: {message}"),
        }
    }
}

/// One structured log line per run: timestamp, request parameters, final
/// dependency states and the outcome detail.
#[derive(Debug, Serialize)]
pub struct RunRecord<'a> {
    pub timestamp: DateTime<Utc>,
    pub url: String,
    pub mode: &'static str,
    pub destination: String,
    pub audio_only: bool,
    pub dependencies: BTreeMap<&'static str, String>,
    #[serde(flatten)]
    pub outcome: &'a Outcome,
}

/// Appends run records to the log sink and prints the final human line.
/// The sink is append-only; prior entries are never touched.
pub struct Reporter<W: Write> {
    sink: W,
}

impl<W: Write> Reporter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    pub fn report(
        &mut self,
        outcome: &Outcome,
        deps: &[(Dependency, DepState)],
        request: &DownloadRequest,
    ) -> u8 {
        let record = RunRecord {
            timestamp: Utc::now(),
            url: request.url.to_string(),
            mode: request.mode.as_str(),
            destination: request.dest.display().to_string(),
            audio_only: request.audio_only,
            dependencies: deps
                .iter()
                .map(|(dep, state)| (dep.name.as_str(), state.to_string()))
                .collect(),
            outcome,
        };

        match serde_json::to_string(&record) {
            Ok(line) => {
                if let Err(err) = writeln!(self.sink, "{line}") {
                    warn!("could not append run record to the log: {err}");
                }
            }
            Err(err) => warn!("could not serialize run record: {err}"),
        }

        println!("{}", outcome.summary());
        outcome.exit_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::download::Mode;
    use std::path::Path;

    fn request() -> DownloadRequest {
        DownloadRequest::new(
            "https://example.com/watch?v=abc",
            Mode::Single,
            Path::new("./downloads"),
            false,
        )
        .unwrap()
    }

    fn deps() -> Vec<(Dependency, DepState)> {
        vec![
            (Dependency::downloader(), DepState::Unresolved),
            (Dependency::media_processor(), DepState::Unresolved),
        ]
    }

    #[test]
    fn test_exit_codes_are_distinct_per_failure_class() {
        assert_eq!(Outcome::Success.exit_code(), 0);
        assert_eq!(
            Outcome::PartialSuccess {
                reason: "3 of 10 items failed".into()
            }
            .exit_code(),
            0
        );
        let dep = Outcome::DependencyFailure {
            name: DepName::Downloader,
        };
        let perm = Outcome::PermissionFailure;
        let dl = Outcome::DownloadFailure {
            code: Some(1),
            message: "boom".into(),
        };
        assert_ne!(dep.exit_code(), perm.exit_code());
        assert_ne!(perm.exit_code(), dl.exit_code());
        assert_ne!(dep.exit_code(), dl.exit_code());
        assert_ne!(dep.exit_code(), 0);
    }

    #[test]
    fn test_report_appends_json_lines() {
        let mut sink: Vec<u8> = Vec::new();
        let mut reporter = Reporter::new(&mut sink);
        let req = request();

        let code = reporter.report(&Outcome::Success, &deps(), &req);
        assert_eq!(code, 0);
        let code = reporter.report(
            &Outcome::DownloadFailure {
                code: Some(1),
                message: "network".into(),
            },
            &deps(),
            &req,
        );
        assert_eq!(code, 5);

        let text = String::from_utf8(sink).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["outcome"], "success");
        assert_eq!(first["mode"], "single");
        assert_eq!(first["url"], "https://example.com/watch?v=abc");
        assert!(first["dependencies"]["yt-dlp"].is_string());

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["outcome"], "download-failure");
        assert_eq!(second["code"], 1);
        assert_eq!(second["message"], "network");
    }

    #[test]
    fn test_partial_reason_lands_in_record() {
        let mut sink: Vec<u8> = Vec::new();
        let mut reporter = Reporter::new(&mut sink);
        reporter.report(
            &Outcome::PartialSuccess {
                reason: "3 of 10 items failed".into(),
            },
            &deps(),
            &request(),
        );
        let record: serde_json::Value =
            serde_json::from_str(String::from_utf8(sink).unwrap().lines().next().unwrap())
                .unwrap();
        assert_eq!(record["reason"], "3 of 10 items failed");
    }
}
