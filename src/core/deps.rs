use crate::core::runner::{RunnerError, ToolRunner};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use tracing::{debug, info, warn};

/// Program name of the external downloader, shared with the orchestrator.
pub const DOWNLOADER_PROGRAM: &str = "yt-dlp";
pub const MEDIA_PROCESSOR_PROGRAM: &str = "ffmpeg";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum DepName {
    Downloader,
    MediaProcessor,
}

impl DepName {
    pub fn as_str(&self) -> &'static str {
        match self {
            DepName::Downloader => DOWNLOADER_PROGRAM,
            DepName::MediaProcessor => MEDIA_PROCESSOR_PROGRAM,
        }
    }
}

impl fmt::Display for DepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A dotted numeric version, compared component-wise. Trailing non-numeric
/// noise in tool output is ignored at parse time.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Version(Vec<u64>);

impl Version {
    pub fn new(parts: &[u64]) -> Self {
        Self(parts.to_vec())
    }

    /// Find the first dotted numeric token in the tool's version output.
    /// yt-dlp prints a bare date version ("2024.11.04"), ffmpeg buries it
    /// in a banner ("ffmpeg version 6.1.1-3ubuntu5 ...").
    pub fn parse(raw: &str) -> Option<Self> {
        let re = Regex::new(r"\d+(?:\.\d+)+").ok()?;
        let token = re.find(raw)?.as_str();
        let parts: Vec<u64> = token.split('.').filter_map(|p| p.parse().ok()).collect();
        if parts.is_empty() {
            None
        } else {
            Some(Self(parts))
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self.0.iter().map(|p| p.to_string()).collect();
        f.write_str(&rendered.join("."))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbedVersion {
    Known(Version),
    Unknown,
}

impl fmt::Display for ProbedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProbedVersion::Known(v) => write!(f, "{v}"),
            ProbedVersion::Unknown => f.write_str("version unknown"),
        }
    }
}

/// Resolution state of one dependency within a single run. Transitions only
/// move forward; once Satisfied a dependency never regresses.
#[derive(Debug, Clone, PartialEq)]
pub enum DepState {
    Unresolved,
    Resolving,
    Satisfied(ProbedVersion),
    Failed(String),
}

impl DepState {
    pub fn is_satisfied(&self) -> bool {
        matches!(self, DepState::Satisfied(_))
    }

    pub fn advance(&mut self, next: DepState) {
        if self.is_satisfied() {
            return;
        }
        *self = next;
    }
}

impl fmt::Display for DepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepState::Unresolved => f.write_str("unresolved"),
            DepState::Resolving => f.write_str("resolving"),
            DepState::Satisfied(v) => write!(f, "satisfied ({v})"),
            DepState::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// One required external tool: how to query its version and what the floor is.
#[derive(Debug, Clone)]
pub struct Dependency {
    pub name: DepName,
    pub program: &'static str,
    pub version_args: &'static [&'static str],
    /// None means presence alone satisfies the requirement.
    pub min_version: Option<Version>,
}

impl Dependency {
    pub fn downloader() -> Self {
        Self {
            name: DepName::Downloader,
            program: DOWNLOADER_PROGRAM,
            version_args: &["--version"],
            min_version: Some(Version::new(&[2023, 1, 6])),
        }
    }

    pub fn media_processor() -> Self {
        Self {
            name: DepName::MediaProcessor,
            program: MEDIA_PROCESSOR_PROGRAM,
            version_args: &["-version"],
            min_version: None,
        }
    }

    pub fn required() -> Vec<Dependency> {
        vec![Self::downloader(), Self::media_processor()]
    }
}

/// Run the tool's own version query. A spawn failure just means the tool is
/// missing, never a fatal error. Unparsable version output counts as
/// "present but version unknown", which satisfies presence-only dependencies.
pub async fn probe(runner: &dyn ToolRunner, dep: &Dependency) -> DepState {
    match runner.run(dep.program, dep.version_args).await {
        Ok(output) => {
            let text = format!("{}\n{}", output.stdout, output.stderr);
            match Version::parse(&text) {
                Some(version) => {
                    if let Some(min) = &dep.min_version {
                        if &version < min {
                            warn!("{} {version} is older than the required {min}", dep.name);
                            return DepState::Unresolved;
                        }
                    }
                    info!("{} {version} detected", dep.name);
                    DepState::Satisfied(ProbedVersion::Known(version))
                }
                None if dep.min_version.is_none() => {
                    debug!("{} present, version not recognized", dep.name);
                    DepState::Satisfied(ProbedVersion::Unknown)
                }
                None => {
                    warn!(
                        "{} responded but did not report a usable version",
                        dep.name
                    );
                    DepState::Unresolved
                }
            }
        }
        Err(RunnerError::NotFound { .. }) => {
            debug!("{} not found on PATH", dep.name);
            DepState::Unresolved
        }
        Err(err) => {
            warn!("version query for {} failed: {err}", dep.name);
            DepState::Unresolved
        }
    }
}
