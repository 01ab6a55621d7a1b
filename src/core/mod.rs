pub mod deps;
pub mod download;
pub mod installer;
pub mod outcome;
pub mod platform;
pub mod runner;

pub use deps::{probe, DepName, DepState, Dependency, ProbedVersion, Version};
pub use download::{build_args, DownloadRequest, Mode, Orchestrator, RequestError};
pub use installer::install;
pub use outcome::{Outcome, Reporter, RunRecord, EXIT_USAGE};
pub use platform::{has_elevation, OsFamily, PackageManager, PlatformProfile};
pub use runner::{RunnerError, StreamedOutput, SystemRunner, ToolOutput, ToolRunner};
