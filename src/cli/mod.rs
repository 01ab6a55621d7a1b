use anyhow::Result;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::warn;

use crate::config::Config;
use crate::core::{
    has_elevation, install, probe, DepState, Dependency, DownloadRequest, Mode, Orchestrator,
    Outcome, PlatformProfile, RequestError, ToolRunner,
};

#[derive(Parser)]
#[command(name = "ytgrab")]
#[command(about = "Download videos or playlists via yt-dlp, resolving missing tools first")]
#[command(version)]
pub struct Cli {
    /// Video or playlist URL
    #[arg(short, long)]
    pub url: String,

    /// Whether the URL names a single video or a whole playlist
    #[arg(short = 't', long = "type", value_enum)]
    pub kind: MediaKind,

    /// Destination directory for downloads
    #[arg(short, long, default_value = "./downloads")]
    pub path: PathBuf,

    /// Keep only the audio track, converted to mp3
    #[arg(short, long)]
    pub audio_only: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MediaKind {
    Video,
    Playlist,
}

impl MediaKind {
    pub fn mode(self) -> Mode {
        match self {
            MediaKind::Video => Mode::Single,
            MediaKind::Playlist => Mode::Collection,
        }
    }
}

impl Cli {
    /// Validate the request up front, before any subprocess is spawned.
    pub fn request(&self) -> Result<DownloadRequest, RequestError> {
        DownloadRequest::new(&self.url, self.kind.mode(), &self.path, self.audio_only)
    }

    /// The whole run: probe every dependency, gate on privileges, install
    /// what is missing (once each), then hand over to the orchestrator.
    /// Every failure comes back as an Outcome; nothing here terminates
    /// the process.
    pub async fn run(
        &self,
        runner: &dyn ToolRunner,
        config: &Config,
        request: &DownloadRequest,
    ) -> Result<(Outcome, Vec<(Dependency, DepState)>)> {
        let mut deps: Vec<(Dependency, DepState)> = Dependency::required()
            .into_iter()
            .map(|dep| (dep, DepState::Unresolved))
            .collect();

        for (dep, state) in &mut deps {
            state.advance(probe(runner, dep).await);
        }

        if deps.iter().any(|(_, state)| !state.is_satisfied()) {
            let platform = PlatformProfile::detect(runner).await;

            if platform.needs_elevation() && !has_elevation(runner, platform.family).await {
                warn!("missing tools require an elevated install step");
                return Ok((Outcome::PermissionFailure, deps));
            }

            for (dep, state) in &mut deps {
                if matches!(state, DepState::Unresolved) {
                    state.advance(DepState::Resolving);
                    state.advance(install(runner, dep, &platform).await);
                }
            }

            if let Some((dep, state)) = deps.iter().find(|(_, state)| !state.is_satisfied()) {
                warn!("{} is still not usable: {state}", dep.name);
                return Ok((Outcome::DependencyFailure { name: dep.name }, deps));
            }
        }

        println!("Downloading {} into {}", request.url, request.dest.display());
        let orchestrator = Orchestrator::new(runner, config)?;
        let outcome = orchestrator.run(request).await;
        Ok((outcome, deps))
    }
}
