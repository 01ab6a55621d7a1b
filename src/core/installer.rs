use crate::core::deps::{probe, DepState, Dependency};
use crate::core::platform::{PackageManager, PlatformProfile};
use crate::core::runner::ToolRunner;
use crate::utils::summarize_output;
use tracing::{info, warn};

/// One install-command template per package manager. yt-dlp and ffmpeg are
/// both packaged under their own names everywhere we support.
fn install_args(pm: PackageManager, package: &'static str) -> Vec<&'static str> {
    match pm {
        PackageManager::Apt => vec!["install", "-y", package],
        PackageManager::Dnf => vec!["install", "-y", package],
        PackageManager::Pacman => vec!["-S", "--noconfirm", package],
        PackageManager::Brew => vec!["install", package],
        PackageManager::Choco => vec!["install", "-y", package],
    }
}

/// Install a missing dependency and confirm it by re-probing. At most one
/// attempt per dependency per run; a failed install is a user decision to
/// retry, not ours.
pub async fn install(
    runner: &dyn ToolRunner,
    dep: &Dependency,
    platform: &PlatformProfile,
) -> DepState {
    let Some(pm) = platform.package_manager else {
        warn!("cannot install {}: no known installer for this platform", dep.name);
        return DepState::Failed("no known installer for this platform".to_string());
    };

    let args = install_args(pm, dep.program);
    info!("installing {} via {pm}", dep.name);

    match runner.run(pm.program(), &args).await {
        Ok(output) if output.success() => {
            // The installer claims success; only the probe's word counts.
            match probe(runner, dep).await {
                state @ DepState::Satisfied(_) => {
                    info!("{} installed and confirmed", dep.name);
                    state
                }
                _ => {
                    warn!("{pm} reported success but {} is still undetectable", dep.name);
                    DepState::Failed(format!(
                        "{} installed but still undetectable",
                        dep.program
                    ))
                }
            }
        }
        Ok(output) => {
            let reason = summarize_output(&output);
            warn!("install of {} failed: {reason}", dep.name);
            DepState::Failed(reason)
        }
        Err(err) => {
            warn!("could not run {pm}: {err}");
            DepState::Failed(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_args_per_manager() {
        assert_eq!(
            install_args(PackageManager::Apt, "ffmpeg"),
            vec!["install", "-y", "ffmpeg"]
        );
        assert_eq!(
            install_args(PackageManager::Pacman, "yt-dlp"),
            vec!["-S", "--noconfirm", "yt-dlp"]
        );
        assert_eq!(
            install_args(PackageManager::Brew, "ffmpeg"),
            vec!["install", "ffmpeg"]
        );
    }
}
