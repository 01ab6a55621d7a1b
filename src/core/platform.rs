use crate::core::runner::ToolRunner;
use std::fmt;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OsFamily {
    Posix,
    Windows,
}

impl OsFamily {
    pub fn current() -> Self {
        if cfg!(windows) {
            OsFamily::Windows
        } else {
            OsFamily::Posix
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PackageManager {
    Apt,
    Dnf,
    Pacman,
    Brew,
    Choco,
}

impl PackageManager {
    pub fn program(&self) -> &'static str {
        match self {
            PackageManager::Apt => "apt",
            PackageManager::Dnf => "dnf",
            PackageManager::Pacman => "pacman",
            PackageManager::Brew => "brew",
            PackageManager::Choco => "choco",
        }
    }

    pub fn candidates(family: OsFamily) -> &'static [PackageManager] {
        match family {
            OsFamily::Posix => &[
                PackageManager::Apt,
                PackageManager::Dnf,
                PackageManager::Pacman,
                PackageManager::Brew,
            ],
            OsFamily::Windows => &[PackageManager::Choco],
        }
    }

    /// Homebrew installs into a user-owned prefix; everything else writes
    /// system locations and needs an elevated process.
    pub fn needs_elevation(&self) -> bool {
        !matches!(self, PackageManager::Brew)
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

/// Host identity, computed once at startup and immutable afterwards.
#[derive(Debug, Clone, Copy)]
pub struct PlatformProfile {
    pub family: OsFamily,
    pub package_manager: Option<PackageManager>,
}

impl PlatformProfile {
    pub async fn detect(runner: &dyn ToolRunner) -> Self {
        Self::detect_for(runner, OsFamily::current()).await
    }

    pub async fn detect_for(runner: &dyn ToolRunner, family: OsFamily) -> Self {
        let mut package_manager = None;
        for pm in PackageManager::candidates(family) {
            if let Ok(output) = runner.run(pm.program(), &["--version"]).await {
                if output.success() {
                    debug!("detected package manager: {pm}");
                    package_manager = Some(*pm);
                    break;
                }
            }
        }
        Self {
            family,
            package_manager,
        }
    }

    pub fn needs_elevation(&self) -> bool {
        self.package_manager.map_or(false, |pm| pm.needs_elevation())
    }
}

/// Whether the current process can install system packages. Posix asks the
/// effective uid; Windows relies on `net session` succeeding only for an
/// elevated token. Pure query, no mutation.
pub async fn has_elevation(runner: &dyn ToolRunner, family: OsFamily) -> bool {
    match family {
        OsFamily::Posix => runner
            .run("id", &["-u"])
            .await
            .map(|o| o.success() && o.stdout.trim() == "0")
            .unwrap_or(false),
        OsFamily::Windows => runner
            .run("net", &["session"])
            .await
            .map(|o| o.success())
            .unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brew_does_not_need_elevation() {
        assert!(!PackageManager::Brew.needs_elevation());
        assert!(PackageManager::Apt.needs_elevation());
        assert!(PackageManager::Choco.needs_elevation());
    }

    #[test]
    fn test_profile_without_package_manager_needs_no_elevation() {
        let profile = PlatformProfile {
            family: OsFamily::Posix,
            package_manager: None,
        };
        assert!(!profile.needs_elevation());
    }

    #[test]
    fn test_windows_candidates() {
        assert_eq!(
            PackageManager::candidates(OsFamily::Windows),
            &[PackageManager::Choco]
        );
    }
}
