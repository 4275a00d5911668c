//! npm / pnpm flavors.
//!
//! A package's flavor is picked once, at scan time, from the lockfile that
//! sits next to its manifest. Everything downstream only asks the flavor for
//! the command line of an [`Operation`].

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::runtime::Runtime;

pub const NPM_LOCKFILE: &str = "package-lock.json";
pub const PNPM_LOCKFILE: &str = "pnpm-lock.yaml";
pub const NODE_MODULES: &str = "node_modules";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PackageManagerKind {
    Npm,
    #[default]
    Pnpm,
}

/// A package-manager invocation, independent of flavor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
    Install { no_lockfile: bool },
    Build,
    Publish,
}

impl PackageManagerKind {
    /// `Npm` when the first directory holding a `package-lock.json` is found
    /// among `dirs`, `Pnpm` otherwise.
    pub fn detect<R: Runtime + ?Sized>(runtime: &R, dirs: &[&Path]) -> Self {
        if dirs
            .iter()
            .any(|dir| runtime.exists(&dir.join(NPM_LOCKFILE)))
        {
            PackageManagerKind::Npm
        } else {
            PackageManagerKind::Pnpm
        }
    }

    pub fn program(&self) -> &'static str {
        match self {
            PackageManagerKind::Npm => "npm",
            PackageManagerKind::Pnpm => "pnpm",
        }
    }

    pub fn lockfile(&self) -> &'static str {
        match self {
            PackageManagerKind::Npm => NPM_LOCKFILE,
            PackageManagerKind::Pnpm => PNPM_LOCKFILE,
        }
    }

    /// Arguments passed to [`program`](Self::program) for `op`.
    pub fn args(&self, op: &Operation) -> Vec<String> {
        let args: Vec<&str> = match (self, op) {
            (_, Operation::Install { no_lockfile: false }) => vec!["install"],
            (PackageManagerKind::Npm, Operation::Install { no_lockfile: true }) => {
                vec!["install", "--no-package-lock"]
            }
            (PackageManagerKind::Pnpm, Operation::Install { no_lockfile: true }) => {
                vec!["install", "--frozen-lockfile"]
            }
            (_, Operation::Build) => vec!["run", "build"],
            (_, Operation::Publish) => vec!["publish"],
        };
        args.into_iter().map(String::from).collect()
    }
}

impl fmt::Display for PackageManagerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.program())
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Install { .. } => write!(f, "install"),
            Operation::Build => write!(f, "build"),
            Operation::Publish => write!(f, "publish"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::MockRuntime;
    use mockall::predicate::eq;
    use std::path::PathBuf;

    #[test]
    fn test_detect_npm_when_package_lock_exists() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_exists()
            .with(eq(PathBuf::from("/repos/core/package-lock.json")))
            .returning(|_| true);

        let kind = PackageManagerKind::detect(&runtime, &[Path::new("/repos/core")]);
        assert_eq!(kind, PackageManagerKind::Npm);
    }

    #[test]
    fn test_detect_falls_back_to_pnpm() {
        let mut runtime = MockRuntime::new();
        runtime.expect_exists().returning(|_| false);

        let kind = PackageManagerKind::detect(
            &runtime,
            &[Path::new("/repos/mono/packages/a"), Path::new("/repos/mono")],
        );
        assert_eq!(kind, PackageManagerKind::Pnpm);
    }

    #[test]
    fn test_detect_checks_workspace_root() {
        let mut runtime = MockRuntime::new();
        runtime
            .expect_exists()
            .returning(|p| p == Path::new("/repos/mono/package-lock.json"));

        let kind = PackageManagerKind::detect(
            &runtime,
            &[Path::new("/repos/mono/packages/a"), Path::new("/repos/mono")],
        );
        assert_eq!(kind, PackageManagerKind::Npm);
    }

    #[test]
    fn test_install_without_lockfile() {
        let op = Operation::Install { no_lockfile: true };
        assert_eq!(
            PackageManagerKind::Npm.args(&op),
            vec!["install", "--no-package-lock"]
        );
        assert_eq!(
            PackageManagerKind::Pnpm.args(&op),
            vec!["install", "--frozen-lockfile"]
        );
    }

    #[test]
    fn test_plain_install_build_publish() {
        for kind in [PackageManagerKind::Npm, PackageManagerKind::Pnpm] {
            assert_eq!(kind.args(&Operation::Install { no_lockfile: false }), vec!["install"]);
            assert_eq!(kind.args(&Operation::Build), vec!["run", "build"]);
            assert_eq!(kind.args(&Operation::Publish), vec!["publish"]);
        }
    }

    #[test]
    fn test_display() {
        assert_eq!(PackageManagerKind::Pnpm.to_string(), "pnpm");
        assert_eq!(Operation::Build.to_string(), "build");
        assert_eq!(PackageManagerKind::Npm.lockfile(), "package-lock.json");
    }
}
