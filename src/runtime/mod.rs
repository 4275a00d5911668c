//! Filesystem and environment access behind a mockable trait.
//!
//! Everything that touches the app folder, package manifests or the ledger
//! goes through [`Runtime`], so command tests run against `MockRuntime`
//! or a temp directory.

mod env;
mod fs;

use anyhow::Result;
use std::env as std_env;
use std::path::{Path, PathBuf};

#[cfg_attr(test, mockall::automock)]
pub trait Runtime: Send + Sync {
    // Environment
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError>;

    // File System
    fn write(&self, path: &Path, contents: &[u8]) -> Result<()>;
    fn read_to_string(&self, path: &Path) -> Result<String>;
    fn rename(&self, from: &Path, to: &Path) -> Result<()>;
    fn copy(&self, from: &Path, to: &Path) -> Result<u64>;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn remove_file(&self, path: &Path) -> Result<()>;
    fn remove_dir_all(&self, path: &Path) -> Result<()>;
    fn exists(&self, path: &Path) -> bool;
    fn is_dir(&self, path: &Path) -> bool;

    /// List the entries of a directory, sorted by path so that scans are
    /// deterministic across platforms.
    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    // Directories
    fn home_dir(&self) -> Option<PathBuf>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct RealRuntime;

impl Runtime for RealRuntime {
    fn env_var(&self, key: &str) -> Result<String, std_env::VarError> {
        self.env_var_impl(key)
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.write_impl(path, contents)
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.read_to_string_impl(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<()> {
        self.rename_impl(from, to)
    }

    fn copy(&self, from: &Path, to: &Path) -> Result<u64> {
        self.copy_impl(from, to)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.create_dir_all_impl(path)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.remove_file_impl(path)
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        self.remove_dir_all_impl(path)
    }

    fn exists(&self, path: &Path) -> bool {
        self.exists_impl(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        self.is_dir_impl(path)
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        self.read_dir_impl(path)
    }

    fn home_dir(&self) -> Option<PathBuf> {
        self.home_dir_impl()
    }
}

/// Write `contents` to `path` through a temporary sibling file and a rename,
/// so readers never observe a half-written file.
#[tracing::instrument(skip(runtime, contents))]
pub fn write_atomic<R: Runtime + ?Sized>(runtime: &R, path: &Path, contents: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp_path = path.with_file_name(format!(".{}.tmp", file_name));

    runtime.write(&tmp_path, contents)?;
    if let Err(e) = runtime.rename(&tmp_path, path) {
        let _ = runtime.remove_file(&tmp_path);
        return Err(e);
    }
    Ok(())
}

/// Copy the directory tree at `from` into `to`, skipping any entry whose
/// file name is in `skip`. Returns the number of files copied.
#[tracing::instrument(skip(runtime))]
pub fn copy_tree<R: Runtime + ?Sized>(
    runtime: &R,
    from: &Path,
    to: &Path,
    skip: &[&str],
) -> Result<usize> {
    let mut copied = 0;
    let mut pending = vec![(from.to_path_buf(), to.to_path_buf())];

    while let Some((src, dest)) = pending.pop() {
        runtime.create_dir_all(&dest)?;
        for entry in runtime.read_dir(&src)? {
            let Some(name) = entry.file_name() else {
                continue;
            };
            if skip.iter().any(|s| name == *s) {
                continue;
            }
            let target = dest.join(name);
            if runtime.is_dir(&entry) {
                pending.push((entry, target));
            } else {
                runtime.copy(&entry, &target)?;
                copied += 1;
            }
        }
    }
    Ok(copied)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[test]
    fn test_write_atomic_writes_tmp_then_renames() {
        let mut runtime = MockRuntime::new();
        let target = PathBuf::from("/app/configuration/state.yaml");
        let tmp = PathBuf::from("/app/configuration/.state.yaml.tmp");

        runtime
            .expect_write()
            .with(eq(tmp.clone()), eq(b"a: 1\n".to_vec()))
            .times(1)
            .returning(|_, _| Ok(()));
        runtime
            .expect_rename()
            .with(eq(tmp), eq(target.clone()))
            .times(1)
            .returning(|_, _| Ok(()));

        write_atomic(&runtime, &target, b"a: 1\n").unwrap();
    }

    #[test]
    fn test_write_atomic_cleans_up_on_rename_failure() {
        let mut runtime = MockRuntime::new();
        let target = PathBuf::from("/app/state.yaml");
        let tmp = PathBuf::from("/app/.state.yaml.tmp");

        runtime.expect_write().returning(|_, _| Ok(()));
        runtime
            .expect_rename()
            .returning(|_, _| Err(anyhow::anyhow!("cross-device link")));
        runtime
            .expect_remove_file()
            .with(eq(tmp))
            .times(1)
            .returning(|_| Ok(()));

        assert!(write_atomic(&runtime, &target, b"x").is_err());
    }

    #[test]
    fn test_copy_tree_skips_named_entries() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("core");
        std::fs::create_dir_all(src.join("src/util")).unwrap();
        std::fs::create_dir_all(src.join("node_modules/dep")).unwrap();
        std::fs::write(src.join("package.json"), "{}").unwrap();
        std::fs::write(src.join("src/util/index.ts"), "export {}").unwrap();
        std::fs::write(src.join("node_modules/dep/index.js"), "").unwrap();

        let dest = dir.path().join("out/core");
        let copied = copy_tree(&RealRuntime, &src, &dest, &["node_modules"]).unwrap();

        assert_eq!(copied, 2);
        assert_eq!(
            std::fs::read_to_string(dest.join("src/util/index.ts")).unwrap(),
            "export {}"
        );
        assert!(dest.join("package.json").exists());
        assert!(!dest.join("node_modules").exists());
    }
}
