use anyhow::Result;
use std::path::{Path, PathBuf};

const WORKSPACE_MARKERS: &[&str] = &["MODULE.bazel", "WORKSPACE", "WORKSPACE.bazel"];

/// Resolves `path` against the current directory.
pub fn absolute_path(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Closest ancestor of `file` holding a workspace marker, or the current directory.
pub fn find_workspace_root(file: &Path) -> Result<PathBuf> {
    let found = file.ancestors().skip(1).find(|dir| {
        WORKSPACE_MARKERS
            .iter()
            .any(|marker| dir.join(marker).exists())
    });
    match found {
        Some(dir) => Ok(dir.to_path_buf()),
        None => Ok(std::env::current_dir()?),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_find_workspace_root() -> Result<()> {
        let root = TempDir::new()?;
        std::fs::write(root.path().join("MODULE.bazel"), "")?;
        let pkg = root.path().join("java/com/foo");
        std::fs::create_dir_all(&pkg)?;

        let found = find_workspace_root(&pkg.join("FooTest.java"))?;
        assert_eq!(found, root.path());
        Ok(())
    }
}
