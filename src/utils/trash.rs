//! Reversible deletion of replaced song files

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Moves files to a recoverable holding area.
///
/// Trashing a path that does not exist is a no-op.
pub trait Trash: Send + Sync {
    fn trash(&self, path: &Path) -> io::Result<()>;
}

/// The desktop's recycle bin
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemTrash;

impl Trash for SystemTrash {
    fn trash(&self, path: &Path) -> io::Result<()> {
        if !path.exists() {
            return Ok(());
        }
        trash::delete(path).map_err(io::Error::other)?;
        debug!("Moved to system trash: {}", path.display());
        Ok(())
    }
}

/// A plain directory acting as trash, for headless machines without a
/// desktop recycle bin
#[derive(Debug, Clone)]
pub struct DirTrash {
    root: PathBuf,
}

impl DirTrash {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn free_target(&self, name: &str) -> PathBuf {
        let mut target = self.root.join(name);
        let mut n = 0;
        while target.exists() {
            n += 1;
            target = self.root.join(format!("{n}-{name}"));
        }
        target
    }
}

impl Trash for DirTrash {
    fn trash(&self, path: &Path) -> io::Result<()> {
        if !path.exists() {
            return Ok(());
        }
        fs::create_dir_all(&self.root)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unnamed".to_string());
        let target = self.free_target(&name);
        match fs::rename(path, &target) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::CrossesDevices && path.is_file() => {
                fs::copy(path, &target)?;
                fs::remove_file(path)?;
            }
            Err(err) => return Err(err),
        }
        debug!("Moved {} to {}", path.display(), target.display());
        Ok(())
    }
}
