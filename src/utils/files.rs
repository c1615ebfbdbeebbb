//! File moves that survive crossing filesystem boundaries

use anyhow::{Context, Result};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;
use tokio::fs;

/// Move a file, falling back to copy + remove when the temp directory lives on
/// another device than the song library.
pub async fn move_file(from: &Path, to: &Path) -> Result<()> {
    match fs::rename(from, to).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::CrossesDevices => {
            fs::copy(from, to)
                .await
                .with_context(|| format!("Failed to copy {} to {}", from.display(), to.display()))?;
            fs::remove_file(from)
                .await
                .with_context(|| format!("Failed to remove {}", from.display()))?;
            Ok(())
        }
        Err(err) => Err(err)
            .with_context(|| format!("Failed to move {} to {}", from.display(), to.display())),
    }
}

/// Create the first free directory among `path` and its `"<name> (n)"`
/// siblings and return it.
///
/// Creation is the claim: two callers asking for the same name concurrently
/// never get the same directory.
pub async fn claim_unique_directory(path: &Path) -> std::io::Result<PathBuf> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut candidate = path.to_path_buf();
    let mut suffix = 0;
    loop {
        match fs::create_dir(&candidate).await {
            Ok(()) => return Ok(candidate),
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                suffix += 1;
                candidate = path.with_file_name(format!("{name} ({suffix})"));
            }
            Err(err) => return Err(err),
        }
    }
}

/// Move every entry of `from` into the existing directory `to`, then remove `from`
pub async fn move_dir_contents(from: &Path, to: &Path) -> Result<()> {
    let mut entries = fs::read_dir(from)
        .await
        .with_context(|| format!("Failed to read {}", from.display()))?;
    while let Some(entry) = entries
        .next_entry()
        .await
        .with_context(|| format!("Failed to read {}", from.display()))?
    {
        let target = to.join(entry.file_name());
        fs::rename(entry.path(), &target)
            .await
            .with_context(|| format!("Failed to move {} to {}", entry.path().display(), target.display()))?;
    }
    fs::remove_dir(from)
        .await
        .with_context(|| format!("Failed to remove {}", from.display()))
}

/// Modification time of a file in microseconds since the Unix epoch
pub fn mtime_micros(path: &Path) -> std::io::Result<i64> {
    let modified = std::fs::metadata(path)?.modified()?;
    let micros = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as i64)
        .unwrap_or(0);
    Ok(micros)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_move_file() {
        let temp = tempfile::tempdir().unwrap();
        let from = temp.path().join("a.txt");
        let to = temp.path().join("b.txt");
        std::fs::write(&from, "data").unwrap();

        move_file(&from, &to).await.unwrap();

        assert!(!from.exists());
        assert_eq!(std::fs::read_to_string(&to).unwrap(), "data");
    }

    #[tokio::test]
    async fn test_claim_unique_directory() {
        let temp = tempfile::tempdir().unwrap();
        let base = temp.path().join("songs").join("A - B");

        assert_eq!(claim_unique_directory(&base).await.unwrap(), base);
        assert!(base.is_dir());
        assert_eq!(
            claim_unique_directory(&base).await.unwrap(),
            temp.path().join("songs").join("A - B (1)")
        );
        assert_eq!(
            claim_unique_directory(&base).await.unwrap(),
            temp.path().join("songs").join("A - B (2)")
        );
    }

    #[tokio::test]
    async fn test_concurrent_claims_get_distinct_directories() {
        let temp = tempfile::tempdir().unwrap();
        let base = temp.path().join("A - B");

        let claims = futures::future::join_all((0..8).map(|_| claim_unique_directory(&base))).await;

        let mut claimed: Vec<PathBuf> = claims.into_iter().map(|c| c.unwrap()).collect();
        claimed.sort();
        claimed.dedup();
        assert_eq!(claimed.len(), 8);
    }

    #[tokio::test]
    async fn test_move_dir_contents() {
        let temp = tempfile::tempdir().unwrap();
        let from = temp.path().join("old");
        let to = temp.path().join("new");
        std::fs::create_dir_all(from.join("sub")).unwrap();
        std::fs::create_dir(&to).unwrap();
        std::fs::write(from.join("a.mp3"), "audio").unwrap();

        move_dir_contents(&from, &to).await.unwrap();

        assert!(!from.exists());
        assert_eq!(std::fs::read_to_string(to.join("a.mp3")).unwrap(), "audio");
        assert!(to.join("sub").is_dir());
    }

    #[test]
    fn test_mtime_is_stable() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("a.txt");
        std::fs::write(&path, "data").unwrap();
        assert_eq!(mtime_micros(&path).unwrap(), mtime_micros(&path).unwrap());
        assert!(mtime_micros(&temp.path().join("missing")).is_err());
    }
}
