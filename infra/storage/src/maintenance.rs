use crate::engine::TMP_MARKER;
use std::path::Path;
use std::time::{Duration, SystemTime};
use tracing::{error, info, warn};
use walkdir::{DirEntry, WalkDir};

/// Temp files younger than this may belong to a write still in flight.
const STALE_AFTER: Duration = Duration::from_secs(300);

pub(crate) async fn purge_tmp(root: &Path) {
    let root = root.to_path_buf();
    let now = SystemTime::now();

    match tokio::task::spawn_blocking(move || remove_stale(&root, now, STALE_AFTER)).await {
        Ok((removed, failed)) if removed > 0 || failed > 0 => {
            info!(removed, failed, "Cleaned up temporary files");
        },
        Err(e) => {
            error!(error = %e, "Temp file cleanup task panicked");
        },
        _ => {},
    }
}

pub(crate) fn remove_stale(root: &Path, now: SystemTime, threshold: Duration) -> (usize, usize) {
    let mut removed = 0;
    let mut failed = 0;

    WalkDir::new(root)
        .contents_first(true)
        .into_iter()
        .flatten()
        .filter(|e| e.path() != root)
        .for_each(|entry| {
            let path = entry.path();

            if entry.file_type().is_file() {
                if is_tmp(&entry) && is_stale(&entry, now, threshold) {
                    match std::fs::remove_file(path) {
                        Ok(()) => removed += 1,
                        Err(e) => {
                            warn!(path = %path.display(), error = %e, "Failed to remove temp file");
                            failed += 1;
                        },
                    }
                }
            } else if entry.file_type().is_dir() {
                // Only succeeds for directories left empty by deletes or purged temps.
                let _ = std::fs::remove_dir(path);
            }
        });

    (removed, failed)
}

fn is_tmp(entry: &DirEntry) -> bool {
    entry.file_name().to_str().is_some_and(|name| name.contains(TMP_MARKER))
}

fn is_stale(entry: &DirEntry, now: SystemTime, threshold: Duration) -> bool {
    std::fs::metadata(entry.path())
        .ok()
        .and_then(|m| m.modified().ok())
        .and_then(|modified| now.duration_since(modified).ok())
        .is_none_or(|age| age > threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_stale_temp_files_are_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let key_dir = tmp.path().join("flags").join("dark_mode");
        std::fs::create_dir_all(&key_dir).unwrap();
        std::fs::write(key_dir.join(".value"), "{}").unwrap();
        std::fs::write(key_dir.join(".value.fstmp.7"), "partial").unwrap();

        let (removed, failed) = remove_stale(tmp.path(), SystemTime::now(), STALE_AFTER);
        assert_eq!((removed, failed), (0, 0), "fresh temp files are left alone");

        let later = SystemTime::now() + Duration::from_secs(600);
        let (removed, failed) = remove_stale(tmp.path(), later, STALE_AFTER);
        assert_eq!((removed, failed), (1, 0));
        assert!(key_dir.join(".value").exists());
        assert!(!key_dir.join(".value.fstmp.7").exists());
    }

    #[test]
    fn empty_directories_are_removed() {
        let tmp = tempfile::tempdir().unwrap();
        let empty = tmp.path().join("users").join("u1");
        std::fs::create_dir_all(&empty).unwrap();

        remove_stale(tmp.path(), SystemTime::now(), STALE_AFTER);
        assert!(!tmp.path().join("users").exists());
    }
}
