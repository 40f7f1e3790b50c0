use crate::error::{StorageError, StorageResult};
use crate::keys::{child_key, join_url, normalize_key, split_key, to_key};
use chrono::{DateTime, Utc};
use folio_core::StoredOriginal;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};

/// Upper bound on the bytes read from an upload stream per iteration (1 MiB).
pub const CHUNK_SIZE: usize = 1024 * 1024;

/// Size, MIME type and modification time of one stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileStat {
    pub size: u64,
    pub mime: String,
    pub modified_at: Option<DateTime<Utc>>,
}

/// Local filesystem storage rooted at one directory and served under one URL prefix.
#[derive(Clone, Debug)]
pub struct LocalStorage {
    base_path: PathBuf,
    base_url: String,
}

impl LocalStorage {
    /// Create a new LocalStorage, creating the root directory if needed.
    ///
    /// # Arguments
    /// * `base_path` - Root directory (e.g., "./media")
    /// * `base_url` - URL prefix the root is served under (e.g., "/media")
    pub async fn new(base_path: impl Into<PathBuf>, base_url: impl Into<String>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalStorage {
            base_path,
            base_url: base_url.into(),
        })
    }

    /// Resolve a key to an absolute path under the root.
    pub fn key_to_path(&self, key: &str) -> StorageResult<PathBuf> {
        let key = normalize_key(key)?;
        if key.is_empty() {
            return Ok(self.base_path.clone());
        }
        Ok(self.base_path.join(key))
    }

    /// Public URL for a key: `{base_url}/{key}`.
    pub fn generate_url(&self, key: &str) -> String {
        join_url(&self.base_url, key)
    }

    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn is_file(path: &Path) -> bool {
        fs::metadata(path)
            .await
            .map(|m| m.is_file())
            .unwrap_or(false)
    }

    /// Return a key for `desired` that does not collide with an existing file.
    ///
    /// The desired key is returned unchanged when free. Otherwise `_1`, `_2`, ... is
    /// appended to the file stem until an unused name is found.
    pub async fn allocate_unique(&self, desired: &str) -> StorageResult<String> {
        let key = normalize_key(desired)?;
        if key.is_empty() {
            return Err(StorageError::InvalidKey("Filename is empty".to_string()));
        }

        if !fs::try_exists(self.key_to_path(&key)?).await? {
            return Ok(key);
        }

        let (dir, name) = split_key(&key);
        let name_path = Path::new(name);
        let stem = name_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| name.to_string());
        let suffix = name_path
            .extension()
            .map(|e| format!(".{}", e.to_string_lossy()))
            .unwrap_or_default();

        let mut i: u64 = 1;
        loop {
            let candidate = child_key(dir, &format!("{}_{}{}", stem, i, suffix));
            if !fs::try_exists(self.key_to_path(&candidate)?).await? {
                tracing::debug!(desired = %key, allocated = %candidate, "Filename collision resolved");
                return Ok(candidate);
            }
            i += 1;
        }
    }

    /// Stream `reader` into a newly allocated file named after `filename`.
    ///
    /// The stream is consumed in chunks of at most [`CHUNK_SIZE`] bytes. When the running
    /// total exceeds `max_bytes` the partial file is removed and
    /// [`StorageError::PayloadTooLarge`] is returned. Any other failure also removes the
    /// partial file.
    pub async fn ingest<R>(
        &self,
        filename: &str,
        mut reader: R,
        max_bytes: u64,
    ) -> StorageResult<StoredOriginal>
    where
        R: AsyncRead + Unpin,
    {
        let key = self.allocate_unique(filename).await?;
        let path = self.key_to_path(&key)?;
        self.ensure_parent_dir(&path).await?;

        let start = Instant::now();

        match Self::write_chunks(&path, &mut reader, max_bytes).await {
            Ok(size_bytes) => {
                let url = self.generate_url(&key);
                tracing::info!(
                    path = %path.display(),
                    rel = %key,
                    size_bytes,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "Stream ingest successful"
                );
                Ok(StoredOriginal {
                    rel: key,
                    url,
                    size_bytes,
                })
            }
            Err(err) => {
                tracing::warn!(rel = %key, error = %err, "Stream ingest aborted");
                if let Err(e) = fs::remove_file(&path).await {
                    if e.kind() != std::io::ErrorKind::NotFound {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to remove partial upload"
                        );
                    }
                }
                Err(err)
            }
        }
    }

    async fn write_chunks<R>(path: &Path, reader: &mut R, max_bytes: u64) -> StorageResult<u64>
    where
        R: AsyncRead + Unpin,
    {
        let mut file = fs::File::create(path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        let mut buf = vec![0u8; CHUNK_SIZE];
        let mut bytes_seen: u64 = 0;

        loop {
            let n = reader.read(&mut buf).await.map_err(|e| {
                StorageError::UploadFailed(format!("Failed to read upload stream: {}", e))
            })?;
            if n == 0 {
                break;
            }

            bytes_seen += n as u64;
            if bytes_seen > max_bytes {
                return Err(StorageError::PayloadTooLarge { max: max_bytes });
            }

            file.write_all(&buf[..n]).await.map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to write file {}: {}",
                    path.display(),
                    e
                ))
            })?;
        }

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        Ok(bytes_seen)
    }

    /// Recursively list file keys under the root, optionally narrowed to `prefix`.
    ///
    /// A missing root (or prefix directory) yields an empty list. Keys are sorted.
    pub async fn list(&self, prefix: Option<&str>) -> StorageResult<Vec<String>> {
        let start_dir = match prefix {
            Some(p) => self.key_to_path(p)?,
            None => self.base_path.clone(),
        };
        let base = self.base_path.clone();

        let keys = tokio::task::spawn_blocking(move || {
            if !start_dir.exists() {
                return Vec::new();
            }
            let mut keys: Vec<String> = walkdir::WalkDir::new(&start_dir)
                .into_iter()
                .filter_map(|entry| entry.ok())
                .filter(|entry| entry.file_type().is_file())
                .filter_map(|entry| {
                    entry
                        .path()
                        .strip_prefix(&base)
                        .ok()
                        .map(to_key)
                })
                .collect();
            keys.sort();
            keys
        })
        .await
        .map_err(|e| StorageError::IoError(std::io::Error::other(e)))?;

        Ok(keys)
    }

    /// File names (not keys) directly inside a directory key. Missing directory yields empty.
    pub async fn list_dir(&self, dir_key: &str) -> StorageResult<Vec<String>> {
        let dir = self.key_to_path(dir_key)?;
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut names = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await.map(|t| t.is_file()).unwrap_or(false) {
                names.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Whether a regular file exists at `key`.
    pub async fn exists(&self, key: &str) -> StorageResult<bool> {
        let path = self.key_to_path(key)?;
        Ok(Self::is_file(&path).await)
    }

    /// Size, MIME type (inferred from the extension) and modification time.
    pub async fn stat(&self, key: &str) -> StorageResult<FileStat> {
        let path = self.key_to_path(key)?;
        let meta = match fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Err(StorageError::NotFound(key.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StorageError::NotFound(key.to_string()))
            }
            Err(e) => return Err(e.into()),
        };

        let mime = mime_guess::from_path(&path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();

        Ok(FileStat {
            size: meta.len(),
            mime,
            modified_at: meta.modified().ok().map(DateTime::<Utc>::from),
        })
    }

    /// Delete a file. Fails with [`StorageError::NotFound`] if nothing is stored at `key`.
    pub async fn delete(&self, key: &str) -> StorageResult<()> {
        let path = self.key_to_path(key)?;
        let start = Instant::now();

        if !Self::is_file(&path).await {
            return Err(StorageError::NotFound(key.to_string()));
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            rel = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    /// Delete a file, logging and swallowing any failure. Returns whether the file was removed.
    pub async fn delete_best_effort(&self, key: &str) -> bool {
        match self.delete(key).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(rel = %key, error = %e, "Best-effort delete failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn storage(dir: &Path) -> LocalStorage {
        LocalStorage::new(dir, "/media").await.unwrap()
    }

    #[tokio::test]
    async fn test_allocate_unique_returns_desired_when_free() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        assert_eq!(storage.allocate_unique("photo.jpg").await.unwrap(), "photo.jpg");
    }

    #[tokio::test]
    async fn test_allocate_unique_appends_increasing_suffix() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        std::fs::write(dir.path().join("photo.jpg"), b"a").unwrap();
        std::fs::write(dir.path().join("photo_1.jpg"), b"b").unwrap();

        assert_eq!(storage.allocate_unique("photo.jpg").await.unwrap(), "photo_2.jpg");
    }

    #[tokio::test]
    async fn test_allocate_unique_without_extension() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        std::fs::write(dir.path().join("README"), b"a").unwrap();

        assert_eq!(storage.allocate_unique("README").await.unwrap(), "README_1");
    }

    #[tokio::test]
    async fn test_ingest_twice_yields_suffixed_name() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let first = storage
            .ingest("photo.jpg", &b"first"[..], 1024)
            .await
            .unwrap();
        let second = storage
            .ingest("photo.jpg", &b"second"[..], 1024)
            .await
            .unwrap();

        assert_eq!(first.rel, "photo.jpg");
        assert_eq!(second.rel, "photo_1.jpg");
        assert_eq!(first.url, "/media/photo.jpg");
        assert_eq!(second.url, "/media/photo_1.jpg");
        assert_eq!(std::fs::read(dir.path().join("photo_1.jpg")).unwrap(), b"second");
    }

    #[tokio::test]
    async fn test_ingest_exactly_max_bytes_succeeds() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        let data = vec![7u8; 4096];

        let stored = storage.ingest("exact.bin", &data[..], 4096).await.unwrap();
        assert_eq!(stored.size_bytes, 4096);
    }

    #[tokio::test]
    async fn test_ingest_over_limit_leaves_no_residue() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        let max_bytes = (CHUNK_SIZE as u64) * 2;
        let reader = tokio::io::repeat(0xAB).take(max_bytes + 1);

        let result = storage.ingest("big.jpg", reader, max_bytes).await;

        assert!(matches!(
            result,
            Err(StorageError::PayloadTooLarge { max }) if max == max_bytes
        ));
        assert!(storage.list(None).await.unwrap().is_empty());
        assert!(!dir.path().join("big.jpg").exists());
    }

    #[tokio::test]
    async fn test_ingest_rejects_traversal() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        let result = storage.ingest("../escape.jpg", &b"x"[..], 16).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_list_with_prefix_and_missing_root() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        std::fs::create_dir_all(dir.path().join("weddings/2024")).unwrap();
        std::fs::write(dir.path().join("weddings/2024/a.jpg"), b"a").unwrap();
        std::fs::write(dir.path().join("top.jpg"), b"b").unwrap();

        assert_eq!(
            storage.list(None).await.unwrap(),
            vec!["top.jpg".to_string(), "weddings/2024/a.jpg".to_string()]
        );
        assert_eq!(
            storage.list(Some("weddings")).await.unwrap(),
            vec!["weddings/2024/a.jpg".to_string()]
        );
        assert!(storage.list(Some("missing")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_dir_only_returns_files() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        std::fs::create_dir_all(dir.path().join("a/nested")).unwrap();
        std::fs::write(dir.path().join("a/x_w800.webp"), b"x").unwrap();

        assert_eq!(storage.list_dir("a").await.unwrap(), vec!["x_w800.webp".to_string()]);
        assert!(storage.list_dir("nope").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_stat_reports_size_and_mime() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        std::fs::write(dir.path().join("photo.png"), b"12345").unwrap();

        let stat = storage.stat("/photo.png").await.unwrap();
        assert_eq!(stat.size, 5);
        assert_eq!(stat.mime, "image/png");
        assert!(stat.modified_at.is_some());

        assert!(matches!(
            storage.stat("missing.png").await,
            Err(StorageError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_stat_unknown_extension_is_octet_stream() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        std::fs::write(dir.path().join("blob.unknownext"), b"1").unwrap();

        let stat = storage.stat("blob.unknownext").await.unwrap();
        assert_eq!(stat.mime, "application/octet-stream");
    }

    #[tokio::test]
    async fn test_delete_missing_is_not_found() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;

        assert!(matches!(
            storage.delete("nope.jpg").await,
            Err(StorageError::NotFound(_))
        ));
        assert!(!storage.delete_best_effort("nope.jpg").await);
    }

    #[tokio::test]
    async fn test_delete_removes_file() {
        let dir = tempdir().unwrap();
        let storage = storage(dir.path()).await;
        std::fs::write(dir.path().join("gone.jpg"), b"x").unwrap();

        storage.delete("gone.jpg").await.unwrap();
        assert!(!storage.exists("gone.jpg").await.unwrap());
    }
}
