//! Derivative catalog
//!
//! Derivable index over the derivative root. The descriptors for an original are
//! rebuilt on every call from the file names in its mirrored directory, so there
//! is nothing to keep in sync with the generator.

use crate::naming::{original_stem, parse_derivative_name};
use crate::selector::select_best;
use folio_core::{DerivativeDescriptor, DerivativeLink, Encoding};
use folio_storage::keys::child_key;
use folio_storage::{normalize_key, LocalStorage, StorageResult};

#[derive(Clone, Debug)]
pub struct DerivativeCatalog {
    storage: LocalStorage,
}

impl DerivativeCatalog {
    pub fn new(storage: LocalStorage) -> Self {
        Self { storage }
    }

    /// Derivatives of one original, ordered by width, then encoding, then path.
    pub async fn descriptors_for(&self, original_rel: &str) -> StorageResult<Vec<DerivativeDescriptor>> {
        let key = normalize_key(original_rel)?;
        let (dir, stem) = original_stem(&key);

        let mut descriptors: Vec<DerivativeDescriptor> = self
            .storage
            .list_dir(dir)
            .await?
            .into_iter()
            .filter_map(|name| {
                parse_derivative_name(&name, &stem).map(|(width, encoding)| DerivativeDescriptor {
                    rel: child_key(dir, &name),
                    width,
                    encoding,
                })
            })
            .collect();

        descriptors.sort_by(|a, b| {
            (a.width, a.encoding.extension(), &a.rel).cmp(&(b.width, b.encoding.extension(), &b.rel))
        });
        Ok(descriptors)
    }

    /// URL of the best derivative for the cap and preference, if any exist.
    pub async fn best_url(
        &self,
        original_rel: &str,
        max_width: u32,
        prefer: Encoding,
    ) -> StorageResult<Option<String>> {
        let candidates = self.descriptors_for(original_rel).await?;
        let best = select_best(&candidates, max_width, prefer);

        if let Some(chosen) = best {
            tracing::debug!(
                rel = %original_rel,
                max_width,
                prefer = %prefer,
                chosen = %chosen.rel,
                candidates = candidates.len(),
                "Selected derivative"
            );
        }

        Ok(best.map(|d| self.storage.generate_url(&d.rel)))
    }

    pub async fn links_for(&self, original_rel: &str) -> StorageResult<Vec<DerivativeLink>> {
        Ok(self
            .descriptors_for(original_rel)
            .await?
            .into_iter()
            .map(|d| DerivativeLink {
                url: self.storage.generate_url(&d.rel),
                width: d.width,
                encoding: d.encoding,
            })
            .collect())
    }

    /// Best-effort removal of every derivative of an original. Returns how many were deleted.
    pub async fn delete_for(&self, original_rel: &str) -> usize {
        let descriptors = match self.descriptors_for(original_rel).await {
            Ok(descriptors) => descriptors,
            Err(e) => {
                tracing::warn!(rel = %original_rel, error = %e, "Failed to scan derivatives for deletion");
                return 0;
            }
        };

        let mut deleted = 0;
        for descriptor in &descriptors {
            if self.storage.delete_best_effort(&descriptor.rel).await {
                deleted += 1;
            }
        }
        deleted
    }

    /// Every file under the derivative root, optionally narrowed to a prefix.
    pub async fn list(&self, prefix: Option<&str>) -> StorageResult<Vec<String>> {
        self.storage.list(prefix).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    async fn catalog_with(dir: &Path, files: &[&str]) -> DerivativeCatalog {
        for file in files {
            let path = dir.join(file);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, b"x").unwrap();
        }
        DerivativeCatalog::new(LocalStorage::new(dir, "/media-deriv").await.unwrap())
    }

    #[tokio::test]
    async fn test_descriptors_only_match_own_stem() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog_with(
            dir.path(),
            &[
                "g/photo_w800.webp",
                "g/photo_w480.avif",
                "g/photo_1_w800.webp",
                "g/photo_w800.txt",
                "photo_w800.webp",
            ],
        )
        .await;

        let descriptors = catalog.descriptors_for("g/photo.jpg").await.unwrap();
        let rels: Vec<&str> = descriptors.iter().map(|d| d.rel.as_str()).collect();
        assert_eq!(rels, vec!["g/photo_w480.avif", "g/photo_w800.webp"]);
    }

    #[tokio::test]
    async fn test_best_url_closest_under() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog_with(
            dir.path(),
            &[
                "p_w480.webp",
                "p_w800.webp",
                "p_w800.avif",
                "p_w1280.webp",
                "p_w2048.webp",
            ],
        )
        .await;

        assert_eq!(
            catalog.best_url("p.jpg", 1000, Encoding::Avif).await.unwrap(),
            Some("/media-deriv/p_w800.avif".to_string())
        );
        assert_eq!(
            catalog.best_url("p.jpg", 100, Encoding::Avif).await.unwrap(),
            Some("/media-deriv/p_w480.webp".to_string())
        );
    }

    #[tokio::test]
    async fn test_best_url_none_without_derivatives() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog_with(dir.path(), &[]).await;
        assert_eq!(catalog.best_url("p.jpg", 800, Encoding::WebP).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_for_removes_only_matching() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = catalog_with(dir.path(), &["p_w480.webp", "p_w800.webp", "q_w800.webp"]).await;

        assert_eq!(catalog.delete_for("p.png").await, 2);
        assert_eq!(catalog.list(None).await.unwrap(), vec!["q_w800.webp".to_string()]);
    }
}
