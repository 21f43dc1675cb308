use crate::configuration::UploadSettings;
use axum::body::Bytes;
use chrono::Utc;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};
use uuid::Uuid;

/// An uploaded file held in memory until its form has been accepted.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub file_name: Option<String>,
    pub bytes: Bytes,
}

/// Stores uploaded images on disk and hands out their public paths.
#[derive(Debug, Clone)]
pub struct UploadStore {
    directory: PathBuf,
    public_prefix: String,
}

impl UploadStore {
    pub fn new(settings: &UploadSettings) -> Self {
        Self {
            directory: PathBuf::from(&settings.directory),
            public_prefix: settings.public_prefix.trim_end_matches('/').to_string(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn public_prefix(&self) -> &str {
        &self.public_prefix
    }

    /// Writes `bytes` as `{field}-{millis}-{uuid}{ext}` and returns its public path.
    pub async fn save(
        &self,
        field: &str,
        original_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<String, std::io::Error> {
        fs::create_dir_all(&self.directory).await?;
        let name = format!(
            "{field}-{}-{}{}",
            Utc::now().timestamp_millis(),
            Uuid::new_v4().simple(),
            extension(original_name)
        );
        fs::write(self.directory.join(&name), bytes).await?;
        info!("stored upload {name} ({} bytes)", bytes.len());
        Ok(format!("{}/{name}", self.public_prefix))
    }

    /// Saves every pending file. If one write fails the files already
    /// written are removed again.
    pub async fn save_all(
        &self,
        field: &str,
        pending: &[PendingUpload],
    ) -> Result<Vec<String>, std::io::Error> {
        let mut saved = Vec::with_capacity(pending.len());
        for upload in pending {
            match self.save(field, upload.file_name.as_deref(), &upload.bytes).await {
                Ok(path) => saved.push(path),
                Err(err) => {
                    self.remove_all(&saved).await;
                    return Err(err);
                }
            }
        }
        Ok(saved)
    }

    /// Deletes a file by the public path `save` returned. Paths outside
    /// this store are refused.
    pub async fn remove(&self, public_path: &str) -> Result<(), std::io::Error> {
        let name = public_path
            .strip_prefix(&self.public_prefix)
            .and_then(|rest| rest.strip_prefix('/'))
            .filter(|name| !name.is_empty() && !name.contains(['/', '\\']) && *name != "..")
            .ok_or_else(|| {
                std::io::Error::new(ErrorKind::InvalidInput, format!("not an upload: {public_path}"))
            })?;
        fs::remove_file(self.directory.join(name)).await?;
        info!("removed upload {name}");
        Ok(())
    }

    /// Best-effort cleanup; failures are logged.
    pub async fn remove_all(&self, public_paths: &[String]) {
        for path in public_paths {
            if let Err(err) = self.remove(path).await {
                warn!("failed to remove upload {path}: {err}");
            }
        }
    }
}

/// Lower-cased extension with a leading dot, or nothing for odd names.
fn extension(original_name: Option<&str>) -> String {
    original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.len() <= 5 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extensions_are_sanitised() {
        assert_eq!(extension(Some("Car.JPG")), ".jpg");
        assert_eq!(extension(Some("../../etc/passwd")), "");
        assert_eq!(extension(Some("x.p/hp")), "");
        assert_eq!(extension(Some("archive.tar.gz")), ".gz");
        assert_eq!(extension(None), "");
    }

    #[tokio::test]
    async fn saved_files_land_under_directory() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = UploadStore::new(&UploadSettings {
            directory: dir.path().join("images").to_string_lossy().to_string(),
            public_prefix: "/images/".to_string(),
            max_body_bytes: 1024,
        });
        let path = store
            .save("imagesupld", Some("front.png"), b"png-bytes")
            .await
            .expect("Failed to save");
        assert!(path.starts_with("/images/imagesupld-"));
        assert!(path.ends_with(".png"));

        let file_name = path.trim_start_matches("/images/");
        let stored = std::fs::read(store.directory().join(file_name)).unwrap();
        assert_eq!(stored, b"png-bytes");
    }

    #[tokio::test]
    async fn removed_files_are_gone_and_foreign_paths_refused() {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let store = UploadStore::new(&UploadSettings {
            directory: dir.path().to_string_lossy().to_string(),
            public_prefix: "/images".to_string(),
            max_body_bytes: 1024,
        });
        let pending = vec![
            PendingUpload {
                file_name: Some("a.jpg".to_string()),
                bytes: Bytes::from_static(b"a"),
            },
            PendingUpload {
                file_name: Some("b.jpg".to_string()),
                bytes: Bytes::from_static(b"b"),
            },
        ];
        let saved = store.save_all("imagesupld", &pending).await.unwrap();
        assert_eq!(saved.len(), 2);

        store.remove_all(&saved).await;
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);

        for foreign in ["/images/../secret", "/other/a.jpg", "/images/", "/images/x/y.jpg"] {
            assert!(store.remove(foreign).await.is_err(), "{foreign}");
        }
    }
}
