use anyhow::{Context, Result};
use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use super::backend::{validate_key, ObjectInfo, ObjectStore, StorageError};

/// Object store backed by a local directory
///
/// `{id}/` maps to a directory, `{id}/{n}.mp4` to a file inside it. Writes go
/// to a temporary sibling first and are renamed into place, so a listed
/// object is always complete.
pub struct LocalFsObjectStore {
    root: PathBuf,
}

impl LocalFsObjectStore {
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)
            .with_context(|| format!("Failed to create storage root: {:?}", root))?;

        info!("Local object store at {:?}", root);

        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.root.join(key.trim_end_matches('/'))
    }
}

#[async_trait::async_trait]
impl ObjectStore for LocalFsObjectStore {
    async fn put(&self, key: &str, payload: Bytes, _content_type: &str) -> Result<(), StorageError> {
        validate_key(key)?;
        let path = self.path_for(key);

        if key.ends_with('/') {
            fs::create_dir_all(&path).await?;
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut tmp = path.clone().into_os_string();
        tmp.push(".partial");
        let tmp = PathBuf::from(tmp);

        fs::write(&tmp, &payload).await?;
        fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn list(&self, prefix: &str) -> Result<Vec<ObjectInfo>, StorageError> {
        let mut objects = Vec::new();
        let mut pending = vec![(self.root.clone(), String::new())];

        while let Some((dir, key_prefix)) = pending.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().into_owned();
                if name.ends_with(".partial") {
                    continue;
                }

                let metadata = entry.metadata().await?;
                if metadata.is_dir() {
                    let key = format!("{}{}/", key_prefix, name);
                    // Only descend into directories that can hold matches
                    if key.starts_with(prefix) || prefix.starts_with(&key) {
                        if key.starts_with(prefix) {
                            objects.push(ObjectInfo { key: key.clone(), size: 0 });
                        }
                        pending.push((entry.path(), key));
                    }
                } else {
                    let key = format!("{}{}", key_prefix, name);
                    if key.starts_with(prefix) {
                        objects.push(ObjectInfo {
                            key,
                            size: metadata.len(),
                        });
                    }
                }
            }
        }

        objects.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(objects)
    }

    fn name(&self) -> &str {
        "local"
    }
}
