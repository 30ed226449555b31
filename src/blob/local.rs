use std::path::{Component, Path, PathBuf};
use tracing::debug;
use uuid::Uuid;
use crate::blob::{BlobError, BlobResult, BlobStore, StoredBlob};
use crate::entities::{MediaType, UploadFile};
use crate::utils::file_utils::resolve_extension;

/// Blob store on the local filesystem. An object with public id `a/b/c` is
/// the file `<root>/a/b/c.<ext>` and is served at `<public_url>/a/b/c.<ext>`.
pub struct LocalBlobStore {
    root: PathBuf,
    public_url: String,
}

impl LocalBlobStore {
    pub fn new(root: PathBuf, public_url: String) -> Self {
        Self {
            root,
            public_url: public_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn checked_path(&self, key: &str) -> BlobResult<PathBuf> {
        let relative = Path::new(key);
        let is_plain = !key.is_empty() && relative.components().all(|x| matches!(x, Component::Normal(_)));
        if !is_plain {
            return Err(BlobError::invalid_key(key));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait::async_trait]
impl BlobStore for LocalBlobStore {
    async fn upload(&self, folder: &str, _kind: MediaType, file: &UploadFile) -> BlobResult<StoredBlob> {
        let extension = resolve_extension(&file.file_name, &file.content_type);
        let public_id = format!("{}/{}", folder.trim_matches('/'), Uuid::new_v4().simple());
        let object_name = format!("{public_id}.{extension}");
        let path = self.checked_path(&object_name)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &file.bytes).await?;
        debug!("blob written: {}", path.display());
        Ok(StoredBlob {
            url: format!("{}/{}", self.public_url, object_name),
            public_id,
        })
    }

    async fn delete(&self, public_id: &str, _kind: MediaType) -> BlobResult<()> {
        let path = self.checked_path(public_id)?;
        let (Some(dir), Some(stem)) = (path.parent(), path.file_name()) else {
            return Err(BlobError::invalid_key(public_id));
        };
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(BlobError::not_found(public_id)),
            Err(e) => return Err(e.into()),
        };
        let mut removed = false;
        while let Some(entry) = entries.next_entry().await? {
            let entry_path = entry.path();
            if entry.file_type().await?.is_file() && entry_path.file_stem() == Some(stem) {
                tokio::fs::remove_file(&entry_path).await?;
                debug!("blob removed: {}", entry_path.display());
                removed = true;
            }
        }
        if !removed {
            return Err(BlobError::not_found(public_id));
        }
        Ok(())
    }

    async fn delete_folder(&self, folder: &str) -> BlobResult<()> {
        let path = self.checked_path(folder.trim_matches('/'))?;
        match tokio::fs::remove_dir_all(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
