use s3::{Bucket, Region};
use s3::creds::Credentials;
use tracing::debug;
use uuid::Uuid;
use crate::blob::{BlobError, BlobResult, BlobStore, StoredBlob};
use crate::config::S3Config;
use crate::entities::{MediaType, UploadFile};
use crate::utils::file_utils::resolve_extension;

/// Blob store on an S3-compatible bucket (R2 when an account id is set,
/// otherwise a custom endpoint). Object keys are `<public_id>.<ext>`.
pub struct S3BlobStore {
    bucket: Bucket,
    public_url: String,
}

impl S3BlobStore {
    pub fn new(conf: &S3Config, public_url: String) -> BlobResult<Self> {
        Ok(Self {
            bucket: get_bucket(conf)?,
            public_url: public_url.trim_end_matches('/').to_string(),
        })
    }

    fn object_url(&self, key: &str) -> String {
        format!("{}/{}", self.public_url, key)
    }

    async fn delete_prefix(&self, prefix: String) -> BlobResult<usize> {
        let pages = self.bucket.list(prefix, None).await.map_err(BlobError::backend)?;
        let mut deleted = 0;
        for object in pages.iter().flat_map(|x| x.contents.iter()) {
            self.bucket.delete_object(&object.key).await.map_err(BlobError::backend)?;
            debug!("s3 object removed: {}", &object.key);
            deleted += 1;
        }
        Ok(deleted)
    }
}

#[async_trait::async_trait]
impl BlobStore for S3BlobStore {
    async fn upload(&self, folder: &str, _kind: MediaType, file: &UploadFile) -> BlobResult<StoredBlob> {
        let extension = resolve_extension(&file.file_name, &file.content_type);
        let public_id = format!("{}/{}", folder.trim_matches('/'), Uuid::new_v4().simple());
        let key = object_key(&public_id, &extension);
        let response = self.bucket.put_object_with_content_type(&key, &file.bytes, &file.content_type)
            .await
            .map_err(BlobError::backend)?;
        let status = response.status_code();
        if !(200..300).contains(&status) {
            return Err(BlobError::upload_failed(format!("bucket answered {} for {}", status, &key)));
        }
        Ok(StoredBlob {
            url: self.object_url(&key),
            public_id,
        })
    }

    async fn delete(&self, public_id: &str, _kind: MediaType) -> BlobResult<()> {
        if public_id.trim_matches('/').is_empty() {
            return Err(BlobError::invalid_key(public_id));
        }
        let deleted = self.delete_prefix(format!("{}.", public_id.trim_matches('/'))).await?;
        if deleted == 0 {
            return Err(BlobError::not_found(public_id));
        }
        Ok(())
    }

    async fn delete_folder(&self, folder: &str) -> BlobResult<()> {
        let folder = folder.trim_matches('/');
        if folder.is_empty() {
            return Err(BlobError::invalid_key(folder));
        }
        self.delete_prefix(format!("{}/", folder)).await?;
        Ok(())
    }
}

fn object_key(public_id: &str, extension: &str) -> String {
    format!("{}.{}", public_id.trim_matches('/'), extension)
}

fn get_bucket(conf: &S3Config) -> BlobResult<Bucket> {
    let region = match (&conf.account_id, &conf.endpoint) {
        (Some(account_id), _) => Region::R2 { account_id: account_id.clone() },
        (None, Some(endpoint)) => Region::Custom { region: conf.region.clone(), endpoint: endpoint.clone() },
        (None, None) => return Err(BlobError::misconfigured("S3 needs either an account id or an endpoint")),
    };
    let credentials = Credentials::new(Some(conf.access_key.as_str()), Some(conf.secret_key.as_str()), None, None, None)
        .map_err(BlobError::backend)?;
    let bucket = Bucket::new(conf.bucket_name.as_str(), region, credentials)
        .map_err(BlobError::backend)?
        .with_path_style();
    Ok(bucket)
}
