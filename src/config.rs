use std::net::SocketAddr;
use std::path::PathBuf;
use clap::{Parser, ValueEnum};

#[derive(Parser, Debug, Clone)]
pub struct FlatConfig {
    #[arg(long, env = "PROOFED_STORAGE", value_enum, default_value_t = StorageBackend::File, help = "Persistence backend")]
    storage: StorageBackend,

    #[arg(long, env = "PROOFED_DB_PATH", default_value = "proofed.db.json", help = "JSON document path for the file backend")]
    db_path: PathBuf,

    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://proofed.sqlite?mode=rwc", help = "Connection string for the sql backend")]
    database_url: String,

    #[arg(long, env = "PROOFED_BLOB_BACKEND", value_enum, default_value_t = BlobBackend::Local, help = "Where media bytes are stored")]
    blob_backend: BlobBackend,

    #[arg(long, env = "PROOFED_BLOB_DIR", default_value = "proofed-blobs", help = "Root directory of the local blob store")]
    blob_dir: PathBuf,

    #[arg(long, env = "PROOFED_BLOB_PUBLIC_URL", default_value = "http://localhost:3000/blobs", help = "URL prefix of stored objects")]
    blob_public_url: String,

    #[arg(long, env = "PROOFED_BLOB_ROOT_FOLDER", default_value = "proofed", help = "Top-level blob folder")]
    blob_root_folder: String,

    #[arg(long, env = "S3_BUCKET_NAME", help = "S3 bucket name")]
    s3_bucket_name: Option<String>,

    #[arg(long, env = "S3_ACCOUNT_ID", help = "R2 account id")]
    s3_account_id: Option<String>,

    #[arg(long, env = "S3_ENDPOINT", help = "Custom S3 endpoint, used when no account id is set")]
    s3_endpoint: Option<String>,

    #[arg(long, env = "S3_REGION", default_value = "auto", help = "Region name sent to a custom endpoint")]
    s3_region: String,

    #[arg(long, env = "S3_ACCESS_KEY", help = "S3 access key")]
    s3_access_key: Option<String>,

    #[arg(long, env = "S3_SECRET_KEY", help = "S3 secret key")]
    s3_secret_key: Option<String>,

    #[arg(long, env = "PROOFED_BIND_ADDR", default_value = "[::]:3000", help = "HTTP listener address")]
    bind_addr: SocketAddr,

    #[arg(long, env = "PROOFED_MAX_UPLOAD_BYTES", default_value_t = 52_428_800, help = "Request body limit of upload routes")]
    max_upload_bytes: usize,

    #[arg(long, env = "PROOFED_MAX_FILES_PER_UPLOAD", default_value_t = 20, help = "Files accepted by a single upload request")]
    max_files_per_upload: usize,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Document,
    File,
    Sql,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlobBackend {
    Local,
    S3,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub storage: StorageConfig,
    pub blob: BlobConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub backend: StorageBackend, // PROOFED_STORAGE
    pub db_path: PathBuf, // PROOFED_DB_PATH
    pub database_url: String, // DATABASE_URL
}

#[derive(Debug, Clone)]
pub struct BlobConfig {
    pub backend: BlobBackend, // PROOFED_BLOB_BACKEND
    pub blob_dir: PathBuf, // PROOFED_BLOB_DIR
    pub public_url: String, // PROOFED_BLOB_PUBLIC_URL
    pub root_folder: String, // PROOFED_BLOB_ROOT_FOLDER
    pub s3: Option<S3Config>,
}

#[derive(Clone)]
pub struct S3Config {
    pub bucket_name: String, // S3_BUCKET_NAME
    pub account_id: Option<String>, // S3_ACCOUNT_ID
    pub endpoint: Option<String>, // S3_ENDPOINT
    pub region: String, // S3_REGION
    pub access_key: String, // S3_ACCESS_KEY
    pub secret_key: String, // S3_SECRET_KEY
}

impl std::fmt::Debug for S3Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Config")
            .field("bucket_name", &self.bucket_name)
            .field("account_id", &self.account_id)
            .field("endpoint", &self.endpoint)
            .field("region", &self.region)
            .field("access_key", &self.access_key)
            .field("secret_key", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub bind_addr: SocketAddr, // PROOFED_BIND_ADDR
    pub max_upload_bytes: usize, // PROOFED_MAX_UPLOAD_BYTES
    pub max_files_per_upload: usize, // PROOFED_MAX_FILES_PER_UPLOAD
}

impl From<FlatConfig> for Config {
    fn from(value: FlatConfig) -> Self {
        let s3 = match (value.s3_bucket_name, value.s3_access_key, value.s3_secret_key) {
            (Some(bucket_name), Some(access_key), Some(secret_key)) => Some(S3Config {
                bucket_name,
                account_id: value.s3_account_id,
                endpoint: value.s3_endpoint,
                region: value.s3_region,
                access_key,
                secret_key,
            }),
            _ => None,
        };
        Config {
            storage: StorageConfig {
                backend: value.storage,
                db_path: value.db_path,
                database_url: value.database_url,
            },
            blob: BlobConfig {
                backend: value.blob_backend,
                blob_dir: value.blob_dir,
                public_url: value.blob_public_url,
                root_folder: value.blob_root_folder,
                s3,
            },
            api: ApiConfig {
                bind_addr: value.bind_addr,
                max_upload_bytes: value.max_upload_bytes,
                max_files_per_upload: value.max_files_per_upload,
            },
        }
    }
}
