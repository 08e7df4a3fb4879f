//! 对象存储来源
//!
//! 在桶+前缀下列举 `.dcm` 对象，并在解析前下载到本地暂存目录。

use crate::source::{CandidateSource, Candidates, FileRef};
use async_trait::async_trait;
use futures::TryStreamExt;
use ingest_core::utils::is_dicom_name;
use ingest_core::{IngestError, Result};
use object_store::aws::AmazonS3Builder;
use object_store::path::Path as ObjectPath;
use object_store::{ObjectMeta, ObjectStore};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info};

/// S3兼容存储的连接参数
#[derive(Debug, Clone, Default)]
pub struct S3Location {
    pub bucket: String,
    pub prefix: String,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

/// 对象存储来源
#[derive(Debug)]
pub struct ObjectStoreSource {
    store: Arc<dyn ObjectStore>,
    bucket: String,
    prefix: String,
    staging_dir: PathBuf,
}

impl ObjectStoreSource {
    pub fn new(
        store: Arc<dyn ObjectStore>,
        bucket: impl Into<String>,
        prefix: impl Into<String>,
        staging_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            prefix: prefix.into(),
            staging_dir: staging_dir.into(),
        }
    }

    /// 根据S3参数构建来源，凭据原样传给客户端
    pub fn s3(location: &S3Location, staging_dir: impl Into<PathBuf>) -> Result<Self> {
        let mut builder = AmazonS3Builder::new().with_bucket_name(&location.bucket);

        if let Some(region) = &location.region {
            builder = builder.with_region(region);
        }
        if let Some(endpoint) = &location.endpoint {
            builder = builder.with_endpoint(endpoint).with_allow_http(true);
        }
        if let (Some(access_key), Some(secret_key)) = (&location.access_key, &location.secret_key) {
            builder = builder
                .with_access_key_id(access_key)
                .with_secret_access_key(secret_key);
        }

        let store = builder
            .build()
            .map_err(|e| IngestError::Config(format!("无法创建S3客户端: {}", e)))?;

        Ok(Self::new(
            Arc::new(store),
            location.bucket.clone(),
            location.prefix.clone(),
            staging_dir,
        ))
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// 键前缀按原始字符串匹配，可以在路径段中间结束（如 `scans/p`）
    fn key_prefix(&self) -> &str {
        self.prefix.trim_start_matches('/')
    }

    /// 实际列举的目录：键前缀最后一个 `/` 之前的部分
    fn listing_prefix(&self) -> Option<ObjectPath> {
        let prefix = self.key_prefix();
        let parent = prefix.rfind('/').map(|i| &prefix[..i]).unwrap_or("");
        let parent = parent.trim_matches('/');
        (!parent.is_empty()).then(|| ObjectPath::from(parent))
    }

    /// 列出前缀下的全部DICOM对象键，跨越所有分页
    pub async fn list_keys(&self) -> Result<Vec<ObjectPath>> {
        let prefix = self.listing_prefix();
        let listing = self
            .store
            .list(prefix.as_ref())
            .try_collect::<Vec<ObjectMeta>>()
            .await;
        dicom_keys(listing, self.key_prefix())
    }

    /// 下载单个对象到 `staging_dir/<文件名>`
    pub async fn fetch(&self, key: &ObjectPath) -> Result<PathBuf> {
        let file_name = key
            .filename()
            .ok_or_else(|| IngestError::Fetch(format!("对象键没有文件名: {}", key)))?;
        let local_path = self.staging_dir.join(file_name);

        let data = self
            .store
            .get(key)
            .await
            .map_err(|e| IngestError::Fetch(format!("{}: {}", key, e)))?
            .bytes()
            .await
            .map_err(|e| IngestError::Fetch(format!("{}: {}", key, e)))?;

        tokio::fs::create_dir_all(&self.staging_dir).await?;
        tokio::fs::write(&local_path, &data).await?;

        debug!("已下载 {} ({} bytes) -> {:?}", key, data.len(), local_path);
        Ok(local_path)
    }
}

/// 将列举结果转换为前缀下的DICOM对象键；任何一页失败都使整个列举失败
fn dicom_keys(
    listing: object_store::Result<Vec<ObjectMeta>>,
    key_prefix: &str,
) -> Result<Vec<ObjectPath>> {
    let objects = listing.map_err(|e| IngestError::Listing(e.to_string()))?;
    Ok(objects
        .into_iter()
        .map(|meta| meta.location)
        .filter(|location| location.as_ref().starts_with(key_prefix))
        .filter(|location| is_dicom_name(location.as_ref()))
        .collect())
}

#[async_trait]
impl CandidateSource for ObjectStoreSource {
    fn describe(&self) -> String {
        format!("对象存储 {}/{}", self.bucket, self.prefix)
    }

    async fn enumerate(&self) -> Candidates<'_> {
        match self.list_keys().await {
            Ok(keys) => {
                info!("在 {} 下找到 {} 个DICOM对象", self.describe(), keys.len());
                Box::new(keys.into_iter().map(FileRef::Object))
            }
            Err(e) => {
                error!("列举DICOM对象失败 {}: {}", self.describe(), e);
                Box::new(std::iter::empty())
            }
        }
    }

    async fn stage(&self, file: &FileRef) -> Result<PathBuf> {
        match file {
            FileRef::Object(key) => self.fetch(key).await.map_err(|e| {
                error!("下载对象失败 {} (桶 {}): {}", key, self.bucket, e);
                match e {
                    IngestError::Fetch(_) => e,
                    other => IngestError::Fetch(format!("{}: {}", key, other)),
                }
            }),
            FileRef::Local(path) => Ok(path.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use object_store::memory::InMemory;
    use object_store::RetryConfig;
    use tempfile::TempDir;

    async fn seeded_store(keys: &[&str]) -> Arc<InMemory> {
        let store = Arc::new(InMemory::new());
        for key in keys {
            store
                .put(&ObjectPath::from(*key), Bytes::from(key.to_string()))
                .await
                .unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_list_keys_filters_extension_and_prefix() {
        let store = seeded_store(&[
            "scans/p1/a.dcm",
            "scans/p1/nested/b.dcm",
            "scans/p1/readme.txt",
            "other/c.dcm",
        ])
        .await;
        let dir = TempDir::new().unwrap();
        let source = ObjectStoreSource::new(store, "bucket", "scans/", dir.path());

        let mut keys: Vec<String> = source
            .list_keys()
            .await
            .unwrap()
            .iter()
            .map(|k| k.to_string())
            .collect();
        keys.sort();
        assert_eq!(keys, vec!["scans/p1/a.dcm", "scans/p1/nested/b.dcm"]);
    }

    #[tokio::test]
    async fn test_empty_prefix_lists_whole_bucket() {
        let store = seeded_store(&["a.dcm", "x/b.dcm"]).await;
        let dir = TempDir::new().unwrap();
        let source = ObjectStoreSource::new(store, "bucket", "", dir.path());
        assert_eq!(source.enumerate().await.count(), 2);
    }

    #[tokio::test]
    async fn test_prefix_may_end_mid_segment() {
        let store = seeded_store(&[
            "scans/p1/a.dcm",
            "scans/q1/x.dcm",
            "2024-01/b.dcm",
            "2023-12/c.dcm",
        ])
        .await;
        let dir = TempDir::new().unwrap();

        let keys = |prefix: &str| {
            let source = ObjectStoreSource::new(store.clone(), "bucket", prefix, dir.path());
            async move {
                source
                    .list_keys()
                    .await
                    .unwrap()
                    .iter()
                    .map(|k| k.to_string())
                    .collect::<Vec<_>>()
            }
        };

        assert_eq!(keys("scans/p").await, vec!["scans/p1/a.dcm"]);
        assert_eq!(keys("2024-").await, vec!["2024-01/b.dcm"]);
        assert!(keys("scans/z").await.is_empty());
    }

    #[tokio::test]
    async fn test_unreachable_store_enumerates_nothing() {
        let store = AmazonS3Builder::new()
            .with_bucket_name("bucket")
            .with_region("us-east-1")
            .with_endpoint("http://127.0.0.1:1")
            .with_allow_http(true)
            .with_access_key_id("key")
            .with_secret_access_key("secret")
            .with_retry(RetryConfig {
                max_retries: 0,
                ..Default::default()
            })
            .build()
            .unwrap();
        let dir = TempDir::new().unwrap();
        let source = ObjectStoreSource::new(Arc::new(store), "bucket", "scans/", dir.path());

        assert!(matches!(source.list_keys().await, Err(IngestError::Listing(_))));
        assert_eq!(source.enumerate().await.count(), 0);
    }

    #[test]
    fn test_listing_failure_is_listing_error() {
        let failed: object_store::Result<Vec<ObjectMeta>> = Err(object_store::Error::Generic {
            store: "test",
            source: "connection reset".into(),
        });
        assert!(matches!(dicom_keys(failed, ""), Err(IngestError::Listing(_))));
    }

    #[tokio::test]
    async fn test_fetch_downloads_to_staging_by_basename() {
        let store = seeded_store(&["scans/p1/a.dcm"]).await;
        let dir = TempDir::new().unwrap();
        let staging = dir.path().join("staging");
        let source = ObjectStoreSource::new(store, "bucket", "scans", &staging);

        let staged = source
            .stage(&FileRef::Object(ObjectPath::from("scans/p1/a.dcm")))
            .await
            .unwrap();
        assert_eq!(staged, staging.join("a.dcm"));
        assert_eq!(std::fs::read(&staged).unwrap(), b"scans/p1/a.dcm");
    }

    #[tokio::test]
    async fn test_fetch_missing_object_is_fetch_failure() {
        let store = seeded_store(&[]).await;
        let dir = TempDir::new().unwrap();
        let source = ObjectStoreSource::new(store, "bucket", "", dir.path());

        let result = source
            .stage(&FileRef::Object(ObjectPath::from("gone/a.dcm")))
            .await;
        assert!(matches!(result, Err(IngestError::Fetch(_))));
    }
}
