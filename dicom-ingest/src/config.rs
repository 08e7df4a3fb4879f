//! 配置管理
//!
//! 默认值 → 可选配置文件 → `DICOM_INGEST__*` 环境变量，依次覆盖。

use anyhow::{bail, Context, Result};
use config::{Config, Environment, File};
use ingest_storage::S3Location;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::info;

/// 环境变量前缀
pub const ENV_PREFIX: &str = "DICOM_INGEST";

/// 来源类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    Local,
    S3,
}

/// 对象存储配置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct S3Config {
    /// 桶名
    pub bucket: String,
    /// 键前缀
    pub prefix: String,
    pub region: Option<String>,
    /// 自定义端点（MinIO等）
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
}

/// 导入流水线完整配置
#[derive(Debug, Clone, Deserialize)]
pub struct IngestConfig {
    /// 来源类型
    pub source: SourceKind,
    /// 本地DICOM根目录
    pub local_dicom_dir: PathBuf,
    /// 对象存储配置
    pub s3: S3Config,
    /// 对象存储下载暂存目录
    pub staging_dir: PathBuf,
    /// 输出目录根
    pub output_dir: PathBuf,
    /// SQLite数据库文件
    pub database_path: PathBuf,
}

impl IngestConfig {
    /// 加载配置
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder()
            .set_default("source", "local")?
            .set_default("local_dicom_dir", "./data/dicom")?
            .set_default("staging_dir", "./data/staging")?
            .set_default("output_dir", "./data/output")?
            .set_default("database_path", "dicom_metadata.db")?
            .set_default("s3.bucket", "")?
            .set_default("s3.prefix", "")?;

        if let Some(path) = config_path {
            builder = builder.add_source(File::with_name(path));
        }

        let settings = builder
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"))
            .build()
            .context("Failed to build configuration")?;

        let config: IngestConfig = settings
            .try_deserialize()
            .context("Failed to deserialize configuration")?;
        config.validate()?;

        info!("Configuration loaded successfully");
        Ok(config)
    }

    /// 验证配置
    pub fn validate(&self) -> Result<()> {
        if self.source == SourceKind::S3 && self.s3.bucket.trim().is_empty() {
            bail!("s3.bucket is required when source = s3");
        }
        if self.output_dir.as_os_str().is_empty() {
            bail!("output_dir must not be empty");
        }
        Ok(())
    }

    /// 创建运行所需的目录
    pub fn prepare_directories(&self) -> Result<()> {
        for dir in [&self.local_dicom_dir, &self.output_dir, &self.staging_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }
        Ok(())
    }

    pub fn s3_location(&self) -> S3Location {
        S3Location {
            bucket: self.s3.bucket.clone(),
            prefix: self.s3.prefix.clone(),
            region: self.s3.region.clone(),
            endpoint: self.s3.endpoint.clone(),
            access_key: self.s3.access_key.clone(),
            secret_key: self.s3.secret_key.clone(),
        }
    }
}
