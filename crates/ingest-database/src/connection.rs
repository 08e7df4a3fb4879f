//! 数据库连接管理

use ingest_core::{IngestError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteConnection};
use sqlx::Connection;
use std::path::{Path, PathBuf};

/// SQLite目录库位置
///
/// 不持有连接；每次写入批次单独打开并关闭连接。
#[derive(Debug, Clone)]
pub struct CatalogLocation {
    path: PathBuf,
}

impl CatalogLocation {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 打开新连接，数据库文件不存在时创建
    pub async fn connect(&self) -> Result<SqliteConnection> {
        let options = SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(true);

        SqliteConnection::connect_with(&options)
            .await
            .map_err(|e| IngestError::Catalog(format!("无法打开数据库 {}: {}", self.path.display(), e)))
    }
}

pub(crate) fn db_error(e: sqlx::Error) -> IngestError {
    IngestError::Catalog(e.to_string())
}
