//! 本地目录来源

use crate::source::{CandidateSource, Candidates, FileRef};
use async_trait::async_trait;
use ingest_core::utils::is_dicom_name;
use ingest_core::{IngestError, Result};
use std::path::PathBuf;
use tracing::{info, warn};
use walkdir::WalkDir;

/// 递归遍历本地目录的来源
#[derive(Debug, Clone)]
pub struct LocalSource {
    root: PathBuf,
}

impl LocalSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &PathBuf {
        &self.root
    }
}

#[async_trait]
impl CandidateSource for LocalSource {
    fn describe(&self) -> String {
        format!("本地目录 {}", self.root.display())
    }

    async fn enumerate(&self) -> Candidates<'_> {
        info!("开始遍历本地目录: {:?}", self.root);

        let files = WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("无法读取目录项: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| entry.file_name().to_str().map(is_dicom_name).unwrap_or(false))
            .map(|entry| FileRef::Local(entry.into_path()));

        Box::new(files)
    }

    async fn stage(&self, file: &FileRef) -> Result<PathBuf> {
        match file {
            FileRef::Local(path) => Ok(path.clone()),
            FileRef::Object(key) => Err(IngestError::Fetch(format!(
                "本地来源无法暂存对象: {}",
                key
            ))),
        }
    }
}
