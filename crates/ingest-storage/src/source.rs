//! 候选文件来源

use async_trait::async_trait;
use ingest_core::Result;
use object_store::path::Path as ObjectPath;
use std::fmt;
use std::path::PathBuf;

/// 候选文件引用
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileRef {
    /// 本地文件路径
    Local(PathBuf),
    /// 对象存储中的对象键
    Object(ObjectPath),
}

impl fmt::Display for FileRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileRef::Local(path) => write!(f, "{}", path.display()),
            FileRef::Object(key) => write!(f, "{}", key),
        }
    }
}

/// 候选文件序列
pub type Candidates<'a> = Box<dyn Iterator<Item = FileRef> + Send + 'a>;

/// 候选文件来源：列举 + 暂存
///
/// 列举失败时返回空序列并记录日志，不向调用方抛出错误。
#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// 来源描述，用于日志
    fn describe(&self) -> String;

    /// 列举全部候选文件，每次调用重新计算
    async fn enumerate(&self) -> Candidates<'_>;

    /// 将候选文件放到本地可读的位置，返回本地路径
    async fn stage(&self, file: &FileRef) -> Result<PathBuf>;
}
