//! 错误定义模块

use thiserror::Error;

/// 导入流水线统一错误类型
///
/// 前五个变体对应流水线的各个阶段，驱动器据此决定跳过单个文件还是放弃整个来源。
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("列举错误: {0}")]
    Listing(String),

    #[error("下载错误: {0}")]
    Fetch(String),

    #[error("DICOM解析错误: {0}")]
    Parse(String),

    #[error("整理输出目录错误: {0}")]
    Organize(String),

    #[error("数据库错误: {0}")]
    Catalog(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 导入流水线统一结果类型
pub type Result<T> = std::result::Result<T, IngestError>;
