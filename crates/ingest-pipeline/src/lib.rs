//! # 导入流水线模块
//!
//! 将来源列举、元数据提取、输出目录整理和目录库写入串联为一次批量运行。

pub mod driver;

// 重新导出主要类型
pub use driver::{PipelineDriver, RunSummary};
