//! # Ingest Core
//!
//! 影像导入流水线的核心模块，提供属性记录、实体模型、错误定义和通用工具。

pub mod error;
pub mod models;
pub mod utils;

pub use error::{IngestError, Result};
pub use models::*;
