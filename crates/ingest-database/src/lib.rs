//! # 目录数据库模块
//!
//! 负责影像元数据在SQLite中的持久化：扁平目录表和患者/检查/序列层级表的
//! 幂等写入、表结构初始化以及只读查询。

pub mod catalog;
pub mod connection;
pub mod models;
pub mod queries;
pub mod schema;

// 重新导出主要类型
pub use catalog::{CatalogOutcome, CatalogWriter};
pub use connection::CatalogLocation;
pub use models::*;
pub use queries::{CatalogQueries, TableCounts};
pub use schema::provision;
