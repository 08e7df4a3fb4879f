//! # DICOM元数据模块
//!
//! 打开DICOM文件并将头部中的固定属性集合提取为 [`ingest_core::AttributeRecord`]。

pub mod extractor;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use extractor::{flatten, tag_of, MetadataExtractor};
