//! # 存储模块
//!
//! 负责候选文件的列举与暂存（本地目录、对象存储），以及输出目录树的整理。

pub mod local;
pub mod object;
pub mod organizer;
pub mod source;

pub use local::LocalSource;
pub use object::{ObjectStoreSource, S3Location};
pub use organizer::{OrganizeOutcome, TreeOrganizer};
pub use source::{CandidateSource, Candidates, FileRef};
