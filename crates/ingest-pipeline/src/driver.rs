//! 流水线驱动器
//!
//! 列举 → 暂存 → 提取 → {整理, 收集}，全部候选处理完后一次性写入目录库。

use chrono::{DateTime, Utc};
use ingest_database::{CatalogOutcome, CatalogWriter};
use ingest_dicom::MetadataExtractor;
use ingest_storage::{CandidateSource, OrganizeOutcome, TreeOrganizer};
use serde::Serialize;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

/// 一次运行的统计
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub source: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub candidates: usize,
    pub fetch_failures: usize,
    pub parse_failures: usize,
    pub records_extracted: usize,
    pub files_copied: usize,
    pub files_replaced: usize,
    pub files_unchanged: usize,
    pub files_skipped: usize,
    pub organize_failures: usize,
    pub catalog: Option<CatalogOutcome>,
    pub catalog_error: Option<String>,
}

impl RunSummary {
    fn start(source: String) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            source,
            started_at: Utc::now(),
            finished_at: None,
            candidates: 0,
            fetch_failures: 0,
            parse_failures: 0,
            records_extracted: 0,
            files_copied: 0,
            files_replaced: 0,
            files_unchanged: 0,
            files_skipped: 0,
            organize_failures: 0,
            catalog: None,
            catalog_error: None,
        }
    }

    fn record_organized(&mut self, outcome: &OrganizeOutcome) {
        match outcome {
            OrganizeOutcome::Copied(_) => self.files_copied += 1,
            OrganizeOutcome::Replaced(_) => self.files_replaced += 1,
            OrganizeOutcome::Unchanged(_) => self.files_unchanged += 1,
            OrganizeOutcome::Skipped => self.files_skipped += 1,
        }
    }

    fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }

    /// 运行期间是否有任何文件或批次失败
    pub fn has_failures(&self) -> bool {
        self.fetch_failures > 0
            || self.parse_failures > 0
            || self.organize_failures > 0
            || self.catalog_error.is_some()
    }
}

/// 流水线驱动器
#[derive(Debug, Clone)]
pub struct PipelineDriver {
    organizer: TreeOrganizer,
    catalog: CatalogWriter,
}

impl PipelineDriver {
    pub fn new(organizer: TreeOrganizer, catalog: CatalogWriter) -> Self {
        Self { organizer, catalog }
    }

    /// 处理一个来源中的全部候选文件
    ///
    /// 单个文件的失败只计入统计，不会中断批次。
    pub async fn run(&self, source: &dyn CandidateSource) -> RunSummary {
        let summary = RunSummary::start(source.describe());
        let span = info_span!("ingest_run", run_id = %summary.run_id);
        self.process(source, summary).instrument(span).await
    }

    async fn process(&self, source: &dyn CandidateSource, mut summary: RunSummary) -> RunSummary {
        info!("开始处理: {}", summary.source);
        let mut records = Vec::new();

        for candidate in source.enumerate().await {
            summary.candidates += 1;

            let staged = match source.stage(&candidate).await {
                Ok(path) => path,
                Err(e) => {
                    warn!("跳过无法暂存的文件 {}: {}", candidate, e);
                    summary.fetch_failures += 1;
                    continue;
                }
            };

            let record = match MetadataExtractor::extract(&staged) {
                Ok(record) => record,
                Err(_) => {
                    summary.parse_failures += 1;
                    continue;
                }
            };

            match self.organizer.organize(&record, &staged).await {
                Ok(outcome) => summary.record_organized(&outcome),
                Err(_) => summary.organize_failures += 1,
            }
            records.push(record);
        }

        if summary.candidates == 0 {
            error!("未找到任何DICOM文件: {}", summary.source);
            return summary.finish();
        }

        summary.records_extracted = records.len();
        if !records.is_empty() {
            match self.catalog.persist(&records).await {
                Ok(outcome) => summary.catalog = Some(outcome),
                Err(e) => summary.catalog_error = Some(e.to_string()),
            }
        }

        let summary = summary.finish();
        info!(
            "处理完成: {} 个候选, {} 条记录, 复制 {}, 替换 {}, 跳过 {}",
            summary.candidates,
            summary.records_extracted,
            summary.files_copied,
            summary.files_replaced,
            summary.files_skipped
        );
        summary
    }
}
