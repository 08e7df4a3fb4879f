//! 输出目录整理
//!
//! 按 `<output_root>/<PatientID>/<StudyInstanceUID>/<文件名>` 放置文件，
//! 同一路径只保留检查日期最新的版本。

use filetime::FileTime;
use ingest_core::utils::is_newer_study_date;
use ingest_core::{AttributeField, AttributeRecord, IngestError, Result, UNKNOWN};
use ingest_dicom::MetadataExtractor;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, error, info, warn};

/// 单个文件的整理结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrganizeOutcome {
    /// 目标位置原本为空，已复制
    Copied(PathBuf),
    /// 目标文件较旧，已覆盖
    Replaced(PathBuf),
    /// 目标文件不比候选旧，未做改动
    Unchanged(PathBuf),
    /// 缺少放置所需的字段，未做任何文件操作
    Skipped,
}

/// 输出目录整理器
#[derive(Debug, Clone)]
pub struct TreeOrganizer {
    output_root: PathBuf,
}

impl TreeOrganizer {
    pub fn new(output_root: impl Into<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
        }
    }

    pub fn output_root(&self) -> &Path {
        &self.output_root
    }

    /// 计算目标路径；患者ID、检查UID或检查日期不可用时返回 `None`
    pub fn destination_for(&self, record: &AttributeRecord, source_path: &Path) -> Option<PathBuf> {
        let patient_id = placeable(record.get(AttributeField::PatientId))?;
        let study_uid = placeable(record.get(AttributeField::StudyInstanceUid))?;
        record.get(AttributeField::StudyDate)?;
        let file_name = source_path.file_name()?;

        Some(self.output_root.join(patient_id).join(study_uid).join(file_name))
    }

    /// 整理单个文件
    ///
    /// 任何文件系统错误都记录日志并以 [`IngestError::Organize`] 返回，不影响其他文件。
    pub async fn organize(
        &self,
        record: &AttributeRecord,
        source_path: &Path,
    ) -> Result<OrganizeOutcome> {
        let Some(destination) = self.destination_for(record, source_path) else {
            warn!("缺少放置所需的元数据，跳过文件 {:?}", source_path);
            return Ok(OrganizeOutcome::Skipped);
        };

        self.place(record, source_path, destination).await.map_err(|e| {
            error!("整理输出目录失败 {:?}: {}", source_path, e);
            match e {
                IngestError::Organize(_) => e,
                other => IngestError::Organize(format!("{}: {}", source_path.display(), other)),
            }
        })
    }

    async fn place(
        &self,
        record: &AttributeRecord,
        source_path: &Path,
        destination: PathBuf,
    ) -> Result<OrganizeOutcome> {
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        if !tokio::fs::try_exists(&destination).await? {
            copy_preserving_times(source_path, &destination).await?;
            debug!("已复制 {:?} -> {:?}", source_path, destination);
            return Ok(OrganizeOutcome::Copied(destination));
        }

        let existing_date = MetadataExtractor::read_study_date(&destination)?
            .unwrap_or_else(|| UNKNOWN.to_string());
        let candidate_date = record.text(AttributeField::StudyDate);

        if is_newer_study_date(candidate_date, &existing_date) {
            copy_preserving_times(source_path, &destination).await?;
            info!(
                "已用更新的检查日期 {} 替换旧文件 {:?}",
                candidate_date, destination
            );
            Ok(OrganizeOutcome::Replaced(destination))
        } else {
            debug!(
                "保留现有文件 {:?} (StudyDate {} >= {})",
                destination, existing_date, candidate_date
            );
            Ok(OrganizeOutcome::Unchanged(destination))
        }
    }
}

/// 值必须非空且是单个普通路径段，才能作为目录名
fn placeable(value: Option<&str>) -> Option<&str> {
    let value = value?;
    let mut components = Path::new(value).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Some(value),
        _ => None,
    }
}

/// 复制文件内容与权限，并保留访问和修改时间
async fn copy_preserving_times(source: &Path, destination: &Path) -> Result<()> {
    tokio::fs::copy(source, destination).await?;

    let metadata = tokio::fs::metadata(source).await?;
    let accessed = FileTime::from_last_access_time(&metadata);
    let modified = FileTime::from_last_modification_time(&metadata);
    filetime::set_file_times(destination, accessed, modified)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ingest_dicom::fixtures::{write_corrupt_file, DicomFixture};
    use tempfile::TempDir;

    fn fixture(dir: &Path, sub: &str, patient: &str, study: &str, date: &str) -> (PathBuf, AttributeRecord) {
        let path = dir.join(sub).join("image.dcm");
        DicomFixture::study(patient, study, "1.2.3.1", date)
            .write(&path)
            .unwrap();
        let record = MetadataExtractor::extract(&path).unwrap();
        (path, record)
    }

    #[tokio::test]
    async fn test_first_copy_creates_layout() {
        let dir = TempDir::new().unwrap();
        let (source, record) = fixture(dir.path(), "in", "P1", "1.2.3", "20200101");
        let organizer = TreeOrganizer::new(dir.path().join("out"));

        let outcome = organizer.organize(&record, &source).await.unwrap();
        let expected = dir.path().join("out/P1/1.2.3/image.dcm");
        assert_eq!(outcome, OrganizeOutcome::Copied(expected.clone()));
        assert_eq!(std::fs::read(&expected).unwrap(), std::fs::read(&source).unwrap());
    }

    #[tokio::test]
    async fn test_second_organize_is_noop() {
        let dir = TempDir::new().unwrap();
        let (source, record) = fixture(dir.path(), "in", "P1", "1.2.3", "20200101");
        let organizer = TreeOrganizer::new(dir.path().join("out"));

        organizer.organize(&record, &source).await.unwrap();
        let outcome = organizer.organize(&record, &source).await.unwrap();
        assert!(matches!(outcome, OrganizeOutcome::Unchanged(_)));
    }

    #[tokio::test]
    async fn test_newer_study_date_replaces() {
        let dir = TempDir::new().unwrap();
        let (old_source, old_record) = fixture(dir.path(), "old", "P1", "1.2.3", "20200101");
        let (new_source, new_record) = fixture(dir.path(), "new", "P1", "1.2.3", "20210101");
        let organizer = TreeOrganizer::new(dir.path().join("out"));

        organizer.organize(&old_record, &old_source).await.unwrap();
        let outcome = organizer.organize(&new_record, &new_source).await.unwrap();

        let destination = dir.path().join("out/P1/1.2.3/image.dcm");
        assert_eq!(outcome, OrganizeOutcome::Replaced(destination.clone()));
        let date = MetadataExtractor::read_study_date(&destination).unwrap();
        assert_eq!(date.as_deref(), Some("20210101"));
    }

    #[tokio::test]
    async fn test_older_study_date_keeps_existing() {
        let dir = TempDir::new().unwrap();
        let (current, current_record) = fixture(dir.path(), "current", "P1", "1.2.3", "20200101");
        let (older, older_record) = fixture(dir.path(), "older", "P1", "1.2.3", "20190101");
        let organizer = TreeOrganizer::new(dir.path().join("out"));

        organizer.organize(&current_record, &current).await.unwrap();
        let outcome = organizer.organize(&older_record, &older).await.unwrap();

        assert!(matches!(outcome, OrganizeOutcome::Unchanged(_)));
        let destination = dir.path().join("out/P1/1.2.3/image.dcm");
        let date = MetadataExtractor::read_study_date(&destination).unwrap();
        assert_eq!(date.as_deref(), Some("20200101"));
    }

    #[tokio::test]
    async fn test_unknown_patient_is_skipped() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("in/anon.dcm");
        DicomFixture::new()
            .text(AttributeField::StudyInstanceUid, "1.2.3")
            .text(AttributeField::StudyDate, "20200101")
            .write(&path)
            .unwrap();
        let record = MetadataExtractor::extract(&path).unwrap();
        let out = dir.path().join("out");
        let organizer = TreeOrganizer::new(&out);

        let outcome = organizer.organize(&record, &path).await.unwrap();
        assert_eq!(outcome, OrganizeOutcome::Skipped);
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn test_existing_file_without_study_date_is_kept() {
        let dir = TempDir::new().unwrap();
        let destination = dir.path().join("out/P1/1.2.3/image.dcm");
        DicomFixture::new()
            .text(AttributeField::PatientId, "P1")
            .text(AttributeField::StudyInstanceUid, "1.2.3")
            .write(&destination)
            .unwrap();
        let (source, record) = fixture(dir.path(), "in", "P1", "1.2.3", "20210101");
        let organizer = TreeOrganizer::new(dir.path().join("out"));

        // 缺失日期按 N/A 比较，数字开头的日期永远不会更新
        let outcome = organizer.organize(&record, &source).await.unwrap();
        assert_eq!(outcome, OrganizeOutcome::Unchanged(destination.clone()));
        assert_eq!(MetadataExtractor::read_study_date(&destination).unwrap(), None);
    }

    #[test]
    fn test_destination_rejects_path_like_ids() {
        let organizer = TreeOrganizer::new("/out");
        let source = Path::new("/in/a.dcm");
        let record = |patient: &str| {
            AttributeRecord::new()
                .with(AttributeField::PatientId, patient)
                .with(AttributeField::StudyInstanceUid, "1.2.3")
                .with(AttributeField::StudyDate, "20200101")
        };

        assert_eq!(
            organizer.destination_for(&record("P1"), source),
            Some(PathBuf::from("/out/P1/1.2.3/a.dcm"))
        );
        assert_eq!(organizer.destination_for(&record(""), source), None);
        assert_eq!(organizer.destination_for(&record(".."), source), None);
        assert_eq!(organizer.destination_for(&record("a/b"), source), None);
    }

    #[tokio::test]
    async fn test_corrupt_existing_file_is_organize_failure() {
        let dir = TempDir::new().unwrap();
        let (source, record) = fixture(dir.path(), "in", "P1", "1.2.3", "20200101");
        write_corrupt_file(dir.path().join("out/P1/1.2.3/image.dcm")).unwrap();
        let organizer = TreeOrganizer::new(dir.path().join("out"));

        let result = organizer.organize(&record, &source).await;
        assert!(matches!(result, Err(IngestError::Organize(_))));
    }

    #[tokio::test]
    async fn test_copy_preserves_modification_time() {
        let dir = TempDir::new().unwrap();
        let (source, record) = fixture(dir.path(), "in", "P1", "1.2.3", "20200101");
        let stamp = FileTime::from_unix_time(1_500_000_000, 0);
        filetime::set_file_mtime(&source, stamp).unwrap();
        let organizer = TreeOrganizer::new(dir.path().join("out"));

        let OrganizeOutcome::Copied(destination) = organizer.organize(&record, &source).await.unwrap() else {
            panic!("expected a fresh copy");
        };
        let metadata = std::fs::metadata(destination).unwrap();
        assert_eq!(FileTime::from_last_modification_time(&metadata), stamp);
    }
}
