//! DICOM元数据提取器
//!
//! 将一个DICOM文件的头部解析为归一化的 [`AttributeRecord`]。

use dicom::core::value::{PrimitiveValue, Value};
use dicom::core::Tag;
use dicom::dictionary_std::tags;
use dicom::object::{DefaultDicomObject, OpenFileOptions};
use ingest_core::{AttributeField, AttributeRecord, IngestError, Result};
use std::path::Path;
use tracing::{debug, error, info};

/// 多值字段展平时使用的分隔符
pub const MULTI_VALUE_SEPARATOR: &str = ",";

/// 字段对应的标准DICOM标签
pub fn tag_of(field: AttributeField) -> Tag {
    match field {
        AttributeField::PatientId => tags::PATIENT_ID,
        AttributeField::PatientName => tags::PATIENT_NAME,
        AttributeField::PatientBirthDate => tags::PATIENT_BIRTH_DATE,
        AttributeField::PatientSex => tags::PATIENT_SEX,
        AttributeField::LastMenstrualDate => tags::LAST_MENSTRUAL_DATE,
        AttributeField::StudyInstanceUid => tags::STUDY_INSTANCE_UID,
        AttributeField::StudyDate => tags::STUDY_DATE,
        AttributeField::StudyTime => tags::STUDY_TIME,
        AttributeField::StudyDescription => tags::STUDY_DESCRIPTION,
        AttributeField::SeriesInstanceUid => tags::SERIES_INSTANCE_UID,
        AttributeField::SeriesDate => tags::SERIES_DATE,
        AttributeField::SeriesTime => tags::SERIES_TIME,
        AttributeField::SeriesNumber => tags::SERIES_NUMBER,
        AttributeField::SliceThickness => tags::SLICE_THICKNESS,
        AttributeField::PixelSpacing => tags::PIXEL_SPACING,
        AttributeField::Modality => tags::MODALITY,
        AttributeField::Manufacturer => tags::MANUFACTURER,
    }
}

/// DICOM元数据提取器
pub struct MetadataExtractor;

impl MetadataExtractor {
    /// 解析文件并提取全部固定字段
    ///
    /// 缺失的字段只影响该字段本身；文件无法打开或头部损坏时整条记录失败。
    pub fn extract<P: AsRef<Path>>(path: P) -> Result<AttributeRecord> {
        let path = path.as_ref();
        let obj = Self::open(path)?;

        let mut record = AttributeRecord::new();
        for field in AttributeField::ALL {
            record.set(field, Self::read_field(&obj, field));
        }

        info!("成功提取DICOM元数据: {:?}, {}", path, record.summary());
        Ok(record)
    }

    /// 只读取现有文件的检查日期
    pub fn read_study_date<P: AsRef<Path>>(path: P) -> Result<Option<String>> {
        let obj = Self::open(path.as_ref())?;
        Ok(Self::read_field(&obj, AttributeField::StudyDate))
    }

    /// 打开文件，读取到像素数据之前为止
    fn open(path: &Path) -> Result<DefaultDicomObject> {
        OpenFileOptions::new()
            .read_until(tags::PIXEL_DATA)
            .open_file(path)
            .map_err(|e| {
                error!("读取DICOM文件失败 {:?}: {}", path, e);
                IngestError::Parse(format!("无法解析DICOM文件 {}: {}", path.display(), e))
            })
    }

    /// 读取单个字段，并展平为字符串
    fn read_field(obj: &DefaultDicomObject, field: AttributeField) -> Option<String> {
        let tag = tag_of(field);
        match obj.element(tag) {
            Ok(element) => match element.value() {
                Value::Primitive(value) => Some(flatten(value)),
                _ => {
                    debug!("标签 {} {:?} 不是基本类型值", field, tag);
                    None
                }
            },
            Err(_) => {
                debug!("未找到标签: {} {:?}", field, tag);
                None
            }
        }
    }
}

/// 将基本值渲染为单个字符串
///
/// 每个值去掉DICOM填充字符后以逗号连接。人名 (PN) 按其文本形式
/// (`Family^Given`) 输出，不做组件拆分。
pub fn flatten(value: &PrimitiveValue) -> String {
    value
        .to_multi_str()
        .iter()
        .map(|s| s.trim_end_matches(&[' ', '\0'][..]))
        .collect::<Vec<_>>()
        .join(MULTI_VALUE_SEPARATOR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{write_corrupt_file, DicomFixture};
    use tempfile::TempDir;

    #[test]
    fn test_flatten_multi_valued_strings() {
        let value = PrimitiveValue::Strs(vec!["1.0".to_string(), "1.0".to_string()].into());
        assert_eq!(flatten(&value), "1.0,1.0");
    }

    #[test]
    fn test_flatten_strips_padding() {
        let value = PrimitiveValue::from("1.2.840.10008\0");
        assert_eq!(flatten(&value), "1.2.840.10008");
    }

    #[test]
    fn test_extract_full_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("full.dcm");
        DicomFixture::new()
            .text(AttributeField::PatientId, "P1")
            .text(AttributeField::PatientName, "Doe^John")
            .text(AttributeField::PatientSex, "M")
            .text(AttributeField::StudyInstanceUid, "1.2.3")
            .text(AttributeField::StudyDate, "20200101")
            .text(AttributeField::SeriesInstanceUid, "1.2.3.4")
            .text(AttributeField::SeriesNumber, "7")
            .text(AttributeField::SliceThickness, "2.5")
            .multi(AttributeField::PixelSpacing, &["1.0", "1.0"])
            .text(AttributeField::Modality, "CT")
            .write(&path)
            .unwrap();

        let record = MetadataExtractor::extract(&path).unwrap();
        assert_eq!(record.get(AttributeField::PatientId), Some("P1"));
        assert_eq!(record.get(AttributeField::PatientName), Some("Doe^John"));
        assert_eq!(record.get(AttributeField::StudyInstanceUid), Some("1.2.3"));
        assert_eq!(record.get(AttributeField::StudyDate), Some("20200101"));
        assert_eq!(record.get(AttributeField::SeriesNumber), Some("7"));
        assert_eq!(record.get(AttributeField::SliceThickness), Some("2.5"));
        assert_eq!(record.get(AttributeField::PixelSpacing), Some("1.0,1.0"));
        assert_eq!(record.get(AttributeField::Modality), Some("CT"));
    }

    #[test]
    fn test_missing_fields_are_unknown_individually() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.dcm");
        DicomFixture::new()
            .text(AttributeField::StudyInstanceUid, "1.2.3")
            .write(&path)
            .unwrap();

        let record = MetadataExtractor::extract(&path).unwrap();
        assert_eq!(record.get(AttributeField::StudyInstanceUid), Some("1.2.3"));
        assert_eq!(record.get(AttributeField::PatientId), None);
        assert_eq!(record.get(AttributeField::Manufacturer), None);
        assert_eq!(record.get(AttributeField::LastMenstrualDate), None);
    }

    #[test]
    fn test_present_but_empty_is_empty_string() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("empty.dcm");
        DicomFixture::study("P1", "1.2.3", "1.2.3.1", "20200101")
            .empty(AttributeField::Manufacturer)
            .write(&path)
            .unwrap();

        let record = MetadataExtractor::extract(&path).unwrap();
        assert_eq!(record.get(AttributeField::Manufacturer), Some(""));
    }

    #[test]
    fn test_read_study_date() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("dated.dcm");
        DicomFixture::study("P1", "1.2.3", "1.2.3.1", "20200601")
            .write(&path)
            .unwrap();

        let date = MetadataExtractor::read_study_date(&path).unwrap();
        assert_eq!(date.as_deref(), Some("20200601"));
    }

    #[test]
    fn test_corrupt_file_fails_whole_record() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.dcm");
        write_corrupt_file(&path).unwrap();

        let result = MetadataExtractor::extract(&path);
        assert!(matches!(result, Err(IngestError::Parse(_))));
    }

    #[test]
    fn test_missing_file_is_parse_failure() {
        let dir = TempDir::new().unwrap();
        let result = MetadataExtractor::extract(dir.path().join("absent.dcm"));
        assert!(matches!(result, Err(IngestError::Parse(_))));
    }
}
