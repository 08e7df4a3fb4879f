//! 测试用DICOM文件生成
//!
//! 供其他crate的测试写出真实的Part 10文件。仅在测试或启用 `fixtures` 特性时编译。

use crate::extractor::tag_of;
use dicom::core::{DataElement, PrimitiveValue, VR};
use dicom::dictionary_std::tags;
use dicom::object::{FileMetaTableBuilder, InMemDicomObject};
use ingest_core::{AttributeField, IngestError, Result};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

const EXPLICIT_VR_LITTLE_ENDIAN: &str = "1.2.840.10008.1.2.1";
const SECONDARY_CAPTURE_IMAGE_STORAGE: &str = "1.2.840.10008.5.1.4.1.1.7";
const UID_ROOT: &str = "1.2.826.0.1.3680043.9.7382";

static NEXT_INSTANCE: AtomicU64 = AtomicU64::new(1);

/// 字段在标准字典中的VR
pub fn vr_of(field: AttributeField) -> VR {
    match field {
        AttributeField::PatientId => VR::LO,
        AttributeField::PatientName => VR::PN,
        AttributeField::PatientBirthDate => VR::DA,
        AttributeField::PatientSex => VR::CS,
        AttributeField::LastMenstrualDate => VR::DA,
        AttributeField::StudyInstanceUid => VR::UI,
        AttributeField::StudyDate => VR::DA,
        AttributeField::StudyTime => VR::TM,
        AttributeField::StudyDescription => VR::LO,
        AttributeField::SeriesInstanceUid => VR::UI,
        AttributeField::SeriesDate => VR::DA,
        AttributeField::SeriesTime => VR::TM,
        AttributeField::SeriesNumber => VR::IS,
        AttributeField::SliceThickness => VR::DS,
        AttributeField::PixelSpacing => VR::DS,
        AttributeField::Modality => VR::CS,
        AttributeField::Manufacturer => VR::LO,
    }
}

/// DICOM测试文件构建器
pub struct DicomFixture {
    obj: InMemDicomObject,
    instance_uid: String,
}

impl Default for DicomFixture {
    fn default() -> Self {
        Self::new()
    }
}

impl DicomFixture {
    /// 创建只含SOP类和实例UID的对象
    pub fn new() -> Self {
        let instance_uid = format!(
            "{}.{}.{}",
            UID_ROOT,
            std::process::id(),
            NEXT_INSTANCE.fetch_add(1, Ordering::Relaxed)
        );

        let mut obj = InMemDicomObject::new_empty();
        obj.put(DataElement::new(
            tags::SOP_CLASS_UID,
            VR::UI,
            PrimitiveValue::from(SECONDARY_CAPTURE_IMAGE_STORAGE),
        ));
        obj.put(DataElement::new(
            tags::SOP_INSTANCE_UID,
            VR::UI,
            PrimitiveValue::from(instance_uid.as_str()),
        ));

        Self { obj, instance_uid }
    }

    /// 常用的检查文件：患者、检查、序列和检查日期
    pub fn study(patient_id: &str, study_uid: &str, series_uid: &str, study_date: &str) -> Self {
        Self::new()
            .text(AttributeField::PatientId, patient_id)
            .text(AttributeField::StudyInstanceUid, study_uid)
            .text(AttributeField::SeriesInstanceUid, series_uid)
            .text(AttributeField::StudyDate, study_date)
            .text(AttributeField::Modality, "CT")
    }

    /// 写入单值字段
    pub fn text(mut self, field: AttributeField, value: &str) -> Self {
        self.obj.put(DataElement::new(
            tag_of(field),
            vr_of(field),
            PrimitiveValue::from(value),
        ));
        self
    }

    /// 写入多值字段
    pub fn multi(mut self, field: AttributeField, values: &[&str]) -> Self {
        let values = values.iter().map(|v| v.to_string()).collect();
        self.obj.put(DataElement::new(
            tag_of(field),
            vr_of(field),
            PrimitiveValue::Strs(values),
        ));
        self
    }

    /// 写入空值字段
    pub fn empty(mut self, field: AttributeField) -> Self {
        self.obj
            .put(DataElement::new(tag_of(field), vr_of(field), PrimitiveValue::Empty));
        self
    }

    /// 以显式VR小端传输语法写出文件
    pub fn write<P: AsRef<Path>>(self, path: P) -> Result<()> {
        let meta = FileMetaTableBuilder::new()
            .transfer_syntax(EXPLICIT_VR_LITTLE_ENDIAN)
            .media_storage_sop_class_uid(SECONDARY_CAPTURE_IMAGE_STORAGE)
            .media_storage_sop_instance_uid(self.instance_uid.as_str());

        let file = self
            .obj
            .with_meta(meta)
            .map_err(|e| IngestError::Parse(format!("无法生成文件元信息: {}", e)))?;

        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        file.write_to_file(path.as_ref())
            .map_err(|e| IngestError::Parse(format!("无法写出DICOM文件: {}", e)))
    }
}

/// 写出一个带 `.dcm` 扩展名但不是DICOM格式的文件
pub fn write_corrupt_file<P: AsRef<Path>>(path: P) -> Result<()> {
    if let Some(parent) = path.as_ref().parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, b"this is not a dicom file")?;
    Ok(())
}
