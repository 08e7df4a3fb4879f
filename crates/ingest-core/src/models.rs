//! 核心数据模型定义

use serde::{Deserialize, Serialize};

/// 未知字段在持久化时使用的占位文本
pub const UNKNOWN: &str = "N/A";

/// 属性记录中固定的字段集合，名称即DICOM关键字
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeField {
    // 患者
    PatientId,
    PatientName,
    PatientBirthDate,
    PatientSex,
    LastMenstrualDate,
    // 检查
    StudyInstanceUid,
    StudyDate,
    StudyTime,
    StudyDescription,
    // 序列
    SeriesInstanceUid,
    SeriesDate,
    SeriesTime,
    SeriesNumber,
    // 采集
    SliceThickness,
    PixelSpacing,
    Modality,
    Manufacturer,
}

impl AttributeField {
    /// 全部字段，按实体分组排列
    pub const ALL: [AttributeField; 17] = [
        AttributeField::PatientId,
        AttributeField::PatientName,
        AttributeField::PatientBirthDate,
        AttributeField::PatientSex,
        AttributeField::LastMenstrualDate,
        AttributeField::StudyInstanceUid,
        AttributeField::StudyDate,
        AttributeField::StudyTime,
        AttributeField::StudyDescription,
        AttributeField::SeriesInstanceUid,
        AttributeField::SeriesDate,
        AttributeField::SeriesTime,
        AttributeField::SeriesNumber,
        AttributeField::SliceThickness,
        AttributeField::PixelSpacing,
        AttributeField::Modality,
        AttributeField::Manufacturer,
    ];

    /// DICOM关键字
    pub fn keyword(&self) -> &'static str {
        match self {
            AttributeField::PatientId => "PatientID",
            AttributeField::PatientName => "PatientName",
            AttributeField::PatientBirthDate => "PatientBirthDate",
            AttributeField::PatientSex => "PatientSex",
            AttributeField::LastMenstrualDate => "LastMenstrualDate",
            AttributeField::StudyInstanceUid => "StudyInstanceUID",
            AttributeField::StudyDate => "StudyDate",
            AttributeField::StudyTime => "StudyTime",
            AttributeField::StudyDescription => "StudyDescription",
            AttributeField::SeriesInstanceUid => "SeriesInstanceUID",
            AttributeField::SeriesDate => "SeriesDate",
            AttributeField::SeriesTime => "SeriesTime",
            AttributeField::SeriesNumber => "SeriesNumber",
            AttributeField::SliceThickness => "SliceThickness",
            AttributeField::PixelSpacing => "PixelSpacing",
            AttributeField::Modality => "Modality",
            AttributeField::Manufacturer => "Manufacturer",
        }
    }
}

impl std::fmt::Display for AttributeField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

/// 单个影像文件解析后的属性记录
///
/// 每个字段为 `None` 表示源文件中不存在该属性。多值字段和人名字段在
/// 提取阶段已被展平为单个字符串。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeRecord {
    // === 患者信息 ===
    pub patient_id: Option<String>,
    pub patient_name: Option<String>,
    pub patient_birth_date: Option<String>,
    pub patient_sex: Option<String>,
    pub last_menstrual_date: Option<String>,

    // === 检查信息 ===
    pub study_instance_uid: Option<String>,
    pub study_date: Option<String>,
    pub study_time: Option<String>,
    pub study_description: Option<String>,

    // === 序列信息 ===
    pub series_instance_uid: Option<String>,
    pub series_date: Option<String>,
    pub series_time: Option<String>,
    pub series_number: Option<String>,

    // === 采集信息 ===
    pub slice_thickness: Option<String>,
    pub pixel_spacing: Option<String>,
    pub modality: Option<String>,
    pub manufacturer: Option<String>,
}

impl AttributeRecord {
    /// 创建所有字段均未知的记录
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, field: AttributeField) -> &Option<String> {
        match field {
            AttributeField::PatientId => &self.patient_id,
            AttributeField::PatientName => &self.patient_name,
            AttributeField::PatientBirthDate => &self.patient_birth_date,
            AttributeField::PatientSex => &self.patient_sex,
            AttributeField::LastMenstrualDate => &self.last_menstrual_date,
            AttributeField::StudyInstanceUid => &self.study_instance_uid,
            AttributeField::StudyDate => &self.study_date,
            AttributeField::StudyTime => &self.study_time,
            AttributeField::StudyDescription => &self.study_description,
            AttributeField::SeriesInstanceUid => &self.series_instance_uid,
            AttributeField::SeriesDate => &self.series_date,
            AttributeField::SeriesTime => &self.series_time,
            AttributeField::SeriesNumber => &self.series_number,
            AttributeField::SliceThickness => &self.slice_thickness,
            AttributeField::PixelSpacing => &self.pixel_spacing,
            AttributeField::Modality => &self.modality,
            AttributeField::Manufacturer => &self.manufacturer,
        }
    }

    fn slot_mut(&mut self, field: AttributeField) -> &mut Option<String> {
        match field {
            AttributeField::PatientId => &mut self.patient_id,
            AttributeField::PatientName => &mut self.patient_name,
            AttributeField::PatientBirthDate => &mut self.patient_birth_date,
            AttributeField::PatientSex => &mut self.patient_sex,
            AttributeField::LastMenstrualDate => &mut self.last_menstrual_date,
            AttributeField::StudyInstanceUid => &mut self.study_instance_uid,
            AttributeField::StudyDate => &mut self.study_date,
            AttributeField::StudyTime => &mut self.study_time,
            AttributeField::StudyDescription => &mut self.study_description,
            AttributeField::SeriesInstanceUid => &mut self.series_instance_uid,
            AttributeField::SeriesDate => &mut self.series_date,
            AttributeField::SeriesTime => &mut self.series_time,
            AttributeField::SeriesNumber => &mut self.series_number,
            AttributeField::SliceThickness => &mut self.slice_thickness,
            AttributeField::PixelSpacing => &mut self.pixel_spacing,
            AttributeField::Modality => &mut self.modality,
            AttributeField::Manufacturer => &mut self.manufacturer,
        }
    }

    /// 获取字段值，未知时返回 `None`
    pub fn get(&self, field: AttributeField) -> Option<&str> {
        self.slot(field).as_deref()
    }

    /// 设置字段值
    pub fn set(&mut self, field: AttributeField, value: Option<String>) {
        *self.slot_mut(field) = value;
    }

    /// 构建器风格的字段设置，主要用于测试和样例数据
    pub fn with(mut self, field: AttributeField, value: impl Into<String>) -> Self {
        self.set(field, Some(value.into()));
        self
    }

    /// 获取用于持久化的字段文本，未知时为 [`UNKNOWN`]
    pub fn text(&self, field: AttributeField) -> &str {
        self.get(field).unwrap_or(UNKNOWN)
    }

    fn owned(&self, field: AttributeField) -> String {
        self.text(field).to_string()
    }

    /// 投影为扁平目录行
    pub fn flat_row(&self) -> FlatCatalogRow {
        FlatCatalogRow {
            patient_id: self.owned(AttributeField::PatientId),
            study_instance_uid: self.owned(AttributeField::StudyInstanceUid),
            series_instance_uid: self.owned(AttributeField::SeriesInstanceUid),
            slice_thickness: self.owned(AttributeField::SliceThickness),
            pixel_spacing: self.owned(AttributeField::PixelSpacing),
            study_date: self.owned(AttributeField::StudyDate),
            modality: self.owned(AttributeField::Modality),
            manufacturer: self.owned(AttributeField::Manufacturer),
        }
    }

    /// 投影为患者实体
    pub fn patient(&self) -> Patient {
        Patient {
            patient_id: self.owned(AttributeField::PatientId),
            patient_name: self.owned(AttributeField::PatientName),
            patient_birth_date: self.owned(AttributeField::PatientBirthDate),
            patient_sex: self.owned(AttributeField::PatientSex),
            last_menstrual_date: self.owned(AttributeField::LastMenstrualDate),
        }
    }

    /// 投影为检查实体
    pub fn study(&self) -> Study {
        Study {
            study_instance_uid: self.owned(AttributeField::StudyInstanceUid),
            study_date: self.owned(AttributeField::StudyDate),
            study_time: self.owned(AttributeField::StudyTime),
            study_description: self.owned(AttributeField::StudyDescription),
            patient_id: self.owned(AttributeField::PatientId),
        }
    }

    /// 投影为序列实体
    pub fn series(&self) -> Series {
        Series {
            series_instance_uid: self.owned(AttributeField::SeriesInstanceUid),
            series_date: self.owned(AttributeField::SeriesDate),
            series_time: self.owned(AttributeField::SeriesTime),
            series_number: self.owned(AttributeField::SeriesNumber),
            study_instance_uid: self.owned(AttributeField::StudyInstanceUid),
        }
    }

    /// 获取记录的摘要信息
    pub fn summary(&self) -> String {
        format!(
            "患者ID={}, 检查UID={}, 序列UID={}, 检查日期={}",
            self.text(AttributeField::PatientId),
            self.text(AttributeField::StudyInstanceUid),
            self.text(AttributeField::SeriesInstanceUid),
            self.text(AttributeField::StudyDate)
        )
    }
}

/// 患者信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Patient {
    pub patient_id: String,
    pub patient_name: String,
    pub patient_birth_date: String,
    pub patient_sex: String,
    pub last_menstrual_date: String,
}

/// 检查信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Study {
    pub study_instance_uid: String,
    pub study_date: String,
    pub study_time: String,
    pub study_description: String,
    pub patient_id: String, // 外键 -> Patient
}

/// 序列信息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Series {
    pub series_instance_uid: String,
    pub series_date: String,
    pub series_time: String,
    pub series_number: String,
    pub study_instance_uid: String, // 外键 -> Study
}

/// 扁平目录行，以 (PatientID, StudyInstanceUID, SeriesInstanceUID) 为复合键
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatCatalogRow {
    pub patient_id: String,
    pub study_instance_uid: String,
    pub series_instance_uid: String,
    pub slice_thickness: String,
    pub pixel_spacing: String,
    pub study_date: String,
    pub modality: String,
    pub manufacturer: String,
}
