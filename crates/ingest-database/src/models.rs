//! 数据库模型

use ingest_core::models::*;
use sqlx::FromRow;

// 数据库表模型 - 使用FromRow trait用于SQL查询
// 数值亲和列在查询中统一 CAST 为 TEXT，以便读回占位文本

/// 扁平目录表
#[derive(Debug, FromRow)]
pub struct DbFlatRow {
    #[sqlx(rename = "PatientID")]
    pub patient_id: String,
    #[sqlx(rename = "StudyInstanceUID")]
    pub study_instance_uid: String,
    #[sqlx(rename = "SeriesInstanceUID")]
    pub series_instance_uid: String,
    #[sqlx(rename = "SliceThickness")]
    pub slice_thickness: String,
    #[sqlx(rename = "PixelSpacing")]
    pub pixel_spacing: String,
    #[sqlx(rename = "StudyDate")]
    pub study_date: String,
    #[sqlx(rename = "Modality")]
    pub modality: String,
    #[sqlx(rename = "Manufacturer")]
    pub manufacturer: String,
}

impl From<DbFlatRow> for FlatCatalogRow {
    fn from(row: DbFlatRow) -> Self {
        FlatCatalogRow {
            patient_id: row.patient_id,
            study_instance_uid: row.study_instance_uid,
            series_instance_uid: row.series_instance_uid,
            slice_thickness: row.slice_thickness,
            pixel_spacing: row.pixel_spacing,
            study_date: row.study_date,
            modality: row.modality,
            manufacturer: row.manufacturer,
        }
    }
}

/// 数据库患者表
#[derive(Debug, FromRow)]
pub struct DbPatient {
    pub patient_id: String,
    pub patient_name: String,
    pub patient_birth_date: String,
    pub patient_sex: String,
    pub last_menstrual_date: String,
}

impl From<DbPatient> for Patient {
    fn from(db_patient: DbPatient) -> Self {
        Patient {
            patient_id: db_patient.patient_id,
            patient_name: db_patient.patient_name,
            patient_birth_date: db_patient.patient_birth_date,
            patient_sex: db_patient.patient_sex,
            last_menstrual_date: db_patient.last_menstrual_date,
        }
    }
}

/// 数据库检查表
#[derive(Debug, FromRow)]
pub struct DbStudy {
    pub study_instance_uid: String,
    pub study_date: String,
    pub study_time: String,
    pub study_description: String,
    pub patient_id: String,
}

impl From<DbStudy> for Study {
    fn from(db_study: DbStudy) -> Self {
        Study {
            study_instance_uid: db_study.study_instance_uid,
            study_date: db_study.study_date,
            study_time: db_study.study_time,
            study_description: db_study.study_description,
            patient_id: db_study.patient_id,
        }
    }
}

/// 数据库序列表
#[derive(Debug, FromRow)]
pub struct DbSeries {
    pub series_instance_uid: String,
    pub series_date: String,
    pub series_time: String,
    pub series_number: String,
    pub study_instance_uid: String,
}

impl From<DbSeries> for Series {
    fn from(db_series: DbSeries) -> Self {
        Series {
            series_instance_uid: db_series.series_instance_uid,
            series_date: db_series.series_date,
            series_time: db_series.series_time,
            series_number: db_series.series_number,
            study_instance_uid: db_series.study_instance_uid,
        }
    }
}
