//! 表结构定义与初始化

use crate::connection::{db_error, CatalogLocation};
use ingest_core::Result;
use sqlx::sqlite::SqliteConnection;
use sqlx::Connection;
use tracing::info;

/// 扁平目录表，复合唯一键防止重复
pub const FLAT_TABLE_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS dicom_metadata (
        PatientID TEXT,
        StudyInstanceUID TEXT,
        SeriesInstanceUID TEXT,
        SliceThickness REAL,
        PixelSpacing TEXT,
        StudyDate TEXT,
        Modality TEXT,
        Manufacturer TEXT,
        UNIQUE(PatientID, StudyInstanceUID, SeriesInstanceUID)
    )
"#;

pub const PATIENT_TABLE_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS Patient (
        patient_id TEXT PRIMARY KEY,
        patient_name TEXT,
        patient_birth_date TEXT,
        patient_sex TEXT,
        last_menstrual_date TEXT
    )
"#;

pub const STUDY_TABLE_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS Study (
        study_instance_uid TEXT PRIMARY KEY,
        study_date TEXT,
        study_time TEXT,
        study_description TEXT,
        patient_id TEXT,
        FOREIGN KEY (patient_id) REFERENCES Patient (patient_id)
    )
"#;

pub const SERIES_TABLE_DDL: &str = r#"
    CREATE TABLE IF NOT EXISTS Series (
        series_instance_uid TEXT PRIMARY KEY,
        series_date TEXT,
        series_time TEXT,
        series_number INTEGER,
        study_instance_uid TEXT,
        FOREIGN KEY (study_instance_uid) REFERENCES Study (study_instance_uid)
    )
"#;

/// 确保扁平目录表存在
pub(crate) async fn ensure_flat_table(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query(FLAT_TABLE_DDL)
        .execute(conn)
        .await
        .map_err(db_error)?;
    Ok(())
}

/// 创建患者/检查/序列三张层级表以及扁平目录表
///
/// 属于独立的初始化步骤，写入器不会自行创建层级表。可重复执行。
pub async fn provision(location: &CatalogLocation) -> Result<()> {
    let mut conn = location.connect().await?;

    for ddl in [
        PATIENT_TABLE_DDL,
        STUDY_TABLE_DDL,
        SERIES_TABLE_DDL,
        FLAT_TABLE_DDL,
    ] {
        sqlx::query(ddl)
            .execute(&mut conn)
            .await
            .map_err(db_error)?;
    }

    conn.close().await.map_err(db_error)?;
    info!("数据库表创建完成: {:?}", location.path());
    Ok(())
}
