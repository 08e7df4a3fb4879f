//! 元数据目录写入
//!
//! 每次调用写入整批记录：先提交扁平目录表，再写入患者/检查/序列层级表。
//! 全部使用 `INSERT OR IGNORE`，重复写入同一键不会覆盖已有行。

use crate::connection::{db_error, CatalogLocation};
use crate::schema;
use ingest_core::{AttributeRecord, Result};
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteConnection;
use sqlx::Connection;
use tracing::{debug, error, info, warn};

/// 一次批量写入中各表新增的行数
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogOutcome {
    pub records: usize,
    pub flat_rows_inserted: u64,
    pub patients_inserted: u64,
    pub studies_inserted: u64,
    pub series_inserted: u64,
}

/// 目录写入器
#[derive(Debug, Clone)]
pub struct CatalogWriter {
    location: CatalogLocation,
}

impl CatalogWriter {
    pub fn new(location: CatalogLocation) -> Self {
        Self { location }
    }

    pub fn location(&self) -> &CatalogLocation {
        &self.location
    }

    /// 持久化一批记录
    ///
    /// 扁平目录表先在独立事务中提交，层级表随后在第二个事务中写入。
    /// 层级表写入失败只回滚层级部分并返回 [`ingest_core::IngestError::Catalog`]，
    /// 已提交的扁平行保留；由于写入幂等，下一批次可以自然重试。
    pub async fn persist(&self, records: &[AttributeRecord]) -> Result<CatalogOutcome> {
        match self.write_batch(records).await {
            Ok(outcome) => {
                info!(
                    "元数据已写入数据库: {} 条记录, 新增 {} 行",
                    outcome.records, outcome.flat_rows_inserted
                );
                Ok(outcome)
            }
            Err(e) => {
                error!("元数据写入数据库失败: {}", e);
                Err(e)
            }
        }
    }

    async fn write_batch(&self, records: &[AttributeRecord]) -> Result<CatalogOutcome> {
        let mut conn = self.location.connect().await?;
        let result = Self::write_all(&mut conn, records).await;

        if let Err(e) = conn.close().await {
            warn!("关闭数据库连接失败: {}", e);
        }
        result
    }

    async fn write_all(
        conn: &mut SqliteConnection,
        records: &[AttributeRecord],
    ) -> Result<CatalogOutcome> {
        let mut outcome = CatalogOutcome {
            records: records.len(),
            ..Default::default()
        };

        outcome.flat_rows_inserted = Self::write_flat_rows(conn, records).await?;
        debug!("扁平目录表已提交: {} 行", outcome.flat_rows_inserted);

        Self::write_hierarchy(conn, records, &mut outcome).await?;
        debug!("批量写入完成: {:?}", outcome);
        Ok(outcome)
    }

    /// 确保扁平目录表存在并写入全部扁平行，单独提交
    async fn write_flat_rows(
        conn: &mut SqliteConnection,
        records: &[AttributeRecord],
    ) -> Result<u64> {
        let mut tx = conn.begin().await.map_err(db_error)?;
        schema::ensure_flat_table(&mut tx).await?;

        let mut inserted = 0;
        for record in records {
            inserted += insert_flat_row(&mut tx, record).await?;
        }

        tx.commit().await.map_err(db_error)?;
        Ok(inserted)
    }

    /// 按 患者 → 检查 → 序列 的顺序写入层级表
    async fn write_hierarchy(
        conn: &mut SqliteConnection,
        records: &[AttributeRecord],
        outcome: &mut CatalogOutcome,
    ) -> Result<()> {
        let mut tx = conn.begin().await.map_err(db_error)?;

        for record in records {
            outcome.patients_inserted += insert_patient(&mut tx, record).await?;
            outcome.studies_inserted += insert_study(&mut tx, record).await?;
            outcome.series_inserted += insert_series(&mut tx, record).await?;
        }

        tx.commit().await.map_err(db_error)
    }
}

async fn insert_flat_row(conn: &mut SqliteConnection, record: &AttributeRecord) -> Result<u64> {
    let row = record.flat_row();

    // SliceThickness 以文本绑定，由REAL亲和性决定最终存储类型
    sqlx::query(
        r#"
        INSERT OR IGNORE INTO dicom_metadata (
            PatientID, StudyInstanceUID, SeriesInstanceUID,
            SliceThickness, PixelSpacing, StudyDate, Modality, Manufacturer
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&row.patient_id)
    .bind(&row.study_instance_uid)
    .bind(&row.series_instance_uid)
    .bind(&row.slice_thickness)
    .bind(&row.pixel_spacing)
    .bind(&row.study_date)
    .bind(&row.modality)
    .bind(&row.manufacturer)
    .execute(conn)
    .await
    .map(|result| result.rows_affected())
    .map_err(db_error)
}

async fn insert_patient(conn: &mut SqliteConnection, record: &AttributeRecord) -> Result<u64> {
    let patient = record.patient();

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO Patient (
            patient_id, patient_name, patient_birth_date, patient_sex, last_menstrual_date
        ) VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&patient.patient_id)
    .bind(&patient.patient_name)
    .bind(&patient.patient_birth_date)
    .bind(&patient.patient_sex)
    .bind(&patient.last_menstrual_date)
    .execute(conn)
    .await
    .map(|result| result.rows_affected())
    .map_err(db_error)
}

async fn insert_study(conn: &mut SqliteConnection, record: &AttributeRecord) -> Result<u64> {
    let study = record.study();

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO Study (
            study_instance_uid, study_date, study_time, study_description, patient_id
        ) VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&study.study_instance_uid)
    .bind(&study.study_date)
    .bind(&study.study_time)
    .bind(&study.study_description)
    .bind(&study.patient_id)
    .execute(conn)
    .await
    .map(|result| result.rows_affected())
    .map_err(db_error)
}

async fn insert_series(conn: &mut SqliteConnection, record: &AttributeRecord) -> Result<u64> {
    let series = record.series();

    sqlx::query(
        r#"
        INSERT OR IGNORE INTO Series (
            series_instance_uid, series_date, series_time, series_number, study_instance_uid
        ) VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(&series.series_instance_uid)
    .bind(&series.series_date)
    .bind(&series.series_time)
    .bind(&series.series_number)
    .bind(&series.study_instance_uid)
    .execute(conn)
    .await
    .map(|result| result.rows_affected())
    .map_err(db_error)
}
