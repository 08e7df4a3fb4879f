//! 数据库查询操作

use crate::connection::db_error;
use crate::models::*;
use ingest_core::{FlatCatalogRow, Patient, Result, Series, Study};
use serde::Serialize;
use sqlx::sqlite::SqliteConnection;

/// 各表行数统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableCounts {
    pub flat_rows: i64,
    pub patients: i64,
    pub studies: i64,
    pub series: i64,
}

/// 目录库只读查询
pub struct CatalogQueries<'a> {
    conn: &'a mut SqliteConnection,
}

impl<'a> CatalogQueries<'a> {
    pub fn new(conn: &'a mut SqliteConnection) -> Self {
        Self { conn }
    }

    async fn count(&mut self, table: &str) -> Result<i64> {
        let (count,): (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {}", table))
            .fetch_one(&mut *self.conn)
            .await
            .map_err(db_error)?;
        Ok(count)
    }

    /// 扁平目录表行数
    pub async fn count_flat_rows(&mut self) -> Result<i64> {
        self.count("dicom_metadata").await
    }

    /// 全部表的行数
    pub async fn table_counts(&mut self) -> Result<TableCounts> {
        Ok(TableCounts {
            flat_rows: self.count("dicom_metadata").await?,
            patients: self.count("Patient").await?,
            studies: self.count("Study").await?,
            series: self.count("Series").await?,
        })
    }

    /// 按插入顺序读取扁平目录表
    pub async fn flat_rows(&mut self) -> Result<Vec<FlatCatalogRow>> {
        let rows = sqlx::query_as::<_, DbFlatRow>(
            r#"
            SELECT PatientID, StudyInstanceUID, SeriesInstanceUID,
                   CAST(SliceThickness AS TEXT) AS SliceThickness,
                   PixelSpacing, StudyDate, Modality, Manufacturer
            FROM dicom_metadata
            ORDER BY rowid
            "#,
        )
        .fetch_all(&mut *self.conn)
        .await
        .map_err(db_error)?;

        Ok(rows.into_iter().map(FlatCatalogRow::from).collect())
    }

    /// 根据患者ID查找患者
    pub async fn patient(&mut self, patient_id: &str) -> Result<Option<Patient>> {
        let result = sqlx::query_as::<_, DbPatient>("SELECT * FROM Patient WHERE patient_id = ?")
            .bind(patient_id)
            .fetch_optional(&mut *self.conn)
            .await
            .map_err(db_error)?;

        Ok(result.map(Patient::from))
    }

    /// 根据检查UID查找检查
    pub async fn study(&mut self, study_instance_uid: &str) -> Result<Option<Study>> {
        let result =
            sqlx::query_as::<_, DbStudy>("SELECT * FROM Study WHERE study_instance_uid = ?")
                .bind(study_instance_uid)
                .fetch_optional(&mut *self.conn)
                .await
                .map_err(db_error)?;

        Ok(result.map(Study::from))
    }

    /// 根据序列UID查找序列
    pub async fn series(&mut self, series_instance_uid: &str) -> Result<Option<Series>> {
        let result = sqlx::query_as::<_, DbSeries>(
            r#"
            SELECT series_instance_uid, series_date, series_time,
                   CAST(series_number AS TEXT) AS series_number,
                   study_instance_uid
            FROM Series
            WHERE series_instance_uid = ?
            "#,
        )
        .bind(series_instance_uid)
        .fetch_optional(&mut *self.conn)
        .await
        .map_err(db_error)?;

        Ok(result.map(Series::from))
    }
}
