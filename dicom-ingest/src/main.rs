//! DICOM导入程序主入口

mod config;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use crate::config::{IngestConfig, SourceKind};
use ingest_database::{provision, CatalogLocation, CatalogQueries, CatalogWriter};
use ingest_pipeline::{PipelineDriver, RunSummary};
use ingest_storage::{CandidateSource, LocalSource, ObjectStoreSource, TreeOrganizer};
use std::path::PathBuf;
use tracing::{info, warn};

/// 命令行参数
#[derive(Parser, Debug)]
#[command(name = "dicom-ingest")]
#[command(about = "DICOM文件导入：提取元数据、写入SQLite目录库并整理输出目录")]
struct Args {
    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 日志级别
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// 执行一次导入（默认）
    Run {
        /// 覆盖配置中的来源类型
        #[arg(long, value_enum)]
        source: Option<SourceKind>,

        /// 覆盖本地来源目录
        #[arg(long)]
        input_dir: Option<PathBuf>,

        /// 覆盖输出目录
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// 以JSON输出运行统计
        #[arg(long)]
        json: bool,
    },
    /// 创建目录库表结构
    InitDb,
    /// 输出目录库各表行数
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(&args.log_level)
        .init();

    let mut config = IngestConfig::load(args.config.as_deref())?;
    let command = args.command.unwrap_or(Command::Run {
        source: None,
        input_dir: None,
        output_dir: None,
        json: false,
    });

    match command {
        Command::Run {
            source,
            input_dir,
            output_dir,
            json,
        } => {
            if let Some(source) = source {
                config.source = source;
            }
            if let Some(dir) = input_dir {
                config.local_dicom_dir = dir;
            }
            if let Some(dir) = output_dir {
                config.output_dir = dir;
            }
            config.validate()?;

            let summary = run(&config).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            }
        }
        Command::InitDb => {
            let location = CatalogLocation::new(&config.database_path);
            provision(&location).await?;
            info!("目录库已就绪: {:?}", location.path());
        }
        Command::Stats => {
            let location = CatalogLocation::new(&config.database_path);
            let mut conn = location.connect().await?;
            let counts = CatalogQueries::new(&mut conn).table_counts().await?;
            println!("{}", serde_json::to_string_pretty(&counts)?);
        }
    }

    Ok(())
}

async fn run(config: &IngestConfig) -> Result<RunSummary> {
    config.prepare_directories()?;

    info!("启动DICOM导入...");
    info!("  来源: {:?}", config.source);
    info!("  输出目录: {:?}", config.output_dir);
    info!("  目录库: {:?}", config.database_path);

    let source: Box<dyn CandidateSource> = match config.source {
        SourceKind::Local => Box::new(LocalSource::new(&config.local_dicom_dir)),
        SourceKind::S3 => Box::new(
            ObjectStoreSource::s3(&config.s3_location(), &config.staging_dir)
                .context("Failed to configure object storage source")?,
        ),
    };

    let driver = PipelineDriver::new(
        TreeOrganizer::new(&config.output_dir),
        CatalogWriter::new(CatalogLocation::new(&config.database_path)),
    );
    let summary = driver.run(source.as_ref()).await;

    if summary.has_failures() {
        warn!(
            "导入完成但存在失败: 暂存 {}, 解析 {}, 整理 {}, 目录库 {}",
            summary.fetch_failures,
            summary.parse_failures,
            summary.organize_failures,
            summary.catalog_error.as_deref().unwrap_or("ok")
        );
    }
    Ok(summary)
}
