//! 报告打印排版命令行工具
//!
//! 读取报告文档（JSON），可选地从DICOM文件读取患者与检查信息，
//! 关键图像从配置的存储根目录校验，输出分页版面（JSON）。

use anyhow::{Context, Result};
use clap::Parser;
use pacs_admin::{init_logging, ConfigManager, ReportingConfig};
use pacs_core::{
    ContentVersion, Gender, ImageRef, PacsError, RawPatientFields, ReportDocument, StudyFields,
    NOT_AVAILABLE,
};
use pacs_dicom::StudyHeader;
use pacs_layout::{compose_for_print, CachedMeasurer, FixedLineMeasurer, LayoutEngine, LayoutPlan};
use pacs_storage::ImageStore;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// 报告打印命令行参数
#[derive(Parser, Debug)]
#[command(name = "pacs-print")]
#[command(about = "放射科报告分页排版工具")]
struct Args {
    /// 报告文档（JSON）
    #[arg(short, long)]
    report: PathBuf,

    /// DICOM文件，用于读取患者与检查信息
    #[arg(short, long)]
    dicom: Option<PathBuf>,

    /// 配置文件路径
    #[arg(short, long)]
    config: Option<String>,

    /// 输出路径，缺省时写到标准输出
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 日志级别，覆盖配置文件
    #[arg(short, long)]
    log_level: Option<String>,

    /// 排版定稿时的原始内容而不是当前内容
    #[arg(long)]
    original: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let manager = ConfigManager::load(args.config.as_deref())?;
    let mut config = manager.get_config().await;
    if let Some(level) = &args.log_level {
        config.logging.level = level.clone();
    }
    init_logging(&config.logging)?;

    let plan = print_report(&args, &config).await?;
    let json = serde_json::to_string_pretty(&plan).context("Failed to serialize layout plan")?;

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("Failed to write {:?}", path))?;
            info!("版面已写入: {:?}", path);
        }
        None => println!("{}", json),
    }

    Ok(())
}

async fn print_report(args: &Args, config: &ReportingConfig) -> Result<LayoutPlan> {
    let mut doc = load_report(&args.report).await?;

    let raw_patient = match &args.dicom {
        Some(path) => {
            let header = StudyHeader::open(path)?;
            merge_study(&mut doc.study, header.study);
            header.patient
        }
        None => raw_from_identity(&doc),
    };

    if !doc.images.is_empty() {
        let store = ImageStore::new(&config.storage.root_path)?;
        doc.images = printable_images(&store, &doc.images).await;
    }

    let version = if args.original {
        ContentVersion::Original
    } else {
        ContentVersion::Current
    };
    let snapshot = compose_for_print(&doc, &raw_patient, version);

    let engine = LayoutEngine::new(config.layout.clone())
        .with_measurer(Arc::new(CachedMeasurer::new(FixedLineMeasurer::default())));
    let plan = engine.layout(&snapshot, &config.page)?;

    let overflowing = plan.overflowing().len();
    if overflowing > 0 {
        warn!("报告 {} 有 {} 个版面块超出页面底边", doc.id, overflowing);
    }
    info!("报告 {} 排版完成，共 {} 页", doc.id, plan.page_count);
    Ok(plan)
}

async fn load_report(path: &Path) -> Result<ReportDocument> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read report {:?}", path))?;
    serde_json::from_slice(&data).with_context(|| format!("Invalid report document {:?}", path))
}

/// 过滤掉存储中缺失或路径非法的关键图像，保留顺序并重新编号
async fn printable_images(store: &ImageStore, images: &[ImageRef]) -> Vec<ImageRef> {
    let mut printable = Vec::with_capacity(images.len());
    for image in images {
        match store.resolve(&image.path) {
            Ok(path) if path.is_file() => printable.push(ImageRef {
                path: image.path.clone(),
                index: printable.len(),
            }),
            Ok(_) => warn!("关键图像不存在，跳过: {}", image.path),
            Err(PacsError::Validation(reason)) => warn!("关键图像路径非法，跳过: {}", reason),
            Err(e) => warn!("无法解析关键图像 {}: {}", image.path, e),
        }
    }
    printable
}

/// DICOM中的非空字段补全报告里缺失的检查信息
fn merge_study(study: &mut StudyFields, header: StudyFields) {
    fn fill(target: &mut String, value: String) {
        if target.trim().is_empty() {
            *target = value;
        }
    }

    fill(&mut study.id, header.id);
    fill(&mut study.accession_number, header.accession_number);
    fill(&mut study.modality, header.modality);
    fill(&mut study.body_part, header.body_part);
    fill(&mut study.referring_doctor, header.referring_doctor);
    if study.study_date_time.is_none() {
        study.study_date_time = header.study_date_time;
    }
}

/// 没有DICOM来源时，用文档里已有的身份作为原始输入
fn raw_from_identity(doc: &ReportDocument) -> RawPatientFields {
    let identity = &doc.patient_identity;
    let known = |value: &str| (value != NOT_AVAILABLE).then(|| value.to_string());

    RawPatientFields {
        name: known(&identity.name).unwrap_or_default(),
        age: known(&identity.age),
        sex: match identity.gender {
            Gender::M => Some("M".to_string()),
            Gender::F => Some("F".to_string()),
            Gender::O => Some("OTHER".to_string()),
            Gender::Unknown => None,
        },
    }
}
