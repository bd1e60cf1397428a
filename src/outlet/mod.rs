use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::types::report::Report;

pub mod markdown;

/// 报告输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportFormat {
    Markdown,
    Json,
}

impl ReportFormat {
    /// 根据文件扩展名判断，`.json` 以外一律输出Markdown
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => ReportFormat::Json,
            _ => ReportFormat::Markdown,
        }
    }

    pub fn render(&self, report: &Report) -> Result<String> {
        match self {
            ReportFormat::Markdown => Ok(markdown::render_report(report)),
            ReportFormat::Json => render_json(report),
        }
    }
}

pub fn render_json(report: &Report) -> Result<String> {
    serde_json::to_string_pretty(report).context("报告序列化为JSON失败")
}

/// 在终端输出报告
pub fn print(report: &Report, json: bool) -> Result<()> {
    let format = if json {
        ReportFormat::Json
    } else {
        ReportFormat::Markdown
    };
    println!("{}", format.render(report)?);
    Ok(())
}

/// 保存报告
pub async fn save(report: &Report, output_path: &Path) -> Result<()> {
    let outlet = DiskOutlet::new(output_path.to_path_buf());
    outlet.save(report).await
}

pub trait Outlet {
    async fn save(&self, report: &Report) -> Result<()>;
}

pub struct DiskOutlet {
    output_path: PathBuf,
}

impl DiskOutlet {
    pub fn new(output_path: PathBuf) -> Self {
        Self { output_path }
    }
}

impl Outlet for DiskOutlet {
    async fn save(&self, report: &Report) -> Result<()> {
        let content = ReportFormat::from_path(&self.output_path).render(report)?;

        if let Some(parent_dir) = self.output_path.parent()
            && !parent_dir.as_os_str().is_empty()
            && !parent_dir.exists()
        {
            fs::create_dir_all(parent_dir)?;
        }
        fs::write(&self.output_path, content)
            .with_context(|| format!("写入报告失败: {}", self.output_path.display()))?;

        info!("💾 已保存报告: {}", self.output_path.display());
        Ok(())
    }
}
