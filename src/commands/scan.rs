use crate::cli::ScanArgs;
use crate::models::config::AppConfig;
use crate::services::ocr::HttpOcrClient;
use crate::services::pipeline::{ResultsReader, ScreenshotReport};
use crate::services::vision::{ReferenceLibrary, RowTemplates};
use anyhow::{Context, Result};
use chrono::Local;
use image::{DynamicImage, ImageReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Command-line overrides win over the config file
pub fn apply_overrides(config: &mut AppConfig, args: &ScanArgs) {
    if let Some(dir) = &args.library {
        config.assets.library_dir = dir.clone();
    }
    if let Some(dir) = &args.templates {
        config.assets.row_template_dir = dir.clone();
    }
    if let Some(url) = &args.ocr_url {
        config.ocr.base_url = url.clone();
    }
}

/// `results_<timestamp>.csv` in the working directory
pub fn default_output_path() -> PathBuf {
    PathBuf::from(format!("results_{}.csv", Local::now().format("%Y%m%d_%H%M%S")))
}

pub fn load_screenshot(path: &Path) -> Result<DynamicImage> {
    let image = ImageReader::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?
        .with_guessed_format()?
        .decode()
        .with_context(|| format!("failed to decode {}", path.display()))?;
    Ok(image)
}

/// Read the screenshot, write the CSV table and print a summary.
/// Returns the path written.
pub fn run(mut config: AppConfig, args: ScanArgs) -> Result<PathBuf> {
    apply_overrides(&mut config, &args);

    let library = ReferenceLibrary::load(&config.assets.library_dir, config.matcher.probe_size)
        .with_context(|| format!("failed to load portraits from {}", config.assets.library_dir.display()))?;
    let templates = RowTemplates::load(&config.assets.row_template_dir)
        .context("failed to load row templates")?;

    let client = HttpOcrClient::new(&config.ocr)?;
    if let Err(e) = client.health_check() {
        // Rows will carry OcrFailed issues instead of failing the scan
        warn!("OCR server at {} is not healthy: {}", config.ocr.base_url, e);
    }

    let reader = ResultsReader::new(&config, Arc::new(library), templates, Arc::new(client))?;
    let screenshot = load_screenshot(&args.screenshot)?;
    info!(
        "Scanning {} ({}x{}) in {} mode",
        args.screenshot.display(),
        screenshot.width(),
        screenshot.height(),
        args.mode
    );

    let report = reader
        .read_screenshot(&screenshot, args.mode)
        .with_context(|| format!("failed to read {}", args.screenshot.display()))?;

    let output = args.output.unwrap_or_else(default_output_path);
    write_report(&report, &output)?;
    Ok(output)
}

fn write_report(report: &ScreenshotReport, output: &Path) -> Result<()> {
    let table = report.table()?;
    table
        .write_csv(output)
        .with_context(|| format!("failed to write {}", output.display()))?;

    print!("{}", table.to_text());
    info!(
        "Wrote {} rows to {} ({} issues)",
        table.rows().len(),
        output.display(),
        report.issue_count()
    );
    Ok(())
}
