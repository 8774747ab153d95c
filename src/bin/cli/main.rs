//! lingo-pdf CLI
//!
//! Translates a PDF while preserving its layout.
//!
//! # Usage
//!
//! ```bash
//! lingo-pdf --input paper.pdf --output paper.zh.pdf \
//!     --model models/doclayout_yolo.onnx \
//!     --font fonts/NotoSansSC-Regular.ttf \
//!     --bold-font fonts/NotoSansSC-Bold.ttf \
//!     --pages 1,3-5 --target-lang zh-CN
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use lingo_pdf::{
    pipeline, AppSettings, CancelFlag, PipelineAssets, ProgressEvent, TranslateRequest,
};

#[derive(Parser)]
#[command(name = "lingo-pdf")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Translate a PDF while preserving its layout", long_about = None)]
struct Cli {
    /// Input PDF to translate
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Where to write the translated PDF
    #[arg(long, short = 'o')]
    output: PathBuf,

    /// Settings file (TOML); missing keys take defaults
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Path to the DocLayout-YOLO ONNX model
    #[arg(long, env = "LINGO_PDF_MODEL")]
    model: PathBuf,

    /// TTF font covering the target language's script
    #[arg(long, env = "LINGO_PDF_FONT")]
    font: PathBuf,

    /// Optional bold TTF used for titles
    #[arg(long = "bold-font", env = "LINGO_PDF_BOLD_FONT")]
    bold_font: Option<PathBuf>,

    /// Pages to translate, e.g. "2" or "1,3-5"; all pages when omitted
    #[arg(long)]
    pages: Option<String>,

    /// Target language override, e.g. "zh-CN" or "ja"
    #[arg(long = "target-lang")]
    target_lang: Option<String>,

    /// System-prompt override for the LLM translator
    #[arg(long)]
    prompt: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) if e.is_cancelled() => {
            warn!("Cancelled, no output written");
            ExitCode::from(130)
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> lingo_pdf::Result<()> {
    let mut settings = match &cli.settings {
        Some(path) => AppSettings::load(path)?,
        None => AppSettings::default(),
    };
    if let Some(target) = cli.target_lang {
        settings.target_language = target;
    }

    let selected_pages = match cli.pages.as_deref() {
        Some(spec) => parse_pages(spec).map_err(lingo_pdf::TranslateError::config)?,
        None => Vec::new(),
    };

    let request = TranslateRequest {
        input_path: cli.input,
        output_path: cli.output,
        settings,
        assets: PipelineAssets {
            model_path: cli.model,
            regular_font: cli.font,
            bold_font: cli.bold_font,
        },
        selected_pages,
        custom_prompt: cli.prompt,
    };

    let cancel = CancelFlag::new();
    let signal_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current page");
            signal_flag.cancel();
        }
    });

    let outcome = pipeline::translate_pdf(&request, &cancel, &print_progress).await?;

    info!(
        "Done: {} regions on {} pages ({} in, {} out tokens, ${:.4})",
        outcome.regions_translated,
        outcome.pages_processed,
        outcome.usage.input_tokens,
        outcome.usage.output_tokens,
        outcome.usage.total_cost
    );
    Ok(())
}

fn print_progress(event: ProgressEvent) {
    if event.current_page > 0 {
        info!(
            "[{:5.1}%] {} (page {}/{})",
            event.percent, event.stage, event.current_page, event.total_pages
        );
    } else {
        info!("[{:5.1}%] {}", event.percent, event.stage);
    }
}

/// Parses a page spec like "1,3-5" into one-based page numbers.
fn parse_pages(spec: &str) -> Result<Vec<u32>, String> {
    let mut pages = Vec::new();
    for part in spec.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        match part.split_once('-') {
            Some((start, end)) => {
                let start: u32 = start
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid page range '{part}'"))?;
                let end: u32 = end
                    .trim()
                    .parse()
                    .map_err(|_| format!("invalid page range '{part}'"))?;
                if start > end {
                    return Err(format!("descending page range '{part}'"));
                }
                pages.extend(start..=end);
            }
            None => {
                pages.push(
                    part.parse()
                        .map_err(|_| format!("invalid page number '{part}'"))?,
                );
            }
        }
    }
    Ok(pages)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_pages_and_ranges() {
        assert_eq!(parse_pages("1,3-5,9").unwrap(), vec![1, 3, 4, 5, 9]);
    }

    #[test]
    fn whitespace_is_tolerated() {
        assert_eq!(parse_pages(" 2 , 4 - 6 ").unwrap(), vec![2, 4, 5, 6]);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(parse_pages("abc").is_err());
        assert!(parse_pages("5-2").is_err());
    }
}
