//! `deckshift` – submit a PDF deck and save the converted presentation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use deckshift_client::transport::local_file_name;
use deckshift_client::{
    ConversionPipeline, ConversionResult, HttpTransport, PipelineSnapshot, StepStatus, Upload,
    STEP_LABELS,
};
use deckshift_core::derive_artifact_name;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Longest diagnostic shown on the terminal; the rest is elided.
const DETAIL_DISPLAY_CHARS: usize = 2_000;

#[derive(Debug, Parser)]
#[command(name = "deckshift", version, about = "Convert a PDF slide deck into an editable PPTX")]
struct Cli {
    /// PDF file to convert.
    input: PathBuf,

    /// Where to write the artifact (default: next to the input).
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Base URL of the deckshift server.
    #[arg(long, env = "DECKSHIFT_SERVER", default_value = "http://127.0.0.1:3000")]
    server: String,

    /// Ask the converter to use its LLM-assisted mode.
    #[arg(long)]
    use_llm: bool,

    /// Re-submit this many times after a failed attempt.
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// Tracing filter for client logs.
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = EnvFilter::try_new(&cli.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let mut upload = Upload::from_path(&cli.input)
        .await
        .with_context(|| format!("cannot read {}", cli.input.display()))?;
    upload.use_llm = cli.use_llm;

    let transport = HttpTransport::new(&cli.server)?;
    debug!(endpoint = transport.endpoint(), "using server");
    let pipeline = Arc::new(ConversionPipeline::new(Arc::new(transport)));

    let render = tokio::spawn(render_steps(pipeline.subscribe()));

    let mut outcome = pipeline.submit(upload).await;
    let mut attempts_left = cli.retries;
    while matches!(outcome.result, ConversionResult::Error { .. }) && attempts_left > 0 {
        attempts_left -= 1;
        report_error(&outcome.result);
        eprintln!("retrying ({attempts_left} left)…");
        match pipeline.retry().await {
            Some(next) => outcome = next,
            None => break,
        }
    }

    drop(pipeline);
    let _ = render.await;

    match outcome.result {
        ConversionResult::Success {
            artifact,
            artifact_name,
        } => {
            let target = cli
                .output
                .unwrap_or_else(|| sibling_path(&cli.input, &artifact_name));
            tokio::fs::write(&target, &artifact)
                .await
                .with_context(|| format!("cannot write {}", target.display()))?;
            println!("saved {} ({} bytes)", target.display(), artifact.len());
            Ok(())
        }
        ref result @ ConversionResult::Error { .. } => {
            report_error(result);
            bail!("conversion failed")
        }
        ConversionResult::Idle => bail!("conversion was abandoned"),
    }
}

/// Print each step transition until the pipeline is dropped.
async fn render_steps(mut rx: tokio::sync::watch::Receiver<PipelineSnapshot>) {
    let mut shown = rx.borrow_and_update().steps;
    while rx.changed().await.is_ok() {
        let steps = rx.borrow_and_update().steps;
        for (i, (old, new)) in shown.iter().zip(steps.iter()).enumerate() {
            if old != new {
                let mark = match new {
                    StepStatus::Idle => continue,
                    StepStatus::Running => "…",
                    StepStatus::Done => "✓",
                    StepStatus::Error => "✗",
                };
                eprintln!("[{}/{}] {mark} {}", i + 1, STEP_LABELS.len(), STEP_LABELS[i]);
            }
        }
        shown = steps;
    }
}

fn report_error(result: &ConversionResult) {
    if let ConversionResult::Error {
        message,
        detail,
        hint,
    } = result
    {
        eprintln!("error: {message}");
        if let Some(hint) = hint {
            eprintln!("hint: {hint}");
        }
        if let Some(detail) = detail {
            let shown: String = detail.chars().take(DETAIL_DISPLAY_CHARS).collect();
            let elided = if shown.len() < detail.len() { "\n…" } else { "" };
            eprintln!("detail:\n{shown}{elided}");
        }
    }
}

/// `<input dir>/<artifact name>`. A name that is not a bare file name is
/// replaced by one derived from the input.
fn sibling_path(input: &Path, artifact_name: &str) -> PathBuf {
    let file_name = local_file_name(artifact_name).unwrap_or_else(|| {
        let input_name = input.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        derive_artifact_name(input_name)
    });
    input
        .parent()
        .map(|dir| dir.join(&file_name))
        .unwrap_or_else(|| PathBuf::from(file_name))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn artifact_lands_next_to_input() {
        assert_eq!(
            sibling_path(Path::new("/decks/q3.pdf"), "q3.pptx"),
            PathBuf::from("/decks/q3.pptx")
        );
        assert_eq!(sibling_path(Path::new("q3.pdf"), "q3.pptx"), PathBuf::from("q3.pptx"));
    }

    #[test]
    fn artifact_name_cannot_leave_input_directory() {
        let input = Path::new("/decks/q3.pdf");
        for name in ["../../evil.pptx", "/tmp/owned.pptx", "..", ""] {
            assert_eq!(sibling_path(input, name), PathBuf::from("/decks/q3.pptx"), "{name}");
        }
    }

    #[test]
    fn cli_defaults() {
        let cli = Cli::try_parse_from(["deckshift", "deck.pdf"]).unwrap();
        assert_eq!(cli.retries, 0);
        assert!(!cli.use_llm);
        assert!(cli.output.is_none());
    }
}
