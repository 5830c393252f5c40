//! CLI binary: keep the meaningful images of a folder.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ClassifyConfig` and prints results.

mod common;

use anyhow::{Context, Result};
use clap::Parser;
use common::{bold, cyan, dim, green, init_logging, red, CliProgressCallback};
use figsift::config::{DEFAULT_BASE_URL, DEFAULT_OUTPUT_FOLDER};
use figsift::{classify_folder, ClassifyConfig, CollisionPolicy, ProgressCallback, RouteMode};
use std::path::PathBuf;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Keep the meaningful images of ./informe into ./imagenes_significativas
  export SAMBANOVA_API_KEY=...
  figsift-classify informe

  # Custom destination, move instead of copy, never overwrite
  figsift-classify informe --output_folder figuras --move --on-conflict rename

  # Another vision provider through edgequake-llm
  figsift-classify informe --provider openai --model gpt-4.1-mini

  # Machine-readable report
  figsift-classify informe --json > report.json

VERDICT:
  The model is asked to answer SI (objects, people, landscapes, other
  semantic content) or NO (basic geometric figures, abstract patterns).
  Only the first word of the answer counts; anything other than SI/SÍ/YES/NO
  is treated as NO.

ENVIRONMENT VARIABLES:
  SAMBANOVA_API_KEY   Credential for the default backend (required)
  SAMBANOVA_BASE_URL  OpenAI-compatible endpoint (default https://api.sambanova.ai/v1)
  FIGSIFT_MODEL       Override model ID
  FIGSIFT_PROVIDER    Use an edgequake-llm provider (openai, anthropic, gemini, ollama)
  OPENAI_API_KEY …    Credentials read by edgequake-llm providers
"#;

/// Copy the images a vision model judges meaningful into an output folder.
#[derive(Parser, Debug)]
#[command(
    name = "figsift-classify",
    version,
    about = "Keep the images of a folder that a vision model judges meaningful",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Folder holding the images to classify (.jpg .jpeg .png .bmp .gif).
    input_folder: PathBuf,

    /// Destination for meaningful images.
    #[arg(
        long = "output_folder",
        visible_alias = "output-folder",
        env = "FIGSIFT_OUTPUT_FOLDER",
        default_value = DEFAULT_OUTPUT_FOLDER
    )]
    output_folder: PathBuf,

    /// SambaNova API key.
    #[arg(long, env = "SAMBANOVA_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OpenAI-compatible base URL.
    #[arg(long, env = "SAMBANOVA_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Vision model ID.
    #[arg(
        long,
        env = "FIGSIFT_MODEL",
        long_help = "Vision model to use. Default: Llama-3.2-90B-Vision-Instruct on SambaNova,\n\
          gpt-4.1-nano when --provider is set."
    )]
    model: Option<String>,

    /// edgequake-llm provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, env = "FIGSIFT_PROVIDER")]
    provider: Option<String>,

    /// Path to a text file containing a custom classification prompt.
    #[arg(long, env = "FIGSIFT_PROMPT_FILE")]
    prompt_file: Option<PathBuf>,

    /// Move meaningful images instead of copying them.
    #[arg(long = "move", env = "FIGSIFT_MOVE")]
    move_files: bool,

    /// What to do when the destination already has a file of the same name.
    #[arg(long, env = "FIGSIFT_ON_CONFLICT", value_enum, default_value = "overwrite")]
    on_conflict: ConflictArg,

    /// Stop at the first image that cannot be classified or routed.
    #[arg(long, env = "FIGSIFT_FAIL_FAST")]
    fail_fast: bool,

    /// Per-image API call timeout in seconds.
    #[arg(long, env = "FIGSIFT_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, env = "FIGSIFT_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Nucleus-sampling cutoff (0.0–1.0).
    #[arg(long, env = "FIGSIFT_TOP_P", default_value_t = 0.1)]
    top_p: f32,

    /// Print a JSON report on stdout.
    #[arg(long, env = "FIGSIFT_JSON")]
    json: bool,

    /// Disable progress bar.
    #[arg(long, env = "FIGSIFT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "FIGSIFT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "FIGSIFT_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum ConflictArg {
    Overwrite,
    Skip,
    Rename,
}

impl From<ConflictArg> for CollisionPolicy {
    fn from(v: ConflictArg) -> Self {
        match v {
            ConflictArg::Overwrite => CollisionPolicy::Overwrite,
            ConflictArg::Skip => CollisionPolicy::Skip,
            ConflictArg::Rename => CollisionPolicy::Rename,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
    init_logging(cli.verbose, cli.quiet, show_progress);

    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new("Classifying", "images") as ProgressCallback)
    } else {
        None
    };
    let config = build_config(&cli, progress_cb).await?;

    let output = classify_folder(&cli.input_folder, &config)
        .await
        .context("Classification failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        let s = &output.stats;
        eprintln!(
            "{}  {} processed  {} meaningful  {} discarded  {}  →  {}",
            if s.failed == 0 { green("✔") } else { cyan("⚠") },
            bold(&s.processed.to_string()),
            green(&s.meaningful.to_string()),
            dim(&s.discarded.to_string()),
            if s.failed == 0 {
                dim("0 failed")
            } else {
                red(&format!("{} failed", s.failed))
            },
            bold(&output.output_folder.display().to_string()),
        );
        if s.ambiguous > 0 {
            eprintln!(
                "   {} answer(s) were neither yes nor no and were discarded",
                s.ambiguous
            );
        }
        if s.skipped_existing > 0 {
            eprintln!(
                "   {} meaningful image(s) already in the output folder were left as they were",
                s.skipped_existing
            );
        }
    }

    Ok(())
}

/// Map CLI args to `ClassifyConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<ClassifyConfig> {
    let mut builder = ClassifyConfig::builder()
        .output_folder(&cli.output_folder)
        .base_url(&cli.base_url)
        .route_mode(if cli.move_files {
            RouteMode::Move
        } else {
            RouteMode::Copy
        })
        .on_conflict(cli.on_conflict.clone().into())
        .fail_fast(cli.fail_fast)
        .api_timeout_secs(cli.api_timeout)
        .temperature(cli.temperature)
        .top_p(cli.top_p);

    if let Some(ref key) = cli.api_key {
        builder = builder.api_key(key);
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref path) = cli.prompt_file {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read prompt from {:?}", path))?;
        builder = builder.prompt(prompt.trim());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
