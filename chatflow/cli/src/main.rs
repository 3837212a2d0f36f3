//! ChatFlow CLI - Fill forms from the terminal
//!
//! Runs a ChatFlow form as a chat, a step-by-step wizard or a single page on
//! stdin/stdout, then delivers the answers to a ChatFlow server or appends
//! them to a local JSON-lines file.
//!
//! # Usage
//!
//! ```bash
//! # Chat with a local form, answers go to responses.jsonl
//! chatflow fill cadastro.json
//!
//! # Wizard mode, posting to a server
//! chatflow fill form.json --mode wizard --sink-url http://localhost:5000
//!
//! # Show the questions a respondent will get
//! chatflow inspect form.json
//!
//! # Verbose logging (logs go to stderr)
//! RUST_LOG=debug chatflow fill form.json
//! ```

mod console;
mod fill;
mod form_file;
mod json_sink;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing::info;

use chatflow_core::{
    augment, check_fields, load_config_from_path, ChatflowConfig, ConfigOverrides, FillMode,
    HttpResponseSink, ResponseSink,
};

use console::Console;
use json_sink::JsonLinesSink;

/// ChatFlow - conversational form filling in the terminal
#[derive(Parser, Debug)]
#[command(name = "chatflow")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short = 'c', long, env = "CHATFLOW_CONFIG", value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, env = "CHATFLOW_LOG_LEVEL", default_value = "warn", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fill a form interactively
    Fill {
        /// Form JSON (`{title, fields}` or a stored form document)
        form: PathBuf,

        /// Presentation mode (chat, wizard, single)
        #[arg(short = 'm', long)]
        mode: Option<FillMode>,

        /// ChatFlow server to post the response to
        #[arg(long, value_name = "URL")]
        sink_url: Option<String>,

        /// Override the form id responses are filed under
        #[arg(long, value_name = "ID")]
        form_id: Option<String>,

        /// JSON-lines file used when no server is configured
        #[arg(short = 'o', long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// Bound on one submission attempt in milliseconds
        #[arg(long, value_name = "MS")]
        timeout_ms: Option<u64>,
    },

    /// Print the effective field list of a form
    Inspect {
        /// Form JSON (`{title, fields}` or a stored form document)
        form: PathBuf,
    },
}

/// Initialize logging with the specified level
///
/// Logs go to stderr so they never mix with the conversation on stdout.
fn init_logging(level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        tracing_subscriber::EnvFilter::new(format!("chatflow={level},chatflow_core={level}"))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();
}

/// Choose where answers go
fn build_sink(config: &ChatflowConfig) -> Result<Arc<dyn ResponseSink>> {
    match &config.sink_url {
        Some(url) => {
            let sink = HttpResponseSink::new(url.as_str())
                .context("Failed to create HTTP client")?
                .with_request_timeout(config.submit_timeout);
            info!(url = %url, "Responses go to server");
            Ok(Arc::new(sink))
        }
        None => {
            info!(path = %config.output_path.display(), "Responses go to local file");
            Ok(Arc::new(JsonLinesSink::new(config.output_path.clone())))
        }
    }
}

async fn run_fill(config: ChatflowConfig, form: PathBuf, form_id: Option<String>) -> Result<()> {
    let loaded = form_file::load_form(&form).await?;
    check_fields(&loaded.source.fields).context("Form has invalid fields")?;
    let form_id = form_id.unwrap_or(loaded.form_id);

    let sink = build_sink(&config)?;
    let mut console = Console::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout());

    let ack = fill::fill(
        &mut console,
        &form_id,
        &loaded.source,
        &loaded.customization,
        config.mode,
        sink,
        config.submit_timeout,
    )
    .await?;

    info!(form_id = %form_id, response_id = %ack.response_id, "Form filled");
    Ok(())
}

async fn run_inspect(form: PathBuf) -> Result<()> {
    let loaded = form_file::load_form(&form).await?;
    let effective = augment(&loaded.source.fields);

    println!("{} ({})", loaded.source.title, loaded.form_id);
    for (i, field) in effective.iter().enumerate() {
        let marker = if effective.is_synthetic(i) { " [contato]" } else { "" };
        let required = if field.required { " *" } else { "" };
        println!(
            "{:>3}. {:<8} {}{required}  ({}){marker}",
            i + 1,
            field.field_type,
            field.label,
            field.id
        );
        if !field.options.is_empty() {
            println!("       opções: {}", field.options.join(", "));
        }
        if let Some(max) = field.max_length {
            println!("       máximo: {max} caracteres");
        }
    }

    if let Err(e) = check_fields(&loaded.source.fields) {
        println!();
        println!("Campo inválido: {e}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    match args.command {
        Command::Fill {
            form,
            mode,
            sink_url,
            form_id,
            output,
            timeout_ms,
        } => {
            let config_path = args.config.or_else(chatflow_core::default_config_path);
            let mut config =
                load_config_from_path(config_path).context("Failed to load configuration")?;

            let mut overrides = ConfigOverrides::new();
            if let Some(url) = sink_url {
                overrides = overrides.with_sink_url(url);
            }
            if let Some(ms) = timeout_ms {
                overrides = overrides.with_submit_timeout_ms(ms);
            }
            if let Some(path) = output {
                overrides = overrides.with_output_path(path);
            }
            if let Some(mode) = mode {
                overrides = overrides.with_mode(mode);
            }
            overrides.apply(&mut config);

            info!(source = %config.source(), mode = %config.mode, "Configuration loaded");
            run_fill(config, form, form_id).await
        }
        Command::Inspect { form } => run_inspect(form).await,
    }
}
