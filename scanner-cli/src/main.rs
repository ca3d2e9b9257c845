use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use scanner_core::{Resolution, ScanSession};
use scanner_ingest::{DocumentPayload, ExtractionHandle, GeminiExtractor, scan_document};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod auth;
mod config;
mod review;
mod state;

#[derive(Parser, Debug)]
#[command(
    name = "scanner",
    version,
    long_version = concat!(env!("CARGO_PKG_VERSION"), " (", env!("SCANNER_BUILD_SHA"), ")"),
    about = "Extract bank statement transactions from images and PDFs"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan one statement and write its transactions as CSV
    Extract {
        /// Statement image (png, jpg, webp, ...) or PDF
        file: PathBuf,

        /// Output path; `-` writes to stdout (default: statement_<bank>_<date>.csv)
        #[arg(long)]
        out: Option<PathBuf>,

        /// Print the decoded extraction as JSON instead of CSV
        #[arg(long)]
        json: bool,
    },

    /// Scan a statement, then correct rows interactively before exporting
    Review {
        /// Statement to scan first (use `open FILE` inside otherwise)
        file: Option<PathBuf>,
    },

    /// Manage ~/.statement-scanner/config.toml
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Store the Gemini API key
    Auth {
        #[command(subcommand)]
        command: AuthCommand,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Write the default config if none exists
    Init,
    /// Print the effective config and where the API key comes from
    Show,
}

#[derive(Subcommand, Debug)]
enum AuthCommand {
    /// Paste a Gemini API key into ~/.statement-scanner/auth.json
    PasteGeminiKey,
}

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,scanner=info,scanner_ingest=info,scanner_export=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Extract { file, out, json } => {
            extract(file, out, json).await?;
        }

        Command::Review { file } => {
            let extractor = build_extractor()?;
            let mut review = review::Review::new(ExtractionHandle::spawn(Arc::new(extractor)));
            if let Some(file) = file {
                review.open(&file).await;
            }
            review.run().await?;
        }

        Command::Config { command } => match command {
            ConfigCommand::Init => config::init_config()?,
            ConfigCommand::Show => show_config()?,
        },

        Command::Auth { command } => match command {
            AuthCommand::PasteGeminiKey => auth::gemini_paste_key()?,
        },
    }

    Ok(())
}

fn build_extractor() -> Result<GeminiExtractor> {
    let cfg = config::load_config()?;
    let Some((key, source)) = auth::resolve_api_key()? else {
        bail!(
            "No Gemini API key found. Set GEMINI_API_KEY or run: scanner auth paste-gemini-key"
        );
    };
    tracing::debug!(?source, model = %cfg.gemini.model, "using gemini");
    GeminiExtractor::new(cfg.gemini_config(&key)).context("build gemini client")
}

async fn extract(file: PathBuf, out: Option<PathBuf>, json: bool) -> Result<()> {
    let payload =
        DocumentPayload::from_path(&file).with_context(|| format!("reading {}", file.display()))?;
    let extractor = build_extractor()?;

    let mut session = ScanSession::new();
    let (_, resolution) = scan_document(&mut session, &extractor, &payload).await;
    if resolution != Resolution::Applied {
        bail!(
            "{}",
            session
                .error_message()
                .unwrap_or("Failed to extract data. Please check your image clarity and try again.")
        );
    }
    let Some(result) = session.result() else {
        bail!("extraction produced no result");
    };

    eprintln!(
        "{} Transactions Found ({}, {})",
        result.len(),
        result.bank_label(),
        result.period_label()
    );

    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    match out {
        Some(p) if p.as_os_str() == "-" => {
            let bytes = scanner_export::to_csv(&result.transactions)?;
            print!("{}", String::from_utf8_lossy(&bytes));
        }
        other => {
            let path = other.unwrap_or_else(|| {
                PathBuf::from(scanner_export::default_filename(
                    result.bank_name.as_deref(),
                    chrono::Utc::now().date_naive(),
                ))
            });
            scanner_export::write_csv(&path, &result.transactions)?;
            eprintln!("Wrote {}", path.display());
        }
    }

    Ok(())
}

fn show_config() -> Result<()> {
    let cfg = config::load_config()?;
    println!("# {}", config::config_path()?.display());
    println!("{}", toml::to_string_pretty(&cfg).context("serialize config")?);
    match auth::resolve_api_key()? {
        Some((key, auth::KeySource::Env(var))) => {
            println!("API key: {} (from ${var})", auth::mask_key(&key))
        }
        Some((key, auth::KeySource::AuthFile)) => {
            println!("API key: {} (from auth.json)", auth::mask_key(&key))
        }
        None => println!("API key: not set"),
    }
    Ok(())
}
