use clap::{Args, Parser, Subcommand};
use shrinkray::imaging::{OutputFormat, RustBackend, media_type_for_extension};
use shrinkray::session::{LoadOutcome, Notification, RunOutcome, Session, SourceImage};
use shrinkray::{config, output, proxy};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use tracing_subscriber::EnvFilter;

/// Declared type for inputs whose extension is not recognized.
const UNKNOWN_MEDIA_TYPE: &str = "application/octet-stream";

#[derive(Parser)]
#[command(name = "shrinkray")]
#[command(about = "Resize and re-encode images in memory")]
#[command(long_about = "\
Resize and re-encode images in memory

Images are decoded, scaled down to a maximum width (never up, aspect ratio
kept) and re-encoded as JPEG, PNG or WebP at a chosen quality. The result is
written as compressed-<timestamp>.<ext>.

The serve command runs a small HTTP relay that turns repository facts into a
README via a chat-completion service (POST /generate-readme).

Settings are read from an optional config.toml, a .env file and the
environment (PORT, NAXOR_API_KEY, RUST_LOG).

Run 'shrinkray gen-config' to generate a documented config.toml.")]
#[command(version)]
struct Cli {
    /// Path to a config.toml
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Shared flags for commands that load an input image.
#[derive(Args, Clone)]
struct InputArgs {
    /// Image file to load
    input: PathBuf,

    /// Declared media type; guessed from the extension when omitted
    #[arg(long)]
    media_type: Option<String>,
}

#[derive(Subcommand)]
enum Command {
    /// Compress one image and write the result
    Compress {
        #[command(flatten)]
        input: InputArgs,

        /// Output format: jpeg, png or webp
        #[arg(long)]
        format: Option<OutputFormat>,

        /// Quality from 0.0 to 1.0
        #[arg(long)]
        quality: Option<f32>,

        /// Maximum output width in pixels (defaults to the natural width)
        #[arg(long)]
        max_width: Option<u32>,

        /// Directory to write the compressed file into
        #[arg(long, default_value = ".")]
        out_dir: PathBuf,
    },
    /// Decode an image and print its dimensions and size
    Inspect(InputArgs),
    /// Run the README generation relay
    Serve {
        /// Listen port (overrides config and PORT)
        #[arg(long)]
        port: Option<u16>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Command::Compress {
            input,
            format,
            quality,
            max_width,
            out_dir,
        } => {
            let config = config::load_config(cli.config.as_deref())?;
            let (tx, rx) = std::sync::mpsc::channel();
            let printer = std::thread::spawn(move || {
                for notification in rx {
                    output::print_notification(&notification);
                }
            });

            let outcome = async {
                let session = new_session(&config, tx);
                let source = load(&session, &input).await?;

                if let Some(format) = format {
                    session.set_format(format);
                }
                if let Some(quality) = quality {
                    session.set_quality(quality)?;
                }
                if let Some(max_width) = max_width {
                    session.set_max_width(max_width);
                }
                let settings = session.settings();

                let result = match session.compress().await? {
                    RunOutcome::Applied(result) => result,
                    RunOutcome::Superseded { run } => {
                        return Err(format!("run {} was superseded", run).into());
                    }
                };
                let download = session.download()?;
                std::fs::create_dir_all(&out_dir)?;
                std::fs::write(out_dir.join(&download.file_name), download.bytes())?;

                output::print_result(
                    &display_name(&input.input),
                    &download.file_name,
                    &source,
                    &settings,
                    &result,
                );
                Ok::<(), Box<dyn std::error::Error>>(())
            }
            .await;

            let _ = printer.join();
            outcome?;
        }
        Command::Inspect(input) => {
            let config = config::load_config(cli.config.as_deref())?;
            let (tx, rx) = std::sync::mpsc::channel();
            let outcome = {
                let session = new_session(&config, tx);
                load(&session, &input).await
            };
            for notification in rx.try_iter() {
                output::print_notification(&notification);
            }
            let source = outcome?;
            output::print_source(&display_name(&input.input), &source);
        }
        Command::Serve { port } => {
            let mut config = config::load_config(cli.config.as_deref())?;
            if let Some(port) = port {
                config.proxy.port = port;
            }
            if config.proxy.api_key.is_none() {
                tracing::warn!("{} is not set; upstream calls carry no API key", config::API_KEY_ENV);
            }
            let client = Arc::new(proxy::HttpCompletionClient::new(&config.proxy)?);
            proxy::serve(client, &config.proxy).await?;
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` (default `info`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn new_session(config: &config::AppConfig, tx: Sender<Notification>) -> Session<RustBackend> {
    Session::new(RustBackend::new(), config.compression.session_options())
        .with_settings(config.compression.initial_settings())
        .with_notifier(tx)
}

async fn load(
    session: &Session<RustBackend>,
    input: &InputArgs,
) -> Result<Arc<SourceImage>, Box<dyn std::error::Error>> {
    let media_type = input
        .media_type
        .clone()
        .unwrap_or_else(|| guess_media_type(&input.input).to_string());
    match session.load_path(&input.input, &media_type).await? {
        LoadOutcome::Loaded(source) => Ok(source),
        LoadOutcome::Superseded { load } => Err(format!("load {} was superseded", load).into()),
    }
}

fn guess_media_type(path: &Path) -> &'static str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(media_type_for_extension)
        .unwrap_or(UNKNOWN_MEDIA_TYPE)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
