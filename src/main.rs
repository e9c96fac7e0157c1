use std::error::Error;
use std::sync::Mutex;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use parley::api::GatewayClient;
use parley::core::app::App;
use parley::core::config::SettingsStore;
use parley::ui::chat_loop;

#[derive(Parser)]
#[command(name = "parley")]
#[command(about = "A terminal chat client for a local AI gateway")]
#[command(
    long_about = "Parley is a full-screen terminal chat interface for a local AI gateway. \
It streams responses as the model generates them, renders markdown, and keeps \
your sampling settings between sessions.\n\n\
Controls:\n\
  Type              Compose your message (Alt+Enter for a newline)\n\
  Enter             Send the message\n\
  Ctrl+P            Pick a model (type to filter, Tab cycles categories)\n\
  Ctrl+S            Open settings\n\
  Ctrl+N            Start a new chat\n\
  Ctrl+R            Regenerate the last reply\n\
  Ctrl+Y            Copy the last reply to the clipboard\n\
  Up/Down/PgUp/PgDn Scroll the transcript\n\
  Ctrl+C            Quit"
)]
struct Args {
    /// Gateway base URL
    #[arg(long, default_value = "http://localhost:8000")]
    base_url: String,

    /// Append tracing output to this file (the alternate screen owns
    /// stdout, so there is nowhere else for logs to go)
    #[arg(long)]
    log_file: Option<String>,

    /// Disable response streaming for this session, overriding the saved
    /// setting
    #[arg(long)]
    no_stream: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    init_tracing(args.log_file.as_deref())?;

    let store = SettingsStore::open();
    let mut settings = store.load();
    if args.no_stream {
        settings.streaming = false;
    }

    let client = GatewayClient::new(reqwest::Client::new(), &args.base_url);
    let app = App::new(client, settings, store);
    chat_loop::run(app).await
}

fn init_tracing(log_file: Option<&str>) -> Result<(), Box<dyn Error>> {
    let Some(path) = log_file else {
        return Ok(());
    };
    let file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("parley=debug")),
        )
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}
