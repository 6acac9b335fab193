use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tokio::io::BufReader;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

use recruiter_assist::channels::run_chat;
use recruiter_assist::config::Settings;
use recruiter_assist::server::{AppState, app_routes};
use recruiter_assist::session::{SessionManager, spawn_eviction_task};

/// How often idle sessions are swept in server mode.
const EVICTION_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Parser)]
#[command(name = "recruiter-assist", version)]
#[command(about = "WhatsApp pre-interview assistant for Linkrs Marokko")]
struct Cli {
    /// Load environment variables from this file instead of ./.env
    #[arg(long, global = true, env = "RECRUITER_ENV_FILE")]
    env_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the Twilio WhatsApp webhook server
    Serve {
        /// Bind address (defaults to RECRUITER_HOST or 0.0.0.0)
        #[arg(long)]
        host: Option<String>,
        /// Listen port (defaults to RECRUITER_PORT or 5000)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Chat with the assistant in the terminal
    Chat,

    /// Send the welcome message to a candidate through a running server
    Initiate {
        /// Candidate first name
        #[arg(long)]
        name: String,
        /// WhatsApp number with country code
        #[arg(long)]
        phone: String,
        /// Discard any existing session for this number
        #[arg(long)]
        restart: bool,
        /// Base URL of the running server
        #[arg(long, env = "RECRUITER_SERVER_URL", default_value = "http://127.0.0.1:5000")]
        server: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match &cli.env_file {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("Failed to load env file {}", path.display()))?;
        }
        None => {
            dotenvy::dotenv().ok();
        }
    }

    let settings = Settings::from_env().context("Invalid configuration")?;
    let _log_guard = init_tracing(settings.log_dir.as_deref())?;

    match cli.command {
        Command::Serve { host, port } => serve(&settings, host, port).await,
        Command::Chat => chat(&settings).await,
        Command::Initiate {
            name,
            phone,
            restart,
            server,
        } => initiate(&name, &phone, restart, &server).await,
    }
}

/// Log to stderr, and also to a daily-rolling file when `log_dir` is set.
fn init_tracing(log_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stderr = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let Some(dir) = log_dir else {
        tracing_subscriber::registry().with(filter).with(stderr).init();
        return Ok(None);
    };

    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
    let (writer, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "recruiter-assist.log"));
    tracing_subscriber::registry()
        .with(filter)
        .with(stderr)
        .with(fmt::layer().with_ansi(false).with_writer(writer))
        .init();
    Ok(Some(guard))
}

async fn serve(settings: &Settings, host: Option<String>, port: Option<u16>) -> anyhow::Result<()> {
    let classifier = settings.classifier()?;
    let sender = Arc::new(settings.twilio_client()?);

    let sessions = Arc::new(
        SessionManager::new(classifier, Arc::new(settings.templates()))
            .with_idle_timeout(settings.session_timeout()),
    );
    let _eviction = spawn_eviction_task(Arc::clone(&sessions), EVICTION_INTERVAL);

    let app = app_routes(AppState { sessions, sender });

    let host = host.unwrap_or_else(|| settings.server.host.clone());
    let port = port.unwrap_or(settings.server.port);
    let listener = tokio::net::TcpListener::bind((host.as_str(), port))
        .await
        .with_context(|| format!("Failed to bind {host}:{port}"))?;

    tracing::info!(
        %host,
        port,
        model = %settings.llm.model,
        from = %settings.twilio.whatsapp_number,
        "Recruiter assistant listening; webhook at /webhook/whatsapp"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutting down");
        })
        .await
        .context("Server error")
}

async fn chat(settings: &Settings) -> anyhow::Result<()> {
    let classifier = settings.classifier()?;
    run_chat(
        BufReader::new(tokio::io::stdin()),
        tokio::io::stdout(),
        classifier,
        Arc::new(settings.templates()),
    )
    .await
    .context("Terminal I/O failed")?;
    Ok(())
}

async fn initiate(name: &str, phone: &str, restart: bool, server: &str) -> anyhow::Result<()> {
    let url = format!("{}/initiate", server.trim_end_matches('/'));
    let resp = reqwest::Client::new()
        .post(&url)
        .json(&serde_json::json!({
            "first_name": name,
            "phone_number": phone,
            "restart": restart,
        }))
        .send()
        .await
        .with_context(|| format!("Could not reach {url}; is `recruiter-assist serve` running?"))?;

    let status = resp.status();
    let body: serde_json::Value = resp
        .json()
        .await
        .context("Server returned a non-JSON response")?;

    if !status.is_success() {
        bail!(
            "Failed to initiate conversation: {}",
            body["error"].as_str().unwrap_or("unknown error")
        );
    }

    println!("✅ Message sent successfully!");
    println!("   To: {}", body["phone_number"].as_str().unwrap_or_default());
    println!("   SID: {}", body["message_sid"].as_str().unwrap_or_default());
    println!("   Status: {}", body["status"].as_str().unwrap_or_default());
    println!(
        "\n📝 Sent:\n{}\n",
        body["message_sent"].as_str().unwrap_or_default()
    );
    Ok(())
}
