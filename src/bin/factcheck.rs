//! FactCheck CLI: proxy server plus a terminal stand-in for the extension.
//!
//! Usage:
//!   factcheck serve [--host 0.0.0.0] [--port 3000] [--model gemini-2.5-flash]
//!   factcheck check <text> [--proxy-url url] [--state path] [--no-open]
//!   factcheck show [--state path]

use clap::{Parser, Subcommand};
use factcheck::config::{
    default_state_path, ProxyConfig, RelayConfig, DEFAULT_HOST, DEFAULT_PORT,
    DEFAULT_PROXY_ENDPOINT,
};
use factcheck::presenter::present;
use factcheck::relay::{Badge, JsonFileStateStore, Relay, RelayError, RelayObserver, StateStore};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "factcheck", version, about = "AI fact-checking proxy and client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the fact-check proxy (requires GEMINI_API_KEY)
    Serve {
        /// Address to bind
        #[arg(long, env = "FACTCHECK_HOST", default_value = DEFAULT_HOST)]
        host: String,
        /// Port to listen on
        #[arg(long, env = "FACTCHECK_PORT", default_value_t = DEFAULT_PORT)]
        port: u16,
        /// Gemini model identifier
        #[arg(long, env = "FACTCHECK_MODEL")]
        model: Option<String>,
    },
    /// Fact-check a piece of text through the proxy and store the result
    Check {
        /// The selected text to check
        text: String,
        /// Proxy endpoint URL
        #[arg(long, env = "FACTCHECK_PROXY_URL", default_value = DEFAULT_PROXY_ENDPOINT)]
        proxy_url: String,
        /// Path to the state file
        #[arg(long)]
        state: Option<PathBuf>,
        /// Do not print the result after a successful check
        #[arg(long)]
        no_open: bool,
    },
    /// Show the last stored result
    Show {
        /// Path to the state file
        #[arg(long)]
        state: Option<PathBuf>,
    },
}

/// Prints badge changes to stderr and remembers open requests.
#[derive(Default)]
struct TerminalObserver {
    open_requested: AtomicBool,
}

impl RelayObserver for TerminalObserver {
    fn set_badge(&self, badge: Badge) {
        eprintln!("[{}]", badge.text());
    }

    fn open_surface(&self) {
        self.open_requested.store(true, Ordering::Relaxed);
    }
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "factcheck=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_serve(host: &str, port: u16, model: Option<String>) -> i32 {
    let config = match ProxyConfig::resolve(host, port, model) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error: {}", e);
            return 1;
        }
    };
    factcheck::proxy::run_server(config)
}

fn cmd_check(text: &str, proxy_url: String, state: Option<PathBuf>, no_open: bool) -> i32 {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {}", e);
            return 1;
        }
    };

    let config = RelayConfig {
        proxy_endpoint: proxy_url,
        state_path: state.unwrap_or_else(default_state_path),
        open_on_success: !no_open,
    };
    let observer = Arc::new(TerminalObserver::default());
    let relay = Relay::over_http(&config).with_observer(observer.clone());

    match rt.block_on(relay.fact_check(text)) {
        Ok(report) => {
            if !report.applied {
                eprintln!("A newer check superseded this one.");
            } else if observer.open_requested.load(Ordering::Relaxed) {
                print!("{}", present(&report.state));
            } else if let Some(err) = &report.state.last_error {
                eprintln!("Error: {}", err);
            }
            if report.state.last_error.is_some() {
                1
            } else {
                0
            }
        }
        Err(RelayError::EmptySelection) => {
            eprintln!("Error: no text to check");
            1
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn cmd_show(state: Option<PathBuf>) -> i32 {
    let store = JsonFileStateStore::open(state.unwrap_or_else(default_state_path));
    match store.load() {
        Ok(state) => {
            print!("{}", present(&state));
            0
        }
        Err(e) => {
            eprintln!("Error: failed to read {}: {}", store.path().display(), e);
            1
        }
    }
}

fn main() {
    dotenvy::dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Serve { host, port, model } => cmd_serve(&host, port, model),
        Commands::Check {
            text,
            proxy_url,
            state,
            no_open,
        } => cmd_check(&text, proxy_url, state, no_open),
        Commands::Show { state } => cmd_show(state),
    };
    std::process::exit(code);
}
