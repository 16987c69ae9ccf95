mod app;
mod theme;
mod widgets;

use std::path::PathBuf;

use clap::Parser;
use lfmp_client::keys::ShortcutMap;
use lfmp_proto::config::Config;
use lfmp_proto::prefs::PreferenceStore;

/// Terminal remote for a LastFMProxy server
#[derive(Parser)]
#[command(name = "lfmp", about = "Terminal remote for a LastFMProxy server", long_about = None)]
struct Cli {
    /// Server base URL, overriding `server.base_url`
    #[arg(long)]
    base_url: Option<String>,

    /// Config file (default: ~/.config/lfmp/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let data_dir = lfmp_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("lfmp.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // RUST_LOG wins; otherwise keep HTTP client internals quiet.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("lfmp log: {}", log_path.display());
    tracing::info!("lfmp starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load().unwrap_or_default(),
    };
    let base_url = cli
        .base_url
        .clone()
        .unwrap_or_else(|| config.server.base_url.clone());
    tracing::info!("server: {}", base_url);

    // ── Preferences ──────────────────────────────────────────────────────────
    let prefs = match PreferenceStore::load(&config.paths.prefs_file) {
        Ok(store) => store,
        Err(e) => {
            tracing::warn!(
                "could not read {}: {}; preferences will not persist",
                config.paths.prefs_file.display(),
                e
            );
            PreferenceStore::in_memory()
        }
    };

    // ── Session + TUI ────────────────────────────────────────────────────────
    let (session, completions) = app::build_session(&base_url, &config.polling)?;
    let shortcuts = ShortcutMap::new(config.keys.shortcuts_in_text_input);
    app::App::new(session, completions, shortcuts, prefs).run().await?;

    tracing::info!("lfmp exiting");
    Ok(())
}
