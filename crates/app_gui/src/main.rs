mod app;

use anyhow::{Context, Result, anyhow};
use directories_next::ProjectDirs;
use eframe::{NativeOptions, egui};
use fruitscan_core::{AppConfig, ClassifierArtifact, HistoryStore, Session};
use std::path::PathBuf;
use std::sync::Arc;

use app::UiApp;

const CONFIG_FILE: &str = "fruitscan.toml";

fn main() {
    tracing_subscriber::fmt::init();
    tracing::info!("FruitScan {}", env!("FRUITSCAN_VERSION"));
    if let Err(e) = run() {
        tracing::error!("{e:#}");
        eprintln!("FruitScan stopped: {e:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let config = load_config()?.with_env_overrides();
    let artifact = match ClassifierArtifact::load(&config.classifier()) {
        Ok(artifact) => Arc::new(artifact),
        Err(e) => {
            app::show_error("Model error", &format!("Could not load the model: {e}"));
            return Err(e).context("no classifier, session not started");
        }
    };
    let history = HistoryStore::open_with_capacity(&config.history_path, config.history_capacity);
    let session = Session::new(artifact, history)
        .with_canvas_size(config.canvas_size)
        .with_recent_count(config.recent_count);

    let options = NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("FruitScan")
            .with_inner_size([700.0, 700.0]),
        ..Default::default()
    };
    eframe::run_native(
        "FruitScan",
        options,
        Box::new(|_cc| Ok(Box::new(UiApp::new(session)))),
    )
    .map_err(|e| anyhow!("{e}"))
}

/// `fruitscan.toml` from the working directory, then the user config dir.
fn load_config() -> Result<AppConfig> {
    let mut candidates = vec![PathBuf::from(CONFIG_FILE)];
    if let Some(dirs) = ProjectDirs::from("", "", "FruitScan") {
        candidates.push(dirs.config_dir().join(CONFIG_FILE));
    }
    match candidates.into_iter().find(|p| p.is_file()) {
        Some(path) => {
            tracing::info!("using config {}", path.display());
            AppConfig::load(path)
        }
        None => Ok(AppConfig::default()),
    }
}
