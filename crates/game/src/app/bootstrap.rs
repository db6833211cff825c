use engine::{resolve_app_paths, LoopConfig, Scene};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use super::config::{load_game_config, ConfigError, GameConfig};
use super::gameplay;

pub(crate) struct AppWiring {
    pub(crate) config: LoopConfig,
    pub(crate) scene: Box<dyn Scene>,
}

pub(crate) fn build_app() -> Result<AppWiring, ConfigError> {
    init_tracing();
    info!("=== Skerry Startup ===");

    let game_config = resolve_game_config()?;
    let config = LoopConfig {
        window_title: game_config.window.title.clone(),
        window_width: game_config.window.width,
        window_height: game_config.window.height,
        ..LoopConfig::default()
    };
    let scene = gameplay::build_island_scene(game_config);

    Ok(AppWiring { config, scene })
}

/// Resolving the app root can fail here without being fatal: `run_app` walks
/// the same path and reports the real startup error. A missing root only
/// means there is no config file to read yet.
fn resolve_game_config() -> Result<GameConfig, ConfigError> {
    match resolve_app_paths() {
        Ok(paths) => load_game_config(&paths.assets_dir.join("config.json")),
        Err(error) => {
            warn!(error = %error, "app_root_unresolved_using_default_config");
            Ok(GameConfig::default())
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_names(true)
        .compact()
        .init();
}
