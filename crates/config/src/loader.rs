use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{env_subst::substitute_env, schema::MurmurConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["murmur.toml", "murmur.yaml", "murmur.yml", "murmur.json"];

/// Load and validate config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<MurmurConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    let config = parse_config(&raw, path)?;
    config.validate()?;
    Ok(config)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./murmur.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/murmur/murmur.{toml,yaml,yml,json}` (user-global)
///
/// Returns `MurmurConfig::default()` if no usable config file is found.
pub fn discover_and_load() -> MurmurConfig {
    if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => return cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
            },
        }
    } else {
        debug!("no config file found, using defaults");
    }
    MurmurConfig::default()
}

fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/murmur/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "murmur").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<MurmurConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
