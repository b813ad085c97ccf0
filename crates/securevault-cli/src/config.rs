//! CLI-layer configuration: a TOML file read over `VaultConfig::default`-
//! equivalent construction, the way the teacher's Tauri frontend layers UI
//! state over core defaults (SPEC_FULL.md §2, ambient configuration).

use securevault_crypto_core::KdfPreset;
use securevault_vault::VaultConfig;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// On-disk TOML shape. Every field is optional; anything absent falls back
/// to `VaultConfig`'s own defaults.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    root: Option<PathBuf>,
    preset: Option<String>,
    rotation_workers: Option<usize>,
}

/// Default location for the CLI's config file: `<config dir>/securevault/config.toml`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("securevault").join("config.toml"))
}

/// Default vault root: `<data dir>/securevault`.
#[must_use]
pub fn default_vault_root() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("securevault")
}

/// Build a `VaultConfig` by layering an optional TOML file and optional
/// CLI overrides over the library's defaults.
///
/// # Errors
/// Returns a human-readable message if the file exists but is not valid
/// TOML, or names an unrecognized `preset`.
pub fn resolve(
    config_path: Option<&Path>,
    root_override: Option<PathBuf>,
    preset_override: Option<&str>,
) -> Result<VaultConfig, String> {
    let file_config = match config_path {
        Some(path) if path.exists() => {
            let text = std::fs::read_to_string(path)
                .map_err(|e| format!("reading config {}: {e}", path.display()))?;
            toml::from_str(&text).map_err(|e| format!("parsing config {}: {e}", path.display()))?
        }
        _ => FileConfig::default(),
    };

    let root = root_override
        .or(file_config.root)
        .unwrap_or_else(default_vault_root);

    let mut config = VaultConfig::new(root);

    if let Some(name) = preset_override.map(str::to_string).or(file_config.preset) {
        config.preset = parse_preset(&name)?;
    }
    if let Some(workers) = file_config.rotation_workers {
        config.rotation_workers = Some(workers);
    }

    Ok(config)
}

fn parse_preset(name: &str) -> Result<KdfPreset, String> {
    match name.to_ascii_lowercase().as_str() {
        "fast" => Ok(KdfPreset::Fast),
        "balanced" => Ok(KdfPreset::Balanced),
        "maximum" => Ok(KdfPreset::Maximum),
        other => Err(format!(
            "unknown KDF preset {other:?} (expected fast, balanced, or maximum)"
        )),
    }
}
