use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Persisted conversion settings used by CLI workflows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertSettings {
    pub container_path: Option<String>,
    pub skeleton_path: Option<String>,
    pub output_path: Option<String>,
    /// Reconstruct or flatten meshes of one model on the rayon pool.
    pub parallel_meshes: bool,
    /// Rebind meshes with a parent bone to that bone at import.
    pub single_bind_correction: bool,
    /// Write `<output>.diagnostic.json` after a rebuild.
    pub write_diagnostics: bool,
}

impl Default for ConvertSettings {
    fn default() -> Self {
        Self {
            container_path: None,
            skeleton_path: None,
            output_path: None,
            parallel_meshes: true,
            single_bind_correction: true,
            write_diagnostics: false,
        }
    }
}

/// Save conversion settings to a JSON file.
pub fn save_convert_settings(path: &Path, settings: &ConvertSettings) -> Result<()> {
    let content = serde_json::to_string_pretty(settings)
        .context("failed to serialize convert settings as JSON")?;
    fs::write(path, content)
        .with_context(|| format!("failed to save convert settings: {}", path.display()))?;
    Ok(())
}

/// Load conversion settings from a JSON file.
pub fn load_convert_settings(path: &Path) -> Result<ConvertSettings> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to load convert settings: {}", path.display()))?;
    let settings: ConvertSettings =
        serde_json::from_str(&content).context("failed to parse convert settings JSON")?;
    Ok(settings)
}

/// Path given on the command line, else the one stored in the settings file.
pub fn resolve_path(flag: Option<&Path>, stored: Option<&str>, what: &str) -> Result<PathBuf> {
    flag.map(Path::to_path_buf)
        .or_else(|| stored.map(PathBuf::from))
        .with_context(|| {
            format!("no {what} path given on the command line or in the settings file")
        })
}
