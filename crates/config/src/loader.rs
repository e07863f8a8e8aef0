use std::path::{Path, PathBuf};

use {serde_json::Value, tracing::debug};

use crate::{
    error::{Error, Result},
    tree::ConfigTree,
};

/// Default file name of the finalized settings.
pub const SETTINGS_FILENAME: &str = "settings.toml";

/// Returns the platform data directory for ragkit (`~/.local/share/ragkit`
/// on Linux).
pub fn data_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "ragkit").map(|d| d.data_dir().to_path_buf())
}

/// Load a settings file as a [`ConfigTree`]. The format follows the file
/// extension (`.toml` or `.json`).
pub fn load_settings(path: &Path) -> Result<ConfigTree> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::message(format!("failed to read {}: {e}", path.display())))?;
    parse_settings(&raw, path)
}

/// Serialize `tree` into `path`, creating parent directories if needed.
///
/// TOML has no null, so null values are left out of `.toml` files; loading
/// such a file back yields the same tree minus those keys.
pub fn save_settings(path: &Path, tree: &ConfigTree) -> Result<()> {
    let raw = match extension(path) {
        "toml" => toml::to_string_pretty(&without_nulls(tree.to_value()))?,
        "json" => serde_json::to_string_pretty(tree)?,
        ext => return Err(Error::message(format!("unsupported settings format: .{ext}"))),
    };
    write_atomic(path, &raw)?;
    debug!(path = %path.display(), "saved settings");
    Ok(())
}

/// Write `data` to a sibling temp file and rename it over `path`, so readers
/// see either the old or the new contents, never a truncated file.
pub fn write_atomic(path: &Path, data: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = temp_path(path);
    std::fs::write(&tmp, data)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}

fn without_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, without_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(
            items
                .into_iter()
                .filter(|v| !v.is_null())
                .map(without_nulls)
                .collect(),
        ),
        other => other,
    }
}

fn parse_settings(raw: &str, path: &Path) -> Result<ConfigTree> {
    let value = match extension(path) {
        "toml" => {
            let v: toml::Value = toml::from_str(raw)?;
            serde_json::to_value(v)?
        },
        "json" => serde_json::from_str(raw)?,
        ext => return Err(Error::message(format!("unsupported settings format: .{ext}"))),
    };
    match value {
        Value::Object(map) => Ok(ConfigTree::from(map)),
        _ => Err(Error::message(format!(
            "{}: settings must be a table at the top level",
            path.display()
        ))),
    }
}

fn extension(path: &Path) -> &str {
    path.extension().and_then(|e| e.to_str()).unwrap_or("toml")
}
