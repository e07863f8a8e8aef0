use std::{
    fs,
    path::{Path, PathBuf},
};

use {
    async_trait::async_trait,
    ragkit_config::{ConfigTree, Patch, save_settings, write_atomic},
    ragkit_service_traits::{ProgressService, ServiceResult, WizardProgress},
    serde_json::Value,
    tracing::debug,
};

/// File name of the saved wizard progress inside the data directory.
pub const PROGRESS_FILENAME: &str = "wizard_progress.json";

/// Keeps wizard progress as pretty JSON on the local disk and writes the
/// finalized config to a separate settings file.
pub struct FileProgressStore {
    progress_path: PathBuf,
    settings_path: PathBuf,
}

impl FileProgressStore {
    pub fn new(progress_path: PathBuf, settings_path: PathBuf) -> Self {
        Self {
            progress_path,
            settings_path,
        }
    }

    /// Store both files in `dir` under their default names.
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(
            dir.join(PROGRESS_FILENAME),
            dir.join(ragkit_config::loader::SETTINGS_FILENAME),
        )
    }

    pub fn progress_path(&self) -> &Path {
        &self.progress_path
    }

    pub fn settings_path(&self) -> &Path {
        &self.settings_path
    }
}

#[async_trait]
impl ProgressService for FileProgressStore {
    async fn load_progress(&self) -> ServiceResult<Option<WizardProgress>> {
        if !self.progress_path.exists() {
            return Ok(None);
        }
        let data = fs::read_to_string(&self.progress_path)?;
        Ok(Some(serde_json::from_str(&data)?))
    }

    async fn save_progress(&self, progress: &WizardProgress) -> ServiceResult {
        let data = serde_json::to_string_pretty(progress)?;
        write_atomic(&self.progress_path, &data)?;
        debug!(path = %self.progress_path.display(), step = progress.step, "saved wizard progress");
        Ok(())
    }

    async fn finalize(&self, config: &ConfigTree) -> ServiceResult {
        let mut marker = Patch::new();
        marker.insert("setup_completed".into(), Value::Bool(true));
        save_settings(&self.settings_path, &config.apply("", &marker))?;
        debug!(path = %self.settings_path.display(), "finalized setup config");
        Ok(())
    }
}
