//! Service trait interfaces for the collaborators the setup wizard talks to.
//!
//! Each trait has a `Noop` implementation so the wizard can be wired up
//! before a real backend is available. Implementations decide the transport;
//! nothing here assumes HTTP or any particular RPC layer.

use std::sync::Arc;

use {
    async_trait::async_trait,
    ragkit_config::ConfigTree,
    serde::{Deserialize, Serialize},
};

/// Error type returned by service methods.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{message}")]
    Message { message: String },
    #[error("{0}")]
    Serde(#[from] serde_json::Error),
}

impl ServiceError {
    #[must_use]
    pub fn message(message: impl std::fmt::Display) -> Self {
        Self::Message {
            message: message.to_string(),
        }
    }
}

impl From<String> for ServiceError {
    fn from(value: String) -> Self {
        Self::message(value)
    }
}

impl From<&str> for ServiceError {
    fn from(value: &str) -> Self {
        Self::message(value)
    }
}

impl From<std::io::Error> for ServiceError {
    fn from(value: std::io::Error) -> Self {
        Self::message(value)
    }
}

impl From<ragkit_config::Error> for ServiceError {
    fn from(value: ragkit_config::Error) -> Self {
        Self::message(value)
    }
}

pub type ServiceResult<T = ()> = Result<T, ServiceError>;

// ── Progress ────────────────────────────────────────────────────────────────

/// The persisted `{step, config}` pair that makes the wizard resumable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WizardProgress {
    #[serde(alias = "wizard_step")]
    pub step: usize,
    #[serde(default)]
    pub config: ConfigTree,
}

impl WizardProgress {
    pub fn new(step: usize, config: ConfigTree) -> Self {
        Self { step, config }
    }
}

#[async_trait]
pub trait ProgressService: Send + Sync {
    /// `None` when no wizard session was ever saved.
    async fn load_progress(&self) -> ServiceResult<Option<WizardProgress>>;
    async fn save_progress(&self, progress: &WizardProgress) -> ServiceResult;
    /// Promote the draft configuration to the live application settings.
    async fn finalize(&self, config: &ConfigTree) -> ServiceResult;
}

pub struct NoopProgressService;

#[async_trait]
impl ProgressService for NoopProgressService {
    async fn load_progress(&self) -> ServiceResult<Option<WizardProgress>> {
        Ok(None)
    }

    async fn save_progress(&self, _progress: &WizardProgress) -> ServiceResult {
        Ok(())
    }

    async fn finalize(&self, _config: &ConfigTree) -> ServiceResult {
        Err("settings store not configured".into())
    }
}

// ── Scanner ─────────────────────────────────────────────────────────────────

/// A directory in a scanned folder tree.
///
/// `file_count` and `size_bytes` aggregate the node and all of its
/// descendants; the files living directly in the node are not reported
/// separately.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryTreeNode {
    #[serde(default)]
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub file_count: u64,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub children: Vec<DirectoryTreeNode>,
}

impl DirectoryTreeNode {
    pub fn new(path: impl Into<String>, file_count: u64, size_bytes: u64) -> Self {
        let path = path.into();
        let name = path
            .rsplit(['/', '\\'])
            .find(|s| !s.is_empty())
            .unwrap_or_default()
            .to_string();
        Self {
            name,
            path,
            file_count,
            size_bytes,
            children: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_children(mut self, children: Vec<DirectoryTreeNode>) -> Self {
        self.children = children;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderValidation {
    pub valid: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub tree: Option<DirectoryTreeNode>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanRequest {
    pub folder_path: String,
    #[serde(default = "default_true")]
    pub recursive: bool,
    #[serde(default)]
    pub excluded_dirs: Vec<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FileTypeInfo {
    pub extension: String,
    #[serde(default)]
    pub display_name: String,
    pub count: u64,
    pub size_mb: f64,
    pub supported: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FolderScanResult {
    pub supported_types: Vec<FileTypeInfo>,
    pub unsupported_types: Vec<FileTypeInfo>,
    pub total_files: u64,
    pub total_size_mb: f64,
}

#[async_trait]
pub trait ScannerService: Send + Sync {
    async fn validate_folder(&self, path: &str, recursive: bool) -> ServiceResult<FolderValidation>;
    async fn scan_folder(&self, request: &ScanRequest) -> ServiceResult<FolderScanResult>;
}

pub struct NoopScannerService;

#[async_trait]
impl ScannerService for NoopScannerService {
    async fn validate_folder(&self, _path: &str, _recursive: bool) -> ServiceResult<FolderValidation> {
        Ok(FolderValidation {
            valid: false,
            error: Some("scanner service not configured".into()),
            tree: None,
        })
    }

    async fn scan_folder(&self, _request: &ScanRequest) -> ServiceResult<FolderScanResult> {
        Err("scanner service not configured".into())
    }
}

// ── Services bundle ─────────────────────────────────────────────────────────

/// Bundle of the collaborator trait objects handed to the wizard front end.
pub struct Services {
    pub progress: Arc<dyn ProgressService>,
    pub scanner: Arc<dyn ScannerService>,
}

impl Default for Services {
    fn default() -> Self {
        Self {
            progress: Arc::new(NoopProgressService),
            scanner: Arc::new(NoopScannerService),
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────────────
