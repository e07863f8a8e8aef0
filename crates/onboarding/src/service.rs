//! Live wizard controller: step navigation and config patches, written
//! through to a [`ProgressService`] one action at a time.
//!
//! In-memory state only changes after the store accepted the new progress
//! record, so a failed save never leaves the caller on a step whose config
//! was not persisted.

use std::sync::Arc;

use {
    ragkit_config::{
        ConfigTree, Patch, ProfileAnswers, ProfileSeed, SearchType, default_record, schema,
    },
    ragkit_service_traits::{
        DirectoryTreeNode, FolderScanResult, NoopScannerService, ProgressService, ScanRequest,
        ScannerService, Services, WizardProgress,
    },
    serde_json::Value,
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    state::{WizardStep, next_step, prev_step},
    tree_stats::{EffectiveStats, ExclusionSet, effective_stats},
};

const EXCLUDED_DIRS_KEY: &str = "excluded_dirs";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Forward,
    Backward,
}

/// What the scanner found in the selected source folder.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceScan {
    pub tree: DirectoryTreeNode,
    /// Totals of `tree` under the stored exclusions.
    pub stats: EffectiveStats,
    pub file_types: FolderScanResult,
}

/// Drives one wizard session against a progress store.
///
/// Every mutating call takes `&mut self`, so transitions are serialized by
/// the borrow checker; each one costs exactly one store round trip.
pub struct WizardController {
    store: Arc<dyn ProgressService>,
    scanner: Arc<dyn ScannerService>,
    progress: WizardProgress,
    completed: bool,
}

impl WizardController {
    /// Like [`load`](Self::load), also keeping the bundle's scanner for
    /// [`scan_source`](Self::scan_source).
    pub async fn with_services(services: Services) -> Result<Self> {
        let mut wizard = Self::load(services.progress).await?;
        wizard.scanner = services.scanner;
        Ok(wizard)
    }

    /// Resume the saved session, or start at step 0 with an empty config.
    pub async fn load(store: Arc<dyn ProgressService>) -> Result<Self> {
        let mut progress = match store.load_progress().await? {
            Some(progress) => {
                debug!(step = progress.step, "resuming wizard progress");
                progress
            },
            None => {
                info!("no saved wizard progress, starting fresh");
                WizardProgress::default()
            },
        };
        if progress.step > WizardStep::LAST {
            warn!(
                step = progress.step,
                last = WizardStep::LAST,
                "saved step out of range, clamping"
            );
            progress.step = WizardStep::LAST;
        }
        // Defaults are derived from the stored record, so filling them in
        // memory reproduces the same tree on every resume.
        progress.config = with_step_defaults(&progress.config, progress.step);
        Ok(Self {
            store,
            scanner: Arc::new(NoopScannerService),
            progress,
            completed: false,
        })
    }

    pub fn step(&self) -> usize {
        self.progress.step
    }

    pub fn current_step(&self) -> WizardStep {
        WizardStep::from_index(self.progress.step).unwrap_or(WizardStep::Generation)
    }

    pub fn config(&self) -> &ConfigTree {
        &self.progress.config
    }

    pub fn progress(&self) -> &WizardProgress {
        &self.progress
    }

    pub fn search_type(&self) -> SearchType {
        SearchType::from_tree(&self.progress.config)
    }

    pub fn is_completed(&self) -> bool {
        self.completed
    }

    /// Shallow-merge `patch` into the branch at `path` and save.
    pub async fn update_config(&mut self, path: &str, patch: &Patch) -> Result<()> {
        self.ensure_active()?;
        let config = self.progress.config.apply(path, patch);
        self.persist(self.progress.step, config).await?;
        debug!(branch = path, keys = patch.len(), "config patched");
        Ok(())
    }

    /// Move to the next reachable step. Returns the new step index.
    pub async fn advance(&mut self) -> Result<usize> {
        self.transition(Direction::Forward).await
    }

    /// Move to the previous reachable step. Returns the new step index.
    pub async fn retreat(&mut self) -> Result<usize> {
        self.transition(Direction::Backward).await
    }

    /// Seed the config from a profile and calibration answers in one save.
    pub async fn apply_profile(&mut self, answers: &ProfileAnswers) -> Result<ProfileSeed> {
        self.ensure_active()?;
        let seed = ProfileSeed::analyze(answers);
        let config = seed.apply_to(&self.progress.config);
        self.persist(self.progress.step, config).await?;
        info!(profile = %answers.profile, branches = seed.patches.len(), "profile applied");
        Ok(seed)
    }

    /// Point ingestion at a new folder. Exclusions from the previous folder
    /// no longer apply and are cleared.
    pub async fn select_source(&mut self, path: &str) -> Result<()> {
        let mut patch = Patch::new();
        patch.insert("path".into(), Value::String(path.to_string()));
        patch.insert(EXCLUDED_DIRS_KEY.into(), Value::Array(Vec::new()));
        self.update_config(schema::INGESTION_SOURCE, &patch).await
    }

    /// Exclude `path` from ingestion, or include it again if it already was.
    /// Returns `true` when the path is now excluded.
    pub async fn toggle_excluded_dir(&mut self, path: &str) -> Result<bool> {
        let mut excluded = self.excluded_dirs();
        let now_excluded = excluded.toggle(path);
        let mut patch = Patch::new();
        patch.insert(
            EXCLUDED_DIRS_KEY.into(),
            Value::Array(excluded.iter().map(|p| Value::String(p.to_string())).collect()),
        );
        self.update_config(schema::INGESTION_SOURCE, &patch).await?;
        Ok(now_excluded)
    }

    /// Directories currently excluded in `ingestion.source`.
    pub fn excluded_dirs(&self) -> ExclusionSet {
        let path = format!("{}.{EXCLUDED_DIRS_KEY}", schema::INGESTION_SOURCE);
        match self.progress.config.value(&path) {
            Some(Value::Array(items)) => items.iter().filter_map(Value::as_str).collect(),
            _ => ExclusionSet::new(),
        }
    }

    /// Effective totals of a scanned tree under the stored exclusions.
    pub fn source_stats(&self, tree: &DirectoryTreeNode) -> EffectiveStats {
        effective_stats(tree, &self.excluded_dirs())
    }

    /// Scan the folder stored in `ingestion.source.path` and total it under
    /// the stored exclusions. Read-only; nothing is saved.
    pub async fn scan_source(&self) -> Result<SourceScan> {
        let config = &self.progress.config;
        let path = config
            .str_at(&format!("{}.path", schema::INGESTION_SOURCE))
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .ok_or_else(|| Error::message("no source folder selected"))?;
        let recursive = config
            .value(&format!("{}.recursive", schema::INGESTION_SOURCE))
            .and_then(Value::as_bool)
            .unwrap_or(true);

        let validation = self.scanner.validate_folder(path, recursive).await?;
        if !validation.valid {
            let reason = validation.error.unwrap_or_else(|| "folder rejected".into());
            return Err(Error::message(format!("{path}: {reason}")));
        }
        let tree = validation
            .tree
            .ok_or_else(|| Error::message(format!("{path}: scanner returned no folder tree")))?;

        let excluded = self.excluded_dirs();
        let request = ScanRequest {
            folder_path: path.to_string(),
            recursive,
            excluded_dirs: excluded.iter().map(String::from).collect(),
        };
        let file_types = self.scanner.scan_folder(&request).await?;
        let stats = effective_stats(&tree, &excluded);
        debug!(path, files = stats.files, excluded = excluded.len(), "source folder scanned");
        Ok(SourceScan {
            tree,
            stats,
            file_types,
        })
    }

    /// Hand the final config to the settings store.
    ///
    /// On failure nothing changes and the call can be retried from the same
    /// step.
    pub async fn complete(&mut self) -> Result<ConfigTree> {
        self.ensure_active()?;
        let config = self.progress.config.clone();
        if let Err(e) = self.store.finalize(&config).await {
            warn!(step = self.progress.step, error = %e, "failed to finalize wizard config");
            return Err(e.into());
        }
        self.completed = true;
        info!(step = self.progress.step, "wizard completed");
        Ok(config)
    }

    async fn transition(&mut self, direction: Direction) -> Result<usize> {
        self.ensure_active()?;
        let search_type = self.search_type();
        let from = self.progress.step;
        let to = match direction {
            Direction::Forward => next_step(from, search_type),
            Direction::Backward => prev_step(from, search_type),
        };
        if to == from {
            debug!(step = from, ?direction, "already at the boundary");
            return Ok(from);
        }

        let config = with_step_defaults(&self.progress.config, to);
        self.persist(to, config).await?;
        info!(from, to, %search_type, "wizard step changed");
        Ok(to)
    }

    async fn persist(&mut self, step: usize, config: ConfigTree) -> Result<()> {
        let next = WizardProgress::new(step, config);
        if let Err(e) = self.store.save_progress(&next).await {
            warn!(step, error = %e, "failed to save wizard progress");
            return Err(e.into());
        }
        self.progress = next;
        Ok(())
    }

    fn ensure_active(&self) -> Result<()> {
        if self.completed {
            return Err(Error::message("wizard session already completed"));
        }
        Ok(())
    }
}

/// Create every branch owned by `step` that the config does not hold yet.
fn with_step_defaults(config: &ConfigTree, step: usize) -> ConfigTree {
    let Some(step) = WizardStep::from_index(step) else {
        return config.clone();
    };
    step.owned_branches()
        .iter()
        .fold(config.clone(), |acc, path| match default_record(path) {
            Some(defaults) => acc.with_default(path, &defaults),
            None => acc,
        })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        ragkit_config::{Calibration, Profile},
        ragkit_service_traits::{FileTypeInfo, FolderValidation, ServiceResult},
        serde_json::json,
        std::sync::{
            Mutex,
            atomic::{AtomicBool, AtomicUsize, Ordering},
        },
    };

    /// In-memory store that counts round trips and fails on demand.
    #[derive(Default)]
    struct ScriptedStore {
        saved: Mutex<Option<WizardProgress>>,
        finalized: Mutex<Option<ConfigTree>>,
        saves: AtomicUsize,
        fail_saves: AtomicBool,
        fail_finalize: AtomicBool,
    }

    impl ScriptedStore {
        fn with_progress(step: usize, config: Value) -> Arc<Self> {
            let config: ConfigTree = serde_json::from_value(config).unwrap();
            let store = Self::default();
            *store.saved.lock().unwrap() = Some(WizardProgress::new(step, config));
            Arc::new(store)
        }

        fn saved(&self) -> WizardProgress {
            self.saved.lock().unwrap().clone().unwrap()
        }

        fn saves(&self) -> usize {
            self.saves.load(Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl ProgressService for ScriptedStore {
        async fn load_progress(&self) -> ServiceResult<Option<WizardProgress>> {
            Ok(self.saved.lock().unwrap().clone())
        }

        async fn save_progress(&self, progress: &WizardProgress) -> ServiceResult {
            self.saves.fetch_add(1, Ordering::SeqCst);
            if self.fail_saves.load(Ordering::SeqCst) {
                return Err("network unreachable".into());
            }
            *self.saved.lock().unwrap() = Some(progress.clone());
            Ok(())
        }

        async fn finalize(&self, config: &ConfigTree) -> ServiceResult {
            if self.fail_finalize.load(Ordering::SeqCst) {
                return Err("settings store rejected config".into());
            }
            *self.finalized.lock().unwrap() = Some(config.clone());
            Ok(())
        }
    }

    fn patch(value: Value) -> Patch {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn starts_fresh_without_saved_progress() {
        let store = Arc::new(ScriptedStore::default());
        let wizard = WizardController::load(store.clone()).await.unwrap();
        assert_eq!(wizard.step(), 0);
        assert_eq!(wizard.current_step(), WizardStep::Welcome);
        assert!(wizard.config().is_empty());
        assert_eq!(wizard.search_type(), SearchType::Hybrid);
        assert_eq!(store.saves(), 0);
    }

    #[tokio::test]
    async fn resumes_and_clamps_saved_step() {
        let store = ScriptedStore::with_progress(42, json!({}));
        let wizard = WizardController::load(store).await.unwrap();
        assert_eq!(wizard.step(), WizardStep::LAST);
        // the generation step's branches are filled in on resume
        assert!(wizard.config().has_branch("llm"));
        assert!(wizard.config().has_branch("agents"));
    }

    #[tokio::test]
    async fn update_writes_through_and_keeps_siblings() {
        let store = ScriptedStore::with_progress(
            6,
            json!({ "chunking": { "chunk_size": 512 }, "embedding": { "model": "e5" } }),
        );
        let mut wizard = WizardController::load(store.clone()).await.unwrap();
        let before = wizard.config().clone();

        wizard
            .update_config("chunking", &patch(json!({ "chunk_size": 1024 })))
            .await
            .unwrap();

        assert_eq!(store.saves(), 1);
        assert_eq!(store.saved().step, 6);
        assert_eq!(store.saved().config, *wizard.config());
        assert_eq!(wizard.config().value("chunking.chunk_size"), Some(&json!(1024)));
        assert!(wizard.config().same_branch(&before, "embedding"));
    }

    #[tokio::test]
    async fn advance_routes_by_search_type_and_fills_defaults() {
        let store = ScriptedStore::with_progress(9, json!({ "retrieval": { "search_type": "semantic" } }));
        let mut wizard = WizardController::load(store.clone()).await.unwrap();

        assert_eq!(wizard.advance().await.unwrap(), 10);
        assert_eq!(wizard.current_step(), WizardStep::Semantic);
        assert_eq!(wizard.config().value("retrieval.semantic.top_k"), Some(&json!(10)));
        assert_eq!(store.saved().step, 10);
        assert!(store.saved().config.has_branch("retrieval.semantic"));

        assert_eq!(wizard.advance().await.unwrap(), 14);
        assert!(wizard.config().has_branch("rerank"));
        assert!(!wizard.config().has_branch("retrieval.lexical"));

        assert_eq!(wizard.retreat().await.unwrap(), 10);
        assert_eq!(store.saves(), 3);
    }

    #[tokio::test]
    async fn changing_strategy_reroutes_next_transition() {
        let store = ScriptedStore::with_progress(10, json!({ "retrieval": { "search_type": "hybrid" } }));
        let mut wizard = WizardController::load(store).await.unwrap();

        wizard
            .update_config("retrieval", &patch(json!({ "search_type": "lexical" })))
            .await
            .unwrap();
        assert_eq!(wizard.search_type(), SearchType::Lexical);
        assert_eq!(wizard.advance().await.unwrap(), 11);
        assert_eq!(wizard.advance().await.unwrap(), 14);
        assert_eq!(wizard.retreat().await.unwrap(), 11);
        assert_eq!(wizard.retreat().await.unwrap(), 9);
    }

    #[tokio::test]
    async fn defaults_never_overwrite_existing_branch() {
        let store = ScriptedStore::with_progress(5, json!({ "chunking": { "chunk_size": 2048 } }));
        let mut wizard = WizardController::load(store).await.unwrap();
        wizard.advance().await.unwrap();
        assert_eq!(wizard.current_step(), WizardStep::Chunking);
        assert_eq!(wizard.config().value("chunking.chunk_size"), Some(&json!(2048)));
        assert!(wizard.config().value("chunking.strategy").is_none());
    }

    #[tokio::test]
    async fn failed_save_leaves_state_untouched() {
        let store = ScriptedStore::with_progress(3, json!({ "general": { "profile": "general" } }));
        let mut wizard = WizardController::load(store.clone()).await.unwrap();
        let step = wizard.step();
        let config = wizard.config().clone();

        store.fail_saves.store(true, Ordering::SeqCst);
        let err = wizard.advance().await.unwrap_err();
        assert!(matches!(err, Error::Service(_)));
        assert_eq!(wizard.step(), step);
        assert!(wizard.config().ptr_eq(&config));

        assert!(
            wizard
                .update_config("chunking", &patch(json!({ "chunk_size": 1 })))
                .await
                .is_err()
        );
        assert!(wizard.config().ptr_eq(&config));
        assert_eq!(store.saved().step, 3);

        store.fail_saves.store(false, Ordering::SeqCst);
        assert_eq!(wizard.advance().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn boundaries_are_noops_without_round_trip() {
        let store = Arc::new(ScriptedStore::default());
        let mut wizard = WizardController::load(store.clone()).await.unwrap();
        assert_eq!(wizard.retreat().await.unwrap(), 0);
        assert_eq!(store.saves(), 0);

        let store = ScriptedStore::with_progress(WizardStep::LAST, json!({}));
        let mut wizard = WizardController::load(store.clone()).await.unwrap();
        assert_eq!(wizard.advance().await.unwrap(), WizardStep::LAST);
        assert_eq!(store.saves(), 0);
    }

    #[tokio::test]
    async fn complete_hands_config_to_finalize() {
        let store = ScriptedStore::with_progress(15, json!({ "llm": { "model": "local" } }));
        let mut wizard = WizardController::load(store.clone()).await.unwrap();

        store.fail_finalize.store(true, Ordering::SeqCst);
        assert!(wizard.complete().await.is_err());
        assert!(!wizard.is_completed());
        assert_eq!(wizard.step(), 15);
        assert!(store.finalized.lock().unwrap().is_none());

        store.fail_finalize.store(false, Ordering::SeqCst);
        let config = wizard.complete().await.unwrap();
        assert!(wizard.is_completed());
        assert_eq!(config.str_at("llm.model"), Some("local"));
        assert_eq!(store.finalized.lock().unwrap().clone(), Some(config));
        // progress is left in place
        assert_eq!(store.saved().step, 15);

        assert!(wizard.advance().await.is_err());
        assert!(wizard.complete().await.is_err());
    }

    #[tokio::test]
    async fn exclusions_drive_source_stats() {
        let store = ScriptedStore::with_progress(4, json!({}));
        let mut wizard = WizardController::load(store.clone()).await.unwrap();
        wizard.select_source("/docs").await.unwrap();
        assert!(wizard.toggle_excluded_dir("/docs/archive").await.unwrap());

        let tree = DirectoryTreeNode::new("/docs", 10, 1000).with_children(vec![
            DirectoryTreeNode::new("/docs/archive", 4, 400),
            DirectoryTreeNode::new("/docs/specs", 1, 100),
        ]);
        let stats = wizard.source_stats(&tree);
        assert_eq!(stats.files, 6);
        assert_eq!(stats.size_bytes, 600);
        assert_eq!(
            store.saved().config.value("ingestion.source.excluded_dirs"),
            Some(&json!(["/docs/archive"]))
        );

        assert!(!wizard.toggle_excluded_dir("/docs/archive").await.unwrap());
        assert_eq!(wizard.source_stats(&tree).files, 10);

        wizard.toggle_excluded_dir("/docs/specs").await.unwrap();
        wizard.select_source("/other").await.unwrap();
        assert!(wizard.excluded_dirs().is_empty());
        assert_eq!(wizard.config().str_at("ingestion.source.path"), Some("/other"));
        // defaults created on resume survive the patches
        assert_eq!(wizard.config().value("ingestion.source.recursive"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn profile_is_applied_in_one_save() {
        let store = ScriptedStore::with_progress(3, json!({}));
        let mut wizard = WizardController::load(store.clone()).await.unwrap();
        let answers = ProfileAnswers {
            profile: Profile::LegalCompliance,
            calibration: Calibration {
                long_documents: true,
                ..Calibration::default()
            },
        };
        let seed = wizard.apply_profile(&answers).await.unwrap();
        assert_eq!(store.saves(), 1);
        assert_eq!(seed.summary["Profile"], "Legal / Compliance");
        assert_eq!(wizard.config().value("chunking.chunk_size"), Some(&json!(1536)));
        assert_eq!(wizard.config().str_at("general.profile"), Some("legal_compliance"));
        assert_eq!(
            wizard.config().value("ingestion.parsing.ocr_language"),
            Some(&json!(["fra"]))
        );
        // general defaults from the profile step are kept
        assert_eq!(wizard.config().str_at("general.expertise_level"), Some("simple"));
    }

    /// Scanner returning a fixed tree and recording the last scan request.
    #[derive(Default)]
    struct ScriptedScanner {
        tree: Option<DirectoryTreeNode>,
        requests: Mutex<Vec<ScanRequest>>,
    }

    #[async_trait::async_trait]
    impl ScannerService for ScriptedScanner {
        async fn validate_folder(
            &self,
            _path: &str,
            _recursive: bool,
        ) -> ServiceResult<FolderValidation> {
            Ok(FolderValidation {
                valid: self.tree.is_some(),
                error: self.tree.is_none().then(|| "Folder does not exist.".to_string()),
                tree: self.tree.clone(),
            })
        }

        async fn scan_folder(&self, request: &ScanRequest) -> ServiceResult<FolderScanResult> {
            self.requests.lock().unwrap().push(request.clone());
            Ok(FolderScanResult {
                supported_types: vec![FileTypeInfo {
                    extension: "md".into(),
                    display_name: "Markdown".into(),
                    count: 6,
                    size_mb: 0.0,
                    supported: true,
                }],
                unsupported_types: Vec::new(),
                total_files: 6,
                total_size_mb: 0.0,
            })
        }
    }

    fn docs_tree() -> DirectoryTreeNode {
        DirectoryTreeNode::new("/docs", 10, 1000)
            .with_children(vec![DirectoryTreeNode::new("/docs/archive", 4, 400)])
    }

    #[tokio::test]
    async fn scan_source_totals_under_stored_exclusions() {
        let store = Arc::new(ScriptedStore::default());
        let scanner = Arc::new(ScriptedScanner {
            tree: Some(docs_tree()),
            ..Default::default()
        });
        let mut wizard = WizardController::with_services(Services {
            progress: store.clone(),
            scanner: scanner.clone(),
        })
        .await
        .unwrap();
        wizard.select_source("/docs").await.unwrap();
        wizard.toggle_excluded_dir("/docs/archive").await.unwrap();
        let saves = store.saves();

        let scan = wizard.scan_source().await.unwrap();
        assert_eq!(scan.stats, EffectiveStats {
            files: 6,
            size_bytes: 600
        });
        assert_eq!(scan.tree, docs_tree());
        assert_eq!(scan.file_types.total_files, 6);

        let requests = scanner.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].folder_path, "/docs");
        assert!(requests[0].recursive);
        assert_eq!(requests[0].excluded_dirs, vec!["/docs/archive".to_string()]);
        // scanning is read-only
        assert_eq!(store.saves(), saves);
    }

    #[tokio::test]
    async fn scan_source_needs_a_valid_folder() {
        let store = Arc::new(ScriptedStore::default());
        let mut wizard = WizardController::with_services(Services {
            progress: store,
            scanner: Arc::new(ScriptedScanner::default()),
        })
        .await
        .unwrap();
        let err = wizard.scan_source().await.unwrap_err();
        assert_eq!(err.to_string(), "no source folder selected");

        wizard.select_source("/missing").await.unwrap();
        let err = wizard.scan_source().await.unwrap_err();
        assert_eq!(err.to_string(), "/missing: Folder does not exist.");
    }

    #[tokio::test]
    async fn plain_load_has_no_scanner() {
        let store =
            ScriptedStore::with_progress(4, json!({ "ingestion": { "source": { "path": "/docs" } } }));
        let wizard = WizardController::load(store).await.unwrap();
        assert!(wizard.scan_source().await.is_err());
    }
}
