//! The ordered, cancellable sequence of destructive steps that removes one
//! library from the host.
//!
//! Steps run strictly in [`Step::ALL`] order. The cancellation token is read
//! before every step; once it is set the run ends `Cancelled` and nothing that
//! already happened is rolled back. Descriptor, cache and token cleanup are
//! best-effort: their failures become warnings. Every other step is
//! load-bearing and ends the run `Failed` at the point it fails.

use crate::fileops::{FileOps, FsFileOps};
use crate::history::HistoryLogger;
use crate::inventory::{InventorySnapshot, RemovableUnit};
use crate::locations::Locations;
use crate::metadata::{MetadataResolver, ProductInfo};
use crate::progress::ProgressReporter;
use crate::safety::SafetyChecker;
use crate::store::{display_path, Access, ConfigStore};
use crate::utils::sanitize_file_name;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    ResolveMetadata,
    DeleteDescriptor,
    DeleteCacheFiles,
    BackupAndDeleteSharedDatabase,
    DeleteAuthTokens,
    DeleteContentDir,
    BackupConfigEntry,
    DeleteConfigEntry,
}

impl Step {
    pub const ALL: [Step; 8] = [
        Step::ResolveMetadata,
        Step::DeleteDescriptor,
        Step::DeleteCacheFiles,
        Step::BackupAndDeleteSharedDatabase,
        Step::DeleteAuthTokens,
        Step::DeleteContentDir,
        Step::BackupConfigEntry,
        Step::DeleteConfigEntry,
    ];

    pub const COUNT: usize = Self::ALL.len();

    /// One-based position in the run.
    pub fn index(&self) -> usize {
        Self::ALL.iter().position(|s| s == self).unwrap_or(0) + 1
    }

    pub fn label(&self) -> &'static str {
        match self {
            Step::ResolveMetadata => "Resolving product id",
            Step::DeleteDescriptor => "Deleting descriptor",
            Step::DeleteCacheFiles => "Deleting cache files",
            Step::BackupAndDeleteSharedDatabase => "Backing up and deleting shared database",
            Step::DeleteAuthTokens => "Deleting auth tokens",
            Step::DeleteContentDir => "Deleting content directory",
            Step::BackupConfigEntry => "Backing up registry entry",
            Step::DeleteConfigEntry => "Deleting registry entry",
        }
    }

    pub fn is_best_effort(&self) -> bool {
        matches!(
            self,
            Step::DeleteDescriptor | Step::DeleteCacheFiles | Step::DeleteAuthTokens
        )
    }

    /// Steps that change the host when applied.
    pub fn is_destructive(&self) -> bool {
        !matches!(self, Step::ResolveMetadata | Step::BackupConfigEntry)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemovalOptions {
    pub backup_config_entry: bool,
    pub delete_content_dir: bool,
}

impl From<&crate::config::RemovalConfig> for RemovalOptions {
    fn from(config: &crate::config::RemovalConfig) -> Self {
        Self {
            backup_config_entry: config.backup_config_entry,
            delete_content_dir: config.delete_content_dir,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Succeeded,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct RemovalOutcome {
    pub unit: String,
    pub status: OutcomeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<Step>,
    pub completed_steps: Vec<Step>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_file: Option<PathBuf>,
}

impl RemovalOutcome {
    fn new(unit: &str) -> Self {
        Self {
            unit: unit.to_string(),
            status: OutcomeStatus::Succeeded,
            reason: None,
            failed_step: None,
            completed_steps: Vec::new(),
            warnings: Vec::new(),
            backup_file: None,
        }
    }

    pub fn succeeded(&self) -> bool {
        self.status == OutcomeStatus::Succeeded
    }

    pub fn cancelled(&self) -> bool {
        self.status == OutcomeStatus::Cancelled
    }

    /// The run stopped early after already changing the host.
    pub fn is_partial(&self) -> bool {
        !self.succeeded() && self.completed_steps.iter().any(Step::is_destructive)
    }
}

/// Cooperative cancellation flag shared between the interactive thread and
/// the worker.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<Mutex<bool>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        if let Ok(mut flag) = self.flag.lock() {
            *flag = true;
        }
    }

    pub fn reset(&self) {
        if let Ok(mut flag) = self.flag.lock() {
            *flag = false;
        }
    }

    /// A poisoned flag reads as cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.flag.lock().map(|flag| *flag).unwrap_or(true)
    }
}

/// Everything a removal needs from the host, shareable with the worker.
#[derive(Clone)]
pub struct RemovalContext {
    pub store: Arc<dyn ConfigStore>,
    pub file_ops: Arc<dyn FileOps>,
    pub locations: Locations,
    pub history: Arc<HistoryLogger>,
}

impl RemovalContext {
    pub fn new(
        store: Arc<dyn ConfigStore>,
        locations: Locations,
        history: Arc<HistoryLogger>,
    ) -> Self {
        Self {
            store,
            file_ops: Arc::new(FsFileOps::new(Arc::clone(&history))),
            locations,
            history,
        }
    }

    pub fn with_file_ops(mut self, file_ops: Arc<dyn FileOps>) -> Self {
        self.file_ops = file_ops;
        self
    }
}

enum Applied {
    Yes,
    Skipped,
}

type StepResult = Result<Applied, String>;

pub struct RemovalPipeline<'a> {
    ctx: &'a RemovalContext,
    resolver: MetadataResolver,
    safety: SafetyChecker,
    token: &'a CancellationToken,
    progress: &'a mut ProgressReporter,
}

impl<'a> RemovalPipeline<'a> {
    pub fn new(
        ctx: &'a RemovalContext,
        token: &'a CancellationToken,
        progress: &'a mut ProgressReporter,
    ) -> Self {
        Self {
            resolver: MetadataResolver::new(&ctx.locations),
            safety: SafetyChecker::new(),
            ctx,
            token,
            progress,
        }
    }

    pub fn run(
        &mut self,
        unit: &RemovableUnit,
        options: &RemovalOptions,
        snapshot: &InventorySnapshot,
    ) -> RemovalOutcome {
        let ctx = self.ctx;
        let mut outcome = RemovalOutcome::new(&unit.name);
        let mut product: Option<ProductInfo> = None;

        if !snapshot.contains(&unit.name) {
            outcome.status = OutcomeStatus::Failed;
            outcome.reason = Some(format!(
                "{} is not in the current inventory; rescan before removing",
                unit.name
            ));
            log::warn!("[{}] refused: not in inventory snapshot", unit.name);
            return outcome;
        }

        log::info!("[{}] removal started ({:?})", unit.name, options);
        self.ctx.history.record("REMOVE_BEGIN", unit.name.as_str());

        for step in Step::ALL {
            if self.token.is_cancelled() {
                log::info!("[{}] cancelled before: {}", unit.name, step);
                self.ctx.history.record("REMOVE_CANCELLED", unit.name.as_str());
                outcome.status = OutcomeStatus::Cancelled;
                return outcome;
            }

            self.progress
                .step(&unit.name, step.index(), Step::COUNT, step.label());

            let result = match step {
                Step::ResolveMetadata => self.resolve_metadata(unit, &mut product),
                Step::DeleteDescriptor => self.delete_descriptor(unit, &mut outcome),
                Step::DeleteCacheFiles => self.delete_matching(
                    unit,
                    step,
                    &ctx.locations.cache_dir,
                    product.as_ref(),
                    &mut outcome,
                ),
                Step::BackupAndDeleteSharedDatabase => self.backup_and_delete_database(),
                Step::DeleteAuthTokens => self.delete_matching(
                    unit,
                    step,
                    &ctx.locations.token_dir,
                    product.as_ref(),
                    &mut outcome,
                ),
                Step::DeleteContentDir => self.delete_content_dir(unit, options, &mut outcome),
                Step::BackupConfigEntry => self.backup_config_entry(unit, options, &mut outcome),
                Step::DeleteConfigEntry => self.delete_config_entry(unit, &mut outcome),
            };

            match result {
                Ok(Applied::Yes) => outcome.completed_steps.push(step),
                Ok(Applied::Skipped) => {}
                Err(reason) if step.is_best_effort() => {
                    log::warn!("[{}] {}: {}", unit.name, step, reason);
                    outcome.warnings.push(reason);
                    outcome.completed_steps.push(step);
                }
                Err(reason) => {
                    log::error!("[{}] {} failed: {}", unit.name, step, reason);
                    self.ctx
                        .history
                        .record("REMOVE_FAILED", format!("{} ({})", unit.name, reason));
                    outcome.status = OutcomeStatus::Failed;
                    outcome.failed_step = Some(step);
                    outcome.reason = Some(reason);
                    return outcome;
                }
            }
        }

        log::info!("[{}] removal finished", unit.name);
        self.ctx.history.record("REMOVE_DONE", unit.name.as_str());
        outcome
    }

    fn resolve_metadata(
        &self,
        unit: &RemovableUnit,
        product: &mut Option<ProductInfo>,
    ) -> StepResult {
        let info = self.resolver.resolve(&unit.name).map_err(|e| e.to_string())?;
        log::info!("[{}] product id {}", unit.name, info.product_id);
        *product = Some(info);
        Ok(Applied::Yes)
    }

    fn delete_descriptor(&self, unit: &RemovableUnit, outcome: &mut RemovalOutcome) -> StepResult {
        let Some(descriptor) = self.ctx.locations.descriptor_file(&unit.name) else {
            outcome
                .warnings
                .push("unit name is not a valid descriptor file name; kept".to_string());
            return Ok(Applied::Skipped);
        };

        if self.resolver.is_catalog(&descriptor) {
            outcome
                .warnings
                .push("descriptor name collides with the shared catalog; kept".to_string());
            return Ok(Applied::Skipped);
        }
        if !descriptor.exists() {
            log::debug!("[{}] no per-unit descriptor", unit.name);
            return Ok(Applied::Skipped);
        }

        if self.ctx.file_ops.delete_item(&descriptor) {
            Ok(Applied::Yes)
        } else {
            Err(format!("could not delete descriptor {}", descriptor.display()))
        }
    }

    /// Deletes every file in `dir` whose name carries the product id.
    fn delete_matching(
        &mut self,
        unit: &RemovableUnit,
        step: Step,
        dir: &Path,
        product: Option<&ProductInfo>,
        outcome: &mut RemovalOutcome,
    ) -> StepResult {
        let Some(product) = product else {
            return Err("product id unavailable".to_string());
        };

        let matches = match matching_files(dir, &product.product_id) {
            Ok(matches) => matches,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("[{}] {} does not exist", unit.name, dir.display());
                return Ok(Applied::Skipped);
            }
            Err(e) => return Err(format!("cannot list {}: {}", dir.display(), e)),
        };

        if matches.is_empty() {
            log::debug!("[{}] nothing in {} for {}", unit.name, dir.display(), product.product_id);
            return Ok(Applied::Yes);
        }

        let total = matches.len() as u64;
        let mut failed = 0usize;
        for (i, path) in matches.iter().enumerate() {
            self.progress.tick(
                &unit.name,
                step.index(),
                Step::COUNT,
                i as u64 + 1,
                total,
                || format!("{} ({}/{})", step.label(), i + 1, total),
            );
            if !self.ctx.file_ops.delete_item(path) {
                failed += 1;
            }
        }

        if failed > 0 {
            outcome.warnings.push(format!(
                "{} of {} files in {} could not be deleted",
                failed,
                total,
                dir.display()
            ));
        }
        Ok(Applied::Yes)
    }

    fn backup_and_delete_database(&self) -> StepResult {
        let database = &self.ctx.locations.database_file;
        if !database.exists() {
            log::debug!("no shared database at {}", database.display());
            return Ok(Applied::Skipped);
        }

        let backup = self.ctx.locations.database_backup_file();
        if !self.ctx.file_ops.delete_item(&backup) {
            return Err(format!("could not replace old backup {}", backup.display()));
        }
        if !self.ctx.file_ops.copy_item(database, &backup) {
            return Err(format!("could not back up {}", database.display()));
        }
        if !self.ctx.file_ops.delete_item(database) {
            return Err(format!("could not delete {}", database.display()));
        }
        Ok(Applied::Yes)
    }

    fn delete_content_dir(
        &self,
        unit: &RemovableUnit,
        options: &RemovalOptions,
        outcome: &mut RemovalOutcome,
    ) -> StepResult {
        if !options.delete_content_dir {
            return Ok(Applied::Skipped);
        }
        if !unit.has_content_dir() {
            outcome
                .warnings
                .push("no content directory recorded; nothing to delete".to_string());
            return Ok(Applied::Skipped);
        }
        if !self.safety.is_safe_to_delete(&unit.content_dir) {
            return Err(format!(
                "refusing to delete protected path {}",
                unit.content_dir.display()
            ));
        }

        if self.ctx.file_ops.delete_item(&unit.content_dir) {
            Ok(Applied::Yes)
        } else {
            Err(format!("could not delete {}", unit.content_dir.display()))
        }
    }

    fn backup_config_entry(
        &self,
        unit: &RemovableUnit,
        options: &RemovalOptions,
        outcome: &mut RemovalOutcome,
    ) -> StepResult {
        if !options.backup_config_entry {
            return Ok(Applied::Skipped);
        }

        let backup_dir = &self.ctx.locations.backup_dir;
        fs::create_dir_all(backup_dir)
            .map_err(|e| format!("cannot create {}: {}", backup_dir.display(), e))?;

        let backup = backup_dir.join(format!(
            "{}.{}",
            sanitize_file_name(&unit.name),
            self.ctx.store.backup_extension()
        ));
        if !self.ctx.file_ops.delete_item(&backup) {
            return Err(format!("could not replace old backup {}", backup.display()));
        }

        let handle = self
            .ctx
            .store
            .open_subtree(unit.root, &unit.sub_key, Access::Read)
            .map_err(|e| e.to_string())?;
        self.ctx
            .store
            .export_subtree(&handle, &backup)
            .map_err(|e| e.to_string())?;

        log::info!("[{}] registry entry saved to {}", unit.name, backup.display());
        self.ctx.history.record(
            "EXPORT",
            format!("{} -> {}", handle.display_path(), backup.display()),
        );
        outcome.backup_file = Some(backup);
        Ok(Applied::Yes)
    }

    fn delete_config_entry(&self, unit: &RemovableUnit, outcome: &mut RemovalOutcome) -> StepResult {
        let key = display_path(unit.root, &unit.sub_key);
        match self.ctx.store.delete_subtree(unit.root, &unit.sub_key) {
            Ok(()) => {
                self.ctx.history.record("DELETE_KEY", key);
                Ok(Applied::Yes)
            }
            Err(e) if e.is_not_found() => {
                outcome
                    .warnings
                    .push(format!("registry entry {} was already gone", key));
                Ok(Applied::Skipped)
            }
            Err(e) => {
                self.ctx
                    .history
                    .record("DELETE_KEY_FAILED", format!("{} ({})", key, e));
                Err(e.to_string())
            }
        }
    }
}

/// Files directly inside `dir` whose name contains `product_id` as a whole
/// token, so `SNP4` does not match `K SNP42 a.cache`.
pub fn matching_files(dir: &Path, product_id: &str) -> std::io::Result<Vec<PathBuf>> {
    let mut matches = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if contains_token(&name, product_id) {
            matches.push(entry.path());
        }
    }
    matches.sort();
    Ok(matches)
}

fn contains_token(haystack: &str, token: &str) -> bool {
    if token.is_empty() {
        return false;
    }
    haystack.match_indices(token).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + token.len()..].chars().next();
        !before.is_some_and(|c| c.is_ascii_alphanumeric())
            && !after.is_some_and(|c| c.is_ascii_alphanumeric())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{StoreRoot, TreeStore};
    use crate::test_support::{CancelAfterDelete, Fixture, ObservingStore};
    use std::sync::mpsc::channel;

    fn run(
        fixture: &Fixture,
        ctx: &RemovalContext,
        options: RemovalOptions,
        token: &CancellationToken,
    ) -> RemovalOutcome {
        let mut progress = ProgressReporter::silent();
        let mut pipeline = RemovalPipeline::new(ctx, token, &mut progress);
        pipeline.run(&fixture.unit, &options, &fixture.snapshot())
    }

    const ALL_ON: RemovalOptions = RemovalOptions {
        backup_config_entry: true,
        delete_content_dir: true,
    };

    #[test]
    fn test_contains_token() {
        assert!(contains_token("K SNP42 a.cache", "SNP42"));
        assert!(contains_token("SNP42.xml", "SNP42"));
        assert!(!contains_token("K SNP421 a.cache", "SNP42"));
        assert!(!contains_token("K XSNP42 a.cache", "SNP42"));
        assert!(!contains_token("anything", ""));
    }

    #[test]
    fn test_factory_strings_end_to_end() {
        let fixture = Fixture::factory_strings();
        let store = Arc::new(ObservingStore::new(
            fixture.store.clone(),
            fixture.locations.backup_dir.join("Factory Strings.json"),
        ));
        let ctx = fixture.context(store.clone());
        let token = CancellationToken::new();

        let outcome = run(&fixture, &ctx, ALL_ON, &token);

        assert!(outcome.succeeded(), "{:?}", outcome);
        assert!(!fixture.cache("K SNP42 a.cache").exists());
        assert!(!fixture.cache("K SNP42 b.cache").exists());
        assert!(fixture.cache("K SNP99 c.cache").exists());
        assert!(!fixture.unit.content_dir.exists());
        assert!(!fixture.locations.descriptor_file("Factory Strings").unwrap().exists());
        assert!(fixture.locations.catalog_file().exists());
        assert!(!fixture.locations.database_file.exists());
        assert!(fixture.locations.database_backup_file().exists());
        assert!(!fixture.token("SNP42.xml").exists());
        assert!(fixture.token("SNP99.xml").exists());

        assert_eq!(store.backup_seen_at_delete(), Some(true));
        assert_eq!(
            outcome.backup_file,
            Some(fixture.locations.backup_dir.join("Factory Strings.json"))
        );
        assert!(fixture
            .store
            .open_subtree(StoreRoot::Primary, "Factory Strings", Access::Read)
            .is_err());
        assert_eq!(outcome.completed_steps, Step::ALL.to_vec());

        let actions = fixture.actions();
        let export = actions.iter().position(|a| a == "EXPORT").unwrap();
        let delete_key = actions.iter().position(|a| a == "DELETE_KEY").unwrap();
        assert!(export < delete_key);
    }

    #[test]
    fn test_keeps_content_dir_when_not_requested() {
        let fixture = Fixture::factory_strings();
        let ctx = fixture.context(fixture.store.clone());
        let options = RemovalOptions {
            backup_config_entry: false,
            delete_content_dir: false,
        };

        let outcome = run(&fixture, &ctx, options, &CancellationToken::new());

        assert!(outcome.succeeded());
        assert!(fixture.unit.content_dir.join("Instruments/Violins.nki").exists());
        assert!(!outcome.completed_steps.contains(&Step::DeleteContentDir));
        assert!(!outcome.completed_steps.contains(&Step::BackupConfigEntry));
        let content = fixture.unit.content_dir.display().to_string();
        assert!(fixture
            .history
            .session_entries()
            .iter()
            .all(|e| !e.target.starts_with(&content)));
        assert!(!fixture.locations.backup_dir.exists());
    }

    #[test]
    fn test_cancel_before_start_touches_nothing() {
        let fixture = Fixture::factory_strings();
        let ctx = fixture.context(fixture.store.clone());
        let token = CancellationToken::new();
        token.cancel();

        let outcome = run(&fixture, &ctx, ALL_ON, &token);

        assert!(outcome.cancelled());
        assert!(outcome.completed_steps.is_empty());
        assert!(!outcome.is_partial());
        assert_eq!(fixture.actions(), vec!["REMOVE_BEGIN", "REMOVE_CANCELLED"]);
        assert!(fixture.cache("K SNP42 a.cache").exists());
        assert!(fixture.locations.descriptor_file("Factory Strings").unwrap().exists());
    }

    #[test]
    fn test_cancel_between_steps() {
        let fixture = Fixture::factory_strings();
        let token = CancellationToken::new();
        // Step 4 ends by deleting the shared database.
        let file_ops = Arc::new(CancelAfterDelete::new(
            Arc::clone(&fixture.history),
            fixture.locations.database_file.clone(),
            token.clone(),
        ));
        let ctx = fixture.context(fixture.store.clone()).with_file_ops(file_ops);

        let outcome = run(&fixture, &ctx, ALL_ON, &token);

        assert!(outcome.cancelled());
        assert_eq!(outcome.completed_steps, Step::ALL[..4].to_vec());
        assert!(outcome.is_partial());
        assert!(!fixture.locations.database_file.exists());
        assert!(fixture.token("SNP42.xml").exists());
        assert!(fixture.unit.content_dir.exists());
        assert!(fixture
            .store
            .open_subtree(StoreRoot::Primary, "Factory Strings", Access::Read)
            .is_ok());
        let actions = fixture.actions();
        assert!(!actions.contains(&"EXPORT".to_string()));
        assert!(!actions.contains(&"DELETE_KEY".to_string()));
    }

    #[test]
    fn test_unknown_product_fails_without_touching_anything() {
        let fixture = Fixture::factory_strings();
        std::fs::remove_file(fixture.locations.descriptor_file("Factory Strings").unwrap()).unwrap();
        crate::test_support::write_catalog(&fixture.locations, &[("Session Horns", "SNP99")]);
        let ctx = fixture.context(fixture.store.clone());

        let outcome = run(&fixture, &ctx, ALL_ON, &CancellationToken::new());

        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(outcome.failed_step, Some(Step::ResolveMetadata));
        assert!(outcome.completed_steps.is_empty());
        assert!(fixture.cache("K SNP42 a.cache").exists());
        assert!(fixture.unit.content_dir.exists());
    }

    #[test]
    fn test_not_in_snapshot_fails_fast() {
        let fixture = Fixture::factory_strings();
        let ctx = fixture.context(fixture.store.clone());
        let mut progress = ProgressReporter::silent();
        let token = CancellationToken::new();
        let mut pipeline = RemovalPipeline::new(&ctx, &token, &mut progress);

        let outcome = pipeline.run(&fixture.unit, &ALL_ON, &InventorySnapshot::default());

        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert!(outcome.failed_step.is_none());
        assert!(fixture.actions().is_empty());
        assert!(fixture.unit.content_dir.exists());
    }

    #[test]
    fn test_failed_backup_keeps_registry_entry() {
        let fixture = Fixture::factory_strings();
        // A plain file where the backup dir should be.
        std::fs::write(&fixture.locations.backup_dir, "not a dir").unwrap();
        let ctx = fixture.context(fixture.store.clone());

        let outcome = run(&fixture, &ctx, ALL_ON, &CancellationToken::new());

        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(outcome.failed_step, Some(Step::BackupConfigEntry));
        assert!(outcome.is_partial());
        assert!(fixture
            .store
            .open_subtree(StoreRoot::Primary, "Factory Strings", Access::Read)
            .is_ok());
        assert!(!fixture.actions().contains(&"DELETE_KEY".to_string()));
    }

    #[test]
    fn test_existing_backup_is_replaced() {
        let fixture = Fixture::factory_strings();
        std::fs::create_dir_all(&fixture.locations.backup_dir).unwrap();
        let stale = fixture.locations.backup_dir.join("Factory Strings.json");
        std::fs::write(&stale, "stale").unwrap();
        std::fs::write(fixture.locations.database_backup_file(), "old db").unwrap();
        let ctx = fixture.context(fixture.store.clone());

        let outcome = run(&fixture, &ctx, ALL_ON, &CancellationToken::new());

        assert!(outcome.succeeded());
        assert_ne!(std::fs::read_to_string(&stale).unwrap(), "stale");
        assert_eq!(
            std::fs::read_to_string(fixture.locations.database_backup_file()).unwrap(),
            "db"
        );
    }

    #[test]
    fn test_rerun_on_partially_cleaned_unit_reports_no_file_errors() {
        let fixture = Fixture::factory_strings();
        for name in ["K SNP42 a.cache", "K SNP42 b.cache"] {
            std::fs::remove_file(fixture.cache(name)).unwrap();
        }
        std::fs::remove_file(fixture.locations.database_file.clone()).unwrap();
        std::fs::remove_dir_all(&fixture.unit.content_dir).unwrap();
        let ctx = fixture.context(fixture.store.clone());

        let outcome = run(&fixture, &ctx, ALL_ON, &CancellationToken::new());

        assert!(outcome.succeeded(), "{:?}", outcome);
        assert!(outcome.warnings.is_empty(), "{:?}", outcome.warnings);
        assert!(!fixture.actions().iter().any(|a| a.ends_with("_FAILED")));
    }

    #[test]
    fn test_catalog_resolution_keeps_catalog() {
        let fixture = Fixture::factory_strings();
        std::fs::remove_file(fixture.locations.descriptor_file("Factory Strings").unwrap()).unwrap();
        crate::test_support::write_catalog(
            &fixture.locations,
            &[("Factory Strings", "SNP42"), ("Other", "SNP99")],
        );
        let ctx = fixture.context(fixture.store.clone());

        let outcome = run(&fixture, &ctx, ALL_ON, &CancellationToken::new());

        assert!(outcome.succeeded());
        assert!(fixture.locations.catalog_file().exists());
        assert!(!outcome.completed_steps.contains(&Step::DeleteDescriptor));
    }

    #[test]
    fn test_protected_content_dir_is_refused() {
        let fixture = Fixture::factory_strings();
        let unit = RemovableUnit::new("Factory Strings", "/", StoreRoot::Primary, "Factory Strings");
        let ctx = fixture.context(fixture.store.clone());
        let mut progress = ProgressReporter::silent();
        let token = CancellationToken::new();
        let mut pipeline = RemovalPipeline::new(&ctx, &token, &mut progress);

        let outcome = pipeline.run(&unit, &ALL_ON, &fixture.snapshot());

        assert_eq!(outcome.failed_step, Some(Step::DeleteContentDir));
        assert!(fixture
            .store
            .open_subtree(StoreRoot::Primary, "Factory Strings", Access::Read)
            .is_ok());
    }

    #[test]
    fn test_content_dir_with_parent_component_spares_siblings() {
        let fixture = Fixture::factory_strings();
        let escaping = fixture.unit.content_dir.join("..");
        let unit = RemovableUnit::new("Factory Strings", escaping, StoreRoot::Primary, "Factory Strings");
        let sibling = fixture.dir.path().join("Libraries").join("Session Horns");
        let ctx = fixture.context(fixture.store.clone());
        let mut progress = ProgressReporter::silent();
        let token = CancellationToken::new();
        let mut pipeline = RemovalPipeline::new(&ctx, &token, &mut progress);

        let outcome = pipeline.run(&unit, &ALL_ON, &fixture.snapshot());

        assert_eq!(outcome.status, OutcomeStatus::Failed);
        assert_eq!(outcome.failed_step, Some(Step::DeleteContentDir));
        assert!(sibling.join("Instruments").exists());
        assert!(fixture.unit.content_dir.exists());
    }

    #[test]
    fn test_progress_reports_every_step_in_order() {
        let fixture = Fixture::factory_strings();
        let ctx = fixture.context(fixture.store.clone());
        let (tx, rx) = channel();
        let mut progress = ProgressReporter::new(tx);
        let token = CancellationToken::new();
        {
            let mut pipeline = RemovalPipeline::new(&ctx, &token, &mut progress);
            pipeline.run(&fixture.unit, &ALL_ON, &fixture.snapshot());
        }
        drop(progress);

        let steps: Vec<usize> = rx
            .iter()
            .filter_map(|event| match event {
                crate::coordinator::RemovalEvent::Progress(p) => Some(p.step_index),
                _ => None,
            })
            .collect();
        let mut boundaries = steps.clone();
        boundaries.dedup();
        assert_eq!(boundaries, (1..=8).collect::<Vec<_>>());
        assert!(steps.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_missing_registry_key_is_a_warning() {
        let fixture = Fixture::factory_strings();
        let empty = Arc::new(TreeStore::in_memory());
        let ctx = fixture.context(empty);
        let options = RemovalOptions {
            backup_config_entry: false,
            delete_content_dir: false,
        };

        let outcome = run(&fixture, &ctx, options, &CancellationToken::new());

        assert!(outcome.succeeded());
        assert_eq!(outcome.warnings.len(), 1);
    }
}
