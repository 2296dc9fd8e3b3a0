//! Runs a walker over many files, sequentially or on a worker pool.

use crate::cache::{CacheError, FileCache, ResultCache};
use crate::config::{Config, ConfigError, ModuleConfig, PropertyReader, CHECKER_MODULE, WALKER_MODULE};
use crate::contents::FileContents;
use crate::factory::{ModuleFactory, ModuleKind, ModuleRegistry};
use crate::filter::{configure_file_filter, FileFilterBox};
use crate::grammar::{JavaSubsetParser, ParserAdapter};
use crate::listener::ListenerBox;
use crate::types::{AuditReport, FileReport, Severity, Violation};
use crate::walker::{WalkError, Walker};
use parking_lot::Mutex;
use rayon::prelude::*;
use std::any::Any;
use std::panic::{catch_unwind, resume_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::UNIX_EPOCH;
use tracing::{debug, error, info};

/// Errors that stop a run.
#[derive(Debug, thiserror::Error)]
pub enum CheckerError {
    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The result cache could not be loaded or written.
    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    /// A file could not be processed.
    #[error(transparent)]
    File(#[from] WalkError),

    /// The worker pool could not be started.
    #[error("Failed to start worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
}

/// Panic payload re-raised on the caller's thread when a file's task panicked.
///
/// Callers catching the unwind can downcast the payload to this type to learn
/// which file was being processed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("panic while processing {}: {message}", path.display())]
pub struct FilePanic {
    /// The file whose task panicked.
    pub path: PathBuf,
    /// The original panic message, when it was a string.
    pub message: String,
}

impl FilePanic {
    fn new(path: &Path, payload: &(dyn Any + Send)) -> Self {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "non-string panic payload".to_string());
        Self {
            path: path.to_path_buf(),
            message,
        }
    }
}

/// Builder for configuring a [`Checker`].
#[derive(Default)]
pub struct CheckerBuilder {
    factory: Option<Arc<dyn ModuleFactory>>,
    parser: Option<Arc<dyn ParserAdapter>>,
    config: Option<ModuleConfig>,
    threads: Option<usize>,
    severity_threshold: Option<Severity>,
    skip_on_parse_error: Option<bool>,
    parse_error_severity: Option<Severity>,
    tab_width: Option<usize>,
    file_extensions: Option<Vec<String>>,
    halt_on_exception: Option<bool>,
    cache: Option<Box<dyn ResultCache>>,
    file_filters: Vec<FileFilterBox>,
    listeners: Vec<ListenerBox>,
}

impl CheckerBuilder {
    /// Creates a new builder with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from a loaded configuration file: its module tree, and its
    /// result cache when `cache_file` is set.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache file exists but cannot be read.
    pub fn from_config(config: &Config) -> Result<Self, CheckerError> {
        let tree = config.module_tree();
        let mut builder = Self::new();
        if let Some(cache_file) = &config.checker.cache_file {
            builder.cache = Some(Box::new(FileCache::load(cache_file, &tree)?));
        }
        builder.config = Some(tree);
        Ok(builder)
    }

    /// Sets the module factory (default: the core filters only).
    #[must_use]
    pub fn factory(mut self, factory: Arc<dyn ModuleFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Sets the parser (default: [`JavaSubsetParser`]).
    #[must_use]
    pub fn parser(mut self, parser: Arc<dyn ParserAdapter>) -> Self {
        self.parser = Some(parser);
        self
    }

    /// Sets the configuration tree rooted at the `Checker` module.
    #[must_use]
    pub fn config(mut self, config: ModuleConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Sets the number of worker threads (default 1).
    #[must_use]
    pub fn threads(mut self, threads: usize) -> Self {
        self.threads = Some(threads);
        self
    }

    /// Sets the severity counted toward the exit status (default error).
    #[must_use]
    pub fn severity_threshold(mut self, severity: Severity) -> Self {
        self.severity_threshold = Some(severity);
        self
    }

    /// Reports parse failures as a single violation of `severity`.
    #[must_use]
    pub fn skip_on_parse_error(mut self, severity: Severity) -> Self {
        self.skip_on_parse_error = Some(true);
        self.parse_error_severity = Some(severity);
        self
    }

    /// Sets the tab width used for columns.
    #[must_use]
    pub fn tab_width(mut self, tab_width: usize) -> Self {
        self.tab_width = Some(tab_width);
        self
    }

    /// Restricts processing to files with these extensions.
    #[must_use]
    pub fn file_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.file_extensions = Some(extensions.into_iter().map(Into::into).collect());
        self
    }

    /// Sets whether a check failure stops the run (default true).
    #[must_use]
    pub fn halt_on_exception(mut self, halt: bool) -> Self {
        self.halt_on_exception = Some(halt);
        self
    }

    /// Sets the result cache.
    #[must_use]
    pub fn cache(mut self, cache: Box<dyn ResultCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Adds a file filter.
    #[must_use]
    pub fn file_filter(mut self, filter: FileFilterBox) -> Self {
        self.file_filters.push(filter);
        self
    }

    /// Adds a listener.
    #[must_use]
    pub fn listener(mut self, listener: ListenerBox) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Builds the checker: configures every module and starts the pool.
    ///
    /// # Errors
    ///
    /// Returns a configuration error before any file is touched.
    pub fn build(self) -> Result<Checker, CheckerError> {
        let factory = self
            .factory
            .unwrap_or_else(|| Arc::new(ModuleRegistry::with_filters()));
        let parser = self.parser.unwrap_or_else(|| Arc::new(JavaSubsetParser));
        let root = self.config.unwrap_or_else(|| ModuleConfig::new(CHECKER_MODULE));

        let mut reader = PropertyReader::new(&root);
        let threads = reader.get_usize("threads")?;
        let severity = reader.get_severity("severity")?;
        let extensions = reader.get_list("file_extensions");
        let halt = reader.get_bool("halt_on_exception")?;
        reader.finish()?;

        let mut walker_config = root
            .child(WALKER_MODULE)
            .cloned()
            .unwrap_or_else(|| ModuleConfig::new(WALKER_MODULE));
        if let Some(tab_width) = self.tab_width {
            walker_config = walker_config.with_property("tab_width", tab_width.to_string());
        }
        if let Some(skip) = self.skip_on_parse_error {
            walker_config = walker_config.with_property("skip_on_parse_error", skip.to_string());
        }
        if let Some(severity) = self.parse_error_severity {
            walker_config = walker_config.with_property("parse_error_severity", severity.to_string());
        }
        let walker = Walker::new(Arc::clone(&factory), parser, &walker_config)?;

        let mut file_filters = Vec::new();
        for child in root.children.iter().filter(|c| c.name != WALKER_MODULE) {
            if factory.module_kind(&child.name) != Some(ModuleKind::FileFilter) {
                return Err(ConfigError::UnknownModule {
                    name: child.name.clone(),
                }
                .into());
            }
            let mut filter = factory.create_file_filter(&child.name)?;
            configure_file_filter(filter.as_mut(), child)?;
            file_filters.push(filter);
        }
        file_filters.extend(self.file_filters);

        let mut cache = self.cache;
        if let Some(cache) = cache.as_mut() {
            cache.put_external_resources(&walker.external_resource_locations());
        }

        let threads = self.threads.or(threads).unwrap_or(1).max(1);
        let pool = if threads > 1 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .thread_name(|i| format!("treewalk-worker-{i}"))
                    .build()?,
            )
        } else {
            None
        };
        let workers = (0..threads).map(|_| Mutex::new(None)).collect();

        let file_extensions = self
            .file_extensions
            .or(extensions)
            .unwrap_or_default()
            .into_iter()
            .map(|e| e.trim_start_matches('.').to_string())
            .collect();

        debug!(threads, checks = walker.check_names().len(), "checker configured");
        Ok(Checker {
            walker: Mutex::new(walker),
            workers,
            pool,
            threads,
            severity_threshold: self.severity_threshold.or(severity).unwrap_or(Severity::Error),
            halt_on_exception: self.halt_on_exception.or(halt).unwrap_or(true),
            file_extensions,
            file_filters,
            cache,
            listeners: self.listeners,
            destroyed: false,
        })
    }
}

/// Result of processing one file inside a task.
enum Outcome {
    Checked(Vec<Violation>),
    Failed(WalkError),
    Config(ConfigError),
    Panicked(Box<dyn Any + Send>),
}

/// A file selected for processing.
struct Task {
    index: usize,
    path: PathBuf,
    timestamp: Option<u64>,
}

/// Runs the configured walker over file lists.
///
/// With one thread the walker's checks are used directly for every file.
/// With more, each worker thread of the pool lazily gets its own walker
/// from [`Walker::clone_for_worker`] and keeps it for the whole run.
pub struct Checker {
    walker: Mutex<Walker>,
    workers: Vec<Mutex<Option<Walker>>>,
    pool: Option<rayon::ThreadPool>,
    threads: usize,
    severity_threshold: Severity,
    halt_on_exception: bool,
    file_extensions: Vec<String>,
    file_filters: Vec<FileFilterBox>,
    cache: Option<Box<dyn ResultCache>>,
    listeners: Vec<ListenerBox>,
    destroyed: bool,
}

impl Checker {
    /// Creates a new builder for configuring a checker.
    #[must_use]
    pub fn builder() -> CheckerBuilder {
        CheckerBuilder::new()
    }

    /// Number of worker threads.
    #[must_use]
    pub fn threads(&self) -> usize {
        self.threads
    }

    /// Severity counted toward the exit status.
    #[must_use]
    pub fn severity_threshold(&self) -> Severity {
        self.severity_threshold
    }

    /// Processes `files` and returns the report.
    ///
    /// Files outside the configured extensions or rejected by a file filter
    /// are left out of the report. Files the cache knows as unchanged are
    /// reported without violations.
    ///
    /// # Errors
    ///
    /// With `halt_on_exception`, the first file that could not be processed
    /// stops the run. Cache write failures are errors too.
    pub fn process(&mut self, files: &[PathBuf]) -> Result<AuditReport, CheckerError> {
        for listener in &mut self.listeners {
            listener.audit_started();
        }
        info!(files = files.len(), threads = self.threads, "starting audit");

        let mut report = AuditReport::new();
        let mut tasks = Vec::new();
        for path in files {
            if !self.accepts(path) {
                debug!(path = %path.display(), "file filtered out");
                continue;
            }
            let timestamp = modified_millis(path);
            let unchanged = match (&self.cache, timestamp) {
                (Some(cache), Some(ts)) => cache.is_unchanged(path, ts),
                _ => false,
            };
            if unchanged {
                debug!(path = %path.display(), "file unchanged, skipping");
                report.files.push(FileReport {
                    path: path.clone(),
                    violations: Vec::new(),
                    cached: true,
                });
                continue;
            }
            tasks.push(Task {
                index: report.files.len(),
                path: path.clone(),
                timestamp,
            });
            report.files.push(FileReport {
                path: path.clone(),
                ..FileReport::default()
            });
        }

        let failure = match self.pool.take() {
            Some(pool) => {
                let outcomes = self.run_parallel(&pool, &tasks);
                self.pool = Some(pool);
                let mut failure = None;
                for (task, outcome) in tasks.iter().zip(outcomes) {
                    if let Err(e) = self.complete(task, outcome, &mut report) {
                        failure.get_or_insert(e);
                    }
                }
                failure
            }
            None => {
                let mut failure = None;
                for task in &tasks {
                    let outcome = {
                        let mut walker = self.walker.lock();
                        run_task(&mut walker, &task.path)
                    };
                    if let Err(e) = self.complete(task, outcome, &mut report) {
                        failure = Some(e);
                        break;
                    }
                }
                failure
            }
        };
        if let Some(e) = failure {
            return Err(e);
        }

        report.threshold_count = report
            .violations()
            .filter(|(_, v)| v.severity >= self.severity_threshold)
            .count();
        if let Some(cache) = &self.cache {
            cache.persist()?;
        }
        info!(
            files = report.files_checked(),
            violations = report.threshold_count,
            "audit finished"
        );
        for listener in &mut self.listeners {
            listener.audit_finished(&report);
        }
        Ok(report)
    }

    fn accepts(&self, path: &Path) -> bool {
        let extension_ok = self.file_extensions.is_empty()
            || path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| self.file_extensions.iter().any(|x| x == e));
        extension_ok && self.file_filters.iter().all(|f| f.accept(path))
    }

    fn run_parallel(&self, pool: &rayon::ThreadPool, tasks: &[Task]) -> Vec<Outcome> {
        let original = &self.walker;
        let workers = &self.workers;
        pool.install(|| {
            tasks
                .par_iter()
                .map(|task| {
                    let index = rayon::current_thread_index().unwrap_or(0);
                    let Some(slot) = workers.get(index) else {
                        return run_task(&mut original.lock(), &task.path);
                    };
                    let mut slot = slot.lock();
                    if slot.is_none() {
                        match original.lock().clone_for_worker() {
                            Ok(walker) => {
                                debug!(worker = index, "worker walker created");
                                *slot = Some(walker);
                            }
                            Err(e) => return Outcome::Config(e),
                        }
                    }
                    match slot.as_mut() {
                        Some(walker) => run_task(walker, &task.path),
                        None => run_task(&mut original.lock(), &task.path),
                    }
                })
                .collect()
        })
    }

    /// Reports one finished task in input order.
    fn complete(&mut self, task: &Task, outcome: Outcome, report: &mut AuditReport) -> Result<(), CheckerError> {
        let path = task.path.as_path();
        let violations = match outcome {
            Outcome::Checked(violations) => violations,
            Outcome::Panicked(payload) => {
                let panic = FilePanic::new(path, payload.as_ref());
                error!(path = %path.display(), message = %panic.message, "panic while processing file");
                resume_unwind(Box::new(panic));
            }
            Outcome::Config(e) => return Err(e.into()),
            Outcome::Failed(e) => {
                if let Some(cache) = self.cache.as_mut() {
                    cache.invalidate(path);
                }
                for listener in &mut self.listeners {
                    listener.file_error(path, &e);
                }
                if self.halt_on_exception {
                    return Err(e.into());
                }
                vec![Violation::exception(Severity::Error, e.to_string(), CHECKER_MODULE)]
            }
        };

        let violations: Vec<Violation> = violations
            .into_iter()
            .filter(|v| v.severity != Severity::Ignore)
            .collect();
        if let Some(cache) = self.cache.as_mut() {
            match task.timestamp {
                Some(ts) if violations.is_empty() => cache.record(path, ts),
                _ => cache.invalidate(path),
            }
        }
        for listener in &mut self.listeners {
            listener.file_started(path);
            for v in &violations {
                listener.violation(path, v);
            }
            listener.file_finished(path);
        }
        report.files[task.index].violations = violations;
        Ok(())
    }

    /// Calls `destroy` once on every check instance, clones included.
    pub fn destroy(&mut self) {
        if std::mem::replace(&mut self.destroyed, true) {
            return;
        }
        for worker in &self.workers {
            if let Some(walker) = worker.lock().as_mut() {
                walker.destroy();
            }
        }
        self.walker.lock().destroy();
    }
}

impl Drop for Checker {
    fn drop(&mut self) {
        self.destroy();
    }
}

impl std::fmt::Debug for Checker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Checker")
            .field("threads", &self.threads)
            .field("severity_threshold", &self.severity_threshold)
            .field("halt_on_exception", &self.halt_on_exception)
            .field("file_extensions", &self.file_extensions)
            .finish_non_exhaustive()
    }
}

fn run_task(walker: &mut Walker, path: &Path) -> Outcome {
    let result = catch_unwind(AssertUnwindSafe(|| match FileContents::from_file(path) {
        Ok(contents) => walker.process_file(&contents),
        Err(e) => Ok(vec![Violation::exception(Severity::Error, e.to_string(), CHECKER_MODULE)]),
    }));
    match result {
        Ok(Ok(violations)) => Outcome::Checked(violations),
        Ok(Err(e)) => Outcome::Failed(e),
        Err(payload) => Outcome::Panicked(payload),
    }
}

fn modified_millis(path: &Path) -> Option<u64> {
    let modified = std::fs::metadata(path).ok()?.modified().ok()?;
    let millis = modified.duration_since(UNIX_EPOCH).ok()?.as_millis();
    Some(u64::try_from(millis).unwrap_or(u64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root() -> ModuleConfig {
        ModuleConfig::new(CHECKER_MODULE)
            .with_property("threads", "3")
            .with_property("severity", "warning")
            .with_property("file_extensions", ".java,jav")
            .with_child(ModuleConfig::new(WALKER_MODULE))
    }

    #[test]
    fn properties_of_the_root_module_are_read() {
        let checker = Checker::builder().config(root()).build().unwrap();
        assert_eq!(checker.threads(), 3);
        assert_eq!(checker.severity_threshold(), Severity::Warning);
        assert!(checker.accepts(Path::new("src/A.java")));
        assert!(checker.accepts(Path::new("B.jav")));
        assert!(!checker.accepts(Path::new("README.md")));
    }

    #[test]
    fn builder_settings_win_over_properties() {
        let checker = Checker::builder()
            .config(root())
            .threads(1)
            .severity_threshold(Severity::Info)
            .file_extensions(["md"])
            .build()
            .unwrap();
        assert_eq!(checker.threads(), 1);
        assert_eq!(checker.severity_threshold(), Severity::Info);
        assert!(checker.accepts(Path::new("README.md")));
        assert!(!checker.accepts(Path::new("A.java")));
    }

    #[test]
    fn unknown_root_property_is_rejected() {
        let config = ModuleConfig::new(CHECKER_MODULE).with_property("thread", "2");
        assert!(matches!(
            Checker::builder().config(config).build(),
            Err(CheckerError::Config(ConfigError::UnknownProperty { .. }))
        ));
    }

    #[test]
    fn walker_child_must_hold_only_walker_modules() {
        let config = ModuleConfig::new(CHECKER_MODULE).with_child(ModuleConfig::new("SeverityMatch"));
        assert!(matches!(
            Checker::builder().config(config).build(),
            Err(CheckerError::Config(ConfigError::UnknownModule { name })) if name == "SeverityMatch"
        ));
    }
}
