//! The dispatch engine: walks a file's tree and notifies checks by node kind.

use crate::builder::build_tree;
use crate::check::{configure_check, registered_kinds, Check, CheckBox, CheckError, Mutability};
use crate::comments::with_comments;
use crate::config::{ConfigError, ModuleConfig, PropertyReader};
use crate::contents::FileContents;
use crate::context::{CheckContext, CheckSettings};
use crate::factory::{ModuleFactory, ModuleKind};
use crate::filter::{configure_filter, AuditEvent, FilterBox};
use crate::grammar::{ParseFailure, ParserAdapter};
use crate::kind::NodeKind;
use crate::tree::{NodeId, SyntaxTree};
use crate::types::{Severity, Violation};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Default tab width for violation columns.
pub const DEFAULT_TAB_WIDTH: usize = 8;

/// Errors that abort the processing of one file.
#[derive(Debug, thiserror::Error)]
pub enum WalkError {
    /// The grammar could not derive the file.
    #[error("Parse error in {path}: {source}")]
    Parse {
        /// Path of the file.
        path: PathBuf,
        /// Failure reported by the parser.
        source: ParseFailure,
    },

    /// A check or filter failed while processing the file.
    #[error("Error processing {path}: {source}")]
    Check {
        /// Path of the file.
        path: PathBuf,
        /// Failure raised by the module.
        source: CheckError,
    },
}

/// Walker-level settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkerSettings {
    /// Tab width for violation columns.
    pub tab_width: usize,
    /// Report a parse failure as one violation instead of an error.
    pub skip_on_parse_error: bool,
    /// Severity of that violation.
    pub parse_error_severity: Severity,
}

impl Default for WalkerSettings {
    fn default() -> Self {
        Self {
            tab_width: DEFAULT_TAB_WIDTH,
            skip_on_parse_error: false,
            parse_error_severity: Severity::Error,
        }
    }
}

impl WalkerSettings {
    fn read(reader: &mut PropertyReader<'_>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            tab_width: reader.get_usize("tab_width")?.unwrap_or(defaults.tab_width),
            skip_on_parse_error: reader
                .get_bool("skip_on_parse_error")?
                .unwrap_or(defaults.skip_on_parse_error),
            parse_error_severity: reader
                .get_severity("parse_error_severity")?
                .unwrap_or(defaults.parse_error_severity),
        })
    }
}

/// A global-stateful check instance shared by every worker.
struct SharedCheck {
    check: CheckBox,
    destroyed: bool,
}

/// How a walker holds one check.
enum CheckSlot {
    /// Private to this walker; re-created for every worker.
    Owned(CheckBox),
    /// One instance for all workers, behind a lock.
    Shared(Arc<Mutex<SharedCheck>>),
}

impl CheckSlot {
    fn with<R>(&mut self, f: impl FnOnce(&mut dyn Check) -> R) -> R {
        match self {
            Self::Owned(check) => f(check.as_mut()),
            Self::Shared(shared) => f(shared.lock().check.as_mut()),
        }
    }
}

/// A configured check with the state the walker keeps for it.
struct RegisteredCheck {
    slot: CheckSlot,
    name: &'static str,
    config: ModuleConfig,
    settings: CheckSettings,
    kinds: Vec<NodeKind>,
    comments: bool,
    messages: &'static [(&'static str, &'static str)],
    sink: Vec<Violation>,
}

struct RegisteredFilter {
    filter: FilterBox,
    config: ModuleConfig,
}

/// Kind-indexed dispatch tables of one pass.
#[derive(Debug, Clone, Default)]
struct DispatchTable {
    by_kind: Vec<Vec<usize>>,
    all: Vec<usize>,
}

impl DispatchTable {
    fn new() -> Self {
        Self {
            by_kind: vec![Vec::new(); NodeKind::COUNT],
            all: Vec::new(),
        }
    }

    fn register(&mut self, index: usize, kinds: &[NodeKind]) {
        self.all.push(index);
        for kind in kinds {
            self.by_kind[kind.index()].push(index);
        }
    }

    fn checks_for(&self, kind: NodeKind) -> &[usize] {
        &self.by_kind[kind.index()]
    }
}

/// Owns the configured checks and filters and runs them over files.
///
/// Checks are ordered by name, then id, then configuration order, and that
/// order is used for every dispatch. Checks that want comments are notified
/// in a second walk over the comment-augmented tree.
pub struct Walker {
    factory: Arc<dyn ModuleFactory>,
    parser: Arc<dyn ParserAdapter>,
    settings: WalkerSettings,
    checks: Vec<RegisteredCheck>,
    ordinary: DispatchTable,
    comment: DispatchTable,
    filters: Vec<RegisteredFilter>,
    destroyed: bool,
}

impl Walker {
    /// Builds a walker from its configuration node.
    ///
    /// Walker properties are `tab_width`, `skip_on_parse_error` and
    /// `parse_error_severity`; children are checks and filters.
    ///
    /// # Errors
    ///
    /// Returns the first configuration problem found.
    pub fn new(
        factory: Arc<dyn ModuleFactory>,
        parser: Arc<dyn ParserAdapter>,
        config: &ModuleConfig,
    ) -> Result<Self, ConfigError> {
        let mut reader = PropertyReader::new(config);
        let settings = WalkerSettings::read(&mut reader)?;
        reader.finish()?;

        let mut checks = Vec::new();
        let mut filters = Vec::new();
        for child in &config.children {
            match factory.module_kind(&child.name) {
                Some(ModuleKind::Check) => checks.push(register_check(factory.as_ref(), child)?),
                Some(ModuleKind::Filter) => filters.push(RegisteredFilter {
                    filter: create_filter(factory.as_ref(), child)?,
                    config: child.clone(),
                }),
                Some(ModuleKind::FileFilter) | None => {
                    return Err(ConfigError::UnknownModule {
                        name: child.name.clone(),
                    })
                }
            }
        }

        let mut order: Vec<usize> = (0..checks.len()).collect();
        order.sort_by(|a, b| {
            let (x, y) = (&checks[*a], &checks[*b]);
            x.name.cmp(y.name).then_with(|| x.settings.id.cmp(&y.settings.id)).then(a.cmp(b))
        });
        let mut slots: Vec<Option<RegisteredCheck>> = checks.into_iter().map(Some).collect();
        let checks: Vec<RegisteredCheck> = order.into_iter().filter_map(|i| slots[i].take()).collect();

        let (ordinary, comment) = dispatch_tables(&checks);
        debug!(
            checks = checks.len(),
            ordinary = ordinary.all.len(),
            comment = comment.all.len(),
            filters = filters.len(),
            "walker configured"
        );
        Ok(Self {
            factory,
            parser,
            settings,
            checks,
            ordinary,
            comment,
            filters,
            destroyed: false,
        })
    }

    /// Walker settings in effect.
    #[must_use]
    pub fn settings(&self) -> WalkerSettings {
        self.settings
    }

    /// Names of the registered checks in dispatch order.
    #[must_use]
    pub fn check_names(&self) -> Vec<&'static str> {
        self.checks.iter().map(|c| c.name).collect()
    }

    /// Resources read by checks and filters.
    #[must_use]
    pub fn external_resource_locations(&self) -> BTreeSet<String> {
        let mut locations: BTreeSet<String> = self.checks_iter().flatten().collect();
        for filter in &self.filters {
            locations.extend(filter.filter.external_resource_locations());
        }
        locations
    }

    fn checks_iter(&self) -> impl Iterator<Item = Vec<String>> + '_ {
        self.checks.iter().map(|c| match &c.slot {
            CheckSlot::Owned(check) => check.external_resource_locations(),
            CheckSlot::Shared(shared) => shared.lock().check.external_resource_locations(),
        })
    }

    /// Builds the walker a worker thread uses.
    ///
    /// Global-stateful checks are shared with `self`. Every other check,
    /// stateless ones included, and every filter is created again through the
    /// factory and configured from the same configuration, so workers never
    /// wait on each other.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if re-creating a module fails.
    pub fn clone_for_worker(&self) -> Result<Self, ConfigError> {
        let mut checks = Vec::with_capacity(self.checks.len());
        for registered in &self.checks {
            let slot = match &registered.slot {
                CheckSlot::Shared(shared) => CheckSlot::Shared(Arc::clone(shared)),
                CheckSlot::Owned(_) => {
                    let mut check = self.factory.create_check(&registered.config.name)?;
                    configure_check(check.as_mut(), &registered.config)?;
                    check.init();
                    CheckSlot::Owned(check)
                }
            };
            checks.push(RegisteredCheck {
                slot,
                name: registered.name,
                config: registered.config.clone(),
                settings: registered.settings.clone(),
                kinds: registered.kinds.clone(),
                comments: registered.comments,
                messages: registered.messages,
                sink: Vec::new(),
            });
        }
        let filters = self
            .filters
            .iter()
            .map(|f| {
                Ok(RegisteredFilter {
                    filter: create_filter(self.factory.as_ref(), &f.config)?,
                    config: f.config.clone(),
                })
            })
            .collect::<Result<Vec<_>, ConfigError>>()?;
        Ok(Self {
            factory: Arc::clone(&self.factory),
            parser: Arc::clone(&self.parser),
            settings: self.settings,
            checks,
            ordinary: self.ordinary.clone(),
            comment: self.comment.clone(),
            filters,
            destroyed: false,
        })
    }

    /// Processes one file and returns its filtered violations in natural
    /// order.
    ///
    /// # Errors
    ///
    /// Returns [`WalkError::Parse`] for a parse failure (unless parse
    /// failures are skipped) and [`WalkError::Check`] when a check or filter
    /// fails. No violation of the file survives an error.
    pub fn process_file(&mut self, contents: &FileContents) -> Result<Vec<Violation>, WalkError> {
        let path = contents.path();
        let parsed = match self.parser.parse(contents.text()) {
            Ok(parsed) => parsed,
            Err(failure) => {
                let failure = failure.with_source_span(contents.text());
                if !self.settings.skip_on_parse_error {
                    return Err(WalkError::Parse {
                        path: path.to_path_buf(),
                        source: failure,
                    });
                }
                warn!(path = %path.display(), error = %failure, "skipping file that does not parse");
                let violation = Violation::exception(
                    self.settings.parse_error_severity,
                    failure.to_string(),
                    crate::config::WALKER_MODULE,
                );
                return self.filter(contents, None, vec![violation]);
            }
        };
        let tree = build_tree(&parsed);

        let mut violations = Vec::new();
        let tab_width = self.settings.tab_width;
        if !self.ordinary.all.is_empty() {
            walk_pass(&mut self.checks, &self.ordinary, &tree, contents, tab_width, &mut violations)
                .map_err(|source| check_error(contents, source))?;
        }
        if !self.comment.all.is_empty() {
            let augmented = with_comments(&tree);
            walk_pass(&mut self.checks, &self.comment, &augmented, contents, tab_width, &mut violations)
                .map_err(|source| check_error(contents, source))?;
        }
        self.filter(contents, Some(&tree), violations)
    }

    fn filter(
        &mut self,
        contents: &FileContents,
        tree: Option<&SyntaxTree>,
        mut violations: Vec<Violation>,
    ) -> Result<Vec<Violation>, WalkError> {
        if !self.filters.is_empty() {
            for registered in &mut self.filters {
                registered
                    .filter
                    .file_started(contents, tree)
                    .map_err(|source| check_error(contents, source))?;
            }
            let filters = &self.filters;
            violations.retain(|violation| {
                let event = AuditEvent {
                    path: contents.path(),
                    violation,
                    contents,
                    tree,
                };
                filters.iter().all(|f| f.filter.accept(&event))
            });
        }
        violations.sort();
        Ok(violations)
    }

    /// Calls `destroy` on every check this walker is responsible for.
    ///
    /// Shared checks are destroyed once, whichever walker gets there first.
    /// Later calls are no-ops.
    pub fn destroy(&mut self) {
        if std::mem::replace(&mut self.destroyed, true) {
            return;
        }
        for registered in &mut self.checks {
            match &mut registered.slot {
                CheckSlot::Owned(check) => check.destroy(),
                CheckSlot::Shared(shared) => {
                    let mut shared = shared.lock();
                    if !std::mem::replace(&mut shared.destroyed, true) {
                        shared.check.destroy();
                    }
                }
            }
        }
    }
}

impl std::fmt::Debug for Walker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Walker")
            .field("parser", &self.parser.name())
            .field("settings", &self.settings)
            .field("checks", &self.check_names())
            .field("filters", &self.filters.iter().map(|r| r.filter.name()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

fn check_error(contents: &FileContents, source: CheckError) -> WalkError {
    WalkError::Check {
        path: contents.path().to_path_buf(),
        source,
    }
}

fn register_check(factory: &dyn ModuleFactory, config: &ModuleConfig) -> Result<RegisteredCheck, ConfigError> {
    let mut check = factory.create_check(&config.name)?;
    let settings = configure_check(check.as_mut(), config)?;
    let kinds = registered_kinds(check.as_ref(), &settings)?;
    check.init();

    let name = check.name();
    let comments = check.requires_comments();
    let messages = check.messages();
    let slot = match check.mutability() {
        Some(Mutability::GlobalStateful) => CheckSlot::Shared(Arc::new(Mutex::new(SharedCheck {
            check,
            destroyed: false,
        }))),
        Some(Mutability::Stateless | Mutability::FileStateful) => CheckSlot::Owned(check),
        None => {
            debug!(check = name, "no mutability class declared, check will be cloned per worker");
            CheckSlot::Owned(check)
        }
    };
    Ok(RegisteredCheck {
        slot,
        name,
        config: config.clone(),
        settings,
        kinds,
        comments,
        messages,
        sink: Vec::new(),
    })
}

fn create_filter(factory: &dyn ModuleFactory, config: &ModuleConfig) -> Result<FilterBox, ConfigError> {
    let mut filter = factory.create_filter(&config.name)?;
    configure_filter(filter.as_mut(), config)?;
    Ok(filter)
}

fn dispatch_tables(checks: &[RegisteredCheck]) -> (DispatchTable, DispatchTable) {
    let mut ordinary = DispatchTable::new();
    let mut comment = DispatchTable::new();
    for (index, check) in checks.iter().enumerate() {
        let table = if check.comments { &mut comment } else { &mut ordinary };
        table.register(index, &check.kinds);
    }
    (ordinary, comment)
}

#[derive(Clone, Copy)]
enum Hook {
    Visit,
    Leave,
}

/// One full walk of `tree` for the checks of `table`.
///
/// On error every sink is cleared, so nothing of the file survives.
fn walk_pass(
    checks: &mut [RegisteredCheck],
    table: &DispatchTable,
    tree: &SyntaxTree,
    contents: &FileContents,
    tab_width: usize,
    out: &mut Vec<Violation>,
) -> Result<(), CheckError> {
    let result = run_pass(checks, table, tree, contents, tab_width);
    for &index in &table.all {
        let sink = &mut checks[index].sink;
        if result.is_ok() {
            out.append(sink);
        } else {
            sink.clear();
        }
    }
    result
}

fn run_pass(
    checks: &mut [RegisteredCheck],
    table: &DispatchTable,
    tree: &SyntaxTree,
    contents: &FileContents,
    tab_width: usize,
) -> Result<(), CheckError> {
    let root = tree.root_ref();
    for &index in &table.all {
        let RegisteredCheck {
            slot,
            name,
            settings,
            messages,
            sink,
            ..
        } = &mut checks[index];
        let mut ctx = CheckContext::new(contents, tab_width, *name, settings, *messages, sink);
        slot.with(|check| check.begin_tree(&mut ctx, root))?;
    }

    let mut current = tree.root();
    while let Some(node) = current {
        notify(checks, table, tree, contents, tab_width, node, Hook::Visit)?;
        let mut to_visit = tree.first_child(node);
        let mut climbing = Some(node);
        while let (Some(up), None) = (climbing, to_visit) {
            notify(checks, table, tree, contents, tab_width, up, Hook::Leave)?;
            to_visit = tree.next_sibling(up);
            climbing = tree.parent(up);
        }
        current = to_visit;
    }

    for &index in &table.all {
        let RegisteredCheck {
            slot,
            name,
            settings,
            messages,
            sink,
            ..
        } = &mut checks[index];
        let mut ctx = CheckContext::new(contents, tab_width, *name, settings, *messages, sink);
        slot.with(|check| check.finish_tree(&mut ctx, root))?;
    }
    Ok(())
}

fn notify(
    checks: &mut [RegisteredCheck],
    table: &DispatchTable,
    tree: &SyntaxTree,
    contents: &FileContents,
    tab_width: usize,
    node: NodeId,
    hook: Hook,
) -> Result<(), CheckError> {
    let view = tree.node(node);
    for &index in table.checks_for(view.kind()) {
        let RegisteredCheck {
            slot,
            name,
            settings,
            messages,
            sink,
            ..
        } = &mut checks[index];
        let mut ctx = CheckContext::new(contents, tab_width, *name, settings, *messages, sink);
        slot.with(|check| match hook {
            Hook::Visit => check.visit_node(&mut ctx, view),
            Hook::Leave => check.leave_node(&mut ctx, view),
        })?;
    }
    Ok(())
}
