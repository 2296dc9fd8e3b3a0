//! Integration test: files end-to-end through `Checker`.
//!
//! Each test registers its own small checks so that counters kept in
//! statics never leak between tests running in parallel.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};
use treewalk_core::{
    AuditListener, Check, CheckContext, CheckError, CheckMetadata, Checker, CheckerError, Config, FileCache,
    FileContents, FilePanic, ModuleConfig, ModuleFactory, ModuleRegistry, Mutability, NodeKind, NodeRef, Severity,
    WalkError, Walker, CHECKER_MODULE, GENERAL_EXCEPTION, WALKER_MODULE,
};

// --- test checks ---

/// Reports the number of methods of each file at line 1.
#[derive(Default)]
struct MethodCounter {
    count: usize,
}

impl CheckMetadata for MethodCounter {
    fn name(&self) -> &'static str {
        "MethodCounter"
    }

    fn mutability(&self) -> Option<Mutability> {
        Some(Mutability::FileStateful)
    }
}

impl Check for MethodCounter {
    fn default_kinds(&self) -> Vec<NodeKind> {
        vec![NodeKind::MethodDef]
    }

    fn begin_tree(&mut self, _ctx: &mut CheckContext<'_>, _root: Option<NodeRef<'_>>) -> Result<(), CheckError> {
        self.count = 0;
        Ok(())
    }

    fn visit_node(&mut self, _ctx: &mut CheckContext<'_>, _node: NodeRef<'_>) -> Result<(), CheckError> {
        // widen the window in which two files could interleave
        std::thread::yield_now();
        self.count += 1;
        Ok(())
    }

    fn finish_tree(&mut self, ctx: &mut CheckContext<'_>, _root: Option<NodeRef<'_>>) -> Result<(), CheckError> {
        ctx.log_line(1, "methods", &[&self.count]);
        Ok(())
    }
}

/// Reports every identifier.
struct IdentReporter;

impl CheckMetadata for IdentReporter {
    fn name(&self) -> &'static str {
        "IdentReporter"
    }

    fn mutability(&self) -> Option<Mutability> {
        Some(Mutability::Stateless)
    }
}

impl Check for IdentReporter {
    fn default_kinds(&self) -> Vec<NodeKind> {
        vec![NodeKind::Ident]
    }

    fn visit_node(&mut self, ctx: &mut CheckContext<'_>, node: NodeRef<'_>) -> Result<(), CheckError> {
        ctx.log(node, "ident", &[&node.text()]);
        Ok(())
    }
}

static CACHE_VISITS: AtomicUsize = AtomicUsize::new(0);

/// Counts class visits and reports nothing.
struct Silent;

impl CheckMetadata for Silent {
    fn name(&self) -> &'static str {
        "Silent"
    }

    fn mutability(&self) -> Option<Mutability> {
        Some(Mutability::Stateless)
    }
}

impl Check for Silent {
    fn default_kinds(&self) -> Vec<NodeKind> {
        vec![NodeKind::ClassDef]
    }

    fn visit_node(&mut self, _ctx: &mut CheckContext<'_>, _node: NodeRef<'_>) -> Result<(), CheckError> {
        CACHE_VISITS.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Fails on files declaring a class named `Bad`.
struct FailOnBad;

impl CheckMetadata for FailOnBad {
    fn name(&self) -> &'static str {
        "FailOnBad"
    }

    fn mutability(&self) -> Option<Mutability> {
        Some(Mutability::Stateless)
    }
}

impl Check for FailOnBad {
    fn default_kinds(&self) -> Vec<NodeKind> {
        vec![NodeKind::Ident]
    }

    fn visit_node(&mut self, ctx: &mut CheckContext<'_>, node: NodeRef<'_>) -> Result<(), CheckError> {
        if node.text() == "Bad" {
            return Err(CheckError::new("FailOnBad", "found Bad"));
        }
        ctx.log(node, "fine", &[]);
        Ok(())
    }
}

/// Panics on every class.
struct Panicky;

impl CheckMetadata for Panicky {
    fn name(&self) -> &'static str {
        "Panicky"
    }
}

impl Check for Panicky {
    fn default_kinds(&self) -> Vec<NodeKind> {
        vec![NodeKind::ClassDef]
    }

    fn visit_node(&mut self, _ctx: &mut CheckContext<'_>, _node: NodeRef<'_>) -> Result<(), CheckError> {
        panic!("kaboom");
    }
}

static LIFECYCLE_INITS: AtomicUsize = AtomicUsize::new(0);
static LIFECYCLE_DESTROYS: AtomicUsize = AtomicUsize::new(0);

/// Counts `init` and `destroy` calls; declares no mutability class.
struct Lifecycle;

impl CheckMetadata for Lifecycle {
    fn name(&self) -> &'static str {
        "Lifecycle"
    }
}

impl Check for Lifecycle {
    fn default_kinds(&self) -> Vec<NodeKind> {
        vec![NodeKind::ClassDef]
    }

    fn init(&mut self) {
        LIFECYCLE_INITS.fetch_add(1, Ordering::SeqCst);
    }

    fn destroy(&mut self) {
        LIFECYCLE_DESTROYS.fetch_add(1, Ordering::SeqCst);
    }
}

static GLOBAL_IDS: AtomicUsize = AtomicUsize::new(0);
static UNDECLARED_IDS: AtomicUsize = AtomicUsize::new(0);
static STATELESS_IDS: AtomicUsize = AtomicUsize::new(0);

/// Reports, for each file, its instance id and how many files that instance
/// has seen so far.
struct Numbered {
    name: &'static str,
    mutability: Option<Mutability>,
    id: usize,
    seen: usize,
}

impl Numbered {
    fn new(name: &'static str, mutability: Option<Mutability>, ids: &AtomicUsize) -> Self {
        Self {
            name,
            mutability,
            id: ids.fetch_add(1, Ordering::SeqCst),
            seen: 0,
        }
    }
}

impl CheckMetadata for Numbered {
    fn name(&self) -> &'static str {
        self.name
    }

    fn mutability(&self) -> Option<Mutability> {
        self.mutability
    }
}

impl Check for Numbered {
    fn default_kinds(&self) -> Vec<NodeKind> {
        vec![NodeKind::ClassDef]
    }

    fn begin_tree(&mut self, _ctx: &mut CheckContext<'_>, _root: Option<NodeRef<'_>>) -> Result<(), CheckError> {
        std::thread::yield_now();
        self.seen += 1;
        Ok(())
    }

    fn finish_tree(&mut self, ctx: &mut CheckContext<'_>, _root: Option<NodeRef<'_>>) -> Result<(), CheckError> {
        ctx.log_line(1, "numbered", &[&self.id, &self.seen]);
        Ok(())
    }
}

static DISPATCH_LOG: Mutex<Vec<&'static str>> = Mutex::new(Vec::new());

/// Appends its name to [`DISPATCH_LOG`] on every identifier.
struct Tracer(&'static str);

impl CheckMetadata for Tracer {
    fn name(&self) -> &'static str {
        self.0
    }

    fn mutability(&self) -> Option<Mutability> {
        Some(Mutability::Stateless)
    }
}

impl Check for Tracer {
    fn default_kinds(&self) -> Vec<NodeKind> {
        vec![NodeKind::Ident]
    }

    fn visit_node(&mut self, _ctx: &mut CheckContext<'_>, _node: NodeRef<'_>) -> Result<(), CheckError> {
        DISPATCH_LOG.lock().unwrap().push(self.0);
        Ok(())
    }
}

// --- helpers ---

fn factory() -> Arc<dyn ModuleFactory> {
    Arc::new(
        ModuleRegistry::with_filters()
            .check("MethodCounter", || Box::new(MethodCounter::default()))
            .check("IdentReporter", || Box::new(IdentReporter))
            .check("Silent", || Box::new(Silent))
            .check("FailOnBad", || Box::new(FailOnBad))
            .check("Panicky", || Box::new(Panicky))
            .check("Lifecycle", || Box::new(Lifecycle))
            .check("TracerB", || Box::new(Tracer("TracerB")))
            .check("TracerA", || Box::new(Tracer("TracerA")))
            .check("GlobalNumbered", || {
                Box::new(Numbered::new("GlobalNumbered", Some(Mutability::GlobalStateful), &GLOBAL_IDS))
            })
            .check("UndeclaredNumbered", || {
                Box::new(Numbered::new("UndeclaredNumbered", None, &UNDECLARED_IDS))
            })
            .check("StatelessNumbered", || {
                Box::new(Numbered::new("StatelessNumbered", Some(Mutability::Stateless), &STATELESS_IDS))
            }),
    )
}

fn tree_with(modules: &[&str]) -> ModuleConfig {
    let walker = modules
        .iter()
        .fold(ModuleConfig::new(WALKER_MODULE), |w, m| w.with_child(ModuleConfig::new(*m)));
    ModuleConfig::new(CHECKER_MODULE).with_child(walker)
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn class_with_methods(name: &str, methods: usize) -> String {
    let body: String = (0..methods).map(|i| format!("  void m{i}() {{ }}\n")).collect();
    format!("class {name} {{\n{body}}}\n")
}

#[derive(Clone, Default)]
struct Recording(Arc<Mutex<Vec<String>>>);

impl AuditListener for Recording {
    fn audit_started(&mut self) {
        self.0.lock().unwrap().push("start".into());
    }

    fn file_started(&mut self, path: &Path) {
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        self.0.lock().unwrap().push(name);
    }

    fn audit_finished(&mut self, _report: &treewalk_core::AuditReport) {
        self.0.lock().unwrap().push("end".into());
    }
}

// --- determinism and isolation ---

#[test]
fn walker_output_is_deterministic() {
    let config = ModuleConfig::new(WALKER_MODULE)
        .with_child(ModuleConfig::new("IdentReporter"))
        .with_child(ModuleConfig::new("MethodCounter"));
    let mut walker = Walker::new(factory(), Arc::new(treewalk_core::JavaSubsetParser), &config).unwrap();
    let contents = FileContents::new("A.java", "class A {\n  int b, a;\n  void c() { int d = b + a; }\n}\n");

    let first = walker.process_file(&contents).unwrap();
    let second = walker.process_file(&contents).unwrap();
    assert_eq!(first, second);
    assert!(first.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(first.iter().filter(|v| v.key == "ident").count(), 7);
    assert_eq!(first.iter().filter(|v| v.key == "methods").count(), 1);
}

#[test]
fn file_stateful_clones_keep_counts_per_file() {
    let dir = tempfile::tempdir().unwrap();
    let files: Vec<PathBuf> = (0..24)
        .map(|i| write(dir.path(), &format!("F{i}.java"), &class_with_methods(&format!("F{i}"), i % 6)))
        .collect();

    let mut checker = Checker::builder()
        .factory(factory())
        .config(tree_with(&["MethodCounter"]))
        .threads(4)
        .build()
        .unwrap();
    let report = checker.process(&files).unwrap();

    assert_eq!(report.files.len(), 24);
    for (i, file) in report.files.iter().enumerate() {
        assert_eq!(file.path, files[i], "reports follow input order");
        assert_eq!(file.violations.len(), 1);
        assert_eq!(file.violations[0].args, vec![(i % 6).to_string()]);
    }
}

/// Runs `module` over `count` one-class files on four threads and returns
/// `(instance id, files seen by that instance)` per file.
fn numbered_run(module: &str, count: usize) -> Vec<(usize, usize)> {
    let dir = tempfile::tempdir().unwrap();
    let files: Vec<PathBuf> = (0..count)
        .map(|i| write(dir.path(), &format!("N{i}.java"), &class_with_methods(&format!("N{i}"), 0)))
        .collect();
    let mut checker = Checker::builder()
        .factory(factory())
        .config(tree_with(&[module]))
        .threads(4)
        .build()
        .unwrap();
    let report = checker.process(&files).unwrap();
    report
        .files
        .iter()
        .map(|f| {
            assert_eq!(f.violations.len(), 1);
            let args = &f.violations[0].args;
            (args[0].parse().unwrap(), args[1].parse().unwrap())
        })
        .collect()
}

/// Checks that every instance saw its own files numbered 1, 2, 3, ...
fn assert_private_counters(seen: &[(usize, usize)]) -> usize {
    let mut per_instance: std::collections::BTreeMap<usize, Vec<usize>> = std::collections::BTreeMap::new();
    for (id, n) in seen {
        per_instance.entry(*id).or_default().push(*n);
    }
    for counts in per_instance.values_mut() {
        counts.sort_unstable();
        assert_eq!(*counts, (1..=counts.len()).collect::<Vec<_>>());
    }
    per_instance.len()
}

#[test]
fn global_stateful_check_is_one_instance_for_all_workers() {
    let seen = numbered_run("GlobalNumbered", 20);

    let first_id = seen[0].0;
    assert!(seen.iter().all(|(id, _)| *id == first_id));
    let mut counts: Vec<usize> = seen.iter().map(|(_, n)| *n).collect();
    counts.sort_unstable();
    assert_eq!(counts, (1..=20).collect::<Vec<_>>());
    assert_eq!(GLOBAL_IDS.load(Ordering::SeqCst), 1, "never re-created for a worker");
}

#[test]
fn undeclared_check_is_cloned_per_worker() {
    let seen = numbered_run("UndeclaredNumbered", 20);
    let instances = assert_private_counters(&seen);
    assert!((1..=4).contains(&instances), "{instances} instances");
    assert!(seen.iter().all(|(id, _)| *id > 0), "the original is not used by workers");
}

#[test]
fn stateless_check_runs_on_worker_copies() {
    let seen = numbered_run("StatelessNumbered", 20);
    let instances = assert_private_counters(&seen);
    assert!((1..=4).contains(&instances), "{instances} instances");
    assert!(seen.iter().all(|(id, _)| *id > 0), "the original is not used by workers");
}

#[test]
fn sequential_and_parallel_runs_agree() {
    let dir = tempfile::tempdir().unwrap();
    let files: Vec<PathBuf> = (0..10)
        .map(|i| write(dir.path(), &format!("P{i}.java"), &class_with_methods(&format!("P{i}"), i)))
        .collect();

    let run = |threads| {
        let mut checker = Checker::builder()
            .factory(factory())
            .config(tree_with(&["IdentReporter", "MethodCounter"]))
            .threads(threads)
            .build()
            .unwrap();
        let report = checker.process(&files).unwrap();
        report.files.into_iter().map(|f| f.violations).collect::<Vec<_>>()
    };
    assert_eq!(run(1), run(3));
}

#[test]
fn dispatch_order_does_not_depend_on_registration_order() {
    let contents = FileContents::new("A.java", "class A { }");
    let run = |modules: &[&str]| {
        let config = modules
            .iter()
            .fold(ModuleConfig::new(WALKER_MODULE), |w, m| w.with_child(ModuleConfig::new(*m)));
        let mut walker = Walker::new(factory(), Arc::new(treewalk_core::JavaSubsetParser), &config).unwrap();
        DISPATCH_LOG.lock().unwrap().clear();
        walker.process_file(&contents).unwrap();
        DISPATCH_LOG.lock().unwrap().clone()
    };
    let forward = run(&["TracerA", "TracerB"]);
    let backward = run(&["TracerB", "TracerA"]);
    assert_eq!(forward, vec!["TracerA", "TracerB"]);
    assert_eq!(forward, backward);
}

// --- cache ---

#[test]
fn unchanged_files_are_skipped_on_the_second_run() {
    let dir = tempfile::tempdir().unwrap();
    let source = write(dir.path(), "Clean.java", "class Clean { }\n");
    let cache_path = dir.path().join("cache").join("results.json");
    let tree = tree_with(&["Silent"]);

    let run = || {
        let mut checker = Checker::builder()
            .factory(factory())
            .config(tree.clone())
            .cache(Box::new(FileCache::load(&cache_path, &tree).unwrap()))
            .build()
            .unwrap();
        checker.process(std::slice::from_ref(&source)).unwrap()
    };

    let first = run();
    assert!(!first.files[0].cached);
    let visits = CACHE_VISITS.load(Ordering::SeqCst);
    assert_eq!(visits, 1);

    let second = run();
    assert!(second.files[0].cached);
    assert!(second.files[0].violations.is_empty());
    assert_eq!(CACHE_VISITS.load(Ordering::SeqCst), visits, "no check ran");

    std::fs::write(&source, "class Clean { int x; }\n").unwrap();
    let later = SystemTime::now() + Duration::from_secs(5);
    std::fs::File::options()
        .write(true)
        .open(&source)
        .unwrap()
        .set_modified(later)
        .unwrap();
    let third = run();
    assert!(!third.files[0].cached);
    assert_eq!(CACHE_VISITS.load(Ordering::SeqCst), visits + 1);
}

#[test]
fn files_with_violations_are_not_cached() {
    let dir = tempfile::tempdir().unwrap();
    let source = write(dir.path(), "Noisy.java", "class Noisy { }\n");
    let cache_path = dir.path().join("results.json");
    let tree = tree_with(&["IdentReporter"]);

    for _ in 0..2 {
        let mut checker = Checker::builder()
            .factory(factory())
            .config(tree.clone())
            .cache(Box::new(FileCache::load(&cache_path, &tree).unwrap()))
            .build()
            .unwrap();
        let report = checker.process(std::slice::from_ref(&source)).unwrap();
        assert!(!report.files[0].cached);
        assert_eq!(report.files[0].violations.len(), 1);
    }
}

// --- errors ---

#[test]
fn check_failure_halts_with_the_file_path() {
    let dir = tempfile::tempdir().unwrap();
    let good = write(dir.path(), "Good.java", "class Good { }\n");
    let bad = write(dir.path(), "Bad.java", "class Bad { }\n");

    for threads in [1, 2] {
        let mut checker = Checker::builder()
            .factory(factory())
            .config(tree_with(&["FailOnBad"]))
            .threads(threads)
            .build()
            .unwrap();
        let err = checker.process(&[good.clone(), bad.clone()]).unwrap_err();
        match err {
            CheckerError::File(WalkError::Check { path, source }) => {
                assert_eq!(path, bad);
                assert_eq!(source.message, "found Bad");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}

#[test]
fn check_failure_becomes_a_violation_without_halting() {
    let dir = tempfile::tempdir().unwrap();
    let good = write(dir.path(), "Good.java", "class Good { }\n");
    let bad = write(dir.path(), "Bad.java", "class Bad { }\n");

    let mut checker = Checker::builder()
        .factory(factory())
        .config(tree_with(&["FailOnBad"]))
        .halt_on_exception(false)
        .build()
        .unwrap();
    let report = checker.process(&[good, bad]).unwrap();
    assert_eq!(report.files[0].violations[0].key, "fine");
    let failed = &report.files[1].violations;
    assert_eq!(failed.len(), 1, "no partial violations survive");
    assert_eq!(failed[0].key, GENERAL_EXCEPTION);
    assert!(failed[0].message.contains("found Bad"));
}

#[test]
fn panics_reach_the_caller_with_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = write(dir.path(), "A.java", "class A { }\n");
    for threads in [1, 2] {
        let mut checker = Checker::builder()
            .factory(factory())
            .config(tree_with(&["Panicky"]))
            .threads(threads)
            .build()
            .unwrap();
        let files = [file.clone()];
        let payload = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| checker.process(&files))).unwrap_err();
        let panic = payload.downcast::<FilePanic>().unwrap();
        assert_eq!(panic.path, file);
        assert_eq!(panic.message, "kaboom");
        assert!(panic.to_string().contains("A.java"));
    }
}

#[test]
fn unreadable_file_is_reported_as_violation() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("Missing.java");
    let mut checker = Checker::builder()
        .factory(factory())
        .config(tree_with(&["IdentReporter"]))
        .build()
        .unwrap();
    let report = checker.process(&[missing]).unwrap();
    assert_eq!(report.files[0].violations[0].key, GENERAL_EXCEPTION);
    assert_eq!(report.threshold_count, 1);
}

#[test]
fn parse_failure_is_skipped_when_configured() {
    let dir = tempfile::tempdir().unwrap();
    let broken = write(dir.path(), "Broken.java", "class Broken {\n  int x\n}\n");

    let mut strict = Checker::builder()
        .factory(factory())
        .config(tree_with(&["IdentReporter"]))
        .build()
        .unwrap();
    assert!(matches!(
        strict.process(std::slice::from_ref(&broken)),
        Err(CheckerError::File(WalkError::Parse { .. }))
    ));

    let mut lenient = Checker::builder()
        .factory(factory())
        .config(tree_with(&["IdentReporter"]))
        .skip_on_parse_error(Severity::Warning)
        .build()
        .unwrap();
    let report = lenient.process(&[broken]).unwrap();
    let violations = &report.files[0].violations;
    assert_eq!(violations.len(), 1);
    assert_eq!(violations[0].severity, Severity::Warning);
    assert_eq!(report.threshold_count, 0, "warnings are below the default threshold");
}

#[test]
fn unknown_module_fails_before_any_file() {
    let err = Checker::builder()
        .factory(factory())
        .config(tree_with(&["NoSuchCheck"]))
        .build()
        .unwrap_err();
    assert!(matches!(err, CheckerError::Config(_)));
}

// --- configuration, filters and listeners ---

#[test]
fn configuration_file_drives_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let kept = write(dir.path(), "Kept.java", "class Kept { }\n");
    let skipped = write(dir.path(), "Skipped.java", "class Skipped { }\n");
    let other = write(dir.path(), "notes.txt", "not java");

    let config = Config::parse(
        r#"
        [checker]
        severity = "warning"
        file_extensions = ["java"]

        [[module]]
        name = "IdentReporter"
        severity = "warning"

        [[module]]
        name = "MethodCounter"
        severity = "ignore"

        [[file_filter]]
        name = "ExcludeFiles"
        file_name_pattern = "Skipped"
        "#,
    )
    .unwrap();

    let mut checker = Checker::builder().factory(factory()).config(config.module_tree()).build().unwrap();
    assert_eq!(checker.severity_threshold(), Severity::Warning);
    let report = checker.process(&[kept.clone(), skipped, other]).unwrap();

    assert_eq!(report.files.len(), 1);
    assert_eq!(report.files[0].path, kept);
    let keys: Vec<&str> = report.files[0].violations.iter().map(|v| v.key.as_str()).collect();
    assert_eq!(keys, vec!["ident"], "ignore-severity violations are dropped");
    assert_eq!(report.threshold_count, 1);
}

#[test]
fn listener_sees_files_in_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let files: Vec<PathBuf> = (0..12)
        .map(|i| write(dir.path(), &format!("L{i}.java"), &class_with_methods(&format!("L{i}"), 12 - i)))
        .collect();
    let recording = Recording::default();

    let mut checker = Checker::builder()
        .factory(factory())
        .config(tree_with(&["MethodCounter"]))
        .threads(4)
        .listener(Box::new(recording.clone()))
        .build()
        .unwrap();
    checker.process(&files).unwrap();

    let mut expected = vec!["start".to_string()];
    expected.extend((0..12).map(|i| format!("L{i}.java")));
    expected.push("end".to_string());
    assert_eq!(*recording.0.lock().unwrap(), expected);
}

#[test]
fn every_instance_is_destroyed_once() {
    let dir = tempfile::tempdir().unwrap();
    let files: Vec<PathBuf> = (0..16)
        .map(|i| write(dir.path(), &format!("D{i}.java"), &class_with_methods(&format!("D{i}"), 1)))
        .collect();

    let mut checker = Checker::builder()
        .factory(factory())
        .config(tree_with(&["Lifecycle"]))
        .threads(4)
        .build()
        .unwrap();
    checker.process(&files).unwrap();
    checker.destroy();
    checker.destroy();
    drop(checker);

    let inits = LIFECYCLE_INITS.load(Ordering::SeqCst);
    assert!(inits >= 2, "original plus at least one worker clone");
    assert_eq!(LIFECYCLE_DESTROYS.load(Ordering::SeqCst), inits);
}
