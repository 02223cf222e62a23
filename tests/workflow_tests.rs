//! Workflow tests against an in-memory repository
//!
//! These tests drive install, update, remove and search through a fake
//! [`RepositoryClient`] and check the exact progress lines the operator sees.

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use soak::prelude::*;
use soak::workflow::MIN_FLUSH_INTERVAL;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// Repository serving canned data and counting calls
#[derive(Default)]
struct FakeRepository {
    versions: HashMap<String, VersionInfo>,
    summaries: Vec<PluginSummary>,
    search_error: Option<SoakError>,
    broken_artifacts: HashSet<String>,
    unreachable: HashSet<String>,
    delay: Option<Duration>,
    version_queries: Mutex<Vec<String>>,
    search_calls: AtomicUsize,
    downloads: Mutex<Vec<String>>,
}

impl FakeRepository {
    fn with_plugin(mut self, id: &str, version: &str, deps: &[(&str, &str)]) -> Self {
        let info = VersionInfo {
            plugin_id: id.to_string(),
            version: Version::parse(version).unwrap(),
            release_date: Utc::now(),
            file_size: 16,
            dependencies: deps
                .iter()
                .map(|(dep, ver)| VersionReference::new(*dep, ver).unwrap())
                .collect(),
        };
        self.versions.insert(id.to_string(), info);
        self
    }

    fn with_summary(mut self, id: &str, name: &str, version: &str) -> Self {
        self.summaries.push(PluginSummary {
            id: id.to_string(),
            name: name.to_string(),
            description: format!("{name} does things"),
            web_link: format!("https://ore.example/{name}/{id}"),
            authors: vec!["someone".to_string()],
            creation_date: Utc.with_ymd_and_hms(2017, 3, 1, 12, 0, 0).unwrap(),
            recommended_version: version.to_string(),
        });
        self
    }

    fn with_search_error(mut self, error: SoakError) -> Self {
        self.search_error = Some(error);
        self
    }

    fn with_broken_artifact(mut self, id: &str) -> Self {
        self.broken_artifacts.insert(id.to_string());
        self
    }

    fn with_unreachable(mut self, id: &str) -> Self {
        self.unreachable.insert(id.to_string());
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn version_queries(&self) -> Vec<String> {
        self.version_queries.lock().unwrap().clone()
    }

    fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap().clone()
    }
}

#[async_trait]
impl RepositoryClient for FakeRepository {
    async fn fetch_latest_version_info(&self, plugin_id: &str) -> SoakResult<Option<VersionInfo>> {
        self.version_queries
            .lock()
            .unwrap()
            .push(plugin_id.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.unreachable.contains(plugin_id) {
            return Err(SoakError::transport("connection refused"));
        }
        Ok(self.versions.get(plugin_id).cloned())
    }

    async fn search(&self, _query: &str) -> SoakResult<Vec<PluginSummary>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        match &self.search_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.summaries.clone()),
        }
    }

    async fn fetch_artifact(&self, version: &VersionInfo) -> SoakResult<Option<DownloadedArtifact>> {
        self.downloads
            .lock()
            .unwrap()
            .push(version.plugin_id.clone());
        if self.broken_artifacts.contains(&version.plugin_id) {
            return Err(SoakError::archive("archive holds no entries"));
        }
        let filename = format!("{}-{}.jar", version.plugin_id, version.version);
        DownloadedArtifact::new(&filename, version.plugin_id.as_bytes().to_vec()).map(Some)
    }
}

fn workflow(repo: &Arc<FakeRepository>, registry: PluginRegistry, dir: &TempDir) -> Workflow {
    Workflow::new(
        repo.clone(),
        Arc::new(registry),
        Arc::new(TokioTaskRunner::current().unwrap()),
        dir.path(),
    )
}

async fn run(workflow: &Workflow, command: Command) -> Vec<String> {
    let reporter = ProgressReporter::new();
    workflow.execute(&command, &reporter).await;
    reporter.drain()
}

#[tokio::test]
async fn test_install_with_remote_dependency() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(
        FakeRepository::default()
            .with_plugin("a", "1.0", &[("b", "1.0")])
            .with_plugin("b", "1.0", &[]),
    );
    let workflow = workflow(&repo, PluginRegistry::new(), &dir);

    let lines = run(&workflow, Command::install(["a"]).unwrap()).await;

    assert_eq!(
        lines,
        vec![
            "attempting installation of the plugins a",
            "preparing installation of a version 1.0",
            "a depends on b@1.0",
            "dependency not found locally, searching remote",
            "preparing installation of b version 1.0",
            "will now install b",
            "success",
            "will now install a",
            "success",
        ]
    );
    assert_eq!(repo.downloads(), vec!["b", "a"]);
    assert_eq!(std::fs::read(dir.path().join("a-1.0.jar")).unwrap(), b"a");
    assert!(dir.path().join("b-1.0.jar").is_file());
}

#[tokio::test]
async fn test_outdated_dependency_is_reported_not_updated() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(
        FakeRepository::default()
            .with_plugin("c", "3.1", &[("d", "2.0")])
            .with_plugin("d", "2.0", &[]),
    );
    let registry = PluginRegistry::from_plugins([InstalledPlugin::new("d", "Delta", Some("1.5"))]);
    let workflow = workflow(&repo, registry, &dir);

    let lines = run(&workflow, Command::install(["c"]).unwrap()).await;

    assert_eq!(
        lines,
        vec![
            "attempting installation of the plugins c",
            "preparing installation of c version 3.1",
            "c depends on d@2.0",
            "Delta requires update from 1.5 to 2.0",
            "will now install c",
            "success",
        ]
    );
    assert_eq!(repo.version_queries(), vec!["c"]);
    assert_eq!(repo.downloads(), vec!["c"]);
}

#[tokio::test]
async fn test_satisfied_and_unknown_installed_versions() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(FakeRepository::default().with_plugin(
        "e",
        "1.0",
        &[("f", "2.0"), ("g", "1.0")],
    ));
    let registry = PluginRegistry::from_plugins([
        // Trailing zero segments compare equal
        InstalledPlugin::new("f", "Foxtrot", Some("2.0.0")),
        InstalledPlugin::new("g", "Golf", None),
    ]);
    let workflow = workflow(&repo, registry, &dir);

    let lines = run(&workflow, Command::install(["e"]).unwrap()).await;

    assert_eq!(
        lines,
        vec![
            "attempting installation of the plugins e",
            "preparing installation of e version 1.0",
            "e depends on f@2.0",
            "dependency satisfied",
            "e depends on g@1.0",
            "version unknown for plugin Golf, assuming compatible",
            "will now install e",
            "success",
        ]
    );
    assert_eq!(repo.version_queries(), vec!["e"]);
}

#[tokio::test]
async fn test_missing_dependency_does_not_block_parent() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(FakeRepository::default().with_plugin("a", "1.0", &[("ghost", "1.0")]));
    let workflow = workflow(&repo, PluginRegistry::new(), &dir);

    let lines = run(&workflow, Command::install(["a"]).unwrap()).await;

    assert_eq!(
        lines,
        vec![
            "attempting installation of the plugins a",
            "preparing installation of a version 1.0",
            "a depends on ghost@1.0",
            "dependency not found locally, searching remote",
            "could not find dependency ghost",
            "will now install a",
            "success",
        ]
    );
}

#[tokio::test]
async fn test_unreachable_dependency_is_reported() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(
        FakeRepository::default()
            .with_plugin("a", "1.0", &[("flaky", "1.0")])
            .with_unreachable("flaky"),
    );
    let workflow = workflow(&repo, PluginRegistry::new(), &dir);

    let lines = run(&workflow, Command::install(["a"]).unwrap()).await;

    assert!(lines.contains(
        &"failed to query remote for flaky: Transport error: connection refused".to_string()
    ));
    assert_eq!(lines.last().unwrap(), "success");
}

#[tokio::test]
async fn test_cyclic_dependencies_terminate() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(
        FakeRepository::default()
            .with_plugin("a", "1.0", &[("b", "1.0")])
            .with_plugin("b", "1.0", &[("a", "1.0")]),
    );
    let workflow = workflow(&repo, PluginRegistry::new(), &dir);

    let lines = run(&workflow, Command::install(["a"]).unwrap()).await;

    assert_eq!(
        lines,
        vec![
            "attempting installation of the plugins a",
            "preparing installation of a version 1.0",
            "a depends on b@1.0",
            "dependency not found locally, searching remote",
            "preparing installation of b version 1.0",
            "b depends on a@1.0",
            "circular dependency on a, skipping",
            "will now install b",
            "success",
            "will now install a",
            "success",
        ]
    );
}

#[tokio::test]
async fn test_shared_dependency_is_resolved_once_per_path() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(
        FakeRepository::default()
            .with_plugin("a", "1.0", &[("b", "1.0"), ("c", "1.0")])
            .with_plugin("b", "1.0", &[("d", "1.0")])
            .with_plugin("c", "1.0", &[("d", "1.0")])
            .with_plugin("d", "1.0", &[]),
    );
    let workflow = workflow(&repo, PluginRegistry::new(), &dir);

    let lines = run(&workflow, Command::install(["a"]).unwrap()).await;

    assert_eq!(
        lines,
        vec![
            "attempting installation of the plugins a",
            "preparing installation of a version 1.0",
            "a depends on b@1.0",
            "dependency not found locally, searching remote",
            "preparing installation of b version 1.0",
            "b depends on d@1.0",
            "dependency not found locally, searching remote",
            "preparing installation of d version 1.0",
            "will now install d",
            "success",
            "will now install b",
            "success",
            "a depends on c@1.0",
            "dependency not found locally, searching remote",
            "preparing installation of c version 1.0",
            "c depends on d@1.0",
            "dependency not found locally, searching remote",
            "preparing installation of d version 1.0",
            "will now install d",
            "success",
            "will now install c",
            "success",
            "will now install a",
            "success",
        ]
    );
    // d is reached through b and through c, and fetched on both paths
    assert_eq!(repo.version_queries(), vec!["a", "b", "d", "c", "d"]);
    assert_eq!(repo.downloads(), vec!["d", "b", "d", "c", "a"]);
    assert!(dir.path().join("d-1.0.jar").is_file());
}

#[tokio::test]
async fn test_failed_dependency_artifact_is_not_fatal() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(
        FakeRepository::default()
            .with_plugin("a", "1.0", &[("b", "1.0")])
            .with_plugin("b", "1.0", &[])
            .with_broken_artifact("b"),
    );
    let workflow = workflow(&repo, PluginRegistry::new(), &dir);

    let lines = run(&workflow, Command::install(["a"]).unwrap()).await;

    assert_eq!(
        &lines[5..],
        &[
            "will now install b",
            "failed to install b: Archive error: archive holds no entries",
            "will now install a",
            "success",
        ]
    );
    assert!(!dir.path().join("b-1.0.jar").exists());
    assert!(dir.path().join("a-1.0.jar").exists());
}

#[tokio::test]
async fn test_unknown_id_skipped_and_siblings_continue() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(
        FakeRepository::default()
            .with_plugin("a", "1.0", &[])
            .with_plugin("broken", "2.0", &[])
            .with_broken_artifact("broken"),
    );
    let workflow = workflow(&repo, PluginRegistry::new(), &dir);

    let lines = run(&workflow, Command::install(["ghost", "broken", "a"]).unwrap()).await;

    assert_eq!(
        lines,
        vec![
            "attempting installation of the plugins ghost, broken, a",
            "plugin id 'ghost' not found, skipping",
            "preparing installation of broken version 2.0",
            "will now install broken",
            "failed to install broken: Archive error: archive holds no entries",
            "preparing installation of a version 1.0",
            "will now install a",
            "success",
        ]
    );
}

#[tokio::test]
async fn test_install_creates_plugin_dir_and_overwrites() {
    let dir = TempDir::new().unwrap();
    let plugin_dir = dir.path().join("server").join("mods");
    let repo = Arc::new(FakeRepository::default().with_plugin("a", "1.0", &[]));
    std::fs::create_dir_all(&plugin_dir).unwrap();
    std::fs::write(plugin_dir.join("a-1.0.jar"), b"stale").unwrap();

    let workflow = Workflow::new(
        repo.clone(),
        Arc::new(PluginRegistry::new()),
        Arc::new(TokioTaskRunner::current().unwrap()),
        &plugin_dir,
    );
    run(&workflow, Command::install(["a"]).unwrap()).await;

    assert_eq!(std::fs::read(plugin_dir.join("a-1.0.jar")).unwrap(), b"a");
}

#[tokio::test]
async fn test_update_skips_virtual_plugins() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(
        FakeRepository::default()
            .with_plugin("alpha", "1.0", &[])
            .with_plugin("minecraft", "1.12.2", &[]),
    );
    let registry = PluginRegistry::from_plugins([
        InstalledPlugin::new("alpha", "Alpha", Some("0.9")),
        InstalledPlugin::virtual_entry("minecraft", "Minecraft"),
        InstalledPlugin::new("gone", "Gone", None),
    ]);
    let workflow = workflow(&repo, registry, &dir);

    let lines = run(&workflow, Command::Update).await;

    assert_eq!(
        lines,
        vec![
            "querying latest version of Alpha (current=0.9)",
            "preparing installation of alpha version 1.0",
            "will now install alpha",
            "success",
            "querying latest version of Gone (current=unknown)",
            "not found in the plugin repository",
        ]
    );
    assert_eq!(repo.version_queries(), vec!["alpha", "gone"]);
}

#[tokio::test]
async fn test_remove_emits_nothing() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(FakeRepository::default());
    let workflow = workflow(&repo, PluginRegistry::new(), &dir);

    let lines = run(&workflow, Command::remove(["alpha"]).unwrap()).await;

    assert!(lines.is_empty());
    assert!(repo.version_queries().is_empty());
}

#[tokio::test]
async fn test_search_renders_four_lines_per_plugin() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(
        FakeRepository::default()
            .with_summary("nucleus", "Nucleus", "1.2.0")
            .with_summary("nucleus-addon", "NucleusAddon", "0.1"),
    );
    let workflow = workflow(&repo, PluginRegistry::new(), &dir);

    let lines = run(&workflow, Command::search("nucleus").unwrap()).await;

    assert_eq!(
        lines,
        vec![
            "the following plugins were found for the query 'nucleus':",
            "Nucleus (id=nucleus)",
            "  version: 1.2.0",
            "  description: Nucleus does things",
            "  link: https://ore.example/Nucleus/nucleus",
            "NucleusAddon (id=nucleus-addon)",
            "  version: 0.1",
            "  description: NucleusAddon does things",
            "  link: https://ore.example/NucleusAddon/nucleus-addon",
        ]
    );
}

#[tokio::test]
async fn test_search_without_results() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(FakeRepository::default());
    let workflow = workflow(&repo, PluginRegistry::new(), &dir);

    let lines = run(&workflow, Command::search("nothing").unwrap()).await;

    assert_eq!(lines, vec!["no plugins found for query 'nothing'"]);
}

#[tokio::test]
async fn test_search_failure_is_reported() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(
        FakeRepository::default().with_search_error(SoakError::transport("timed out")),
    );
    let workflow = workflow(&repo, PluginRegistry::new(), &dir);

    let lines = run(&workflow, Command::search("nucleus").unwrap()).await;

    assert_eq!(
        lines,
        vec!["search for 'nucleus' failed: Transport error: timed out"]
    );
}

#[tokio::test]
async fn test_schedule_rejects_invalid_commands_before_any_call() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(FakeRepository::default());
    let workflow = workflow(&repo, PluginRegistry::new(), &dir);
    let session = RecordingSession::new();

    let short = Command::Search {
        query: "ab".to_string(),
    };
    let err = workflow
        .schedule(short, Arc::new(session.clone()))
        .unwrap_err();
    assert!(matches!(err, SoakError::Validation(_)));

    let empty = Command::Install { plugin_ids: vec![] };
    assert!(workflow.schedule(empty, Arc::new(session.clone())).is_err());

    tokio::task::yield_now().await;
    assert_eq!(repo.search_calls.load(Ordering::SeqCst), 0);
    assert!(repo.version_queries().is_empty());
    assert_eq!(session.batch_count(), 0);
}

#[tokio::test]
async fn test_schedule_delivers_every_line() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(
        FakeRepository::default()
            .with_plugin("a", "1.0", &[("b", "1.0")])
            .with_plugin("b", "1.0", &[]),
    );
    let workflow = workflow(&repo, PluginRegistry::new(), &dir);
    let session = RecordingSession::new();

    let handle = workflow
        .schedule(Command::install(["a"]).unwrap(), Arc::new(session.clone()))
        .unwrap();
    handle.join().await.unwrap();

    assert_eq!(
        session.lines(),
        vec![
            "attempting installation of the plugins a",
            "preparing installation of a version 1.0",
            "a depends on b@1.0",
            "dependency not found locally, searching remote",
            "preparing installation of b version 1.0",
            "will now install b",
            "success",
            "will now install a",
            "success",
        ]
    );
}

#[tokio::test]
async fn test_remove_delivers_no_batches() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(FakeRepository::default());
    let workflow = workflow(&repo, PluginRegistry::new(), &dir)
        .with_flush_interval(Duration::from_millis(5));
    let session = RecordingSession::new();

    let handle = workflow
        .schedule(Command::remove(["a"]).unwrap(), Arc::new(session.clone()))
        .unwrap();
    handle.join().await.unwrap();

    assert_eq!(session.batch_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_progress_arrives_while_workflow_runs() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(
        FakeRepository::default()
            .with_plugin("a", "1.0", &[])
            .with_delay(Duration::from_millis(200)),
    );
    let workflow = workflow(&repo, PluginRegistry::new(), &dir)
        .with_flush_interval(Duration::from_millis(50));
    let session = RecordingSession::new();

    let handle = workflow
        .schedule(Command::install(["a"]).unwrap(), Arc::new(session.clone()))
        .unwrap();

    // The header is flushed while the version query is still pending
    tokio::time::sleep(Duration::from_millis(120)).await;
    assert_eq!(
        session.batches(),
        vec![vec!["attempting installation of the plugins a".to_string()]]
    );

    handle.join().await.unwrap();
    assert!(session.batch_count() >= 2);
    assert_eq!(
        session.lines(),
        vec![
            "attempting installation of the plugins a",
            "preparing installation of a version 1.0",
            "will now install a",
            "success",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_zero_flush_interval_still_streams() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(
        FakeRepository::default()
            .with_plugin("a", "1.0", &[])
            .with_delay(Duration::from_millis(200)),
    );
    let workflow =
        workflow(&repo, PluginRegistry::new(), &dir).with_flush_interval(Duration::ZERO);
    assert_eq!(workflow.flush_interval(), MIN_FLUSH_INTERVAL);
    let session = RecordingSession::new();

    let handle = workflow
        .schedule(Command::install(["a"]).unwrap(), Arc::new(session.clone()))
        .unwrap();

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(session.lines(), vec!["attempting installation of the plugins a"]);

    handle.join().await.unwrap();
    assert_eq!(session.lines().last().unwrap(), "success");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_concurrent_installs_of_same_plugin() {
    let dir = TempDir::new().unwrap();
    let repo = Arc::new(FakeRepository::default().with_plugin("a", "1.0", &[]));
    let workflow = workflow(&repo, PluginRegistry::new(), &dir);
    let first = RecordingSession::new();
    let second = RecordingSession::new();

    let one = workflow
        .schedule(Command::install(["a"]).unwrap(), Arc::new(first.clone()))
        .unwrap();
    let two = workflow
        .clone()
        .schedule(Command::install(["a"]).unwrap(), Arc::new(second.clone()))
        .unwrap();
    one.join().await.unwrap();
    two.join().await.unwrap();

    assert_eq!(first.lines().last().unwrap(), "success");
    assert_eq!(second.lines().last().unwrap(), "success");
    assert_eq!(std::fs::read(dir.path().join("a-1.0.jar")).unwrap(), b"a");
}
