//! End-to-end toolbox workflow tests
//!
//! Tools are `sh` stubs so no Python installation is needed; the package
//! environment is in memory.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tempfile::TempDir;
use toolbox::config::Config;
use toolbox::deps::MemoryEnvironment;
use toolbox::error::{EXIT_DEPENDENCY_UNSATISFIED, EXIT_UNKNOWN_TOOL};
use toolbox::{Toolbox, ToolboxError};

struct Fixture {
    _dir: TempDir,
    root: PathBuf,
    out: PathBuf,
}

impl Fixture {
    /// `alpha` records its arguments and exits 3; `beta` needs `rich>=13`
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("scripts");
        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();

        write(
            &root,
            "alpha/alpha.sh",
            &format!(
                "# Alpha records its arguments\nfor a in \"$@\"; do printf '%s\\n' \"$a\"; done > '{}'\nexit 3\n",
                out.join("alpha.args").display()
            ),
        );
        write(
            &root,
            "beta/beta.sh",
            &format!("# Beta needs rich\ntouch '{}'\n", out.join("beta.ran").display()),
        );
        write(&root, "beta/requirements.txt", "rich>=13\n");

        Self { _dir: dir, root, out }
    }

    fn toolbox(&self, env: Arc<MemoryEnvironment>) -> Toolbox {
        let mut config = Config::default().with_tools_root(Some(self.root.clone()));
        config.interpreters.insert("sh".to_string(), "sh".to_string());
        config.scaffold.extension = "sh".to_string();
        Toolbox::new(config, env).unwrap()
    }

    fn marker(&self, name: &str) -> PathBuf {
        self.out.join(name)
    }
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn args(values: &[&str]) -> Vec<OsString> {
    values.iter().map(OsString::from).collect()
}

#[test]
fn test_list_reports_every_tool_once() {
    let fixture = Fixture::new();
    let toolbox = fixture.toolbox(Arc::new(MemoryEnvironment::new()));

    let registry = toolbox.discover().unwrap();
    assert_eq!(registry.names(), vec!["alpha", "beta"]);
    assert_eq!(registry.get("alpha").unwrap().description(), "Alpha records its arguments");
    assert_eq!(registry.get("beta").unwrap().dependencies().len(), 1);
}

#[tokio::test]
async fn test_run_forwards_args_and_relays_exit_code() {
    let fixture = Fixture::new();
    let toolbox = fixture.toolbox(Arc::new(MemoryEnvironment::new()));

    let outcome = toolbox.run("alpha", &args(&["--x", "a b", "c"])).await.unwrap();

    assert!(!outcome.was_blocked());
    assert_eq!(outcome.exit_code(), 3);
    assert_eq!(fs::read_to_string(fixture.marker("alpha.args")).unwrap(), "--x\na b\nc\n");
}

#[tokio::test]
async fn test_unsatisfied_dependency_blocks_then_install_unblocks() {
    let fixture = Fixture::new();
    let env = Arc::new(MemoryEnvironment::new().with_available("rich", "13.7.0"));
    let toolbox = fixture.toolbox(env.clone());

    let blocked = toolbox.run("beta", &[]).await.unwrap();
    assert!(blocked.was_blocked());
    assert_eq!(blocked.exit_code(), EXIT_DEPENDENCY_UNSATISFIED);
    assert_ne!(blocked.exit_code(), 3);
    assert!(!fixture.marker("beta.ran").exists());

    let err = blocked.blocking_error().unwrap();
    assert!(err.to_string().contains("rich>=13 (missing)"));
    assert!(err.hint().unwrap().contains("install beta"));

    let report = toolbox.install("beta").await.unwrap();
    assert_eq!(report.installed, vec!["rich>=13".to_string()]);
    assert!(report.is_success());

    let outcome = toolbox.run("beta", &[]).await.unwrap();
    assert!(outcome.success());
    assert!(fixture.marker("beta.ran").exists());
}

#[tokio::test]
async fn test_install_is_idempotent() {
    let fixture = Fixture::new();
    let env = Arc::new(MemoryEnvironment::new().with_installed("rich", "13.7.0"));
    let toolbox = fixture.toolbox(env.clone());

    for _ in 0..2 {
        let report = toolbox.install("beta").await.unwrap();
        assert!(report.is_success());
        assert!(report.installed.is_empty());
        assert_eq!(report.already_satisfied, vec!["rich>=13".to_string()]);
    }
    assert!(env.install_log().is_empty());
}

#[tokio::test]
async fn test_install_failure_is_reported() {
    let fixture = Fixture::new();
    let toolbox = fixture.toolbox(Arc::new(MemoryEnvironment::new().with_failing("rich")));

    let report = toolbox.install("beta").await.unwrap();
    assert!(!report.is_success());
    let err = report.into_result().unwrap_err();
    assert!(matches!(err, ToolboxError::InstallFailure { ref failed, .. } if failed == &vec!["rich>=13".to_string()]));
}

#[tokio::test]
async fn test_unknown_tool_never_spawns() {
    let fixture = Fixture::new();
    let toolbox = fixture.toolbox(Arc::new(MemoryEnvironment::new()));

    let err = toolbox.run("gamma", &args(&["x"])).await.unwrap_err();
    assert_eq!(err.exit_code(), EXIT_UNKNOWN_TOOL);
    assert!(err.hint().unwrap().contains("alpha, beta"));
    assert!(!fixture.marker("alpha.args").exists());
    assert!(!fixture.marker("beta.ran").exists());
}

#[tokio::test]
async fn test_new_then_list_and_duplicate_fails() {
    let fixture = Fixture::new();
    let toolbox = fixture.toolbox(Arc::new(MemoryEnvironment::new()));

    let created = toolbox.create("gamma").unwrap();
    let original = fs::read_to_string(&created.entry).unwrap();
    assert!(toolbox.discover().unwrap().contains("gamma"));

    let err = toolbox.create("gamma").unwrap_err();
    assert!(matches!(err, ToolboxError::ToolExists { .. }));
    assert_eq!(fs::read_to_string(&created.entry).unwrap(), original);

    let outcome = toolbox.run("gamma", &[]).await.unwrap();
    assert!(outcome.success());
}

#[test]
fn test_duplicate_names_fail_discovery() {
    let fixture = Fixture::new();
    write(&fixture.root, "alpha.sh", "exit 0\n");
    let toolbox = fixture.toolbox(Arc::new(MemoryEnvironment::new()));

    let err = toolbox.discover().unwrap_err();
    assert!(matches!(err, ToolboxError::DuplicateTool { ref name, .. } if name == "alpha"));
}
