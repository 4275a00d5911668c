use assert_cmd::Command;
use assert_cmd::cargo;
use mockito::Server;
use predicates::prelude::*;
use std::path::Path;
use tempfile::tempdir;

/// `pkgdep` pointed at `app`, with no configuration leaking in from the
/// environment.
fn pkgdep(app: &Path) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("pkgdep"));
    cmd.arg("--app-path")
        .arg(app)
        .env_remove("PKGDEP_APP_PATH")
        .env_remove("GITHUB_TOKEN")
        .env_remove("PACKAGES_PATH")
        .env_remove("REGISTRY_URL")
        .env_remove("REGISTRY_USERNAME")
        .env_remove("REGISTRY_PASSWORD")
        .env_remove("RUST_LOG");
    cmd
}

fn write_package(app: &Path, folder: &str, manifest: &str) {
    let dir = app.join("repos").join(folder);
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("package.json"), manifest).unwrap();
}

/// core <- lib <- app (private)
fn seed_chain(app: &Path, core_version: &str) {
    write_package(
        app,
        "core",
        &format!(r#"{{"name": "@me/core", "version": "{}"}}"#, core_version),
    );
    write_package(
        app,
        "lib",
        r#"{"name": "@me/lib", "version": "1.0.0", "dependencies": {"@me/core": "^1.0.0"}}"#,
    );
    write_package(
        app,
        "app",
        r#"{"name": "@me/app", "version": "1.0.0", "private": true, "devDependencies": {"@me/lib": "^1.0.0"}}"#,
    );
}

fn write_ledger(app: &Path, content: &str) {
    let dir = app.join("configuration");
    std::fs::create_dir_all(&dir).unwrap();
    std::fs::write(dir.join("packageDeploymentState.yaml"), content).unwrap();
}

#[test]
fn test_first_run_creates_app_folder() {
    let root = tempdir().unwrap();
    let app = root.path().join("app");

    pkgdep(&app).arg("config").arg("show").assert().success();

    for sub in ["repos", "monorepo", "configuration", "data"] {
        assert!(app.join(sub).is_dir(), "{} missing", sub);
    }
    let config = std::fs::read_to_string(app.join("configuration/deployer-config.yaml")).unwrap();
    assert!(config.contains("use: whitelist"));
}

#[test]
fn test_print_build_order() {
    let root = tempdir().unwrap();
    let app = root.path();
    seed_chain(app, "1.0.0");

    pkgdep(app)
        .arg("print")
        .arg("--build-order")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. @me/core@1.0.0"))
        .stdout(predicate::str::contains("2. @me/lib@1.0.0"))
        .stdout(predicate::str::contains("3. @me/app@1.0.0"));
}

#[test]
fn test_cycle_exits_with_trace() {
    let root = tempdir().unwrap();
    let app = root.path();
    write_package(app, "a", r#"{"name": "a", "version": "1.0.0", "dependencies": {"b": "1"}}"#);
    write_package(app, "b", r#"{"name": "b", "version": "1.0.0", "dependencies": {"a": "1"}}"#);

    pkgdep(app)
        .arg("deploy")
        .arg("--all")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Circular dependency detected"))
        .stderr(predicate::str::contains("a -> b -> a").or(predicate::str::contains("b -> a -> b")));

    assert!(!app.join("configuration/packageDeploymentState.yaml").exists());
}

#[test]
fn test_incremental_build_packages_follow_dependents() {
    let root = tempdir().unwrap();
    let app = root.path();
    seed_chain(app, "1.0.1");
    write_ledger(app, "'@me/core': 1.0.0\n'@me/lib': 1.0.0\n");

    pkgdep(app)
        .args(["repositories", "select", "blacklist"])
        .assert()
        .success();

    pkgdep(app)
        .arg("print")
        .arg("--incremental-build-packages")
        .assert()
        .success()
        .stdout(predicate::str::contains("1. @me/core@1.0.1"))
        .stdout(predicate::str::contains("2. @me/lib@1.0.0"))
        .stdout(predicate::str::contains("3. @me/app@1.0.0"));
}

#[test]
fn test_incremental_whitelist_limits_packages() {
    let root = tempdir().unwrap();
    let app = root.path();
    seed_chain(app, "1.0.1");
    write_ledger(app, "'@me/core': 1.0.0\n");

    pkgdep(app)
        .args(["repositories", "whitelist", "add", "core,lib"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added to the whitelist: core, lib"));

    pkgdep(app)
        .arg("print")
        .arg("--incremental-build-packages")
        .assert()
        .success()
        .stdout(predicate::str::contains("2. @me/lib@1.0.0"))
        .stdout(predicate::str::contains("@me/app").not());
}

#[test]
fn test_nothing_to_deploy_leaves_ledger_untouched() {
    let root = tempdir().unwrap();
    let app = root.path();
    seed_chain(app, "1.0.0");
    let ledger = "'@me/app': 1.0.0\n'@me/core': 1.0.0\n'@me/lib': 1.0.0\n";
    write_ledger(app, ledger);

    pkgdep(app)
        .args(["repositories", "select", "blacklist"])
        .assert()
        .success();

    pkgdep(app)
        .arg("deploy")
        .arg("--incremental")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "All packages are up to date. Nothing to deploy.",
        ));

    let after =
        std::fs::read_to_string(app.join("configuration/packageDeploymentState.yaml")).unwrap();
    assert_eq!(after, ledger);
}

#[test]
fn test_use_remote_requires_credentials() {
    let root = tempdir().unwrap();
    let app = root.path();
    seed_chain(app, "1.0.0");

    pkgdep(app)
        .args(["deploy", "--incremental", "--use-remote"])
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "Registry username is not set, cannot do incremental build.",
        ));
}

#[test]
fn test_config_set_and_show_masks_secrets() {
    let root = tempdir().unwrap();
    let app = root.path();

    pkgdep(app)
        .args([
            "config",
            "set",
            "--registry-username",
            "admin",
            "--registry-password",
            "hunter2",
        ])
        .assert()
        .success();

    pkgdep(app)
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("registryUsername: admin"))
        .stdout(predicate::str::contains("hunter2").not());
}

#[test]
fn test_print_remote_packages() {
    let mut server = Server::new();
    let _mock_all = server
        .mock("GET", "/-/all")
        .match_header("authorization", "Basic YWRtaW46c2VjcmV0")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "_updated": 1700000000000,
                "@me/core": {"name": "@me/core", "version": "1.0.0"},
                "@other/pkg": {"name": "@other/pkg", "version": "3.0.0"}
            }"#,
        )
        .create();

    let root = tempdir().unwrap();
    let app = root.path();
    seed_chain(app, "1.0.0");

    pkgdep(app)
        .args(["print", "--remote-packages"])
        .env("REGISTRY_URL", server.url())
        .env("REGISTRY_USERNAME", "admin")
        .env("REGISTRY_PASSWORD", "secret")
        .assert()
        .success()
        .stdout(predicate::str::contains("Remote packages (1):"))
        .stdout(predicate::str::contains("@me/core@1.0.0"))
        .stdout(predicate::str::contains("@other/pkg").not());
}

#[test]
fn test_print_user_repositories() {
    let mut server = Server::new();
    let _mock_repos = server
        .mock("GET", "/user/repos")
        .match_query(mockito::Matcher::UrlEncoded("page".into(), "1".into()))
        .match_header("authorization", "Bearer ghp_test")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"[{
                "name": "core",
                "full_name": "me/core",
                "private": true,
                "description": null,
                "html_url": "https://github.com/me/core",
                "language": "TypeScript",
                "updated_at": "2024-01-01T00:00:00Z"
            }]"#,
        )
        .create();

    let root = tempdir().unwrap();
    let app = root.path();

    pkgdep(app)
        .args(["print", "--user-repositories", "--api-url"])
        .arg(server.url())
        .env("GITHUB_TOKEN", "ghp_test")
        .assert()
        .success()
        .stdout(predicate::str::contains("me/core (private)"));
}

#[test]
fn test_repositories_combine_builds_monorepo() {
    let root = tempdir().unwrap();
    let app = root.path();
    seed_chain(app, "1.0.0");
    std::fs::create_dir_all(app.join("repos/core/node_modules/dep")).unwrap();

    pkgdep(app)
        .args(["repositories", "combine"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Combined 3 packages"));

    let monorepo = app.join("monorepo");
    assert!(monorepo.join("packages/core/package.json").exists());
    assert!(monorepo.join("packages/lib/package.json").exists());
    assert!(monorepo.join("apps/app/package.json").exists());
    assert!(!monorepo.join("packages/core/node_modules").exists());

    let root_manifest = std::fs::read_to_string(monorepo.join("package.json")).unwrap();
    assert!(root_manifest.contains("@perseverancia/master"));
    assert!(root_manifest.contains("packages/*"));
}
