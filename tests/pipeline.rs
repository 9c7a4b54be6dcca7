mod common;

use common::{Fixture, init_repo, sh};
use release_cutter::config::{HooksOptions, ReleaseOptions};
use release_cutter::error::GitError;
use release_cutter::github::GitHubReleaser;
use release_cutter::pipeline::PassKind;
use release_cutter::prompt::Answer;
use release_cutter::publish::CommandRegistry;
use release_cutter::{
    Orchestrator, OutputManager, PipelineStage, ReleaseError, ScriptedPrompter,
};
use std::path::Path;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn ci_options(increment: &str) -> ReleaseOptions {
    ReleaseOptions {
        increment: Some(increment.to_string()),
        ci: true,
        ..Default::default()
    }
}

fn orchestrator(
    options: ReleaseOptions,
    dir: &Path,
    prompter: ScriptedPrompter,
) -> Orchestrator<GitHubReleaser, CommandRegistry, ScriptedPrompter> {
    options.validate().unwrap();
    Orchestrator::from_options(options, dir, prompter, OutputManager::quiet()).unwrap()
}

#[tokio::test]
async fn test_patch_release_end_to_end() {
    let fixture = Fixture::released("1.2.3", &["feat: add gears", "fix: oil the gears"]);

    let mut release = orchestrator(ci_options("patch"), &fixture.work, ScriptedPrompter::default());
    let outcome = release.run().await.unwrap();

    assert_eq!(outcome.name, "widgets");
    assert_eq!(outcome.latest_version, "1.2.3");
    assert_eq!(outcome.version, "1.2.4");
    assert_eq!(outcome.tag_name.as_deref(), Some("v1.2.4"));
    assert!(outcome.changelog.contains("fix: oil the gears"));
    assert!(outcome.changelog.contains("feat: add gears"));
    assert!(!outcome.changelog.contains("chore: release 1.2.3"));

    let manifest = fixture.read("Cargo.toml");
    assert!(manifest.contains("version = \"1.2.4\" # managed by release"));

    assert_eq!(fixture.git("git cat-file -t v1.2.4"), "tag");
    assert_eq!(fixture.git("git log -1 --format=%s"), "Release 1.2.4");
    assert_eq!(fixture.git("git status --porcelain"), "");
    assert_eq!(
        fixture.remote_git("git log -1 --format=%s main"),
        "Release 1.2.4"
    );
    assert!(fixture.remote_git("git tag").lines().any(|t| t == "v1.2.4"));

    let run = &release.runs()[0];
    assert_eq!(run.kind, PassKind::Primary);
    assert_eq!(run.stage, PipelineStage::Done);
    assert!(run.committed && run.tagged && run.pushed);
    assert!(!run.released && !run.published);
}

#[tokio::test]
async fn test_dry_run_leaves_everything_in_place() {
    let fixture = Fixture::released("1.2.3", &["fix: something"]);
    let head = fixture.git("git rev-parse HEAD");

    let options = ReleaseOptions {
        dry_run: true,
        ..ci_options("minor")
    };
    let outcome = orchestrator(options, &fixture.work, ScriptedPrompter::default())
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.version, "1.3.0");
    assert!(fixture.read("Cargo.toml").contains("version = \"1.2.3\""));
    assert_eq!(fixture.git("git rev-parse HEAD"), head);
    assert_eq!(fixture.git("git tag"), "1.2.3");
    assert_eq!(fixture.git("git status --porcelain"), "");
}

#[tokio::test]
async fn test_hooks_run_in_dry_run_but_builtins_do_not() {
    let fixture = Fixture::released("1.2.3", &["fix: something"]);
    fixture.write(".gitignore", "*.txt\n");
    fixture.git("git add .gitignore && git commit -qm 'chore: ignore' && git push -q");

    let options = ReleaseOptions {
        dry_run: true,
        hooks: HooksOptions {
            before_start: vec!["!mkdir built".to_string()],
            after_bump: vec!["echo ${name} ${latestVersion} ${version} > hook.txt".to_string()],
            ..Default::default()
        },
        ..ci_options("patch")
    };
    orchestrator(options, &fixture.work, ScriptedPrompter::default())
        .run()
        .await
        .unwrap();

    assert_eq!(fixture.read("hook.txt").trim(), "widgets 1.2.3 1.2.4");
    assert!(!fixture.work.join("built").exists());
}

#[tokio::test]
async fn test_failing_hook_aborts_the_pass() {
    let fixture = Fixture::released("1.2.3", &["fix: something"]);
    let options = ReleaseOptions {
        hooks: HooksOptions {
            before_stage: vec!["exit 3".to_string()],
            ..Default::default()
        },
        ..ci_options("patch")
    };
    let mut release = orchestrator(options, &fixture.work, ScriptedPrompter::default());
    let err = release.run().await.unwrap_err();

    assert!(matches!(err, ReleaseError::Cli(_)));
    assert_eq!(release.runs()[0].stage, PipelineStage::Failed);
    assert_eq!(fixture.git("git tag"), "1.2.3");
}

#[tokio::test]
async fn test_recommended_increment_from_commits() {
    let fixture = Fixture::released("1.2.3", &["fix: oil the gears", "feat: add sprockets"]);
    let options = ReleaseOptions {
        increment: None,
        recommend: true,
        ci: true,
        ..Default::default()
    };
    let outcome = orchestrator(options, &fixture.work, ScriptedPrompter::default())
        .run()
        .await
        .unwrap();

    assert_eq!(outcome.version, "1.3.0");
    assert_eq!(outcome.changelog.lines().count(), 2);
    assert_eq!(fixture.git("git describe --tags --abbrev=0"), "v1.3.0");
}

#[tokio::test]
async fn test_undecided_version_fails_without_prompts() {
    let fixture = Fixture::released("1.2.3", &["fix: something"]);
    let options = ReleaseOptions {
        increment: None,
        ci: true,
        ..Default::default()
    };
    let err = orchestrator(options, &fixture.work, ScriptedPrompter::default())
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, ReleaseError::Version(_)));
    assert!(fixture.read("Cargo.toml").contains("1.2.3"));
}

#[tokio::test]
async fn test_pre_release_channel() {
    let fixture = Fixture::released("1.2.3", &["feat: shiny"]);
    let options = ReleaseOptions {
        pre_release: Some(release_cutter::config::PreReleaseSetting::Channel("beta".to_string())),
        ..ci_options("minor")
    };
    let outcome = orchestrator(options, &fixture.work, ScriptedPrompter::default())
        .run()
        .await
        .unwrap();
    assert_eq!(outcome.version, "1.3.0-beta.0");
    assert_eq!(fixture.git("git describe --tags --abbrev=0"), "v1.3.0-beta.0");
}

#[tokio::test]
async fn test_interactive_selection_and_declined_stages() {
    let fixture = Fixture::released("1.2.3", &["fix: something"]);
    let remote_head = fixture.remote_git("git rev-parse main");

    let options = ReleaseOptions {
        ci: false,
        ..Default::default()
    };
    let prompter = ScriptedPrompter::new([
        Answer::Select(1),       // minor
        Answer::Confirm(true),   // commit
        Answer::Confirm(false),  // tag
        Answer::Confirm(false),  // push
    ]);
    let mut release = orchestrator(options, &fixture.work, prompter);
    let outcome = release.run().await.unwrap();

    assert_eq!(outcome.version, "1.3.0");
    assert_eq!(fixture.git("git log -1 --format=%s"), "Release 1.3.0");
    assert_eq!(fixture.git("git tag"), "1.2.3");
    assert_eq!(fixture.remote_git("git rev-parse main"), remote_head);

    let run = &release.runs()[0];
    assert!(run.committed);
    assert!(!run.tagged && !run.pushed);
}

#[tokio::test]
async fn test_existing_tag_fails_before_mutation() {
    let fixture = Fixture::released("1.2.3", &["fix: something"]);
    fixture.git("git tag v1.2.4");

    let err = orchestrator(ci_options("patch"), &fixture.work, ScriptedPrompter::default())
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, ReleaseError::Git(GitError::TagFailed { .. })));
    assert!(fixture.read("Cargo.toml").contains("version = \"1.2.3\""));
}

#[tokio::test]
async fn test_dirty_working_dir_fails_before_mutation() {
    let fixture = Fixture::released("1.2.3", &["fix: something"]);
    fixture.write("src0.rs", "uncommitted");

    let err = orchestrator(ci_options("patch"), &fixture.work, ScriptedPrompter::default())
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err, ReleaseError::Git(GitError::DirtyWorkingDirectory)));
    assert_eq!(fixture.read("src0.rs"), "uncommitted");
}

#[tokio::test]
async fn test_publish_runs_registry_command() {
    let fixture = Fixture::released("1.2.3", &["fix: something"]);
    let published = fixture.root.path().join("published.txt");

    let mut options = ci_options("patch");
    options.registry.publish = true;
    options.registry.publish_command =
        format!("echo ${{name}}@${{version}} ${{tag}} > '{}'", published.display());
    let outcome = orchestrator(options, &fixture.work, ScriptedPrompter::default())
        .run()
        .await
        .unwrap();

    assert_eq!(
        std::fs::read_to_string(&published).unwrap().trim(),
        "widgets@1.2.4 latest"
    );
    assert_eq!(
        outcome.package_url.as_deref(),
        Some("https://crates.io/crates/widgets")
    );
}

#[tokio::test]
async fn test_interrupt_resets_manifests() {
    let fixture = Fixture::released("1.2.3", &["fix: something"]);
    let options = ReleaseOptions {
        increment: Some("patch".to_string()),
        ci: false,
        hooks: HooksOptions {
            after_bump: vec!["sleep 5".to_string()],
            ..Default::default()
        },
        ..Default::default()
    };

    let token = CancellationToken::new();
    let mut release = orchestrator(options, &fixture.work, ScriptedPrompter::default())
        .with_cancellation(token.clone());
    let bumped = fixture.work.join("Cargo.toml");
    tokio::spawn(async move {
        // Cancel once the bump has been written
        for _ in 0..100 {
            let content = tokio::fs::read_to_string(&bumped).await.unwrap_or_default();
            if content.contains("1.2.4") {
                break;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        token.cancel();
    });

    let err = release.run().await.unwrap_err();
    assert!(matches!(err, ReleaseError::Aborted));
    assert!(fixture.read("Cargo.toml").contains("version = \"1.2.3\""));
    assert_eq!(fixture.git("git status --porcelain"), "");
    assert_eq!(release.runs()[0].stage, PipelineStage::Failed);
}

#[tokio::test]
async fn test_distribution_pass() {
    let fixture = Fixture::new();

    // Distribution repository with its own manifest
    let dist_remote = fixture.root.path().join("dist.git");
    sh(fixture.root.path(), "git init -q --bare --initial-branch=main dist.git");
    let seed = fixture.root.path().join("dist-seed");
    std::fs::create_dir(&seed).unwrap();
    init_repo(&seed);
    std::fs::write(
        seed.join("package.json"),
        "{\n  \"name\": \"widgets-dist\",\n  \"version\": \"1.2.3\"\n}\n",
    )
    .unwrap();
    sh(
        &seed,
        &format!(
            "git add . && git commit -qm seed && git push -q '{}' main",
            dist_remote.display()
        ),
    );

    fixture.write(
        "Cargo.toml",
        "[package]\nname = \"widgets\"\nversion = \"1.2.3\"\n",
    );
    fixture.write(".gitignore", ".stage/\n");
    fixture.write("dist/widgets.js", "export const gears = 3;\n");
    fixture.git("git add . && git commit -qm init && git tag -a v1.2.3 -m v1.2.3");
    fixture.git("git push -q -u origin main --follow-tags");
    fixture.write("dist/widgets.js", "export const gears = 4;\n");
    fixture.git("git commit -qam 'feat: more gears' && git push -q");

    let mut options = ci_options("minor");
    options.dist.repo = Some(dist_remote.to_string_lossy().into_owned());
    options.dist.pkg_files = Some(vec!["package.json".to_string()]);
    options.dist.files = vec!["*.js".to_string()];

    let mut release = orchestrator(options, &fixture.work, ScriptedPrompter::default());
    let outcome = release.run().await.unwrap();
    assert_eq!(outcome.version, "1.3.0");

    let dist_git = |cmd: &str| sh(&dist_remote, cmd);
    assert!(dist_git("git tag").lines().any(|t| t == "v1.3.0"));
    assert_eq!(dist_git("git log -1 --format=%s main"), "Release 1.3.0");
    assert_eq!(
        dist_git("git show main:widgets.js"),
        "export const gears = 4;"
    );
    assert!(dist_git("git show main:package.json").contains("\"version\": \"1.3.0\""));

    assert!(!fixture.work.join(".stage").exists());
    let runs = release.runs();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[1].kind, PassKind::Distribution);
    assert_eq!(runs[1].stage, PipelineStage::Done);
    assert!(runs[1].tagged && runs[1].pushed);
    assert_eq!(fixture.git("git status --porcelain"), "");
}

#[tokio::test]
async fn test_distribution_failure_keeps_primary_release() {
    let fixture = Fixture::released("1.2.3", &["feat: more gears"]);

    let mut options = ci_options("minor");
    options.dist.repo = Some(
        fixture
            .root
            .path()
            .join("missing-dist.git")
            .to_string_lossy()
            .into_owned(),
    );
    options.dist.pkg_files = Some(vec!["package.json".to_string()]);

    let mut release = orchestrator(options, &fixture.work, ScriptedPrompter::default());
    let err = release.run().await.unwrap_err();
    assert!(matches!(err, ReleaseError::Git(GitError::CloneFailed { .. })));

    let runs = release.runs();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].kind, PassKind::Primary);
    assert_eq!(runs[0].stage, PipelineStage::Released);
    assert!(runs[0].committed && runs[0].tagged && runs[0].pushed);
    assert_eq!(runs[1].kind, PassKind::Distribution);
    assert_eq!(runs[1].stage, PipelineStage::Failed);

    assert!(fixture.remote_git("git tag").lines().any(|t| t == "v1.3.0"));
    assert_eq!(
        fixture.remote_git("git log -1 --format=%s main"),
        "Release 1.3.0"
    );
    assert!(fixture.read("Cargo.toml").contains("version = \"1.3.0\""));
}
