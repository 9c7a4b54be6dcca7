//! Shared fixtures: throwaway repositories with a local bare remote.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

/// Run a shell line in `dir`, panicking on failure; returns trimmed stdout
pub fn sh(dir: &Path, cmd: &str) -> String {
    let output = Command::new("sh")
        .arg("-c")
        .arg(cmd)
        .current_dir(dir)
        .output()
        .expect("failed to spawn sh");
    assert!(
        output.status.success(),
        "`{}` failed: {}",
        cmd,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

/// `git init` with a local identity
pub fn init_repo(dir: &Path) {
    sh(
        dir,
        "git init -q --initial-branch=main \
         && git config user.email release@example.com \
         && git config user.name 'Release Test' \
         && git config commit.gpgsign false \
         && git config tag.gpgsign false",
    );
}

/// A working repository at `work` whose `origin` is the bare repository at
/// `remote`
pub struct Fixture {
    pub root: TempDir,
    pub work: PathBuf,
    pub remote: PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("tempdir");
        let remote = root.path().join("remote.git");
        let work = root.path().join("work");
        sh(root.path(), "git init -q --bare --initial-branch=main remote.git");
        std::fs::create_dir(&work).expect("create work dir");
        init_repo(&work);
        sh(&work, &format!("git remote add origin '{}'", remote.display()));
        Self { root, work, remote }
    }

    /// Working repository with `Cargo.toml` at `version`, tagged `version`,
    /// pushed with upstream tracking, plus `extra` commits after the tag
    pub fn released(version: &str, extra: &[&str]) -> Self {
        let fixture = Self::new();
        fixture.write(
            "Cargo.toml",
            &format!(
                "[package]\nname = \"widgets\"\nversion = \"{}\" # managed by release\nedition = \"2021\"\n",
                version
            ),
        );
        fixture.git(&format!(
            "git add Cargo.toml && git commit -qm 'chore: release {v}' && git tag -a {v} -m {v}",
            v = version
        ));
        for (i, subject) in extra.iter().enumerate() {
            fixture.write(&format!("src{}.rs", i), subject);
            fixture.git(&format!("git add . && git commit -qm '{}'", subject));
        }
        fixture.git("git push -q -u origin main --follow-tags");
        fixture
    }

    pub fn write(&self, file: &str, content: &str) {
        let path = self.work.join(file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create parent dir");
        }
        std::fs::write(path, content).expect("write file");
    }

    pub fn read(&self, file: &str) -> String {
        std::fs::read_to_string(self.work.join(file)).expect("read file")
    }

    pub fn git(&self, cmd: &str) -> String {
        sh(&self.work, cmd)
    }

    pub fn remote_git(&self, cmd: &str) -> String {
        sh(&self.remote, cmd)
    }
}
