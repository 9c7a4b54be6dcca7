//! Command runner.
//!
//! Every external command the release pipeline issues goes through [`Shell`].
//! A shell owns an explicit directory stack instead of relying on the process
//! working directory, so two repository clients never share an implicit cwd.
//!
//! Commands are classified as read-only or mutating via [`ExecOptions`]. In
//! dry-run mode mutating commands are echoed with a "not executed" note and
//! return `None`; read-only commands always run.
//!
//! Lines starting with `!` are builtins handled in-process:
//! `!pushd <dir>`, `!popd`, `!cp <src>... <dst>`, `!mkdir <dir>`, `!rm <path>`.

mod bump;
mod fs;

use crate::cli::OutputManager;
use crate::context::ReleaseContext;
use crate::error::{CliError, ReleaseError, Result};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// A command: a shell line (run through `sh -c`) or an argument vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Cmd {
    /// Shell line; `${field}` placeholders are resolved before execution
    Line(String),
    /// Program and arguments, passed through verbatim
    Argv(Vec<String>),
}

impl Cmd {
    /// Argument vector command
    pub fn argv<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Cmd::Argv(args.into_iter().map(Into::into).collect())
    }
}

impl From<&str> for Cmd {
    fn from(line: &str) -> Self {
        Cmd::Line(line.to_string())
    }
}

impl From<String> for Cmd {
    fn from(line: String) -> Self {
        Cmd::Line(line)
    }
}

impl fmt::Display for Cmd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cmd::Line(line) => write!(f, "{}", line),
            Cmd::Argv(args) => {
                let quoted: Vec<String> = args
                    .iter()
                    .map(|a| {
                        if a.is_empty() || a.contains(char::is_whitespace) {
                            format!("\"{}\"", a.replace('"', "\\\""))
                        } else {
                            a.clone()
                        }
                    })
                    .collect();
                write!(f, "{}", quoted.join(" "))
            }
        }
    }
}

/// Execution classification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecOptions {
    /// Mutating command (skipped in dry run)
    pub write: bool,
}

impl ExecOptions {
    /// Read-only command, always executed
    pub const READ: Self = Self { write: false };
    /// Mutating command, skipped in dry run
    pub const WRITE: Self = Self { write: true };
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self::WRITE
    }
}

/// Command runner bound to a working directory stack
#[derive(Debug)]
pub struct Shell {
    dirs: Mutex<Vec<PathBuf>>,
    dry_run: bool,
    output: OutputManager,
}

impl Shell {
    /// Create a runner rooted at `dir`
    pub fn new(dir: impl Into<PathBuf>, dry_run: bool, output: OutputManager) -> Self {
        Self {
            dirs: Mutex::new(vec![dir.into()]),
            dry_run,
            output,
        }
    }

    /// Current directory (top of the stack)
    pub fn cwd(&self) -> PathBuf {
        self.dirs
            .lock()
            .ok()
            .and_then(|dirs| dirs.last().cloned())
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Resolve a path against the current directory
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.cwd().join(path)
        }
    }

    /// Whether mutating commands are suppressed
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    /// Output used for echoing
    pub fn output(&self) -> &OutputManager {
        &self.output
    }

    /// Enter `dir` (relative to the current directory)
    pub fn pushd(&self, dir: impl AsRef<Path>) -> Result<()> {
        let target = self.resolve(dir);
        if !target.is_dir() {
            return Err(ReleaseError::Cli(CliError::ExecutionFailed {
                command: format!("pushd {}", target.display()),
                reason: "no such directory".to_string(),
            }));
        }
        if let Ok(mut dirs) = self.dirs.lock() {
            dirs.push(target);
        }
        Ok(())
    }

    /// Leave the directory entered by the last `pushd`
    pub fn popd(&self) -> Result<()> {
        let mut dirs = self.dirs.lock().map_err(|_| CliError::ExecutionFailed {
            command: "popd".to_string(),
            reason: "directory stack poisoned".to_string(),
        })?;
        if dirs.len() <= 1 {
            return Err(ReleaseError::Cli(CliError::ExecutionFailed {
                command: "popd".to_string(),
                reason: "directory stack empty".to_string(),
            }));
        }
        dirs.pop();
        Ok(())
    }

    /// Run a command. Returns `None` for mutating commands in dry run.
    pub async fn exec(
        &self,
        cmd: impl Into<Cmd>,
        options: ExecOptions,
        ctx: &ReleaseContext,
    ) -> Result<Option<String>> {
        let cmd = match cmd.into() {
            Cmd::Line(line) => Cmd::Line(ctx.render(&line)),
            argv => argv,
        };
        self.exec_cmd(cmd, options).await
    }

    /// Run a program with arguments verbatim (no placeholder resolution)
    pub async fn exec_argv<I, S>(&self, args: I, options: ExecOptions) -> Result<Option<String>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exec_cmd(Cmd::argv(args), options).await
    }

    async fn exec_cmd(&self, cmd: Cmd, options: ExecOptions) -> Result<Option<String>> {
        let display = cmd.to_string();

        if self.dry_run && options.write {
            log::info!("[dry run] {}", display);
            self.output.exec(&display, true);
            return Ok(None);
        }

        log::debug!("exec: {} (in {})", display, self.cwd().display());
        self.output.exec(&display, false);

        let stdout = match &cmd {
            Cmd::Line(line) if line.starts_with('!') => self.builtin(&line[1..])?,
            Cmd::Line(line) => self.spawn(shell_argv(line), &display).await?,
            Cmd::Argv(args) => self.spawn(args.clone(), &display).await?,
        };

        if !stdout.is_empty() {
            self.output.verbose(&stdout);
        }
        Ok(Some(stdout))
    }

    async fn spawn(&self, args: Vec<String>, display: &str) -> Result<String> {
        let (program, rest) = args.split_first().ok_or_else(|| CliError::ExecutionFailed {
            command: display.to_string(),
            reason: "empty command".to_string(),
        })?;

        let output = tokio::process::Command::new(program)
            .args(rest)
            .current_dir(self.cwd())
            .output()
            .await
            .map_err(|e| CliError::ExecutionFailed {
                command: display.to_string(),
                reason: e.to_string(),
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            log::debug!("command failed: {} ({}): {}", display, output.status, stderr);
            return Err(ReleaseError::Cli(CliError::ExecutionFailed {
                command: display.to_string(),
                reason: if stderr.is_empty() { stdout } else { stderr },
            }));
        }

        Ok(stdout)
    }

    fn builtin(&self, line: &str) -> Result<String> {
        let mut parts = line.split_whitespace();
        let name = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();
        let fail = |reason: &str| {
            ReleaseError::Cli(CliError::ExecutionFailed {
                command: format!("!{}", line),
                reason: reason.to_string(),
            })
        };

        match (name, args.as_slice()) {
            ("pushd", [dir]) => self.pushd(dir)?,
            ("popd", []) => self.popd()?,
            ("mkdir", [dir]) => std::fs::create_dir_all(self.resolve(dir))?,
            ("rm", [path]) => fs::remove_path(&self.resolve(path))?,
            ("cp", [sources @ .., dest]) if !sources.is_empty() => {
                let dest = self.resolve(dest);
                let mut copied = 0;
                for pattern in sources {
                    copied += fs::copy_matches(&self.cwd(), pattern, &dest, false)?;
                }
                if copied == 0 {
                    return Err(fail("no files matched"));
                }
            }
            _ => return Err(fail("unknown builtin or wrong arguments")),
        }
        Ok(String::new())
    }

    /// Copy files matching `patterns` (relative to `from`) into `to`,
    /// keeping their relative layout. Mutating: skipped in dry run.
    pub fn copy_files(&self, patterns: &[String], from: &Path, to: &Path) -> Result<usize> {
        let from = self.resolve(from);
        let to = self.resolve(to);
        if self.dry_run {
            let display = format!("!cp {} {}", patterns.join(" "), to.display());
            log::info!("[dry run] {}", display);
            self.output.exec(&display, true);
            return Ok(0);
        }

        let mut copied = 0;
        for pattern in patterns {
            copied += fs::copy_matches(&from, pattern, &to, true)?;
        }
        log::debug!("copied {} file(s) from {} to {}", copied, from.display(), to.display());
        Ok(copied)
    }
}

fn shell_argv(line: &str) -> Vec<String> {
    if cfg!(windows) {
        vec!["cmd".to_string(), "/C".to_string(), line.to_string()]
    } else {
        vec!["sh".to_string(), "-c".to_string(), line.to_string()]
    }
}
