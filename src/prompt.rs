//! Interactive prompts.
//!
//! The orchestrator only talks to the [`Prompter`] trait. [`StdinPrompter`]
//! reads answers from the terminal; [`ScriptedPrompter`] replays canned
//! answers and is what tests and non-terminal callers use.

use crate::cli::OutputManager;
use crate::error::{CliError, Result};
use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader, Lines};

/// Names of the prompts the pipeline issues
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptName {
    Increment,
    Commit,
    Tag,
    Push,
    Release,
    Publish,
    Otp,
}

impl PromptName {
    /// Question text for confirmation prompts
    pub fn question(self, subject: &str) -> String {
        match self {
            PromptName::Increment => format!("Select increment (next version) for {}", subject),
            PromptName::Commit => format!("Commit ({})?", subject),
            PromptName::Tag => format!("Tag ({})?", subject),
            PromptName::Push => format!("Push to {}?", subject),
            PromptName::Release => format!("Create a release on GitHub ({})?", subject),
            PromptName::Publish => format!("Publish {} to the registry?", subject),
            PromptName::Otp => format!("Please enter the one-time password for {}:", subject),
        }
    }
}

/// Source of answers on the interactive branch
pub trait Prompter {
    /// Yes/no question
    fn confirm(&self, message: &str, default: bool) -> impl Future<Output = Result<bool>>;

    /// Pick one of `choices`; returns its index
    fn select(
        &self,
        message: &str,
        choices: &[String],
        default: usize,
    ) -> impl Future<Output = Result<usize>>;

    /// Free text answer
    fn input(&self, message: &str) -> impl Future<Output = Result<String>>;
}

type AnswerLines = Lines<BufReader<Box<dyn AsyncRead + Send + Unpin>>>;

/// Prompts on stdout, answers from stdin.
///
/// One buffered reader lives for the whole run; piped answers that arrive
/// in a single read stay buffered for the following prompts.
#[derive(Clone)]
pub struct StdinPrompter {
    output: OutputManager,
    lines: Arc<tokio::sync::Mutex<AnswerLines>>,
}

impl StdinPrompter {
    pub fn new(output: OutputManager) -> Self {
        Self::with_reader(tokio::io::stdin(), output)
    }

    /// Read answers from `reader` instead of stdin
    pub fn with_reader(reader: impl AsyncRead + Send + Unpin + 'static, output: OutputManager) -> Self {
        let reader: Box<dyn AsyncRead + Send + Unpin> = Box::new(reader);
        Self {
            output,
            lines: Arc::new(tokio::sync::Mutex::new(BufReader::new(reader).lines())),
        }
    }

    async fn read_line(&self) -> Result<String> {
        let mut lines = self.lines.lock().await;
        match lines.next_line().await? {
            Some(line) => Ok(line.trim().to_string()),
            None => Err(CliError::InvalidArguments {
                reason: "stdin closed while waiting for an answer (use --ci for non-interactive runs)"
                    .to_string(),
            }
            .into()),
        }
    }
}

impl fmt::Debug for StdinPrompter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StdinPrompter").finish_non_exhaustive()
    }
}

impl Prompter for StdinPrompter {
    async fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        let hint = if default { "Y/n" } else { "y/N" };
        self.output.println(&format!("? {} ({})", message, hint));
        let answer = self.read_line().await?;
        Ok(match answer.to_ascii_lowercase().as_str() {
            "" => default,
            "y" | "yes" => true,
            _ => false,
        })
    }

    async fn select(&self, message: &str, choices: &[String], default: usize) -> Result<usize> {
        self.output.println(&format!("? {}", message));
        for (idx, choice) in choices.iter().enumerate() {
            let marker = if idx == default { ">" } else { " " };
            self.output.indent(&format!("{} {}) {}", marker, idx + 1, choice));
        }
        let answer = self.read_line().await?;
        if answer.is_empty() {
            return Ok(default);
        }
        match answer.parse::<usize>() {
            Ok(n) if (1..=choices.len()).contains(&n) => Ok(n - 1),
            _ => Err(CliError::InvalidArguments {
                reason: format!("'{}' is not one of 1-{}", answer, choices.len()),
            }
            .into()),
        }
    }

    async fn input(&self, message: &str) -> Result<String> {
        self.output.println(&format!("? {}", message));
        self.read_line().await
    }
}

/// Canned answer for [`ScriptedPrompter`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Answer {
    Confirm(bool),
    Select(usize),
    Input(String),
}

/// Replays a fixed sequence of answers; records the questions asked
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: Mutex<VecDeque<Answer>>,
    asked: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    pub fn new(answers: impl IntoIterator<Item = Answer>) -> Self {
        Self {
            answers: Mutex::new(answers.into_iter().collect()),
            asked: Mutex::new(Vec::new()),
        }
    }

    /// Questions asked so far
    pub fn asked(&self) -> Vec<String> {
        self.asked.lock().map(|a| a.clone()).unwrap_or_default()
    }

    fn next(&self, message: &str) -> Option<Answer> {
        if let Ok(mut asked) = self.asked.lock() {
            asked.push(message.to_string());
        }
        self.answers.lock().ok().and_then(|mut a| a.pop_front())
    }

    fn unexpected(message: &str, answer: Option<Answer>) -> crate::ReleaseError {
        CliError::InvalidArguments {
            reason: format!("no scripted answer for '{}' (got {:?})", message, answer),
        }
        .into()
    }
}

impl Prompter for ScriptedPrompter {
    async fn confirm(&self, message: &str, _default: bool) -> Result<bool> {
        match self.next(message) {
            Some(Answer::Confirm(yes)) => Ok(yes),
            other => Err(Self::unexpected(message, other)),
        }
    }

    async fn select(&self, message: &str, _choices: &[String], _default: usize) -> Result<usize> {
        match self.next(message) {
            Some(Answer::Select(idx)) => Ok(idx),
            other => Err(Self::unexpected(message, other)),
        }
    }

    async fn input(&self, message: &str) -> Result<String> {
        match self.next(message) {
            Some(Answer::Input(text)) => Ok(text),
            other => Err(Self::unexpected(message, other)),
        }
    }
}
