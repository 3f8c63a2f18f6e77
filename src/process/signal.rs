use crate::error::{Result, SigPanelError};
use crate::process::types::SignalAction;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

/// One line of output from the `sig` helper
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputLine {
    Stdout(String),
    Stderr(String),
}

/// Outcome of a `sig` invocation
#[derive(Debug, Clone)]
pub struct SigRun {
    /// Full command line, program first
    pub command: Vec<String>,
    /// Trimmed, non-empty lines in arrival order
    pub output: Vec<OutputLine>,
    /// `None` when the helper was killed by a signal
    pub exit_code: Option<i32>,
}

impl SigRun {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Runs `<program> <signal> <names...>`
#[derive(Debug, Clone)]
pub struct SigRunner {
    program: String,
}

impl SigRunner {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    pub fn command_line(&self, signal: SignalAction, names: &[String]) -> Vec<String> {
        let mut command = vec![self.program.clone(), signal.to_string()];
        command.extend(names.iter().cloned());
        command
    }

    /// Spawn the helper and collect its output. `on_line` sees each line as
    /// it arrives.
    pub async fn run<F>(&self, signal: SignalAction, names: &[String], mut on_line: F) -> Result<SigRun>
    where
        F: FnMut(&OutputLine),
    {
        if names.is_empty() {
            return Err(SigPanelError::NothingSelected);
        }

        let command = self.command_line(signal, names);
        tracing::info!("Running command: {}", command.join(" "));

        let mut child = Command::new(&self.program)
            .args(&command[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| SigPanelError::SigCommandError(self.program.clone(), e.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| SigPanelError::SigCommandError(self.program.clone(), "no stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| SigPanelError::SigCommandError(self.program.clone(), "no stderr".to_string()))?;

        let mut out_lines = BufReader::new(stdout).lines();
        let mut err_lines = BufReader::new(stderr).lines();
        let (mut out_done, mut err_done) = (false, false);
        let mut output = Vec::new();

        while !(out_done && err_done) {
            let line = tokio::select! {
                line = out_lines.next_line(), if !out_done => match line? {
                    Some(l) => Some(OutputLine::Stdout(l)),
                    None => { out_done = true; None }
                },
                line = err_lines.next_line(), if !err_done => match line? {
                    Some(l) => Some(OutputLine::Stderr(l)),
                    None => { err_done = true; None }
                },
            };

            if let Some(line) = line.and_then(clean_line) {
                on_line(&line);
                output.push(line);
            }
        }

        let status = child.wait().await?;
        tracing::info!("{} finished with {}", self.program, status);

        Ok(SigRun {
            command,
            output,
            exit_code: status.code(),
        })
    }
}

fn clean_line(line: OutputLine) -> Option<OutputLine> {
    match line {
        OutputLine::Stdout(l) => {
            let l = l.trim();
            (!l.is_empty()).then(|| OutputLine::Stdout(l.to_string()))
        }
        OutputLine::Stderr(l) => {
            let l = l.trim();
            (!l.is_empty()).then(|| OutputLine::Stderr(l.to_string()))
        }
    }
}
