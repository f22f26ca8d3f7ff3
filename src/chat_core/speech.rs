use std::process::Stdio;

use anyhow::{bail, ensure, Context, Result};
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::config::Config;

/// A program and its leading arguments, parsed from a config string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    pub fn parse(line: &str) -> Result<CommandLine> {
        let mut words = line.split_whitespace().map(str::to_string);
        let Some(program) = words.next() else {
            bail!("Empty command line")
        };
        Ok(CommandLine {
            program,
            args: words.collect(),
        })
    }

    fn command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        command
    }
}

/// Plays text through an external synthesizer, one utterance at a time.
pub struct Speaker {
    command: CommandLine,
    stop: Option<oneshot::Sender<()>>,
}

/// Resolves once an utterance has ended or been stopped.
pub struct Utterance {
    done: oneshot::Receiver<()>,
}

impl Utterance {
    pub async fn finished(self) {
        let _ = self.done.await;
    }
}

impl Speaker {
    pub fn new(command: CommandLine) -> Speaker {
        Speaker {
            command,
            stop: None,
        }
    }

    /// `None` when no synthesizer is configured.
    pub fn from_config(config: &Config) -> Option<Speaker> {
        let line = config.speech_command.as_deref()?;
        CommandLine::parse(line).ok().map(Speaker::new)
    }

    pub fn is_speaking(&self) -> bool {
        self.stop.as_ref().map_or(false, |stop| !stop.is_closed())
    }

    /// Stops the current utterance if there is one, otherwise starts speaking `text`.
    ///
    /// Returns the new utterance when speech started and `None` when it was stopped.
    pub fn toggle(&mut self, text: &str) -> Result<Option<Utterance>> {
        if self.is_speaking() {
            if let Some(stop) = self.stop.take() {
                let _ = stop.send(());
            }
            return Ok(None);
        }

        let mut child = self
            .command
            .command()
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start {}", self.command.program))?;
        debug!(program = %self.command.program, "Speaking");

        let (stop_tx, stop_rx) = oneshot::channel();
        let (done_tx, done_rx) = oneshot::channel();
        tokio::spawn(async move {
            tokio::select! {
                status = child.wait() => {
                    if let Err(err) = status {
                        warn!("Speech synthesizer failed: {}", err);
                    }
                }
                _ = stop_rx => {
                    let _ = child.kill().await;
                }
            }
            let _ = done_tx.send(());
        });

        self.stop = Some(stop_tx);
        Ok(Some(Utterance { done: done_rx }))
    }
}

/// Turns speech into text through an external recognizer.
#[derive(Debug, Clone)]
pub struct Recognizer {
    command: CommandLine,
}

impl Recognizer {
    pub fn new(command: CommandLine) -> Recognizer {
        Recognizer { command }
    }

    /// `None` when voice input isn't available.
    pub fn from_config(config: &Config) -> Option<Recognizer> {
        let line = config.recognition_command.as_deref()?;
        CommandLine::parse(line).ok().map(Recognizer::new)
    }

    /// Runs the recognizer once and returns what it heard.
    pub async fn listen(&self) -> Result<String> {
        let output = self
            .command
            .command()
            .stdin(Stdio::null())
            .output()
            .await
            .with_context(|| format!("Failed to start {}", self.command.program))?;
        ensure!(
            output.status.success(),
            "{} exited with {}",
            self.command.program,
            output.status
        );
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}
