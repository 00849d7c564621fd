//! Wapiti CRF labeler
//!
//! Runs `wapiti label -m <model>` as a child process: the feature stream is
//! written to stdin and the labeled stream (input line plus label column) is
//! read back from stdout.

use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use dataseer_core::{DataseerError, Result, SequenceLabeler};

/// Sequence labeler backed by the Wapiti command-line tool
#[derive(Debug, Clone)]
pub struct WapitiLabeler {
    program: String,
    args: Vec<String>,
    name: String,
}

impl WapitiLabeler {
    /// Label with `model` using the `binary` executable
    pub fn new(binary: impl AsRef<Path>, model: impl AsRef<Path>) -> Self {
        let model = model.as_ref().to_string_lossy().into_owned();
        Self {
            program: binary.as_ref().to_string_lossy().into_owned(),
            args: vec!["label".to_string(), "-m".to_string(), model.clone()],
            name: model,
        }
    }

    /// Label with an arbitrary command reading features on stdin
    pub fn with_command(program: impl Into<String>, args: Vec<String>) -> Self {
        let program = program.into();
        Self {
            name: program.clone(),
            program,
            args,
        }
    }
}

#[async_trait]
impl SequenceLabeler for WapitiLabeler {
    async fn label(&self, features: &str) -> Result<Vec<String>> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DataseerError::LabelerError(format!("Failed to run {}: {e}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| DataseerError::LabelerError("stdin not captured".to_string()))?;

        // Feed stdin concurrently so a full stdout pipe cannot stall the child
        let input = features.to_string();
        let writer = tokio::spawn(async move {
            let result = stdin.write_all(input.as_bytes()).await;
            drop(stdin);
            result
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| DataseerError::LabelerError(format!("{} failed: {e}", self.program)))?;

        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                return Err(DataseerError::LabelerError(format!(
                    "Failed to write features: {e}"
                )))
            }
            Err(e) => return Err(DataseerError::LabelerError(format!("Writer task failed: {e}"))),
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DataseerError::LabelerError(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        let labeled: Vec<String> = String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::to_string)
            .collect();
        debug!(labeler = %self.name, lines = labeled.len(), "features labeled");
        Ok(labeled)
    }

    fn name(&self) -> &str {
        &self.name
    }
}
