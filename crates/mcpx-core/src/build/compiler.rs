//! Compiler Service
//!
//! Translates authoring-dialect source text into executable text. The core
//! never compiles anything itself; it calls whatever [`Compiler`] it was
//! given and caches the output.

use std::path::Path;
use std::process::Stdio;
use std::sync::Arc;

use anyhow::{Context, bail};
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::config::CompilerConfig;

/// Placeholder in [`CommandCompiler`] arguments replaced by the source path
pub const SOURCE_PATH_PLACEHOLDER: &str = "{file}";

/// Source-to-executable translation
#[async_trait]
pub trait Compiler: Send + Sync {
    /// Compile `source`, read from `source_path`, into executable text
    async fn compile(&self, source: &str, source_path: &Path) -> anyhow::Result<String>;
}

/// Identity compiler for sources already in the executable dialect
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughCompiler;

#[async_trait]
impl Compiler for PassthroughCompiler {
    async fn compile(&self, source: &str, _source_path: &Path) -> anyhow::Result<String> {
        Ok(source.to_string())
    }
}

/// Runs an external program: source text on stdin, executable text on stdout
#[derive(Debug, Clone)]
pub struct CommandCompiler {
    program: String,
    args: Vec<String>,
}

impl CommandCompiler {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    fn args_for(&self, source_path: &Path) -> Vec<String> {
        let path = source_path.to_string_lossy();
        self.args
            .iter()
            .map(|arg| arg.replace(SOURCE_PATH_PLACEHOLDER, &path))
            .collect()
    }
}

#[async_trait]
impl Compiler for CommandCompiler {
    async fn compile(&self, source: &str, source_path: &Path) -> anyhow::Result<String> {
        let args = self.args_for(source_path);
        debug!(program = %self.program, path = %source_path.display(), "Invoking compiler");

        let mut child = Command::new(&self.program)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("failed to start compiler '{}'", self.program))?;

        // Feed stdin while stdout drains; a streaming compiler would
        // otherwise block on a full pipe
        let stdin = child.stdin.take();
        let feed = async move {
            if let Some(mut stdin) = stdin {
                stdin.write_all(source.as_bytes()).await?;
                stdin.shutdown().await?;
            }
            Ok::<_, std::io::Error>(())
        };
        let (fed, output) = tokio::join!(feed, child.wait_with_output());
        let output = output.context("failed to wait for compiler")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            );
        }

        // A compiler may exit successfully without reading all of its input
        if let Err(e) = fed {
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(e).context("failed to write source to compiler");
            }
        }

        String::from_utf8(output.stdout).context("compiler produced non UTF-8 output")
    }
}

/// Compiler selected by configuration; an empty command means passthrough
pub fn compiler_from_config(config: &CompilerConfig) -> Arc<dyn Compiler> {
    match config.command.as_deref().map(str::trim) {
        Some(command) if !command.is_empty() => {
            Arc::new(CommandCompiler::new(command, config.args.clone()))
        }
        _ => Arc::new(PassthroughCompiler),
    }
}
