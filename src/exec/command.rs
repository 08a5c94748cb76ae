// src/exec/command.rs

//! Shell command step.

use std::process::{Command, Stdio};
use std::sync::LazyLock;

use anyhow::{Context as _, bail};
use regex::{Captures, Regex};
use serde_json::Value;
use tracing::{debug, info};

use crate::context::Args;
use crate::step::{Callable, ObjectStep, step};
use crate::types::StepName;

/// `{name}` placeholders. A leading `$` marks shell syntax (`${HOME}`) and
/// is left alone.
static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\$?)\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder pattern is valid")
});

/// Runs `sh -c <cmd>` (`cmd /C` on Windows) and returns trimmed stdout.
///
/// Every `{name}` in the command is a declared input, substituted from the
/// bound arguments before the process starts. A non-zero exit status is an
/// error carrying the exit code and stderr.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandStep {
    cmd: String,
    placeholders: Vec<String>,
}

impl CommandStep {
    pub fn new(cmd: impl Into<String>) -> Self {
        let cmd = cmd.into();
        let mut placeholders: Vec<String> = Vec::new();
        for caps in PLACEHOLDER.captures_iter(&cmd) {
            if !caps[1].is_empty() {
                continue;
            }
            let name = caps[2].to_string();
            if !placeholders.contains(&name) {
                placeholders.push(name);
            }
        }
        Self { cmd, placeholders }
    }

    pub fn cmd(&self) -> &str {
        &self.cmd
    }

    pub fn placeholders(&self) -> &[String] {
        &self.placeholders
    }

    /// Wrap as a schedulable step.
    pub fn into_step<D, S>(self, name: impl Into<StepName>, after: D) -> ObjectStep<CommandStep>
    where
        D: IntoIterator<Item = S>,
        S: Into<StepName>,
    {
        step(name).depends_on(after).object(self)
    }

    /// Substitute placeholders from `args`.
    ///
    /// Strings are inserted verbatim, any other value as JSON text.
    pub fn render(&self, args: &Args) -> anyhow::Result<String> {
        let mut missing: Option<String> = None;

        let rendered = PLACEHOLDER.replace_all(&self.cmd, |caps: &Captures| {
            if !caps[1].is_empty() {
                return caps[0].to_string();
            }
            match args.get(&caps[2]) {
                Ok(Value::String(s)) => s.clone(),
                Ok(other) => other.to_string(),
                Err(_) => {
                    missing.get_or_insert_with(|| caps[2].to_string());
                    String::new()
                }
            }
        });

        if let Some(name) = missing {
            bail!("no value bound for placeholder `{{{name}}}` in `{}`", self.cmd);
        }
        Ok(rendered.into_owned())
    }
}

impl Callable for CommandStep {
    fn inputs(&self) -> Vec<String> {
        self.placeholders.clone()
    }

    fn call(&self, args: &Args) -> anyhow::Result<Value> {
        let rendered = self.render(args)?;
        info!(cmd = %rendered, "starting command");

        let output = shell(&rendered)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("spawning process for `{rendered}`"))?;

        let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let code = output
                .status
                .code()
                .map_or_else(|| "a signal".to_string(), |c| format!("code {c}"));
            bail!("`{rendered}` exited with {code}: {}", stderr.trim());
        }

        debug!(cmd = %rendered, bytes = stdout.len(), "command finished");
        Ok(Value::String(stdout))
    }
}

fn shell(cmd: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.arg("/C").arg(cmd);
        c
    } else {
        let mut c = Command::new("sh");
        c.arg("-c").arg(cmd);
        c
    }
}
