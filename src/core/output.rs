//! Run outcome signals for the calling automation environment.

use crate::error::Result;
use std::io::Write;
use std::path::PathBuf;

/// Environment variable naming the file CI runners collect step outputs from.
pub const GITHUB_OUTPUT_VAR: &str = "GITHUB_OUTPUT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub needs_update: bool,
    pub update_id: Option<String>,
    pub build_number: Option<String>,
}

impl RunOutcome {
    pub fn no_update(update_id: Option<String>) -> Self {
        Self {
            needs_update: false,
            update_id,
            build_number: None,
        }
    }

    /// `key=value` lines in emission order.
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = vec![format!("needsUpd={}", self.needs_update)];
        if let Some(id) = &self.update_id {
            lines.push(format!("updId={id}"));
        }
        if let Some(build) = &self.build_number {
            lines.push(format!("buildNum={build}"));
        }
        lines
    }
}

/// Appends outcome lines to an output file, or prints them when no file is
/// configured.
pub struct OutcomeWriter {
    target: Option<PathBuf>,
}

impl OutcomeWriter {
    pub fn new(target: Option<PathBuf>) -> Self {
        Self { target }
    }

    pub fn from_env() -> Self {
        Self::new(
            std::env::var_os(GITHUB_OUTPUT_VAR)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
        )
    }

    pub fn emit(&self, outcome: &RunOutcome) -> Result<()> {
        let lines = outcome.to_lines();
        match &self.target {
            Some(path) => {
                let mut file = std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(path)?;
                for line in &lines {
                    writeln!(file, "{line}")?;
                }
            }
            None => {
                for line in &lines {
                    println!("{line}");
                }
            }
        }
        Ok(())
    }
}
