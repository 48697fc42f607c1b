use crate::error::{Result, UupError};
use std::path::Path;
use tracing::debug;

/// A literal text substitution applied to one script of an extracted package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptPatch {
    pub file_name: String,
    pub from: String,
    pub to: String,
}

impl Default for ScriptPatch {
    /// Makes the Linux conversion script resolve `bash` through `PATH`, so it
    /// also runs on hosts where bash does not live in `/bin`.
    fn default() -> Self {
        Self {
            file_name: "uup_download_linux.sh".to_string(),
            from: "#!/bin/bash".to_string(),
            to: "#!/usr/bin/env bash".to_string(),
        }
    }
}

impl ScriptPatch {
    /// Rewrites the script inside `dir`. Returns how many occurrences were
    /// replaced.
    pub fn apply(&self, dir: &Path) -> Result<usize> {
        let path = dir.join(&self.file_name);
        let content = std::fs::read_to_string(&path).map_err(|e| UupError::PostProcess {
            message: format!("cannot read {}: {e}", path.display()),
        })?;

        let count = content.matches(self.from.as_str()).count();
        if count > 0 {
            std::fs::write(&path, content.replace(&self.from, &self.to)).map_err(|e| {
                UupError::PostProcess {
                    message: format!("cannot write {}: {e}", path.display()),
                }
            })?;
        }

        debug!(path = %path.display(), count, "script patched");
        Ok(count)
    }
}
