//! External tools detection

use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolAvailability {
    pub name: String,
    /// Resolved location on PATH, `None` when the tool is missing.
    pub path: Option<PathBuf>,
}

impl ToolAvailability {
    pub fn is_available(&self) -> bool {
        self.path.is_some()
    }
}

/// Resolve every tool on PATH. Missing tools are logged as warnings, never
/// treated as errors here: the call that needs the tool reports the failure.
pub fn check_tools(names: &[&str]) -> Vec<ToolAvailability> {
    names
        .iter()
        .map(|name| {
            let path = which::which(name).ok();
            match &path {
                Some(p) => tracing::debug!(tool = name, path = ?p, "Found external tool"),
                None => tracing::warn!(tool = name, "⚠️ External tool not found on PATH"),
            }
            ToolAvailability {
                name: name.to_string(),
                path,
            }
        })
        .collect()
}
