//! Size probes.

use shared_utils::{run_tool, FileSize, ToolInvocation};
use std::path::Path;
use std::time::Duration;

use super::SizeProbe;
use crate::config::SizeProbeKind;
use crate::error::{PostSocialError, Result};

/// `du -k <path>`, first field of stdout in KiB.
///
/// Reports allocated disk blocks, so the value is rounded up to the
/// filesystem block size.
#[derive(Debug, Clone)]
pub struct DuSizeProbe {
    timeout: Duration,
}

impl DuSizeProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

/// Parse the KiB count from `du -k` output: `"2048\t/path/to/file\n"`.
pub fn parse_du_output(stdout: &str) -> Option<u64> {
    stdout
        .lines()
        .next()?
        .split(|c: char| c == '\t' || c.is_whitespace())
        .next()?
        .parse()
        .ok()
}

impl SizeProbe for DuSizeProbe {
    fn measure(&self, path: &Path) -> Result<FileSize> {
        let output = run_tool(
            &ToolInvocation::new("du")
                .arg("-k")
                .arg(path)
                .timeout(self.timeout),
        )
        .map_err(|e| PostSocialError::measurement(path, e.diagnostic(), e.to_string()))?;

        print_du_line(&output.stdout);
        let kb = parse_du_output(&output.stdout).ok_or_else(|| {
            PostSocialError::measurement(path, output.stdout.clone(), "no parsable output from du")
        })?;
        Ok(FileSize::from_kb(kb))
    }
}

fn print_du_line(stdout: &str) {
    if let Some(line) = stdout.lines().next() {
        tracing::info!(du = %line, "Measured size");
    }
}

/// Exact byte length from file metadata, no external process.
#[derive(Debug, Clone, Copy, Default)]
pub struct MetadataSizeProbe;

impl SizeProbe for MetadataSizeProbe {
    fn measure(&self, path: &Path) -> Result<FileSize> {
        std::fs::metadata(path)
            .map(|m| FileSize::new(m.len()))
            .map_err(|e| PostSocialError::measurement(path, String::new(), e.to_string()))
    }
}

pub fn size_probe_for(kind: SizeProbeKind, timeout: Duration) -> Box<dyn SizeProbe> {
    match kind {
        SizeProbeKind::Du => Box::new(DuSizeProbe::new(timeout)),
        SizeProbeKind::Metadata => Box::new(MetadataSizeProbe),
    }
}
