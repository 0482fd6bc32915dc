//! Drives every platform target over one input directory.

use shared_utils::{report_error, ErrorCategory};
use std::time::Instant;
use tracing::{info, warn};

use crate::config::{PlatformTarget, RunConfig};
use crate::encoder::{Encoder, SizeProbe};
use crate::error::Result;
use crate::frames::scan_directory;
use crate::report::RunReport;
use crate::search::SizeSearch;
use crate::workspace::Workspace;

/// Run all targets in order.
///
/// Returns `Err` only for setup failures (bad targets, no usable frames,
/// output root not creatable); nothing has been encoded in that case. A
/// target that misses its budget is reported, warned about once, and the
/// run moves on to the next target.
pub fn run(
    config: &RunConfig,
    targets: &[PlatformTarget],
    encoder: &dyn Encoder,
    probe: &dyn SizeProbe,
) -> Result<RunReport> {
    let start = Instant::now();

    for target in targets {
        target.validate()?;
    }
    let source = scan_directory(&config.input_dir)?;

    let workspace = Workspace::new(config);
    workspace.prepare()?;
    info!(
        input = %config.input_dir.display(),
        output = %workspace.output_dir().display(),
        frames = source.len(),
        targets = targets.len(),
        "🚀 post-social run started"
    );

    let mut outcomes = Vec::with_capacity(targets.len());
    for target in targets {
        let outcome = SizeSearch::new(target, encoder, probe, &workspace, &config.input_dir, &source).run();
        if !outcome.is_satisfied() {
            warn!(
                platform = %target.name,
                attempts = outcome.attempts.len(),
                "Failed to generate small enough file for {}.",
                target.name
            );
        }
        outcomes.push(outcome);
    }

    if config.keep_scratch {
        info!(scratch = %workspace.scratch_dir().display(), "Keeping scratch directory");
    } else if let Err(e) = workspace.cleanup() {
        report_error(ErrorCategory::Optional, "removing scratch directory", &e);
    }

    let report = RunReport {
        input_dir: config.input_dir.clone(),
        output_dir: workspace.output_dir().to_path_buf(),
        frames: source.len(),
        outcomes,
        elapsed_secs: start.elapsed().as_secs_f64(),
    };
    info!(
        satisfied = report.satisfied(),
        unmet = report.unmet_platforms().len(),
        elapsed_secs = report.elapsed_secs,
        "🏁 post-social run finished"
    );
    Ok(report)
}
