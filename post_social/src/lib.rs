//! post-social - numbered frames to size-capped social media loops
//!
//! Takes a directory of `frame0000.png`, `frame0001.png`, ... and produces,
//! for each platform target, a forward-then-backward looping GIF or MP4 that
//! fits the platform's upload size limit:
//! - Tumblr / Twitter: GIF, largest resolution and palette under the ceiling
//! - Facebook / Instagram: MP4, clip repeated into a longer loop
//!
//! ```rust,ignore
//! use post_social::{default_targets, run, ExternalEncoder, MetadataSizeProbe, RunConfig};
//!
//! let config = RunConfig::new("frames/");
//! let encoder = ExternalEncoder::new(config.tool_timeout);
//! let report = run(&config, &default_targets(), &encoder, &MetadataSizeProbe)?;
//! std::process::exit(report.exit_code());
//! ```

pub mod composer;
pub mod config;
pub mod encoder;
pub mod error;
pub mod frames;
pub mod report;
pub mod runner;
pub mod search;
pub mod workspace;

pub use composer::{compose_reversed_loop, reversed_loop};
pub use config::{
    default_targets, load_targets, PlatformTarget, QualityStep, RepeatPolicy, Resolution,
    RunConfig, SizeProbeKind, TargetKind,
};
pub use encoder::{
    size_probe_for, Artifact, DuSizeProbe, Encoder, ExternalEncoder, MetadataSizeProbe, SizeProbe,
};
pub use error::{PostSocialError, Result};
pub use frames::{detect_format, scan_directory, FrameFormat, FrameSequence, FrameSet};
pub use report::{RunReport, EXIT_BUDGET_UNMET, EXIT_OK, EXIT_SETUP_FAILURE};
pub use runner::run;
pub use search::{EncodingAttempt, SearchOutcome, SearchState, SizeSearch};
pub use workspace::Workspace;
