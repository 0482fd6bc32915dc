//! Encoder Adapter
//!
//! The search only talks to these two traits. The default backends shell
//! out to ImageMagick (`mogrify`), `gifsicle`, `ffmpeg` and `du`; tests
//! inject fakes.

mod external;
mod probe;

pub use external::ExternalEncoder;
pub use probe::{parse_du_output, size_probe_for, DuSizeProbe, MetadataSizeProbe};

use shared_utils::FileSize;
use std::path::{Path, PathBuf};

use crate::config::{Resolution, VideoSettings};
use crate::error::Result;
use crate::frames::{FrameFormat, FrameSet};

/// An encoded output file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub path: PathBuf,
}

impl Artifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

/// Frame and artifact producing operations. Every call blocks until the
/// underlying work is finished.
pub trait Encoder {
    /// Resize every frame to fill `resolution` and convert it to `format`.
    /// The returned set lives in the same directory with the same indices.
    fn resize_and_format(
        &self,
        frames: &FrameSet,
        resolution: Resolution,
        format: FrameFormat,
    ) -> Result<FrameSet>;

    /// Build a looping GIF with at most `palette_size` colors.
    /// `frame_delay` is in hundredths of a second.
    fn quantize_and_assemble_gif(
        &self,
        frames: &FrameSet,
        palette_size: u16,
        frame_delay: u16,
        output: &Path,
    ) -> Result<Artifact>;

    /// Build an MP4 from the frames, repeated per `settings.repeat`.
    fn assemble_video(
        &self,
        frames: &FrameSet,
        settings: &VideoSettings,
        crf: u8,
        output: &Path,
    ) -> Result<Artifact>;
}

pub trait SizeProbe {
    fn measure(&self, path: &Path) -> Result<FileSize>;
}
