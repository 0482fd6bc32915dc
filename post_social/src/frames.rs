//! Frame Store
//!
//! Input frames are named `frame####.<ext>`: exactly four zero-padded digits,
//! `ext` one of bmp, gif, jpg, png, indices contiguous from 0.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::error::{PostSocialError, Result};

const FRAME_PREFIX: &str = "frame";
const INDEX_DIGITS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameFormat {
    Bmp,
    Gif,
    Jpg,
    Png,
}

impl FrameFormat {
    /// Detection order when several formats are present doesn't matter:
    /// the first matching file name wins.
    pub const ALL: [FrameFormat; 4] = [
        FrameFormat::Bmp,
        FrameFormat::Gif,
        FrameFormat::Jpg,
        FrameFormat::Png,
    ];

    pub fn extension(&self) -> &'static str {
        match self {
            FrameFormat::Bmp => "bmp",
            FrameFormat::Gif => "gif",
            FrameFormat::Jpg => "jpg",
            FrameFormat::Png => "png",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }
}

impl fmt::Display for FrameFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameId {
    pub index: u32,
    pub format: FrameFormat,
}

impl FrameId {
    pub fn new(index: u32, format: FrameFormat) -> Self {
        Self { index, format }
    }

    pub fn file_name(&self) -> String {
        frame_file_name(self.index, self.format)
    }
}

pub fn frame_file_name(index: u32, format: FrameFormat) -> String {
    format!("{FRAME_PREFIX}{index:04}.{}", format.extension())
}

/// Parse `frame####.<ext>`. Anything else, including five-digit indices or
/// upper-case extensions, is rejected.
pub fn parse_frame_name(name: &str) -> Option<FrameId> {
    let rest = name.strip_prefix(FRAME_PREFIX)?;
    let (digits, ext) = rest.split_once('.')?;
    if digits.len() != INDEX_DIGITS || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let format = FrameFormat::from_extension(ext)?;
    let index = digits.parse().ok()?;
    Some(FrameId { index, format })
}

/// Extension of the first file name that looks like a frame.
///
/// Mixed extensions are not validated: the caller only ever uses frames of
/// the returned format.
pub fn detect_format<I, S>(file_names: I) -> Option<FrameFormat>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    file_names
        .into_iter()
        .find_map(|name| parse_frame_name(name.as_ref()))
        .map(|id| id.format)
}

// ═══════════════════════════════════════════════════════════════
// FrameSequence
// ═══════════════════════════════════════════════════════════════

/// Ordered frames with contiguous indices `0..len`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSequence {
    frames: Vec<FrameId>,
}

impl FrameSequence {
    pub fn contiguous(format: FrameFormat, len: u32) -> Self {
        Self {
            frames: (0..len).map(|i| FrameId::new(i, format)).collect(),
        }
    }

    /// Build from arbitrary ids, sorting by index and checking the numbering
    /// starts at 0 without gaps or duplicates. On failure returns the first
    /// index that was expected but not found.
    pub fn from_ids(mut ids: Vec<FrameId>) -> std::result::Result<Self, u32> {
        ids.sort_by_key(|id| id.index);
        for (expected, id) in ids.iter().enumerate() {
            if id.index != expected as u32 {
                return Err(expected as u32);
            }
        }
        Ok(Self { frames: ids })
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn max_index(&self) -> Option<u32> {
        self.frames.last().map(|f| f.index)
    }

    /// Format of the first frame. Frames produced by this crate always share
    /// one format.
    pub fn format(&self) -> Option<FrameFormat> {
        self.frames.first().map(|f| f.format)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, FrameId> {
        self.frames.iter()
    }

    pub fn ids(&self) -> &[FrameId] {
        &self.frames
    }

    /// Same indices, different file format (after a reformat pass).
    pub fn with_format(&self, format: FrameFormat) -> Self {
        Self {
            frames: self
                .frames
                .iter()
                .map(|f| FrameId::new(f.index, format))
                .collect(),
        }
    }

    pub(crate) fn append(&mut self, id: FrameId) {
        debug_assert_eq!(id.index as usize, self.frames.len());
        self.frames.push(id);
    }
}

/// A frame sequence together with the directory its files live in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameSet {
    pub dir: PathBuf,
    pub sequence: FrameSequence,
}

impl FrameSet {
    pub fn new(dir: impl Into<PathBuf>, sequence: FrameSequence) -> Self {
        Self {
            dir: dir.into(),
            sequence,
        }
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.sequence
            .iter()
            .map(|id| self.dir.join(id.file_name()))
            .collect()
    }

    pub fn path_of(&self, id: &FrameId) -> PathBuf {
        self.dir.join(id.file_name())
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// printf-style input pattern for ffmpeg's image2 demuxer.
    pub fn image2_pattern(&self) -> Option<PathBuf> {
        self.sequence
            .format()
            .map(|f| self.dir.join(format!("{FRAME_PREFIX}%0{INDEX_DIGITS}d.{}", f.extension())))
    }
}

// ═══════════════════════════════════════════════════════════════
// Directory scan
// ═══════════════════════════════════════════════════════════════

/// List `dir` (non-recursive) and return its frame sequence.
///
/// Unreadable directory, no frame files, or a hole in the numbering are
/// setup failures.
pub fn scan_directory(dir: &Path) -> Result<FrameSequence> {
    let mut names = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let message = format!("Cannot read input directory: {}", e);
            match e.into_io_error() {
                Some(io) => PostSocialError::setup_io(message, dir, io),
                None => PostSocialError::setup(message, dir),
            }
        })?;
        if entry.file_type().is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    let format = detect_format(&names).ok_or_else(|| {
        PostSocialError::setup(
            format!(
                "No frame files found in {} (expected frame####.{{{}}})",
                dir.display(),
                FrameFormat::ALL.map(|f| f.extension()).join(",")
            ),
            dir,
        )
    })?;

    let ids: Vec<FrameId> = names
        .iter()
        .filter_map(|n| parse_frame_name(n))
        .filter(|id| id.format == format)
        .collect();
    let count = ids.len();

    let sequence = FrameSequence::from_ids(ids).map_err(|missing| {
        PostSocialError::setup(
            format!(
                "Frame numbering must be contiguous from 0: {} is missing",
                frame_file_name(missing, format)
            ),
            dir,
        )
    })?;

    tracing::info!(dir = %dir.display(), format = %format, frames = count, "📂 Found input frames");
    Ok(sequence)
}
