//! Run configuration and platform target table.
//!
//! Everything here is built once per invocation and passed down
//! immutably; no component reaches for global directory state.

use serde::{Deserialize, Serialize};
use shared_utils::{FileSize, DEFAULT_TOOL_TIMEOUT};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::{PostSocialError, Result};

pub const DEFAULT_OUTPUT_DIR_NAME: &str = "_post-social";
pub const SCRATCH_DIR_NAME: &str = "temp";

/// gifsicle `--delay`, in hundredths of a second.
pub const DEFAULT_GIF_FRAME_DELAY: u16 = 11;
pub const DEFAULT_VIDEO_FRAME_RATE: u32 = 14;
pub const DEFAULT_VIDEO_CODEC: &str = "libx264";
pub const DEFAULT_PIXEL_FORMAT: &str = "yuv444p";
/// x264's own default, so a single-step ladder matches a plain encode.
pub const DEFAULT_CRF: u8 = 23;

/// 256, 224, ..., 32.
pub fn default_palette_ladder() -> Vec<u16> {
    (1..=8u16).rev().map(|i| i * 32).collect()
}

// ═══════════════════════════════════════════════════════════════
// Resolution
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for Resolution {
    type Err = PostSocialError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || PostSocialError::InvalidTarget(format!("invalid resolution {s:?}, expected WIDTHxHEIGHT"));
        let (w, h) = s.trim().split_once('x').ok_or_else(invalid)?;
        let width: u32 = w.parse().map_err(|_| invalid())?;
        let height: u32 = h.parse().map_err(|_| invalid())?;
        if width == 0 || height == 0 {
            return Err(invalid());
        }
        Ok(Self { width, height })
    }
}

impl TryFrom<String> for Resolution {
    type Error = PostSocialError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Resolution> for String {
    fn from(value: Resolution) -> Self {
        value.to_string()
    }
}

// ═══════════════════════════════════════════════════════════════
// Quality steps
// ═══════════════════════════════════════════════════════════════

/// One rung of a quality ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityStep {
    /// GIF palette size (number of colors).
    Palette(u16),
    /// x264/x265 constant rate factor.
    Crf(u8),
}

impl fmt::Display for QualityStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QualityStep::Palette(colors) => write!(f, "{} colors", colors),
            QualityStep::Crf(crf) => write!(f, "crf {}", crf),
        }
    }
}

// ═══════════════════════════════════════════════════════════════
// Target kinds
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GifSettings {
    #[serde(default = "default_gif_delay")]
    pub frame_delay: u16,
    /// Highest quality first.
    #[serde(default = "default_palette_ladder")]
    pub palettes: Vec<u16>,
}

fn default_gif_delay() -> u16 {
    DEFAULT_GIF_FRAME_DELAY
}

/// How many times the composed clip is concatenated into the final video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum RepeatPolicy {
    Fixed { times: u32 },
    /// Pick a count so the whole video lasts between `min_secs` and
    /// `max_secs`. A clip already longer than `max_secs` plays once.
    FitDuration { min_secs: f64, max_secs: f64 },
}

impl RepeatPolicy {
    pub fn repeat_count(&self, clip_frames: usize, frame_rate: u32) -> u32 {
        match *self {
            RepeatPolicy::Fixed { times } => times.max(1),
            RepeatPolicy::FitDuration { min_secs, max_secs } => {
                if clip_frames == 0 || frame_rate == 0 {
                    return 1;
                }
                let clip_secs = clip_frames as f64 / frame_rate as f64;
                let mut count = (min_secs / clip_secs).ceil().max(1.0) as u32;
                while count > 1 && count as f64 * clip_secs > max_secs {
                    count -= 1;
                }
                count
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSettings {
    #[serde(default = "default_frame_rate")]
    pub frame_rate: u32,
    #[serde(default = "default_codec")]
    pub codec: String,
    #[serde(default = "default_pixel_format")]
    pub pixel_format: String,
    /// Highest quality (lowest CRF) first.
    #[serde(default = "default_crfs")]
    pub crfs: Vec<u8>,
    #[serde(default = "default_repeat")]
    pub repeat: RepeatPolicy,
}

fn default_frame_rate() -> u32 {
    DEFAULT_VIDEO_FRAME_RATE
}
fn default_codec() -> String {
    DEFAULT_VIDEO_CODEC.to_string()
}
fn default_pixel_format() -> String {
    DEFAULT_PIXEL_FORMAT.to_string()
}
fn default_crfs() -> Vec<u8> {
    vec![DEFAULT_CRF]
}
fn default_repeat() -> RepeatPolicy {
    RepeatPolicy::Fixed { times: 5 }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum TargetKind {
    Gif(GifSettings),
    Video(VideoSettings),
}

// ═══════════════════════════════════════════════════════════════
// PlatformTarget
// ═══════════════════════════════════════════════════════════════

/// One social platform: what to produce and how small it has to be.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformTarget {
    pub name: String,
    /// Size ceiling in KiB; `None` accepts the first successful encode.
    #[serde(default)]
    pub budget_kb: Option<u64>,
    /// Largest first.
    pub resolutions: Vec<Resolution>,
    #[serde(flatten)]
    pub kind: TargetKind,
}

impl PlatformTarget {
    pub fn budget(&self) -> Option<FileSize> {
        self.budget_kb.map(FileSize::from_kb)
    }

    pub fn quality_ladder(&self) -> Vec<QualityStep> {
        match &self.kind {
            TargetKind::Gif(gif) => gif.palettes.iter().map(|&p| QualityStep::Palette(p)).collect(),
            TargetKind::Video(video) => video.crfs.iter().map(|&c| QualityStep::Crf(c)).collect(),
        }
    }

    pub fn is_gif(&self) -> bool {
        matches!(self.kind, TargetKind::Gif(_))
    }

    /// `tumblr540x540-256.gif` / `facebook400x400.mp4`
    pub fn artifact_name(&self, resolution: Resolution, quality: QualityStep) -> String {
        match (&self.kind, quality) {
            (TargetKind::Gif(_), QualityStep::Palette(colors)) => {
                format!("{}{}-{}.gif", self.name, resolution, colors)
            }
            _ => format!("{}{}.mp4", self.name, resolution),
        }
    }

    pub fn validate(&self) -> Result<()> {
        let bad = |msg: String| Err(PostSocialError::InvalidTarget(format!("{}: {}", self.name, msg)));

        if self.name.is_empty()
            || !self
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(PostSocialError::InvalidTarget(format!(
                "target name {:?} must be non-empty ASCII letters, digits, '-' or '_'",
                self.name
            )));
        }
        if self.resolutions.is_empty() {
            return bad("resolution ladder is empty".to_string());
        }
        if self.budget_kb == Some(0) {
            return bad("budget_kb must be positive".to_string());
        }
        match &self.kind {
            TargetKind::Gif(gif) => {
                if gif.palettes.is_empty() {
                    return bad("palette ladder is empty".to_string());
                }
                if let Some(p) = gif.palettes.iter().find(|&&p| !(2..=256).contains(&p)) {
                    return bad(format!("palette size {} outside 2..=256", p));
                }
            }
            TargetKind::Video(video) => {
                if video.crfs.is_empty() {
                    return bad("crf ladder is empty".to_string());
                }
                if let Some(c) = video.crfs.iter().find(|&&c| c > 51) {
                    return bad(format!("crf {} outside 0..=51", c));
                }
                if video.frame_rate == 0 {
                    return bad("frame_rate must be positive".to_string());
                }
                if let RepeatPolicy::FitDuration { min_secs, max_secs } = video.repeat {
                    if !(min_secs > 0.0 && max_secs >= min_secs) {
                        return bad(format!("invalid duration window {}..{}", min_secs, max_secs));
                    }
                }
            }
        }
        Ok(())
    }
}

/// Tumblr and Twitter GIFs, Facebook and Instagram MP4s.
pub fn default_targets() -> Vec<PlatformTarget> {
    let res = |list: &[(u32, u32)]| -> Vec<Resolution> {
        list.iter().map(|&(w, h)| Resolution::new(w, h)).collect()
    };
    let gif = || {
        TargetKind::Gif(GifSettings {
            frame_delay: DEFAULT_GIF_FRAME_DELAY,
            palettes: default_palette_ladder(),
        })
    };
    let video = |repeat: RepeatPolicy| {
        TargetKind::Video(VideoSettings {
            frame_rate: DEFAULT_VIDEO_FRAME_RATE,
            codec: DEFAULT_VIDEO_CODEC.to_string(),
            pixel_format: DEFAULT_PIXEL_FORMAT.to_string(),
            crfs: vec![DEFAULT_CRF],
            repeat,
        })
    };

    vec![
        PlatformTarget {
            name: "tumblr".to_string(),
            budget_kb: Some(2 * 1024),
            resolutions: res(&[(540, 540), (405, 405), (270, 270)]),
            kind: gif(),
        },
        PlatformTarget {
            name: "twitter".to_string(),
            budget_kb: Some(3 * 1024),
            resolutions: res(&[(640, 640), (480, 480), (320, 320)]),
            kind: gif(),
        },
        PlatformTarget {
            name: "facebook".to_string(),
            budget_kb: None,
            resolutions: res(&[(400, 400)]),
            kind: video(RepeatPolicy::Fixed { times: 5 }),
        },
        PlatformTarget {
            name: "instagram".to_string(),
            budget_kb: None,
            resolutions: res(&[(510, 510)]),
            kind: video(RepeatPolicy::FitDuration {
                min_secs: 3.0,
                max_secs: 15.0,
            }),
        },
    ]
}

/// Read a JSON array of targets and validate each one.
pub fn load_targets(path: &Path) -> Result<Vec<PlatformTarget>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| PostSocialError::setup_io("Cannot read targets file", path, e))?;
    parse_targets(&text)
}

pub fn parse_targets(json: &str) -> Result<Vec<PlatformTarget>> {
    let targets: Vec<PlatformTarget> = serde_json::from_str(json)
        .map_err(|e| PostSocialError::InvalidTarget(format!("targets file: {}", e)))?;
    if targets.is_empty() {
        return Err(PostSocialError::InvalidTarget("targets file lists no targets".to_string()));
    }
    for target in &targets {
        target.validate()?;
    }
    Ok(targets)
}

// ═══════════════════════════════════════════════════════════════
// RunConfig
// ═══════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SizeProbeKind {
    /// `du -k`, parsed from text output.
    #[default]
    Du,
    /// File metadata length, no external process.
    Metadata,
}

/// Immutable per-run paths and knobs.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub scratch_dir: PathBuf,
    pub tool_timeout: Duration,
    pub size_probe: SizeProbeKind,
    /// Leave `<output>/temp` behind after the run.
    pub keep_scratch: bool,
}

impl RunConfig {
    pub fn new(input_dir: impl Into<PathBuf>) -> Self {
        Self::with_output_name(input_dir, DEFAULT_OUTPUT_DIR_NAME)
    }

    pub fn with_output_name(input_dir: impl Into<PathBuf>, output_name: &str) -> Self {
        let input_dir = input_dir.into();
        let output_dir = input_dir.join(output_name);
        let scratch_dir = output_dir.join(SCRATCH_DIR_NAME);
        Self {
            input_dir,
            output_dir,
            scratch_dir,
            tool_timeout: DEFAULT_TOOL_TIMEOUT,
            size_probe: SizeProbeKind::default(),
            keep_scratch: false,
        }
    }

    pub fn tool_timeout(mut self, timeout: Duration) -> Self {
        self.tool_timeout = timeout;
        self
    }

    pub fn size_probe(mut self, kind: SizeProbeKind) -> Self {
        self.size_probe = kind;
        self
    }

    pub fn keep_scratch(mut self, keep: bool) -> Self {
        self.keep_scratch = keep;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_parse_and_display() {
        let r: Resolution = "540x540".parse().unwrap();
        assert_eq!(r, Resolution::new(540, 540));
        assert_eq!(r.to_string(), "540x540");
        assert_eq!("1280x720".parse::<Resolution>().unwrap(), Resolution::new(1280, 720));
        assert!("540".parse::<Resolution>().is_err());
        assert!("0x540".parse::<Resolution>().is_err());
        assert!("axb".parse::<Resolution>().is_err());
        assert!("540X540".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_default_palette_ladder() {
        assert_eq!(default_palette_ladder(), vec![256, 224, 192, 160, 128, 96, 64, 32]);
    }

    #[test]
    fn test_default_targets_are_valid() {
        let targets = default_targets();
        let names: Vec<&str> = targets.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["tumblr", "twitter", "facebook", "instagram"]);
        for t in &targets {
            t.validate().unwrap();
        }
        let tumblr = &targets[0];
        assert_eq!(tumblr.budget(), Some(FileSize::from_kb(2048)));
        assert_eq!(tumblr.resolutions[0], Resolution::new(540, 540));
        assert_eq!(tumblr.quality_ladder().first(), Some(&QualityStep::Palette(256)));
        assert_eq!(targets[2].budget(), None);
        assert_eq!(targets[2].quality_ladder(), vec![QualityStep::Crf(23)]);
    }

    #[test]
    fn test_artifact_names() {
        let targets = default_targets();
        assert_eq!(
            targets[0].artifact_name(Resolution::new(540, 540), QualityStep::Palette(224)),
            "tumblr540x540-224.gif"
        );
        assert_eq!(
            targets[2].artifact_name(Resolution::new(400, 400), QualityStep::Crf(23)),
            "facebook400x400.mp4"
        );
    }

    #[test]
    fn test_repeat_policy() {
        assert_eq!(RepeatPolicy::Fixed { times: 5 }.repeat_count(20, 14), 5);
        assert_eq!(RepeatPolicy::Fixed { times: 0 }.repeat_count(20, 14), 1);

        let fit = RepeatPolicy::FitDuration {
            min_secs: 3.0,
            max_secs: 15.0,
        };
        // 20 frames @ 14fps = 1.43s -> 3 plays = 4.3s
        assert_eq!(fit.repeat_count(20, 14), 3);
        // 84 frames = 6s -> once is enough
        assert_eq!(fit.repeat_count(84, 14), 1);
        // 280 frames = 20s, longer than the window -> still once
        assert_eq!(fit.repeat_count(280, 14), 1);
        assert_eq!(fit.repeat_count(0, 14), 1);

        // 10s clip, 12..15 window: 2 plays would be 20s, so back off to 1
        let narrow = RepeatPolicy::FitDuration {
            min_secs: 12.0,
            max_secs: 15.0,
        };
        assert_eq!(narrow.repeat_count(140, 14), 1);
    }

    #[test]
    fn test_parse_targets_json() {
        let json = r#"[
            {"name": "tumblr", "budget_kb": 2048, "resolutions": ["540x540", "270x270"],
             "format": "gif", "frame_delay": 8, "palettes": [256, 128]},
            {"name": "facebook", "resolutions": ["400x400"], "format": "video",
             "repeat": {"mode": "fit_duration", "min_secs": 3.0, "max_secs": 15.0}}
        ]"#;
        let targets = parse_targets(json).unwrap();
        assert_eq!(targets.len(), 2);
        match &targets[0].kind {
            TargetKind::Gif(gif) => {
                assert_eq!(gif.frame_delay, 8);
                assert_eq!(gif.palettes, vec![256, 128]);
            }
            other => panic!("unexpected kind {other:?}"),
        }
        match &targets[1].kind {
            TargetKind::Video(video) => {
                assert_eq!(video.frame_rate, DEFAULT_VIDEO_FRAME_RATE);
                assert_eq!(video.codec, "libx264");
                assert_eq!(video.crfs, vec![DEFAULT_CRF]);
            }
            other => panic!("unexpected kind {other:?}"),
        }
        assert_eq!(targets[1].budget_kb, None);
    }

    #[test]
    fn test_parse_targets_rejects_bad_input() {
        assert!(parse_targets("[]").is_err());
        assert!(parse_targets("not json").is_err());
        let bad_res = r#"[{"name": "x", "resolutions": ["big"], "format": "gif"}]"#;
        assert!(parse_targets(bad_res).is_err());
        let bad_name = r#"[{"name": "../x", "resolutions": ["10x10"], "format": "gif"}]"#;
        assert!(parse_targets(bad_name).is_err());
        let bad_palette = r#"[{"name": "x", "resolutions": ["10x10"], "format": "gif", "palettes": [512]}]"#;
        assert!(parse_targets(bad_palette).is_err());
        let empty_ladder = r#"[{"name": "x", "resolutions": [], "format": "gif"}]"#;
        assert!(parse_targets(empty_ladder).is_err());
    }

    #[test]
    fn test_run_config_paths() {
        let config = RunConfig::new("/frames");
        assert_eq!(config.output_dir, PathBuf::from("/frames/_post-social"));
        assert_eq!(config.scratch_dir, PathBuf::from("/frames/_post-social/temp"));
        assert_eq!(config.tool_timeout, DEFAULT_TOOL_TIMEOUT);
        assert_eq!(config.size_probe, SizeProbeKind::Du);

        let alt = RunConfig::with_output_name("/frames", "post-social")
            .tool_timeout(Duration::from_secs(5))
            .size_probe(SizeProbeKind::Metadata)
            .keep_scratch(true);
        assert_eq!(alt.output_dir, PathBuf::from("/frames/post-social"));
        assert_eq!(alt.tool_timeout, Duration::from_secs(5));
        assert!(alt.keep_scratch);
    }
}
