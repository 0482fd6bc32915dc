//! Default encoder backend: ImageMagick `mogrify`, `gifsicle`, `ffmpeg`.

use shared_utils::{run_tool, ToolInvocation};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use super::{Artifact, Encoder};
use crate::config::{PlatformTarget, Resolution, VideoSettings};
use crate::error::{PostSocialError, Result};
use crate::frames::{FrameFormat, FrameSet};

const CLIP_FILE_NAME: &str = "clip.mp4";
const PLAYLIST_FILE_NAME: &str = "playlist.txt";

#[derive(Debug, Clone)]
pub struct ExternalEncoder {
    mogrify: String,
    gifsicle: String,
    ffmpeg: String,
    timeout: Duration,
}

impl ExternalEncoder {
    pub const REQUIRED_TOOLS: [&'static str; 3] = ["mogrify", "gifsicle", "ffmpeg"];

    pub fn new(timeout: Duration) -> Self {
        Self {
            mogrify: "mogrify".to_string(),
            gifsicle: "gifsicle".to_string(),
            ffmpeg: "ffmpeg".to_string(),
            timeout,
        }
    }

    /// Tools a target cannot be produced without.
    pub fn tools_for(target: &PlatformTarget) -> [&'static str; 2] {
        if target.is_gif() {
            ["mogrify", "gifsicle"]
        } else {
            ["mogrify", "ffmpeg"]
        }
    }

    fn invocation(&self, program: &str) -> ToolInvocation {
        ToolInvocation::new(program).timeout(self.timeout)
    }

    /// `mogrify -resize WxH^ -format <ext> <frames...>`
    pub(crate) fn mogrify_args(frames: &FrameSet, resolution: Resolution, format: FrameFormat) -> Vec<String> {
        let mut args = vec![
            "-resize".to_string(),
            format!("{}^", resolution),
            "-format".to_string(),
            format.extension().to_string(),
        ];
        args.extend(frames.paths().iter().map(|p| p.to_string_lossy().into_owned()));
        args
    }

    /// `gifsicle --delay=<d> --loop --colors=<n> <frames...>`
    pub(crate) fn gifsicle_args(frames: &FrameSet, palette_size: u16, frame_delay: u16) -> Vec<String> {
        let mut args = vec![
            format!("--delay={}", frame_delay),
            "--loop".to_string(),
            format!("--colors={}", palette_size),
        ];
        args.extend(frames.paths().iter().map(|p| p.to_string_lossy().into_owned()));
        args
    }

    pub(crate) fn image2_args(pattern: &Path, settings: &VideoSettings, crf: u8, clip: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-f".to_string(),
            "image2".to_string(),
            "-start_number".to_string(),
            "0".to_string(),
            "-framerate".to_string(),
            settings.frame_rate.to_string(),
            "-i".to_string(),
            pattern.to_string_lossy().into_owned(),
            "-vcodec".to_string(),
            settings.codec.clone(),
            "-crf".to_string(),
            crf.to_string(),
            "-pix_fmt".to_string(),
            settings.pixel_format.clone(),
            clip.to_string_lossy().into_owned(),
        ]
    }

    pub(crate) fn concat_args(playlist: &Path, output: &Path) -> Vec<String> {
        vec![
            "-y".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            playlist.to_string_lossy().into_owned(),
            "-c".to_string(),
            "copy".to_string(),
            output.to_string_lossy().into_owned(),
        ]
    }
}

/// ffmpeg concat demuxer playlist listing `clip_name` `times` times.
pub(crate) fn repeat_playlist(clip_name: &str, times: u32) -> String {
    (0..times.max(1))
        .map(|_| format!("file '{}'\n", clip_name))
        .collect()
}

fn no_frames(tool: &str) -> PostSocialError {
    PostSocialError::Encoding {
        tool: tool.to_string(),
        command: String::new(),
        exit_code: None,
        diagnostic: String::new(),
        message: "no frames to encode".to_string(),
    }
}

impl Encoder for ExternalEncoder {
    fn resize_and_format(
        &self,
        frames: &FrameSet,
        resolution: Resolution,
        format: FrameFormat,
    ) -> Result<FrameSet> {
        let resized = FrameSet::new(&frames.dir, frames.sequence.with_format(format));
        if frames.is_empty() {
            return Ok(resized);
        }

        run_tool(
            &self
                .invocation(&self.mogrify)
                .args(Self::mogrify_args(frames, resolution, format)),
        )?;
        info!(resolution = %resolution, format = %format, frames = frames.len(), "mogrify completed");
        Ok(resized)
    }

    fn quantize_and_assemble_gif(
        &self,
        frames: &FrameSet,
        palette_size: u16,
        frame_delay: u16,
        output: &Path,
    ) -> Result<Artifact> {
        if frames.is_empty() {
            return Err(no_frames(&self.gifsicle));
        }

        let result = run_tool(
            &self
                .invocation(&self.gifsicle)
                .args(Self::gifsicle_args(frames, palette_size, frame_delay))
                .stdout_to_file(output),
        )?;
        if !result.stderr.trim().is_empty() {
            tracing::warn!(tool = %self.gifsicle, stderr = %result.stderr.trim(), "STDERR");
        }
        Ok(Artifact::new(output))
    }

    fn assemble_video(
        &self,
        frames: &FrameSet,
        settings: &VideoSettings,
        crf: u8,
        output: &Path,
    ) -> Result<Artifact> {
        let pattern = frames.image2_pattern().ok_or_else(|| no_frames(&self.ffmpeg))?;
        let clip: PathBuf = frames.dir.join(CLIP_FILE_NAME);
        let playlist: PathBuf = frames.dir.join(PLAYLIST_FILE_NAME);

        run_tool(
            &self
                .invocation(&self.ffmpeg)
                .args(Self::image2_args(&pattern, settings, crf, &clip)),
        )?;

        let times = settings.repeat.repeat_count(frames.len(), settings.frame_rate);
        fs::write(&playlist, repeat_playlist(CLIP_FILE_NAME, times))
            .map_err(|e| PostSocialError::io(&playlist, e))?;
        info!(times, playlist = %playlist.display(), "Generated repeat playlist");

        run_tool(
            &self
                .invocation(&self.ffmpeg)
                .args(Self::concat_args(&playlist, output)),
        )?;
        Ok(Artifact::new(output))
    }
}
