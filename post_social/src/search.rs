//! Size-Constrained Search
//!
//! Walks the resolution ladder of one platform target (largest first) and,
//! at each resolution, the quality ladder (best first). The first
//! `(resolution, quality)` pair whose artifact is strictly below the size
//! ceiling wins and the search stops; it does not look for the smallest
//! passing artifact.
//!
//! ```text
//! NotStarted -> TryingResolution(0)
//! TryingResolution(r) -> TryingQuality(r, 0)        frames prepared at r
//!                     -> TryingResolution(r + 1)    preparation failed
//!                     -> Exhausted                  r past the ladder
//! TryingQuality(r, q) -> Satisfied                  under budget
//!                     -> TryingQuality(r, q + 1)    over budget
//!                     -> TryingResolution(r + 1)    q past the ladder,
//!                                                   or encode/measure failed
//! ```
//!
//! Only one artifact per target survives in the output directory. A newer
//! measured artifact replaces the previous one and failed encodes are
//! removed, so the user is left with the winner or, when the ladder is
//! exhausted, the last over-budget artifact.

use serde::Serialize;
use shared_utils::{report_error, ErrorCategory, FileSize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::composer::compose_reversed_loop;
use crate::config::{PlatformTarget, QualityStep, Resolution, TargetKind};
use crate::encoder::{Encoder, SizeProbe};
use crate::error::{PostSocialError, Result};
use crate::frames::{FrameFormat, FrameSequence, FrameSet};
use crate::workspace::Workspace;

/// Search position. Indices point into the target's ladders.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchState {
    NotStarted,
    TryingResolution(usize),
    TryingQuality { resolution: usize, quality: usize },
    Satisfied(EncodingAttempt),
    Exhausted,
}

impl SearchState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SearchState::Satisfied(_) | SearchState::Exhausted)
    }
}

/// One `(resolution, quality)` trial.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncodingAttempt {
    pub resolution: Resolution,
    pub quality: QualityStep,
    /// `None` when encoding or measuring failed.
    pub size: Option<FileSize>,
    /// Encoded, measured and under budget.
    pub success: bool,
    pub artifact: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub platform: String,
    pub budget: Option<FileSize>,
    /// The winning attempt; `None` means the ladder was exhausted.
    pub selected: Option<EncodingAttempt>,
    pub attempts: Vec<EncodingAttempt>,
}

impl SearchOutcome {
    pub fn is_satisfied(&self) -> bool {
        self.selected.is_some()
    }

    /// Last artifact that was actually written, if any.
    pub fn last_artifact(&self) -> Option<&Path> {
        self.attempts
            .iter()
            .rev()
            .find(|a| a.size.is_some())
            .map(|a| a.artifact.as_path())
    }
}

/// Search driver for one platform target.
pub struct SizeSearch<'a> {
    target: &'a PlatformTarget,
    encoder: &'a dyn Encoder,
    probe: &'a dyn SizeProbe,
    workspace: &'a Workspace,
    input_dir: &'a Path,
    source: &'a FrameSequence,
    qualities: Vec<QualityStep>,
    prepared: Option<FrameSet>,
    attempts: Vec<EncodingAttempt>,
    /// Last measured artifact, the only one left on disk.
    kept: Option<PathBuf>,
}

impl<'a> SizeSearch<'a> {
    pub fn new(
        target: &'a PlatformTarget,
        encoder: &'a dyn Encoder,
        probe: &'a dyn SizeProbe,
        workspace: &'a Workspace,
        input_dir: &'a Path,
        source: &'a FrameSequence,
    ) -> Self {
        Self {
            target,
            encoder,
            probe,
            workspace,
            input_dir,
            source,
            qualities: target.quality_ladder(),
            prepared: None,
            attempts: Vec::new(),
            kept: None,
        }
    }

    /// Drive the state machine to a terminal state.
    pub fn run(mut self) -> SearchOutcome {
        info!(
            platform = %self.target.name,
            budget = %self.target.budget().map(|b| b.display()).unwrap_or_else(|| "none".to_string()),
            resolutions = self.target.resolutions.len(),
            qualities = self.qualities.len(),
            "🔍 Size search started"
        );

        let mut state = SearchState::NotStarted;
        while !state.is_terminal() {
            state = self.advance(state);
        }

        SearchOutcome {
            platform: self.target.name.clone(),
            budget: self.target.budget(),
            selected: match state {
                SearchState::Satisfied(attempt) => Some(attempt),
                _ => None,
            },
            attempts: self.attempts,
        }
    }

    /// One transition. Terminal states map to themselves.
    pub fn advance(&mut self, state: SearchState) -> SearchState {
        match state {
            SearchState::NotStarted => SearchState::TryingResolution(0),

            SearchState::TryingResolution(r) => {
                let Some(&resolution) = self.target.resolutions.get(r) else {
                    return SearchState::Exhausted;
                };
                match self.prepare(resolution) {
                    Ok(frames) => {
                        self.prepared = Some(frames);
                        SearchState::TryingQuality {
                            resolution: r,
                            quality: 0,
                        }
                    }
                    Err(e) => {
                        self.log_failure(&format!("preparing frames at {}", resolution), &e);
                        self.prepared = None;
                        SearchState::TryingResolution(r + 1)
                    }
                }
            }

            SearchState::TryingQuality {
                resolution: r,
                quality: q,
            } => {
                let (Some(&resolution), Some(&quality)) =
                    (self.target.resolutions.get(r), self.qualities.get(q))
                else {
                    return SearchState::TryingResolution(r + 1);
                };
                let attempt = self.trial(resolution, quality);
                self.settle_artifact(&attempt);
                self.attempts.push(attempt.clone());

                if attempt.success {
                    info!(
                        platform = %self.target.name,
                        resolution = %resolution,
                        quality = %quality,
                        size = %attempt.size.map(|s| s.display()).unwrap_or_default(),
                        artifact = %attempt.artifact.display(),
                        "✅ Within budget"
                    );
                    SearchState::Satisfied(attempt)
                } else if attempt.size.is_some() {
                    SearchState::TryingQuality {
                        resolution: r,
                        quality: q + 1,
                    }
                } else {
                    SearchState::TryingResolution(r + 1)
                }
            }

            terminal @ (SearchState::Satisfied(_) | SearchState::Exhausted) => terminal,
        }
    }

    /// Fresh scratch, source frames copied in, reversed loop appended, then
    /// every frame resized and converted for the target kind.
    fn prepare(&self, resolution: Resolution) -> Result<FrameSet> {
        info!(platform = %self.target.name, resolution = %resolution, "📐 Preparing frames");
        self.workspace.reset_scratch()?;
        let copied = self.workspace.copy_source_frames(self.input_dir, self.source)?;
        let looped = compose_reversed_loop(&copied)?;
        let format = match self.target.kind {
            TargetKind::Gif(_) => FrameFormat::Gif,
            TargetKind::Video(_) => FrameFormat::Png,
        };
        self.encoder.resize_and_format(&looped, resolution, format)
    }

    fn trial(&self, resolution: Resolution, quality: QualityStep) -> EncodingAttempt {
        let artifact = self
            .workspace
            .artifact_path(&self.target.artifact_name(resolution, quality));
        let failed = |artifact: PathBuf| EncodingAttempt {
            resolution,
            quality,
            size: None,
            success: false,
            artifact,
        };

        let Some(frames) = self.prepared.as_ref() else {
            return failed(artifact);
        };

        let encoded = match (&self.target.kind, quality) {
            (TargetKind::Gif(gif), QualityStep::Palette(colors)) => self
                .encoder
                .quantize_and_assemble_gif(frames, colors, gif.frame_delay, &artifact),
            (TargetKind::Video(video), QualityStep::Crf(crf)) => {
                self.encoder.assemble_video(frames, video, crf, &artifact)
            }
            _ => Err(PostSocialError::InvalidTarget(format!(
                "{}: quality step {} does not match target kind",
                self.target.name, quality
            ))),
        };
        if let Err(e) = encoded {
            self.log_failure(&format!("encoding {} at {} ({})", self.target.name, resolution, quality), &e);
            return failed(artifact);
        }

        let size = match self.measure_with_retry(&artifact) {
            Ok(size) => size,
            Err(e) => {
                self.log_failure(&format!("measuring {}", artifact.display()), &e);
                return failed(artifact);
            }
        };

        let success = self.target.budget().map_or(true, |ceiling| size.is_below(ceiling));
        if !success {
            info!(
                platform = %self.target.name,
                resolution = %resolution,
                quality = %quality,
                size = %size.display(),
                "📉 Over budget"
            );
        }
        EncodingAttempt {
            resolution,
            quality,
            size: Some(size),
            success,
            artifact,
        }
    }

    /// Keep the artifact of a measured attempt and drop the one it replaces;
    /// whatever a failed attempt left behind is removed.
    fn settle_artifact(&mut self, attempt: &EncodingAttempt) {
        if attempt.size.is_some() {
            if let Some(previous) = self.kept.replace(attempt.artifact.clone()) {
                if previous != attempt.artifact {
                    self.remove_artifact(&previous);
                }
            }
        } else {
            if self.kept.as_ref() == Some(&attempt.artifact) {
                self.kept = None;
            }
            self.remove_artifact(&attempt.artifact);
        }
    }

    fn remove_artifact(&self, path: &Path) {
        match fs::remove_file(path) {
            Ok(()) => info!(platform = %self.target.name, artifact = %path.display(), "🗑️ Superseded artifact removed"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => report_error(
                ErrorCategory::Optional,
                "removing superseded artifact",
                &PostSocialError::io(path, e),
            ),
        }
    }

    fn measure_with_retry(&self, artifact: &Path) -> Result<FileSize> {
        match self.probe.measure(artifact) {
            Err(e) if e.is_measurement() => {
                warn!(artifact = %artifact.display(), error = %e, "🔄 Size probe failed, retrying once");
                self.probe.measure(artifact)
            }
            other => other,
        }
    }

    fn log_failure(&self, context: &str, error: &PostSocialError) {
        report_error(error.category(), context, error);
        if let PostSocialError::Encoding {
            command, diagnostic, ..
        } = error
        {
            warn!(
                platform = %self.target.name,
                command = %command,
                diagnostic = %diagnostic,
                "⚠️ Abandoning resolution"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{default_targets, RunConfig, VideoSettings};
    use crate::encoder::{Artifact, MetadataSizeProbe};
    use crate::frames::frame_file_name;
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Resize(Resolution, FrameFormat, usize),
        Gif(Resolution, u16),
        Video(Resolution, u8),
    }

    /// Writes artifacts whose byte size comes from a table keyed by
    /// `(width, quality)`. Missing entries fail like a crashed tool.
    struct FakeEncoder {
        sizes: HashMap<(u32, u32), u64>,
        fail_resize_at: Option<u32>,
        current: Cell<Option<Resolution>>,
        calls: RefCell<Vec<Call>>,
    }

    impl FakeEncoder {
        fn new(sizes: &[((u32, u32), u64)]) -> Self {
            Self {
                sizes: sizes.iter().copied().collect(),
                fail_resize_at: None,
                current: Cell::new(None),
                calls: RefCell::new(Vec::new()),
            }
        }

        fn tool_failure() -> PostSocialError {
            PostSocialError::Encoding {
                tool: "fake".to_string(),
                command: "fake --crash".to_string(),
                exit_code: Some(1),
                diagnostic: "boom".to_string(),
                message: "fake failed".to_string(),
            }
        }

        fn write(&self, res: Resolution, quality: u32, output: &Path) -> Result<Artifact> {
            let bytes = *self
                .sizes
                .get(&(res.width, quality))
                .ok_or_else(Self::tool_failure)?;
            // deterministic content so repeated runs are byte-identical
            let content: Vec<u8> = (0..bytes).map(|i| ((i + quality as u64) % 251) as u8).collect();
            fs::write(output, content).map_err(|e| PostSocialError::io(output, e))?;
            Ok(Artifact::new(output))
        }

        fn calls(&self) -> Vec<Call> {
            self.calls.borrow().clone()
        }
    }

    impl Encoder for FakeEncoder {
        fn resize_and_format(
            &self,
            frames: &FrameSet,
            resolution: Resolution,
            format: FrameFormat,
        ) -> Result<FrameSet> {
            self.calls
                .borrow_mut()
                .push(Call::Resize(resolution, format, frames.len()));
            if self.fail_resize_at == Some(resolution.width) {
                return Err(Self::tool_failure());
            }
            self.current.set(Some(resolution));
            Ok(FrameSet::new(&frames.dir, frames.sequence.with_format(format)))
        }

        fn quantize_and_assemble_gif(
            &self,
            _frames: &FrameSet,
            palette_size: u16,
            _frame_delay: u16,
            output: &Path,
        ) -> Result<Artifact> {
            let res = self.current.get().ok_or_else(Self::tool_failure)?;
            self.calls.borrow_mut().push(Call::Gif(res, palette_size));
            self.write(res, palette_size as u32, output)
        }

        fn assemble_video(
            &self,
            _frames: &FrameSet,
            _settings: &VideoSettings,
            crf: u8,
            output: &Path,
        ) -> Result<Artifact> {
            let res = self.current.get().ok_or_else(Self::tool_failure)?;
            self.calls.borrow_mut().push(Call::Video(res, crf));
            self.write(res, crf as u32, output)
        }
    }

    /// Fails the first `failures` measurements, then defers to metadata.
    struct FlakyProbe {
        failures: Cell<u32>,
        calls: Cell<u32>,
    }

    impl SizeProbe for FlakyProbe {
        fn measure(&self, path: &Path) -> Result<FileSize> {
            self.calls.set(self.calls.get() + 1);
            if self.failures.get() > 0 {
                self.failures.set(self.failures.get() - 1);
                return Err(PostSocialError::measurement(path, "", "empty du output"));
            }
            MetadataSizeProbe.measure(path)
        }
    }

    struct Fixture {
        dir: TempDir,
        workspace: Workspace,
        source: FrameSequence,
    }

    fn fixture(frames: u32) -> Fixture {
        let dir = TempDir::new().unwrap();
        for i in 0..frames {
            fs::write(dir.path().join(frame_file_name(i, FrameFormat::Png)), [i as u8; 8]).unwrap();
        }
        let workspace = Workspace::new(&RunConfig::new(dir.path()));
        workspace.prepare().unwrap();
        Fixture {
            dir,
            workspace,
            source: FrameSequence::contiguous(FrameFormat::Png, frames),
        }
    }

    fn target(name: &str) -> PlatformTarget {
        default_targets()
            .into_iter()
            .find(|t| t.name == name)
            .unwrap()
    }

    fn search(fx: &Fixture, target: &PlatformTarget, encoder: &dyn Encoder, probe: &dyn SizeProbe) -> SearchOutcome {
        SizeSearch::new(target, encoder, probe, &fx.workspace, fx.dir.path(), &fx.source).run()
    }

    const MB: u64 = 1024 * 1024;

    /// Files directly in the output root, scratch directory excluded.
    fn artifact_names(fx: &Fixture) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(fx.workspace.output_dir())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[test]
    fn test_tumblr_first_tier_passes() {
        let fx = fixture(10);
        let tumblr = target("tumblr");
        let encoder = FakeEncoder::new(&[((540, 256), 3 * MB), ((540, 224), MB + 1), ((540, 192), 1000)]);

        let outcome = search(&fx, &tumblr, &encoder, &MetadataSizeProbe);

        let selected = outcome.selected.clone().unwrap();
        assert_eq!(selected.resolution, Resolution::new(540, 540));
        assert_eq!(selected.quality, QualityStep::Palette(224));
        assert_eq!(
            selected.artifact,
            fx.workspace.output_dir().join("tumblr540x540-224.gif")
        );
        assert!(selected.artifact.exists());
        // 10 frames composed into 20 before resizing
        assert_eq!(
            encoder.calls(),
            vec![
                Call::Resize(Resolution::new(540, 540), FrameFormat::Gif, 20),
                Call::Gif(Resolution::new(540, 540), 256),
                Call::Gif(Resolution::new(540, 540), 224),
            ]
        );
        assert_eq!(outcome.attempts.len(), 2);
        assert!(!outcome.attempts[0].success);
    }

    #[test]
    fn test_first_pass_wins_not_smallest() {
        let fx = fixture(2);
        let tumblr = target("tumblr");
        let encoder = FakeEncoder::new(&[((540, 256), 2 * MB - 1), ((540, 224), 10)]);

        let outcome = search(&fx, &tumblr, &encoder, &MetadataSizeProbe);
        assert_eq!(outcome.selected.unwrap().quality, QualityStep::Palette(256));
        assert_eq!(outcome.attempts.len(), 1);
    }

    #[test]
    fn test_budget_is_strict() {
        let fx = fixture(1);
        let tumblr = target("tumblr");
        let sizes: Vec<((u32, u32), u64)> = [540, 405, 270]
            .iter()
            .flat_map(|&w| (1..=8).map(move |k| ((w, 256 - 32 * (k - 1)), 2 * MB)))
            .collect();
        let encoder = FakeEncoder::new(&sizes);

        let outcome = search(&fx, &tumblr, &encoder, &MetadataSizeProbe);
        assert!(!outcome.is_satisfied());
    }

    #[test]
    fn test_falls_through_to_smaller_resolution() {
        let fx = fixture(3);
        let tumblr = target("tumblr");
        let mut sizes: Vec<((u32, u32), u64)> = (0..8).map(|k| ((540, 256 - 32 * k), 3 * MB)).collect();
        sizes.push(((405, 256), MB));
        let encoder = FakeEncoder::new(&sizes);

        let outcome = search(&fx, &tumblr, &encoder, &MetadataSizeProbe);
        let selected = outcome.selected.unwrap();
        assert_eq!(selected.resolution, Resolution::new(405, 405));
        assert_eq!(selected.quality, QualityStep::Palette(256));
        assert_eq!(outcome.attempts.len(), 9);
        // over-budget artifacts are replaced by the winner
        assert!(!fx.workspace.output_dir().join("tumblr540x540-32.gif").exists());
        assert_eq!(artifact_names(&fx), vec!["tumblr405x405-256.gif"]);
    }

    #[test]
    fn test_first_tier_pass_leaves_single_artifact() {
        let fx = fixture(4);
        let tumblr = target("tumblr");
        let encoder = FakeEncoder::new(&[((540, 256), 3 * MB), ((540, 224), 1000)]);

        let outcome = search(&fx, &tumblr, &encoder, &MetadataSizeProbe);
        assert!(outcome.is_satisfied());
        assert_eq!(artifact_names(&fx), vec!["tumblr540x540-224.gif"]);
    }

    #[test]
    fn test_failed_encode_leaves_no_artifact() {
        let fx = fixture(2);
        let tumblr = target("tumblr");
        // 540@256 is missing from the table; a stale file at that name must go
        let stale = fx.workspace.output_dir().join("tumblr540x540-256.gif");
        fs::write(&stale, b"half written").unwrap();
        let encoder = FakeEncoder::new(&[((405, 256), 10)]);

        let outcome = search(&fx, &tumblr, &encoder, &MetadataSizeProbe);
        assert!(outcome.is_satisfied());
        assert!(!stale.exists());
        assert_eq!(artifact_names(&fx), vec!["tumblr405x405-256.gif"]);
    }

    #[test]
    fn test_exhausted_leaves_last_artifact() {
        let fx = fixture(2);
        let mut twitter = target("twitter");
        twitter.resolutions.truncate(2);
        if let TargetKind::Gif(gif) = &mut twitter.kind {
            gif.palettes = vec![256, 128];
        }
        let encoder = FakeEncoder::new(&[
            ((640, 256), 4 * MB),
            ((640, 128), 4 * MB),
            ((480, 256), 4 * MB),
            ((480, 128), 3 * MB + 5),
        ]);

        let outcome = search(&fx, &twitter, &encoder, &MetadataSizeProbe);
        assert!(!outcome.is_satisfied());
        assert_eq!(outcome.attempts.len(), 4);
        let last = outcome.last_artifact().unwrap();
        assert_eq!(last, fx.workspace.output_dir().join("twitter480x480-128.gif"));
        assert!(last.exists());
        assert_eq!(artifact_names(&fx), vec!["twitter480x480-128.gif"]);
    }

    #[test]
    fn test_encoding_failure_abandons_resolution() {
        let fx = fixture(2);
        let tumblr = target("tumblr");
        // 540@256 missing: the fake fails, 540@224 must never be tried
        let encoder = FakeEncoder::new(&[((540, 224), 10), ((405, 256), 10)]);

        let outcome = search(&fx, &tumblr, &encoder, &MetadataSizeProbe);
        assert_eq!(
            outcome.selected.as_ref().map(|a| a.resolution),
            Some(Resolution::new(405, 405))
        );
        assert!(!encoder
            .calls()
            .contains(&Call::Gif(Resolution::new(540, 540), 224)));
        assert_eq!(outcome.attempts[0].size, None);
    }

    #[test]
    fn test_preparation_failure_skips_resolution() {
        let fx = fixture(2);
        let tumblr = target("tumblr");
        let mut encoder = FakeEncoder::new(&[((405, 256), 10)]);
        encoder.fail_resize_at = Some(540);

        let outcome = search(&fx, &tumblr, &encoder, &MetadataSizeProbe);
        assert_eq!(
            outcome.selected.map(|a| a.resolution),
            Some(Resolution::new(405, 405))
        );
        assert!(!encoder
            .calls()
            .iter()
            .any(|c| matches!(c, Call::Gif(r, _) if r.width == 540)));
    }

    #[test]
    fn test_measurement_retried_once() {
        let fx = fixture(1);
        let tumblr = target("tumblr");
        let encoder = FakeEncoder::new(&[((540, 256), 10)]);
        let probe = FlakyProbe {
            failures: Cell::new(1),
            calls: Cell::new(0),
        };

        let outcome = search(&fx, &tumblr, &encoder, &probe);
        assert!(outcome.is_satisfied());
        assert_eq!(probe.calls.get(), 2);
    }

    #[test]
    fn test_measurement_failing_twice_abandons_resolution() {
        let fx = fixture(1);
        let tumblr = target("tumblr");
        let encoder = FakeEncoder::new(&[((540, 256), 10), ((405, 256), 10)]);
        let probe = FlakyProbe {
            failures: Cell::new(2),
            calls: Cell::new(0),
        };

        let outcome = search(&fx, &tumblr, &encoder, &probe);
        assert_eq!(
            outcome.selected.map(|a| a.resolution),
            Some(Resolution::new(405, 405))
        );
        assert_eq!(probe.calls.get(), 3);
    }

    #[test]
    fn test_video_without_budget_takes_first_encode() {
        let fx = fixture(4);
        let facebook = target("facebook");
        let encoder = FakeEncoder::new(&[((400, 23), 50 * 1024)]);

        let outcome = search(&fx, &facebook, &encoder, &MetadataSizeProbe);
        let selected = outcome.selected.unwrap();
        assert_eq!(
            selected.artifact,
            fx.workspace.output_dir().join("facebook400x400.mp4")
        );
        assert_eq!(
            encoder.calls(),
            vec![
                Call::Resize(Resolution::new(400, 400), FrameFormat::Png, 8),
                Call::Video(Resolution::new(400, 400), 23),
            ]
        );
    }

    #[test]
    fn test_advance_is_explicit() {
        let fx = fixture(1);
        let tumblr = target("tumblr");
        let encoder = FakeEncoder::new(&[((540, 256), 3 * MB), ((540, 224), 10)]);
        let mut s = SizeSearch::new(&tumblr, &encoder, &MetadataSizeProbe, &fx.workspace, fx.dir.path(), &fx.source);

        let state = s.advance(SearchState::NotStarted);
        assert_eq!(state, SearchState::TryingResolution(0));
        let state = s.advance(state);
        assert_eq!(state, SearchState::TryingQuality { resolution: 0, quality: 0 });
        let state = s.advance(state);
        assert_eq!(state, SearchState::TryingQuality { resolution: 0, quality: 1 });
        let state = s.advance(state);
        assert!(matches!(state, SearchState::Satisfied(_)));
        assert_eq!(s.advance(state.clone()), state);
        assert_eq!(s.advance(SearchState::TryingResolution(3)), SearchState::Exhausted);
    }

    #[test]
    fn test_idempotent_artifacts() {
        let fx = fixture(3);
        let tumblr = target("tumblr");
        let sizes = [((540, 256), 3 * MB), ((540, 224), 4096)];

        let first = search(&fx, &tumblr, &FakeEncoder::new(&sizes), &MetadataSizeProbe);
        let path = first.selected.unwrap().artifact;
        let bytes = fs::read(&path).unwrap();

        let second = search(&fx, &tumblr, &FakeEncoder::new(&sizes), &MetadataSizeProbe);
        assert_eq!(second.selected.unwrap().artifact, path);
        assert_eq!(fs::read(&path).unwrap(), bytes);
    }

    #[test]
    fn test_source_frames_untouched() {
        let fx = fixture(3);
        let tumblr = target("tumblr");
        let encoder = FakeEncoder::new(&[((540, 256), 10)]);
        search(&fx, &tumblr, &encoder, &MetadataSizeProbe);

        let frames: Vec<_> = fs::read_dir(fx.dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().map(|t| t.is_file()).unwrap_or(false))
            .collect();
        assert_eq!(frames.len(), 3);
        assert_eq!(fs::read(fx.dir.path().join("frame0001.png")).unwrap(), vec![1u8; 8]);
    }
}
