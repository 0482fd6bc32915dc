//! Output root and scratch area.
//!
//! Layout: `<input>/<output-name>/` holds the artifacts, `<output>/temp/`
//! is the scratch area frames are copied into and transformed in. The
//! scratch area is emptied before every target and every resolution attempt.
//!
//! One run per input directory at a time: there is no locking, and a second
//! invocation would wipe the first one's scratch frames.

use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::RunConfig;
use crate::error::{PostSocialError, Result};
use crate::frames::{FrameSequence, FrameSet};

#[derive(Debug, Clone)]
pub struct Workspace {
    output_dir: PathBuf,
    scratch_dir: PathBuf,
}

impl Workspace {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            output_dir: config.output_dir.clone(),
            scratch_dir: config.scratch_dir.clone(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    pub fn artifact_path(&self, file_name: &str) -> PathBuf {
        self.output_dir.join(file_name)
    }

    /// Destroy any previous output root and recreate it with an empty
    /// scratch area.
    pub fn prepare(&self) -> Result<()> {
        if self.output_dir.exists() {
            debug!(path = %self.output_dir.display(), "###> rm -rf");
            fs::remove_dir_all(&self.output_dir).map_err(|e| {
                PostSocialError::setup_io("Cannot remove previous output directory", &self.output_dir, e)
            })?;
        }
        fs::create_dir_all(&self.scratch_dir).map_err(|e| {
            PostSocialError::setup_io("Cannot create output directory", &self.scratch_dir, e)
        })?;
        Ok(())
    }

    /// Empty the scratch area.
    pub fn reset_scratch(&self) -> Result<()> {
        debug!(path = %self.scratch_dir.display(), "###> rm -rf temp/*");
        if self.scratch_dir.exists() {
            fs::remove_dir_all(&self.scratch_dir).map_err(|e| PostSocialError::io(&self.scratch_dir, e))?;
        }
        fs::create_dir_all(&self.scratch_dir).map_err(|e| PostSocialError::io(&self.scratch_dir, e))
    }

    /// Copy the source frames into the scratch area. The source directory is
    /// never written to.
    pub fn copy_source_frames(&self, input_dir: &Path, sequence: &FrameSequence) -> Result<FrameSet> {
        debug!(
            from = %input_dir.display(),
            to = %self.scratch_dir.display(),
            frames = sequence.len(),
            "###> cp frame*"
        );
        for id in sequence.iter() {
            let name = id.file_name();
            let from = input_dir.join(&name);
            let to = self.scratch_dir.join(&name);
            fs::copy(&from, &to).map_err(|e| PostSocialError::io(&from, e))?;
        }
        Ok(FrameSet::new(&self.scratch_dir, sequence.clone()))
    }

    /// Remove the scratch area at the end of the run.
    pub fn cleanup(&self) -> Result<()> {
        if self.scratch_dir.exists() {
            debug!(path = %self.scratch_dir.display(), "###> rm -rf");
            fs::remove_dir_all(&self.scratch_dir).map_err(|e| PostSocialError::io(&self.scratch_dir, e))?;
        }
        Ok(())
    }
}
