//! Run report: what every platform target ended up with.

use serde::Serialize;
use std::path::PathBuf;

use crate::search::SearchOutcome;

pub const EXIT_OK: i32 = 0;
pub const EXIT_SETUP_FAILURE: i32 = 1;
pub const EXIT_BUDGET_UNMET: i32 = 2;

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Source frames found, before the reversed loop is appended.
    pub frames: usize,
    pub outcomes: Vec<SearchOutcome>,
    pub elapsed_secs: f64,
}

impl RunReport {
    pub fn satisfied(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_satisfied()).count()
    }

    /// Platforms whose ladder was exhausted, in run order.
    pub fn unmet_platforms(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|o| !o.is_satisfied())
            .map(|o| o.platform.as_str())
            .collect()
    }

    pub fn exit_code(&self) -> i32 {
        if self.outcomes.iter().all(SearchOutcome::is_satisfied) {
            EXIT_OK
        } else {
            EXIT_BUDGET_UNMET
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn print_summary(&self) {
        println!();
        println!("╔══════════════════════════════════════════════════════════════╗");
        println!("║                📊 post-social Summary Report                 ║");
        println!("╠══════════════════════════════════════════════════════════════╣");
        println!("║  📁 Source Frames:      {:>10}                           ║", self.frames);
        println!("║  🎯 Targets:            {:>10}                           ║", self.outcomes.len());
        println!("║  ✅ Within Budget:      {:>10}                           ║", self.satisfied());
        println!(
            "║  ⚠️  Budget Unmet:       {:>10}                           ║",
            self.outcomes.len() - self.satisfied()
        );
        println!("║  ⏱️  Total Time:         {:>9.1}s                           ║", self.elapsed_secs);
        println!("╚══════════════════════════════════════════════════════════════╝");

        for outcome in &self.outcomes {
            match &outcome.selected {
                Some(attempt) => println!(
                    "   ✅ {:<10} → {} ({})",
                    outcome.platform,
                    attempt.artifact.display(),
                    attempt.size.map(|s| s.display()).unwrap_or_default()
                ),
                None => println!(
                    "   ❌ {:<10} → {}",
                    outcome.platform,
                    outcome
                        .last_artifact()
                        .map(|p| format!("{} (over budget)", p.display()))
                        .unwrap_or_else(|| "no artifact".to_string())
                ),
            }
        }
    }
}
