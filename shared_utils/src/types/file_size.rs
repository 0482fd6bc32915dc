//! FileSize Type-Safe Wrapper
//!
//! Byte counts for encoded artifacts and size budgets. Budgets are expressed
//! in KiB/MiB by the platform tables, artifacts are measured in bytes.

use serde::{Deserialize, Serialize};
use std::fmt;

// ============================================================================
// FileSize Newtype
// ============================================================================

/// File size in bytes.
///
/// # Examples
/// ```
/// use shared_utils::types::file_size::FileSize;
///
/// let budget = FileSize::from_kb(2048);
/// assert_eq!(budget.bytes(), 2 * 1024 * 1024);
/// assert_eq!(budget.display(), "2.00 MB");
///
/// let artifact = FileSize::from_kb(1500);
/// assert!(artifact.is_below(budget));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileSize(u64);

impl FileSize {
    /// 1 KB
    pub const KB: u64 = 1024;
    /// 1 MB
    pub const MB: u64 = 1024 * 1024;

    #[inline]
    pub const fn new(bytes: u64) -> Self {
        Self(bytes)
    }

    #[inline]
    pub const fn from_kb(kb: u64) -> Self {
        Self(kb * Self::KB)
    }

    #[inline]
    pub const fn bytes(&self) -> u64 {
        self.0
    }

    /// Whole KiB, rounded down.
    #[inline]
    pub const fn kib_floor(&self) -> u64 {
        self.0 / Self::KB
    }

    /// Strictly smaller than `ceiling`. An artifact exactly at the ceiling
    /// does not fit.
    #[inline]
    pub fn is_below(&self, ceiling: FileSize) -> bool {
        self.0 < ceiling.0
    }

    /// Auto-scaled human readable size.
    pub fn display(&self) -> String {
        if self.0 >= Self::MB {
            format!("{:.2} MB", self.0 as f64 / Self::MB as f64)
        } else if self.0 >= Self::KB {
            format!("{:.2} KB", self.0 as f64 / Self::KB as f64)
        } else {
            format!("{} B", self.0)
        }
    }
}

// ============================================================================
// Trait Implementations
// ============================================================================

impl fmt::Debug for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FileSize({} = {})", self.0, self.display())
    }
}

impl fmt::Display for FileSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_size_creation() {
        assert_eq!(FileSize::new(1024).bytes(), 1024);
        assert_eq!(FileSize::from_kb(2048).bytes(), 2 * 1024 * 1024);
    }

    #[test]
    fn test_budget_boundary_is_exclusive() {
        let budget = FileSize::from_kb(2048);
        assert!(FileSize::new(budget.bytes() - 1).is_below(budget));
        assert!(!budget.is_below(budget));
        assert!(!FileSize::new(budget.bytes() + 1).is_below(budget));
    }

    #[test]
    fn test_kib_floor() {
        assert_eq!(FileSize::new(1023).kib_floor(), 0);
        assert_eq!(FileSize::new(1024).kib_floor(), 1);
        assert_eq!(FileSize::new(4097).kib_floor(), 4);
    }

    #[test]
    fn test_display() {
        assert_eq!(FileSize::new(500).display(), "500 B");
        assert_eq!(FileSize::new(1024).display(), "1.00 KB");
        assert_eq!(FileSize::new(1024 * 1024).display(), "1.00 MB");
        assert_eq!(FileSize::new(3 * 1024 * 1024 * 1024).display(), "3072.00 MB");
    }
}
