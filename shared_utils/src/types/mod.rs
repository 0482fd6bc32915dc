//! Type-Safe Wrappers Module
//!
//! - `file_size`: byte counts for artifacts and size budgets

pub mod file_size;

pub use file_size::FileSize;

// ============================================================================
// Property-Based Tests
// ============================================================================
