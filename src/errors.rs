//! Error Types
//!
//! This module defines the error types returned by the construction-time
//! APIs of the animation runtime.
//!
//! # Overview
//!
//! The main error type [`AnimationError`] covers the failure modes that can be
//! detected before evaluation starts:
//! - Skeleton hierarchies whose bones are not stored parent-before-child
//! - Pose buffers that are too small for the skeleton being evaluated
//! - Skeleton masks built for a different skeleton
//! - Malformed blend spaces
//!
//! The per-tick update never returns errors. A malformed animation is logged
//! and skipped so that the rest of the frame still evaluates.
//!
//! ```rust,ignore
//! use myth_anim::errors::{AnimationError, Result};
//!
//! fn build() -> Result<Skeleton> {
//!     Skeleton::new("hero", bones)
//! }
//! ```

use thiserror::Error;

/// The main error type for the animation runtime.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnimationError {
    // ========================================================================
    // Skeleton Errors
    // ========================================================================
    /// A bone references a parent that is not stored before it.
    #[error("Bone '{name}' (index {index}) references parent {parent}, which does not precede it")]
    BoneOrder {
        /// Name of the offending bone
        name: String,
        /// Index of the offending bone
        index: usize,
        /// The parent index it refers to
        parent: usize,
    },

    /// An output buffer cannot hold one entry per bone.
    #[error("Pose buffer too small: {context} needs {required} entries, got {actual}")]
    BufferTooSmall {
        /// Which buffer was undersized
        context: &'static str,
        /// Number of entries required
        required: usize,
        /// Number of entries supplied
        actual: usize,
    },

    /// A mask was built for a skeleton with a different bone count.
    #[error("Skeleton mask covers {mask} bones but the skeleton has {skeleton}")]
    MaskSizeMismatch {
        /// Bone count of the mask
        mask: usize,
        /// Bone count of the skeleton
        skeleton: usize,
    },

    // ========================================================================
    // Playback Errors
    // ========================================================================
    /// A blend space could not be constructed.
    #[error("Invalid blend space: {0}")]
    InvalidBlendSpace(String),
}

/// Alias for `Result<T, AnimationError>`.
pub type Result<T> = std::result::Result<T, AnimationError>;
