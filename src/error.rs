// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Construction-time error types.
//!
//! Every recoverable runtime condition (lane sync loss, STPL mismatches,
//! ILAS checker disagreement) is surfaced through plain struct fields on the
//! relevant component, never through `Err` or a panic — only misuse at
//! construction time is a hard error.

use thiserror::Error;

/// Errors raised while building [`crate::settings::JesdSettings`] or a
/// datapath component from it.
#[derive(Debug, Clone, Error)]
pub enum JesdError {
    /// A JESD204B parameter is out of its allowed range, or a field derived
    /// from it is non-integral.
    #[error("invalid settings: {0}")]
    InvalidSettings(String),

    /// The framer/deframer or transport mapper geometry constraints are
    /// violated for the requested data width.
    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    /// The caller requested a mode this implementation does not support
    /// (scrambling disabled, or an aligner data width other than 32 bits).
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Convenience alias for fallible constructors in this crate.
pub type JesdResult<T> = Result<T, JesdError>;
