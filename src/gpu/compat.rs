use std::fmt;

#[cfg(feature = "recorder-serde")]
use serde::{Deserialize, Serialize};

use crate::gpu::driver::types::Format;
use crate::gpu::error::ValidationError;

/// Formats and sample count a pipeline or bundle was built against. Two states are
/// compatible only when equal slot for slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "recorder-serde", derive(Serialize, Deserialize))]
pub struct AttachmentState {
    pub color_formats: Vec<Option<Format>>,
    pub depth_stencil_format: Option<Format>,
    pub sample_count: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentMismatch {
    ColorCount { expected: usize, found: usize },
    ColorFormat {
        slot: usize,
        expected: Option<Format>,
        found: Option<Format>,
    },
    DepthStencilFormat {
        expected: Option<Format>,
        found: Option<Format>,
    },
    SampleCount { expected: u32, found: u32 },
}

impl fmt::Display for AttachmentMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttachmentMismatch::ColorCount { expected, found } => {
                write!(f, "expected {expected} color slots, found {found}")
            }
            AttachmentMismatch::ColorFormat {
                slot,
                expected,
                found,
            } => write!(
                f,
                "color slot {slot}: expected {expected:?}, found {found:?}"
            ),
            AttachmentMismatch::DepthStencilFormat { expected, found } => {
                write!(f, "depth-stencil: expected {expected:?}, found {found:?}")
            }
            AttachmentMismatch::SampleCount { expected, found } => {
                write!(f, "expected {expected} samples, found {found}")
            }
        }
    }
}

impl AttachmentState {
    pub fn new(
        color_formats: &[Option<Format>],
        depth_stencil_format: Option<Format>,
        sample_count: u32,
    ) -> Self {
        Self {
            color_formats: color_formats.to_vec(),
            depth_stencil_format,
            sample_count,
        }
    }

    /// First difference between `self` (the scope being recorded) and `other`.
    pub fn mismatch(&self, other: &AttachmentState) -> Option<AttachmentMismatch> {
        let slot = self
            .color_formats
            .iter()
            .zip(&other.color_formats)
            .position(|(a, b)| a != b);
        if let Some(slot) = slot {
            return Some(AttachmentMismatch::ColorFormat {
                slot,
                expected: self.color_formats[slot],
                found: other.color_formats[slot],
            });
        }

        if self.color_formats.len() != other.color_formats.len() {
            return Some(AttachmentMismatch::ColorCount {
                expected: self.color_formats.len(),
                found: other.color_formats.len(),
            });
        }

        if self.depth_stencil_format != other.depth_stencil_format {
            return Some(AttachmentMismatch::DepthStencilFormat {
                expected: self.depth_stencil_format,
                found: other.depth_stencil_format,
            });
        }

        if self.sample_count != other.sample_count {
            return Some(AttachmentMismatch::SampleCount {
                expected: self.sample_count,
                found: other.sample_count,
            });
        }

        None
    }

    /// `context` names what is being checked ("pipeline", "render bundle").
    pub fn check_compatible(
        &self,
        other: &AttachmentState,
        context: &'static str,
    ) -> Result<(), ValidationError> {
        match self.mismatch(other) {
            None => Ok(()),
            Some(mismatch) => Err(ValidationError::IncompatibleAttachments { context, mismatch }),
        }
    }
}
