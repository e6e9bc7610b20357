//! Recording contexts: command encoders, render passes and render bundles.
//!
//! Every recording call validates eagerly. The first failure is latched in the
//! owning context and returned from `finish`; later calls on that context do
//! nothing.

mod attachments;
mod bundle;
mod encoder;
mod pass;
mod scope;

pub use bundle::{RenderBundle, RenderBundleEncoder};
pub use encoder::{CommandBuffer, CommandEncoder, RecordedPass};
pub use pass::RenderPassEncoder;
pub use scope::RecordingState;
