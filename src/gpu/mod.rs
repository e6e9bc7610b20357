/// Translates a validated render pass into a backend's native descriptors.
///
/// Implementations never validate; every [`ResolvedRenderPass`] they receive
/// already passed pass-descriptor validation.
///
/// # Examples
/// ```ignore
/// use gpu_recorder::gpu::{backend::d3d12::D3D12, Backend};
/// let native = D3D12::translate_render_pass(&recorded.pass);
/// ```
pub trait Backend {
    /// Backend specific render pass description.
    type RenderPass;

    fn translate_render_pass(pass: &ResolvedRenderPass) -> Self::RenderPass;
}

pub mod backend;
#[cfg(feature = "recorder-serde")]
pub mod cfg;
pub mod cmd;
pub mod compat;
pub mod context;
pub mod driver;
pub mod error;
pub mod execution;
pub mod external_texture;
pub mod structs;

pub use backend::{
    ResolveMode, ResolveTarget, ResolvedColorAttachment, ResolvedDepthStencil,
    ResolvedRenderPass,
};
#[cfg(feature = "recorder-serde")]
pub use cfg::{AttachmentOpsCfg, ConfigError, RenderBundleCfg};
pub use cmd::*;
pub use compat::*;
pub use context::Context;
pub use driver::command::{Command, CommandList, CommandSink, Draw, DrawIndexed, DrawIndirect};
pub use driver::state::{ResourceId, SubresourceRange, UsageClass, UsageSummary, REMAINING};
pub use driver::types::*;
pub use error::*;
pub use external_texture::{ExternalTexture, ExternalTextureState};
pub use structs::*;
