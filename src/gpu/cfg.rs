//! Serializable authoring forms of the attachment configuration.
//!
//! Only attachment layouts and load/store operations are persisted. Handles are
//! supplied by the caller when a config is turned into a runtime descriptor.

use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gpu::driver::types::Format;
use crate::gpu::structs::{
    Color, Operations, RenderBundleEncoderDescriptor, RenderPassColorAttachment,
    RenderPassDepthStencilAttachment, TextureView,
};
use crate::utils::Handle;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("config describes {expected} color attachments but {found} views were supplied")]
    ColorViewCount { expected: usize, found: usize },
}

fn default_sample_count() -> u32 {
    1
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderBundleCfg {
    #[serde(default)]
    pub debug_name: String,
    /// `~` leaves a slot unused.
    #[serde(default)]
    pub color_formats: Vec<Option<Format>>,
    #[serde(default)]
    pub depth_stencil_format: Option<Format>,
    #[serde(default = "default_sample_count")]
    pub sample_count: u32,
}

impl RenderBundleCfg {
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_yaml(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn vec_from_yaml(s: &str) -> Result<Vec<Self>, ConfigError> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn from_yaml_file(path: &str) -> anyhow::Result<Self> {
        let s = load_text(path)?;
        Self::from_yaml(&s).with_context(|| format!("parsing render bundle config {path}"))
    }

    pub fn descriptor(&self) -> RenderBundleEncoderDescriptor {
        RenderBundleEncoderDescriptor {
            debug_name: self.debug_name.clone(),
            color_formats: self.color_formats.clone(),
            depth_stencil_format: self.depth_stencil_format,
            sample_count: self.sample_count,
        }
    }
}

impl From<&RenderBundleCfg> for RenderBundleEncoderDescriptor {
    fn from(cfg: &RenderBundleCfg) -> Self {
        cfg.descriptor()
    }
}

/// Load and store operations for every attachment of one render pass.
///
/// ```yaml
/// colors:
///   - load: { clear: { r: 0.0, g: 0.0, b: 0.0, a: 1.0 } }
///     store: Store
///   - ~
/// depth: { load: { clear: 1.0 }, store: Discard }
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttachmentOpsCfg {
    #[serde(default)]
    pub colors: Vec<Option<Operations<Color>>>,
    #[serde(default)]
    pub depth: Option<Operations<f32>>,
    #[serde(default)]
    pub stencil: Option<Operations<u32>>,
}

/// A color view and its optional resolve target.
pub type ColorViews = (Handle<TextureView>, Option<Handle<TextureView>>);

impl AttachmentOpsCfg {
    pub fn from_json(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn from_yaml(s: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(s)?)
    }

    pub fn from_yaml_file(path: &str) -> anyhow::Result<Self> {
        let s = load_text(path)?;
        Self::from_yaml(&s).with_context(|| format!("parsing attachment ops config {path}"))
    }

    /// Pairs each configured slot with a view. Slots configured as `~` ignore
    /// the view given for them.
    pub fn color_attachments(
        &self,
        views: &[Option<ColorViews>],
    ) -> Result<Vec<Option<RenderPassColorAttachment>>, ConfigError> {
        if views.len() != self.colors.len() {
            return Err(ConfigError::ColorViewCount {
                expected: self.colors.len(),
                found: views.len(),
            });
        }

        Ok(self
            .colors
            .iter()
            .zip(views)
            .map(|(ops, views)| match (ops, views) {
                (Some(ops), Some((view, resolve_target))) => Some(RenderPassColorAttachment {
                    view: *view,
                    resolve_target: *resolve_target,
                    ops: *ops,
                }),
                _ => None,
            })
            .collect())
    }

    /// `None` when neither aspect is configured.
    pub fn depth_stencil_attachment(
        &self,
        view: Handle<TextureView>,
    ) -> Option<RenderPassDepthStencilAttachment> {
        if self.depth.is_none() && self.stencil.is_none() {
            return None;
        }
        Some(RenderPassDepthStencilAttachment {
            view,
            depth_ops: self.depth,
            stencil_ops: self.stencil,
        })
    }
}

pub(crate) fn load_text(path: &str) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {path}"))
}
