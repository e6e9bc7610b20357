use crate::gpu::context::Context;
use crate::gpu::driver::types::{Format, TextureUsage};
use crate::gpu::error::ValidationError;
use crate::gpu::structs::{
    ColorSpace, ContextInfo, ExternalTextureInfo, TextureView, TextureViewDimension,
};
use crate::utils::Handle;

/// Formats accepted for a single-plane external texture.
pub const SINGLE_PLANE_FORMATS: [Format; 3] =
    [Format::RGBA8Unorm, Format::BGRA8Unorm, Format::RGBA16Float];
pub const BIPLANAR_FORMATS: [Format; 2] = [Format::R8Unorm, Format::RG8Unorm];

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ExternalTextureState {
    Alive,
    Destroyed,
}

/// One or two texture view planes sampled together as a single texture.
#[derive(Debug, Clone)]
pub struct ExternalTexture {
    pub name: String,
    pub planes: [Option<Handle<TextureView>>; 2],
    pub color_space: ColorSpace,
    state: ExternalTextureState,
}

impl ExternalTexture {
    pub(crate) fn new(info: &ExternalTextureInfo) -> Self {
        Self {
            name: info.debug_name.to_string(),
            planes: [Some(info.plane0), info.plane1],
            color_space: info.color_space,
            state: ExternalTextureState::Alive,
        }
    }

    pub fn state(&self) -> ExternalTextureState {
        self.state
    }

    pub fn plane_views(&self) -> impl Iterator<Item = Handle<TextureView>> + '_ {
        self.planes.iter().flatten().copied()
    }

    /// Moves to `Destroyed`. Destroying again does nothing.
    pub fn destroy(&mut self) {
        self.state = ExternalTextureState::Destroyed;
    }

    pub fn validate_can_use_in_submit(&self) -> Result<(), ValidationError> {
        match self.state {
            ExternalTextureState::Alive => Ok(()),
            ExternalTextureState::Destroyed => Err(ValidationError::DestroyedExternalTexture),
        }
    }
}

fn validate_plane(ctx: &Context, plane: usize, view: &TextureView) -> Result<(), ValidationError> {
    let texture = ctx.texture(view.texture)?;

    if !texture.usage.contains(TextureUsage::TEXTURE_BINDING) {
        return Err(ValidationError::InvalidExternalTexturePlane {
            plane,
            reason: "texture lacks TEXTURE_BINDING usage",
        });
    }

    if view.dimension != TextureViewDimension::D2 {
        return Err(ValidationError::ExternalTexturePlaneDimension {
            plane,
            dimension: view.dimension,
        });
    }

    if view.range.level_count != 1 {
        return Err(ValidationError::InvalidExternalTexturePlane {
            plane,
            reason: "view must cover exactly one mip level",
        });
    }

    if texture.samples != 1 {
        return Err(ValidationError::InvalidExternalTexturePlane {
            plane,
            reason: "texture is multisampled",
        });
    }

    Ok(())
}

/// Checks a descriptor before an [`ExternalTexture`] is made from it.
pub fn validate_external_texture(
    ctx: &Context,
    toggles: &ContextInfo,
    info: &ExternalTextureInfo,
) -> Result<(), ValidationError> {
    let plane0 = ctx.texture_view(info.plane0)?;

    match info.plane1 {
        Some(plane1) => {
            if toggles.disallow_unsafe_apis {
                return Err(ValidationError::BiplanarDisallowed);
            }

            if info.color_space != ColorSpace::Srgb {
                return Err(ValidationError::ExternalTextureColorSpace {
                    found: info.color_space,
                    expected: ColorSpace::Srgb,
                });
            }

            let plane1 = ctx.texture_view(plane1)?;
            for (index, view) in [plane0, plane1].into_iter().enumerate() {
                if view.format != BIPLANAR_FORMATS[index] {
                    return Err(ValidationError::BiplanarFormat {
                        plane: index,
                        found: view.format,
                        expected: BIPLANAR_FORMATS[index],
                    });
                }
            }

            validate_plane(ctx, 0, plane0)?;
            validate_plane(ctx, 1, plane1)
        }
        None => {
            if !SINGLE_PLANE_FORMATS.contains(&plane0.format) {
                return Err(ValidationError::UnsupportedExternalTextureFormat {
                    format: plane0.format,
                });
            }
            validate_plane(ctx, 0, plane0)
        }
    }
}
