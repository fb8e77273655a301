//! Texture bindings for the terrain and water materials
//!
//! The engine core does not own GPU resources; textures are referenced by
//! opaque handles the renderer hands out when it loads them.

/// Opaque renderer-owned texture reference
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureHandle(pub u32);

/// Blend texture slots available to the terrain material
pub const BLEND_TEXTURE_SLOTS: usize = 4;

/// Wave normal-map frames used by the water material
pub const WAVE_TEXTURE_SLOTS: usize = 2;

/// Texture slot assignments for one terrain.
///
/// The control texture selects per-tile which blend textures show through;
/// the wave textures animate the water surface.
#[derive(Clone, Copy, Debug, Default)]
pub struct TerrainTextures {
    blend: [Option<TextureHandle>; BLEND_TEXTURE_SLOTS],
    control: Option<TextureHandle>,
    waves: [Option<TextureHandle>; WAVE_TEXTURE_SLOTS],
}

impl TerrainTextures {
    pub fn set_blend_texture(&mut self, slot: usize, texture: TextureHandle) {
        self.blend[slot] = Some(texture);
    }

    pub fn set_control_texture(&mut self, texture: TextureHandle) {
        self.control = Some(texture);
    }

    pub fn set_wave_texture(&mut self, frame: usize, texture: TextureHandle) {
        self.waves[frame] = Some(texture);
    }

    pub fn blend_texture(&self, slot: usize) -> Option<TextureHandle> {
        self.blend[slot]
    }

    pub fn control_texture(&self) -> Option<TextureHandle> {
        self.control
    }

    pub fn wave_texture(&self, frame: usize) -> Option<TextureHandle> {
        self.waves[frame]
    }
}
