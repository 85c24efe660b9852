// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Externally produced textures (video frames, camera previews, ...).
//!
//! A [`Texture`] is owned by whoever produces its frames; the
//! [`TextureRegistry`] only maps ids to shared handles so that texture layers
//! can find them at paint time. Unregistering is idempotent and notifies the
//! texture exactly once.

use alloc::collections::BTreeMap;
use alloc::sync::Arc;
use core::fmt;

use kurbo::Rect;

use crate::canvas::Canvas;
use crate::gpu::GpuContext;

/// Identifies a texture in a [`TextureRegistry`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TextureId(pub i64);

impl fmt::Debug for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TextureId({})", self.0)
    }
}

/// Sampling quality used when a texture is scaled onto the canvas.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum SamplingQuality {
    /// Nearest neighbor.
    Nearest,
    /// Bilinear.
    #[default]
    Linear,
    /// Bilinear with mipmaps.
    Mipmap,
}

/// A source of frames drawn by texture layers.
///
/// Implementations are shared between the producing side and the raster
/// thread, so every method takes `&self`.
pub trait Texture: Send + Sync {
    /// The id this texture is registered under.
    fn id(&self) -> TextureId;

    /// Draws the current frame into `bounds`.
    ///
    /// When `freeze` is set the texture should keep showing the frame it last
    /// drew even if a newer one is available.
    fn paint(
        &self,
        canvas: &mut dyn Canvas,
        bounds: Rect,
        freeze: bool,
        gpu: Option<&mut dyn GpuContext>,
        sampling: SamplingQuality,
    );

    /// The GPU context was (re)created.
    fn on_gr_context_created(&self) {}

    /// The GPU context is going away; drop GPU resources.
    fn on_gr_context_destroyed(&self) {}

    /// The producer has a new frame ready.
    fn mark_new_frame_available(&self) {}

    /// The texture was removed from its registry.
    fn on_texture_unregistered(&self) {}
}

/// Maps [`TextureId`]s to live textures.
#[derive(Default)]
pub struct TextureRegistry {
    textures: BTreeMap<TextureId, Arc<dyn Texture>>,
}

impl fmt::Debug for TextureRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TextureRegistry")
            .field("ids", &self.textures.keys().collect::<alloc::vec::Vec<_>>())
            .finish()
    }
}

impl TextureRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `texture` under its own id.
    ///
    /// A texture previously registered under the same id is replaced, told
    /// it was unregistered, and returned.
    pub fn register_texture(&mut self, texture: Arc<dyn Texture>) -> Option<Arc<dyn Texture>> {
        let old = self.textures.insert(texture.id(), texture);
        if let Some(old) = &old {
            old.on_texture_unregistered();
        }
        old
    }

    /// Removes the texture with `id`.
    ///
    /// Returns `false` if no such texture was registered; the unregister
    /// callback only fires when something was actually removed.
    pub fn unregister_texture(&mut self, id: TextureId) -> bool {
        match self.textures.remove(&id) {
            Some(texture) => {
                texture.on_texture_unregistered();
                true
            }
            None => false,
        }
    }

    /// Looks up a texture.
    #[must_use]
    pub fn get_texture(&self, id: TextureId) -> Option<Arc<dyn Texture>> {
        self.textures.get(&id).cloned()
    }

    /// Forwards a new-frame notification. Returns `false` for unknown ids.
    pub fn mark_texture_frame_available(&self, id: TextureId) -> bool {
        match self.textures.get(&id) {
            Some(texture) => {
                texture.mark_new_frame_available();
                true
            }
            None => false,
        }
    }

    /// Tells every texture the GPU context was created.
    pub fn on_gr_context_created(&self) {
        for texture in self.textures.values() {
            texture.on_gr_context_created();
        }
    }

    /// Tells every texture the GPU context is being destroyed.
    pub fn on_gr_context_destroyed(&self) {
        for texture in self.textures.values() {
            texture.on_gr_context_destroyed();
        }
    }

    /// Number of registered textures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.textures.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }
}
