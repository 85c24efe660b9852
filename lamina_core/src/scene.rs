// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Retained scene-graph output.
//!
//! Some platforms composite with a system scene graph instead of a canvas.
//! [`LayerTree::update_scene`](crate::LayerTree::update_scene) walks a
//! prerolled tree in paint order and translates it into calls on a
//! [`SceneUpdateContext`]: modifier layers become nested push/pop pairs,
//! leaves become scene nodes, and effects the scene graph cannot express
//! (color and image filters, shader masks, the performance overlay) are handed
//! over whole through [`SceneUpdateContext::add_paint_layer`] so the
//! implementation can paint them into an image of its own.
//!
//! Layers that do not need painting are skipped, exactly as in the canvas
//! path.

use kurbo::{BezPath, Rect, RoundedRect, Vec2};

use crate::embedder::PlatformViewId;
use crate::layer::Layer;
use crate::paint::Clip;
use crate::picture::Picture;
use crate::texture::TextureId;
use crate::transform::Transform3d;

/// Clip geometry pushed onto a scene.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum SceneClip<'a> {
    /// Rectangle.
    Rect(Rect),
    /// Rounded rectangle.
    RRect(RoundedRect),
    /// Arbitrary path.
    Path(&'a BezPath),
}

/// Receives a layer tree as scene-graph operations.
///
/// Every `push_*` is matched by exactly one [`pop`](Self::pop).
pub trait SceneUpdateContext {
    /// Opens a transformed group.
    fn push_transform(&mut self, transform: &Transform3d);

    /// Opens a clipped group.
    fn push_clip(&mut self, clip: SceneClip<'_>, behavior: Clip);

    /// Opens a group with opacity, offset by `offset`.
    fn push_opacity(&mut self, opacity: f32, offset: Vec2);

    /// Closes the innermost open group.
    fn pop(&mut self);

    /// Adds a picture drawn at `offset`; `bounds` is its paint extent.
    fn add_picture(&mut self, picture: &Picture, offset: Vec2, bounds: Rect);

    /// Adds an external texture.
    fn add_texture(&mut self, texture: TextureId, bounds: Rect, freeze: bool);

    /// Adds a native platform view.
    fn add_platform_view(&mut self, view: PlatformViewId, bounds: Rect);

    /// Adds a layer the scene cannot express natively. The implementation
    /// paints it (and its subtree) itself.
    fn add_paint_layer(&mut self, layer: &Layer);
}
