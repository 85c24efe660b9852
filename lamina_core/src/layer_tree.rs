// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! One frame's layer tree and its metadata.

use kurbo::{Rect, Size};

use crate::canvas::{Canvas, RecordingCanvas};
use crate::compositor::ScopedFrame;
use crate::layer::{Layer, PaintContext, PrerollContext};
use crate::picture::Picture;
use crate::scene::SceneUpdateContext;
use crate::stopwatch::Stopwatch;
use crate::texture::TextureRegistry;
use crate::time::{Duration, HostTime};
use crate::transform::Transform3d;

/// Where a tree is in its frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TreeState {
    /// Built but not yet prerolled.
    Unprerolled,
    /// Bounds computed; ready to paint.
    Prerolled,
    /// Drawn. The tree may still be flattened or emitted into a scene.
    Painted,
}

/// A frame's root layer plus what the raster thread needs to draw it.
///
/// Built on the UI thread, moved through the
/// [`pipeline`](crate::pipeline) and drawn once. Preroll may run again
/// before paint when the embedder asks for the frame to be resubmitted.
#[derive(Debug)]
pub struct LayerTree {
    root: Option<Layer>,
    frame_size: Size,
    device_pixel_ratio: f64,
    scene_version: u64,
    build_start: HostTime,
    build_finish: HostTime,
    target_time: Option<HostTime>,
    checkerboard_offscreen_layers: bool,
    state: TreeState,
}

impl LayerTree {
    /// Creates an empty tree for a frame of `frame_size` physical pixels.
    #[must_use]
    pub fn new(frame_size: Size, device_pixel_ratio: f64) -> Self {
        Self {
            root: None,
            frame_size,
            device_pixel_ratio,
            scene_version: 0,
            build_start: HostTime::default(),
            build_finish: HostTime::default(),
            target_time: None,
            checkerboard_offscreen_layers: false,
            state: TreeState::Unprerolled,
        }
    }

    /// Sets the root layer, returning `self` for chaining.
    #[must_use]
    pub fn with_root(mut self, root: impl Into<Layer>) -> Self {
        self.set_root(root);
        self
    }

    /// Sets the root layer.
    pub fn set_root(&mut self, root: impl Into<Layer>) {
        self.root = Some(root.into());
    }

    /// Sets the version of the scene this tree was built from.
    #[must_use]
    pub fn with_scene_version(mut self, version: u64) -> Self {
        self.scene_version = version;
        self
    }

    /// Records when the UI thread started and finished building the tree
    /// and when the frame should be on screen.
    pub fn set_build_times(&mut self, start: HostTime, finish: HostTime, target: Option<HostTime>) {
        self.build_start = start;
        self.build_finish = finish;
        self.target_time = target;
    }

    /// Overlays a checkerboard on every offscreen group in this frame.
    pub fn set_checkerboard_offscreen_layers(&mut self, enabled: bool) {
        self.checkerboard_offscreen_layers = enabled;
    }

    /// The root layer.
    #[must_use]
    pub fn root(&self) -> Option<&Layer> {
        self.root.as_ref()
    }

    /// Frame size in physical pixels.
    #[must_use]
    pub fn frame_size(&self) -> Size {
        self.frame_size
    }

    /// Physical pixels per logical pixel.
    #[must_use]
    pub fn device_pixel_ratio(&self) -> f64 {
        self.device_pixel_ratio
    }

    /// Scene version.
    #[must_use]
    pub fn scene_version(&self) -> u64 {
        self.scene_version
    }

    /// Time the UI thread spent building the tree.
    #[must_use]
    pub fn build_time(&self) -> Duration {
        self.build_finish.saturating_duration_since(self.build_start)
    }

    /// When the frame should be on screen, if known.
    #[must_use]
    pub fn target_time(&self) -> Option<HostTime> {
        self.target_time
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> TreeState {
        self.state
    }

    /// Computes paint bounds for the whole tree under the frame's root
    /// transformation and prepares cache entries.
    ///
    /// Returns `true` if the tree has anything to paint.
    ///
    /// # Panics
    ///
    /// Panics if the tree was already painted.
    pub fn preroll(&mut self, frame: &mut ScopedFrame<'_>, ignore_raster_cache: bool) -> bool {
        assert!(
            self.state != TreeState::Painted,
            "layer tree prerolled after paint"
        );
        self.state = TreeState::Prerolled;
        let Some(root) = self.root.as_mut() else {
            return false;
        };
        let root_transformation = frame.root_transformation();
        let mut ctx = frame.preroll_context(ignore_raster_cache);
        ctx.frame_device_pixel_ratio = self.device_pixel_ratio;
        ctx.checkerboard_offscreen_layers |= self.checkerboard_offscreen_layers;
        root.preroll(&mut ctx, &root_transformation);
        root.needs_painting()
    }

    /// Paints the tree into the frame's canvas.
    ///
    /// # Panics
    ///
    /// Panics unless the tree is in the [`TreeState::Prerolled`] state.
    pub fn paint(&mut self, frame: &mut ScopedFrame<'_>, ignore_raster_cache: bool) {
        assert!(
            self.state == TreeState::Prerolled,
            "layer tree painted in state {:?}",
            self.state
        );
        self.state = TreeState::Painted;
        let Some(root) = self.root.as_ref() else {
            return;
        };
        if !root.needs_painting() {
            return;
        }
        let root_transformation = frame.root_transformation();
        if let Some(mut ctx) = frame.paint_context(ignore_raster_cache) {
            ctx.checkerboard_offscreen_layers |= self.checkerboard_offscreen_layers;
            // Paint must see the matrix preroll keyed the raster cache with.
            let transformed = root_transformation != Transform3d::IDENTITY;
            if transformed {
                ctx.canvas.save();
                ctx.canvas.concat(&root_transformation);
            }
            root.paint(&mut ctx);
            if transformed {
                ctx.canvas.restore();
            }
        }
    }

    /// Records the tree into a picture covering `bounds`, without a raster
    /// cache or external textures.
    ///
    /// Works in any state; used for screenshots of the last drawn frame.
    pub fn flatten(&mut self, bounds: Rect) -> Option<Picture> {
        let root = self.root.as_mut()?;
        let registry = TextureRegistry::new();
        let raster_time = Stopwatch::default();
        let ui_time = Stopwatch::default();

        let mut preroll = PrerollContext::new(&registry, &raster_time, &ui_time);
        preroll.cull_rect = bounds;
        preroll.frame_device_pixel_ratio = self.device_pixel_ratio;
        root.preroll(&mut preroll, &Transform3d::IDENTITY);

        let mut recorder = RecordingCanvas::new(bounds);
        root.paint(&mut PaintContext::new(
            &mut recorder,
            &registry,
            &raster_time,
            &ui_time,
        ));
        Some(recorder.finish())
    }

    /// Emits the tree into a retained scene graph.
    pub fn update_scene(&self, scene: &mut dyn SceneUpdateContext) {
        if let Some(root) = &self.root {
            root.update_scene(scene);
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use kurbo::{BezPath, Vec2};

    use super::*;
    use crate::canvas::CanvasOp;
    use crate::embedder::PlatformViewId;
    use crate::layer::test_support::picture;
    use crate::layer::{ClipPathLayer, ContainerLayer, OpacityLayer, PictureLayer, TransformLayer};
    use crate::paint::Clip;
    use crate::scene::SceneClip;
    use crate::texture::TextureId;

    fn sample_tree() -> LayerTree {
        LayerTree::new(Size::new(100.0, 100.0), 2.0).with_root(
            ContainerLayer::new()
                .with_child(PictureLayer::new(
                    Vec2::ZERO,
                    picture(Rect::new(0.0, 0.0, 10.0, 10.0)),
                ))
                .with_child(
                    TransformLayer::new(Transform3d::from_translation(20.0, 0.0)).with_child(
                        OpacityLayer::new(0.5, Vec2::ZERO).with_child(PictureLayer::new(
                            Vec2::ZERO,
                            picture(Rect::new(0.0, 0.0, 5.0, 5.0)),
                        )),
                    ),
                ),
        )
    }

    #[test]
    fn build_time_is_finish_minus_start() {
        let mut tree = LayerTree::new(Size::new(1.0, 1.0), 1.0);
        tree.set_build_times(HostTime(100), HostTime(350), Some(HostTime(1_000)));
        assert_eq!(tree.build_time(), Duration(250));
        assert_eq!(tree.target_time(), Some(HostTime(1_000)));
        tree.set_build_times(HostTime(500), HostTime(100), None);
        assert_eq!(tree.build_time(), Duration::ZERO);
    }

    #[test]
    fn flatten_records_the_whole_tree() {
        let mut tree = sample_tree();
        let picture = tree
            .flatten(Rect::new(0.0, 0.0, 100.0, 100.0))
            .expect("tree has a root");
        assert_eq!(picture.cull_rect(), Rect::new(0.0, 0.0, 100.0, 100.0));
        let drawn = picture
            .ops()
            .iter()
            .filter(|op| matches!(op, CanvasOp::DrawPicture(_)))
            .count();
        assert_eq!(drawn, 2);
        assert_eq!(tree.state(), TreeState::Unprerolled);
    }

    #[test]
    fn flatten_without_root_is_none() {
        let mut tree = LayerTree::new(Size::new(10.0, 10.0), 1.0);
        assert!(tree.flatten(Rect::new(0.0, 0.0, 10.0, 10.0)).is_none());
    }

    #[derive(Default)]
    struct SceneLog(Vec<&'static str>);

    impl SceneUpdateContext for SceneLog {
        fn push_transform(&mut self, _transform: &Transform3d) {
            self.0.push("push_transform");
        }
        fn push_clip(&mut self, _clip: SceneClip<'_>, _behavior: Clip) {
            self.0.push("push_clip");
        }
        fn push_opacity(&mut self, _opacity: f32, _offset: Vec2) {
            self.0.push("push_opacity");
        }
        fn pop(&mut self) {
            self.0.push("pop");
        }
        fn add_picture(&mut self, _picture: &Picture, _offset: Vec2, _bounds: Rect) {
            self.0.push("add_picture");
        }
        fn add_texture(&mut self, _texture: TextureId, _bounds: Rect, _freeze: bool) {
            self.0.push("add_texture");
        }
        fn add_platform_view(&mut self, _view: PlatformViewId, _bounds: Rect) {
            self.0.push("add_platform_view");
        }
        fn add_paint_layer(&mut self, _layer: &Layer) {
            self.0.push("add_paint_layer");
        }
    }

    #[test]
    fn update_scene_follows_paint_order() {
        let mut tree = sample_tree();
        let bounds = Rect::new(0.0, 0.0, 100.0, 100.0);
        let _ = tree.flatten(bounds);
        let mut log = SceneLog::default();
        tree.update_scene(&mut log);
        assert_eq!(
            log.0,
            [
                "add_picture",
                "push_transform",
                "push_opacity",
                "add_picture",
                "pop",
                "pop"
            ]
        );
    }

    #[test]
    fn update_scene_skips_empty_subtrees() {
        let mut tree = LayerTree::new(Size::new(10.0, 10.0), 1.0).with_root(
            ContainerLayer::new()
                .with_child(PictureLayer::new(Vec2::ZERO, picture(Rect::ZERO)))
                .with_child(
                    ClipPathLayer::new(BezPath::new(), Clip::AntiAlias).with_child(
                        PictureLayer::new(Vec2::ZERO, picture(Rect::new(0.0, 0.0, 1.0, 1.0))),
                    ),
                ),
        );
        let _ = tree.flatten(Rect::new(0.0, 0.0, 10.0, 10.0));
        let mut log = SceneLog::default();
        tree.update_scene(&mut log);
        assert!(log.0.is_empty());
    }
}
