// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The long-lived compositor state and the per-frame guard.
//!
//! A [`CompositorContext`] lives on the raster thread for the lifetime of a
//! surface. It owns the [`RasterCache`], the [`TextureRegistry`] and the
//! raster/UI [`Stopwatch`]es. Each frame borrows it through a
//! [`ScopedFrame`], which drives one preroll and paint pass over a
//! [`LayerTree`] and, when dropped, sweeps the cache, stops the raster
//! stopwatch and emits a [`FrameSummary`](crate::trace::FrameSummary).

use alloc::boxed::Box;
use alloc::sync::Arc;
use core::fmt;

use peniko::Color;

use crate::canvas::Canvas;
use crate::embedder::{ExternalViewEmbedder, PostPrerollResult};
use crate::geometry;
use crate::gpu::GpuContext;
use crate::layer::{PaintContext, PrerollContext};
use crate::layer_tree::LayerTree;
use crate::raster_cache::{RasterCache, RasterCacheConfig};
use crate::stopwatch::{DEFAULT_FRAME_BUDGET, DEFAULT_SAMPLE_COUNT, Stopwatch};
use crate::texture::TextureRegistry;
use crate::time::{Clock, Duration};
use crate::trace::{
    FrameBeginEvent, FrameSummaryBuilder, PhaseBeginEvent, PhaseEndEvent, PhaseKind, SubmitEvent,
    Tracer,
};
use crate::transform::Transform3d;

// ---------------------------------------------------------------------------
// Configuration and outcomes
// ---------------------------------------------------------------------------

/// Settings for a [`CompositorContext`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CompositorConfig {
    /// Raster cache policy.
    pub raster_cache: RasterCacheConfig,
    /// Laps kept by the raster and UI stopwatches; zero is raised to one.
    pub stopwatch_samples: usize,
    /// Frame budget the stopwatches measure against.
    pub frame_budget: Duration,
    /// Overlay a checkerboard on every offscreen group.
    pub checkerboard_offscreen_layers: bool,
}

impl Default for CompositorConfig {
    fn default() -> Self {
        Self {
            raster_cache: RasterCacheConfig::default(),
            stopwatch_samples: DEFAULT_SAMPLE_COUNT,
            frame_budget: DEFAULT_FRAME_BUDGET,
            checkerboard_offscreen_layers: false,
        }
    }
}

/// Outcome of rasterizing one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RasterStatus {
    /// The tree was painted.
    Success,
    /// The embedder asked for the same tree to be drawn again.
    Resubmit,
    /// No frame could be acquired or the surface rejected it.
    Failed,
    /// The frame was skipped, for example because its size is empty.
    Discarded,
}

// ---------------------------------------------------------------------------
// Surface frames
// ---------------------------------------------------------------------------

/// What a frame draws into.
pub struct FrameTargets<'a> {
    /// The frame's canvas.
    pub canvas: &'a mut dyn Canvas,
    /// Context for offscreen rasterization, if the surface has one.
    pub gpu_context: Option<&'a mut dyn GpuContext>,
}

impl fmt::Debug for FrameTargets<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrameTargets")
            .field("gpu_context", &self.gpu_context.is_some())
            .finish_non_exhaustive()
    }
}

/// One frame acquired from a surface.
pub trait SurfaceFrame {
    /// The canvas and GPU context for this frame.
    fn targets(&mut self) -> FrameTargets<'_>;

    /// Presents the frame. Returns `false` if the surface rejected it.
    fn submit(self: Box<Self>) -> bool;
}

/// A [`SurfaceFrame`] over a borrowed canvas, for headless rendering and
/// tests. Submitting always succeeds.
pub struct CanvasFrame<'a> {
    canvas: &'a mut dyn Canvas,
    gpu_context: Option<&'a mut dyn GpuContext>,
}

impl fmt::Debug for CanvasFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CanvasFrame")
            .field("gpu_context", &self.gpu_context.is_some())
            .finish_non_exhaustive()
    }
}

impl<'a> CanvasFrame<'a> {
    /// Wraps `canvas` with no GPU context; nothing will be cached.
    #[must_use]
    pub fn new(canvas: &'a mut dyn Canvas) -> Self {
        Self {
            canvas,
            gpu_context: None,
        }
    }

    /// Adds a GPU context for raster cache images.
    #[must_use]
    pub fn with_gpu_context(mut self, gpu_context: &'a mut dyn GpuContext) -> Self {
        self.gpu_context = Some(gpu_context);
        self
    }
}

impl SurfaceFrame for CanvasFrame<'_> {
    fn targets(&mut self) -> FrameTargets<'_> {
        FrameTargets {
            canvas: &mut *self.canvas,
            gpu_context: self
                .gpu_context
                .as_deref_mut()
                .map(|gpu| gpu as &mut dyn GpuContext),
        }
    }

    fn submit(self: Box<Self>) -> bool {
        true
    }
}

// ---------------------------------------------------------------------------
// CompositorContext
// ---------------------------------------------------------------------------

/// Raster-thread state that outlives individual frames.
pub struct CompositorContext {
    raster_cache: RasterCache,
    texture_registry: TextureRegistry,
    raster_time: Stopwatch,
    ui_time: Stopwatch,
    clock: Arc<dyn Clock>,
    frame_count: u64,
    checkerboard_offscreen_layers: bool,
}

impl fmt::Debug for CompositorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositorContext")
            .field("raster_cache", &self.raster_cache)
            .field("texture_registry", &self.texture_registry)
            .field("frame_count", &self.frame_count)
            .finish_non_exhaustive()
    }
}

impl CompositorContext {
    /// Creates a context reading time from `clock`.
    #[must_use]
    pub fn new(config: CompositorConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            raster_cache: RasterCache::new(config.raster_cache),
            texture_registry: TextureRegistry::new(),
            raster_time: Stopwatch::new(config.stopwatch_samples, config.frame_budget),
            ui_time: Stopwatch::new(config.stopwatch_samples, config.frame_budget),
            clock,
            frame_count: 0,
            checkerboard_offscreen_layers: config.checkerboard_offscreen_layers,
        }
    }

    /// Starts a frame drawing into `surface_frame`.
    ///
    /// Starts the raster stopwatch; the returned guard stops it when
    /// dropped.
    pub fn acquire_frame<'a>(
        &'a mut self,
        surface_frame: Box<dyn SurfaceFrame + 'a>,
    ) -> ScopedFrame<'a> {
        self.frame_count += 1;
        let now = self.clock.now();
        self.raster_time.start(now);
        ScopedFrame {
            frame_index: self.frame_count,
            summary: Some(FrameSummaryBuilder::new(self.frame_count, now)),
            context: self,
            surface_frame: Some(surface_frame),
            view_embedder: None,
            root_transformation: Transform3d::IDENTITY,
            tracer: Tracer::none(),
        }
    }

    /// The raster cache.
    #[must_use]
    pub fn raster_cache(&self) -> &RasterCache {
        &self.raster_cache
    }

    /// The raster cache, mutably.
    pub fn raster_cache_mut(&mut self) -> &mut RasterCache {
        &mut self.raster_cache
    }

    /// External textures.
    #[must_use]
    pub fn texture_registry(&self) -> &TextureRegistry {
        &self.texture_registry
    }

    /// External textures, mutably.
    pub fn texture_registry_mut(&mut self) -> &mut TextureRegistry {
        &mut self.texture_registry
    }

    /// Raster-thread frame times.
    #[must_use]
    pub fn raster_time(&self) -> &Stopwatch {
        &self.raster_time
    }

    /// UI-thread frame times.
    #[must_use]
    pub fn ui_time(&self) -> &Stopwatch {
        &self.ui_time
    }

    /// UI-thread frame times, for recording build laps.
    pub fn ui_time_mut(&mut self) -> &mut Stopwatch {
        &mut self.ui_time
    }

    /// Frames started so far.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// The clock frames are timed with.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// A new GPU context is in use. Cached images from any earlier context
    /// are dropped.
    pub fn on_gr_context_created(&mut self) {
        self.raster_cache.clear();
        self.texture_registry.on_gr_context_created();
    }

    /// The GPU context is gone. Cached images are dropped.
    pub fn on_gr_context_destroyed(&mut self) {
        self.raster_cache.clear();
        self.texture_registry.on_gr_context_destroyed();
    }
}

// ---------------------------------------------------------------------------
// ScopedFrame
// ---------------------------------------------------------------------------

/// One frame in flight.
///
/// Dropping the guard ends the frame whether or not it was submitted.
pub struct ScopedFrame<'a> {
    context: &'a mut CompositorContext,
    surface_frame: Option<Box<dyn SurfaceFrame + 'a>>,
    view_embedder: Option<&'a mut dyn ExternalViewEmbedder>,
    root_transformation: Transform3d,
    tracer: Tracer<'a>,
    frame_index: u64,
    summary: Option<FrameSummaryBuilder>,
}

impl fmt::Debug for ScopedFrame<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScopedFrame")
            .field("frame_index", &self.frame_index)
            .field("submitted", &self.surface_frame.is_none())
            .field("view_embedder", &self.view_embedder.is_some())
            .field("root_transformation", &self.root_transformation)
            .finish_non_exhaustive()
    }
}

impl<'a> ScopedFrame<'a> {
    /// Routes platform views to `embedder` for this frame.
    #[must_use]
    pub fn with_view_embedder(mut self, embedder: &'a mut dyn ExternalViewEmbedder) -> Self {
        self.view_embedder = Some(embedder);
        self
    }

    /// Sets the surface's base transform, applied above the root layer.
    #[must_use]
    pub fn with_root_transformation(mut self, transform: Transform3d) -> Self {
        self.root_transformation = transform;
        self
    }

    /// Sends this frame's trace events to `tracer`.
    #[must_use]
    pub fn with_tracer(mut self, tracer: Tracer<'a>) -> Self {
        self.tracer = tracer;
        self
    }

    /// This frame's index, starting at 1.
    #[must_use]
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// The surface's base transform.
    #[must_use]
    pub fn root_transformation(&self) -> Transform3d {
        self.root_transformation
    }

    /// Runs preroll and paint over `tree`.
    ///
    /// The sequence is preroll, the embedder's post-preroll action (which
    /// may ask for a resubmit and end the frame early), clearing the canvas
    /// to transparent, then paint. Returns [`RasterStatus::Failed`] if the
    /// frame was already submitted.
    pub fn raster(&mut self, tree: &mut LayerTree, ignore_raster_cache: bool) -> RasterStatus {
        if self.surface_frame.is_none() {
            return RasterStatus::Failed;
        }
        let now = self.context.clock.now();
        self.tracer.frame_begin(&FrameBeginEvent {
            frame_index: self.frame_index,
            scene_version: tree.scene_version(),
            timestamp: now,
            target_time: tree.target_time(),
        });
        if let Some(embedder) = self.view_embedder.as_deref_mut() {
            embedder.begin_frame(tree.frame_size(), tree.device_pixel_ratio());
        }

        self.begin_phase(PhaseKind::Preroll);
        tree.preroll(self, ignore_raster_cache);
        self.end_phase(PhaseKind::Preroll);

        let post_preroll = match self.view_embedder.as_deref_mut() {
            Some(embedder) => embedder.post_preroll_action(),
            None => PostPrerollResult::Success,
        };
        if post_preroll == PostPrerollResult::ResubmitFrame {
            if let Some(embedder) = self.view_embedder.as_deref_mut() {
                embedder.end_frame(true);
            }
            return RasterStatus::Resubmit;
        }

        self.begin_phase(PhaseKind::Paint);
        if let Some(frame) = self.surface_frame.as_deref_mut() {
            frame.targets().canvas.clear(Color::TRANSPARENT);
        }
        tree.paint(self, ignore_raster_cache);
        self.end_phase(PhaseKind::Paint);

        if let Some(embedder) = self.view_embedder.as_deref_mut() {
            embedder.end_frame(false);
        }
        RasterStatus::Success
    }

    /// Presents the frame. Returns `false` if it was already submitted or
    /// the surface rejected it.
    pub fn submit(&mut self) -> bool {
        let Some(frame) = self.surface_frame.take() else {
            return false;
        };
        self.begin_phase(PhaseKind::Submit);
        let accepted = frame.submit();
        self.end_phase(PhaseKind::Submit);
        self.tracer.submit(&SubmitEvent {
            frame_index: self.frame_index,
            submitted_at: self.context.clock.now(),
            accepted,
        });
        accepted
    }

    /// A preroll context borrowing this frame's cache, GPU context and
    /// embedder.
    pub(crate) fn preroll_context(&mut self, ignore_raster_cache: bool) -> PrerollContext<'_> {
        let context = &mut *self.context;
        let mut ctx = PrerollContext::new(
            &context.texture_registry,
            &context.raster_time,
            &context.ui_time,
        );
        if !ignore_raster_cache {
            ctx.raster_cache = Some(&mut context.raster_cache);
        }
        ctx.gpu_context = self
            .surface_frame
            .as_deref_mut()
            .and_then(|frame| frame.targets().gpu_context);
        ctx.view_embedder = self
            .view_embedder
            .as_deref_mut()
            .map(|embedder| embedder as &mut dyn ExternalViewEmbedder);
        ctx.cull_rect = geometry::GIANT_RECT;
        ctx.checkerboard_offscreen_layers = context.checkerboard_offscreen_layers;
        ctx.tracer = self.tracer.reborrow();
        ctx
    }

    /// A paint context drawing into this frame's canvas, or `None` once the
    /// frame is submitted.
    pub(crate) fn paint_context(&mut self, ignore_raster_cache: bool) -> Option<PaintContext<'_>> {
        let targets = self.surface_frame.as_deref_mut()?.targets();
        let context = &mut *self.context;
        let mut ctx = PaintContext::new(
            targets.canvas,
            &context.texture_registry,
            &context.raster_time,
            &context.ui_time,
        );
        if !ignore_raster_cache {
            ctx.raster_cache = Some(&mut context.raster_cache);
        }
        ctx.gpu_context = targets.gpu_context;
        ctx.view_embedder = self
            .view_embedder
            .as_deref_mut()
            .map(|embedder| embedder as &mut dyn ExternalViewEmbedder);
        ctx.checkerboard_offscreen_layers = context.checkerboard_offscreen_layers;
        ctx.tracer = self.tracer.reborrow();
        Some(ctx)
    }

    fn begin_phase(&mut self, phase: PhaseKind) {
        let now = self.context.clock.now();
        if let Some(summary) = &mut self.summary {
            summary.phase_begin(phase, now);
        }
        self.tracer.phase_begin(&PhaseBeginEvent {
            frame_index: self.frame_index,
            phase,
            timestamp: now,
        });
    }

    fn end_phase(&mut self, phase: PhaseKind) {
        let now = self.context.clock.now();
        if let Some(summary) = &mut self.summary {
            summary.phase_end(phase, now);
        }
        self.tracer.phase_end(&PhaseEndEvent {
            frame_index: self.frame_index,
            phase,
            timestamp: now,
        });
    }
}

impl Drop for ScopedFrame<'_> {
    fn drop(&mut self) {
        self.begin_phase(PhaseKind::Sweep);
        let stats = self.context.raster_cache.sweep_after_frame(&mut self.tracer);
        self.end_phase(PhaseKind::Sweep);

        let now = self.context.clock.now();
        let raster_time = &mut self.context.raster_time;
        raster_time.stop(now);
        let over_budget = raster_time.last_lap() > raster_time.frame_budget();

        if let Some(mut summary) = self.summary.take() {
            let evicted = stats.evicted_pictures + stats.evicted_layers;
            summary.set_cache_counts(
                stats.hits,
                stats.rasterized,
                u32::try_from(evicted).unwrap_or(u32::MAX),
            );
            summary.set_over_budget(over_budget);
            self.tracer.frame_summary(&summary.finish());
        }
    }
}
