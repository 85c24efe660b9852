// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Tracing and diagnostics for the raster pipeline.
//!
//! [`TraceSink`] has one method per event kind, all defaulting to no-ops, so a
//! sink only overrides what it cares about. [`Tracer`] wraps an optional
//! `&mut dyn TraceSink` and is what the compositor actually carries through a
//! frame. With the `trace` feature **off**, every `Tracer` method compiles to
//! nothing. With it **on**, each call costs one `Option` branch.
//!
//! [`FrameSummaryBuilder`] collects phase timestamps and cache counters
//! during a frame and produces a [`FrameSummary`].
//!
//! # Crate features
//!
//! - `trace` enables the `Tracer` method bodies.
//! - `trace-rich` (implies `trace`) adds per-layer [`LayerBoundsEvent`]s
//!   emitted during preroll.

#[cfg(feature = "trace-rich")]
use crate::layer::LayerKind;
use crate::time::HostTime;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Which phase of a frame is being measured.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PhaseKind {
    /// Bounds computation and raster cache preparation.
    Preroll,
    /// Issuing draw calls.
    Paint,
    /// Evicting unused raster cache entries.
    Sweep,
    /// Handing the frame to the surface.
    Submit,
}

/// What happened to a raster cache entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheEventKind {
    /// A cached image was drawn instead of the content.
    Hit,
    /// Content was rasterized into a new image.
    Rasterized,
    /// Rasterization was attempted and failed.
    RasterizeFailed,
    /// The entry was evicted by the end-of-frame sweep.
    Evicted,
}

/// Which kind of content a cache entry holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheContent {
    /// A picture, by picture id.
    Picture(u64),
    /// A layer subtree, by layer id.
    Layer(u64),
}

/// Which external resource could not be found.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A texture id not present in the registry.
    Texture,
    /// A platform view the embedder does not know about.
    PlatformView,
    /// A platform view layer painted without an embedder.
    ViewEmbedder,
}

// ---------------------------------------------------------------------------
// Event structs
// ---------------------------------------------------------------------------

/// Emitted when the compositor starts a frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameBeginEvent {
    /// Monotonic frame counter.
    pub frame_index: u64,
    /// Scene version of the tree being drawn.
    pub scene_version: u64,
    /// Host time at frame start.
    pub timestamp: HostTime,
    /// When the frame should be on screen, if known.
    pub target_time: Option<HostTime>,
}

/// Marks the beginning of a frame phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseBeginEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is starting.
    pub phase: PhaseKind,
    /// Host time at the start of the phase.
    pub timestamp: HostTime,
}

/// Marks the end of a frame phase.
#[derive(Clone, Copy, Debug)]
pub struct PhaseEndEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Which phase is ending.
    pub phase: PhaseKind,
    /// Host time at the end of the phase.
    pub timestamp: HostTime,
}

/// A raster cache entry changed state or was used.
#[derive(Clone, Copy, Debug)]
pub struct CacheEvent {
    /// What happened.
    pub kind: CacheEventKind,
    /// Which content.
    pub content: CacheContent,
    /// Image width in pixels (0 if there is no image).
    pub width: u32,
    /// Image height in pixels (0 if there is no image).
    pub height: u32,
}

/// A referenced external resource was missing and its layer was skipped.
#[derive(Clone, Copy, Debug)]
pub struct ResourceMissEvent {
    /// Which kind of resource.
    pub kind: ResourceKind,
    /// The id that failed to resolve.
    pub id: i64,
}

/// A layer tree was replaced in the pipeline before it was drawn.
#[derive(Clone, Copy, Debug)]
pub struct FrameDroppedEvent {
    /// Scene version of the discarded tree.
    pub dropped_version: u64,
    /// Scene version of the tree that replaced it.
    pub replaced_by: u64,
}

/// Emitted when a frame is handed to the surface.
#[derive(Clone, Copy, Debug)]
pub struct SubmitEvent {
    /// Frame counter.
    pub frame_index: u64,
    /// Host time of submission.
    pub submitted_at: HostTime,
    /// Whether the surface accepted the frame.
    pub accepted: bool,
}

/// Per-frame timing summary produced by [`FrameSummaryBuilder`].
#[derive(Clone, Copy, Debug)]
pub struct FrameSummary {
    /// Frame counter.
    pub frame_index: u64,
    /// Host time at frame start.
    pub start: HostTime,
    /// Preroll duration in nanoseconds (0 if not measured).
    pub preroll_ns: u64,
    /// Paint duration in nanoseconds (0 if not measured).
    pub paint_ns: u64,
    /// Sweep duration in nanoseconds (0 if not measured).
    pub sweep_ns: u64,
    /// Submit duration in nanoseconds (0 if not measured).
    pub submit_ns: u64,
    /// Raster cache hits this frame.
    pub cache_hits: u32,
    /// Raster cache images created this frame.
    pub cache_rasterized: u32,
    /// Raster cache entries evicted this frame.
    pub cache_evicted: u32,
    /// Whether the frame took longer than its budget.
    pub over_budget: bool,
}

/// Bounds computed for one layer during preroll.
#[cfg(feature = "trace-rich")]
#[derive(Clone, Copy, Debug)]
pub struct LayerBoundsEvent {
    /// Layer id.
    pub layer_id: u64,
    /// Layer variant.
    pub kind: LayerKind,
    /// Paint bounds as `[x0, y0, x1, y1]`.
    pub bounds: [f64; 4],
}

// ---------------------------------------------------------------------------
// TraceSink trait
// ---------------------------------------------------------------------------

/// Receives trace events from the raster pipeline.
///
/// All methods have default no-op implementations.
pub trait TraceSink {
    /// Called when a frame starts.
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        _ = e;
    }

    /// Called at the beginning of a frame phase.
    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        _ = e;
    }

    /// Called at the end of a frame phase.
    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        _ = e;
    }

    /// Called for raster cache activity.
    fn on_cache(&mut self, e: &CacheEvent) {
        _ = e;
    }

    /// Called when a texture or platform view could not be resolved.
    fn on_resource_miss(&mut self, e: &ResourceMissEvent) {
        _ = e;
    }

    /// Called when the pipeline discards an undrawn tree.
    fn on_frame_dropped(&mut self, e: &FrameDroppedEvent) {
        _ = e;
    }

    /// Called when a frame is submitted.
    fn on_submit(&mut self, e: &SubmitEvent) {
        _ = e;
    }

    /// Called with a per-frame summary.
    fn on_frame_summary(&mut self, s: &FrameSummary) {
        _ = s;
    }

    /// Called with per-layer preroll bounds (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    fn on_layer_bounds(&mut self, e: &LayerBoundsEvent) {
        _ = e;
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that discards all events.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopSink;

impl TraceSink for NoopSink {}

// ---------------------------------------------------------------------------
// Tracer wrapper
// ---------------------------------------------------------------------------

/// Thin wrapper around an optional [`TraceSink`].
pub struct Tracer<'a> {
    #[cfg(feature = "trace")]
    sink: Option<&'a mut dyn TraceSink>,
    #[cfg(not(feature = "trace"))]
    _marker: core::marker::PhantomData<&'a mut dyn TraceSink>,
}

impl core::fmt::Debug for Tracer<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Tracer").finish_non_exhaustive()
    }
}

impl Default for Tracer<'_> {
    fn default() -> Self {
        Self::none()
    }
}

/// Expands to a `Tracer` method that forwards one event to the sink.
macro_rules! forward {
    ($(#[$doc:meta])* $name:ident, $hook:ident, $ty:ty) => {
        $(#[$doc])*
        #[inline]
        pub fn $name(&mut self, e: &$ty) {
            #[cfg(feature = "trace")]
            if let Some(s) = &mut self.sink {
                s.$hook(e);
            }
            #[cfg(not(feature = "trace"))]
            {
                _ = e;
            }
        }
    };
}

impl<'a> Tracer<'a> {
    /// Creates a tracer that dispatches to the given sink.
    #[inline]
    #[must_use]
    pub fn new(sink: &'a mut dyn TraceSink) -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: Some(sink) }
        }
        #[cfg(not(feature = "trace"))]
        {
            _ = sink;
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Creates a tracer that discards all events.
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        #[cfg(feature = "trace")]
        {
            Self { sink: None }
        }
        #[cfg(not(feature = "trace"))]
        {
            Self {
                _marker: core::marker::PhantomData,
            }
        }
    }

    /// Borrows this tracer for a shorter scope.
    #[inline]
    #[must_use]
    pub fn reborrow(&mut self) -> Tracer<'_> {
        #[cfg(feature = "trace")]
        {
            match &mut self.sink {
                Some(s) => Tracer::new(&mut **s),
                None => Tracer::none(),
            }
        }
        #[cfg(not(feature = "trace"))]
        {
            Tracer::none()
        }
    }

    forward!(
        /// Emits a [`FrameBeginEvent`].
        frame_begin, on_frame_begin, FrameBeginEvent
    );
    forward!(
        /// Emits a [`PhaseBeginEvent`].
        phase_begin, on_phase_begin, PhaseBeginEvent
    );
    forward!(
        /// Emits a [`PhaseEndEvent`].
        phase_end, on_phase_end, PhaseEndEvent
    );
    forward!(
        /// Emits a [`CacheEvent`].
        cache, on_cache, CacheEvent
    );
    forward!(
        /// Emits a [`ResourceMissEvent`].
        resource_miss, on_resource_miss, ResourceMissEvent
    );
    forward!(
        /// Emits a [`FrameDroppedEvent`].
        frame_dropped, on_frame_dropped, FrameDroppedEvent
    );
    forward!(
        /// Emits a [`SubmitEvent`].
        submit, on_submit, SubmitEvent
    );
    forward!(
        /// Emits a [`FrameSummary`].
        frame_summary, on_frame_summary, FrameSummary
    );

    /// Emits a [`LayerBoundsEvent`] (requires `trace-rich` feature).
    #[cfg(feature = "trace-rich")]
    #[inline]
    pub fn layer_bounds(&mut self, e: &LayerBoundsEvent) {
        if let Some(s) = &mut self.sink {
            s.on_layer_bounds(e);
        }
    }
}

// ---------------------------------------------------------------------------
// FrameSummaryBuilder
// ---------------------------------------------------------------------------

/// Collects phase timestamps and cache counters for one frame.
#[derive(Debug)]
pub struct FrameSummaryBuilder {
    frame_index: u64,
    start: HostTime,
    phase_starts: [Option<HostTime>; 4],
    phase_ends: [Option<HostTime>; 4],
    cache_hits: u32,
    cache_rasterized: u32,
    cache_evicted: u32,
    over_budget: bool,
}

impl FrameSummaryBuilder {
    /// Starts building a summary for the given frame.
    #[must_use]
    pub fn new(frame_index: u64, start: HostTime) -> Self {
        Self {
            frame_index,
            start,
            phase_starts: [None; 4],
            phase_ends: [None; 4],
            cache_hits: 0,
            cache_rasterized: 0,
            cache_evicted: 0,
            over_budget: false,
        }
    }

    /// Records the start of a phase.
    pub fn phase_begin(&mut self, phase: PhaseKind, t: HostTime) {
        self.phase_starts[phase_index(phase)] = Some(t);
    }

    /// Records the end of a phase.
    pub fn phase_end(&mut self, phase: PhaseKind, t: HostTime) {
        self.phase_ends[phase_index(phase)] = Some(t);
    }

    /// Counts one cache event.
    pub fn record_cache(&mut self, kind: CacheEventKind) {
        let slot = match kind {
            CacheEventKind::Hit => &mut self.cache_hits,
            CacheEventKind::Rasterized => &mut self.cache_rasterized,
            CacheEventKind::Evicted => &mut self.cache_evicted,
            CacheEventKind::RasterizeFailed => return,
        };
        *slot = slot.saturating_add(1);
    }

    /// Overwrites the cache counters with totals gathered elsewhere.
    pub fn set_cache_counts(&mut self, hits: u32, rasterized: u32, evicted: u32) {
        self.cache_hits = hits;
        self.cache_rasterized = rasterized;
        self.cache_evicted = evicted;
    }

    /// Sets whether the frame exceeded its budget.
    pub fn set_over_budget(&mut self, over: bool) {
        self.over_budget = over;
    }

    /// Consumes the builder and produces the final [`FrameSummary`].
    #[must_use]
    pub fn finish(self) -> FrameSummary {
        FrameSummary {
            frame_index: self.frame_index,
            start: self.start,
            preroll_ns: self.phase_duration(PhaseKind::Preroll),
            paint_ns: self.phase_duration(PhaseKind::Paint),
            sweep_ns: self.phase_duration(PhaseKind::Sweep),
            submit_ns: self.phase_duration(PhaseKind::Submit),
            cache_hits: self.cache_hits,
            cache_rasterized: self.cache_rasterized,
            cache_evicted: self.cache_evicted,
            over_budget: self.over_budget,
        }
    }

    fn phase_duration(&self, phase: PhaseKind) -> u64 {
        let idx = phase_index(phase);
        match (self.phase_starts[idx], self.phase_ends[idx]) {
            (Some(start), Some(end)) => end.saturating_duration_since(start).nanos(),
            _ => 0,
        }
    }
}

/// Maps a [`PhaseKind`] to an array index.
const fn phase_index(phase: PhaseKind) -> usize {
    match phase {
        PhaseKind::Preroll => 0,
        PhaseKind::Paint => 1,
        PhaseKind::Sweep => 2,
        PhaseKind::Submit => 3,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracer_none_does_nothing() {
        let mut tracer = Tracer::none();
        tracer.frame_begin(&FrameBeginEvent {
            frame_index: 1,
            scene_version: 1,
            timestamp: HostTime(0),
            target_time: None,
        });
        tracer.reborrow().resource_miss(&ResourceMissEvent {
            kind: ResourceKind::Texture,
            id: 3,
        });
    }

    #[test]
    fn summary_builder_computes_durations() {
        let mut builder = FrameSummaryBuilder::new(42, HostTime(1_000_000));
        builder.phase_begin(PhaseKind::Preroll, HostTime(1_000_000));
        builder.phase_end(PhaseKind::Preroll, HostTime(1_000_100));
        builder.phase_begin(PhaseKind::Paint, HostTime(1_000_100));
        builder.phase_end(PhaseKind::Paint, HostTime(1_000_500));
        builder.phase_begin(PhaseKind::Sweep, HostTime(1_000_500));
        builder.phase_end(PhaseKind::Sweep, HostTime(1_000_550));
        builder.record_cache(CacheEventKind::Hit);
        builder.record_cache(CacheEventKind::Hit);
        builder.record_cache(CacheEventKind::Rasterized);
        builder.record_cache(CacheEventKind::RasterizeFailed);

        let summary = builder.finish();
        assert_eq!(summary.frame_index, 42);
        assert_eq!(summary.preroll_ns, 100);
        assert_eq!(summary.paint_ns, 400);
        assert_eq!(summary.sweep_ns, 50);
        assert_eq!(summary.submit_ns, 0);
        assert_eq!(summary.cache_hits, 2);
        assert_eq!(summary.cache_rasterized, 1);
        assert_eq!(summary.cache_evicted, 0);
        assert!(!summary.over_budget);
    }

    #[cfg(feature = "trace")]
    #[test]
    fn tracer_dispatches_to_sink() {
        use alloc::vec::Vec;

        struct MissSink {
            ids: Vec<i64>,
        }
        impl TraceSink for MissSink {
            fn on_resource_miss(&mut self, e: &ResourceMissEvent) {
                self.ids.push(e.id);
            }
        }

        let mut sink = MissSink { ids: Vec::new() };
        let mut tracer = Tracer::new(&mut sink);
        tracer.resource_miss(&ResourceMissEvent {
            kind: ResourceKind::Texture,
            id: 7,
        });
        tracer.reborrow().resource_miss(&ResourceMissEvent {
            kind: ResourceKind::PlatformView,
            id: 9,
        });
        drop(tracer);
        assert_eq!(sink.ids, &[7, 9]);
    }
}
