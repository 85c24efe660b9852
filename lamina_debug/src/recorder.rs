// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Compact binary event recording and decoding.
//!
//! [`RecorderSink`] implements [`TraceSink`] and appends each event to a
//! `Vec<u8>` as a one-byte tag followed by fixed-size little-endian fields.
//! [`decode`] reads them back as an iterator of [`RecordedEvent`].

use lamina_core::layer::LayerKind;
use lamina_core::time::HostTime;
use lamina_core::trace::{
    CacheContent, CacheEvent, CacheEventKind, FrameBeginEvent, FrameDroppedEvent, FrameSummary,
    LayerBoundsEvent, PhaseBeginEvent, PhaseEndEvent, PhaseKind, ResourceKind, ResourceMissEvent,
    SubmitEvent, TraceSink,
};

// ---------------------------------------------------------------------------
// Event type discriminants
// ---------------------------------------------------------------------------

const TAG_FRAME_BEGIN: u8 = 1;
const TAG_PHASE_BEGIN: u8 = 2;
const TAG_PHASE_END: u8 = 3;
const TAG_CACHE: u8 = 4;
const TAG_RESOURCE_MISS: u8 = 5;
const TAG_FRAME_DROPPED: u8 = 6;
const TAG_SUBMIT: u8 = 7;
const TAG_FRAME_SUMMARY: u8 = 8;
const TAG_LAYER_BOUNDS: u8 = 9;

/// Wire order of [`LayerKind`]; a kind's index is its byte.
const LAYER_KINDS: [LayerKind; 13] = [
    LayerKind::Container,
    LayerKind::ClipRect,
    LayerKind::ClipRRect,
    LayerKind::ClipPath,
    LayerKind::Transform,
    LayerKind::Opacity,
    LayerKind::ColorFilter,
    LayerKind::ImageFilter,
    LayerKind::ShaderMask,
    LayerKind::Picture,
    LayerKind::Texture,
    LayerKind::PlatformView,
    LayerKind::PerformanceOverlay,
];

// ---------------------------------------------------------------------------
// RecorderSink
// ---------------------------------------------------------------------------

/// A [`TraceSink`] that encodes events into a compact binary buffer.
#[derive(Debug, Default)]
pub struct RecorderSink {
    buf: Vec<u8>,
}

impl RecorderSink {
    /// Creates an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a view of the recorded bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Consumes the recorder and returns the recorded bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // -- encoding helpers --------------------------------------------------

    fn write_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn write_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    fn write_bool(&mut self, v: bool) {
        self.write_u8(u8::from(v));
    }

    fn write_option_time(&mut self, v: Option<HostTime>) {
        match v {
            Some(t) => {
                self.write_u8(1);
                self.write_u64(t.nanos());
            }
            None => {
                self.write_u8(0);
                self.write_u64(0);
            }
        }
    }

    fn write_phase(&mut self, p: PhaseKind) {
        self.write_u8(match p {
            PhaseKind::Preroll => 0,
            PhaseKind::Paint => 1,
            PhaseKind::Sweep => 2,
            PhaseKind::Submit => 3,
        });
    }

    fn write_cache_kind(&mut self, k: CacheEventKind) {
        self.write_u8(match k {
            CacheEventKind::Hit => 0,
            CacheEventKind::Rasterized => 1,
            CacheEventKind::RasterizeFailed => 2,
            CacheEventKind::Evicted => 3,
        });
    }

    fn write_cache_content(&mut self, c: CacheContent) {
        let (tag, id) = match c {
            CacheContent::Picture(id) => (0, id),
            CacheContent::Layer(id) => (1, id),
        };
        self.write_u8(tag);
        self.write_u64(id);
    }

    fn write_resource_kind(&mut self, k: ResourceKind) {
        self.write_u8(match k {
            ResourceKind::Texture => 0,
            ResourceKind::PlatformView => 1,
            ResourceKind::ViewEmbedder => 2,
        });
    }

    fn write_layer_kind(&mut self, k: LayerKind) {
        let index = LAYER_KINDS.iter().position(|&known| known == k);
        self.write_u8(index.and_then(|i| u8::try_from(i).ok()).unwrap_or(u8::MAX));
    }
}

impl TraceSink for RecorderSink {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        self.write_u8(TAG_FRAME_BEGIN);
        self.write_u64(e.frame_index);
        self.write_u64(e.scene_version);
        self.write_u64(e.timestamp.nanos());
        self.write_option_time(e.target_time);
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.write_u8(TAG_PHASE_BEGIN);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.nanos());
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.write_u8(TAG_PHASE_END);
        self.write_u64(e.frame_index);
        self.write_phase(e.phase);
        self.write_u64(e.timestamp.nanos());
    }

    fn on_cache(&mut self, e: &CacheEvent) {
        self.write_u8(TAG_CACHE);
        self.write_cache_kind(e.kind);
        self.write_cache_content(e.content);
        self.write_u32(e.width);
        self.write_u32(e.height);
    }

    fn on_resource_miss(&mut self, e: &ResourceMissEvent) {
        self.write_u8(TAG_RESOURCE_MISS);
        self.write_resource_kind(e.kind);
        self.write_i64(e.id);
    }

    fn on_frame_dropped(&mut self, e: &FrameDroppedEvent) {
        self.write_u8(TAG_FRAME_DROPPED);
        self.write_u64(e.dropped_version);
        self.write_u64(e.replaced_by);
    }

    fn on_submit(&mut self, e: &SubmitEvent) {
        self.write_u8(TAG_SUBMIT);
        self.write_u64(e.frame_index);
        self.write_u64(e.submitted_at.nanos());
        self.write_bool(e.accepted);
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.write_u8(TAG_FRAME_SUMMARY);
        self.write_u64(s.frame_index);
        self.write_u64(s.start.nanos());
        self.write_u64(s.preroll_ns);
        self.write_u64(s.paint_ns);
        self.write_u64(s.sweep_ns);
        self.write_u64(s.submit_ns);
        self.write_u32(s.cache_hits);
        self.write_u32(s.cache_rasterized);
        self.write_u32(s.cache_evicted);
        self.write_bool(s.over_budget);
    }

    fn on_layer_bounds(&mut self, e: &LayerBoundsEvent) {
        self.write_u8(TAG_LAYER_BOUNDS);
        self.write_u64(e.layer_id);
        self.write_layer_kind(e.kind);
        for v in e.bounds {
            self.write_f64(v);
        }
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

/// A decoded event from a binary recording.
#[derive(Clone, Debug)]
pub enum RecordedEvent {
    /// A [`FrameBeginEvent`].
    FrameBegin(FrameBeginEvent),
    /// A [`PhaseBeginEvent`].
    PhaseBegin(PhaseBeginEvent),
    /// A [`PhaseEndEvent`].
    PhaseEnd(PhaseEndEvent),
    /// A [`CacheEvent`].
    Cache(CacheEvent),
    /// A [`ResourceMissEvent`].
    ResourceMiss(ResourceMissEvent),
    /// A [`FrameDroppedEvent`].
    FrameDropped(FrameDroppedEvent),
    /// A [`SubmitEvent`].
    Submit(SubmitEvent),
    /// A [`FrameSummary`].
    FrameSummary(FrameSummary),
    /// A [`LayerBoundsEvent`].
    LayerBounds(LayerBoundsEvent),
}

/// Decodes a byte slice produced by [`RecorderSink`] into an iterator of
/// [`RecordedEvent`].
///
/// Iteration stops at the first unknown tag or truncated record.
pub fn decode(bytes: &[u8]) -> DecodeIter<'_> {
    DecodeIter {
        data: bytes,
        pos: 0,
    }
}

/// Iterator over decoded events.
#[derive(Debug)]
pub struct DecodeIter<'a> {
    data: &'a [u8],
    pos: usize,
}

impl DecodeIter<'_> {
    fn read_array<const N: usize>(&mut self) -> Option<[u8; N]> {
        let end = self.pos.checked_add(N)?;
        let bytes = self.data.get(self.pos..end)?.try_into().ok()?;
        self.pos = end;
        Some(bytes)
    }

    fn read_u8(&mut self) -> Option<u8> {
        self.read_array::<1>().map(|[v]| v)
    }

    fn read_u32(&mut self) -> Option<u32> {
        self.read_array().map(u32::from_le_bytes)
    }

    fn read_u64(&mut self) -> Option<u64> {
        self.read_array().map(u64::from_le_bytes)
    }

    fn read_i64(&mut self) -> Option<i64> {
        self.read_array().map(i64::from_le_bytes)
    }

    fn read_f64(&mut self) -> Option<f64> {
        self.read_array().map(f64::from_le_bytes)
    }

    fn read_bool(&mut self) -> Option<bool> {
        Some(self.read_u8()? != 0)
    }

    fn read_time(&mut self) -> Option<HostTime> {
        self.read_u64().map(HostTime)
    }

    fn read_option_time(&mut self) -> Option<Option<HostTime>> {
        let present = self.read_u8()?;
        let t = self.read_time()?;
        Some((present != 0).then_some(t))
    }

    fn read_phase(&mut self) -> Option<PhaseKind> {
        Some(match self.read_u8()? {
            0 => PhaseKind::Preroll,
            1 => PhaseKind::Paint,
            2 => PhaseKind::Sweep,
            _ => PhaseKind::Submit,
        })
    }

    fn read_cache_kind(&mut self) -> Option<CacheEventKind> {
        Some(match self.read_u8()? {
            0 => CacheEventKind::Hit,
            1 => CacheEventKind::Rasterized,
            2 => CacheEventKind::RasterizeFailed,
            _ => CacheEventKind::Evicted,
        })
    }

    fn read_cache_content(&mut self) -> Option<CacheContent> {
        let tag = self.read_u8()?;
        let id = self.read_u64()?;
        Some(if tag == 0 {
            CacheContent::Picture(id)
        } else {
            CacheContent::Layer(id)
        })
    }

    fn read_resource_kind(&mut self) -> Option<ResourceKind> {
        Some(match self.read_u8()? {
            0 => ResourceKind::Texture,
            1 => ResourceKind::PlatformView,
            _ => ResourceKind::ViewEmbedder,
        })
    }

    fn read_layer_kind(&mut self) -> Option<LayerKind> {
        LAYER_KINDS.get(usize::from(self.read_u8()?)).copied()
    }

    fn decode_frame_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameBegin(FrameBeginEvent {
            frame_index: self.read_u64()?,
            scene_version: self.read_u64()?,
            timestamp: self.read_time()?,
            target_time: self.read_option_time()?,
        }))
    }

    fn decode_phase_begin(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseBegin(PhaseBeginEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_phase_end(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::PhaseEnd(PhaseEndEvent {
            frame_index: self.read_u64()?,
            phase: self.read_phase()?,
            timestamp: self.read_time()?,
        }))
    }

    fn decode_cache(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Cache(CacheEvent {
            kind: self.read_cache_kind()?,
            content: self.read_cache_content()?,
            width: self.read_u32()?,
            height: self.read_u32()?,
        }))
    }

    fn decode_resource_miss(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::ResourceMiss(ResourceMissEvent {
            kind: self.read_resource_kind()?,
            id: self.read_i64()?,
        }))
    }

    fn decode_frame_dropped(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameDropped(FrameDroppedEvent {
            dropped_version: self.read_u64()?,
            replaced_by: self.read_u64()?,
        }))
    }

    fn decode_submit(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::Submit(SubmitEvent {
            frame_index: self.read_u64()?,
            submitted_at: self.read_time()?,
            accepted: self.read_bool()?,
        }))
    }

    fn decode_frame_summary(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::FrameSummary(FrameSummary {
            frame_index: self.read_u64()?,
            start: self.read_time()?,
            preroll_ns: self.read_u64()?,
            paint_ns: self.read_u64()?,
            sweep_ns: self.read_u64()?,
            submit_ns: self.read_u64()?,
            cache_hits: self.read_u32()?,
            cache_rasterized: self.read_u32()?,
            cache_evicted: self.read_u32()?,
            over_budget: self.read_bool()?,
        }))
    }

    fn decode_layer_bounds(&mut self) -> Option<RecordedEvent> {
        Some(RecordedEvent::LayerBounds(LayerBoundsEvent {
            layer_id: self.read_u64()?,
            kind: self.read_layer_kind()?,
            bounds: [
                self.read_f64()?,
                self.read_f64()?,
                self.read_f64()?,
                self.read_f64()?,
            ],
        }))
    }
}

impl Iterator for DecodeIter<'_> {
    type Item = RecordedEvent;

    fn next(&mut self) -> Option<Self::Item> {
        match self.read_u8()? {
            TAG_FRAME_BEGIN => self.decode_frame_begin(),
            TAG_PHASE_BEGIN => self.decode_phase_begin(),
            TAG_PHASE_END => self.decode_phase_end(),
            TAG_CACHE => self.decode_cache(),
            TAG_RESOURCE_MISS => self.decode_resource_miss(),
            TAG_FRAME_DROPPED => self.decode_frame_dropped(),
            TAG_SUBMIT => self.decode_submit(),
            TAG_FRAME_SUMMARY => self.decode_frame_summary(),
            TAG_LAYER_BOUNDS => self.decode_layer_bounds(),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
