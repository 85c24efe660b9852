// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Human-readable trace output, one line per event.

use std::io::Write;

use lamina_core::trace::{
    CacheContent, CacheEvent, FrameBeginEvent, FrameDroppedEvent, FrameSummary, LayerBoundsEvent,
    PhaseBeginEvent, PhaseEndEvent, ResourceMissEvent, SubmitEvent, TraceSink,
};

/// A [`TraceSink`] that writes each event as a line of text.
///
/// Write errors are counted rather than reported, since sink hooks cannot
/// fail.
#[derive(Debug)]
pub struct PrettyPrintSink<W: Write> {
    out: W,
    write_errors: u64,
}

impl<W: Write> PrettyPrintSink<W> {
    /// Creates a sink writing to `out`.
    #[must_use]
    pub fn new(out: W) -> Self {
        Self {
            out,
            write_errors: 0,
        }
    }

    /// Number of lines that failed to write.
    #[must_use]
    pub fn write_errors(&self) -> u64 {
        self.write_errors
    }

    /// Consumes the sink and returns the writer.
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, args: std::fmt::Arguments<'_>) {
        if writeln!(self.out, "{args}").is_err() {
            self.write_errors += 1;
        }
    }
}

fn ms(nanos: u64) -> f64 {
    nanos as f64 / 1_000_000.0
}

impl<W: Write> TraceSink for PrettyPrintSink<W> {
    fn on_frame_begin(&mut self, e: &FrameBeginEvent) {
        match e.target_time {
            Some(target) => self.line(format_args!(
                "[frame {}] begin scene={} t={} target={}",
                e.frame_index,
                e.scene_version,
                e.timestamp.nanos(),
                target.nanos()
            )),
            None => self.line(format_args!(
                "[frame {}] begin scene={} t={}",
                e.frame_index,
                e.scene_version,
                e.timestamp.nanos()
            )),
        }
    }

    fn on_phase_begin(&mut self, e: &PhaseBeginEvent) {
        self.line(format_args!(
            "[frame {}] {:?} begin t={}",
            e.frame_index,
            e.phase,
            e.timestamp.nanos()
        ));
    }

    fn on_phase_end(&mut self, e: &PhaseEndEvent) {
        self.line(format_args!(
            "[frame {}] {:?} end t={}",
            e.frame_index,
            e.phase,
            e.timestamp.nanos()
        ));
    }

    fn on_cache(&mut self, e: &CacheEvent) {
        let (what, id) = match e.content {
            CacheContent::Picture(id) => ("picture", id),
            CacheContent::Layer(id) => ("layer", id),
        };
        self.line(format_args!(
            "cache {:?} {what} {id} {}x{}",
            e.kind, e.width, e.height
        ));
    }

    fn on_resource_miss(&mut self, e: &ResourceMissEvent) {
        self.line(format_args!("missing {:?} {}", e.kind, e.id));
    }

    fn on_frame_dropped(&mut self, e: &FrameDroppedEvent) {
        self.line(format_args!(
            "dropped scene {} (replaced by {})",
            e.dropped_version, e.replaced_by
        ));
    }

    fn on_submit(&mut self, e: &SubmitEvent) {
        let verdict = if e.accepted { "accepted" } else { "rejected" };
        self.line(format_args!(
            "[frame {}] submit {verdict} t={}",
            e.frame_index,
            e.submitted_at.nanos()
        ));
    }

    fn on_frame_summary(&mut self, s: &FrameSummary) {
        self.line(format_args!(
            "[frame {}] summary preroll={:.3}ms paint={:.3}ms sweep={:.3}ms submit={:.3}ms \
             cache hit={} new={} evicted={}{}",
            s.frame_index,
            ms(s.preroll_ns),
            ms(s.paint_ns),
            ms(s.sweep_ns),
            ms(s.submit_ns),
            s.cache_hits,
            s.cache_rasterized,
            s.cache_evicted,
            if s.over_budget { " OVER BUDGET" } else { "" }
        ));
    }

    fn on_layer_bounds(&mut self, e: &LayerBoundsEvent) {
        let [x0, y0, x1, y1] = e.bounds;
        self.line(format_args!(
            "  layer {} {} ({x0}, {y0}, {x1}, {y1})",
            e.layer_id,
            e.kind.name()
        ));
    }
}

#[cfg(test)]
mod tests {
    use lamina_core::layer::LayerKind;
    use lamina_core::time::HostTime;
    use lamina_core::trace::{CacheEventKind, PhaseKind, ResourceKind};

    use super::*;

    fn output(sink: PrettyPrintSink<Vec<u8>>) -> String {
        String::from_utf8(sink.into_inner()).expect("output is UTF-8")
    }

    #[test]
    fn one_line_per_event() {
        let mut sink = PrettyPrintSink::new(Vec::new());
        sink.on_frame_begin(&FrameBeginEvent {
            frame_index: 2,
            scene_version: 5,
            timestamp: HostTime(100),
            target_time: None,
        });
        sink.on_phase_begin(&PhaseBeginEvent {
            frame_index: 2,
            phase: PhaseKind::Preroll,
            timestamp: HostTime(110),
        });
        sink.on_cache(&CacheEvent {
            kind: CacheEventKind::Hit,
            content: CacheContent::Picture(9),
            width: 16,
            height: 8,
        });
        sink.on_resource_miss(&ResourceMissEvent {
            kind: ResourceKind::Texture,
            id: 3,
        });
        sink.on_submit(&SubmitEvent {
            frame_index: 2,
            submitted_at: HostTime(500),
            accepted: true,
        });
        assert_eq!(sink.write_errors(), 0);
        let text = output(sink);
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            [
                "[frame 2] begin scene=5 t=100",
                "[frame 2] Preroll begin t=110",
                "cache Hit picture 9 16x8",
                "missing Texture 3",
                "[frame 2] submit accepted t=500",
            ]
        );
    }

    #[test]
    fn summary_flags_over_budget() {
        let mut sink = PrettyPrintSink::new(Vec::new());
        sink.on_frame_summary(&FrameSummary {
            frame_index: 4,
            start: HostTime(0),
            preroll_ns: 250_000,
            paint_ns: 18_000_000,
            sweep_ns: 0,
            submit_ns: 500_000,
            cache_hits: 1,
            cache_rasterized: 0,
            cache_evicted: 0,
            over_budget: true,
        });
        let text = output(sink);
        assert!(text.contains("paint=18.000ms"), "{text}");
        assert!(text.trim_end().ends_with("OVER BUDGET"), "{text}");
    }

    #[test]
    fn layer_bounds_use_kind_name() {
        let mut sink = PrettyPrintSink::new(Vec::new());
        sink.on_layer_bounds(&LayerBoundsEvent {
            layer_id: 11,
            kind: LayerKind::Opacity,
            bounds: [0.0, 0.0, 4.5, 2.0],
        });
        assert_eq!(output(sink), "  layer 11 Opacity (0, 0, 4.5, 2)\n");
    }
}
