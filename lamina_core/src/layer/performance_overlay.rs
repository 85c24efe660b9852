// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use kurbo::{BezPath, Rect, Shape};
use peniko::Color;

use super::{LayerBase, LayerId, PaintContext, PrerollContext};
use crate::canvas::Canvas;
use crate::paint::Paint;
use crate::stopwatch::Stopwatch;
use crate::transform::Transform3d;

bitflags::bitflags! {
    /// Which statistics a [`PerformanceOverlayLayer`] shows.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct OverlayOptions: u32 {
        /// Raster thread statistics as text.
        const DISPLAY_RASTERIZER_STATISTICS = 1 << 0;
        /// Raster thread frame time graph.
        const VISUALIZE_RASTERIZER_STATISTICS = 1 << 1;
        /// UI thread statistics as text.
        const DISPLAY_ENGINE_STATISTICS = 1 << 2;
        /// UI thread frame time graph.
        const VISUALIZE_ENGINE_STATISTICS = 1 << 3;
    }
}

const PADDING: f64 = 8.0;
/// The graph's full height spans this many frame budgets.
const GRAPH_FRAMES: f64 = 3.0;
const BACKGROUND_COLOR: Color = Color::from_rgba8(0xFF, 0xFF, 0xFF, 0x7F);
const BAR_COLOR: Color = Color::from_rgba8(0x42, 0x85, 0xF4, 0xAA);
const MARKER_COLOR: Color = Color::from_rgba8(0x00, 0x00, 0x00, 0x66);
const UNDER_BUDGET_COLOR: Color = Color::from_rgba8(0x00, 0xC8, 0x53, 0xFF);
const OVER_BUDGET_COLOR: Color = Color::from_rgba8(0xE5, 0x39, 0x35, 0xFF);

/// Frame time graphs for the raster and UI threads.
///
/// The raster graph fills the top half of `overlay_rect` and the UI graph
/// the bottom half. Each bar is one lap from the stopwatch, scaled so the
/// graph's height is three frame budgets; horizontal markers show one and
/// two budgets, and the newest lap is highlighted green or red depending on
/// whether it fit the budget.
#[derive(Debug)]
pub struct PerformanceOverlayLayer {
    pub(crate) base: LayerBase,
    options: OverlayOptions,
    overlay_rect: Rect,
}

impl PerformanceOverlayLayer {
    /// Creates an overlay covering `overlay_rect`.
    #[must_use]
    pub fn new(options: OverlayOptions, overlay_rect: Rect) -> Self {
        Self {
            base: LayerBase::new(),
            options,
            overlay_rect,
        }
    }

    /// This layer's identity.
    #[must_use]
    pub fn id(&self) -> LayerId {
        self.base.id
    }

    /// Enabled statistics.
    #[must_use]
    pub fn options(&self) -> OverlayOptions {
        self.options
    }

    pub(crate) fn preroll(&mut self, _ctx: &mut PrerollContext<'_>, _matrix: &Transform3d) {
        self.base.paint_bounds = self.overlay_rect;
    }

    pub(crate) fn paint(&self, ctx: &mut PaintContext<'_>) {
        let r = self.overlay_rect;
        let mid = r.y0 + r.height() / 2.0;
        if self
            .options
            .contains(OverlayOptions::VISUALIZE_RASTERIZER_STATISTICS)
        {
            visualize_stopwatch(ctx.canvas, ctx.raster_time, Rect::new(r.x0, r.y0, r.x1, mid));
        }
        if self
            .options
            .contains(OverlayOptions::VISUALIZE_ENGINE_STATISTICS)
        {
            visualize_stopwatch(ctx.canvas, ctx.ui_time, Rect::new(r.x0, mid, r.x1, r.y1));
        }
    }
}

fn visualize_stopwatch(canvas: &mut dyn Canvas, stopwatch: &Stopwatch, area: Rect) {
    let rect = Rect::new(
        area.x0 + PADDING,
        area.y0 + PADDING,
        area.x1 - PADDING,
        area.y1 - PADDING,
    );
    if rect.width() <= 0.0 || rect.height() <= 0.0 {
        return;
    }
    canvas.draw_rect(rect, &Paint::solid(BACKGROUND_COLOR));

    let samples = stopwatch.sample_count();
    let bar_width = rect.width() / samples as f64;
    let bar = |i: usize, height: f64| {
        let x = rect.x0 + i as f64 * bar_width;
        Rect::new(x, rect.y1 - height, x + bar_width, rect.y1)
    };
    let bar_height =
        |lap| (stopwatch.unit_frame_interval(lap) / GRAPH_FRAMES).min(1.0) * rect.height();

    let mut bars = BezPath::new();
    for (i, lap) in stopwatch.laps().enumerate() {
        let height = bar_height(lap);
        if height > 0.0 {
            bars.extend(bar(i, height).path_elements(0.1));
        }
    }
    canvas.draw_path(&bars, &Paint::solid(BAR_COLOR));

    for budgets in [1.0, 2.0] {
        let y = rect.y1 - rect.height() * budgets / GRAPH_FRAMES;
        canvas.draw_rect(
            Rect::new(rect.x0, y, rect.x1, y + 1.0),
            &Paint::solid(MARKER_COLOR),
        );
    }

    let last = stopwatch.last_lap();
    let color = if last <= stopwatch.frame_budget() {
        UNDER_BUDGET_COLOR
    } else {
        OVER_BUDGET_COLOR
    };
    canvas.draw_rect(bar(samples - 1, bar_height(last)), &Paint::solid(color));
}

#[cfg(test)]
mod tests {
    use alloc::format;

    use peniko::Brush;

    use super::*;
    use crate::canvas::{CanvasOp, RecordingCanvas};
    use crate::layer::Layer;
    use crate::layer::test_support::{Env, op_names};
    use crate::time::Duration;

    const RECT: Rect = Rect::new(0.0, 0.0, 240.0, 200.0);

    fn paint(env: &Env, options: OverlayOptions) -> RecordingCanvas {
        let mut layer = Layer::from(PerformanceOverlayLayer::new(options, RECT));
        layer.preroll(&mut env.preroll_ctx(), &Transform3d::IDENTITY);
        assert_eq!(layer.paint_bounds(), RECT);
        let mut canvas = RecordingCanvas::new(Rect::ZERO);
        layer.paint(&mut env.paint_ctx(&mut canvas));
        canvas
    }

    #[test]
    fn options_combine() {
        let opts = OverlayOptions::VISUALIZE_RASTERIZER_STATISTICS
            | OverlayOptions::DISPLAY_ENGINE_STATISTICS;
        assert!(opts.contains(OverlayOptions::VISUALIZE_RASTERIZER_STATISTICS));
        assert!(!opts.contains(OverlayOptions::VISUALIZE_ENGINE_STATISTICS));
        assert_eq!(opts.bits(), 0b0110);
        assert_eq!(OverlayOptions::from_bits_truncate(0xFF).bits(), 0b1111);
        assert!(OverlayOptions::empty().is_empty());
        assert_eq!(
            format!("{opts:?}"),
            "OverlayOptions(VISUALIZE_RASTERIZER_STATISTICS | DISPLAY_ENGINE_STATISTICS)"
        );
    }

    #[test]
    fn display_flags_draw_nothing() {
        let env = Env::default();
        let canvas = paint(
            &env,
            OverlayOptions::DISPLAY_RASTERIZER_STATISTICS
                | OverlayOptions::DISPLAY_ENGINE_STATISTICS,
        );
        assert!(canvas.ops().is_empty());
    }

    #[test]
    fn both_graphs_are_drawn_in_their_halves() {
        let env = Env::default();
        let canvas = paint(
            &env,
            OverlayOptions::VISUALIZE_RASTERIZER_STATISTICS
                | OverlayOptions::VISUALIZE_ENGINE_STATISTICS,
        );
        let graph = ["draw_rect", "draw_path", "draw_rect", "draw_rect", "draw_rect"];
        let names = op_names(canvas.ops());
        assert_eq!(names.len(), graph.len() * 2);
        assert_eq!(names[..5], graph);
        assert_eq!(
            canvas.ops()[0],
            CanvasOp::DrawRect {
                rect: Rect::new(8.0, 8.0, 232.0, 92.0),
                paint: Paint::solid(BACKGROUND_COLOR),
            }
        );
        assert!(matches!(
            &canvas.ops()[5],
            CanvasOp::DrawRect { rect, .. } if *rect == Rect::new(8.0, 108.0, 232.0, 192.0)
        ));
    }

    #[test]
    fn last_lap_is_colored_by_budget() {
        let last_color = |lap: Duration| {
            let mut env = Env::default();
            env.raster_time.set_lap_time(lap);
            let canvas = paint(&env, OverlayOptions::VISUALIZE_RASTERIZER_STATISTICS);
            match canvas.ops().last() {
                Some(CanvasOp::DrawRect { paint, .. }) => paint.brush.clone(),
                other => panic!("expected DrawRect, got {other:?}"),
            }
        };
        assert_eq!(
            last_color(Duration::from_millis(4)),
            Brush::Solid(UNDER_BUDGET_COLOR)
        );
        assert_eq!(
            last_color(Duration::from_millis(40)),
            Brush::Solid(OVER_BUDGET_COLOR)
        );
    }
}
