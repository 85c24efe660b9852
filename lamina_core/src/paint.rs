// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint descriptions passed to the canvas.
//!
//! [`Paint`] bundles what a draw or save-layer call needs beyond geometry: a
//! brush, a group opacity, a blend mode, and optional color/image filters.
//! Filters here are *descriptions*; applying them is the canvas backend's job.
//! The compositor only needs [`ImageFilter::filter_bounds`] to know how far an
//! effect can spread.

use alloc::boxed::Box;

use kurbo::{Rect, Vec2};
use peniko::{BlendMode, Brush, Color};

use crate::geometry;

/// Gaussian kernels are treated as zero past three standard deviations.
const BLUR_SIGMA_EXTENT: f64 = 3.0;

/// How a clip layer clips its children.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Clip {
    /// No clipping at all.
    None,
    /// Aliased clip; cheapest.
    HardEdge,
    /// Anti-aliased clip.
    #[default]
    AntiAlias,
    /// Anti-aliased clip with an offscreen layer so that edges blend once.
    AntiAliasWithSaveLayer,
}

impl Clip {
    /// Whether clip edges should be anti-aliased.
    #[inline]
    #[must_use]
    pub const fn is_anti_alias(self) -> bool {
        matches!(self, Self::AntiAlias | Self::AntiAliasWithSaveLayer)
    }

    /// Whether the clip wraps its children in a save layer.
    #[inline]
    #[must_use]
    pub const fn needs_save_layer(self) -> bool {
        matches!(self, Self::AntiAliasWithSaveLayer)
    }
}

/// A per-pixel color transformation.
#[derive(Clone, Debug, PartialEq)]
pub enum ColorFilter {
    /// Blend a constant color onto every pixel.
    Mode {
        /// Source color.
        color: Color,
        /// How the color is combined with the pixel.
        blend: BlendMode,
    },
    /// Row-major 4×5 color matrix applied to un-premultiplied RGBA.
    Matrix([f32; 20]),
    /// Linear to sRGB transfer curve.
    LinearToSrgbGamma,
    /// sRGB to linear transfer curve.
    SrgbToLinearGamma,
}

/// A filter applied to the rendered output of a group.
#[derive(Clone, Debug, PartialEq)]
pub enum ImageFilter {
    /// Gaussian blur.
    Blur {
        /// Standard deviation along X, in local units.
        sigma_x: f32,
        /// Standard deviation along Y, in local units.
        sigma_y: f32,
    },
    /// Translate the output.
    Offset {
        /// Offset along X.
        dx: f32,
        /// Offset along Y.
        dy: f32,
    },
    /// Blurred, offset, tinted copy drawn under the source.
    DropShadow {
        /// Shadow offset along X.
        dx: f32,
        /// Shadow offset along Y.
        dy: f32,
        /// Shadow blur along X.
        sigma_x: f32,
        /// Shadow blur along Y.
        sigma_y: f32,
        /// Shadow color.
        color: Color,
    },
    /// Morphological dilation.
    Dilate {
        /// Radius along X.
        radius_x: f32,
        /// Radius along Y.
        radius_y: f32,
    },
    /// Morphological erosion.
    Erode {
        /// Radius along X.
        radius_x: f32,
        /// Radius along Y.
        radius_y: f32,
    },
    /// A color filter used as an image filter.
    Color(ColorFilter),
    /// Apply `inner`, then `outer`.
    Compose {
        /// Applied second.
        outer: Box<ImageFilter>,
        /// Applied first.
        inner: Box<ImageFilter>,
    },
}

impl ImageFilter {
    /// Uniform Gaussian blur.
    #[inline]
    #[must_use]
    pub const fn blur(sigma: f32) -> Self {
        Self::Blur {
            sigma_x: sigma,
            sigma_y: sigma,
        }
    }

    /// Output offset.
    #[inline]
    #[must_use]
    pub const fn offset(dx: f32, dy: f32) -> Self {
        Self::Offset { dx, dy }
    }

    /// Returns the region the filter can write to, given source content in
    /// `src`.
    ///
    /// Empty input yields empty output.
    #[must_use]
    pub fn filter_bounds(&self, src: Rect) -> Rect {
        let src = geometry::sanitize(src);
        if geometry::is_empty(src) {
            return src;
        }
        match self {
            Self::Blur { sigma_x, sigma_y } => geometry::outset(
                src,
                BLUR_SIGMA_EXTENT * f64::from(sigma_x.max(0.0)),
                BLUR_SIGMA_EXTENT * f64::from(sigma_y.max(0.0)),
            ),
            Self::Offset { dx, dy } => {
                geometry::offset(src, Vec2::new(f64::from(*dx), f64::from(*dy)))
            }
            Self::DropShadow {
                dx,
                dy,
                sigma_x,
                sigma_y,
                ..
            } => {
                let shadow = geometry::outset(
                    geometry::offset(src, Vec2::new(f64::from(*dx), f64::from(*dy))),
                    BLUR_SIGMA_EXTENT * f64::from(sigma_x.max(0.0)),
                    BLUR_SIGMA_EXTENT * f64::from(sigma_y.max(0.0)),
                );
                geometry::join(src, shadow)
            }
            Self::Dilate { radius_x, radius_y } => {
                geometry::outset(src, f64::from(*radius_x), f64::from(*radius_y))
            }
            Self::Erode { radius_x, radius_y } => {
                geometry::outset(src, -f64::from(*radius_x), -f64::from(*radius_y))
            }
            Self::Color(_) => src,
            Self::Compose { outer, inner } => outer.filter_bounds(inner.filter_bounds(src)),
        }
    }
}

/// Everything a draw or save-layer call needs beyond geometry.
#[derive(Clone, Debug, PartialEq)]
pub struct Paint {
    /// Fill brush for shape draws. Ignored by save layers.
    pub brush: Brush,
    /// Group alpha in `[0, 1]`.
    pub opacity: f32,
    /// Compositing mode.
    pub blend: BlendMode,
    /// Optional color filter.
    pub color_filter: Option<ColorFilter>,
    /// Optional image filter.
    pub image_filter: Option<ImageFilter>,
    /// Anti-alias shape edges.
    pub anti_alias: bool,
}

impl Default for Paint {
    fn default() -> Self {
        Self {
            brush: Brush::Solid(Color::BLACK),
            opacity: 1.0,
            blend: BlendMode::default(),
            color_filter: None,
            image_filter: None,
            anti_alias: true,
        }
    }
}

impl Paint {
    /// A solid-color paint.
    #[must_use]
    pub fn solid(color: Color) -> Self {
        Self {
            brush: Brush::Solid(color),
            ..Self::default()
        }
    }

    /// Sets the group opacity, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_opacity(mut self, opacity: f32) -> Self {
        self.opacity = opacity.clamp(0.0, 1.0);
        self
    }

    /// Sets the blend mode.
    #[must_use]
    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    /// Sets the brush.
    #[must_use]
    pub fn with_brush(mut self, brush: impl Into<Brush>) -> Self {
        self.brush = brush.into();
        self
    }

    /// Sets the color filter.
    #[must_use]
    pub fn with_color_filter(mut self, filter: ColorFilter) -> Self {
        self.color_filter = Some(filter);
        self
    }

    /// Sets the image filter.
    #[must_use]
    pub fn with_image_filter(mut self, filter: ImageFilter) -> Self {
        self.image_filter = Some(filter);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blur_grows_by_three_sigma() {
        let r = ImageFilter::blur(2.0).filter_bounds(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(r, Rect::new(-6.0, -6.0, 16.0, 16.0));
    }

    #[test]
    fn drop_shadow_unions_source_and_shadow() {
        let f = ImageFilter::DropShadow {
            dx: 10.0,
            dy: 0.0,
            sigma_x: 0.0,
            sigma_y: 0.0,
            color: Color::BLACK,
        };
        let r = f.filter_bounds(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(r, Rect::new(0.0, 0.0, 20.0, 10.0));
    }

    #[test]
    fn compose_applies_inner_first() {
        let f = ImageFilter::Compose {
            outer: Box::new(ImageFilter::offset(5.0, 0.0)),
            inner: Box::new(ImageFilter::blur(1.0)),
        };
        let r = f.filter_bounds(Rect::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(r, Rect::new(2.0, -3.0, 18.0, 13.0));
    }

    #[test]
    fn erode_can_empty_the_bounds() {
        let f = ImageFilter::Erode {
            radius_x: 20.0,
            radius_y: 1.0,
        };
        assert_eq!(
            f.filter_bounds(Rect::new(0.0, 0.0, 10.0, 10.0)),
            geometry::EMPTY_RECT
        );
    }

    #[test]
    fn empty_source_stays_empty() {
        assert_eq!(
            ImageFilter::blur(8.0).filter_bounds(geometry::EMPTY_RECT),
            geometry::EMPTY_RECT
        );
    }

    #[test]
    fn opacity_is_clamped() {
        assert_eq!(Paint::default().with_opacity(3.0).opacity, 1.0);
        assert_eq!(Paint::default().with_opacity(-1.0).opacity, 0.0);
    }

    #[test]
    fn clip_behavior_flags() {
        assert!(!Clip::HardEdge.is_anti_alias());
        assert!(Clip::AntiAlias.is_anti_alias());
        assert!(Clip::AntiAliasWithSaveLayer.needs_save_layer());
        assert!(!Clip::None.needs_save_layer());
    }
}
