// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer identity and the state every layer carries.

use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use kurbo::Rect;

use crate::geometry;

static NEXT_LAYER_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of a layer.
///
/// Layer trees are rebuilt every frame. A layer built with a fresh id from
/// [`LayerId::next`] is new to the raster cache; to let the cache recognize
/// a subtree it has seen before, rebuild it with the same id (see
/// [`LayerId::from_raw`] and the layers' `with_id` builders).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LayerId(u64);

impl LayerId {
    /// Allocates a fresh id.
    #[must_use]
    pub fn next() -> Self {
        Self(NEXT_LAYER_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Wraps a caller-chosen id.
    ///
    /// Ids from [`LayerId::next`] count up from 1, so caller-chosen ids
    /// should stay out of that range (setting the top bit is enough). The
    /// raster cache assumes a layer that keeps its id also keeps its
    /// content; give the layer a new id when its subtree changes.
    #[inline]
    #[must_use]
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw id (for diagnostics and trace events).
    #[inline]
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Debug for LayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LayerId({})", self.0)
    }
}

/// Which variant a [`Layer`](super::Layer) is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LayerKind {
    /// Plain group.
    Container,
    /// Rectangular clip.
    ClipRect,
    /// Rounded-rectangle clip.
    ClipRRect,
    /// Path clip.
    ClipPath,
    /// Matrix transform.
    Transform,
    /// Group opacity.
    Opacity,
    /// Color filter.
    ColorFilter,
    /// Image filter.
    ImageFilter,
    /// Shader mask.
    ShaderMask,
    /// Recorded picture.
    Picture,
    /// External texture.
    Texture,
    /// Native platform view.
    PlatformView,
    /// Frame timing graphs.
    PerformanceOverlay,
}

impl LayerKind {
    /// Short human-readable name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Container => "Container",
            Self::ClipRect => "ClipRect",
            Self::ClipRRect => "ClipRRect",
            Self::ClipPath => "ClipPath",
            Self::Transform => "Transform",
            Self::Opacity => "Opacity",
            Self::ColorFilter => "ColorFilter",
            Self::ImageFilter => "ImageFilter",
            Self::ShaderMask => "ShaderMask",
            Self::Picture => "Picture",
            Self::Texture => "Texture",
            Self::PlatformView => "PlatformView",
            Self::PerformanceOverlay => "PerformanceOverlay",
        }
    }
}

/// Per-layer state shared by every variant.
#[derive(Clone, Debug)]
pub struct LayerBase {
    pub(crate) id: LayerId,
    pub(crate) paint_bounds: Rect,
    pub(crate) prerolled: bool,
}

impl Default for LayerBase {
    fn default() -> Self {
        Self::new()
    }
}

impl LayerBase {
    /// Fresh state with a new id and empty bounds.
    #[must_use]
    pub fn new() -> Self {
        Self {
            id: LayerId::next(),
            paint_bounds: geometry::EMPTY_RECT,
            prerolled: false,
        }
    }

    /// Marks the layer as culled: prerolled, with nothing to paint.
    pub(crate) fn cull(&mut self) {
        self.paint_bounds = geometry::EMPTY_RECT;
        self.prerolled = true;
    }
}
