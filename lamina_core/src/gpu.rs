// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Offscreen rasterization.
//!
//! The raster cache never talks to a graphics API directly. It asks a
//! [`GpuContext`] to allocate an offscreen target of a given pixel size, run
//! a draw callback against a canvas for that target, and hand back a
//! [`RasterImage`]. A context may refuse (out of memory, oversize target,
//! lost device), in which case callers paint directly instead.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use kurbo::Rect;

use crate::canvas::{Canvas, CanvasOp, RecordingCanvas};

static NEXT_IMAGE_ID: AtomicU64 = AtomicU64::new(1);

/// A rasterized offscreen image.
///
/// Clones are cheap and share the underlying pixels.
#[derive(Clone)]
pub struct RasterImage {
    inner: Arc<ImageInner>,
}

struct ImageInner {
    id: u64,
    width: u32,
    height: u32,
    ops: Vec<CanvasOp>,
}

impl RasterImage {
    /// Creates an image of the given pixel size whose content is described by
    /// `ops`.
    #[must_use]
    pub fn new(width: u32, height: u32, ops: Vec<CanvasOp>) -> Self {
        Self {
            inner: Arc::new(ImageInner {
                id: NEXT_IMAGE_ID.fetch_add(1, Ordering::Relaxed),
                width,
                height,
                ops,
            }),
        }
    }

    /// Process-unique image id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Width in physical pixels.
    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        self.inner.width
    }

    /// Height in physical pixels.
    #[inline]
    #[must_use]
    pub fn height(&self) -> u32 {
        self.inner.height
    }

    /// The image rectangle in pixel space.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, f64::from(self.width()), f64::from(self.height()))
    }

    /// Approximate memory footprint assuming 4 bytes per pixel.
    #[must_use]
    pub fn byte_size(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height()) * 4
    }

    /// The draw calls that produced this image, for inspection.
    #[must_use]
    pub fn ops(&self) -> &[CanvasOp] {
        &self.inner.ops
    }

    /// Returns `true` if both handles refer to the same image.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl PartialEq for RasterImage {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Debug for RasterImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RasterImage({}: {}x{})",
            self.inner.id, self.inner.width, self.inner.height
        )
    }
}

/// Allocates offscreen targets and rasterizes into them.
pub trait GpuContext {
    /// Rasterizes `draw` into a new `width` × `height` image.
    ///
    /// The canvas passed to `draw` starts with an identity matrix covering
    /// the image's pixel grid. Returns `None` if the target could not be
    /// created.
    fn rasterize(
        &mut self,
        width: u32,
        height: u32,
        draw: &mut dyn FnMut(&mut dyn Canvas),
    ) -> Option<RasterImage>;

    /// Largest supported image dimension.
    fn max_texture_size(&self) -> u32;
}

/// A headless [`GpuContext`] that records offscreen content as display lists.
#[derive(Debug, Clone)]
pub struct SoftwareGpuContext {
    max_texture_size: u32,
    fail_allocations: bool,
    images_created: u64,
}

impl Default for SoftwareGpuContext {
    fn default() -> Self {
        Self::new(8192)
    }
}

impl SoftwareGpuContext {
    /// Creates a context accepting images up to `max_texture_size` per side.
    #[must_use]
    pub const fn new(max_texture_size: u32) -> Self {
        Self {
            max_texture_size,
            fail_allocations: false,
            images_created: 0,
        }
    }

    /// Makes every subsequent allocation fail (or succeed again).
    pub fn set_fail_allocations(&mut self, fail: bool) {
        self.fail_allocations = fail;
    }

    /// Number of images successfully created.
    #[must_use]
    pub fn images_created(&self) -> u64 {
        self.images_created
    }
}

impl GpuContext for SoftwareGpuContext {
    fn rasterize(
        &mut self,
        width: u32,
        height: u32,
        draw: &mut dyn FnMut(&mut dyn Canvas),
    ) -> Option<RasterImage> {
        if self.fail_allocations
            || width == 0
            || height == 0
            || width > self.max_texture_size
            || height > self.max_texture_size
        {
            return None;
        }
        let mut canvas = RecordingCanvas::new(Rect::new(
            0.0,
            0.0,
            f64::from(width),
            f64::from(height),
        ));
        draw(&mut canvas);
        self.images_created += 1;
        Some(RasterImage::new(width, height, canvas.into_ops()))
    }

    fn max_texture_size(&self) -> u32 {
        self.max_texture_size
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::paint::Paint;

    #[test]
    fn rasterize_records_draw_calls() {
        let mut gpu = SoftwareGpuContext::default();
        let image = gpu
            .rasterize(10, 20, &mut |c| {
                c.draw_rect(Rect::new(0.0, 0.0, 5.0, 5.0), &Paint::default());
            })
            .expect("allocation succeeds");
        assert_eq!((image.width(), image.height()), (10, 20));
        assert_eq!(image.ops().len(), 1);
        assert_eq!(image.byte_size(), 800);
        assert_eq!(gpu.images_created(), 1);
    }

    #[test]
    fn zero_sized_and_oversized_targets_fail() {
        let mut gpu = SoftwareGpuContext::new(64);
        assert!(gpu.rasterize(0, 10, &mut |_| {}).is_none());
        assert!(gpu.rasterize(65, 10, &mut |_| {}).is_none());
        assert_eq!(gpu.images_created(), 0);
    }

    #[test]
    fn failing_context_refuses_allocations() {
        let mut gpu = SoftwareGpuContext::default();
        gpu.set_fail_allocations(true);
        let mut called = false;
        assert!(gpu.rasterize(4, 4, &mut |_| called = true).is_none());
        assert!(!called);
    }

    #[test]
    fn clones_share_identity() {
        let a = RasterImage::new(1, 1, Vec::new());
        let b = RasterImage::new(1, 1, Vec::new());
        assert!(a.ptr_eq(&a.clone()));
        assert!(!a.ptr_eq(&b));
        assert_ne!(a.id(), b.id());
    }
}
