// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Cross-frame memoization of rasterized pictures and layer subtrees.
//!
//! The raster cache turns content that keeps reappearing at the same scale
//! and rotation into an offscreen image, so later frames can blit the image
//! instead of replaying the draw calls.
//!
//! # Keys
//!
//! An entry is keyed by *what* is drawn ([`CacheId`]) and *how* it is
//! transformed ([`MatrixKey`]). The matrix key ignores X/Y translation: the
//! same picture scrolled to a new position reuses its image, which is simply
//! drawn at the new integral device position. Any other matrix change (scale,
//! rotation, skew, perspective) selects a different entry, because the image
//! would otherwise be resampled.
//!
//! # Lifecycle
//!
//! Preroll calls [`RasterCache::prepare_picture`] or
//! [`RasterCache::prepare_layer`], which mark the entry as used this frame
//! and count the access. Once an entry has been seen on
//! [`RasterCacheConfig::access_threshold`] frames it is rasterized. Paint
//! calls [`RasterCache::draw_picture`] or [`RasterCache::draw_layer`] to use
//! the image. At the end of the frame [`RasterCache::sweep_after_frame`]
//! evicts every entry that was not used, so an entry survives exactly as long
//! as its content keeps appearing.

use hashbrown::HashMap;
use kurbo::{Point, Rect};
use peniko::Color;

use crate::canvas::Canvas;
use crate::geometry;
use crate::gpu::{GpuContext, RasterImage};
use crate::layer::LayerId;
use crate::paint::Paint;
use crate::picture::Picture;
use crate::trace::{CacheContent, CacheEvent, CacheEventKind, Tracer};
use crate::transform::Transform3d;

/// What a cache entry holds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CacheId {
    /// A picture, keyed by [`Picture::id`].
    Picture(u64),
    /// A layer subtree, keyed by [`LayerId`].
    Layer(LayerId),
}

impl From<CacheId> for CacheContent {
    fn from(id: CacheId) -> Self {
        match id {
            CacheId::Picture(p) => Self::Picture(p),
            CacheId::Layer(l) => Self::Layer(l.get()),
        }
    }
}

/// Bit pattern of a matrix with its translation removed.
///
/// `-0.0` is folded into `0.0` so that equal matrices hash equally.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MatrixKey([u64; 16]);

impl MatrixKey {
    /// Builds the key for `matrix`.
    #[must_use]
    pub fn new(matrix: &Transform3d) -> Self {
        let linear = matrix.without_translation();
        let mut bits = [0_u64; 16];
        for (slot, v) in bits.iter_mut().zip(linear.cols.iter().flatten()) {
            *slot = if *v == 0.0 { 0 } else { v.to_bits() };
        }
        Self(bits)
    }
}

/// Identifies one raster cache entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RasterCacheKey {
    /// Content identity.
    pub id: CacheId,
    /// Matrix identity.
    pub matrix: MatrixKey,
}

impl RasterCacheKey {
    /// Key for a picture under `matrix`.
    #[must_use]
    pub fn picture(picture: &Picture, matrix: &Transform3d) -> Self {
        Self {
            id: CacheId::Picture(picture.id()),
            matrix: MatrixKey::new(matrix),
        }
    }

    /// Key for a layer subtree under `matrix`.
    #[must_use]
    pub fn layer(layer: LayerId, matrix: &Transform3d) -> Self {
        Self {
            id: CacheId::Layer(layer),
            matrix: MatrixKey::new(matrix),
        }
    }
}

/// Caching policy knobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RasterCacheConfig {
    /// Frames an entry must be seen on before it is rasterized. Counted
    /// across consecutive frames while the entry survives sweeps; repeated
    /// access within one frame counts once. Zero disables caching.
    pub access_threshold: u32,
    /// Maximum number of new picture images created per frame.
    pub picture_cache_limit_per_frame: usize,
    /// Pictures not flagged complex need more ops than this to be cached.
    pub min_picture_op_count: usize,
}

impl Default for RasterCacheConfig {
    fn default() -> Self {
        Self {
            access_threshold: 3,
            picture_cache_limit_per_frame: 3,
            min_picture_op_count: 5,
        }
    }
}

#[derive(Debug, Default)]
struct Entry {
    used_this_frame: bool,
    access_count: u32,
    image: Option<RasterImage>,
}

/// Counts produced by [`RasterCache::sweep_after_frame`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepStats {
    /// Picture entries evicted.
    pub evicted_pictures: usize,
    /// Layer entries evicted.
    pub evicted_layers: usize,
    /// Cache hits during the frame that just ended.
    pub hits: u32,
    /// Images created during the frame that just ended.
    pub rasterized: u32,
}

/// Point-in-time size of the cache.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RasterCacheMetrics {
    /// Live picture entries, with or without an image.
    pub picture_entries: usize,
    /// Picture entries holding an image.
    pub picture_images: usize,
    /// Bytes held by picture images.
    pub picture_bytes: u64,
    /// Live layer entries, with or without an image.
    pub layer_entries: usize,
    /// Layer entries holding an image.
    pub layer_images: usize,
    /// Bytes held by layer images.
    pub layer_bytes: u64,
}

/// Memoizes rasterized content across frames.
///
/// Owned by the compositor context and used only on the raster thread.
#[derive(Debug, Default)]
pub struct RasterCache {
    config: RasterCacheConfig,
    pictures: HashMap<RasterCacheKey, Entry>,
    layers: HashMap<RasterCacheKey, Entry>,
    pictures_cached_this_frame: usize,
    hits_this_frame: u32,
    rasterized_this_frame: u32,
}

impl RasterCache {
    /// Creates an empty cache with the given policy.
    #[must_use]
    pub fn new(config: RasterCacheConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// The caching policy.
    #[must_use]
    pub fn config(&self) -> &RasterCacheConfig {
        &self.config
    }

    /// Returns `true` if a picture is a caching candidate at all.
    #[must_use]
    pub fn is_picture_worth_rasterizing(
        &self,
        picture: &Picture,
        is_complex: bool,
        will_change: bool,
    ) -> bool {
        if will_change {
            return false;
        }
        let cull = geometry::sanitize(picture.cull_rect());
        if geometry::is_empty(cull) {
            return false;
        }
        is_complex || picture.approximate_op_count() > self.config.min_picture_op_count
    }

    /// Memoizing primitive: marks `key` used, counts the access, and returns
    /// its image once the access threshold is reached, rasterizing it on
    /// first need.
    ///
    /// `logical_rect` is the content's extent in the space `ctm` maps from.
    /// Repeated calls within a frame return the same image and never
    /// rasterize twice. Returns `None` while below the threshold, when
    /// `allow_new` is false and no image exists yet, or when rasterization
    /// fails.
    pub fn get_or_create_cached_render(
        &mut self,
        gpu: &mut dyn GpuContext,
        key: RasterCacheKey,
        logical_rect: Rect,
        ctm: &Transform3d,
        draw: &mut dyn FnMut(&mut dyn Canvas),
        tracer: &mut Tracer<'_>,
    ) -> Option<RasterImage> {
        let threshold = self.config.access_threshold;
        if threshold == 0 {
            return None;
        }
        let is_picture = matches!(key.id, CacheId::Picture(_));
        let limit_reached = is_picture
            && self.pictures_cached_this_frame >= self.config.picture_cache_limit_per_frame;
        let map = if is_picture {
            &mut self.pictures
        } else {
            &mut self.layers
        };
        let entry = map.entry(key).or_default();
        if !entry.used_this_frame {
            entry.used_this_frame = true;
            entry.access_count = entry.access_count.saturating_add(1);
        }
        if entry.access_count < threshold {
            return None;
        }
        if let Some(image) = &entry.image {
            return Some(image.clone());
        }
        if limit_reached {
            return None;
        }
        let image = rasterize(gpu, logical_rect, ctm, draw);
        let content = CacheContent::from(key.id);
        match &image {
            Some(img) => {
                if is_picture {
                    self.pictures_cached_this_frame += 1;
                }
                self.rasterized_this_frame = self.rasterized_this_frame.saturating_add(1);
                tracer.cache(&CacheEvent {
                    kind: CacheEventKind::Rasterized,
                    content,
                    width: img.width(),
                    height: img.height(),
                });
            }
            None => tracer.cache(&CacheEvent {
                kind: CacheEventKind::RasterizeFailed,
                content,
                width: 0,
                height: 0,
            }),
        }
        entry.image.clone_from(&image);
        image
    }

    /// Preroll-side entry point for pictures.
    ///
    /// Returns `true` if an image for this picture under `ctm` is available
    /// for the coming paint.
    pub fn prepare_picture(
        &mut self,
        gpu: &mut dyn GpuContext,
        picture: &Picture,
        ctm: &Transform3d,
        is_complex: bool,
        will_change: bool,
        tracer: &mut Tracer<'_>,
    ) -> bool {
        if !self.is_picture_worth_rasterizing(picture, is_complex, will_change) {
            return false;
        }
        if ctm.invert().is_none() {
            return false;
        }
        let key = RasterCacheKey::picture(picture, ctm);
        let cull = picture.cull_rect();
        self.get_or_create_cached_render(
            gpu,
            key,
            cull,
            ctm,
            &mut |canvas| canvas.draw_picture(picture),
            tracer,
        )
        .is_some()
    }

    /// Preroll-side entry point for layer subtrees.
    ///
    /// `draw` paints the subtree in the layer's own coordinates; `bounds` is
    /// its paint extent in those coordinates.
    pub fn prepare_layer(
        &mut self,
        gpu: &mut dyn GpuContext,
        layer: LayerId,
        bounds: Rect,
        ctm: &Transform3d,
        draw: &mut dyn FnMut(&mut dyn Canvas),
        tracer: &mut Tracer<'_>,
    ) -> bool {
        if geometry::is_empty(geometry::sanitize(bounds)) || ctm.invert().is_none() {
            return false;
        }
        let key = RasterCacheKey::layer(layer, ctm);
        self.get_or_create_cached_render(gpu, key, bounds, ctm, draw, tracer)
            .is_some()
    }

    /// Draws the cached image for `picture` under the canvas's current
    /// matrix. Returns `false` (drawing nothing) on a miss.
    pub fn draw_picture(
        &mut self,
        picture: &Picture,
        canvas: &mut dyn Canvas,
        tracer: &mut Tracer<'_>,
    ) -> bool {
        let ctm = canvas.total_matrix();
        let key = RasterCacheKey::picture(picture, &ctm);
        let Some(entry) = self.pictures.get_mut(&key) else {
            return false;
        };
        entry.used_this_frame = true;
        let Some(image) = &entry.image else {
            return false;
        };
        draw_cached(canvas, image, picture.cull_rect(), &ctm, None);
        self.hits_this_frame = self.hits_this_frame.saturating_add(1);
        tracer.cache(&CacheEvent {
            kind: CacheEventKind::Hit,
            content: CacheContent::Picture(picture.id()),
            width: image.width(),
            height: image.height(),
        });
        true
    }

    /// Draws the cached image for a layer subtree whose paint extent in the
    /// canvas's current coordinates is `bounds`. Returns `false` on a miss.
    pub fn draw_layer(
        &mut self,
        layer: LayerId,
        bounds: Rect,
        canvas: &mut dyn Canvas,
        paint: Option<&Paint>,
        tracer: &mut Tracer<'_>,
    ) -> bool {
        let ctm = canvas.total_matrix();
        let key = RasterCacheKey::layer(layer, &ctm);
        let Some(entry) = self.layers.get_mut(&key) else {
            return false;
        };
        entry.used_this_frame = true;
        let Some(image) = &entry.image else {
            return false;
        };
        draw_cached(canvas, image, bounds, &ctm, paint);
        self.hits_this_frame = self.hits_this_frame.saturating_add(1);
        tracer.cache(&CacheEvent {
            kind: CacheEventKind::Hit,
            content: CacheContent::Layer(layer.get()),
            width: image.width(),
            height: image.height(),
        });
        true
    }

    /// Returns the cached image for `key` without touching usage state.
    #[must_use]
    pub fn get(&self, key: &RasterCacheKey) -> Option<&RasterImage> {
        let map = match key.id {
            CacheId::Picture(_) => &self.pictures,
            CacheId::Layer(_) => &self.layers,
        };
        map.get(key).and_then(|e| e.image.as_ref())
    }

    /// Evicts entries not used this frame and resets per-frame state.
    pub fn sweep_after_frame(&mut self, tracer: &mut Tracer<'_>) -> SweepStats {
        let evicted_pictures = sweep(&mut self.pictures, tracer);
        let evicted_layers = sweep(&mut self.layers, tracer);
        let stats = SweepStats {
            evicted_pictures,
            evicted_layers,
            hits: self.hits_this_frame,
            rasterized: self.rasterized_this_frame,
        };
        self.pictures_cached_this_frame = 0;
        self.hits_this_frame = 0;
        self.rasterized_this_frame = 0;
        stats
    }

    /// Drops every entry.
    ///
    /// Used when the GPU context is lost or replaced, since images created
    /// by the old context are no longer valid.
    pub fn clear(&mut self) {
        self.pictures.clear();
        self.layers.clear();
        self.pictures_cached_this_frame = 0;
    }

    /// Current entry counts and image sizes.
    #[must_use]
    pub fn metrics(&self) -> RasterCacheMetrics {
        let (picture_images, picture_bytes) = image_totals(&self.pictures);
        let (layer_images, layer_bytes) = image_totals(&self.layers);
        RasterCacheMetrics {
            picture_entries: self.pictures.len(),
            picture_images,
            picture_bytes,
            layer_entries: self.layers.len(),
            layer_images,
            layer_bytes,
        }
    }
}

/// Renders `draw` into an image covering the device-space footprint of
/// `logical_rect` under `ctm`.
fn rasterize(
    gpu: &mut dyn GpuContext,
    logical_rect: Rect,
    ctm: &Transform3d,
    draw: &mut dyn FnMut(&mut dyn Canvas),
) -> Option<RasterImage> {
    let device = geometry::round_out(ctm.map_rect(logical_rect));
    if geometry::is_empty(device) {
        return None;
    }
    let (width, height) = pixel_size(device)?;
    let origin = device.origin();
    gpu.rasterize(width, height, &mut |canvas| {
        canvas.clear(Color::TRANSPARENT);
        canvas.translate(-origin.to_vec2());
        canvas.concat(ctm);
        draw(canvas);
    })
}

/// Blits `image` at the integral device position of `logical_rect`.
fn draw_cached(
    canvas: &mut dyn Canvas,
    image: &RasterImage,
    logical_rect: Rect,
    ctm: &Transform3d,
    paint: Option<&Paint>,
) {
    let device = geometry::round_out(ctm.map_rect(logical_rect));
    canvas.save();
    canvas.reset_matrix();
    canvas.draw_image(image, Point::new(device.x0, device.y0), paint);
    canvas.restore();
}

#[expect(
    clippy::cast_possible_truncation,
    reason = "device rects are rounded and bounded by the texture size check in the GPU context"
)]
fn pixel_size(device: Rect) -> Option<(u32, u32)> {
    let w = device.width();
    let h = device.height();
    if !(w >= 1.0 && h >= 1.0 && w <= f64::from(u32::MAX) && h <= f64::from(u32::MAX)) {
        return None;
    }
    Some((w as u32, h as u32))
}

fn sweep(map: &mut HashMap<RasterCacheKey, Entry>, tracer: &mut Tracer<'_>) -> usize {
    let mut evicted = 0;
    map.retain(|key, entry| {
        if entry.used_this_frame {
            entry.used_this_frame = false;
            return true;
        }
        evicted += 1;
        tracer.cache(&CacheEvent {
            kind: CacheEventKind::Evicted,
            content: CacheContent::from(key.id),
            width: entry.image.as_ref().map_or(0, RasterImage::width),
            height: entry.image.as_ref().map_or(0, RasterImage::height),
        });
        false
    });
    evicted
}

fn image_totals(map: &HashMap<RasterCacheKey, Entry>) -> (usize, u64) {
    map.values()
        .filter_map(|e| e.image.as_ref())
        .fold((0, 0), |(n, bytes), img| (n + 1, bytes + img.byte_size()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::{CanvasOp, RecordingCanvas};
    use crate::gpu::SoftwareGpuContext;
    use alloc::vec::Vec;

    fn complex_picture() -> Picture {
        let mut rec = RecordingCanvas::new(Rect::new(0.0, 0.0, 100.0, 50.0));
        for i in 0..10 {
            let x = f64::from(i) * 10.0;
            rec.draw_rect(Rect::new(x, 0.0, x + 5.0, 50.0), &Paint::default());
        }
        rec.finish()
    }

    fn prepare_frames(
        cache: &mut RasterCache,
        gpu: &mut SoftwareGpuContext,
        picture: &Picture,
        ctm: &Transform3d,
        frames: usize,
    ) -> Vec<bool> {
        let mut tracer = Tracer::none();
        (0..frames)
            .map(|_| {
                let ok = cache.prepare_picture(gpu, picture, ctm, false, false, &mut tracer);
                cache.sweep_after_frame(&mut tracer);
                ok
            })
            .collect()
    }

    #[test]
    fn picture_cached_after_threshold_frames() {
        let mut cache = RasterCache::default();
        let mut gpu = SoftwareGpuContext::default();
        let picture = complex_picture();
        let results = prepare_frames(
            &mut cache,
            &mut gpu,
            &picture,
            &Transform3d::IDENTITY,
            4,
        );
        assert_eq!(results, [false, false, true, true]);
        assert_eq!(gpu.images_created(), 1);
    }

    #[test]
    fn same_frame_access_is_idempotent() {
        let config = RasterCacheConfig {
            access_threshold: 1,
            ..RasterCacheConfig::default()
        };
        let mut cache = RasterCache::new(config);
        let mut gpu = SoftwareGpuContext::default();
        let picture = complex_picture();
        let key = RasterCacheKey::picture(&picture, &Transform3d::IDENTITY);
        let mut tracer = Tracer::none();
        let mut draw = |c: &mut dyn Canvas| c.draw_picture(&picture);
        let a = cache
            .get_or_create_cached_render(
                &mut gpu,
                key,
                picture.cull_rect(),
                &Transform3d::IDENTITY,
                &mut draw,
                &mut tracer,
            )
            .expect("rasterized");
        let b = cache
            .get_or_create_cached_render(
                &mut gpu,
                key,
                picture.cull_rect(),
                &Transform3d::IDENTITY,
                &mut draw,
                &mut tracer,
            )
            .expect("cached");
        assert!(a.ptr_eq(&b));
        assert_eq!(gpu.images_created(), 1);
        assert_eq!(cache.metrics().picture_entries, 1);
    }

    #[test]
    fn unused_entries_are_swept() {
        let mut cache = RasterCache::default();
        let mut gpu = SoftwareGpuContext::default();
        let picture = complex_picture();
        let mut tracer = Tracer::none();
        let _ = prepare_frames(&mut cache, &mut gpu, &picture, &Transform3d::IDENTITY, 3);
        assert_eq!(cache.metrics().picture_images, 1);

        // Frame N + 1 never touches the picture.
        let stats = cache.sweep_after_frame(&mut tracer);
        assert_eq!(stats.evicted_pictures, 1);
        assert_eq!(cache.metrics(), RasterCacheMetrics::default());
    }

    #[test]
    fn translation_shares_entry_but_scale_does_not() {
        let picture = complex_picture();
        let a = RasterCacheKey::picture(&picture, &Transform3d::from_translation(3.0, 4.0));
        let b = RasterCacheKey::picture(&picture, &Transform3d::from_translation(-8.5, 0.25));
        let c = RasterCacheKey::picture(&picture, &Transform3d::from_scale(2.0, 2.0));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn negative_zero_matches_zero() {
        let mut m = Transform3d::IDENTITY;
        m.cols[0][1] = -0.0;
        assert_eq!(MatrixKey::new(&m), MatrixKey::new(&Transform3d::IDENTITY));
    }

    #[test]
    fn simple_and_volatile_pictures_are_not_cached() {
        let cache = RasterCache::default();
        let mut rec = RecordingCanvas::new(Rect::new(0.0, 0.0, 10.0, 10.0));
        rec.draw_rect(Rect::new(0.0, 0.0, 10.0, 10.0), &Paint::default());
        let simple = rec.finish();
        assert!(!cache.is_picture_worth_rasterizing(&simple, false, false));
        assert!(cache.is_picture_worth_rasterizing(&simple, true, false));
        let complex = complex_picture();
        assert!(!cache.is_picture_worth_rasterizing(&complex, true, true));
        let empty = Picture::new(Rect::ZERO, Vec::new());
        assert!(!cache.is_picture_worth_rasterizing(&empty, true, false));
    }

    #[test]
    fn singular_matrix_is_not_cached() {
        let mut cache = RasterCache::new(RasterCacheConfig {
            access_threshold: 1,
            ..RasterCacheConfig::default()
        });
        let mut gpu = SoftwareGpuContext::default();
        let mut tracer = Tracer::none();
        let ok = cache.prepare_picture(
            &mut gpu,
            &complex_picture(),
            &Transform3d::from_scale(0.0, 1.0),
            true,
            false,
            &mut tracer,
        );
        assert!(!ok);
        assert_eq!(cache.metrics().picture_entries, 0);
    }

    #[test]
    fn zero_threshold_disables_caching() {
        let mut cache = RasterCache::new(RasterCacheConfig {
            access_threshold: 0,
            ..RasterCacheConfig::default()
        });
        let mut gpu = SoftwareGpuContext::default();
        let results = prepare_frames(
            &mut cache,
            &mut gpu,
            &complex_picture(),
            &Transform3d::IDENTITY,
            5,
        );
        assert!(results.iter().all(|ok| !ok));
        assert_eq!(gpu.images_created(), 0);
    }

    #[test]
    fn rasterize_failure_falls_back() {
        let mut cache = RasterCache::new(RasterCacheConfig {
            access_threshold: 1,
            ..RasterCacheConfig::default()
        });
        let mut gpu = SoftwareGpuContext::default();
        gpu.set_fail_allocations(true);
        let picture = complex_picture();
        let mut tracer = Tracer::none();
        assert!(!cache.prepare_picture(
            &mut gpu,
            &picture,
            &Transform3d::IDENTITY,
            false,
            false,
            &mut tracer
        ));
        let mut canvas = RecordingCanvas::new(Rect::ZERO);
        assert!(!cache.draw_picture(&picture, &mut canvas, &mut tracer));
        assert!(canvas.ops().is_empty());
    }

    #[test]
    fn per_frame_picture_limit() {
        let mut cache = RasterCache::new(RasterCacheConfig {
            access_threshold: 1,
            picture_cache_limit_per_frame: 2,
            ..RasterCacheConfig::default()
        });
        let mut gpu = SoftwareGpuContext::default();
        let mut tracer = Tracer::none();
        let pictures: Vec<_> = (0..3).map(|_| complex_picture()).collect();
        let first: Vec<_> = pictures
            .iter()
            .map(|p| {
                cache.prepare_picture(&mut gpu, p, &Transform3d::IDENTITY, false, false, &mut tracer)
            })
            .collect();
        assert_eq!(first, [true, true, false]);
        let stats = cache.sweep_after_frame(&mut tracer);
        assert_eq!(stats.rasterized, 2);
        assert_eq!(stats.evicted_pictures, 0);

        // The third picture gets its image on the next frame.
        let second: Vec<_> = pictures
            .iter()
            .map(|p| {
                cache.prepare_picture(&mut gpu, p, &Transform3d::IDENTITY, false, false, &mut tracer)
            })
            .collect();
        assert_eq!(second, [true, true, true]);
    }

    #[test]
    fn draw_picture_blits_at_device_origin() {
        let mut cache = RasterCache::new(RasterCacheConfig {
            access_threshold: 1,
            ..RasterCacheConfig::default()
        });
        let mut gpu = SoftwareGpuContext::default();
        let mut tracer = Tracer::none();
        let picture = complex_picture();
        let ctm = Transform3d::from_translation(10.5, 20.0) * Transform3d::from_scale(2.0, 2.0);
        assert!(cache.prepare_picture(&mut gpu, &picture, &ctm, false, false, &mut tracer));

        let mut canvas = RecordingCanvas::with_matrix(Rect::ZERO, ctm);
        assert!(cache.draw_picture(&picture, &mut canvas, &mut tracer));
        let ops = canvas.ops();
        assert_eq!(ops[0], CanvasOp::Save);
        assert_eq!(ops[1], CanvasOp::SetMatrix(Transform3d::IDENTITY));
        match &ops[2] {
            CanvasOp::DrawImage { image, at, .. } => {
                assert_eq!(*at, Point::new(10.0, 20.0));
                assert_eq!((image.width(), image.height()), (201, 100));
            }
            other => panic!("expected DrawImage, got {other:?}"),
        }
        assert_eq!(ops[3], CanvasOp::Restore);
        assert_eq!(canvas.total_matrix(), ctm);
    }

    #[test]
    fn clear_drops_everything() {
        let mut cache = RasterCache::new(RasterCacheConfig {
            access_threshold: 1,
            ..RasterCacheConfig::default()
        });
        let mut gpu = SoftwareGpuContext::default();
        let mut tracer = Tracer::none();
        let picture = complex_picture();
        assert!(cache.prepare_picture(
            &mut gpu,
            &picture,
            &Transform3d::IDENTITY,
            false,
            false,
            &mut tracer
        ));
        cache.clear();
        assert_eq!(cache.metrics(), RasterCacheMetrics::default());
    }
}
