// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Layer tree, raster cache and frame compositor.
//!
//! `lamina_core` turns a tree of layers built on a UI thread into draw calls
//! on a raster thread. It is `no_std` compatible (with `alloc`); the `std`
//! feature adds the cross-thread frame pipeline and the rasterizer loop.
//!
//! # Architecture
//!
//! ```text
//!   UI thread                         Raster thread
//!   ─────────                         ─────────────
//!   build LayerTree
//!       │
//!       ▼
//!   Producer::produce ──(latest wins)──► Consumer::take
//!                                            │
//!                                            ▼
//!                                Rasterizer::draw
//!                                            │
//!                                            ▼
//!            CompositorContext::acquire_frame ──► ScopedFrame
//!                                                     │
//!                     ┌───────────────────────────────┘
//!                     ▼
//!   LayerTree::preroll ──► embedder post-preroll ──► LayerTree::paint
//!                                                     │
//!                     ┌───────────────────────────────┘
//!                     ▼
//!   ScopedFrame::submit ──► drop: RasterCache sweep, stopwatch, summary
//! ```
//!
//! **[`layer`]**: the closed [`Layer`](layer::Layer) enum and its two-pass
//! traversal. Preroll computes paint bounds and prepares cache entries;
//! paint issues [`Canvas`](canvas::Canvas) calls and skips empty subtrees.
//!
//! **[`raster_cache`]**: cross-frame memoization of pictures and layer
//! subtrees keyed by content and by the non-translation part of the matrix.
//!
//! **[`layer_tree`]**: one frame's tree plus its metadata and the
//! `Unprerolled → Prerolled → Painted` state machine.
//!
//! **[`compositor`]**: the long-lived [`CompositorContext`] owning the
//! cache, the texture registry and the frame stopwatches, and the per-frame
//! [`ScopedFrame`](compositor::ScopedFrame) guard.
//!
//! **[`texture`]**, **[`embedder`]**, **[`gpu`]**, **[`canvas`]**: contracts
//! for the collaborators the compositor drives but does not implement.
//!
//! **[`scene`]**: a visitor that emits the tree into a retained scene graph
//! instead of a canvas.
//!
//! **[`trace`]**: [`TraceSink`](trace::TraceSink) trait and event types,
//! with a zero-overhead [`Tracer`](trace::Tracer) wrapper.
//!
//! # Crate features
//!
//! - `std` (enabled by default): the [`pipeline`] and [`rasterizer`]
//!   modules and [`MonotonicClock`](time::MonotonicClock).
//! - `trace` (disabled by default): enables `Tracer` method bodies.
//! - `trace-rich` (disabled by default, implies `trace`): per-layer bounds
//!   events during preroll.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;
#[cfg(feature = "std")]
extern crate std;

pub mod canvas;
pub mod compositor;
pub mod embedder;
pub mod geometry;
pub mod gpu;
pub mod layer;
pub mod layer_tree;
pub mod paint;
pub mod picture;
#[cfg(feature = "std")]
pub mod pipeline;
pub mod raster_cache;
#[cfg(feature = "std")]
pub mod rasterizer;
pub mod scene;
pub mod stopwatch;
pub mod texture;
pub mod time;
pub mod trace;
pub mod transform;

pub use compositor::CompositorContext;
pub use layer::Layer;
pub use layer_tree::LayerTree;
