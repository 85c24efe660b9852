// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Immutable recorded display lists.

use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use core::sync::atomic::{AtomicU64, Ordering};

use kurbo::Rect;

use crate::canvas::CanvasOp;

static NEXT_PICTURE_ID: AtomicU64 = AtomicU64::new(1);

/// An immutable, cheaply clonable list of canvas operations.
///
/// Every recording gets a process-unique id; clones share it. The raster
/// cache keys picture entries on that id, so two separately recorded but
/// identical pictures are cached independently.
#[derive(Clone)]
pub struct Picture {
    inner: Arc<PictureInner>,
}

struct PictureInner {
    id: u64,
    cull_rect: Rect,
    ops: Vec<CanvasOp>,
}

impl Picture {
    /// Wraps recorded operations whose drawing stays inside `cull_rect`.
    #[must_use]
    pub fn new(cull_rect: Rect, ops: Vec<CanvasOp>) -> Self {
        Self {
            inner: Arc::new(PictureInner {
                id: NEXT_PICTURE_ID.fetch_add(1, Ordering::Relaxed),
                cull_rect,
                ops,
            }),
        }
    }

    /// The process-unique id of this recording.
    #[inline]
    #[must_use]
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Conservative bounds of everything the picture draws, in its own
    /// coordinate space.
    #[inline]
    #[must_use]
    pub fn cull_rect(&self) -> Rect {
        self.inner.cull_rect
    }

    /// The recorded operations.
    #[inline]
    #[must_use]
    pub fn ops(&self) -> &[CanvasOp] {
        &self.inner.ops
    }

    /// Number of operations, counting nested pictures recursively.
    #[must_use]
    pub fn approximate_op_count(&self) -> usize {
        self.inner
            .ops
            .iter()
            .map(|op| match op {
                CanvasOp::DrawPicture(nested) => 1 + nested.approximate_op_count(),
                _ => 1,
            })
            .sum()
    }
}

impl PartialEq for Picture {
    fn eq(&self, other: &Self) -> bool {
        self.inner.id == other.inner.id
    }
}

impl fmt::Debug for Picture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Picture")
            .field("id", &self.inner.id)
            .field("cull_rect", &self.inner.cull_rect)
            .field("ops", &self.inner.ops.len())
            .finish()
    }
}
