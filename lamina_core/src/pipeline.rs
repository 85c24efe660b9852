// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Single-slot, latest-wins hand-off of layer trees between threads.
//!
//! The UI thread [`produce`](Producer::produce)s a tree per frame; the raster
//! thread [`take`](Consumer::take)s whatever is newest. A tree produced
//! while an older one is still waiting replaces it, and the older tree is
//! dropped undrawn. Neither side ever blocks on the other beyond the slot's
//! lock.

use alloc::collections::VecDeque;
use alloc::sync::Arc;
use alloc::vec::Vec;
use core::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::layer_tree::LayerTree;
use crate::trace::FrameDroppedEvent;

/// Drop events kept for [`Consumer::drain_dropped`]; older ones are
/// discarded and only counted.
pub const MAX_PENDING_DROP_EVENTS: usize = 64;

#[derive(Debug, Default)]
struct Slot {
    pending: Option<LayerTree>,
    consumer_alive: bool,
    dropped: VecDeque<FrameDroppedEvent>,
    dropped_count: u64,
}

#[derive(Debug)]
struct Shared {
    slot: Mutex<Slot>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, Slot> {
        // A panic while holding the lock leaves the slot consistent.
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Creates a connected producer/consumer pair.
#[must_use]
pub fn channel() -> (Producer, Consumer) {
    let shared = Arc::new(Shared {
        slot: Mutex::new(Slot {
            consumer_alive: true,
            ..Slot::default()
        }),
    });
    (
        Producer {
            shared: shared.clone(),
        },
        Consumer { shared },
    )
}

/// What happened to a produced tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProduceOutcome {
    /// The slot was empty.
    Queued,
    /// An undrawn tree was waiting and has been dropped.
    Replaced {
        /// Scene version of the dropped tree.
        dropped_version: u64,
    },
}

/// The consumer is gone; the tree is handed back.
pub struct PipelineClosed(pub LayerTree);

impl fmt::Debug for PipelineClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PipelineClosed")
            .field(&self.0.scene_version())
            .finish()
    }
}

impl fmt::Display for PipelineClosed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "pipeline consumer dropped; scene version {} was not queued",
            self.0.scene_version()
        )
    }
}

impl core::error::Error for PipelineClosed {}

/// UI-thread end of the pipeline.
#[derive(Debug)]
pub struct Producer {
    shared: Arc<Shared>,
}

impl Producer {
    /// Offers `tree` to the raster thread, replacing any tree still
    /// waiting.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineClosed`] with the tree if the consumer was
    /// dropped.
    pub fn produce(&self, tree: LayerTree) -> Result<ProduceOutcome, PipelineClosed> {
        let mut slot = self.shared.lock();
        if !slot.consumer_alive {
            return Err(PipelineClosed(tree));
        }
        let replaced_by = tree.scene_version();
        let Some(stale) = slot.pending.replace(tree) else {
            return Ok(ProduceOutcome::Queued);
        };
        let dropped_version = stale.scene_version();
        if slot.dropped.len() == MAX_PENDING_DROP_EVENTS {
            slot.dropped.pop_front();
        }
        slot.dropped.push_back(FrameDroppedEvent {
            dropped_version,
            replaced_by,
        });
        slot.dropped_count += 1;
        drop(slot);
        // The stale tree is dropped outside the lock.
        drop(stale);
        Ok(ProduceOutcome::Replaced { dropped_version })
    }

    /// Returns `true` while the consumer exists.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.shared.lock().consumer_alive
    }
}

/// Raster-thread end of the pipeline.
#[derive(Debug)]
pub struct Consumer {
    shared: Arc<Shared>,
}

impl Consumer {
    /// Takes the newest tree, if any, without blocking.
    #[must_use]
    pub fn take(&self) -> Option<LayerTree> {
        self.shared.lock().pending.take()
    }

    /// Returns `true` if a tree is waiting.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        self.shared.lock().pending.is_some()
    }

    /// Drop events recorded since the last call, oldest first.
    ///
    /// At most [`MAX_PENDING_DROP_EVENTS`] are kept between calls;
    /// [`dropped_count`](Self::dropped_count) still counts every drop. The
    /// raster thread forwards these to its tracer.
    #[must_use]
    pub fn drain_dropped(&self) -> Vec<FrameDroppedEvent> {
        Vec::from(core::mem::take(&mut self.shared.lock().dropped))
    }

    /// Trees replaced before they were drawn, over the pipeline's lifetime.
    #[must_use]
    pub fn dropped_count(&self) -> u64 {
        self.shared.lock().dropped_count
    }
}

impl Drop for Consumer {
    fn drop(&mut self) {
        let mut slot = self.shared.lock();
        slot.consumer_alive = false;
        let pending = slot.pending.take();
        drop(slot);
        drop(pending);
    }
}
