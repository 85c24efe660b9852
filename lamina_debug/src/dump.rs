// Copyright 2026 the Lamina Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Indented text dumps of layer trees.

use std::fmt::Write;

use lamina_core::layer::Layer;
use lamina_core::LayerTree;

/// Renders `tree` as one line per layer, children indented under parents.
///
/// Each line has the layer kind, its id and its paint bounds (or
/// `unprerolled`), followed by a few variant-specific details.
#[must_use]
pub fn dump_layer_tree(tree: &LayerTree) -> String {
    let size = tree.frame_size();
    let mut out = format!(
        "LayerTree {}x{} @{}x scene={} {:?}\n",
        size.width,
        size.height,
        tree.device_pixel_ratio(),
        tree.scene_version(),
        tree.state()
    );
    match tree.root() {
        Some(root) => dump_layer(root, 1, &mut out),
        None => out.push_str("  (empty)\n"),
    }
    out
}

/// Renders one layer subtree without indentation at its root.
#[must_use]
pub fn dump_layer_subtree(layer: &Layer) -> String {
    let mut out = String::new();
    dump_layer(layer, 0, &mut out);
    out
}

fn dump_layer(layer: &Layer, depth: usize, out: &mut String) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    // Writing to a String cannot fail.
    let _ = write!(out, "{} #{}", layer.kind().name(), layer.id().get());
    if layer.is_prerolled() {
        let b = layer.paint_bounds();
        let _ = write!(out, " [{}, {}, {}, {}]", b.x0, b.y0, b.x1, b.y1);
    } else {
        out.push_str(" unprerolled");
    }
    let _ = match layer {
        Layer::ClipRect(l) => write!(out, " clip={:?}", l.clip_behavior()),
        Layer::ClipRRect(l) => write!(out, " clip={:?}", l.clip_behavior()),
        Layer::ClipPath(l) => write!(out, " clip={:?}", l.clip_behavior()),
        Layer::Opacity(l) => write!(out, " alpha={}", l.opacity()),
        Layer::Picture(l) => write!(out, " picture={}", l.picture().id()),
        Layer::Texture(l) => write!(out, " texture={}", l.texture_id().0),
        Layer::PlatformView(l) => write!(out, " view={}", l.view_id().0),
        _ => Ok(()),
    };
    out.push('\n');
    for child in layer.children() {
        dump_layer(child, depth + 1, out);
    }
}
