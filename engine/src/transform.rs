//! Pure placement math. Nothing here touches the store.

use kurbo::{Affine, Point};
use tracing::warn;
use crate::config::EditorConfig;
use crate::objects::ObjectLayer;
use crate::types::{BoundingBox, HandleType, SceneSize, Transform};

/// Shrinks the larger side to `max_dim` keeping aspect ratio. Never upscales.
pub fn fit_scene(natural_width: u32, natural_height: u32, max_dim: f64) -> SceneSize {
    let (w, h) = (natural_width as f64, natural_height as f64);
    if w <= max_dim && h <= max_dim {
        return SceneSize { width: w, height: h };
    }
    let ratio = w / h;
    if ratio > 1.0 {
        SceneSize { width: max_dim, height: max_dim / ratio }
    } else {
        SceneSize { width: max_dim * ratio, height: max_dim }
    }
}

/// Auto-fit only fires for a layer that has never been placed and still
/// carries the creation scale.
pub fn needs_auto_fit(layer: &ObjectLayer) -> bool {
    !layer.initialized && layer.transform.scale == 1.0
}

/// Initial placement: a quarter of the scene wide (bounded), never enlarged,
/// centered. Rotation is carried over.
pub fn auto_fit(scene: SceneSize, natural: (u32, u32), rotation: f64, config: &EditorConfig) -> Transform {
    let target_width = (scene.width * config.auto_fit_fraction)
        .floor()
        .max(config.auto_fit_min_width)
        .min(config.auto_fit_max_width);
    let (nw, nh) = (natural.0 as f64, natural.1 as f64);
    let scale = (target_width / nw).min(1.0);
    let (w, h) = (nw * scale, nh * scale);
    Transform {
        x: ((scene.width - w) / 2.0).round(),
        y: ((scene.height - h) / 2.0).round(),
        scale,
        rotation,
    }
}

pub fn apply_drag(t: &Transform, x: f64, y: f64) -> Transform {
    Transform { x, y, ..*t }
}

/// Keeps `old` when the proposal is smaller than `min_size` on either side.
pub fn clamp_resize(old: BoundingBox, proposed: BoundingBox, min_size: f64) -> BoundingBox {
    if !(proposed.width >= min_size && proposed.height >= min_size) {
        warn!(width = proposed.width, height = proposed.height, "rejecting degenerate resize");
        return old;
    }
    proposed
}

/// Uniform resize from a corner handle. The opposite corner stays fixed in
/// scene space, so the origin moves whenever that corner is not the origin.
pub fn resize_from_handle(start: BoundingBox, handle: HandleType, pointer: Point) -> BoundingBox {
    let (Some(corner), Some(anchor)) = (
        handle.corner(start.width, start.height),
        handle.opposite().corner(start.width, start.height),
    ) else {
        return start;
    };
    let diagonal = corner - anchor;
    let reach = start.to_local(pointer) - anchor;
    let k = reach.dot(diagonal) / diagonal.hypot2();
    let fixed = start.to_scene(anchor);
    let rotated = Affine::rotate(start.rotation.to_radians()) * Point::new(anchor.x * k, anchor.y * k);
    BoundingBox {
        x: fixed.x - rotated.x,
        y: fixed.y - rotated.y,
        width: start.width * k,
        height: start.height * k,
        rotation: start.rotation,
    }
}

/// Rotation about the box center; the rotater sits above the top edge, so
/// pointing straight up is 0 degrees.
pub fn rotate_from_handle(start: BoundingBox, pointer: Point) -> BoundingBox {
    let center = start.center();
    let angle = (pointer.y - center.y).atan2(pointer.x - center.x).to_degrees() + 90.0;
    let half = Affine::rotate(angle.to_radians()) * Point::new(start.width / 2.0, start.height / 2.0);
    BoundingBox {
        x: center.x - half.x,
        y: center.y - half.y,
        rotation: angle,
        ..start
    }
}

/// Scene position of each interactive handle for a box.
pub fn handle_positions(b: &BoundingBox, rotate_offset: f64) -> Vec<(HandleType, Point)> {
    let mut out: Vec<(HandleType, Point)> = HandleType::RESIZE
        .iter()
        .filter_map(|&h| h.corner(b.width, b.height).map(|c| (h, b.to_scene(c))))
        .collect();
    out.push((HandleType::Rotate, b.to_scene(Point::new(b.width / 2.0, -rotate_offset))));
    out
}
