use kurbo::{Point, Vec2};
use serde::Serialize;
use tracing::debug;
use crate::editor::Editor;
use crate::objects::LayerId;
use crate::store::LayerStore;
use crate::transform;
use crate::types::{BoundingBox, HandleType, PartialTransform, Transform};

#[derive(Serialize, Clone, Copy, PartialEq, Eq, Debug, Default)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Selection {
    #[default]
    None,
    Base,
    Object(LayerId),
}

/// Something on the canvas that can be selected and transformed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Target {
    Base,
    Object(LayerId),
}

impl Selection {
    pub fn target(self) -> Option<Target> {
        match self {
            Selection::None => None,
            Selection::Base => Some(Target::Base),
            Selection::Object(id) => Some(Target::Object(id)),
        }
    }

    pub fn from_target(target: Option<Target>) -> Self {
        match target {
            None => Selection::None,
            Some(Target::Base) => Selection::Base,
            Some(Target::Object(id)) => Selection::Object(id),
        }
    }

    /// Drops the selection if what it points at is gone.
    pub fn reconcile(&mut self, store: &LayerStore) {
        let stale = match *self {
            Selection::None => false,
            Selection::Base => store.base().image.is_none(),
            Selection::Object(id) => !store.contains(id),
        };
        if stale {
            *self = Selection::None;
        }
    }
}

/// Current on-canvas bounds of a target, `None` if it is absent or hidden.
pub fn target_bounds(store: &LayerStore, target: Target) -> Option<BoundingBox> {
    match target {
        Target::Base => store.base().bounds(),
        Target::Object(id) => store.get(id).filter(|l| l.visible).map(|l| l.bounds()),
    }
}

pub fn natural_width(store: &LayerStore, target: Target) -> Option<u32> {
    match target {
        Target::Base => store.base().image.as_ref().map(|i| i.width()),
        Target::Object(id) => store.get(id).map(|l| l.image.width()),
    }
}

pub fn current_transform(store: &LayerStore, target: Target) -> Option<Transform> {
    match target {
        Target::Base => store.base().image.as_ref().map(|_| store.base().transform),
        Target::Object(id) => store.get(id).map(|l| l.transform),
    }
}

/// Topmost element under the point. Hidden layers are not hit.
pub fn hit_test(store: &LayerStore, pt: Point) -> Option<Target> {
    for layer in store.layers().iter().rev() {
        if layer.visible && layer.bounds().contains(pt) {
            return Some(Target::Object(layer.id));
        }
    }
    match store.base().bounds() {
        Some(b) if b.contains(pt) => Some(Target::Base),
        _ => None,
    }
}

/// Handle of the selected element under the point, if any.
pub fn hit_test_handles(bounds: &BoundingBox, pt: Point, radius: f64, rotate_offset: f64) -> Option<HandleType> {
    transform::handle_positions(bounds, rotate_offset)
        .into_iter()
        .find(|(_, h)| (*h - pt).hypot() <= radius)
        .map(|(handle, _)| handle)
}

/// In-flight pointer interaction. Previews live here until release.
#[derive(Clone, Copy, PartialEq, Debug, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Dragging { target: Target, grab: Vec2, preview: Transform },
    Resizing { target: Target, handle: HandleType, start: BoundingBox, preview: BoundingBox },
    Rotating { target: Target, start: BoundingBox, preview: BoundingBox },
}

impl Gesture {
    pub fn target(&self) -> Option<Target> {
        match *self {
            Gesture::Idle => None,
            Gesture::Dragging { target, .. } | Gesture::Resizing { target, .. } | Gesture::Rotating { target, .. } => Some(target),
        }
    }

    /// Transform the renderer should show for the gesture target.
    pub fn preview_transform(&self, natural_width: u32) -> Option<Transform> {
        match *self {
            Gesture::Idle => None,
            Gesture::Dragging { preview, .. } => Some(preview),
            Gesture::Resizing { preview, .. } | Gesture::Rotating { preview, .. } => Some(preview.to_transform(natural_width)),
        }
    }
}

impl Editor {
    /// Pointer press in scene coordinates. Handles of the selected element
    /// take precedence, then the topmost element, then the background.
    pub fn pointer_down(&mut self, x: f64, y: f64) -> Selection {
        let pt = Point::new(x, y);
        self.gesture = Gesture::Idle;

        if let Some(target) = self.handles_target() {
            if let Some(bounds) = target_bounds(&self.store, target) {
                match hit_test_handles(&bounds, pt, self.config.handle_radius, self.config.rotate_handle_offset) {
                    Some(HandleType::Rotate) => {
                        self.gesture = Gesture::Rotating { target, start: bounds, preview: bounds };
                        return self.selection;
                    }
                    Some(handle) => {
                        self.gesture = Gesture::Resizing { target, handle, start: bounds, preview: bounds };
                        return self.selection;
                    }
                    None => {}
                }
            }
        }

        let hit = hit_test(&self.store, pt);
        self.selection = Selection::from_target(hit);
        if let Some(target) = hit {
            if let Some(t) = current_transform(&self.store, target) {
                self.gesture = Gesture::Dragging { target, grab: pt - Point::new(t.x, t.y), preview: t };
            }
        }
        debug!(selection = ?self.selection, "pointer down");
        self.selection
    }

    /// Updates the live preview only. Returns true if a redraw is needed.
    pub fn pointer_move(&mut self, x: f64, y: f64) -> bool {
        let pt = Point::new(x, y);
        match &mut self.gesture {
            Gesture::Idle => false,
            Gesture::Dragging { grab, preview, .. } => {
                let at = pt - *grab;
                *preview = transform::apply_drag(preview, at.x, at.y);
                true
            }
            Gesture::Resizing { handle, start, preview, .. } => {
                let proposed = transform::resize_from_handle(*start, *handle, pt);
                *preview = transform::clamp_resize(*preview, proposed, self.config.min_box_size);
                true
            }
            Gesture::Rotating { start, preview, .. } => {
                *preview = transform::rotate_from_handle(*start, pt);
                true
            }
        }
    }

    /// Ends the gesture at the release point and commits it with a single
    /// store update. Returns true if anything was committed.
    pub fn pointer_up(&mut self, x: f64, y: f64) -> bool {
        self.pointer_move(x, y);
        let gesture = std::mem::take(&mut self.gesture);
        let Some(target) = gesture.target() else { return false };
        let Some(before) = current_transform(&self.store, target) else { return false };
        let Some(natural) = natural_width(&self.store, target) else { return false };
        let partial = match gesture {
            Gesture::Dragging { preview, .. } if preview != before => PartialTransform::position(preview.x, preview.y),
            Gesture::Resizing { start, preview, .. } | Gesture::Rotating { start, preview, .. } if preview != start => {
                PartialTransform::full(preview.to_transform(natural))
            }
            _ => return false,
        };
        match target {
            Target::Base => self.update_base_transform(&partial),
            Target::Object(id) => self.update_object_transform(id, &partial),
        }
        true
    }

    /// Abandons the in-flight gesture; the store never saw it.
    pub fn cancel_gesture(&mut self) {
        self.gesture = Gesture::Idle;
    }
}
