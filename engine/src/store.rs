use serde::Serialize;
use tracing::{debug, warn};
use crate::config::EditorConfig;
use crate::error::{EditorError, Result};
use crate::intake::ImageResource;
use crate::objects::{BaseLayer, LayerId, LayerSummary, ObjectLayer};
use crate::types::{PartialTransform, Transform};

/// Emitted after every completed mutation.
#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StoreEvent {
    LayersAdded { ids: Vec<LayerId> },
    LayerRemoved { id: LayerId },
    LayersCleared { ids: Vec<LayerId> },
    LayersReordered { from: usize, to: usize },
    VisibilityToggled { id: LayerId, visible: bool },
    ObjectTransformChanged { id: LayerId, transform: Transform },
    BaseImageChanged { present: bool },
    BaseTransformChanged { transform: Transform },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct SubscriptionId(u64);

type Observer = Box<dyn FnMut(&StoreEvent)>;

/// Canonical ordered object layers plus the base layer. Index 0 paints first.
pub struct LayerStore {
    base: BaseLayer,
    layers: Vec<ObjectLayer>,
    next_id: u64,
    observers: Vec<(SubscriptionId, Observer)>,
    next_subscription: u64,
    new_layer_origin: (f64, f64),
}

impl Default for LayerStore {
    fn default() -> Self {
        LayerStore::new(EditorConfig::default().new_layer_origin)
    }
}

impl LayerStore {
    pub fn new(new_layer_origin: (f64, f64)) -> Self {
        LayerStore {
            base: BaseLayer::default(),
            layers: Vec::new(),
            next_id: 1,
            observers: Vec::new(),
            next_subscription: 1,
            new_layer_origin,
        }
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&StoreEvent) + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(sid, _)| *sid != id);
        self.observers.len() != before
    }

    fn emit(&mut self, event: StoreEvent) {
        debug!(?event, "store mutation");
        for (_, observer) in self.observers.iter_mut() {
            observer(&event);
        }
    }

    pub fn base(&self) -> &BaseLayer { &self.base }
    pub fn layers(&self) -> &[ObjectLayer] { &self.layers }
    pub fn len(&self) -> usize { self.layers.len() }
    pub fn is_empty(&self) -> bool { self.layers.is_empty() }

    pub fn get(&self, id: LayerId) -> Option<&ObjectLayer> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn contains(&self, id: LayerId) -> bool {
        self.get(id).is_some()
    }

    pub fn index_of(&self, id: LayerId) -> Option<usize> {
        self.layers.iter().position(|l| l.id == id)
    }

    pub fn summaries(&self) -> Vec<LayerSummary> {
        self.layers.iter().enumerate().map(|(i, l)| LayerSummary::of(i, l)).collect()
    }

    /// Appends one layer per image at the top of the z-order.
    pub fn add_object_layers(&mut self, images: Vec<ImageResource>) -> Vec<LayerId> {
        let (x, y) = self.new_layer_origin;
        let mut ids = Vec::with_capacity(images.len());
        for image in images {
            let id = LayerId(self.next_id);
            self.next_id += 1;
            self.layers.push(ObjectLayer {
                id,
                image,
                visible: true,
                transform: Transform::at(x, y),
                initialized: false,
            });
            ids.push(id);
        }
        if !ids.is_empty() {
            self.emit(StoreEvent::LayersAdded { ids: ids.clone() });
        }
        ids
    }

    pub fn remove_layer(&mut self, id: LayerId) -> bool {
        match self.index_of(id) {
            Some(pos) => {
                self.layers.remove(pos);
                self.emit(StoreEvent::LayerRemoved { id });
                true
            }
            None => {
                debug!(%id, "remove: no such layer");
                false
            }
        }
    }

    pub fn clear_object_layers(&mut self) -> Vec<LayerId> {
        let ids: Vec<LayerId> = self.layers.drain(..).map(|l| l.id).collect();
        if !ids.is_empty() {
            self.emit(StoreEvent::LayersCleared { ids: ids.clone() });
        }
        ids
    }

    /// Array move: take the entry at `from`, reinsert it at `to` in what remains.
    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.layers.len();
        if from >= len || to >= len {
            return Err(EditorError::invalid_argument(format!("reorder {} -> {} out of bounds for {} layers", from, to, len)));
        }
        if from == to {
            return Err(EditorError::invalid_argument(format!("reorder with duplicate index {}", from)));
        }
        let layer = self.layers.remove(from);
        self.layers.insert(to, layer);
        self.emit(StoreEvent::LayersReordered { from, to });
        Ok(())
    }

    pub fn toggle_visibility(&mut self, id: LayerId) -> Option<bool> {
        let Some(layer) = self.layers.iter_mut().find(|l| l.id == id) else {
            debug!(%id, "toggle: no such layer");
            return None;
        };
        layer.visible = !layer.visible;
        let visible = layer.visible;
        self.emit(StoreEvent::VisibilityToggled { id, visible });
        Some(visible)
    }

    pub fn update_object_transform(&mut self, id: LayerId, partial: &PartialTransform) -> bool {
        self.apply_object_transform(id, partial, false)
    }

    /// Applies the auto-fit placement and sets the one-shot flag.
    pub(crate) fn commit_auto_fit(&mut self, id: LayerId, placement: Transform) -> bool {
        self.apply_object_transform(id, &PartialTransform::full(placement), true)
    }

    fn apply_object_transform(&mut self, id: LayerId, partial: &PartialTransform, mark_initialized: bool) -> bool {
        let Some(layer) = self.layers.iter_mut().find(|l| l.id == id) else {
            debug!(%id, "update: no such layer");
            return false;
        };
        if !partial.merge_into(&mut layer.transform) {
            warn!(%id, ?partial, "dropped invalid transform fields");
        }
        if mark_initialized {
            layer.initialized = true;
        }
        let transform = layer.transform;
        self.emit(StoreEvent::ObjectTransformChanged { id, transform });
        true
    }

    /// Replaces the base image. The base transform is kept as-is.
    pub fn set_base_image(&mut self, image: Option<ImageResource>) {
        let present = image.is_some();
        self.base.image = image;
        self.emit(StoreEvent::BaseImageChanged { present });
    }

    pub fn update_base_transform(&mut self, partial: &PartialTransform) {
        if !partial.merge_into(&mut self.base.transform) {
            warn!(?partial, "dropped invalid base transform fields");
        }
        let transform = self.base.transform;
        self.emit(StoreEvent::BaseTransformChanged { transform });
    }
}
