use std::cell::Cell;
use tracing::{debug, info};
use crate::config::EditorConfig;
use crate::error::Result;
use crate::generate::GenerationState;
use crate::intake::{self, ImageResource};
use crate::objects::{LayerId, LayerSummary};
use crate::selection::{Gesture, Selection, Target};
use crate::store::{LayerStore, StoreEvent, SubscriptionId};
use crate::transform;
use crate::types::{PartialTransform, SceneSize};

/// One editing session: layers, selection, in-flight gesture and the last
/// generation result. All mutation goes through `&mut self`, so the store is
/// only ever touched from the owning thread.
pub struct Editor {
    pub(crate) config: EditorConfig,
    pub(crate) store: LayerStore,
    pub(crate) selection: Selection,
    pub(crate) gesture: Gesture,
    pub(crate) scene_size: SceneSize,
    pub(crate) handles_visible: Cell<bool>,
    pub(crate) generation: GenerationState,
}

impl Default for Editor {
    fn default() -> Self {
        Editor::new(EditorConfig::default())
    }
}

impl Editor {
    pub fn new(config: EditorConfig) -> Self {
        Editor {
            store: LayerStore::new(config.new_layer_origin),
            selection: Selection::None,
            gesture: Gesture::Idle,
            scene_size: config.default_scene,
            handles_visible: Cell::new(true),
            generation: GenerationState::default(),
            config,
        }
    }

    pub fn config(&self) -> &EditorConfig { &self.config }
    pub fn store(&self) -> &LayerStore { &self.store }
    pub fn selection(&self) -> Selection { self.selection }
    pub fn gesture(&self) -> Gesture { self.gesture }
    pub fn scene_size(&self) -> SceneSize { self.scene_size }
    pub fn handles_visible(&self) -> bool { self.handles_visible.get() }

    /// Observers see every store mutation, including the ones the editor
    /// makes on its own (auto-fit, gesture commits).
    pub fn subscribe(&mut self, observer: impl FnMut(&StoreEvent) + 'static) -> SubscriptionId {
        self.store.subscribe(observer)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.store.unsubscribe(id)
    }

    pub fn layer_summaries(&self) -> Vec<LayerSummary> {
        self.store.summaries()
    }

    /// Element currently carrying the transform handles, if they are shown.
    pub fn handles_target(&self) -> Option<Target> {
        if !self.handles_visible.get() { return None; }
        let target = self.selection.target()?;
        crate::selection::target_bounds(&self.store, target).map(|_| target)
    }

    fn after_removal(&mut self) {
        self.selection.reconcile(&self.store);
        if let Some(target) = self.gesture.target() {
            if crate::selection::current_transform(&self.store, target).is_none() {
                self.gesture = Gesture::Idle;
            }
        }
    }

    pub fn upload_base_image(&mut self, bytes: &[u8]) -> Result<()> {
        let image = ImageResource::decode(bytes)?;
        self.set_base_image(image);
        Ok(())
    }

    pub fn set_base_image(&mut self, image: ImageResource) {
        let (w, h) = image.natural_size();
        self.scene_size = transform::fit_scene(w, h, self.config.max_scene_dimension);
        info!(width = w, height = h, scene = ?self.scene_size, "base image loaded");
        self.store.set_base_image(Some(image));
        self.generation.reset();
        self.run_auto_fit();
    }

    /// Removes the base image; the scene keeps its last size.
    pub fn clear_base_image(&mut self) {
        self.store.set_base_image(None);
        self.generation.reset();
        self.after_removal();
    }

    /// Decodes the whole batch, then appends it as one contiguous run.
    pub fn upload_object_images<B: AsRef<[u8]>>(&mut self, files: &[B]) -> Result<Vec<LayerId>> {
        let images = intake::decode_batch(files)?;
        Ok(self.add_object_layers(images))
    }

    pub fn add_object_layers(&mut self, images: Vec<ImageResource>) -> Vec<LayerId> {
        let ids = self.store.add_object_layers(images);
        self.run_auto_fit();
        ids
    }

    /// Places every layer that has not been placed yet. Safe to call any
    /// number of times.
    pub fn run_auto_fit(&mut self) {
        let pending: Vec<_> = self
            .store
            .layers()
            .iter()
            .filter(|l| transform::needs_auto_fit(l))
            .map(|l| (l.id, transform::auto_fit(self.scene_size, l.image.natural_size(), l.transform.rotation, &self.config)))
            .collect();
        for (id, placement) in pending {
            debug!(%id, ?placement, "auto-fit");
            self.store.commit_auto_fit(id, placement);
        }
    }

    pub fn remove_layer(&mut self, id: LayerId) {
        self.store.remove_layer(id);
        self.after_removal();
    }

    pub fn clear_object_layers(&mut self) {
        self.store.clear_object_layers();
        self.after_removal();
    }

    pub fn reorder(&mut self, from: usize, to: usize) -> Result<()> {
        self.store.reorder(from, to)
    }

    pub fn toggle_visibility(&mut self, id: LayerId) -> Option<bool> {
        self.store.toggle_visibility(id)
    }

    pub fn update_object_transform(&mut self, id: LayerId, partial: &PartialTransform) {
        self.store.update_object_transform(id, partial);
        self.run_auto_fit();
    }

    pub fn update_base_transform(&mut self, partial: &PartialTransform) {
        self.store.update_base_transform(partial);
    }

    /// Programmatic selection; targets that do not exist select nothing.
    pub fn select(&mut self, selection: Selection) {
        self.selection = selection;
        self.selection.reconcile(&self.store);
    }
}
