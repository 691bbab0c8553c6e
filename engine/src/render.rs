use image::{Rgba, RgbaImage};
use kurbo::Point;
use crate::editor::Editor;
use crate::intake::ImageResource;
use crate::selection::Target;
use crate::transform;
use crate::types::{BoundingBox, SceneSize, Transform};

const ACCENT: Rgba<u8> = Rgba([0x4f, 0xac, 0xfe, 0xff]);
const WHITE: Rgba<u8> = Rgba([0xff, 0xff, 0xff, 0xff]);
const HANDLE_SIZE: i64 = 8;

/// One element in paint order.
#[derive(Clone, Debug)]
pub struct DrawItem {
    pub target: Target,
    pub image: ImageResource,
    pub transform: Transform,
}

/// Everything needed to paint a frame: draw list bottom to top plus the
/// box that carries handles, if any.
#[derive(Clone, Debug)]
pub struct Scene {
    pub size: SceneSize,
    pub items: Vec<DrawItem>,
    pub handles: Option<BoundingBox>,
    pub rotate_handle_offset: f64,
}

impl Editor {
    /// Base first, then visible object layers in store order. The target of
    /// an in-flight gesture is drawn at its preview transform.
    pub fn scene(&self) -> Scene {
        let mut items = Vec::with_capacity(self.store.len() + 1);
        let base = self.store.base();
        if let Some(image) = &base.image {
            items.push(DrawItem { target: Target::Base, image: image.clone(), transform: base.transform });
        }
        for layer in self.store.layers().iter().filter(|l| l.visible) {
            items.push(DrawItem { target: Target::Object(layer.id), image: layer.image.clone(), transform: layer.transform });
        }
        if let Some(target) = self.gesture.target() {
            if let Some(item) = items.iter_mut().find(|i| i.target == target) {
                if let Some(preview) = self.gesture.preview_transform(item.image.width()) {
                    item.transform = preview;
                }
            }
        }

        let handles = self.handles_target().and_then(|target| {
            items
                .iter()
                .find(|i| i.target == target)
                .map(|i| BoundingBox::of(&i.transform, i.image.natural_size()))
        });
        Scene { size: self.scene_size, items, handles, rotate_handle_offset: self.config.rotate_handle_offset }
    }

    pub fn render(&self) -> RgbaImage {
        self.scene().rasterize()
    }

    pub fn is_drawn(&self, target: Target) -> bool {
        self.scene().items.iter().any(|i| i.target == target)
    }
}

impl Scene {
    /// Paints onto a transparent surface at the scene's pixel size.
    pub fn rasterize(&self) -> RgbaImage {
        let (w, h) = self.size.pixel_dims();
        let mut surface = RgbaImage::new(w, h);
        for item in &self.items {
            draw_image(&mut surface, item.image.pixels(), &item.transform);
        }
        if let Some(b) = &self.handles {
            draw_handles(&mut surface, b, self.rotate_handle_offset);
        }
        surface
    }
}

fn draw_image(surface: &mut RgbaImage, src: &RgbaImage, t: &Transform) {
    let affine = t.affine();
    let inverse = affine.inverse();
    let (sw, sh) = (src.width() as f64, src.height() as f64);
    let corners = [(0.0, 0.0), (sw, 0.0), (sw, sh), (0.0, sh)].map(|(x, y)| affine * Point::new(x, y));
    let min_x = corners.iter().map(|p| p.x).fold(f64::INFINITY, f64::min).floor().max(0.0) as u32;
    let min_y = corners.iter().map(|p| p.y).fold(f64::INFINITY, f64::min).floor().max(0.0) as u32;
    let max_x = corners.iter().map(|p| p.x).fold(f64::NEG_INFINITY, f64::max).ceil().min(surface.width() as f64);
    let max_y = corners.iter().map(|p| p.y).fold(f64::NEG_INFINITY, f64::max).ceil().min(surface.height() as f64);
    if max_x <= 0.0 || max_y <= 0.0 { return; }

    for py in min_y..max_y as u32 {
        for px in min_x..max_x as u32 {
            let local = inverse * Point::new(px as f64 + 0.5, py as f64 + 0.5);
            if local.x < 0.0 || local.y < 0.0 || local.x >= sw || local.y >= sh { continue; }
            let texel = *src.get_pixel(local.x as u32, local.y as u32);
            blend(surface.get_pixel_mut(px, py), texel);
        }
    }
}

/// Source-over on straight (non-premultiplied) alpha.
fn blend(dst: &mut Rgba<u8>, src: Rgba<u8>) {
    let sa = src[3] as f32 / 255.0;
    if sa <= 0.0 { return; }
    let da = dst[3] as f32 / 255.0;
    let out_a = sa + da * (1.0 - sa);
    for c in 0..3 {
        let v = (src[c] as f32 * sa + dst[c] as f32 * da * (1.0 - sa)) / out_a;
        dst[c] = v.round().clamp(0.0, 255.0) as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}

fn draw_handles(surface: &mut RgbaImage, b: &BoundingBox, rotate_offset: f64) {
    let corners = b.corners();
    for i in 0..4 {
        draw_line(surface, corners[i], corners[(i + 1) % 4], ACCENT);
    }
    let handles = transform::handle_positions(b, rotate_offset);
    if let Some((_, rotater)) = handles.last() {
        draw_line(surface, b.to_scene(Point::new(b.width / 2.0, 0.0)), *rotater, ACCENT);
    }
    for (_, p) in handles {
        fill_square(surface, p, HANDLE_SIZE);
    }
}

fn put(surface: &mut RgbaImage, x: i64, y: i64, color: Rgba<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < surface.width() && (y as u32) < surface.height() {
        surface.put_pixel(x as u32, y as u32, color);
    }
}

fn draw_line(surface: &mut RgbaImage, a: Point, b: Point, color: Rgba<u8>) {
    let steps = (b - a).hypot().ceil().max(1.0) as i64 * 2;
    for i in 0..=steps {
        let p = a.lerp(b, i as f64 / steps as f64);
        put(surface, p.x.floor() as i64, p.y.floor() as i64, color);
    }
}

fn fill_square(surface: &mut RgbaImage, center: Point, size: i64) {
    let (cx, cy) = (center.x.round() as i64, center.y.round() as i64);
    let half = size / 2;
    for y in (cy - half)..(cy + half) {
        for x in (cx - half)..(cx + half) {
            let edge = y == cy - half || y == cy + half - 1 || x == cx - half || x == cx + half - 1;
            put(surface, x, y, if edge { ACCENT } else { WHITE });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intake::ImageResource;
    use crate::selection::Selection;
    use crate::types::PartialTransform;

    fn solid(w: u32, h: u32, color: [u8; 4]) -> ImageResource {
        ImageResource::from_rgba(RgbaImage::from_pixel(w, h, Rgba(color))).unwrap()
    }

    fn editor() -> Editor {
        let mut ed = Editor::default();
        ed.set_base_image(solid(100, 100, [255, 0, 0, 255]));
        ed
    }

    #[test]
    fn draw_list_is_base_then_visible_layers_in_order() {
        let mut ed = editor();
        let ids = ed.add_object_layers(vec![solid(10, 10, [0; 4]), solid(10, 10, [0; 4]), solid(10, 10, [0; 4])]);
        ed.toggle_visibility(ids[1]);
        ed.reorder(2, 0).unwrap();
        let order: Vec<Target> = ed.scene().items.iter().map(|i| i.target).collect();
        assert_eq!(order, vec![Target::Base, Target::Object(ids[2]), Target::Object(ids[0])]);
        assert_eq!(ed.layer_summaries().len(), 3);
    }

    #[test]
    fn later_layers_paint_over_earlier_ones() {
        let mut ed = editor();
        let ids = ed.add_object_layers(vec![solid(20, 20, [0, 255, 0, 255]), solid(20, 20, [0, 0, 255, 255])]);
        for id in &ids {
            ed.update_object_transform(*id, &PartialTransform::position(10.0, 10.0));
        }
        let frame = ed.render();
        assert_eq!(frame.dimensions(), (100, 100));
        assert_eq!(frame.get_pixel(15, 15), &Rgba([0, 0, 255, 255]));
        assert_eq!(frame.get_pixel(50, 50), &Rgba([255, 0, 0, 255]));
    }

    #[test]
    fn scale_and_rotation_anchor_at_top_left() {
        let mut ed = Editor::default();
        let ids = ed.add_object_layers(vec![solid(10, 4, [0, 0, 0, 255])]);
        ed.update_object_transform(ids[0], &PartialTransform { x: Some(50.0), y: Some(50.0), scale: Some(2.0), rotation: Some(90.0) });
        let frame = ed.render();
        // 20x8 after scaling, rotated clockwise about (50, 50): spans x 42..50, y 50..70
        assert_eq!(frame.get_pixel(45, 60)[3], 255);
        assert_eq!(frame.get_pixel(55, 60)[3], 0);
        assert_eq!(frame.get_pixel(45, 45)[3], 0);
    }

    #[test]
    fn half_transparent_pixels_blend() {
        let mut dst = Rgba([0, 0, 0, 255]);
        blend(&mut dst, Rgba([255, 255, 255, 128]));
        assert_eq!(dst, Rgba([128, 128, 128, 255]));
        let mut clear = Rgba([0, 0, 0, 0]);
        blend(&mut clear, Rgba([10, 20, 30, 0]));
        assert_eq!(clear, Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn handles_only_for_selected_visible_element() {
        let mut ed = editor();
        let ids = ed.add_object_layers(vec![solid(10, 10, [0; 4]), solid(10, 10, [0; 4])]);
        ed.select(Selection::Object(ids[1]));
        let bounds = ed.store().get(ids[1]).unwrap().bounds();
        assert_eq!(ed.scene().handles, Some(bounds));
        ed.toggle_visibility(ids[1]);
        assert_eq!(ed.scene().handles, None);
        assert_eq!(ed.handles_target(), None);
    }

    #[test]
    fn drag_preview_renders_without_committing() {
        let mut ed = editor();
        let ids = ed.add_object_layers(vec![solid(10, 10, [0, 0, 0, 255])]);
        let start = ed.store().get(ids[0]).unwrap().transform;
        ed.pointer_down(start.x + 1.0, start.y + 1.0);
        ed.pointer_move(start.x + 31.0, start.y + 1.0);
        let drawn = ed.scene().items.iter().find(|i| i.target == Target::Object(ids[0])).unwrap().transform;
        assert_eq!(drawn.x, start.x + 30.0);
        assert_eq!(ed.store().get(ids[0]).unwrap().transform, start);
        assert!(ed.is_drawn(Target::Object(ids[0])));
    }
}
