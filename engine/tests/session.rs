use std::cell::RefCell;
use std::io::Cursor;
use std::rc::Rc;

use image::{DynamicImage, ImageOutputFormat, Rgba, RgbaImage};
use studio_engine::config::DEFAULT_PROMPT;
use studio_engine::generate::{Candidate, Content, GenerationRequest, GenerationResponse, ImageGenerator, Part};
use studio_engine::intake::DataUrl;
use studio_engine::selection::{Selection, Target};
use studio_engine::store::StoreEvent;
use studio_engine::{Editor, EditorError, PartialTransform, Result, SceneSize, Transform};

fn png(width: u32, height: u32, color: [u8; 4]) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(color)))
        .write_to(&mut out, ImageOutputFormat::Png)
        .unwrap();
    out.into_inner()
}

struct EchoGenerator {
    prompts: RefCell<Vec<String>>,
}

impl ImageGenerator for EchoGenerator {
    fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse> {
        self.prompts.borrow_mut().push(request.prompt.clone());
        Ok(GenerationResponse {
            candidates: vec![Candidate {
                content: Content {
                    parts: vec![Part { inline_data: Some(request.image.clone()), text: None }],
                },
            }],
        })
    }
}

#[test]
fn full_editing_session() {
    let mut ed = Editor::default();
    let events = Rc::new(RefCell::new(Vec::new()));
    let sink = events.clone();
    ed.subscribe(move |e| sink.borrow_mut().push(e.clone()));

    ed.upload_base_image(&png(800, 800, [30, 30, 30, 255])).unwrap();
    assert_eq!(ed.scene_size(), SceneSize { width: 768.0, height: 768.0 });

    let ids = ed
        .upload_object_images(&[png(384, 192, [255, 0, 0, 255]), png(96, 96, [0, 0, 255, 255])])
        .unwrap();
    let order: Vec<_> = ed.store().layers().iter().map(|l| l.id).collect();
    assert_eq!(order, ids);
    assert_eq!(events.borrow()[0], StoreEvent::BaseImageChanged { present: true });
    assert!(matches!(&events.borrow()[1], StoreEvent::LayersAdded { ids: added } if *added == ids));

    // target width clamp(floor(768 * 0.25), 128, 512) = 192
    let first = ed.store().get(ids[0]).unwrap().transform;
    assert_eq!(first, Transform { x: 288.0, y: 336.0, scale: 0.5, rotation: 0.0 });
    let second = ed.store().get(ids[1]).unwrap().transform;
    assert_eq!(second, Transform { x: 336.0, y: 336.0, scale: 1.0, rotation: 0.0 });

    // object 2 is on top at the shared center
    assert_eq!(ed.pointer_down(384.0, 384.0), Selection::Object(ids[1]));
    ed.pointer_up(384.0, 384.0);
    assert_eq!(ed.handles_target(), Some(Target::Object(ids[1])));
    assert_eq!(ed.scene().handles, Some(ed.store().get(ids[1]).unwrap().bounds()));

    ed.toggle_visibility(ids[0]);
    assert!(!ed.is_drawn(Target::Object(ids[0])));
    let listed = ed.layer_summaries();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].label, "Object 1");
    assert!(!listed[0].visible);

    let on_screen = ed.render();
    let flattened = ed.flatten_png().unwrap();
    assert!(ed.handles_visible());
    let flattened = image::load_from_memory(&flattened).unwrap().to_rgba8();
    assert_eq!(flattened.dimensions(), (768, 768));
    assert_eq!(flattened.get_pixel(384, 384), &Rgba([0, 0, 255, 255]));
    // handle corner of object 2 shows on screen but not in the export
    assert_ne!(on_screen.get_pixel(336, 336), flattened.get_pixel(336, 336));
    assert_eq!(flattened.get_pixel(300, 300), &Rgba([30, 30, 30, 255]));

    let generator = EchoGenerator { prompts: RefCell::new(Vec::new()) };
    let output = ed.generate(&generator, "").unwrap();
    assert_eq!(generator.prompts.borrow()[0], DEFAULT_PROMPT);
    assert_eq!(output.mime_type, "image/png");
    let download = ed.output_download().unwrap();
    assert_eq!(download.name, "final-image.png");
    assert_eq!(image::load_from_memory(&download.bytes).unwrap().width(), 768);
}

#[test]
fn auto_fit_never_refires() {
    let mut ed = Editor::default();
    ed.upload_base_image(&png(800, 800, [0, 0, 0, 255])).unwrap();
    let ids = ed.upload_object_images(&[png(1000, 500, [9, 9, 9, 255])]).unwrap();
    ed.update_object_transform(ids[0], &PartialTransform { scale: Some(1.0), x: Some(0.0), y: Some(0.0), ..Default::default() });
    ed.run_auto_fit();
    ed.upload_base_image(&png(300, 300, [0, 0, 0, 255])).unwrap();
    let t = ed.store().get(ids[0]).unwrap().transform;
    assert_eq!(t, Transform { x: 0.0, y: 0.0, scale: 1.0, rotation: 0.0 });
}

#[test]
fn base_transform_survives_base_swap() {
    let mut ed = Editor::default();
    ed.upload_base_image(&png(200, 100, [0, 0, 0, 255])).unwrap();
    ed.update_base_transform(&PartialTransform { x: Some(-20.0), rotation: Some(10.0), ..Default::default() });
    ed.upload_base_image(&png(1600, 800, [0, 0, 0, 255])).unwrap();
    assert_eq!(ed.scene_size(), SceneSize { width: 768.0, height: 384.0 });
    assert_eq!(ed.store().base().transform, Transform { x: -20.0, y: 0.0, scale: 1.0, rotation: 10.0 });
}

#[test]
fn failures_leave_session_usable() {
    let mut ed = Editor::default();
    let empty: [Vec<u8>; 0] = [];
    assert!(matches!(ed.upload_object_images(&empty), Err(EditorError::InvalidInput(_))));
    assert!(matches!(ed.upload_base_image(b"GIF89a?"), Err(EditorError::InvalidInput(_))));
    assert!(matches!(ed.reorder(0, 1), Err(EditorError::InvalidArgument(_))));

    ed.upload_base_image(&png(64, 64, [1, 2, 3, 255])).unwrap();
    let err = ed.complete_generation(Ok(GenerationResponse::default())).unwrap_err();
    assert!(err.to_string().starts_with("Failed to generate image: No image was generated"));
    let ids = ed.upload_object_images(&[png(8, 8, [0, 0, 0, 255])]).unwrap();
    assert_eq!(ed.store().len(), 1);
    assert!(ed.store().get(ids[0]).unwrap().initialized);
    assert!(ed.flatten_png().is_ok());
}

#[test]
fn snapshot_is_unaffected_by_later_edits() {
    let mut ed = Editor::default();
    ed.upload_base_image(&png(32, 32, [200, 0, 0, 255])).unwrap();
    let request = ed.prepare_generation("keep it").unwrap();
    ed.upload_object_images(&[png(32, 32, [0, 200, 0, 255])]).unwrap();
    let sent = DataUrl::from(request.image.clone()).bytes().unwrap();
    let sent = image::load_from_memory(&sent).unwrap().to_rgba8();
    assert!(sent.pixels().all(|p| *p == Rgba([200, 0, 0, 255])));
    assert!(ed.generation().in_progress);
}
