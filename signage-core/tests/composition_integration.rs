//! Composition Integration Tests
//!
//! Exercises the full interaction flow through the composer:
//! - Insertion-time bounds correction
//! - Drag, scale and rotate gestures
//! - Toolbar and edit-mode synchronization
//! - Background replacement

use signage_core::{
    Composer, Correction, CorrectionPolicy, DeferredAction, EditPhase, ImagePayload, InputEvent,
    Manipulation, ObjectKind, RasterRef, Rect, Scene, SceneObject, SyncEffect, TextStyle,
    ToolbarChange, BACKGROUND_TAG,
};

/// Image object with a resolved raster of the given natural size.
fn raster(kind: fn(ImagePayload) -> ObjectKind, width: u32, height: u32) -> SceneObject {
    SceneObject::new(kind(ImagePayload {
        key: format!("assets/{width}x{height}.png"),
        raster: Some(RasterRef {
            handle: "blob:signage/test".to_string(),
            width,
            height,
        }),
    }))
}

fn text(content: &str) -> SceneObject {
    SceneObject::text(content, TextStyle::default())
}

fn assert_inside(scene: &Scene) {
    let surface = scene.surface_rect();
    for object in scene.objects().filter(|o| o.kind.is_constrained()) {
        let bounds = object.bounding_rect();
        assert!(
            surface.contains_rect(&bounds),
            "{} escaped the surface: {bounds:?}",
            object.name
        );
    }
}

// ============================================================================
// Insertion
// ============================================================================

#[test]
fn test_insert_near_corner_is_clamped() {
    let mut scene = Scene::new(800, 400);
    let object = text("x").with_size(100.0, 60.0).with_position(750.0, 380.0);
    let id = scene.add(object);

    let placed = scene.get(id).expect("placed");
    assert!((placed.transform.left - 700.0).abs() < 1e-9);
    assert!((placed.transform.top - 340.0).abs() < 1e-9);
    assert!((placed.transform.scale_x - 1.0).abs() < f64::EPSILON);
    assert!((placed.transform.scale_y - 1.0).abs() < f64::EPSILON);
}

#[test]
fn test_oversized_image_is_scaled_by_smaller_factor() {
    let mut scene = Scene::new(800, 400);
    let id = scene.add(raster(ObjectKind::Image, 1600, 1600));

    let placed = scene.get(id).expect("placed");
    assert!((placed.transform.scale_x - 0.25).abs() < 1e-12);
    assert!((placed.transform.scale_y - 0.25).abs() < 1e-12);
    assert_inside(&scene);
}

#[test]
fn test_background_is_exempt_and_covers() {
    let mut scene = Scene::new(800, 400);
    let (id, _) = scene.set_background(raster(ObjectKind::Background, 1000, 1000));
    let bg = scene.get(id).expect("background");
    assert!(bg.name.starts_with(BACKGROUND_TAG));
    assert!(!bg.selectable);

    let bounds = bg.bounding_rect();
    assert!(bounds.contains_rect(&Rect::new(0.0, 0.0, 800.0, 400.0)));

    let correction = scene
        .check_bounds(id, CorrectionPolicy::FitOnly)
        .expect("check");
    assert_eq!(correction, Correction::Noop);
}

// ============================================================================
// Gestures
// ============================================================================

#[test]
fn test_drag_sequence_never_leaves_surface() {
    let mut composer = Composer::new(800, 400);
    composer.add_object(raster(ObjectKind::Logo, 120, 80).with_position(300.0, 150.0));

    composer.handle_event(&InputEvent::PointerDown {
        x: 350.0,
        y: 180.0,
        timestamp_ms: 0,
    });
    for step in 1..=20 {
        let offset = f64::from(step) * 40.0;
        composer.handle_event(&InputEvent::PointerMove {
            x: 350.0 + offset,
            y: 180.0 - offset,
        });
        assert_inside(composer.scene());
    }
    composer.handle_event(&InputEvent::PointerUp { x: 1150.0, y: -620.0 });
    assert_inside(composer.scene());
}

#[test]
fn test_rotate_then_scale_stays_inside() {
    let mut composer = Composer::new(800, 400);
    let id = composer.add_object(raster(ObjectKind::Image, 200, 100).with_position(300.0, 150.0));
    composer.select(Some(id)).expect("select");

    composer.handle_event(&InputEvent::Manipulate(Manipulation::Rotate { angle: 45.0 }));
    assert_inside(composer.scene());
    composer.handle_event(&InputEvent::Manipulate(Manipulation::Scale {
        scale_x: 3.0,
        scale_y: 3.0,
    }));
    assert_inside(composer.scene());
}

#[test]
fn test_background_cannot_be_dragged() {
    let mut composer = Composer::new(800, 400);
    let (bg, _) = composer.set_background(raster(ObjectKind::Background, 800, 400));

    composer.handle_event(&InputEvent::PointerDown {
        x: 400.0,
        y: 200.0,
        timestamp_ms: 0,
    });
    composer.handle_event(&InputEvent::PointerMove { x: 500.0, y: 200.0 });
    composer.handle_event(&InputEvent::PointerUp { x: 500.0, y: 200.0 });

    let object = composer.scene().get(bg).expect("background");
    assert!(object.transform.left.abs() < 1e-9);
    assert_eq!(composer.scene().active(), None);
}

// ============================================================================
// Selection & Edit Mode
// ============================================================================

#[test]
fn test_fast_double_press_enters_editing_with_select_all() {
    let mut composer = Composer::new(800, 400);
    let id = composer.add_object(text("Grand opening").with_position(20.0, 20.0));

    composer.handle_event(&InputEvent::PointerDown {
        x: 40.0,
        y: 40.0,
        timestamp_ms: 10_000,
    });
    composer.handle_event(&InputEvent::PointerUp { x: 40.0, y: 40.0 });
    let effects = composer.handle_event(&InputEvent::PointerDown {
        x: 40.0,
        y: 40.0,
        timestamp_ms: 10_450,
    });

    assert_eq!(composer.phase(), EditPhase::Editing(id));
    assert!(effects.contains(&SyncEffect::EnterEditing {
        object: id,
        selection: (0, 13),
    }));
    assert_eq!(composer.on_paint(), vec![DeferredAction::FocusTextField(id)]);
    assert!(composer.on_paint().is_empty());
}

#[test]
fn test_switching_text_objects_rebuilds_toolbar() {
    let mut composer = Composer::new(800, 400);
    let a = composer.add_object(
        SceneObject::text(
            "Small",
            TextStyle {
                font_size: 18.0,
                ..TextStyle::default()
            },
        )
        .with_position(10.0, 10.0),
    );
    let b = composer.add_object(
        SceneObject::text(
            "Large",
            TextStyle {
                font_size: 64.0,
                fill: "#ff0000".to_string(),
                ..TextStyle::default()
            },
        )
        .with_position(10.0, 200.0),
    );

    composer.select(Some(a)).expect("select a");
    let effects = composer.select(Some(b)).expect("select b");
    let toolbar = composer.toolbar().expect("toolbar");
    assert_eq!(toolbar.object, b);
    assert_eq!(toolbar.fill, "#ff0000");
    assert!((toolbar.font_size - 64.0).abs() < f64::EPSILON);
    assert_eq!(effects.len(), 1);

    let effects = composer.select(None).expect("clear");
    assert_eq!(effects, vec![SyncEffect::ToolbarChanged(None)]);
}

#[test]
fn test_toolbar_edits_apply_immediately() {
    let mut composer = Composer::new(800, 400);
    let id = composer.add_object(text("Menu").with_position(10.0, 10.0));
    composer.select(Some(id)).expect("select");

    composer
        .apply_toolbar(&ToolbarChange::Weight(signage_core::FontWeight::Bold))
        .expect("bold");
    composer
        .apply_toolbar(&ToolbarChange::Underline(true))
        .expect("underline");

    let toolbar = composer.toolbar().expect("toolbar");
    assert_eq!(toolbar.weight, signage_core::FontWeight::Bold);
    assert!(toolbar.underline);
    match &composer.scene().get(id).expect("object").kind {
        ObjectKind::Text { style, .. } => {
            assert_eq!(style.weight, signage_core::FontWeight::Bold);
            assert!(style.underline);
        }
        other => panic!("unexpected kind {other:?}"),
    }
}

#[test]
fn test_removed_object_leaves_no_interaction_state() {
    let mut composer = Composer::new(800, 400);
    let id = composer.add_object(text("Gone").with_position(10.0, 10.0));
    composer.handle_event(&InputEvent::DoubleClick { x: 20.0, y: 20.0 });
    assert_eq!(composer.phase(), EditPhase::Editing(id));

    composer.remove_object(id).expect("remove");
    assert_eq!(composer.phase(), EditPhase::Idle);
    assert!(composer.toolbar().is_none());
    assert!(composer.on_paint().is_empty());
    assert_eq!(composer.scene().snapshot_count(), 0);
}

// ============================================================================
// Properties
// ============================================================================

mod properties {
    use proptest::prelude::*;

    use super::*;

    proptest! {
        #[test]
        fn insertion_always_lands_inside(
            width in 1u32..4000,
            height in 1u32..4000,
            left in -3000.0f64..3000.0,
            top in -3000.0f64..3000.0,
            angle in 0.0f64..360.0,
        ) {
            let mut scene = Scene::new(800, 400);
            let object = raster(ObjectKind::Image, width, height)
                .with_position(left, top)
                .with_transform(signage_core::Transform {
                    left,
                    top,
                    angle,
                    ..signage_core::Transform::default()
                });
            scene.add(object);
            let surface = scene.surface_rect();
            for o in scene.objects() {
                prop_assert!(surface.contains_rect(&o.bounding_rect()));
            }
        }

        #[test]
        fn scale_to_fit_preserves_aspect(
            scale_x in 0.1f64..20.0,
            scale_y in 0.1f64..20.0,
        ) {
            let mut scene = Scene::new(800, 400);
            let object = raster(ObjectKind::Image, 300, 200).with_transform(signage_core::Transform {
                scale_x,
                scale_y,
                ..signage_core::Transform::default()
            });
            let id = scene.add(object);
            let placed = scene.get(id).expect("placed");
            let before = scale_x / scale_y;
            let after = placed.transform.scale_x / placed.transform.scale_y;
            prop_assert!((before - after).abs() < 1e-9 * before.max(1.0));
        }
    }
}
