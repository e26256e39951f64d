use std::io::Cursor;
use std::rc::Rc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use tokio::sync::Notify;

use triview::lifecycle::{ImageOrigin, EMPTY_STATUS, IDLE_STATUS};
use triview::media::{RasterDecoder, SyntheticCamera};
use triview::render::DrawCommand;
use triview::{
    BoundingBox, Color, DecodedImage, DetectError, Detection, DetectionModel, DrawingSurface,
    Event, FormatError, LifecycleController, PipelineError, PipelineState, RasterSurface,
    RecordingSurface, ReplayModel, Tab, TriviewConfig, ViewKind,
};

fn png(width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::new();
    DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba([40, 40, 40, 255])))
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .expect("encode png");
    out
}

fn upload() -> Event {
    Event::FileSelected {
        bytes: png(320, 240),
        mime: "image/png".to_string(),
    }
}

fn person_and_cat() -> Vec<Detection> {
    vec![
        Detection::new("person", 0.9, BoundingBox::new(10.0, 10.0, 50.0, 80.0)),
        Detection::new("cat", 0.4, BoundingBox::new(100.0, 20.0, 30.0, 30.0)),
    ]
}

fn app_with_config<S: DrawingSurface + Default>(
    config: &TriviewConfig,
    camera: &SyntheticCamera,
) -> LifecycleController<S> {
    LifecycleController::new(
        config,
        Box::new(camera.clone()),
        Box::new(RasterDecoder),
        Default::default(),
    )
}

fn app(camera: &SyntheticCamera) -> LifecycleController<RecordingSurface> {
    app_with_config(&TriviewConfig::default(), camera)
}

async fn install<S: DrawingSurface>(
    app: &LifecycleController<S>,
    model: impl DetectionModel + 'static,
) {
    let model: Rc<dyn DetectionModel> = Rc::new(model);
    app.load_model(async move { Ok::<_, anyhow::Error>(model) })
        .await
        .expect("model loads");
}

fn notices<S: DrawingSurface>(app: &LifecycleController<S>) -> Vec<String> {
    app.notifications()
        .active()
        .into_iter()
        .map(|notice| notice.message)
        .collect()
}

/// Holds every detection call until the gate is opened.
struct GatedModel {
    gate: Rc<Notify>,
    detections: Vec<Detection>,
}

#[async_trait(?Send)]
impl DetectionModel for GatedModel {
    fn name(&self) -> &str {
        "gated"
    }

    fn is_loaded(&self) -> bool {
        true
    }

    async fn detect(&self, _image: &DecodedImage) -> Result<Vec<Detection>> {
        self.gate.notified().await;
        Ok(self.detections.clone())
    }
}

#[tokio::test]
async fn person_and_cat_render_into_three_panels() {
    let camera = SyntheticCamera::new();
    let app = app(&camera);
    install(&app, ReplayModel::new(person_and_cat())).await;

    app.dispatch(Event::SelectTab(Tab::Upload)).await.unwrap();
    app.dispatch(upload()).await.unwrap();
    assert_eq!(app.state(), PipelineState::ImageLoaded(ImageOrigin::Upload));
    assert!(app.upload_preview_visible());

    app.dispatch(Event::Detect).await.unwrap();

    assert_eq!(app.panel_status(ViewKind::Yolo), "Detected 2 objects (YOLO)");
    assert_eq!(app.panel_status(ViewKind::Rcnn), "Detected 1 objects (RCNN)");
    assert_eq!(app.panel_status(ViewKind::Hybrid), "Detected 2 objects (Hybrid)");

    app.with_surface(ViewKind::Rcnn, |surface| {
        assert_eq!(surface.size(), (320, 240));
        assert_eq!(surface.captions(), ["person (90.0%)"]);
    });
    app.with_surface(ViewKind::Hybrid, |surface| {
        assert_eq!(surface.captions(), ["person (90.0%)", "cat (40.0%)"]);
        assert!(surface.visible_commands().iter().any(|cmd| matches!(
            cmd,
            DrawCommand::StrokeRect { color, .. } if *color == Color::BLUE
        )));
    });

    assert_eq!(app.last_detections().map(|set| set.len()), Some(2));
    assert!(notices(&app).contains(&"Detection completed!".to_string()));
    assert_eq!(app.notifications().loading_message(), None);
}

#[tokio::test]
async fn empty_pass_shows_no_objects_on_clean_surfaces() {
    let app = app(&SyntheticCamera::new());
    install(&app, ReplayModel::new(vec![])).await;

    app.dispatch(upload()).await.unwrap();
    app.dispatch(Event::Detect).await.unwrap();

    for view in ViewKind::ALL {
        assert_eq!(app.panel_status(view), EMPTY_STATUS);
        app.with_surface(view, |surface| {
            assert_eq!(surface.box_count(), 0);
            assert!(surface.visible_commands().is_empty());
        });
    }
}

#[tokio::test]
async fn hiding_the_page_stops_the_camera() {
    let camera = SyntheticCamera::new();
    let app = app(&camera);

    app.dispatch(Event::StartCamera).await.unwrap();
    assert_eq!(app.state(), PipelineState::CameraActive);
    assert_eq!(camera.stats().live_tracks, 1);

    app.dispatch(Event::VisibilityChanged { hidden: true })
        .await
        .unwrap();

    assert_eq!(app.state(), PipelineState::NoInput);
    assert_eq!(camera.stats().live_tracks, 0);
    assert!(app.controls().start);
    assert!(!app.controls().capture);
}

#[tokio::test]
async fn text_upload_is_rejected_and_state_kept() {
    let app = app(&SyntheticCamera::new());
    app.dispatch(upload()).await.unwrap();

    let err = app
        .dispatch(Event::FileSelected {
            bytes: b"not an image".to_vec(),
            mime: "text/plain".to_string(),
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        PipelineError::Format(FormatError::NotImage { .. })
    ));
    assert_eq!(app.state(), PipelineState::ImageLoaded(ImageOrigin::Upload));
    assert_eq!(
        app.notifications().latest().as_deref(),
        Some("Please select an image file")
    );
}

#[tokio::test]
async fn second_detect_while_outstanding_is_busy() {
    let gate = Rc::new(Notify::new());
    let app = app(&SyntheticCamera::new());
    install(
        &app,
        GatedModel {
            gate: gate.clone(),
            detections: person_and_cat(),
        },
    )
    .await;
    app.dispatch(upload()).await.unwrap();

    let (first, second) = tokio::join!(app.dispatch(Event::Detect), async {
        tokio::task::yield_now().await;
        assert!(app.is_detecting());
        let second = app.dispatch(Event::Detect).await;
        gate.notify_one();
        second
    });

    assert_eq!(second.unwrap_err(), PipelineError::Detect(DetectError::Busy));
    first.unwrap();
    assert!(!app.is_detecting());
    assert_eq!(app.panel_status(ViewKind::Yolo), "Detected 2 objects (YOLO)");
    assert!(notices(&app).contains(&"Detection already in progress".to_string()));
}

#[tokio::test]
async fn start_is_idempotent_and_stop_is_a_noop_when_idle() {
    let camera = SyntheticCamera::new();
    let app = app(&camera);

    app.dispatch(Event::StopCamera).await.unwrap();
    assert_eq!(app.state(), PipelineState::NoInput);
    assert!(notices(&app).is_empty());

    app.dispatch(Event::StartCamera).await.unwrap();
    app.dispatch(Event::StartCamera).await.unwrap();
    assert_eq!(camera.stats().streams_opened, 1);
    assert_eq!(
        notices(&app),
        ["Camera started successfully!".to_string()]
    );
}

#[tokio::test]
async fn denied_camera_is_reported_without_state_change() {
    let camera = SyntheticCamera::failing(triview::AcquireError::Denied);
    let app = app(&camera);

    let err = app.dispatch(Event::StartCamera).await.unwrap_err();

    assert_eq!(err, PipelineError::Acquire(triview::AcquireError::Denied));
    assert_eq!(app.state(), PipelineState::NoInput);
    assert_eq!(
        app.notifications().latest().as_deref(),
        Some("Failed to start camera: camera access was denied")
    );
}

#[tokio::test]
async fn upload_replaces_running_camera() {
    let camera = SyntheticCamera::new();
    let app = app(&camera);
    app.dispatch(Event::StartCamera).await.unwrap();

    app.dispatch(upload()).await.unwrap();

    assert_eq!(camera.stats().live_tracks, 0);
    assert_eq!(app.state(), PipelineState::ImageLoaded(ImageOrigin::Upload));

    app.dispatch(Event::RemoveImage).await.unwrap();
    assert_eq!(app.state(), PipelineState::NoInput);
    assert!(!app.upload_preview_visible());
    assert_eq!(app.notifications().latest().as_deref(), Some("Image removed"));
    for view in ViewKind::ALL {
        assert_eq!(app.panel_status(view), IDLE_STATUS);
    }
}

#[tokio::test]
async fn failed_model_load_keeps_preview_usable() {
    let app = app(&SyntheticCamera::new());
    let loaded = app
        .load_model(async { Err::<Rc<dyn DetectionModel>, _>(anyhow::anyhow!("fetch failed")) })
        .await;
    assert!(loaded.is_err());
    assert!(notices(&app).contains(&"Failed to load model: fetch failed".to_string()));

    app.dispatch(upload()).await.unwrap();
    let err = app.dispatch(Event::Detect).await.unwrap_err();

    assert_eq!(err, PipelineError::Detect(DetectError::ModelNotReady));
    assert!(app.upload_preview_visible());
}

#[tokio::test]
async fn stalled_model_times_out_when_configured() {
    let config = TriviewConfig {
        detect_timeout: Some(Duration::from_millis(20)),
        ..TriviewConfig::default()
    };
    let app: LifecycleController<RecordingSurface> =
        app_with_config(&config, &SyntheticCamera::new());
    install(
        &app,
        GatedModel {
            gate: Rc::new(Notify::new()),
            detections: vec![],
        },
    )
    .await;
    app.dispatch(upload()).await.unwrap();

    let err = app.dispatch(Event::Detect).await.unwrap_err();

    assert_eq!(
        err,
        PipelineError::Detect(DetectError::TimedOut(Duration::from_millis(20)))
    );
    assert_eq!(app.notifications().loading_message(), None);
    assert!(!app.is_detecting());
    assert!(app
        .notifications()
        .latest()
        .is_some_and(|message| message.starts_with("Detection failed:")));
}

#[tokio::test]
async fn raster_panels_paint_boxes_in_view_colors() {
    let app: LifecycleController<RasterSurface> =
        app_with_config(&TriviewConfig::default(), &SyntheticCamera::new());
    install(&app, ReplayModel::new(person_and_cat())).await;
    app.dispatch(upload()).await.unwrap();
    app.dispatch(Event::Detect).await.unwrap();

    // Left edge of the person box at x=10, midway down.
    app.with_surface(ViewKind::Yolo, |surface| {
        assert_eq!(surface.image().get_pixel(10, 50), &Color::GREEN.to_rgba());
        assert_eq!(surface.image().get_pixel(30, 50), &Rgba([40, 40, 40, 255]));
    });
    app.with_surface(ViewKind::Rcnn, |surface| {
        assert_eq!(surface.image().get_pixel(10, 50), &Color::RED.to_rgba());
        // The cat is below the RCNN threshold.
        assert_eq!(surface.image().get_pixel(100, 35), &Rgba([40, 40, 40, 255]));
        assert_eq!(surface.text_runs().len(), 1);
    });
}

#[tokio::test]
async fn removing_image_mid_detection_discards_the_result() {
    let gate = Rc::new(Notify::new());
    let app = app(&SyntheticCamera::new());
    install(
        &app,
        GatedModel {
            gate: gate.clone(),
            detections: person_and_cat(),
        },
    )
    .await;
    app.dispatch(upload()).await.unwrap();

    let (detect, remove) = tokio::join!(app.dispatch(Event::Detect), async {
        tokio::task::yield_now().await;
        let remove = app.dispatch(Event::RemoveImage).await;
        gate.notify_one();
        remove
    });

    detect.unwrap();
    remove.unwrap();
    assert_eq!(app.state(), PipelineState::NoInput);
    assert!(app.last_detections().is_none());
    for view in ViewKind::ALL {
        assert_eq!(app.panel_status(view), IDLE_STATUS);
        app.with_surface(view, |surface| assert_eq!(surface.box_count(), 0));
    }
    assert!(!notices(&app).contains(&"Detection completed!".to_string()));
}

#[tokio::test]
async fn replacing_upload_mid_detection_keeps_fresh_panels() {
    let gate = Rc::new(Notify::new());
    let app = app(&SyntheticCamera::new());
    install(
        &app,
        GatedModel {
            gate: gate.clone(),
            detections: person_and_cat(),
        },
    )
    .await;
    app.dispatch(upload()).await.unwrap();

    let (detect, replace) = tokio::join!(app.dispatch(Event::Detect), async {
        tokio::task::yield_now().await;
        let replace = app.dispatch(upload()).await;
        gate.notify_one();
        replace
    });

    detect.unwrap();
    replace.unwrap();
    assert_eq!(app.state(), PipelineState::ImageLoaded(ImageOrigin::Upload));
    assert!(app.last_detections().is_none());
    assert_eq!(app.panel_status(ViewKind::Yolo), IDLE_STATUS);
}

#[tokio::test]
async fn busy_capture_leaves_snapshot_and_panels_alone() {
    let gate = Rc::new(Notify::new());
    let camera = SyntheticCamera::new();
    let app = app(&camera);
    install(
        &app,
        GatedModel {
            gate: gate.clone(),
            detections: person_and_cat(),
        },
    )
    .await;
    app.dispatch(Event::StartCamera).await.unwrap();

    let (first, second) = tokio::join!(app.dispatch(Event::CaptureFrame), async {
        tokio::task::yield_now().await;
        let second = app.dispatch(Event::CaptureFrame).await;
        gate.notify_one();
        second
    });

    assert_eq!(second.unwrap_err(), PipelineError::Detect(DetectError::Busy));
    first.unwrap();
    assert_eq!(camera.stats().frames_captured, 1);
    assert_eq!(app.panel_status(ViewKind::Yolo), "Detected 2 objects (YOLO)");
    assert_eq!(app.last_detections().map(|set| set.len()), Some(2));
}
