use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;
use camposanto::app::subsystems::{
    AudioSystem, CameraControl, EnvironmentSystem, InstallationBuilder, PlantSystem, RenderSurface, UiSystem,
};
use camposanto::camera3d::Camera3D;
use camposanto::events::{SettingsEvent, SettingsPublisher};
use camposanto::placement::{PlantDescriptor, PlantPlacement};
use camposanto::scene::{NodeKind, Scene, SceneNode, Transform};
use camposanto::ui::UiOverlay;
use camposanto::Orchestrator;
use glam::Vec3;
use pollster::block_on;
use winit::dpi::PhysicalSize;
use winit::event::{DeviceId, ElementState, MouseButton, WindowEvent};

type Log = Rc<RefCell<Vec<String>>>;

fn record(log: &Log, entry: impl Into<String>) {
    log.borrow_mut().push(entry.into());
}

struct FakeRenderer {
    log: Log,
    size: PhysicalSize<u32>,
}

impl RenderSurface for FakeRenderer {
    fn size(&self) -> PhysicalSize<u32> {
        self.size
    }

    fn resize(&mut self, size: PhysicalSize<u32>) {
        record(&self.log, format!("renderer.resize {}x{}", size.width, size.height));
        self.size = size;
    }

    fn render(&mut self, scene: &Scene, _camera: &Camera3D, _overlay: Option<&UiOverlay>) -> Result<()> {
        record(&self.log, format!("renderer.render {}", scene.len()));
        Ok(())
    }

    fn request_redraw(&self) {
        record(&self.log, "renderer.request_redraw");
    }
}

struct FakeEnvironment {
    log: Log,
    layout: Vec<PlantPlacement>,
}

impl EnvironmentSystem for FakeEnvironment {
    fn plant_layout(&self) -> Vec<PlantPlacement> {
        self.layout.clone()
    }

    fn update(&mut self, _scene: &mut Scene, _elapsed: f32) {
        record(&self.log, "environment.update");
    }
}

struct FakePlants {
    log: Log,
    fail_on: Option<String>,
}

impl PlantSystem for FakePlants {
    async fn add_plant(&mut self, scene: &mut Scene, descriptor: PlantDescriptor) -> Result<()> {
        if self.fail_on.as_deref() == Some(descriptor.name.as_str()) {
            anyhow::bail!("no sample for {}", descriptor.name);
        }
        let p = descriptor.position;
        record(
            &self.log,
            format!("plants.add {} ({}, {}, {}) {} {}", descriptor.name, p.x, p.y, p.z, descriptor.audio_file, descriptor.scale),
        );
        scene.add_node(SceneNode::new(
            descriptor.name,
            NodeKind::Plant,
            Transform::from_translation_scale(p, Vec3::splat(descriptor.scale)),
            Vec3::ONE,
        ));
        Ok(())
    }

    fn update(&mut self, _scene: &mut Scene, _dt: f32, observer: Vec3) {
        record(&self.log, format!("plants.update z={}", observer.z));
    }

    fn set_audio_volume(&mut self, volume: f32) {
        record(&self.log, format!("plants.volume {volume}"));
    }
}

struct FakeAudio {
    log: Log,
}

impl AudioSystem for FakeAudio {
    fn update(&mut self) {
        record(&self.log, "audio.update");
    }

    fn set_master_volume(&mut self, volume: f32) {
        record(&self.log, format!("audio.volume {volume}"));
    }
}

struct FakeController {
    log: Log,
}

impl CameraControl for FakeController {
    fn update(&mut self, camera: &mut Camera3D, _dt: f32) {
        record(&self.log, "controller.update");
        camera.position.z -= 1.0;
    }

    fn set_mouse_sensitivity(&mut self, sensitivity: f32) {
        record(&self.log, format!("controller.sensitivity {sensitivity}"));
    }

    fn set_move_speed(&mut self, speed: f32) {
        record(&self.log, format!("controller.speed {speed}"));
    }

    fn handle_window_event(&mut self, event: &WindowEvent) {
        let name = match event {
            WindowEvent::MouseInput { state, .. } => format!("mouse {state:?}"),
            WindowEvent::Focused(focused) => format!("focused {focused}"),
            _ => "other".to_string(),
        };
        record(&self.log, format!("controller.event {name}"));
    }
}

struct FakeUi {
    log: Log,
    publisher: SettingsPublisher,
    outgoing: Vec<(String, f32)>,
    captures_pointer: bool,
}

impl UiSystem for FakeUi {
    fn update(&mut self) {
        record(&self.log, "ui.update");
        for (kind, value) in self.outgoing.drain(..) {
            self.publisher.publish_wire(&kind, value);
        }
    }

    fn handle_window_event(&mut self, _event: &WindowEvent) -> bool {
        self.captures_pointer
    }
}

struct FakeBuilder {
    log: Log,
    layout: Vec<PlantPlacement>,
    ui_outgoing: Vec<(String, f32)>,
    ui_early: Vec<SettingsEvent>,
    ui_captures_pointer: bool,
    fail_on: Option<String>,
}

impl FakeBuilder {
    fn new(layout: Vec<PlantPlacement>) -> (Self, Log) {
        let log: Log = Rc::default();
        let builder = Self {
            log: log.clone(),
            layout,
            ui_outgoing: Vec::new(),
            ui_early: Vec::new(),
            ui_captures_pointer: false,
            fail_on: None,
        };
        (builder, log)
    }
}

impl InstallationBuilder for FakeBuilder {
    type Renderer = FakeRenderer;
    type Environment = FakeEnvironment;
    type Plants = FakePlants;
    type Audio = FakeAudio;
    type Controller = FakeController;
    type Ui = FakeUi;

    fn create_renderer(&mut self) -> Result<FakeRenderer> {
        record(&self.log, "create_renderer");
        Ok(FakeRenderer { log: self.log.clone(), size: PhysicalSize::new(800, 600) })
    }

    fn create_camera(&mut self, _surface: PhysicalSize<u32>) -> Result<Camera3D> {
        record(&self.log, "create_camera");
        Ok(Camera3D::new(Vec3::new(0.0, 1.7, 10.0), Vec3::new(0.0, 1.7, 0.0), 1.2, 0.1, 100.0))
    }

    fn create_environment(&mut self, _scene: &mut Scene, _renderer: &mut FakeRenderer) -> Result<FakeEnvironment> {
        record(&self.log, "create_environment");
        Ok(FakeEnvironment { log: self.log.clone(), layout: self.layout.clone() })
    }

    fn create_plants(&mut self, _scene: &mut Scene) -> Result<FakePlants> {
        record(&self.log, "create_plants");
        Ok(FakePlants { log: self.log.clone(), fail_on: self.fail_on.clone() })
    }

    fn create_audio(&mut self) -> Result<FakeAudio> {
        record(&self.log, "create_audio");
        Ok(FakeAudio { log: self.log.clone() })
    }

    fn create_camera_controller(&mut self, _camera: &Camera3D, _renderer: &FakeRenderer) -> Result<FakeController> {
        record(&self.log, "create_camera_controller");
        Ok(FakeController { log: self.log.clone() })
    }

    fn create_ui(&mut self, _renderer: &FakeRenderer, settings: SettingsPublisher) -> Result<FakeUi> {
        record(&self.log, "create_ui");
        for event in self.ui_early.drain(..) {
            settings.publish(event);
        }
        Ok(FakeUi {
            log: self.log.clone(),
            publisher: settings,
            outgoing: std::mem::take(&mut self.ui_outgoing),
            captures_pointer: self.ui_captures_pointer,
        })
    }
}

fn garden() -> Vec<PlantPlacement> {
    vec![
        PlantPlacement::new("Lavanda", Vec3::new(1.0, 5.0, 2.0), 1.0),
        PlantPlacement::new("Romero", Vec3::new(-3.0, 0.0, 4.0), 0.8),
    ]
}

fn take(log: &Log) -> Vec<String> {
    std::mem::take(&mut *log.borrow_mut())
}

#[test]
fn init_builds_subsystems_in_order_then_places_plants() {
    let (builder, log) = FakeBuilder::new(garden());
    let orchestrator = block_on(Orchestrator::init(builder)).expect("init");
    assert_eq!(
        take(&log),
        vec![
            "create_renderer",
            "create_camera",
            "create_environment",
            "create_plants",
            "create_audio",
            "create_camera_controller",
            "create_ui",
            "plants.add Lavanda (1, 0.02, 2) lavanda.mp3 1",
            "plants.add Romero (-3, 0.02, 4) romero.wav 0.8",
        ]
    );
    let camera = orchestrator.camera();
    assert!((camera.aspect() - 800.0 / 600.0).abs() < 1e-6);
    let scene = orchestrator.scene();
    assert_eq!(scene.count(NodeKind::Plant), 2);
    let lavanda = scene.node(scene.find("Lavanda").expect("lavanda")).expect("node");
    assert_eq!(lavanda.transform.translation, Vec3::new(1.0, 0.02, 2.0));
    assert_eq!(orchestrator.frame_count(), 0);
}

#[test]
fn placement_is_deterministic_across_runs() {
    let layout: Vec<PlantPlacement> = (0..6)
        .map(|i| PlantPlacement::new(format!("Planta {i}"), Vec3::new(i as f32, 5.0, -(i as f32)), 0.5))
        .collect();
    let run = || {
        let (builder, log) = FakeBuilder::new(layout.clone());
        block_on(Orchestrator::init(builder)).expect("init");
        take(&log).into_iter().filter(|entry| entry.starts_with("plants.add")).collect::<Vec<_>>()
    };
    let first = run();
    assert_eq!(first.len(), 6);
    assert_eq!(first[3], "plants.add Planta 3 (3, 0.02, -3) planta_3.wav 0.5");
    assert_eq!(first, run());
}

#[test]
fn invalid_placement_aborts_init() {
    let mut layout = garden();
    layout.push(PlantPlacement::new("Ruda", Vec3::ZERO, -1.0));
    layout.push(PlantPlacement::new("Salvia", Vec3::ZERO, 1.0));
    let (builder, log) = FakeBuilder::new(layout);
    let err = block_on(Orchestrator::init(builder)).err().expect("init must fail");
    assert!(format!("{err:#}").contains("Ruda"), "{err:#}");
    assert!(!take(&log).iter().any(|entry| entry.contains("Salvia")));
}

#[test]
fn failed_add_plant_stops_the_remaining_placements() {
    let mut layout = garden();
    layout.push(PlantPlacement::new("Salvia", Vec3::new(6.0, 0.0, 1.0), 1.0));
    let (mut builder, log) = FakeBuilder::new(layout);
    builder.fail_on = Some("Romero".into());
    let err = block_on(Orchestrator::init(builder)).err().expect("init must fail");
    let message = format!("{err:#}");
    assert!(message.contains("Failed to place plant 'Romero'"), "{message}");
    assert!(message.contains("no sample for Romero"), "{message}");
    let placed: Vec<String> = take(&log).into_iter().filter(|entry| entry.starts_with("plants.add")).collect();
    assert_eq!(placed, vec!["plants.add Lavanda (1, 0.02, 2) lavanda.mp3 1"]);
}

#[test]
fn duplicate_plant_names_abort_init() {
    let mut layout = garden();
    layout.push(PlantPlacement::new("Romero", Vec3::new(9.0, 0.0, 9.0), 1.0));
    let (builder, _log) = FakeBuilder::new(layout);
    assert!(block_on(Orchestrator::init(builder)).is_err());
}

#[test]
fn frame_moves_camera_before_plants_and_renders_last() {
    let (builder, log) = FakeBuilder::new(garden());
    let mut orchestrator = block_on(Orchestrator::init(builder)).expect("init");
    take(&log);
    let tick = orchestrator.frame().expect("frame");
    assert_eq!(tick.frame, 1);
    assert_eq!(
        take(&log),
        vec![
            "controller.update",
            "plants.update z=9",
            "audio.update",
            "ui.update",
            "environment.update",
            "renderer.render 2",
        ]
    );
    orchestrator.frame().expect("second frame");
    assert!(take(&log).contains(&"plants.update z=8".to_string()));
    assert_eq!(orchestrator.frame_count(), 2);
}

#[test]
fn request_next_frame_asks_the_renderer() {
    let (builder, log) = FakeBuilder::new(Vec::new());
    let orchestrator = block_on(Orchestrator::init(builder)).expect("init");
    take(&log);
    orchestrator.request_next_frame();
    assert_eq!(take(&log), vec!["renderer.request_redraw"]);
}

#[test]
fn settings_events_reach_their_setter_unchanged() {
    let (builder, log) = FakeBuilder::new(Vec::new());
    let mut orchestrator = block_on(Orchestrator::init(builder)).expect("init");
    take(&log);
    orchestrator.dispatch(SettingsEvent::MouseSensitivity(0.004));
    orchestrator.dispatch(SettingsEvent::MoveSpeed(7.5));
    orchestrator.dispatch(SettingsEvent::AudioVolume(0.25));
    assert_eq!(
        take(&log),
        vec!["controller.sensitivity 0.004", "controller.speed 7.5", "plants.volume 0.25", "audio.volume 0.25"]
    );
    assert!(SettingsEvent::from_wire("brightness", 1.0).is_none());
}

#[test]
fn ui_changes_are_applied_when_settings_are_pumped() {
    let (mut builder, log) = FakeBuilder::new(Vec::new());
    builder.ui_outgoing = vec![("move-speed".into(), 5.5), ("brightness".into(), 2.0), ("audio-volume".into(), 0.1)];
    let mut orchestrator = block_on(Orchestrator::init(builder)).expect("init");
    orchestrator.frame().expect("frame");
    take(&log);
    assert_eq!(orchestrator.pump_settings(), 2);
    assert_eq!(take(&log), vec!["controller.speed 5.5", "plants.volume 0.1", "audio.volume 0.1"]);
    assert_eq!(orchestrator.pump_settings(), 0);
}

#[test]
fn resize_updates_camera_and_renderer_idempotently() {
    let (builder, log) = FakeBuilder::new(Vec::new());
    let mut orchestrator = block_on(Orchestrator::init(builder)).expect("init");
    take(&log);
    let size = PhysicalSize::new(1024, 512);
    orchestrator.resize(size);
    let aspect = orchestrator.camera().aspect();
    let projection = orchestrator.camera().projection_matrix();
    orchestrator.resize(size);
    assert!((aspect - 2.0).abs() < 1e-6);
    assert_eq!(orchestrator.camera().aspect(), aspect);
    assert_eq!(orchestrator.camera().projection_matrix(), projection);
    assert_eq!(orchestrator.renderer().size(), size);
    assert_eq!(take(&log), vec!["renderer.resize 1024x512", "renderer.resize 1024x512"]);

    orchestrator.resize(PhysicalSize::new(0, 0));
    assert_eq!(orchestrator.camera().aspect(), aspect);
}

#[test]
fn events_published_before_the_loop_wait_for_the_first_pump() {
    let (mut builder, log) = FakeBuilder::new(garden());
    builder.ui_early = vec![SettingsEvent::MouseSensitivity(0.003)];
    let mut orchestrator = block_on(Orchestrator::init(builder)).expect("init");
    assert!(!take(&log).iter().any(|entry| entry.starts_with("controller.sensitivity")));
    assert_eq!(orchestrator.pump_settings(), 1);
    assert_eq!(take(&log), vec!["controller.sensitivity 0.003"]);
}

fn mouse_button(state: ElementState) -> WindowEvent {
    // SAFETY: the id is only compared, never handed to the platform.
    let device_id = unsafe { DeviceId::dummy() };
    WindowEvent::MouseInput { device_id, state, button: MouseButton::Right }
}

#[test]
fn releases_reach_the_controller_even_when_the_ui_consumes_them() {
    let (mut builder, log) = FakeBuilder::new(Vec::new());
    builder.ui_captures_pointer = true;
    let mut orchestrator = block_on(Orchestrator::init(builder)).expect("init");
    take(&log);
    orchestrator.handle_window_event(&mouse_button(ElementState::Pressed));
    orchestrator.handle_window_event(&WindowEvent::Focused(true));
    assert!(take(&log).is_empty());
    orchestrator.handle_window_event(&mouse_button(ElementState::Released));
    orchestrator.handle_window_event(&WindowEvent::Focused(false));
    assert_eq!(take(&log), vec!["controller.event mouse Released", "controller.event focused false"]);
}

#[test]
fn unconsumed_events_reach_the_controller() {
    let (builder, log) = FakeBuilder::new(Vec::new());
    let mut orchestrator = block_on(Orchestrator::init(builder)).expect("init");
    take(&log);
    orchestrator.handle_window_event(&mouse_button(ElementState::Pressed));
    assert_eq!(take(&log), vec!["controller.event mouse Pressed"]);
}
