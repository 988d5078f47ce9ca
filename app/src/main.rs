use kestrel_core::error::EngineResult;
use kestrel_core::registry::{Camera, ComponentHandle, ComponentId, Drawable, Updatable, WeakHandle};
use kestrel_core::render::RenderBackend;
use kestrel_core::{Engine, EngineConfig, EngineError, Message};
use kestrel_platform_winit::{run_winit_app, BackendFactory};
use kestrel_render_vulkan_ash::VulkanBackend;

use std::cell::RefCell;
use std::io::Write;
use std::path::Path;
use std::rc::Rc;

const CONFIG_PATH: &str = "kestrel.toml";

/// Slowly cycles the clear color so a presented frame is visibly live.
struct SkyCamera {
    phase: f32,
}

impl Camera for SkyCamera {
    fn clear_color(&self) -> [f32; 4] {
        let t = self.phase;
        [
            0.10 + 0.05 * t.sin(),
            0.12 + 0.05 * (t * 0.7).sin(),
            0.16 + 0.05 * (t * 1.3).cos(),
            1.0,
        ]
    }
}

impl Updatable for SkyCamera {
    fn on_update(&mut self, dt: f32) -> EngineResult<()> {
        self.phase += dt;
        Ok(())
    }
}

struct Triangle;

impl Drawable for Triangle {}

fn init_logging() {
    let mut builder = env_logger::Builder::new();

    let level = std::env::var("KESTREL_LOG")
        .ok()
        .and_then(|v| v.parse::<log::LevelFilter>().ok())
        .unwrap_or(log::LevelFilter::Info);
    builder.filter_level(level);

    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{:<5}] {:<24} {}",
            record.level(),
            record.target(),
            record.args()
        )
    });

    let _ = builder.try_init();
}

fn load_config() -> EngineConfig {
    if !Path::new(CONFIG_PATH).exists() {
        return EngineConfig::default();
    }
    match EngineConfig::load_toml(CONFIG_PATH) {
        Ok(cfg) => cfg,
        Err(e) => {
            log::warn!("failed to load {CONFIG_PATH}: {e}; using defaults");
            EngineConfig::default()
        }
    }
}

fn main() -> anyhow::Result<()> {
    init_logging();

    let mut engine = Engine::new(load_config());

    let camera: ComponentHandle<SkyCamera> = Rc::new(RefCell::new(SkyCamera { phase: 0.0 }));
    {
        let registry = engine.context().registry();
        let cam_id = ComponentId::next();

        let as_camera: WeakHandle<dyn Camera> = Rc::<RefCell<SkyCamera>>::downgrade(&camera);
        registry.cameras.borrow_mut().add(cam_id, as_camera);

        let as_updatable: WeakHandle<dyn Updatable> = Rc::<RefCell<SkyCamera>>::downgrade(&camera);
        registry.updatable.borrow_mut().add(cam_id, as_updatable);
    }

    let triangle: ComponentHandle<Triangle> = Rc::new(RefCell::new(Triangle));
    {
        let as_drawable: WeakHandle<dyn Drawable> = Rc::<RefCell<Triangle>>::downgrade(&triangle);
        engine
            .context()
            .registry()
            .drawables
            .borrow_mut()
            .add(ComponentId::next(), as_drawable);
    }

    let token = engine.shutdown_token();
    ctrlc::set_handler(move || token.request())?;

    engine.send(&Message::SceneLoaded {
        scene: "demo".to_string(),
    });
    engine.send(&Message::GameLogicStart);

    let frames_in_flight = engine.config().render.frames_in_flight();
    let factory: BackendFactory = Box::new(move |display, window, width, height| {
        let backend = unsafe { VulkanBackend::new(display, window, width, height, frames_in_flight) }
            .map_err(EngineError::from)?;
        Ok(Box::new(backend) as Box<dyn RenderBackend>)
    });

    run_winit_app(engine, factory)?;

    // Registrations are weak; the handles above keep the demo scene alive
    // until the loop returns.
    drop(camera);
    drop(triangle);

    Ok(())
}
