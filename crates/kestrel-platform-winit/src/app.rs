use kestrel_core::error::{EngineError, EngineResult};
use kestrel_core::render::RenderBackend;
use kestrel_core::Engine;

use raw_window_handle::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};
use winit::{
    application::ApplicationHandler,
    dpi::{LogicalSize, PhysicalSize},
    event::{ElementState, WindowEvent},
    event_loop::{ActiveEventLoop, EventLoop},
    keyboard::{KeyCode, PhysicalKey},
    window::{Window, WindowAttributes, WindowId},
};

/// Builds the render backend once the surface exists. Called from `resumed`
/// with the raw window handles and the initial drawable size.
pub type BackendFactory = Box<
    dyn FnMut(
        RawDisplayHandle,
        RawWindowHandle,
        u32,
        u32,
    ) -> EngineResult<Box<dyn RenderBackend>>,
>;

struct App {
    engine: Engine,
    factory: Option<BackendFactory>,
    window: Option<Window>,
    /// Startup failure to report once the event loop returns; winit's
    /// callbacks cannot propagate errors themselves.
    fatal: Option<EngineError>,
}

impl App {
    #[inline]
    fn new(engine: Engine, factory: BackendFactory) -> Self {
        Self {
            engine,
            factory: Some(factory),
            window: None,
            fatal: None,
        }
    }

    fn record_fatal(&mut self, e: EngineError) {
        if self.fatal.is_none() {
            self.fatal = Some(e);
        }
    }

    fn finish(&mut self) -> EngineResult<()> {
        match self.fatal.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    #[inline]
    fn request_redraw(&self) {
        if let Some(w) = &self.window {
            w.request_redraw();
        }
    }

    #[inline]
    fn surface_size(&self) -> (u32, u32) {
        match &self.window {
            Some(w) => {
                let PhysicalSize { width, height } = w.inner_size();
                (width, height)
            }
            None => (0, 0),
        }
    }

    fn quit(&mut self, event_loop: &ActiveEventLoop) {
        if let Err(e) = self.engine.shutdown() {
            log::warn!("shutdown incomplete: {e}");
        }
        event_loop.exit();
    }

    fn install_backend(&mut self) -> EngineResult<()> {
        let Some(w) = &self.window else {
            return Err(EngineError::other("no window for backend creation"));
        };

        let window = w
            .window_handle()
            .map_err(|e| EngineError::other(e.to_string()))?
            .as_raw();
        let display = w
            .display_handle()
            .map_err(|e| EngineError::other(e.to_string()))?
            .as_raw();

        let PhysicalSize { width, height } = w.inner_size();

        let Some(mut factory) = self.factory.take() else {
            // Suspended/resumed cycle; the backend already exists.
            return Ok(());
        };

        let backend = factory(display, window, width, height)?;
        self.engine.install_backend(backend);
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_none() {
            let win_cfg = &self.engine.config().window;
            let attrs = WindowAttributes::default()
                .with_title(win_cfg.title.clone())
                .with_inner_size(LogicalSize::new(win_cfg.width, win_cfg.height));

            match event_loop.create_window(attrs) {
                Ok(w) => self.window = Some(w),
                Err(e) => {
                    log::error!("window creation failed: {e}");
                    self.record_fatal(EngineError::other(format!("window creation failed: {e}")));
                    event_loop.exit();
                    return;
                }
            }
        }

        if let Err(e) = self.install_backend() {
            log::error!("render backend creation failed: {e}");
            self.record_fatal(e);
            self.quit(event_loop);
            return;
        }

        self.engine.start();
        self.request_redraw();
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                self.quit(event_loop);
            }

            WindowEvent::Resized(PhysicalSize { width, height }) => {
                self.engine.notify_resize(width, height);
            }

            WindowEvent::ScaleFactorChanged { .. } => {
                let (w, h) = self.surface_size();
                self.engine.notify_resize(w, h);
            }

            WindowEvent::KeyboardInput { event, .. } => {
                if event.state == ElementState::Pressed
                    && event.physical_key == PhysicalKey::Code(KeyCode::Escape)
                {
                    self.quit(event_loop);
                }
            }

            _ => {}
        }
    }

    fn about_to_wait(&mut self, event_loop: &ActiveEventLoop) {
        match self.engine.step(self.surface_size()) {
            Ok(()) => self.request_redraw(),
            Err(EngineError::ExitRequested) => self.quit(event_loop),
            Err(e) => {
                log::error!("engine step failed: {e}");
                self.quit(event_loop);
            }
        }
    }
}

/// Hands the engine to winit's inverted control flow. Blocks until the
/// window closes or the engine requests exit.
pub fn run_winit_app(engine: Engine, factory: BackendFactory) -> EngineResult<()> {
    let event_loop = EventLoop::new().map_err(|e| EngineError::other(e.to_string()))?;
    let mut app = App::new(engine, factory);

    event_loop
        .run_app(&mut app)
        .map_err(|e| EngineError::other(e.to_string()))?;

    app.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kestrel_core::EngineConfig;

    #[test]
    fn startup_failure_is_carried_out_of_the_run() {
        let engine = Engine::new(EngineConfig::default());
        let factory: BackendFactory =
            Box::new(|_, _, _, _| Err(EngineError::other("no vulkan driver")));
        let mut app = App::new(engine, factory);

        // No window exists yet, so backend installation must fail; the
        // failure must survive until after the loop returns.
        let err = app.install_backend().unwrap_err();
        app.record_fatal(err);

        assert!(app.finish().is_err());
        assert!(app.finish().is_ok());
    }

    #[test]
    fn first_fatal_error_wins() {
        let engine = Engine::new(EngineConfig::default());
        let factory: BackendFactory = Box::new(|_, _, _, _| Err(EngineError::other("unused")));
        let mut app = App::new(engine, factory);

        app.record_fatal(EngineError::other("first"));
        app.record_fatal(EngineError::other("second"));

        match app.finish() {
            Err(EngineError::Other(msg)) => assert_eq!(msg, "first"),
            other => panic!("expected the first error, got {other:?}"),
        }
    }
}
