pub mod app;

pub use app::{run_winit_app, BackendFactory};
