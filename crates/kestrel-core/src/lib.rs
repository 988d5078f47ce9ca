pub mod bus;
pub mod config;
pub mod context;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod frame_sync;
pub mod message;
pub mod registry;
pub mod render;
pub mod scheduler;
pub mod shutdown;

pub use bus::MessageBus;
pub use config::EngineConfig;
pub use context::EngineContext;
pub use dispatcher::ComponentDispatcher;
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use frame_sync::{FrameDevice, FrameOutcome, FrameSync, ImageAcquire, PresentStatus};
pub use message::{Message, MessageKind};
pub use registry::{
    Camera, Collector, ComponentHandle, ComponentId, ComponentRegistry, Drawable, EarlyUpdatable,
    FixedUpdatable, LateUpdatable, Startable, Updatable, WeakHandle,
};
pub use render::{FramePlan, RenderBackend, RenderManager};
pub use scheduler::{FrameScheduler, LoopState};
pub use shutdown::ShutdownToken;
