use kestrel_core::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VkRenderError {
    #[error("Vulkan error: {0}")]
    Vk(#[from] ash::vk::Result),

    #[error("ash-window error: {0}")]
    AshWindow(String),

    #[error("no suitable physical device found")]
    NoSuitableDevice,
}

pub type VkResult<T> = Result<T, VkRenderError>;

impl From<VkRenderError> for EngineError {
    fn from(e: VkRenderError) -> Self {
        EngineError::Render(e.to_string())
    }
}
