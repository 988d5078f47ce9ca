mod device;
mod instance;
mod pipeline;
mod slots;
mod swapchain;
mod util;

pub use device::VulkanDevice;
