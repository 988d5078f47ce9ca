//! Vulkan render backend built on ash.
//!
//! [`VulkanDevice`] implements the frame-slot device contract from
//! `kestrel-core`; [`VulkanBackend`] wraps it in the core frame-sync driver
//! and exposes the engine-facing backend trait.

mod error;
mod vulkan;

pub use error::{VkRenderError, VkResult};
pub use vulkan::VulkanDevice;

use kestrel_core::error::EngineResult;
use kestrel_core::frame_sync::{FrameOutcome, FrameSync};
use kestrel_core::render::{FramePlan, RenderBackend};
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

pub struct VulkanBackend {
    sync: FrameSync<VulkanDevice>,
}

impl VulkanBackend {
    /// # Safety
    ///
    /// `display` and `window` must refer to a live window that outlives the
    /// returned backend.
    pub unsafe fn new(
        display: RawDisplayHandle,
        window: RawWindowHandle,
        width: u32,
        height: u32,
        frames_in_flight: usize,
    ) -> VkResult<Self> {
        let device = VulkanDevice::new(display, window, width, height, frames_in_flight)?;
        Ok(Self {
            sync: FrameSync::new(device, width, height),
        })
    }

    #[inline]
    pub fn device(&self) -> &VulkanDevice {
        self.sync.device()
    }
}

impl RenderBackend for VulkanBackend {
    fn render_frame(&mut self, plan: &FramePlan) -> EngineResult<FrameOutcome> {
        self.sync.render_frame(plan)
    }

    fn note_resize(&mut self, width: u32, height: u32) {
        self.sync.request_rebuild(width, height);
    }

    fn wait_idle(&mut self) -> EngineResult<()> {
        self.sync.wait_idle()
    }
}
