use crate::error::VkResult;

use ash::vk;
use ash::Device;

/// CPU/GPU handshake state for one in-flight frame.
///
/// The fence starts signaled so the first wait on a fresh slot returns
/// immediately. Command buffers are owned per slot and re-recorded every
/// frame, so they survive swapchain rebuilds untouched.
pub(super) struct FrameSlot {
    pub fence: vk::Fence,
    pub image_available: vk::Semaphore,
    pub work_finished: vk::Semaphore,
    pub command_buffer: vk::CommandBuffer,
}

pub(super) unsafe fn create_slots(
    device: &Device,
    command_pool: vk::CommandPool,
    count: usize,
) -> VkResult<Vec<FrameSlot>> {
    let command_buffers = device.allocate_command_buffers(
        &vk::CommandBufferAllocateInfo::default()
            .command_pool(command_pool)
            .level(vk::CommandBufferLevel::PRIMARY)
            .command_buffer_count(count as u32),
    )?;

    let mut slots = Vec::with_capacity(count);
    for cmd in command_buffers {
        let fence = device.create_fence(
            &vk::FenceCreateInfo::default().flags(vk::FenceCreateFlags::SIGNALED),
            None,
        )?;
        let image_available = device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None)?;
        let work_finished = device.create_semaphore(&vk::SemaphoreCreateInfo::default(), None)?;

        slots.push(FrameSlot {
            fence,
            image_available,
            work_finished,
            command_buffer: cmd,
        });
    }
    Ok(slots)
}

pub(super) unsafe fn destroy_slots(device: &Device, slots: &mut Vec<FrameSlot>) {
    for slot in slots.drain(..) {
        device.destroy_fence(slot.fence, None);
        device.destroy_semaphore(slot.image_available, None);
        device.destroy_semaphore(slot.work_finished, None);
    }
}
