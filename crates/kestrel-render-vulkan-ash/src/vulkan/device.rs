use crate::error::{VkRenderError, VkResult};

use super::instance::{create_device, create_instance, pick_physical_device};
use super::pipeline::{create_framebuffers, create_pipeline, create_render_pass};
use super::slots::{create_slots, destroy_slots, FrameSlot};
use super::swapchain::{create_image_views, create_swapchain};
use super::util::transition_image;

use ash::vk;
use ash::{Device, Entry, Instance};
use kestrel_core::error::EngineResult;
use kestrel_core::frame_sync::{FrameDevice, ImageAcquire, PresentStatus};
use kestrel_core::render::FramePlan;
use raw_window_handle::{RawDisplayHandle, RawWindowHandle};

/// Owns the Vulkan objects for one window surface and serves the frame-slot
/// protocol over them.
pub struct VulkanDevice {
    instance: Instance,

    surface_loader: ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,

    physical_device: vk::PhysicalDevice,
    device: Device,

    queue_family_index: u32,
    queue: vk::Queue,

    swapchain_loader: ash::khr::swapchain::Device,
    swapchain: vk::SwapchainKHR,
    swapchain_images: Vec<vk::Image>,
    swapchain_image_views: Vec<vk::ImageView>,
    swapchain_format: vk::Format,
    extent: vk::Extent2D,
    image_layouts: Vec<vk::ImageLayout>,

    render_pass: vk::RenderPass,
    pipeline_layout: vk::PipelineLayout,
    pipeline: vk::Pipeline,
    framebuffers: Vec<vk::Framebuffer>,

    command_pool: vk::CommandPool,
    slots: Vec<FrameSlot>,
}

impl VulkanDevice {
    /// # Safety
    ///
    /// `display` and `window` must refer to a live window that outlives the
    /// returned device.
    pub unsafe fn new(
        display: RawDisplayHandle,
        window: RawWindowHandle,
        width: u32,
        height: u32,
        frames_in_flight: usize,
    ) -> VkResult<Self> {
        let entry = Entry::load().map_err(|e| VkRenderError::AshWindow(e.to_string()))?;
        let instance = create_instance(&entry, display)?;

        let surface = ash_window::create_surface(&entry, &instance, display, window, None)
            .map_err(|e| VkRenderError::AshWindow(e.to_string()))?;
        let surface_loader = ash::khr::surface::Instance::new(&entry, &instance);

        let (physical_device, queue_family_index) =
            pick_physical_device(&instance, &surface_loader, surface)?;

        let (device, queue) = create_device(&instance, physical_device, queue_family_index)?;
        let swapchain_loader = ash::khr::swapchain::Device::new(&instance, &device);

        let (swapchain, swapchain_images, swapchain_format, extent) = create_swapchain(
            &swapchain_loader,
            &surface_loader,
            surface,
            physical_device,
            width,
            height,
            queue_family_index,
        )?;

        let swapchain_image_views =
            create_image_views(&device, &swapchain_images, swapchain_format)?;
        let image_layouts = vec![vk::ImageLayout::UNDEFINED; swapchain_images.len()];

        let render_pass = create_render_pass(&device, swapchain_format)?;
        let (pipeline_layout, pipeline) = create_pipeline(&device, render_pass)?;
        let framebuffers =
            create_framebuffers(&device, render_pass, &swapchain_image_views, extent)?;

        let command_pool = device.create_command_pool(
            &vk::CommandPoolCreateInfo::default()
                .queue_family_index(queue_family_index)
                .flags(vk::CommandPoolCreateFlags::RESET_COMMAND_BUFFER),
            None,
        )?;

        let slots = create_slots(&device, command_pool, frames_in_flight.max(1))?;

        log::info!(
            "Vulkan device ready: {}x{} swapchain, {} images, {} frames in flight",
            extent.width,
            extent.height,
            swapchain_images.len(),
            slots.len()
        );

        Ok(Self {
            instance,

            surface_loader,
            surface,

            physical_device,
            device,

            queue_family_index,
            queue,

            swapchain_loader,
            swapchain,
            swapchain_images,
            swapchain_image_views,
            swapchain_format,
            extent,
            image_layouts,

            render_pass,
            pipeline_layout,
            pipeline,
            framebuffers,

            command_pool,
            slots,
        })
    }

    unsafe fn recreate_swapchain(&mut self, width: u32, height: u32) -> VkResult<()> {
        if width == 0 || height == 0 {
            return Ok(());
        }

        let _ = self.device.device_wait_idle();

        for &fb in &self.framebuffers {
            self.device.destroy_framebuffer(fb, None);
        }
        self.framebuffers.clear();

        for &iv in &self.swapchain_image_views {
            self.device.destroy_image_view(iv, None);
        }
        self.swapchain_image_views.clear();

        self.swapchain_loader
            .destroy_swapchain(self.swapchain, None);

        let (swapchain, swapchain_images, swapchain_format, extent) = create_swapchain(
            &self.swapchain_loader,
            &self.surface_loader,
            self.surface,
            self.physical_device,
            width,
            height,
            self.queue_family_index,
        )?;

        let swapchain_image_views =
            create_image_views(&self.device, &swapchain_images, swapchain_format)?;

        if swapchain_format != self.swapchain_format {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device
                .destroy_pipeline_layout(self.pipeline_layout, None);
            self.device.destroy_render_pass(self.render_pass, None);

            self.swapchain_format = swapchain_format;
            self.render_pass = create_render_pass(&self.device, self.swapchain_format)?;
            let (pl, p) = create_pipeline(&self.device, self.render_pass)?;
            self.pipeline_layout = pl;
            self.pipeline = p;
        }

        let framebuffers = create_framebuffers(
            &self.device,
            self.render_pass,
            &swapchain_image_views,
            extent,
        )?;

        self.swapchain = swapchain;
        self.swapchain_images = swapchain_images;
        self.swapchain_image_views = swapchain_image_views;
        self.extent = extent;
        self.framebuffers = framebuffers;
        self.image_layouts = vec![vk::ImageLayout::UNDEFINED; self.swapchain_images.len()];

        Ok(())
    }
}

impl FrameDevice for VulkanDevice {
    fn slot_count(&self) -> usize {
        self.slots.len()
    }

    fn wait_fence(&mut self, slot: usize) -> EngineResult<()> {
        let fence = self.slots[slot].fence;
        unsafe {
            self.device
                .wait_for_fences(&[fence], true, u64::MAX)
                .map_err(VkRenderError::from)?;
        }
        Ok(())
    }

    fn reset_fence(&mut self, slot: usize) -> EngineResult<()> {
        let fence = self.slots[slot].fence;
        unsafe {
            self.device
                .reset_fences(&[fence])
                .map_err(VkRenderError::from)?;
        }
        Ok(())
    }

    fn restore_fence(&mut self, slot: usize) -> EngineResult<()> {
        let fence = self.slots[slot].fence;
        // An empty submission signals the fence once prior queue work
        // drains, making the slot waitable again.
        unsafe {
            self.device
                .queue_submit(self.queue, &[], fence)
                .map_err(VkRenderError::from)?;
        }
        Ok(())
    }

    fn acquire_image(&mut self, slot: usize) -> EngineResult<ImageAcquire> {
        let sem = self.slots[slot].image_available;
        match unsafe {
            self.swapchain_loader
                .acquire_next_image(self.swapchain, u64::MAX, sem, vk::Fence::null())
        } {
            Ok((index, _suboptimal)) => Ok(ImageAcquire::Acquired(index)),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) => Ok(ImageAcquire::OutOfDate),
            Err(e) => Err(VkRenderError::from(e).into()),
        }
    }

    fn record(&mut self, slot: usize, image: u32, plan: &FramePlan) -> EngineResult<()> {
        let cmd = self.slots[slot].command_buffer;
        let idx = image as usize;
        let target = self.swapchain_images[idx];
        let old_layout = self.image_layouts[idx];

        unsafe {
            self.device
                .reset_command_buffer(cmd, vk::CommandBufferResetFlags::empty())
                .map_err(VkRenderError::from)?;

            self.device
                .begin_command_buffer(
                    cmd,
                    &vk::CommandBufferBeginInfo::default()
                        .flags(vk::CommandBufferUsageFlags::ONE_TIME_SUBMIT),
                )
                .map_err(VkRenderError::from)?;

            transition_image(
                &self.device,
                cmd,
                target,
                old_layout,
                vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            );

            let clear = vk::ClearValue {
                color: vk::ClearColorValue {
                    float32: plan.clear_color,
                },
            };

            let rp_begin = vk::RenderPassBeginInfo::default()
                .render_pass(self.render_pass)
                .framebuffer(self.framebuffers[idx])
                .render_area(vk::Rect2D {
                    offset: vk::Offset2D { x: 0, y: 0 },
                    extent: self.extent,
                })
                .clear_values(std::slice::from_ref(&clear));

            self.device
                .cmd_begin_render_pass(cmd, &rp_begin, vk::SubpassContents::INLINE);

            self.device
                .cmd_bind_pipeline(cmd, vk::PipelineBindPoint::GRAPHICS, self.pipeline);

            let viewport = vk::Viewport {
                x: 0.0,
                y: 0.0,
                width: self.extent.width as f32,
                height: self.extent.height as f32,
                min_depth: 0.0,
                max_depth: 1.0,
            };
            let scissor = vk::Rect2D {
                offset: vk::Offset2D { x: 0, y: 0 },
                extent: self.extent,
            };

            self.device
                .cmd_set_viewport(cmd, 0, std::slice::from_ref(&viewport));
            self.device
                .cmd_set_scissor(cmd, 0, std::slice::from_ref(&scissor));

            if plan.draw_count > 0 {
                self.device.cmd_draw(cmd, 3, plan.draw_count as u32, 0, 0);
            }

            self.device.cmd_end_render_pass(cmd);

            // Render pass final layout hands the image off for present.
            self.image_layouts[idx] = vk::ImageLayout::PRESENT_SRC_KHR;

            self.device
                .end_command_buffer(cmd)
                .map_err(VkRenderError::from)?;
        }

        Ok(())
    }

    fn submit(&mut self, slot: usize) -> EngineResult<()> {
        let s = &self.slots[slot];

        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let wait_sems = [s.image_available];
        let signal_sems = [s.work_finished];
        let cmd_bufs = [s.command_buffer];

        let submit_infos = [vk::SubmitInfo::default()
            .wait_semaphores(&wait_sems)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&cmd_bufs)
            .signal_semaphores(&signal_sems)];

        unsafe {
            self.device
                .queue_submit(self.queue, &submit_infos, s.fence)
                .map_err(VkRenderError::from)?;
        }
        Ok(())
    }

    fn present(&mut self, slot: usize, image: u32) -> EngineResult<PresentStatus> {
        let wait_sems = [self.slots[slot].work_finished];
        let swapchains = [self.swapchain];
        let indices = [image];

        let present_info = vk::PresentInfoKHR::default()
            .wait_semaphores(&wait_sems)
            .swapchains(&swapchains)
            .image_indices(&indices);

        match unsafe {
            self.swapchain_loader
                .queue_present(self.queue, &present_info)
        } {
            Ok(false) => Ok(PresentStatus::Presented),
            Ok(true) => Ok(PresentStatus::OutOfDate),
            Err(vk::Result::ERROR_OUT_OF_DATE_KHR) | Err(vk::Result::SUBOPTIMAL_KHR) => {
                Ok(PresentStatus::OutOfDate)
            }
            Err(e) => Err(VkRenderError::from(e).into()),
        }
    }

    fn rebuild_surface(&mut self, width: u32, height: u32) -> EngineResult<()> {
        unsafe {
            self.recreate_swapchain(width, height)?;
        }
        Ok(())
    }

    fn wait_all_fences(&mut self) -> EngineResult<()> {
        let fences: Vec<vk::Fence> = self.slots.iter().map(|s| s.fence).collect();
        unsafe {
            self.device
                .wait_for_fences(&fences, true, u64::MAX)
                .map_err(VkRenderError::from)?;
        }
        Ok(())
    }
}

impl Drop for VulkanDevice {
    fn drop(&mut self) {
        unsafe {
            let _ = self.device.device_wait_idle();

            destroy_slots(&self.device, &mut self.slots);
            self.device.destroy_command_pool(self.command_pool, None);

            for &fb in &self.framebuffers {
                self.device.destroy_framebuffer(fb, None);
            }
            self.device.destroy_pipeline(self.pipeline, None);
            self.device
                .destroy_pipeline_layout(self.pipeline_layout, None);
            self.device.destroy_render_pass(self.render_pass, None);

            for &iv in &self.swapchain_image_views {
                self.device.destroy_image_view(iv, None);
            }

            self.swapchain_loader
                .destroy_swapchain(self.swapchain, None);
            self.surface_loader.destroy_surface(self.surface, None);

            self.device.destroy_device(None);
            self.instance.destroy_instance(None);
        }
    }
}
