use ash::vk;
use ash::{Device, Entry};
use std::ffi::CStr;

pub(super) unsafe fn has_instance_layer(entry: &Entry, name: &CStr) -> bool {
    let Ok(props) = entry.enumerate_instance_layer_properties() else {
        return false;
    };

    props.iter().any(|p| {
        let layer = CStr::from_ptr(p.layer_name.as_ptr());
        layer == name
    })
}

#[inline]
fn stage_access_for_layout(layout: vk::ImageLayout) -> (vk::PipelineStageFlags, vk::AccessFlags) {
    match layout {
        vk::ImageLayout::UNDEFINED => (
            vk::PipelineStageFlags::TOP_OF_PIPE,
            vk::AccessFlags::empty(),
        ),
        vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL => (
            vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT,
            vk::AccessFlags::COLOR_ATTACHMENT_WRITE,
        ),
        vk::ImageLayout::PRESENT_SRC_KHR => (
            vk::PipelineStageFlags::ALL_COMMANDS,
            vk::AccessFlags::MEMORY_READ,
        ),
        _ => (
            vk::PipelineStageFlags::ALL_COMMANDS,
            vk::AccessFlags::MEMORY_READ | vk::AccessFlags::MEMORY_WRITE,
        ),
    }
}

pub(super) fn transition_image(
    device: &Device,
    cmd: vk::CommandBuffer,
    img: vk::Image,
    old: vk::ImageLayout,
    new: vk::ImageLayout,
) {
    if old == new {
        return;
    }

    let (src_stage, src_access) = stage_access_for_layout(old);
    let (dst_stage, dst_access) = stage_access_for_layout(new);

    let barrier = vk::ImageMemoryBarrier::default()
        .old_layout(old)
        .new_layout(new)
        .src_access_mask(src_access)
        .dst_access_mask(dst_access)
        .image(img)
        .subresource_range(
            vk::ImageSubresourceRange::default()
                .aspect_mask(vk::ImageAspectFlags::COLOR)
                .base_mip_level(0)
                .level_count(1)
                .base_array_layer(0)
                .layer_count(1),
        );

    unsafe {
        device.cmd_pipeline_barrier(
            cmd,
            src_stage,
            dst_stage,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    }
}
