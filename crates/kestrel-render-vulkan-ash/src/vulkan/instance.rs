use crate::error::{VkRenderError, VkResult};

use super::util::has_instance_layer;

use ash::vk;
use ash::{Device, Entry, Instance};
use raw_window_handle::RawDisplayHandle;
use std::ffi::CString;

pub(super) unsafe fn create_instance(
    entry: &Entry,
    display: RawDisplayHandle,
) -> VkResult<Instance> {
    let app_name = CString::new("kestrel").map_err(|e| VkRenderError::AshWindow(e.to_string()))?;

    let app_info = vk::ApplicationInfo::default()
        .application_name(&app_name)
        .application_version(vk::make_api_version(0, 0, 1, 0))
        .engine_name(&app_name)
        .engine_version(vk::make_api_version(0, 0, 1, 0))
        .api_version(vk::API_VERSION_1_2);

    let mut extension_names = ash_window::enumerate_required_extensions(display)
        .map_err(|e| VkRenderError::AshWindow(e.to_string()))?
        .to_vec();

    if cfg!(debug_assertions) {
        extension_names.push(ash::ext::debug_utils::NAME.as_ptr());
    }

    let validation_layer = CString::new("VK_LAYER_KHRONOS_validation")
        .map_err(|e| VkRenderError::AshWindow(e.to_string()))?;
    let enable_validation =
        cfg!(debug_assertions) && has_instance_layer(entry, validation_layer.as_c_str());

    let mut layer_ptrs: Vec<*const i8> = Vec::new();
    if enable_validation {
        layer_ptrs.push(validation_layer.as_ptr());
    } else if cfg!(debug_assertions) {
        log::warn!("Vulkan validation layer not found; running without validation.");
    }

    let mut create_info = vk::InstanceCreateInfo::default()
        .application_info(&app_info)
        .enabled_extension_names(&extension_names);

    if enable_validation {
        create_info = create_info.enabled_layer_names(&layer_ptrs);
    }

    Ok(entry.create_instance(&create_info, None)?)
}

pub(super) fn pick_physical_device(
    instance: &Instance,
    surface_loader: &ash::khr::surface::Instance,
    surface: vk::SurfaceKHR,
) -> VkResult<(vk::PhysicalDevice, u32)> {
    let pds = unsafe { instance.enumerate_physical_devices()? };
    for pd in pds {
        let qf = unsafe { instance.get_physical_device_queue_family_properties(pd) };
        for (i, props) in qf.iter().enumerate() {
            if !props.queue_flags.contains(vk::QueueFlags::GRAPHICS) {
                continue;
            }
            let present = unsafe {
                surface_loader.get_physical_device_surface_support(pd, i as u32, surface)?
            };
            if present {
                return Ok((pd, i as u32));
            }
        }
    }
    Err(VkRenderError::NoSuitableDevice)
}

pub(super) fn create_device(
    instance: &Instance,
    pd: vk::PhysicalDevice,
    qfi: u32,
) -> VkResult<(Device, vk::Queue)> {
    let priorities = [1.0f32];
    let qci = [vk::DeviceQueueCreateInfo::default()
        .queue_family_index(qfi)
        .queue_priorities(&priorities)];

    let device_exts = [ash::khr::swapchain::NAME.as_ptr()];

    let dci = vk::DeviceCreateInfo::default()
        .queue_create_infos(&qci)
        .enabled_extension_names(&device_exts);

    let device = unsafe { instance.create_device(pd, &dci, None)? };
    let queue = unsafe { device.get_device_queue(qfi, 0) };
    Ok((device, queue))
}
