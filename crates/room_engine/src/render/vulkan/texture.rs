//! Sampled textures
//!
//! Uploads a decoded [`TextureImage`] through a staging buffer and fills its mip
//! chain with linear blits. Samplers are separate objects so the bindless array
//! and the post-process passes can pick their own filtering.

use ash::{vk, Device, Instance};

use crate::assets::TextureImage;

use super::buffer::{find_memory_type, Buffer};
use super::commands::CommandPool;
use super::{VulkanError, VulkanResult};

/// Mipmapped RGBA8 texture
pub struct Texture {
    device: Device,
    image: vk::Image,
    memory: vk::DeviceMemory,
    view: vk::ImageView,
    mip_levels: u32,
}

impl Texture {
    /// Upload `source` and generate its mip chain
    pub fn from_image(
        device: Device,
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        pool: &CommandPool,
        queue: vk::Queue,
        source: &TextureImage,
    ) -> VulkanResult<Self> {
        let extent = vk::Extent2D {
            width: source.width,
            height: source.height,
        };
        let mip_levels = source.mip_levels();
        let format = vk::Format::R8G8B8A8_UNORM;

        let image_create_info = vk::ImageCreateInfo::builder()
            .image_type(vk::ImageType::TYPE_2D)
            .extent(vk::Extent3D {
                width: extent.width,
                height: extent.height,
                depth: 1,
            })
            .mip_levels(mip_levels)
            .array_layers(1)
            .format(format)
            .tiling(vk::ImageTiling::OPTIMAL)
            .initial_layout(vk::ImageLayout::UNDEFINED)
            .usage(
                vk::ImageUsageFlags::TRANSFER_DST | vk::ImageUsageFlags::TRANSFER_SRC | vk::ImageUsageFlags::SAMPLED,
            )
            .sharing_mode(vk::SharingMode::EXCLUSIVE)
            .samples(vk::SampleCountFlags::TYPE_1);

        let image = unsafe { device.create_image(&image_create_info, None).map_err(VulkanError::Api)? };

        let memory_requirements = unsafe { device.get_image_memory_requirements(image) };
        let memory_type_index = find_memory_type(
            instance,
            physical_device,
            memory_requirements.memory_type_bits,
            vk::MemoryPropertyFlags::DEVICE_LOCAL,
        )?;
        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(memory_requirements.size)
            .memory_type_index(memory_type_index);
        let memory = unsafe { device.allocate_memory(&alloc_info, None).map_err(VulkanError::Api)? };
        unsafe {
            device.bind_image_memory(image, memory, 0).map_err(VulkanError::Api)?;
        }

        let staging = Buffer::with_data(
            device.clone(),
            instance,
            physical_device,
            vk::BufferUsageFlags::TRANSFER_SRC,
            &source.pixels,
        )?;

        pool.submit_once(queue, |command_buffer| {
            record_upload(&device, command_buffer, image, staging.handle(), extent, mip_levels);
        })?;

        let view_info = vk::ImageViewCreateInfo::builder()
            .image(image)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(format)
            .subresource_range(color_range(0, mip_levels));
        let view = unsafe { device.create_image_view(&view_info, None).map_err(VulkanError::Api)? };

        log::debug!(
            "Uploaded texture {}x{} with {} mip levels",
            extent.width,
            extent.height,
            mip_levels
        );

        Ok(Self {
            device,
            image,
            memory,
            view,
            mip_levels,
        })
    }

    /// Get the image view handle
    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    /// Number of mip levels
    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }
}

impl Drop for Texture {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_image_view(self.view, None);
            self.device.destroy_image(self.image, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

fn color_range(base_mip_level: u32, level_count: u32) -> vk::ImageSubresourceRange {
    vk::ImageSubresourceRange {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        base_mip_level,
        level_count,
        base_array_layer: 0,
        layer_count: 1,
    }
}

fn color_layers(mip_level: u32) -> vk::ImageSubresourceLayers {
    vk::ImageSubresourceLayers {
        aspect_mask: vk::ImageAspectFlags::COLOR,
        mip_level,
        base_array_layer: 0,
        layer_count: 1,
    }
}

#[allow(clippy::too_many_arguments)]
fn barrier(
    device: &Device,
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    range: vk::ImageSubresourceRange,
    layouts: (vk::ImageLayout, vk::ImageLayout),
    access: (vk::AccessFlags, vk::AccessFlags),
    stages: (vk::PipelineStageFlags, vk::PipelineStageFlags),
) {
    let barrier = vk::ImageMemoryBarrier::builder()
        .old_layout(layouts.0)
        .new_layout(layouts.1)
        .src_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .dst_queue_family_index(vk::QUEUE_FAMILY_IGNORED)
        .image(image)
        .subresource_range(range)
        .src_access_mask(access.0)
        .dst_access_mask(access.1)
        .build();

    unsafe {
        device.cmd_pipeline_barrier(
            command_buffer,
            stages.0,
            stages.1,
            vk::DependencyFlags::empty(),
            &[],
            &[],
            &[barrier],
        );
    }
}

/// Copy the staging buffer into mip 0, blit each level from the previous one and
/// leave every level shader-readable
fn record_upload(
    device: &Device,
    command_buffer: vk::CommandBuffer,
    image: vk::Image,
    staging: vk::Buffer,
    extent: vk::Extent2D,
    mip_levels: u32,
) {
    barrier(
        device,
        command_buffer,
        image,
        color_range(0, mip_levels),
        (vk::ImageLayout::UNDEFINED, vk::ImageLayout::TRANSFER_DST_OPTIMAL),
        (vk::AccessFlags::empty(), vk::AccessFlags::TRANSFER_WRITE),
        (vk::PipelineStageFlags::TOP_OF_PIPE, vk::PipelineStageFlags::TRANSFER),
    );

    let region = vk::BufferImageCopy::builder()
        .image_subresource(color_layers(0))
        .image_extent(vk::Extent3D {
            width: extent.width,
            height: extent.height,
            depth: 1,
        })
        .build();
    unsafe {
        device.cmd_copy_buffer_to_image(
            command_buffer,
            staging,
            image,
            vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            &[region],
        );
    }

    let mut mip_width = extent.width as i32;
    let mut mip_height = extent.height as i32;

    for level in 1..mip_levels {
        barrier(
            device,
            command_buffer,
            image,
            color_range(level - 1, 1),
            (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::TRANSFER_SRC_OPTIMAL),
            (vk::AccessFlags::TRANSFER_WRITE, vk::AccessFlags::TRANSFER_READ),
            (vk::PipelineStageFlags::TRANSFER, vk::PipelineStageFlags::TRANSFER),
        );

        let next_width = (mip_width / 2).max(1);
        let next_height = (mip_height / 2).max(1);
        let blit = vk::ImageBlit::builder()
            .src_offsets([
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D {
                    x: mip_width,
                    y: mip_height,
                    z: 1,
                },
            ])
            .src_subresource(color_layers(level - 1))
            .dst_offsets([
                vk::Offset3D { x: 0, y: 0, z: 0 },
                vk::Offset3D {
                    x: next_width,
                    y: next_height,
                    z: 1,
                },
            ])
            .dst_subresource(color_layers(level))
            .build();
        unsafe {
            device.cmd_blit_image(
                command_buffer,
                image,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                image,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &[blit],
                vk::Filter::LINEAR,
            );
        }

        barrier(
            device,
            command_buffer,
            image,
            color_range(level - 1, 1),
            (vk::ImageLayout::TRANSFER_SRC_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
            (vk::AccessFlags::TRANSFER_READ, vk::AccessFlags::SHADER_READ),
            (vk::PipelineStageFlags::TRANSFER, vk::PipelineStageFlags::FRAGMENT_SHADER),
        );

        mip_width = next_width;
        mip_height = next_height;
    }

    barrier(
        device,
        command_buffer,
        image,
        color_range(mip_levels - 1, 1),
        (vk::ImageLayout::TRANSFER_DST_OPTIMAL, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL),
        (vk::AccessFlags::TRANSFER_WRITE, vk::AccessFlags::SHADER_READ),
        (vk::PipelineStageFlags::TRANSFER, vk::PipelineStageFlags::FRAGMENT_SHADER),
    );
}

/// Sampler wrapper with RAII cleanup
pub struct Sampler {
    device: Device,
    sampler: vk::Sampler,
}

impl Sampler {
    /// Trilinear, anisotropic, repeating sampler for model textures
    pub fn new_mipmapped(device: Device, max_anisotropy: f32) -> VulkanResult<Self> {
        let info = vk::SamplerCreateInfo::builder()
            .mag_filter(vk::Filter::LINEAR)
            .min_filter(vk::Filter::LINEAR)
            .address_mode_u(vk::SamplerAddressMode::REPEAT)
            .address_mode_v(vk::SamplerAddressMode::REPEAT)
            .address_mode_w(vk::SamplerAddressMode::REPEAT)
            .anisotropy_enable(max_anisotropy > 1.0)
            .max_anisotropy(max_anisotropy.min(16.0))
            .mipmap_mode(vk::SamplerMipmapMode::LINEAR)
            .min_lod(0.0)
            .max_lod(vk::LOD_CLAMP_NONE);
        Self::create(device, &info)
    }

    /// Single-level sampler for offscreen targets, black outside the edges
    pub fn new_clamped(device: Device, filter: vk::Filter) -> VulkanResult<Self> {
        let info = vk::SamplerCreateInfo::builder()
            .mag_filter(filter)
            .min_filter(filter)
            .address_mode_u(vk::SamplerAddressMode::CLAMP_TO_BORDER)
            .address_mode_v(vk::SamplerAddressMode::CLAMP_TO_BORDER)
            .address_mode_w(vk::SamplerAddressMode::CLAMP_TO_BORDER)
            .border_color(vk::BorderColor::FLOAT_OPAQUE_BLACK)
            .mipmap_mode(vk::SamplerMipmapMode::NEAREST)
            .max_lod(0.0);
        Self::create(device, &info)
    }

    fn create(device: Device, info: &vk::SamplerCreateInfo) -> VulkanResult<Self> {
        let sampler = unsafe { device.create_sampler(info, None).map_err(VulkanError::Api)? };
        Ok(Self { device, sampler })
    }

    /// Get the sampler handle
    pub fn handle(&self) -> vk::Sampler {
        self.sampler
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_sampler(self.sampler, None);
        }
    }
}
