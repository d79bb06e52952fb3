//! Offscreen render targets
//!
//! The HDR color buffer and its depth-stencil partner are full resolution; the
//! two bloom ping-pong buffers are a quarter of the area. Targets are rebuilt
//! together with the swapchain.

use ash::vk;

use super::context::VulkanContext;
use super::framebuffer::{AttachmentImage, Framebuffer};
use super::swapchain::Swapchain;
use super::VulkanResult;

/// HDR color format of the geometry pass and bloom buffers
pub const HDR_FORMAT: vk::Format = vk::Format::R16G16B16A16_SFLOAT;

/// Depth-stencil formats in order of preference
const DEPTH_STENCIL_FORMATS: [vk::Format; 2] = [vk::Format::D24_UNORM_S8_UINT, vk::Format::D32_SFLOAT_S8_UINT];

/// First depth-stencil format the device can render to
pub fn depth_stencil_format(context: &VulkanContext) -> vk::Format {
    DEPTH_STENCIL_FORMATS
        .iter()
        .copied()
        .find(|&format| context.supports_format(format, vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT))
        .unwrap_or(DEPTH_STENCIL_FORMATS[0])
}

/// Half of each side, never zero
pub fn bloom_extent(extent: vk::Extent2D) -> vk::Extent2D {
    vk::Extent2D {
        width: (extent.width / 2).max(1),
        height: (extent.height / 2).max(1),
    }
}

/// Problems that make a target incomplete
pub fn validate_target(context: &VulkanContext, format: vk::Format, extent: vk::Extent2D, features: vk::FormatFeatureFlags) -> Vec<String> {
    let mut problems = Vec::new();
    if extent.width == 0 || extent.height == 0 {
        problems.push(format!("zero extent {}x{}", extent.width, extent.height));
    }
    if !context.supports_format(format, features) {
        problems.push(format!("{:?} lacks {:?}", format, features));
    }
    problems
}

/// Render pass handles the targets are framed for
#[derive(Debug, Clone, Copy)]
pub struct TargetPasses {
    /// Geometry pass
    pub hdr: vk::RenderPass,
    /// Bloom extract and blur
    pub bloom: vk::RenderPass,
    /// Composite into the swapchain
    pub present: vk::RenderPass,
}

/// Every image and framebuffer the frame renders into
pub struct RenderTargets {
    /// One framebuffer per swapchain image
    pub present_framebuffers: Vec<Framebuffer>,
    /// Bloom buffer A: extract output, vertical blur output
    pub bloom_a_framebuffer: Framebuffer,
    /// Bloom buffer B: horizontal blur output
    pub bloom_b_framebuffer: Framebuffer,
    /// Geometry pass framebuffer
    pub hdr_framebuffer: Framebuffer,
    /// Bloom ping-pong buffer A
    pub bloom_a: AttachmentImage,
    /// Bloom ping-pong buffer B
    pub bloom_b: AttachmentImage,
    /// Depth and stencil of the geometry pass
    pub depth_stencil: AttachmentImage,
    /// Full resolution HDR color
    pub hdr: AttachmentImage,
}

impl RenderTargets {
    /// Allocate targets for the swapchain's extent
    ///
    /// A target that fails validation is logged as an error and creation carries
    /// on; any resulting Vulkan failure is returned.
    pub fn new(
        context: &VulkanContext,
        swapchain: &Swapchain,
        passes: TargetPasses,
        depth_format: vk::Format,
    ) -> VulkanResult<Self> {
        let device = context.raw_device();
        let instance = context.instance();
        let physical = context.physical();
        let extent = swapchain.extent();
        let small = bloom_extent(extent);

        let color_features = vk::FormatFeatureFlags::COLOR_ATTACHMENT | vk::FormatFeatureFlags::SAMPLED_IMAGE;
        let checks = [
            ("hdr", HDR_FORMAT, extent, color_features),
            ("depth-stencil", depth_format, extent, vk::FormatFeatureFlags::DEPTH_STENCIL_ATTACHMENT),
            ("bloom", HDR_FORMAT, small, color_features),
        ];
        for (name, format, target_extent, features) in checks {
            for problem in validate_target(context, format, target_extent, features) {
                log::error!("Render target '{}' incomplete: {}", name, problem);
            }
        }

        let color_usage = vk::ImageUsageFlags::COLOR_ATTACHMENT | vk::ImageUsageFlags::SAMPLED;
        let color_target = |target_extent| {
            AttachmentImage::new(
                device.clone(),
                instance,
                physical,
                HDR_FORMAT,
                target_extent,
                color_usage,
                vk::ImageAspectFlags::COLOR,
            )
        };

        let hdr = color_target(extent)?;
        let depth_stencil = AttachmentImage::new(
            device.clone(),
            instance,
            physical,
            depth_format,
            extent,
            vk::ImageUsageFlags::DEPTH_STENCIL_ATTACHMENT,
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL,
        )?;
        let bloom_a = color_target(small)?;
        let bloom_b = color_target(small)?;

        let hdr_framebuffer =
            Framebuffer::new(device.clone(), passes.hdr, &[hdr.view(), depth_stencil.view()], extent)?;
        let bloom_a_framebuffer = Framebuffer::new(device.clone(), passes.bloom, &[bloom_a.view()], small)?;
        let bloom_b_framebuffer = Framebuffer::new(device.clone(), passes.bloom, &[bloom_b.view()], small)?;
        let present_framebuffers = swapchain
            .image_views()
            .iter()
            .map(|&view| Framebuffer::new(device.clone(), passes.present, &[view], extent))
            .collect::<VulkanResult<Vec<_>>>()?;

        log::debug!(
            "Render targets {}x{}, bloom {}x{}",
            extent.width,
            extent.height,
            small.width,
            small.height
        );

        Ok(Self {
            present_framebuffers,
            bloom_a_framebuffer,
            bloom_b_framebuffer,
            hdr_framebuffer,
            bloom_a,
            bloom_b,
            depth_stencil,
            hdr,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bloom_buffers_are_quarter_area() {
        let small = bloom_extent(vk::Extent2D { width: 800, height: 800 });
        assert_eq!((small.width, small.height), (400, 400));

        let tiny = bloom_extent(vk::Extent2D { width: 1, height: 3 });
        assert_eq!((tiny.width, tiny.height), (1, 1));
    }
}
