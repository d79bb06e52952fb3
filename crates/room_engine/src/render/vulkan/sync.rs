//! Frame synchronization
//!
//! One frame is in flight at a time, so a single semaphore pair and fence cover
//! acquire, submit and present. Host writes into shared buffers wait on the same
//! fence.

use ash::{vk, Device};

use super::{VulkanError, VulkanResult};

/// Acquire, render and present synchronization for the frame in flight
pub struct FrameSync {
    device: Device,
    image_available: vk::Semaphore,
    render_finished: vk::Semaphore,
    in_flight: vk::Fence,
}

impl FrameSync {
    /// Create the semaphores and an already signaled fence
    pub fn new(device: Device) -> VulkanResult<Self> {
        let semaphore_info = vk::SemaphoreCreateInfo::builder();
        let fence_info = vk::FenceCreateInfo::builder().flags(vk::FenceCreateFlags::SIGNALED);

        // Objects created before a failure are leaked with the device on this path
        let (image_available, render_finished, in_flight) = unsafe {
            (
                device.create_semaphore(&semaphore_info, None).map_err(VulkanError::Api)?,
                device.create_semaphore(&semaphore_info, None).map_err(VulkanError::Api)?,
                device.create_fence(&fence_info, None).map_err(VulkanError::Api)?,
            )
        };

        Ok(Self {
            device,
            image_available,
            render_finished,
            in_flight,
        })
    }

    /// Signaled by acquire once the swapchain image can be written
    pub fn image_available(&self) -> vk::Semaphore {
        self.image_available
    }

    /// Signaled by the submit; present waits on it
    pub fn render_finished(&self) -> vk::Semaphore {
        self.render_finished
    }

    /// Signaled when the GPU has finished the frame
    pub fn in_flight(&self) -> vk::Fence {
        self.in_flight
    }

    /// Block until the previous frame is done on the GPU
    pub fn wait(&self) -> VulkanResult<()> {
        unsafe {
            self.device
                .wait_for_fences(&[self.in_flight], true, u64::MAX)
                .map_err(VulkanError::Api)
        }
    }

    /// Unsignal the fence ahead of the next submit
    pub fn reset(&self) -> VulkanResult<()> {
        unsafe { self.device.reset_fences(&[self.in_flight]).map_err(VulkanError::Api) }
    }
}

impl Drop for FrameSync {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_fence(self.in_flight, None);
            self.device.destroy_semaphore(self.render_finished, None);
            self.device.destroy_semaphore(self.image_available, None);
        }
    }
}
