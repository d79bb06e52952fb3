//! Buffer management
//!
//! Every buffer the viewer uses is host visible and coherent: static data is
//! written once at upload, dynamic blocks are mapped, written and unmapped each
//! time they change.

use ash::{vk, Device, Instance};
use bytemuck::Pod;

use super::{VulkanError, VulkanResult};

/// Buffer wrapper with memory management
pub struct Buffer {
    device: Device,
    buffer: vk::Buffer,
    memory: vk::DeviceMemory,
    size: vk::DeviceSize,
}

impl Buffer {
    /// Create a new buffer with memory allocation
    pub fn new(
        device: Device,
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        size: vk::DeviceSize,
        usage: vk::BufferUsageFlags,
        properties: vk::MemoryPropertyFlags,
    ) -> VulkanResult<Self> {
        // Zero-sized buffers are invalid; empty batches still get a binding
        let size = size.max(16);

        let buffer_info = vk::BufferCreateInfo::builder()
            .size(size)
            .usage(usage)
            .sharing_mode(vk::SharingMode::EXCLUSIVE);

        let buffer = unsafe { device.create_buffer(&buffer_info, None).map_err(VulkanError::Api)? };

        let mem_requirements = unsafe { device.get_buffer_memory_requirements(buffer) };
        let memory_type_index =
            find_memory_type(instance, physical_device, mem_requirements.memory_type_bits, properties)?;

        let alloc_info = vk::MemoryAllocateInfo::builder()
            .allocation_size(mem_requirements.size)
            .memory_type_index(memory_type_index);

        let memory = unsafe { device.allocate_memory(&alloc_info, None).map_err(VulkanError::Api)? };

        unsafe {
            device.bind_buffer_memory(buffer, memory, 0).map_err(VulkanError::Api)?;
        }

        Ok(Self {
            device,
            buffer,
            memory,
            size,
        })
    }

    /// Host-visible buffer holding `data`
    pub fn with_data<T: Pod>(
        device: Device,
        instance: &Instance,
        physical_device: vk::PhysicalDevice,
        usage: vk::BufferUsageFlags,
        data: &[T],
    ) -> VulkanResult<Self> {
        let buffer = Self::new(
            device,
            instance,
            physical_device,
            std::mem::size_of_val(data) as vk::DeviceSize,
            usage,
            vk::MemoryPropertyFlags::HOST_VISIBLE | vk::MemoryPropertyFlags::HOST_COHERENT,
        )?;
        buffer.write_data(data)?;
        Ok(buffer)
    }

    /// Map the whole buffer as a slice of `T`, run `write`, then unmap
    ///
    /// The slice covers as many whole `T` as fit in the buffer.
    pub fn with_mapped<T: Pod, R>(&self, write: impl FnOnce(&mut [T]) -> R) -> VulkanResult<R> {
        let ptr = unsafe {
            self.device
                .map_memory(self.memory, 0, self.size, vk::MemoryMapFlags::empty())
                .map_err(VulkanError::Api)?
        };

        let len = self.size as usize / std::mem::size_of::<T>().max(1);
        let slice = unsafe { std::slice::from_raw_parts_mut(ptr.cast::<T>(), len) };
        let result = write(slice);

        unsafe { self.device.unmap_memory(self.memory) };
        Ok(result)
    }

    /// Copy `data` to the start of the buffer
    pub fn write_data<T: Pod>(&self, data: &[T]) -> VulkanResult<()> {
        let bytes: &[u8] = bytemuck::cast_slice(data);
        if bytes.len() as vk::DeviceSize > self.size {
            return Err(VulkanError::InvalidOperation {
                reason: format!("write of {} bytes into a {} byte buffer", bytes.len(), self.size),
            });
        }
        self.with_mapped::<u8, _>(|mapped| mapped[..bytes.len()].copy_from_slice(bytes))
    }

    /// Get buffer handle
    pub fn handle(&self) -> vk::Buffer {
        self.buffer
    }

    /// Get size
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }
}

impl Drop for Buffer {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_buffer(self.buffer, None);
            self.device.free_memory(self.memory, None);
        }
    }
}

/// Find memory type with required properties
pub fn find_memory_type(
    instance: &Instance,
    physical_device: vk::PhysicalDevice,
    type_filter: u32,
    properties: vk::MemoryPropertyFlags,
) -> VulkanResult<u32> {
    let mem_properties = unsafe { instance.get_physical_device_memory_properties(physical_device) };

    (0..mem_properties.memory_type_count)
        .find(|&i| {
            (type_filter & (1 << i)) != 0
                && mem_properties.memory_types[i as usize].property_flags.contains(properties)
        })
        .ok_or(VulkanError::NoSuitableMemoryType)
}
