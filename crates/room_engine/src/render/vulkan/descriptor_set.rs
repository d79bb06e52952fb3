//! Descriptor set layouts, pools and writes
//!
//! Besides the usual uniform, storage and sampler bindings, the layout builder
//! supports a partially bound sampler array: the bindless texture table only
//! fills the slots that were loaded.

use ash::{vk, Device};

use super::{VulkanError, VulkanResult};

/// Descriptor set layout builder for creating reusable layouts
#[derive(Default)]
pub struct DescriptorSetLayoutBuilder {
    bindings: Vec<vk::DescriptorSetLayoutBinding>,
    flags: Vec<vk::DescriptorBindingFlags>,
}

impl DescriptorSetLayoutBuilder {
    /// Create a new descriptor set layout builder
    pub fn new() -> Self {
        Self::default()
    }

    fn add(
        mut self,
        binding: u32,
        descriptor_type: vk::DescriptorType,
        count: u32,
        stage_flags: vk::ShaderStageFlags,
        flags: vk::DescriptorBindingFlags,
    ) -> Self {
        self.bindings.push(
            vk::DescriptorSetLayoutBinding::builder()
                .binding(binding)
                .descriptor_type(descriptor_type)
                .descriptor_count(count)
                .stage_flags(stage_flags)
                .build(),
        );
        self.flags.push(flags);
        self
    }

    /// Add a uniform buffer binding
    pub fn add_uniform_buffer(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add(
            binding,
            vk::DescriptorType::UNIFORM_BUFFER,
            1,
            stage_flags,
            vk::DescriptorBindingFlags::empty(),
        )
    }

    /// Add a storage buffer binding
    pub fn add_storage_buffer(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add(
            binding,
            vk::DescriptorType::STORAGE_BUFFER,
            1,
            stage_flags,
            vk::DescriptorBindingFlags::empty(),
        )
    }

    /// Add a combined image sampler binding
    pub fn add_combined_image_sampler(self, binding: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add(
            binding,
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            1,
            stage_flags,
            vk::DescriptorBindingFlags::empty(),
        )
    }

    /// Add an array of `count` samplers where unwritten elements are allowed
    pub fn add_sampler_array(self, binding: u32, count: u32, stage_flags: vk::ShaderStageFlags) -> Self {
        self.add(
            binding,
            vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            count,
            stage_flags,
            vk::DescriptorBindingFlags::PARTIALLY_BOUND,
        )
    }

    /// Build the descriptor set layout
    pub fn build(self, device: &Device) -> VulkanResult<DescriptorSetLayout> {
        let mut binding_flags = vk::DescriptorSetLayoutBindingFlagsCreateInfo::builder().binding_flags(&self.flags);
        let layout_info = vk::DescriptorSetLayoutCreateInfo::builder()
            .bindings(&self.bindings)
            .push_next(&mut binding_flags);

        let layout = unsafe { device.create_descriptor_set_layout(&layout_info, None) }.map_err(VulkanError::Api)?;

        Ok(DescriptorSetLayout {
            layout,
            device: device.clone(),
        })
    }
}

/// Descriptor set layout wrapper with automatic cleanup
pub struct DescriptorSetLayout {
    layout: vk::DescriptorSetLayout,
    device: Device,
}

impl DescriptorSetLayout {
    /// Get the Vulkan descriptor set layout handle
    pub fn handle(&self) -> vk::DescriptorSetLayout {
        self.layout
    }
}

impl Drop for DescriptorSetLayout {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_set_layout(self.layout, None);
        }
    }
}

/// Descriptor pool for allocating descriptor sets
pub struct DescriptorPool {
    pool: vk::DescriptorPool,
    device: Device,
}

impl DescriptorPool {
    /// Pool sized for `max_sets` sets and `max_samplers` sampler descriptors
    pub fn new(device: Device, max_sets: u32, max_samplers: u32) -> VulkanResult<Self> {
        let pool_sizes = [
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::UNIFORM_BUFFER,
                descriptor_count: max_sets,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::STORAGE_BUFFER,
                descriptor_count: max_sets * 2,
            },
            vk::DescriptorPoolSize {
                ty: vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
                descriptor_count: max_samplers,
            },
        ];

        let pool_info = vk::DescriptorPoolCreateInfo::builder()
            .max_sets(max_sets)
            .pool_sizes(&pool_sizes);

        let pool = unsafe { device.create_descriptor_pool(&pool_info, None) }.map_err(VulkanError::Api)?;

        Ok(Self { pool, device })
    }

    /// Allocate one set per layout
    pub fn allocate_descriptor_sets(&self, layouts: &[vk::DescriptorSetLayout]) -> VulkanResult<Vec<vk::DescriptorSet>> {
        let alloc_info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(self.pool)
            .set_layouts(layouts);

        unsafe { self.device.allocate_descriptor_sets(&alloc_info) }.map_err(VulkanError::Api)
    }

    /// Allocate a single set
    pub fn allocate(&self, layout: &DescriptorSetLayout) -> VulkanResult<vk::DescriptorSet> {
        self.allocate_descriptor_sets(&[layout.handle()])?
            .into_iter()
            .next()
            .ok_or_else(|| VulkanError::InvalidOperation {
                reason: "descriptor pool returned no set".to_string(),
            })
    }
}

impl Drop for DescriptorPool {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_descriptor_pool(self.pool, None);
        }
    }
}

enum PendingWrite {
    Buffer {
        set: vk::DescriptorSet,
        binding: u32,
        ty: vk::DescriptorType,
        info: vk::DescriptorBufferInfo,
    },
    Image {
        set: vk::DescriptorSet,
        binding: u32,
        array_element: u32,
        info: vk::DescriptorImageInfo,
    },
}

/// Collects descriptor writes and applies them in one call
///
/// Infos are stored by value and only turned into `vk::WriteDescriptorSet`s in
/// [`update`](Self::update), so no pointer outlives its data.
#[derive(Default)]
pub struct DescriptorSetWriter {
    writes: Vec<PendingWrite>,
}

impl DescriptorSetWriter {
    /// Create a new descriptor set writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a whole uniform buffer
    pub fn uniform_buffer(self, set: vk::DescriptorSet, binding: u32, buffer: vk::Buffer) -> Self {
        self.buffer(set, binding, vk::DescriptorType::UNIFORM_BUFFER, buffer)
    }

    /// Bind a whole storage buffer
    pub fn storage_buffer(self, set: vk::DescriptorSet, binding: u32, buffer: vk::Buffer) -> Self {
        self.buffer(set, binding, vk::DescriptorType::STORAGE_BUFFER, buffer)
    }

    fn buffer(mut self, set: vk::DescriptorSet, binding: u32, ty: vk::DescriptorType, buffer: vk::Buffer) -> Self {
        self.writes.push(PendingWrite::Buffer {
            set,
            binding,
            ty,
            info: vk::DescriptorBufferInfo {
                buffer,
                offset: 0,
                range: vk::WHOLE_SIZE,
            },
        });
        self
    }

    /// Bind a shader-readable image at `array_element` of `binding`
    pub fn image(
        mut self,
        set: vk::DescriptorSet,
        binding: u32,
        array_element: u32,
        view: vk::ImageView,
        sampler: vk::Sampler,
    ) -> Self {
        self.writes.push(PendingWrite::Image {
            set,
            binding,
            array_element,
            info: vk::DescriptorImageInfo {
                sampler,
                image_view: view,
                image_layout: vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            },
        });
        self
    }

    /// Execute all write operations
    pub fn update(self, device: &Device) {
        let writes: Vec<vk::WriteDescriptorSet> = self
            .writes
            .iter()
            .map(|write| match write {
                PendingWrite::Buffer { set, binding, ty, info } => vk::WriteDescriptorSet::builder()
                    .dst_set(*set)
                    .dst_binding(*binding)
                    .descriptor_type(*ty)
                    .buffer_info(std::slice::from_ref(info))
                    .build(),
                PendingWrite::Image {
                    set,
                    binding,
                    array_element,
                    info,
                } => vk::WriteDescriptorSet::builder()
                    .dst_set(*set)
                    .dst_binding(*binding)
                    .dst_array_element(*array_element)
                    .descriptor_type(vk::DescriptorType::COMBINED_IMAGE_SAMPLER)
                    .image_info(std::slice::from_ref(info))
                    .build(),
            })
            .collect();

        unsafe {
            device.update_descriptor_sets(&writes, &[]);
        }
    }
}
