//! Shader modules and graphics pipeline construction
//!
//! Every pass pipeline is described with [`PipelineBuilder`]. Viewport and
//! scissor are dynamic, so pipelines survive swapchain recreation as long as the
//! render pass formats do not change.

use ash::{vk, Device};
use std::ffi::CStr;
use std::fs::File;
use std::path::Path;

use super::vertex_layout::VertexLayout;
use super::{VulkanError, VulkanResult};

const ENTRY_POINT: &[u8] = b"main\0";

/// Shader module wrapper with RAII cleanup
pub struct ShaderModule {
    device: Device,
    module: vk::ShaderModule,
}

impl ShaderModule {
    /// Load shader from SPIR-V file
    pub fn from_file(device: Device, path: &Path) -> VulkanResult<Self> {
        let shader_error = |reason: String| VulkanError::Shader {
            path: path.display().to_string(),
            reason,
        };

        let mut file = File::open(path).map_err(|e| shader_error(e.to_string()))?;
        let code = ash::util::read_spv(&mut file).map_err(|e| shader_error(e.to_string()))?;

        let create_info = vk::ShaderModuleCreateInfo::builder().code(&code);
        let module = unsafe { device.create_shader_module(&create_info, None).map_err(VulkanError::Api)? };

        Ok(Self { device, module })
    }

    /// Get shader module handle
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_shader_module(self.module, None);
        }
    }
}

/// How a pipeline uses the stencil buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StencilMode {
    /// Stencil test off
    Disabled,
    /// Always pass and write `reference`
    Write(u32),
    /// Pass only where the stored value differs from `reference`; read only
    NotEqual(u32),
}

impl StencilMode {
    fn op_state(self) -> Option<vk::StencilOpState> {
        let (compare_op, reference, write_mask) = match self {
            Self::Disabled => return None,
            Self::Write(reference) => (vk::CompareOp::ALWAYS, reference, 0xFF),
            Self::NotEqual(reference) => (vk::CompareOp::NOT_EQUAL, reference, 0x00),
        };
        Some(vk::StencilOpState {
            fail_op: vk::StencilOp::KEEP,
            pass_op: vk::StencilOp::REPLACE,
            depth_fail_op: vk::StencilOp::KEEP,
            compare_op,
            compare_mask: 0xFF,
            write_mask,
            reference,
        })
    }
}

/// Graphics pipeline wrapper with RAII cleanup
pub struct GraphicsPipeline {
    device: Device,
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
}

impl GraphicsPipeline {
    /// Get pipeline handle
    pub fn handle(&self) -> vk::Pipeline {
        self.pipeline
    }

    /// Get layout handle
    pub fn layout(&self) -> vk::PipelineLayout {
        self.layout
    }
}

impl Drop for GraphicsPipeline {
    fn drop(&mut self) {
        unsafe {
            self.device.destroy_pipeline(self.pipeline, None);
            self.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}

/// Fixed-function state and shaders for one pass
pub struct PipelineBuilder<'a> {
    vertex_shader: &'a ShaderModule,
    fragment_shader: &'a ShaderModule,
    vertex_layout: VertexLayout,
    topology: vk::PrimitiveTopology,
    cull_mode: vk::CullModeFlags,
    depth_test: bool,
    stencil: StencilMode,
    variant: Option<u32>,
    push_constant_size: u32,
    set_layouts: Vec<vk::DescriptorSetLayout>,
}

impl<'a> PipelineBuilder<'a> {
    /// Triangle list, no culling, no depth or stencil
    pub fn new(vertex_shader: &'a ShaderModule, fragment_shader: &'a ShaderModule) -> Self {
        Self {
            vertex_shader,
            fragment_shader,
            vertex_layout: VertexLayout::empty(),
            topology: vk::PrimitiveTopology::TRIANGLE_LIST,
            cull_mode: vk::CullModeFlags::NONE,
            depth_test: false,
            stencil: StencilMode::Disabled,
            variant: None,
            push_constant_size: 0,
            set_layouts: Vec::new(),
        }
    }

    /// Vertex input layout
    pub fn vertex_layout(mut self, layout: VertexLayout) -> Self {
        self.vertex_layout = layout;
        self
    }

    /// Primitive topology
    pub fn topology(mut self, topology: vk::PrimitiveTopology) -> Self {
        self.topology = topology;
        self
    }

    /// Faces to discard
    pub fn cull_mode(mut self, cull_mode: vk::CullModeFlags) -> Self {
        self.cull_mode = cull_mode;
        self
    }

    /// Depth test and write with LESS
    pub fn depth_test(mut self, enabled: bool) -> Self {
        self.depth_test = enabled;
        self
    }

    /// Stencil behaviour
    pub fn stencil(mut self, stencil: StencilMode) -> Self {
        self.stencil = stencil;
        self
    }

    /// Fragment shader variant, specialization constant 0
    pub fn variant(mut self, variant: u32) -> Self {
        self.variant = Some(variant);
        self
    }

    /// Push constant block size in bytes, visible to both stages
    pub fn push_constants(mut self, size: u32) -> Self {
        self.push_constant_size = size;
        self
    }

    /// Descriptor set layouts in set order
    pub fn set_layouts(mut self, layouts: &[vk::DescriptorSetLayout]) -> Self {
        self.set_layouts = layouts.to_vec();
        self
    }

    /// Create the pipeline for subpass 0 of `render_pass`
    pub fn build(self, device: &Device, render_pass: vk::RenderPass) -> VulkanResult<GraphicsPipeline> {
        let entry = CStr::from_bytes_with_nul(ENTRY_POINT)
            .map_err(|e| VulkanError::InitializationFailed(format!("Invalid entry point: {}", e)))?;

        let variant_data = self.variant.unwrap_or(0).to_ne_bytes();
        let map_entries = [vk::SpecializationMapEntry {
            constant_id: 0,
            offset: 0,
            size: std::mem::size_of::<u32>(),
        }];
        let specialization = vk::SpecializationInfo::builder()
            .map_entries(&map_entries)
            .data(&variant_data);

        let mut fragment_stage = vk::PipelineShaderStageCreateInfo::builder()
            .stage(vk::ShaderStageFlags::FRAGMENT)
            .module(self.fragment_shader.handle())
            .name(entry);
        if self.variant.is_some() {
            fragment_stage = fragment_stage.specialization_info(&specialization);
        }
        let shader_stages = [
            vk::PipelineShaderStageCreateInfo::builder()
                .stage(vk::ShaderStageFlags::VERTEX)
                .module(self.vertex_shader.handle())
                .name(entry)
                .build(),
            fragment_stage.build(),
        ];

        let vertex_input_info = vk::PipelineVertexInputStateCreateInfo::builder()
            .vertex_binding_descriptions(&self.vertex_layout.bindings)
            .vertex_attribute_descriptions(&self.vertex_layout.attributes);

        let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::builder()
            .topology(self.topology)
            .primitive_restart_enable(false);

        let viewport_state = vk::PipelineViewportStateCreateInfo::builder()
            .viewport_count(1)
            .scissor_count(1);

        let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
        let dynamic_state = vk::PipelineDynamicStateCreateInfo::builder().dynamic_states(&dynamic_states);

        let rasterizer = vk::PipelineRasterizationStateCreateInfo::builder()
            .depth_clamp_enable(false)
            .rasterizer_discard_enable(false)
            .polygon_mode(vk::PolygonMode::FILL)
            .line_width(1.0)
            .cull_mode(self.cull_mode)
            .front_face(vk::FrontFace::COUNTER_CLOCKWISE)
            .depth_bias_enable(false);

        let multisampling = vk::PipelineMultisampleStateCreateInfo::builder()
            .sample_shading_enable(false)
            .rasterization_samples(vk::SampleCountFlags::TYPE_1);

        let stencil_op = self.stencil.op_state();
        let depth_stencil = vk::PipelineDepthStencilStateCreateInfo::builder()
            .depth_test_enable(self.depth_test)
            .depth_write_enable(self.depth_test)
            .depth_compare_op(vk::CompareOp::LESS)
            .depth_bounds_test_enable(false)
            .stencil_test_enable(stencil_op.is_some())
            .front(stencil_op.unwrap_or_default())
            .back(stencil_op.unwrap_or_default());

        let color_blend_attachments = [vk::PipelineColorBlendAttachmentState::builder()
            .color_write_mask(vk::ColorComponentFlags::RGBA)
            .blend_enable(false)
            .build()];
        let color_blending = vk::PipelineColorBlendStateCreateInfo::builder()
            .logic_op_enable(false)
            .attachments(&color_blend_attachments);

        let push_constant_ranges = [vk::PushConstantRange {
            stage_flags: vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
            offset: 0,
            size: self.push_constant_size,
        }];
        let push_constant_ranges: &[vk::PushConstantRange] = if self.push_constant_size > 0 {
            &push_constant_ranges
        } else {
            &[]
        };

        let layout_info = vk::PipelineLayoutCreateInfo::builder()
            .set_layouts(&self.set_layouts)
            .push_constant_ranges(push_constant_ranges);
        let layout = unsafe { device.create_pipeline_layout(&layout_info, None).map_err(VulkanError::Api)? };

        let pipeline_info = vk::GraphicsPipelineCreateInfo::builder()
            .stages(&shader_stages)
            .vertex_input_state(&vertex_input_info)
            .input_assembly_state(&input_assembly)
            .viewport_state(&viewport_state)
            .rasterization_state(&rasterizer)
            .multisample_state(&multisampling)
            .depth_stencil_state(&depth_stencil)
            .color_blend_state(&color_blending)
            .dynamic_state(&dynamic_state)
            .layout(layout)
            .render_pass(render_pass)
            .subpass(0);

        let pipelines = unsafe {
            device.create_graphics_pipelines(vk::PipelineCache::null(), &[pipeline_info.build()], None)
        };
        let pipeline = match pipelines {
            Ok(pipelines) => pipelines[0],
            Err((_, err)) => {
                unsafe { device.destroy_pipeline_layout(layout, None) };
                return Err(VulkanError::Api(err));
            }
        };

        Ok(GraphicsPipeline {
            device: device.clone(),
            pipeline,
            layout,
        })
    }
}
