//! Vulkan implementation of [`RenderBackend`]
//!
//! Owns every GPU object the viewer needs: the swapchain and offscreen targets,
//! one pipeline per pass, the scene's static buffers and the dynamic blocks the
//! frame pipeline rewrites (camera, instance transforms, per-draw materials,
//! foreground quad, debug lines).
//!
//! Frame flow with a single frame in flight:
//! ```text
//! begin_frame  wait fence, acquire image, reset fence, begin command buffer
//! record       queue pass commands
//! end_frame    HDR pass (every geometry command), bloom passes, composite,
//!              submit, present
//! ```
//! The HDR pass is always opened, even with no geometry commands, so the HDR
//! target is cleared and in a sampled layout before the bloom passes read it.

use ash::{vk, Device};
use bytemuck::{Pod, Zeroable};
use std::mem::size_of;

use crate::assets::SceneGeometry;
use crate::render::api::{BackendResult, CameraUniform, PassCommand, RenderBackend, RendererConfig};
use crate::render::background::BackgroundQuad;
use crate::render::batch::{DrawIndexedIndirectCommand, MaterialClass, RenderBatch};
use crate::render::bloom::{BlurDirection, TAPS};
use crate::render::textures::{FALLBACK_SLOT, MAX_TEXTURES};
use crate::render::vertex::{InstanceTransform, LineVertex, QuadVertex};

use super::buffer::Buffer;
use super::commands::{ActiveRenderPass, CommandPool, CommandRecorder};
use super::context::VulkanContext;
use super::descriptor_set::{DescriptorPool, DescriptorSetLayout, DescriptorSetLayoutBuilder, DescriptorSetWriter};
use super::render_pass::RenderPass;
use super::shader::{GraphicsPipeline, PipelineBuilder, ShaderModule, StencilMode};
use super::swapchain::Swapchain;
use super::sync::FrameSync;
use super::targets::{self, RenderTargets, TargetPasses, HDR_FORMAT};
use super::texture::{Sampler, Texture};
use super::vertex_layout::VertexLayout;
use super::window::Window;
use super::{VulkanError, VulkanResult};

/// Stencil reference written by the room and tested by the foreground quad
const ROOM_STENCIL: u32 = 1;

/// Unlit color of the room shell
const ROOM_COLOR: [f32; 4] = [0.02, 0.02, 0.025, 1.0];

/// Debug line capacity before the first resize
const INITIAL_DEBUG_VERTICES: usize = 4096;

/// Frame set, three material sets, four post-process sets
const MAX_DESCRIPTOR_SETS: u32 = 8;

/// Image descriptors the post-process sets use
const POST_SAMPLERS: u32 = 8;

const HOST_MEMORY: vk::MemoryPropertyFlags = vk::MemoryPropertyFlags::from_raw(
    vk::MemoryPropertyFlags::HOST_VISIBLE.as_raw() | vk::MemoryPropertyFlags::HOST_COHERENT.as_raw(),
);

/// One entry of a batch's material block, indexed by draw id (std430)
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct DrawMaterial {
    /// Base color; white for textured classes
    pub color: [f32; 4],
    /// Bindless texture slot; the fallback for flat draws
    pub texture_slot: u32,
    _pad: [u32; 3],
}

impl DrawMaterial {
    fn new(color: [f32; 4], texture_slot: u32) -> Self {
        Self {
            color,
            texture_slot,
            _pad: [0; 3],
        }
    }
}

/// Flat draws carry their color, textured draws their slot
fn batch_materials(batch: &RenderBatch) -> Vec<DrawMaterial> {
    if batch.class().is_textured() {
        texture_materials(batch.textures().as_slice())
    } else {
        batch
            .colors()
            .iter()
            .map(|&color| DrawMaterial::new(color, FALLBACK_SLOT))
            .collect()
    }
}

fn texture_materials(slots: &[u32]) -> Vec<DrawMaterial> {
    slots.iter().map(|&slot| DrawMaterial::new([1.0; 4], slot)).collect()
}

/// Texel step along the blur axis of a `extent` sized source
fn blur_step(direction: BlurDirection, extent: vk::Extent2D) -> [f32; 2] {
    match direction {
        BlurDirection::Horizontal => [1.0 / extent.width as f32, 0.0],
        BlurDirection::Vertical => [0.0, 1.0 / extent.height as f32],
    }
}

#[repr(C)]
#[derive(Clone, Copy, Pod, Zeroable)]
struct RoomPush {
    model: [[f32; 4]; 4],
    color: [f32; 4],
}

struct RenderPasses {
    hdr: RenderPass,
    bloom: RenderPass,
    present: RenderPass,
}

impl RenderPasses {
    fn targets(&self) -> TargetPasses {
        TargetPasses {
            hdr: self.hdr.handle(),
            bloom: self.bloom.handle(),
            present: self.present.handle(),
        }
    }
}

struct SetLayouts {
    /// Camera block and bindless texture array
    frame: DescriptorSetLayout,
    /// A batch's material block
    material: DescriptorSetLayout,
    /// Two sampled images and the blur kernel
    post: DescriptorSetLayout,
}

impl SetLayouts {
    fn new(device: &Device) -> VulkanResult<Self> {
        let fragment = vk::ShaderStageFlags::FRAGMENT;
        Ok(Self {
            frame: DescriptorSetLayoutBuilder::new()
                .add_uniform_buffer(0, vk::ShaderStageFlags::VERTEX | fragment)
                .add_sampler_array(1, MAX_TEXTURES as u32, fragment)
                .build(device)?,
            material: DescriptorSetLayoutBuilder::new()
                .add_storage_buffer(0, fragment)
                .build(device)?,
            post: DescriptorSetLayoutBuilder::new()
                .add_combined_image_sampler(0, fragment)
                .add_combined_image_sampler(1, fragment)
                .add_storage_buffer(2, fragment)
                .build(device)?,
        })
    }
}

struct PostSets {
    extract: vk::DescriptorSet,
    blur_horizontal: vk::DescriptorSet,
    blur_vertical: vk::DescriptorSet,
    composite: vk::DescriptorSet,
}

struct DescriptorSets {
    frame: vk::DescriptorSet,
    materials: [vk::DescriptorSet; 3],
    post: PostSets,
}

impl DescriptorSets {
    fn allocate(pool: &DescriptorPool, layouts: &SetLayouts) -> VulkanResult<Self> {
        Ok(Self {
            frame: pool.allocate(&layouts.frame)?,
            materials: [
                pool.allocate(&layouts.material)?,
                pool.allocate(&layouts.material)?,
                pool.allocate(&layouts.material)?,
            ],
            post: PostSets {
                extract: pool.allocate(&layouts.post)?,
                blur_horizontal: pool.allocate(&layouts.post)?,
                blur_vertical: pool.allocate(&layouts.post)?,
                composite: pool.allocate(&layouts.post)?,
            },
        })
    }
}

struct Samplers {
    /// Model and quad textures
    model: Sampler,
    /// Exact HDR reads
    nearest: Sampler,
    /// Bloom reads
    linear: Sampler,
}

struct Pipelines {
    room: GraphicsPipeline,
    batches: [GraphicsPipeline; 3],
    background: GraphicsPipeline,
    debug: GraphicsPipeline,
    extract: GraphicsPipeline,
    blur: GraphicsPipeline,
    composite: GraphicsPipeline,
}

impl Pipelines {
    fn new(device: &Device, config: &RendererConfig, layouts: &SetLayouts, passes: &RenderPasses) -> VulkanResult<Self> {
        let load = |name: &str| ShaderModule::from_file(device.clone(), &config.shader_path(name));

        let scene_vert = load("scene.vert")?;
        let scene_frag = load("scene.frag")?;
        let room_vert = load("room.vert")?;
        let room_frag = load("room.frag")?;
        let background_vert = load("background.vert")?;
        let background_frag = load("background.frag")?;
        let debug_vert = load("debug.vert")?;
        let debug_frag = load("debug.frag")?;
        let fullscreen_vert = load("fullscreen.vert")?;
        let bright_frag = load("bright.frag")?;
        let blur_frag = load("blur.frag")?;
        let composite_frag = load("composite.frag")?;

        let hdr = passes.hdr.handle();
        let frame = [layouts.frame.handle()];
        let post = [layouts.post.handle()];

        // Back faces of the room shell, seen from inside
        let room = PipelineBuilder::new(&room_vert, &room_frag)
            .vertex_layout(VertexLayout::mesh())
            .cull_mode(vk::CullModeFlags::FRONT)
            .depth_test(true)
            .stencil(StencilMode::Write(ROOM_STENCIL))
            .push_constants(size_of::<RoomPush>() as u32)
            .set_layouts(&frame)
            .build(device, hdr)?;

        let batch = |class: MaterialClass| {
            PipelineBuilder::new(&scene_vert, &scene_frag)
                .vertex_layout(VertexLayout::instanced_mesh())
                .cull_mode(vk::CullModeFlags::BACK)
                .depth_test(true)
                .variant(class.shader_variant())
                .set_layouts(&[layouts.frame.handle(), layouts.material.handle()])
                .build(device, hdr)
        };
        let batches = [
            batch(MaterialClass::Flat)?,
            batch(MaterialClass::Textured)?,
            batch(MaterialClass::Emissive)?,
        ];

        let background = PipelineBuilder::new(&background_vert, &background_frag)
            .vertex_layout(VertexLayout::quad())
            .depth_test(true)
            .stencil(StencilMode::NotEqual(ROOM_STENCIL))
            .push_constants(size_of::<u32>() as u32)
            .set_layouts(&frame)
            .build(device, hdr)?;

        let debug = PipelineBuilder::new(&debug_vert, &debug_frag)
            .vertex_layout(VertexLayout::lines())
            .topology(vk::PrimitiveTopology::LINE_LIST)
            .depth_test(true)
            .set_layouts(&frame)
            .build(device, hdr)?;

        let extract = PipelineBuilder::new(&fullscreen_vert, &bright_frag)
            .set_layouts(&post)
            .build(device, passes.bloom.handle())?;

        let blur = PipelineBuilder::new(&fullscreen_vert, &blur_frag)
            .push_constants(size_of::<[f32; 2]>() as u32)
            .set_layouts(&post)
            .build(device, passes.bloom.handle())?;

        let composite = PipelineBuilder::new(&fullscreen_vert, &composite_frag)
            .set_layouts(&post)
            .build(device, passes.present.handle())?;

        log::debug!("Pass pipelines created");

        Ok(Self {
            room,
            batches,
            background,
            debug,
            extract,
            blur,
            composite,
        })
    }
}

struct BatchBuffers {
    vertices: Buffer,
    indices: Buffer,
}

struct RoomBuffers {
    vertices: Buffer,
    indices: Buffer,
    index_count: u32,
    push: RoomPush,
}

/// GPU copies of a loaded scene
struct SceneBuffers {
    batches: [Option<BatchBuffers>; 3],
    indirect: Buffer,
    instances: Buffer,
    materials: [Buffer; 3],
    room: Option<RoomBuffers>,
    background_vertices: Buffer,
    background_indices: Buffer,
    background_slot: u32,
    /// Owned for the lifetime of the texture array descriptors
    _textures: Vec<Texture>,
}

/// Vulkan renderer
///
/// Fields are declared so that every GPU object drops before the context.
pub struct VulkanRenderer {
    pending: Vec<PassCommand>,
    image_index: Option<u32>,
    sync: FrameSync,
    recorder: CommandRecorder,
    scene: Option<SceneBuffers>,
    debug_lines: Buffer,
    camera: Buffer,
    blur_weights: Buffer,
    sets: DescriptorSets,
    _descriptor_pool: DescriptorPool,
    samplers: Samplers,
    pipelines: Pipelines,
    _layouts: SetLayouts,
    targets: RenderTargets,
    passes: RenderPasses,
    swapchain: Swapchain,
    command_pool: CommandPool,
    depth_format: vk::Format,
    window_extent: vk::Extent2D,
    config: RendererConfig,
    device: Device,
    context: VulkanContext,
}

impl VulkanRenderer {
    /// Create the device, swapchain, targets and pipelines for `window`
    pub fn new(window: &mut Window, config: &RendererConfig) -> VulkanResult<Self> {
        log::debug!("Creating VulkanContext...");
        let context = VulkanContext::new(window, &config.application_name, config.validation_enabled())?;
        let device = context.raw_device();

        let (width, height) = window.get_framebuffer_size();
        let window_extent = vk::Extent2D { width, height };
        let swapchain = Swapchain::new(&context, window_extent, config.vsync, vk::SwapchainKHR::null())?;

        let depth_format = targets::depth_stencil_format(&context);
        let passes = RenderPasses {
            hdr: RenderPass::new_hdr_pass(device.clone(), HDR_FORMAT, depth_format)?,
            bloom: RenderPass::new_color_pass(device.clone(), HDR_FORMAT, vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL)?,
            present: RenderPass::new_color_pass(device.clone(), swapchain.format().format, vk::ImageLayout::PRESENT_SRC_KHR)?,
        };
        let targets = RenderTargets::new(&context, &swapchain, passes.targets(), depth_format)?;

        let layouts = SetLayouts::new(&device)?;
        let pipelines = Pipelines::new(&device, config, &layouts, &passes)?;

        let descriptor_pool = DescriptorPool::new(device.clone(), MAX_DESCRIPTOR_SETS, MAX_TEXTURES as u32 + POST_SAMPLERS)?;
        let sets = DescriptorSets::allocate(&descriptor_pool, &layouts)?;

        let max_anisotropy = context.physical_device.properties.limits.max_sampler_anisotropy;
        let samplers = Samplers {
            model: Sampler::new_mipmapped(device.clone(), max_anisotropy)?,
            nearest: Sampler::new_clamped(device.clone(), vk::Filter::NEAREST)?,
            linear: Sampler::new_clamped(device.clone(), vk::Filter::LINEAR)?,
        };

        let host_buffer = |size: usize, usage: vk::BufferUsageFlags| {
            Buffer::new(
                device.clone(),
                context.instance(),
                context.physical(),
                size as vk::DeviceSize,
                usage,
                HOST_MEMORY,
            )
        };
        let camera = host_buffer(size_of::<CameraUniform>(), vk::BufferUsageFlags::UNIFORM_BUFFER)?;
        let blur_weights = host_buffer(TAPS * size_of::<f32>(), vk::BufferUsageFlags::STORAGE_BUFFER)?;
        let debug_lines = host_buffer(
            INITIAL_DEBUG_VERTICES * size_of::<LineVertex>(),
            vk::BufferUsageFlags::VERTEX_BUFFER,
        )?;

        DescriptorSetWriter::new()
            .uniform_buffer(sets.frame, 0, camera.handle())
            .update(&device);
        write_post_sets(&device, &sets.post, &targets, &samplers, &blur_weights);

        let command_pool = CommandPool::new(device.clone(), context.graphics_queue_family())?;
        let command_buffer = command_pool
            .allocate_command_buffers(1)?
            .into_iter()
            .next()
            .ok_or_else(|| VulkanError::InitializationFailed("No frame command buffer".to_string()))?;
        let recorder = CommandRecorder::new(command_buffer, device.clone());
        let sync = FrameSync::new(device.clone())?;

        log::debug!("VulkanRenderer initialization complete");

        Ok(Self {
            pending: Vec::new(),
            image_index: None,
            sync,
            recorder,
            scene: None,
            debug_lines,
            camera,
            blur_weights,
            sets,
            _descriptor_pool: descriptor_pool,
            samplers,
            pipelines,
            _layouts: layouts,
            targets,
            passes,
            swapchain,
            command_pool,
            depth_format,
            window_extent,
            config: config.clone(),
            device,
            context,
        })
    }

    fn host_buffer<T: Pod>(&self, usage: vk::BufferUsageFlags, data: &[T]) -> VulkanResult<Buffer> {
        Buffer::with_data(self.device.clone(), self.context.instance(), self.context.physical(), usage, data)
    }

    fn scene(&self) -> VulkanResult<&SceneBuffers> {
        self.scene.as_ref().ok_or_else(|| VulkanError::InvalidOperation {
            reason: "no scene uploaded".to_string(),
        })
    }

    /// Block host writes until the GPU has finished the previous frame
    fn wait_for_gpu(&self) -> VulkanResult<()> {
        if self.recorder.is_recording() {
            return Ok(());
        }
        self.sync.wait()
    }

    fn recreate_swapchain(&mut self) -> VulkanResult<()> {
        log::info!("Recreating swapchain...");
        self.context.wait_idle()?;

        let swapchain = Swapchain::new(&self.context, self.window_extent, self.config.vsync, self.swapchain.handle())?;
        self.swapchain = swapchain;
        self.targets = RenderTargets::new(&self.context, &self.swapchain, self.passes.targets(), self.depth_format)?;
        write_post_sets(&self.device, &self.sets.post, &self.targets, &self.samplers, &self.blur_weights);

        log::info!("Swapchain recreation complete");
        Ok(())
    }

    fn upload(&self, scene: &SceneGeometry) -> VulkanResult<SceneBuffers> {
        let batches = [
            self.batch_buffers(scene.batches.get(MaterialClass::Flat))?,
            self.batch_buffers(scene.batches.get(MaterialClass::Textured))?,
            self.batch_buffers(scene.batches.get(MaterialClass::Emissive))?,
        ];

        let commands: Vec<DrawIndexedIndirectCommand> = scene.batches.indirect_commands();
        let indirect = self.host_buffer(vk::BufferUsageFlags::INDIRECT_BUFFER, &commands)?;
        let instances = self.host_buffer(vk::BufferUsageFlags::VERTEX_BUFFER, &scene.instance_transforms)?;

        let material_buffer = |class: MaterialClass| {
            self.host_buffer(
                vk::BufferUsageFlags::STORAGE_BUFFER,
                &batch_materials(scene.batches.get(class)),
            )
        };
        let materials = [
            material_buffer(MaterialClass::Flat)?,
            material_buffer(MaterialClass::Textured)?,
            material_buffer(MaterialClass::Emissive)?,
        ];

        let room = match &scene.room {
            Some(mesh) if !mesh.indices.is_empty() => Some(RoomBuffers {
                vertices: self.host_buffer(vk::BufferUsageFlags::VERTEX_BUFFER, &mesh.vertices)?,
                indices: self.host_buffer(vk::BufferUsageFlags::INDEX_BUFFER, &mesh.indices)?,
                index_count: mesh.indices.len() as u32,
                push: RoomPush {
                    model: mesh.model.into(),
                    color: ROOM_COLOR,
                },
            }),
            _ => None,
        };

        let background_vertices = self.host_buffer(vk::BufferUsageFlags::VERTEX_BUFFER, &scene.background.vertices())?;
        let background_indices = self.host_buffer(vk::BufferUsageFlags::INDEX_BUFFER, &BackgroundQuad::INDICES)?;

        let images = scene.textures.images();
        if images.len() > MAX_TEXTURES {
            log::error!("{} textures loaded, only {} fit the texture array", images.len(), MAX_TEXTURES);
        }
        let textures = images
            .iter()
            .take(MAX_TEXTURES)
            .map(|image| {
                Texture::from_image(
                    self.device.clone(),
                    self.context.instance(),
                    self.context.physical(),
                    &self.command_pool,
                    self.context.graphics_queue(),
                    image,
                )
            })
            .collect::<VulkanResult<Vec<_>>>()?;

        let mut writer = DescriptorSetWriter::new();
        for (slot, texture) in textures.iter().enumerate() {
            writer = writer.image(self.sets.frame, 1, slot as u32, texture.view(), self.samplers.model.handle());
        }
        for (set, buffer) in self.sets.materials.iter().zip(materials.iter()) {
            writer = writer.storage_buffer(*set, 0, buffer.handle());
        }
        writer.update(&self.device);

        log::info!(
            "Uploaded scene: {} draw commands, {} instances, {} textures",
            commands.len(),
            scene.instance_count(),
            textures.len()
        );

        Ok(SceneBuffers {
            batches,
            indirect,
            instances,
            materials,
            room,
            background_vertices,
            background_indices,
            background_slot: scene.background.texture_slot(),
            _textures: textures,
        })
    }

    fn batch_buffers(&self, batch: &RenderBatch) -> VulkanResult<Option<BatchBuffers>> {
        if batch.is_empty() {
            return Ok(None);
        }
        Ok(Some(BatchBuffers {
            vertices: self.host_buffer(vk::BufferUsageFlags::VERTEX_BUFFER, batch.vertices())?,
            indices: self.host_buffer(vk::BufferUsageFlags::INDEX_BUFFER, batch.indices())?,
        }))
    }

    fn submit_and_present(&mut self) -> VulkanResult<()> {
        let image_index = self.image_index.take().ok_or_else(|| VulkanError::InvalidOperation {
            reason: "end_frame without begin_frame".to_string(),
        })?;
        let commands = std::mem::take(&mut self.pending);
        let scene = self.scene.as_ref().ok_or_else(|| VulkanError::InvalidOperation {
            reason: "no scene uploaded".to_string(),
        })?;

        let extent = self.swapchain.extent();
        let bloom_extent = targets::bloom_extent(extent);
        let clear_color = self.config.clear_color;
        let hdr_clear = [
            vk::ClearValue {
                color: vk::ClearColorValue { float32: clear_color },
            },
            vk::ClearValue {
                depth_stencil: vk::ClearDepthStencilValue { depth: 1.0, stencil: 0 },
            },
        ];

        let recorder = &mut self.recorder;
        {
            let mut pass = recorder.begin_render_pass(
                self.passes.hdr.handle(),
                self.targets.hdr_framebuffer.handle(),
                extent,
                &hdr_clear,
            )?;
            for command in commands.iter().filter(|command| command.targets_hdr()) {
                record_geometry(&mut pass, &self.pipelines, &self.sets, scene, &self.debug_lines, *command);
            }
        }

        let post = &self.sets.post;
        for command in commands.iter().filter(|command| !command.targets_hdr()) {
            match *command {
                PassCommand::BloomExtract => {
                    let mut pass = recorder.begin_render_pass(
                        self.passes.bloom.handle(),
                        self.targets.bloom_a_framebuffer.handle(),
                        bloom_extent,
                        &[],
                    )?;
                    fullscreen(&mut pass, &self.pipelines.extract, post.extract);
                }
                PassCommand::Blur(direction) => {
                    let (framebuffer, set) = match direction {
                        BlurDirection::Horizontal => (&self.targets.bloom_b_framebuffer, post.blur_horizontal),
                        BlurDirection::Vertical => (&self.targets.bloom_a_framebuffer, post.blur_vertical),
                    };
                    let mut pass =
                        recorder.begin_render_pass(self.passes.bloom.handle(), framebuffer.handle(), bloom_extent, &[])?;
                    let step = blur_step(direction, bloom_extent);
                    pass.bind_pipeline(self.pipelines.blur.handle());
                    pass.push_constants(
                        self.pipelines.blur.layout(),
                        vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT,
                        bytemuck::bytes_of(&step),
                    );
                    pass.bind_descriptor_sets(self.pipelines.blur.layout(), 0, &[set]);
                    pass.draw(3);
                }
                PassCommand::Composite => {
                    let framebuffer = self
                        .targets
                        .present_framebuffers
                        .get(image_index as usize)
                        .ok_or_else(|| VulkanError::InvalidOperation {
                            reason: format!("no framebuffer for swapchain image {}", image_index),
                        })?;
                    let mut pass =
                        recorder.begin_render_pass(self.passes.present.handle(), framebuffer.handle(), extent, &[])?;
                    fullscreen(&mut pass, &self.pipelines.composite, post.composite);
                }
                _ => {}
            }
        }

        let command_buffer = recorder.end()?;

        let wait_semaphores = [self.sync.image_available()];
        let wait_stages = [vk::PipelineStageFlags::COLOR_ATTACHMENT_OUTPUT];
        let command_buffers = [command_buffer];
        let signal_semaphores = [self.sync.render_finished()];
        let submit_info = vk::SubmitInfo::builder()
            .wait_semaphores(&wait_semaphores)
            .wait_dst_stage_mask(&wait_stages)
            .command_buffers(&command_buffers)
            .signal_semaphores(&signal_semaphores)
            .build();
        unsafe {
            self.device
                .queue_submit(self.context.graphics_queue(), &[submit_info], self.sync.in_flight())
                .map_err(VulkanError::Api)?;
        }

        let presented = self.swapchain.present(
            self.context.present_queue(),
            image_index,
            self.sync.render_finished(),
        )?;
        if !presented {
            log::warn!("Swapchain stale after present");
            self.recreate_swapchain()?;
        }
        Ok(())
    }
}

/// Record one geometry command inside the HDR pass
fn record_geometry(
    pass: &mut ActiveRenderPass<'_>,
    pipelines: &Pipelines,
    sets: &DescriptorSets,
    scene: &SceneBuffers,
    debug_lines: &Buffer,
    command: PassCommand,
) {
    let both_stages = vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT;
    match command {
        PassCommand::StencilRoom => {
            let Some(room) = &scene.room else {
                return;
            };
            let pipeline = &pipelines.room;
            pass.bind_pipeline(pipeline.handle());
            pass.bind_descriptor_sets(pipeline.layout(), 0, &[sets.frame]);
            pass.push_constants(pipeline.layout(), both_stages, bytemuck::bytes_of(&room.push));
            pass.bind_vertex_buffers(0, &[room.vertices.handle()]);
            pass.bind_index_buffer(room.indices.handle());
            pass.draw_indexed(room.index_count);
        }
        PassCommand::Batch(range) => {
            let index = range.class.index();
            let Some(buffers) = &scene.batches[index] else {
                return;
            };
            let pipeline = &pipelines.batches[index];
            pass.bind_pipeline(pipeline.handle());
            pass.bind_descriptor_sets(pipeline.layout(), 0, &[sets.frame, sets.materials[index]]);
            pass.bind_vertex_buffers(0, &[buffers.vertices.handle(), scene.instances.handle()]);
            pass.bind_index_buffer(buffers.indices.handle());
            pass.draw_indexed_indirect(
                scene.indirect.handle(),
                range.offset,
                range.count,
                DrawIndexedIndirectCommand::STRIDE,
            );
        }
        PassCommand::Background => {
            let pipeline = &pipelines.background;
            pass.bind_pipeline(pipeline.handle());
            pass.bind_descriptor_sets(pipeline.layout(), 0, &[sets.frame]);
            pass.push_constants(pipeline.layout(), both_stages, bytemuck::bytes_of(&scene.background_slot));
            pass.bind_vertex_buffers(0, &[scene.background_vertices.handle()]);
            pass.bind_index_buffer(scene.background_indices.handle());
            pass.draw_indexed(BackgroundQuad::INDICES.len() as u32);
        }
        PassCommand::DebugLines { vertex_count } => {
            let pipeline = &pipelines.debug;
            pass.bind_pipeline(pipeline.handle());
            pass.bind_descriptor_sets(pipeline.layout(), 0, &[sets.frame]);
            pass.bind_vertex_buffers(0, &[debug_lines.handle()]);
            pass.draw(vertex_count);
        }
        PassCommand::BloomExtract | PassCommand::Blur(_) | PassCommand::Composite => {}
    }
}

fn fullscreen(pass: &mut ActiveRenderPass<'_>, pipeline: &GraphicsPipeline, set: vk::DescriptorSet) {
    pass.bind_pipeline(pipeline.handle());
    pass.bind_descriptor_sets(pipeline.layout(), 0, &[set]);
    pass.draw(3);
}

/// Point the post-process sets at the current targets
///
/// Extract reads HDR into A, the horizontal blur reads A into B, the vertical
/// blur reads B back into A, and the composite reads HDR and A.
fn write_post_sets(device: &Device, sets: &PostSets, targets: &RenderTargets, samplers: &Samplers, weights: &Buffer) {
    let nearest = samplers.nearest.handle();
    let linear = samplers.linear.handle();
    let hdr = targets.hdr.view();
    let bloom_a = targets.bloom_a.view();
    let bloom_b = targets.bloom_b.view();

    let mut writer = DescriptorSetWriter::new();
    for (set, source, sampler, second, second_sampler) in [
        (sets.extract, hdr, nearest, hdr, nearest),
        (sets.blur_horizontal, bloom_a, nearest, bloom_a, nearest),
        (sets.blur_vertical, bloom_b, nearest, bloom_b, nearest),
        (sets.composite, hdr, nearest, bloom_a, linear),
    ] {
        writer = writer
            .image(set, 0, 0, source, sampler)
            .image(set, 1, 0, second, second_sampler)
            .storage_buffer(set, 2, weights.handle());
    }
    writer.update(device);
}

impl RenderBackend for VulkanRenderer {
    fn extent(&self) -> (u32, u32) {
        let extent = self.swapchain.extent();
        (extent.width, extent.height)
    }

    fn upload_scene(&mut self, scene: &SceneGeometry) -> BackendResult<()> {
        if self.scene.is_some() {
            return Err(VulkanError::InvalidOperation {
                reason: "scene already uploaded".to_string(),
            }
            .into());
        }
        let buffers = self.upload(scene)?;
        self.scene = Some(buffers);
        Ok(())
    }

    fn set_blur_weights(&mut self, weights: &[f32; TAPS]) -> BackendResult<()> {
        self.wait_for_gpu()?;
        self.blur_weights.write_data(weights)?;
        Ok(())
    }

    fn write_camera(&mut self, camera: &CameraUniform) -> BackendResult<()> {
        self.wait_for_gpu()?;
        self.camera.write_data(std::slice::from_ref(camera))?;
        Ok(())
    }

    fn write_instance_transforms(&mut self, write: &mut dyn FnMut(&mut [InstanceTransform])) -> BackendResult<()> {
        self.wait_for_gpu()?;
        self.scene()?.instances.with_mapped(|block: &mut [InstanceTransform]| write(block))?;
        Ok(())
    }

    fn write_texture_handles(&mut self, class: MaterialClass, slots: &[u32]) -> BackendResult<()> {
        self.wait_for_gpu()?;
        self.scene()?.materials[class.index()].write_data(&texture_materials(slots))?;
        Ok(())
    }

    fn write_background(&mut self, vertices: &[QuadVertex; 4]) -> BackendResult<()> {
        self.wait_for_gpu()?;
        self.scene()?.background_vertices.write_data(vertices)?;
        Ok(())
    }

    fn write_debug_lines(&mut self, lines: &[LineVertex]) -> BackendResult<()> {
        if lines.is_empty() {
            return Ok(());
        }
        self.wait_for_gpu()?;

        let bytes = std::mem::size_of_val(lines) as vk::DeviceSize;
        if bytes > self.debug_lines.size() {
            let capacity = bytes.next_power_of_two();
            log::debug!("Growing debug line buffer: {} -> {} bytes", self.debug_lines.size(), capacity);
            self.debug_lines = Buffer::new(
                self.device.clone(),
                self.context.instance(),
                self.context.physical(),
                capacity,
                vk::BufferUsageFlags::VERTEX_BUFFER,
                HOST_MEMORY,
            )?;
        }
        self.debug_lines.write_data(lines)?;
        Ok(())
    }

    fn begin_frame(&mut self) -> BackendResult<bool> {
        self.sync.wait()?;

        let Some(image_index) = self.swapchain.acquire_next_image(self.sync.image_available())? else {
            log::warn!("Swapchain out of date during acquire");
            self.recreate_swapchain()?;
            return Ok(false);
        };

        self.sync.reset()?;
        self.recorder.begin()?;
        self.pending.clear();
        self.image_index = Some(image_index);
        Ok(true)
    }

    fn record(&mut self, command: PassCommand) -> BackendResult<()> {
        if !self.recorder.is_recording() {
            return Err(VulkanError::InvalidOperation {
                reason: format!("{:?} recorded outside a frame", command),
            }
            .into());
        }
        self.pending.push(command);
        Ok(())
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        self.submit_and_present()?;
        Ok(())
    }

    fn wait_idle(&self) -> BackendResult<()> {
        self.context.wait_idle()?;
        Ok(())
    }
}

impl Drop for VulkanRenderer {
    fn drop(&mut self) {
        log::debug!("Cleaning up VulkanRenderer...");
        if let Err(e) = self.context.wait_idle() {
            log::error!("Device wait failed during cleanup: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::batch::SubMeshMaterial;
    use crate::render::vertex::Vertex;
    use approx::assert_relative_eq;

    #[test]
    fn test_draw_material_matches_std430_stride() {
        assert_eq!(size_of::<DrawMaterial>(), 32);
        assert_eq!(size_of::<RoomPush>(), 80);
    }

    #[test]
    fn test_flat_materials_use_colors_and_fallback() {
        let mut batch = RenderBatch::new(MaterialClass::Flat);
        let triangle = [Vertex::default(); 3];
        batch.push_sub_mesh(&triangle, &[0, 1, 2], 1, 0, SubMeshMaterial::Color([0.5, 0.25, 1.0, 1.0]));

        let materials = batch_materials(&batch);
        assert_eq!(materials.len(), 1);
        assert_eq!(materials[0].color, [0.5, 0.25, 1.0, 1.0]);
        assert_eq!(materials[0].texture_slot, FALLBACK_SLOT);
    }

    #[test]
    fn test_textured_materials_follow_draw_order() {
        let mut batch = RenderBatch::new(MaterialClass::Emissive);
        let triangle = [Vertex::default(); 3];
        batch.push_sub_mesh(&triangle, &[0, 1, 2], 1, 0, SubMeshMaterial::Texture(4));
        batch.push_sub_mesh(&triangle, &[0, 1, 2], 1, 1, SubMeshMaterial::Texture(7));

        let slots: Vec<u32> = batch_materials(&batch).iter().map(|m| m.texture_slot).collect();
        assert_eq!(slots, vec![4, 7]);
        assert!(batch_materials(&batch).iter().all(|m| m.color == [1.0; 4]));
    }

    #[test]
    fn test_blur_step_is_one_texel() {
        let extent = vk::Extent2D { width: 400, height: 200 };
        let horizontal = blur_step(BlurDirection::Horizontal, extent);
        assert_relative_eq!(horizontal[0], 0.0025);
        assert_relative_eq!(horizontal[1], 0.0);

        let vertical = blur_step(BlurDirection::Vertical, extent);
        assert_relative_eq!(vertical[0], 0.0);
        assert_relative_eq!(vertical[1], 0.005);
    }
}
