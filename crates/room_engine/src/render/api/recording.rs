//! Recording backend for tests
//!
//! Keeps CPU copies of everything written and logs every call, so pipeline logic
//! can be checked without a device.

use crate::assets::SceneGeometry;
use crate::render::batch::MaterialClass;
use crate::render::bloom::TAPS;
use crate::render::vertex::{InstanceTransform, LineVertex, QuadVertex};

use super::{BackendResult, CameraUniform, PassCommand, RenderBackend};

/// Call seen by the recorder
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    /// Scene upload with its instance count
    UploadScene(usize),
    /// Blur weights set
    BlurWeights,
    /// Camera written
    Camera,
    /// Instance block mapped
    Transforms,
    /// Texture slots written for a class
    TextureHandles(MaterialClass),
    /// Background vertices written
    Background,
    /// Debug lines written
    DebugLines(usize),
    /// Frame started
    BeginFrame,
    /// Pass recorded
    Record(PassCommand),
    /// Frame submitted
    EndFrame,
}

/// Backend that records instead of rendering
#[derive(Debug, Default)]
pub struct RecordingBackend {
    /// Calls in order
    pub calls: Vec<Call>,
    /// Instance block contents
    pub transforms: Vec<InstanceTransform>,
    /// Emissive slots last written
    pub emissive_slots: Vec<u32>,
    /// Last camera block
    pub camera: Option<CameraUniform>,
    /// Last blur kernel
    pub blur_weights: Option<[f32; TAPS]>,
    /// Last background vertices
    pub background: Option<[QuadVertex; 4]>,
    /// Make `begin_frame` report a skipped frame
    pub skip_frames: bool,
}

impl RecordingBackend {
    /// Empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded passes of the last frame, in order
    pub fn passes(&self) -> Vec<PassCommand> {
        let start = self
            .calls
            .iter()
            .rposition(|call| *call == Call::BeginFrame)
            .map_or(0, |i| i + 1);
        self.calls[start..]
            .iter()
            .filter_map(|call| match call {
                Call::Record(command) => Some(*command),
                _ => None,
            })
            .collect()
    }

    /// Number of times `call` was seen
    pub fn count(&self, call: &Call) -> usize {
        self.calls.iter().filter(|c| *c == call).count()
    }
}

impl RenderBackend for RecordingBackend {
    fn extent(&self) -> (u32, u32) {
        (800, 800)
    }

    fn upload_scene(&mut self, scene: &SceneGeometry) -> BackendResult<()> {
        self.transforms = scene.instance_transforms.clone();
        self.emissive_slots = scene.batches.get(MaterialClass::Emissive).textures().as_slice().to_vec();
        self.calls.push(Call::UploadScene(scene.instance_count()));
        Ok(())
    }

    fn set_blur_weights(&mut self, weights: &[f32; TAPS]) -> BackendResult<()> {
        self.blur_weights = Some(*weights);
        self.calls.push(Call::BlurWeights);
        Ok(())
    }

    fn write_camera(&mut self, camera: &CameraUniform) -> BackendResult<()> {
        self.camera = Some(*camera);
        self.calls.push(Call::Camera);
        Ok(())
    }

    fn write_instance_transforms(&mut self, write: &mut dyn FnMut(&mut [InstanceTransform])) -> BackendResult<()> {
        write(&mut self.transforms);
        self.calls.push(Call::Transforms);
        Ok(())
    }

    fn write_texture_handles(&mut self, class: MaterialClass, slots: &[u32]) -> BackendResult<()> {
        if class == MaterialClass::Emissive {
            self.emissive_slots = slots.to_vec();
        }
        self.calls.push(Call::TextureHandles(class));
        Ok(())
    }

    fn write_background(&mut self, vertices: &[QuadVertex; 4]) -> BackendResult<()> {
        self.background = Some(*vertices);
        self.calls.push(Call::Background);
        Ok(())
    }

    fn write_debug_lines(&mut self, lines: &[LineVertex]) -> BackendResult<()> {
        self.calls.push(Call::DebugLines(lines.len()));
        Ok(())
    }

    fn begin_frame(&mut self) -> BackendResult<bool> {
        self.calls.push(Call::BeginFrame);
        Ok(!self.skip_frames)
    }

    fn record(&mut self, command: PassCommand) -> BackendResult<()> {
        self.calls.push(Call::Record(command));
        Ok(())
    }

    fn end_frame(&mut self) -> BackendResult<()> {
        self.calls.push(Call::EndFrame);
        Ok(())
    }

    fn wait_idle(&self) -> BackendResult<()> {
        Ok(())
    }
}
