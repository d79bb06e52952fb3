//! Orbit camera
//!
//! The camera sits on a sphere around a fixed target. Yaw and pitch are in
//! degrees and only wrap at the top end. Each frame changes at most one axis, in
//! priority order yaw drag, then scroll, then pitch drag; an axis that lost the
//! race keeps its input for a later frame.
//!
//! Position follows the axis that moved: yaw sets `x` and `z`, pitch sets `y` and
//! `z`, so the two share the `z` term. Zooming and pitching re-run yaw with a zero
//! delta to settle `x` and `z` on the new radius.

use log::trace;

use crate::config::CameraSettings;
use crate::ecs::SimContext;
use crate::events::{InputChannels, PitchDrag, Scroll, Subscription, YawDrag};
use crate::foundation::math::{utils, Mat4, Mat4Ext, Vec3};
use crate::render::BackgroundQuad;

/// Background v-scroll per degree-free yaw unit
const BACKGROUND_PARALLAX: f32 = 0.01;

/// Gesture totals waiting to be applied
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CameraInput {
    /// Horizontal right-drag pixels
    pub yaw: f32,
    /// Wheel steps, positive zooms in
    pub scroll: f32,
    /// Vertical middle-drag pixels
    pub pitch: f32,
}

/// Axis changed by one update
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CameraMotion {
    /// Nothing pending
    None,
    /// Yawed; carries the background scroll it causes
    Yaw {
        /// V offset for the foreground quad
        background_scroll: f32,
    },
    /// Radius changed
    Zoom,
    /// Scroll pending but the radius is at its limit
    ZoomClamped,
    /// Pitched
    Pitch,
}

/// Yaw, pitch and radius around a target
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    yaw: f32,
    pitch: f32,
    radius: f32,
    position: Vec3,
    pending: CameraInput,
    settings: CameraSettings,
}

impl OrbitCamera {
    /// Camera at the configured starting pitch, yaw and radius
    pub fn new(settings: &CameraSettings) -> Self {
        let mut camera = Self {
            yaw: 0.0,
            pitch: 0.0,
            radius: settings.initial_radius,
            position: Vec3::zeros(),
            pending: CameraInput::default(),
            settings: settings.clone(),
        };
        camera.rotate_pitch(settings.initial_pitch);
        camera.rotate_yaw(settings.initial_yaw);
        camera
    }

    /// Queue gesture input for the next update
    pub fn push_input(&mut self, input: CameraInput) {
        self.pending.yaw += input.yaw;
        self.pending.scroll += input.scroll;
        self.pending.pitch += input.pitch;
    }

    /// Apply the highest-priority pending input
    pub fn update(&mut self, delta_time: f32) -> CameraMotion {
        let sensitivity = self.settings.sensitivity;

        if self.pending.yaw != 0.0 {
            let delta = delta_time * self.pending.yaw;
            self.pending.yaw = 0.0;
            self.rotate_yaw(delta * sensitivity);
            return CameraMotion::Yaw {
                background_scroll: delta * BACKGROUND_PARALLAX,
            };
        }

        if self.pending.scroll != 0.0 {
            let scroll = self.pending.scroll;
            self.pending.scroll = 0.0;

            let zoom_in = scroll > 0.0 && self.radius > self.settings.min_radius;
            let zoom_out = scroll < 0.0 && self.radius < self.settings.max_radius;
            if !(zoom_in || zoom_out) {
                return CameraMotion::ZoomClamped;
            }

            self.radius = (self.radius - delta_time * self.settings.zoom_speed * scroll)
                .clamp(self.settings.min_radius, self.settings.max_radius);
            self.rotate_pitch(0.0);
            self.rotate_yaw(0.0);
            trace!("Camera radius {:.2}", self.radius);
            return CameraMotion::Zoom;
        }

        if self.pending.pitch != 0.0 {
            let delta = delta_time * sensitivity * self.pending.pitch;
            self.pending.pitch = 0.0;
            self.rotate_pitch(delta);
            self.rotate_yaw(0.0);
            return CameraMotion::Pitch;
        }

        CameraMotion::None
    }

    /// Eye position
    pub fn position(&self) -> Vec3 {
        self.position
    }

    /// Orbit radius
    pub fn radius(&self) -> f32 {
        self.radius
    }

    /// Yaw in degrees
    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    /// Pitch in degrees
    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    /// Pending input not yet applied
    pub fn pending(&self) -> CameraInput {
        self.pending
    }

    /// World to view transform looking at the target
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at(self.position, self.settings.target(), Vec3::y())
    }

    fn rotate_yaw(&mut self, degrees: f32) {
        self.yaw = utils::wrap_degrees(self.yaw + degrees);
        let radians = utils::deg_to_rad(self.yaw);
        self.position.x = self.radius * radians.sin();
        self.position.z = self.radius * radians.cos();
    }

    fn rotate_pitch(&mut self, degrees: f32) {
        self.pitch = utils::wrap_degrees(self.pitch + degrees);
        let radians = utils::deg_to_rad(self.pitch);
        self.position.y = self.radius * radians.sin();
        self.position.z = self.radius * radians.cos();
    }
}

/// Feeds gesture channels into an [`OrbitCamera`] and publishes its view
pub struct CameraController {
    camera: OrbitCamera,
    yaw: Subscription<YawDrag>,
    pitch: Subscription<PitchDrag>,
    scroll: Subscription<Scroll>,
}

impl CameraController {
    /// Subscribe a camera to the router's camera channels
    pub fn new(settings: &CameraSettings, channels: &mut InputChannels) -> Self {
        Self {
            camera: OrbitCamera::new(settings),
            yaw: channels.yaw.subscribe(),
            pitch: channels.pitch.subscribe(),
            scroll: channels.scroll.subscribe(),
        }
    }

    /// Drain the channels, move the camera and write the view into `context`
    ///
    /// Yaw motion also slides the foreground quad's texture window.
    pub fn update(&mut self, delta_time: f32, context: &mut SimContext, background: &mut BackgroundQuad) {
        self.camera.push_input(CameraInput {
            yaw: self.yaw.drain().iter().map(|d| d.0).sum(),
            scroll: self.scroll.drain().iter().map(|s| s.0).sum(),
            pitch: self.pitch.drain().iter().map(|d| d.0).sum(),
        });

        if let CameraMotion::Yaw { background_scroll } = self.camera.update(delta_time) {
            background.scroll(background_scroll);
        }
        self.write_view(context);
    }

    /// Publish the current view without consuming input
    pub fn write_view(&self, context: &mut SimContext) {
        context.view = self.camera.view_matrix();
        context.camera_position = self.camera.position();
    }

    /// Camera state
    pub fn camera(&self) -> &OrbitCamera {
        &self.camera
    }

    /// Drop the subscriptions
    pub fn unsubscribe(self, channels: &mut InputChannels) {
        channels.yaw.unsubscribe(self.yaw);
        channels.pitch.unsubscribe(self.pitch);
        channels.scroll.unsubscribe(self.scroll);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectionSettings;
    use approx::assert_relative_eq;

    const DT: f32 = 0.016;

    fn camera_with_radius(radius: f32) -> OrbitCamera {
        OrbitCamera::new(&CameraSettings {
            initial_radius: radius,
            ..CameraSettings::default()
        })
    }

    #[test]
    fn test_initial_position() {
        let camera = OrbitCamera::new(&CameraSettings::default());
        let (pitch, yaw) = (36f32.to_radians(), 45f32.to_radians());
        assert_relative_eq!(camera.position().x, 45.0 * yaw.sin(), epsilon = 1e-4);
        assert_relative_eq!(camera.position().y, 45.0 * pitch.sin(), epsilon = 1e-4);
        // Yaw ran last, so it owns z
        assert_relative_eq!(camera.position().z, 45.0 * yaw.cos(), epsilon = 1e-4);
    }

    #[test]
    fn test_scroll_at_min_radius_is_a_no_op() {
        let mut camera = camera_with_radius(10.0);
        camera.push_input(CameraInput { scroll: 1.0, ..Default::default() });
        assert_eq!(camera.update(DT), CameraMotion::ZoomClamped);
        assert_relative_eq!(camera.radius(), 10.0);
    }

    #[test]
    fn test_scroll_moves_radius_by_zoom_speed() {
        let mut camera = camera_with_radius(50.0);
        camera.push_input(CameraInput { scroll: 1.0, ..Default::default() });
        assert_eq!(camera.update(DT), CameraMotion::Zoom);
        assert_relative_eq!(camera.radius(), 50.0 - DT * 55.0, epsilon = 1e-5);

        let mut far = camera_with_radius(150.0);
        far.push_input(CameraInput { scroll: -1.0, ..Default::default() });
        assert_eq!(far.update(DT), CameraMotion::ZoomClamped);
        assert_relative_eq!(far.radius(), 150.0);
    }

    #[test]
    fn test_yaw_beats_scroll_beats_pitch() {
        let mut camera = camera_with_radius(50.0);
        camera.push_input(CameraInput { yaw: 5.0, scroll: 1.0, pitch: 3.0 });

        assert!(matches!(camera.update(DT), CameraMotion::Yaw { .. }));
        assert_relative_eq!(camera.radius(), 50.0);
        assert_eq!(camera.update(DT), CameraMotion::Zoom);
        let pitch_before = camera.pitch();
        assert_eq!(camera.update(DT), CameraMotion::Pitch);
        assert_relative_eq!(camera.pitch(), pitch_before + DT * 20.0 * 3.0, epsilon = 1e-4);
        assert_eq!(camera.update(DT), CameraMotion::None);
    }

    #[test]
    fn test_yaw_wraps_past_full_turn() {
        let mut camera = OrbitCamera::new(&CameraSettings::default());
        camera.push_input(CameraInput { yaw: 1000.0, ..Default::default() });
        camera.update(0.02);
        // 45 + 0.02 * 1000 * 20 = 445
        assert_relative_eq!(camera.yaw(), 85.0, epsilon = 1e-3);
    }

    #[test]
    fn test_controller_scrolls_background_with_yaw() {
        let mut channels = InputChannels::new();
        let mut controller = CameraController::new(&CameraSettings::default(), &mut channels);
        let mut context = SimContext::new(&ProjectionSettings::default(), (800, 800));
        let mut background = BackgroundQuad::new(1);

        channels.yaw.publish(YawDrag(4.0));
        channels.yaw.publish(YawDrag(6.0));
        controller.update(0.1, &mut context, &mut background);

        assert_relative_eq!(background.uvs()[0][1], 0.01, epsilon = 1e-6);
        assert_relative_eq!(background.uvs()[3][1], 0.51, epsilon = 1e-6);
        assert_relative_eq!(controller.camera().yaw(), 45.0 + 0.1 * 10.0 * 20.0, epsilon = 1e-4);
        assert_relative_eq!(context.camera_position, controller.camera().position());
        assert!(background.is_dirty());
    }
}
