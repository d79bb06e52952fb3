//! Pointer-driven picking
//!
//! Consumes the router's pointer channel once per frame, before the physics
//! step, so the drag joint is never added or removed while the solver runs.

use crate::ecs::{SimContext, World};
use crate::events::{InputChannels, PointerEvent, Subscription};

use super::PhysicsWorld;

/// Subscriber turning pointer events into pick, drag and release calls
pub struct Picker {
    pointer: Subscription<PointerEvent>,
}

impl Picker {
    /// Subscribe to the pointer channel
    pub fn new(channels: &mut InputChannels) -> Self {
        Self {
            pointer: channels.pointer.subscribe(),
        }
    }

    /// Apply this frame's pointer events in publish order
    ///
    /// A drag immediately followed by another drag is skipped; the later one
    /// moves the anchor before the step anyway.
    pub fn update(&self, physics: &mut PhysicsWorld, context: &SimContext, world: &mut World) {
        let events = self.pointer.drain();
        for (index, event) in events.iter().enumerate() {
            match *event {
                PointerEvent::Pressed { x, y } => {
                    physics.pick_at(context, x, y, world);
                }
                PointerEvent::Dragged { x, y } => {
                    if !matches!(events.get(index + 1), Some(PointerEvent::Dragged { .. })) {
                        physics.drag_to(context, x, y);
                    }
                }
                PointerEvent::Released => {
                    physics.release(world);
                }
            }
        }
    }

    /// Drop the subscription
    pub fn unsubscribe(self, channels: &mut InputChannels) {
        channels.pointer.unsubscribe(self.pointer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{PhysicsSettings, ProjectionSettings};
    use crate::ecs::components::{PickedTag, ShapeKind, Transform};
    use crate::foundation::math::{Mat4, Mat4Ext, Vec3};
    use crate::physics::BodyDesc;
    use rapier3d::prelude::SharedShape;

    fn ball_scene(channels: &mut InputChannels) -> (Picker, PhysicsWorld, World, SimContext, crate::ecs::Entity) {
        let picker = Picker::new(channels);
        let mut physics = PhysicsWorld::new(&PhysicsSettings::default());
        let mut world = World::new();

        let entity = world.create_entity();
        let body = physics.add_body(
            entity,
            &BodyDesc {
                shape: SharedShape::ball(1.0),
                kind: ShapeKind::Sphere,
                mass: 1.0,
                friction: 20.0,
                position: Vec3::zeros(),
                yaw: 0.0,
            },
        );
        world.add_component(entity, body);
        world.add_component(entity, Transform::default());

        let mut context = SimContext::new(&ProjectionSettings::default(), (640, 480));
        context.camera_position = Vec3::new(0.0, 0.0, 10.0);
        context.view = Mat4::look_at(context.camera_position, Vec3::zeros(), Vec3::y());

        (picker, physics, world, context, entity)
    }

    #[test]
    fn test_press_drag_release_cycle() {
        let mut channels = InputChannels::new();
        let (picker, mut physics, mut world, context, entity) = ball_scene(&mut channels);

        channels.pointer.publish(PointerEvent::Pressed { x: 320.0, y: 240.0 });
        channels.pointer.publish(PointerEvent::Dragged { x: 325.0, y: 240.0 });
        channels.pointer.publish(PointerEvent::Dragged { x: 330.0, y: 240.0 });
        picker.update(&mut physics, &context, &mut world);
        assert!(world.has_component::<PickedTag>(entity));
        assert!(physics.picked().unwrap().target.x > 0.0);

        channels.pointer.publish(PointerEvent::Released);
        picker.update(&mut physics, &context, &mut world);
        assert!(!world.has_component::<PickedTag>(entity));

        picker.unsubscribe(&mut channels);
        assert_eq!(channels.pointer.subscriber_count(), 0);
    }

    #[test]
    fn test_release_then_press_in_one_frame_regrabs() {
        let mut channels = InputChannels::new();
        let (picker, mut physics, mut world, context, entity) = ball_scene(&mut channels);

        channels.pointer.publish(PointerEvent::Pressed { x: 320.0, y: 240.0 });
        picker.update(&mut physics, &context, &mut world);
        assert!(world.has_component::<PickedTag>(entity));

        channels.pointer.publish(PointerEvent::Released);
        channels.pointer.publish(PointerEvent::Pressed { x: 320.0, y: 240.0 });
        picker.update(&mut physics, &context, &mut world);

        assert!(world.has_component::<PickedTag>(entity));
        assert!(physics.picked().is_some());
        assert_eq!(physics.joint_count(), 1);
    }

    #[test]
    fn test_press_then_release_in_one_frame_ends_released() {
        let mut channels = InputChannels::new();
        let (picker, mut physics, mut world, context, entity) = ball_scene(&mut channels);

        channels.pointer.publish(PointerEvent::Pressed { x: 320.0, y: 240.0 });
        channels.pointer.publish(PointerEvent::Released);
        picker.update(&mut physics, &context, &mut world);

        assert!(!world.has_component::<PickedTag>(entity));
        assert!(physics.picked().is_none());
    }
}
