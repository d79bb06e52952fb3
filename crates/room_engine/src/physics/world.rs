//! Rigid-body world and mouse picking
//!
//! Wraps a rapier world and keeps the registry in step with it. Each body stores
//! its entity in its user data; after a step the transforms of awake dynamic
//! bodies are written back and flagged dirty.
//!
//! Picking joins the hit body to an invisible kinematic anchor with a spherical
//! joint. The joint's pivot on the body is the hit point in body space and never
//! moves while dragging; dragging only moves the anchor along the new mouse ray
//! at the distance recorded when the pick started.

use log::{debug, info, trace};
use rapier3d::pipeline::{DebugRenderMode, DebugRenderPipeline, DebugRenderStyle};
use rapier3d::prelude::*;

use super::debug::{DebugLines, AABB_COLOR};
use crate::config::PhysicsSettings;
use crate::ecs::components::{PhysicsBody, PickedTag, ShapeKind, Transform};
use crate::ecs::{Entity, SimContext, World};
use crate::foundation::math::{Mat4, Vec3};
use crate::input::{pick_ray, PickRay};
use crate::render::LineVertex;

/// Longest step taken in one go; long frames are clamped instead of exploding
const MAX_STEP: f32 = 1.0 / 30.0;

/// User data of the drag anchor, outside the entity id range
const ANCHOR_USER_DATA: u128 = u128::MAX;

/// Description of one body to insert
#[derive(Clone)]
pub struct BodyDesc {
    /// Collision shape
    pub shape: SharedShape,
    /// Shape family recorded on the entity
    pub kind: ShapeKind,
    /// Zero makes a fixed body
    pub mass: f32,
    /// Friction coefficient
    pub friction: f32,
    /// Initial position
    pub position: Vec3,
    /// Initial rotation about +Y in radians
    pub yaw: f32,
}

/// State of an active drag
#[derive(Debug, Clone)]
pub struct PickState {
    /// Dragged entity
    pub entity: Entity,
    /// Dragged body
    pub body: RigidBodyHandle,
    /// Joint to the anchor
    pub joint: ImpulseJointHandle,
    /// Hit point in body space
    pub local_pivot: Point<Real>,
    /// Camera to hit distance at pick time
    pub distance: f32,
    /// Last anchor target in world space
    pub target: Vec3,
    saved_activation: RigidBodyActivation,
}

/// Rapier world plus the picking constraint
pub struct PhysicsWorld {
    gravity: Vector<Real>,
    integration_parameters: IntegrationParameters,
    pipeline: PhysicsPipeline,
    islands: IslandManager,
    broad_phase: BroadPhase,
    narrow_phase: NarrowPhase,
    bodies: RigidBodySet,
    colliders: ColliderSet,
    impulse_joints: ImpulseJointSet,
    multibody_joints: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
    debug_pipeline: DebugRenderPipeline,
    anchor: RigidBodyHandle,
    pick_ray_length: f32,
    pick: Option<PickState>,
}

impl PhysicsWorld {
    /// Empty world with the configured gravity
    pub fn new(settings: &PhysicsSettings) -> Self {
        let mut bodies = RigidBodySet::new();
        let anchor = bodies.insert(
            RigidBodyBuilder::kinematic_position_based()
                .user_data(ANCHOR_USER_DATA)
                .build(),
        );
        let [gx, gy, gz] = settings.gravity;

        Self {
            gravity: vector![gx, gy, gz],
            integration_parameters: IntegrationParameters::default(),
            pipeline: PhysicsPipeline::new(),
            islands: IslandManager::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            bodies,
            colliders: ColliderSet::new(),
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
            debug_pipeline: DebugRenderPipeline::new(
                DebugRenderStyle::default(),
                DebugRenderMode::COLLIDER_SHAPES | DebugRenderMode::IMPULSE_JOINTS,
            ),
            anchor,
            pick_ray_length: settings.pick_ray_length,
            pick: None,
        }
    }

    /// Insert a body for `entity`
    ///
    /// Bodies start asleep so a freshly loaded scene does not settle visibly.
    pub fn add_body(&mut self, entity: Entity, desc: &BodyDesc) -> PhysicsBody {
        let builder = if desc.mass > 0.0 {
            RigidBodyBuilder::dynamic()
        } else {
            RigidBodyBuilder::fixed()
        };
        let body = builder
            .translation(desc.position)
            .rotation(Vector::y() * desc.yaw)
            .sleeping(true)
            .user_data(entity.to_user_data())
            .build();
        let body = self.bodies.insert(body);

        let collider = ColliderBuilder::new(desc.shape.clone())
            .mass(desc.mass)
            .friction(desc.friction)
            .build();
        let collider = self.colliders.insert_with_parent(collider, body, &mut self.bodies);

        PhysicsBody {
            body,
            collider,
            shape: desc.kind,
        }
    }

    /// Advance the simulation and write awake bodies back to the registry
    pub fn step(&mut self, delta_time: f32, world: &mut World) {
        if delta_time <= 0.0 {
            return;
        }
        self.integration_parameters.dt = delta_time.min(MAX_STEP);

        if let Some(pick) = &self.pick {
            if let Some(anchor) = self.bodies.get_mut(self.anchor) {
                anchor.set_next_kinematic_translation(pick.target);
            }
        }

        self.pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.islands,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );

        for handle in self.islands.active_dynamic_bodies() {
            let Some(body) = self.bodies.get(*handle) else {
                continue;
            };
            let Some(entity) = Entity::from_user_data(body.user_data) else {
                continue;
            };
            if let Some(transform) = world.get_component_mut::<Transform>(entity) {
                transform.set(body.position().to_homogeneous());
            }
        }
    }

    /// Try to grab the first dynamic body under the cursor
    ///
    /// Fixed and kinematic bodies along the ray are passed through. Returns the
    /// picked entity, or `None` when nothing dynamic was hit.
    pub fn pick_at(&mut self, context: &SimContext, x: f32, y: f32, world: &mut World) -> Option<Entity> {
        self.release(world);

        let ray = pick_ray(context, x, y, self.pick_ray_length)?;
        let (body_handle, toi) = self.first_dynamic_hit(&ray)?;
        let hit = ray.point_at(toi);

        let body = self.bodies.get_mut(body_handle)?;
        let entity = Entity::from_user_data(body.user_data)?;
        let local_pivot = body.position().inverse_transform_point(&Point::from(hit));

        let saved_activation = body.activation().clone();
        *body.activation_mut() = RigidBodyActivation::cannot_sleep();
        body.wake_up(true);

        if let Some(anchor) = self.bodies.get_mut(self.anchor) {
            anchor.set_translation(hit, true);
            anchor.set_next_kinematic_translation(hit);
        }

        let joint = SphericalJointBuilder::new()
            .local_anchor1(local_pivot)
            .local_anchor2(Point::origin())
            .build();
        let joint = self.impulse_joints.insert(body_handle, self.anchor, joint, true);

        world.add_component(entity, PickedTag);
        debug!("Picked entity {} at distance {:.2}", entity.id(), toi);

        self.pick = Some(PickState {
            entity,
            body: body_handle,
            joint,
            local_pivot,
            distance: toi,
            target: hit,
            saved_activation,
        });
        Some(entity)
    }

    /// Move the anchor along the ray under the cursor, keeping the pick distance
    ///
    /// Returns false when nothing is picked.
    pub fn drag_to(&mut self, context: &SimContext, x: f32, y: f32) -> bool {
        let Some(pick) = self.pick.as_mut() else {
            return false;
        };
        let Some(ray) = pick_ray(context, x, y, self.pick_ray_length) else {
            return false;
        };

        pick.target = ray.point_at(pick.distance);
        trace!("Drag target {:?}", pick.target);

        if let Some(anchor) = self.bodies.get_mut(self.anchor) {
            anchor.set_next_kinematic_translation(pick.target);
        }
        true
    }

    /// Drop the picked body; a no-op when nothing is picked
    pub fn release(&mut self, world: &mut World) -> bool {
        let Some(pick) = self.pick.take() else {
            return false;
        };

        self.impulse_joints.remove(pick.joint, true);
        if let Some(body) = self.bodies.get_mut(pick.body) {
            *body.activation_mut() = pick.saved_activation;
            body.wake_up(true);
        }
        world.remove_component::<PickedTag>(pick.entity);
        debug!("Released entity {}", pick.entity.id());
        true
    }

    /// Current drag, if any
    pub fn picked(&self) -> Option<&PickState> {
        self.pick.as_ref()
    }

    /// Body-space pivot stored on the drag joint
    pub fn joint_pivot(&self) -> Option<Point<Real>> {
        let pick = self.pick.as_ref()?;
        self.impulse_joints
            .get(pick.joint)
            .map(|joint| joint.data.local_anchor1())
    }

    /// Number of joints in the world
    pub fn joint_count(&self) -> usize {
        self.impulse_joints.len()
    }

    /// Mass of a body's colliders
    pub fn body_mass(&self, handle: RigidBodyHandle) -> Option<f32> {
        let body = self.bodies.get(handle)?;
        Some(
            body.colliders()
                .iter()
                .filter_map(|c| self.colliders.get(*c))
                .map(|c| c.mass_properties().mass())
                .sum(),
        )
    }

    /// Whether a body simulates
    pub fn is_dynamic(&self, handle: RigidBodyHandle) -> bool {
        self.bodies.get(handle).map_or(false, RigidBody::is_dynamic)
    }

    /// World transform of a body
    pub fn body_transform(&self, handle: RigidBodyHandle) -> Option<Mat4> {
        self.bodies.get(handle).map(|body| body.position().to_homogeneous())
    }

    /// Bodies in the world, the drag anchor included
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Collider outlines, joints and bounding boxes as a line list
    pub fn debug_lines(&mut self) -> Vec<LineVertex> {
        let mut lines = DebugLines::new();
        self.debug_pipeline.render(
            &mut lines,
            &self.bodies,
            &self.colliders,
            &self.impulse_joints,
            &self.multibody_joints,
            &self.narrow_phase,
        );
        for (_, collider) in self.colliders.iter() {
            let aabb = collider.compute_aabb();
            lines.push_box(aabb.mins.into(), aabb.maxs.into(), AABB_COLOR);
        }
        lines.take()
    }

    /// Remove every body, collider and joint
    ///
    /// Bodies go first, taking their colliders and joints with them; the shapes
    /// and mesh buffers behind the colliders are dropped last.
    pub fn teardown(&mut self, world: &mut World) {
        self.release(world);

        let handles: Vec<RigidBodyHandle> = self.bodies.iter().map(|(handle, _)| handle).collect();
        for handle in handles {
            if let Some(body) = self.bodies.remove(
                handle,
                &mut self.islands,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            ) {
                if let Some(entity) = Entity::from_user_data(body.user_data) {
                    world.remove_component::<PhysicsBody>(entity);
                }
            }
        }
        info!("Physics world torn down");
    }

    fn first_dynamic_hit(&mut self, ray: &PickRay) -> Option<(RigidBodyHandle, f32)> {
        self.query_pipeline.update(&self.bodies, &self.colliders);

        let query = Ray::new(Point::from(ray.origin), ray.direction);
        let mut hits: Vec<(ColliderHandle, f32)> = Vec::new();
        self.query_pipeline.intersections_with_ray(
            &self.bodies,
            &self.colliders,
            &query,
            ray.length,
            true,
            QueryFilter::default(),
            |collider, intersection| {
                hits.push((collider, intersection.toi));
                true
            },
        );
        hits.sort_by(|a, b| a.1.total_cmp(&b.1));

        hits.into_iter().find_map(|(collider, toi)| {
            let parent = self.colliders.get(collider)?.parent()?;
            self.bodies
                .get(parent)
                .filter(|body| body.is_dynamic())
                .map(|_| (parent, toi))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectionSettings;
    use crate::foundation::math::{Mat4Ext, Vec3};
    use approx::assert_relative_eq;

    fn context_looking_down_z() -> SimContext {
        let mut context = SimContext::new(&ProjectionSettings::default(), (800, 800));
        context.camera_position = Vec3::new(0.0, 0.0, 20.0);
        context.view = Mat4::look_at(context.camera_position, Vec3::zeros(), Vec3::y());
        context
    }

    fn spawn(physics: &mut PhysicsWorld, world: &mut World, mass: f32, position: Vec3) -> (Entity, PhysicsBody) {
        let entity = world.create_entity();
        let body = physics.add_body(
            entity,
            &BodyDesc {
                shape: SharedShape::cuboid(1.0, 1.0, 1.0),
                kind: ShapeKind::Box,
                mass,
                friction: 20.0,
                position,
                yaw: 0.0,
            },
        );
        world.add_component(entity, body);
        world.add_component(entity, Transform::new(Mat4::new_translation(&position)));
        (entity, body)
    }

    #[test]
    fn test_pick_centre_of_dynamic_box() {
        let mut world = World::new();
        let mut physics = PhysicsWorld::new(&PhysicsSettings::default());
        let (entity, body) = spawn(&mut physics, &mut world, 1.0, Vec3::zeros());
        let context = context_looking_down_z();

        assert_eq!(physics.pick_at(&context, 400.0, 400.0, &mut world), Some(entity));
        assert!(world.has_component::<PickedTag>(entity));
        assert!(physics.is_dynamic(body.body));

        let pick = physics.picked().unwrap();
        assert_relative_eq!(pick.distance, 19.0, epsilon = 1e-3);
        assert_relative_eq!(pick.local_pivot.z, 1.0, epsilon = 1e-3);
        assert_eq!(physics.joint_count(), 1);
    }

    #[test]
    fn test_wall_only_pick_adds_nothing() {
        let mut world = World::new();
        let mut physics = PhysicsWorld::new(&PhysicsSettings::default());
        let (wall, _) = spawn(&mut physics, &mut world, 0.0, Vec3::zeros());
        let context = context_looking_down_z();

        assert_eq!(physics.pick_at(&context, 400.0, 400.0, &mut world), None);
        assert!(!world.has_component::<PickedTag>(wall));
        assert_eq!(physics.joint_count(), 0);
        assert!(physics.picked().is_none());
    }

    #[test]
    fn test_pick_passes_through_static_bodies() {
        let mut world = World::new();
        let mut physics = PhysicsWorld::new(&PhysicsSettings::default());
        spawn(&mut physics, &mut world, 0.0, Vec3::new(0.0, 0.0, 5.0));
        let (behind, _) = spawn(&mut physics, &mut world, 2.0, Vec3::new(0.0, 0.0, -5.0));
        let context = context_looking_down_z();

        assert_eq!(physics.pick_at(&context, 400.0, 400.0, &mut world), Some(behind));
        assert_relative_eq!(physics.picked().unwrap().distance, 24.0, epsilon = 1e-3);
    }

    #[test]
    fn test_pick_passes_through_kinematic_bodies() {
        let mut world = World::new();
        let mut physics = PhysicsWorld::new(&PhysicsSettings::default());
        let blocker = physics.bodies.insert(
            RigidBodyBuilder::kinematic_position_based()
                .translation(vector![0.0, 0.0, 5.0])
                .build(),
        );
        let collider = ColliderBuilder::cuboid(1.0, 1.0, 1.0).build();
        physics.colliders.insert_with_parent(collider, blocker, &mut physics.bodies);
        let (behind, body) = spawn(&mut physics, &mut world, 1.0, Vec3::new(0.0, 0.0, -5.0));
        let context = context_looking_down_z();

        assert_eq!(physics.pick_at(&context, 400.0, 400.0, &mut world), Some(behind));
        let pick = physics.picked().unwrap();
        assert_eq!(pick.body, body.body);
        assert_relative_eq!(pick.distance, 24.0, epsilon = 1e-3);
    }

    #[test]
    fn test_release_is_idempotent() {
        let mut world = World::new();
        let mut physics = PhysicsWorld::new(&PhysicsSettings::default());
        let (entity, _) = spawn(&mut physics, &mut world, 1.0, Vec3::zeros());
        let context = context_looking_down_z();

        assert!(!physics.release(&mut world));

        physics.pick_at(&context, 400.0, 400.0, &mut world);
        assert!(physics.release(&mut world));
        assert!(!world.has_component::<PickedTag>(entity));
        assert_eq!(physics.joint_count(), 0);
        assert!(!physics.release(&mut world));
    }

    #[test]
    fn test_drag_preserves_depth_and_pivot() {
        let mut world = World::new();
        let mut physics = PhysicsWorld::new(&PhysicsSettings::default());
        spawn(&mut physics, &mut world, 1.0, Vec3::zeros());
        let context = context_looking_down_z();

        physics.pick_at(&context, 410.0, 395.0, &mut world).unwrap();
        let pivot = physics.joint_pivot().unwrap();
        let distance = physics.picked().unwrap().distance;
        assert_relative_eq!(pivot, physics.picked().unwrap().local_pivot);

        for (x, y) in [(500.0, 300.0), (120.0, 640.0), (399.0, 401.0)] {
            assert!(physics.drag_to(&context, x, y));
            physics.step(1.0 / 60.0, &mut world);

            let target = physics.picked().unwrap().target;
            assert_relative_eq!((target - context.camera_position).norm(), distance, epsilon = 1e-3);
            assert_relative_eq!(physics.joint_pivot().unwrap(), pivot);
        }
    }

    #[test]
    fn test_step_writes_awake_bodies_only() {
        let mut world = World::new();
        let mut physics = PhysicsWorld::new(&PhysicsSettings::default());
        let (sleeper, _) = spawn(&mut physics, &mut world, 1.0, Vec3::new(5.0, 0.0, 0.0));
        let (dragged, _) = spawn(&mut physics, &mut world, 1.0, Vec3::zeros());
        world.get_component_mut::<Transform>(sleeper).unwrap().mark_clean();
        world.get_component_mut::<Transform>(dragged).unwrap().mark_clean();

        let context = context_looking_down_z();
        physics.pick_at(&context, 400.0, 400.0, &mut world).unwrap();
        physics.step(1.0 / 60.0, &mut world);

        assert!(world.get_component::<Transform>(dragged).unwrap().is_dirty());
        assert!(!world.get_component::<Transform>(sleeper).unwrap().is_dirty());
    }

    #[test]
    fn test_mass_and_teardown() {
        let mut world = World::new();
        let mut physics = PhysicsWorld::new(&PhysicsSettings::default());
        let (entity, body) = spawn(&mut physics, &mut world, 0.5, Vec3::zeros());

        assert_relative_eq!(physics.body_mass(body.body).unwrap(), 0.5, epsilon = 1e-5);
        assert!(!physics.debug_lines().is_empty());

        physics.teardown(&mut world);
        assert_eq!(physics.body_count(), 0);
        assert!(!world.has_component::<PhysicsBody>(entity));
    }
}
