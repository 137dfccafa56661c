//! Rigid body simulation.
//!
//! [`PhysicsWorld`] is the single explicit handle to the physics engine: everything that creates
//! shapes or bodies receives it as an argument. [`RigidBodyRegistry`] pairs scene objects with
//! bodies and copies the simulated transforms onto the scene once per frame.
//!
//! Frame deltas are turned into fixed internal steps: the remainder that does not fill a whole
//! step is carried over to the next frame and used to extrapolate the reported motion states.

use cgmath::{Quaternion, Vector3};
use log::{debug, warn};
use rapier3d::{
    na::{self, DMatrix},
    prelude::*,
};

use crate::{
    config::PhysicsConfig,
    data_structures::{instance::Instance, scene_graph::SceneGraph, scene_graph::VisualId},
    terrain::HeightfieldShape,
};

/// Handle of a body inside a [`PhysicsWorld`].
pub type BodyHandle = RigidBodyHandle;

/// Collision primitive of a body.
#[derive(Clone, Debug)]
pub enum Shape {
    Sphere { radius: f32 },
    Heightfield(HeightfieldShape),
}

/// Everything needed to insert one body. A mass of 0 makes the body static.
#[derive(Clone, Debug)]
pub struct BodyDesc {
    pub shape: Shape,
    pub mass: f32,
    pub position: Vector3<f32>,
    pub rotation: Quaternion<f32>,
    pub friction: f32,
    /// Resistance against rolling, applied as angular damping.
    pub rolling_friction: f32,
    /// Restrict rotation to the vertical axis.
    pub upright: bool,
}

impl BodyDesc {
    pub fn new(shape: Shape, mass: f32) -> Self {
        Self {
            shape,
            mass,
            position: Vector3::new(0.0, 0.0, 0.0),
            rotation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
            friction: 0.5,
            rolling_friction: 0.0,
            upright: false,
        }
    }

    pub fn at(mut self, position: Vector3<f32>) -> Self {
        self.position = position;
        self
    }

    pub fn with_friction(mut self, friction: f32) -> Self {
        self.friction = friction;
        self
    }

    pub fn with_rolling_friction(mut self, rolling_friction: f32) -> Self {
        self.rolling_friction = rolling_friction;
        self
    }

    pub fn upright(mut self) -> Self {
        self.upright = true;
        self
    }

    pub fn is_static(&self) -> bool {
        self.mass <= 0.0
    }

    fn shape_name(&self) -> &'static str {
        match self.shape {
            Shape::Sphere { .. } => "sphere",
            Shape::Heightfield(_) => "heightfield",
        }
    }
}

pub struct PhysicsWorld {
    gravity: Vector<Real>,
    fixed_time_step: f32,
    /// Time not yet consumed by a whole internal step.
    local_time: f32,
    rigid_body_set: RigidBodySet,
    collider_set: ColliderSet,
    integration_parameters: IntegrationParameters,
    physics_pipeline: PhysicsPipeline,
    island_manager: IslandManager,
    broad_phase: DefaultBroadPhase,
    narrow_phase: NarrowPhase,
    impulse_joint_set: ImpulseJointSet,
    multibody_joint_set: MultibodyJointSet,
    ccd_solver: CCDSolver,
    query_pipeline: QueryPipeline,
}

impl PhysicsWorld {
    pub fn new(config: &PhysicsConfig) -> Self {
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = config.fixed_time_step;
        Self {
            gravity: vector![0.0, config.gravity, 0.0],
            fixed_time_step: config.fixed_time_step,
            local_time: 0.0,
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            integration_parameters,
            physics_pipeline: PhysicsPipeline::new(),
            island_manager: IslandManager::new(),
            broad_phase: DefaultBroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            impulse_joint_set: ImpulseJointSet::new(),
            multibody_joint_set: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            query_pipeline: QueryPipeline::new(),
        }
    }

    pub fn body_count(&self) -> usize {
        self.rigid_body_set.len()
    }

    /// Insert a body. Its motion state is initialised from `desc` right away.
    pub fn add_body(&mut self, desc: BodyDesc) -> BodyHandle {
        let isometry = na::Isometry3::from_parts(
            na::Translation3::new(desc.position.x, desc.position.y, desc.position.z),
            to_unit_quaternion(desc.rotation),
        );
        let builder = if desc.is_static() {
            RigidBodyBuilder::fixed()
        } else {
            RigidBodyBuilder::dynamic()
        };
        let mut builder = builder
            .position(isometry)
            .angular_damping(desc.rolling_friction);
        if desc.upright {
            builder = builder.enabled_rotations(false, true, false);
        }
        let handle = self.rigid_body_set.insert(builder.build());

        let mut collider = collider_for(&desc.shape).friction(desc.friction);
        if !desc.is_static() {
            collider = collider.mass(desc.mass);
        }
        self.collider_set
            .insert_with_parent(collider.build(), handle, &mut self.rigid_body_set);
        debug!("added {} body (mass {})", desc.shape_name(), desc.mass);
        handle
    }

    /**
     * Advance the world by the wall-clock `delta`.
     *
     * The delta is accumulated and consumed in whole fixed steps, at most `max_sub_steps` of them;
     * time beyond that budget is dropped so a long stall cannot snowball. With `max_sub_steps == 0`
     * the world takes a single step of exactly `delta`. Returns the number of steps taken.
     */
    pub fn step_simulation(&mut self, delta: f32, max_sub_steps: u32) -> u32 {
        if delta.is_nan() || delta <= 0.0 {
            return 0;
        }
        if max_sub_steps == 0 {
            self.local_time = 0.0;
            self.integration_parameters.dt = delta;
            self.single_step();
            self.integration_parameters.dt = self.fixed_time_step;
            return 1;
        }

        self.local_time += delta;
        let mut steps = ((self.local_time + f32::EPSILON) / self.fixed_time_step).floor() as u32;
        self.local_time = (self.local_time - steps as f32 * self.fixed_time_step).max(0.0);
        if steps > max_sub_steps {
            debug!("dropping {} physics steps", steps - max_sub_steps);
            steps = max_sub_steps;
        }
        for _ in 0..steps {
            self.single_step();
        }
        steps
    }

    fn single_step(&mut self) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_body_set,
            &mut self.collider_set,
            &mut self.impulse_joint_set,
            &mut self.multibody_joint_set,
            &mut self.ccd_solver,
            Some(&mut self.query_pipeline),
            &(),
            &(),
        );
    }

    /// Interpolated world transform of a body, or `None` if the body does not exist.
    ///
    /// The simulated pose is extrapolated by the time left over from the last
    /// [`Self::step_simulation`] call so motion stays smooth between fixed steps.
    pub fn motion_state(&self, handle: BodyHandle) -> Option<Instance> {
        let body = self.rigid_body_set.get(handle)?;
        let position = body.position();
        let (translation, rotation) = if body.is_dynamic() && self.local_time > 0.0 {
            let t = self.local_time;
            let translation = position.translation.vector + body.linvel() * t;
            let rotation = na::UnitQuaternion::from_scaled_axis(body.angvel() * t) * position.rotation;
            (translation, rotation)
        } else {
            (position.translation.vector, position.rotation)
        };
        Some(Instance {
            position: Vector3::new(translation.x, translation.y, translation.z),
            rotation: Quaternion::new(rotation.w, rotation.i, rotation.j, rotation.k),
            scale: Vector3::new(1.0, 1.0, 1.0),
        })
    }

    /// Simulated position without extrapolation.
    pub fn body_position(&self, handle: BodyHandle) -> Option<Vector3<f32>> {
        let translation = self.rigid_body_set.get(handle)?.translation();
        Some(Vector3::new(translation.x, translation.y, translation.z))
    }

    pub fn linear_velocity(&self, handle: BodyHandle) -> Option<Vector3<f32>> {
        let linvel = self.rigid_body_set.get(handle)?.linvel();
        Some(Vector3::new(linvel.x, linvel.y, linvel.z))
    }
}

fn to_unit_quaternion(rotation: Quaternion<f32>) -> na::UnitQuaternion<f32> {
    na::UnitQuaternion::from_quaternion(na::Quaternion::new(
        rotation.s, rotation.v.x, rotation.v.y, rotation.v.z,
    ))
}

fn collider_for(shape: &Shape) -> ColliderBuilder {
    match shape {
        Shape::Sphere { radius } => ColliderBuilder::ball(*radius),
        Shape::Heightfield(field) => {
            let footprint = field.footprint();
            ColliderBuilder::heightfield(
                heightfield_matrix(field),
                vector![footprint.x, footprint.y, footprint.z],
            )
        }
    }
}

// Rows run along z, columns along x. The engine needs at least two samples per axis, a single
// row or column is repeated.
fn heightfield_matrix(field: &HeightfieldShape) -> DMatrix<f32> {
    let rows = field.rows.max(2);
    let cols = field.cols.max(2);
    DMatrix::from_fn(rows, cols, |r, c| {
        let r = r.min(field.rows.saturating_sub(1));
        let c = c.min(field.cols.saturating_sub(1));
        field.heights.get(r * field.cols + c).copied().unwrap_or(0.0) * field.height_scale
    })
}

/// Pairs of scene objects and the bodies that move them.
#[derive(Clone, Debug, Default)]
pub struct RigidBodyRegistry {
    pairs: Vec<(VisualId, BodyHandle)>,
}

impl RigidBodyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a pair. A visual has at most one body: registering again replaces the old one.
    pub fn add_body(&mut self, visual: VisualId, body: BodyHandle) {
        if let Some(pair) = self.pairs.iter_mut().find(|(v, _)| *v == visual) {
            warn!("visual {:?} already had a body, replacing it", visual);
            pair.1 = body;
            return;
        }
        self.pairs.push((visual, body));
    }

    pub fn body_of(&self, visual: VisualId) -> Option<BodyHandle> {
        self.pairs.iter().find(|(v, _)| *v == visual).map(|(_, b)| *b)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /**
     * Step the world, then copy every body's position and orientation onto its visual.
     *
     * Pairs whose body or visual is missing are skipped for this frame. Visual scale is left
     * untouched. Returns the number of visuals that were updated.
     */
    pub fn step(
        &self,
        physics: &mut PhysicsWorld,
        scene: &mut SceneGraph,
        delta: f32,
        max_sub_steps: u32,
    ) -> usize {
        physics.step_simulation(delta, max_sub_steps);
        let mut synced = 0;
        for (visual, body) in &self.pairs {
            let Some(state) = physics.motion_state(*body) else {
                continue;
            };
            let Some(transform) = scene.transform_mut(*visual) else {
                continue;
            };
            transform.position = state.position;
            transform.rotation = state.rotation;
            synced += 1;
        }
        synced
    }
}
