//! The player character and its animation state machine.
//!
//! A [`Character`] is built before its assets exist. The mesh and every clip arrive later as
//! [`Loadable`] values; until the mesh and the clip of a state are both ready, entering that
//! state is deferred and updates do nothing.

use std::collections::HashMap;

use cgmath::{Quaternion, Rad, Rotation, Rotation3, Vector3};
use log::{debug, info, warn};

use crate::{
    animation::{ActionId, AnimationClip, AnimationMixer, Pose, Skeleton},
    config::CharacterConfig,
    data_structures::{
        instance::Instance,
        scene_graph::{SceneGraph, VisualId, VisualKind},
    },
    physics::{BodyDesc, Shape},
    resources::{animation::CharacterModel, animation::slerp_shortest, loadable::Loadable},
};

/// Yaw (around +Y) and pitch (around +X) of a rotation, decomposed in YXZ order. Roll is dropped.
pub fn yaw_pitch(rotation: Quaternion<f32>) -> (f32, f32) {
    let (w, x, y, z) = (rotation.s, rotation.v.x, rotation.v.y, rotation.v.z);
    let m11 = 1.0 - 2.0 * (y * y + z * z);
    let m13 = 2.0 * (x * z + w * y);
    let m23 = 2.0 * (y * z - w * x);
    let m31 = 2.0 * (x * z - w * y);
    let m33 = 1.0 - 2.0 * (x * x + y * y);

    let pitch = (-m23.clamp(-1.0, 1.0)).asin();
    let yaw = if m23.abs() < 0.999_999_9 {
        m13.atan2(m33)
    } else {
        (-m31).atan2(m11)
    };
    (yaw, pitch)
}

/// The rotation around +Y only, with pitch and roll removed.
pub fn yaw_only(rotation: Quaternion<f32>) -> Quaternion<f32> {
    Quaternion::from_angle_y(Rad(yaw_pitch(rotation).0))
}

/// Orientations of a character.
///
/// `head` follows the input directly. `body_target` is derived from it by the active state and
/// `body` only ever moves towards `body_target` by spherical interpolation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Direction {
    head: Quaternion<f32>,
    body_target: Quaternion<f32>,
    body: Quaternion<f32>,
}

impl Direction {
    pub fn new(initial: Quaternion<f32>) -> Self {
        Self {
            head: initial,
            body_target: initial,
            body: initial,
        }
    }

    pub fn head(&self) -> Quaternion<f32> {
        self.head
    }

    pub fn set_head(&mut self, head: Quaternion<f32>) {
        self.head = head;
    }

    pub fn body_target(&self) -> Quaternion<f32> {
        self.body_target
    }

    pub fn body(&self) -> Quaternion<f32> {
        self.body
    }

    fn turn_body(&mut self, factor: f32) {
        self.body = slerp_shortest(self.body, self.body_target, factor);
    }

    fn face_head(&mut self) {
        self.body_target = yaw_only(self.head);
    }
}

impl Default for Direction {
    fn default() -> Self {
        Self::new(Quaternion::new(1.0, 0.0, 0.0, 0.0))
    }
}

/// Outcome of [`Character::set_state`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Entered,
    /// The state was already active.
    Unchanged,
    /// The mesh or the state's clip is not loaded yet, or the state is unknown.
    Deferred,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CharacterState {
    Idle,
    Walk,
    Run,
}

impl CharacterState {
    /// Name of the state, equal to the name of the action it plays.
    pub fn name(&self) -> &'static str {
        match self {
            CharacterState::Idle => "idle",
            CharacterState::Walk => "walk",
            CharacterState::Run => "run",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "idle" => Some(CharacterState::Idle),
            "walk" => Some(CharacterState::Walk),
            "run" => Some(CharacterState::Run),
            _ => None,
        }
    }

    fn is_gait(&self) -> bool {
        matches!(self, CharacterState::Walk | CharacterState::Run)
    }

    /**
     * Start this state's action.
     *
     * Coming from another state the action crossfades in. Between walk and run the time cursor
     * keeps the gait phase by scaling with the ratio of clip durations; every other transition
     * restarts the action at full weight and normal speed.
     */
    fn enter(
        self,
        previous: Option<(CharacterState, ActionId)>,
        action: ActionId,
        mixer: &mut AnimationMixer,
        crossfade_duration: f32,
    ) {
        let Some((previous, previous_action)) = previous else {
            mixer.play(action);
            return;
        };
        let (previous_time, previous_duration) = match mixer.action(previous_action) {
            Some(prev) => (prev.time(), prev.duration()),
            None => (0.0, 0.0),
        };
        let Some(current) = mixer.action_mut(action) else {
            return;
        };
        current.set_enabled(true);
        if self.is_gait() && previous.is_gait() && previous_duration > 0.0 {
            let ratio = current.duration() / previous_duration;
            current.set_time(previous_time * ratio);
        } else {
            current.set_time(0.0);
            current.set_effective_time_scale(1.0);
            current.set_effective_weight(1.0);
        }
        mixer.crossfade_from(action, previous_action, crossfade_duration);
        mixer.play(action);
    }

    fn exit(self) {
        debug!("leaving {}", self.name());
    }

    /// Per-frame orientation and movement. Returns the velocity the state asks for.
    fn update(
        self,
        delta: f32,
        direction: &mut Direction,
        mesh: &mut Instance,
        config: &CharacterConfig,
    ) -> Vector3<f32> {
        let forward = Vector3::new(0.0, 0.0, 1.0);
        match self {
            CharacterState::Idle => {
                let (head_yaw, _) = yaw_pitch(direction.head);
                let (body_yaw, _) = yaw_pitch(direction.body);
                // Raw difference, not wrapped: facing across the ±180° seam also retargets.
                if (head_yaw - body_yaw).abs() > config.idle_yaw_threshold {
                    direction.face_head();
                }
                direction.turn_body(config.body_slerp_factor);
                Vector3::new(0.0, 0.0, 0.0)
            }
            CharacterState::Walk => {
                // The velocity is reported but not applied to the body.
                let velocity = direction.body.rotate_vector(forward) * config.walk_speed * delta;
                direction.turn_body(config.body_slerp_factor);
                velocity
            }
            CharacterState::Run => {
                direction.face_head();
                let velocity = direction.body.rotate_vector(forward) * config.run_speed * delta;
                mesh.position += velocity;
                direction.turn_body(config.body_slerp_factor);
                velocity
            }
        }
    }
}

/// Everything that exists once the character model has loaded.
#[derive(Clone, Debug)]
pub struct CharacterMesh {
    pub visual: VisualId,
    pub skeleton: Skeleton,
    /// Sphere body matching the mesh placement. It is described but never inserted into a
    /// physics world, so the character neither falls nor pushes other bodies.
    pub body: BodyDesc,
}

pub struct Character {
    config: CharacterConfig,
    mesh: Loadable<CharacterMesh>,
    clips: HashMap<String, Loadable<ActionId>>,
    default_state: Option<String>,
    mixer: AnimationMixer,
    state: Option<CharacterState>,
    direction: Direction,
    velocity: Vector3<f32>,
}

impl Character {
    pub fn new(config: &CharacterConfig) -> Self {
        Self {
            config: config.clone(),
            mesh: Loadable::Pending,
            clips: HashMap::new(),
            default_state: None,
            mixer: AnimationMixer::new(),
            state: None,
            direction: Direction::default(),
            velocity: Vector3::new(0.0, 0.0, 0.0),
        }
    }

    /// Request the clip for `name`. A default clip is entered as soon as it can be.
    pub fn load_animation(&mut self, name: &str, default: bool) {
        self.clips.entry(name.to_string()).or_default();
        if default {
            self.default_state = Some(name.to_string());
        }
    }

    /**
     * Settle the model request.
     *
     * On success the mesh is added to the scene and a sphere body with upright rotation is
     * described at its position. The description is kept, not simulated.
     */
    pub fn resolve_mesh(&mut self, result: anyhow::Result<CharacterModel>, scene: &mut SceneGraph) {
        if !self.mesh.is_pending() {
            warn!("character mesh already settled");
            return;
        }
        let model = match result {
            Ok(model) => model,
            Err(err) => {
                warn!("character mesh failed to load: {err:#}");
                self.mesh = Loadable::Failed(err);
                return;
            }
        };

        let transform = Instance::from(Vector3::new(0.0, self.config.spawn_height, 0.0))
            .with_uniform_scale(self.config.mesh_scale);
        let visual = scene.add(
            VisualKind::SkinnedMesh {
                name: "character".to_string(),
            },
            transform,
        );
        let body = BodyDesc::new(
            Shape::Sphere {
                radius: self.config.body_radius,
            },
            self.config.body_mass,
        )
        .at(transform.position)
        .upright();
        for clip in model.clips {
            self.mixer.clip_action(clip);
        }
        info!("character ready with {} joints", model.skeleton.len());
        self.mesh = Loadable::Ready(CharacterMesh {
            visual,
            skeleton: model.skeleton,
            body,
        });
        self.enter_default();
    }

    /// Settle the clip request for `name`, binding the clip to an action of the same name.
    pub fn resolve_animation(&mut self, name: &str, result: anyhow::Result<AnimationClip>) {
        let slot = self.clips.entry(name.to_string()).or_default();
        let bound = match result {
            Ok(mut clip) => {
                clip.name = name.to_string();
                Ok(self.mixer.clip_action(clip))
            }
            Err(err) => {
                warn!("animation {name} failed to load: {err:#}");
                Err(err)
            }
        };
        if slot.resolve(bound) && self.default_state.as_deref() == Some(name) {
            self.enter_default();
        }
    }

    fn enter_default(&mut self) {
        if self.state.is_some() {
            return;
        }
        if let Some(name) = self.default_state.clone() {
            self.set_state(&name);
        }
    }

    fn action_for(&self, state: CharacterState) -> Option<ActionId> {
        self.clips.get(state.name()).and_then(Loadable::ready).copied()
    }

    /// Switch to the state called `name`, unless it is already active.
    pub fn set_state(&mut self, name: &str) -> Transition {
        if self.state.is_some_and(|state| state.name() == name) {
            return Transition::Unchanged;
        }
        let Some(next) = CharacterState::from_name(name) else {
            warn!("unknown character state {name}");
            return Transition::Deferred;
        };
        if !self.mesh.is_ready() {
            return Transition::Deferred;
        }
        let Some(action) = self.action_for(next) else {
            debug!("{name} is not loaded yet");
            return Transition::Deferred;
        };

        let previous = self.state.take();
        if let Some(previous) = previous {
            previous.exit();
        }
        self.state = Some(next);
        let previous = previous.and_then(|state| self.action_for(state).map(|action| (state, action)));
        next.enter(previous, action, &mut self.mixer, self.config.crossfade_duration);
        debug!("entered {name}");
        Transition::Entered
    }

    pub fn state(&self) -> Option<CharacterState> {
        self.state
    }

    /// Advance all actions.
    pub fn update_animation(&mut self, delta: f32) {
        self.mixer.update(delta);
    }

    /// Run the active state for one frame. Does nothing before a state was entered.
    pub fn update(&mut self, delta: f32, scene: &mut SceneGraph) {
        let (Some(state), Some(mesh)) = (self.state, self.mesh.ready()) else {
            return;
        };
        let Some(transform) = scene.transform_mut(mesh.visual) else {
            return;
        };
        self.velocity = state.update(delta, &mut self.direction, transform, &self.config);
    }

    pub fn set_head(&mut self, head: Quaternion<f32>) {
        self.direction.set_head(head);
    }

    pub fn direction(&self) -> &Direction {
        &self.direction
    }

    /// Velocity requested by the last update.
    pub fn velocity(&self) -> Vector3<f32> {
        self.velocity
    }

    pub fn mixer(&self) -> &AnimationMixer {
        &self.mixer
    }

    pub fn action(&self, name: &str) -> Option<ActionId> {
        self.clips.get(name).and_then(Loadable::ready).copied()
    }

    pub fn mesh(&self) -> Option<&CharacterMesh> {
        self.mesh.ready()
    }

    pub fn body(&self) -> Option<&BodyDesc> {
        self.mesh.ready().map(|mesh| &mesh.body)
    }

    /// Mesh and default clip are both loaded.
    pub fn is_ready(&self) -> bool {
        let default_ready = match &self.default_state {
            Some(name) => self.action(name).is_some(),
            None => self.clips.values().any(Loadable::is_ready),
        };
        self.mesh.is_ready() && default_ready
    }

    /// Blended pose of the loaded skeleton.
    pub fn pose(&self) -> Option<Pose> {
        self.mesh.ready().map(|mesh| self.mixer.pose(&mesh.skeleton))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn yaw_only_drops_pitch() {
        let rotation = Quaternion::from_angle_y(Rad(1.0)) * Quaternion::from_angle_x(Rad(0.3));
        let (yaw, pitch) = yaw_pitch(yaw_only(rotation));
        assert!((yaw - 1.0).abs() < 1e-5);
        assert!(pitch.abs() < 1e-5);
    }
}
