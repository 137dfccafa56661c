//! Runtime animation: actions bound to clips, crossfades, and pose blending.
//!
//! An [`AnimationMixer`] owns one [`AnimationAction`] per bound clip. Every frame
//! [`AnimationMixer::update`] advances the time cursor of each playing action and the weight
//! ramps of any running fade; [`AnimationMixer::pose`] then blends every weighted action into one
//! [`Pose`] for a skeleton.

use std::collections::HashMap;

use cgmath::{Quaternion, Vector3, VectorSpace};
use log::{debug, warn};

pub use crate::resources::animation::{AnimationClip, Joint, Keyframes, Sample, Skeleton, Track};
use crate::{data_structures::instance::Instance, resources::animation::slerp_shortest};

/// Handle of an action inside its [`AnimationMixer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ActionId(usize);

/// A linear weight ramp.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Fade {
    from: f32,
    to: f32,
    duration: f32,
    elapsed: f32,
}

impl Fade {
    fn factor(&self) -> f32 {
        if self.duration <= 0.0 {
            return self.to;
        }
        let progress = (self.elapsed / self.duration).clamp(0.0, 1.0);
        self.from + (self.to - self.from) * progress
    }

    fn is_finished(&self) -> bool {
        self.elapsed >= self.duration
    }
}

/// A clip bound to a mixer: enabled flag, time cursor, weight and time scale.
///
/// Actions always loop.
#[derive(Clone, Debug)]
pub struct AnimationAction {
    clip: AnimationClip,
    enabled: bool,
    running: bool,
    time: f32,
    weight: f32,
    time_scale: f32,
    fade: Option<Fade>,
}

impl AnimationAction {
    fn new(clip: AnimationClip) -> Self {
        Self {
            clip,
            enabled: true,
            running: false,
            time: 0.0,
            weight: 1.0,
            time_scale: 1.0,
            fade: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.clip.name
    }

    pub fn duration(&self) -> f32 {
        self.clip.duration()
    }

    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn set_time(&mut self, time: f32) {
        self.time = time;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_running(&self) -> bool {
        self.running && self.enabled
    }

    pub fn is_fading(&self) -> bool {
        self.fade.is_some()
    }

    /// Start advancing the time cursor.
    pub fn play(&mut self) {
        self.enabled = true;
        self.running = true;
    }

    /// Halt and rewind.
    pub fn stop(&mut self) {
        self.running = false;
        self.time = 0.0;
        self.fade = None;
    }

    /// Weight including any running fade. A disabled action weighs nothing.
    pub fn effective_weight(&self) -> f32 {
        if !self.enabled {
            return 0.0;
        }
        self.weight * self.fade.map_or(1.0, |fade| fade.factor())
    }

    /// Set the weight and cancel any running fade.
    pub fn set_effective_weight(&mut self, weight: f32) {
        self.weight = weight;
        self.fade = None;
    }

    pub fn set_effective_time_scale(&mut self, time_scale: f32) {
        self.time_scale = time_scale;
    }

    pub fn fade_in(&mut self, duration: f32) {
        self.schedule_fade(duration, 0.0, 1.0);
    }

    pub fn fade_out(&mut self, duration: f32) {
        self.schedule_fade(duration, 1.0, 0.0);
    }

    fn schedule_fade(&mut self, duration: f32, from: f32, to: f32) {
        self.fade = Some(Fade {
            from,
            to,
            duration: duration.max(0.0),
            elapsed: 0.0,
        });
    }

    fn update(&mut self, delta: f32) {
        if !self.running || !self.enabled {
            return;
        }
        if let Some(fade) = self.fade.as_mut() {
            fade.elapsed += delta;
            if fade.is_finished() {
                let faded_out = fade.to == 0.0;
                self.fade = None;
                if faded_out {
                    self.enabled = false;
                    debug!("{} faded out", self.clip.name);
                    return;
                }
            }
        }
        self.time += delta * self.time_scale;
        let duration = self.clip.duration();
        if duration > 0.0 {
            self.time = self.time.rem_euclid(duration);
        } else {
            self.time = 0.0;
        }
    }
}

/// Plays actions and blends them into poses.
#[derive(Clone, Debug, Default)]
pub struct AnimationMixer {
    actions: Vec<AnimationAction>,
    by_name: HashMap<String, ActionId>,
    time: f32,
}

impl AnimationMixer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `clip` to a new action, or return the action already bound to a clip of that name.
    pub fn clip_action(&mut self, clip: AnimationClip) -> ActionId {
        if let Some(id) = self.by_name.get(&clip.name) {
            return *id;
        }
        let id = ActionId(self.actions.len());
        self.by_name.insert(clip.name.clone(), id);
        self.actions.push(AnimationAction::new(clip));
        id
    }

    pub fn action(&self, id: ActionId) -> Option<&AnimationAction> {
        self.actions.get(id.0)
    }

    pub fn action_mut(&mut self, id: ActionId) -> Option<&mut AnimationAction> {
        self.actions.get_mut(id.0)
    }

    pub fn action_by_name(&self, name: &str) -> Option<ActionId> {
        self.by_name.get(name).copied()
    }

    pub fn actions(&self) -> impl Iterator<Item = (ActionId, &AnimationAction)> {
        self.actions
            .iter()
            .enumerate()
            .map(|(idx, action)| (ActionId(idx), action))
    }

    /// Total time the mixer has been advanced.
    pub fn time(&self) -> f32 {
        self.time
    }

    pub fn play(&mut self, id: ActionId) {
        match self.actions.get_mut(id.0) {
            Some(action) => action.play(),
            None => warn!("tried to play missing action {:?}", id),
        }
    }

    /// Fade `previous` out and `action` in, both over `duration` seconds.
    pub fn crossfade_from(&mut self, action: ActionId, previous: ActionId, duration: f32) {
        if action == previous {
            return;
        }
        if let Some(previous) = self.actions.get_mut(previous.0) {
            previous.fade_out(duration);
        }
        if let Some(action) = self.actions.get_mut(action.0) {
            action.fade_in(duration);
        }
    }

    pub fn update(&mut self, delta: f32) {
        self.time += delta;
        for action in self.actions.iter_mut() {
            action.update(delta);
        }
    }

    /**
     * Blend all weighted actions into local joint transforms, then resolve world transforms.
     *
     * Per joint and channel the samples are averaged by weight. Where the summed weight stays
     * below 1 the result is blended back towards the rest transform; joints no action drives
     * keep their rest transform.
     */
    pub fn pose(&self, skeleton: &Skeleton) -> Pose {
        let mut blend = vec![JointBlend::default(); skeleton.len()];
        for action in &self.actions {
            let weight = action.effective_weight();
            if !action.is_running() || weight <= 0.0 {
                continue;
            }
            for track in &action.clip.tracks {
                let Some(joint) = skeleton.index_of(&track.target) else {
                    continue;
                };
                match track.sample(action.time) {
                    Some(Sample::Translation(value)) => {
                        blend[joint].translation.add(value, weight, Vector3::lerp)
                    }
                    Some(Sample::Rotation(value)) => {
                        blend[joint].rotation.add(value, weight, slerp_shortest)
                    }
                    Some(Sample::Scale(value)) => blend[joint].scale.add(value, weight, Vector3::lerp),
                    None => {}
                }
            }
        }

        let local: Vec<Instance> = skeleton
            .joints()
            .iter()
            .zip(blend)
            .map(|(joint, blend)| Instance {
                position: blend.translation.resolve(joint.rest.position, Vector3::lerp),
                rotation: blend.rotation.resolve(joint.rest.rotation, slerp_shortest),
                scale: blend.scale.resolve(joint.rest.scale, Vector3::lerp),
            })
            .collect();
        Pose::from_local(skeleton, local)
    }
}

#[derive(Clone, Copy, Debug)]
struct Channel<T> {
    value: Option<T>,
    weight: f32,
}

impl<T> Default for Channel<T> {
    fn default() -> Self {
        Self {
            value: None,
            weight: 0.0,
        }
    }
}

impl<T: Copy> Channel<T> {
    fn add(&mut self, value: T, weight: f32, mix: impl Fn(T, T, f32) -> T) {
        self.value = Some(match self.value {
            Some(current) => mix(current, value, weight / (self.weight + weight)),
            None => value,
        });
        self.weight += weight;
    }

    fn resolve(self, rest: T, mix: impl Fn(T, T, f32) -> T) -> T {
        match self.value {
            Some(value) if self.weight < 1.0 => mix(value, rest, 1.0 - self.weight),
            Some(value) => value,
            None => rest,
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct JointBlend {
    translation: Channel<Vector3<f32>>,
    rotation: Channel<Quaternion<f32>>,
    scale: Channel<Vector3<f32>>,
}

/// Local and world transform of every joint of a skeleton, indexed like [`Skeleton::joints`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pose {
    local: Vec<Instance>,
    world: Vec<Instance>,
}

impl Pose {
    /// The pose of a skeleton standing in its rest transforms.
    pub fn rest(skeleton: &Skeleton) -> Self {
        let local = skeleton.joints().iter().map(|joint| joint.rest).collect();
        Self::from_local(skeleton, local)
    }

    fn from_local(skeleton: &Skeleton, local: Vec<Instance>) -> Self {
        let mut world: Vec<Instance> = Vec::with_capacity(local.len());
        for (joint, transform) in skeleton.joints().iter().zip(&local) {
            let resolved = match joint.parent.and_then(|parent| world.get(parent)) {
                Some(parent) => parent * transform,
                None => *transform,
            };
            world.push(resolved);
        }
        Self { local, world }
    }

    pub fn local(&self) -> &[Instance] {
        &self.local
    }

    pub fn world(&self) -> &[Instance] {
        &self.world
    }

    pub fn len(&self) -> usize {
        self.local.len()
    }

    pub fn is_empty(&self) -> bool {
        self.local.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fade_factor_ramps_linearly() {
        let mut fade = Fade {
            from: 0.0,
            to: 1.0,
            duration: 0.5,
            elapsed: 0.0,
        };
        assert_eq!(fade.factor(), 0.0);
        fade.elapsed = 0.25;
        assert_eq!(fade.factor(), 0.5);
        fade.elapsed = 2.0;
        assert_eq!(fade.factor(), 1.0);
        assert!(fade.is_finished());
    }

    #[test]
    fn channel_averages_by_weight() {
        let mut channel = Channel::default();
        channel.add(Vector3::new(0.0, 0.0, 0.0), 0.5, Vector3::lerp);
        channel.add(Vector3::new(2.0, 0.0, 0.0), 0.5, Vector3::lerp);
        let value = channel.resolve(Vector3::new(100.0, 0.0, 0.0), Vector3::lerp);
        assert_eq!(value, Vector3::new(1.0, 0.0, 0.0));
    }
}
