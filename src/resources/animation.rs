//! Loaded animation data: keyframe tracks, clips and the skeleton they drive.

use std::collections::HashMap;

use cgmath::{InnerSpace, Quaternion, Vector3, VectorSpace};

use crate::data_structures::instance::Instance;

#[derive(Clone, Debug)]
pub enum Keyframes {
    Translation(Vec<Vector3<f32>>),
    Rotation(Vec<Quaternion<f32>>),
    Scale(Vec<Vector3<f32>>),
    Other,
}

/// One sampled keyframe value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Sample {
    Translation(Vector3<f32>),
    Rotation(Quaternion<f32>),
    Scale(Vector3<f32>),
}

/// Keyframes of a single property of a single joint, addressed by joint name.
#[derive(Clone, Debug)]
pub struct Track {
    pub target: String,
    pub timestamps: Vec<f32>,
    pub keyframes: Keyframes,
}

impl Track {
    pub fn new(target: impl Into<String>, timestamps: Vec<f32>, keyframes: Keyframes) -> Self {
        Self {
            target: target.into(),
            timestamps,
            keyframes,
        }
    }

    /// Linear (spherical for rotations) interpolation at `time`, clamped to the track ends.
    pub fn sample(&self, time: f32) -> Option<Sample> {
        let len = match &self.keyframes {
            Keyframes::Translation(values) | Keyframes::Scale(values) => values.len(),
            Keyframes::Rotation(values) => values.len(),
            Keyframes::Other => return None,
        }
        .min(self.timestamps.len());
        if len == 0 {
            return None;
        }
        let times = &self.timestamps[..len];
        let (k0, k1, alpha) = if time <= times[0] {
            (0, 0, 0.0)
        } else if time >= times[len - 1] {
            (len - 1, len - 1, 0.0)
        } else {
            let k1 = times.partition_point(|&t| t <= time);
            let k0 = k1 - 1;
            let span = times[k1] - times[k0];
            let alpha = if span > 0.0 { (time - times[k0]) / span } else { 0.0 };
            (k0, k1, alpha)
        };
        let sample = match &self.keyframes {
            Keyframes::Translation(values) => Sample::Translation(values[k0].lerp(values[k1], alpha)),
            Keyframes::Scale(values) => Sample::Scale(values[k0].lerp(values[k1], alpha)),
            Keyframes::Rotation(values) => Sample::Rotation(slerp_shortest(values[k0], values[k1], alpha)),
            Keyframes::Other => return None,
        };
        Some(sample)
    }

    fn end_time(&self) -> f32 {
        self.timestamps.last().copied().unwrap_or(0.0)
    }
}

/// Spherical interpolation along the shorter arc.
pub fn slerp_shortest(from: Quaternion<f32>, to: Quaternion<f32>, amount: f32) -> Quaternion<f32> {
    let to = if from.dot(to) < 0.0 { -to } else { to };
    if amount <= 0.0 {
        return from;
    }
    if amount >= 1.0 {
        return to;
    }
    from.slerp(to, amount).normalize()
}

/// A named, immutable piece of motion.
#[derive(Clone, Debug)]
pub struct AnimationClip {
    pub name: String,
    pub tracks: Vec<Track>,
    duration: f32,
}

impl AnimationClip {
    /// The duration is the last keyframe time over all tracks.
    pub fn new(name: impl Into<String>, tracks: Vec<Track>) -> Self {
        let duration = tracks.iter().map(Track::end_time).fold(0.0, f32::max);
        Self {
            name: name.into(),
            tracks,
            duration,
        }
    }

    pub fn duration(&self) -> f32 {
        self.duration
    }
}

#[derive(Clone, Debug)]
pub struct Joint {
    pub name: String,
    pub parent: Option<usize>,
    /// Local bind transform, used wherever no clip drives the joint.
    pub rest: Instance,
}

/// Joint hierarchy of a loaded model. Clips bind to joints by name.
#[derive(Clone, Debug, Default)]
pub struct Skeleton {
    joints: Vec<Joint>,
    by_name: HashMap<String, usize>,
}

impl Skeleton {
    /// Parents must precede their children in `joints`.
    pub fn new(joints: Vec<Joint>) -> Self {
        let by_name = joints
            .iter()
            .enumerate()
            .map(|(idx, joint)| (joint.name.clone(), idx))
            .collect();
        Self { joints, by_name }
    }

    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.joints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joints.is_empty()
    }
}

/// What a character model file yields: its skeleton plus any embedded clips.
#[derive(Clone, Debug, Default)]
pub struct CharacterModel {
    pub skeleton: Skeleton,
    pub clips: Vec<AnimationClip>,
}
