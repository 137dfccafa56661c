use approx::assert_relative_eq;
use cgmath::{Quaternion, Rad, Rotation3, Vector3};
use terrain_walker::animation::{AnimationClip, AnimationMixer, Keyframes, Pose, Sample, Track};

use crate::common::test_utils::{skeleton, sliding_clip};

mod common;

#[test]
fn clip_duration_is_the_last_keyframe() {
    let clip = AnimationClip::new(
        "mixed",
        vec![
            Track::new(
                "root",
                vec![0.0, 0.8],
                Keyframes::Translation(vec![Vector3::new(0.0, 0.0, 0.0); 2]),
            ),
            Track::new(
                "spine",
                vec![0.0, 0.4, 1.2],
                Keyframes::Scale(vec![Vector3::new(1.0, 1.0, 1.0); 3]),
            ),
        ],
    );
    assert_relative_eq!(clip.duration(), 1.2);
    assert_eq!(AnimationClip::new("empty", Vec::new()).duration(), 0.0);
}

#[test]
fn tracks_interpolate_and_clamp() {
    let track = Track::new(
        "root",
        vec![1.0, 3.0],
        Keyframes::Translation(vec![Vector3::new(0.0, 0.0, 0.0), Vector3::new(4.0, 0.0, 0.0)]),
    );
    assert_eq!(track.sample(0.0), Some(Sample::Translation(Vector3::new(0.0, 0.0, 0.0))));
    assert_eq!(track.sample(2.0), Some(Sample::Translation(Vector3::new(2.0, 0.0, 0.0))));
    assert_eq!(track.sample(9.0), Some(Sample::Translation(Vector3::new(4.0, 0.0, 0.0))));

    let empty = Track::new("root", Vec::new(), Keyframes::Translation(Vec::new()));
    assert_eq!(empty.sample(0.5), None);
    let other = Track::new("root", vec![0.0], Keyframes::Other);
    assert_eq!(other.sample(0.0), None);
}

#[test]
fn rotation_tracks_take_the_short_way() {
    let quarter = Quaternion::from_angle_y(Rad(std::f32::consts::FRAC_PI_2));
    let track = Track::new(
        "root",
        vec![0.0, 1.0],
        // Same orientation as `quarter`, opposite hemisphere.
        Keyframes::Rotation(vec![Quaternion::new(1.0, 0.0, 0.0, 0.0), -quarter]),
    );
    let Some(Sample::Rotation(half)) = track.sample(0.5) else {
        panic!("expected a rotation sample");
    };
    let expected = Quaternion::from_angle_y(Rad(std::f32::consts::FRAC_PI_4));
    assert_relative_eq!(half.s, expected.s, epsilon = 1e-5);
    assert_relative_eq!(half.v.y, expected.v.y, epsilon = 1e-5);
}

#[test]
fn actions_loop_around_their_clip() {
    let mut mixer = AnimationMixer::new();
    let id = mixer.clip_action(sliding_clip("walk", 1.0, 1.0));
    mixer.play(id);
    mixer.update(0.75);
    mixer.update(0.5);
    assert_relative_eq!(mixer.action(id).unwrap().time(), 0.25, epsilon = 1e-6);
    assert_relative_eq!(mixer.time(), 1.25);
}

#[test]
fn time_scale_speeds_playback_up() {
    let mut mixer = AnimationMixer::new();
    let id = mixer.clip_action(sliding_clip("walk", 4.0, 1.0));
    mixer.play(id);
    mixer.action_mut(id).unwrap().set_effective_time_scale(2.0);
    mixer.update(0.5);
    assert_relative_eq!(mixer.action(id).unwrap().time(), 1.0);
}

#[test]
fn actions_do_not_advance_before_play() {
    let mut mixer = AnimationMixer::new();
    let id = mixer.clip_action(sliding_clip("walk", 1.0, 1.0));
    mixer.update(0.5);
    assert_eq!(mixer.action(id).unwrap().time(), 0.0);
    assert!(!mixer.action(id).unwrap().is_running());
}

#[test]
fn binding_a_clip_twice_returns_the_same_action() {
    let mut mixer = AnimationMixer::new();
    let first = mixer.clip_action(sliding_clip("walk", 1.0, 1.0));
    let second = mixer.clip_action(sliding_clip("walk", 3.0, 1.0));
    assert_eq!(first, second);
    assert_eq!(mixer.actions().count(), 1);
    assert_eq!(mixer.action_by_name("walk"), Some(first));
    assert_eq!(mixer.action_by_name("run"), None);
}

#[test]
fn crossfade_ramps_both_weights() {
    let mut mixer = AnimationMixer::new();
    let idle = mixer.clip_action(sliding_clip("idle", 2.0, 0.0));
    let walk = mixer.clip_action(sliding_clip("walk", 1.0, 1.0));
    mixer.play(idle);
    mixer.crossfade_from(walk, idle, 0.5);
    mixer.play(walk);

    mixer.update(0.25);
    assert_relative_eq!(mixer.action(idle).unwrap().effective_weight(), 0.5);
    assert_relative_eq!(mixer.action(walk).unwrap().effective_weight(), 0.5);

    mixer.update(0.25);
    let idle_action = mixer.action(idle).unwrap();
    assert!(!idle_action.is_enabled());
    assert_eq!(idle_action.effective_weight(), 0.0);
    assert!(!mixer.action(walk).unwrap().is_fading());
    assert_relative_eq!(mixer.action(walk).unwrap().effective_weight(), 1.0);
}

#[test]
fn setting_the_weight_cancels_a_fade() {
    let mut mixer = AnimationMixer::new();
    let id = mixer.clip_action(sliding_clip("walk", 1.0, 1.0));
    mixer.play(id);
    let action = mixer.action_mut(id).unwrap();
    action.fade_out(0.5);
    action.set_effective_weight(0.75);
    assert!(!action.is_fading());

    mixer.update(1.0);
    let action = mixer.action(id).unwrap();
    assert!(action.is_enabled());
    assert_relative_eq!(action.effective_weight(), 0.75);
}

#[test]
fn stop_rewinds() {
    let mut mixer = AnimationMixer::new();
    let id = mixer.clip_action(sliding_clip("walk", 1.0, 1.0));
    mixer.play(id);
    mixer.update(0.4);
    mixer.action_mut(id).unwrap().stop();
    mixer.update(0.4);
    let action = mixer.action(id).unwrap();
    assert_eq!(action.time(), 0.0);
    assert!(!action.is_running());
}

#[test]
fn pose_without_actions_is_the_rest_pose() {
    let skeleton = skeleton();
    let mut mixer = AnimationMixer::new();
    // bound but never played
    mixer.clip_action(sliding_clip("walk", 1.0, 1.0));
    assert_eq!(mixer.pose(&skeleton), Pose::rest(&skeleton));
    assert_eq!(Pose::rest(&skeleton).world()[1].position, Vector3::new(0.0, 1.0, 0.0));
}

#[test]
fn pose_averages_actions_by_weight() {
    let skeleton = skeleton();
    let mut mixer = AnimationMixer::new();
    let left = mixer.clip_action(sliding_clip("left", 1.0, -2.0));
    let right = mixer.clip_action(sliding_clip("right", 1.0, 2.0));
    let far = mixer.clip_action(sliding_clip("far", 1.0, 4.0));
    mixer.play(left);
    mixer.play(right);
    mixer.play(far);
    mixer.action_mut(left).unwrap().set_effective_weight(0.5);
    mixer.action_mut(right).unwrap().set_effective_weight(0.5);
    mixer.action_mut(far).unwrap().set_effective_weight(0.0);
    mixer.update(0.5);

    // -1 and 1 at half time, far is ignored
    let pose = mixer.pose(&skeleton);
    assert_relative_eq!(pose.local()[0].position.x, 0.0, epsilon = 1e-6);
}

#[test]
fn light_weights_blend_towards_rest() {
    let skeleton = skeleton();
    let mut mixer = AnimationMixer::new();
    let id = mixer.clip_action(sliding_clip("walk", 1.0, 2.0));
    mixer.play(id);
    mixer.action_mut(id).unwrap().set_effective_weight(0.25);
    mixer.update(0.5);

    // sample x = 1 at quarter weight, rest x = 0
    let pose = mixer.pose(&skeleton);
    assert_relative_eq!(pose.local()[0].position.x, 0.25, epsilon = 1e-6);
    // spine has no track and keeps its rest offset
    assert_eq!(pose.local()[1].position, Vector3::new(0.0, 1.0, 0.0));
}

#[test]
fn tracks_for_unknown_joints_are_skipped() {
    let skeleton = skeleton();
    let mut mixer = AnimationMixer::new();
    let id = mixer.clip_action(AnimationClip::new(
        "tail",
        vec![Track::new(
            "tail",
            vec![0.0, 1.0],
            Keyframes::Translation(vec![Vector3::new(5.0, 0.0, 0.0); 2]),
        )],
    ));
    mixer.play(id);
    mixer.update(0.5);
    assert_eq!(mixer.pose(&skeleton), Pose::rest(&skeleton));
}
