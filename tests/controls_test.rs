use std::f32::consts::FRAC_PI_4;

use approx::assert_relative_eq;
use terrain_walker::{
    character::{CharacterState, yaw_pitch},
    config::{CameraConfig, ControlsConfig},
    controls::{Controls, FirstPersonCamera, MouseState},
};
use winit::{event::DeviceEvent, keyboard::KeyCode};

const VIEWPORT: (f32, f32) = (800.0, 600.0);

fn controls() -> Controls {
    Controls::new(&ControlsConfig::default(), VIEWPORT)
}

#[test]
fn horizontal_movement_turns_against_the_pointer() {
    let mut controls = controls();
    // a twentieth of the width at sensitivity 10
    controls.pointer_moved(40.0, 0.0);
    controls.update();
    assert_relative_eq!(controls.orientation().phi(), -0.5, epsilon = 1e-6);
    assert_relative_eq!(controls.orientation().theta(), 0.0);
}

#[test]
fn pointer_movement_is_consumed_once() {
    let mut controls = controls();
    controls.pointer_moved(20.0, 0.0);
    controls.pointer_moved(20.0, 0.0);
    let first = controls.update();
    let second = controls.update();
    assert_eq!(first, second);
    assert_relative_eq!(controls.orientation().phi(), -0.5, epsilon = 1e-6);
}

#[test]
fn pitch_is_clamped() {
    let mut controls = controls();
    controls.pointer_moved(0.0, 600.0);
    controls.update();
    assert_relative_eq!(controls.orientation().theta(), FRAC_PI_4);

    controls.pointer_moved(0.0, -6000.0);
    controls.update();
    assert_relative_eq!(controls.orientation().theta(), -FRAC_PI_4);
}

#[test]
fn head_is_yaw_then_pitch() {
    let mut controls = controls();
    controls.pointer_moved(-40.0, 30.0);
    let head = controls.update();
    let (yaw, pitch) = yaw_pitch(head);
    assert_relative_eq!(yaw, 0.5, epsilon = 1e-5);
    assert_relative_eq!(pitch, 0.5, epsilon = 1e-5);
}

#[test]
fn same_gesture_turns_equally_at_any_resolution() {
    let mut small = controls();
    let mut large = controls();
    large.resize(1600.0, 1200.0);
    small.pointer_moved(40.0, 30.0);
    large.pointer_moved(80.0, 60.0);
    small.update();
    large.update();
    assert_relative_eq!(small.orientation().phi(), large.orientation().phi(), epsilon = 1e-6);
    assert_relative_eq!(small.orientation().theta(), large.orientation().theta(), epsilon = 1e-6);
}

#[test]
fn pointer_position_stays_inside_the_viewport() {
    let mut controls = controls();
    controls.pointer_moved(10_000.0, -10_000.0);
    let position = controls.mouse().position;
    assert_eq!(position.x, 400.0);
    assert_eq!(position.y, -300.0);
}

#[test]
fn forward_key_starts_and_stops_walking() {
    let mut controls = controls();
    let idle = Some(CharacterState::Idle);
    let walk = Some(CharacterState::Walk);
    assert_eq!(controls.key_down(KeyCode::KeyW, idle), walk);
    assert!(controls.is_pressed(KeyCode::KeyW));
    // held keys repeat
    assert_eq!(controls.key_down(KeyCode::KeyW, walk), None);
    assert_eq!(controls.key_up(KeyCode::KeyW, walk), idle);
    assert!(!controls.is_pressed(KeyCode::KeyW));
}

#[test]
fn shift_switches_between_walk_and_run() {
    let mut controls = controls();
    let walk = Some(CharacterState::Walk);
    let run = Some(CharacterState::Run);
    controls.key_down(KeyCode::KeyW, Some(CharacterState::Idle));
    assert_eq!(controls.key_down(KeyCode::ShiftLeft, walk), run);
    assert_eq!(controls.key_up(KeyCode::ShiftLeft, run), walk);
    assert_eq!(controls.key_up(KeyCode::KeyW, walk), Some(CharacterState::Idle));
}

#[test]
fn shift_alone_does_nothing_while_idle() {
    let mut controls = controls();
    let idle = Some(CharacterState::Idle);
    assert_eq!(controls.key_down(KeyCode::ShiftRight, idle), None);
    // forward with shift already held still starts at a walk
    let walk = Some(CharacterState::Walk);
    assert_eq!(controls.key_down(KeyCode::KeyW, idle), walk);
    assert_eq!(controls.key_up(KeyCode::ShiftRight, walk), None);
}

#[test]
fn releasing_forward_stops_a_run() {
    let mut controls = controls();
    let run = Some(CharacterState::Run);
    controls.key_down(KeyCode::KeyW, Some(CharacterState::Idle));
    controls.key_down(KeyCode::ShiftLeft, Some(CharacterState::Walk));
    assert_eq!(controls.key_up(KeyCode::KeyW, run), Some(CharacterState::Idle));
    assert_eq!(controls.key_up(KeyCode::ShiftLeft, Some(CharacterState::Idle)), None);
}

#[test]
fn releasing_one_of_two_shift_keys_keeps_running() {
    let mut controls = controls();
    let run = Some(CharacterState::Run);
    controls.key_down(KeyCode::ShiftLeft, None);
    controls.key_down(KeyCode::ShiftRight, None);
    assert_eq!(controls.key_up(KeyCode::ShiftLeft, run), None);
    assert_eq!(controls.key_up(KeyCode::ShiftRight, run), Some(CharacterState::Walk));
}

#[test]
fn other_keys_are_ignored() {
    let mut controls = controls();
    let idle = Some(CharacterState::Idle);
    assert_eq!(controls.key_down(KeyCode::KeyQ, idle), None);
    assert_eq!(controls.key_up(KeyCode::KeyQ, idle), None);
}

#[test]
fn device_motion_turns_only_while_locked() {
    let mut controls = controls();
    let motion = DeviceEvent::MouseMotion { delta: (40.0, 0.0) };
    assert!(!controls.is_pointer_locked());
    controls.on_device_event(&motion);
    controls.update();
    assert_eq!(controls.orientation().phi(), 0.0);
    assert_eq!(controls.mouse().position.x, 0.0);

    controls.set_pointer_locked(true);
    controls.on_device_event(&motion);
    controls.update();
    assert_relative_eq!(controls.orientation().phi(), -0.5, epsilon = 1e-6);
}

#[test]
fn mouse_starts_released_at_the_centre() {
    let mouse = MouseState::default();
    assert!(!mouse.left && !mouse.right);
    assert_eq!(mouse.position.x, 0.0);
    assert_eq!(mouse.position.y, 0.0);
    assert_eq!(controls().mouse().position, mouse.position);
}

#[test]
fn camera_projection_follows_the_viewport() {
    let mut camera = FirstPersonCamera::new(&CameraConfig::default(), 800, 600);
    let before = camera.view_proj();
    camera.projection.resize(600, 600);
    let after = camera.view_proj();
    // narrower aspect, less horizontal squeeze
    assert!(after.x.x > before.x.x);
    // square viewport at 90 degrees: x and y scale match
    assert_relative_eq!(after.x.x, after.y.y, epsilon = 1e-6);
}
