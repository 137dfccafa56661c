//! Player input: pointer look, keyboard movement and the first person camera.
//!
//! Raw events only ever land in [`Controls`]; everything downstream consumes the normalized
//! signals it produces: a head orientation per frame and requested state changes.

use std::collections::HashSet;

use cgmath::{Deg, Matrix4, Point3, Quaternion, Rad, Rotation3, Vector2, Vector3};
use winit::{
    event::{DeviceEvent, ElementState, KeyEvent, MouseButton, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::{
    character::CharacterState,
    config::{CameraConfig, ControlsConfig},
};

/// Turns pointer movement into a yaw/pitch head orientation.
#[derive(Clone, Debug)]
pub struct OrientationFilter {
    phi: f32,
    theta: f32,
    pending: Vector2<f32>,
    sensitivity: f32,
    pitch_limit: f32,
}

impl OrientationFilter {
    pub fn new(config: &ControlsConfig) -> Self {
        Self {
            phi: 0.0,
            theta: 0.0,
            pending: Vector2::new(0.0, 0.0),
            sensitivity: config.sensitivity,
            pitch_limit: config.pitch_limit,
        }
    }

    /// Queue raw pointer movement. Several events within one frame add up.
    pub fn push_pointer_delta(&mut self, dx: f32, dy: f32) {
        self.pending += Vector2::new(dx, dy);
    }

    /// Consume the queued movement and return the new head orientation.
    ///
    /// The movement is normalized by the viewport size so the same physical gesture turns the
    /// head equally far at every resolution.
    pub fn update(&mut self, viewport: (f32, f32)) -> Quaternion<f32> {
        let (width, height) = (viewport.0.max(1.0), viewport.1.max(1.0));
        let xh = self.pending.x / width;
        let yh = -(self.pending.y / height);
        self.phi += -xh * self.sensitivity;
        self.theta = (self.theta - yh * self.sensitivity).clamp(-self.pitch_limit, self.pitch_limit);
        self.pending = Vector2::new(0.0, 0.0);
        self.head()
    }

    /// Yaw first, then pitch.
    pub fn head(&self) -> Quaternion<f32> {
        Quaternion::from_angle_y(Rad(self.phi)) * Quaternion::from_angle_x(Rad(self.theta))
    }

    pub fn phi(&self) -> f32 {
        self.phi
    }

    pub fn theta(&self) -> f32 {
        self.theta
    }
}

pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height.max(1) as f32;
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

/// A camera that looks wherever the head looks.
pub struct FirstPersonCamera {
    pub position: Point3<f32>,
    pub rotation: Quaternion<f32>,
    pub projection: Projection,
}

impl FirstPersonCamera {
    pub fn new(config: &CameraConfig, width: u32, height: u32) -> Self {
        let [x, y, z] = config.position;
        Self {
            position: Point3::new(x, y, z),
            rotation: Quaternion::new(1.0, 0.0, 0.0, 0.0),
            projection: Projection::new(width, height, Deg(config.fovy), config.znear, config.zfar),
        }
    }

    pub fn calc_view(&self) -> Matrix4<f32> {
        let transform = Matrix4::from_translation(Vector3::new(
            self.position.x,
            self.position.y,
            self.position.z,
        )) * Matrix4::from(self.rotation);
        // An orthonormal transform, inverting cannot fail in practice.
        cgmath::SquareMatrix::invert(&transform).unwrap_or(transform)
    }

    pub fn view_proj(&self) -> Matrix4<f32> {
        self.projection.calc_matrix() * self.calc_view()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MouseState {
    pub left: bool,
    pub right: bool,
    /// Cursor relative to the viewport centre, clamped to the viewport.
    pub position: Vector2<f32>,
}

impl Default for MouseState {
    fn default() -> Self {
        Self {
            left: false,
            right: false,
            position: Vector2::new(0.0, 0.0),
        }
    }
}

/// Collects input events and hands out head orientation and state requests.
pub struct Controls {
    orientation: OrientationFilter,
    pressed: HashSet<KeyCode>,
    mouse: MouseState,
    pointer_locked: bool,
    viewport: (f32, f32),
}

impl Controls {
    pub fn new(config: &ControlsConfig, viewport: (f32, f32)) -> Self {
        Self {
            orientation: OrientationFilter::new(config),
            pressed: HashSet::new(),
            mouse: MouseState::default(),
            pointer_locked: false,
            viewport,
        }
    }

    pub fn resize(&mut self, width: f32, height: f32) {
        self.viewport = (width, height);
    }

    pub fn viewport(&self) -> (f32, f32) {
        self.viewport
    }

    pub fn mouse(&self) -> &MouseState {
        &self.mouse
    }

    pub fn orientation(&self) -> &OrientationFilter {
        &self.orientation
    }

    pub fn is_pressed(&self, key: KeyCode) -> bool {
        self.pressed.contains(&key)
    }

    /// Key pressed. Returns the state the character should switch to, if any.
    pub fn key_down(&mut self, key: KeyCode, current: Option<CharacterState>) -> Option<CharacterState> {
        // Repeats arrive as further presses of a held key.
        if !self.pressed.insert(key) {
            return None;
        }
        match key {
            // Run is only reached from Walk, even with shift already held.
            KeyCode::KeyW => match current {
                Some(CharacterState::Walk | CharacterState::Run) => None,
                _ => Some(CharacterState::Walk),
            },
            KeyCode::ShiftLeft | KeyCode::ShiftRight => match current {
                Some(CharacterState::Walk) => Some(CharacterState::Run),
                _ => None,
            },
            _ => None,
        }
    }

    /// Key released. Returns the state the character should switch to, if any.
    pub fn key_up(&mut self, key: KeyCode, current: Option<CharacterState>) -> Option<CharacterState> {
        self.pressed.remove(&key);
        match key {
            KeyCode::KeyW => match current {
                Some(CharacterState::Walk | CharacterState::Run) => Some(CharacterState::Idle),
                _ => None,
            },
            KeyCode::ShiftLeft | KeyCode::ShiftRight if !self.shift_held() => match current {
                Some(CharacterState::Run) => Some(CharacterState::Walk),
                _ => None,
            },
            _ => None,
        }
    }

    fn shift_held(&self) -> bool {
        self.is_pressed(KeyCode::ShiftLeft) || self.is_pressed(KeyCode::ShiftRight)
    }

    /// Raw pointer movement, reported by the device while the pointer is locked.
    pub fn pointer_moved(&mut self, dx: f32, dy: f32) {
        self.orientation.push_pointer_delta(dx, dy);
        let (half_w, half_h) = (self.viewport.0 / 2.0, self.viewport.1 / 2.0);
        self.mouse.position.x = (self.mouse.position.x + dx).clamp(-half_w, half_w);
        self.mouse.position.y = (self.mouse.position.y + dy).clamp(-half_h, half_h);
    }

    pub fn is_pointer_locked(&self) -> bool {
        self.pointer_locked
    }

    pub fn set_pointer_locked(&mut self, locked: bool) {
        self.pointer_locked = locked;
    }

    /// Raw device motion, ignored unless the pointer is locked.
    pub fn on_device_event(&mut self, event: &DeviceEvent) {
        if !self.pointer_locked {
            return;
        }
        if let DeviceEvent::MouseMotion { delta: (dx, dy) } = event {
            self.pointer_moved(*dx as f32, *dy as f32);
        }
    }

    pub fn on_window_event(
        &mut self,
        event: &WindowEvent,
        current: Option<CharacterState>,
    ) -> Option<CharacterState> {
        match event {
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state,
                        ..
                    },
                ..
            } => match state {
                ElementState::Pressed => self.key_down(*key, current),
                ElementState::Released => self.key_up(*key, current),
            },
            WindowEvent::MouseInput { state, button, .. } => {
                let pressed = state.is_pressed();
                match button {
                    MouseButton::Left => self.mouse.left = pressed,
                    MouseButton::Right => self.mouse.right = pressed,
                    _ => {}
                }
                None
            }
            WindowEvent::CursorMoved { position, .. } => {
                self.mouse.position = Vector2::new(
                    position.x as f32 - self.viewport.0 / 2.0,
                    position.y as f32 - self.viewport.1 / 2.0,
                );
                None
            }
            WindowEvent::Resized(size) => {
                self.resize(size.width as f32, size.height as f32);
                None
            }
            _ => None,
        }
    }

    /// Consume this frame's pointer movement into a new head orientation.
    pub fn update(&mut self) -> Quaternion<f32> {
        self.orientation.update(self.viewport)
    }
}
