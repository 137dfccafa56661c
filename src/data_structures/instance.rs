//! Per-object transformation data.
//!
//! [`Instance`] is the transform every visual object carries. Physics writes position and
//! rotation into it once per frame; the render surface reads it back as a packed matrix.

use std::ops::Mul;

use cgmath::{ElementWise, One, SquareMatrix};

/// Position, rotation (as quaternion) and a visual-only scale.
///
/// Scale never reaches the physics world: it only sizes the rendered mesh.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Instance {
    pub position: cgmath::Vector3<f32>,
    pub rotation: cgmath::Quaternion<f32>,
    pub scale: cgmath::Vector3<f32>,
}

impl Instance {
    /// Identity transformation (no move, rotate, or scale).
    pub fn new() -> Self {
        Self {
            position: cgmath::Vector3::new(0.0, 0.0, 0.0),
            // `Quaternion::one()` is the identity quaternion (no rotation)
            rotation: cgmath::Quaternion::one(),
            scale: cgmath::Vector3::new(1.0, 1.0, 1.0),
        }
    }

    pub fn with_rotation(mut self, rotation: cgmath::Quaternion<f32>) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_uniform_scale(mut self, scale: f32) -> Self {
        self.scale = cgmath::Vector3::new(scale, scale, scale);
        self
    }

    pub fn to_matrix(&self) -> cgmath::Matrix4<f32> {
        cgmath::Matrix4::from_translation(self.position)
            * cgmath::Matrix4::from(self.rotation)
            * cgmath::Matrix4::from_nonuniform_scale(self.scale.x, self.scale.y, self.scale.z)
    }

    pub fn to_raw(&self) -> InstanceRaw {
        let world_matrix = self.to_matrix();
        let handedness = world_matrix.determinant().signum();
        InstanceRaw {
            model: world_matrix.into(),
            normal: cgmath::Matrix3::from(self.rotation).into(),
            handedness,
        }
    }
}

impl<'a, 'b> Mul<&'b Instance> for &'a Instance {
    type Output = Instance;

    /// `parent * child`: the child's local transform expressed in the parent's space.
    fn mul(self, child: &'b Instance) -> Instance {
        Instance {
            position: self.position + self.rotation * self.scale.mul_element_wise(child.position),
            rotation: self.rotation * child.rotation,
            scale: self.scale.mul_element_wise(child.scale),
        }
    }
}

impl Mul<Instance> for Instance {
    type Output = Self;

    fn mul(self, rhs: Instance) -> Self::Output {
        &self * &rhs
    }
}

impl From<cgmath::Vector3<f32>> for Instance {
    fn from(position: cgmath::Vector3<f32>) -> Self {
        Instance {
            position,
            ..Default::default()
        }
    }
}

impl Default for Instance {
    fn default() -> Self {
        Self::new()
    }
}

/**
 * The packed form of an [`Instance`] as a renderer stores it on the GPU:
 * model matrix, normal matrix and the sign of the determinant.
 */
#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct InstanceRaw {
    pub model: [[f32; 4]; 4],
    pub normal: [[f32; 3]; 3],
    pub handedness: f32,
}

#[cfg(test)]
mod tests {
    use cgmath::{Deg, InnerSpace, Rotation3, Vector3};

    use super::*;

    #[test]
    fn parent_scale_and_rotation_move_the_child() {
        let parent = Instance::from(Vector3::new(1.0, 0.0, 0.0))
            .with_rotation(cgmath::Quaternion::from_angle_y(Deg(90.0)))
            .with_uniform_scale(2.0);
        let child = Instance::from(Vector3::new(0.0, 0.0, 1.0));
        let world = parent * child;
        // +z turns into +x, doubled
        assert!((world.position - Vector3::new(3.0, 0.0, 0.0)).magnitude() < 1e-5);
        assert_eq!(world.scale, Vector3::new(2.0, 2.0, 2.0));
    }

    #[test]
    fn raw_form_packs_translation_and_handedness() {
        let raw = Instance::from(Vector3::new(1.0, 2.0, 3.0))
            .with_uniform_scale(0.5)
            .to_raw();
        assert_eq!(raw.model[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(raw.model[0][0], 0.5);
        assert_eq!(raw.handedness, 1.0);

        let mirrored = Instance {
            scale: Vector3::new(-1.0, 1.0, 1.0),
            ..Instance::new()
        };
        assert_eq!(mirrored.to_raw().handedness, -1.0);
    }
}
