//! The player pawn: an invisible collision box the character controller
//! moves around, plus an optional placeholder body to look at.

use cgmath::{Matrix4, Quaternion, Vector3};

use crate::{data_structures::instance::Instance, physics::Ellipsoid, resources::mesh::MeshData};

const BODY_WIDTH: f32 = 2.0;
const BODY_HEIGHT: f32 = 3.0;
const BODY_DEPTH: f32 = 1.0;

#[derive(Clone, Debug)]
pub struct Pawn {
    /// Position of the feet and heading. Scale stays at one.
    pub transform: Instance,
    pub ellipsoid: Ellipsoid,
    /// Never registered in the collision world, so the pawn neither shows
    /// up in picks nor blocks itself. Only its ellipsoid collides.
    collision_mesh: MeshData,
}

impl Pawn {
    pub fn new() -> Self {
        let origin_at_feet = Matrix4::from_translation(Vector3::new(0.0, BODY_HEIGHT / 2.0, 0.0));
        Self {
            // facing away from the camera, so it sees the back of the pawn
            transform: Instance::new().with_rotation(Quaternion::new(0.0, 0.0, 1.0, 0.0)),
            ellipsoid: Ellipsoid::new(
                Vector3::new(1.0, 1.5, 1.0),
                Vector3::new(0.0, 1.5, 0.0),
            ),
            collision_mesh: MeshData::cuboid(BODY_WIDTH, BODY_HEIGHT, BODY_DEPTH)
                .transformed(&origin_at_feet),
        }
    }

    pub fn at(position: Vector3<f32>) -> Self {
        let mut pawn = Self::new();
        pawn.transform.position = position;
        pawn
    }

    pub fn position(&self) -> Vector3<f32> {
        self.transform.position
    }

    pub fn set_position(&mut self, position: Vector3<f32>) {
        self.transform.position = position;
    }

    pub fn rotation(&self) -> Quaternion<f32> {
        self.transform.rotation
    }

    /// The collision box in pawn space, origin at the bottom face.
    pub fn collision_mesh(&self) -> &MeshData {
        &self.collision_mesh
    }

    /// Visible stand-in body: a cylinder three units tall and two wide,
    /// standing on the pawn origin.
    pub fn body_mesh() -> MeshData {
        MeshData::cylinder(BODY_HEIGHT, BODY_WIDTH, 24)
            .transformed(&Matrix4::from_translation(Vector3::new(0.0, BODY_HEIGHT / 2.0, 0.0)))
    }
}

impl Default for Pawn {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{InnerSpace, Rotation};

    use super::*;

    #[test]
    fn collision_box_stands_on_the_origin() {
        let pawn = Pawn::new();
        let (min_y, max_y) = pawn
            .collision_mesh()
            .positions
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), p| (lo.min(p[1]), hi.max(p[1])));
        assert!(min_y.abs() < 1e-6);
        assert!((max_y - 3.0).abs() < 1e-6);
    }

    #[test]
    fn starts_turned_around() {
        let pawn = Pawn::at(Vector3::new(0.0, 0.0, -8.0));
        let facing = pawn.rotation().rotate_vector(Vector3::unit_z());
        assert!((facing - -Vector3::unit_z()).magnitude() < 1e-6);
        assert_eq!(pawn.position().z, -8.0);
    }

    #[test]
    fn ellipsoid_wraps_the_box() {
        let pawn = Pawn::new();
        assert_eq!(pawn.ellipsoid.offset.y, pawn.ellipsoid.radii.y);
    }
}
