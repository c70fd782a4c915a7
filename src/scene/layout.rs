//! What the home scene is made of and where it goes.

use std::f32::consts::{FRAC_PI_2, PI};

use cgmath::{Euler, Matrix4, Quaternion, Rad, Rotation3, SquareMatrix, Vector3};

use crate::{data_structures::instance::Instance, resources::mesh::MeshData};

pub const GROUND_ID: u32 = 1;
pub const SHED_ID: u32 = 2;
pub const SKY_ID: u32 = 3;

/// Procedural stand-in shown until (or instead of) a prop's glTF file.
#[derive(Clone, Debug, PartialEq)]
pub enum Fallback {
    None,
    /// Flat plane on y = 0.
    Ground {
        width: f32,
        depth: f32,
        colour: [f32; 3],
    },
    /// A box with a gabled roof, standing on y = 0.
    House { colour: [f32; 3] },
}

impl Fallback {
    /// The geometry in prop space, or `None` for [`Fallback::None`].
    pub fn mesh_data(&self) -> Option<MeshData> {
        match self {
            Fallback::None => None,
            Fallback::Ground { width, depth, .. } => Some(MeshData::ground(*width, *depth)),
            Fallback::House { .. } => Some(house()),
        }
    }

    pub fn colour(&self) -> [f32; 3] {
        match self {
            Fallback::None => [1.0, 1.0, 1.0],
            Fallback::Ground { colour, .. } | Fallback::House { colour } => *colour,
        }
    }
}

fn house() -> MeshData {
    let mut house = MeshData::cuboid(3.0, 3.0, 3.0)
        .transformed(&Matrix4::from_translation(Vector3::new(0.0, 1.5, 0.0)));
    // a three sided cylinder lying along x is the roof
    let roof = Instance::new()
        .with_position(Vector3::new(0.0, 3.5, 0.0))
        .with_rotation(Quaternion::from_angle_z(Rad(FRAC_PI_2)))
        .with_scale(Vector3::new(1.5, 2.75, 2.75));
    house.append(MeshData::cylinder(1.2, 1.3, 3), &roof.to_matrix());
    house
}

#[derive(Clone, Debug, PartialEq)]
pub struct PropSpec {
    /// Pick id, shared by the render nodes and the collider of the prop.
    pub id: u32,
    pub name: String,
    /// glTF file below the asset root. `None` keeps the fallback for good.
    pub model: Option<String>,
    /// Root transform of the loaded model.
    pub placement: Instance,
    pub fallback: Fallback,
    pub fallback_placement: Instance,
    pub pickable: bool,
    pub collisions: bool,
}

impl PropSpec {
    pub fn new(id: u32, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            model: None,
            placement: Instance::new(),
            fallback: Fallback::None,
            fallback_placement: Instance::new(),
            pickable: true,
            collisions: true,
        }
    }

    pub fn with_model(mut self, path: &str, placement: Instance) -> Self {
        self.model = Some(path.to_string());
        self.placement = placement;
        self
    }

    pub fn with_fallback(mut self, fallback: Fallback, placement: Instance) -> Self {
        self.fallback = fallback;
        self.fallback_placement = placement;
        self
    }

    pub fn with_pickable(mut self, pickable: bool) -> Self {
        self.pickable = pickable;
        self
    }

    pub fn with_collisions(mut self, collisions: bool) -> Self {
        self.collisions = collisions;
        self
    }

    /// World matrix of the fallback geometry.
    pub fn fallback_matrix(&self) -> Matrix4<f32> {
        match self.fallback {
            Fallback::None => Matrix4::identity(),
            _ => self.fallback_placement.to_matrix(),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneLayout {
    pub props: Vec<PropSpec>,
    /// Where the pawn's feet start.
    pub pawn_start: Vector3<f32>,
}

impl SceneLayout {
    pub fn prop(&self, id: u32) -> Option<&PropSpec> {
        self.props.iter().find(|prop| prop.id == id)
    }
}

impl Default for SceneLayout {
    fn default() -> Self {
        let shed_position = Vector3::new(0.0, 0.25, 4.0);
        let ground = PropSpec::new(GROUND_ID, "ground")
            .with_model(
                "models/environment/ground.glb",
                Instance::new().with_scale(Vector3::new(2.0, 2.0, 2.0)),
            )
            .with_fallback(
                Fallback::Ground {
                    width: 70.0,
                    depth: 70.0,
                    colour: [0.87, 0.73, 0.46],
                },
                Instance::new(),
            );
        let shed = PropSpec::new(SHED_ID, "shed")
            .with_model(
                "models/little_shed/scene.gltf",
                Instance::new()
                    .with_position(shed_position)
                    .with_rotation(Quaternion::from(Euler::new(Rad(0.0), Rad(-FRAC_PI_2), Rad(PI))))
                    .with_scale(Vector3::new(-0.005, -0.005, -0.005)),
            )
            .with_fallback(
                Fallback::House {
                    colour: [0.8, 0.8, 0.8],
                },
                // on the ground under the shed; the model's own 0.25 lift would leave a gap
                Instance::new().with_position(Vector3::new(shed_position.x, 0.0, shed_position.z)),
            );
        let sky = PropSpec::new(SKY_ID, "sky")
            .with_model("models/environment/sky.glb", Instance::new())
            .with_pickable(false)
            .with_collisions(false);

        Self {
            props: vec![ground, shed, sky],
            pawn_start: Vector3::new(0.0, 0.0, -8.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn default_layout_has_unique_ids() {
        let layout = SceneLayout::default();
        let ids: HashSet<_> = layout.props.iter().map(|prop| prop.id).collect();
        assert_eq!(ids.len(), layout.props.len());
        assert_eq!(layout.prop(SHED_ID).map(|p| p.name.as_str()), Some("shed"));
        assert!(layout.prop(42).is_none());
    }

    #[test]
    fn sky_has_no_fallback_and_is_scenery_only() {
        let layout = SceneLayout::default();
        let sky = layout.prop(SKY_ID).unwrap();
        assert!(sky.fallback.mesh_data().is_none());
        assert!(!sky.pickable);
        assert!(!sky.collisions);
    }

    #[test]
    fn house_stands_on_the_ground_under_its_roof() {
        let house = house();
        let (min_y, max_y) = house
            .positions
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), p| (lo.min(p[1]), hi.max(p[1])));
        assert!(min_y.abs() < 1e-5);
        // ridge: roof centre 3.5 plus the prism radius scaled by 1.5
        assert!(max_y > 4.0 && max_y < 5.5, "{max_y}");
    }

    #[test]
    fn ground_fallback_is_flat_at_zero() {
        let layout = SceneLayout::default();
        let ground = layout.prop(GROUND_ID).unwrap();
        let mesh = ground.fallback.mesh_data().unwrap();
        assert!(mesh.positions.iter().all(|p| p[1] == 0.0));
        assert_eq!(ground.fallback.colour(), [0.87, 0.73, 0.46]);
    }

    #[test]
    fn fallback_house_stands_on_the_ground_under_the_shed() {
        let layout = SceneLayout::default();
        let shed = layout.prop(SHED_ID).unwrap();
        let triangles = shed.fallback.mesh_data().unwrap().triangles(&shed.fallback_matrix());
        let corners: Vec<_> = triangles.iter().flat_map(|t| [t.a, t.b, t.c]).collect();
        let min_y = corners.iter().map(|p| p.y).fold(f32::MAX, f32::min);
        assert!(min_y.abs() < 1e-5, "house floats at {min_y}");

        // the floor corners are centred under the shed
        let floor: Vec<_> = corners.iter().filter(|p| p.y.abs() < 1e-5).collect();
        let (min_z, max_z) = floor
            .iter()
            .fold((f32::MAX, f32::MIN), |(lo, hi), p| (lo.min(p.z), hi.max(p.z)));
        assert!(((min_z + max_z) / 2.0 - shed.placement.position.z).abs() < 1e-4);
        assert!((max_z - min_z - 3.0).abs() < 1e-4);
    }
}
