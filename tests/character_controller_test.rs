use cgmath::{Deg, InnerSpace, Rad, Vector3};
use home_vr::{
    camera::Camera,
    character::CharacterController,
    config::ControllerConfig,
    input::InputManager,
    pawn::Pawn,
    physics::{Collider, CollisionWorld},
    scene::layout::{GROUND_ID, SHED_ID, SceneLayout},
};
use instant::Duration;
use winit::keyboard::KeyCode;

const FRAME: Duration = Duration::from_millis(16);

/// The default layout with every prop on its procedural fallback.
fn fallback_world(layout: &SceneLayout) -> CollisionWorld {
    let mut world = CollisionWorld::new();
    for spec in &layout.props {
        if let Some(data) = spec.fallback.mesh_data() {
            world.add(
                Collider::new(spec.id, spec.name.clone(), data.triangles(&spec.fallback_matrix()))
                    .with_pickable(spec.pickable)
                    .with_collisions(spec.collisions),
            );
        }
    }
    world
}

fn controller(layout: &SceneLayout) -> CharacterController {
    let camera = Camera::new((0.0, 5.0, -10.0), Deg(90.0), Deg(0.0));
    CharacterController::new(
        Pawn::at(layout.pawn_start),
        camera,
        ControllerConfig::default(),
    )
}

#[test]
fn house_wall_stops_the_pawn() {
    let layout = SceneLayout::default();
    let world = fallback_world(&layout);
    let mut controller = controller(&layout);
    let mut input = InputManager::new();
    input.press(KeyCode::KeyW);

    let mut look = None;
    for _ in 0..300 {
        input.update();
        look = controller.update(&input, &world, FRAME);
    }

    let pos = controller.pawn.position();
    // the front wall is at z = 2.5 and the pawn is one unit deep
    assert!(pos.z < 1.6, "walked into the house: {pos:?}");
    assert!(pos.z > 1.0, "stopped short of the house: {pos:?}");
    assert!(pos.y.abs() < 0.05, "left the ground: {pos:?}");
    assert!(controller.grounded());
    assert_eq!(look.map(|pick| pick.id), Some(SHED_ID));
}

#[test]
fn looking_down_picks_the_ground() {
    let layout = SceneLayout::default();
    let world = fallback_world(&layout);
    let mut controller = controller(&layout);
    controller.camera.pitch = Rad::from(Deg(-60.0));

    let input = InputManager::new();
    let mut look = None;
    for _ in 0..30 {
        look = controller.update(&input, &world, FRAME);
    }
    let look = look.expect("the ground is below the camera");
    assert_eq!(look.id, GROUND_ID);
    assert!(look.point.y.abs() < 1e-3);
    // eye height over sin(60°)
    assert!((look.distance - 1.7 / 60f32.to_radians().sin()).abs() < 0.05);
}

#[test]
fn sky_never_blocks_or_gets_picked() {
    let layout = SceneLayout::default();
    let mut world = fallback_world(&layout);
    let sky = layout.props.iter().find(|p| !p.pickable).expect("sky prop");
    // a sky dome around the pawn, as a closed box
    let dome = home_vr::resources::mesh::MeshData::cuboid(6.0, 6.0, 6.0);
    let pawn_start = cgmath::Matrix4::from_translation(layout.pawn_start);
    world.add(
        Collider::new(sky.id, sky.name.clone(), dome.triangles(&pawn_start))
            .with_pickable(sky.pickable)
            .with_collisions(sky.collisions),
    );

    let mut controller = controller(&layout);
    let mut input = InputManager::new();
    input.press(KeyCode::KeyS);
    for _ in 0..60 {
        input.update();
        controller.update(&input, &world, FRAME);
    }
    let travelled = (controller.pawn.position() - layout.pawn_start).magnitude();
    assert!(travelled > 4.0, "the sky held the pawn back: {travelled}");
    assert!(world.pick_with_ray(&controller.camera.forward_ray(10.0), Collider::is_pickable)
        .is_none_or(|pick| pick.id != sky.id));
}

#[test]
fn starting_position_is_on_the_ground() {
    let layout = SceneLayout::default();
    let world = fallback_world(&layout);
    let controller = controller(&layout);
    assert!(controller.is_grounded(&world));
    let floor = controller
        .floor_raycast(&world, 0.0, 0.0, 0.6)
        .expect("ground under the pawn");
    assert!((floor - Vector3::new(0.0, 0.0, -8.0)).magnitude() < 1e-4);
}
