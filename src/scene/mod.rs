//! The home scene: props, pawn and the per-frame wiring between the
//! character controller and the engine.
//!
//! Procedural fallbacks for every prop are built in the constructor, so the
//! scene is walkable from the first frame. glTF files then load in the
//! background and replace their fallback (render node and collider) once
//! they arrive.

pub mod highlight;
pub mod layout;

use std::rc::Rc;

use instant::Duration;
use winit::{
    event::{DeviceEvent, ElementState, KeyEvent, WindowEvent},
    keyboard::{KeyCode, ModifiersState, PhysicalKey},
};

use crate::{
    camera::{Camera, Projection},
    character::CharacterController,
    config::HomeConfig,
    context::{Context, InitContext},
    data_structures::{
        model::{Material, Model},
        scene_graph::{ModelNode, SceneNode},
    },
    flow::{FlowConsturctor, GraphicsFlow, Out},
    input::InputManager,
    pawn::Pawn,
    physics::{Collider, CollisionWorld},
    pipelines::light::LightUniform,
    render::Render,
    resources::{LoadedModel, load_model_gltf, mesh::MeshData, texture::diffuse_layout},
    scene::{highlight::Highlights, layout::PropSpec},
    xr::XrSupport,
};

/// Render id of the optional pawn body. Never in the collision world.
const PAWN_BODY_ID: u32 = 0;

pub enum HomeEvent {
    PropLoaded {
        id: u32,
        result: anyhow::Result<LoadedModel>,
    },
}

struct Prop {
    spec: PropSpec,
    node: Option<Box<dyn SceneNode>>,
}

pub struct HomeScene {
    config: HomeConfig,
    device: wgpu::Device,
    queue: wgpu::Queue,
    props: Vec<Prop>,
    pawn_body: Option<Box<dyn SceneNode>>,
    world: CollisionWorld,
    input: InputManager,
    controller: CharacterController,
    highlight_material: Rc<Material>,
    highlighted: Highlights,
    modifiers: ModifiersState,
    inspector: bool,
    xr: XrSupport,
}

impl HomeScene {
    pub fn new(init: InitContext, config: HomeConfig) -> Self {
        let InitContext { device, queue, .. } = init;
        let layout = diffuse_layout(&device);

        let mut world = CollisionWorld::new();
        let mut props = Vec::new();
        for spec in config.layout.props.iter().cloned() {
            let node = spec.fallback.mesh_data().map(|data| {
                let matrix = spec.fallback_matrix();
                world.add(collider_for(&spec, &data, &matrix));
                let material = Material::from_colour(
                    &device,
                    &queue,
                    &format!("{} fallback", spec.name),
                    spec.fallback.colour(),
                    &layout,
                );
                let mut node = single_mesh_node(&device, spec.id, &spec.name, &data, material);
                node.set_local_transform(0, spec.fallback_placement.clone());
                place(node.as_mut(), &queue);
                node
            });
            props.push(Prop { spec, node });
        }
        log::info!("Built {} fallback colliders", world.len());

        let pawn_body = config.show_pawn_body.then(|| {
            let material =
                Material::from_colour(&device, &queue, "pawn body", config.pawn_body_colour, &layout);
            single_mesh_node(&device, PAWN_BODY_ID, "pawn body", &Pawn::body_mesh(), material)
        });

        let camera = Camera::new(config.camera.position, config.camera.yaw, config.camera.pitch);
        let controller = CharacterController::new(
            Pawn::at(config.layout.pawn_start),
            camera,
            config.controller.clone(),
        );
        let highlight_material = Rc::new(Material::from_colour(
            &device,
            &queue,
            "highlight",
            config.highlight_colour,
            &layout,
        ));

        Self {
            config,
            device,
            queue,
            props,
            pawn_body,
            world,
            input: InputManager::new(),
            controller,
            highlight_material,
            highlighted: Highlights::new(),
            modifiers: ModifiersState::empty(),
            inspector: false,
            xr: XrSupport::detect(),
        }
    }

    /// Flow constructor for [`crate::flow::run`].
    pub fn constructor(config: HomeConfig) -> FlowConsturctor<(), HomeEvent> {
        Box::new(move |init| {
            Box::pin(async move {
                Box::new(HomeScene::new(init, config)) as Box<dyn GraphicsFlow<(), HomeEvent>>
            })
        })
    }

    pub fn world(&self) -> &CollisionWorld {
        &self.world
    }

    pub fn controller(&self) -> &CharacterController {
        &self.controller
    }

    pub fn highlighted(&self) -> &Highlights {
        &self.highlighted
    }

    fn install(&mut self, id: u32, loaded: LoadedModel) {
        let Some(prop) = self.props.iter_mut().find(|prop| prop.spec.id == id) else {
            log::warn!("Loaded a model for unknown prop {id}");
            return;
        };
        let LoadedModel {
            mut root,
            collision,
        } = loaded;
        root.set_local_transform(0, prop.spec.placement.clone());
        if self.highlighted.contains(id) {
            root.set_highlight(id, Some(self.highlight_material.clone()));
        }
        place(root.as_mut(), &self.queue);
        prop.node = Some(root);

        swap_collider(&mut self.world, &prop.spec, &collision, &prop.spec.placement.to_matrix());
        log::info!("Prop {} replaced its fallback", prop.spec.name);
    }

    /// Highlights `target` for good. Props hit earlier keep their highlight.
    fn highlight(&mut self, target: Option<u32>) {
        let Some(id) = self.highlighted.hit(target) else {
            return;
        };
        for node in self.props.iter_mut().filter_map(|prop| prop.node.as_mut()) {
            node.set_highlight(id, Some(self.highlight_material.clone()));
        }
        log::debug!("Highlighting prop {id}");
    }

    fn log_inspector(&self, ctx: &Context) {
        let pawn = self.controller.pawn.position();
        let camera = &ctx.camera.camera;
        log::info!(
            "pawn ({:.2}, {:.2}, {:.2}) grounded={} gravity={:.2} | camera ({:.2}, {:.2}, {:.2}) yaw={:.2} pitch={:.2} | highlight={:?} | colliders={} | {}",
            pawn.x,
            pawn.y,
            pawn.z,
            self.controller.grounded(),
            self.controller.gravity().y,
            camera.position.x,
            camera.position.y,
            camera.position.z,
            camera.yaw.0,
            camera.pitch.0,
            self.highlighted,
            self.world.len(),
            self.xr,
        );
    }
}

fn collider_for(spec: &PropSpec, data: &MeshData, matrix: &cgmath::Matrix4<f32>) -> Collider {
    Collider::new(spec.id, spec.name.clone(), data.triangles(matrix))
        .with_pickable(spec.pickable)
        .with_collisions(spec.collisions)
}

/// Replaces the collider of `spec` with `collision` placed by `matrix`. An
/// empty mesh leaves the prop without a collider.
fn swap_collider(
    world: &mut CollisionWorld,
    spec: &PropSpec,
    collision: &MeshData,
    matrix: &cgmath::Matrix4<f32>,
) {
    world.remove(spec.id);
    if !collision.is_empty() {
        world.add(collider_for(spec, collision, matrix));
    }
}

fn single_mesh_node(
    device: &wgpu::Device,
    id: u32,
    name: &str,
    data: &MeshData,
    material: Material,
) -> Box<dyn SceneNode> {
    let model = Model {
        meshes: vec![data.to_mesh(device, name, 0)],
        materials: vec![Rc::new(material)],
    };
    Box::new(ModelNode::from_model(1, id, device, model))
}

/// Propagates the local transforms and uploads the result.
fn place(node: &mut dyn SceneNode, queue: &wgpu::Queue) {
    node.update_world_transform_all();
    node.write_to_buffers(queue);
}

impl GraphicsFlow<(), HomeEvent> for HomeScene {
    fn on_init(&mut self, ctx: &mut Context, _: &mut ()) -> Out<(), HomeEvent> {
        let lighting = &self.config.lighting;
        let [r, g, b] = lighting.fog_colour;
        ctx.clear_colour = wgpu::Color {
            r: r as f64,
            g: g as f64,
            b: b as f64,
            a: 1.0,
        };
        ctx.tick_duration_millis = self.config.tick_duration_millis;
        ctx.light.uniform = LightUniform::from(lighting);
        ctx.light.write(&ctx.queue);

        let camera_config = &self.config.camera;
        ctx.projection = Projection::new(
            ctx.config.width,
            ctx.config.height,
            camera_config.fovy,
            camera_config.znear,
            camera_config.zfar,
        );
        ctx.camera.controller.angular_sensibility = camera_config.angular_sensibility;
        ctx.camera.controller.speed = camera_config.free_fly_speed;
        ctx.camera.controller.free_fly = camera_config.free_fly;
        ctx.camera.camera = Camera::new(camera_config.position, camera_config.yaw, camera_config.pitch);
        if !camera_config.free_fly {
            self.controller.assign_camera(ctx.camera.camera);
            ctx.camera.camera = self.controller.camera;
        }
        ctx.write_camera();
        log::info!("{}", self.xr);

        let loads: Vec<Box<dyn Future<Output = HomeEvent>>> = self
            .props
            .iter()
            .filter_map(|prop| {
                let path = prop.spec.model.clone()?;
                let id = prop.spec.id;
                let device = self.device.clone();
                let queue = self.queue.clone();
                Some(Box::new(async move {
                    let result = load_model_gltf(&path, id, &device, &queue).await;
                    HomeEvent::PropLoaded { id, result }
                }) as Box<dyn Future<Output = HomeEvent>>)
            })
            .collect();
        if loads.is_empty() {
            Out::Empty
        } else {
            Out::FutEvent(loads)
        }
    }

    fn on_update(&mut self, ctx: &Context, _: &mut (), dt: Duration) -> Out<(), HomeEvent> {
        if ctx.camera.controller.free_fly {
            let ray = ctx.camera.camera.forward_ray(self.config.controller.look_distance);
            let look = self.world.pick_with_ray(&ray, Collider::is_pickable);
            self.highlight(look.map(|pick| pick.id));
            return Out::Empty;
        }

        self.input.update();
        // mouse look belongs to the engine camera, position to the controller
        self.controller.camera.yaw = ctx.camera.camera.yaw;
        self.controller.camera.pitch = ctx.camera.camera.pitch;
        let look = self.controller.update(&self.input, &self.world, dt);
        self.highlight(look.map(|pick| pick.id));

        if let Some(body) = self.pawn_body.as_mut() {
            body.set_local_transform(0, self.controller.pawn.transform.clone());
            place(body.as_mut(), &self.queue);
        }

        let position = self.controller.camera.position;
        Out::Configure(Box::new(move |ctx| ctx.camera.camera.position = position))
    }

    fn on_tick(&mut self, ctx: &Context, _: &mut ()) -> Out<(), HomeEvent> {
        if self.inspector {
            self.log_inspector(ctx);
        }
        Out::Empty
    }

    fn on_device_events(&mut self, _: &Context, _: &mut (), _: &DeviceEvent) -> Out<(), HomeEvent> {
        Out::Empty
    }

    fn on_window_events(
        &mut self,
        _: &Context,
        _: &mut (),
        event: &WindowEvent,
    ) -> Out<(), HomeEvent> {
        self.input.handle_window_event(event);
        match event {
            WindowEvent::ModifiersChanged(modifiers) => self.modifiers = modifiers.state(),
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        repeat: false,
                        ..
                    },
                ..
            } => match key {
                KeyCode::KeyI if self.modifiers.control_key() && self.modifiers.alt_key() => {
                    self.inspector = !self.inspector;
                    log::info!("Inspector {}", if self.inspector { "on" } else { "off" });
                }
                KeyCode::Escape if cfg!(not(target_arch = "wasm32")) => return Out::Exit,
                _ => (),
            },
            _ => (),
        }
        Out::Empty
    }

    fn on_custom_events(&mut self, _: &Context, _: &mut (), event: HomeEvent) -> Option<HomeEvent> {
        match event {
            HomeEvent::PropLoaded { id, result } => match result {
                Ok(loaded) => self.install(id, loaded),
                Err(e) => log::warn!("Keeping the fallback for prop {id}: {e:#}"),
            },
        }
        None
    }

    fn on_render(&self) -> Render<'_> {
        let mut renders: Vec<Render<'_>> = self
            .props
            .iter()
            .filter_map(|prop| {
                let node: &dyn SceneNode = prop.node.as_deref()?;
                Some(Render::from(node))
            })
            .collect();
        if let Some(body) = self.pawn_body.as_deref() {
            let body: &dyn SceneNode = body;
            renders.push(Render::from(body));
        }
        Render::Composed(renders)
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{Matrix4, Vector3};

    use super::*;
    use crate::{
        physics::Ray,
        scene::layout::{SHED_ID, SceneLayout},
    };

    fn shed_on_fallback() -> (CollisionWorld, PropSpec) {
        let layout = SceneLayout::default();
        let shed = layout.prop(SHED_ID).expect("shed").clone();
        let mut world = CollisionWorld::new();
        let house = shed.fallback.mesh_data().expect("house fallback");
        world.add(collider_for(&shed, &house, &shed.fallback_matrix()));
        (world, shed)
    }

    // along +z through the front wall of the fallback house at z = 2.5
    fn ray_at_the_shed() -> Ray {
        Ray::new(Vector3::new(0.0, 1.0, -5.0), Vector3::unit_z(), 20.0)
    }

    #[test]
    fn loaded_collider_replaces_the_fallback() {
        let (mut world, shed) = shed_on_fallback();
        let before = world
            .pick_with_ray(&ray_at_the_shed(), Collider::is_pickable)
            .expect("fallback house");
        assert_eq!(before.id, SHED_ID);
        assert!((before.distance - 7.5).abs() < 1e-4);

        // a loaded model standing further back, front face at z = 7.5
        let loaded = MeshData::cuboid(1.0, 1.0, 1.0);
        let matrix = Matrix4::from_translation(Vector3::new(0.0, 1.0, 8.0));
        swap_collider(&mut world, &shed, &loaded, &matrix);

        assert_eq!(world.len(), 1);
        let after = world
            .pick_with_ray(&ray_at_the_shed(), Collider::is_pickable)
            .expect("loaded model");
        assert_eq!(after.id, SHED_ID);
        assert!((after.distance - 12.5).abs() < 1e-4, "hit at {}", after.distance);
    }

    #[test]
    fn model_without_triangles_drops_the_collider() {
        let (mut world, shed) = shed_on_fallback();
        swap_collider(&mut world, &shed, &MeshData::default(), &Matrix4::from_scale(1.0));
        assert!(world.is_empty());
        assert!(world.pick_with_ray(&ray_at_the_shed(), Collider::is_pickable).is_none());
    }
}
