//! Scene graph and hierarchical scene organization.
//!
//! Every node keeps a `(local, world)` pair per instance. Updating the world
//! transforms walks the tree and multiplies each local transform with its
//! parent's world transform; `write_to_buffers` then uploads the world
//! transforms of model nodes to their instance buffers.

use std::{ops::Range, rc::Rc};

use log::warn;
use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        instance::{Instance, InstanceRaw},
        model::{self, Material},
    },
    render::Instanced,
};

pub trait SceneNode {
    fn get_world_transforms(&self) -> Vec<Instance>;

    fn get_local_transform(&self, idx: usize) -> Option<Instance>;

    fn set_local_transform(&mut self, idx: usize, instance: Instance);

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>>;

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>>;

    fn add_child(&mut self, child: Box<dyn SceneNode>);

    /**
     * Multiple instances of a parent can be passed down to multiple instances of multiple children.
     * The argument `parents_world_transform` with a matching `range` size provides control over which instances are transformed.
     */
    fn update_world_transforms(&mut self, range: Range<usize>, parents_world_transform: &[Instance]);

    fn update_world_transform_all(&mut self);

    fn write_to_buffers(&mut self, queue: &wgpu::Queue);

    /// Draws every model below this node that carries `id` with `material`
    /// instead of its own materials. `None` restores the originals.
    fn set_highlight(&mut self, id: u32, material: Option<Rc<Material>>);

    fn get_render(&self) -> Vec<Instanced<'_>>;
}

/// Shared by both node kinds: combines the locals in `range` with the
/// parent transforms and stores the result as the new world transforms.
fn propagate(
    instances: &mut [(Instance, Instance)],
    range: Range<usize>,
    parents_world_transform: &[Instance],
) -> Option<Vec<Instance>> {
    if parents_world_transform.len() > instances.len() {
        warn!(
            "You tried to transform with len {}, but there are only {} instances to transform.",
            parents_world_transform.len(),
            instances.len()
        );
        return None;
    }
    let len = instances.len();
    let Some(slice) = instances.get_mut(range.clone()) else {
        warn!(
            "You tried to transform range {}..{}, which is out of bounds for parent len {}.",
            range.start, range.end, len,
        );
        return None;
    };
    Some(
        slice
            .iter_mut()
            .zip(parents_world_transform)
            .map(|((local, world), parent)| {
                *world = parent * &*local;
                world.clone()
            })
            .collect(),
    )
}

fn identity_pairs(amount: usize) -> Vec<(Instance, Instance)> {
    (0..amount)
        .map(|_| (Instance::default(), Instance::default()))
        .collect()
}

/// A node without geometry. Glues children together and carries a transform.
pub struct ContainerNode {
    pub children: Vec<Box<dyn SceneNode>>,
    pub instances: Vec<(Instance, Instance)>,
}

impl ContainerNode {
    pub fn new(amount: usize) -> Self {
        Self {
            children: vec![],
            instances: identity_pairs(amount),
        }
    }
}

impl SceneNode for ContainerNode {
    fn get_world_transforms(&self) -> Vec<Instance> {
        self.instances
            .iter()
            .map(|(_, world)| world)
            .cloned()
            .collect()
    }

    fn get_local_transform(&self, idx: usize) -> Option<Instance> {
        self.instances.get(idx).map(|(local, _)| local).cloned()
    }

    fn set_local_transform(&mut self, idx: usize, instance: Instance) {
        if let Some((local, _)) = self.instances.get_mut(idx) {
            *local = instance;
        }
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn update_world_transforms(&mut self, range: Range<usize>, parents_world_transform: &[Instance]) {
        if let Some(world_transforms) = propagate(&mut self.instances, range.clone(), parents_world_transform) {
            for child in self.children.iter_mut() {
                child.update_world_transforms(range.clone(), &world_transforms);
            }
        }
    }

    fn update_world_transform_all(&mut self) {
        let range = 0..self.instances.len();
        let identities: Vec<_> = range.clone().map(|_| Instance::default()).collect();
        self.update_world_transforms(range, &identities);
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        self.children
            .iter_mut()
            .for_each(|child| child.write_to_buffers(queue));
    }

    fn set_highlight(&mut self, id: u32, material: Option<Rc<Material>>) {
        for child in self.children.iter_mut() {
            child.set_highlight(id, material.clone());
        }
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        self.children
            .iter()
            .flat_map(|child| child.get_render())
            .collect()
    }
}

/// A node that draws a [`model::Model`] once per instance.
pub struct ModelNode {
    children: Vec<Box<dyn SceneNode>>,
    instance_buffer: wgpu::Buffer,
    instances: Vec<(Instance, Instance)>,
    model: model::Model,
    highlight: Option<Rc<Material>>,
    id: u32,
}

impl ModelNode {
    pub fn from_model(amount: usize, id: u32, device: &wgpu::Device, model: model::Model) -> Self {
        let instances = identity_pairs(amount);
        let instance_data = instances
            .iter()
            .map(|(_, world)| world.to_raw())
            .collect::<Vec<_>>();

        let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Instance Buffer"),
            contents: bytemuck::cast_slice(&instance_data),
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
        });

        Self {
            children: vec![],
            instance_buffer,
            instances,
            model,
            highlight: None,
            id,
        }
    }

    pub fn id(&self) -> u32 {
        self.id
    }
}

impl SceneNode for ModelNode {
    fn get_world_transforms(&self) -> Vec<Instance> {
        self.instances
            .iter()
            .map(|(_, world)| world)
            .cloned()
            .collect()
    }

    fn get_local_transform(&self, idx: usize) -> Option<Instance> {
        self.instances.get(idx).map(|(local, _)| local).cloned()
    }

    fn set_local_transform(&mut self, idx: usize, instance: Instance) {
        if let Some((local, _)) = self.instances.get_mut(idx) {
            *local = instance;
        }
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.children
    }

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.children
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.children.push(child);
    }

    fn update_world_transforms(&mut self, range: Range<usize>, parents_world_transform: &[Instance]) {
        if let Some(world_transforms) = propagate(&mut self.instances, range.clone(), parents_world_transform) {
            for child in self.children.iter_mut() {
                child.update_world_transforms(range.clone(), &world_transforms);
            }
        }
    }

    fn update_world_transform_all(&mut self) {
        let range = 0..self.instances.len();
        let identities: Vec<_> = range.clone().map(|_| Instance::default()).collect();
        self.update_world_transforms(range, &identities);
    }

    fn write_to_buffers(&mut self, queue: &wgpu::Queue) {
        let raw_instances: Vec<InstanceRaw> = self
            .instances
            .iter()
            .map(|(_, world)| world.to_raw())
            .collect();
        queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(&raw_instances));
        self.children
            .iter_mut()
            .for_each(|child| child.write_to_buffers(queue));
    }

    fn set_highlight(&mut self, id: u32, material: Option<Rc<Material>>) {
        if self.id == id {
            self.highlight = material.clone();
        }
        for child in self.children.iter_mut() {
            child.set_highlight(id, material.clone());
        }
    }

    fn get_render(&self) -> Vec<Instanced<'_>> {
        self.children
            .iter()
            .flat_map(|child| child.get_render())
            .chain([Instanced {
                instance: &self.instance_buffer,
                model: &self.model,
                amount: self.instances.len(),
                id: self.id,
                material: self.highlight.as_deref(),
            }])
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use cgmath::{InnerSpace, Quaternion, Rad, Rotation3, Vector3};

    use super::*;

    #[test]
    fn world_transforms_compose_down_the_tree() {
        let mut root = ContainerNode::new(1);
        root.set_local_transform(
            0,
            Instance::new()
                .with_position(Vector3::new(0.0, 0.25, 4.0))
                .with_scale(Vector3::new(2.0, 2.0, 2.0)),
        );
        let mut child = ContainerNode::new(1);
        child.set_local_transform(
            0,
            Instance::new()
                .with_position(Vector3::new(1.0, 0.0, 0.0))
                .with_rotation(Quaternion::from_angle_y(Rad(1.0))),
        );
        root.add_child(Box::new(child));
        root.update_world_transform_all();

        let world = &root.get_children()[0].get_world_transforms()[0];
        assert!((world.position - Vector3::new(2.0, 0.25, 4.0)).magnitude() < 1e-6);
        assert!((world.scale - Vector3::new(2.0, 2.0, 2.0)).magnitude() < 1e-6);
    }

    #[test]
    fn out_of_range_updates_are_ignored() {
        let mut node = ContainerNode::new(1);
        node.set_local_transform(0, Instance::from(Vector3::new(1.0, 2.0, 3.0)));
        node.update_world_transforms(0..3, &[Instance::new(), Instance::new(), Instance::new()]);
        assert_eq!(node.get_world_transforms()[0], Instance::new());
    }

    #[test]
    fn setting_a_missing_local_transform_is_a_no_op() {
        let mut node = ContainerNode::new(1);
        node.set_local_transform(5, Instance::from(Vector3::new(1.0, 0.0, 0.0)));
        assert_eq!(node.get_local_transform(0), Some(Instance::new()));
        assert_eq!(node.get_local_transform(5), None);
    }
}
