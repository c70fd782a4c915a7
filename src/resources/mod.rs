//! Loading meshes and textures from asset files, plus procedural geometry.
//!
//! - `mesh` holds [`mesh::MeshData`], the CPU geometry shared by rendering and collision
//! - `texture` reads asset bytes from disk or over HTTP on the web

use std::{
    io::{BufReader, Cursor},
    rc::Rc,
};

use anyhow::{Context, bail};
use cgmath::{Matrix4, Quaternion, SquareMatrix};

use crate::{
    data_structures::{
        instance::Instance,
        model::{Material, Model},
        scene_graph::{ContainerNode, ModelNode, SceneNode},
        texture::Texture,
    },
    resources::{
        mesh::MeshData,
        texture::{diffuse_layout, load_binary, load_texture, sibling_path},
    },
};

pub mod mesh;
pub mod texture;

/// A glTF file turned into a render tree plus the triangles to collide with.
pub struct LoadedModel {
    /// Single instance container; its local transform places the whole file.
    pub root: Box<dyn SceneNode>,
    /// Every triangle of the file in model space (node transforms applied,
    /// root placement not).
    pub collision: MeshData,
}

/// Loads a `.gltf` or `.glb` file. Every model node of the file gets `id`.
///
/// Buffers and images referenced by URI are resolved next to the file.
/// Materials use the base colour texture, or the base colour factor when the
/// material has none. Animations are ignored.
pub async fn load_model_gltf(
    file_name: &str,
    id: u32,
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<LoadedModel> {
    let gltf_bytes = load_binary(file_name).await?;
    let gltf_reader = BufReader::new(Cursor::new(gltf_bytes));
    let gltf = gltf::Gltf::from_reader(gltf_reader)
        .with_context(|| format!("parsing {file_name}"))?;

    // Load buffers
    let mut buffer_data: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        match buffer.source() {
            gltf::buffer::Source::Bin => {
                let blob = gltf
                    .blob
                    .as_deref()
                    .with_context(|| format!("{file_name} has no binary chunk"))?;
                buffer_data.push(blob.to_vec());
            }
            gltf::buffer::Source::Uri(uri) if uri.starts_with("data:") => {
                bail!("{file_name}: embedded data URIs are not supported");
            }
            gltf::buffer::Source::Uri(uri) => {
                buffer_data.push(load_binary(&sibling_path(file_name, uri)).await?);
            }
        }
    }

    // Load materials
    let layout = diffuse_layout(device);
    let mut materials = Vec::new();
    for material in gltf.materials() {
        let name = match material.name() {
            Some(name) => name.to_string(),
            None => format!("{}#{}", file_name, material.index().unwrap_or_default()),
        };
        let pbr = material.pbr_metallic_roughness();
        let [r, g, b, _] = pbr.base_color_factor();
        let diffuse_texture = match pbr.base_color_texture() {
            Some(info) => {
                let source = info.texture().source().source();
                match load_image(source, file_name, &buffer_data, device, queue).await {
                    Ok(texture) => Some(texture),
                    Err(e) => {
                        log::warn!("Texture of material {name} could not be loaded: {e:#}");
                        None
                    }
                }
            }
            None => None,
        };
        let material = match diffuse_texture {
            Some(texture) => Material::new(device, &name, texture, &layout),
            None => Material::from_colour(device, queue, &name, [r, g, b], &layout),
        };
        materials.push(Rc::new(material));
    }
    // glTF primitives without a material are white
    let default_material = materials.len();
    materials.push(Rc::new(Material::from_colour(
        device,
        queue,
        &format!("{file_name}#default"),
        [1.0, 1.0, 1.0],
        &layout,
    )));

    let scene = gltf
        .default_scene()
        .or_else(|| gltf.scenes().next())
        .with_context(|| format!("{file_name} contains no scene"))?;

    let mut root = ContainerNode::new(1);
    let mut collision = MeshData::default();
    let mut loader = NodeLoader {
        id,
        buffers: &buffer_data,
        device,
        materials: &materials,
        default_material,
        collision: &mut collision,
    };
    for node in scene.nodes() {
        root.add_child(loader.to_scene_node(node, &Matrix4::identity()));
    }
    log::info!(
        "Loaded {} with {} collision triangles",
        file_name,
        collision.indices.len() / 3
    );

    Ok(LoadedModel {
        root: Box::new(root),
        collision,
    })
}

async fn load_image(
    source: gltf::image::Source<'_>,
    file_name: &str,
    buffers: &[Vec<u8>],
    device: &wgpu::Device,
    queue: &wgpu::Queue,
) -> anyhow::Result<Texture> {
    match source {
        gltf::image::Source::View { view, mime_type } => {
            let buffer = buffers
                .get(view.buffer().index())
                .context("image view points at a missing buffer")?;
            let bytes = buffer
                .get(view.offset()..view.offset() + view.length())
                .context("image view exceeds its buffer")?;
            Texture::from_bytes(device, queue, bytes, file_name, mime_type.split('/').next_back())
        }
        gltf::image::Source::Uri { uri, mime_type } => {
            load_texture(
                &sibling_path(file_name, uri),
                device,
                queue,
                mime_type.and_then(|mt| mt.split('/').next_back()),
            )
            .await
        }
    }
}

/// State shared while walking the node hierarchy of one file.
struct NodeLoader<'a> {
    id: u32,
    buffers: &'a [Vec<u8>],
    device: &'a wgpu::Device,
    materials: &'a [Rc<Material>],
    default_material: usize,
    collision: &'a mut MeshData,
}

impl NodeLoader<'_> {
    fn to_scene_node(&mut self, node: gltf::scene::Node, parent: &Matrix4<f32>) -> Box<dyn SceneNode> {
        let world = *parent * Matrix4::from(node.transform().matrix());
        let mut scene_node: Box<dyn SceneNode> = match node.mesh() {
            Some(mesh) => {
                let name = mesh.name().unwrap_or("unknown_mesh");
                let mut meshes = Vec::new();
                for primitive in mesh.primitives() {
                    if primitive.mode() != gltf::mesh::Mode::Triangles {
                        log::warn!("Skipping non-triangle primitive of mesh {name}");
                        continue;
                    }
                    let data = self.read_primitive(&primitive);
                    if data.is_empty() {
                        continue;
                    }
                    let material = primitive
                        .material()
                        .index()
                        .unwrap_or(self.default_material);
                    meshes.push(data.to_mesh(self.device, name, material));
                    self.collision.append(data, &world);
                }
                let model = Model {
                    meshes,
                    materials: self.materials.to_vec(),
                };
                Box::new(ModelNode::from_model(1, self.id, self.device, model))
            }
            None => Box::new(ContainerNode::new(1)),
        };

        let (translation, [x, y, z, w], scale) = node.transform().decomposed();
        scene_node.set_local_transform(
            0,
            Instance {
                position: translation.into(),
                rotation: Quaternion::new(w, x, y, z),
                scale: scale.into(),
            },
        );
        for child in node.children() {
            let child_node = self.to_scene_node(child, &world);
            scene_node.add_child(child_node);
        }

        scene_node
    }

    fn read_primitive(&self, primitive: &gltf::Primitive) -> MeshData {
        let buffers = self.buffers;
        let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

        let positions: Vec<[f32; 3]> = reader
            .read_positions()
            .map(|positions| positions.collect())
            .unwrap_or_default();
        let normals = reader
            .read_normals()
            .map(|normals| normals.collect())
            .unwrap_or_else(|| vec![[0.0, 1.0, 0.0]; positions.len()]);
        let tex_coords = reader
            .read_tex_coords(0)
            .map(|coords| coords.into_f32().collect())
            .unwrap_or_else(|| vec![[0.0, 0.0]; positions.len()]);
        let indices = reader
            .read_indices()
            .map(|indices| indices.into_u32().collect())
            .unwrap_or_else(|| (0..positions.len() as u32).collect());

        MeshData {
            positions,
            normals,
            tex_coords,
            indices,
        }
    }
}
