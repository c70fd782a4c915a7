//! What flows hand to the renderer each frame.
//!
//! Everything is drawn with the basic pipeline, so a [`Render`] tree is only
//! flattened into one list of instanced draws per frame.

use crate::data_structures::{
    model::{Material, Model},
    scene_graph::SceneNode,
};

/// One instanced draw: a model, its instance buffer and the object id.
///
/// `material` overrides every material of the model when set, which is how
/// highlighted objects are drawn.
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub model: &'a Model,
    pub amount: usize,
    pub id: u32,
    pub material: Option<&'a Material>,
}

pub enum Render<'a> {
    None,
    Defaults(Vec<Instanced<'a>>),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    /// Appends every draw in this tree to `batch`, depth first.
    pub(crate) fn flatten_into(self, batch: &mut Vec<Instanced<'a>>) {
        match self {
            Render::None => (),
            Render::Defaults(mut draws) => batch.append(&mut draws),
            Render::Composed(renders) => {
                for render in renders {
                    render.flatten_into(batch);
                }
            }
        }
    }
}

impl<'a> From<&'a dyn SceneNode> for Render<'a> {
    fn from(node: &'a dyn SceneNode) -> Self {
        Render::Defaults(node.get_render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_compositions_flatten_to_nothing() {
        let render = Render::Composed(vec![
            Render::None,
            Render::Composed(vec![Render::Defaults(Vec::new()), Render::None]),
        ]);
        let mut batch = Vec::new();
        render.flatten_into(&mut batch);
        assert!(batch.is_empty());
    }
}
