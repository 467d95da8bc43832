//! Render composition.
//!
//! Flows describe what they want drawn each frame with a [`Render`]. The
//! engine flattens all of them into a list of [`Instanced`] batches and draws
//! that list twice: the shadow casters into the shadow map, then everything
//! with the lit pipeline.

use crate::data_structures::model::Model;

/// Data for instanced object rendering: a model and its instance buffers.
///
/// `instance` holds every instance of the model. `casters` holds the subset
/// that is drawn into the shadow map, if there is one.
#[derive(Clone, Copy, Debug)]
pub struct Instanced<'a> {
    pub instance: &'a wgpu::Buffer,
    pub model: &'a Model,
    pub amount: usize,
    pub casters: Option<&'a wgpu::Buffer>,
    pub caster_amount: usize,
}

impl Instanced<'_> {
    pub fn casts_shadow(&self) -> bool {
        self.casters.is_some() && self.caster_amount > 0
    }
}

/// Specifies how a flow should be rendered.
///
/// # Variants
///
/// - `None` renders nothing
/// - `Default(Instanced)` renders a single instanced object
/// - `Defaults(Vec<Instanced>)` renders a batch of instanced objects
/// - `Composed(Vec<Render>)` recursively renders a composition of renders
#[derive(Debug)]
pub enum Render<'a> {
    None,
    Default(Instanced<'a>),
    Defaults(Vec<Instanced<'a>>),
    Composed(Vec<Render<'a>>),
}

impl<'a> Render<'a> {
    /// Append every batch of this render to `batches`, in order.
    pub(crate) fn collect_into(self, batches: &mut Vec<Instanced<'a>>) {
        match self {
            Render::None => (),
            Render::Default(instanced) => batches.push(instanced),
            Render::Defaults(mut vec) => batches.append(&mut vec),
            Render::Composed(renders) => renders
                .into_iter()
                .for_each(|render| render.collect_into(batches)),
        }
    }
}

impl<'a> From<Instanced<'a>> for Render<'a> {
    fn from(instanced: Instanced<'a>) -> Self {
        Render::Default(instanced)
    }
}
