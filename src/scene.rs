//! The Jenga scene: a tower of wooden blocks standing on a floor.

use winit::{
    event::{ElementState, KeyEvent, WindowEvent},
    keyboard::{KeyCode, PhysicalKey},
};

use crate::{
    context::{Context, InitContext},
    data_structures::{block::Tower, floor::Floor},
    flow::{FlowConstructor, GraphicsFlow, Out, ShutdownHandle},
    render::Render,
    resources,
};

#[derive(Debug)]
pub struct JengaScene {
    pub tower: Tower,
    pub floor: Floor,
    background: wgpu::Color,
    shutdown: ShutdownHandle,
}

impl JengaScene {
    pub async fn new(ctx: InitContext) -> Self {
        let config = &ctx.scene;
        let layout = &ctx.material_bind_group_layout;

        let wood = resources::load_wood_material(config, &ctx.device, &ctx.queue, layout).await;
        let floor_material = resources::floor_material(config, &ctx.device, &ctx.queue, layout);

        let tower = Tower::new(&ctx.device, config.tower.layout(), wood);
        let floor = Floor::new(&ctx.device, config.floor.layout(), floor_material);

        Self {
            tower,
            floor,
            background: config.background,
            shutdown: ctx.shutdown.clone(),
        }
    }

    /// Boxed constructor to hand to [`crate::flow::run`].
    pub fn constructor() -> FlowConstructor {
        Box::new(|ctx| {
            Box::pin(async move { Box::new(JengaScene::new(ctx).await) as Box<dyn GraphicsFlow> })
        })
    }
}

impl GraphicsFlow for JengaScene {
    fn on_init(&mut self, _ctx: &mut Context) -> Out {
        let background = self.background;
        Out::Configure(Box::new(move |ctx| ctx.clear_colour = background))
    }

    fn on_window_events(&mut self, _ctx: &Context, event: &WindowEvent) -> Out {
        if let WindowEvent::KeyboardInput {
            event:
                KeyEvent {
                    physical_key: PhysicalKey::Code(KeyCode::Escape),
                    state: ElementState::Pressed,
                    ..
                },
            ..
        } = event
        {
            self.shutdown.request();
        }
        Out::Empty
    }

    fn on_render(&self) -> Render<'_> {
        Render::Composed(vec![(&self.tower).into(), (&self.floor).into()])
    }
}
