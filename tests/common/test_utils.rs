#![allow(dead_code)]

use home_vr::{
    context::Context,
    flow::{FlowConsturctor, GraphicsFlow, Out},
    render::Render,
};
use winit::event::{DeviceEvent, WindowEvent};

/// Shared state the lifecycle tests count hook invocations in.
#[derive(Debug, Default)]
pub(crate) struct State {
    frame_counter: u32,
    init_invocations: u32,
    update_invocations: u32,
    custom_invocations: u32,
    pub dummy_state: String,
}

impl State {
    pub fn frame(&mut self) {
        self.frame_counter += 1;
    }

    pub fn init(&mut self) {
        self.init_invocations += 1;
    }

    pub fn update(&mut self) {
        self.update_invocations += 1;
    }

    pub fn custom(&mut self) {
        self.custom_invocations += 1;
    }

    pub fn frame_counter(&self) -> u32 {
        self.frame_counter
    }

    pub fn init_invocations(&self) -> u32 {
        self.init_invocations
    }

    pub fn update_invocations(&self) -> u32 {
        self.update_invocations
    }

    pub fn custom_invocations(&self) -> u32 {
        self.custom_invocations
    }
}

/// Renders nothing, lets `check` look at the context every frame and exits
/// the event loop after `frames` updates.
pub(crate) struct ExitAfter<S, E> {
    pub frames: u32,
    seen: u32,
    check: Box<dyn Fn(&Context, u32)>,
    _marker: std::marker::PhantomData<(S, E)>,
}

impl<S, E> ExitAfter<S, E> {
    pub fn new(frames: u32, check: impl Fn(&Context, u32) + 'static) -> Self {
        Self {
            frames,
            seen: 0,
            check: Box::new(check),
            _marker: std::marker::PhantomData,
        }
    }
}

impl<S: 'static, E: 'static> ExitAfter<S, E> {
    pub fn constructor(self) -> FlowConsturctor<S, E> {
        Box::new(move |_| Box::pin(async move { Box::new(self) as Box<dyn GraphicsFlow<S, E>> }))
    }
}

impl<S, E> GraphicsFlow<S, E> for ExitAfter<S, E> {
    fn on_init(&mut self, _: &mut Context, _: &mut S) -> Out<S, E> {
        Out::Empty
    }

    fn on_update(&mut self, ctx: &Context, _: &mut S, _: std::time::Duration) -> Out<S, E> {
        self.seen += 1;
        (self.check)(ctx, self.seen);
        if self.seen >= self.frames {
            Out::Exit
        } else {
            Out::Empty
        }
    }

    fn on_tick(&mut self, _: &Context, _: &mut S) -> Out<S, E> {
        Out::Empty
    }

    fn on_device_events(&mut self, _: &Context, _: &mut S, _: &DeviceEvent) -> Out<S, E> {
        Out::Empty
    }

    fn on_window_events(&mut self, _: &Context, _: &mut S, _: &WindowEvent) -> Out<S, E> {
        Out::Empty
    }

    fn on_custom_events(&mut self, _: &Context, _: &mut S, event: E) -> Option<E> {
        Some(event)
    }

    fn on_render(&self) -> Render<'_> {
        Render::None
    }
}
