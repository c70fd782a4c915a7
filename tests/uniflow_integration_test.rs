#![cfg(feature = "integration-tests")]

use home_vr::{
    context::Context,
    flow::{FlowConsturctor, GraphicsFlow, Out},
    render::Render,
};
use wgpu::Color;
use winit::event::{DeviceEvent, WindowEvent};

use crate::common::test_utils::State;

mod common;

enum Event {
    Test,
}

struct GraphicsElement;

impl GraphicsFlow<State, Event> for GraphicsElement {
    fn on_init(&mut self, ctx: &mut Context, state: &mut State) -> Out<State, Event> {
        assert_eq!(state.frame_counter(), 0);
        assert_eq!(state.init_invocations(), 0);
        assert_eq!(state.update_invocations(), 0);

        state.init();
        ctx.clear_colour = Color::TRANSPARENT;
        Out::Configure(Box::new(|ctx: &mut Context| ctx.tick_duration_millis = 10))
    }

    fn on_update(
        &mut self,
        ctx: &Context,
        state: &mut State,
        dt: std::time::Duration,
    ) -> Out<State, Event> {
        if state.frame_counter() == 0 {
            // timed from the end of initialization, not from App creation
            assert!(dt < std::time::Duration::from_secs(1), "first frame dt {dt:?}");
        }
        assert_eq!(state.frame_counter(), state.update_invocations());
        assert_eq!(state.init_invocations(), 1);
        assert_eq!(ctx.clear_colour, Color::TRANSPARENT);
        assert_eq!(ctx.tick_duration_millis, 10);
        state.frame();
        state.update();

        let serve_sencha: Box<dyn FnOnce(&mut State)> = Box::new(|state: &mut State| {
            state.dummy_state.push('🍵');
        });
        let serve_mate: Box<dyn FnOnce(&mut State)> = Box::new(|state: &mut State| {
            state.dummy_state.push('🧉');
        });
        match state.frame_counter() {
            3 => Out::FutEvent(vec![Box::new(async move { Event::Test })]),
            5 => Out::FutFn(vec![
                Box::new(async move { serve_sencha }),
                Box::new(async move { serve_mate }),
            ]),
            x if x > 5 => {
                assert!(state.dummy_state.contains('🧉'));
                assert!(state.dummy_state.contains('🍵'));
                // emojis are 4 bytes wide
                assert_eq!(state.dummy_state.len(), 8, "{}", state.dummy_state);
                assert_eq!(state.custom_invocations(), 1);
                if x >= 10 { Out::Exit } else { Out::Empty }
            }
            _ => Out::Empty,
        }
    }

    fn on_tick(&mut self, _: &Context, _: &mut State) -> Out<State, Event> {
        Out::Empty
    }

    fn on_device_events(&mut self, _: &Context, _: &mut State, _: &DeviceEvent) -> Out<State, Event> {
        Out::Empty
    }

    fn on_window_events(&mut self, _: &Context, _: &mut State, _: &WindowEvent) -> Out<State, Event> {
        Out::Empty
    }

    fn on_custom_events(&mut self, _: &Context, state: &mut State, event: Event) -> Option<Event> {
        // the event is sent in frame 3
        assert!(matches!(event, Event::Test));
        assert!(state.frame_counter() >= 3);
        state.custom();
        None
    }

    fn on_render(&self) -> Render<'_> {
        Render::None
    }
}

#[test]
fn hooks_run_in_order_and_exit_cleanly() {
    let constructor: FlowConsturctor<State, Event> = Box::new(|_| {
        Box::pin(async move { Box::new(GraphicsElement) as Box<dyn GraphicsFlow<_, _>> })
    });

    if let Err(e) = home_vr::flow::run(vec![constructor]) {
        panic!("{}", e);
    }
}
