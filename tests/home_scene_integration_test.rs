#![cfg(feature = "integration-tests")]

use home_vr::{
    config::HomeConfig,
    scene::{HomeEvent, HomeScene},
};

use crate::common::test_utils::ExitAfter;

mod common;

/// Runs the real scene on its procedural props only. The camera starts at the
/// camera root far behind the pawn and must have caught up with its eye point
/// by the time the test exits.
#[test]
fn camera_follows_the_pawn_on_fallback_props() {
    let mut config = HomeConfig::default();
    for prop in config.layout.props.iter_mut() {
        prop.model = None;
    }
    let eye_z = config.layout.pawn_start.z;
    let eye_y = config.layout.pawn_start.y + config.controller.y_offset;

    let exit = ExitAfter::<(), HomeEvent>::new(60, move |ctx, frame| {
        let camera = ctx.camera.camera.position;
        assert!(camera.z < eye_z + 0.5, "camera overshot the pawn in frame {frame}");
        if frame == 60 {
            assert!((camera.z - eye_z).abs() < 0.1, "camera z {} in frame {frame}", camera.z);
            assert!((camera.y - eye_y).abs() < 0.1, "camera y {} in frame {frame}", camera.y);
        }
    });

    if let Err(e) = home_vr::flow::run(vec![HomeScene::constructor(config), exit.constructor()]) {
        panic!("{}", e);
    }
}
