use cgmath::{InnerSpace, Vector3};
use jenga_ngin::{
    config::SceneConfig,
    layout::{BlockDimensions, FloorLayout, Orientation, TowerLayout},
};

const EPS: f32 = 1e-4;

fn close(a: f32, b: f32) -> bool {
    (a - b).abs() < EPS
}

fn unit_block() -> BlockDimensions {
    BlockDimensions::new(1.0 / 3.0, 0.2, 1.0).expect("valid block")
}

#[test]
fn three_placements_per_layer() {
    for layers in 1..=40 {
        let layout = TowerLayout::new(layers, BlockDimensions::JENGA);
        assert_eq!(layout.placements().len(), 3 * layers);
        assert_eq!(layout.block_count(), 3 * layers);
    }
}

#[test]
fn even_layers_are_rotated_odd_layers_are_not() {
    for placement in TowerLayout::new(11, unit_block()).placements() {
        let expected = if placement.layer % 2 == 0 {
            Orientation::Rotated
        } else {
            Orientation::Aligned
        };
        assert_eq!(placement.orientation, expected, "layer {}", placement.layer);
    }
}

#[test]
fn layer_centres_rise_evenly() {
    let block = unit_block();
    let placements = TowerLayout::new(18, block).placements();

    for p in &placements {
        let expected = p.layer as f32 * block.y + block.y / 2.0;
        assert!(close(p.position.y, expected), "{} != {}", p.position.y, expected);
    }

    let centres: Vec<f32> = placements.chunks(3).map(|layer| layer[0].position.y).collect();
    for pair in centres.windows(2) {
        assert!(pair[1] > pair[0]);
        assert!(close(pair[1] - pair[0], block.y));
    }
}

#[test]
fn blocks_of_a_layer_share_a_height() {
    for layer in TowerLayout::default().placements().chunks(3) {
        assert!(layer.iter().all(|p| p.position.y == layer[0].position.y));
    }
}

#[test]
fn lateral_offsets_are_one_block_and_a_gap_apart() {
    let block = unit_block();
    let layout = TowerLayout::new(6, block);
    let step = block.x + 0.01;

    for layer in layout.placements().chunks(3) {
        let axis = layer[0].orientation.spread_axis();
        let offsets: Vec<f32> = layer.iter().map(|p| p.position.dot(axis)).collect();
        assert!(close(offsets[0], -step));
        assert!(close(offsets[1], 0.0));
        assert!(close(offsets[2], step));

        // nothing moves across the spread axis
        for p in layer {
            let across = p.position - axis * p.position.dot(axis);
            assert!(close(across.x, 0.0) && close(across.z, 0.0));
        }
    }
}

#[test]
fn three_layer_reference_tower() {
    let placements = TowerLayout::new(3, unit_block()).placements();
    let expected_offsets = [-0.3433, 0.0, 0.3433];

    for (layer, blocks) in placements.chunks(3).enumerate() {
        let centre = [0.1, 0.3, 0.5][layer];
        for (p, offset) in blocks.iter().zip(expected_offsets) {
            assert!(close(p.position.y, centre));
            if layer % 2 == 0 {
                assert!(close(p.position.x, 0.0));
                assert!(close(p.position.z, offset));
            } else {
                assert!(close(p.position.x, offset));
                assert!(close(p.position.z, 0.0));
            }
        }
    }
}

#[test]
fn placements_are_reproducible() {
    let layout = SceneConfig::default().tower.layout();
    assert_eq!(layout.placements(), layout.placements());
    assert_eq!(layout.placements(), TowerLayout::default().placements());
}

#[test]
fn floor_sits_just_above_the_origin_facing_up() {
    let floor = SceneConfig::default().floor.layout();
    assert_eq!(floor.position(), Vector3::new(0.0, 0.01, 0.0));

    let normal = FloorLayout::default().normal();
    assert!(close(normal.x, 0.0));
    assert!(close(normal.y, 1.0));
    assert!(close(normal.z, 0.0));
    assert!(close(normal.magnitude(), 1.0));
}
