#![cfg(test)]

use super::grid::Grid2D;
use super::modes::ModeLayout;

#[test]
fn triangular_index_is_m_major_and_contiguous() {
    let modes = ModeLayout::triangular(3, 2);
    let expected = [(0, 0), (1, 0), (2, 0), (3, 0), (1, 1), (2, 1), (3, 1), (2, 2), (3, 2)];
    assert_eq!(modes.len(), expected.len());
    for (offset, &(degree, order)) in expected.iter().enumerate() {
        assert_eq!(modes.index(degree, order), offset);
        assert_eq!(modes.modes_at(offset), (degree, order));
    }
}

#[test]
fn rectangular_index_matches_grid_row_major() {
    let modes = ModeLayout::rectangular(5, 3);
    let grid = Grid2D::new(5, 3, 1.0, 1.0);
    for degree in 0..3 {
        for order in 0..5 {
            assert_eq!(modes.index(degree, order), grid.idx(degree, order));
            assert_eq!(modes.modes_at(grid.idx(degree, order)), (degree, order));
        }
    }
    assert_eq!(modes.extent(), grid.extent());
}

#[test]
fn index_is_a_bijection_onto_flat_range() {
    for modes in [
        ModeLayout::triangular(9, 9),
        ModeLayout::triangular(12, 4),
        ModeLayout::rectangular(7, 4),
    ] {
        let mut seen = vec![false; modes.len()];
        for order in 0..=modes.max_order() {
            for degree in modes.block_degrees(order) {
                let idx = modes.index(degree, order);
                assert!(!seen[idx], "{modes:?}: offset {idx} hit twice");
                seen[idx] = true;
            }
        }
        assert!(seen.iter().all(|hit| *hit), "{modes:?}: offsets not covered");
    }
}

#[test]
fn block_offsets_walk_one_order() {
    let tri = ModeLayout::triangular(4, 3);
    assert_eq!(tri.block_offsets(2).collect::<Vec<_>>(), vec![9, 10, 11]);
    assert_eq!(tri.block_len(2), 3);

    let rect = ModeLayout::rectangular(4, 3);
    assert_eq!(rect.block_offsets(1).collect::<Vec<_>>(), vec![1, 5, 9]);
    assert_eq!(rect.block_len(1), 3);
}

#[test]
fn contains_respects_block_start() {
    let modes = ModeLayout::triangular(5, 3);
    assert!(modes.contains(3, 3));
    assert!(!modes.contains(2, 3));
    assert!(!modes.contains(4, 4));
    assert!(!modes.contains(6, 0));
}

#[test]
#[should_panic(expected = "m_max")]
fn triangular_rejects_order_above_degree() {
    let _ = ModeLayout::triangular(2, 3);
}

#[test]
fn layout_deserializes_from_tagged_table() {
    let modes: ModeLayout = toml::from_str("layout = \"triangular\"\nn_max = 8\nm_max = 4\n").unwrap();
    assert_eq!(modes, ModeLayout::triangular(8, 4));
    let modes: ModeLayout = toml::from_str("layout = \"rectangular\"\norders = 4\ndegrees = 2\n").unwrap();
    assert_eq!(modes, ModeLayout::rectangular(4, 2));
}
