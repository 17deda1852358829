use image::GrayImage;

use crate::{grid::PaddedGrid, traits::Skeletonizer};

/// Zhang-Suen parallel thinning
///
/// Each iteration runs two sub-iterations. Every sub-iteration collects its
/// deletable pixels against the current grid and removes them together. The
/// grid is padded with background, so pixels on the mask border thin like
/// any other.
///
/// A batch never removes every pixel of an 8-connected component: the first
/// candidate of such a component in row-major order stays. A 2x2 block thins
/// to its top-left pixel instead of vanishing.
#[derive(Debug, Clone, Copy, Default)]
pub struct ZhangSuenThinning;

impl Skeletonizer for ZhangSuenThinning {
    fn skeletonize(&self, mask: &GrayImage) -> GrayImage {
        skeletonize(mask)
    }
}

pub fn skeletonize(mask: &GrayImage) -> GrayImage {
    let mut grid = PaddedGrid::from_mask(mask);
    loop {
        let first = thinning_pass(&mut grid, SubIteration::First);
        let second = thinning_pass(&mut grid, SubIteration::Second);
        if first == 0 && second == 0 {
            break;
        }
    }
    grid.to_mask()
}

#[derive(Debug, Clone, Copy)]
enum SubIteration {
    First,
    Second,
}

fn thinning_pass(grid: &mut PaddedGrid, step: SubIteration) -> usize {
    let mut to_remove: Vec<(usize, usize)> = grid
        .foreground()
        .filter(|&(r, c)| is_deletable(&grid.neighbors(r, c), step))
        .collect();
    spare_whole_components(grid, &mut to_remove);
    for &(r, c) in &to_remove {
        grid.clear(r, c);
    }
    to_remove.len()
}

/// Keep the first candidate of every component the batch would erase.
fn spare_whole_components(grid: &PaddedGrid, to_remove: &mut Vec<(usize, usize)>) {
    if to_remove.is_empty() {
        return;
    }
    let (labels, components) = grid.component_labels();
    let label_of = |(r, c): (usize, usize)| labels[grid.index(r, c)];

    let mut sizes = vec![0usize; components + 1];
    for cell in grid.foreground() {
        sizes[label_of(cell)] += 1;
    }
    let mut removals = vec![0usize; components + 1];
    for &cell in to_remove.iter() {
        removals[label_of(cell)] += 1;
    }

    let mut spared = vec![false; components + 1];
    to_remove.retain(|&cell| {
        let label = label_of(cell);
        if removals[label] == sizes[label] && !spared[label] {
            spared[label] = true;
            return false;
        }
        true
    });
}

/// `p` is the neighbourhood P2..P9 (N, NE, E, SE, S, SW, W, NW).
fn is_deletable(p: &[u8; 8], step: SubIteration) -> bool {
    let b: u8 = p.iter().sum();
    if !(2..=6).contains(&b) || transitions(p) != 1 {
        return false;
    }
    let (north, east, south, west) = (p[0], p[2], p[4], p[6]);
    match step {
        SubIteration::First => north * east * south == 0 && east * south * west == 0,
        SubIteration::Second => north * east * west == 0 && north * south * west == 0,
    }
}

/// Number of 0 -> 1 transitions walking the neighbourhood once around.
fn transitions(p: &[u8; 8]) -> usize {
    (0..8).filter(|&i| p[i] == 0 && p[(i + 1) % 8] == 1).count()
}
