// the reason this is named mod.rs has to do with some complexities of how
// testing is handled
//
// we are following the advice of the rust book
// https://doc.rust-lang.org/book/ch11-03-test-organization.html#submodules-in-integration-tests

#![allow(dead_code)]

use std::collections::VecDeque;

use microstat::{Grid, Periodic};
use rand::distr::{Distribution, Uniform};
use rand_xoshiro::Xoshiro256PlusPlus;
use rand_xoshiro::rand_core::SeedableRng;

// based on numpy!
// https://numpy.org/doc/stable/reference/generated/numpy.isclose.html
pub fn isclose(actual: f64, ref_val: f64, rtol: f64, atol: f64) -> bool {
    let actual_nan = actual.is_nan();
    let ref_nan = ref_val.is_nan();
    if actual_nan || ref_nan {
        actual_nan && ref_nan
    } else {
        (actual - ref_val).abs() <= (atol + rtol * ref_val.abs())
    }
}

/// a binary grid where each cell is set with probability `fraction`
pub fn random_binary(
    shape: &[usize],
    fraction: f64,
    periodic: impl Into<Periodic>,
    seed: u64,
) -> Grid<bool> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let distribution = Uniform::new(0.0, 1.0).unwrap();
    let n: usize = shape.iter().product();
    let values = (0..n).map(|_| distribution.sample(&mut rng) < fraction).collect();
    Grid::from_shape_vec(shape, values, periodic).unwrap()
}

/// a scalar grid with values drawn uniformly from `[-1, 1]`
pub fn random_scalar(shape: &[usize], periodic: impl Into<Periodic>, seed: u64) -> Grid<f64> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let distribution = Uniform::new_inclusive(-1.0, 1.0).unwrap();
    let n: usize = shape.iter().product();
    let values = (0..n).map(|_| distribution.sample(&mut rng)).collect();
    Grid::from_shape_vec(shape, values, periodic).unwrap()
}

/// Brute-force labeling of 2D grids with nearest-neighbor connectivity.
///
/// Returns a component id per cell (`0` for background). The ids follow
/// the order in which the first cell of each component is visited, i.e.
/// scan order.
pub fn bfs_labels_2d(grid: &Grid<bool>) -> Vec<usize> {
    let shape = grid.shape();
    let (ny, nx) = (shape[0] as isize, shape[1] as isize);
    let mut out = vec![0; grid.len()];
    let mut next_label = 1;
    for start in 0..grid.len() {
        if !grid.get_linear(start) || out[start] != 0 {
            continue;
        }
        out[start] = next_label;
        let mut queue = VecDeque::from([start]);
        while let Some(cur) = queue.pop_front() {
            let (y, x) = ((cur as isize) / nx, (cur as isize) % nx);
            for (dy, dx) in [(-1, 0), (1, 0), (0, -1), (0, 1)] {
                let (mut ny_, mut nx_) = (y + dy, x + dx);
                if grid.is_periodic(0) {
                    ny_ = ny_.rem_euclid(ny);
                }
                if grid.is_periodic(1) {
                    nx_ = nx_.rem_euclid(nx);
                }
                if !(0..ny).contains(&ny_) || !(0..nx).contains(&nx_) {
                    continue;
                }
                let other = (ny_ * nx + nx_) as usize;
                if grid.get_linear(other) && out[other] == 0 {
                    out[other] = next_label;
                    queue.push_back(other);
                }
            }
        }
        next_label += 1;
    }
    out
}
