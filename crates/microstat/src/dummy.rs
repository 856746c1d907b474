//! Synthetic binary fields, mostly useful for testing and demonstrations.

use std::f64::consts::PI;

use microstat_nostd_internal::{check_shape, n_elements, next_index, ravel_index};
use rand::Rng;
use rand::distr::{Distribution, Uniform};

use crate::error::Error;
use crate::grid::{Grid, Periodic};

/// A (hyper)sphere of cells
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Circle {
    pub center: Vec<isize>,
    pub radius: isize,
}

impl Circle {
    pub fn new(center: &[isize], radius: isize) -> Self {
        Self {
            center: center.to_vec(),
            radius,
        }
    }
}

/// Draw `circles` into an empty field.
///
/// A cell at offset `d` from a circle's center is set if
/// `ceil(|d|) < radius`. Along periodic axes, circles wrap around the
/// boundary. Otherwise, the parts outside of the field are cut off.
pub fn dummy_circles(
    shape: &[usize],
    circles: &[Circle],
    periodic: impl Into<Periodic>,
) -> Result<Grid<bool>, Error> {
    check_shape(shape).map_err(Error::internal_legacy_adhoc)?;
    let ndim = shape.len();
    let periodic: Periodic = periodic.into();
    let periodic = periodic.flags(ndim)?;
    if let Some(circle) = circles.iter().find(|c| c.center.len() != ndim) {
        return Err(Error::rank_mismatch("circle center", ndim, circle.center.len()));
    }

    let mut values = vec![false; n_elements(shape)];
    let mut offset = vec![0_isize; ndim];
    let mut cell = vec![0_isize; ndim];
    for circle in circles.iter().filter(|c| c.radius > 0) {
        let r = circle.radius;
        offset.fill(-r);
        // odometer over the bounding box [-r, r]^ndim
        'bbox: loop {
            let dist_sq: isize = offset.iter().map(|d| d * d).sum();
            if ((dist_sq as f64).sqrt().ceil() as isize) < r {
                for ((c, &x), &d) in cell.iter_mut().zip(&circle.center).zip(&offset) {
                    *c = x + d;
                }
                if let Some(i) = ravel_index(&cell, shape, &periodic) {
                    values[i] = true;
                }
            }
            for axis in (0..ndim).rev() {
                if offset[axis] < r {
                    offset[axis] += 1;
                    continue 'bbox;
                }
                offset[axis] = -r;
            }
            break;
        }
    }
    Ok(Grid::from_parts(values, shape.to_vec(), periodic))
}

/// Draw randomly perturbed circles laid out on a regular grid.
///
/// Roughly 5% of the cells along each axis host a circle center. Each
/// center is shifted by up to half the spacing between centers, and each
/// radius is scaled by a random factor in `[0.1, 2.1)`.
pub fn random_circles<R: Rng>(
    shape: &[usize],
    periodic: impl Into<Periodic>,
    rng: &mut R,
) -> Result<Grid<bool>, Error> {
    check_shape(shape).map_err(Error::internal_legacy_adhoc)?;
    let ndim = shape.len();

    let n_per_axis: Vec<usize> = shape
        .iter()
        .map(|&len| ((0.05 * len as f64) as usize).max(1))
        .collect();
    let n_circles = n_elements(&n_per_axis);
    let cells_per_circle = n_elements(shape) as f64 / n_circles as f64;
    let radius = (0.3 * cells_per_circle / PI).powf(1.0 / ndim as f64);

    let shifts = n_per_axis
        .iter()
        .zip(shape)
        .map(|(&n, &len)| {
            let max_shift = ((0.5 * len as f64 / n as f64) as i64 - 1).max(0);
            Uniform::new_inclusive(-max_shift, max_shift)
                .map_err(|_| Error::internal_legacy_adhoc("invalid shift range"))
        })
        .collect::<Result<Vec<_>, Error>>()?;
    let scale = Uniform::new(0.1, 2.1)
        .map_err(|_| Error::internal_legacy_adhoc("invalid radius scale range"))?;

    let mut circles = Vec::with_capacity(n_circles);
    let mut idx = vec![0_isize; ndim];
    loop {
        let center = (0..ndim)
            .map(|axis| {
                let regular = idx[axis] as usize * shape[axis] / n_per_axis[axis];
                regular as isize + shifts[axis].sample(rng) as isize
            })
            .collect();
        let r = (scale.sample(rng) * radius) as isize;
        circles.push(Circle { center, radius: r });
        if !next_index(&mut idx, &n_per_axis) {
            break;
        }
    }
    dummy_circles(shape, &circles, periodic)
}

/// A field where each cell is independently set with probability
/// `fraction`
pub fn random_field<R: Rng>(
    shape: &[usize],
    fraction: f64,
    periodic: impl Into<Periodic>,
    rng: &mut R,
) -> Result<Grid<bool>, Error> {
    if !(0.0..=1.0).contains(&fraction) {
        return Err(Error::configuration(format!(
            "the volume fraction must lie in [0, 1], not {fraction}"
        )));
    }
    let n = n_elements(shape);
    let values = (0..n).map(|_| rng.random::<f64>() < fraction).collect();
    Grid::from_shape_vec(shape, values, periodic)
}
