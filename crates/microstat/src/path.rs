//! Rasterization of straight lines into sequences of grid cells.
//!
//! Three flavors are available (see [`PathMode`]). All of them start at
//! `from`, end at `to`, and work for any number of dimensions.

use std::str::FromStr;

use ndarray::Array2;

use crate::error::Error;

/// How a straight line is converted into cells
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PathMode {
    /// Bresenham's line algorithm: exactly one cell per step along the
    /// dominant axis
    #[default]
    Bresenham,
    /// every cell that the line actually passes through. When the line
    /// crosses several faces at once (e.g. through a corner), the cells are
    /// advanced simultaneously
    Actual,
    /// like [`PathMode::Actual`], but each face crossing is recorded as a
    /// separate cell, so consecutive cells always share a face
    Full,
}

impl FromStr for PathMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        match s.to_ascii_lowercase().as_str() {
            "bresenham" => Ok(PathMode::Bresenham),
            "actual" => Ok(PathMode::Actual),
            "full" => Ok(PathMode::Full),
            _ => Err(Error::configuration(format!(
                "{s} is not a path mode. Choices include: [\"bresenham\", \"actual\", \"full\"]"
            ))),
        }
    }
}

/// The cells on the straight line between `from` and `to` (both included).
///
/// The output has the shape `[n_cells, ndim]`.
pub fn path(from: &[isize], to: &[isize], mode: PathMode) -> Result<Array2<isize>, Error> {
    if from.len() != to.len() {
        return Err(Error::rank_mismatch("end-point", from.len(), to.len()));
    } else if from.is_empty() {
        return Err(Error::configuration("a path needs at least 1 dimension"));
    }
    let ndim = from.len();
    let cells = path_table(from, to, mode);
    let n_cells = cells.len() / ndim;
    Array2::from_shape_vec((n_cells, ndim), cells)
        .map_err(|_| Error::internal_legacy_adhoc("path cells don't fill whole rows"))
}

/// `path` flattened into a `[n_cells, ndim]` table (used internally)
pub(crate) fn path_table(from: &[isize], to: &[isize], mode: PathMode) -> Vec<isize> {
    if from == to {
        from.to_vec()
    } else {
        match mode {
            PathMode::Bresenham => bresenham(from, to),
            PathMode::Actual => traverse(from, to, false),
            PathMode::Full => traverse(from, to, true),
        }
    }
}

fn bresenham(from: &[isize], to: &[isize]) -> Vec<isize> {
    let ndim = from.len();
    // twice the absolute extent and the direction along each axis
    let twice_extent: Vec<isize> = from.iter().zip(to).map(|(a, b)| 2 * (b - a).abs()).collect();
    let step: Vec<isize> = from.iter().zip(to).map(|(a, b)| (b - a).signum()).collect();

    // the first axis with the largest extent dominates
    let mut dominant = 0;
    for axis in 1..ndim {
        if twice_extent[axis] > twice_extent[dominant] {
            dominant = axis;
        }
    }

    let mut err: Vec<isize> = twice_extent
        .iter()
        .map(|&e| e - twice_extent[dominant] / 2)
        .collect();
    let mut x = from.to_vec();
    let mut out = Vec::with_capacity((twice_extent[dominant] as usize / 2 + 1) * ndim);
    loop {
        out.extend_from_slice(&x);
        if x[dominant] == to[dominant] {
            return out;
        }
        for axis in (0..ndim).filter(|&a| a != dominant) {
            if err[axis] >= 0 {
                x[axis] += step[axis];
                err[axis] -= twice_extent[dominant];
            }
        }
        x[dominant] += step[dominant];
        for axis in (0..ndim).filter(|&a| a != dominant) {
            err[axis] += twice_extent[axis];
        }
    }
}

/// Walk along the line from cell center to cell center, crossing one (or
/// several, when they coincide) cell faces at a time.
fn traverse(from: &[isize], to: &[isize], record_each_face: bool) -> Vec<isize> {
    const TIE_TOLERANCE: f64 = 1e-6;

    let ndim = from.len();
    let slope: Vec<f64> = from.iter().zip(to).map(|(a, b)| (b - a) as f64).collect();
    let step: Vec<isize> = from.iter().zip(to).map(|(a, b)| (b - a).signum()).collect();
    // only axes with non-zero slope ever cross a face
    let active: Vec<usize> = (0..ndim).filter(|&a| step[a] != 0).collect();
    // the line parameter of the next face crossing along each axis
    let mut next_face: Vec<f64> = (0..ndim)
        .map(|a| {
            if step[a] != 0 {
                0.5 / slope[a].abs()
            } else {
                f64::INFINITY
            }
        })
        .collect();

    let mut cell = from.to_vec();
    let mut out = from.to_vec();
    // every crossing moves at least one axis one step closer to `to`
    let max_crossings: usize = from.iter().zip(to).map(|(a, b)| (b - a).unsigned_abs()).sum();
    for _ in 0..max_crossings {
        let t_min = active
            .iter()
            .map(|&a| next_face[a])
            .fold(f64::INFINITY, f64::min);
        for &axis in active.iter() {
            if (next_face[axis] - t_min).abs() < TIE_TOLERANCE {
                cell[axis] += step[axis];
                next_face[axis] += 1.0 / slope[axis].abs();
                if record_each_face {
                    out.extend_from_slice(&cell);
                }
            }
        }
        if !record_each_face {
            out.extend_from_slice(&cell);
        }
        if cell == to {
            break;
        }
    }
    out
}
