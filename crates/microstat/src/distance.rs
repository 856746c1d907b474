//! Exact Euclidean distance transform.
//!
//! The squared distance is computed one axis at a time, using the lower
//! envelope of parabolas described by Felzenszwalb & Huttenlocher (2012),
//! "Distance Transforms of Sampled Functions". Along a periodic axis each
//! line is tiled three times, so that the nearest periodic image is always
//! part of the envelope.

use ndarray::{ArrayD, Axis, IxDyn};

use crate::error::Error;
use crate::grid::{FieldValue, Grid};

/// The Euclidean distance from every cell to the nearest background cell.
///
/// Background cells get a distance of zero. If the grid has no background
/// at all, every distance is infinite.
pub fn distance_transform<T: FieldValue>(grid: &Grid<T>) -> Result<Grid<f64>, Error> {
    let shape = grid.shape();
    let initial = grid
        .as_slice()
        .iter()
        .map(|v| if v.is_foreground() { f64::INFINITY } else { 0.0 })
        .collect();
    let mut squared = ArrayD::from_shape_vec(IxDyn(shape), initial)
        .map_err(|_| Error::internal_legacy_adhoc("grid shape is inconsistent with its storage"))?;

    let mut envelope = Envelope::default();
    for (axis, &len) in shape.iter().enumerate() {
        let periodic = grid.is_periodic(axis);
        let n_tiles = if periodic { 3 } else { 1 };
        let mut line = vec![0.0; n_tiles * len];
        let mut out = vec![0.0; n_tiles * len];
        for mut lane in squared.lanes_mut(Axis(axis)) {
            for (k, v) in line.iter_mut().enumerate() {
                *v = lane[k % len];
            }
            envelope.transform(&line, &mut out);
            let offset = if periodic { len } else { 0 };
            for (k, v) in lane.iter_mut().enumerate() {
                *v = out[offset + k];
            }
        }
    }

    let values = squared.iter().map(|v| v.sqrt()).collect();
    Ok(Grid::from_parts(
        values,
        shape.to_vec(),
        grid.periodic().to_vec(),
    ))
}

/// Scratch space for the 1D transform
#[derive(Default)]
struct Envelope {
    // positions of the parabolas forming the lower envelope
    vertices: Vec<usize>,
    // boundaries between consecutive parabolas
    bounds: Vec<f64>,
}

impl Envelope {
    /// `out[q] = min_p (q - p)^2 + f[p]`
    fn transform(&mut self, f: &[f64], out: &mut [f64]) {
        let n = f.len();
        let Some(first) = f.iter().position(|v| v.is_finite()) else {
            out.fill(f64::INFINITY);
            return;
        };
        self.vertices.clear();
        self.vertices.resize(n, 0);
        self.bounds.clear();
        self.bounds.resize(n + 1, 0.0);

        let intersect = |p: usize, q: usize| {
            let (p_f, q_f) = (p as f64, q as f64);
            ((f[q] + q_f * q_f) - (f[p] + p_f * p_f)) / (2.0 * (q_f - p_f))
        };

        let mut k = 0;
        self.vertices[0] = first;
        self.bounds[0] = f64::NEG_INFINITY;
        self.bounds[1] = f64::INFINITY;
        for q in (first + 1)..n {
            if !f[q].is_finite() {
                continue;
            }
            let mut s = intersect(self.vertices[k], q);
            while s <= self.bounds[k] {
                k -= 1;
                s = intersect(self.vertices[k], q);
            }
            k += 1;
            self.vertices[k] = q;
            self.bounds[k] = s;
            self.bounds[k + 1] = f64::INFINITY;
        }

        k = 0;
        for (q, o) in out.iter_mut().enumerate() {
            while self.bounds[k + 1] < q as f64 {
                k += 1;
            }
            let p = self.vertices[k];
            let d = q as f64 - p as f64;
            *o = d * d + f[p];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_dimensional() {
        let grid = Grid::from_shape_vec(&[5], vec![1, 1, 1, 0, 1], false).unwrap();
        let dist = distance_transform(&grid).unwrap();
        assert_eq!(dist.as_slice(), &[3.0, 2.0, 1.0, 0.0, 1.0]);

        let dist = distance_transform(&grid.with_periodic(true).unwrap()).unwrap();
        assert_eq!(dist.as_slice(), &[2.0, 2.0, 1.0, 0.0, 1.0]);
    }

    #[test]
    fn two_dimensional() {
        #[rustfmt::skip]
        let values = vec![
            true, true,  true,
            true, false, true,
            true, true,  true,
        ];
        let grid = Grid::from_shape_vec(&[3, 3], values, false).unwrap();
        let dist = distance_transform(&grid).unwrap();
        assert_eq!(dist.get(&[1, 1]), Some(0.0));
        assert_eq!(dist.get(&[0, 1]), Some(1.0));
        assert_eq!(dist.get(&[2, 2]), Some(2.0_f64.sqrt()));
    }

    #[test]
    fn no_background() {
        let grid = Grid::filled(&[2, 3], true, true).unwrap();
        let dist = distance_transform(&grid).unwrap();
        assert!(dist.as_slice().iter().all(|d| d.is_infinite()));
    }
}
