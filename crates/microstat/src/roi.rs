use microstat_nostd_internal::{check_shape, n_elements, next_index, pad_width};
use ndarray::{ArrayD, IxDyn};

use crate::error::Error;

/// The region of interest: the bounded set of lags tracked by an ensemble.
///
/// Lags are laid out in an array with the ROI's shape. The zero lag sits at
/// the center of the array, [`Roi::center`]. Along an axis of length `n`,
/// the array covers the lags `-pad[0]..=pad[1]`, where `pad` is given by
/// [`Roi::pad`]. For odd `n` this is symmetric. For even `n`, the extra lag
/// is positive.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Roi {
    shape: Vec<usize>,
    pad: Vec<[usize; 2]>,
}

impl Roi {
    pub fn new(shape: &[usize]) -> Result<Self, Error> {
        check_shape(shape).map_err(Error::internal_legacy_adhoc)?;
        Ok(Self {
            shape: shape.to_vec(),
            pad: shape.iter().map(|&len| pad_width(len)).collect(),
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    pub fn n_lags(&self) -> usize {
        n_elements(&self.shape)
    }

    /// the number of lags below and above zero along `axis`
    pub fn pad(&self, axis: usize) -> [usize; 2] {
        self.pad[axis]
    }

    /// the index of the zero lag
    pub fn center(&self) -> Vec<usize> {
        self.pad.iter().map(|p| p[0]).collect()
    }

    /// the lag stored at `index`
    pub fn lag_of(&self, index: &[usize]) -> Vec<isize> {
        index
            .iter()
            .zip(&self.pad)
            .map(|(&i, p)| i as isize - p[0] as isize)
            .collect()
    }

    /// the index storing `lag`, or `None` if the lag lies outside the ROI
    pub fn index_of(&self, lag: &[isize]) -> Option<Vec<usize>> {
        if lag.len() != self.ndim() {
            return None;
        }
        lag.iter()
            .zip(&self.pad)
            .zip(&self.shape)
            .map(|((&l, p), &len)| {
                let i = l + p[0] as isize;
                (0..len as isize).contains(&i).then_some(i as usize)
            })
            .collect()
    }

    /// the linear (row-major) index storing `lag`
    pub(crate) fn linear_index_of(&self, lag: &[isize]) -> Option<usize> {
        let index = self.index_of(lag)?;
        Some(
            index
                .iter()
                .zip(&self.shape)
                .fold(0, |acc, (&i, &len)| acc * len + i),
        )
    }

    /// every lag of the ROI (in row-major order of the lag array) flattened
    /// into a `[n_lags, ndim]` table
    pub(crate) fn lag_table(&self) -> Vec<isize> {
        let ndim = self.ndim();
        let mut out = Vec::with_capacity(self.n_lags() * ndim);
        let mut idx = vec![0_isize; ndim];
        loop {
            for (&i, p) in idx.iter().zip(&self.pad) {
                out.push(i - p[0] as isize);
            }
            if !next_index(&mut idx, &self.shape) {
                break;
            }
        }
        out
    }

    /// every lag of the ROI, in row-major order of the lag array
    pub fn lags(&self) -> Vec<Vec<isize>> {
        self.lag_table()
            .chunks_exact(self.ndim())
            .map(|lag| lag.to_vec())
            .collect()
    }

    /// The lags on the boundary of the ROI.
    ///
    /// These are the end-points of the straight pixel paths used by the
    /// path-based statistics. A lag is on the boundary if, along any axis
    /// longer than one element, it sits on the first or last element.
    pub fn stamp(&self) -> Vec<Vec<isize>> {
        let mut out = Vec::new();
        let mut idx = vec![0_isize; self.ndim()];
        loop {
            let on_boundary = idx
                .iter()
                .zip(&self.shape)
                .any(|(&i, &len)| len > 1 && (i == 0 || i == len as isize - 1));
            if on_boundary {
                let index: Vec<usize> = idx.iter().map(|&i| i as usize).collect();
                out.push(self.lag_of(&index));
            }
            if !next_index(&mut idx, &self.shape) {
                break;
            }
        }
        out
    }

    /// the Euclidean length of each lag
    pub fn distance(&self) -> ArrayD<f64> {
        self.distance_scaled_impl(None, None)
    }

    /// the (signed) component of each lag along `axis`
    pub fn distance_along(&self, axis: usize) -> Result<ArrayD<f64>, Error> {
        self.check_axis(axis)?;
        Ok(self.distance_scaled_impl(None, Some(axis)))
    }

    /// the Euclidean length of each lag, where `h` holds the cell width
    /// along each axis
    pub fn distance_scaled(&self, h: &[f64]) -> Result<ArrayD<f64>, Error> {
        self.check_widths(h)?;
        Ok(self.distance_scaled_impl(Some(h), None))
    }

    /// the (signed) component of each lag along `axis`, where `h` holds the
    /// cell width along each axis
    pub fn distance_scaled_along(&self, h: &[f64], axis: usize) -> Result<ArrayD<f64>, Error> {
        self.check_widths(h)?;
        self.check_axis(axis)?;
        Ok(self.distance_scaled_impl(Some(h), Some(axis)))
    }

    fn check_axis(&self, axis: usize) -> Result<(), Error> {
        if axis >= self.ndim() {
            Err(Error::configuration(format!(
                "axis {axis} is out of bounds for a {}D region of interest",
                self.ndim()
            )))
        } else {
            Ok(())
        }
    }

    fn check_widths(&self, h: &[f64]) -> Result<(), Error> {
        if h.len() != self.ndim() {
            Err(Error::rank_mismatch("cell widths", self.ndim(), h.len()))
        } else {
            Ok(())
        }
    }

    fn distance_scaled_impl(&self, h: Option<&[f64]>, axis: Option<usize>) -> ArrayD<f64> {
        ArrayD::from_shape_fn(IxDyn(&self.shape), |index| {
            let component = |k: usize| {
                let lag = index[k] as isize - self.pad[k][0] as isize;
                lag as f64 * h.map_or(1.0, |h| h[k])
            };
            match axis {
                Some(k) => component(k),
                None => (0..self.ndim())
                    .map(|k| component(k) * component(k))
                    .sum::<f64>()
                    .sqrt(),
            }
        })
    }
}
