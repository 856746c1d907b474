use std::collections::BTreeSet;

use ndarray::{ArrayViewD, Dimension};

use crate::error::Error;

/// The set of offsets that make two cells neighbors.
///
/// Offsets are stored as a flattened `[n_offsets, ndim]` table. A kernel
/// never includes the zero offset and always holds `-d` whenever it holds `d`
/// (adjacency must be undirected).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConnectivityKernel {
    ndim: usize,
    offsets: Vec<isize>,
}

impl ConnectivityKernel {
    /// Build a kernel from an explicit list of offsets.
    ///
    /// Duplicate offsets are collapsed.
    pub fn new<I, O>(ndim: usize, offsets: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = O>,
        O: AsRef<[isize]>,
    {
        if ndim == 0 {
            return Err(Error::configuration("a kernel needs at least 1 dimension"));
        }
        let mut unique = BTreeSet::new();
        for offset in offsets {
            let offset = offset.as_ref();
            if offset.len() != ndim {
                return Err(Error::rank_mismatch("kernel offset", ndim, offset.len()));
            } else if offset.iter().all(|&c| c == 0) {
                return Err(Error::configuration("kernel offsets can't hold the zero offset"));
            }
            unique.insert(offset.to_vec());
        }
        if unique.is_empty() {
            return Err(Error::configuration("a kernel needs at least 1 offset"));
        }
        for offset in unique.iter() {
            let mirrored: Vec<isize> = offset.iter().map(|c| -c).collect();
            if !unique.contains(&mirrored) {
                return Err(Error::configuration(format!(
                    "kernel offsets must be symmetric: {offset:?} is present but \
                     {mirrored:?} is not"
                )));
            }
        }
        Ok(Self {
            ndim,
            offsets: unique.into_iter().flatten().collect(),
        })
    }

    /// Axis-aligned nearest neighbors (von Neumann connectivity)
    pub fn nearest(ndim: usize) -> Result<Self, Error> {
        let mut offsets = Vec::with_capacity(2 * ndim);
        for axis in 0..ndim {
            for step in [-1, 1] {
                let mut offset = vec![0_isize; ndim];
                offset[axis] = step;
                offsets.push(offset);
            }
        }
        Self::new(ndim, offsets)
    }

    /// Every cell in the surrounding `3 × 3 × ...` block, diagonals included
    /// (Moore connectivity)
    pub fn full(ndim: usize) -> Result<Self, Error> {
        if ndim == 0 {
            return Err(Error::configuration("a kernel needs at least 1 dimension"));
        }
        let n_block = u32::try_from(ndim)
            .ok()
            .and_then(|exp| 3_usize.checked_pow(exp))
            .ok_or_else(|| {
                Error::configuration(format!("a full kernel with {ndim} dimensions is too large"))
            })?;
        let mut offsets = Vec::with_capacity(n_block - 1);
        for i in 0..n_block {
            let mut rem = i;
            let mut offset = vec![0_isize; ndim];
            for c in offset.iter_mut().rev() {
                *c = (rem % 3) as isize - 1;
                rem /= 3;
            }
            if offset.iter().any(|&c| c != 0) {
                offsets.push(offset);
            }
        }
        Self::new(ndim, offsets)
    }

    /// Build a kernel from a stencil, where every `true` element marks a
    /// neighbor relative to the central element. Each axis of the stencil
    /// must have an odd length. The central element is ignored.
    pub fn from_stencil(stencil: ArrayViewD<bool>) -> Result<Self, Error> {
        let shape = stencil.shape();
        if shape.is_empty() || shape.iter().any(|len| len % 2 == 0) {
            return Err(Error::configuration(format!(
                "each axis of a stencil must have odd length, not {shape:?}"
            )));
        }
        let mut offsets = Vec::new();
        for (idx, &flag) in stencil.indexed_iter() {
            if !flag {
                continue;
            }
            let offset: Vec<isize> = idx
                .slice()
                .iter()
                .zip(shape)
                .map(|(&i, &len)| i as isize - (len / 2) as isize)
                .collect();
            if offset.iter().any(|&c| c != 0) {
                offsets.push(offset);
            }
        }
        Self::new(shape.len(), offsets)
    }

    pub fn ndim(&self) -> usize {
        self.ndim
    }

    pub fn n_offsets(&self) -> usize {
        self.offsets.len() / self.ndim
    }

    pub fn offsets(&self) -> impl Iterator<Item = &[isize]> {
        self.offsets.chunks_exact(self.ndim)
    }

    /// the largest absolute offset component
    pub fn radius(&self) -> usize {
        self.offsets.iter().map(|c| c.unsigned_abs()).max().unwrap_or(0)
    }
}
