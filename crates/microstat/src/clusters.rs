//! Connected-component labeling of N-dimensional grids.
//!
//! # Algorithm
//!
//! [`ClusterLabeler::label`] makes a single pass over the cells of a grid.
//! Every foreground cell is merged (in a disjoint-set forest indexed by
//! linear cell index) with each of its foreground neighbors. The neighbors
//! are enumerated with the connectivity kernel, wrapping every periodic axis.
//! This is the only place where boundaries matter: the forest itself doesn't
//! know anything about the grid. Because kernels are symmetric, every
//! adjacent pair is seen from both of its cells, so we only need to merge a
//! cell with neighbors that come earlier in scan order.
//!
//! Afterwards, the representative of each set is mapped onto the dense range
//! `1..=K`. Labels are handed out in scan order of the first cell of each
//! cluster, which makes the output a deterministic function of the input.
//! Background cells carry the label `0`.
//!
//! # Periodic centers
//!
//! A cluster that crosses a periodic boundary shows up in (at least) two
//! disjoint pieces in index space, so a naive average of its coordinates
//! lands somewhere between the pieces. We handle periodic axes in two steps:
//! 1. Each coordinate `x` on an axis of length `n` is mapped onto the angle
//!    `2πx/n`. The (weighted) circular mean of these angles gives an anchor
//!    that lies inside the bulk of the cluster.
//! 2. Each coordinate is shifted by a multiple of `n` so that it lies within
//!    half a period of the anchor (the minimum image). The weighted
//!    arithmetic mean of the shifted coordinates is wrapped back into
//!    `[0, n)`.
//!
//! For compact clusters this gives the exact centroid of the unwrapped
//! cluster (a plain circular mean would be biased towards the anchor). If the
//! angles cancel out (e.g. a cluster that spans the entire axis) there is no
//! meaningful anchor and we fall back to the arithmetic mean of the raw
//! coordinates. Bounded axes always use the arithmetic mean.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::f64::consts::TAU;

use microstat_nostd_internal::{DisjointSets, next_index, ravel_index};
use tracing::debug;

use crate::error::Error;
use crate::grid::{FieldValue, Grid};
use crate::kernel::ConnectivityKernel;

/// Assigns connected-component labels under a fixed connectivity kernel
#[derive(Clone, Debug)]
pub struct ClusterLabeler {
    kernel: ConnectivityKernel,
}

impl ClusterLabeler {
    pub fn new(kernel: ConnectivityKernel) -> Self {
        Self { kernel }
    }

    /// a labeler using nearest-neighbor (von Neumann) connectivity
    pub fn nearest(ndim: usize) -> Result<Self, Error> {
        Ok(Self::new(ConnectivityKernel::nearest(ndim)?))
    }

    pub fn kernel(&self) -> &ConnectivityKernel {
        &self.kernel
    }

    /// Label the foreground cells of `grid`.
    ///
    /// An all-background grid produces a label field without clusters.
    pub fn label<T: FieldValue>(&self, grid: &Grid<T>) -> Result<LabelField, Error> {
        let ndim = grid.ndim();
        if self.kernel.ndim() != ndim {
            return Err(Error::rank_mismatch(
                "connectivity kernel",
                ndim,
                self.kernel.ndim(),
            ));
        }
        let shape = grid.shape();
        let periodic = grid.periodic();
        let n_cells = grid.len();

        let mut parent = vec![0_usize; n_cells];
        let mut rank = vec![0_u8; n_cells];
        let mut sets =
            DisjointSets::new(&mut parent, &mut rank).map_err(Error::internal_legacy_adhoc)?;

        let mut idx = vec![0_isize; ndim];
        let mut neighbor = vec![0_isize; ndim];
        for linear in 0..n_cells {
            if grid.get_linear(linear).is_foreground() {
                for offset in self.kernel.offsets() {
                    for ((nb, &i), &o) in neighbor.iter_mut().zip(&idx).zip(offset) {
                        *nb = i + o;
                    }
                    if let Some(other) = ravel_index(&neighbor, shape, periodic) {
                        if other < linear && grid.get_linear(other).is_foreground() {
                            sets.union(linear, other);
                        }
                    }
                }
            }
            next_index(&mut idx, shape);
        }

        // compact the representatives into 1..=n_labels
        let mut root_label = vec![0_usize; n_cells];
        let mut labels = vec![0_usize; n_cells];
        let mut n_labels = 0;
        for (linear, label) in labels.iter_mut().enumerate() {
            if grid.get_linear(linear).is_foreground() {
                let root = sets.find(linear);
                if root_label[root] == 0 {
                    n_labels += 1;
                    root_label[root] = n_labels;
                }
                *label = root_label[root];
            }
        }
        debug!(n_clusters = n_labels, n_cells, "labeled clusters");

        Ok(LabelField::from_grid(Grid::from_parts(
            labels,
            shape.to_vec(),
            periodic.to_vec(),
        )))
    }
}

/// Label the foreground cells of `grid` using `kernel`
pub fn label<T: FieldValue>(
    grid: &Grid<T>,
    kernel: &ConnectivityKernel,
) -> Result<LabelField, Error> {
    ClusterLabeler::new(kernel.clone()).label(grid)
}

/// Label the foreground cells of `grid` using nearest-neighbor connectivity
pub fn clusters<T: FieldValue>(grid: &Grid<T>) -> Result<LabelField, Error> {
    ClusterLabeler::nearest(grid.ndim())?.label(grid)
}

/// Criteria for [`LabelField::reorder_by`]. Ties are broken by the current
/// label.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LabelOrder {
    /// largest cluster gets label 1
    SizeDescending,
    /// smallest cluster gets label 1
    SizeAscending,
    /// labels follow the scan order of the first cell of each cluster
    ScanOrder,
}

/// A grid of cluster labels, where `0` denotes the background.
///
/// The label field has the same shape and boundary semantics as the grid it
/// was computed from.
#[derive(Clone, Debug, PartialEq)]
pub struct LabelField {
    grid: Grid<usize>,
}

impl LabelField {
    /// wrap an existing grid of labels
    pub fn from_grid(grid: Grid<usize>) -> Self {
        Self { grid }
    }

    pub fn as_grid(&self) -> &Grid<usize> {
        &self.grid
    }

    pub fn into_grid(self) -> Grid<usize> {
        self.grid
    }

    pub fn shape(&self) -> &[usize] {
        self.grid.shape()
    }

    pub fn periodic(&self) -> &[bool] {
        self.grid.periodic()
    }

    pub fn get(&self, idx: &[isize]) -> Option<usize> {
        self.grid.get(idx)
    }

    /// the (non-background) labels that are present
    pub fn labels(&self) -> BTreeSet<usize> {
        self.grid
            .as_slice()
            .iter()
            .copied()
            .filter(|&l| l != 0)
            .collect()
    }

    pub fn n_clusters(&self) -> usize {
        self.labels().len()
    }

    /// the number of cells carrying each label (the background is excluded)
    pub fn sizes(&self) -> BTreeMap<usize, usize> {
        let mut out = BTreeMap::new();
        for &l in self.grid.as_slice().iter().filter(|&&l| l != 0) {
            *out.entry(l).or_insert(0) += 1;
        }
        out
    }

    /// the geometric center of each cluster (see the module documentation
    /// for how periodic axes are treated)
    pub fn centers(&self) -> BTreeMap<usize, Vec<f64>> {
        self.weighted_centers(|_| 1.0)
    }

    /// the center of mass of each cluster, using `weights` as the mass of
    /// each cell. Clusters with zero total mass are omitted.
    pub fn centers_of_mass<W: FieldValue>(
        &self,
        weights: &Grid<W>,
    ) -> Result<BTreeMap<usize, Vec<f64>>, Error> {
        self.grid.require_same_shape("weights", weights)?;
        Ok(self.weighted_centers(|i| weights.get_linear(i).to_f64()))
    }

    fn weighted_centers(&self, weight: impl Fn(usize) -> f64) -> BTreeMap<usize, Vec<f64>> {
        let shape = self.shape();
        let periodic = self.periodic();
        let ndim = shape.len();

        // first pass: total weight, plus the circular sums on periodic axes
        // and the plain sums on bounded axes
        let mut accums: BTreeMap<usize, CenterAccum> = BTreeMap::new();
        let mut idx = vec![0_isize; ndim];
        for (linear, &l) in self.grid.as_slice().iter().enumerate() {
            let w = weight(linear);
            if l != 0 && w != 0.0 {
                let accum = accums.entry(l).or_insert_with(|| CenterAccum::new(ndim));
                accum.weight += w;
                for axis in 0..ndim {
                    let x = idx[axis] as f64;
                    if periodic[axis] {
                        let theta = TAU * x / shape[axis] as f64;
                        accum.cos[axis] += w * theta.cos();
                        accum.sin[axis] += w * theta.sin();
                    } else {
                        accum.sum[axis] += w * x;
                    }
                }
            }
            next_index(&mut idx, shape);
        }

        let mut anchors: BTreeMap<usize, Vec<Option<f64>>> = BTreeMap::new();
        for (&l, accum) in accums.iter() {
            let anchor = (0..ndim)
                .map(|axis| {
                    let len = shape[axis] as f64;
                    let resultant = accum.cos[axis].hypot(accum.sin[axis]);
                    if periodic[axis] && resultant > 1e-10 * accum.weight.abs() {
                        let theta = accum.sin[axis].atan2(accum.cos[axis]);
                        Some((theta * len / TAU).rem_euclid(len))
                    } else {
                        None
                    }
                })
                .collect();
            anchors.insert(l, anchor);
        }

        // second pass (only matters for periodic axes): sum the coordinates
        // after moving them to the minimum image relative to the anchor
        if periodic.iter().any(|&p| p) {
            let mut idx = vec![0_isize; ndim];
            for (linear, &l) in self.grid.as_slice().iter().enumerate() {
                let w = weight(linear);
                if l != 0 && w != 0.0 {
                    if let (Some(accum), Some(anchor)) = (accums.get_mut(&l), anchors.get(&l)) {
                        for axis in (0..ndim).filter(|&a| periodic[a]) {
                            let len = shape[axis] as f64;
                            let x = idx[axis] as f64;
                            let x = match anchor[axis] {
                                Some(a) => x - len * ((x - a) / len).round(),
                                None => x,
                            };
                            accum.sum[axis] += w * x;
                        }
                    }
                }
                next_index(&mut idx, shape);
            }
        }

        accums
            .into_iter()
            .map(|(l, accum)| {
                let center = (0..ndim)
                    .map(|axis| {
                        let c = accum.sum[axis] / accum.weight;
                        if periodic[axis] {
                            c.rem_euclid(shape[axis] as f64)
                        } else {
                            c
                        }
                    })
                    .collect();
                (l, center)
            })
            .collect()
    }

    /// A label field where each label only occupies the cell that holds the
    /// center of its cluster (the coordinates are rounded down).
    ///
    /// If several centers fall in the same cell, the largest label wins.
    pub fn center_field(&self) -> LabelField {
        let shape = self.shape();
        let mut values = vec![0_usize; self.grid.len()];
        for (l, center) in self.centers() {
            let idx: Vec<isize> = center
                .iter()
                .zip(shape)
                .map(|(&c, &len)| (c.floor() as isize).clamp(0, len as isize - 1))
                .collect();
            if let Some(linear) = ravel_index(&idx, shape, self.periodic()) {
                values[linear] = l;
            }
        }
        LabelField::from_grid(Grid::from_parts(
            values,
            shape.to_vec(),
            self.periodic().to_vec(),
        ))
    }

    /// Remove every cluster with fewer than `min_size` cells. The remaining
    /// clusters are renumbered densely (preserving their relative order).
    pub fn prune(&self, min_size: usize) -> LabelField {
        let sizes = self.sizes();
        let lut: HashMap<usize, usize> = sizes
            .iter()
            .filter(|&(_, &size)| size >= min_size)
            .enumerate()
            .map(|(i, (&l, _))| (l, i + 1))
            .collect();
        debug!(
            removed = sizes.len() - lut.len(),
            kept = lut.len(),
            min_size,
            "pruned clusters"
        );
        self.relabel(&lut)
    }

    /// Relabel each cluster according to `mapping` (old label to new label).
    ///
    /// Every present label must be mapped onto a distinct, non-zero label so
    /// that the partition is preserved. Entries for labels that aren't
    /// present are ignored.
    pub fn rename(&self, mapping: &BTreeMap<usize, usize>) -> Result<LabelField, Error> {
        if mapping.get(&0).is_some_and(|&v| v != 0) {
            return Err(Error::configuration("the background (0) can't be renamed"));
        }
        let present = self.labels();
        let mut lut = HashMap::with_capacity(present.len());
        let mut targets = BTreeSet::new();
        for &l in present.iter() {
            let Some(&new) = mapping.get(&l) else {
                return Err(Error::configuration(format!(
                    "label {l} is missing from the mapping"
                )));
            };
            if new == 0 {
                return Err(Error::configuration(format!(
                    "label {l} can't be mapped onto the background"
                )));
            } else if !targets.insert(new) {
                return Err(Error::configuration(format!(
                    "multiple labels are mapped onto {new}"
                )));
            }
            lut.insert(l, new);
        }
        Ok(self.relabel(&lut))
    }

    /// Renumber the clusters so that `order[i]` becomes label `i + 1`.
    ///
    /// `order` must list every present label exactly once (the background is
    /// never listed).
    pub fn reorder(&self, order: &[usize]) -> Result<LabelField, Error> {
        let present = self.labels();
        let listed: BTreeSet<usize> = order.iter().copied().collect();
        if listed.len() != order.len() {
            return Err(Error::configuration("order lists a label more than once"));
        } else if listed != present {
            return Err(Error::configuration(format!(
                "order must list each of the present labels {present:?}"
            )));
        }
        let lut: HashMap<usize, usize> =
            order.iter().enumerate().map(|(i, &l)| (l, i + 1)).collect();
        Ok(self.relabel(&lut))
    }

    /// Renumber the clusters according to `criterion`
    pub fn reorder_by(&self, criterion: LabelOrder) -> LabelField {
        let order: Vec<usize> = match criterion {
            LabelOrder::SizeDescending | LabelOrder::SizeAscending => {
                let mut pairs: Vec<(usize, usize)> = self.sizes().into_iter().collect();
                if criterion == LabelOrder::SizeDescending {
                    pairs.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
                } else {
                    pairs.sort_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(&b.0)));
                }
                pairs.into_iter().map(|(l, _)| l).collect()
            }
            LabelOrder::ScanOrder => {
                let mut seen = BTreeSet::new();
                self.grid
                    .as_slice()
                    .iter()
                    .copied()
                    .filter(|&l| l != 0 && seen.insert(l))
                    .collect()
            }
        };
        let lut: HashMap<usize, usize> =
            order.iter().enumerate().map(|(i, &l)| (l, i + 1)).collect();
        self.relabel(&lut)
    }

    /// List the distinct `(self, other)` label pairs found in matching
    /// cells, in scan order of their first occurrence. Pairs of background
    /// cells are skipped.
    ///
    /// When both fields describe the same partition, this is the mapping
    /// between the two numberings.
    pub fn label_map(&self, other: &LabelField) -> Result<Vec<(usize, usize)>, Error> {
        self.grid.require_same_shape("other label field", &other.grid)?;
        let mut seen = BTreeSet::new();
        let mut out = Vec::new();
        for (&a, &b) in self.grid.as_slice().iter().zip(other.grid.as_slice()) {
            if (a, b) != (0, 0) && seen.insert((a, b)) {
                out.push((a, b));
            }
        }
        Ok(out)
    }

    /// apply a lookup table to every non-background label (labels missing
    /// from `lut` become background)
    fn relabel(&self, lut: &HashMap<usize, usize>) -> LabelField {
        LabelField::from_grid(self.grid.map(|l| {
            if l == 0 {
                0
            } else {
                lut.get(&l).copied().unwrap_or(0)
            }
        }))
    }
}

struct CenterAccum {
    weight: f64,
    cos: Vec<f64>,
    sin: Vec<f64>,
    sum: Vec<f64>,
}

impl CenterAccum {
    fn new(ndim: usize) -> Self {
        Self {
            weight: 0.0,
            cos: vec![0.0; ndim],
            sin: vec![0.0; ndim],
            sum: vec![0.0; ndim],
        }
    }
}
