use std::collections::BTreeMap;

use microstat_nostd_internal::{next_index, ravel_index};
use tracing::trace;

use crate::clusters::LabelField;
use crate::error::Error;
use crate::grid::Grid;
use crate::kernel::ConnectivityKernel;

/// Grow every cluster by `iterations` layers of cells.
///
/// In each iteration, a labeled cell claims every background neighbor
/// (according to `kernel`). When two clusters compete for the same cell, the
/// cluster that comes first in scan order wins. Cells claimed during an
/// iteration only start growing in the next iteration.
pub fn dilate(
    labels: &LabelField,
    kernel: &ConnectivityKernel,
    iterations: usize,
) -> Result<LabelField, Error> {
    dilate_impl(labels, kernel, |_| iterations)
}

/// Like [`dilate`], but the number of iterations is specified per label.
/// Labels without an entry are not dilated (they may still block other
/// clusters from growing).
pub fn dilate_per_label(
    labels: &LabelField,
    kernel: &ConnectivityKernel,
    iterations: &BTreeMap<usize, usize>,
) -> Result<LabelField, Error> {
    dilate_impl(labels, kernel, |l| iterations.get(&l).copied().unwrap_or(0))
}

fn dilate_impl(
    labels: &LabelField,
    kernel: &ConnectivityKernel,
    iterations: impl Fn(usize) -> usize,
) -> Result<LabelField, Error> {
    let shape = labels.shape();
    let periodic = labels.periodic();
    let ndim = shape.len();
    if kernel.ndim() != ndim {
        return Err(Error::rank_mismatch("connectivity kernel", ndim, kernel.ndim()));
    }

    let max_iterations = labels
        .labels()
        .into_iter()
        .map(&iterations)
        .max()
        .unwrap_or(0);

    let mut current = labels.as_grid().as_slice().to_vec();
    let mut neighbor = vec![0_isize; ndim];
    for iter in 0..max_iterations {
        let snapshot = current.clone();
        let mut idx = vec![0_isize; ndim];
        let mut n_claimed = 0_usize;
        for &l in snapshot.iter() {
            if l != 0 && iterations(l) > iter {
                for offset in kernel.offsets() {
                    for ((nb, &i), &o) in neighbor.iter_mut().zip(&idx).zip(offset) {
                        *nb = i + o;
                    }
                    if let Some(other) = ravel_index(&neighbor, shape, periodic) {
                        if current[other] == 0 {
                            current[other] = l;
                            n_claimed += 1;
                        }
                    }
                }
            }
            next_index(&mut idx, shape);
        }
        trace!(iteration = iter, n_claimed, "dilation step");
        if n_claimed == 0 {
            break;
        }
    }
    Ok(LabelField::from_grid(Grid::from_parts(
        current,
        shape.to_vec(),
        periodic.to_vec(),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clusters::clusters;
    use crate::grid::Periodic;

    fn labels_2d(shape: [usize; 2], values: &[usize], periodic: impl Into<Periodic>) -> LabelField {
        LabelField::from_grid(Grid::from_shape_vec(&shape, values.to_vec(), periodic).unwrap())
    }

    #[test]
    fn grow_single_cell() {
        let mut values = vec![0; 25];
        values[12] = 1;
        let labels = labels_2d([5, 5], &values, false);
        let kernel = ConnectivityKernel::nearest(2).unwrap();

        let once = dilate(&labels, &kernel, 1).unwrap();
        assert_eq!(once.sizes()[&1], 5);
        let twice = dilate(&labels, &kernel, 2).unwrap();
        assert_eq!(twice.sizes()[&1], 13);

        let full = ConnectivityKernel::full(2).unwrap();
        assert_eq!(dilate(&labels, &full, 1).unwrap().sizes()[&1], 9);
        assert_eq!(dilate(&labels, &full, 5).unwrap().sizes()[&1], 25);
    }

    #[test]
    fn periodic_growth() {
        let mut values = vec![0; 5];
        values[0] = 1;
        let labels = labels_2d([1, 5], &values, vec![false, true]);
        let kernel = ConnectivityKernel::nearest(2).unwrap();
        let grown = dilate(&labels, &kernel, 1).unwrap();
        assert_eq!(grown.as_grid().as_slice(), &[1, 1, 0, 0, 1]);
    }

    #[test]
    fn per_label_iterations() {
        #[rustfmt::skip]
        let values = [
            1, 0, 0, 0, 0, 0, 2,
        ];
        let labels = labels_2d([1, 7], &values, false);
        let kernel = ConnectivityKernel::nearest(2).unwrap();

        let grown = dilate_per_label(&labels, &kernel, &BTreeMap::from([(1, 2)])).unwrap();
        assert_eq!(grown.as_grid().as_slice(), &[1, 1, 1, 0, 0, 0, 2]);

        // the clusters meet in the middle, the first cluster claims the
        // contested cell
        let grown = dilate(&labels, &kernel, 3).unwrap();
        assert_eq!(grown.as_grid().as_slice(), &[1, 1, 1, 1, 2, 2, 2]);
        // dilation never merges clusters
        assert_eq!(grown.n_clusters(), 2);
        let relabeled = clusters(&grown.as_grid().map(|l| l != 0)).unwrap();
        assert_eq!(relabeled.n_clusters(), 1);
    }
}
