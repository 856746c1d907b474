/*!
Provides routines for characterizing the microstructure of multi-dimensional
(binary, integer-labeled or scalar) images: cluster labeling and ensemble
averaged spatial statistics.

# High-Level: Microstructure Statistics.

Many materials (and many simulations) are described by images on a regular
grid, where each cell holds a phase indicator, a label or a scalar. Spatial
statistics summarize how these values are arranged. The most common one is
the two-point probability `S2(dx)`: the probability that the cells at `x` and
at `x + dx` both belong to the foreground phase.

Statistics like these are estimated by averaging over every cell of an image,
and usually over an ensemble of images. This crate tracks the running sums
for every lag `dx` in a region of interest (see [`Ensemble`]), so that images
can be added one at a time.

The available statistics are listed by [`Statistic`]:

- the two-point probability (S2) and the two-point cluster function (C2)
- the weighted correlation (W2) and its collapsed variant (W2c), which is
  measured relative to the edges of clusters
- the lineal path function (L)
- the height-height correlation of scalar fields
- the plain mean of a field

# Clusters

Connected regions of the foreground are labeled by [`ClusterLabeler`]. The
notion of "connected" is set by a [`ConnectivityKernel`], and periodic axes
are respected, so a cluster may wrap around the boundary. The resulting
[`LabelField`] provides sizes, (periodic aware) centers and relabeling
utilities.

# Example

```
use microstat::{Ensemble, Grid, Statistic};
use ndarray::array;

let image = Grid::new(array![[true, false], [true, true]], true).unwrap();
let mut ensemble = Ensemble::new(&[3, 3], true, Statistic::S2).unwrap();
ensemble.accumulate(&image, None).unwrap();

// the zero lag sits at the center of the result
let s2 = ensemble.result();
assert_eq!(s2[[1, 1]], Some(0.75));
```

# Developer Guide

The allocation-free building blocks (index arithmetic, union-find, the
accumulator states and the [`Reducer`] machinery) live in the
`microstat_nostd_internal` crate.

*/

#![deny(rustdoc::broken_intra_doc_links)]

mod clusters;
mod dilate;
mod distance;
mod dummy;
mod ensemble;
mod error;
mod grid;
mod kernel;
mod path;
mod roi;

pub use clusters::{ClusterLabeler, LabelField, LabelOrder, clusters, label};
pub use dilate::{dilate, dilate_per_label};
pub use distance::distance_transform;
pub use dummy::{Circle, dummy_circles, random_circles, random_field};
pub use ensemble::{Ensemble, EnsembleBuilder, LagField, parse_statistic};
pub use error::{Error, ErrorCategory};
pub use grid::{FieldValue, Grid, Mask, Periodic};
pub use kernel::ConnectivityKernel;
pub use microstat_nostd_internal::{Datum, FieldKind, Moments, OutputDescr, Reducer, Statistic};
pub use path::{PathMode, path};
pub use roi::Roi;
