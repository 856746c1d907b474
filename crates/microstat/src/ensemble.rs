//! Ensemble averages of spatial statistics.
//!
//! An [`Ensemble`] tracks one statistic over a region of interest (ROI) of
//! lags. Every call to one of the `accumulate*` methods adds the
//! contributions of one image. The ensemble average is only computed when it
//! is queried, so images may be added in any order (and ensembles built on
//! different threads may be combined with [`Ensemble::merge`]).
//!
//! # Accumulation model
//!
//! Each lag owns an accumulator state tracked by the [`Moments`] reducer: a
//! weighted sum of the contributions (`first`), a weighted sum of their
//! squares (`second`) and the total weight (`norm`). The reported value of a
//! lag is `first / norm`. It is `None` when nothing contributed to the lag.
//!
//! What counts as a contribution depends on the [`Statistic`]:
//!
//! - the pairwise statistics (S2, C2, W2 and the height-height correlation)
//!   visit every unmasked cell `x` of `f` and every lag `dx`. When
//!   `x + dx` is an unmasked cell of `g`, the pair `(f(x), g(x + dx))`
//!   contributes.
//! - the lineal path function (L) walks a straight pixel path from every
//!   unmasked cell towards every boundary lag of the ROI. Each step adds one
//!   to the norm of its lag, and one to the sum if the path has not left the
//!   foreground yet.
//! - the collapsed weighted correlation (W2c) starts at the center of each
//!   cluster and walks the same paths. Once the path leaves the cluster, each
//!   step contributes the value of `f`, at the lag measured from the point
//!   where the path left the cluster.
//! - the mean uses a single lag: every unmasked cell contributes once.
//!
//! Along a bounded axis, a cell outside of the image is treated like a
//! masked cell. Along the path-based statistics, such a cell ends the walk.
//!
//! # Failure behavior
//!
//! Every field passed to an ensemble must carry the ensemble's boundary
//! conditions ([`Grid::periodic`] must equal [`Ensemble::periodic`]);
//! otherwise the call fails with a configuration error. Fields of different
//! shapes may be added to the same ensemble.
//!
//! All input validation happens before any accumulator state is touched, so
//! a call that returns an error leaves the ensemble unchanged.

use microstat_nostd_internal::{
    AccumStateView, Datum, FieldKind, Moments, Reducer, StatePackView, StatePackViewMut,
    Statistic, merge_full_statepack, next_index, ravel_index, reset_full_statepack,
};
use ndarray::{Array2, ArrayD, ArrayViewMut1, IxDyn};
use tracing::{debug, trace};

use crate::clusters::LabelField;
use crate::error::Error;
use crate::grid::{FieldValue, Grid, Mask, Periodic};
use crate::path::{PathMode, path_table};
use crate::roi::Roi;

/// Per-lag results. `None` marks a lag without any contribution.
pub type LagField = ArrayD<Option<f64>>;

/// Look up a [`Statistic`] by its name (e.g. `"S2"` or `"heightheight"`)
pub fn parse_statistic(name: &str) -> Result<Statistic, Error> {
    Statistic::from_name(name).ok_or_else(|| {
        Error::statistic_name(
            name.to_string(),
            Statistic::ALL.iter().map(|s| s.name().to_string()).collect(),
        )
    })
}

#[derive(Clone, Debug)]
enum StatisticChoice {
    Known(Statistic),
    Name(String),
}

/// Assembles an [`Ensemble`].
///
/// The ROI shape and the statistic are required. By default, every axis is
/// periodic and paths are rasterized with [`PathMode::Bresenham`].
///
/// ```
/// use microstat::EnsembleBuilder;
/// let ensemble = EnsembleBuilder::new()
///     .roi(&[5, 5])
///     .periodic(false)
///     .statistic_name("S2")
///     .build()
///     .unwrap();
/// assert_eq!(ensemble.roi().shape(), &[5, 5]);
/// ```
#[derive(Clone, Debug, Default)]
pub struct EnsembleBuilder {
    roi: Option<Vec<usize>>,
    periodic: Option<Periodic>,
    statistic: Option<StatisticChoice>,
    path_mode: PathMode,
}

impl EnsembleBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// the shape of the region of interest
    pub fn roi(&mut self, shape: &[usize]) -> &mut Self {
        self.roi = Some(shape.to_vec());
        self
    }

    pub fn periodic(&mut self, periodic: impl Into<Periodic>) -> &mut Self {
        self.periodic = Some(periodic.into());
        self
    }

    pub fn statistic(&mut self, statistic: Statistic) -> &mut Self {
        self.statistic = Some(StatisticChoice::Known(statistic));
        self
    }

    /// specify the statistic by name. An unknown name is reported by
    /// [`EnsembleBuilder::build`]
    pub fn statistic_name(&mut self, name: &str) -> &mut Self {
        self.statistic = Some(StatisticChoice::Name(name.to_string()));
        self
    }

    /// how pixel paths are rasterized (only used by path-based statistics)
    pub fn path_mode(&mut self, mode: PathMode) -> &mut Self {
        self.path_mode = mode;
        self
    }

    pub fn build(&self) -> Result<Ensemble, Error> {
        let statistic = match &self.statistic {
            Some(StatisticChoice::Known(statistic)) => *statistic,
            Some(StatisticChoice::Name(name)) => parse_statistic(name)?,
            None => return Err(Error::configuration("the statistic must be specified")),
        };
        let Some(roi_shape) = &self.roi else {
            return Err(Error::configuration(
                "the region of interest must be specified",
            ));
        };
        let roi = Roi::new(roi_shape)?;
        if statistic == Statistic::Mean && roi.n_lags() != 1 {
            return Err(Error::configuration(format!(
                "the mean only has a single lag, so the region of interest must have a \
                 length of 1 along every axis (got {:?})",
                roi.shape()
            )));
        }
        let periodic = self
            .periodic
            .clone()
            .unwrap_or_default()
            .flags(roi.ndim())?;

        let mut statepack = Array2::zeros((Moments.accum_state_size(), roi.n_lags()));
        reset_full_statepack(
            &Moments,
            &mut StatePackViewMut::from_array_view(statepack.view_mut()),
        );
        debug!(
            statistic = statistic.name(),
            roi = ?roi.shape(),
            ?periodic,
            path_mode = ?self.path_mode,
            "built ensemble"
        );
        Ok(Ensemble {
            statistic,
            roi,
            periodic,
            path_mode: self.path_mode,
            statepack,
        })
    }
}

/// The straight pixel paths walked by the path-based statistics, each point
/// paired with the (linear) index of its lag
struct LagPath {
    points: Vec<isize>,
    lag_indices: Vec<usize>,
}

/// Accumulates a statistic over an ensemble of images.
///
/// See the module documentation for how contributions are counted.
#[derive(Clone, Debug)]
pub struct Ensemble {
    statistic: Statistic,
    roi: Roi,
    periodic: Vec<bool>,
    path_mode: PathMode,
    // shape: [Moments::accum_state_size(), roi.n_lags()]
    statepack: Array2<f64>,
}

impl Ensemble {
    /// Shorthand for the [`EnsembleBuilder`] with the default path mode
    pub fn new(
        roi_shape: &[usize],
        periodic: impl Into<Periodic>,
        statistic: Statistic,
    ) -> Result<Self, Error> {
        EnsembleBuilder::new()
            .roi(roi_shape)
            .periodic(periodic)
            .statistic(statistic)
            .build()
    }

    pub fn statistic(&self) -> Statistic {
        self.statistic
    }

    pub fn roi(&self) -> &Roi {
        &self.roi
    }

    /// whether each axis is periodic
    pub fn periodic(&self) -> &[bool] {
        &self.periodic
    }

    pub fn path_mode(&self) -> PathMode {
        self.path_mode
    }

    /// Add the unmasked cells of `f` to the running mean, and return the
    /// updated mean (`None` while no cell contributed).
    ///
    /// Only valid for [`Statistic::Mean`].
    pub fn mean<T: FieldValue>(
        &mut self,
        f: &Grid<T>,
        mask: Option<&Mask>,
    ) -> Result<Option<f64>, Error> {
        self.require_statistic(self.statistic == Statistic::Mean, "mean")?;
        self.check_grid("field", f, mask)?;
        trace!(shape = ?f.shape(), "accumulating mean");

        let mut pack = StatePackViewMut::from_array_view(self.statepack.view_mut());
        let mut accum_state = pack.get_state_mut(0);
        for (i, value) in f.as_slice().iter().enumerate() {
            if !is_masked(mask, i) {
                Moments.consume(&mut accum_state, &Datum::unweighted(value.to_f64()));
            }
        }
        Ok(self.result().iter().next().copied().flatten())
    }

    /// Add the auto-correlation of `f` (or, for the mean and the lineal path
    /// function, the single-field statistic of `f`).
    pub fn accumulate<T: FieldValue>(
        &mut self,
        f: &Grid<T>,
        mask: Option<&Mask>,
    ) -> Result<(), Error> {
        match self.statistic {
            Statistic::Mean => self.mean(f, mask).map(|_| ()),
            Statistic::LinealPath => {
                self.check_grid("field", f, mask)?;
                self.check_kind("field", T::KIND)?;
                self.accumulate_lineal_path(f, mask);
                Ok(())
            }
            Statistic::W2c => Err(Error::configuration(
                "the W2c statistic needs cluster information, use accumulate_collapsed",
            )),
            _ => {
                self.check_grid("field", f, mask)?;
                self.check_kind("field", T::KIND)?;
                self.accumulate_pairs(f, f, mask, mask);
                Ok(())
            }
        }
    }

    /// Add the cross-correlation of `f` (at `x`) and `g` (at `x + dx`).
    ///
    /// For W2, `f` holds the weights. Only valid for the pairwise
    /// statistics.
    pub fn accumulate_pair<T: FieldValue, U: FieldValue>(
        &mut self,
        f: &Grid<T>,
        g: &Grid<U>,
        fmask: Option<&Mask>,
        gmask: Option<&Mask>,
    ) -> Result<(), Error> {
        self.require_statistic(self.statistic.is_pairwise(), "accumulate_pair")?;
        self.check_grid("first field", f, fmask)?;
        self.check_grid("second field", g, gmask)?;
        f.require_same_shape("second field", g)?;
        self.check_kind("first field", T::KIND)?;
        self.check_kind("second field", U::KIND)?;
        self.accumulate_pairs(f, g, fmask, gmask);
        Ok(())
    }

    /// Add the collapsed weighted correlation of `f` around the clusters in
    /// `clusters`.
    ///
    /// `centers` marks the center of each cluster with its label (e.g.
    /// [`LabelField::center_field`]). Only valid for [`Statistic::W2c`].
    pub fn accumulate_collapsed<T: FieldValue>(
        &mut self,
        clusters: &LabelField,
        centers: &LabelField,
        f: &Grid<T>,
        mask: Option<&Mask>,
    ) -> Result<(), Error> {
        self.require_statistic(self.statistic == Statistic::W2c, "accumulate_collapsed")?;
        self.check_grid("field", f, mask)?;
        self.check_grid("clusters", clusters.as_grid(), None)?;
        f.require_same_shape("clusters", clusters.as_grid())?;
        f.require_same_shape("centers", centers.as_grid())?;
        self.accumulate_collapsed_paths(clusters, centers, f, mask);
        Ok(())
    }

    fn require_statistic(&self, ok: bool, operation: &str) -> Result<(), Error> {
        if ok {
            Ok(())
        } else {
            Err(Error::configuration(format!(
                "{operation} can't be used to accumulate the {} statistic",
                self.statistic.name()
            )))
        }
    }

    fn check_grid<T: FieldValue>(
        &self,
        what: &'static str,
        grid: &Grid<T>,
        mask: Option<&Mask>,
    ) -> Result<(), Error> {
        if grid.ndim() != self.roi.ndim() {
            return Err(Error::rank_mismatch(what, self.roi.ndim(), grid.ndim()));
        }
        if grid.periodic() != self.periodic.as_slice() {
            return Err(Error::configuration(format!(
                "the {what} has the boundary conditions {:?}, but the ensemble uses {:?}",
                grid.periodic(),
                self.periodic
            )));
        }
        match mask {
            Some(mask) => grid.require_same_shape("mask", mask),
            None => Ok(()),
        }
    }

    fn check_kind(&self, what: &str, kind: FieldKind) -> Result<(), Error> {
        if self.statistic.accepts(kind) {
            Ok(())
        } else {
            Err(Error::configuration(format!(
                "the {what} holds {kind:?} values, which the {} statistic doesn't accept",
                self.statistic.name()
            )))
        }
    }

    fn accumulate_pairs<T: FieldValue, U: FieldValue>(
        &mut self,
        f: &Grid<T>,
        g: &Grid<U>,
        fmask: Option<&Mask>,
        gmask: Option<&Mask>,
    ) {
        trace!(statistic = self.statistic.name(), shape = ?f.shape(), "accumulating pairs");
        let statistic = self.statistic;
        let shape = f.shape();
        let ndim = shape.len();
        let lags = self.roi.lag_table();
        let mut pack = StatePackViewMut::from_array_view(self.statepack.view_mut());

        let mut idx = vec![0_isize; ndim];
        let mut other = vec![0_isize; ndim];
        for i in 0..f.len() {
            if !is_masked(fmask, i) {
                let a = f.get_linear(i).to_f64();
                for (lag_index, lag) in lags.chunks_exact(ndim).enumerate() {
                    for ((o, &x), &dx) in other.iter_mut().zip(&idx).zip(lag) {
                        *o = x + dx;
                    }
                    let Some(j) = ravel_index(&other, shape, &self.periodic) else {
                        continue;
                    };
                    if !is_masked(gmask, j) {
                        let datum = statistic.pair_datum(a, g.get_linear(j).to_f64());
                        Moments.consume(&mut pack.get_state_mut(lag_index), &datum);
                    }
                }
            }
            next_index(&mut idx, shape);
        }
    }

    fn accumulate_lineal_path<T: FieldValue>(&mut self, f: &Grid<T>, mask: Option<&Mask>) {
        trace!(shape = ?f.shape(), "accumulating lineal path");
        let shape = f.shape();
        let ndim = shape.len();
        let paths = self.lag_paths();
        let mut pack = StatePackViewMut::from_array_view(self.statepack.view_mut());

        let mut idx = vec![0_isize; ndim];
        let mut point = vec![0_isize; ndim];
        for i in 0..f.len() {
            if !is_masked(mask, i) {
                for path in paths.iter() {
                    let mut inside = true;
                    let steps = path.points.chunks_exact(ndim).zip(&path.lag_indices);
                    for (offset, &lag_index) in steps {
                        for ((p, &x), &dx) in point.iter_mut().zip(&idx).zip(offset) {
                            *p = x + dx;
                        }
                        let Some(j) = ravel_index(&point, shape, &self.periodic) else {
                            break;
                        };
                        if is_masked(mask, j) {
                            break;
                        }
                        inside = inside && f.get_linear(j).is_foreground();
                        let datum = Datum::unweighted(if inside { 1.0 } else { 0.0 });
                        Moments.consume(&mut pack.get_state_mut(lag_index), &datum);
                    }
                }
            }
            next_index(&mut idx, shape);
        }
    }

    fn accumulate_collapsed_paths<T: FieldValue>(
        &mut self,
        clusters: &LabelField,
        centers: &LabelField,
        f: &Grid<T>,
        mask: Option<&Mask>,
    ) {
        trace!(shape = ?f.shape(), "accumulating collapsed weighted correlation");
        let shape = f.shape();
        let ndim = shape.len();
        let paths = self.lag_paths();
        let clusters = clusters.as_grid();
        let centers = centers.as_grid();
        let mut pack = StatePackViewMut::from_array_view(self.statepack.view_mut());

        let mut idx = vec![0_isize; ndim];
        let mut point = vec![0_isize; ndim];
        for i in 0..f.len() {
            let label = centers.get_linear(i);
            if label != 0 && clusters.get_linear(i) == label {
                for path in paths.iter() {
                    // the position along the path where it left the cluster
                    let mut exit = None;
                    for (k, offset) in path.points.chunks_exact(ndim).enumerate() {
                        for ((p, &x), &dx) in point.iter_mut().zip(&idx).zip(offset) {
                            *p = x + dx;
                        }
                        let Some(j) = ravel_index(&point, shape, &self.periodic) else {
                            break;
                        };
                        if exit.is_none() && clusters.get_linear(j) != label {
                            exit = Some(k);
                        }
                        if let Some(exit) = exit {
                            if !is_masked(mask, j) {
                                let datum = Datum::unweighted(f.get_linear(j).to_f64());
                                Moments.consume(
                                    &mut pack.get_state_mut(path.lag_indices[k - exit]),
                                    &datum,
                                );
                            }
                        }
                    }
                }
            }
            next_index(&mut idx, shape);
        }
    }

    /// The pixel paths from the zero lag to each lag of the ROI's stamp. A
    /// ROI without a boundary only holds the zero lag.
    fn lag_paths(&self) -> Vec<LagPath> {
        let zero = vec![0_isize; self.roi.ndim()];
        let mut stamp = self.roi.stamp();
        if stamp.is_empty() {
            stamp.push(zero.clone());
        }
        stamp
            .iter()
            .map(|end| {
                let table = path_table(&zero, end, self.path_mode);
                let mut points = Vec::with_capacity(table.len());
                let mut lag_indices = Vec::with_capacity(table.len() / zero.len());
                for point in table.chunks_exact(zero.len()) {
                    if let Some(lag_index) = self.roi.linear_index_of(point) {
                        points.extend_from_slice(point);
                        lag_indices.push(lag_index);
                    }
                }
                LagPath {
                    points,
                    lag_indices,
                }
            })
            .collect()
    }

    fn lag_array<A>(&self, value: impl Fn(AccumStateView) -> A) -> ArrayD<A> {
        let shape = self.roi.shape();
        ArrayD::from_shape_fn(IxDyn(shape), |index| {
            let linear = (0..shape.len()).fold(0, |acc, k| acc * shape[k] + index[k]);
            value(AccumStateView::from_array_view(self.statepack.column(linear)))
        })
    }

    /// Mean, variance and weight of a single accumulator state
    fn moments(accum_state: &AccumStateView) -> Vec<f64> {
        let mut out = vec![0.0; Moments.output_descr().n_per_accum_state()];
        Moments.value_from_accum_state(&mut ArrayViewMut1::from(&mut out[..]), accum_state);
        out
    }

    /// The ensemble average at every lag of the ROI.
    ///
    /// For [`Statistic::Mean`], the array holds a single element.
    pub fn result(&self) -> LagField {
        self.lag_array(|accum_state| {
            Moments::has_data(&accum_state)
                .then(|| Self::moments(&accum_state)[Moments::VALUE_MEAN])
        })
    }

    /// The unbiased variance of the contributions at every lag (`None` when
    /// the total weight doesn't exceed one)
    pub fn variance(&self) -> LagField {
        self.lag_array(|accum_state| {
            (accum_state[Moments::WEIGHT] > 1.0)
                .then(|| Self::moments(&accum_state)[Moments::VALUE_VARIANCE])
        })
    }

    /// The square root of the height-height correlation, i.e. the
    /// root-mean-square height difference at every lag
    pub fn root_mean_square(&self) -> Result<LagField, Error> {
        self.require_statistic(self.statistic == Statistic::HeightHeight, "root_mean_square")?;
        Ok(self.result().mapv(|value| value.map(f64::sqrt)))
    }

    /// the raw (weighted) sum of the contributions at every lag
    pub fn first(&self) -> ArrayD<f64> {
        self.lag_array(|accum_state| accum_state[Moments::FIRST])
    }

    /// the raw (weighted) sum of the squared contributions at every lag
    pub fn second(&self) -> ArrayD<f64> {
        self.lag_array(|accum_state| accum_state[Moments::SECOND])
    }

    /// the total weight at every lag
    pub fn norm(&self) -> ArrayD<f64> {
        self.lag_array(|accum_state| accum_state[Moments::WEIGHT])
    }

    /// Add the contributions accumulated by `other`.
    ///
    /// Both ensembles must track the same statistic over the same ROI, with
    /// the same boundary conditions and path mode.
    pub fn merge(&mut self, other: &Ensemble) -> Result<(), Error> {
        if self.statistic != other.statistic {
            return Err(Error::configuration(format!(
                "can't merge a {} ensemble into a {} ensemble",
                other.statistic.name(),
                self.statistic.name()
            )));
        } else if self.roi != other.roi {
            return Err(Error::shape_mismatch(
                "region of interest",
                self.roi.shape(),
                other.roi.shape(),
            ));
        } else if self.periodic != other.periodic || self.path_mode != other.path_mode {
            return Err(Error::configuration(
                "can't merge ensembles with different boundary conditions or path modes",
            ));
        }
        merge_full_statepack(
            &Moments,
            &mut StatePackViewMut::from_array_view(self.statepack.view_mut()),
            &StatePackView::from_array_view(other.statepack.view()),
        )
        .map_err(Error::internal_legacy_adhoc)
    }

    /// Discard every contribution
    pub fn reset(&mut self) {
        reset_full_statepack(
            &Moments,
            &mut StatePackViewMut::from_array_view(self.statepack.view_mut()),
        );
    }
}

fn is_masked(mask: Option<&Mask>, i: usize) -> bool {
    mask.is_some_and(|mask| mask.get_linear(i))
}
