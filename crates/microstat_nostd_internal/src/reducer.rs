//! Define basic accumulator machinery (that doesn't require the standard lib)
//!
//! # Accumulation Machinery
//!
//! Every two-point statistic in this workspace boils down to the same
//! recipe. For each lag `𝒓` of a region of interest, we visit every valid
//! pair of cells `(𝒙, 𝒙+𝒓)`, turn the pair of field values into a value `yᵢ`
//! and a weight `wᵢ`, and feed them to an accumulator dedicated to `𝒓`.
//! The statistic at `𝒓` is then the weighted mean `Σwᵢyᵢ / Σwᵢ`.
//!
//! In practice, we use [`Datum`] to package together `yᵢ` & `wᵢ`. The
//! mapping from a pair of field values to a [`Datum`] lives in
//! [`crate::Statistic`].
//!
//! We draw a distinction between the current state of an accumulator and the
//! actual accumulation logic.
//! - We refer to the current state of a single accumulator as the
//!   `accum_state`. It's packaged inside of the [`AccumStateView`] &
//!   [`AccumStateViewMut`] types (the exact type depends on context).
//! - The accumulation logic is encapsulated by the functions implemented by
//!   the [`Reducer`] trait. A Reducer modifies a single `accum_state` at a
//!   time.
//!
//! A collection of `accum_state`s (one per lag) is managed by a
//! [`StatePackViewMut`]. Because each `accum_state` only holds sums,
//! statepacks filled from separate fields (or on separate threads) can be
//! combined with [`merge_full_statepack`] in any order.

use crate::state::{AccumStateView, AccumStateViewMut, StatePackView, StatePackViewMut};
use ndarray::ArrayViewMut1;

/// Instances of this element are consumed by the Reducer
///
/// I don't love that this defines copy, but it's important for examples
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Datum {
    pub value: f64,
    pub weight: f64,
}

impl Datum {
    pub fn zeroed() -> Self {
        Datum {
            value: 0.0,
            weight: 0.0,
        }
    }

    /// a datum with unit weight
    pub fn unweighted(value: f64) -> Self {
        Datum { value, weight: 1.0 }
    }
}

/// describes the output components from a single Reducer accum_state
pub enum OutputDescr {
    MultiScalarComp(&'static [&'static str]),
}

impl OutputDescr {
    /// the number of components to allocate per component
    pub fn n_per_accum_state(&self) -> usize {
        match self {
            Self::MultiScalarComp(names) => names.len(),
        }
    }
}

/// Reducers generally operate on individual `accum_state`s.
pub trait Reducer {
    /// the number of f64 elements needed to track the accumulator data
    fn accum_state_size(&self) -> usize;

    /// initializes the storage tracking the acumulator's state.
    ///
    /// You need to call this function before you start working with the
    /// storage. You can also use this to reset the accumulator's state since
    /// it blindly overwrites any existing values.
    fn init_accum_state(&self, accum_state: &mut AccumStateViewMut);

    /// consume the value and weight to update the accum_state
    fn consume(&self, accum_state: &mut AccumStateViewMut, datum: &Datum);

    /// merge the state information tracked by `accum_state` and `other`, and
    /// update `accum_state` accordingly
    fn merge(&self, accum_state: &mut AccumStateViewMut, other: &AccumStateView);

    /// extract all output-values from a single accum_state. Expects `value` to
    /// have the shape given by `[self.output_descr().n_per_accum_state()]`
    fn value_from_accum_state(&self, value: &mut ArrayViewMut1<f64>, accum_state: &AccumStateView);

    /// Describes the outputs produced from a single accum_state
    fn output_descr(&self) -> OutputDescr;
}

/// Tracks the weighted first and second moments of a stream of values.
///
/// When the total weight is zero, `value_from_accum_state` reports NaN for
/// the mean and variance. Callers that need to distinguish "no data" from a
/// genuine value should inspect the weight component (or use
/// [`Moments::has_data`]) rather than testing for NaN.
#[derive(Clone, Copy, Debug, Default)]
pub struct Moments;

impl Moments {
    pub const FIRST: usize = 0;
    pub const SECOND: usize = 1;
    pub const WEIGHT: usize = 2;

    pub const VALUE_MEAN: usize = 0;
    pub const VALUE_VARIANCE: usize = 1;
    pub const VALUE_WEIGHT: usize = 2;
    const OUTPUT_COMPONENTS: &'static [&'static str] = &["mean", "variance", "weight"];

    pub fn has_data(accum_state: &AccumStateView) -> bool {
        accum_state[Moments::WEIGHT] != 0.0
    }
}

impl Reducer for Moments {
    fn accum_state_size(&self) -> usize {
        3_usize
    }

    fn init_accum_state(&self, accum_state: &mut AccumStateViewMut) {
        accum_state[Moments::FIRST] = 0.0;
        accum_state[Moments::SECOND] = 0.0;
        accum_state[Moments::WEIGHT] = 0.0;
    }

    #[inline(always)]
    fn consume(&self, accum_state: &mut AccumStateViewMut, datum: &Datum) {
        accum_state[Moments::FIRST] += datum.value * datum.weight;
        accum_state[Moments::SECOND] += datum.value * datum.value * datum.weight;
        accum_state[Moments::WEIGHT] += datum.weight;
    }

    fn merge(&self, accum_state: &mut AccumStateViewMut, other: &AccumStateView) {
        accum_state[Moments::FIRST] += other[Moments::FIRST];
        accum_state[Moments::SECOND] += other[Moments::SECOND];
        accum_state[Moments::WEIGHT] += other[Moments::WEIGHT];
    }

    fn output_descr(&self) -> OutputDescr {
        OutputDescr::MultiScalarComp(Moments::OUTPUT_COMPONENTS)
    }

    fn value_from_accum_state(&self, value: &mut ArrayViewMut1<f64>, accum_state: &AccumStateView) {
        let weight = accum_state[Moments::WEIGHT];
        let mean = accum_state[Moments::FIRST] / weight;
        // unbiased estimator. With a single contribution this divides by zero
        let variance =
            (accum_state[Moments::SECOND] / weight - mean * mean) * weight / (weight - 1.0);
        value[[Moments::VALUE_MEAN]] = mean;
        value[[Moments::VALUE_VARIANCE]] = variance;
        value[[Moments::VALUE_WEIGHT]] = weight;
    }
}

/// Initialize every accum_state in `statepack`
pub fn reset_full_statepack(reducer: &impl Reducer, statepack: &mut StatePackViewMut) {
    for i in 0..statepack.n_states() {
        reducer.init_accum_state(&mut statepack.get_state_mut(i));
    }
}

/// Merge every accum_state of `other` into the matching accum_state of
/// `statepack`.
pub fn merge_full_statepack(
    reducer: &impl Reducer,
    statepack: &mut StatePackViewMut,
    other: &StatePackView,
) -> Result<(), &'static str> {
    if statepack.n_states() != other.n_states() {
        return Err("statepacks must hold the same number of accum_states");
    } else if statepack.state_size() != other.state_size() {
        return Err("statepacks must have the same state_size");
    }
    for i in 0..statepack.n_states() {
        reducer.merge(&mut statepack.get_state_mut(i), &other.get_state(i));
    }
    Ok(())
}
