//! Low-level building blocks shared by the `microstat` crate.
//!
//! Nothing in here allocates: buffers are always provided by the caller. The
//! public crate owns the memory and is responsible for validating user input
//! before it reaches these routines (errors are reported as `&'static str`
//! and wrapped by the public crate).
#![no_std]
mod layout;
mod reducer;
mod state;
mod statistic;
mod union_find;

pub use layout::{
    check_shape, n_elements, next_index, pad_width, ravel_index, unravel_index, wrap_coord,
};
pub use reducer::{
    Datum, Moments, OutputDescr, Reducer, merge_full_statepack, reset_full_statepack,
};
pub use state::{AccumStateView, AccumStateViewMut, StatePackView, StatePackViewMut};
pub use statistic::{FieldKind, Statistic};
pub use union_find::DisjointSets;
