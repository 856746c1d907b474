use core::ops::{Index, IndexMut};
use ndarray::{ArrayView1, ArrayView2, ArrayViewMut1, ArrayViewMut2, Axis};

/// Read-only view of a single accumulator state
pub struct AccumStateView<'a> {
    data: ArrayView1<'a, f64>,
}

impl<'a> AccumStateView<'a> {
    pub fn from_array_view(data: ArrayView1<'a, f64>) -> Self {
        Self { data }
    }

    pub fn from_contiguous_slice(data: &'a [f64]) -> Self {
        Self {
            data: ArrayView1::from(data),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Index<usize> for AccumStateView<'_> {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.data[i]
    }
}

/// Mutable view of a single accumulator state
pub struct AccumStateViewMut<'a> {
    data: ArrayViewMut1<'a, f64>,
}

impl<'a> AccumStateViewMut<'a> {
    pub fn from_array_view(data: ArrayViewMut1<'a, f64>) -> Self {
        Self { data }
    }

    pub fn from_contiguous_slice(data: &'a mut [f64]) -> Self {
        Self {
            data: ArrayViewMut1::from(data),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl Index<usize> for AccumStateViewMut<'_> {
    type Output = f64;

    fn index(&self, i: usize) -> &f64 {
        &self.data[i]
    }
}

impl IndexMut<usize> for AccumStateViewMut<'_> {
    fn index_mut(&mut self, i: usize) -> &mut f64 {
        &mut self.data[i]
    }
}

/// Represents a collection of Accumulator States
///
/// Each column holds the state of one accumulator, so the wrapped array has
/// the shape `[state_size, n_states]`. In this crate there is one
/// accumulator per lag of a region of interest.
///
/// # Note
/// There is some benefit to defining this even though it wraps ArrayViewMut2
/// since it helps contain all references to the ndarray package to a single
/// file.
pub struct StatePackViewMut<'a> {
    data: ArrayViewMut2<'a, f64>,
}

impl<'a> StatePackViewMut<'a> {
    pub fn from_array_view(array_view: ArrayViewMut2<'a, f64>) -> Self {
        Self { data: array_view }
    }

    pub fn get_state(&self, i: usize) -> AccumStateView<'_> {
        AccumStateView::from_array_view(self.data.index_axis(Axis(1), i))
    }

    pub fn get_state_mut(&mut self, i: usize) -> AccumStateViewMut<'_> {
        AccumStateViewMut::from_array_view(self.data.index_axis_mut(Axis(1), i))
    }

    pub fn state_size(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn n_states(&self) -> usize {
        self.data.len_of(Axis(1))
    }
}

/// Read-only counterpart of [`StatePackViewMut`]
pub struct StatePackView<'a> {
    data: ArrayView2<'a, f64>,
}

impl<'a> StatePackView<'a> {
    pub fn from_array_view(array_view: ArrayView2<'a, f64>) -> Self {
        Self { data: array_view }
    }

    pub fn get_state(&self, i: usize) -> AccumStateView<'_> {
        AccumStateView::from_array_view(self.data.index_axis(Axis(1), i))
    }

    pub fn state_size(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn n_states(&self) -> usize {
        self.data.len_of(Axis(1))
    }
}
