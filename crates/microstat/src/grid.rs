use microstat_nostd_internal::{FieldKind, check_shape, ravel_index, unravel_index};
use ndarray::{Array, ArrayD, ArrayViewD, Dimension, IxDyn};

use crate::error::Error;

/// Types that can be stored within a [`Grid`].
///
/// The implementations classify the values into [`FieldKind`]s, which is
/// used to reject nonsensical combinations of statistics and fields.
pub trait FieldValue: Copy + PartialEq + Default + Send + Sync + core::fmt::Debug + 'static {
    const KIND: FieldKind;

    fn to_f64(self) -> f64;

    /// everything other than the default value (`0` or `false`) is foreground
    #[inline(always)]
    fn is_foreground(self) -> bool {
        self != Self::default()
    }
}

impl FieldValue for bool {
    const KIND: FieldKind = FieldKind::Binary;

    #[inline(always)]
    fn to_f64(self) -> f64 {
        if self { 1.0 } else { 0.0 }
    }
}

macro_rules! impl_field_value {
    ($kind:expr; $($t:ty),*) => {
        $(
            impl FieldValue for $t {
                const KIND: FieldKind = $kind;

                #[inline(always)]
                fn to_f64(self) -> f64 {
                    self as f64
                }
            }
        )*
    };
}

impl_field_value!(FieldKind::Integer; i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
impl_field_value!(FieldKind::Scalar; f32, f64);

/// Specifies which axes of a grid are periodic
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Periodic {
    /// every axis wraps
    #[default]
    All,
    /// no axis wraps
    Bounded,
    /// one flag per axis
    Axes(Vec<bool>),
}

impl Periodic {
    /// expand into one flag per axis
    pub fn flags(&self, ndim: usize) -> Result<Vec<bool>, Error> {
        match self {
            Periodic::All => Ok(vec![true; ndim]),
            Periodic::Bounded => Ok(vec![false; ndim]),
            Periodic::Axes(flags) if flags.len() == 1 => Ok(vec![flags[0]; ndim]),
            Periodic::Axes(flags) if flags.len() == ndim => Ok(flags.clone()),
            Periodic::Axes(flags) => Err(Error::rank_mismatch("periodic flags", ndim, flags.len())),
        }
    }
}

impl From<bool> for Periodic {
    fn from(flag: bool) -> Self {
        if flag { Periodic::All } else { Periodic::Bounded }
    }
}

impl From<Vec<bool>> for Periodic {
    fn from(flags: Vec<bool>) -> Self {
        Periodic::Axes(flags)
    }
}

impl From<&[bool]> for Periodic {
    fn from(flags: &[bool]) -> Self {
        Periodic::Axes(flags.to_vec())
    }
}

impl<const N: usize> From<[bool; N]> for Periodic {
    fn from(flags: [bool; N]) -> Self {
        Periodic::Axes(flags.to_vec())
    }
}

/// An N-dimensional field with per-axis boundary semantics.
///
/// The values are stored contiguously in row-major order. A grid never holds
/// zero elements and is immutable once constructed: algorithms produce new
/// grids rather than modifying their inputs.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<T> {
    values: Vec<T>,
    shape: Vec<usize>,
    periodic: Vec<bool>,
}

/// A mask marks invalid cells with `true`
pub type Mask = Grid<bool>;

impl<T: FieldValue> Grid<T> {
    /// Build a grid from an ndarray array (of any dimensionality and memory
    /// layout)
    pub fn new<D: Dimension>(
        data: Array<T, D>,
        periodic: impl Into<Periodic>,
    ) -> Result<Self, Error> {
        let shape = data.shape().to_vec();
        // iteration follows the logical (row-major) order
        let values = data.iter().copied().collect();
        Self::from_shape_vec(&shape, values, periodic)
    }

    /// Build a grid from row-major values
    pub fn from_shape_vec(
        shape: &[usize],
        values: Vec<T>,
        periodic: impl Into<Periodic>,
    ) -> Result<Self, Error> {
        check_shape(shape).map_err(Error::internal_legacy_adhoc)?;
        let n_elements = shape.iter().product::<usize>();
        if values.len() != n_elements {
            return Err(Error::shape_mismatch("values", &[n_elements], &[values.len()]));
        }
        let periodic: Periodic = periodic.into();
        let periodic = periodic.flags(shape.len())?;
        Ok(Self {
            values,
            shape: shape.to_vec(),
            periodic,
        })
    }

    /// Build a grid where every cell holds `value`
    pub fn filled(shape: &[usize], value: T, periodic: impl Into<Periodic>) -> Result<Self, Error> {
        check_shape(shape).map_err(Error::internal_legacy_adhoc)?;
        let n_elements = shape.iter().product::<usize>();
        Self::from_shape_vec(shape, vec![value; n_elements], periodic)
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// total number of cells
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// always `false`, grids hold at least one cell
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn periodic(&self) -> &[bool] {
        &self.periodic
    }

    pub fn is_periodic(&self, axis: usize) -> bool {
        self.periodic[axis]
    }

    pub fn kind(&self) -> FieldKind {
        T::KIND
    }

    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    /// view the values as an ndarray array
    pub fn view(&self) -> ArrayViewD<'_, T> {
        // the constructors guarantee that the shape matches the storage
        ArrayViewD::from_shape(IxDyn(&self.shape), &self.values)
            .expect("grid shape is consistent with its storage")
    }

    pub fn to_array(&self) -> ArrayD<T> {
        self.view().to_owned()
    }

    /// the linear index of a multi-index, wrapping periodic axes. `None` if
    /// the index falls outside of a bounded axis.
    pub fn linear_index(&self, idx: &[isize]) -> Option<usize> {
        if idx.len() != self.ndim() {
            return None;
        }
        ravel_index(idx, &self.shape, &self.periodic)
    }

    pub fn multi_index(&self, linear: usize) -> Vec<isize> {
        let mut out = vec![0; self.ndim()];
        unravel_index(linear, &self.shape, &mut out);
        out
    }

    pub fn get(&self, idx: &[isize]) -> Option<T> {
        self.linear_index(idx).map(|i| self.values[i])
    }

    #[inline(always)]
    pub fn get_linear(&self, linear: usize) -> T {
        self.values[linear]
    }

    /// number of foreground cells
    pub fn count_foreground(&self) -> usize {
        self.values.iter().filter(|v| v.is_foreground()).count()
    }

    /// produce a new grid (with identical shape and boundary semantics) by
    /// applying `f` to every value
    pub fn map<U: FieldValue>(&self, f: impl Fn(T) -> U) -> Grid<U> {
        Grid {
            values: self.values.iter().map(|v| f(*v)).collect(),
            shape: self.shape.clone(),
            periodic: self.periodic.clone(),
        }
    }

    /// a copy of the grid with different boundary semantics
    pub fn with_periodic(&self, periodic: impl Into<Periodic>) -> Result<Grid<T>, Error> {
        let periodic: Periodic = periodic.into();
        Ok(Grid {
            values: self.values.clone(),
            shape: self.shape.clone(),
            periodic: periodic.flags(self.ndim())?,
        })
    }

    /// check that `other` (described by `what`) has the same shape as `self`
    pub(crate) fn require_same_shape<U>(
        &self,
        what: &'static str,
        other: &Grid<U>,
    ) -> Result<(), Error> {
        if self.shape != other.shape {
            Err(Error::shape_mismatch(what, &self.shape, &other.shape))
        } else {
            Ok(())
        }
    }

    pub(crate) fn from_parts(values: Vec<T>, shape: Vec<usize>, periodic: Vec<bool>) -> Self {
        debug_assert_eq!(values.len(), shape.iter().product::<usize>());
        Grid {
            values,
            shape,
            periodic,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, ShapeBuilder};

    #[test]
    fn construction() {
        let grid = Grid::from_shape_vec(&[2, 3], vec![1_u8, 0, 0, 0, 2, 0], false).unwrap();
        assert_eq!(grid.shape(), &[2, 3]);
        assert_eq!(grid.len(), 6);
        assert_eq!(grid.periodic(), &[false, false]);
        assert_eq!(grid.count_foreground(), 2);
        assert_eq!(grid.kind(), FieldKind::Integer);

        assert!(Grid::from_shape_vec(&[2, 3], vec![1_u8; 5], false).is_err());
        assert!(Grid::from_shape_vec(&[2, 0], Vec::<u8>::new(), false).is_err());
        assert!(Grid::filled(&[2, 2], 0.0, vec![true, false, true]).is_err());
    }

    #[test]
    fn column_major_input() {
        // the grid stores values in row-major order regardless of the input
        let arr = Array2::from_shape_vec((2, 3).f(), vec![1, 4, 2, 5, 3, 6]).unwrap();
        let grid = Grid::new(arr, true).unwrap();
        assert_eq!(grid.as_slice(), &[1, 2, 3, 4, 5, 6]);
        assert_eq!(grid.get(&[1, 0]), Some(4));
    }

    #[test]
    fn wrapped_access() {
        let grid =
            Grid::from_shape_vec(&[2, 3], vec![1, 2, 3, 4, 5, 6], vec![false, true]).unwrap();
        assert_eq!(grid.get(&[0, -1]), Some(3));
        assert_eq!(grid.get(&[1, 4]), Some(5));
        assert_eq!(grid.get(&[-1, 0]), None);
        assert_eq!(grid.get(&[0, 0, 0]), None);
        assert_eq!(grid.multi_index(4), vec![1, 1]);
        assert_eq!(grid.linear_index(&[1, 1]), Some(4));
    }

    #[test]
    fn mapping() {
        let grid = Grid::from_shape_vec(&[4], vec![0.5, 0.0, 2.0, 0.0], true).unwrap();
        let mask: Mask = grid.map(|v| v == 0.0);
        assert_eq!(mask.as_slice(), &[false, true, false, true]);
        assert_eq!(mask.periodic(), &[true]);
        assert_eq!(grid.view()[[2]], 2.0);
    }
}
