//! Index arithmetic for row-major N-dimensional grids.
//!
//! Everything in this module operates on plain slices so that it can be used
//! without an allocator. Multi-indices are signed because we routinely add
//! (possibly negative) lag offsets to them before deciding whether the result
//! wraps around a periodic axis or falls off a bounded one.

/// Check that a shape describes a non-empty grid
pub fn check_shape(shape: &[usize]) -> Result<(), &'static str> {
    if shape.is_empty() {
        Err("shape must have at least 1 axis")
    } else if shape.contains(&0) {
        Err("shape must not hold 0")
    } else {
        Ok(())
    }
}

/// the number of elements in a grid with the specified shape
pub fn n_elements(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Map `coord` onto an axis with `len` elements.
///
/// Returns `None` when the axis is bounded and `coord` lies outside of
/// `[0, len)`. On a periodic axis, any value is wrapped (this includes
/// coordinates that are many periods away, which happens when a region of
/// interest is larger than the grid).
#[inline(always)]
pub fn wrap_coord(coord: isize, len: usize, periodic: bool) -> Option<usize> {
    let len = len as isize;
    if (0..len).contains(&coord) {
        Some(coord as usize)
    } else if periodic {
        Some(coord.rem_euclid(len) as usize)
    } else {
        None
    }
}

/// Convert a multi-index into a linear (row-major) index.
///
/// Each component is passed through [`wrap_coord`], so this returns `None` if
/// any component lies outside a bounded axis.
///
/// # Assumptions
/// `idx`, `shape` and `periodic` all have the same length
#[inline]
pub fn ravel_index(idx: &[isize], shape: &[usize], periodic: &[bool]) -> Option<usize> {
    let mut linear = 0;
    for ((&i, &len), &p) in idx.iter().zip(shape).zip(periodic) {
        linear = linear * len + wrap_coord(i, len, p)?;
    }
    Some(linear)
}

/// Convert a linear (row-major) index into a multi-index, which is written
/// into `out`
pub fn unravel_index(linear: usize, shape: &[usize], out: &mut [isize]) {
    let mut rem = linear;
    for (o, &len) in out.iter_mut().zip(shape).rev() {
        *o = (rem % len) as isize;
        rem /= len;
    }
}

/// Advance `idx` to the next multi-index in row-major order.
///
/// Returns `false` once the iteration is exhausted (at which point `idx` has
/// been reset to all zeros).
pub fn next_index(idx: &mut [isize], shape: &[usize]) -> bool {
    for (i, &len) in idx.iter_mut().zip(shape).rev() {
        *i += 1;
        if (*i as usize) < len {
            return true;
        }
        *i = 0;
    }
    false
}

/// The amount of padding on the low and high side of an axis with `len`
/// elements, relative to the central element.
///
/// For odd lengths the padding is symmetric. For even lengths the extra
/// element ends up on the high side, so the "center" sits at index `len/2 - 1`.
pub fn pad_width(len: usize) -> [usize; 2] {
    if len % 2 == 1 {
        [(len - 1) / 2, (len - 1) / 2]
    } else if len == 0 {
        [0, 0]
    } else {
        [len / 2 - 1, len / 2]
    }
}
