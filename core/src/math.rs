//! Bulk element-wise primitives over contiguous slices.
//!
//! These are the three building blocks the volume layers need: a block copy,
//! a two-operand sum written to a third buffer, and `y += alpha * x`.
//! All of them check slice lengths up front and never index out of range.

use crate::error::{LayerError, LayerResult};
use crate::tensor::Element;

#[inline]
fn check_len(expected: usize, actual: usize) -> LayerResult<()> {
    if expected != actual {
        return Err(LayerError::DimensionMismatch { expected, actual });
    }
    Ok(())
}

/// `y[i] = x[i]`.
pub fn copy<T: Element>(x: &[T], y: &mut [T]) -> LayerResult<()> {
    check_len(x.len(), y.len())?;
    y.copy_from_slice(x);
    Ok(())
}

/// `y[i] = a[i] + b[i]`.
///
/// `y` is overwritten, not accumulated into.
pub fn add<T: Element>(a: &[T], b: &[T], y: &mut [T]) -> LayerResult<()> {
    check_len(a.len(), b.len())?;
    check_len(a.len(), y.len())?;
    for ((out, &lhs), &rhs) in y.iter_mut().zip(a).zip(b) {
        *out = lhs + rhs;
    }
    Ok(())
}

/// `y[i] += alpha * x[i]`.
pub fn axpy<T: Element>(alpha: T, x: &[T], y: &mut [T]) -> LayerResult<()> {
    check_len(x.len(), y.len())?;
    if alpha == T::one() {
        for (out, &v) in y.iter_mut().zip(x) {
            *out = *out + v;
        }
    } else {
        for (out, &v) in y.iter_mut().zip(x) {
            *out = *out + alpha * v;
        }
    }
    Ok(())
}
