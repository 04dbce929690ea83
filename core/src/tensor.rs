//! 4D blob container: `(num, channels, height, width)` in row-major order.
//!
//! A `Blob` carries two equally shaped buffers: `data` for activations and
//! `diff` for gradients. Layers address both through [`Blob::offset`] and never
//! allocate storage except through [`Blob::reshape`].

use core::fmt::Debug;

use num_traits::Float;

use crate::error::{LayerError, LayerResult};

/// Floating-point element type a blob can hold.
///
/// Blanket-implemented for every `Float`, so `f32` and `f64` both work
/// without per-precision code.
pub trait Element: Float + Debug + Send + Sync + 'static {}

impl<T> Element for T where T: Float + Debug + Send + Sync + 'static {}

/// Blob shape, batch outermost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Shape {
    pub dims: [usize; 4],
}

impl Shape {
    pub const fn d4(n: usize, c: usize, h: usize, w: usize) -> Self {
        Self { dims: [n, c, h, w] }
    }

    /// A per-sample vector of `len` values stored in the channel axis.
    pub const fn vector(n: usize, len: usize) -> Self {
        Self::d4(n, len, 1, 1)
    }

    pub fn total(&self) -> usize {
        self.dims.iter().product()
    }

    /// Element count, or `None` when it does not fit in `usize`.
    pub fn checked_total(&self) -> Option<usize> {
        self.dims.iter().try_fold(1usize, |acc, &d| acc.checked_mul(d))
    }

    #[inline(always)]
    pub fn num(&self) -> usize {
        self.dims[0]
    }

    #[inline(always)]
    pub fn channels(&self) -> usize {
        self.dims[1]
    }

    #[inline(always)]
    pub fn height(&self) -> usize {
        self.dims[2]
    }

    #[inline(always)]
    pub fn width(&self) -> usize {
        self.dims[3]
    }

    /// Linear index of `(n, c, h, w)`.
    #[inline(always)]
    pub fn offset(&self, n: usize, c: usize, h: usize, w: usize) -> usize {
        ((n * self.channels() + c) * self.height() + h) * self.width() + w
    }
}

/// A dense 4D tensor with a gradient buffer of the same shape.
#[derive(Debug, Clone, PartialEq)]
pub struct Blob<T> {
    shape: Shape,
    data: Vec<T>,
    diff: Vec<T>,
}

impl<T: Element> Blob<T> {
    /// Create a zero-filled blob.
    pub fn new(n: usize, c: usize, h: usize, w: usize) -> Self {
        Self::with_shape(Shape::d4(n, c, h, w))
    }

    pub fn with_shape(shape: Shape) -> Self {
        let count = shape.total();
        Self {
            shape,
            data: vec![T::zero(); count],
            diff: vec![T::zero(); count],
        }
    }

    /// Create a blob from flat data. The gradient buffer starts zeroed.
    ///
    /// Returns error if `data.len()` differs from the shape's element count.
    pub fn from_data(shape: Shape, data: Vec<T>) -> LayerResult<Self> {
        if data.len() != shape.total() {
            return Err(LayerError::InvalidInputLength {
                expected: shape.total(),
                actual: data.len(),
            });
        }
        let diff = vec![T::zero(); data.len()];
        Ok(Self { shape, data, diff })
    }

    /// Reallocate both buffers for a new shape.
    ///
    /// Prior contents are discarded; data and diff are zero-filled.
    pub fn reshape(&mut self, n: usize, c: usize, h: usize, w: usize) {
        self.reshape_like(Shape::d4(n, c, h, w));
    }

    pub fn reshape_like(&mut self, shape: Shape) {
        let count = shape.total();
        self.shape = shape;
        self.data.clear();
        self.data.resize(count, T::zero());
        self.diff.clear();
        self.diff.resize(count, T::zero());
    }

    #[inline(always)]
    pub fn shape(&self) -> Shape {
        self.shape
    }

    #[inline(always)]
    pub fn num(&self) -> usize {
        self.shape.num()
    }

    #[inline(always)]
    pub fn channels(&self) -> usize {
        self.shape.channels()
    }

    #[inline(always)]
    pub fn height(&self) -> usize {
        self.shape.height()
    }

    #[inline(always)]
    pub fn width(&self) -> usize {
        self.shape.width()
    }

    /// Total number of elements.
    #[inline(always)]
    pub fn count(&self) -> usize {
        self.data.len()
    }

    #[inline(always)]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Linear index of `(n, c, h, w)` into `data` and `diff`.
    #[inline(always)]
    pub fn offset(&self, n: usize, c: usize, h: usize, w: usize) -> usize {
        self.shape.offset(n, c, h, w)
    }

    #[inline(always)]
    pub fn data(&self) -> &[T] {
        &self.data
    }

    #[inline(always)]
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    #[inline(always)]
    pub fn diff(&self) -> &[T] {
        &self.diff
    }

    #[inline(always)]
    pub fn diff_mut(&mut self) -> &mut [T] {
        &mut self.diff
    }

    /// Overwrite the gradient buffer from a flat slice.
    pub fn set_diff(&mut self, diff: &[T]) -> LayerResult<()> {
        if diff.len() != self.diff.len() {
            return Err(LayerError::InvalidInputLength {
                expected: self.diff.len(),
                actual: diff.len(),
            });
        }
        self.diff.copy_from_slice(diff);
        Ok(())
    }

    /// Fill the gradient buffer with one value.
    pub fn fill_diff(&mut self, value: T) {
        self.diff.iter_mut().for_each(|d| *d = value);
    }
}
