//! Tensor type used for classifier inputs and outputs.
//!
//! Nothing fancy: a contiguous, row-major N-dimensional array of `f32`, which is all the two
//! classifier models deal in (`[1, 42]` and `[1, 30, 1662]` in, `[1, classes]` out).

use std::fmt;

use tinyvec::TinyVec;

/// A dynamically shaped tensor of `f32` values.
#[derive(Clone, PartialEq)]
pub struct Tensor {
    shape: TinyVec<[usize; 4]>,
    data: Box<[f32]>,
}

impl Tensor {
    /// Creates a tensor of the given shape by pulling elements from an iterator.
    ///
    /// # Panics
    ///
    /// `iter` must yield exactly as many elements as `shape` implies (the product of all its
    /// entries), otherwise this method panics.
    pub fn from_iter<I: IntoIterator<Item = f32>>(shape: &[usize], iter: I) -> Self {
        let data: Box<[f32]> = iter.into_iter().collect();
        let expected: usize = shape.iter().product();
        assert_eq!(
            data.len(),
            expected,
            "shape {shape:?} needs {expected} elements",
        );
        Self {
            shape: TinyVec::from(shape),
            data,
        }
    }

    /// Returns the shape of this tensor: the number of entries in each dimension.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the number of dimensions of this tensor.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Indexes into the outermost dimension, returning a view one rank lower.
    ///
    /// # Panics
    ///
    /// Panics on a 0-dimensional tensor or an out-of-bounds index.
    #[track_caller]
    pub fn index(&self, index: usize) -> TensorView<'_> {
        TensorView {
            shape: &self.shape,
            data: &self.data,
        }
        .index(index)
    }

    /// Returns the values of a 1-dimensional tensor as a slice.
    ///
    /// # Panics
    ///
    /// `self` must have exactly 1 dimension, otherwise this method panics.
    #[track_caller]
    pub fn as_slice(&self) -> &[f32] {
        assert_eq!(
            self.rank(),
            1,
            "attempted to access tensor of shape {:?} as slice",
            self.shape()
        );
        &self.data
    }

    pub(super) fn from_tract(tract: &tract_onnx::prelude::Tensor) -> Self {
        Self {
            shape: TinyVec::from(tract.shape()),
            data: tract.as_slice::<f32>().unwrap().into(),
        }
    }

    pub(super) fn to_tract(&self) -> tract_onnx::prelude::Tensor {
        tract_onnx::prelude::Tensor::from_shape(self.shape(), &self.data).unwrap()
    }
}

/// A borrowed view into a suffix of a [`Tensor`].
#[derive(Clone, Copy)]
pub struct TensorView<'a> {
    shape: &'a [usize],
    data: &'a [f32],
}

impl<'a> TensorView<'a> {
    /// Returns the shape of this view.
    pub fn shape(&self) -> &[usize] {
        self.shape
    }

    /// Returns the number of dimensions of this view.
    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Indexes into the outermost dimension, returning a view one rank lower.
    ///
    /// # Panics
    ///
    /// Panics on a 0-dimensional view or an out-of-bounds index.
    #[track_caller]
    pub fn index(&self, index: usize) -> TensorView<'a> {
        assert!(
            self.rank() > 0,
            "attempted to index 0-dimensional tensor view"
        );
        assert!(
            index < self.shape[0],
            "index {index} out of bounds for view of shape {:?}",
            self.shape,
        );
        let stride: usize = self.shape[1..].iter().product();
        TensorView {
            shape: &self.shape[1..],
            data: &self.data[index * stride..(index + 1) * stride],
        }
    }

    /// Returns the values of a 1-dimensional view as a slice.
    ///
    /// # Panics
    ///
    /// `self` must have exactly 1 dimension, otherwise this method panics.
    #[track_caller]
    pub fn as_slice(&self) -> &'a [f32] {
        assert_eq!(
            self.rank(),
            1,
            "attempted to access tensor view of shape {:?} as slice",
            self.shape
        );
        self.data
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tensor")
            .field("shape", &self.shape())
            .finish()
    }
}

impl fmt::Debug for TensorView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TensorView")
            .field("shape", &self.shape())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_iter_checks_element_count() {
        let tensor = Tensor::from_iter(&[2, 3], (0..6).map(|v| v as f32));
        assert_eq!(tensor.shape(), &[2, 3]);
        assert_eq!(tensor.rank(), 2);
    }

    #[test]
    #[should_panic]
    fn from_iter_rejects_wrong_count() {
        Tensor::from_iter(&[2, 3], (0..5).map(|v| v as f32));
    }

    #[test]
    fn outermost_indexing() {
        let tensor = Tensor::from_iter(&[2, 3], (0..6).map(|v| v as f32));
        assert_eq!(tensor.index(0).as_slice(), &[0.0, 1.0, 2.0]);
        assert_eq!(tensor.index(1).as_slice(), &[3.0, 4.0, 5.0]);
    }

    #[test]
    fn nested_indexing() {
        let tensor = Tensor::from_iter(&[1, 2, 2], (0..4).map(|v| v as f32));
        let inner = tensor.index(0);
        assert_eq!(inner.shape(), &[2, 2]);
        assert_eq!(inner.index(1).as_slice(), &[2.0, 3.0]);
    }

    #[test]
    #[should_panic]
    fn slice_access_requires_rank_one() {
        let tensor = Tensor::from_iter(&[2, 2], (0..4).map(|v| v as f32));
        tensor.as_slice();
    }
}
