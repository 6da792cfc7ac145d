use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// The dimension sizes of a [`Tensor`](super::Tensor), outermost first.
#[derive(Clone, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Shape(Vec<usize>);

impl Shape {
    pub fn dims(&self) -> &[usize] {
        &self.0
    }

    pub fn rank(&self) -> usize {
        self.0.len()
    }

    /// The number of values a tensor of this shape holds.
    ///
    /// # Panics
    ///
    /// Panics if the count does not fit in a `usize`.
    pub fn element_count(&self) -> usize {
        self.checked_element_count()
            .unwrap_or_else(|| panic!("element count of shape {self} overflows"))
    }

    /// The number of values a tensor of this shape holds, or `None` on overflow.
    pub fn checked_element_count(&self) -> Option<usize> {
        self.0.iter().try_fold(1usize, |n, &dim| n.checked_mul(dim))
    }

    /// The size of the leading (batch) dimension, if there is one.
    pub fn leading(&self) -> Option<usize> {
        self.0.first().copied()
    }

    /// The size of the innermost dimension, if there is one.
    pub fn trailing(&self) -> Option<usize> {
        self.0.last().copied()
    }

    /// The number of values covered by one step along the leading dimension.
    pub fn row_stride(&self) -> usize {
        self.0.iter().skip(1).product()
    }
}

impl Deref for Shape {
    type Target = [usize];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self(dims.to_vec())
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self(dims.to_vec())
    }
}

impl From<usize> for Shape {
    fn from(length: usize) -> Self {
        Self(vec![length])
    }
}

impl From<(usize, usize)> for Shape {
    fn from((rows, columns): (usize, usize)) -> Self {
        Self(vec![rows, columns])
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, dim) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{dim}")?;
        }
        write!(f, "]")
    }
}

impl fmt::Debug for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
