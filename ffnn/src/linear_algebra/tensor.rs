use std::fmt;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

use rand::distributions::Distribution;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::{Shape, Value, ValueType};

/// A dense, row-major array of values with a runtime shape.
#[derive(Clone, Deserialize, PartialEq, Serialize)]
#[serde(try_from = "TensorData")]
pub struct Tensor {
    shape: Shape,
    values: Vec<Value>,
}

#[derive(Deserialize)]
struct TensorData {
    shape: Shape,
    values: Vec<Value>,
}

impl TryFrom<TensorData> for Tensor {
    type Error = Error;

    fn try_from(data: TensorData) -> Result<Self> {
        Self::from_values(data.shape, data.values)
    }
}

impl Tensor {
    pub fn zeros(shape: impl Into<Shape>) -> Self {
        Self::full(shape, Value::ZERO)
    }

    pub fn ones(shape: impl Into<Shape>) -> Self {
        Self::full(shape, Value::ONE)
    }

    pub fn full(shape: impl Into<Shape>, value: Value) -> Self {
        let shape = shape.into();
        let values = vec![value; shape.element_count()];
        Self { shape, values }
    }

    pub fn from_values(shape: impl Into<Shape>, values: Vec<Value>) -> Result<Self> {
        let shape = shape.into();
        let Some(expected) = shape.checked_element_count() else {
            return Err(Error::ShapeOverflow { shape });
        };
        if values.len() != expected {
            return Err(Error::ElementCountMismatch {
                shape,
                expected,
                got: values.len(),
            });
        }
        Ok(Self { shape, values })
    }

    /// Fills a tensor of the given shape with samples from `distribution`.
    pub fn random<R, D>(shape: impl Into<Shape>, distribution: &D, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
        D: Distribution<Value>,
    {
        let shape = shape.into();
        let values = (0..shape.element_count())
            .map(|_| distribution.sample(rng))
            .collect();
        Self { shape, values }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn rank(&self) -> usize {
        self.shape.rank()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut Value> {
        self.values.iter_mut()
    }

    pub fn as_slice(&self) -> &[Value] {
        &self.values
    }

    /// Returns the value at a multi-dimensional index, if it is in bounds.
    pub fn get(&self, index: &[usize]) -> Option<Value> {
        if index.len() != self.rank() {
            return None;
        }

        let mut offset = 0;
        for (&i, &dim) in index.iter().zip(self.shape.iter()) {
            if i >= dim {
                return None;
            }
            offset = offset * dim + i;
        }

        self.values.get(offset).copied()
    }

    pub fn sum(&self) -> Value {
        self.values.iter().sum()
    }

    /// Applies `f` to every value.
    pub fn map(&self, f: impl Fn(Value) -> Value) -> Self {
        Self {
            shape: self.shape.clone(),
            values: self.values.iter().map(|&x| f(x)).collect(),
        }
    }

    /// Combines two tensors of identical shape value by value.
    pub fn zip_map(&self, other: &Self, f: impl Fn(Value, Value) -> Value) -> Result<Self> {
        other.require_shape(&self.shape)?;
        Ok(Self {
            shape: self.shape.clone(),
            values: self
                .values
                .iter()
                .zip(&other.values)
                .map(|(&a, &b)| f(a, b))
                .collect(),
        })
    }

    pub fn require_shape(&self, expected: &Shape) -> Result<()> {
        if &self.shape != expected {
            return Err(Error::ShapeMismatch {
                expected: expected.clone(),
                got: self.shape.clone(),
            });
        }
        Ok(())
    }

    pub fn require_rank(&self, expected: usize) -> Result<()> {
        if self.rank() != expected {
            return Err(Error::RankMismatch {
                expected,
                got: self.rank(),
            });
        }
        Ok(())
    }

    fn matrix_dims(&self) -> Result<(usize, usize)> {
        self.require_rank(2)?;
        Ok((self.shape[0], self.shape[1]))
    }

    /// Matrix product of two rank 2 tensors.
    pub fn matmul(&self, rhs: &Self) -> Result<Self> {
        let (rows, inner) = self.matrix_dims()?;
        let (rhs_inner, columns) = rhs.matrix_dims()?;
        if inner != rhs_inner {
            return Err(Error::MatmulShapeMismatch {
                left: self.shape.clone(),
                right: rhs.shape.clone(),
            });
        }

        let mut result = Self::zeros((rows, columns));
        for row in 0..rows {
            let output = &mut result.values[row * columns..(row + 1) * columns];
            for k in 0..inner {
                let a = self.values[row * inner + k];
                let rhs_row = &rhs.values[k * columns..(k + 1) * columns];
                output
                    .iter_mut()
                    .zip(rhs_row)
                    .for_each(|(o, &b)| *o += a * b);
            }
        }
        Ok(result)
    }

    pub fn transpose(&self) -> Result<Self> {
        let (rows, columns) = self.matrix_dims()?;

        let mut result = Self::zeros((columns, rows));
        for row in 0..rows {
            for column in 0..columns {
                result.values[column * rows + row] = self.values[row * columns + column];
            }
        }
        Ok(result)
    }

    /// Sums a rank 2 tensor over its rows, leaving one value per column.
    pub fn sum_rows(&self) -> Result<Self> {
        let (_, columns) = self.matrix_dims()?;

        let mut result = Self::zeros(columns);
        if columns > 0 {
            for row in self.values.chunks(columns) {
                result
                    .values
                    .iter_mut()
                    .zip(row)
                    .for_each(|(sum, &x)| *sum += x);
            }
        }
        Ok(result)
    }

    /// Gathers the given entries along the leading dimension.
    ///
    /// # Panics
    ///
    /// Panics if the tensor is rank 0 or an index is out of bounds.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let stride = self.shape.row_stride();

        let mut dims = self.shape.to_vec();
        dims[0] = indices.len();

        let mut values = Vec::with_capacity(indices.len() * stride);
        for &index in indices {
            values.extend_from_slice(&self.values[index * stride..(index + 1) * stride]);
        }

        Self {
            shape: dims.into(),
            values,
        }
    }

    /// Takes entries `start..end` along the leading dimension, clamping `end` to its size.
    ///
    /// # Panics
    ///
    /// Panics if the tensor is rank 0.
    pub fn slice_rows(&self, start: usize, end: usize) -> Self {
        let stride = self.shape.row_stride();

        let end = end.min(self.shape[0]);
        let start = start.min(end);

        let mut dims = self.shape.to_vec();
        dims[0] = end - start;

        Self {
            shape: dims.into(),
            values: self.values[start * stride..end * stride].to_vec(),
        }
    }

    /// Applies `op` against `rhs`, either value by value when the shapes are equal, or by
    /// broadcasting a rank 1 `rhs` over every row when it matches the innermost dimension.
    fn broadcast_assign(&mut self, rhs: &Self, op: impl Fn(&mut Value, Value)) {
        if self.shape == rhs.shape {
            self.values
                .iter_mut()
                .zip(&rhs.values)
                .for_each(|(x, &y)| op(x, y));
        } else if rhs.rank() == 1 && self.rank() > 1 && self.shape.trailing() == rhs.shape.trailing()
        {
            if rhs.values.is_empty() {
                return;
            }
            for row in self.values.chunks_mut(rhs.values.len()) {
                row.iter_mut()
                    .zip(&rhs.values)
                    .for_each(|(x, &y)| op(x, y));
            }
        } else {
            panic!(
                "incompatible shapes for elementwise operation: {} and {}",
                self.shape, rhs.shape
            );
        }
    }
}

macro_rules! value_op_impl {
    ($op:ident, $op_method:ident, $op_assign:ident, $op_assign_method:ident) => {
        impl $op<Value> for Tensor {
            type Output = Tensor;

            fn $op_method(mut self, rhs: Value) -> Self::Output {
                self.$op_assign_method(rhs);
                self
            }
        }

        impl $op<Value> for &Tensor {
            type Output = Tensor;

            fn $op_method(self, rhs: Value) -> Self::Output {
                self.clone().$op_method(rhs)
            }
        }

        impl $op_assign<Value> for Tensor {
            fn $op_assign_method(&mut self, rhs: Value) {
                self.values
                    .iter_mut()
                    .for_each(|x| x.$op_assign_method(rhs));
            }
        }
    };
}

value_op_impl!(Add, add, AddAssign, add_assign);
value_op_impl!(Sub, sub, SubAssign, sub_assign);
value_op_impl!(Mul, mul, MulAssign, mul_assign);
value_op_impl!(Div, div, DivAssign, div_assign);

// Elementwise operations between tensors.
//
// # Panics
//
// Panics unless the shapes are equal, or the right hand side is a rank 1 tensor matching the
// innermost dimension of the left hand side.
macro_rules! tensor_op_impl {
    ($op:ident, $op_method:ident, $op_assign:ident, $op_assign_method:ident) => {
        impl $op<Tensor> for Tensor {
            type Output = Tensor;

            fn $op_method(mut self, rhs: Tensor) -> Self::Output {
                self.$op_assign_method(&rhs);
                self
            }
        }

        impl $op<&Tensor> for Tensor {
            type Output = Tensor;

            fn $op_method(mut self, rhs: &Tensor) -> Self::Output {
                self.$op_assign_method(rhs);
                self
            }
        }

        impl $op<Tensor> for &Tensor {
            type Output = Tensor;

            fn $op_method(self, rhs: Tensor) -> Self::Output {
                self.clone().$op_method(&rhs)
            }
        }

        impl $op<&Tensor> for &Tensor {
            type Output = Tensor;

            fn $op_method(self, rhs: &Tensor) -> Self::Output {
                self.clone().$op_method(rhs)
            }
        }

        impl $op_assign<Tensor> for Tensor {
            fn $op_assign_method(&mut self, rhs: Tensor) {
                self.$op_assign_method(&rhs)
            }
        }

        impl $op_assign<&Tensor> for Tensor {
            fn $op_assign_method(&mut self, rhs: &Tensor) {
                self.broadcast_assign(rhs, |x, y| x.$op_assign_method(y));
            }
        }
    };
}

tensor_op_impl!(Add, add, AddAssign, add_assign);
tensor_op_impl!(Sub, sub, SubAssign, sub_assign);
tensor_op_impl!(Mul, mul, MulAssign, mul_assign);
tensor_op_impl!(Div, div, DivAssign, div_assign);

impl Neg for Tensor {
    type Output = Tensor;

    fn neg(self) -> Self::Output {
        self * -Value::ONE
    }
}

impl Neg for &Tensor {
    type Output = Tensor;

    fn neg(self) -> Self::Output {
        self * -Value::ONE
    }
}

impl<const N: usize> From<[Value; N]> for Tensor {
    fn from(values: [Value; N]) -> Self {
        Self {
            shape: N.into(),
            values: values.to_vec(),
        }
    }
}

impl<const R: usize, const C: usize> From<[[Value; C]; R]> for Tensor {
    fn from(values: [[Value; C]; R]) -> Self {
        Self {
            shape: (R, C).into(),
            values: values.iter().flatten().copied().collect(),
        }
    }
}

impl From<Vec<Value>> for Tensor {
    fn from(values: Vec<Value>) -> Self {
        Self {
            shape: values.len().into(),
            values,
        }
    }
}

impl fmt::Debug for Tensor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.rank() {
            0 | 1 => {
                write!(f, "[")?;
                for (i, x) in self.values.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    x.fmt(f)?;
                }
                write!(f, "]")
            }
            2 => {
                let (rows, columns) = (self.shape[0], self.shape[1]);
                if rows == 0 {
                    return write!(f, "[]");
                }
                for row in 0..rows {
                    write!(f, "{}", if row == 0 { "[" } else { " " })?;
                    for column in 0..columns {
                        self.values[row * columns + column].fmt(f)?;
                        if column < columns - 1 {
                            write!(f, " ")?;
                        }
                    }
                    write!(f, "{}", if row < rows - 1 { "\n" } else { "]" })?;
                }
                Ok(())
            }
            _ => f
                .debug_struct("Tensor")
                .field("shape", &self.shape)
                .field("values", &self.values)
                .finish(),
        }
    }
}
