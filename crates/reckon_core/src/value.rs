//! Live values and the result shapes the compute callable may produce.

use nalgebra::DMatrix;
use num_complex::Complex;

/// A live input value. Scalars hold whatever the widget last produced,
/// including NaN for unparseable text; matrices are always fully numeric.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Scalar(f64),
    Matrix(DMatrix<f64>),
}

impl Value {
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Value::Scalar(value) => Some(*value),
            Value::Matrix(_) => None,
        }
    }

    pub fn as_matrix(&self) -> Option<&DMatrix<f64>> {
        match self {
            Value::Scalar(_) => None,
            Value::Matrix(matrix) => Some(matrix),
        }
    }

    /// Matrix content as rows, for the host boundary. `None` for scalars.
    pub fn to_rows(&self) -> Option<Vec<Vec<f64>>> {
        self.as_matrix().map(matrix_rows)
    }
}

/// Row-major copy of a matrix, for serialization at the host boundary.
pub fn matrix_rows(matrix: &DMatrix<f64>) -> Vec<Vec<f64>> {
    (0..matrix.nrows())
        .map(|i| (0..matrix.ncols()).map(|j| matrix[(i, j)]).collect())
        .collect()
}

/// A complex number flattened into a plain serializable pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComplexNumber {
    pub re: f64,
    pub im: f64,
}

impl ComplexNumber {
    pub fn real(re: f64) -> Self {
        Self { re, im: 0.0 }
    }
}

impl From<Complex<f64>> for ComplexNumber {
    fn from(value: Complex<f64>) -> Self {
        Self {
            re: value.re,
            im: value.im,
        }
    }
}

/// One eigenvalue with its eigenvector. The vector may be empty when the
/// producer supplied values only.
#[derive(Debug, Clone, PartialEq)]
pub struct EigenPair {
    pub value: ComplexNumber,
    pub vector: Vec<ComplexNumber>,
}

impl EigenPair {
    pub fn from_complex(value: Complex<f64>, vector: Vec<Complex<f64>>) -> Self {
        Self {
            value: ComplexNumber::from(value),
            vector: vector.into_iter().map(ComplexNumber::from).collect(),
        }
    }
}

/// A value produced by the compute callable.
///
/// The callable is free-form host code; these are the shapes the engine
/// knows how to render. Anything else becomes [`Computed::Unsupported`] and
/// renders as a marker instead of failing the whole recompute.
#[derive(Debug, Clone, PartialEq)]
pub enum Computed {
    Scalar(f64),
    Vector(Vec<f64>),
    Matrix(DMatrix<f64>),
    Eigen(Vec<EigenPair>),
    Text(String),
    Unsupported,
}
