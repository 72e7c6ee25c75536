// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Quantum operators and the named gate set.

use ndarray::{array, Array2};
use num_complex::Complex64;
use std::fmt;

use super::linalg::{self, CMatrix, ATOL};
use crate::error::QStateError;

/// Immutable named matrix acting on `num_qubits` qubits.
///
/// Unitarity and hermiticity are computed once at construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Operator {
    name: String,
    matrix: CMatrix,
    num_qubits: usize,
    unitary: bool,
    hermitian: bool,
}

impl Operator {
    /// Create an operator. The matrix must be square with a power-of-two
    /// dimension of at least 2.
    pub fn new(name: impl Into<String>, matrix: CMatrix) -> Result<Self, QStateError> {
        let (rows, cols) = matrix.dim();
        if rows != cols {
            return Err(QStateError::InvalidOperator(format!(
                "matrix must be square, got {}x{}",
                rows, cols
            )));
        }
        if rows < 2 || !rows.is_power_of_two() {
            return Err(QStateError::InvalidOperator(format!(
                "dimension {} is not a power of two >= 2",
                rows
            )));
        }
        Ok(Self::from_parts(name.into(), matrix))
    }

    fn from_parts(name: String, matrix: CMatrix) -> Self {
        let num_qubits = matrix.nrows().trailing_zeros() as usize;
        let unitary = linalg::is_unitary(&matrix, ATOL);
        let hermitian = linalg::is_hermitian(&matrix, ATOL);
        Self {
            name,
            matrix,
            num_qubits,
            unitary,
            hermitian,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matrix(&self) -> &CMatrix {
        &self.matrix
    }

    pub fn num_qubits(&self) -> usize {
        self.num_qubits
    }

    pub fn dim(&self) -> usize {
        self.matrix.nrows()
    }

    pub fn is_unitary(&self) -> bool {
        self.unitary
    }

    pub fn is_hermitian(&self) -> bool {
        self.hermitian
    }

    /// Matrix product `self · other`.
    pub fn product(&self, other: &Operator) -> Result<Operator, QStateError> {
        if self.dim() != other.dim() {
            return Err(QStateError::DimensionMismatch {
                expected: self.dim(),
                actual: other.dim(),
            });
        }
        Ok(Self::from_parts(
            format!("{}*{}", self.name, other.name),
            self.matrix.dot(&other.matrix),
        ))
    }

    /// Kronecker product `self ⊗ other`; `self` acts on the leading qubits.
    pub fn tensor(&self, other: &Operator) -> Operator {
        Self::from_parts(
            format!("{}^{}", self.name, other.name),
            linalg::kron(&self.matrix, &other.matrix),
        )
    }

    /// Controlled version with the control as the new first qubit:
    /// identity on the |0⟩ block, `self` on the |1⟩ block.
    pub fn ctrl(&self) -> Operator {
        let d = self.dim();
        let mut m = Array2::zeros((2 * d, 2 * d));
        for i in 0..d {
            m[[i, i]] = Complex64::new(1.0, 0.0);
        }
        m.slice_mut(ndarray::s![d.., d..]).assign(&self.matrix);
        Self::from_parts(format!("C{}", self.name), m)
    }

    pub fn dagger(&self) -> Operator {
        Self::from_parts(
            format!("{}^dag", self.name),
            linalg::conjugate_transpose(&self.matrix),
        )
    }

    pub fn scale(&self, factor: Complex64) -> Operator {
        Self::from_parts(
            format!("({})*{}", factor, self.name),
            self.matrix.mapv(|z| z * factor),
        )
    }

    pub fn add(&self, other: &Operator) -> Result<Operator, QStateError> {
        if self.dim() != other.dim() {
            return Err(QStateError::DimensionMismatch {
                expected: self.dim(),
                actual: other.dim(),
            });
        }
        Ok(Self::from_parts(
            format!("{}+{}", self.name, other.name),
            &self.matrix + &other.matrix,
        ))
    }

    /// Projectors onto the eigenvectors of a single-qubit observable, for
    /// the larger eigenvalue first.
    pub fn projectors(&self) -> Result<[Operator; 2], QStateError> {
        let [(_, v0), (_, v1)] = self.eigenbasis()?;
        let proj = |v: [Complex64; 2], k: usize| {
            let m = array![
                [v[0] * v[0].conj(), v[0] * v[1].conj()],
                [v[1] * v[0].conj(), v[1] * v[1].conj()]
            ];
            Self::from_parts(format!("P{}[{}]", k, self.name), m)
        };
        Ok([proj(v0, 0), proj(v1, 1)])
    }

    /// Eigenvalues and eigenvectors of a non-degenerate single-qubit
    /// observable, largest eigenvalue first.
    pub(crate) fn eigenbasis(&self) -> Result<[(f64, [Complex64; 2]); 2], QStateError> {
        if self.num_qubits != 1 || !self.hermitian {
            return Err(QStateError::InvalidOperator(format!(
                "{} is not a single-qubit Hermitian observable",
                self.name
            )));
        }
        linalg::eigh_2x2(&self.matrix).ok_or_else(|| {
            QStateError::InvalidOperator(format!("observable {} is degenerate", self.name))
        })
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Operator({}, {} qubits)", self.name, self.num_qubits)
    }
}

/// Named gates.
pub mod ops {
    use super::*;
    use std::f64::consts::{FRAC_1_SQRT_2, FRAC_PI_4};

    fn c(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    fn named(name: &str, matrix: CMatrix) -> Operator {
        Operator::from_parts(name.to_string(), matrix)
    }

    pub fn i() -> Operator {
        named("I", linalg::identity(2))
    }

    pub fn x() -> Operator {
        named("X", array![[c(0.0, 0.0), c(1.0, 0.0)], [c(1.0, 0.0), c(0.0, 0.0)]])
    }

    pub fn y() -> Operator {
        named("Y", array![[c(0.0, 0.0), c(0.0, -1.0)], [c(0.0, 1.0), c(0.0, 0.0)]])
    }

    pub fn z() -> Operator {
        named("Z", array![[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(-1.0, 0.0)]])
    }

    pub fn h() -> Operator {
        let s = FRAC_1_SQRT_2;
        named("H", array![[c(s, 0.0), c(s, 0.0)], [c(s, 0.0), c(-s, 0.0)]])
    }

    pub fn s() -> Operator {
        named("S", array![[c(1.0, 0.0), c(0.0, 0.0)], [c(0.0, 0.0), c(0.0, 1.0)]])
    }

    pub fn t() -> Operator {
        named(
            "T",
            array![
                [c(1.0, 0.0), c(0.0, 0.0)],
                [c(0.0, 0.0), Complex64::from_polar(1.0, FRAC_PI_4)]
            ],
        )
    }

    pub fn cnot() -> Operator {
        named("CNOT", x().ctrl().matrix)
    }

    pub fn cz() -> Operator {
        named("CZ", z().ctrl().matrix)
    }

    pub fn swap() -> Operator {
        let o = c(0.0, 0.0);
        let l = c(1.0, 0.0);
        named(
            "SWAP",
            array![[l, o, o, o], [o, o, l, o], [o, l, o, o], [o, o, o, l]],
        )
    }

    /// exp(-iθ/2 n·σ) about `axis = (nx, ny, nz)`; the axis is normalized.
    pub fn rotation(angle: f64, axis: [f64; 3]) -> Result<Operator, QStateError> {
        let len = axis.iter().map(|a| a * a).sum::<f64>().sqrt();
        if len < ATOL {
            return Err(QStateError::InvalidOperator(
                "rotation axis must be non-zero".into(),
            ));
        }
        let [nx, ny, nz] = axis.map(|a| a / len);
        let (sin, cos) = (angle / 2.0).sin_cos();
        let m = array![
            [c(cos, -sin * nz), c(-sin * ny, -sin * nx)],
            [c(sin * ny, -sin * nx), c(cos, sin * nz)]
        ];
        Ok(named(&format!("R({:.4},[{},{},{}])", angle, nx, ny, nz), m))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_new_rejects_bad_shapes() {
        assert!(matches!(
            Operator::new("bad", Array2::zeros((2, 3))),
            Err(QStateError::InvalidOperator(_))
        ));
        assert!(Operator::new("bad", Array2::zeros((3, 3))).is_err());
        assert!(Operator::new("bad", Array2::zeros((1, 1))).is_err());
        let op = Operator::new("zero", Array2::zeros((4, 4))).unwrap();
        assert_eq!(op.num_qubits(), 2);
        assert!(!op.is_unitary());
    }

    #[test]
    fn test_gate_flags() {
        for op in [ops::i(), ops::x(), ops::y(), ops::z(), ops::h()] {
            assert!(op.is_unitary(), "{} should be unitary", op.name());
            assert!(op.is_hermitian(), "{} should be hermitian", op.name());
        }
        assert!(ops::s().is_unitary());
        assert!(!ops::s().is_hermitian());
        assert!(ops::t().is_unitary());
    }

    #[test]
    fn test_product_and_dimension_mismatch() {
        let xx = ops::x().product(&ops::x()).unwrap();
        assert!(linalg::approx_eq(xx.matrix(), ops::i().matrix(), 1e-12));
        assert!(matches!(
            ops::x().product(&ops::cnot()),
            Err(QStateError::DimensionMismatch {
                expected: 2,
                actual: 4
            })
        ));
    }

    #[test]
    fn test_t_squared_is_s() {
        let tt = ops::t().product(&ops::t()).unwrap();
        assert!(linalg::approx_eq(tt.matrix(), ops::s().matrix(), 1e-12));
    }

    #[test]
    fn test_tensor_and_ctrl() {
        let xi = ops::x().tensor(&ops::i());
        assert_eq!(xi.num_qubits(), 2);
        assert_relative_eq!(xi.matrix()[[2, 0]].re, 1.0);

        let cnot = ops::cnot();
        assert_relative_eq!(cnot.matrix()[[3, 2]].re, 1.0);
        assert_relative_eq!(cnot.matrix()[[1, 1]].re, 1.0);
        assert_eq!(ops::x().ctrl().ctrl().num_qubits(), 3);
    }

    #[test]
    fn test_dagger_scale_add() {
        let sdg = ops::s().dagger();
        assert_relative_eq!(sdg.matrix()[[1, 1]].im, -1.0);

        let half_sum = ops::x()
            .add(&ops::z())
            .unwrap()
            .scale(Complex64::new(std::f64::consts::FRAC_1_SQRT_2, 0.0));
        assert!(linalg::approx_eq(half_sum.matrix(), ops::h().matrix(), 1e-12));
        assert!(ops::x().add(&ops::swap()).is_err());
    }

    #[test]
    fn test_rotation_about_x_by_pi_is_x_up_to_phase() {
        let rx = ops::rotation(PI, [1.0, 0.0, 0.0]).unwrap();
        assert!(linalg::equal_up_to_phase(rx.matrix(), ops::x().matrix(), 1e-12));
        assert!(rx.is_unitary());
        assert!(ops::rotation(1.0, [0.0, 0.0, 0.0]).is_err());
    }

    #[test]
    fn test_projectors_of_x() {
        let [p0, p1] = ops::x().projectors().unwrap();
        assert_relative_eq!(p0.matrix()[[0, 1]].re, 0.5, epsilon = 1e-12);
        assert_relative_eq!(p1.matrix()[[0, 1]].re, -0.5, epsilon = 1e-12);
        let sum = p0.add(&p1).unwrap();
        assert!(linalg::approx_eq(sum.matrix(), ops::i().matrix(), 1e-12));
    }

    #[test]
    fn test_projectors_reject_non_observables() {
        assert!(ops::s().projectors().is_err());
        assert!(ops::i().projectors().is_err());
        assert!(ops::cnot().projectors().is_err());
    }
}
