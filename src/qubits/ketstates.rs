// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Reference state vectors.
//!
//! Bell states follow `b_{xz}`: `b00 = Φ+`, `b01 = Ψ+`, `b10 = Φ-`,
//! `b11 = Ψ-`.

use ndarray::Array1;
use num_complex::Complex64;
use std::f64::consts::FRAC_1_SQRT_2;

use super::linalg::CVector;

fn ket(amps: &[(f64, f64)]) -> CVector {
    Array1::from_iter(amps.iter().map(|&(re, im)| Complex64::new(re, im)))
}

const R: f64 = FRAC_1_SQRT_2;

/// |0⟩
pub fn s0() -> CVector {
    ket(&[(1.0, 0.0), (0.0, 0.0)])
}

/// |1⟩
pub fn s1() -> CVector {
    ket(&[(0.0, 0.0), (1.0, 0.0)])
}

pub fn s00() -> CVector {
    ket(&[(1.0, 0.0), (0.0, 0.0), (0.0, 0.0), (0.0, 0.0)])
}

pub fn s11() -> CVector {
    ket(&[(0.0, 0.0), (0.0, 0.0), (0.0, 0.0), (1.0, 0.0)])
}

/// |+⟩
pub fn h0() -> CVector {
    ket(&[(R, 0.0), (R, 0.0)])
}

/// |−⟩
pub fn h1() -> CVector {
    ket(&[(R, 0.0), (-R, 0.0)])
}

/// |+i⟩
pub fn y0() -> CVector {
    ket(&[(R, 0.0), (0.0, R)])
}

/// |−i⟩
pub fn y1() -> CVector {
    ket(&[(R, 0.0), (0.0, -R)])
}

pub fn b00() -> CVector {
    ket(&[(R, 0.0), (0.0, 0.0), (0.0, 0.0), (R, 0.0)])
}

pub fn b01() -> CVector {
    ket(&[(0.0, 0.0), (R, 0.0), (R, 0.0), (0.0, 0.0)])
}

pub fn b10() -> CVector {
    ket(&[(R, 0.0), (0.0, 0.0), (0.0, 0.0), (-R, 0.0)])
}

pub fn b11() -> CVector {
    ket(&[(0.0, 0.0), (R, 0.0), (-R, 0.0), (0.0, 0.0)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qubits::linalg::norm;
    use approx::assert_relative_eq;

    #[test]
    fn test_all_states_normalized() {
        for v in [
            s0(),
            s1(),
            s00(),
            s11(),
            h0(),
            h1(),
            y0(),
            y1(),
            b00(),
            b01(),
            b10(),
            b11(),
        ] {
            assert_relative_eq!(norm(&v), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_bell_states_orthogonal() {
        let bells = [b00(), b01(), b10(), b11()];
        for (i, a) in bells.iter().enumerate() {
            for b in &bells[i + 1..] {
                let overlap: Complex64 = a.iter().zip(b.iter()).map(|(x, y)| x.conj() * y).sum();
                assert_relative_eq!(overlap.norm(), 0.0, epsilon = 1e-12);
            }
        }
    }
}
