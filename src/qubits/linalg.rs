// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Dense linear algebra on qubit registers.
//!
//! Basis ordering: in an `n`-qubit group, position 0 is the most
//! significant bit of the basis index, so the state of positions
//! `[0, 1, .., n-1]` is the Kronecker product in that order.

use ndarray::{Array1, Array2};
use num_complex::Complex64;

pub type CVector = Array1<Complex64>;
pub type CMatrix = Array2<Complex64>;

/// Absolute tolerance for numerical checks.
pub const ATOL: f64 = 1e-9;

const ZERO: Complex64 = Complex64 { re: 0.0, im: 0.0 };

/// Compute the conjugate transpose (Hermitian adjoint) of a matrix.
pub fn conjugate_transpose(m: &CMatrix) -> CMatrix {
    m.t().mapv(|z| z.conj())
}

pub fn identity(dim: usize) -> CMatrix {
    Array2::eye(dim)
}

pub fn kron(a: &CMatrix, b: &CMatrix) -> CMatrix {
    let (ar, ac) = a.dim();
    let (br, bc) = b.dim();
    let mut out = Array2::zeros((ar * br, ac * bc));
    for i in 0..ar {
        for j in 0..ac {
            let aij = a[[i, j]];
            if aij == ZERO {
                continue;
            }
            for k in 0..br {
                for l in 0..bc {
                    out[[i * br + k, j * bc + l]] = aij * b[[k, l]];
                }
            }
        }
    }
    out
}

pub fn kron_vec(a: &CVector, b: &CVector) -> CVector {
    let mut out = Array1::zeros(a.len() * b.len());
    for (i, &ai) in a.iter().enumerate() {
        for (k, &bk) in b.iter().enumerate() {
            out[i * b.len() + k] = ai * bk;
        }
    }
    out
}

pub fn trace(m: &CMatrix) -> Complex64 {
    m.diag().sum()
}

/// Purity Tr(ρ²) of a Hermitian matrix.
pub fn purity(rho: &CMatrix) -> f64 {
    rho.iter().map(|z| z.norm_sqr()).sum()
}

pub fn norm(v: &CVector) -> f64 {
    v.iter().map(|z| z.norm_sqr()).sum::<f64>().sqrt()
}

/// |ψ⟩⟨ψ|
pub fn ket_to_dm(psi: &CVector) -> CMatrix {
    let d = psi.len();
    let mut rho = Array2::zeros((d, d));
    for i in 0..d {
        for j in 0..d {
            rho[[i, j]] = psi[i] * psi[j].conj();
        }
    }
    rho
}

/// Recover ψ from a pure density matrix (up to global phase). Returns
/// `None` if ρ is mixed.
pub fn dm_to_ket(rho: &CMatrix) -> Option<CVector> {
    if (purity(rho) - 1.0).abs() > 1e-6 {
        return None;
    }
    let (j, pjj) = rho
        .diag()
        .iter()
        .enumerate()
        .map(|(j, z)| (j, z.re))
        .fold((0, f64::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });
    if pjj <= 0.0 {
        return None;
    }
    Some(rho.column(j).mapv(|z| z / pjj.sqrt()))
}

pub fn is_unitary(m: &CMatrix, tol: f64) -> bool {
    m.is_square() && approx_eq(&conjugate_transpose(m).dot(m), &identity(m.nrows()), tol)
}

pub fn is_hermitian(m: &CMatrix, tol: f64) -> bool {
    m.is_square() && approx_eq(m, &conjugate_transpose(m), tol)
}

pub fn approx_eq(a: &CMatrix, b: &CMatrix, tol: f64) -> bool {
    a.dim() == b.dim() && a.iter().zip(b.iter()).all(|(x, y)| (x - y).norm() <= tol)
}

/// Whether `a = e^{iφ} b` for some global phase φ.
pub fn equal_up_to_phase(a: &CMatrix, b: &CMatrix, tol: f64) -> bool {
    if a.dim() != b.dim() {
        return false;
    }
    let Some((idx, bref)) = b.indexed_iter().find(|(_, z)| z.norm() > tol) else {
        return a.iter().all(|z| z.norm() <= tol);
    };
    let phase = a[idx] / bref;
    if (phase.norm() - 1.0).abs() > tol {
        return false;
    }
    a.iter().zip(b.iter()).all(|(x, y)| (x - phase * y).norm() <= tol)
}

/// Eigen-decomposition of a 2×2 Hermitian matrix `[[a, b], [b*, d]]`.
///
/// Returns `[(λ₊, v₊), (λ₋, v₋)]`, largest eigenvalue first, or `None`
/// if the eigenvalues coincide.
pub fn eigh_2x2(m: &CMatrix) -> Option<[(f64, [Complex64; 2]); 2]> {
    let a = m[[0, 0]].re;
    let d = m[[1, 1]].re;
    let b = m[[0, 1]];
    let mean = (a + d) / 2.0;
    let radius = (((a - d) / 2.0).powi(2) + b.norm_sqr()).sqrt();
    if radius < ATOL {
        return None;
    }
    let (lp, lm) = (mean + radius, mean - radius);
    if b.norm() < ATOL {
        let e0 = [Complex64::new(1.0, 0.0), ZERO];
        let e1 = [ZERO, Complex64::new(1.0, 0.0)];
        return Some(if a >= d {
            [(lp, e0), (lm, e1)]
        } else {
            [(lp, e1), (lm, e0)]
        });
    }
    let vec_for = |lambda: f64| {
        let v = [b, Complex64::new(lambda - a, 0.0)];
        let n = (v[0].norm_sqr() + v[1].norm_sqr()).sqrt();
        [v[0] / n, v[1] / n]
    };
    Some([(lp, vec_for(lp)), (lm, vec_for(lm))])
}

/// Basis index with the bits of `sub` (a `k`-bit number, MSB first) placed
/// at the given bit offsets.
fn scatter_bits(sub: usize, shifts: &[usize]) -> usize {
    let k = shifts.len();
    shifts
        .iter()
        .enumerate()
        .filter(|(j, _)| (sub >> (k - 1 - j)) & 1 == 1)
        .fold(0usize, |idx, (_, s)| idx | (1usize << s))
}

fn shifts_for(n: usize, positions: &[usize]) -> Vec<usize> {
    positions.iter().map(|&p| n - 1 - p).collect()
}

fn offsets_for(shifts: &[usize]) -> Vec<usize> {
    (0..1usize << shifts.len())
        .map(|s| scatter_bits(s, shifts))
        .collect()
}

/// Insert bit `b` at offset `s` into `r`.
fn insert_bit(r: usize, s: usize, b: usize) -> usize {
    ((r >> s) << (s + 1)) | (b << s) | (r & ((1 << s) - 1))
}

/// Apply a `2^k × 2^k` matrix to `positions` of an `n`-qubit state vector.
pub fn apply_to_ket(state: &mut CVector, n: usize, positions: &[usize], op: &CMatrix) {
    let offsets = offsets_for(&shifts_for(n, positions));
    let dk = offsets.len();
    let mask = offsets[dk - 1];
    let mut buf = vec![ZERO; dk];
    for base in 0..(1usize << n) {
        if base & mask != 0 {
            continue;
        }
        for (s, off) in offsets.iter().enumerate() {
            buf[s] = state[base | off];
        }
        for (r, off) in offsets.iter().enumerate() {
            let mut acc = ZERO;
            for (c, amp) in buf.iter().enumerate() {
                acc += op[[r, c]] * amp;
            }
            state[base | off] = acc;
        }
    }
}

/// ρ → M ρ M† with M acting on `positions` of an `n`-qubit density matrix.
pub fn apply_to_dm(rho: &mut CMatrix, n: usize, positions: &[usize], op: &CMatrix) {
    let d = rho.nrows();
    for c in 0..d {
        let mut col = rho.column(c).to_owned();
        apply_to_ket(&mut col, n, positions, op);
        rho.column_mut(c).assign(&col);
    }
    let op_conj = op.mapv(|z| z.conj());
    for r in 0..d {
        let mut row = rho.row(r).to_owned();
        apply_to_ket(&mut row, n, positions, &op_conj);
        rho.row_mut(r).assign(&row);
    }
}

/// (⟨v| ⊗ I) |ψ⟩ with ⟨v| acting on `pos`. The result has `n - 1` qubits
/// and squared norm equal to the probability of projecting onto |v⟩.
pub fn contract_ket(psi: &CVector, n: usize, pos: usize, v: &[Complex64; 2]) -> CVector {
    let s = n - 1 - pos;
    Array1::from_shape_fn(1usize << (n - 1), |r| {
        v[0].conj() * psi[insert_bit(r, s, 0)] + v[1].conj() * psi[insert_bit(r, s, 1)]
    })
}

/// (⟨v| ⊗ I) ρ (|v⟩ ⊗ I). The trace of the result is the probability of
/// projecting onto |v⟩.
pub fn contract_dm(rho: &CMatrix, n: usize, pos: usize, v: &[Complex64; 2]) -> CMatrix {
    let s = n - 1 - pos;
    let d = 1usize << (n - 1);
    Array2::from_shape_fn((d, d), |(r, t)| {
        let mut acc = ZERO;
        for (b, vb) in v.iter().enumerate() {
            for (bp, vbp) in v.iter().enumerate() {
                acc += vb.conj() * rho[[insert_bit(r, s, b), insert_bit(t, s, bp)]] * vbp;
            }
        }
        acc
    })
}

/// Reduced density matrix of `keep` (in that order) from a state vector.
pub fn reduced_dm_from_ket(psi: &CVector, n: usize, keep: &[usize]) -> CMatrix {
    let (ko, to) = keep_and_traced_offsets(n, keep);
    Array2::from_shape_fn((ko.len(), ko.len()), |(i, j)| {
        to.iter()
            .map(|t| psi[ko[i] | t] * psi[ko[j] | t].conj())
            .sum()
    })
}

/// Reduced density matrix of `keep` (in that order) from a density matrix.
pub fn reduced_dm(rho: &CMatrix, n: usize, keep: &[usize]) -> CMatrix {
    let (ko, to) = keep_and_traced_offsets(n, keep);
    Array2::from_shape_fn((ko.len(), ko.len()), |(i, j)| {
        to.iter().map(|t| rho[[ko[i] | t, ko[j] | t]]).sum()
    })
}

fn keep_and_traced_offsets(n: usize, keep: &[usize]) -> (Vec<usize>, Vec<usize>) {
    let traced: Vec<usize> = (0..n).filter(|p| !keep.contains(p)).collect();
    (
        offsets_for(&shifts_for(n, keep)),
        offsets_for(&shifts_for(n, &traced)),
    )
}

/// Reorder the qubits of an `m`-qubit density matrix: output position `a`
/// is input position `order[a]`.
pub fn permute_dm(rho: &CMatrix, m: usize, order: &[usize]) -> CMatrix {
    let map = |out: usize| {
        (0..m).fold(0usize, |idx, a| {
            let bit = (out >> (m - 1 - a)) & 1;
            idx | (bit << (m - 1 - order[a]))
        })
    };
    let d = rho.nrows();
    Array2::from_shape_fn((d, d), |(i, j)| rho[[map(i), map(j)]])
}
