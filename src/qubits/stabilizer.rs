// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Stabilizer tableau for Clifford-only state groups.
//!
//! An `n`-qubit stabilizer state is stored as `n` commuting, independent
//! Pauli generators with signs. Gates update generators by conjugation;
//! Z measurements follow the Aaronson-Gottesman rules, with the
//! deterministic case resolved by Gaussian elimination because no
//! destabilizers are kept.
//!
//! Ref: Aaronson & Gottesman, "Improved Simulation of Stabilizer
//! Circuits", Phys. Rev. A 70, 052328 (2004).

use num_complex::Complex64;
use rand::Rng;
use std::fmt;

use super::linalg::{self, CMatrix, CVector};
use super::operator::{ops, Operator};
use crate::error::QStateError;

/// Single-qubit Pauli label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pauli {
    I,
    X,
    Y,
    Z,
}

impl Pauli {
    fn bits(self) -> (bool, bool) {
        match self {
            Pauli::I => (false, false),
            Pauli::X => (true, false),
            Pauli::Y => (true, true),
            Pauli::Z => (false, true),
        }
    }

    fn from_bits(x: bool, z: bool) -> Self {
        match (x, z) {
            (false, false) => Pauli::I,
            (true, false) => Pauli::X,
            (true, true) => Pauli::Y,
            (false, true) => Pauli::Z,
        }
    }
}

/// Signed tensor product of Paulis, `(-1)^negative · P_0 ⊗ .. ⊗ P_{n-1}`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PauliString {
    pub x: Vec<bool>,
    pub z: Vec<bool>,
    pub negative: bool,
}

/// Exponent of `i` when multiplying Pauli `(x1, z1)` by `(x2, z2)`.
fn g(x1: bool, z1: bool, x2: bool, z2: bool) -> i32 {
    let (x2, z2) = (x2 as i32, z2 as i32);
    match (x1, z1) {
        (false, false) => 0,
        (true, true) => z2 - x2,
        (true, false) => z2 * (2 * x2 - 1),
        (false, true) => x2 * (1 - 2 * z2),
    }
}

impl PauliString {
    pub fn identity(n: usize) -> Self {
        Self {
            x: vec![false; n],
            z: vec![false; n],
            negative: false,
        }
    }

    /// `pauli` on `qubit`, identity elsewhere.
    pub fn single(n: usize, qubit: usize, pauli: Pauli, negative: bool) -> Self {
        let mut p = Self::identity(n);
        let (x, z) = pauli.bits();
        p.x[qubit] = x;
        p.z[qubit] = z;
        p.negative = negative;
        p
    }

    /// Parse `"+XZ"`, `"-YY"` or `"ZI"`.
    pub fn parse(s: &str) -> Result<Self, QStateError> {
        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s.strip_prefix('+').unwrap_or(s)),
        };
        if body.is_empty() {
            return Err(QStateError::InvalidState(format!(
                "empty Pauli string '{}'",
                s
            )));
        }
        let mut p = Self::identity(body.len());
        p.negative = negative;
        for (j, ch) in body.chars().enumerate() {
            let pauli = match ch.to_ascii_uppercase() {
                'I' => Pauli::I,
                'X' => Pauli::X,
                'Y' => Pauli::Y,
                'Z' => Pauli::Z,
                other => {
                    return Err(QStateError::InvalidState(format!(
                        "invalid Pauli '{}' in '{}'",
                        other, s
                    )))
                }
            };
            (p.x[j], p.z[j]) = pauli.bits();
        }
        Ok(p)
    }

    pub fn num_qubits(&self) -> usize {
        self.x.len()
    }

    pub fn pauli(&self, qubit: usize) -> Pauli {
        Pauli::from_bits(self.x[qubit], self.z[qubit])
    }

    pub fn commutes_with(&self, other: &PauliString) -> bool {
        let anti = (0..self.num_qubits())
            .filter(|&j| (self.x[j] & other.z[j]) ^ (self.z[j] & other.x[j]))
            .count();
        anti % 2 == 0
    }

    /// `self ← other · self`. Only valid for commuting strings, where the
    /// product is again Hermitian.
    fn left_multiply(&mut self, other: &PauliString) {
        let phase: i32 = (0..self.num_qubits())
            .map(|j| g(other.x[j], other.z[j], self.x[j], self.z[j]))
            .sum();
        let total = 2 * (self.negative as i32) + 2 * (other.negative as i32) + phase;
        self.negative = total.rem_euclid(4) == 2;
        for j in 0..self.num_qubits() {
            self.x[j] ^= other.x[j];
            self.z[j] ^= other.z[j];
        }
    }

    /// Bit `col` of the `[x | z]` symplectic vector.
    fn bit(&self, col: usize) -> bool {
        let n = self.num_qubits();
        if col < n {
            self.x[col]
        } else {
            self.z[col - n]
        }
    }

    fn remove_qubit(&mut self, qubit: usize) {
        self.x.remove(qubit);
        self.z.remove(qubit);
    }

    pub fn to_matrix(&self) -> CMatrix {
        let mut m = linalg::identity(1);
        for j in 0..self.num_qubits() {
            let factor = match self.pauli(j) {
                Pauli::I => ops::i(),
                Pauli::X => ops::x(),
                Pauli::Y => ops::y(),
                Pauli::Z => ops::z(),
            };
            m = linalg::kron(&m, factor.matrix());
        }
        if self.negative {
            m.mapv_inplace(|z| -z);
        }
        m
    }
}

impl fmt::Display for PauliString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(if self.negative { "-" } else { "+" })?;
        for j in 0..self.num_qubits() {
            let ch = match self.pauli(j) {
                Pauli::I => 'I',
                Pauli::X => 'X',
                Pauli::Y => 'Y',
                Pauli::Z => 'Z',
            };
            write!(f, "{}", ch)?;
        }
        Ok(())
    }
}

/// Clifford gates the tableau can apply directly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliffordGate {
    I,
    X,
    Y,
    Z,
    H,
    S,
    Sdg,
    /// Control on the first position.
    Cnot,
    Cz,
    Swap,
}

impl CliffordGate {
    /// Identify an operator as a Clifford gate, up to global phase.
    pub fn recognize(op: &Operator) -> Option<Self> {
        let candidates: Vec<(CliffordGate, Operator)> = match op.num_qubits() {
            1 => vec![
                (CliffordGate::I, ops::i()),
                (CliffordGate::X, ops::x()),
                (CliffordGate::Y, ops::y()),
                (CliffordGate::Z, ops::z()),
                (CliffordGate::H, ops::h()),
                (CliffordGate::S, ops::s()),
                (CliffordGate::Sdg, ops::s().dagger()),
            ],
            2 => vec![
                (CliffordGate::Cnot, ops::cnot()),
                (CliffordGate::Cz, ops::cz()),
                (CliffordGate::Swap, ops::swap()),
            ],
            _ => Vec::new(),
        };
        candidates
            .iter()
            .find(|(_, reference)| {
                linalg::equal_up_to_phase(op.matrix(), reference.matrix(), 1e-9)
            })
            .map(|(gate, _)| *gate)
    }
}

/// Stabilizer state over `n` qubits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StabilizerTableau {
    n: usize,
    generators: Vec<PauliString>,
}

impl StabilizerTableau {
    /// |0…0⟩, stabilized by `+Z_i`.
    pub fn new(n: usize) -> Self {
        Self {
            n,
            generators: (0..n)
                .map(|i| PauliString::single(n, i, Pauli::Z, false))
                .collect(),
        }
    }

    /// Build from explicit generators, checking they describe a state.
    pub fn from_generators(generators: Vec<PauliString>) -> Result<Self, QStateError> {
        let n = generators.len();
        if let Some(bad) = generators.iter().find(|p| p.num_qubits() != n) {
            return Err(QStateError::InvalidState(format!(
                "{} generators need {} qubits each, got '{}'",
                n, n, bad
            )));
        }
        for (i, a) in generators.iter().enumerate() {
            for b in &generators[i + 1..] {
                if !a.commutes_with(b) {
                    return Err(QStateError::InvalidState(format!(
                        "generators {} and {} anticommute",
                        a, b
                    )));
                }
            }
        }
        let tableau = Self { n, generators };
        if tableau.rank() != n {
            return Err(QStateError::InvalidState(
                "stabilizer generators are not independent".into(),
            ));
        }
        Ok(tableau)
    }

    /// Parse generators such as `["+XX", "+ZZ"]`.
    pub fn parse(generators: &[&str]) -> Result<Self, QStateError> {
        let parsed = generators
            .iter()
            .map(|s| PauliString::parse(s))
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_generators(parsed)
    }

    pub fn num_qubits(&self) -> usize {
        self.n
    }

    pub fn generators(&self) -> &[PauliString] {
        &self.generators
    }

    /// Reduce a copy to row echelon form. Returns the reduced rows and the
    /// pivot column of each.
    fn echelon(&self) -> (Vec<PauliString>, Vec<usize>) {
        let mut rows = self.generators.clone();
        let mut pivots = Vec::new();
        let mut next = 0;
        for col in 0..2 * self.n {
            let Some(r) = (next..rows.len()).find(|&r| rows[r].bit(col)) else {
                continue;
            };
            rows.swap(r, next);
            let pivot = rows[next].clone();
            for (i, row) in rows.iter_mut().enumerate() {
                if i != next && row.bit(col) {
                    row.left_multiply(&pivot);
                }
            }
            pivots.push(col);
            next += 1;
        }
        (rows, pivots)
    }

    fn rank(&self) -> usize {
        self.echelon().1.len()
    }

    // -------------------------------------------------------------------
    // Clifford gates
    // -------------------------------------------------------------------

    pub fn h(&mut self, a: usize) {
        for p in &mut self.generators {
            p.negative ^= p.x[a] & p.z[a];
            std::mem::swap(&mut p.x[a], &mut p.z[a]);
        }
    }

    pub fn s(&mut self, a: usize) {
        for p in &mut self.generators {
            p.negative ^= p.x[a] & p.z[a];
            p.z[a] ^= p.x[a];
        }
    }

    pub fn sdg(&mut self, a: usize) {
        self.s(a);
        self.s(a);
        self.s(a);
    }

    pub fn x(&mut self, a: usize) {
        for p in &mut self.generators {
            p.negative ^= p.z[a];
        }
    }

    pub fn y(&mut self, a: usize) {
        for p in &mut self.generators {
            p.negative ^= p.x[a] ^ p.z[a];
        }
    }

    pub fn z(&mut self, a: usize) {
        for p in &mut self.generators {
            p.negative ^= p.x[a];
        }
    }

    pub fn cnot(&mut self, control: usize, target: usize) {
        for p in &mut self.generators {
            p.negative ^= p.x[control] & p.z[target] & !(p.x[target] ^ p.z[control]);
            p.x[target] ^= p.x[control];
            p.z[control] ^= p.z[target];
        }
    }

    pub fn cz(&mut self, a: usize, b: usize) {
        self.h(b);
        self.cnot(a, b);
        self.h(b);
    }

    pub fn swap(&mut self, a: usize, b: usize) {
        for p in &mut self.generators {
            p.x.swap(a, b);
            p.z.swap(a, b);
        }
    }

    /// Apply `gate` with its qubits mapped to `positions`.
    pub fn apply(&mut self, gate: CliffordGate, positions: &[usize]) {
        match gate {
            CliffordGate::I => {}
            CliffordGate::X => self.x(positions[0]),
            CliffordGate::Y => self.y(positions[0]),
            CliffordGate::Z => self.z(positions[0]),
            CliffordGate::H => self.h(positions[0]),
            CliffordGate::S => self.s(positions[0]),
            CliffordGate::Sdg => self.sdg(positions[0]),
            CliffordGate::Cnot => self.cnot(positions[0], positions[1]),
            CliffordGate::Cz => self.cz(positions[0], positions[1]),
            CliffordGate::Swap => self.swap(positions[0], positions[1]),
        }
    }

    // -------------------------------------------------------------------
    // Measurement
    // -------------------------------------------------------------------

    /// Sign of `±Z_a` if it belongs to the stabilizer group.
    fn z_sign(&self, a: usize) -> Option<bool> {
        let target = PauliString::single(self.n, a, Pauli::Z, false);
        let (rows, pivots) = self.echelon();
        let mut acc = PauliString::identity(self.n);
        for (row, &col) in rows.iter().zip(&pivots) {
            if target.bit(col) {
                acc.left_multiply(row);
            }
        }
        (acc.x == target.x && acc.z == target.z).then_some(acc.negative)
    }

    /// Measure `Z` on qubit `a`. Returns the outcome (0 for +1) and its
    /// probability.
    pub fn measure_z<R: Rng + ?Sized>(
        &mut self,
        a: usize,
        rng: &mut R,
    ) -> Result<(u8, f64), QStateError> {
        if let Some(p) = (0..self.n).find(|&i| self.generators[i].x[a]) {
            let pivot = self.generators[p].clone();
            for (i, row) in self.generators.iter_mut().enumerate() {
                if i != p && row.x[a] {
                    row.left_multiply(&pivot);
                }
            }
            let outcome: u8 = if rng.gen::<f64>() < 0.5 { 0 } else { 1 };
            self.generators[p] = PauliString::single(self.n, a, Pauli::Z, outcome == 1);
            return Ok((outcome, 0.5));
        }
        let negative = self.z_sign(a).ok_or_else(|| {
            QStateError::InvalidState("stabilizer tableau is not full rank".into())
        })?;
        Ok((u8::from(negative), 1.0))
    }

    /// Remove qubit `a`, which must be in a Z eigenstate. Returns the
    /// tableau of the remaining qubits.
    pub fn split_off(&self, a: usize) -> Result<StabilizerTableau, QStateError> {
        let negative = self.z_sign(a).ok_or_else(|| {
            QStateError::InvalidState(format!("qubit {} is not in a Z eigenstate", a))
        })?;
        let mut rows = self.generators.clone();
        let q = rows
            .iter()
            .position(|p| p.z[a] && !p.x[a])
            .ok_or_else(|| QStateError::InvalidState("no generator acts on qubit".into()))?;
        let pivot = rows[q].clone();
        for (i, row) in rows.iter_mut().enumerate() {
            if i != q && row.z[a] {
                row.left_multiply(&pivot);
            }
        }
        rows[q] = PauliString::single(self.n, a, Pauli::Z, negative);
        rows.remove(q);
        for row in &mut rows {
            row.remove_qubit(a);
        }
        Ok(StabilizerTableau {
            n: self.n - 1,
            generators: rows,
        })
    }

    /// `self ⊗ other`.
    pub fn tensor(&self, other: &StabilizerTableau) -> StabilizerTableau {
        let n = self.n + other.n;
        let left = self.generators.iter().map(|p| {
            let mut q = p.clone();
            q.x.extend(std::iter::repeat(false).take(other.n));
            q.z.extend(std::iter::repeat(false).take(other.n));
            q
        });
        let right = other.generators.iter().map(|p| {
            let mut q = PauliString::identity(self.n);
            q.x.extend_from_slice(&p.x);
            q.z.extend_from_slice(&p.z);
            q.negative = p.negative;
            q
        });
        StabilizerTableau {
            n,
            generators: left.chain(right).collect(),
        }
    }

    /// ρ = ∏ (I + g_i) / 2
    pub fn to_dm(&self) -> CMatrix {
        let dim = 1usize << self.n;
        let id = linalg::identity(dim);
        let half = Complex64::new(0.5, 0.0);
        self.generators.iter().fold(id.clone(), |rho, generator| {
            let proj = (&id + &generator.to_matrix()).mapv(|z| z * half);
            proj.dot(&rho)
        })
    }

    pub fn to_ket(&self) -> CVector {
        let rho = self.to_dm();
        linalg::dm_to_ket(&rho).unwrap_or_else(|| rho.column(0).to_owned())
    }
}

impl fmt::Display for StabilizerTableau {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let gens: Vec<String> = self.generators.iter().map(|p| p.to_string()).collect();
        write!(f, "<{}>", gens.join(", "))
    }
}
