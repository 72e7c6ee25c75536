// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Qubit arena and state-group bookkeeping.
//!
//! Every assigned qubit belongs to exactly one [`StateGroup`]; its slot
//! records the group and its position inside it. Groups are replaced, never
//! patched: a merge, split or trace-out removes the old groups and installs
//! new ones, which rewrites the slots of every member.

use rand::Rng;
use std::collections::BTreeMap;
use tracing::debug;

use super::linalg::{self, CMatrix, CVector, ATOL};
use super::operator::Operator;
use super::repr::{Formalism, QRepr};
use super::stabilizer::CliffordGate;
use super::QubitId;
use crate::error::{QStateError, Result};

/// Identity of a state group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupId(u64);

#[derive(Debug, Clone, Default)]
pub(super) struct QubitSlot {
    pub(super) group: Option<GroupId>,
    pub(super) position: usize,
}

/// Qubits sharing one state representation.
#[derive(Debug, Clone)]
pub struct StateGroup {
    pub(super) qubits: Vec<QubitId>,
    pub(super) repr: QRepr,
}

impl StateGroup {
    /// Members in position order.
    pub fn qubits(&self) -> &[QubitId] {
        &self.qubits
    }

    pub fn repr(&self) -> &QRepr {
        &self.repr
    }

    pub fn len(&self) -> usize {
        self.qubits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.qubits.is_empty()
    }
}

/// Owner of all qubits and state groups.
#[derive(Debug)]
pub struct QuantumEngine {
    formalism: Formalism,
    max_group_qubits: usize,
    /// Id of the first slot; raised on reset so old ids stay invalid.
    base: usize,
    slots: Vec<QubitSlot>,
    groups: BTreeMap<GroupId, StateGroup>,
    next_group: u64,
    pub(super) operations: u64,
    peak_group_size: usize,
}

impl Default for QuantumEngine {
    fn default() -> Self {
        Self::new(Formalism::Ket, 12)
    }
}

impl QuantumEngine {
    pub fn new(formalism: Formalism, max_group_qubits: usize) -> Self {
        Self {
            formalism,
            max_group_qubits,
            base: 0,
            slots: Vec::new(),
            groups: BTreeMap::new(),
            next_group: 0,
            operations: 0,
            peak_group_size: 0,
        }
    }

    /// Formalism used for groups created from now on.
    pub fn formalism(&self) -> Formalism {
        self.formalism
    }

    /// Change the formalism for new groups. Existing groups keep theirs.
    pub fn set_formalism(&mut self, formalism: Formalism) {
        self.formalism = formalism;
    }

    pub fn max_group_qubits(&self) -> usize {
        self.max_group_qubits
    }

    pub fn operation_count(&self) -> u64 {
        self.operations
    }

    /// Largest group size since the last [`reset_peak`](Self::reset_peak).
    pub fn peak_group_size(&self) -> usize {
        self.peak_group_size
    }

    pub fn reset_peak(&mut self) {
        self.peak_group_size = self.groups.values().map(StateGroup::len).max().unwrap_or(0);
    }

    pub fn num_groups(&self) -> usize {
        self.groups.len()
    }

    /// Drop every qubit and group.
    pub fn reset(&mut self) {
        self.base += self.slots.len();
        self.slots.clear();
        self.groups.clear();
        self.operations = 0;
        self.peak_group_size = 0;
    }

    // -------------------------------------------------------------------
    // Slot and group helpers
    // -------------------------------------------------------------------

    fn slot_index(&self, q: QubitId) -> Option<usize> {
        q.0.checked_sub(self.base).filter(|&i| i < self.slots.len())
    }

    fn slot(&self, q: QubitId) -> Result<&QubitSlot> {
        self.slot_index(q)
            .map(|i| &self.slots[i])
            .ok_or_else(|| QStateError::UnassignedState(q.to_string()).into())
    }

    pub(super) fn group_id(&self, q: QubitId) -> Result<GroupId> {
        self.slot(q)?
            .group
            .ok_or_else(|| QStateError::UnassignedState(q.to_string()).into())
    }

    pub(super) fn group_ref(&self, gid: GroupId) -> Result<&StateGroup> {
        self.groups
            .get(&gid)
            .ok_or_else(|| QStateError::InvalidState(format!("dangling group {:?}", gid)).into())
    }

    pub(super) fn group_mut(&mut self, gid: GroupId) -> Result<&mut StateGroup> {
        self.groups
            .get_mut(&gid)
            .ok_or_else(|| QStateError::InvalidState(format!("dangling group {:?}", gid)).into())
    }

    pub(super) fn remove_group(&mut self, gid: GroupId) -> Result<StateGroup> {
        self.groups
            .remove(&gid)
            .ok_or_else(|| QStateError::InvalidState(format!("dangling group {:?}", gid)).into())
    }

    /// Create a group and point its members' slots at it.
    pub(super) fn install(&mut self, qubits: Vec<QubitId>, repr: QRepr) -> GroupId {
        let gid = GroupId(self.next_group);
        self.next_group += 1;
        for (position, q) in qubits.iter().enumerate() {
            if let Some(i) = self.slot_index(*q) {
                self.slots[i] = QubitSlot {
                    group: Some(gid),
                    position,
                };
            }
        }
        self.peak_group_size = self.peak_group_size.max(qubits.len());
        self.groups.insert(gid, StateGroup { qubits, repr });
        gid
    }

    pub(super) fn unassign(&mut self, q: QubitId) {
        if let Some(i) = self.slot_index(q) {
            self.slots[i].group = None;
        }
    }

    pub(super) fn check_distinct(qubits: &[QubitId]) -> Result<()> {
        for (i, q) in qubits.iter().enumerate() {
            if qubits[..i].contains(q) {
                return Err(QStateError::DuplicateQubit(q.to_string()).into());
            }
        }
        Ok(())
    }

    /// Leading qubit of a target list; an empty list is an error.
    pub(super) fn first_qubit(qubits: &[QubitId]) -> Result<QubitId> {
        qubits
            .first()
            .copied()
            .ok_or_else(|| QStateError::InvalidState("no target qubits".into()).into())
    }

    /// Distinct groups of `qubits`, in order of first appearance.
    fn distinct_groups(&self, qubits: &[QubitId]) -> Result<Vec<GroupId>> {
        let mut gids = Vec::new();
        for q in qubits {
            let gid = self.group_id(*q)?;
            if !gids.contains(&gid) {
                gids.push(gid);
            }
        }
        Ok(gids)
    }

    pub(super) fn positions(&self, qubits: &[QubitId]) -> Result<Vec<usize>> {
        qubits.iter().map(|q| self.position(*q)).collect()
    }

    // -------------------------------------------------------------------
    // Inspection
    // -------------------------------------------------------------------

    pub fn is_assigned(&self, q: QubitId) -> bool {
        self.group_id(q).is_ok()
    }

    pub fn group(&self, q: QubitId) -> Result<&StateGroup> {
        self.group_ref(self.group_id(q)?)
    }

    pub fn group_size(&self, q: QubitId) -> Result<usize> {
        Ok(self.group(q)?.len())
    }

    pub fn position(&self, q: QubitId) -> Result<usize> {
        self.group_id(q)?;
        Ok(self.slot(q)?.position)
    }

    /// Formalism of the group holding `q`.
    pub fn formalism_of(&self, q: QubitId) -> Result<Formalism> {
        Ok(self.group(q)?.repr.formalism())
    }

    // -------------------------------------------------------------------
    // Creation and assignment
    // -------------------------------------------------------------------

    /// Allocate `n` qubits. With `with_state`, each gets its own group in
    /// |0⟩; otherwise they stay unassigned until [`assign`](Self::assign).
    pub fn create(&mut self, n: usize, with_state: bool) -> Vec<QubitId> {
        let qubits: Vec<QubitId> = (0..n)
            .map(|_| {
                self.slots.push(QubitSlot::default());
                QubitId(self.base + self.slots.len() - 1)
            })
            .collect();
        if with_state {
            for q in &qubits {
                self.install(vec![*q], QRepr::ground(self.formalism, 1));
            }
        }
        debug!(count = n, with_state, formalism = %self.formalism, "Created qubits");
        qubits
    }

    /// Give `qubits` a fresh group holding `repr`. The group takes the
    /// representation's own formalism. Qubits still in another group are
    /// traced out of it first.
    pub fn assign(&mut self, qubits: &[QubitId], repr: QRepr) -> Result<()> {
        Self::check_distinct(qubits)?;
        if qubits.is_empty() {
            return Err(QStateError::InvalidState("no qubits to assign".into()).into());
        }
        if qubits.len() > self.max_group_qubits {
            return Err(QStateError::GroupTooLarge {
                limit: self.max_group_qubits,
                requested: qubits.len(),
            }
            .into());
        }
        for q in qubits {
            self.slot(*q)?;
        }
        let repr = repr.validated(qubits.len())?;

        let old_groups: Vec<GroupId> = qubits
            .iter()
            .filter_map(|q| self.slot(*q).ok().and_then(|s| s.group))
            .fold(Vec::new(), |mut acc, gid| {
                if !acc.contains(&gid) {
                    acc.push(gid);
                }
                acc
            });
        let mut fully_replaced = Vec::new();
        for gid in &old_groups {
            let group = self.group_ref(*gid)?;
            let covered = group.qubits.iter().all(|m| qubits.contains(m));
            if covered {
                fully_replaced.push(*gid);
            } else if group.repr.formalism() == Formalism::Stabilizer {
                return Err(QStateError::UnsupportedOperation(
                    "cannot reassign part of a stabilizer group; discard the qubits first".into(),
                )
                .into());
            }
        }
        for gid in fully_replaced {
            for m in self.remove_group(gid)?.qubits {
                self.unassign(m);
            }
        }
        for q in qubits {
            if self.is_assigned(*q) {
                self.trace_out(*q)?;
            }
        }
        let gid = self.install(qubits.to_vec(), repr);
        debug!(group = ?gid, size = qubits.len(), "Assigned state");
        Ok(())
    }

    // -------------------------------------------------------------------
    // Merge and operate
    // -------------------------------------------------------------------

    /// Merge the groups of `qubits` into one, in order of first appearance.
    pub fn combine(&mut self, qubits: &[QubitId]) -> Result<()> {
        self.merge(qubits).map(|_| ())
    }

    pub(super) fn merge(&mut self, qubits: &[QubitId]) -> Result<GroupId> {
        Self::check_distinct(qubits)?;
        let gids = self.distinct_groups(qubits)?;
        let Some((&first, rest)) = gids.split_first() else {
            return Err(QStateError::InvalidState("no qubits to combine".into()).into());
        };
        if rest.is_empty() {
            return Ok(first);
        }

        let expected = self.group_ref(first)?.repr.formalism();
        let mut total = 0;
        for gid in &gids {
            let group = self.group_ref(*gid)?;
            let found = group.repr.formalism();
            if found != expected {
                return Err(QStateError::IncompatibleFormalism {
                    expected: expected.to_string(),
                    found: found.to_string(),
                }
                .into());
            }
            total += group.len();
        }
        if total > self.max_group_qubits {
            return Err(QStateError::GroupTooLarge {
                limit: self.max_group_qubits,
                requested: total,
            }
            .into());
        }

        let mut merged = self.remove_group(first)?;
        for gid in rest {
            let other = self.remove_group(*gid)?;
            merged.repr = match (merged.repr, other.repr) {
                (QRepr::Ket(a), QRepr::Ket(b)) => QRepr::Ket(linalg::kron_vec(&a, &b)),
                (QRepr::DensityMatrix(a), QRepr::DensityMatrix(b)) => {
                    QRepr::DensityMatrix(linalg::kron(&a, &b))
                }
                (QRepr::Stabilizer(a), QRepr::Stabilizer(b)) => QRepr::Stabilizer(a.tensor(&b)),
                _ => {
                    return Err(
                        QStateError::InvalidState("formalism changed during merge".into()).into(),
                    )
                }
            };
            merged.qubits.extend(other.qubits);
        }
        debug!(size = total, formalism = %expected, "Merged state groups");
        Ok(self.install(merged.qubits, merged.repr))
    }

    /// Apply a unitary to `qubits`, merging their groups first.
    pub fn operate(&mut self, qubits: &[QubitId], op: &Operator) -> Result<()> {
        let expected = 1usize << qubits.len();
        if qubits.is_empty() || op.dim() != expected {
            return Err(QStateError::DimensionMismatch {
                expected,
                actual: op.dim(),
            }
            .into());
        }
        if !op.is_unitary() {
            return Err(QStateError::InvalidOperator(format!(
                "{} is not unitary; use gmeasure or apply_kraus",
                op.name()
            ))
            .into());
        }
        Self::check_distinct(qubits)?;
        let clifford = if self.formalism_of(qubits[0])? == Formalism::Stabilizer {
            Some(CliffordGate::recognize(op).ok_or_else(|| {
                QStateError::UnsupportedOperation(format!(
                    "{} is not a Clifford gate; stabilizer groups only support Clifford operations",
                    op.name()
                ))
            })?)
        } else {
            None
        };

        let gid = self.merge(qubits)?;
        let positions = self.positions(qubits)?;
        let group = self.group_mut(gid)?;
        let n = group.len();
        match (&mut group.repr, clifford) {
            (QRepr::Ket(psi), _) => linalg::apply_to_ket(psi, n, &positions, op.matrix()),
            (QRepr::DensityMatrix(rho), _) => {
                linalg::apply_to_dm(rho, n, &positions, op.matrix())
            }
            (QRepr::Stabilizer(t), Some(gate)) => t.apply(gate, &positions),
            (QRepr::Stabilizer(_), None) => {
                return Err(QStateError::IncompatibleFormalism {
                    expected: Formalism::Stabilizer.to_string(),
                    found: "mixed".into(),
                }
                .into())
            }
        }
        self.operations += 1;
        debug!(operator = op.name(), qubits = qubits.len(), "Applied operator");
        Ok(())
    }

    // -------------------------------------------------------------------
    // Formalism conversion
    // -------------------------------------------------------------------

    /// Convert the groups of `qubits` to `target`.
    pub fn convert(&mut self, qubits: &[QubitId], target: Formalism) -> Result<()> {
        let gids = self.distinct_groups(qubits)?;
        let mut converted = Vec::with_capacity(gids.len());
        for gid in gids {
            let repr = &self.group_ref(gid)?.repr;
            let new = match (repr, target) {
                (r, t) if r.formalism() == t => continue,
                (_, Formalism::Stabilizer) => {
                    return Err(QStateError::UnsupportedOperation(format!(
                        "cannot convert {} to stabilizer",
                        repr.formalism()
                    ))
                    .into())
                }
                (QRepr::Ket(psi), _) => QRepr::DensityMatrix(linalg::ket_to_dm(psi)),
                (QRepr::DensityMatrix(rho), _) => {
                    QRepr::Ket(linalg::dm_to_ket(rho).ok_or_else(|| {
                        QStateError::InvalidState("cannot convert a mixed state to ket".into())
                    })?)
                }
                (QRepr::Stabilizer(t), Formalism::Ket) => QRepr::Ket(t.to_ket()),
                (QRepr::Stabilizer(t), _) => QRepr::DensityMatrix(t.to_dm()),
            };
            converted.push((gid, new));
        }
        for (gid, repr) in converted {
            self.group_mut(gid)?.repr = repr;
        }
        Ok(())
    }

    // -------------------------------------------------------------------
    // Removal
    // -------------------------------------------------------------------

    /// Remove `q` from its group, leaving it unassigned. Stabilizer groups
    /// are kept pure by sampling a Z measurement of the qubit first.
    pub fn discard<R: Rng + ?Sized>(&mut self, q: QubitId, rng: &mut R) -> Result<()> {
        let group = self.group(q)?;
        if group.len() > 1 && group.repr.formalism() == Formalism::Stabilizer {
            let z = super::operator::ops::z();
            self.measure(&[q], &z, true, rng)?;
        } else {
            self.trace_out(q)?;
        }
        debug!(qubit = %q, "Discarded qubit");
        Ok(())
    }

    /// Partial trace over `q`. A ket group stays a ket when `q` is in a
    /// product state with the rest, and becomes a density matrix otherwise.
    pub(super) fn trace_out(&mut self, q: QubitId) -> Result<()> {
        let gid = self.group_id(q)?;
        let pos = self.position(q)?;
        let group = self.group_ref(gid)?;
        let n = group.len();
        if n == 1 {
            self.remove_group(gid)?;
            self.unassign(q);
            return Ok(());
        }
        let keep: Vec<usize> = (0..n).filter(|&p| p != pos).collect();
        let rest_qubits: Vec<QubitId> = keep.iter().map(|&p| group.qubits[p]).collect();
        let rest = match &group.repr {
            QRepr::Ket(psi) => {
                let own = linalg::reduced_dm_from_ket(psi, n, &[pos]);
                match linalg::dm_to_ket(&own).filter(|_| linalg::purity(&own) > 1.0 - ATOL) {
                    Some(v) => {
                        let phi = linalg::contract_ket(psi, n, pos, &[v[0], v[1]]);
                        let norm = linalg::norm(&phi);
                        QRepr::Ket(phi.mapv(|z| z / norm))
                    }
                    None => QRepr::DensityMatrix(linalg::reduced_dm_from_ket(psi, n, &keep)),
                }
            }
            QRepr::DensityMatrix(rho) => QRepr::DensityMatrix(linalg::reduced_dm(rho, n, &keep)),
            QRepr::Stabilizer(_) => {
                return Err(QStateError::UnsupportedOperation(
                    "stabilizer qubits must be measured before they can be traced out".into(),
                )
                .into())
            }
        };
        self.remove_group(gid)?;
        self.install(rest_qubits, rest);
        self.unassign(q);
        Ok(())
    }

    // -------------------------------------------------------------------
    // Read-only projections
    // -------------------------------------------------------------------

    /// Density matrix of `qubits`, in the requested order, tracing out every
    /// other member of their groups. Never mutates state.
    pub fn reduced_density_matrix(&self, qubits: &[QubitId]) -> Result<CMatrix> {
        Self::check_distinct(qubits)?;
        if qubits.is_empty() {
            return Err(QStateError::InvalidState("no qubits requested".into()).into());
        }
        let mut by_group: Vec<(GroupId, Vec<usize>)> = Vec::new();
        for (i, q) in qubits.iter().enumerate() {
            let gid = self.group_id(*q)?;
            match by_group.iter_mut().find(|(g, _)| *g == gid) {
                Some((_, idxs)) => idxs.push(i),
                None => by_group.push((gid, vec![i])),
            }
        }

        let mut rho = linalg::identity(1);
        let mut concat_order: Vec<usize> = Vec::with_capacity(qubits.len());
        for (gid, idxs) in &by_group {
            let group = self.group_ref(*gid)?;
            let n = group.len();
            let keep = idxs
                .iter()
                .map(|&i| self.position(qubits[i]))
                .collect::<Result<Vec<_>>>()?;
            let part = match &group.repr {
                QRepr::Ket(psi) => linalg::reduced_dm_from_ket(psi, n, &keep),
                QRepr::DensityMatrix(m) => linalg::reduced_dm(m, n, &keep),
                QRepr::Stabilizer(t) => linalg::reduced_dm(&t.to_dm(), n, &keep),
            };
            rho = linalg::kron(&rho, &part);
            concat_order.extend(idxs);
        }

        // Output position a is request index a.
        let order: Vec<usize> = (0..qubits.len())
            .map(|a| concat_order.iter().position(|&r| r == a).unwrap_or(a))
            .collect();
        Ok(linalg::permute_dm(&rho, qubits.len(), &order))
    }

    /// Overlap ⟨ψ|ρ|ψ⟩ of the reduced state of `qubits` with a reference
    /// pure state; square-rooted unless `squared`.
    pub fn fidelity(&self, qubits: &[QubitId], reference: &CVector, squared: bool) -> Result<f64> {
        let expected = 1usize << qubits.len();
        if reference.len() != expected {
            return Err(QStateError::DimensionMismatch {
                expected,
                actual: reference.len(),
            }
            .into());
        }
        let norm_sq = linalg::norm(reference).powi(2);
        if norm_sq < ATOL {
            return Err(QStateError::InvalidState("reference state has zero norm".into()).into());
        }
        let rho = self.reduced_density_matrix(qubits)?;
        let overlap = reference
            .mapv(|z| z.conj())
            .dot(&rho.dot(reference))
            .re
            / norm_sq;
        let f2 = overlap.clamp(0.0, 1.0);
        Ok(if squared { f2 } else { f2.sqrt() })
    }
}

/// Pick an index with probability proportional to `weights`.
pub(super) fn sample_index<R: Rng + ?Sized>(weights: &[f64], rng: &mut R) -> usize {
    let total: f64 = weights.iter().sum();
    let r = rng.gen::<f64>() * total;
    let mut acc = 0.0;
    for (i, w) in weights.iter().enumerate() {
        acc += w;
        if *w > 0.0 && r < acc {
            return i;
        }
    }
    weights.iter().rposition(|w| *w > 0.0).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::qubits::{ketstates, ops};
    use crate::test_utils::{assert_dm_eq, seeded_rng};
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    fn bell_pair(engine: &mut QuantumEngine) -> Vec<QubitId> {
        let q = engine.create(2, true);
        engine.operate(&[q[0]], &ops::h()).unwrap();
        engine.operate(&q, &ops::cnot()).unwrap();
        q
    }

    #[test]
    fn test_create_allocates_ground_state_groups() {
        let mut engine = QuantumEngine::default();
        let q = engine.create(3, true);
        assert_eq!(q.len(), 3);
        assert_eq!(engine.num_groups(), 3);
        assert_eq!(engine.group_size(q[1]).unwrap(), 1);
        let rho = engine.reduced_density_matrix(&[q[2]]).unwrap();
        assert_relative_eq!(rho[[0, 0]].re, 1.0);
    }

    #[test]
    fn test_unassigned_qubit_fails() {
        let mut engine = QuantumEngine::default();
        let q = engine.create(1, false);
        assert!(!engine.is_assigned(q[0]));
        assert!(matches!(
            engine.operate(&q, &ops::x()),
            Err(Error::QState(QStateError::UnassignedState(_)))
        ));
        assert!(engine.reduced_density_matrix(&q).is_err());
    }

    #[test]
    fn test_assign_then_rdm() {
        let mut engine = QuantumEngine::default();
        let q = engine.create(2, false);
        engine.assign(&q, QRepr::Ket(ketstates::b01())).unwrap();
        assert_eq!(engine.group_size(q[0]).unwrap(), 2);
        let rho = engine.reduced_density_matrix(&q).unwrap();
        assert_dm_eq(&rho, &linalg::ket_to_dm(&ketstates::b01()), 1e-12);
    }

    #[test]
    fn test_assign_keeps_supplied_formalism() {
        let mut engine = QuantumEngine::new(Formalism::Ket, 12);
        let q = engine.create(1, false);
        engine
            .assign(&q, QRepr::DensityMatrix(linalg::identity(2)))
            .unwrap();
        assert_eq!(engine.formalism_of(q[0]).unwrap(), Formalism::DensityMatrix);
    }

    #[test]
    fn test_assign_detaches_from_entangled_group() {
        let mut engine = QuantumEngine::default();
        let q = bell_pair(&mut engine);
        engine.assign(&[q[0]], QRepr::Ket(ketstates::s1())).unwrap();
        assert_eq!(engine.group_size(q[0]).unwrap(), 1);
        assert_eq!(engine.group_size(q[1]).unwrap(), 1);
        // The partner is left maximally mixed
        let rho = engine.reduced_density_matrix(&[q[1]]).unwrap();
        assert_relative_eq!(rho[[0, 0]].re, 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_assign_replaces_initialised_qubit() {
        let mut engine = QuantumEngine::default();
        let q = engine.create(1, true);
        engine.assign(&q, QRepr::Ket(ketstates::s1())).unwrap();
        assert_eq!(engine.num_groups(), 1);
        let rho = engine.reduced_density_matrix(&q).unwrap();
        assert_relative_eq!(rho[[1, 1]].re, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_assign_replaces_whole_combined_group() {
        let mut engine = QuantumEngine::default();
        let q = engine.create(2, true);
        engine.combine(&q).unwrap();
        engine.assign(&[q[1], q[0]], QRepr::Ket(ketstates::b01())).unwrap();
        assert_eq!(engine.num_groups(), 1);
        assert_eq!(engine.group(q[0]).unwrap().qubits(), &[q[1], q[0]]);
        let rho = engine.reduced_density_matrix(&[q[1], q[0]]).unwrap();
        assert_dm_eq(&rho, &linalg::ket_to_dm(&ketstates::b01()), 1e-12);
    }

    #[test]
    fn test_assign_rejects_wrong_dimension() {
        let mut engine = QuantumEngine::default();
        let q = engine.create(1, false);
        assert!(matches!(
            engine.assign(&q, QRepr::Ket(ketstates::b00())),
            Err(Error::QState(QStateError::DimensionMismatch { .. }))
        ));
    }

    #[test]
    fn test_combine_orders_by_first_appearance() {
        let mut engine = QuantumEngine::default();
        let q = engine.create(2, true);
        engine.operate(&[q[1]], &ops::x()).unwrap();
        engine.combine(&[q[1], q[0]]).unwrap();
        assert_eq!(engine.group(q[0]).unwrap().qubits(), &[q[1], q[0]]);
        assert_eq!(engine.position(q[1]).unwrap(), 0);
        // Combining again is a no-op
        let before = engine.num_groups();
        engine.combine(&q).unwrap();
        assert_eq!(engine.num_groups(), before);
    }

    #[test]
    fn test_combine_rejects_mixed_formalisms() {
        let mut engine = QuantumEngine::default();
        let a = engine.create(1, true);
        engine.set_formalism(Formalism::DensityMatrix);
        let b = engine.create(1, true);
        assert!(matches!(
            engine.combine(&[a[0], b[0]]),
            Err(Error::QState(QStateError::IncompatibleFormalism { .. }))
        ));
        // Existing groups untouched
        assert_eq!(engine.formalism_of(a[0]).unwrap(), Formalism::Ket);
    }

    #[test]
    fn test_combine_respects_group_limit() {
        let mut engine = QuantumEngine::new(Formalism::Ket, 2);
        let q = engine.create(3, true);
        assert!(matches!(
            engine.combine(&q),
            Err(Error::QState(QStateError::GroupTooLarge {
                limit: 2,
                requested: 3
            }))
        ));
    }

    #[test]
    fn test_operate_dimension_and_duplicates() {
        let mut engine = QuantumEngine::default();
        let q = engine.create(2, true);
        assert!(matches!(
            engine.operate(&q, &ops::x()),
            Err(Error::QState(QStateError::DimensionMismatch {
                expected: 4,
                actual: 2
            }))
        ));
        assert!(matches!(
            engine.operate(&[q[0], q[0]], &ops::cnot()),
            Err(Error::QState(QStateError::DuplicateQubit(_)))
        ));
    }

    #[test]
    fn test_operate_rejects_non_unitary() {
        let mut engine = QuantumEngine::default();
        let q = engine.create(1, true);
        let [p0, _] = ops::z().projectors().unwrap();
        assert!(matches!(
            engine.operate(&q, &p0),
            Err(Error::QState(QStateError::InvalidOperator(_)))
        ));
    }

    #[test]
    fn test_bell_pair_in_all_formalisms() {
        let expected = linalg::ket_to_dm(&ketstates::b00());
        for formalism in [Formalism::Ket, Formalism::DensityMatrix, Formalism::Stabilizer] {
            let mut engine = QuantumEngine::new(formalism, 12);
            let q = bell_pair(&mut engine);
            let rho = engine.reduced_density_matrix(&q).unwrap();
            assert_dm_eq(&rho, &expected, 1e-9);
            assert_eq!(engine.operation_count(), 2);
            assert_eq!(engine.peak_group_size(), 2);
        }
    }

    #[test]
    fn test_stabilizer_rejects_non_clifford() {
        let mut engine = QuantumEngine::new(Formalism::Stabilizer, 12);
        let q = engine.create(1, true);
        assert!(matches!(
            engine.operate(&q, &ops::t()),
            Err(Error::QState(QStateError::UnsupportedOperation(_)))
        ));
    }

    #[test]
    fn test_convert_between_formalisms() {
        let mut engine = QuantumEngine::new(Formalism::Stabilizer, 12);
        let q = bell_pair(&mut engine);
        engine.convert(&q, Formalism::Ket).unwrap();
        assert_eq!(engine.formalism_of(q[0]).unwrap(), Formalism::Ket);
        engine.convert(&q, Formalism::DensityMatrix).unwrap();
        engine.convert(&q, Formalism::Ket).unwrap();
        assert_relative_eq!(
            engine.fidelity(&q, &ketstates::b00(), true).unwrap(),
            1.0,
            epsilon = 1e-9
        );
        assert!(matches!(
            engine.convert(&q, Formalism::Stabilizer),
            Err(Error::QState(QStateError::UnsupportedOperation(_)))
        ));
    }

    #[test]
    fn test_convert_mixed_dm_to_ket_fails() {
        let mut engine = QuantumEngine::default();
        let q = engine.create(1, false);
        engine
            .assign(&q, QRepr::DensityMatrix(linalg::identity(2)))
            .unwrap();
        assert!(matches!(
            engine.convert(&q, Formalism::Ket),
            Err(Error::QState(QStateError::InvalidState(_)))
        ));
    }

    #[test]
    fn test_discard_entangled_ket_upgrades_to_dm() {
        let mut engine = QuantumEngine::default();
        let mut rng = seeded_rng(0);
        let q = bell_pair(&mut engine);
        engine.discard(q[0], &mut rng).unwrap();
        assert!(!engine.is_assigned(q[0]));
        assert_eq!(engine.group_size(q[1]).unwrap(), 1);
        assert_eq!(engine.formalism_of(q[1]).unwrap(), Formalism::DensityMatrix);
    }

    #[test]
    fn test_discard_product_ket_stays_ket() {
        let mut engine = QuantumEngine::default();
        let mut rng = seeded_rng(0);
        let q = engine.create(2, true);
        engine.operate(&[q[1]], &ops::h()).unwrap();
        engine.combine(&q).unwrap();
        engine.discard(q[0], &mut rng).unwrap();
        assert_eq!(engine.formalism_of(q[1]).unwrap(), Formalism::Ket);
        assert_relative_eq!(
            engine.fidelity(&[q[1]], &ketstates::h0(), true).unwrap(),
            1.0,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_discard_stabilizer_samples_measurement() {
        let mut engine = QuantumEngine::new(Formalism::Stabilizer, 12);
        let mut rng = seeded_rng(5);
        let q = bell_pair(&mut engine);
        engine.discard(q[0], &mut rng).unwrap();
        assert!(!engine.is_assigned(q[0]));
        assert_eq!(engine.group_size(q[1]).unwrap(), 1);
        let rho = engine.reduced_density_matrix(&[q[1]]).unwrap();
        // Collapsed to |0⟩ or |1⟩
        assert_relative_eq!(rho[[0, 0]].re.max(rho[[1, 1]].re), 1.0, epsilon = 1e-9);
    }

    #[test]
    fn test_rdm_across_groups_respects_order() {
        let mut engine = QuantumEngine::default();
        let q = engine.create(2, true);
        engine.operate(&[q[0]], &ops::x()).unwrap();
        // q[1] ⊗ q[0] = |0⟩|1⟩
        let rho = engine.reduced_density_matrix(&[q[1], q[0]]).unwrap();
        assert_relative_eq!(rho[[1, 1]].re, 1.0);
    }

    #[test]
    fn test_rdm_does_not_mutate() {
        let mut engine = QuantumEngine::default();
        let q = bell_pair(&mut engine);
        let groups = engine.num_groups();
        let _ = engine.reduced_density_matrix(&[q[1]]).unwrap();
        assert_eq!(engine.num_groups(), groups);
        assert_eq!(engine.group_size(q[0]).unwrap(), 2);
    }

    #[test]
    fn test_fidelity_squared_and_not() {
        let mut engine = QuantumEngine::default();
        let q = engine.create(1, true);
        let f2 = engine.fidelity(&q, &ketstates::h0(), true).unwrap();
        let f = engine.fidelity(&q, &ketstates::h0(), false).unwrap();
        assert_relative_eq!(f2, 0.5, epsilon = 1e-12);
        assert_relative_eq!(f, 0.5f64.sqrt(), epsilon = 1e-12);
        assert!(engine.fidelity(&q, &ketstates::b00(), true).is_err());
    }

    #[test]
    fn test_reset_invalidates_old_ids() {
        let mut engine = QuantumEngine::default();
        let old = engine.create(2, true);
        engine.reset();
        assert!(!engine.is_assigned(old[0]));
        let new = engine.create(1, true);
        assert!(!old.contains(&new[0]));
        assert_eq!(engine.num_groups(), 1);
    }

    #[test]
    fn test_sample_index_skips_zero_weights() {
        let mut rng = seeded_rng(11);
        for _ in 0..100 {
            let i = sample_index(&[0.0, 1.0, 0.0, 3.0], &mut rng);
            assert!(i == 1 || i == 3);
        }
    }

    proptest! {
        #[test]
        fn prop_assign_then_rdm_recovers_state(
            theta in 0.0f64..std::f64::consts::PI,
            phi in 0.0f64..(2.0 * std::f64::consts::PI),
        ) {
            let psi = ndarray::array![
                num_complex::Complex64::new((theta / 2.0).cos(), 0.0),
                num_complex::Complex64::from_polar((theta / 2.0).sin(), phi)
            ];
            let mut engine = QuantumEngine::default();
            let q = engine.create(1, false);
            engine.assign(&q, QRepr::Ket(psi.clone())).unwrap();
            let rho = engine.reduced_density_matrix(&q).unwrap();
            let expected = linalg::ket_to_dm(&psi);
            for (a, b) in rho.iter().zip(expected.iter()) {
                prop_assert!((a - b).norm() < 1e-12);
            }
        }
    }
}
