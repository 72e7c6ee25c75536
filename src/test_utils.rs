// Copyright 2026 QubitOS Contributors
// SPDX-License-Identifier: Apache-2.0

//! Shared test utilities for simulator tests.

use std::cell::RefCell;
use std::rc::Rc;

use num_complex::Complex64;
use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::events::{EntityId, EventExpression, EventType};
use crate::qubits::{ops, CMatrix, CVector, QubitId};
use crate::simulation::Simulation;

pub fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

/// Real-valued complex vector.
pub fn cvec(values: &[f64]) -> CVector {
    values.iter().map(|&v| c(v, 0.0)).collect()
}

pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Element-wise comparison of two density matrices.
pub fn assert_dm_eq(actual: &CMatrix, expected: &CMatrix, tol: f64) {
    assert_eq!(actual.dim(), expected.dim(), "shape mismatch");
    for ((idx, a), b) in actual.indexed_iter().zip(expected.iter()) {
        assert!(
            (a - b).norm() < tol,
            "element {:?}: {} != {} (tol {})",
            idx,
            a,
            b,
            tol
        );
    }
}

/// Two fresh qubits prepared in Φ+.
pub fn bell_pair(sim: &mut Simulation) -> [QubitId; 2] {
    let q = sim.qstate.create(2, true);
    sim.qstate.operate(&[q[0]], &ops::h()).unwrap();
    sim.qstate.operate(&q, &ops::cnot()).unwrap();
    [q[0], q[1]]
}

/// Persistent handler that records the time of every event it sees.
pub fn record_times(
    sim: &mut Simulation,
    owner: EntityId,
    source: EntityId,
    event_type: &EventType,
) -> Rc<RefCell<Vec<f64>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    sim.wait(
        owner,
        EventExpression::atomic(source, event_type),
        Box::new(move |_sim, trigger| {
            sink.borrow_mut().push(trigger.event.time);
            Ok(())
        }),
    );
    seen
}
