#![allow(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

mod common;

use quickcheck::{Arbitrary, Gen, QuickCheck, TestResult};
use tmr_common::{Module, SigBit, SigMap, SigSpec};

use common::init_test_logger;

const WIRES: usize = 8;

/// Random `lhs <- rhs` links between 1-bit wires; `None` on the right ties
/// the wire to constant zero.
#[derive(Clone, Debug)]
struct Links(Vec<(usize, Option<usize>)>);

impl Arbitrary for Links {
    fn arbitrary(g: &mut Gen) -> Self {
        let len = usize::arbitrary(g) % 12;
        Self(
            (0..len)
                .map(|_| {
                    let lhs = usize::arbitrary(g) % WIRES;
                    let rhs = (u8::arbitrary(g) % 6 != 0).then(|| usize::arbitrary(g) % WIRES);
                    (lhs, rhs)
                })
                .collect(),
        )
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        Box::new(self.0.shrink().map(Self))
    }
}

/// Connected components by plain graph search; the constant is node `WIRES`.
fn components(links: &Links) -> Vec<usize> {
    let mut label: Vec<usize> = (0..=WIRES).collect();
    let mut changed = true;
    while changed {
        changed = false;
        for (lhs, rhs) in &links.0 {
            let rhs = rhs.unwrap_or(WIRES);
            let min = label[*lhs].min(label[rhs]);
            if label[*lhs] != min || label[rhs] != min {
                label[*lhs] = min;
                label[rhs] = min;
                changed = true;
            }
        }
    }
    label
}

fn prop_sigmap_matches_components(links: Links) -> TestResult {
    let mut m = Module::new("links");
    let Ok(wires) = (0..WIRES)
        .map(|i| m.add_wire(format!("w{i}"), 1))
        .collect::<Result<Vec<_>, _>>()
    else {
        return TestResult::error("wire creation failed");
    };
    for (lhs, rhs) in &links.0 {
        let rhs = rhs.map_or_else(|| SigSpec::constant(0, 1), |r| m.sig(wires[r]));
        if m.connect(m.sig(wires[*lhs]), rhs).is_err() {
            return TestResult::error("connect failed");
        }
    }

    let map = SigMap::new(&m);
    let label = components(&links);
    let reps: Vec<SigBit> = wires.iter().map(|w| map.find(SigBit::wire(*w, 0))).collect();
    for (i, rep) in reps.iter().enumerate() {
        if (label[i] == label[WIRES]) != (*rep == SigBit::Zero) {
            return TestResult::failed();
        }
        for (j, other) in reps.iter().enumerate() {
            if (rep == other) != (label[i] == label[j]) {
                return TestResult::failed();
            }
        }
    }
    TestResult::passed()
}

#[test]
fn sigmap_groups_connected_bits() {
    init_test_logger();
    QuickCheck::new()
        .tests(300)
        .quickcheck(prop_sigmap_matches_components as fn(Links) -> TestResult);
}
