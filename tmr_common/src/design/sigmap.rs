use std::collections::HashMap;

use super::{Module, SigBit, SigSpec};

/// Canonicalizes bits that are tied together by module-level connections.
///
/// The driving side of a connection becomes the representative, and
/// constants always win over wire bits.
#[derive(Clone, Debug, Default)]
pub struct SigMap {
    /// Parent links of the union-find forest. Roots are absent.
    parent: HashMap<SigBit, SigBit>,
}

impl SigMap {
    /// Builds the map from all connections of `module`.
    pub fn new(module: &Module) -> Self {
        let mut map = Self::default();
        for (lhs, rhs) in module.connections() {
            for (l, r) in lhs.iter().zip(rhs.iter()) {
                map.union(*l, *r);
            }
        }
        map.flatten();
        map
    }

    /// Joins the classes of `driven` and `driver`.
    pub fn union(&mut self, driven: SigBit, driver: SigBit) {
        let a = self.find(driven);
        let b = self.find(driver);
        if a == b || (a.is_const() && b.is_const()) {
            return;
        }
        if a.is_const() {
            self.parent.insert(b, a);
        } else {
            self.parent.insert(a, b);
        }
    }

    /// Representative of `bit`.
    pub fn find(&self, bit: SigBit) -> SigBit {
        let mut cur = bit;
        while let Some(next) = self.parent.get(&cur) {
            cur = *next;
        }
        cur
    }

    /// Maps every bit of `sig` to its representative.
    pub fn apply(&self, sig: &SigSpec) -> SigSpec {
        sig.iter().map(|bit| self.find(*bit)).collect()
    }

    /// Points every node directly at its root.
    fn flatten(&mut self) {
        let keys: Vec<SigBit> = self.parent.keys().copied().collect();
        for key in keys {
            let root = self.find(key);
            self.parent.insert(key, root);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_side_is_representative() {
        let mut m = Module::new("m");
        let a = m.add_wire("a", 1).unwrap();
        let b = m.add_wire("b", 1).unwrap();
        let c = m.add_wire("c", 1).unwrap();
        m.connect(m.sig(b), m.sig(a)).unwrap();
        m.connect(m.sig(c), m.sig(b)).unwrap();
        let map = SigMap::new(&m);
        assert_eq!(map.find(SigBit::wire(c, 0)), SigBit::wire(a, 0));
        assert_eq!(map.find(SigBit::wire(b, 0)), SigBit::wire(a, 0));
    }

    #[test]
    fn constants_win() {
        let mut m = Module::new("m");
        let a = m.add_wire("a", 2).unwrap();
        m.connect(m.sig(a), SigSpec::constant(0b01, 2)).unwrap();
        let map = SigMap::new(&m);
        assert_eq!(
            map.apply(&m.sig(a)).bits(),
            &[SigBit::One, SigBit::Zero]
        );
    }
}
