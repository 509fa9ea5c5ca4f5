use tmr_common::annotations;
use tmr_common::{Module, SigSpec};
use tracing::{debug, info};

use super::LogicCone;
use crate::{
    ConnectivityIndex, FixOutcome, FixWalkerManager, NodeKind, NodeRef, TmrError, VoterBuilder,
};

impl LogicCone {
    /// Inserts a majority voter at the cut point and repairs the nets left
    /// with several drivers.
    ///
    /// The original cut point and its two replicas are each rebound to a
    /// fresh voter input net, and the voter takes over the net they drove.
    /// Empty cones are left untouched. A cone whose interior is only nets
    /// (register to register wiring) gets no voter; its nets are split so
    /// each copy keeps its own path.
    ///
    /// # Errors
    /// - [`TmrError::SpecialWiring`] if the output net has several original drivers.
    /// - [`TmrError::NoCutPoint`] if the cut point is not an element.
    /// - [`TmrError::NotReplicated`] if the cut point was never replicated.
    /// - [`TmrError::MultiOutput`] if the cut point cell has more than one output port.
    pub fn wire(
        &mut self,
        module: &mut Module,
        index: &ConnectivityIndex,
        voters: &mut VoterBuilder,
    ) -> Result<FixOutcome, TmrError> {
        if self.is_empty() {
            debug!("cone {} is empty; no voter needed", self.id);
            return Ok(FixOutcome::default());
        }

        if let NodeKind::Boundary(wire) = self.output().kind {
            let drivers = index.source_count(wire);
            if drivers > 1 {
                return Err(TmrError::SpecialWiring {
                    name: module.wire(wire).name().to_owned(),
                    cone: self.id,
                    drivers,
                });
            }
        }

        let Some(cut) = self.cut_point() else {
            debug!("cone {}: interior holds only nets; splitting them without a voter", self.id);
            return FixWalkerManager::default().run(module);
        };
        let NodeKind::Combinational(cell) = cut.kind else {
            return Err(TmrError::NoCutPoint { cone: self.id });
        };
        let name = module.cell(cell).name().to_owned();
        let Some([NodeRef::Cell(r1), NodeRef::Cell(r2)]) = cut.replicas() else {
            return Err(TmrError::NotReplicated { name, cone: self.id });
        };

        let outputs = module.cell(cell).output_ports();
        let [port] = outputs.as_slice() else {
            return Err(TmrError::MultiOutput {
                name,
                cone: self.id,
                count: outputs.len(),
            });
        };
        let port = (*port).to_owned();
        let out = module.cell(cell).port(&port).cloned().unwrap_or_default();

        let cone = i64::from(self.id.as_u32());
        let mut copies: Vec<SigSpec> = Vec::with_capacity(3);
        for (k, copy) in [cell, r1, r2].into_iter().enumerate() {
            let net = module.fresh_wire(&format!("tmr_vote{k}_cone{}", self.id), out.width());
            module.wire_mut(net).attributes.set_int(annotations::CONE, cone);
            let sig = module.sig(net);
            module.cell_mut(copy).set_port(port.as_str(), sig.clone());
            copies.push(sig);
        }

        voters.build(module, &copies[0], &copies[1], &copies[2], &out)?;
        info!(
            "cone {}: voter {} inserted at '{name}.{port}' ({} bit(s))",
            self.id,
            voters.voter_count() - 1,
            out.width()
        );

        FixWalkerManager::default().run(module)
    }
}
