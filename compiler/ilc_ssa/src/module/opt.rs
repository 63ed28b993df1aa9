//! Function-level cleanup.

use rustc_hash::FxHashSet;

use super::{Inst, SsaModule, ValueKind};
use crate::{BlockId, FunctionId};

impl SsaModule {
    /// Detach blocks not reachable from the entry block and drop phi edges
    /// coming from them.
    pub(crate) fn remove_unreachable_blocks(&mut self, function: FunctionId) {
        let blocks = self.blocks(function).to_vec();
        let Some(entry) = blocks.first().copied() else {
            return;
        };

        let mut reachable = FxHashSet::default();
        let mut work = vec![entry];
        while let Some(block) = work.pop() {
            if !reachable.insert(block) {
                continue;
            }
            if let Some(term) = self.terminator(block) {
                work.extend(term.successors());
            }
        }

        let dead: Vec<BlockId> = blocks.iter().copied().filter(|b| !reachable.contains(b)).collect();
        if dead.is_empty() {
            return;
        }
        tracing::trace!(
            function = %self.function_name(function),
            removed = dead.len(),
            "removing unreachable blocks"
        );

        self.functions[function.index()]
            .blocks
            .retain(|b| reachable.contains(b));
        for block in &reachable {
            let insts = self.blocks[block.index()].insts.clone();
            for value in insts {
                if let ValueKind::Inst {
                    inst: Inst::Phi { incoming },
                    ..
                } = &mut self.values[value.index()].kind
                {
                    incoming.retain(|(_, from)| reachable.contains(from));
                }
            }
        }
    }
}
