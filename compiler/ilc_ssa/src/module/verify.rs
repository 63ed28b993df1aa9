//! Structural verification of a single function.

use rustc_hash::{FxHashMap, FxHashSet};

use super::{Inst, SsaModule};
use crate::{BlockId, FunctionId, VerifyError};

impl SsaModule {
    /// Check that `function` is well formed:
    ///
    /// - no building errors were recorded against it
    /// - every block ends in a terminator whose targets belong to the function
    /// - phis sit at block heads, and every incoming block is a predecessor
    pub(crate) fn verify(&self, function: FunctionId) -> Result<(), VerifyError> {
        let name = self.function_name(function);
        let fail = |message: String| Err(VerifyError::new(name, message));

        if let Some((_, message)) = self.errors.iter().find(|(f, _)| *f == Some(function)) {
            return fail(message.clone());
        }

        let blocks = self.blocks(function);
        let owned: FxHashSet<BlockId> = blocks.iter().copied().collect();
        let mut preds: FxHashMap<BlockId, FxHashSet<BlockId>> = FxHashMap::default();

        for block in blocks {
            let Some(term) = self.terminator(*block) else {
                return fail(format!("block `{}` has no terminator", self.block_name(*block)));
            };
            for succ in term.successors() {
                if !owned.contains(&succ) {
                    return fail(format!(
                        "block `{}` branches outside the function",
                        self.block_name(*block)
                    ));
                }
                preds.entry(succ).or_default().insert(*block);
            }
        }

        for block in blocks {
            let mut in_head = true;
            for value in self.block_insts(*block) {
                let Some(Inst::Phi { incoming }) = self.inst(*value) else {
                    in_head = false;
                    continue;
                };
                if !in_head {
                    return fail(format!(
                        "phi after a non-phi instruction in `{}`",
                        self.block_name(*block)
                    ));
                }
                let block_preds = preds.get(block);
                for (_, from) in incoming {
                    if !block_preds.is_some_and(|p| p.contains(from)) {
                        return fail(format!(
                            "phi in `{}` has an incoming edge from non-predecessor `{}`",
                            self.block_name(*block),
                            self.block_name(*from)
                        ));
                    }
                }
            }
        }

        Ok(())
    }
}
