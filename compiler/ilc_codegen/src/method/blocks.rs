//! Basic block discovery.

use std::collections::BTreeMap;

use ilc_meta::Instruction;
use smallvec::SmallVec;

/// Block leaders of a body mapped to their number of distinct incoming
/// edges.
///
/// Leaders are instruction 0, every branch target, and every instruction
/// following one that ends a block. The entry edge into instruction 0 is
/// counted, as is fallthrough from the preceding instruction.
pub fn analyze(instructions: &[Instruction]) -> BTreeMap<usize, u32> {
    let mut leaders = BTreeMap::new();
    if instructions.is_empty() {
        return leaders;
    }
    leaders.insert(0, 0);
    for (index, instr) in instructions.iter().enumerate() {
        for target in instr.targets() {
            leaders.entry(*target).or_insert(0);
        }
        if instr.opcode.flow().ends_block() && index + 1 < instructions.len() {
            leaders.entry(index + 1).or_insert(0);
        }
    }

    *leaders.entry(0).or_insert(0) += 1;
    for (index, instr) in instructions.iter().enumerate() {
        for target in successors(instructions, index, instr) {
            if let Some(refers) = leaders.get_mut(&target) {
                *refers += 1;
            }
        }
    }
    leaders
}

/// Distinct successor instructions of `instr` that start a new block.
/// Plain fallthrough into a non-leader is not an edge.
pub fn successors(instructions: &[Instruction], index: usize, instr: &Instruction) -> SmallVec<[usize; 2]> {
    let mut out: SmallVec<[usize; 2]> = SmallVec::new();
    for target in instr.targets() {
        if !out.contains(target) {
            out.push(*target);
        }
    }
    let next = index + 1;
    if instr.opcode.flow().falls_through() && next < instructions.len() && !out.contains(&next) {
        out.push(next);
    }
    out
}
