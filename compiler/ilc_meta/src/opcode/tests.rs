use rustc_hash::FxHashSet;

use super::*;

#[test]
fn mnemonics_are_unique() {
    let mut seen = FxHashSet::default();
    for op in Opcode::ALL {
        assert!(seen.insert(op.mnemonic()), "duplicate mnemonic {}", op.mnemonic());
    }
}

#[test]
fn branch_flow() {
    assert_eq!(Opcode::BrS.flow(), FlowControl::Branch);
    assert_eq!(Opcode::BneUn.flow(), FlowControl::CondBranch);
    assert_eq!(Opcode::Switch.flow(), FlowControl::Switch);
    assert_eq!(Opcode::Ret.flow(), FlowControl::Return);
    assert_eq!(Opcode::Add.flow(), FlowControl::Next);
}

#[test]
fn fall_through() {
    assert!(FlowControl::CondBranch.falls_through());
    assert!(FlowControl::Switch.falls_through());
    assert!(!FlowControl::Branch.falls_through());
    assert!(!FlowControl::Throw.falls_through());
    assert!(!FlowControl::Next.ends_block());
    assert!(FlowControl::Return.ends_block());
}
