use ilc_meta::{Assembly, TypeSig};
use ilc_ssa::{Backend, BlockId, FunctionId, Linkage, SsaModule, TypeId};
use pretty_assertions::assert_eq;

use super::*;

struct Fixture {
    asm: Assembly,
    m: SsaModule,
    i32_ty: TypeId,
    preds: Vec<BlockId>,
    join: BlockId,
}

fn fixture(predecessors: usize) -> Fixture {
    let asm = Assembly::new("test");
    let mut m = SsaModule::new("test");
    let i32_ty = m.int_type(32);
    let fn_ty = m.function_type(i32_ty, &[]);
    let f: FunctionId = m.add_function("f", fn_ty, Linkage::Internal);
    let preds = (0..predecessors)
        .map(|i| m.append_block(f, &format!("p{i}")))
        .collect();
    let join = m.append_block(f, "join");
    Fixture {
        asm,
        m,
        i32_ty,
        preds,
        join,
    }
}

fn int_stack(m: &mut SsaModule, ty: TypeId, values: &[i64]) -> EvalStack {
    let mut stack = EvalStack::new();
    for v in values {
        let value = m.const_int(ty, *v);
        stack.push(StackElement::new(value, TypeSig::I4, ty));
    }
    stack
}

fn phis(m: &SsaModule, block: BlockId) -> usize {
    m.block_insts(block)
        .iter()
        .filter(|v| m.phi_incoming(**v).is_some())
        .count()
}

#[test]
fn single_predecessor_passes_values_through() {
    let mut fx = fixture(1);
    let outgoing = int_stack(&mut fx.m, fx.i32_ty, &[7, 8]);

    let mut incoming = EvalStack::new();
    fx.m.position_at_end(fx.preds[0]);
    incoming.merge(&fx.asm, &mut fx.m, &outgoing, fx.preds[0], fx.join, 1);

    assert_eq!(incoming.elements(), outgoing.elements());
    assert_eq!(phis(&fx.m, fx.join), 0);
}

#[test]
fn first_edge_defers_and_second_edge_creates_phi() {
    let mut fx = fixture(2);
    let (p0, p1) = (fx.preds[0], fx.preds[1]);
    let first = int_stack(&mut fx.m, fx.i32_ty, &[1]);
    let second = int_stack(&mut fx.m, fx.i32_ty, &[2]);

    let mut incoming = EvalStack::new();
    fx.m.position_at_end(p0);
    incoming.merge(&fx.asm, &mut fx.m, &first, p0, fx.join, 2);
    assert_eq!(incoming.state(0), Some(SlotState::Deferred { from: p0 }));
    assert_eq!(incoming.elements()[0].value, first.elements()[0].value);
    assert_eq!(phis(&fx.m, fx.join), 0);

    fx.m.position_at_end(p1);
    incoming.merge(&fx.asm, &mut fx.m, &second, p1, fx.join, 2);
    assert_eq!(incoming.state(0), Some(SlotState::Phi));
    let phi = incoming.elements()[0].value;
    assert_eq!(
        fx.m.phi_incoming(phi).unwrap(),
        &[
            (first.elements()[0].value, p0),
            (second.elements()[0].value, p1)
        ][..]
    );
}

#[test]
fn three_predecessors_share_one_phi_per_slot() {
    let mut fx = fixture(3);
    let stacks: Vec<EvalStack> = [[1, 10], [2, 20], [3, 30]]
        .iter()
        .map(|values| int_stack(&mut fx.m, fx.i32_ty, values))
        .collect();

    let mut incoming = EvalStack::new();
    for (pred, stack) in fx.preds.clone().into_iter().zip(&stacks) {
        fx.m.position_at_end(pred);
        incoming.merge(&fx.asm, &mut fx.m, stack, pred, fx.join, 3);
    }

    assert_eq!(incoming.len(), 2);
    assert_eq!(phis(&fx.m, fx.join), 2);
    for slot in 0..2 {
        let phi = incoming.elements()[slot].value;
        let edges = fx.m.phi_incoming(phi).unwrap();
        assert_eq!(edges.len(), 3);
        let sources: Vec<BlockId> = edges.iter().map(|(_, block)| *block).collect();
        assert_eq!(sources, fx.preds);
        for (k, (value, _)) in edges.iter().enumerate() {
            assert_eq!(*value, stacks[k].elements()[slot].value);
        }
    }
}

#[test]
fn mismatched_widths_are_cast_in_the_predecessor() {
    let mut fx = fixture(2);
    let (p0, p1) = (fx.preds[0], fx.preds[1]);
    let i8_ty = fx.m.int_type(8);
    let first = int_stack(&mut fx.m, fx.i32_ty, &[1]);
    let narrow = int_stack(&mut fx.m, i8_ty, &[0]);

    let mut incoming = EvalStack::new();
    fx.m.position_at_end(p0);
    incoming.merge(&fx.asm, &mut fx.m, &first, p0, fx.join, 2);
    fx.m.position_at_end(p1);
    incoming.merge(&fx.asm, &mut fx.m, &narrow, p1, fx.join, 2);

    let phi = incoming.elements()[0].value;
    assert_eq!(fx.m.type_of(phi), fx.i32_ty);
    let (cast, block) = fx.m.phi_incoming(phi).unwrap()[1];
    assert_eq!(block, p1);
    assert_eq!(fx.m.type_of(cast), fx.i32_ty);
    assert_eq!(fx.m.block_insts(p1), &[cast][..]);
}

#[test]
fn taller_predecessor_inserts_missing_slots_at_the_bottom() {
    let mut fx = fixture(2);
    let (p0, p1) = (fx.preds[0], fx.preds[1]);
    let short = int_stack(&mut fx.m, fx.i32_ty, &[5]);
    let tall = int_stack(&mut fx.m, fx.i32_ty, &[9, 6]);

    let mut incoming = EvalStack::new();
    fx.m.position_at_end(p0);
    incoming.merge(&fx.asm, &mut fx.m, &short, p0, fx.join, 2);
    fx.m.position_at_end(p1);
    incoming.merge(&fx.asm, &mut fx.m, &tall, p1, fx.join, 2);

    assert_eq!(incoming.len(), 2);
    assert_eq!(incoming.elements()[0].value, tall.elements()[0].value);
    assert_eq!(incoming.state(1), Some(SlotState::Phi));
    assert_eq!(phis(&fx.m, fx.join), 1);
}

#[test]
fn snapshot_resets_slot_states() {
    let mut fx = fixture(2);
    let p0 = fx.preds[0];
    let first = int_stack(&mut fx.m, fx.i32_ty, &[1, 2]);
    let mut incoming = EvalStack::new();
    incoming.merge(&fx.asm, &mut fx.m, &first, p0, fx.join, 2);

    let working = incoming.snapshot();
    assert_eq!(working.elements(), incoming.elements());
    assert_eq!(working.state(0), Some(SlotState::Unvisited));
    assert_eq!(working.state(1), Some(SlotState::Unvisited));
}

#[test]
fn pop_and_peek_are_lifo() {
    let mut fx = fixture(0);
    let mut stack = int_stack(&mut fx.m, fx.i32_ty, &[1, 2, 3]);
    let top = stack.peek().unwrap().value;
    assert_eq!(stack.pop().unwrap().value, top);
    assert_eq!(stack.len(), 2);
    stack.clear();
    assert!(stack.is_empty());
    assert_eq!(stack.pop(), None);
}
