//! The abstract evaluation stack and control-flow merge reconciliation.
//!
//! Method bodies are translated in one linear pass with no precomputed
//! control-flow graph. Each block leader owns an *incoming* stack that is
//! filled in as branches to it are emitted. With a single predecessor the
//! incoming values are used as they are. With several, each slot moves
//! through a small state machine:
//!
//! ```text
//! Unvisited --first edge--> Deferred { from } --second edge--> Phi
//!                                                  Phi --nth edge--> Phi
//! ```
//!
//! A deferred slot holds the first predecessor's value. The second edge
//! replaces it with a phi at the head of the target block carrying both
//! edges; later edges only add incomings. Incoming values whose type
//! differs from the phi's are cast in the predecessor, so reconciliation
//! must run before the predecessor's terminator is emitted.

use ilc_meta::{Assembly, TypeSig};
use ilc_ssa::{Backend, BlockId, TypeId, ValueId};

use crate::cast::coerce;
use crate::type_map::is_signed;

/// One evaluation stack entry: an SSA value tagged with its IL type.
#[derive(Clone, Debug, PartialEq)]
pub struct StackElement {
    pub value: ValueId,
    pub sig: TypeSig,
    pub ty: TypeId,
}

impl StackElement {
    pub fn new(value: ValueId, sig: TypeSig, ty: TypeId) -> Self {
        StackElement { value, sig, ty }
    }
}

/// Reconciliation state of one slot of an incoming stack.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SlotState {
    Unvisited,
    /// Holds the value from `from`; a phi is created on the next edge.
    Deferred { from: BlockId },
    Phi,
}

#[derive(Clone, Debug, Default)]
pub struct EvalStack {
    elements: Vec<StackElement>,
    states: Vec<SlotState>,
}

impl EvalStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, element: StackElement) {
        self.elements.push(element);
        self.states.push(SlotState::Unvisited);
    }

    pub fn pop(&mut self) -> Option<StackElement> {
        self.states.pop();
        self.elements.pop()
    }

    pub fn peek(&self) -> Option<&StackElement> {
        self.elements.last()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn clear(&mut self) {
        self.elements.clear();
        self.states.clear();
    }

    /// Elements bottom to top.
    pub fn elements(&self) -> &[StackElement] {
        &self.elements
    }

    pub fn state(&self, slot: usize) -> Option<SlotState> {
        self.states.get(slot).copied()
    }

    /// A working copy for emitting the block this stack flows into.
    pub fn snapshot(&self) -> EvalStack {
        EvalStack {
            elements: self.elements.clone(),
            states: vec![SlotState::Unvisited; self.elements.len()],
        }
    }

    /// Merge the stack `incoming`, live at the end of `from`, into this
    /// incoming stack of `target`, which has `refers` predecessors.
    ///
    /// The builder must still be positioned in `from`, before its
    /// terminator.
    pub fn merge(
        &mut self,
        asm: &Assembly,
        b: &mut dyn Backend,
        incoming: &EvalStack,
        from: BlockId,
        target: BlockId,
        refers: u32,
    ) {
        if refers <= 1 {
            for element in &incoming.elements {
                self.push(element.clone());
            }
            return;
        }

        // Values below everything this target has seen so far are
        // inserted at the bottom unchanged.
        let difference = if !self.is_empty() && incoming.len() > self.len() {
            incoming.len() - self.len()
        } else {
            0
        };
        self.elements
            .splice(0..0, incoming.elements[..difference].iter().cloned());
        self.states
            .splice(0..0, std::iter::repeat(SlotState::Deferred { from }).take(difference));

        for (slot, element) in incoming.elements.iter().enumerate().skip(difference) {
            if slot >= self.len() {
                self.elements.push(element.clone());
                self.states.push(SlotState::Deferred { from });
                tracing::trace!(slot, ?from, "deferred phi");
                continue;
            }
            match self.states[slot] {
                SlotState::Unvisited => {
                    self.elements[slot] = element.clone();
                    self.states[slot] = SlotState::Deferred { from };
                }
                SlotState::Deferred { from: first_from } => {
                    let first = self.elements[slot].clone();
                    let phi = b.phi(target, first.ty);
                    b.add_incoming(phi, first.value, first_from);
                    let value = coerce(b, element.value, first.ty, is_signed(asm, &element.sig));
                    b.add_incoming(phi, value, from);
                    self.elements[slot] = StackElement::new(phi, first.sig, first.ty);
                    self.states[slot] = SlotState::Phi;
                    tracing::trace!(slot, ?first_from, ?from, "created phi");
                }
                SlotState::Phi => {
                    let phi = &self.elements[slot];
                    let value = coerce(b, element.value, phi.ty, is_signed(asm, &element.sig));
                    b.add_incoming(phi.value, value, from);
                    tracing::trace!(slot, ?from, "extended phi");
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests use unwrap for concise assertions")]
mod tests;
