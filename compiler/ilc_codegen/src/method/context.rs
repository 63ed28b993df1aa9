//! Per-method emission state.

use ilc_meta::{Assembly, FieldId, Instruction, MethodDef, MethodId, Opcode, Operand, TypeSig};
use ilc_ssa::{Backend, BlockId, FunctionId, TypeId, ValueId};
use rustc_hash::FxHashMap;

use crate::context::CodegenContext;
use crate::stack::{EvalStack, StackElement};
use crate::{CodegenError, CodegenResult};

/// An argument or local: its stack slot and its declared type.
#[derive(Clone, Debug)]
pub struct Variable {
    pub ptr: ValueId,
    pub sig: TypeSig,
    pub ty: TypeId,
}

/// A block leader: its IR block, its predecessor count and the stack the
/// predecessors reconciled into it.
pub struct BlockInfo {
    pub block: BlockId,
    pub refers: u32,
    pub incoming: EvalStack,
}

/// Everything a [`CodeEmitter`](crate::emit::CodeEmitter) sees while
/// translating one instruction.
pub struct MethodContext<'c, 'a> {
    pub cx: &'c mut CodegenContext<'a>,
    pub method: MethodId,
    pub function: FunctionId,
    pub args: Vec<Variable>,
    pub locals: Vec<Variable>,
    pub stack: EvalStack,
    pub(crate) blocks: FxHashMap<usize, BlockInfo>,
    pub(crate) current: BlockId,
    pub(crate) index: usize,
    pub(crate) opcode: Opcode,
}

impl<'a> MethodContext<'_, 'a> {
    pub fn asm(&self) -> &'a Assembly {
        self.cx.asm
    }

    pub fn def(&self) -> &'a MethodDef {
        self.cx.asm.method(self.method)
    }

    /// `Namespace.Type::Method`, for diagnostics.
    pub fn display_name(&self) -> String {
        let def = self.def();
        format!("{}::{}", self.asm().type_def(def.declaring_type).full_name(), def.name)
    }

    pub fn current_block(&self) -> BlockId {
        self.current
    }

    // ── Stack ───────────────────────────────────────────────────────

    pub fn push(&mut self, element: StackElement) {
        self.stack.push(element);
    }

    pub fn pop(&mut self) -> CodegenResult<StackElement> {
        self.stack.pop().ok_or_else(|| CodegenError::StackUnderflow {
            method: self.display_name(),
            index: self.index,
            opcode: self.opcode.mnemonic(),
        })
    }

    /// Pop `count` elements, returned in push order.
    pub fn pop_n(&mut self, count: usize) -> CodegenResult<Vec<StackElement>> {
        let mut out = Vec::with_capacity(count);
        for _ in 0..count {
            out.push(self.pop()?);
        }
        out.reverse();
        Ok(out)
    }

    // ── Operands ────────────────────────────────────────────────────

    pub fn malformed(&self, reason: impl Into<String>) -> CodegenError {
        CodegenError::MalformedOperand {
            method: self.display_name(),
            index: self.index,
            opcode: self.opcode.mnemonic(),
            reason: reason.into(),
        }
    }

    pub fn field_operand(&self, instr: &Instruction) -> CodegenResult<FieldId> {
        match instr.operand {
            Operand::Field(field) => Ok(field),
            _ => Err(self.malformed("expected a field token")),
        }
    }

    pub fn method_operand(&self, instr: &Instruction) -> CodegenResult<MethodId> {
        match instr.operand {
            Operand::Method(method) => Ok(method),
            _ => Err(self.malformed("expected a method token")),
        }
    }

    pub fn type_operand<'i>(&self, instr: &'i Instruction) -> CodegenResult<&'i TypeSig> {
        match &instr.operand {
            Operand::Type(sig) => Ok(sig),
            _ => Err(self.malformed("expected a type token")),
        }
    }

    pub fn target_operand(&self, instr: &Instruction) -> CodegenResult<usize> {
        match instr.operand {
            Operand::Target(target) => Ok(target),
            _ => Err(self.malformed("expected a branch target")),
        }
    }

    // ── Control flow ────────────────────────────────────────────────

    /// Reconcile the current stack into the leader at instruction
    /// `target` and return its block. Call before emitting the branch.
    pub fn reconcile(&mut self, b: &mut dyn Backend, target: usize) -> CodegenResult<BlockId> {
        let asm = self.cx.asm;
        let from = self.current;
        let Some(info) = self.blocks.get_mut(&target) else {
            return Err(self.malformed(format!("branch target {target} is not an instruction")));
        };
        info.incoming
            .merge(asm, b, &self.stack, from, info.block, info.refers);
        Ok(info.block)
    }

    pub fn is_leader(&self, index: usize) -> bool {
        self.blocks.contains_key(&index)
    }

    /// Start emitting the block that begins at `index`, closing the
    /// current block with a fallthrough branch if it is still open.
    pub fn enter_block(&mut self, b: &mut dyn Backend, index: usize) -> CodegenResult<()> {
        if !b.is_terminated(self.current) {
            let block = self.reconcile(b, index)?;
            b.br(block);
        }
        let Some(info) = self.blocks.get(&index) else {
            return Err(self.malformed("block entry at a non-leader"));
        };
        self.current = info.block;
        self.stack = info.incoming.snapshot();
        b.position_at_end(info.block);
        tracing::trace!(index, depth = self.stack.len(), "entered block");
        Ok(())
    }
}
