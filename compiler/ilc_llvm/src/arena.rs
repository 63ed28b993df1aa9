//! Handle-indexed storage for LLVM values, blocks and functions.

use inkwell::basic_block::BasicBlock;
use inkwell::values::{BasicValueEnum, FunctionValue, GlobalValue, PhiValue};
use ilc_ssa::{BlockId, FunctionId, TypeId, ValueId};

/// What kind of LLVM object a value handle refers to.
#[derive(Clone, Copy)]
pub(crate) enum ValueKind<'ctx> {
    /// Constant, function address or string literal.
    Constant,
    /// Pointer to a module global whose content type is `content`.
    Global {
        global: GlobalValue<'ctx>,
        content: TypeId,
    },
    Phi(PhiValue<'ctx>),
    /// Result of an ordinary instruction.
    Inst,
}

#[derive(Clone, Copy)]
pub(crate) struct ValueEntry<'ctx> {
    pub value: BasicValueEnum<'ctx>,
    pub ty: TypeId,
    pub kind: ValueKind<'ctx>,
}

pub(crate) struct FunctionEntry<'ctx> {
    pub value: FunctionValue<'ctx>,
    pub ty: TypeId,
    pub name: String,
    /// Pre-registered parameter handles, in order.
    pub params: Vec<ValueId>,
}

#[derive(Default)]
pub(crate) struct ValueArena<'ctx> {
    values: Vec<ValueEntry<'ctx>>,
    blocks: Vec<(BasicBlock<'ctx>, FunctionId)>,
    functions: Vec<FunctionEntry<'ctx>>,
}

impl<'ctx> ValueArena<'ctx> {
    #[allow(clippy::cast_possible_truncation, reason = "arena indices fit in u32")]
    pub fn push_value(&mut self, entry: ValueEntry<'ctx>) -> ValueId {
        let id = ValueId::new(self.values.len() as u32);
        self.values.push(entry);
        id
    }

    #[inline]
    pub fn value(&self, id: ValueId) -> &ValueEntry<'ctx> {
        debug_assert!(id.index() < self.values.len(), "ValueId {} out of range", id.raw());
        &self.values[id.index()]
    }

    #[allow(clippy::cast_possible_truncation, reason = "arena indices fit in u32")]
    pub fn push_block(&mut self, block: BasicBlock<'ctx>, function: FunctionId) -> BlockId {
        let id = BlockId::new(self.blocks.len() as u32);
        self.blocks.push((block, function));
        id
    }

    #[inline]
    pub fn block(&self, id: BlockId) -> BasicBlock<'ctx> {
        debug_assert!(id.index() < self.blocks.len(), "BlockId {} out of range", id.raw());
        self.blocks[id.index()].0
    }

    pub fn block_function(&self, id: BlockId) -> FunctionId {
        self.blocks[id.index()].1
    }

    #[allow(clippy::cast_possible_truncation, reason = "arena indices fit in u32")]
    pub fn push_function(&mut self, entry: FunctionEntry<'ctx>) -> FunctionId {
        let id = FunctionId::new(self.functions.len() as u32);
        self.functions.push(entry);
        id
    }

    #[inline]
    pub fn function(&self, id: FunctionId) -> &FunctionEntry<'ctx> {
        debug_assert!(id.index() < self.functions.len(), "FunctionId {} out of range", id.raw());
        &self.functions[id.index()]
    }
}
