//! The IR construction capability consumed by the translator.
//!
//! Follows the split used by `rustc_codegen_ssa`: the translator talks to
//! an abstract builder and never inspects the backend's representation.
//! The trait is object safe so the pipeline can run over
//! `&mut dyn Backend`.
//!
//! Builder methods are infallible. Misuse (a type mismatch, an instruction
//! appended to a terminated block) is recorded by the backend and reported
//! by [`Backend::verify_function`].

use crate::{BlockId, FunctionId, OptLevel, TypeId, ValueId, VerifyError};

/// Symbol visibility of a function or global.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Linkage {
    /// Visible outside the module.
    External,
    /// Module-private.
    Internal,
}

/// Coarse classification of a type, enough for the translator to pick
/// between integer, float and pointer instruction forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeClass {
    Void,
    /// Integer of the given bit width.
    Int(u32),
    /// IEEE float of the given bit width (32 or 64).
    Float(u32),
    Pointer,
    Array,
    Struct,
    Function,
}

impl TypeClass {
    pub fn is_int(self) -> bool {
        matches!(self, TypeClass::Int(_))
    }

    pub fn is_float(self) -> bool {
        matches!(self, TypeClass::Float(_))
    }

    pub fn is_pointer(self) -> bool {
        self == TypeClass::Pointer
    }

    /// Bit width of integer and float types.
    pub fn bits(self) -> Option<u32> {
        match self {
            TypeClass::Int(bits) | TypeClass::Float(bits) => Some(bits),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    SDiv,
    UDiv,
    SRem,
    URem,
    And,
    Or,
    Xor,
    Shl,
    /// Arithmetic (sign-filling) right shift.
    AShr,
    /// Logical (zero-filling) right shift.
    LShr,
    FAdd,
    FSub,
    FMul,
    FDiv,
    FRem,
}

impl BinaryOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::SDiv => "sdiv",
            BinaryOp::UDiv => "udiv",
            BinaryOp::SRem => "srem",
            BinaryOp::URem => "urem",
            BinaryOp::And => "and",
            BinaryOp::Or => "or",
            BinaryOp::Xor => "xor",
            BinaryOp::Shl => "shl",
            BinaryOp::AShr => "ashr",
            BinaryOp::LShr => "lshr",
            BinaryOp::FAdd => "fadd",
            BinaryOp::FSub => "fsub",
            BinaryOp::FMul => "fmul",
            BinaryOp::FDiv => "fdiv",
            BinaryOp::FRem => "frem",
        }
    }

    pub fn is_float(self) -> bool {
        matches!(
            self,
            BinaryOp::FAdd | BinaryOp::FSub | BinaryOp::FMul | BinaryOp::FDiv | BinaryOp::FRem
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    FNeg,
    Not,
}

impl UnaryOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            UnaryOp::Neg => "neg",
            UnaryOp::FNeg => "fneg",
            UnaryOp::Not => "not",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CastOp {
    Trunc,
    ZExt,
    SExt,
    FpTrunc,
    FpExt,
    FpToSi,
    FpToUi,
    SiToFp,
    UiToFp,
    PtrToInt,
    IntToPtr,
    BitCast,
}

impl CastOp {
    pub fn mnemonic(self) -> &'static str {
        match self {
            CastOp::Trunc => "trunc",
            CastOp::ZExt => "zext",
            CastOp::SExt => "sext",
            CastOp::FpTrunc => "fptrunc",
            CastOp::FpExt => "fpext",
            CastOp::FpToSi => "fptosi",
            CastOp::FpToUi => "fptoui",
            CastOp::SiToFp => "sitofp",
            CastOp::UiToFp => "uitofp",
            CastOp::PtrToInt => "ptrtoint",
            CastOp::IntToPtr => "inttoptr",
            CastOp::BitCast => "bitcast",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntPredicate {
    Eq,
    Ne,
    Sgt,
    Sge,
    Slt,
    Sle,
    Ugt,
    Uge,
    Ult,
    Ule,
}

impl IntPredicate {
    pub fn mnemonic(self) -> &'static str {
        match self {
            IntPredicate::Eq => "eq",
            IntPredicate::Ne => "ne",
            IntPredicate::Sgt => "sgt",
            IntPredicate::Sge => "sge",
            IntPredicate::Slt => "slt",
            IntPredicate::Sle => "sle",
            IntPredicate::Ugt => "ugt",
            IntPredicate::Uge => "uge",
            IntPredicate::Ult => "ult",
            IntPredicate::Ule => "ule",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FloatPredicate {
    Oeq,
    One,
    Ogt,
    Oge,
    Olt,
    Ole,
    Ueq,
    Une,
    Ugt,
    Uge,
    Ult,
    Ule,
}

impl FloatPredicate {
    pub fn mnemonic(self) -> &'static str {
        match self {
            FloatPredicate::Oeq => "oeq",
            FloatPredicate::One => "one",
            FloatPredicate::Ogt => "ogt",
            FloatPredicate::Oge => "oge",
            FloatPredicate::Olt => "olt",
            FloatPredicate::Ole => "ole",
            FloatPredicate::Ueq => "ueq",
            FloatPredicate::Une => "une",
            FloatPredicate::Ugt => "ugt",
            FloatPredicate::Uge => "uge",
            FloatPredicate::Ult => "ult",
            FloatPredicate::Ule => "ule",
        }
    }
}

/// SSA IR construction interface.
///
/// Types are structural except for named structs, which are created opaque
/// and given a body later so that mutually referencing types can be
/// declared before any of them is defined. A backend must return the same
/// [`TypeId`] for structurally equal types so callers can compare handles.
pub trait Backend {
    // ── Types ───────────────────────────────────────────────────────

    fn void_type(&mut self) -> TypeId;

    fn int_type(&mut self, bits: u32) -> TypeId;

    /// `bits` is 32 or 64.
    fn float_type(&mut self, bits: u32) -> TypeId;

    fn pointer_type(&mut self, pointee: TypeId) -> TypeId;

    fn array_type(&mut self, element: TypeId, len: u64) -> TypeId;

    fn function_type(&mut self, ret: TypeId, params: &[TypeId]) -> TypeId;

    /// Create an opaque named struct.
    fn named_struct(&mut self, name: &str) -> TypeId;

    /// Give a named struct its member list.
    fn set_struct_body(&mut self, ty: TypeId, fields: &[TypeId], packed: bool);

    /// Allocation size in bytes under the backend's data layout.
    fn size_of(&self, ty: TypeId) -> u64;

    fn classify(&self, ty: TypeId) -> TypeClass;

    fn type_of(&self, value: ValueId) -> TypeId;

    /// The untyped pointer (`i8*`) used for object references, interface
    /// references and table slots.
    fn generic_pointer(&mut self) -> TypeId {
        let byte = self.int_type(8);
        self.pointer_type(byte)
    }

    // ── Constants and globals ───────────────────────────────────────

    fn const_int(&mut self, ty: TypeId, value: i64) -> ValueId;

    fn const_float(&mut self, ty: TypeId, value: f64) -> ValueId;

    /// All-zero value of any type (null for pointers).
    fn const_null(&mut self, ty: TypeId) -> ValueId;

    fn const_struct(&mut self, ty: TypeId, fields: &[ValueId]) -> ValueId;

    fn const_array(&mut self, element: TypeId, items: &[ValueId]) -> ValueId;

    /// A private NUL-terminated byte global; returns an `i8*` to it.
    fn const_string(&mut self, value: &str) -> ValueId;

    fn is_constant(&self, value: ValueId) -> bool;

    /// The value of an integer constant, sign-extended.
    fn const_int_value(&self, value: ValueId) -> Option<i64>;

    fn const_float_value(&self, value: ValueId) -> Option<f64>;

    /// Add a zero-initialized global of type `ty`. The returned value is a
    /// pointer to the storage.
    fn add_global(&mut self, name: &str, ty: TypeId) -> ValueId;

    fn set_initializer(&mut self, global: ValueId, value: ValueId);

    // ── Functions and blocks ────────────────────────────────────────

    fn add_function(&mut self, name: &str, fn_ty: TypeId, linkage: Linkage) -> FunctionId;

    fn set_linkage(&mut self, function: FunctionId, linkage: Linkage);

    /// The function as a pointer value, for tables and indirect calls.
    fn function_value(&mut self, function: FunctionId) -> ValueId;

    fn param(&self, function: FunctionId, index: u32) -> ValueId;

    fn append_block(&mut self, function: FunctionId, name: &str) -> BlockId;

    fn position_at_end(&mut self, block: BlockId);

    fn current_block(&self) -> Option<BlockId>;

    /// Whether `block` already ends in a terminator.
    fn is_terminated(&self, block: BlockId) -> bool;

    // ── Instructions ────────────────────────────────────────────────

    fn binary(&mut self, op: BinaryOp, lhs: ValueId, rhs: ValueId) -> ValueId;

    fn unary(&mut self, op: UnaryOp, operand: ValueId) -> ValueId;

    /// Integer or pointer comparison producing an `i1`.
    fn icmp(&mut self, pred: IntPredicate, lhs: ValueId, rhs: ValueId) -> ValueId;

    /// Float comparison producing an `i1`.
    fn fcmp(&mut self, pred: FloatPredicate, lhs: ValueId, rhs: ValueId) -> ValueId;

    fn cast(&mut self, op: CastOp, value: ValueId, ty: TypeId) -> ValueId;

    /// Stack slot in the function's current block.
    fn alloca(&mut self, ty: TypeId, name: &str) -> ValueId;

    fn load(&mut self, ty: TypeId, ptr: ValueId) -> ValueId;

    fn store(&mut self, ptr: ValueId, value: ValueId, volatile: bool);

    /// Address of member `index` of the struct `struct_ty` at `ptr`.
    fn struct_gep(&mut self, struct_ty: TypeId, ptr: ValueId, index: u32) -> ValueId;

    /// Address of element `index` of an `element_ty` array starting at `ptr`.
    fn gep(&mut self, element_ty: TypeId, ptr: ValueId, index: ValueId) -> ValueId;

    /// Zero-initialized heap storage for one `ty`, or `count` of them.
    /// Returns a pointer to the first element.
    fn heap_alloc(&mut self, ty: TypeId, count: Option<ValueId>) -> ValueId;

    /// Insert an empty phi of type `ty` at the head of `block`, after any
    /// phis already there. The insertion position is left unchanged.
    fn phi(&mut self, block: BlockId, ty: TypeId) -> ValueId;

    fn add_incoming(&mut self, phi: ValueId, value: ValueId, block: BlockId);

    /// Direct call. Returns `None` for void callees.
    fn call(&mut self, function: FunctionId, args: &[ValueId]) -> Option<ValueId>;

    /// Call through a function pointer of type `fn_ty`.
    fn call_indirect(&mut self, fn_ty: TypeId, callee: ValueId, args: &[ValueId]) -> Option<ValueId>;

    fn br(&mut self, target: BlockId);

    fn cond_br(&mut self, cond: ValueId, then_block: BlockId, else_block: BlockId);

    fn switch(&mut self, value: ValueId, default: BlockId, cases: &[(i64, BlockId)]);

    fn ret(&mut self, value: Option<ValueId>);

    fn unreachable(&mut self);

    // ── Finalization ────────────────────────────────────────────────

    fn verify_function(&self, function: FunctionId) -> Result<(), VerifyError>;

    fn optimize_function(&mut self, function: FunctionId, level: OptLevel);

    // ── Provided helpers ────────────────────────────────────────────

    /// Resize an integer to `ty`. Widening sign-extends when `signed` is set
    /// (booleans, `i1`, always zero-extend). Returns `value` unchanged when
    /// the widths already agree or either side is not an integer.
    fn int_cast(&mut self, value: ValueId, ty: TypeId, signed: bool) -> ValueId {
        let from = self.type_of(value);
        if from == ty {
            return value;
        }
        match (self.classify(from), self.classify(ty)) {
            (TypeClass::Int(a), TypeClass::Int(b)) if a > b => self.cast(CastOp::Trunc, value, ty),
            (TypeClass::Int(a), TypeClass::Int(b)) if a < b => {
                let op = if signed && a > 1 { CastOp::SExt } else { CastOp::ZExt };
                self.cast(op, value, ty)
            }
            _ => value,
        }
    }

    /// Integer constant of `bits` width.
    fn const_int_of(&mut self, bits: u32, value: i64) -> ValueId {
        let ty = self.int_type(bits);
        self.const_int(ty, value)
    }
}
