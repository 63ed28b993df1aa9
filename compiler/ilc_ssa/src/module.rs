//! In-memory SSA module.
//!
//! [`SsaModule`] stores every type, value, block and function in flat
//! arenas indexed by the handle newtypes. It implements [`Backend`] with a
//! 64-bit data layout (8-byte pointers) and keeps enough structure for
//! tests to inspect what the translator produced.

mod layout;
mod opt;
mod printer;
mod verify;

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::{
    Backend, BinaryOp, BlockId, CastOp, FloatPredicate, FunctionId, IntPredicate, Linkage,
    OptLevel, TypeClass, TypeId, UnaryOp, ValueId, VerifyError,
};

// ── Data ────────────────────────────────────────────────────────────

/// A type in the module.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TypeData {
    Void,
    Int(u32),
    Float(u32),
    Pointer(TypeId),
    Array { element: TypeId, len: u64 },
    Function { ret: TypeId, params: Vec<TypeId> },
    /// Named struct; `body` is `None` while opaque.
    Struct {
        name: String,
        body: Option<Vec<TypeId>>,
        packed: bool,
    },
}

/// What a value is.
#[derive(Clone, Debug, PartialEq)]
pub enum ValueKind {
    ConstInt(i64),
    ConstFloat(f64),
    /// Zero value of its type.
    ConstNull,
    /// Constant struct or array.
    ConstAggregate(Vec<ValueId>),
    /// NUL-terminated byte string, the initializer of a string global.
    ConstBytes(String),
    /// Global storage. The value itself is a pointer; `content` is the type
    /// of the storage and `initializer` a constant of that type.
    Global {
        name: String,
        content: TypeId,
        initializer: ValueId,
    },
    Function(FunctionId),
    Param { function: FunctionId, index: u32 },
    /// Instruction result. `block` is `None` for instructions built without
    /// an insertion point.
    Inst { block: Option<BlockId>, inst: Inst },
}

/// A value and its type.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueData {
    pub ty: TypeId,
    pub kind: ValueKind,
}

/// Call target.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Callee {
    Direct(FunctionId),
    Indirect { fn_ty: TypeId, ptr: ValueId },
}

/// A non-terminator instruction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Inst {
    Binary { op: BinaryOp, lhs: ValueId, rhs: ValueId },
    Unary { op: UnaryOp, operand: ValueId },
    ICmp { pred: IntPredicate, lhs: ValueId, rhs: ValueId },
    FCmp { pred: FloatPredicate, lhs: ValueId, rhs: ValueId },
    Cast { op: CastOp, value: ValueId },
    Alloca { ty: TypeId },
    Load { ptr: ValueId },
    Store { ptr: ValueId, value: ValueId, volatile: bool },
    StructGep { struct_ty: TypeId, ptr: ValueId, index: u32 },
    Gep { element: TypeId, ptr: ValueId, index: ValueId },
    HeapAlloc { ty: TypeId, count: Option<ValueId> },
    Phi { incoming: SmallVec<[(ValueId, BlockId); 4]> },
    Call { callee: Callee, args: SmallVec<[ValueId; 4]> },
}

/// Block terminator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Terminator {
    Br(BlockId),
    CondBr {
        cond: ValueId,
        then_block: BlockId,
        else_block: BlockId,
    },
    Switch {
        value: ValueId,
        default: BlockId,
        cases: Vec<(i64, BlockId)>,
    },
    Ret(Option<ValueId>),
    Unreachable,
}

impl Terminator {
    /// Successor blocks in operand order, duplicates included.
    pub fn successors(&self) -> SmallVec<[BlockId; 2]> {
        match self {
            Terminator::Br(target) => smallvec::smallvec![*target],
            Terminator::CondBr {
                then_block,
                else_block,
                ..
            } => smallvec::smallvec![*then_block, *else_block],
            Terminator::Switch { default, cases, .. } => std::iter::once(*default)
                .chain(cases.iter().map(|(_, b)| *b))
                .collect(),
            Terminator::Ret(_) | Terminator::Unreachable => SmallVec::new(),
        }
    }
}

#[derive(Clone, Debug)]
pub(crate) struct BlockData {
    pub(crate) name: String,
    pub(crate) function: FunctionId,
    pub(crate) insts: Vec<ValueId>,
    pub(crate) terminator: Option<Terminator>,
}

#[derive(Clone, Debug)]
pub(crate) struct FunctionData {
    pub(crate) name: String,
    pub(crate) ty: TypeId,
    pub(crate) linkage: Linkage,
    pub(crate) params: Vec<ValueId>,
    pub(crate) blocks: Vec<BlockId>,
    pub(crate) value: ValueId,
}

// ── Module ──────────────────────────────────────────────────────────

/// In-memory [`Backend`] implementation.
pub struct SsaModule {
    name: String,
    types: Vec<TypeData>,
    interned: FxHashMap<TypeData, TypeId>,
    values: Vec<ValueData>,
    blocks: Vec<BlockData>,
    functions: Vec<FunctionData>,
    function_names: FxHashMap<String, FunctionId>,
    globals: Vec<ValueId>,
    global_names: FxHashMap<String, ValueId>,
    position: Option<BlockId>,
    /// Misuse recorded while building, keyed by the function being built.
    errors: Vec<(Option<FunctionId>, String)>,
    string_count: u32,
}

impl SsaModule {
    pub fn new(name: impl Into<String>) -> Self {
        SsaModule {
            name: name.into(),
            types: Vec::new(),
            interned: FxHashMap::default(),
            values: Vec::new(),
            blocks: Vec::new(),
            functions: Vec::new(),
            function_names: FxHashMap::default(),
            globals: Vec::new(),
            global_names: FxHashMap::default(),
            position: None,
            errors: Vec::new(),
            string_count: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ── Inspection ──────────────────────────────────────────────────

    pub fn type_data(&self, ty: TypeId) -> &TypeData {
        &self.types[ty.index()]
    }

    /// Find a named struct.
    #[allow(clippy::cast_possible_truncation, reason = "arena indices fit in u32")]
    pub fn struct_named(&self, name: &str) -> Option<TypeId> {
        self.types.iter().position(|t| matches!(t, TypeData::Struct { name: n, .. } if n == name))
            .map(|i| TypeId::new(i as u32))
    }

    /// Member types and packed flag of a defined struct.
    pub fn struct_body(&self, ty: TypeId) -> Option<(&[TypeId], bool)> {
        match self.type_data(ty) {
            TypeData::Struct {
                body: Some(body),
                packed,
                ..
            } => Some((body, *packed)),
            _ => None,
        }
    }

    pub fn value(&self, value: ValueId) -> &ValueData {
        &self.values[value.index()]
    }

    pub fn inst(&self, value: ValueId) -> Option<&Inst> {
        match &self.value(value).kind {
            ValueKind::Inst { inst, .. } => Some(inst),
            _ => None,
        }
    }

    /// Incoming `(value, block)` pairs of a phi.
    pub fn phi_incoming(&self, value: ValueId) -> Option<&[(ValueId, BlockId)]> {
        match self.inst(value) {
            Some(Inst::Phi { incoming }) => Some(incoming),
            _ => None,
        }
    }

    pub fn function_named(&self, name: &str) -> Option<FunctionId> {
        self.function_names.get(name).copied()
    }

    pub fn function_name(&self, function: FunctionId) -> &str {
        &self.functions[function.index()].name
    }

    pub fn linkage(&self, function: FunctionId) -> Linkage {
        self.functions[function.index()].linkage
    }

    pub fn fn_type_of(&self, function: FunctionId) -> TypeId {
        self.functions[function.index()].ty
    }

    /// Functions in creation order.
    #[allow(clippy::cast_possible_truncation, reason = "arena indices fit in u32")]
    pub fn functions(&self) -> impl Iterator<Item = FunctionId> + '_ {
        (0..self.functions.len()).map(|i| FunctionId::new(i as u32))
    }

    /// Blocks of `function` in layout order. Empty for declarations.
    pub fn blocks(&self, function: FunctionId) -> &[BlockId] {
        &self.functions[function.index()].blocks
    }

    pub fn block_name(&self, block: BlockId) -> &str {
        &self.blocks[block.index()].name
    }

    pub fn block_insts(&self, block: BlockId) -> &[ValueId] {
        &self.blocks[block.index()].insts
    }

    pub fn terminator(&self, block: BlockId) -> Option<&Terminator> {
        self.blocks[block.index()].terminator.as_ref()
    }

    /// Every instruction of `function`, block by block.
    pub fn instructions(&self, function: FunctionId) -> impl Iterator<Item = (ValueId, &Inst)> + '_ {
        self.blocks(function)
            .iter()
            .flat_map(|b| self.block_insts(*b).iter())
            .filter_map(|v| self.inst(*v).map(|inst| (*v, inst)))
    }

    pub fn global_named(&self, name: &str) -> Option<ValueId> {
        self.global_names.get(name).copied()
    }

    pub fn globals(&self) -> &[ValueId] {
        &self.globals
    }

    pub fn initializer(&self, global: ValueId) -> Option<ValueId> {
        match &self.value(global).kind {
            ValueKind::Global { initializer, .. } => Some(*initializer),
            _ => None,
        }
    }

    /// Building errors recorded so far.
    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|(_, msg)| msg.as_str())
    }

    // ── Internal helpers ────────────────────────────────────────────

    #[allow(clippy::cast_possible_truncation, reason = "arena indices fit in u32")]
    fn intern(&mut self, data: TypeData) -> TypeId {
        if let Some(id) = self.interned.get(&data) {
            return *id;
        }
        let id = TypeId::new(self.types.len() as u32);
        self.types.push(data.clone());
        self.interned.insert(data, id);
        id
    }

    #[allow(clippy::cast_possible_truncation, reason = "arena indices fit in u32")]
    fn push_value(&mut self, ty: TypeId, kind: ValueKind) -> ValueId {
        let id = ValueId::new(self.values.len() as u32);
        self.values.push(ValueData { ty, kind });
        id
    }

    fn current_function(&self) -> Option<FunctionId> {
        self.position.map(|b| self.blocks[b.index()].function)
    }

    fn record_error(&mut self, message: String) {
        tracing::error!(module = %self.name, %message, "ill-formed IR construction");
        let function = self.current_function();
        self.errors.push((function, message));
    }

    fn push_inst(&mut self, ty: TypeId, inst: Inst) -> ValueId {
        let block = self.position;
        match block {
            None => self.record_error(format!("{inst:?} built without an insertion block")),
            Some(b) if self.blocks[b.index()].terminator.is_some() => {
                let name = self.blocks[b.index()].name.clone();
                self.record_error(format!("{inst:?} appended after the terminator of `{name}`"));
            }
            Some(_) => {}
        }
        let id = self.push_value(ty, ValueKind::Inst { block, inst });
        if let Some(b) = block {
            self.blocks[b.index()].insts.push(id);
        }
        id
    }

    fn terminate(&mut self, term: Terminator) {
        let Some(block) = self.position else {
            self.record_error(format!("{term:?} built without an insertion block"));
            return;
        };
        let data = &mut self.blocks[block.index()];
        if data.terminator.is_some() {
            let name = data.name.clone();
            self.record_error(format!("block `{name}` terminated twice"));
            return;
        }
        data.terminator = Some(term);
    }

    fn pointee(&self, ty: TypeId) -> Option<TypeId> {
        match self.type_data(ty) {
            TypeData::Pointer(pointee) => Some(*pointee),
            _ => None,
        }
    }

    fn fn_signature(&self, fn_ty: TypeId) -> Option<(TypeId, Vec<TypeId>)> {
        match self.type_data(fn_ty) {
            TypeData::Function { ret, params } => Some((*ret, params.clone())),
            _ => None,
        }
    }

    fn build_call(&mut self, fn_ty: TypeId, callee: Callee, args: &[ValueId]) -> Option<ValueId> {
        let Some((ret, params)) = self.fn_signature(fn_ty) else {
            self.record_error(format!("call through non-function type {fn_ty:?}"));
            let void = self.void_type();
            self.push_inst(void, Inst::Call { callee, args: args.into() });
            return None;
        };
        if params.len() != args.len() {
            self.record_error(format!(
                "call passes {} arguments to a function taking {}",
                args.len(),
                params.len()
            ));
        } else {
            for (i, (arg, param)) in args.iter().zip(&params).enumerate() {
                if self.type_of(*arg) != *param {
                    self.record_error(format!("call argument {i} has the wrong type"));
                }
            }
        }
        let value = self.push_inst(ret, Inst::Call { callee, args: args.into() });
        (self.classify(ret) != TypeClass::Void).then_some(value)
    }
}

impl Backend for SsaModule {
    // ── Types ───────────────────────────────────────────────────────

    fn void_type(&mut self) -> TypeId {
        self.intern(TypeData::Void)
    }

    fn int_type(&mut self, bits: u32) -> TypeId {
        self.intern(TypeData::Int(bits))
    }

    fn float_type(&mut self, bits: u32) -> TypeId {
        self.intern(TypeData::Float(bits))
    }

    fn pointer_type(&mut self, pointee: TypeId) -> TypeId {
        self.intern(TypeData::Pointer(pointee))
    }

    fn array_type(&mut self, element: TypeId, len: u64) -> TypeId {
        self.intern(TypeData::Array { element, len })
    }

    fn function_type(&mut self, ret: TypeId, params: &[TypeId]) -> TypeId {
        self.intern(TypeData::Function {
            ret,
            params: params.to_vec(),
        })
    }

    #[allow(clippy::cast_possible_truncation, reason = "arena indices fit in u32")]
    fn named_struct(&mut self, name: &str) -> TypeId {
        let id = TypeId::new(self.types.len() as u32);
        self.types.push(TypeData::Struct {
            name: name.to_owned(),
            body: None,
            packed: false,
        });
        id
    }

    fn set_struct_body(&mut self, ty: TypeId, fields: &[TypeId], packed: bool) {
        match &mut self.types[ty.index()] {
            TypeData::Struct {
                body: body @ None,
                packed: p,
                ..
            } => {
                *body = Some(fields.to_vec());
                *p = packed;
            }
            TypeData::Struct { name, .. } => {
                let message = format!("struct `{name}` body set twice");
                self.record_error(message);
            }
            other => {
                let message = format!("set_struct_body on non-struct {other:?}");
                self.record_error(message);
            }
        }
    }

    fn size_of(&self, ty: TypeId) -> u64 {
        self.alloc_size(ty)
    }

    fn classify(&self, ty: TypeId) -> TypeClass {
        match self.type_data(ty) {
            TypeData::Void => TypeClass::Void,
            TypeData::Int(bits) => TypeClass::Int(*bits),
            TypeData::Float(bits) => TypeClass::Float(*bits),
            TypeData::Pointer(_) => TypeClass::Pointer,
            TypeData::Array { .. } => TypeClass::Array,
            TypeData::Function { .. } => TypeClass::Function,
            TypeData::Struct { .. } => TypeClass::Struct,
        }
    }

    fn type_of(&self, value: ValueId) -> TypeId {
        self.values[value.index()].ty
    }

    // ── Constants and globals ───────────────────────────────────────

    fn const_int(&mut self, ty: TypeId, value: i64) -> ValueId {
        self.push_value(ty, ValueKind::ConstInt(value))
    }

    fn const_float(&mut self, ty: TypeId, value: f64) -> ValueId {
        self.push_value(ty, ValueKind::ConstFloat(value))
    }

    fn const_null(&mut self, ty: TypeId) -> ValueId {
        self.push_value(ty, ValueKind::ConstNull)
    }

    fn const_struct(&mut self, ty: TypeId, fields: &[ValueId]) -> ValueId {
        if let Some((body, _)) = self.struct_body(ty) {
            if body.len() != fields.len() {
                let message = format!(
                    "constant struct has {} members, type has {}",
                    fields.len(),
                    body.len()
                );
                self.record_error(message);
            }
        }
        self.push_value(ty, ValueKind::ConstAggregate(fields.to_vec()))
    }

    fn const_array(&mut self, element: TypeId, items: &[ValueId]) -> ValueId {
        let ty = self.array_type(element, items.len() as u64);
        self.push_value(ty, ValueKind::ConstAggregate(items.to_vec()))
    }

    fn const_string(&mut self, value: &str) -> ValueId {
        let byte = self.int_type(8);
        let content = self.array_type(byte, value.len() as u64 + 1);
        let data = self.push_value(content, ValueKind::ConstBytes(value.to_owned()));
        let name = format!(".str.{}", self.string_count);
        self.string_count += 1;
        let ptr = self.pointer_type(byte);
        let global = self.push_value(
            ptr,
            ValueKind::Global {
                name: name.clone(),
                content,
                initializer: data,
            },
        );
        self.globals.push(global);
        self.global_names.insert(name, global);
        global
    }

    fn is_constant(&self, value: ValueId) -> bool {
        matches!(
            self.value(value).kind,
            ValueKind::ConstInt(_)
                | ValueKind::ConstFloat(_)
                | ValueKind::ConstNull
                | ValueKind::ConstAggregate(_)
                | ValueKind::ConstBytes(_)
                | ValueKind::Global { .. }
                | ValueKind::Function(_)
        )
    }

    fn const_int_value(&self, value: ValueId) -> Option<i64> {
        match self.value(value).kind {
            ValueKind::ConstInt(v) => Some(v),
            _ => None,
        }
    }

    fn const_float_value(&self, value: ValueId) -> Option<f64> {
        match self.value(value).kind {
            ValueKind::ConstFloat(v) => Some(v),
            _ => None,
        }
    }

    fn add_global(&mut self, name: &str, ty: TypeId) -> ValueId {
        let zero = self.const_null(ty);
        let ptr = self.pointer_type(ty);
        let global = self.push_value(
            ptr,
            ValueKind::Global {
                name: name.to_owned(),
                content: ty,
                initializer: zero,
            },
        );
        self.globals.push(global);
        if self.global_names.insert(name.to_owned(), global).is_some() {
            self.record_error(format!("global `{name}` defined twice"));
        }
        global
    }

    fn set_initializer(&mut self, global: ValueId, value: ValueId) {
        let value_ty = self.type_of(value);
        let constant = self.is_constant(value);
        match &mut self.values[global.index()].kind {
            ValueKind::Global {
                content,
                initializer,
                name,
            } => {
                if *content != value_ty || !constant {
                    let message = format!("initializer of `{name}` is not a constant of its type");
                    self.record_error(message);
                } else {
                    *initializer = value;
                }
            }
            _ => self.record_error("set_initializer on a non-global".to_owned()),
        }
    }

    // ── Functions and blocks ────────────────────────────────────────

    #[allow(clippy::cast_possible_truncation, reason = "arena indices fit in u32")]
    fn add_function(&mut self, name: &str, fn_ty: TypeId, linkage: Linkage) -> FunctionId {
        let id = FunctionId::new(self.functions.len() as u32);
        let param_types = match self.fn_signature(fn_ty) {
            Some((_, params)) => params,
            None => {
                self.record_error(format!("function `{name}` declared with a non-function type"));
                Vec::new()
            }
        };
        let ptr = self.pointer_type(fn_ty);
        let value = self.push_value(ptr, ValueKind::Function(id));
        let params = param_types
            .iter()
            .enumerate()
            .map(|(i, ty)| {
                self.push_value(
                    *ty,
                    ValueKind::Param {
                        function: id,
                        index: i as u32,
                    },
                )
            })
            .collect();
        self.functions.push(FunctionData {
            name: name.to_owned(),
            ty: fn_ty,
            linkage,
            params,
            blocks: Vec::new(),
            value,
        });
        if self.function_names.insert(name.to_owned(), id).is_some() {
            self.record_error(format!("function `{name}` defined twice"));
        }
        id
    }

    fn set_linkage(&mut self, function: FunctionId, linkage: Linkage) {
        self.functions[function.index()].linkage = linkage;
    }

    fn function_value(&mut self, function: FunctionId) -> ValueId {
        self.functions[function.index()].value
    }

    fn param(&self, function: FunctionId, index: u32) -> ValueId {
        self.functions[function.index()].params[index as usize]
    }

    #[allow(clippy::cast_possible_truncation, reason = "arena indices fit in u32")]
    fn append_block(&mut self, function: FunctionId, name: &str) -> BlockId {
        let id = BlockId::new(self.blocks.len() as u32);
        self.blocks.push(BlockData {
            name: name.to_owned(),
            function,
            insts: Vec::new(),
            terminator: None,
        });
        self.functions[function.index()].blocks.push(id);
        id
    }

    fn position_at_end(&mut self, block: BlockId) {
        self.position = Some(block);
    }

    fn current_block(&self) -> Option<BlockId> {
        self.position
    }

    fn is_terminated(&self, block: BlockId) -> bool {
        self.blocks[block.index()].terminator.is_some()
    }

    // ── Instructions ────────────────────────────────────────────────

    fn binary(&mut self, op: BinaryOp, lhs: ValueId, rhs: ValueId) -> ValueId {
        let ty = self.type_of(lhs);
        let class = self.classify(ty);
        if ty != self.type_of(rhs) {
            self.record_error(format!("{} operands have different types", op.mnemonic()));
        } else if op.is_float() != class.is_float() || !(class.is_int() || class.is_float()) {
            self.record_error(format!("{} on {class:?} operands", op.mnemonic()));
        }
        self.push_inst(ty, Inst::Binary { op, lhs, rhs })
    }

    fn unary(&mut self, op: UnaryOp, operand: ValueId) -> ValueId {
        let ty = self.type_of(operand);
        let class = self.classify(ty);
        let ok = match op {
            UnaryOp::FNeg => class.is_float(),
            UnaryOp::Neg | UnaryOp::Not => class.is_int(),
        };
        if !ok {
            self.record_error(format!("{} on {class:?} operand", op.mnemonic()));
        }
        self.push_inst(ty, Inst::Unary { op, operand })
    }

    fn icmp(&mut self, pred: IntPredicate, lhs: ValueId, rhs: ValueId) -> ValueId {
        let ty = self.type_of(lhs);
        let class = self.classify(ty);
        if ty != self.type_of(rhs) || !(class.is_int() || class.is_pointer()) {
            self.record_error(format!("icmp {} on mismatched operands", pred.mnemonic()));
        }
        let bool_ty = self.int_type(1);
        self.push_inst(bool_ty, Inst::ICmp { pred, lhs, rhs })
    }

    fn fcmp(&mut self, pred: FloatPredicate, lhs: ValueId, rhs: ValueId) -> ValueId {
        let ty = self.type_of(lhs);
        if ty != self.type_of(rhs) || !self.classify(ty).is_float() {
            self.record_error(format!("fcmp {} on mismatched operands", pred.mnemonic()));
        }
        let bool_ty = self.int_type(1);
        self.push_inst(bool_ty, Inst::FCmp { pred, lhs, rhs })
    }

    fn cast(&mut self, op: CastOp, value: ValueId, ty: TypeId) -> ValueId {
        let from = self.classify(self.type_of(value));
        let to = self.classify(ty);
        let ok = match op {
            CastOp::Trunc => matches!((from, to), (TypeClass::Int(a), TypeClass::Int(b)) if a > b),
            CastOp::ZExt | CastOp::SExt => {
                matches!((from, to), (TypeClass::Int(a), TypeClass::Int(b)) if a < b)
            }
            CastOp::FpTrunc => matches!((from, to), (TypeClass::Float(a), TypeClass::Float(b)) if a > b),
            CastOp::FpExt => matches!((from, to), (TypeClass::Float(a), TypeClass::Float(b)) if a < b),
            CastOp::FpToSi | CastOp::FpToUi => from.is_float() && to.is_int(),
            CastOp::SiToFp | CastOp::UiToFp => from.is_int() && to.is_float(),
            CastOp::PtrToInt => from.is_pointer() && to.is_int(),
            CastOp::IntToPtr => from.is_int() && to.is_pointer(),
            CastOp::BitCast => from == to || (from.is_pointer() && to.is_pointer()),
        };
        if !ok {
            self.record_error(format!("{} from {from:?} to {to:?}", op.mnemonic()));
        }
        self.push_inst(ty, Inst::Cast { op, value })
    }

    fn alloca(&mut self, ty: TypeId, _name: &str) -> ValueId {
        let ptr = self.pointer_type(ty);
        self.push_inst(ptr, Inst::Alloca { ty })
    }

    fn load(&mut self, ty: TypeId, ptr: ValueId) -> ValueId {
        if !self.classify(self.type_of(ptr)).is_pointer() {
            self.record_error("load from a non-pointer".to_owned());
        }
        self.push_inst(ty, Inst::Load { ptr })
    }

    fn store(&mut self, ptr: ValueId, value: ValueId, volatile: bool) {
        if !self.classify(self.type_of(ptr)).is_pointer() {
            self.record_error("store to a non-pointer".to_owned());
        }
        let void = self.void_type();
        self.push_inst(
            void,
            Inst::Store {
                ptr,
                value,
                volatile,
            },
        );
    }

    fn struct_gep(&mut self, struct_ty: TypeId, ptr: ValueId, index: u32) -> ValueId {
        let member = self
            .struct_body(struct_ty)
            .and_then(|(body, _)| body.get(index as usize).copied());
        let member = match member {
            Some(member) => member,
            None => {
                self.record_error(format!("struct_gep index {index} out of range for {struct_ty:?}"));
                self.int_type(8)
            }
        };
        let result = self.pointer_type(member);
        self.push_inst(
            result,
            Inst::StructGep {
                struct_ty,
                ptr,
                index,
            },
        )
    }

    fn gep(&mut self, element: TypeId, ptr: ValueId, index: ValueId) -> ValueId {
        if !self.classify(self.type_of(index)).is_int() {
            self.record_error("gep with a non-integer index".to_owned());
        }
        let result = self.pointer_type(element);
        self.push_inst(result, Inst::Gep { element, ptr, index })
    }

    fn heap_alloc(&mut self, ty: TypeId, count: Option<ValueId>) -> ValueId {
        let result = self.pointer_type(ty);
        self.push_inst(result, Inst::HeapAlloc { ty, count })
    }

    fn phi(&mut self, block: BlockId, ty: TypeId) -> ValueId {
        let id = self.push_value(
            ty,
            ValueKind::Inst {
                block: Some(block),
                inst: Inst::Phi {
                    incoming: SmallVec::new(),
                },
            },
        );
        let head = self.blocks[block.index()]
            .insts
            .iter()
            .take_while(|v| matches!(self.inst(**v), Some(Inst::Phi { .. })))
            .count();
        self.blocks[block.index()].insts.insert(head, id);
        id
    }

    fn add_incoming(&mut self, phi: ValueId, value: ValueId, block: BlockId) {
        if self.type_of(phi) != self.type_of(value) {
            self.record_error("phi incoming value has the wrong type".to_owned());
        }
        match &mut self.values[phi.index()].kind {
            ValueKind::Inst {
                inst: Inst::Phi { incoming },
                ..
            } => incoming.push((value, block)),
            _ => self.record_error("add_incoming on a non-phi".to_owned()),
        }
    }

    fn call(&mut self, function: FunctionId, args: &[ValueId]) -> Option<ValueId> {
        let fn_ty = self.functions[function.index()].ty;
        self.build_call(fn_ty, Callee::Direct(function), args)
    }

    fn call_indirect(&mut self, fn_ty: TypeId, callee: ValueId, args: &[ValueId]) -> Option<ValueId> {
        if self.pointee(self.type_of(callee)).is_none() {
            self.record_error("indirect call through a non-pointer".to_owned());
        }
        self.build_call(fn_ty, Callee::Indirect { fn_ty, ptr: callee }, args)
    }

    fn br(&mut self, target: BlockId) {
        self.terminate(Terminator::Br(target));
    }

    fn cond_br(&mut self, cond: ValueId, then_block: BlockId, else_block: BlockId) {
        if self.classify(self.type_of(cond)) != TypeClass::Int(1) {
            self.record_error("conditional branch on a non-i1 value".to_owned());
        }
        self.terminate(Terminator::CondBr {
            cond,
            then_block,
            else_block,
        });
    }

    fn switch(&mut self, value: ValueId, default: BlockId, cases: &[(i64, BlockId)]) {
        self.terminate(Terminator::Switch {
            value,
            default,
            cases: cases.to_vec(),
        });
    }

    fn ret(&mut self, value: Option<ValueId>) {
        if let Some(function) = self.current_function() {
            let ret_ty = self
                .fn_signature(self.functions[function.index()].ty)
                .map(|(ret, _)| ret);
            let value_ty = value.map(|v| self.type_of(v));
            let expects_value = ret_ty.is_some_and(|t| self.classify(t) != TypeClass::Void);
            if expects_value != value.is_some() || (value.is_some() && value_ty != ret_ty) {
                self.record_error("return value does not match the function type".to_owned());
            }
        }
        self.terminate(Terminator::Ret(value));
    }

    fn unreachable(&mut self) {
        self.terminate(Terminator::Unreachable);
    }

    // ── Finalization ────────────────────────────────────────────────

    fn verify_function(&self, function: FunctionId) -> Result<(), VerifyError> {
        self.verify(function)
    }

    fn optimize_function(&mut self, function: FunctionId, level: OptLevel) {
        if level.is_enabled() {
            self.remove_unreachable_blocks(function);
        }
    }
}
