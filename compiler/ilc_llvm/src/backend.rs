//! The [`Backend`] implementation.
//!
//! Builder methods never fail: operand mismatches are logged, recorded
//! against the function being built and replaced by a zero value, then
//! surfaced by [`Backend::verify_function`]. This keeps a single bad
//! method from aborting the rest of the module.

mod instructions;

use std::path::Path;

use inkwell::builder::Builder;
use inkwell::context::Context;
use inkwell::module::{Linkage as LlvmLinkage, Module};
use inkwell::targets::{
    CodeModel, FileType, InitializationConfig, RelocMode, Target, TargetData, TargetMachine,
};
use inkwell::types::{BasicMetadataTypeEnum, BasicType, BasicTypeEnum};
use inkwell::values::{BasicValueEnum, FunctionValue};
use inkwell::OptimizationLevel;
use ilc_ssa::{
    Backend, BinaryOp, BlockId, CastOp, FloatPredicate, FunctionId, IntPredicate, Linkage,
    OptLevel, TypeClass, TypeData, TypeId, UnaryOp, ValueId, VerifyError,
};

use crate::arena::{FunctionEntry, ValueArena, ValueEntry, ValueKind};
use crate::types::{LlvmType, TypeTable};
use crate::{passes, LlvmError};

/// An [`ilc_ssa::Backend`] that builds an LLVM module for the host target.
pub struct LlvmBackend<'ctx> {
    context: &'ctx Context,
    module: Module<'ctx>,
    builder: Builder<'ctx>,
    machine: TargetMachine,
    target_data: TargetData,
    types: TypeTable<'ctx>,
    arena: ValueArena<'ctx>,
    position: Option<BlockId>,
    /// Highest level requested through `optimize_function`.
    opt_level: OptLevel,
    string_count: u32,
    calloc: Option<FunctionValue<'ctx>>,
    errors: Vec<(Option<FunctionId>, String)>,
}

impl<'ctx> LlvmBackend<'ctx> {
    /// Create an empty module targeting the host machine.
    pub fn new(context: &'ctx Context, name: &str) -> Result<Self, LlvmError> {
        Target::initialize_native(&InitializationConfig::default()).map_err(LlvmError::Target)?;
        let triple = TargetMachine::get_default_triple();
        let target = Target::from_triple(&triple).map_err(|e| LlvmError::Target(e.to_string()))?;
        let machine = target
            .create_target_machine(
                &triple,
                "generic",
                "",
                OptimizationLevel::Default,
                RelocMode::PIC,
                CodeModel::Default,
            )
            .ok_or_else(|| {
                LlvmError::Target(format!(
                    "no target machine for {}",
                    triple.as_str().to_string_lossy()
                ))
            })?;
        let target_data = machine.get_target_data();

        let module = context.create_module(name);
        module.set_triple(&triple);
        module.set_data_layout(&target_data.get_data_layout());
        tracing::debug!(module = name, triple = %triple.as_str().to_string_lossy(), "created LLVM module");

        Ok(LlvmBackend {
            context,
            module,
            builder: context.create_builder(),
            machine,
            target_data,
            types: TypeTable::default(),
            arena: ValueArena::default(),
            position: None,
            opt_level: OptLevel::O0,
            string_count: 0,
            calloc: None,
            errors: Vec::new(),
        })
    }

    pub fn module(&self) -> &Module<'ctx> {
        &self.module
    }

    /// Building errors recorded so far.
    pub fn errors(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|(_, msg)| msg.as_str())
    }

    /// Verify the whole module and run the optimization pipeline at the
    /// highest level any function asked for.
    pub fn finish(&self) -> Result<(), LlvmError> {
        if std::env::var("ILC_DEBUG_LLVM").is_ok_and(|v| !v.is_empty()) {
            let name = self.module.get_name().to_string_lossy();
            eprintln!("=== LLVM IR for {name} ===");
            eprintln!("{}", self.module.print_to_string().to_string());
            eprintln!("=== END LLVM IR ===");
        }
        self.module
            .verify()
            .map_err(|e| LlvmError::Verify(e.to_string()))?;
        if self.opt_level.is_enabled() {
            passes::run_pipeline(&self.module, &self.machine, self.opt_level)?;
        }
        Ok(())
    }

    /// Textual LLVM IR.
    pub fn print_to_string(&self) -> String {
        self.module.print_to_string().to_string()
    }

    pub fn write_ir(&self, path: &Path) -> Result<(), LlvmError> {
        self.module.print_to_file(path).map_err(|e| LlvmError::Write {
            path: path.to_owned(),
            message: e.to_string(),
        })
    }

    /// Emit a native object file for the host target.
    pub fn write_object(&self, path: &Path) -> Result<(), LlvmError> {
        self.machine
            .write_to_file(&self.module, FileType::Object, path)
            .map_err(|e| LlvmError::Write {
                path: path.to_owned(),
                message: e.to_string(),
            })
    }

    // ── Helpers ─────────────────────────────────────────────────────

    fn record_error(&mut self, message: String) {
        let function = self.position.map(|b| self.arena.block_function(b));
        let name = function.map_or("<module>", |f| self.arena.function(f).name.as_str());
        tracing::error!(function = name, "{message}");
        self.errors.push((function, message));
    }

    #[inline]
    fn value(&self, id: ValueId) -> BasicValueEnum<'ctx> {
        self.arena.value(id).value
    }

    fn push_inst(&mut self, value: BasicValueEnum<'ctx>, ty: TypeId) -> ValueId {
        self.arena.push_value(ValueEntry {
            value,
            ty,
            kind: ValueKind::Inst,
        })
    }

    fn push_const(&mut self, value: BasicValueEnum<'ctx>, ty: TypeId) -> ValueId {
        self.arena.push_value(ValueEntry {
            value,
            ty,
            kind: ValueKind::Constant,
        })
    }

    /// The first-class LLVM type of `ty`, or `i8` after recording an error.
    fn basic_or_error(&mut self, ty: TypeId, what: &str) -> BasicTypeEnum<'ctx> {
        if let Some(basic) = self.types.basic(ty) {
            return basic;
        }
        self.record_error(format!("{what} needs a first-class type, got {:?}", self.types.data(ty)));
        self.context.i8_type().into()
    }

    /// Record `message` and return a zero value of `ty` in place of the
    /// instruction that could not be built.
    fn fallback(&mut self, ty: TypeId, message: String) -> ValueId {
        self.record_error(message);
        let zero = match self.types.basic(ty) {
            Some(basic) => const_zero(basic),
            None => self.context.i64_type().const_zero().into(),
        };
        self.push_inst(zero, ty)
    }

    fn check_open_block(&mut self, what: &str) -> bool {
        match self.position {
            Some(block) if self.is_terminated(block) => {
                self.record_error(format!("{what} appended to a terminated block"));
                false
            }
            Some(_) => true,
            None => {
                self.record_error(format!("{what} with no insertion block"));
                false
            }
        }
    }

    fn to_llvm_linkage(linkage: Linkage) -> LlvmLinkage {
        match linkage {
            Linkage::External => LlvmLinkage::External,
            Linkage::Internal => LlvmLinkage::Internal,
        }
    }
}

/// Zero value of any first-class LLVM type.
fn const_zero(ty: BasicTypeEnum<'_>) -> BasicValueEnum<'_> {
    match ty {
        BasicTypeEnum::IntType(t) => t.const_int(0, false).into(),
        BasicTypeEnum::FloatType(t) => t.const_float(0.0).into(),
        BasicTypeEnum::StructType(t) => t.const_zero().into(),
        BasicTypeEnum::PointerType(t) => t.const_null().into(),
        BasicTypeEnum::ArrayType(t) => t.const_zero().into(),
        BasicTypeEnum::VectorType(t) => t.const_zero().into(),
        BasicTypeEnum::ScalableVectorType(t) => t.get_undef().into(),
    }
}

impl<'ctx> Backend for LlvmBackend<'ctx> {
    // ── Types ───────────────────────────────────────────────────────

    fn void_type(&mut self) -> TypeId {
        if let Some(id) = self.types.lookup(&TypeData::Void) {
            return id;
        }
        self.types.intern(TypeData::Void, LlvmType::Void)
    }

    fn int_type(&mut self, bits: u32) -> TypeId {
        let data = TypeData::Int(bits);
        if let Some(id) = self.types.lookup(&data) {
            return id;
        }
        let ty = self.context.custom_width_int_type(bits);
        self.types.intern(data, LlvmType::Basic(ty.into()))
    }

    fn float_type(&mut self, bits: u32) -> TypeId {
        let data = TypeData::Float(bits);
        if let Some(id) = self.types.lookup(&data) {
            return id;
        }
        let ty = match bits {
            32 => self.context.f32_type(),
            64 => self.context.f64_type(),
            _ => {
                self.record_error(format!("unsupported float width {bits}"));
                self.context.f64_type()
            }
        };
        self.types.intern(data, LlvmType::Basic(ty.into()))
    }

    fn pointer_type(&mut self, pointee: TypeId) -> TypeId {
        let data = TypeData::Pointer(pointee);
        if let Some(id) = self.types.lookup(&data) {
            return id;
        }
        let ty = self.context.ptr_type(inkwell::AddressSpace::default());
        self.types.intern(data, LlvmType::Basic(ty.into()))
    }

    fn array_type(&mut self, element: TypeId, len: u64) -> TypeId {
        let data = TypeData::Array { element, len };
        if let Some(id) = self.types.lookup(&data) {
            return id;
        }
        let elem = self.basic_or_error(element, "array element");
        let Ok(llvm_len) = u32::try_from(len) else {
            let ty = elem.array_type(0);
            self.record_error(format!("array length {len} does not fit in 32 bits"));
            return self.types.intern(data, LlvmType::Basic(ty.into()));
        };
        let ty = elem.array_type(llvm_len);
        self.types.intern(data, LlvmType::Basic(ty.into()))
    }

    fn function_type(&mut self, ret: TypeId, params: &[TypeId]) -> TypeId {
        let data = TypeData::Function {
            ret,
            params: params.to_vec(),
        };
        if let Some(id) = self.types.lookup(&data) {
            return id;
        }
        let param_tys: Vec<BasicMetadataTypeEnum<'ctx>> = params
            .iter()
            .map(|&p| self.basic_or_error(p, "parameter").into())
            .collect();
        let ty = match self.types.llvm(ret) {
            LlvmType::Void => self.context.void_type().fn_type(&param_tys, false),
            LlvmType::Basic(basic) => basic.fn_type(&param_tys, false),
            LlvmType::Function(_) => {
                self.record_error("function returning a function type".to_owned());
                self.context.void_type().fn_type(&param_tys, false)
            }
        };
        self.types.intern(data, LlvmType::Function(ty))
    }

    fn named_struct(&mut self, name: &str) -> TypeId {
        let ty = self.context.opaque_struct_type(name);
        self.types.push(
            TypeData::Struct {
                name: name.to_owned(),
                body: None,
                packed: false,
            },
            LlvmType::Basic(ty.into()),
        )
    }

    fn set_struct_body(&mut self, ty: TypeId, fields: &[TypeId], packed: bool) {
        let Some(BasicTypeEnum::StructType(st)) = self.types.basic(ty) else {
            self.record_error(format!("set_struct_body on {:?}", self.types.data(ty)));
            return;
        };
        let members: Vec<BasicTypeEnum<'ctx>> = fields
            .iter()
            .map(|&f| self.basic_or_error(f, "struct member"))
            .collect();
        st.set_body(&members, packed);
        self.types.set_struct_body(ty, fields, packed);
    }

    fn size_of(&self, ty: TypeId) -> u64 {
        match self.types.data(ty) {
            TypeData::Void | TypeData::Function { .. } | TypeData::Struct { body: None, .. } => 0,
            _ => self
                .types
                .basic(ty)
                .map_or(0, |basic| self.target_data.get_abi_size(&basic)),
        }
    }

    fn classify(&self, ty: TypeId) -> TypeClass {
        self.types.classify(ty)
    }

    fn type_of(&self, value: ValueId) -> TypeId {
        self.arena.value(value).ty
    }

    // ── Constants and globals ───────────────────────────────────────

    #[allow(clippy::cast_sign_loss, reason = "two's complement bits, sign-extended by LLVM")]
    fn const_int(&mut self, ty: TypeId, value: i64) -> ValueId {
        match self.types.basic(ty) {
            Some(BasicTypeEnum::IntType(t)) => {
                let v = t.const_int(value as u64, value < 0);
                self.push_const(v.into(), ty)
            }
            _ => self.fallback(ty, format!("const_int of {:?}", self.types.data(ty))),
        }
    }

    fn const_float(&mut self, ty: TypeId, value: f64) -> ValueId {
        match self.types.basic(ty) {
            Some(BasicTypeEnum::FloatType(t)) => {
                let v = t.const_float(value);
                self.push_const(v.into(), ty)
            }
            _ => self.fallback(ty, format!("const_float of {:?}", self.types.data(ty))),
        }
    }

    fn const_null(&mut self, ty: TypeId) -> ValueId {
        let basic = self.basic_or_error(ty, "const_null");
        self.push_const(const_zero(basic), ty)
    }

    fn const_struct(&mut self, ty: TypeId, fields: &[ValueId]) -> ValueId {
        let Some(BasicTypeEnum::StructType(st)) = self.types.basic(ty) else {
            return self.fallback(ty, format!("const_struct of {:?}", self.types.data(ty)));
        };
        let values: Vec<BasicValueEnum<'ctx>> = fields.iter().map(|&f| self.value(f)).collect();
        let expected = st.get_field_types();
        let matches = expected.len() == values.len()
            && expected.iter().zip(&values).all(|(t, v)| *t == v.get_type());
        if !matches {
            return self.fallback(ty, "const_struct members do not match the struct body".to_owned());
        }
        let v = st.const_named_struct(&values);
        self.push_const(v.into(), ty)
    }

    fn const_array(&mut self, element: TypeId, items: &[ValueId]) -> ValueId {
        let ty = self.array_type(element, items.len() as u64);
        let elem = self.basic_or_error(element, "array element");
        let values: Vec<BasicValueEnum<'ctx>> = items.iter().map(|&i| self.value(i)).collect();
        if values.iter().any(|v| v.get_type() != elem) {
            return self.fallback(ty, "const_array item does not match the element type".to_owned());
        }
        let array = match elem {
            BasicTypeEnum::IntType(t) => {
                t.const_array(&values.iter().map(|v| v.into_int_value()).collect::<Vec<_>>())
            }
            BasicTypeEnum::FloatType(t) => {
                t.const_array(&values.iter().map(|v| v.into_float_value()).collect::<Vec<_>>())
            }
            BasicTypeEnum::PointerType(t) => {
                t.const_array(&values.iter().map(|v| v.into_pointer_value()).collect::<Vec<_>>())
            }
            BasicTypeEnum::StructType(t) => {
                t.const_array(&values.iter().map(|v| v.into_struct_value()).collect::<Vec<_>>())
            }
            BasicTypeEnum::ArrayType(t) => {
                t.const_array(&values.iter().map(|v| v.into_array_value()).collect::<Vec<_>>())
            }
            BasicTypeEnum::VectorType(_) | BasicTypeEnum::ScalableVectorType(_) => {
                return self.fallback(ty, "const_array of vectors".to_owned());
            }
        };
        self.push_const(array.into(), ty)
    }

    fn const_string(&mut self, value: &str) -> ValueId {
        let bytes: Vec<u8> = value.bytes().chain(std::iter::once(0)).collect();
        let data = self.context.const_string(&bytes, false);
        let name = format!(".str.{}", self.string_count);
        self.string_count += 1;

        let global = self.module.add_global(data.get_type(), None, &name);
        global.set_linkage(LlvmLinkage::Private);
        global.set_constant(true);
        global.set_initializer(&data);

        let byte = self.int_type(8);
        let ptr = self.pointer_type(byte);
        self.push_const(global.as_pointer_value().into(), ptr)
    }

    fn is_constant(&self, value: ValueId) -> bool {
        matches!(
            self.arena.value(value).kind,
            ValueKind::Constant | ValueKind::Global { .. }
        )
    }

    fn const_int_value(&self, value: ValueId) -> Option<i64> {
        let entry = self.arena.value(value);
        match (entry.kind, entry.value) {
            (ValueKind::Constant, BasicValueEnum::IntValue(v)) => v.get_sign_extended_constant(),
            _ => None,
        }
    }

    fn const_float_value(&self, value: ValueId) -> Option<f64> {
        let entry = self.arena.value(value);
        match (entry.kind, entry.value) {
            (ValueKind::Constant, BasicValueEnum::FloatValue(v)) => v.get_constant().map(|(f, _)| f),
            _ => None,
        }
    }

    fn add_global(&mut self, name: &str, ty: TypeId) -> ValueId {
        if self.module.get_global(name).is_some() {
            self.record_error(format!("global `{name}` defined twice"));
        }
        let content = self.basic_or_error(ty, "global");
        let global = self.module.add_global(content, None, name);
        global.set_initializer(&const_zero(content));
        let ptr = self.pointer_type(ty);
        self.arena.push_value(ValueEntry {
            value: global.as_pointer_value().into(),
            ty: ptr,
            kind: ValueKind::Global { global, content: ty },
        })
    }

    fn set_initializer(&mut self, global: ValueId, value: ValueId) {
        let ValueKind::Global { global: g, content } = self.arena.value(global).kind else {
            self.record_error("set_initializer on a non-global".to_owned());
            return;
        };
        if !self.is_constant(value) {
            self.record_error("global initializer is not a constant".to_owned());
            return;
        }
        let v = self.value(value);
        if self.types.basic(content) != Some(v.get_type()) {
            self.record_error(format!(
                "initializer of `{}` has the wrong type",
                g.get_name().to_string_lossy()
            ));
            return;
        }
        g.set_initializer(&v);
    }

    // ── Functions and blocks ────────────────────────────────────────

    fn add_function(&mut self, name: &str, fn_ty: TypeId, linkage: Linkage) -> FunctionId {
        let llvm_ty = match self.types.function(fn_ty) {
            Some(f) => f,
            None => {
                self.record_error(format!("add_function `{name}` with a non-function type"));
                self.context.void_type().fn_type(&[], false)
            }
        };
        if self.module.get_function(name).is_some() {
            self.record_error(format!("function `{name}` defined twice"));
        }
        let function = self
            .module
            .add_function(name, llvm_ty, Some(Self::to_llvm_linkage(linkage)));

        let param_tys = match self.types.data(fn_ty) {
            TypeData::Function { params, .. } => params.clone(),
            _ => Vec::new(),
        };
        let params = function
            .get_param_iter()
            .zip(param_tys)
            .map(|(value, ty)| self.push_inst(value, ty))
            .collect();

        self.arena.push_function(FunctionEntry {
            value: function,
            ty: fn_ty,
            name: name.to_owned(),
            params,
        })
    }

    fn set_linkage(&mut self, function: FunctionId, linkage: Linkage) {
        self.arena
            .function(function)
            .value
            .set_linkage(Self::to_llvm_linkage(linkage));
    }

    fn function_value(&mut self, function: FunctionId) -> ValueId {
        let entry = self.arena.function(function);
        let (value, fn_ty) = (entry.value, entry.ty);
        let ptr = self.pointer_type(fn_ty);
        self.push_const(value.as_global_value().as_pointer_value().into(), ptr)
    }

    fn param(&self, function: FunctionId, index: u32) -> ValueId {
        self.arena.function(function).params[index as usize]
    }

    fn append_block(&mut self, function: FunctionId, name: &str) -> BlockId {
        let value = self.arena.function(function).value;
        let bb = self.context.append_basic_block(value, name);
        self.arena.push_block(bb, function)
    }

    fn position_at_end(&mut self, block: BlockId) {
        self.builder.position_at_end(self.arena.block(block));
        self.position = Some(block);
    }

    fn current_block(&self) -> Option<BlockId> {
        self.position
    }

    fn is_terminated(&self, block: BlockId) -> bool {
        self.arena.block(block).get_terminator().is_some()
    }

    // ── Instructions ────────────────────────────────────────────────

    fn binary(&mut self, op: BinaryOp, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.build_binary(op, lhs, rhs)
    }

    fn unary(&mut self, op: UnaryOp, operand: ValueId) -> ValueId {
        self.build_unary(op, operand)
    }

    fn icmp(&mut self, pred: IntPredicate, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.build_icmp(pred, lhs, rhs)
    }

    fn fcmp(&mut self, pred: FloatPredicate, lhs: ValueId, rhs: ValueId) -> ValueId {
        self.build_fcmp(pred, lhs, rhs)
    }

    fn cast(&mut self, op: CastOp, value: ValueId, ty: TypeId) -> ValueId {
        self.build_cast(op, value, ty)
    }

    fn alloca(&mut self, ty: TypeId, name: &str) -> ValueId {
        let basic = self.basic_or_error(ty, "alloca");
        let ptr_ty = self.pointer_type(ty);
        if !self.check_open_block("alloca") {
            return self.fallback(ptr_ty, "alloca could not be placed".to_owned());
        }
        let ptr = self.builder.build_alloca(basic, name).expect("alloca");
        self.push_inst(ptr.into(), ptr_ty)
    }

    fn load(&mut self, ty: TypeId, ptr: ValueId) -> ValueId {
        self.build_load(ty, ptr)
    }

    fn store(&mut self, ptr: ValueId, value: ValueId, volatile: bool) {
        self.build_store(ptr, value, volatile);
    }

    fn struct_gep(&mut self, struct_ty: TypeId, ptr: ValueId, index: u32) -> ValueId {
        self.build_struct_gep(struct_ty, ptr, index)
    }

    fn gep(&mut self, element_ty: TypeId, ptr: ValueId, index: ValueId) -> ValueId {
        self.build_gep(element_ty, ptr, index)
    }

    fn heap_alloc(&mut self, ty: TypeId, count: Option<ValueId>) -> ValueId {
        self.build_heap_alloc(ty, count)
    }

    fn phi(&mut self, block: BlockId, ty: TypeId) -> ValueId {
        self.build_phi(block, ty)
    }

    fn add_incoming(&mut self, phi: ValueId, value: ValueId, block: BlockId) {
        self.build_incoming(phi, value, block);
    }

    fn call(&mut self, function: FunctionId, args: &[ValueId]) -> Option<ValueId> {
        self.build_call(function, args)
    }

    fn call_indirect(&mut self, fn_ty: TypeId, callee: ValueId, args: &[ValueId]) -> Option<ValueId> {
        self.build_indirect_call(fn_ty, callee, args)
    }

    fn br(&mut self, target: BlockId) {
        if !self.check_open_block("br") {
            return;
        }
        self.builder
            .build_unconditional_branch(self.arena.block(target))
            .expect("br");
    }

    fn cond_br(&mut self, cond: ValueId, then_block: BlockId, else_block: BlockId) {
        if !self.check_open_block("cond_br") {
            return;
        }
        let BasicValueEnum::IntValue(c) = self.value(cond) else {
            self.record_error("cond_br on a non-integer condition".to_owned());
            return;
        };
        self.builder
            .build_conditional_branch(c, self.arena.block(then_block), self.arena.block(else_block))
            .expect("cond_br");
    }

    fn switch(&mut self, value: ValueId, default: BlockId, cases: &[(i64, BlockId)]) {
        self.build_switch(value, default, cases);
    }

    fn ret(&mut self, value: Option<ValueId>) {
        if !self.check_open_block("ret") {
            return;
        }
        match value {
            Some(v) => {
                let v = self.value(v);
                self.builder.build_return(Some(&v)).expect("ret");
            }
            None => {
                self.builder.build_return(None).expect("ret void");
            }
        }
    }

    fn unreachable(&mut self) {
        if !self.check_open_block("unreachable") {
            return;
        }
        self.builder.build_unreachable().expect("unreachable");
    }

    // ── Finalization ────────────────────────────────────────────────

    fn verify_function(&self, function: FunctionId) -> Result<(), VerifyError> {
        let entry = self.arena.function(function);
        if let Some((_, message)) = self.errors.iter().find(|(f, _)| *f == Some(function)) {
            return Err(VerifyError::new(entry.name.clone(), message.clone()));
        }
        if entry.value.count_basic_blocks() > 0 && !entry.value.verify(false) {
            return Err(VerifyError::new(
                entry.name.clone(),
                "rejected by the LLVM verifier",
            ));
        }
        Ok(())
    }

    fn optimize_function(&mut self, function: FunctionId, level: OptLevel) {
        // The new pass manager works on whole modules; `finish` runs the
        // pipeline once at the highest level seen.
        tracing::trace!(function = %self.arena.function(function).name, %level, "optimization requested");
        self.opt_level = self.opt_level.max(level);
    }
}

#[cfg(test)]
mod tests;
