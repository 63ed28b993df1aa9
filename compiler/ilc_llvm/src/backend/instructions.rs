//! Instruction emission.
//!
//! Each builder first checks the operand kinds the LLVM instruction needs.
//! A mismatch goes through [`LlvmBackend::fallback`] instead of reaching
//! inkwell, whose `into_*_value` conversions panic.

use inkwell::basic_block::BasicBlock;
use inkwell::module::Linkage as LlvmLinkage;
use inkwell::types::BasicTypeEnum;
use inkwell::values::{
    BasicMetadataValueEnum, BasicValue, BasicValueEnum, CallSiteValue, FunctionValue,
    InstructionOpcode, InstructionValue, IntValue,
};
use ilc_ssa::{
    Backend, BinaryOp, BlockId, CastOp, FloatPredicate, FunctionId, IntPredicate, TypeData,
    TypeId, UnaryOp, ValueId,
};

use super::LlvmBackend;
use crate::arena::{ValueEntry, ValueKind};

fn int_predicate(pred: IntPredicate) -> inkwell::IntPredicate {
    match pred {
        IntPredicate::Eq => inkwell::IntPredicate::EQ,
        IntPredicate::Ne => inkwell::IntPredicate::NE,
        IntPredicate::Sgt => inkwell::IntPredicate::SGT,
        IntPredicate::Sge => inkwell::IntPredicate::SGE,
        IntPredicate::Slt => inkwell::IntPredicate::SLT,
        IntPredicate::Sle => inkwell::IntPredicate::SLE,
        IntPredicate::Ugt => inkwell::IntPredicate::UGT,
        IntPredicate::Uge => inkwell::IntPredicate::UGE,
        IntPredicate::Ult => inkwell::IntPredicate::ULT,
        IntPredicate::Ule => inkwell::IntPredicate::ULE,
    }
}

fn float_predicate(pred: FloatPredicate) -> inkwell::FloatPredicate {
    match pred {
        FloatPredicate::Oeq => inkwell::FloatPredicate::OEQ,
        FloatPredicate::One => inkwell::FloatPredicate::ONE,
        FloatPredicate::Ogt => inkwell::FloatPredicate::OGT,
        FloatPredicate::Oge => inkwell::FloatPredicate::OGE,
        FloatPredicate::Olt => inkwell::FloatPredicate::OLT,
        FloatPredicate::Ole => inkwell::FloatPredicate::OLE,
        FloatPredicate::Ueq => inkwell::FloatPredicate::UEQ,
        FloatPredicate::Une => inkwell::FloatPredicate::UNE,
        FloatPredicate::Ugt => inkwell::FloatPredicate::UGT,
        FloatPredicate::Uge => inkwell::FloatPredicate::UGE,
        FloatPredicate::Ult => inkwell::FloatPredicate::ULT,
        FloatPredicate::Ule => inkwell::FloatPredicate::ULE,
    }
}

/// First instruction of `block` that is not a phi.
fn first_non_phi<'ctx>(block: BasicBlock<'ctx>) -> Option<InstructionValue<'ctx>> {
    let mut inst = block.get_first_instruction();
    while let Some(i) = inst {
        if i.get_opcode() != InstructionOpcode::Phi {
            return Some(i);
        }
        inst = i.get_next_instruction();
    }
    None
}

impl<'ctx> LlvmBackend<'ctx> {
    pub(super) fn build_binary(&mut self, op: BinaryOp, lhs: ValueId, rhs: ValueId) -> ValueId {
        let ty = self.type_of(lhs);
        if !self.check_open_block(op.mnemonic()) {
            return self.fallback(ty, format!("{} could not be placed", op.mnemonic()));
        }
        let (l, r) = (self.value(lhs), self.value(rhs));
        if l.get_type() != r.get_type() {
            return self.fallback(
                ty,
                format!("{} on {:?} and {:?}", op.mnemonic(), l.get_type(), r.get_type()),
            );
        }
        let b = &self.builder;
        let result: BasicValueEnum<'ctx> = match (op, l, r) {
            (BinaryOp::Add, BasicValueEnum::IntValue(l), BasicValueEnum::IntValue(r)) => {
                b.build_int_add(l, r, "add").expect("add").into()
            }
            (BinaryOp::Sub, BasicValueEnum::IntValue(l), BasicValueEnum::IntValue(r)) => {
                b.build_int_sub(l, r, "sub").expect("sub").into()
            }
            (BinaryOp::Mul, BasicValueEnum::IntValue(l), BasicValueEnum::IntValue(r)) => {
                b.build_int_mul(l, r, "mul").expect("mul").into()
            }
            (BinaryOp::SDiv, BasicValueEnum::IntValue(l), BasicValueEnum::IntValue(r)) => {
                b.build_int_signed_div(l, r, "sdiv").expect("sdiv").into()
            }
            (BinaryOp::UDiv, BasicValueEnum::IntValue(l), BasicValueEnum::IntValue(r)) => {
                b.build_int_unsigned_div(l, r, "udiv").expect("udiv").into()
            }
            (BinaryOp::SRem, BasicValueEnum::IntValue(l), BasicValueEnum::IntValue(r)) => {
                b.build_int_signed_rem(l, r, "srem").expect("srem").into()
            }
            (BinaryOp::URem, BasicValueEnum::IntValue(l), BasicValueEnum::IntValue(r)) => {
                b.build_int_unsigned_rem(l, r, "urem").expect("urem").into()
            }
            (BinaryOp::And, BasicValueEnum::IntValue(l), BasicValueEnum::IntValue(r)) => {
                b.build_and(l, r, "and").expect("and").into()
            }
            (BinaryOp::Or, BasicValueEnum::IntValue(l), BasicValueEnum::IntValue(r)) => {
                b.build_or(l, r, "or").expect("or").into()
            }
            (BinaryOp::Xor, BasicValueEnum::IntValue(l), BasicValueEnum::IntValue(r)) => {
                b.build_xor(l, r, "xor").expect("xor").into()
            }
            (BinaryOp::Shl, BasicValueEnum::IntValue(l), BasicValueEnum::IntValue(r)) => {
                b.build_left_shift(l, r, "shl").expect("shl").into()
            }
            (BinaryOp::AShr, BasicValueEnum::IntValue(l), BasicValueEnum::IntValue(r)) => {
                b.build_right_shift(l, r, true, "ashr").expect("ashr").into()
            }
            (BinaryOp::LShr, BasicValueEnum::IntValue(l), BasicValueEnum::IntValue(r)) => {
                b.build_right_shift(l, r, false, "lshr").expect("lshr").into()
            }
            (BinaryOp::FAdd, BasicValueEnum::FloatValue(l), BasicValueEnum::FloatValue(r)) => {
                b.build_float_add(l, r, "fadd").expect("fadd").into()
            }
            (BinaryOp::FSub, BasicValueEnum::FloatValue(l), BasicValueEnum::FloatValue(r)) => {
                b.build_float_sub(l, r, "fsub").expect("fsub").into()
            }
            (BinaryOp::FMul, BasicValueEnum::FloatValue(l), BasicValueEnum::FloatValue(r)) => {
                b.build_float_mul(l, r, "fmul").expect("fmul").into()
            }
            (BinaryOp::FDiv, BasicValueEnum::FloatValue(l), BasicValueEnum::FloatValue(r)) => {
                b.build_float_div(l, r, "fdiv").expect("fdiv").into()
            }
            (BinaryOp::FRem, BasicValueEnum::FloatValue(l), BasicValueEnum::FloatValue(r)) => {
                b.build_float_rem(l, r, "frem").expect("frem").into()
            }
            (_, l, r) => {
                return self.fallback(
                    ty,
                    format!("{} on {:?} and {:?}", op.mnemonic(), l.get_type(), r.get_type()),
                );
            }
        };
        self.push_inst(result, ty)
    }

    pub(super) fn build_unary(&mut self, op: UnaryOp, operand: ValueId) -> ValueId {
        let ty = self.type_of(operand);
        if !self.check_open_block(op.mnemonic()) {
            return self.fallback(ty, format!("{} could not be placed", op.mnemonic()));
        }
        let result: BasicValueEnum<'ctx> = match (op, self.value(operand)) {
            (UnaryOp::Neg, BasicValueEnum::IntValue(v)) => {
                self.builder.build_int_neg(v, "neg").expect("neg").into()
            }
            (UnaryOp::FNeg, BasicValueEnum::FloatValue(v)) => {
                self.builder.build_float_neg(v, "fneg").expect("fneg").into()
            }
            (UnaryOp::Not, BasicValueEnum::IntValue(v)) => {
                self.builder.build_not(v, "not").expect("not").into()
            }
            (_, v) => {
                return self.fallback(ty, format!("{} on {:?}", op.mnemonic(), v.get_type()));
            }
        };
        self.push_inst(result, ty)
    }

    /// Pointers are compared as 64-bit addresses.
    pub(super) fn build_icmp(&mut self, pred: IntPredicate, lhs: ValueId, rhs: ValueId) -> ValueId {
        let bool_ty = self.int_type(1);
        if !self.check_open_block("icmp") {
            return self.fallback(bool_ty, "icmp could not be placed".to_owned());
        }
        let i64_ty = self.context.i64_type();
        let as_int = |backend: &Self, v: BasicValueEnum<'ctx>| -> Option<IntValue<'ctx>> {
            match v {
                BasicValueEnum::IntValue(i) => Some(i),
                BasicValueEnum::PointerValue(p) => {
                    Some(backend.builder.build_ptr_to_int(p, i64_ty, "addr").expect("ptrtoint"))
                }
                _ => None,
            }
        };
        let (l, r) = (self.value(lhs), self.value(rhs));
        let (Some(li), Some(ri)) = (as_int(self, l), as_int(self, r)) else {
            return self.fallback(bool_ty, format!("icmp on {:?} and {:?}", l.get_type(), r.get_type()));
        };
        if li.get_type() != ri.get_type() {
            return self.fallback(bool_ty, format!("icmp on {:?} and {:?}", l.get_type(), r.get_type()));
        }
        let v = self
            .builder
            .build_int_compare(int_predicate(pred), li, ri, "icmp")
            .expect("icmp");
        self.push_inst(v.into(), bool_ty)
    }

    pub(super) fn build_fcmp(&mut self, pred: FloatPredicate, lhs: ValueId, rhs: ValueId) -> ValueId {
        let bool_ty = self.int_type(1);
        if !self.check_open_block("fcmp") {
            return self.fallback(bool_ty, "fcmp could not be placed".to_owned());
        }
        match (self.value(lhs), self.value(rhs)) {
            (BasicValueEnum::FloatValue(l), BasicValueEnum::FloatValue(r))
                if l.get_type() == r.get_type() =>
            {
                let v = self
                    .builder
                    .build_float_compare(float_predicate(pred), l, r, "fcmp")
                    .expect("fcmp");
                self.push_inst(v.into(), bool_ty)
            }
            (l, r) => self.fallback(bool_ty, format!("fcmp on {:?} and {:?}", l.get_type(), r.get_type())),
        }
    }

    pub(super) fn build_cast(&mut self, op: CastOp, value: ValueId, ty: TypeId) -> ValueId {
        if !self.check_open_block(op.mnemonic()) {
            return self.fallback(ty, format!("{} could not be placed", op.mnemonic()));
        }
        let entry = *self.arena.value(value);
        let b = &self.builder;
        let result: BasicValueEnum<'ctx> = match (op, entry.value, self.types.basic(ty)) {
            (CastOp::Trunc, BasicValueEnum::IntValue(v), Some(BasicTypeEnum::IntType(t)))
                if v.get_type().get_bit_width() > t.get_bit_width() =>
            {
                b.build_int_truncate(v, t, "trunc").expect("trunc").into()
            }
            (CastOp::ZExt, BasicValueEnum::IntValue(v), Some(BasicTypeEnum::IntType(t)))
                if v.get_type().get_bit_width() < t.get_bit_width() =>
            {
                b.build_int_z_extend(v, t, "zext").expect("zext").into()
            }
            (CastOp::SExt, BasicValueEnum::IntValue(v), Some(BasicTypeEnum::IntType(t)))
                if v.get_type().get_bit_width() < t.get_bit_width() =>
            {
                b.build_int_s_extend(v, t, "sext").expect("sext").into()
            }
            (CastOp::FpTrunc, BasicValueEnum::FloatValue(v), Some(BasicTypeEnum::FloatType(t))) => {
                b.build_float_trunc(v, t, "fptrunc").expect("fptrunc").into()
            }
            (CastOp::FpExt, BasicValueEnum::FloatValue(v), Some(BasicTypeEnum::FloatType(t))) => {
                b.build_float_ext(v, t, "fpext").expect("fpext").into()
            }
            (CastOp::FpToSi, BasicValueEnum::FloatValue(v), Some(BasicTypeEnum::IntType(t))) => {
                b.build_float_to_signed_int(v, t, "fptosi").expect("fptosi").into()
            }
            (CastOp::FpToUi, BasicValueEnum::FloatValue(v), Some(BasicTypeEnum::IntType(t))) => {
                b.build_float_to_unsigned_int(v, t, "fptoui").expect("fptoui").into()
            }
            (CastOp::SiToFp, BasicValueEnum::IntValue(v), Some(BasicTypeEnum::FloatType(t))) => {
                b.build_signed_int_to_float(v, t, "sitofp").expect("sitofp").into()
            }
            (CastOp::UiToFp, BasicValueEnum::IntValue(v), Some(BasicTypeEnum::FloatType(t))) => {
                b.build_unsigned_int_to_float(v, t, "uitofp").expect("uitofp").into()
            }
            (CastOp::PtrToInt, BasicValueEnum::PointerValue(v), Some(BasicTypeEnum::IntType(t))) => {
                b.build_ptr_to_int(v, t, "ptrtoint").expect("ptrtoint").into()
            }
            (CastOp::IntToPtr, BasicValueEnum::IntValue(v), Some(BasicTypeEnum::PointerType(t))) => {
                b.build_int_to_ptr(v, t, "inttoptr").expect("inttoptr").into()
            }
            // Opaque pointers: a pointer-to-pointer cast only changes the
            // pointee recorded in the type table.
            (CastOp::BitCast, BasicValueEnum::PointerValue(_), Some(BasicTypeEnum::PointerType(_))) => {
                let kind = match entry.kind {
                    ValueKind::Constant | ValueKind::Global { .. } => ValueKind::Constant,
                    ValueKind::Phi(_) | ValueKind::Inst => ValueKind::Inst,
                };
                return self.arena.push_value(ValueEntry {
                    value: entry.value,
                    ty,
                    kind,
                });
            }
            (CastOp::BitCast, v, Some(t)) if v.get_type() == t => {
                return self.push_inst(v, ty);
            }
            (_, v, _) => {
                return self.fallback(
                    ty,
                    format!("{} from {:?} to {:?}", op.mnemonic(), v.get_type(), self.types.data(ty)),
                );
            }
        };
        self.push_inst(result, ty)
    }

    pub(super) fn build_load(&mut self, ty: TypeId, ptr: ValueId) -> ValueId {
        let basic = self.basic_or_error(ty, "load");
        if !self.check_open_block("load") {
            return self.fallback(ty, "load could not be placed".to_owned());
        }
        let BasicValueEnum::PointerValue(p) = self.value(ptr) else {
            return self.fallback(ty, "load from a non-pointer".to_owned());
        };
        let v = self.builder.build_load(basic, p, "load").expect("load");
        self.push_inst(v, ty)
    }

    pub(super) fn build_store(&mut self, ptr: ValueId, value: ValueId, volatile: bool) {
        if !self.check_open_block("store") {
            return;
        }
        let BasicValueEnum::PointerValue(p) = self.value(ptr) else {
            self.record_error("store to a non-pointer".to_owned());
            return;
        };
        let store = self.builder.build_store(p, self.value(value)).expect("store");
        if volatile {
            if let Err(err) = store.set_volatile(true) {
                self.record_error(format!("cannot mark store volatile: {err:?}"));
            }
        }
    }

    pub(super) fn build_struct_gep(&mut self, struct_ty: TypeId, ptr: ValueId, index: u32) -> ValueId {
        let field = match self.types.data(struct_ty) {
            TypeData::Struct { body: Some(fields), .. } => fields.get(index as usize).copied(),
            _ => None,
        };
        let result_ty = match field {
            Some(f) => self.pointer_type(f),
            None => self.generic_pointer(),
        };
        let Some(field) = field else {
            return self.fallback(
                result_ty,
                format!("struct_gep index {index} into {:?}", self.types.data(struct_ty)),
            );
        };
        if !self.check_open_block("struct_gep") {
            return self.fallback(result_ty, "struct_gep could not be placed".to_owned());
        }
        let (Some(basic), BasicValueEnum::PointerValue(p)) = (self.types.basic(struct_ty), self.value(ptr)) else {
            return self.fallback(result_ty, "struct_gep on a non-pointer".to_owned());
        };
        match self.builder.build_struct_gep(basic, p, index, "field") {
            Ok(addr) => {
                let ty = self.pointer_type(field);
                self.push_inst(addr.into(), ty)
            }
            Err(err) => self.fallback(result_ty, format!("struct_gep: {err}")),
        }
    }

    pub(super) fn build_gep(&mut self, element_ty: TypeId, ptr: ValueId, index: ValueId) -> ValueId {
        let result_ty = self.pointer_type(element_ty);
        let elem = self.basic_or_error(element_ty, "gep");
        if !self.check_open_block("gep") {
            return self.fallback(result_ty, "gep could not be placed".to_owned());
        }
        let (BasicValueEnum::PointerValue(p), BasicValueEnum::IntValue(i)) = (self.value(ptr), self.value(index)) else {
            return self.fallback(result_ty, "gep needs a pointer and an integer index".to_owned());
        };
        // SAFETY: the index is an element offset computed by the caller
        // for storage of `element_ty`; LLVM does not bounds-check.
        #[allow(unsafe_code, reason = "LLVM C API requires unsafe for build_in_bounds_gep")]
        let addr = unsafe {
            self.builder
                .build_in_bounds_gep(elem, p, &[i], "elem")
                .expect("gep")
        };
        self.push_inst(addr.into(), result_ty)
    }

    /// `calloc(count, size)`; a single object when `count` is absent.
    pub(super) fn build_heap_alloc(&mut self, ty: TypeId, count: Option<ValueId>) -> ValueId {
        let result_ty = self.pointer_type(ty);
        if !self.check_open_block("heap_alloc") {
            return self.fallback(result_ty, "heap_alloc could not be placed".to_owned());
        }
        let i64_ty = self.context.i64_type();
        let size = i64_ty.const_int(self.size_of(ty), false);
        let count = match count.map(|c| self.value(c)) {
            None => i64_ty.const_int(1, false),
            Some(BasicValueEnum::IntValue(c)) => self
                .builder
                .build_int_cast_sign_flag(c, i64_ty, true, "count")
                .expect("count"),
            Some(other) => {
                return self.fallback(result_ty, format!("heap_alloc count of type {:?}", other.get_type()));
            }
        };
        let calloc = self.calloc();
        let call = self
            .builder
            .build_call(calloc, &[count.into(), size.into()], "obj")
            .expect("calloc");
        match call.try_as_basic_value().basic() {
            Some(ptr) => self.push_inst(ptr, result_ty),
            None => self.fallback(result_ty, "calloc returned void".to_owned()),
        }
    }

    /// `ptr calloc(i64, i64)`, declared on first use.
    fn calloc(&mut self) -> FunctionValue<'ctx> {
        if let Some(f) = self.calloc {
            return f;
        }
        let f = self.module.get_function("calloc").unwrap_or_else(|| {
            let i64_ty = self.context.i64_type();
            let ptr = self.context.ptr_type(inkwell::AddressSpace::default());
            let fn_ty = ptr.fn_type(&[i64_ty.into(), i64_ty.into()], false);
            self.module.add_function("calloc", fn_ty, Some(LlvmLinkage::External))
        });
        self.calloc = Some(f);
        f
    }

    pub(super) fn build_phi(&mut self, block: BlockId, ty: TypeId) -> ValueId {
        let basic = self.basic_or_error(ty, "phi");
        let bb = self.arena.block(block);
        let saved = self.builder.get_insert_block();
        match first_non_phi(bb) {
            Some(inst) => self.builder.position_before(&inst),
            None => self.builder.position_at_end(bb),
        }
        let phi = self.builder.build_phi(basic, "phi").expect("phi");
        if let Some(saved) = saved {
            self.builder.position_at_end(saved);
        }
        self.arena.push_value(ValueEntry {
            value: phi.as_basic_value(),
            ty,
            kind: ValueKind::Phi(phi),
        })
    }

    pub(super) fn build_incoming(&mut self, phi: ValueId, value: ValueId, block: BlockId) {
        let ValueKind::Phi(p) = self.arena.value(phi).kind else {
            self.record_error("add_incoming on a non-phi".to_owned());
            return;
        };
        let v = self.value(value);
        if v.get_type() != p.as_basic_value().get_type() {
            self.record_error(format!(
                "phi incoming of type {:?} into {:?}",
                v.get_type(),
                p.as_basic_value().get_type()
            ));
            return;
        }
        p.add_incoming(&[(&v as &dyn BasicValue<'ctx>, self.arena.block(block))]);
    }

    /// Check `args` against `params`, recording the first mismatch.
    fn check_args(&mut self, callee: &str, params: &[TypeId], args: &[ValueId]) -> bool {
        if params.len() != args.len() {
            self.record_error(format!(
                "call to `{callee}` with {} arguments, expected {}",
                args.len(),
                params.len()
            ));
            return false;
        }
        for (i, (&param, &arg)) in params.iter().zip(args).enumerate() {
            if self.types.basic(param) != Some(self.value(arg).get_type()) {
                self.record_error(format!("argument {i} of `{callee}` has the wrong type"));
                return false;
            }
        }
        true
    }

    /// Zero result standing in for a call that could not be built.
    fn failed_call(&mut self, ret: TypeId) -> Option<ValueId> {
        if self.types.basic(ret).is_none() {
            return None;
        }
        Some(self.const_null(ret))
    }

    fn call_result(&mut self, call: CallSiteValue<'ctx>, ret: TypeId) -> Option<ValueId> {
        call.try_as_basic_value().basic().map(|v| self.push_inst(v, ret))
    }

    pub(super) fn build_call(&mut self, function: FunctionId, args: &[ValueId]) -> Option<ValueId> {
        let entry = self.arena.function(function);
        let (callee, fn_ty, name) = (entry.value, entry.ty, entry.name.clone());
        let TypeData::Function { ret, params } = self.types.data(fn_ty).clone() else {
            self.record_error(format!("call to `{name}` without a function type"));
            return None;
        };
        if !self.check_open_block("call") || !self.check_args(&name, &params, args) {
            return self.failed_call(ret);
        }
        let arg_vals: Vec<BasicMetadataValueEnum<'ctx>> =
            args.iter().map(|&id| self.value(id).into()).collect();
        let call = self.builder.build_call(callee, &arg_vals, "call").expect("call");
        self.call_result(call, ret)
    }

    pub(super) fn build_indirect_call(
        &mut self,
        fn_ty: TypeId,
        callee: ValueId,
        args: &[ValueId],
    ) -> Option<ValueId> {
        let (Some(llvm_ty), TypeData::Function { ret, params }) =
            (self.types.function(fn_ty), self.types.data(fn_ty).clone())
        else {
            self.record_error("indirect call without a function type".to_owned());
            return None;
        };
        if !self.check_open_block("call_indirect") || !self.check_args("<indirect>", &params, args) {
            return self.failed_call(ret);
        }
        let BasicValueEnum::PointerValue(ptr) = self.value(callee) else {
            self.record_error("indirect call through a non-pointer".to_owned());
            return self.failed_call(ret);
        };
        let arg_vals: Vec<BasicMetadataValueEnum<'ctx>> =
            args.iter().map(|&id| self.value(id).into()).collect();
        let call = self
            .builder
            .build_indirect_call(llvm_ty, ptr, &arg_vals, "icall")
            .expect("call_indirect");
        self.call_result(call, ret)
    }

    #[allow(clippy::cast_sign_loss, reason = "two's complement bits, sign-extended by LLVM")]
    pub(super) fn build_switch(&mut self, value: ValueId, default: BlockId, cases: &[(i64, BlockId)]) {
        if !self.check_open_block("switch") {
            return;
        }
        let BasicValueEnum::IntValue(v) = self.value(value) else {
            self.record_error("switch on a non-integer".to_owned());
            return;
        };
        let int_ty = v.get_type();
        let llvm_cases: Vec<(IntValue<'ctx>, BasicBlock<'ctx>)> = cases
            .iter()
            .map(|&(c, target)| (int_ty.const_int(c as u64, c < 0), self.arena.block(target)))
            .collect();
        self.builder
            .build_switch(v, self.arena.block(default), &llvm_cases)
            .expect("switch");
    }
}
