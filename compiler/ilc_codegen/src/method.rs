//! Method translation.
//!
//! A method body is translated in one linear pass. An `entry` block holds
//! the stack slots of arguments and locals and branches to the first IL
//! block; every block leader found by [`blocks::analyze`] gets its own IR
//! block, and the evaluation stack is reconciled along each edge as the
//! branch that creates it is emitted.

mod blocks;
mod context;

use ilc_meta::{MethodBody, MethodDef, MethodId, Opcode, TypeKind, Visibility};
use ilc_ssa::{Backend, FunctionId, Linkage};
use rustc_hash::FxHashMap;

pub use self::context::{BlockInfo, MethodContext, Variable};
use crate::context::CodegenContext;
use crate::emit::{dispatch, Dispatch};
use crate::stack::EvalStack;
use crate::type_map::{arg_sigs, function_type, ir_type};
use crate::{naming, CodegenError, CodegenResult};

/// What happened to one method.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MethodOutcome {
    /// A body was emitted.
    Compiled(FunctionId),
    /// No body; declared with external linkage.
    External(FunctionId),
    /// Abstract; declared with external linkage, reachable only through
    /// vtables.
    Abstract(FunctionId),
    /// The body uses a construct that is not implemented yet.
    Skipped { reason: String },
}

fn linkage_of(def: &MethodDef) -> Linkage {
    if def.body.is_none() || def.visibility == Visibility::Public {
        Linkage::External
    } else {
        Linkage::Internal
    }
}

/// The IR function of `method`, declared on first request.
pub fn declare_function(cx: &mut CodegenContext<'_>, b: &mut dyn Backend, method: MethodId) -> CodegenResult<FunctionId> {
    let asm = cx.asm;
    let name = naming::method_name(asm, method);
    if let Some(function) = cx.lookup.get_function(&name) {
        return Ok(function);
    }
    let def = asm.method(method);
    let fn_ty = function_type(cx, b, def)?;
    let function = b.add_function(&name, fn_ty, linkage_of(def));
    cx.lookup.add_function(&name, function)?;
    tracing::trace!(%name, "declared function");
    Ok(function)
}

/// The first instruction of `body` that has no handler yet, if any.
/// Fails on instructions that will never be supported.
fn first_deferred(cx: &CodegenContext<'_>, method: MethodId, body: &MethodBody) -> CodegenResult<Option<Opcode>> {
    for instr in &body.instructions {
        match dispatch(instr.opcode) {
            Dispatch::Handler(_) => {}
            Dispatch::Deferred => return Ok(Some(instr.opcode)),
            Dispatch::Unsupported => {
                let def = cx.asm.method(method);
                return Err(CodegenError::UnsupportedInstruction {
                    method: format!("{}::{}", cx.asm.type_def(def.declaring_type).full_name(), def.name),
                    opcode: instr.opcode.mnemonic(),
                });
            }
        }
    }
    Ok(None)
}

/// Translate one method.
pub fn compile_method(cx: &mut CodegenContext<'_>, b: &mut dyn Backend, method: MethodId) -> CodegenResult<MethodOutcome> {
    let asm = cx.asm;
    let def = asm.method(method);
    let declaring = asm.type_def(def.declaring_type);
    let qualified = format!("{}::{}", declaring.full_name(), def.name);

    if def.is_constructor() && def.params.is_empty() && declaring.kind() == TypeKind::Struct {
        tracing::debug!(method = %qualified, "skipping default value-type constructor");
        return Ok(MethodOutcome::Skipped {
            reason: "default value-type constructor".to_owned(),
        });
    }

    let Some(body) = &def.body else {
        let function = declare_function(cx, b, method)?;
        if def.is_abstract() {
            return Ok(MethodOutcome::Abstract(function));
        }
        return Ok(MethodOutcome::External(function));
    };

    if let Some(opcode) = first_deferred(cx, method, body)? {
        let reason = format!("`{}` is not implemented yet", opcode.mnemonic());
        tracing::warn!(method = %qualified, %reason, "skipping method");
        let function = declare_function(cx, b, method)?;
        b.set_linkage(function, Linkage::External);
        return Ok(MethodOutcome::Skipped { reason });
    }

    let function = declare_function(cx, b, method)?;
    b.set_linkage(function, linkage_of(def));
    tracing::debug!(method = %qualified, instructions = body.instructions.len(), "compiling method");

    emit_body(cx, b, method, function, body)?;
    if cx.settings.verify {
        b.verify_function(function)?;
    }
    b.optimize_function(function, cx.settings.optimization);
    Ok(MethodOutcome::Compiled(function))
}

fn emit_body(
    cx: &mut CodegenContext<'_>,
    b: &mut dyn Backend,
    method: MethodId,
    function: FunctionId,
    body: &MethodBody,
) -> CodegenResult<()> {
    let asm = cx.asm;
    let def = asm.method(method);
    let entry = b.append_block(function, "entry");
    b.position_at_end(entry);

    let mut args = Vec::new();
    for (index, sig) in arg_sigs(asm, def).into_iter().enumerate() {
        let ty = ir_type(cx, b, &sig)?;
        let ptr = b.alloca(ty, &format!("arg{index}"));
        #[allow(clippy::cast_possible_truncation, reason = "argument counts fit in u32")]
        let param = b.param(function, index as u32);
        b.store(ptr, param, false);
        args.push(Variable { ptr, sig, ty });
    }
    let mut locals = Vec::new();
    for (index, sig) in body.locals.iter().enumerate() {
        let ty = ir_type(cx, b, sig)?;
        let ptr = b.alloca(ty, &format!("loc{index}"));
        let zero = b.const_null(ty);
        b.store(ptr, zero, false);
        locals.push(Variable {
            ptr,
            sig: sig.clone(),
            ty,
        });
    }

    let mut leaders = FxHashMap::default();
    for (index, refers) in blocks::analyze(&body.instructions) {
        let block = b.append_block(function, &format!("IL_{index:04x}"));
        leaders.insert(
            index,
            BlockInfo {
                block,
                refers,
                incoming: EvalStack::new(),
            },
        );
    }

    let mut ctx = MethodContext {
        cx,
        method,
        function,
        args,
        locals,
        stack: EvalStack::new(),
        blocks: leaders,
        current: entry,
        index: 0,
        opcode: Opcode::Nop,
    };

    for (index, instr) in body.instructions.iter().enumerate() {
        ctx.index = index;
        ctx.opcode = instr.opcode;
        if ctx.is_leader(index) {
            ctx.enter_block(b, index)?;
        }
        tracing::trace!(index, opcode = instr.opcode.mnemonic(), depth = ctx.stack.len(), "emit");
        match dispatch(instr.opcode) {
            Dispatch::Handler(handler) => handler.emit(instr, &mut ctx, b)?,
            Dispatch::Deferred | Dispatch::Unsupported => {
                return Err(CodegenError::UnsupportedInstruction {
                    method: ctx.display_name(),
                    opcode: instr.opcode.mnemonic(),
                })
            }
        }
    }

    // Control never falls off the end of a well-formed body.
    if !b.is_terminated(ctx.current) {
        b.unreachable();
    }
    Ok(())
}
