//! Textual dump in an LLVM-like syntax.

use std::fmt::{self, Write as _};

use super::{Callee, Inst, SsaModule, Terminator, TypeData, ValueKind};
use crate::{BlockId, FunctionId, Linkage, TypeId, ValueId};

impl SsaModule {
    fn type_str(&self, ty: TypeId) -> String {
        match self.type_data(ty) {
            TypeData::Void => "void".to_owned(),
            TypeData::Int(bits) => format!("i{bits}"),
            TypeData::Float(32) => "float".to_owned(),
            TypeData::Float(_) => "double".to_owned(),
            TypeData::Pointer(pointee) => format!("{}*", self.type_str(*pointee)),
            TypeData::Array { element, len } => format!("[{len} x {}]", self.type_str(*element)),
            TypeData::Function { ret, params } => {
                let params: Vec<_> = params.iter().map(|p| self.type_str(*p)).collect();
                format!("{} ({})", self.type_str(*ret), params.join(", "))
            }
            TypeData::Struct { name, .. } => format!("%{name}"),
        }
    }

    fn operand(&self, value: ValueId) -> String {
        match &self.value(value).kind {
            ValueKind::ConstInt(v) => v.to_string(),
            ValueKind::ConstFloat(v) => format!("{v:?}"),
            ValueKind::ConstNull => match self.type_data(self.value(value).ty) {
                TypeData::Pointer(_) => "null".to_owned(),
                TypeData::Int(_) => "0".to_owned(),
                TypeData::Float(_) => "0.0".to_owned(),
                _ => "zeroinitializer".to_owned(),
            },
            ValueKind::ConstAggregate(items) => {
                let items: Vec<_> = items.iter().map(|v| self.typed(*v)).collect();
                format!("{{ {} }}", items.join(", "))
            }
            ValueKind::ConstBytes(s) => format!("c\"{}\\00\"", s.escape_default()),
            ValueKind::Global { name, .. } => format!("@{name}"),
            ValueKind::Function(f) => format!("@{}", self.function_name(*f)),
            ValueKind::Param { index, .. } => format!("%arg{index}"),
            ValueKind::Inst { .. } => format!("%v{}", value.raw()),
        }
    }

    fn typed(&self, value: ValueId) -> String {
        format!("{} {}", self.type_str(self.value(value).ty), self.operand(value))
    }

    fn label(&self, block: BlockId) -> String {
        format!("%{}", self.block_name(block))
    }

    fn inst_str(&self, value: ValueId, inst: &Inst) -> String {
        let result = format!("%v{} = ", value.raw());
        match inst {
            Inst::Binary { op, lhs, rhs } => {
                format!("{result}{} {}, {}", op.mnemonic(), self.typed(*lhs), self.operand(*rhs))
            }
            Inst::Unary { op, operand } => format!("{result}{} {}", op.mnemonic(), self.typed(*operand)),
            Inst::ICmp { pred, lhs, rhs } => format!(
                "{result}icmp {} {}, {}",
                pred.mnemonic(),
                self.typed(*lhs),
                self.operand(*rhs)
            ),
            Inst::FCmp { pred, lhs, rhs } => format!(
                "{result}fcmp {} {}, {}",
                pred.mnemonic(),
                self.typed(*lhs),
                self.operand(*rhs)
            ),
            Inst::Cast { op, value: v } => format!(
                "{result}{} {} to {}",
                op.mnemonic(),
                self.typed(*v),
                self.type_str(self.value(value).ty)
            ),
            Inst::Alloca { ty } => format!("{result}alloca {}", self.type_str(*ty)),
            Inst::Load { ptr } => format!(
                "{result}load {}, {}",
                self.type_str(self.value(value).ty),
                self.typed(*ptr)
            ),
            Inst::Store {
                ptr,
                value: v,
                volatile,
            } => format!(
                "store{} {}, {}",
                if *volatile { " volatile" } else { "" },
                self.typed(*v),
                self.typed(*ptr)
            ),
            Inst::StructGep {
                struct_ty,
                ptr,
                index,
            } => format!(
                "{result}getelementptr inbounds {}, {}, i32 0, i32 {index}",
                self.type_str(*struct_ty),
                self.typed(*ptr)
            ),
            Inst::Gep {
                element,
                ptr,
                index,
            } => format!(
                "{result}getelementptr {}, {}, {}",
                self.type_str(*element),
                self.typed(*ptr),
                self.typed(*index)
            ),
            Inst::HeapAlloc { ty, count } => match count {
                Some(count) => format!("{result}alloc.zeroed {}, {}", self.type_str(*ty), self.typed(*count)),
                None => format!("{result}alloc.zeroed {}", self.type_str(*ty)),
            },
            Inst::Phi { incoming } => {
                let edges: Vec<_> = incoming
                    .iter()
                    .map(|(v, b)| format!("[ {}, {} ]", self.operand(*v), self.label(*b)))
                    .collect();
                format!(
                    "{result}phi {} {}",
                    self.type_str(self.value(value).ty),
                    edges.join(", ")
                )
            }
            Inst::Call { callee, args } => {
                let args: Vec<_> = args.iter().map(|a| self.typed(*a)).collect();
                let target = match callee {
                    Callee::Direct(f) => format!("@{}", self.function_name(*f)),
                    Callee::Indirect { ptr, .. } => self.operand(*ptr),
                };
                let ret = self.type_str(self.value(value).ty);
                if matches!(self.type_data(self.value(value).ty), TypeData::Void) {
                    format!("call {ret} {target}({})", args.join(", "))
                } else {
                    format!("{result}call {ret} {target}({})", args.join(", "))
                }
            }
        }
    }

    fn terminator_str(&self, term: &Terminator) -> String {
        match term {
            Terminator::Br(target) => format!("br label {}", self.label(*target)),
            Terminator::CondBr {
                cond,
                then_block,
                else_block,
            } => format!(
                "br {}, label {}, label {}",
                self.typed(*cond),
                self.label(*then_block),
                self.label(*else_block)
            ),
            Terminator::Switch {
                value,
                default,
                cases,
            } => {
                let ty = self.type_str(self.value(*value).ty);
                let cases: Vec<_> = cases
                    .iter()
                    .map(|(v, b)| format!("{ty} {v}, label {}", self.label(*b)))
                    .collect();
                format!(
                    "switch {}, label {} [ {} ]",
                    self.typed(*value),
                    self.label(*default),
                    cases.join(" ")
                )
            }
            Terminator::Ret(Some(v)) => format!("ret {}", self.typed(*v)),
            Terminator::Ret(None) => "ret void".to_owned(),
            Terminator::Unreachable => "unreachable".to_owned(),
        }
    }

    fn write_function(&self, out: &mut String, function: FunctionId) -> fmt::Result {
        let data = &self.functions[function.index()];
        let (ret, params) = match self.type_data(data.ty) {
            TypeData::Function { ret, params } => (self.type_str(*ret), params.clone()),
            _ => ("void".to_owned(), Vec::new()),
        };
        let linkage = match data.linkage {
            Linkage::External => "",
            Linkage::Internal => "internal ",
        };
        let params: Vec<_> = params
            .iter()
            .enumerate()
            .map(|(i, p)| format!("{} %arg{i}", self.type_str(*p)))
            .collect();
        if data.blocks.is_empty() {
            return writeln!(out, "declare {ret} @{}({})", data.name, params.join(", "));
        }
        writeln!(out, "define {linkage}{ret} @{}({}) {{", data.name, params.join(", "))?;
        for block in &data.blocks {
            writeln!(out, "{}:", self.block_name(*block))?;
            for value in self.block_insts(*block) {
                if let Some(inst) = self.inst(*value) {
                    writeln!(out, "  {}", self.inst_str(*value, inst))?;
                }
            }
            match self.terminator(*block) {
                Some(term) => writeln!(out, "  {}", self.terminator_str(term))?,
                None => writeln!(out, "  ; missing terminator")?,
            }
        }
        writeln!(out, "}}")
    }
}

impl fmt::Display for SsaModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        writeln!(out, "; module '{}'", self.name)?;

        for data in &self.types {
            if let TypeData::Struct { name, body, packed } = data {
                match body {
                    None => writeln!(out, "%{name} = type opaque")?,
                    Some(members) => {
                        let members: Vec<_> = members.iter().map(|m| self.type_str(*m)).collect();
                        let (open, close) = if *packed { ("<{ ", " }>") } else { ("{ ", " }") };
                        writeln!(out, "%{name} = type {open}{}{close}", members.join(", "))?;
                    }
                }
            }
        }

        for global in &self.globals {
            if let ValueKind::Global {
                name,
                content,
                initializer,
            } = &self.value(*global).kind
            {
                let kind = if name.starts_with(".str") {
                    "private constant"
                } else {
                    "global"
                };
                writeln!(
                    out,
                    "@{name} = {kind} {} {}",
                    self.type_str(*content),
                    self.operand(*initializer)
                )?;
            }
        }

        for function in self.functions() {
            out.push('\n');
            self.write_function(&mut out, function)?;
        }

        f.write_str(&out)
    }
}
