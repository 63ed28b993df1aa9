//! Data layout: 64-bit target, natural alignment, 8-byte pointers.

use super::{SsaModule, TypeData};
use crate::TypeId;

const POINTER_SIZE: u64 = 8;

impl SsaModule {
    /// Allocation size in bytes, including tail padding.
    pub(crate) fn alloc_size(&self, ty: TypeId) -> u64 {
        match self.type_data(ty) {
            TypeData::Void | TypeData::Function { .. } => 0,
            TypeData::Int(bits) => u64::from(bits.div_ceil(8)).next_power_of_two(),
            TypeData::Float(bits) => u64::from(*bits / 8),
            TypeData::Pointer(_) => POINTER_SIZE,
            TypeData::Array { element, len } => self.alloc_size(*element) * len,
            TypeData::Struct { body: None, .. } => 0,
            TypeData::Struct {
                body: Some(body),
                packed,
                ..
            } => {
                let mut offset: u64 = 0;
                let mut max_align: u64 = 1;
                for member in body {
                    let align = if *packed { 1 } else { self.align_of(*member) };
                    max_align = max_align.max(align);
                    offset = offset.next_multiple_of(align) + self.alloc_size(*member);
                }
                offset.next_multiple_of(max_align)
            }
        }
    }

    /// ABI alignment in bytes.
    pub(crate) fn align_of(&self, ty: TypeId) -> u64 {
        match self.type_data(ty) {
            TypeData::Void | TypeData::Function { .. } | TypeData::Struct { body: None, .. } => 1,
            TypeData::Int(_) | TypeData::Float(_) | TypeData::Pointer(_) => {
                self.alloc_size(ty).clamp(1, POINTER_SIZE)
            }
            TypeData::Array { element, .. } => self.align_of(*element),
            TypeData::Struct {
                body: Some(body),
                packed,
                ..
            } => {
                if *packed {
                    1
                } else {
                    body.iter().map(|m| self.align_of(*m)).max().unwrap_or(1)
                }
            }
        }
    }
}
