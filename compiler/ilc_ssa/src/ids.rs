//! Opaque ID newtypes handed out by a [`Backend`](crate::Backend).
//!
//! Callers never see backend-specific value or type objects; every handle
//! is a `Copy` index into the backend's own arenas. IDs are only meaningful
//! for the backend that produced them.

macro_rules! define_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[repr(transparent)]
        pub struct $name(u32);

        impl $name {
            /// Create a handle from a raw arena index.
            #[inline]
            pub const fn new(raw: u32) -> Self {
                Self(raw)
            }

            /// The raw index.
            #[inline]
            pub const fn raw(self) -> u32 {
                self.0
            }

            /// The index as `usize`, for indexing into `Vec`s.
            #[inline]
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }
    };
}

define_handle!(
    /// Handle to an SSA value: constant, global, parameter or instruction.
    ValueId
);

define_handle!(
    /// Handle to an IR type.
    TypeId
);

define_handle!(
    /// Handle to a basic block.
    BlockId
);

define_handle!(
    /// Handle to a function.
    FunctionId
);
