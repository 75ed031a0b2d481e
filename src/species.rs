//! Maps a debugger type-code to a semantic [`Species`] in a closed set.
//!
//! `Species` identifies *kind*, not type: two `struct` types share species
//! [`Species::Struct`], while `int` and `long` share [`Species::Integer`].

use num_enum::TryFromPrimitive;

/// The raw, numeric type code a concrete debugger backend reports for a
/// value's type. This mirrors the `TYPE_CODE_*` constants a debugger's
/// scripting API typically exposes; it is deliberately kept separate from
/// [`Species`] so that "the wire-level code a particular backend happens to
/// use" never leaks into the engine's dispatch logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u8)]
pub enum TypeCode {
    Ptr = 0,
    Array = 1,
    Struct = 2,
    Union = 3,
    Enum = 4,
    Func = 5,
    Int = 6,
    Flt = 7,
    Void = 8,
    String = 9,
    Error = 10,
    Method = 11,
    MethodPtr = 12,
    MemberPtr = 13,
    Ref = 14,
    Char = 15,
    Bool = 16,
    Complex = 17,
    Typedef = 18,
    Namespace = 19,
    InternalFunction = 20,
}

/// Coarse semantic kind of a typed object, orthogonal to its specific type
/// name. Purely functional and idempotent; unknown codes classify as
/// [`Species::Error`] rather than panicking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Species {
    Integer,
    Float,
    Bool,
    Char,
    Enum,
    String,
    Function,
    Array,
    Struct,
    Union,
    Pointer,
    Reference,
    Typedef,
    Namespace,
    Frame,
    Method,
    MethodPointer,
    MemberPointer,
    Complex,
    Void,
    Error,
}

impl Species {
    /// Classify a raw debugger type code. Never fails: an unrecognized code
    /// (or one the backend couldn't even resolve to a [`TypeCode`]) becomes
    /// [`Species::Error`], which the engine treats as a leaf (
    /// `UnknownSpecies`).
    #[must_use]
    pub fn classify(code: TypeCode) -> Self {
        match code {
            TypeCode::Ptr => Species::Pointer,
            TypeCode::Array => Species::Array,
            TypeCode::Struct => Species::Struct,
            TypeCode::Union => Species::Union,
            TypeCode::Enum => Species::Enum,
            TypeCode::Func => Species::Function,
            TypeCode::Int => Species::Integer,
            TypeCode::Flt => Species::Float,
            TypeCode::Void => Species::Void,
            TypeCode::String => Species::String,
            TypeCode::Error => Species::Error,
            TypeCode::Method => Species::Method,
            TypeCode::MethodPtr => Species::MethodPointer,
            TypeCode::MemberPtr => Species::MemberPointer,
            TypeCode::Ref => Species::Reference,
            TypeCode::Char => Species::Char,
            TypeCode::Bool => Species::Bool,
            TypeCode::Complex => Species::Complex,
            TypeCode::Typedef => Species::Typedef,
            TypeCode::Namespace => Species::Namespace,
            TypeCode::InternalFunction => Species::Function,
        }
    }

    /// Classify a raw numeric code that may not correspond to any known
    /// [`TypeCode`]. This is the entry point a [`crate::debugger::DebugType`]
    /// implementation should use, since a debugger backend's wire format is
    /// free to report codes this crate doesn't recognize.
    #[must_use]
    pub fn classify_raw(raw: u8) -> Self {
        TypeCode::try_from_primitive(raw).map_or(Species::Error, Species::classify)
    }

    /// Species for which [`crate::record::MemoryRecord::value_repr`] holds a
    /// human-readable literal rather than an address- or type-tagged marker.
    #[must_use]
    pub fn is_extractable(self) -> bool {
        matches!(
            self,
            Species::Integer
                | Species::Float
                | Species::Bool
                | Species::Char
                | Species::String
                | Species::Function
        )
    }

    /// Species with no children under any circumstance.
    #[must_use]
    pub fn is_leaf(self) -> bool {
        matches!(
            self,
            Species::Integer
                | Species::Float
                | Species::Bool
                | Species::Char
                | Species::Enum
                | Species::String
                | Species::Function
                | Species::Void
                | Species::Error
                | Species::Namespace
                | Species::Method
                | Species::MethodPointer
                | Species::MemberPointer
                | Species::Complex
        )
    }
}
