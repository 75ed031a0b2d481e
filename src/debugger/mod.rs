//! The external collaborator interfaces the traversal engine is written
//! against. A concrete debugger integration implements these
//! traits against its own FFI or RPC layer; this crate ships only the
//! [`synthetic`] reference backend, used by the engine's own tests.

pub mod synthetic;

use crate::error::Error;
use crate::species::TypeCode;

/// A single declared field of a struct or union type.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub offset: u64,
}

/// A debugger-reported type. Mirrors `Value.type` in .
pub trait DebugType {
    fn code(&self) -> TypeCode;
    fn name(&self) -> Option<&str>;
    /// Inclusive `[lo, hi]` index range, for array types.
    fn range(&self) -> Option<(i64, i64)>;
    fn fields(&self) -> Vec<Field>;
    /// The pointee/element type, for pointers, references, and arrays.
    fn target(&self) -> Option<Box<dyn DebugType>>;
    /// `sizeof` in bytes; `0` for incomplete/void types.
    fn sizeof(&self) -> u64;
}

/// A debugger-reported value. Mirrors `Value` in .
pub trait DebugValue {
    fn address(&self) -> Option<u64>;
    fn ty(&self) -> Box<dyn DebugType>;
    fn dynamic_type_name(&self) -> Option<String>;
    fn is_optimized_out(&self) -> bool;
    /// Follow one level of indirection: a pointer's target, or a typedef's
    /// aliased value. Fails with [`Error::NullPointer`] for a null pointer.
    fn dereference(&self) -> Result<Box<dyn DebugValue>, Error>;
    fn cast(&self, target: &dyn DebugType) -> Result<Box<dyn DebugValue>, Error>;
    /// Attempt to read a null-terminated, printable C string through this
    /// value (which must be pointer-shaped). Fails with
    /// [`Error::InvalidStringInterpretation`] if the bytes aren't a
    /// printable run.
    fn string(&self) -> Result<String, Error>;
    fn field(&self, field: &Field) -> Result<Box<dyn DebugValue>, Error>;
    fn index(&self, i: i64) -> Result<Box<dyn DebugValue>, Error>;
    /// Reinterpret the heap block this pointer targets as `count` elements
    /// of the pointer's declared pointee type, using the allocation
    /// tracker's reported size to bound `count` (pointer case
    /// 2). Backends with no allocation tracking may simply error.
    fn heap_elements(&self, count: u64) -> Result<Vec<Box<dyn DebugValue>>, Error>;
    /// Human-readable literal for extractable species.
    fn printable(&self) -> String;
}

/// A debugger-reported symbol. Mirrors `Symbol` in .
pub trait DebugSymbol {
    fn name(&self) -> &str;
    fn value(&self, frame: Option<&dyn DebugFrame>) -> Result<Box<dyn DebugValue>, Error>;
}

/// A single activation record. Mirrors `Frame` in .
pub trait DebugFrame {
    fn pc(&self) -> u64;
    fn sp(&self) -> u64;
    fn function_name(&self) -> Option<String>;
    fn older(&self) -> Option<Box<dyn DebugFrame>>;
    /// Symbols visible in this frame's lexical block, as (name, symbol)
    /// pairs in a stable, deterministic order.
    fn symbols(&self) -> Vec<(String, Box<dyn DebugSymbol>)>;
}

/// Which register a named role maps to,'s architecture
/// abstraction (`{arg0, arg1, ret, sp}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegisterRole {
    Arg0,
    Arg1,
    Ret,
    StackPointer,
}

/// A named architecture register map, read-only over a stopped inferior.
pub trait Architecture {
    fn register_name(&self, role: RegisterRole) -> &'static str;
    fn read_register(&self, name: &str) -> Option<u64>;
}

/// Whether a breakpoint callback asks the debugger to stop or continue.
/// Allocator breakpoints are always silent observation points: per spec
/// §4.5, they must always return "do not stop."
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakpointAction {
    Continue,
    Stop,
}
