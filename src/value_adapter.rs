//! Normalizes the three forms of raw debugger input — a value, a symbol in
//! a frame, or a frame itself — into a uniform [`RawRef`].

use std::sync::atomic::{AtomicU64, Ordering};

use crate::debugger::{DebugFrame, DebugSymbol, DebugValue};
use crate::error::Error;
use crate::species::Species;

/// High bit that marks an address as a generated surrogate rather than one
/// reported by the debugger, so the two address spaces never collide (spec
/// §9). Surrogates are handed out from a monotonically increasing,
/// process-unique counter rather than `uuid4()` (see `DESIGN.md`), which
/// keeps traversal output deterministic.
const SURROGATE_BIT: u64 = 1 << 63;

static NEXT_SURROGATE: AtomicU64 = AtomicU64::new(1);

fn next_surrogate() -> u64 {
    NEXT_SURROGATE.fetch_add(1, Ordering::Relaxed) | SURROGATE_BIT
}

#[must_use]
pub fn is_surrogate(address: u64) -> bool {
    address & SURROGATE_BIT != 0
}

/// One of the three inputs the adapter normalizes.
pub enum AdapterInput<'a> {
    Value {
        value: Box<dyn DebugValue>,
        name: Option<String>,
    },
    Symbol {
        symbol: &'a dyn DebugSymbol,
        frame: Option<&'a dyn DebugFrame>,
    },
    Frame {
        frame: Box<dyn DebugFrame>,
    },
}

/// The normalized form of a debugger-reported entity: address, species,
/// type name, and an opaque handle back to the debugger value (so later
/// traversal steps can still dereference, index, or cast it).
pub struct RawRef {
    pub value: Option<Box<dyn DebugValue>>,
    pub frame: Option<Box<dyn DebugFrame>>,
    /// Where this value itself is stored (its own address, not what it
    /// points to). Used for identity and for non-pointer species' display.
    pub address: u64,
    pub species: Species,
    pub type_name: Option<String>,
    pub dynamic_type_name: Option<String>,
    pub is_optimized_out: bool,
    pub name: Option<String>,
    pub source_line: Option<u32>,
    /// For pointer/reference species only: the address held by the
    /// pointer, i.e. what it points to, when it could be resolved (a
    /// dangling or string-backed pointer may have none even though it
    /// isn't null).
    pub target_address: Option<u64>,
    /// True iff this pointer/reference is confirmed null, i.e.
    /// dereferencing it specifically reported [`Error::NullPointer`]
    /// rather than some other failure.
    pub is_null_pointer: bool,
}

/// Normalize one of the three adapter inputs into a [`RawRef`].
///
/// # Errors
/// Returns [`Error::MissingFrame`] for a symbol whose resolution requires a
/// frame when none was supplied.
pub fn to_ref(input: AdapterInput<'_>) -> Result<RawRef, Error> {
    match input {
        AdapterInput::Value { value, name } => Ok(value_to_ref(value, name)),
        AdapterInput::Symbol { symbol, frame } => {
            let resolved = symbol.value(frame)?;
            Ok(value_to_ref(resolved, Some(symbol.name().to_string())))
        }
        AdapterInput::Frame { frame } => Ok(frame_to_ref(frame)),
    }
}

fn value_to_ref(value: Box<dyn DebugValue>, name: Option<String>) -> RawRef {
    let ty = value.ty();
    let species = Species::classify_raw(ty.code() as u8);
    let address = value.address().unwrap_or_else(next_surrogate);
    let type_name = ty.name().map(str::to_string);
    let dynamic_type_name = value.dynamic_type_name();
    let is_optimized_out = value.is_optimized_out();
    let (target_address, is_null_pointer) =
        if matches!(species, Species::Pointer | Species::Reference) {
            match value.dereference() {
                Ok(target) => (target.address(), false),
                Err(Error::NullPointer) => (None, true),
                Err(_) => (None, false),
            }
        } else {
            (None, false)
        };
    RawRef {
        value: Some(value),
        frame: None,
        address,
        species,
        type_name,
        dynamic_type_name,
        is_optimized_out,
        name,
        source_line: None,
        target_address,
        is_null_pointer,
    }
}

fn frame_to_ref(frame: Box<dyn DebugFrame>) -> RawRef {
    let address = frame.sp();
    let dynamic_type_name = frame.function_name();
    let name = frame.function_name();
    RawRef {
        value: None,
        frame: Some(frame),
        address,
        species: Species::Frame,
        type_name: None,
        dynamic_type_name,
        is_optimized_out: false,
        name,
        source_line: None,
        target_address: None,
        is_null_pointer: false,
    }
}

/// The address a value or frame would report, applying the same
/// surrogate-address fallback as [`to_ref`].
#[must_use]
pub fn address_of_value(value: &dyn DebugValue) -> u64 {
    value.address().unwrap_or_else(next_surrogate)
}

#[must_use]
pub fn address_of_frame(frame: &dyn DebugFrame) -> u64 {
    frame.sp()
}
