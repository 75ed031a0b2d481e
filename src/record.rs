//! The exportable, hashable descriptor of one observed object at one
//! moment, built from a [`RawRef`].

use bitflags::bitflags;

use crate::species::Species;
use crate::value_adapter::{is_surrogate, RawRef};

bitflags! {
    /// The boolean facts attaches to a record, packed for a
    /// compact, single debug representation.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RecordFlags: u8 {
        /// Address is debugger-reported, not a generated surrogate.
        const REAL = 0b001;
        /// Address is exactly zero.
        const NULL = 0b010;
        /// The underlying ref was optimized out.
        const OPTIMIZED_OUT = 0b100;
    }
}

/// What a [`MemoryRecord`] was built from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Classification {
    Frame,
    Value,
    Symbol,
}

/// `(species, name, type_name, address)` — the uniqueness key for a
/// [`MemoryRecord`]. Two records with identical identity are the same
/// observed object; `name` is included because an array element at offset
/// 0 shares an address with its containing array.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identity {
    pub species: Species,
    pub name: Option<String>,
    pub type_name: Option<String>,
    pub address: u64,
}

/// An exportable, hashable snapshot of one observed object.
#[derive(Debug, Clone)]
pub struct MemoryRecord {
    pub classification: Classification,
    pub address: u64,
    pub species: Species,
    pub type_name: Option<String>,
    pub dynamic_type_name: Option<String>,
    pub name: Option<String>,
    pub source_line: Option<u32>,
    pub value_repr: String,
    flags: RecordFlags,
}

impl MemoryRecord {
    /// Build a record from a normalized ref and its printable
    /// representation (extractable species get a literal; everything else
    /// gets an address- or type-tagged marker).
    #[must_use]
    pub fn new(raw: &RawRef, printable: Option<&str>) -> Self {
        let is_pointer_like = matches!(raw.species, Species::Pointer | Species::Reference);

        let value_repr = if raw.species == Species::Frame {
            format!(
                "{} @FRAME{:#x}",
                raw.name.as_deref().unwrap_or("<unknown>"),
                raw.address
            )
        } else if let Some(literal) = printable {
            // Either an extractable scalar, or a pointer whose bytes
            // decoded as a printable string.
            literal.to_string()
        } else if raw.species.is_extractable() {
            "<unreadable>".to_string()
        } else if is_pointer_like {
            raw.target_address
                .map_or_else(|| "@0x0".to_string(), |addr| format!("@{addr:#x}"))
        } else {
            format!("@{:#x}", raw.address)
        };

        let mut flags = RecordFlags::empty();
        flags.set(RecordFlags::REAL, !is_surrogate(raw.address));
        flags.set(RecordFlags::NULL, is_pointer_like && raw.is_null_pointer);
        flags.set(RecordFlags::OPTIMIZED_OUT, raw.is_optimized_out);

        let classification = if raw.species == Species::Frame {
            Classification::Frame
        } else if raw.name.is_some() {
            Classification::Symbol
        } else {
            Classification::Value
        };

        Self {
            classification,
            address: raw.address,
            species: raw.species,
            type_name: raw.type_name.clone(),
            dynamic_type_name: raw.dynamic_type_name.clone(),
            name: raw.name.clone(),
            source_line: raw.source_line,
            value_repr,
            flags,
        }
    }

    #[must_use]
    pub fn identity(&self) -> Identity {
        Identity {
            species: self.species,
            name: self.name.clone(),
            type_name: self.type_name.clone(),
            address: self.address,
        }
    }

    /// Address is present and not a generated surrogate.
    #[must_use]
    pub fn is_real(&self) -> bool {
        self.flags.contains(RecordFlags::REAL)
    }

    #[must_use]
    pub fn is_null(&self) -> bool {
        self.flags.contains(RecordFlags::NULL)
    }

    #[must_use]
    pub fn is_optimized_out(&self) -> bool {
        self.flags.contains(RecordFlags::OPTIMIZED_OUT)
    }

    /// Default vertex label, as prescribes.
    #[must_use]
    pub fn label(&self) -> String {
        format!(
            "{}:{}",
            self.name.as_deref().unwrap_or(""),
            self.value_repr
        )
    }
}
