//! An in-process reference implementation of the [`super`] traits.
//!
//! This is not a debugger integration — it is a small addressable object
//! graph the traversal engine's own tests build up by hand, standing in for
//! whatever a real backend would report. Scenario tests
//! are built against this module.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use super::{
    Architecture, BreakpointAction, DebugFrame, DebugSymbol, DebugType, DebugValue, Field,
    RegisterRole,
};
use crate::error::Error;
use crate::species::TypeCode;

#[derive(Debug, Clone)]
pub struct SynType {
    code: TypeCode,
    name: Option<String>,
    range: Option<(i64, i64)>,
    fields: Vec<Field>,
    target: Option<Box<SynType>>,
    sizeof: u64,
}

impl SynType {
    fn scalar(code: TypeCode, name: &str, sizeof: u64) -> Self {
        Self {
            code,
            name: Some(name.to_string()),
            range: None,
            fields: Vec::new(),
            target: None,
            sizeof,
        }
    }
}

impl DebugType for SynType {
    fn code(&self) -> TypeCode {
        self.code
    }

    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn range(&self) -> Option<(i64, i64)> {
        self.range
    }

    fn fields(&self) -> Vec<Field> {
        self.fields.clone()
    }

    fn target(&self) -> Option<Box<dyn DebugType>> {
        self.target.clone().map(|t| Box::new(*t) as Box<dyn DebugType>)
    }

    fn sizeof(&self) -> u64 {
        self.sizeof
    }
}

#[derive(Debug, Clone)]
enum Scalar {
    Int(i64),
    Float(f64),
    Bool(bool),
    Char(u8),
    Function(String),
}

#[derive(Debug, Clone)]
struct PointerData {
    target: Option<u64>,
    cstring: Option<String>,
    /// Addresses of the materialized character objects backing `cstring`,
    /// aligned one-to-one with its chars, so `index(i)` can hand back a
    /// real per-character value the same way indexing an array does.
    chars: Option<Vec<u64>>,
}

#[derive(Debug, Clone)]
enum Data {
    OptimizedOut,
    Scalar(Scalar),
    Pointer(PointerData),
    Array(Vec<u64>),
    Aggregate(Vec<(String, u64)>),
    Typedef(u64),
}

#[derive(Debug, Clone)]
struct Object {
    ty: SynType,
    data: Data,
}

/// The addressable memory model backing a set of [`SynValue`]s.
#[derive(Debug, Default)]
pub struct World {
    objects: RefCell<HashMap<u64, Object>>,
    next_addr: Cell<u64>,
}

const INT_SIZE: u64 = 8;
const FLOAT_SIZE: u64 = 8;
const BOOL_SIZE: u64 = 1;
const CHAR_SIZE: u64 = 1;
const PTR_SIZE: u64 = 8;

impl World {
    #[must_use]
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            objects: RefCell::new(HashMap::new()),
            next_addr: Cell::new(0x1000),
        })
    }

    fn alloc_addr(&self) -> u64 {
        let addr = self.next_addr.get();
        self.next_addr.set(addr + 0x10);
        addr
    }

    fn insert(&self, ty: SynType, data: Data) -> u64 {
        let addr = self.alloc_addr();
        self.objects.borrow_mut().insert(addr, Object { ty, data });
        addr
    }

    /// Insert an object at a caller-chosen address (used to build
    /// self-referential structures such as a two-node cycle, where both
    /// addresses must be known before either node's fields are written).
    pub fn reserve(self: &Rc<Self>) -> u64 {
        self.alloc_addr()
    }

    pub fn set(self: &Rc<Self>, addr: u64, ty: SynType, data: Data) {
        self.objects.borrow_mut().insert(addr, Object { ty, data });
    }

    pub fn int_type() -> SynType {
        SynType::scalar(TypeCode::Int, "int", INT_SIZE)
    }

    pub fn float_type() -> SynType {
        SynType::scalar(TypeCode::Flt, "double", FLOAT_SIZE)
    }

    pub fn bool_type() -> SynType {
        SynType::scalar(TypeCode::Bool, "bool", BOOL_SIZE)
    }

    pub fn char_type() -> SynType {
        SynType::scalar(TypeCode::Char, "char", CHAR_SIZE)
    }

    pub fn pointer_type(target: SynType) -> SynType {
        SynType {
            code: TypeCode::Ptr,
            name: Some(format!("{}*", target.name.clone().unwrap_or_default())),
            range: None,
            fields: Vec::new(),
            target: Some(Box::new(target)),
            sizeof: PTR_SIZE,
        }
    }

    pub fn array_type(element: SynType, lo: i64, hi: i64) -> SynType {
        SynType {
            code: TypeCode::Array,
            name: Some(format!(
                "{}[{}]",
                element.name.clone().unwrap_or_default(),
                hi - lo + 1
            )),
            range: Some((lo, hi)),
            fields: Vec::new(),
            target: Some(Box::new(element)),
            sizeof: 0,
        }
    }

    pub fn struct_type(name: &str, fields: Vec<Field>) -> SynType {
        SynType {
            code: TypeCode::Struct,
            name: Some(name.to_string()),
            range: None,
            fields,
            target: None,
            sizeof: 0,
        }
    }

    pub fn new_int(self: &Rc<Self>, value: i64) -> u64 {
        self.insert(Self::int_type(), Data::Scalar(Scalar::Int(value)))
    }

    pub fn new_float(self: &Rc<Self>, value: f64) -> u64 {
        self.insert(Self::float_type(), Data::Scalar(Scalar::Float(value)))
    }

    pub fn new_bool(self: &Rc<Self>, value: bool) -> u64 {
        self.insert(Self::bool_type(), Data::Scalar(Scalar::Bool(value)))
    }

    pub fn new_char(self: &Rc<Self>, value: u8) -> u64 {
        self.insert(Self::char_type(), Data::Scalar(Scalar::Char(value)))
    }

    pub fn new_pointer(self: &Rc<Self>, target_type: SynType, target: Option<u64>) -> u64 {
        self.insert(
            Self::pointer_type(target_type),
            Data::Pointer(PointerData {
                target,
                cstring: None,
                chars: None,
            }),
        )
    }

    /// A `char*` backed by a real printable run: each character is
    /// materialized as its own addressable object, and the pointer's
    /// target is the first one, the same way a real C string pointer's
    /// target address is the address of its first byte.
    pub fn new_cstring_pointer(self: &Rc<Self>, text: &str) -> u64 {
        let char_addrs: Vec<u64> = text.chars().map(|c| self.new_char(c as u8)).collect();
        let target = char_addrs.first().copied();
        self.insert(
            Self::pointer_type(Self::char_type()),
            Data::Pointer(PointerData {
                target,
                cstring: Some(text.to_string()),
                chars: Some(char_addrs),
            }),
        )
    }

    pub fn new_array(self: &Rc<Self>, element_type: SynType, elements: Vec<u64>) -> u64 {
        let lo = 0;
        let hi = elements.len() as i64 - 1;
        self.insert(
            Self::array_type(element_type, lo, hi),
            Data::Array(elements),
        )
    }

    /// Register `elements` as a heap block at `base_addr`, typed as an
    /// array of `element_type`. Used to model the object an allocation
    /// tracker entry resolves to.
    pub fn new_heap_array_at(
        self: &Rc<Self>,
        base_addr: u64,
        element_type: SynType,
        elements: Vec<u64>,
    ) {
        let lo = 0;
        let hi = elements.len() as i64 - 1;
        self.set(
            base_addr,
            Self::array_type(element_type, lo, hi),
            Data::Array(elements),
        );
    }

    pub fn new_struct(self: &Rc<Self>, name: &str, fields: Vec<(&str, u64, SynType)>) -> u64 {
        let field_defs = fields
            .iter()
            .enumerate()
            .map(|(i, (name, _, _))| Field {
                name: (*name).to_string(),
                offset: i as u64,
            })
            .collect();
        let data = fields
            .iter()
            .map(|(name, addr, _)| ((*name).to_string(), *addr))
            .collect();
        self.insert(Self::struct_type(name, field_defs), Data::Aggregate(data))
    }

    /// Write a struct's fields at a caller-chosen address, the aggregate
    /// counterpart to `new_heap_array_at`. Used together with `reserve` to
    /// build self-referential structures (a linked-list cycle) where one
    /// node's address must be known before the other node's fields are
    /// written.
    pub fn new_struct_at(self: &Rc<Self>, addr: u64, name: &str, fields: Vec<(&str, u64)>) {
        let field_defs = fields
            .iter()
            .enumerate()
            .map(|(i, (name, _))| Field {
                name: (*name).to_string(),
                offset: i as u64,
            })
            .collect();
        let data = fields
            .iter()
            .map(|(name, addr)| ((*name).to_string(), *addr))
            .collect();
        self.set(addr, Self::struct_type(name, field_defs), Data::Aggregate(data));
    }

    pub fn new_typedef(self: &Rc<Self>, alias_name: &str, underlying: SynType, target: u64) -> u64 {
        let ty = SynType {
            code: TypeCode::Typedef,
            name: Some(alias_name.to_string()),
            range: None,
            fields: Vec::new(),
            target: Some(Box::new(underlying)),
            sizeof: 0,
        };
        self.insert(ty, Data::Typedef(target))
    }

    pub fn new_optimized_out(self: &Rc<Self>, ty: SynType) -> u64 {
        self.insert(ty, Data::OptimizedOut)
    }

    pub fn handle(self: &Rc<Self>, addr: u64) -> SynValue {
        SynValue {
            world: Rc::clone(self),
            addr,
            ty_override: None,
        }
    }

    pub fn frame(
        self: &Rc<Self>,
        pc: u64,
        sp: u64,
        function_name: Option<&str>,
        older: Option<Rc<SynFrame>>,
        symbols: Vec<(&str, u64)>,
    ) -> Rc<SynFrame> {
        Rc::new(SynFrame {
            world: Rc::clone(self),
            pc,
            sp,
            function_name: function_name.map(str::to_string),
            older,
            symbols: symbols
                .into_iter()
                .map(|(name, addr)| (name.to_string(), addr))
                .collect(),
        })
    }
}

/// A handle into a [`World`] plus the address it refers to.
#[derive(Clone)]
pub struct SynValue {
    world: Rc<World>,
    addr: u64,
    /// Set by `cast`: the type to report instead of the stored object's
    /// declared type, without changing the underlying address or data.
    ty_override: Option<SynType>,
}

impl SynValue {
    fn object(&self) -> Object {
        self.world
            .objects
            .borrow()
            .get(&self.addr)
            .cloned()
            .expect("dangling synthetic address")
    }
}

impl DebugValue for SynValue {
    fn address(&self) -> Option<u64> {
        if matches!(self.object().data, Data::OptimizedOut) {
            None
        } else {
            Some(self.addr)
        }
    }

    fn ty(&self) -> Box<dyn DebugType> {
        Box::new(self.ty_override.clone().unwrap_or_else(|| self.object().ty))
    }

    fn dynamic_type_name(&self) -> Option<String> {
        self.object().ty.name.clone()
    }

    fn is_optimized_out(&self) -> bool {
        matches!(self.object().data, Data::OptimizedOut)
    }

    fn dereference(&self) -> Result<Box<dyn DebugValue>, Error> {
        match self.object().data {
            Data::Pointer(PointerData { target: Some(t), .. }) => {
                Ok(Box::new(self.world.handle(t)))
            }
            Data::Pointer(PointerData { target: None, .. }) => Err(Error::NullPointer),
            Data::Typedef(addr) => Ok(Box::new(self.world.handle(addr))),
            _ => Err(Error::MemoryUnreadable {
                address: self.addr,
                reason: "not a pointer or typedef".to_string(),
            }),
        }
    }

    fn cast(&self, target: &dyn DebugType) -> Result<Box<dyn DebugValue>, Error> {
        let ty = SynType {
            code: target.code(),
            name: target.name().map(str::to_string),
            range: target.range(),
            fields: target.fields(),
            target: target.target().map(|t| {
                Box::new(SynType {
                    code: t.code(),
                    name: t.name().map(str::to_string),
                    range: t.range(),
                    fields: t.fields(),
                    target: None,
                    sizeof: t.sizeof(),
                })
            }),
            sizeof: target.sizeof(),
        };
        // Casting an ordinary value keeps its address (a cast never moves
        // storage). A typedef is modeled with its aliased storage at a
        // separate address, so casting it resolves to that storage instead
        // — the same "cast to the target type" step spec §4.7 describes,
        // just against this backend's own typedef representation.
        let addr = match self.object().data {
            Data::Typedef(aliased) => aliased,
            _ => self.addr,
        };
        Ok(Box::new(SynValue {
            world: Rc::clone(&self.world),
            addr,
            ty_override: Some(ty),
        }))
    }

    fn string(&self) -> Result<String, Error> {
        match self.object().data {
            Data::Pointer(PointerData { cstring: Some(s), .. }) => Ok(s),
            _ => Err(Error::InvalidStringInterpretation),
        }
    }

    fn field(&self, field: &Field) -> Result<Box<dyn DebugValue>, Error> {
        match self.object().data {
            Data::Aggregate(fields) => fields
                .into_iter()
                .find(|(name, _)| name == &field.name)
                .map(|(_, addr)| Box::new(self.world.handle(addr)) as Box<dyn DebugValue>)
                .ok_or_else(|| Error::MemoryUnreadable {
                    address: self.addr,
                    reason: format!("no such field `{}`", field.name),
                }),
            _ => Err(Error::MemoryUnreadable {
                address: self.addr,
                reason: "not a struct or union".to_string(),
            }),
        }
    }

    fn index(&self, i: i64) -> Result<Box<dyn DebugValue>, Error> {
        match self.object().data {
            Data::Array(elements) => {
                let idx = usize::try_from(i).map_err(|_| Error::MemoryUnreadable {
                    address: self.addr,
                    reason: "negative index".to_string(),
                })?;
                elements
                    .get(idx)
                    .map(|addr| Box::new(self.world.handle(*addr)) as Box<dyn DebugValue>)
                    .ok_or_else(|| Error::MemoryUnreadable {
                        address: self.addr,
                        reason: "index out of range".to_string(),
                    })
            }
            Data::Pointer(PointerData { chars: Some(addrs), .. }) => {
                let idx = usize::try_from(i).map_err(|_| Error::MemoryUnreadable {
                    address: self.addr,
                    reason: "negative index".to_string(),
                })?;
                addrs
                    .get(idx)
                    .map(|addr| Box::new(self.world.handle(*addr)) as Box<dyn DebugValue>)
                    .ok_or_else(|| Error::MemoryUnreadable {
                        address: self.addr,
                        reason: "index out of range".to_string(),
                    })
            }
            _ => Err(Error::MemoryUnreadable {
                address: self.addr,
                reason: "not an array".to_string(),
            }),
        }
    }

    fn heap_elements(&self, count: u64) -> Result<Vec<Box<dyn DebugValue>>, Error> {
        let obj = self.object();
        let Data::Pointer(PointerData { target: Some(base), .. }) = obj.data else {
            return Err(Error::MemoryUnreadable {
                address: self.addr,
                reason: "not a heap-tracked pointer".to_string(),
            });
        };
        let element_type = obj.ty.target.as_deref().cloned().ok_or_else(|| {
            Error::MemoryUnreadable {
                address: self.addr,
                reason: "pointer has no declared pointee type".to_string(),
            }
        })?;

        let exists = self.world.objects.borrow().contains_key(&base);
        if !exists {
            self.world.new_heap_array_at(base, element_type, Vec::new());
        }
        let array_obj = self.world.objects.borrow().get(&base).cloned().unwrap();
        match array_obj.data {
            Data::Array(elements) => Ok(elements
                .iter()
                .take(count as usize)
                .map(|addr| Box::new(self.world.handle(*addr)) as Box<dyn DebugValue>)
                .collect()),
            _ => Err(Error::MemoryUnreadable {
                address: base,
                reason: "heap block is not array-shaped".to_string(),
            }),
        }
    }

    fn printable(&self) -> String {
        match self.object().data {
            Data::Scalar(Scalar::Int(v)) => v.to_string(),
            Data::Scalar(Scalar::Float(v)) => v.to_string(),
            Data::Scalar(Scalar::Bool(v)) => v.to_string(),
            Data::Scalar(Scalar::Char(v)) => (v as char).to_string(),
            Data::Scalar(Scalar::Function(name)) => name,
            _ => format!("@{:#x}", self.addr),
        }
    }
}

pub struct SynFrame {
    world: Rc<World>,
    pc: u64,
    sp: u64,
    function_name: Option<String>,
    older: Option<Rc<SynFrame>>,
    symbols: Vec<(String, u64)>,
}

impl DebugFrame for SynFrame {
    fn pc(&self) -> u64 {
        self.pc
    }

    fn sp(&self) -> u64 {
        self.sp
    }

    fn function_name(&self) -> Option<String> {
        self.function_name.clone()
    }

    fn older(&self) -> Option<Box<dyn DebugFrame>> {
        self.older.clone().map(|f| Box::new(SynFrameHandle(f)) as Box<dyn DebugFrame>)
    }

    fn symbols(&self) -> Vec<(String, Box<dyn DebugSymbol>)> {
        self.symbols
            .iter()
            .map(|(name, addr)| {
                (
                    name.clone(),
                    Box::new(SynSymbol {
                        world: Rc::clone(&self.world),
                        name: name.clone(),
                        addr: *addr,
                    }) as Box<dyn DebugSymbol>,
                )
            })
            .collect()
    }
}

/// Box up a frame handle for use as a traversal root. `Rc<SynFrame>`
/// can't itself implement `DebugFrame` generically over a trait object return
/// type, so frame chaining wraps it in a thin newtype.
#[must_use]
pub fn frame_handle(frame: Rc<SynFrame>) -> Box<dyn DebugFrame> {
    Box::new(SynFrameHandle(frame))
}

struct SynFrameHandle(Rc<SynFrame>);

impl DebugFrame for SynFrameHandle {
    fn pc(&self) -> u64 {
        self.0.pc()
    }
    fn sp(&self) -> u64 {
        self.0.sp()
    }
    fn function_name(&self) -> Option<String> {
        self.0.function_name()
    }
    fn older(&self) -> Option<Box<dyn DebugFrame>> {
        self.0.older()
    }
    fn symbols(&self) -> Vec<(String, Box<dyn DebugSymbol>)> {
        self.0.symbols()
    }
}

pub struct SynSymbol {
    world: Rc<World>,
    name: String,
    addr: u64,
}

impl DebugSymbol for SynSymbol {
    fn name(&self) -> &str {
        &self.name
    }

    fn value(&self, _frame: Option<&dyn DebugFrame>) -> Result<Box<dyn DebugValue>, Error> {
        Ok(Box::new(self.world.handle(self.addr)))
    }
}

/// The x86_64 reference architecture mapping.
#[derive(Default)]
pub struct X86_64 {
    registers: HashMap<&'static str, u64>,
}

impl X86_64 {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_register(mut self, name: &'static str, value: u64) -> Self {
        self.registers.insert(name, value);
        self
    }
}

impl Architecture for X86_64 {
    fn register_name(&self, role: RegisterRole) -> &'static str {
        match role {
            RegisterRole::Arg0 => "rdi",
            RegisterRole::Arg1 => "rsi",
            RegisterRole::Ret => "rax",
            RegisterRole::StackPointer => "rsp",
        }
    }

    fn read_register(&self, name: &str) -> Option<u64> {
        self.registers.get(name).copied()
    }
}

/// A silent, always-continue breakpoint action,
#[must_use]
pub fn silent() -> BreakpointAction {
    BreakpointAction::Continue
}
