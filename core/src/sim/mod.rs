//! Simulated inspected process
//!
//! An in-memory [`Host`] used by the tests and the command-line demo. Every
//! object lives in a slot of an arena; a [`SimValue`] is a type name plus the
//! address of its slot. Struct members, array elements and list nodes are
//! slots of their own, so addresses, pointer arithmetic and casts behave the
//! way the dispatch code expects from a real debugger.
//!
//! Evaluation results are always fresh slots: incrementing a placeholder
//! rebinds it and never touches a value handed out earlier.

mod eval;
mod samples;

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use hashbrown::HashMap;

use crate::host::{FieldInfo, Host, HostError, HostResult, TypeCode, TypeName};
use crate::tag::is_tagged;

/// Address of the first slot
const BASE_ADDRESS: u64 = 0x1000;
/// Distance between consecutive slots, and the stride of every pointer
const SLOT_SIZE: u64 = 8;

const INT_TYPES: [&str; 12] = [
    "int",
    "unsigned int",
    "short",
    "unsigned short",
    "long",
    "unsigned long",
    "long long",
    "unsigned long long",
    "size_t",
    "int32_t",
    "int64_t",
    "uint32_t",
];
const CHAR_TYPES: [&str; 3] = ["char", "signed char", "unsigned char"];
const FLOAT_TYPES: [&str; 2] = ["float", "double"];

/// Handle to a value in the simulated process
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SimValue {
    ty: String,
    address: u64,
}

impl SimValue {
    pub fn address(&self) -> u64 {
        self.address
    }

    pub fn type_text(&self) -> &str {
        &self.ty
    }
}

/// Zero-argument member function of a simulated type
pub type Method = Rc<dyn Fn(&SimProcess, &SimValue) -> HostResult<SimValue>>;

/// How an iterator type moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterKind {
    /// Random access over contiguous elements (`+`, `-`, `==`)
    Indexed,
    /// Forward-only over list nodes; `equality` says whether `==` is defined
    Linked { equality: bool },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Instance,
    Static(u64),
    Base,
}

#[derive(Debug, Clone)]
struct FieldDef {
    name: String,
    ty: String,
    kind: FieldKind,
}

#[derive(Clone, Default)]
struct StructDef {
    union: bool,
    fields: Vec<FieldDef>,
    methods: HashMap<String, Method>,
}

#[derive(Clone)]
enum TypeDef {
    Struct(StructDef),
    Iterator { kind: IterKind, value_type: String },
}

#[derive(Debug, Clone, PartialEq)]
struct Member {
    name: String,
    ty: String,
    address: u64,
}

#[derive(Debug, Clone, PartialEq)]
enum Cursor {
    Indexed { first: u64, pos: i64, len: i64 },
    /// Node address, 0 past the end
    Linked { node: u64 },
}

#[derive(Debug, Clone, PartialEq)]
enum Data {
    Int(i64),
    Float(f64),
    Pointer(u64),
    Struct(Vec<Member>),
    Array { first: u64, len: u64 },
    Iter(Cursor),
    Node { value: u64, next: u64 },
}

#[derive(Default)]
struct State {
    slots: Vec<Data>,
    types: HashMap<String, TypeDef>,
    globals: HashMap<String, SimValue>,
    vars: HashMap<String, SimValue>,
}

/// An inspected process held entirely in memory
#[derive(Default)]
pub struct SimProcess {
    state: RefCell<State>,
}

impl fmt::Debug for SimProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("SimProcess")
            .field("slots", &state.slots.len())
            .field("types", &state.types.len())
            .field("globals", &state.globals.len())
            .finish()
    }
}

fn unqualified(type_text: &str) -> String {
    TypeName::parse(type_text).unqualified().to_string()
}

fn is_pointer_type(type_text: &str) -> bool {
    let text = type_text.trim_end();
    text.ends_with('*') || text.contains("(*)") || is_tagged(text)
}

/// Type a pointer of type `type_text` points at
fn pointee_type(type_text: &str) -> String {
    let text = type_text.trim_end();
    if let Some(inner) = text.strip_suffix('*') {
        inner.trim_end().to_string()
    } else {
        text.replacen(" (*)", " ", 1).replacen("(*)", "", 1)
    }
}

/// Type of a pointer to `type_text`
fn pointer_to(type_text: &str) -> String {
    let name = TypeName::parse(type_text);
    if name.is_array() {
        let dims: String = name.dims.iter().map(|d| format!("[{}]", d)).collect();
        format!("{}{} (*){}", name.qualifiers, name.base, dims)
    } else {
        format!("{} *", type_text)
    }
}

/// Element type of the array type `type_text`
fn element_type(type_text: &str) -> Option<String> {
    let mut name = TypeName::parse(type_text);
    if !name.is_array() {
        return None;
    }
    name.dims.remove(0);
    Some(name.to_string())
}

impl SimProcess {
    pub fn new() -> Self {
        Self::default()
    }

    // ----- memory -----

    fn slot_index(&self, address: u64) -> HostResult<usize> {
        let offset = address
            .checked_sub(BASE_ADDRESS)
            .filter(|offset| offset % SLOT_SIZE == 0)
            .ok_or(HostError::InvalidAddress(address))?;
        let index = (offset / SLOT_SIZE) as usize;
        if index < self.state.borrow().slots.len() {
            Ok(index)
        } else {
            Err(HostError::InvalidAddress(address))
        }
    }

    fn read(&self, address: u64) -> HostResult<Data> {
        let index = self.slot_index(address)?;
        Ok(self.state.borrow().slots[index].clone())
    }

    fn write(&self, address: u64, data: Data) -> HostResult<()> {
        let index = self.slot_index(address)?;
        self.state.borrow_mut().slots[index] = data;
        Ok(())
    }

    fn data(&self, value: &SimValue) -> HostResult<Data> {
        self.read(value.address)
    }

    /// Reserve `count` contiguous slots, returning the first address
    fn reserve(&self, count: u64) -> u64 {
        let mut state = self.state.borrow_mut();
        let address = BASE_ADDRESS + state.slots.len() as u64 * SLOT_SIZE;
        state
            .slots
            .extend(std::iter::repeat_n(Data::Int(0), count as usize));
        address
    }

    fn alloc(&self, data: Data) -> u64 {
        let address = self.reserve(1);
        let mut state = self.state.borrow_mut();
        if let Some(slot) = state.slots.last_mut() {
            *slot = data;
        }
        address
    }

    fn make(&self, ty: impl Into<String>, data: Data) -> SimValue {
        SimValue {
            ty: ty.into(),
            address: self.alloc(data),
        }
    }

    fn struct_def(&self, type_text: &str) -> Option<StructDef> {
        match self.state.borrow().types.get(&unqualified(type_text)) {
            Some(TypeDef::Struct(def)) => Some(def.clone()),
            _ => None,
        }
    }

    fn iterator_def(&self, type_text: &str) -> Option<(IterKind, String)> {
        match self.state.borrow().types.get(&unqualified(type_text)) {
            Some(TypeDef::Iterator { kind, value_type }) => Some((*kind, value_type.clone())),
            _ => None,
        }
    }

    /// Zero-initialized contents for a new object of `type_text`
    fn zero_data(&self, type_text: &str) -> Data {
        if is_pointer_type(type_text) {
            return Data::Pointer(0);
        }
        if let Some(element) = element_type(type_text) {
            let len = TypeName::parse(type_text).dims[0];
            let first = self.reserve(len);
            for i in 0..len {
                let data = self.zero_data(&element);
                // Freshly reserved, so the write cannot miss
                let _ = self.write(first + i * SLOT_SIZE, data);
            }
            return Data::Array { first, len };
        }

        let name = unqualified(type_text);
        if FLOAT_TYPES.contains(&name.as_str()) {
            return Data::Float(0.0);
        }
        if let Some(def) = self.struct_def(&name) {
            let members = def
                .fields
                .iter()
                .filter(|f| !matches!(f.kind, FieldKind::Static(_)))
                .map(|f| Member {
                    name: f.name.clone(),
                    ty: f.ty.clone(),
                    address: self.alloc_zeroed(&f.ty),
                })
                .collect();
            return Data::Struct(members);
        }
        match self.iterator_def(&name) {
            Some((IterKind::Indexed, _)) => Data::Iter(Cursor::Indexed {
                first: 0,
                pos: 0,
                len: 0,
            }),
            Some((IterKind::Linked { .. }, _)) => Data::Iter(Cursor::Linked { node: 0 }),
            None => Data::Int(0),
        }
    }

    fn alloc_zeroed(&self, type_text: &str) -> u64 {
        let data = self.zero_data(type_text);
        self.alloc(data)
    }

    fn member_address(&self, object: &SimValue, name: &str) -> HostResult<(String, u64)> {
        match self.data(object)? {
            Data::Struct(members) => members
                .into_iter()
                .find(|m| m.name == name)
                .map(|m| (m.ty, m.address))
                .ok_or_else(|| HostError::MissingMember {
                    type_name: object.ty.clone(),
                    member: name.to_string(),
                }),
            _ => Err(HostError::TypeMismatch(format!(
                "{} has no members",
                object.ty
            ))),
        }
    }

    // ----- types -----

    /// Declare a struct with instance fields of the given types
    pub fn define_struct(&self, name: &str, fields: &[(&str, &str)]) {
        self.define_composite(name, fields, false);
    }

    /// Declare a union with the given members
    pub fn define_union(&self, name: &str, fields: &[(&str, &str)]) {
        self.define_composite(name, fields, true);
    }

    fn define_composite(&self, name: &str, fields: &[(&str, &str)], union: bool) {
        let def = StructDef {
            union,
            fields: fields
                .iter()
                .map(|(field, ty)| FieldDef {
                    name: field.to_string(),
                    ty: ty.to_string(),
                    kind: FieldKind::Instance,
                })
                .collect(),
            methods: HashMap::new(),
        };
        self.state
            .borrow_mut()
            .types
            .insert(name.to_string(), TypeDef::Struct(def));
    }

    fn with_struct_def(&self, type_name: &str, update: impl FnOnce(&mut StructDef)) {
        let mut state = self.state.borrow_mut();
        match state.types.get_mut(type_name) {
            Some(TypeDef::Struct(def)) => update(def),
            _ => tracing::warn!("sim: {} is not a declared struct", type_name),
        }
    }

    /// Make `base` a base class of `type_name`
    pub fn add_base(&self, type_name: &str, base: &str) {
        self.with_struct_def(type_name, |def| {
            def.fields.insert(
                0,
                FieldDef {
                    name: base.to_string(),
                    ty: base.to_string(),
                    kind: FieldKind::Base,
                },
            );
        });
    }

    /// Add class-level data to `type_name`
    pub fn add_static(&self, type_name: &str, field: &str, value: &SimValue) {
        let (ty, address) = (value.ty.clone(), value.address);
        self.with_struct_def(type_name, |def| {
            def.fields.push(FieldDef {
                name: field.to_string(),
                ty,
                kind: FieldKind::Static(address),
            });
        });
    }

    /// Add a zero-argument member function to `type_name`
    pub fn add_method(
        &self,
        type_name: &str,
        method: &str,
        body: impl Fn(&SimProcess, &SimValue) -> HostResult<SimValue> + 'static,
    ) {
        let body: Method = Rc::new(body);
        self.with_struct_def(type_name, |def| {
            def.methods.insert(method.to_string(), body);
        });
    }

    /// Declare an iterator type over elements of `value_type`
    pub fn define_iterator(&self, name: &str, kind: IterKind, value_type: &str) {
        self.state.borrow_mut().types.insert(
            name.to_string(),
            TypeDef::Iterator {
                kind,
                value_type: value_type.to_string(),
            },
        );
    }

    // ----- values -----

    pub fn alloc_int(&self, ty: &str, value: i64) -> SimValue {
        self.make(ty, Data::Int(value))
    }

    pub fn alloc_float(&self, ty: &str, value: f64) -> SimValue {
        self.make(ty, Data::Float(value))
    }

    pub fn alloc_pointer(&self, ty: &str, address: u64) -> SimValue {
        self.make(ty, Data::Pointer(address))
    }

    /// Array of `element` initialized from integers
    pub fn alloc_array(&self, element: &str, values: &[i64]) -> SimValue {
        let len = values.len() as u64;
        let first = self.reserve(len);
        for (i, v) in values.iter().enumerate() {
            let _ = self.write(first + i as u64 * SLOT_SIZE, Data::Int(*v));
        }
        self.make(format!("{} [{}]", element, len), Data::Array { first, len })
    }

    /// `char [capacity]` holding `text` and a terminating zero
    pub fn alloc_string(&self, text: &str, capacity: usize) -> SimValue {
        let mut bytes: Vec<i64> = text.bytes().map(i64::from).collect();
        bytes.resize(capacity.max(bytes.len() + 1), 0);
        self.alloc_array("char", &bytes)
    }

    /// Struct with the given integer members, everything else zeroed
    pub fn alloc_struct(&self, ty: &str, values: &[(&str, i64)]) -> SimValue {
        let object = self.make(ty, Data::Int(0));
        let data = self.zero_data(ty);
        let _ = self.write(object.address, data);

        for (name, v) in values {
            match self.member_address(&object, name) {
                Ok((member_ty, address)) => {
                    let data = if FLOAT_TYPES.contains(&unqualified(&member_ty).as_str()) {
                        Data::Float(*v as f64)
                    } else {
                        Data::Int(*v)
                    };
                    let _ = self.write(address, data);
                }
                Err(e) => tracing::warn!("sim: {}", e),
            }
        }
        object
    }

    /// Struct whose listed members are the given objects
    pub fn alloc_object(&self, ty: &str, members: &[(&str, SimValue)]) -> SimValue {
        let object = self.alloc_struct(ty, &[]);
        if let Ok(Data::Struct(mut current)) = self.data(&object) {
            for (name, value) in members {
                if let Some(member) = current.iter_mut().find(|m| m.name == *name) {
                    member.address = value.address;
                }
            }
            let _ = self.write(object.address, Data::Struct(current));
        }
        object
    }

    /// `(begin, end)` of a forward list holding `values`
    pub fn alloc_list(&self, iterator: &str, values: &[i64]) -> (SimValue, SimValue) {
        let value_type = self
            .iterator_def(iterator)
            .map(|(_, ty)| ty)
            .unwrap_or_else(|| "int".to_string());

        let mut next = 0;
        for v in values.iter().rev() {
            let value = self.alloc_int(&value_type, *v);
            next = self.alloc(Data::Node {
                value: value.address,
                next,
            });
        }

        let begin = self.make(iterator, Data::Iter(Cursor::Linked { node: next }));
        let end = self.make(iterator, Data::Iter(Cursor::Linked { node: 0 }));
        (begin, end)
    }

    /// `(begin, end)` random-access iterators over an array
    pub fn alloc_indexed(&self, iterator: &str, array: &SimValue) -> HostResult<(SimValue, SimValue)> {
        let Data::Array { first, len } = self.data(array)? else {
            return Err(HostError::TypeMismatch(format!("{} is not an array", array.ty)));
        };
        let len = len as i64;
        let begin = self.make(iterator, Data::Iter(Cursor::Indexed { first, pos: 0, len }));
        let end = self.make(iterator, Data::Iter(Cursor::Indexed { first, pos: len, len }));
        Ok((begin, end))
    }

    pub fn set_global(&self, name: &str, value: SimValue) {
        self.state.borrow_mut().globals.insert(name.to_string(), value);
    }

    pub fn global(&self, name: &str) -> Option<SimValue> {
        self.state.borrow().globals.get(name).cloned()
    }

    /// Names of all globals, sorted
    pub fn globals(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.borrow().globals.keys().cloned().collect();
        names.sort();
        names
    }

    /// Names of the evaluator placeholders currently set, sorted
    pub fn placeholders(&self) -> Vec<String> {
        let mut names: Vec<String> = self.state.borrow().vars.keys().cloned().collect();
        names.sort();
        names
    }

    fn classify(&self, type_text: &str) -> TypeCode {
        if is_pointer_type(type_text) {
            return TypeCode::Pointer;
        }
        if TypeName::parse(type_text).is_array() {
            return TypeCode::Array;
        }
        let name = unqualified(type_text);
        let name = name.as_str();
        if CHAR_TYPES.contains(&name) {
            TypeCode::Char
        } else if INT_TYPES.contains(&name) {
            TypeCode::Int
        } else if FLOAT_TYPES.contains(&name) {
            TypeCode::Float
        } else if name == "bool" {
            TypeCode::Bool
        } else {
            match self.state.borrow().types.get(name) {
                Some(TypeDef::Struct(def)) if def.union => TypeCode::Union,
                Some(_) => TypeCode::Struct,
                None => TypeCode::Other,
            }
        }
    }

    fn is_known_type(&self, type_text: &str) -> bool {
        is_pointer_type(type_text)
            || self.classify(&TypeName::parse(type_text).base) != TypeCode::Other
    }
}

impl Host for SimProcess {
    type Value = SimValue;

    fn type_name(&self, value: &SimValue) -> HostResult<String> {
        Ok(value.ty.clone())
    }

    fn type_code(&self, value: &SimValue) -> HostResult<TypeCode> {
        Ok(self.classify(&value.ty))
    }

    fn fields(&self, value: &SimValue) -> HostResult<Vec<FieldInfo>> {
        let def = self
            .struct_def(&value.ty)
            .ok_or_else(|| HostError::TypeMismatch(format!("{} is not a struct", value.ty)))?;
        Ok(def
            .fields
            .iter()
            .map(|f| match f.kind {
                FieldKind::Instance => FieldInfo::instance(&f.name),
                FieldKind::Static(_) => FieldInfo::class_level(&f.name),
                FieldKind::Base => FieldInfo::base(&f.name),
            })
            .collect())
    }

    fn field(&self, value: &SimValue, name: &str) -> HostResult<SimValue> {
        let (ty, address) = self.member_address(value, name)?;
        Ok(SimValue { ty, address })
    }

    fn base_class(&self, value: &SimValue, base: &str) -> HostResult<SimValue> {
        self.field(value, base)
    }

    fn call_method(&self, value: &SimValue, method: &str) -> HostResult<SimValue> {
        let body = self
            .struct_def(&value.ty)
            .and_then(|def| def.methods.get(method).cloned())
            .ok_or_else(|| HostError::MissingMember {
                type_name: value.ty.clone(),
                member: format!("{}()", method),
            })?;
        body(self, value)
    }

    fn address_of(&self, value: &SimValue) -> HostResult<SimValue> {
        Ok(self.alloc_pointer(&pointer_to(&value.ty), value.address))
    }

    fn dereference(&self, value: &SimValue) -> HostResult<SimValue> {
        let Data::Pointer(address) = self.data(value)? else {
            return Err(HostError::TypeMismatch(format!("{} is not a pointer", value.ty)));
        };
        self.slot_index(address)?;
        Ok(SimValue {
            ty: pointee_type(&value.ty),
            address,
        })
    }

    fn to_integer(&self, value: &SimValue) -> HostResult<i64> {
        match self.data(value)? {
            Data::Int(v) => Ok(v),
            Data::Float(v) => Ok(v as i64),
            Data::Pointer(address) => Ok(address as i64),
            _ => Err(HostError::TypeMismatch(format!(
                "{} is not convertible to an integer",
                value.ty
            ))),
        }
    }

    fn format_value(&self, value: &SimValue) -> HostResult<String> {
        let text = match (self.classify(&value.ty), self.data(value)?) {
            (TypeCode::Char, Data::Int(code)) => {
                let byte = (code & 0xff) as u8;
                if byte.is_ascii_graphic() || byte == b' ' {
                    format!("{} '{}'", code, byte as char)
                } else {
                    format!("{} '\\{:03o}'", code, byte)
                }
            }
            (TypeCode::Bool, Data::Int(v)) => (v != 0).to_string(),
            (_, Data::Int(v)) => v.to_string(),
            (_, Data::Float(v)) => v.to_string(),
            (_, Data::Pointer(address)) => format!("{:#x}", address),
            (TypeCode::Array, Data::Array { .. }) => {
                let is_text = element_type(&value.ty)
                    .is_some_and(|element| self.classify(&element) == TypeCode::Char);
                if is_text {
                    format!("\"{}\"", self.read_string(value, usize::MAX)?)
                } else {
                    "{...}".to_string()
                }
            }
            _ => "{...}".to_string(),
        };
        Ok(text)
    }

    fn read_string(&self, value: &SimValue, max_len: usize) -> HostResult<String> {
        let Data::Array { first, len } = self.data(value)? else {
            return Err(HostError::TypeMismatch(format!("{} is not a character array", value.ty)));
        };
        let mut text = String::new();
        for i in 0..len {
            if text.len() >= max_len {
                break;
            }
            match self.read(first + i * SLOT_SIZE)? {
                Data::Int(0) => break,
                Data::Int(code) => text.push((code & 0xff) as u8 as char),
                _ => return Err(HostError::TypeMismatch(format!("{} is not a character array", value.ty))),
            }
        }
        Ok(text)
    }

    fn array_len(&self, value: &SimValue) -> HostResult<u64> {
        match self.data(value)? {
            Data::Array { len, .. } => Ok(len),
            _ => Err(HostError::TypeMismatch(format!("{} is not an array", value.ty))),
        }
    }

    fn index(&self, value: &SimValue, index: u64) -> HostResult<SimValue> {
        let Data::Array { first, len } = self.data(value)? else {
            return Err(HostError::TypeMismatch(format!("{} is not an array", value.ty)));
        };
        if index >= len {
            return Err(HostError::evaluation(
                &format!("[{}]", index),
                format!("index out of bounds for {}", value.ty),
            ));
        }
        let ty = element_type(&value.ty)
            .ok_or_else(|| HostError::TypeMismatch(format!("{} is not an array", value.ty)))?;
        Ok(SimValue {
            ty,
            address: first + index * SLOT_SIZE,
        })
    }

    fn offset_pointer(&self, pointer: &SimValue, count: i64) -> HostResult<SimValue> {
        let Data::Pointer(address) = self.data(pointer)? else {
            return Err(HostError::TypeMismatch(format!("{} is not a pointer", pointer.ty)));
        };
        let moved = address.wrapping_add_signed(count.wrapping_mul(SLOT_SIZE as i64));
        Ok(self.alloc_pointer(&pointer.ty, moved))
    }

    fn pointer_difference(&self, end: &SimValue, begin: &SimValue) -> HostResult<i64> {
        match (self.data(end)?, self.data(begin)?) {
            (Data::Pointer(e), Data::Pointer(b)) => Ok((e as i64 - b as i64) / SLOT_SIZE as i64),
            _ => Err(HostError::TypeMismatch(format!(
                "cannot subtract {} from {}",
                begin.ty, end.ty
            ))),
        }
    }

    fn cast_address(&self, address: u64, type_text: &str) -> HostResult<SimValue> {
        if !is_pointer_type(type_text) {
            return Err(HostError::TypeMismatch(format!(
                "cannot cast an address to {}",
                type_text
            )));
        }
        Ok(self.alloc_pointer(type_text, address))
    }

    fn value_at(&self, address: u64, type_text: &str) -> HostResult<SimValue> {
        self.slot_index(address)?;
        if !self.is_known_type(type_text) {
            return Err(HostError::UnknownType(type_text.to_string()));
        }
        Ok(SimValue {
            ty: type_text.to_string(),
            address,
        })
    }

    fn var(&self, name: &str) -> Option<SimValue> {
        self.state.borrow().vars.get(name).cloned()
    }

    fn set_var(&self, name: &str, value: Option<SimValue>) {
        let mut state = self.state.borrow_mut();
        match value {
            Some(value) => {
                state.vars.insert(name.to_string(), value);
            }
            None => {
                state.vars.remove(name);
            }
        }
    }

    fn evaluate(&self, expr: &str) -> HostResult<SimValue> {
        tracing::trace!("sim: evaluate {}", expr);
        eval::evaluate(self, expr)
    }
}
