//! Host capability interface
//!
//! Everything the view framework knows about the inspected process arrives
//! through the [`Host`] trait: type introspection, value access and expression
//! evaluation with named placeholders. The framework never walks memory or
//! debug symbols itself.
//!
//! # Threading
//!
//! Hosts drive the framework from a single command thread. All operations take
//! `&self`; hosts that need to mutate placeholder state use interior
//! mutability.

mod protocol;
mod scope;
mod type_name;

pub use protocol::{Resolver, ResolverChain};
pub use scope::ScopedVars;
pub use type_name::{Qualifiers, TypeName};

use std::fmt;

/// Result type for host operations
pub type HostResult<T> = Result<T, HostError>;

/// Failure reported by a host capability
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// The value's type has no member with this name
    #[error("no member named `{member}` in `{type_name}`")]
    MissingMember { type_name: String, member: String },

    /// The operation does not apply to the value's type
    #[error("type mismatch: {0}")]
    TypeMismatch(String),

    /// The expression evaluator rejected an expression
    #[error("cannot evaluate `{expr}`: {reason}")]
    Evaluation { expr: String, reason: String },

    /// Memory at the address is not readable
    #[error("cannot access memory at address {0:#x}")]
    InvalidAddress(u64),

    /// No type with this textual name exists
    #[error("no type named `{0}`")]
    UnknownType(String),

    /// Placeholder names are bare identifiers; `$` is only used inside expressions
    #[error("placeholder `{0}` must not start with `$`")]
    InvalidPlaceholder(String),
}

impl HostError {
    /// Shorthand for an evaluator rejection
    pub fn evaluation(expr: &str, reason: impl Into<String>) -> Self {
        HostError::Evaluation {
            expr: expr.to_string(),
            reason: reason.into(),
        }
    }
}

/// Structural category of a type, after typedefs are stripped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TypeCode {
    Struct,
    Union,
    Pointer,
    Array,
    Int,
    /// Single-byte character types (`char`, `signed char`, `unsigned char`)
    Char,
    Float,
    Bool,
    Function,
    Other,
}

impl TypeCode {
    /// Whether values of this type have named fields
    pub fn is_composite(&self) -> bool {
        matches!(self, TypeCode::Struct | TypeCode::Union)
    }
}

/// One declared field of a composite type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    /// Field name (`None` for anonymous members)
    pub name: Option<String>,
    /// Whether the field is a base-class sub-object
    pub is_base_class: bool,
    /// Whether the field occupies instance storage (false for class-level data)
    pub has_storage: bool,
}

impl FieldInfo {
    /// An ordinary instance field
    pub fn instance(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            is_base_class: false,
            has_storage: true,
        }
    }

    /// A class-level field without storage
    pub fn class_level(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            is_base_class: false,
            has_storage: false,
        }
    }

    /// A base-class sub-object named after the base type
    pub fn base(type_name: impl Into<String>) -> Self {
        Self {
            name: Some(type_name.into()),
            is_base_class: true,
            has_storage: true,
        }
    }

    /// Instance data shown in raw views and summaries
    pub fn is_instance_data(&self) -> bool {
        self.has_storage && !self.is_base_class
    }
}

/// Capabilities consumed from the debugger hosting the inspected process
pub trait Host {
    /// Handle to a value in the inspected process
    type Value: Clone + fmt::Debug + 'static;

    // =========================================================================
    // Type introspection
    // =========================================================================

    /// Full textual type of a value, including qualifiers
    fn type_name(&self, value: &Self::Value) -> HostResult<String>;

    /// Structural category of a value's type
    fn type_code(&self, value: &Self::Value) -> HostResult<TypeCode>;

    /// Declared fields of a composite value, in declaration order
    fn fields(&self, value: &Self::Value) -> HostResult<Vec<FieldInfo>>;

    // =========================================================================
    // Value access
    // =========================================================================

    /// Read a named field (instance or class-level)
    fn field(&self, value: &Self::Value, name: &str) -> HostResult<Self::Value>;

    /// View a value as its base-class sub-object
    fn base_class(&self, value: &Self::Value, base: &str) -> HostResult<Self::Value>;

    /// Invoke a zero-argument member function
    fn call_method(&self, value: &Self::Value, method: &str) -> HostResult<Self::Value>;

    /// Take the address of a value, as a pointer-typed value
    fn address_of(&self, value: &Self::Value) -> HostResult<Self::Value>;

    /// Dereference a pointer-typed value
    fn dereference(&self, value: &Self::Value) -> HostResult<Self::Value>;

    /// Coerce a value to an integer (pointers yield their address)
    fn to_integer(&self, value: &Self::Value) -> HostResult<i64>;

    /// Generic textual rendering, as the host would print the value
    fn format_value(&self, value: &Self::Value) -> HostResult<String>;

    /// Bounded string view of a character array
    fn read_string(&self, value: &Self::Value, max_len: usize) -> HostResult<String>;

    /// Number of elements of an array-typed value
    fn array_len(&self, value: &Self::Value) -> HostResult<u64>;

    /// Element `index` of an array-typed value
    fn index(&self, value: &Self::Value, index: u64) -> HostResult<Self::Value>;

    /// Native pointer arithmetic: `pointer + count`
    fn offset_pointer(&self, pointer: &Self::Value, count: i64) -> HostResult<Self::Value>;

    /// Native pointer arithmetic: `end - begin`, in elements
    fn pointer_difference(&self, end: &Self::Value, begin: &Self::Value) -> HostResult<i64>;

    /// Reinterpret an address as a value of the pointer type spelled `type_text`
    fn cast_address(&self, address: u64, type_text: &str) -> HostResult<Self::Value>;

    /// The object of type `type_text` living at `address`
    fn value_at(&self, address: u64, type_text: &str) -> HostResult<Self::Value>;

    // =========================================================================
    // Expression evaluation
    // =========================================================================

    /// Current value of a placeholder, if set
    fn var(&self, name: &str) -> Option<Self::Value>;

    /// Set (`Some`) or remove (`None`) a placeholder
    fn set_var(&self, name: &str, value: Option<Self::Value>);

    /// Evaluate an expression in the inspected process's language
    fn evaluate(&self, expr: &str) -> HostResult<Self::Value>;
}
