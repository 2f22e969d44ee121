//! Textual type model
//!
//! Splits a host type spelling into leading qualifiers, a base spelling and
//! trailing array dimensions, e.g. `const Pixel [4][2]`.

use std::fmt;

use smallvec::SmallVec;

/// `const` / `volatile` qualifiers of a type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Qualifiers {
    pub is_const: bool,
    pub is_volatile: bool,
}

impl Qualifiers {
    pub const NONE: Qualifiers = Qualifiers {
        is_const: false,
        is_volatile: false,
    };

    pub const CONST: Qualifiers = Qualifiers {
        is_const: true,
        is_volatile: false,
    };

    pub const VOLATILE: Qualifiers = Qualifiers {
        is_const: false,
        is_volatile: true,
    };

    pub fn is_empty(&self) -> bool {
        !self.is_const && !self.is_volatile
    }
}

impl fmt::Display for Qualifiers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_const {
            f.write_str("const ")?;
        }
        if self.is_volatile {
            f.write_str("volatile ")?;
        }
        Ok(())
    }
}

/// A parsed type spelling
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeName {
    /// Leading qualifiers
    pub qualifiers: Qualifiers,
    /// Everything between the qualifiers and the array dimensions
    pub base: String,
    /// Trailing array dimensions, outermost first
    pub dims: SmallVec<[u64; 2]>,
}

impl TypeName {
    /// A plain, unqualified, non-array type
    pub fn plain(base: impl Into<String>) -> Self {
        Self {
            qualifiers: Qualifiers::NONE,
            base: base.into(),
            dims: SmallVec::new(),
        }
    }

    /// Parse a host type spelling
    ///
    /// Never fails: anything that is not a recognised qualifier or array
    /// dimension stays in the base spelling. Dimensions following a `)` belong
    /// to a declarator such as `int (*)[4]` and are kept in the base.
    pub fn parse(text: &str) -> Self {
        let mut rest = text.trim();
        let mut qualifiers = Qualifiers::NONE;

        loop {
            if let Some(tail) = rest.strip_prefix("const ") {
                qualifiers.is_const = true;
                rest = tail.trim_start();
            } else if let Some(tail) = rest.strip_prefix("volatile ") {
                qualifiers.is_volatile = true;
                rest = tail.trim_start();
            } else {
                break;
            }
        }

        let mut dims: SmallVec<[u64; 2]> = SmallVec::new();
        while rest.ends_with(']') {
            let Some(open) = rest.rfind('[') else {
                break;
            };
            let Ok(dim) = rest[open + 1..rest.len() - 1].parse::<u64>() else {
                break;
            };
            let head = rest[..open].trim_end();
            if head.is_empty() || head.ends_with(')') {
                break;
            }
            dims.insert(0, dim);
            rest = head;
        }

        Self {
            qualifiers,
            base: rest.to_string(),
            dims,
        }
    }

    /// The same type with its qualifiers removed
    pub fn unqualified(&self) -> Self {
        Self {
            qualifiers: Qualifiers::NONE,
            base: self.base.clone(),
            dims: self.dims.clone(),
        }
    }

    /// Whether the type has trailing array dimensions
    pub fn is_array(&self) -> bool {
        !self.dims.is_empty()
    }
}

impl fmt::Display for TypeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.qualifiers, self.base)?;
        if !self.dims.is_empty() {
            f.write_str(" ")?;
            for dim in &self.dims {
                write!(f, "[{}]", dim)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain() {
        let name = TypeName::parse("ColorRGBA");
        assert_eq!(name, TypeName::plain("ColorRGBA"));
        assert_eq!(name.to_string(), "ColorRGBA");
    }

    #[test]
    fn test_parse_qualifiers() {
        let name = TypeName::parse("const volatile ColorRGBA");
        assert!(name.qualifiers.is_const);
        assert!(name.qualifiers.is_volatile);
        assert_eq!(name.base, "ColorRGBA");
        assert_eq!(name.unqualified().to_string(), "ColorRGBA");
        assert_eq!(name.to_string(), "const volatile ColorRGBA");
    }

    #[test]
    fn test_parse_array_dims() {
        let name = TypeName::parse("const int [4][2]");
        assert_eq!(name.base, "int");
        assert_eq!(name.dims.as_slice(), &[4, 2]);
        assert_eq!(name.to_string(), "const int [4][2]");
    }

    #[test]
    fn test_parse_keeps_declarators_and_templates() {
        let name = TypeName::parse("int (*)[4]");
        assert_eq!(name.base, "int (*)[4]");
        assert!(!name.is_array());

        let name = TypeName::parse("std::vector<int, std::allocator<int> >");
        assert_eq!(name.base, "std::vector<int, std::allocator<int> >");

        let name = TypeName::parse("const char *");
        assert!(name.qualifiers.is_const);
        assert_eq!(name.base, "char *");
    }
}
