//! Type-signature encoding of synthetic tags
//!
//! For hosts that pick a renderer purely from a value's type, a tag is hidden
//! inside a forged type derived from the real one:
//!
//! ```text
//! <qualifiers><base> *(****)[n+1][t0+1]...[tn-1+1][d0+1]...
//! ```
//!
//! `n` is the tag length, `t*` the tag components and `d*` the real type's
//! own trailing array dimensions. Every dimension is stored plus one so a zero
//! still makes a legal, non-empty array bound. No variable in a real program
//! is a quadruple pointer to an array of pointers to its own type, so the
//! `(****)` signature cannot collide with program types.
//!
//! The forged value's address is the real value's address; decoding casts it
//! back through a pointer to the recovered real type.

use std::sync::LazyLock;

use regex::Regex;
use smallvec::SmallVec;

use super::{RenderRequest, TagTuple};
use crate::host::{Host, HostError, TypeName};

static SIGNATURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<head>.+?) \*\(\*\*\*\*\)(?P<dims>(?:\[\d+\])+)$")
        .expect("tag signature pattern")
});

static DIMENSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[(\d+)\]").expect("array dimension pattern")
});

/// Failure to encode or decode a tagged type
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    /// The type does not carry the tag signature; an ordinary value
    #[error("not a tagged value: `{0}`")]
    NotTagged(String),

    /// The signature is present but its dimensions are inconsistent
    #[error("malformed tagged type `{type_text}`: {reason}")]
    Malformed { type_text: String, reason: String },

    /// A component cannot be expressed as an array bound
    #[error("tag component {0} is too large to encode")]
    ComponentTooLarge(u64),

    /// The host reported an address that cannot be a location
    #[error("invalid address {0}")]
    InvalidAddress(i64),

    #[error(transparent)]
    Host(#[from] HostError),
}

/// Whether a type spelling carries the tag signature
pub fn is_tagged(type_text: &str) -> bool {
    type_text.contains("(****)") && SIGNATURE.is_match(type_text)
}

/// Forge the type spelling that carries `tag` for a value of `real_type`
pub fn encode_type_name(real_type: &str, tag: &[u64]) -> Result<String, CodecError> {
    let name = TypeName::parse(real_type);
    let bound = |component: u64| {
        component
            .checked_add(1)
            .ok_or(CodecError::ComponentTooLarge(component))
    };

    let mut text = format!("{}{} *(****)", name.qualifiers, name.base);
    text.push_str(&format!("[{}]", bound(tag.len() as u64)?));
    for &component in tag.iter().chain(name.dims.iter()) {
        text.push_str(&format!("[{}]", bound(component)?));
    }
    Ok(text)
}

/// Recover the real type spelling and the tag from a forged type spelling
pub fn decode_type_name(type_text: &str) -> Result<(String, TagTuple), CodecError> {
    let captures = SIGNATURE
        .captures(type_text)
        .ok_or_else(|| CodecError::NotTagged(type_text.to_string()))?;
    let malformed = |reason: &str| CodecError::Malformed {
        type_text: type_text.to_string(),
        reason: reason.to_string(),
    };

    let bounds = DIMENSION
        .captures_iter(&captures["dims"])
        .map(|c| c[1].parse::<u64>())
        .collect::<Result<SmallVec<[u64; 8]>, _>>()
        .map_err(|_| malformed("dimension does not fit in 64 bits"))?;
    if bounds.iter().any(|&b| b == 0) {
        return Err(malformed("zero dimension"));
    }

    let tag_len = (bounds[0] - 1) as usize;
    let Some(tag_bounds) = bounds.get(1..1 + tag_len) else {
        return Err(malformed("fewer dimensions than the tag length"));
    };
    let tag: TagTuple = tag_bounds.iter().map(|b| b - 1).collect();

    let mut real = TypeName::parse(&captures["head"]);
    real.dims.extend(bounds[1 + tag_len..].iter().map(|b| b - 1));

    Ok((real.to_string(), tag))
}

/// Moves render requests in and out of forged host values
pub struct TypeTagCodec;

impl TypeTagCodec {
    /// Forge a host value whose type carries the request's tag
    pub fn encode<H: Host>(
        host: &H,
        request: &RenderRequest<H::Value>,
    ) -> Result<H::Value, CodecError> {
        let real_type = host.type_name(&request.value)?;
        let forged_type = encode_type_name(&real_type, &request.tag)?;
        let address = to_address(host.to_integer(&host.address_of(&request.value)?)?)?;
        Ok(host.cast_address(address, &forged_type)?)
    }

    /// Recover the original value and tag from a forged host value
    pub fn decode<H: Host>(host: &H, value: &H::Value) -> Result<RenderRequest<H::Value>, CodecError> {
        let type_text = host.type_name(value)?;
        let (real_type, tag) = decode_type_name(&type_text)?;
        let address = to_address(host.to_integer(value)?)?;
        let original = host.value_at(address, &real_type)?;
        tracing::trace!("decoded tag {:?} for {} at {:#x}", tag, real_type, address);
        Ok(RenderRequest::from_tuple(original, tag))
    }
}

fn to_address(value: i64) -> Result<u64, CodecError> {
    u64::try_from(value).map_err(|_| CodecError::InvalidAddress(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::Host;
    use crate::sim::SimProcess;
    use crate::tag::ViewTag;

    #[test]
    fn test_encode_shape() {
        assert_eq!(
            encode_type_name("ColorRGBA", &[0]).unwrap(),
            "ColorRGBA *(****)[2][1]"
        );
        assert_eq!(
            encode_type_name("const int [4]", &[2, 16, 3]).unwrap(),
            "const int *(****)[4][3][17][4][5]"
        );
    }

    #[test]
    fn test_type_name_round_trip() {
        let types = [
            "ColorRGBA",
            "const ColorRGBA",
            "volatile ColorRGBA",
            "const volatile ColorRGBA",
            "int [4]",
            "const int [3][0]",
            "char *",
            "std::vector<int, std::allocator<int> >",
        ];
        let tags: [&[u64]; 6] = [&[], &[0], &[1], &[2, 0, 0], &[3, 5], &[4, 0, 255, 7]];

        for ty in types {
            for tag in tags {
                let encoded = encode_type_name(ty, tag).unwrap();
                assert!(is_tagged(&encoded), "{encoded}");
                let (real, decoded) = decode_type_name(&encoded).unwrap();
                assert_eq!(real, ty);
                assert_eq!(decoded.as_slice(), tag);
            }
        }
    }

    #[test]
    fn test_ordinary_types_are_not_tagged() {
        for ty in ["ColorRGBA", "int **", "int (*)[4]", "void (*)(int)"] {
            assert!(!is_tagged(ty));
            assert!(matches!(
                decode_type_name(ty),
                Err(CodecError::NotTagged(_))
            ));
        }
    }

    #[test]
    fn test_malformed_signatures() {
        assert!(matches!(
            decode_type_name("int *(****)[0]"),
            Err(CodecError::Malformed { .. })
        ));
        assert!(matches!(
            decode_type_name("int *(****)[4][1]"),
            Err(CodecError::Malformed { .. })
        ));
        assert!(matches!(
            encode_type_name("int", &[u64::MAX]),
            Err(CodecError::ComponentTooLarge(u64::MAX))
        ));
    }

    #[test]
    fn test_value_round_trip_through_host() {
        let process = SimProcess::with_samples();
        let color = process.global("color").unwrap();
        let address = process
            .to_integer(&process.address_of(&color).unwrap())
            .unwrap();
        let const_color = process
            .value_at(u64::try_from(address).unwrap(), "const ColorRGBA")
            .unwrap();
        let table = process.global("table").unwrap();

        for value in [color, const_color, table] {
            for tag in [
                ViewTag::Static,
                ViewTag::Raw,
                ViewTag::View(0),
                ViewTag::View(2),
                ViewTag::Chunk { offset: 0, size: 16 },
                ViewTag::message("hi"),
            ] {
                let request = RenderRequest::new(value.clone(), &tag);
                let forged = TypeTagCodec::encode(&process, &request).unwrap();
                assert!(is_tagged(&process.type_name(&forged).unwrap()));

                let decoded = TypeTagCodec::decode(&process, &forged).unwrap();
                assert_eq!(decoded.view_tag(), Ok(tag));
                assert_eq!(
                    process.type_name(&decoded.value).unwrap(),
                    process.type_name(&value).unwrap()
                );
                assert_eq!(
                    process.to_integer(&process.address_of(&decoded.value).unwrap()).unwrap(),
                    process.to_integer(&process.address_of(&value).unwrap()).unwrap()
                );
            }
        }
    }

    #[test]
    fn test_decode_rejects_negative_address() {
        let process = SimProcess::new();
        let forged = process.alloc_pointer("ColorRGBA *(****)[2][1]", u64::MAX);

        let err = TypeTagCodec::decode(&process, &forged).unwrap_err();
        assert!(matches!(err, CodecError::InvalidAddress(-1)), "{err}");
    }
}
