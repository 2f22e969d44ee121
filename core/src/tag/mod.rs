//! Synthetic tags
//!
//! A synthetic node is a view of real data rather than real program state:
//! the class-level fields of a value, its raw instance fields, one of its
//! declared views, one chunk of a long sequence, or a descriptive message.
//! Each is described by a small tuple of non-negative integers whose first
//! component is the kind:
//!
//! | kind | tuple                      |
//! |------|----------------------------|
//! | 0    | `(0)` static fields        |
//! | 1    | `(1)` raw fields           |
//! | 2    | `(2, offset, size)` chunk  |
//! | 3    | `(3, index)` view          |
//! | 4    | `(4, bytes...)` message    |
//!
//! [`RenderRequest`] carries a tag next to the value it describes. Hosts that
//! can only redispatch on a value's type use the [`codec`] adapter instead,
//! which hides the tuple inside a forged type.

pub mod codec;

pub use codec::{CodecError, TypeTagCodec, decode_type_name, encode_type_name, is_tagged};

use smallvec::SmallVec;

/// Raw integer tuple of a tag
pub type TagTuple = SmallVec<[u64; 4]>;

pub const STATIC_KIND: u64 = 0;
pub const RAW_KIND: u64 = 1;
pub const CHUNK_KIND: u64 = 2;
pub const VIEW_KIND: u64 = 3;
pub const MESSAGE_KIND: u64 = 4;

/// A decoded tag tuple is not one the dispatcher understands
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TagError {
    #[error("empty tag tuple")]
    Empty,

    #[error("unknown tag kind {0}")]
    UnknownKind(u64),

    #[error("tag kind {kind} is missing parameter {position}")]
    MissingParameter { kind: u64, position: usize },

    #[error("tag kind {kind} has {extra} unexpected parameter(s)")]
    UnexpectedParameters { kind: u64, extra: usize },

    #[error("message byte {0} is out of range")]
    InvalidMessageByte(u64),

    #[error("view index {0} does not fit in usize")]
    ViewIndexOverflow(u64),
}

/// Which alternate view of a value a synthetic node shows
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ViewTag {
    /// Fields without storage (class-level data)
    Static,
    /// Fields with storage (instance data)
    Raw,
    /// `size` consecutive elements starting at element `offset`
    Chunk { offset: u64, size: u64 },
    /// The declared view at this position
    View(usize),
    /// A placeholder that only displays a message
    Message(Vec<u8>),
}

impl ViewTag {
    /// Message tag from text
    pub fn message(text: &str) -> Self {
        ViewTag::Message(text.as_bytes().to_vec())
    }

    /// The tag as its integer tuple
    pub fn to_tuple(&self) -> TagTuple {
        let mut tuple = TagTuple::new();
        match self {
            ViewTag::Static => tuple.push(STATIC_KIND),
            ViewTag::Raw => tuple.push(RAW_KIND),
            ViewTag::Chunk { offset, size } => {
                tuple.extend_from_slice(&[CHUNK_KIND, *offset, *size]);
            }
            ViewTag::View(index) => tuple.extend_from_slice(&[VIEW_KIND, *index as u64]),
            ViewTag::Message(bytes) => {
                tuple.push(MESSAGE_KIND);
                tuple.extend(bytes.iter().map(|b| u64::from(*b)));
            }
        }
        tuple
    }
}

impl TryFrom<&[u64]> for ViewTag {
    type Error = TagError;

    fn try_from(tuple: &[u64]) -> Result<Self, Self::Error> {
        let (&kind, params) = tuple.split_first().ok_or(TagError::Empty)?;

        let param = |position: usize| {
            params
                .get(position)
                .copied()
                .ok_or(TagError::MissingParameter { kind, position })
        };
        let exact = |count: usize| {
            if params.len() > count {
                Err(TagError::UnexpectedParameters {
                    kind,
                    extra: params.len() - count,
                })
            } else {
                Ok(())
            }
        };

        match kind {
            STATIC_KIND => {
                exact(0)?;
                Ok(ViewTag::Static)
            }
            RAW_KIND => {
                exact(0)?;
                Ok(ViewTag::Raw)
            }
            CHUNK_KIND => {
                let offset = param(0)?;
                let size = param(1)?;
                exact(2)?;
                Ok(ViewTag::Chunk { offset, size })
            }
            VIEW_KIND => {
                let index = param(0)?;
                exact(1)?;
                usize::try_from(index)
                    .map(ViewTag::View)
                    .map_err(|_| TagError::ViewIndexOverflow(index))
            }
            MESSAGE_KIND => params
                .iter()
                .map(|&b| u8::try_from(b).map_err(|_| TagError::InvalidMessageByte(b)))
                .collect::<Result<Vec<u8>, _>>()
                .map(ViewTag::Message),
            other => Err(TagError::UnknownKind(other)),
        }
    }
}

/// A synthetic node: a value plus the view of it to render
#[derive(Debug, Clone, PartialEq)]
pub struct RenderRequest<V> {
    /// The real value (or, for chunks, the cursor at the chunk start)
    pub value: V,
    /// Raw tag tuple, decoded by the dispatcher
    pub tag: TagTuple,
}

impl<V> RenderRequest<V> {
    pub fn new(value: V, tag: &ViewTag) -> Self {
        Self {
            value,
            tag: tag.to_tuple(),
        }
    }

    /// Request with an arbitrary tuple, for tags this crate does not define
    pub fn from_tuple(value: V, tag: TagTuple) -> Self {
        Self { value, tag }
    }

    /// Decode the tag tuple
    pub fn view_tag(&self) -> Result<ViewTag, TagError> {
        ViewTag::try_from(self.tag.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tuple_shapes() {
        assert_eq!(ViewTag::Static.to_tuple().as_slice(), &[0]);
        assert_eq!(ViewTag::Raw.to_tuple().as_slice(), &[1]);
        assert_eq!(
            ViewTag::Chunk { offset: 32, size: 3 }.to_tuple().as_slice(),
            &[2, 32, 3]
        );
        assert_eq!(ViewTag::View(0).to_tuple().as_slice(), &[3, 0]);
        assert_eq!(ViewTag::message("ok").to_tuple().as_slice(), &[4, 111, 107]);
    }

    #[test]
    fn test_tuple_decoding() {
        for tag in [
            ViewTag::Static,
            ViewTag::Raw,
            ViewTag::Chunk { offset: 0, size: 0 },
            ViewTag::Chunk { offset: 16, size: 16 },
            ViewTag::View(0),
            ViewTag::View(7),
            ViewTag::message("<default_view \"Alpha\" not defined>"),
        ] {
            assert_eq!(ViewTag::try_from(tag.to_tuple().as_slice()), Ok(tag));
        }
    }

    #[test]
    fn test_malformed_tuples() {
        assert_eq!(ViewTag::try_from(&[][..]), Err(TagError::Empty));
        assert_eq!(ViewTag::try_from(&[9][..]), Err(TagError::UnknownKind(9)));
        assert_eq!(
            ViewTag::try_from(&[2, 4][..]),
            Err(TagError::MissingParameter {
                kind: 2,
                position: 1
            })
        );
        assert_eq!(
            ViewTag::try_from(&[1, 0][..]),
            Err(TagError::UnexpectedParameters { kind: 1, extra: 1 })
        );
        assert_eq!(
            ViewTag::try_from(&[4, 300][..]),
            Err(TagError::InvalidMessageByte(300))
        );
    }

    #[test]
    fn test_view_index_width() {
        let big = u64::from(u32::MAX) + 1;
        #[cfg(target_pointer_width = "64")]
        assert_eq!(ViewTag::try_from(&[3, big][..]), Ok(ViewTag::View(1 << 32)));
        #[cfg(target_pointer_width = "32")]
        assert_eq!(
            ViewTag::try_from(&[3, big][..]),
            Err(TagError::ViewIndexOverflow(big))
        );
    }

    #[test]
    fn test_request_decodes_its_tag() {
        let request = RenderRequest::new("value", &ViewTag::View(2));
        assert_eq!(request.view_tag(), Ok(ViewTag::View(2)));

        let request = RenderRequest::from_tuple("value", TagTuple::from_slice(&[42]));
        assert_eq!(request.view_tag(), Err(TagError::UnknownKind(42)));
    }
}
