//! Tagged attribute codec for the KTF control channel
//!
//! Messages are a 4-byte family header followed by a stream of
//! length-prefixed, tagged attributes, nestable to any depth:
//!
//! ```text
//! ┌──────┬─────────┬──────────┬───────────────────────────────┐
//! │ cmd  │ version │ reserved │ attributes ...                │
//! │ (1)  │ (1)     │ (2)      │                               │
//! └──────┴─────────┴──────────┴───────────────────────────────┘
//!
//! attribute:
//! ┌──────────┬──────────┬──────────────────┬─────────────┐
//! │ len (2)  │ type (2) │ payload (len-4)  │ pad to 4    │
//! └──────────┴──────────┴──────────────────┴─────────────┘
//! ```
//!
//! - [`MessageBuilder`] serializes flat or nested attribute sequences.
//! - [`parse_message`] validates a message against a [`Policy`] and indexes its
//!   top-level attributes; nested groups are walked lazily through [`Attr::nested`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod decode;
pub mod encode;
pub mod tag;

pub use decode::{parse_attributes, parse_message, Attr, AttrIter, GenlHeader, ParsedMessage};
pub use encode::MessageBuilder;
pub use tag::{
    AttrKind, AttrTag, CommandType, Policy, GENL_HDRLEN, KTF_CMD_REQ, KTF_CMD_RESP,
    KTF_GENL_VERSION, KTF_POLICY, NLA_ALIGNTO, NLA_F_NESTED, NLA_HDRLEN,
};

/// Round `len` up to the attribute alignment
pub const fn nla_align(len: usize) -> usize {
    (len + NLA_ALIGNTO - 1) & !(NLA_ALIGNTO - 1)
}
