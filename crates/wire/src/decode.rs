//! Message parsing
//!
//! [`parse_message`] checks the family header, walks the top-level attribute
//! stream once, validates every known tag against the [`Policy`] and indexes
//! the attributes by tag. Nested groups are returned as borrowed views and
//! walked on demand with [`Attr::nested`]; nothing is copied or flattened.

use byteorder::{ByteOrder, NativeEndian};
use ktf_core::{Error, Result};
use tracing::trace;

use crate::nla_align;
use crate::tag::{AttrKind, Policy, GENL_HDRLEN, NLA_HDRLEN, NLA_TYPE_MASK};

/// Family header of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenlHeader {
    /// Family command
    pub cmd: u8,
    /// Family version
    pub version: u8,
}

/// Borrowed view of one attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attr<'a> {
    tag: u16,
    payload: &'a [u8],
}

impl<'a> Attr<'a> {
    /// Attribute tag with flag bits removed
    pub fn tag(&self) -> u16 {
        self.tag
    }

    /// Raw payload without padding
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Payload as u16
    pub fn u16(&self) -> Result<u16> {
        self.expect_len(AttrKind::U16)?;
        Ok(NativeEndian::read_u16(self.payload))
    }

    /// Payload as u32
    pub fn u32(&self) -> Result<u32> {
        self.expect_len(AttrKind::U32)?;
        Ok(NativeEndian::read_u32(self.payload))
    }

    /// Payload as u64
    pub fn u64(&self) -> Result<u64> {
        self.expect_len(AttrKind::U64)?;
        Ok(NativeEndian::read_u64(self.payload))
    }

    /// Payload as a string, up to the first NUL
    ///
    /// Invalid UTF-8 is replaced rather than rejected: report text comes
    /// from kernel formatting and is not guaranteed to be clean.
    pub fn string(&self) -> String {
        let end = self
            .payload
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(self.payload.len());
        String::from_utf8_lossy(&self.payload[..end]).into_owned()
    }

    /// Payload as opaque bytes
    pub fn bytes(&self) -> &'a [u8] {
        self.payload
    }

    /// Iterate over the members of a nested group
    pub fn nested(&self) -> AttrIter<'a> {
        AttrIter::new(self.payload)
    }

    fn expect_len(&self, kind: AttrKind) -> Result<()> {
        match kind.fixed_len() {
            Some(len) if len != self.payload.len() => Err(Error::AttributeKind {
                tag: self.tag,
                expected: kind.name(),
                len: self.payload.len(),
            }),
            _ => Ok(()),
        }
    }

    fn validate(&self, kind: AttrKind) -> Result<()> {
        self.expect_len(kind)?;
        if kind == AttrKind::Nested {
            for member in self.nested() {
                member?;
            }
        }
        Ok(())
    }
}

/// Iterator over an attribute stream
///
/// Yields `Err` once and then stops if the stream is malformed.
#[derive(Debug, Clone)]
pub struct AttrIter<'a> {
    buf: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> AttrIter<'a> {
    /// Iterate over a raw attribute stream
    pub fn new(buf: &'a [u8]) -> Self {
        AttrIter {
            buf,
            offset: 0,
            failed: false,
        }
    }

    fn parse_next(&mut self) -> Result<Attr<'a>> {
        let available = self.buf.len() - self.offset;
        if available < NLA_HDRLEN {
            return Err(Error::Truncated {
                offset: self.offset,
                needed: NLA_HDRLEN,
                available,
            });
        }
        let header = &self.buf[self.offset..self.offset + NLA_HDRLEN];
        let len = NativeEndian::read_u16(&header[0..2]) as usize;
        let type_field = NativeEndian::read_u16(&header[2..4]);
        if len < NLA_HDRLEN {
            return Err(Error::BadHeader(format!(
                "attribute at offset {} has length {}",
                self.offset, len
            )));
        }
        if len > available {
            return Err(Error::Truncated {
                offset: self.offset,
                needed: len,
                available,
            });
        }
        let attr = Attr {
            tag: type_field & NLA_TYPE_MASK,
            payload: &self.buf[self.offset + NLA_HDRLEN..self.offset + len],
        };
        self.offset = (self.offset + nla_align(len)).min(self.buf.len());
        Ok(attr)
    }
}

impl<'a> Iterator for AttrIter<'a> {
    type Item = Result<Attr<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.buf.len() {
            return None;
        }
        let next = self.parse_next();
        if next.is_err() {
            self.failed = true;
        }
        Some(next)
    }
}

/// A parsed message: family header plus top-level attributes indexed by tag
#[derive(Debug, Clone)]
pub struct ParsedMessage<'a> {
    header: GenlHeader,
    attrs: Vec<Option<Attr<'a>>>,
}

impl<'a> ParsedMessage<'a> {
    /// Family header
    pub fn header(&self) -> GenlHeader {
        self.header
    }

    /// Top-level attribute with this tag, if present
    pub fn get(&self, tag: impl Into<u16>) -> Option<Attr<'a>> {
        self.attrs.get(tag.into() as usize).copied().flatten()
    }

    /// True if the tag is present
    pub fn contains(&self, tag: impl Into<u16>) -> bool {
        self.get(tag).is_some()
    }
}

/// Parse a complete message (family header + attributes)
///
/// # Errors
///
/// Returns a protocol error if the message is shorter than its header, an
/// attribute overruns the buffer, or a known tag carries the wrong kind.
pub fn parse_message<'a>(buf: &'a [u8], policy: &Policy) -> Result<ParsedMessage<'a>> {
    if buf.len() < GENL_HDRLEN {
        return Err(Error::Truncated {
            offset: 0,
            needed: GENL_HDRLEN,
            available: buf.len(),
        });
    }
    let header = GenlHeader {
        cmd: buf[0],
        version: buf[1],
    };
    let attrs = parse_attributes(&buf[GENL_HDRLEN..], policy)?;
    Ok(ParsedMessage { header, attrs })
}

/// Parse a bare attribute stream into a tag-indexed table
///
/// The table has `policy.max_tag() + 1` slots. A repeated tag keeps its last
/// occurrence; tags outside the policy are skipped.
pub fn parse_attributes<'a>(buf: &'a [u8], policy: &Policy) -> Result<Vec<Option<Attr<'a>>>> {
    let mut attrs = vec![None; policy.max_tag() as usize + 1];
    for attr in AttrIter::new(buf) {
        let attr = attr?;
        match policy.kind(attr.tag()) {
            Some(kind) => {
                attr.validate(kind)?;
                attrs[attr.tag() as usize] = Some(attr);
            }
            None => trace!(target: "ktf::wire", tag = attr.tag(), "ignoring attribute outside policy"),
        }
    }
    Ok(attrs)
}
