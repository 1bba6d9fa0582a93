//! Message serialization
//!
//! [`MessageBuilder`] appends attributes to a single buffer. Nested groups are
//! written in place: the group header is reserved, the closure fills the
//! payload, and the header length is patched afterwards.

use byteorder::{ByteOrder, NativeEndian};
use ktf_core::{Error, Result};

use crate::nla_align;
use crate::tag::{GENL_HDRLEN, NLA_F_NESTED, NLA_HDRLEN};

/// Builder for one outbound message
#[derive(Debug, Clone)]
pub struct MessageBuilder {
    buf: Vec<u8>,
    /// First attribute whose length did not fit the 16-bit length field
    oversized: Option<u16>,
}

impl MessageBuilder {
    /// Start a message with a family header
    pub fn new(cmd: u8, version: u8) -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.extend_from_slice(&[cmd, version, 0, 0]);
        debug_assert_eq!(buf.len(), GENL_HDRLEN);
        MessageBuilder {
            buf,
            oversized: None,
        }
    }

    /// Start a bare attribute stream without a family header
    pub fn attributes() -> Self {
        MessageBuilder {
            buf: Vec::with_capacity(64),
            oversized: None,
        }
    }

    /// Append a u16 attribute
    pub fn put_u16(&mut self, tag: impl Into<u16>, value: u16) -> &mut Self {
        let mut raw = [0u8; 2];
        NativeEndian::write_u16(&mut raw, value);
        self.put_raw(tag.into(), &raw)
    }

    /// Append a u32 attribute
    pub fn put_u32(&mut self, tag: impl Into<u16>, value: u32) -> &mut Self {
        let mut raw = [0u8; 4];
        NativeEndian::write_u32(&mut raw, value);
        self.put_raw(tag.into(), &raw)
    }

    /// Append a u64 attribute
    pub fn put_u64(&mut self, tag: impl Into<u16>, value: u64) -> &mut Self {
        let mut raw = [0u8; 8];
        NativeEndian::write_u64(&mut raw, value);
        self.put_raw(tag.into(), &raw)
    }

    /// Append a NUL-terminated string attribute
    pub fn put_string(&mut self, tag: impl Into<u16>, value: &str) -> &mut Self {
        let start = self.begin(tag.into());
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.push(0);
        self.end(start);
        self
    }

    /// Append an opaque bytes attribute
    pub fn put_bytes(&mut self, tag: impl Into<u16>, value: &[u8]) -> &mut Self {
        self.put_raw(tag.into(), value)
    }

    /// Append a nested group whose members are written by `fill`
    pub fn put_nested<F>(&mut self, tag: impl Into<u16>, fill: F) -> &mut Self
    where
        F: FnOnce(&mut MessageBuilder),
    {
        let start = self.begin(tag.into() | NLA_F_NESTED);
        fill(self);
        self.end(start);
        self
    }

    /// Bytes written so far
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if nothing has been written
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Finish the message
    ///
    /// # Errors
    ///
    /// Fails if any attribute exceeded the 16-bit length field.
    pub fn finish(self) -> Result<Vec<u8>> {
        if let Some(tag) = self.oversized {
            return Err(Error::protocol(format!(
                "attribute {} exceeds {} bytes",
                tag & !NLA_F_NESTED,
                u16::MAX
            )));
        }
        Ok(self.buf)
    }

    fn put_raw(&mut self, tag: u16, payload: &[u8]) -> &mut Self {
        let start = self.begin(tag);
        self.buf.extend_from_slice(payload);
        self.end(start);
        self
    }

    /// Reserve an attribute header, returning its offset
    fn begin(&mut self, type_field: u16) -> usize {
        let start = self.buf.len();
        self.buf.resize(start + NLA_HDRLEN, 0);
        NativeEndian::write_u16(&mut self.buf[start + 2..start + 4], type_field);
        start
    }

    /// Patch the header length and pad the payload
    fn end(&mut self, start: usize) {
        let len = self.buf.len() - start;
        if len > u16::MAX as usize && self.oversized.is_none() {
            self.oversized = Some(NativeEndian::read_u16(&self.buf[start + 2..start + 4]));
        }
        NativeEndian::write_u16(&mut self.buf[start..start + 2], len as u16);
        let padded = start + nla_align(len);
        self.buf.resize(padded, 0);
    }
}
