//! Generic netlink transport
//!
//! Frames each request with a netlink header carrying the family id,
//! `NLM_F_REQUEST | NLM_F_ACK` and a fresh sequence number:
//!
//! ```text
//! ┌──────────┬──────────┬───────────┬──────────┬──────────┬────────────────┐
//! │ len (4)  │ type (2) │ flags (2) │ seq (4)  │ pid (4)  │ body ...       │
//! └──────────┴──────────┴───────────┴──────────┴──────────┴────────────────┘
//! ```
//!
//! The kernel emits a request's data messages before its `NLMSG_ERROR`
//! acknowledgement. Data seen while waiting for the ack is queued and handed
//! out by `recv`, so callers still observe ack first, response second.

use std::collections::VecDeque;
use std::io;
use std::mem;
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::ptr;

use ktf_wire::{parse_message, AttrKind, MessageBuilder, Policy};
use tracing::{debug, trace};

use crate::transport::{Ack, Transport};

const NLMSG_HDRLEN: usize = 16;
const NLMSG_NOOP: u16 = 1;
const NLMSG_ERROR: u16 = 2;
const NLMSG_DONE: u16 = 3;
const NLM_F_REQUEST: u16 = 0x1;
const NLM_F_ACK: u16 = 0x4;

const GENL_ID_CTRL: u16 = 0x10;
const CTRL_CMD_GETFAMILY: u8 = 3;
const CTRL_VERSION: u8 = 1;
const CTRL_ATTR_FAMILY_ID: u16 = 1;
const CTRL_ATTR_FAMILY_NAME: u16 = 2;

/// Controller attributes needed for family resolution
static CTRL_POLICY: Policy = Policy::new(&[None, Some(AttrKind::U16), Some(AttrKind::String)]);

fn nlmsg_align(len: usize) -> usize {
    (len + 3) & !3
}

/// Netlink message header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NlMsgHdr {
    len: u32,
    kind: u16,
    flags: u16,
    seq: u32,
    pid: u32,
}

impl NlMsgHdr {
    fn to_bytes(self) -> [u8; NLMSG_HDRLEN] {
        let mut bytes = [0u8; NLMSG_HDRLEN];
        bytes[0..4].copy_from_slice(&self.len.to_ne_bytes());
        bytes[4..6].copy_from_slice(&self.kind.to_ne_bytes());
        bytes[6..8].copy_from_slice(&self.flags.to_ne_bytes());
        bytes[8..12].copy_from_slice(&self.seq.to_ne_bytes());
        bytes[12..16].copy_from_slice(&self.pid.to_ne_bytes());
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < NLMSG_HDRLEN {
            return None;
        }
        Some(NlMsgHdr {
            len: u32::from_ne_bytes(bytes[0..4].try_into().ok()?),
            kind: u16::from_ne_bytes(bytes[4..6].try_into().ok()?),
            flags: u16::from_ne_bytes(bytes[6..8].try_into().ok()?),
            seq: u32::from_ne_bytes(bytes[8..12].try_into().ok()?),
            pid: u32::from_ne_bytes(bytes[12..16].try_into().ok()?),
        })
    }
}

/// Split one datagram into the ack for `seq` (if present) and data bodies
fn split_datagram(datagram: &[u8], seq: u32) -> io::Result<(Option<Ack>, Vec<Vec<u8>>)> {
    let mut ack = None;
    let mut bodies = Vec::new();
    let mut offset = 0;
    while offset + NLMSG_HDRLEN <= datagram.len() {
        let hdr = NlMsgHdr::from_bytes(&datagram[offset..]).ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "short netlink header")
        })?;
        let len = hdr.len as usize;
        if len < NLMSG_HDRLEN || offset + len > datagram.len() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("netlink message length {} at offset {}", len, offset),
            ));
        }
        let payload = &datagram[offset + NLMSG_HDRLEN..offset + len];
        match hdr.kind {
            NLMSG_ERROR => {
                let status = payload
                    .get(0..4)
                    .and_then(|b| b.try_into().ok())
                    .map(i32::from_ne_bytes)
                    .ok_or_else(|| {
                        io::Error::new(io::ErrorKind::InvalidData, "short netlink error message")
                    })?;
                if hdr.seq == seq {
                    ack = Some(if status == 0 { Ack::Ok } else { Ack::Nack(status) });
                } else {
                    trace!(target: "ktf::netlink", seq = hdr.seq, status, "Ignoring stale ack");
                }
            }
            NLMSG_NOOP | NLMSG_DONE => {}
            _ if hdr.seq == seq => bodies.push(payload.to_vec()),
            _ => {
                trace!(target: "ktf::netlink", seq = hdr.seq, kind = hdr.kind, "Ignoring stale message");
            }
        }
        offset += nlmsg_align(len);
    }
    Ok((ack, bodies))
}

fn invalid_data(e: impl std::fmt::Display) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, e.to_string())
}

/// Generic netlink socket
#[derive(Debug)]
pub struct NetlinkTransport {
    fd: OwnedFd,
    seq: u32,
    ack: Option<Ack>,
    pending: VecDeque<Vec<u8>>,
}

impl NetlinkTransport {
    /// Allocate an unbound generic netlink socket
    pub fn new() -> io::Result<Self> {
        // SAFETY: socket(2) takes no pointers; the result is checked below.
        let raw = unsafe {
            libc::socket(
                libc::AF_NETLINK,
                libc::SOCK_RAW | libc::SOCK_CLOEXEC,
                libc::NETLINK_GENERIC,
            )
        };
        if raw < 0 {
            return Err(io::Error::last_os_error());
        }
        // SAFETY: `raw` is a freshly created descriptor not owned elsewhere.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };
        Ok(NetlinkTransport {
            fd,
            seq: 0,
            ack: None,
            pending: VecDeque::new(),
        })
    }

    fn read_datagram(&mut self) -> io::Result<Vec<u8>> {
        loop {
            // SAFETY: a zero-length peek with a null buffer writes nothing.
            let size = unsafe {
                libc::recv(
                    self.fd.as_raw_fd(),
                    ptr::null_mut(),
                    0,
                    libc::MSG_PEEK | libc::MSG_TRUNC,
                )
            };
            if size < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            let mut buf = vec![0u8; (size as usize).max(NLMSG_HDRLEN)];
            // SAFETY: `buf` is valid for writes of `buf.len()` bytes.
            let n = unsafe {
                libc::recv(
                    self.fd.as_raw_fd(),
                    buf.as_mut_ptr() as *mut libc::c_void,
                    buf.len(),
                    0,
                )
            };
            if n < 0 {
                let err = io::Error::last_os_error();
                if err.kind() == io::ErrorKind::Interrupted {
                    continue;
                }
                return Err(err);
            }
            buf.truncate(n as usize);
            return Ok(buf);
        }
    }

    fn pump(&mut self) -> io::Result<()> {
        let datagram = self.read_datagram()?;
        let (ack, bodies) = split_datagram(&datagram, self.seq)?;
        if ack.is_some() {
            self.ack = ack;
        }
        self.pending.extend(bodies);
        Ok(())
    }
}

impl Transport for NetlinkTransport {
    fn connect(&mut self) -> io::Result<()> {
        // SAFETY: sockaddr_nl is plain data; all-zero is a valid value.
        let mut addr: libc::sockaddr_nl = unsafe { mem::zeroed() };
        addr.nl_family = libc::AF_NETLINK as libc::sa_family_t;
        // SAFETY: `addr` outlives the call and the length matches its type.
        let rc = unsafe {
            libc::bind(
                self.fd.as_raw_fd(),
                &addr as *const libc::sockaddr_nl as *const libc::sockaddr,
                mem::size_of::<libc::sockaddr_nl>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    fn resolve_family(&mut self, name: &str) -> io::Result<Option<u16>> {
        let mut b = MessageBuilder::new(CTRL_CMD_GETFAMILY, CTRL_VERSION);
        b.put_string(CTRL_ATTR_FAMILY_NAME, name);
        let body = b.finish().map_err(invalid_data)?;
        self.send(GENL_ID_CTRL, &body)?;
        match self.wait_for_ack()? {
            Ack::Ok => {}
            Ack::Nack(status) if status == -libc::ENOENT => return Ok(None),
            Ack::Nack(status) => return Err(io::Error::from_raw_os_error(-status)),
        }
        let reply = self.recv()?;
        let msg = parse_message(&reply, &CTRL_POLICY).map_err(invalid_data)?;
        let id = match msg.get(CTRL_ATTR_FAMILY_ID) {
            Some(attr) => Some(attr.u16().map_err(invalid_data)?),
            None => None,
        };
        debug!(target: "ktf::netlink", family = name, id = ?id, "Resolved family");
        Ok(id)
    }

    fn send(&mut self, family: u16, body: &[u8]) -> io::Result<()> {
        self.seq = self.seq.wrapping_add(1);
        self.ack = None;
        self.pending.clear();
        let hdr = NlMsgHdr {
            len: (NLMSG_HDRLEN + body.len()) as u32,
            kind: family,
            flags: NLM_F_REQUEST | NLM_F_ACK,
            seq: self.seq,
            pid: 0,
        };
        let mut frame = Vec::with_capacity(NLMSG_HDRLEN + body.len());
        frame.extend_from_slice(&hdr.to_bytes());
        frame.extend_from_slice(body);
        // SAFETY: `frame` is valid for reads of `frame.len()` bytes.
        let n = unsafe {
            libc::send(
                self.fd.as_raw_fd(),
                frame.as_ptr() as *const libc::c_void,
                frame.len(),
                0,
            )
        };
        if n < 0 {
            return Err(io::Error::last_os_error());
        }
        if n as usize != frame.len() {
            return Err(io::Error::new(
                io::ErrorKind::WriteZero,
                format!("short netlink send: {} of {} bytes", n, frame.len()),
            ));
        }
        Ok(())
    }

    fn wait_for_ack(&mut self) -> io::Result<Ack> {
        loop {
            if let Some(ack) = self.ack.take() {
                return Ok(ack);
            }
            self.pump()?;
        }
    }

    fn recv(&mut self) -> io::Result<Vec<u8>> {
        loop {
            if let Some(body) = self.pending.pop_front() {
                return Ok(body);
            }
            self.pump()?;
        }
    }
}
