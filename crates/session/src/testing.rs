//! Testing utilities for the session layer
//!
//! [`ScriptedTransport`] stands in for the kernel agent: tests queue the
//! acknowledgement (and optional response body) for each upcoming request,
//! then inspect what was sent.
//!
//! # Example
//!
//! ```ignore
//! use ktf_session::testing::ScriptedTransport;
//! use ktf_session::ControlSession;
//!
//! let agent = ScriptedTransport::new();
//! agent.push_reply(response_bytes);
//! let mut session = ControlSession::connect(Box::new(agent.clone()), "ktf")?;
//! let response = session.send_and_await(&request)?;
//! assert_eq!(agent.sent().len(), 1);
//! ```

use std::collections::{HashMap, VecDeque};
use std::io;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::transport::{Ack, Transport};

/// Reply scripted for one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedReply {
    /// Acknowledgement status, 0 for success
    pub ack: i32,
    /// Response body, if the agent sends one
    pub body: Option<Vec<u8>>,
}

#[derive(Debug, Default)]
struct Script {
    replies: VecDeque<ScriptedReply>,
    current: Option<ScriptedReply>,
    sent: Vec<Vec<u8>>,
    families: HashMap<String, u16>,
    refuse_connect: bool,
    bodies_read: usize,
}

/// In-memory transport replaying scripted replies
///
/// Clones share state, so a test keeps one handle while the session owns
/// another.
#[derive(Debug, Clone)]
pub struct ScriptedTransport {
    inner: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    /// Family id registered for `"ktf"` by [`new`](Self::new)
    pub const DEFAULT_FAMILY_ID: u16 = 0x20;

    /// Transport that knows the `"ktf"` family
    pub fn new() -> Self {
        let t = ScriptedTransport {
            inner: Arc::new(Mutex::new(Script::default())),
        };
        t.register_family("ktf", Self::DEFAULT_FAMILY_ID);
        t
    }

    /// Make `name` resolvable to `id`
    pub fn register_family(&self, name: &str, id: u16) {
        self.inner.lock().families.insert(name.to_string(), id);
    }

    /// Fail the next `connect`
    pub fn refuse_connect(&self) {
        self.inner.lock().refuse_connect = true;
    }

    /// Queue a positive ack followed by `body`
    pub fn push_reply(&self, body: Vec<u8>) {
        self.push(ScriptedReply {
            ack: 0,
            body: Some(body),
        });
    }

    /// Queue an ack with no body
    pub fn push_ack(&self, status: i32) {
        self.push(ScriptedReply {
            ack: status,
            body: None,
        });
    }

    /// Queue a negative ack with no body
    pub fn push_nack(&self, status: i32) {
        self.push_ack(status);
    }

    /// Queue a negative ack that is nevertheless followed by a body
    pub fn push_nack_with_body(&self, status: i32, body: Vec<u8>) {
        self.push(ScriptedReply {
            ack: status,
            body: Some(body),
        });
    }

    /// Queue an arbitrary reply
    pub fn push(&self, reply: ScriptedReply) {
        self.inner.lock().replies.push_back(reply);
    }

    /// Request bodies sent so far
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.inner.lock().sent.clone()
    }

    /// Number of response bodies handed to the session
    pub fn bodies_read(&self) -> usize {
        self.inner.lock().bodies_read
    }

    /// Replies queued but not yet consumed by a request
    pub fn pending_replies(&self) -> usize {
        self.inner.lock().replies.len()
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for ScriptedTransport {
    fn connect(&mut self) -> io::Result<()> {
        if self.inner.lock().refuse_connect {
            return Err(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "scripted connect failure",
            ));
        }
        Ok(())
    }

    fn resolve_family(&mut self, name: &str) -> io::Result<Option<u16>> {
        Ok(self.inner.lock().families.get(name).copied())
    }

    fn send(&mut self, _family: u16, body: &[u8]) -> io::Result<()> {
        let mut script = self.inner.lock();
        script.sent.push(body.to_vec());
        let next = script.replies.pop_front();
        script.current = next;
        Ok(())
    }

    fn wait_for_ack(&mut self) -> io::Result<Ack> {
        let script = self.inner.lock();
        match &script.current {
            Some(reply) if reply.ack == 0 => Ok(Ack::Ok),
            Some(reply) => Ok(Ack::Nack(reply.ack)),
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "no scripted reply for request",
            )),
        }
    }

    fn recv(&mut self) -> io::Result<Vec<u8>> {
        let mut script = self.inner.lock();
        let body = script.current.as_mut().and_then(|reply| reply.body.take());
        match body {
            Some(body) => {
                script.bodies_read += 1;
                Ok(body)
            }
            None => Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "no scripted response body",
            )),
        }
    }
}
