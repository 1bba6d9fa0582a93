//! Request/acknowledgement/response sequencing

use ktf_core::{Error, Result, SetupStage};
use tracing::{debug, error, info};

use crate::transport::{Ack, Transport};

/// Session with the kernel agent
///
/// Every round trip waits for the transport acknowledgement before reading a
/// response. Reading the response directly could pick up a late ack of this
/// request as if it were the next request's payload.
pub struct ControlSession {
    transport: Box<dyn Transport>,
    family: u16,
    family_name: String,
}

impl ControlSession {
    /// Establish the channel and resolve the agent's family
    ///
    /// # Errors
    ///
    /// Returns [`Error::Setup`] naming the failed step.
    pub fn connect(mut transport: Box<dyn Transport>, family_name: &str) -> Result<Self> {
        transport
            .connect()
            .map_err(|e| Error::setup(SetupStage::Connect, e))?;
        let family = match transport.resolve_family(family_name) {
            Ok(Some(id)) if id > 0 => id,
            Ok(_) => {
                return Err(Error::setup(
                    SetupStage::ResolveFamily,
                    format!(
                        "protocol family for {} not found - is the {} module loaded?",
                        family_name, family_name
                    ),
                ))
            }
            Err(e) => return Err(Error::setup(SetupStage::ResolveFamily, e)),
        };
        info!(target: "ktf::session", family = family_name, id = family, "Connected to kernel agent");
        Ok(ControlSession {
            transport,
            family,
            family_name: family_name.to_string(),
        })
    }

    /// Like [`connect`](Self::connect), but terminates the process on failure
    ///
    /// Nothing can run without a live agent, so callers that cannot proceed
    /// anyway use this at startup.
    pub fn connect_or_exit(transport: Box<dyn Transport>, family_name: &str) -> Self {
        match Self::connect(transport, family_name) {
            Ok(session) => session,
            Err(e) => {
                error!(target: "ktf::session", error = %e, "Cannot operate without the kernel agent");
                std::process::exit(1);
            }
        }
    }

    /// Open a generic netlink channel to `family_name`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Setup`] if the socket cannot be allocated or any
    /// later setup step fails.
    #[cfg(target_os = "linux")]
    pub fn open(family_name: &str) -> Result<Self> {
        let transport = crate::NetlinkTransport::new()
            .map_err(|e| Error::setup(SetupStage::Allocate, e))?;
        Self::connect(Box::new(transport), family_name)
    }

    /// Like [`open`](Self::open), but terminates the process on failure
    #[cfg(target_os = "linux")]
    pub fn open_or_exit(family_name: &str) -> Self {
        match Self::open(family_name) {
            Ok(session) => session,
            Err(e) => {
                error!(target: "ktf::session", error = %e, "Cannot operate without the kernel agent");
                std::process::exit(1);
            }
        }
    }

    /// Resolved family id
    pub fn family(&self) -> u16 {
        self.family
    }

    /// Family name the session was opened for
    pub fn family_name(&self) -> &str {
        &self.family_name
    }

    /// Send a request, wait for its ack, then return exactly one response
    ///
    /// # Errors
    ///
    /// A negative ack fails with [`Error::Nack`] without reading a response.
    pub fn send_and_await(&mut self, request: &[u8]) -> Result<Vec<u8>> {
        self.transmit_and_ack(request)?;
        let response = self.transport.recv()?;
        debug!(target: "ktf::session", len = response.len(), "Received response");
        Ok(response)
    }

    /// Send a request whose only reply is the acknowledgement
    pub fn send_and_ack(&mut self, request: &[u8]) -> Result<()> {
        self.transmit_and_ack(request)
    }

    /// Send a request, wait for its ack, then read and discard one response
    pub fn send_and_drain(&mut self, request: &[u8]) -> Result<()> {
        self.transmit_and_ack(request)?;
        let drained = self.transport.recv()?;
        debug!(target: "ktf::session", len = drained.len(), "Drained response");
        Ok(())
    }

    fn transmit_and_ack(&mut self, request: &[u8]) -> Result<()> {
        debug!(target: "ktf::session", len = request.len(), "Sending request");
        self.transport.send(self.family, request)?;
        match self.transport.wait_for_ack()? {
            Ack::Ok => Ok(()),
            Ack::Nack(status) => {
                debug!(target: "ktf::session", status, "Request rejected");
                Err(Error::Nack { status })
            }
        }
    }
}

impl std::fmt::Debug for ControlSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlSession")
            .field("family", &self.family)
            .field("family_name", &self.family_name)
            .finish()
    }
}
