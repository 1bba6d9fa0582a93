//! Configurable contexts declared by the kernel agent

use ktf_core::{ConfigStatus, HandleId, TypeId};

/// A named configuration point of a handle
///
/// Names are unique within a handle only, so the handle is needed to
/// identify a context globally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurableContext {
    name: String,
    handle: HandleId,
    type_id: TypeId,
    status: ConfigStatus,
}

impl ConfigurableContext {
    pub(crate) fn new(name: &str, type_id: TypeId, handle: HandleId, status: ConfigStatus) -> Self {
        ConfigurableContext {
            name: name.to_string(),
            handle,
            type_id,
            status,
        }
    }

    /// Context name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning handle
    pub fn handle(&self) -> HandleId {
        self.handle
    }

    /// Type tag configurations must carry
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Last-known configuration status
    pub fn status(&self) -> ConfigStatus {
        self.status
    }

    /// Record a new configuration status
    pub fn set_status(&mut self, status: ConfigStatus) {
        self.status = status;
    }
}
