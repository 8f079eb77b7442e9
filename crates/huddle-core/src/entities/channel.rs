//! Channel entity - a named message stream within a hosted server

use crate::value_objects::BoundedName;

/// Channel entity. The name is immutable once created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: u32,
    pub name: BoundedName,
    pub hosted_server_id: u16,
}

impl Channel {
    pub fn new(id: u32, name: BoundedName, hosted_server_id: u16) -> Self {
        Self {
            id,
            name,
            hosted_server_id,
        }
    }
}
