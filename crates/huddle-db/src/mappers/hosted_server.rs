//! Hosted server entity <-> model mapper

use huddle_core::{DomainError, HostedServerRecord};

use super::narrow;
use crate::models::HostedServerModel;

impl TryFrom<HostedServerModel> for HostedServerRecord {
    type Error = DomainError;

    fn try_from(model: HostedServerModel) -> Result<Self, Self::Error> {
        Ok(HostedServerRecord::new(narrow(model.id, "hosted_servers.id")?))
    }
}
