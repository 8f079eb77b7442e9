//! User entity <-> model mapper

use std::net::IpAddr;

use huddle_core::{BoundedName, DomainError, UserRecord, UserRole};

use super::narrow;
use crate::models::UserModel;

impl TryFrom<UserModel> for UserRecord {
    type Error = DomainError;

    fn try_from(model: UserModel) -> Result<Self, Self::Error> {
        let ip_address: IpAddr = model.ip_address.parse().map_err(|_| {
            DomainError::DatabaseError(format!("unparsable ip_address '{}'", model.ip_address))
        })?;
        let role = UserRole::from_i64(model.user_type)
            .ok_or_else(|| DomainError::InvalidRole(model.user_type.to_string()))?;

        Ok(UserRecord::new(
            narrow(model.id, "hosted_server_users.id")?,
            narrow(model.server_id, "hosted_server_users.server_id")?,
            BoundedName::new(model.username)?,
            ip_address,
        )
        .with_role(role))
    }
}
