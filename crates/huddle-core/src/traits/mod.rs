//! Ports the engine consumes from infrastructure

mod gateway;

pub use gateway::{
    ChannelFilter, MessageFilter, PersistenceGateway, RepoResult, SharedGateway, UserFilter,
};
