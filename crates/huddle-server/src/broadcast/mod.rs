//! Periodic broadcast of new messages and heartbeat sweeps

mod scheduler;

pub use scheduler::{
    group_by_channel, split_batch, BroadcastScheduler, SchedulerConfig, TickReport,
    MAX_PUSH_BYTES,
};
