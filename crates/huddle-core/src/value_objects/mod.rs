//! Value objects - immutable types that represent domain concepts

mod bounded_name;
mod role;

pub use bounded_name::{BoundedName, NAME_CAPACITY};
pub use role::UserRole;
