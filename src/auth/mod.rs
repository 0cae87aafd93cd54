pub mod dtos;
pub mod middleware;

pub use middleware::{LaterUser, USER_ID_HEADER, UserError};
