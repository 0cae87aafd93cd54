pub mod dtos;
pub mod filter;
pub mod handlers;
pub mod service;

pub use filter::{FilterError, FilterRequest, ItemQuery, Predicate, compose};
pub use service::{ItemChanges, ItemService, ItemServiceError};
