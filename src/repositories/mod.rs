pub mod item;
pub mod memory;

pub use item::{DuplicateItem, ItemRepository, ItemRepositoryTrait};
pub use memory::InMemoryItemRepository;
