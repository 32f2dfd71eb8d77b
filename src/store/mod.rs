pub mod entity;
pub mod repository;

pub use entity::{Store, StorePatch, StoreRecord};
pub use repository::StoreRepository;
