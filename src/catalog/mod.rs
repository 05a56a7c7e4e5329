pub mod error;
pub mod manager;
pub mod memory;
pub mod model;
pub mod slug;
pub mod store;
pub mod tree;

pub use error::CategoryError;
pub use manager::{CategoryHierarchy, CategoryPage, ListQuery};
pub use model::{Category, CategoryNode, CategoryUpdate, NewCategory};
pub use store::{CategoryPatch, CategoryStore, ProductRegistry, StoreError, StoreResult};
pub use tree::RepairReport;
