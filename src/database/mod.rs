pub mod categories;
pub mod manager;
pub mod products;

pub use categories::PgCategoryStore;
pub use manager::{DatabaseError, DatabaseManager};
pub use products::PgProductRegistry;
