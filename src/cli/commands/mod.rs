pub mod categories;
pub mod migrate;
pub mod token;
