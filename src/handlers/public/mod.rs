// handlers/public/mod.rs - Public handlers (no authentication required)
//
// Read-only catalog browsing plus the service info and health endpoints.
//
// Security Level: None
// Route Prefix: /api/v1/categories (GET only), /, /health

pub mod categories;
pub mod service;

pub use categories::{ancestors as category_ancestors, list as category_list, show as category_show, tree as category_tree};
pub use service::{health, not_found, root};
