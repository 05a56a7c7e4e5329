// handlers/protected/mod.rs - Protected handlers (admin JWT required)
//
// Security Level: Bearer JWT, role == "admin"
// Route Prefix: /api/v1/categories
// Middleware: jwt_auth_middleware, then require_admin

pub mod categories;

pub use categories::{
    analytics as category_analytics, bulk_update as category_bulk_update, create as category_create,
    delete as category_delete, descendants as category_descendants, repair as category_repair,
    update as category_update,
};
