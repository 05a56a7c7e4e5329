// handlers/mod.rs - Two-tier handler layout
//
// Public (no auth) → Protected (Bearer JWT with the admin role)
//
pub mod public;    // Catalog browsing, service info and health
pub mod protected; // Category administration (/api/v1/categories, admin only)
