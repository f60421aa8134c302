//! API Module
//!
//! HTTP handlers and routing for the cache admin/debug surface.
//!
//! # Endpoints
//! - `GET /stats` - Cache statistics
//! - `POST /invalidate` - Invalidate keys by pattern
//! - `DELETE /clear` - Empty every backend
//! - `POST /cleanup` - Run an expiry sweep now
//! - `PUT /enabled` - Switch caching on or off
//! - `GET /health` - Health check endpoint

pub mod handlers;
pub mod routes;

pub use handlers::*;
pub use routes::create_router;
