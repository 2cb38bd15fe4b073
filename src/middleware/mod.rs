// src/middleware/mod.rs
// DOCUMENTATION: Middleware module organization
// PURPOSE: Re-export request middleware

pub mod cors;
pub mod rate_limit;

pub use cors::enable_cors;
pub use rate_limit::rate_limit;
