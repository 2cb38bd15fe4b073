// src/services/mod.rs
// DOCUMENTATION: Services module organization
// PURPOSE: Re-export service components

pub mod background;
pub mod diagnostics;
pub mod lifecycle;
pub mod rate_limiter;

pub use background::*;
pub use diagnostics::*;
pub use lifecycle::*;
pub use rate_limiter::*;
