//! Request handlers.

pub mod clip;
pub mod health;
pub mod status;
pub mod submit;

pub use clip::*;
pub use health::*;
pub use status::*;
pub use submit::*;
