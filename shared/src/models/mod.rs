//! Domain models for the farm advisory platform

mod advisory;
mod alert;
mod conversation;
mod crop;
mod prediction;
mod vegetation;

pub use advisory::*;
pub use alert::*;
pub use conversation::*;
pub use crop::*;
pub use prediction::*;
pub use vegetation::*;
