mod incident;
mod kind;
mod manifest;

pub use incident::*;
pub use kind::*;
pub use manifest::*;
