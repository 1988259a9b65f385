pub mod common;
pub mod record;

pub use common::*;
pub use record::*;
