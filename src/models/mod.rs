pub mod batch;
pub mod common;
pub mod generation;
pub mod task;

pub use batch::*;
pub use common::*;
pub use generation::*;
pub use task::*;
