pub mod data;
pub mod task;

pub use data::{DataCommand, DataResult};
pub use task::{TaskCommand, TaskResult};
