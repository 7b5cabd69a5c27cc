pub mod canvas;
pub mod cells;
pub mod config;
pub mod driver;
pub mod dwell;
pub mod pool;
pub mod viewport;

pub use canvas::*;
pub use cells::*;
pub use config::*;
pub use driver::*;
pub use dwell::*;
pub use pool::*;
pub use viewport::*;
