pub mod arena;
pub mod grid;
pub mod handles;
pub mod math;
pub mod time;

// Foundation crate: small, well-tested primitives only.
pub use arena::*;
pub use grid::*;
pub use handles::*;
pub use time::*;
