pub mod cache;
pub mod fetch;
pub mod lifecycle;
pub mod protocol;
pub mod queue;
pub mod request;
pub mod scheduler;

pub use cache::*;
pub use fetch::*;
pub use lifecycle::*;
pub use protocol::*;
pub use queue::*;
pub use request::*;
pub use scheduler::*;
