pub mod budget;
pub mod event_bus;
pub mod metrics;
pub mod throttle;
pub mod work_queue;

pub use budget::*;
pub use event_bus::*;
pub use metrics::*;
pub use throttle::*;
pub use work_queue::*;
