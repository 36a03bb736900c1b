//! Flow nodes: timing and sinks.

mod delay;
mod preview;

pub use delay::DelayNode;
pub use preview::PreviewNode;
