pub mod config;
#[cfg(feature = "gpu")]
pub mod gpu;
pub mod session;

pub use config::{OrbitCamera, TimelineEvent, ViewConfig};
pub use session::{FrameClock, FrameReport, SessionStats, WireframeSession};
