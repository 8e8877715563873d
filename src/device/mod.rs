pub mod user_agent;
pub mod detection;
pub mod merge;

pub use detection::{detect_device, ClientHints};
pub use merge::merge_device_data;
