pub mod capture;
pub mod controller;
pub mod loop_worker;
pub mod pipeline;
pub mod state;

pub use capture::{CaptureController, DirectoryFrameSource, FrameSource};
pub use controller::{FrameOutcome, ScanController};
pub use state::{SessionSnapshot, SessionState};
