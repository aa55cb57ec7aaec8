pub mod parser;
pub mod review;
pub mod rules;
pub mod service;
pub mod when;

pub use parser::{CaptureParser, DayParts, ParsedCapture};
pub use review::{DumpReview, ReviewOutcome};
pub use service::{CaptureMode, CaptureOutcome, CaptureService};
