pub mod capture;

pub use capture::{Capture, CaptureError, CaptureSummary, JsonLinesSink, MetadataSink};
