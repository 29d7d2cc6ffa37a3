//! Microphone and camera capture
//!
//! - [`devices`]: capture data types and the device/sink traits
//! - [`pipeline`]: fixed-size audio chunking and the periodic video timer
//! - [`file`], [`still`]: file-backed devices for running without hardware

pub mod devices;
pub mod file;
pub mod jpeg;
pub mod pipeline;
pub mod still;

pub use devices::{
    AudioChunk, Camera, CaptureDevices, DeviceProvider, MediaSink, Microphone, SampleCallback,
    VideoFrame,
};
pub use file::{AudioFile, WavMicrophone};
pub use pipeline::{CapturePipeline, CaptureSettings};
pub use still::{BlankCamera, FileDevices, StillCamera};
