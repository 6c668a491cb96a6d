pub mod capture_source;
pub mod clip_writer;
pub mod encryptor;
pub mod playback_sink;
pub mod recorder_delegate;
