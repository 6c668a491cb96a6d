pub mod audio_models;
pub mod config;
pub mod error;
pub mod saved_clip;
pub mod state;
