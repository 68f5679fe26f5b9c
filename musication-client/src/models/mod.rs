//! Client-side data models

pub mod audio_file;

pub use audio_file::AudioFile;
