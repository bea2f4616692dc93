//! dubar - English to Arabic video dubbing
//!
//! Extracts the audio of an English video, separates the background,
//! transcribes, corrects and translates the speech, synthesizes Arabic
//! speech for the quoted segments, fits it to the source duration, mixes it
//! over the background and remuxes it with the original video stream.

pub mod artifact;
pub mod audio;
pub mod cli;
pub mod config;
pub mod error;
pub mod media;
pub mod naming;
pub mod pipeline;
pub mod service;
pub mod speech;
pub mod workflow;
