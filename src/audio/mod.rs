// PCM handling for the dubbing stages that work on samples rather than files:
// - Track: WAV decode/encode and format conversion
// - Reconcile: forcing speech to the source duration
// - Mixer: background attenuation and overlay

pub mod mixer;
pub mod reconcile;
pub mod track;

pub use mixer::AudioMixer;
pub use reconcile::DurationReconciler;
pub use track::{frames_for_ms, probe_duration_ms, AudioTrack, TrackSource};
