use tracing::{debug, info};

use super::track::{frames_for_ms, AudioTrack};

/// Forces synthesized speech to the duration of the reference audio.
///
/// Shorter speech is padded with trailing silence, longer speech is cut
/// hard at the reference length. There is no time-stretching: a speech-rate
/// mismatch is audible but tolerated. Implementations wanting a tighter fit
/// would resample (atempo) the speech instead of cutting it.
pub struct DurationReconciler;

impl DurationReconciler {
    pub fn reconcile(mut track: AudioTrack, reference_duration_ms: u64) -> AudioTrack {
        let current_ms = track.duration_ms();
        let target_frames = frames_for_ms(reference_duration_ms, track.sample_rate());
        let current_frames = track.frames();

        if current_frames < target_frames {
            debug!(
                "Padding speech from {} ms to {} ms with silence",
                current_ms, reference_duration_ms
            );
            track.pad_frames(target_frames - current_frames);
        } else {
            if current_ms > reference_duration_ms {
                info!(
                    "Speech runs {} ms past the source audio, cutting at {} ms",
                    current_ms - reference_duration_ms,
                    reference_duration_ms
                );
            }
            track.truncate_frames(target_frames);
        }

        track
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::TrackSource;

    fn ramp(duration_ms: u64, rate: u32) -> AudioTrack {
        let frames = frames_for_ms(duration_ms, rate);
        let samples = (0..frames).map(|i| (i % 30000) as i16 + 1).collect();
        AudioTrack::new(samples, rate, 1, TrackSource::Synthesized).unwrap()
    }

    #[test]
    fn test_pads_short_speech_with_trailing_silence() {
        let track = ramp(4000, 16000);
        let original = track.samples().to_vec();

        let result = DurationReconciler::reconcile(track, 6500);

        assert_eq!(result.duration_ms(), 6500);
        assert_eq!(&result.samples()[..original.len()], original.as_slice());
        let tail = &result.samples()[original.len()..];
        assert_eq!(tail.len(), frames_for_ms(2500, 16000));
        assert!(tail.iter().all(|s| *s == 0));
    }

    #[test]
    fn test_truncates_long_speech_without_fade() {
        let track = ramp(9000, 16000);
        let original = track.samples().to_vec();

        let result = DurationReconciler::reconcile(track, 5000);

        assert_eq!(result.duration_ms(), 5000);
        assert_eq!(result.samples(), &original[..result.samples().len()]);
    }

    #[test]
    fn test_duration_is_exact_for_awkward_rates() {
        for rate in [22050, 44100, 24000] {
            for (speech, reference) in [(0, 0), (0, 1234), (1001, 1000), (333, 334), (5000, 0)] {
                let result = DurationReconciler::reconcile(ramp(speech, rate), reference);
                assert_eq!(result.duration_ms(), reference, "rate {} speech {}", rate, speech);
            }
        }
    }

    #[test]
    fn test_equal_length_is_unchanged() {
        let track = ramp(1000, 16000);
        let result = DurationReconciler::reconcile(track.clone(), 1000);
        assert_eq!(result, track);
    }
}
