use tracing::debug;

use crate::error::Result;
use super::track::{AudioTrack, TrackSource};

/// Overlays synthesized speech on an attenuated background track.
pub struct AudioMixer {
    attenuation_db: f64,
}

impl AudioMixer {
    pub fn new(attenuation_db: f64) -> Self {
        Self { attenuation_db }
    }

    /// Linear gain applied to the background.
    pub fn background_gain(&self) -> f64 {
        10f64.powf(-self.attenuation_db / 20.0)
    }

    /// Attenuate `background`, then overlay `foreground` at full amplitude from offset 0.
    ///
    /// The result uses the background's sample rate and channel layout and is as
    /// long as the longer input; the shorter one contributes silence past its end.
    /// Sums are clipped to the 16-bit range.
    pub fn mix(&self, background: &AudioTrack, foreground: &AudioTrack) -> Result<AudioTrack> {
        let rate = background.sample_rate();
        let channels = background.channels();
        let foreground = foreground.convert(rate, channels)?;
        let gain = self.background_gain();

        debug!(
            "Mixing {} ms background (gain {:.3}) with {} ms foreground",
            background.duration_ms(),
            gain,
            foreground.duration_ms()
        );

        let bg = background.samples();
        let fg = foreground.samples();
        let len = bg.len().max(fg.len());

        let samples = (0..len)
            .map(|i| {
                let b = bg.get(i).map_or(0.0, |s| (*s as f64 * gain).round());
                let f = fg.get(i).map_or(0.0, |s| *s as f64);
                (b + f).clamp(i16::MIN as f64, i16::MAX as f64) as i16
            })
            .collect();

        AudioTrack::new(samples, rate, channels, TrackSource::Mixed)
    }
}
