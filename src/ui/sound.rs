/// Sound engine: procedural 8-bit style cues via rodio.
///
/// Cues are looked up by name (`AudioCue::name()` plus the two
/// presentation-only cues below). All buffers are generated as in-memory
/// WAV data at init time; playback is fire-and-forget through a detached
/// Sink.
///
/// Build without the "sound" feature to get the silent stub.

/// Played when a life indicator goes out.
pub const CUE_LIFE_LOST: &str = "life-lost";
/// Played when a level finishes loading.
pub const CUE_LEVEL_START: &str = "level-start";

#[cfg(feature = "sound")]
mod inner {
    use std::collections::HashMap;
    use std::io::Cursor;
    use std::sync::Arc;

    use log::{debug, warn};
    use rodio::{OutputStream, OutputStreamHandle, Sink};

    use blocklift::sim::event::AudioCue;

    const SAMPLE_RATE: u32 = 22050;
    const TAU: f32 = 2.0 * std::f32::consts::PI;

    pub struct SoundEngine {
        _stream: OutputStream,
        handle: OutputStreamHandle,
        cues: HashMap<&'static str, Arc<Vec<u8>>>,
    }

    impl SoundEngine {
        pub fn new() -> Option<Self> {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(pair) => pair,
                Err(e) => {
                    warn!("no audio output: {e}");
                    return None;
                }
            };

            let mut cues = HashMap::new();
            cues.insert(AudioCue::Crush.name(), Arc::new(make_wav(&gen_crush())));
            cues.insert(AudioCue::ItemCollected.name(), Arc::new(make_wav(&gen_item())));
            cues.insert(super::CUE_LIFE_LOST, Arc::new(make_wav(&gen_life_lost())));
            cues.insert(super::CUE_LEVEL_START, Arc::new(make_wav(&gen_level_start())));

            Some(SoundEngine { _stream: stream, handle, cues })
        }

        pub fn play(&self, name: &str) {
            let Some(buf) = self.cues.get(name) else {
                debug!("no sound for cue {name:?}");
                return;
            };
            if let Ok(sink) = Sink::try_new(&self.handle) {
                let cursor = Cursor::new(buf.as_ref().clone());
                if let Ok(src) = rodio::Decoder::new(cursor) {
                    sink.append(src);
                    sink.detach();
                }
            }
        }
    }

    // ════════════════════════════════════════════════════════════
    //  Waveform generators: mono f32 samples
    // ════════════════════════════════════════════════════════════

    /// Crush: low thud, noise over a falling tone
    fn gen_crush() -> Vec<f32> {
        let n = (SAMPLE_RATE as f32 * 0.18) as usize;
        let mut rng: u32 = 2024;
        (0..n)
            .map(|i| {
                let t = i as f32 / n as f32;
                let freq = 160.0 - t * 110.0;
                let ti = i as f32 / SAMPLE_RATE as f32;
                let tone = (ti * freq * TAU).sin();
                rng = rng.wrapping_mul(1103515245).wrapping_add(12345);
                let noise = (rng as f32 / u32::MAX as f32) * 2.0 - 1.0;
                let env = (1.0 - t).powf(1.5);
                (tone * 0.6 + noise * 0.4) * env * 0.35
            })
            .collect()
    }

    /// Item collected: quick rising arpeggio E6→G6→C7
    fn gen_item() -> Vec<f32> {
        notes(&[(1319.0, 0.04), (1568.0, 0.04), (2093.0, 0.07)], 0.22)
    }

    /// Life lost: falling minor third
    fn gen_life_lost() -> Vec<f32> {
        notes(&[(392.0, 0.12), (330.0, 0.22)], 0.3)
    }

    /// Level start: C5→E5→G5
    fn gen_level_start() -> Vec<f32> {
        notes(&[(523.0, 0.08), (659.0, 0.08), (784.0, 0.16)], 0.25)
    }

    /// Sine plus a touch of third harmonic, each note fading out.
    fn notes(seq: &[(f32, f32)], volume: f32) -> Vec<f32> {
        let mut samples = Vec::new();
        for &(freq, dur) in seq {
            let n = (SAMPLE_RATE as f32 * dur) as usize;
            for i in 0..n {
                let t = i as f32 / SAMPLE_RATE as f32;
                let env = 1.0 - (i as f32 / n as f32).powf(0.5);
                let wave = (t * freq * TAU).sin() * 0.75 + (t * freq * 3.0 * TAU).sin() * 0.25;
                samples.push(wave * env * volume);
            }
        }
        samples
    }

    // ════════════════════════════════════════════════════════════
    //  WAV encoder: 16-bit PCM mono
    // ════════════════════════════════════════════════════════════

    pub(super) fn make_wav(samples: &[f32]) -> Vec<u8> {
        let num_channels: u16 = 1;
        let bits_per_sample: u16 = 16;
        let byte_rate = SAMPLE_RATE * (num_channels as u32) * (bits_per_sample as u32) / 8;
        let block_align = num_channels * bits_per_sample / 8;
        let data_size = samples.len() as u32 * 2;
        let file_size = 36 + data_size;

        let mut buf = Vec::with_capacity(44 + data_size as usize);

        buf.extend_from_slice(b"RIFF");
        buf.extend_from_slice(&file_size.to_le_bytes());
        buf.extend_from_slice(b"WAVE");

        buf.extend_from_slice(b"fmt ");
        buf.extend_from_slice(&16u32.to_le_bytes());
        buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
        buf.extend_from_slice(&num_channels.to_le_bytes());
        buf.extend_from_slice(&SAMPLE_RATE.to_le_bytes());
        buf.extend_from_slice(&byte_rate.to_le_bytes());
        buf.extend_from_slice(&block_align.to_le_bytes());
        buf.extend_from_slice(&bits_per_sample.to_le_bytes());

        buf.extend_from_slice(b"data");
        buf.extend_from_slice(&data_size.to_le_bytes());

        for &s in samples {
            let val = (s.clamp(-1.0, 1.0) * 32767.0) as i16;
            buf.extend_from_slice(&val.to_le_bytes());
        }

        buf
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn wav_header_matches_payload() {
            let wav = make_wav(&gen_crush());
            assert_eq!(&wav[0..4], b"RIFF");
            assert_eq!(&wav[8..12], b"WAVE");
            let data_size = u32::from_le_bytes([wav[40], wav[41], wav[42], wav[43]]) as usize;
            assert_eq!(wav.len(), 44 + data_size);
        }

        #[test]
        fn samples_stay_in_range() {
            for s in gen_item().into_iter().chain(gen_crush()).chain(gen_level_start()) {
                assert!((-1.0..=1.0).contains(&s));
            }
        }
    }
}

// ════════════════════════════════════════════════════════════
//  Public API: no-ops when the sound feature is off
// ════════════════════════════════════════════════════════════

#[cfg(feature = "sound")]
pub use inner::SoundEngine;

#[cfg(not(feature = "sound"))]
pub struct SoundEngine;

#[cfg(not(feature = "sound"))]
impl SoundEngine {
    pub fn new() -> Option<Self> { Some(SoundEngine) }
    pub fn play(&self, _name: &str) {}
}
