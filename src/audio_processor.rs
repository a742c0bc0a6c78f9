//! Audio decoding, millisecond-range slicing, and encoding.
//!
//! Decoding goes through symphonia and supports WAV, FLAC, MP3, AAC/M4A and
//! OGG inputs. Encoding goes through hound and supports WAV output only;
//! any other requested format is an [`AudioError::UnsupportedFormat`].

use std::fs::File;
use std::path::Path;

use hound::{SampleFormat, WavSpec, WavWriter};
use symphonia::core::audio::{AudioBuffer, AudioBufferRef, Signal};
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::sample::Sample;

use crate::error::AudioError;

/// An in-memory audio clip: mono f32 samples in `[-1.0, 1.0]` plus the
/// sample rate they were decoded at.
#[derive(Debug, Clone)]
pub struct AudioClip {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioClip {
    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Clip duration in milliseconds.
    pub fn duration_ms(&self) -> i64 {
        self.samples.len() as i64 * 1000 / i64::from(self.sample_rate)
    }

    /// Extract the `[start_ms, end_ms)` range as a new clip.
    ///
    /// Offsets follow Python slice semantics: out-of-range values are clamped
    /// to the clip length, negative values count from the end, and an
    /// inverted or empty range yields an empty clip. This never fails.
    pub fn slice_ms(&self, start_ms: i64, end_ms: i64) -> AudioClip {
        let start = self.resolve_ms(start_ms);
        let end = self.resolve_ms(end_ms);
        let samples = if start < end {
            self.samples[start..end].to_vec()
        } else {
            Vec::new()
        };
        AudioClip {
            samples,
            sample_rate: self.sample_rate,
        }
    }

    /// Resolve a millisecond offset to a clamped sample index.
    fn resolve_ms(&self, offset_ms: i64) -> usize {
        let len = self.samples.len() as i64;
        let pos = offset_ms.saturating_mul(i64::from(self.sample_rate)) / 1000;
        let pos = if pos < 0 { len.saturating_add(pos) } else { pos };
        pos.clamp(0, len) as usize
    }

    /// Encode the clip to `path` in the requested format.
    ///
    /// # Errors
    ///
    /// Returns an error when the format has no encoder, the output directory
    /// cannot be created, or the encoder fails.
    pub fn export(&self, path: &Path, format: &str) -> Result<(), AudioError> {
        match format {
            "wav" | "wave" => self.write_wav(path),
            other => Err(AudioError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }

    /// Write the clip as 16-bit PCM mono WAV.
    fn write_wav(&self, path: &Path) -> Result<(), AudioError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|source| AudioError::CreateDir {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        let spec = WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 16,
            sample_format: SampleFormat::Int,
        };
        let wav_err = |source| AudioError::WavWrite {
            path: path.to_path_buf(),
            source,
        };

        let mut writer = WavWriter::create(path, spec).map_err(wav_err)?;
        for &sample in &self.samples {
            let quantized = (sample.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16;
            writer.write_sample(quantized).map_err(wav_err)?;
        }
        writer.finalize().map_err(wav_err)
    }
}

/// Decode an audio file to a mono [`AudioClip`].
///
/// # Errors
///
/// Returns an error when the file cannot be opened or probed, holds no audio
/// track, or fails to decode.
pub fn load_audio_file(path: &Path) -> Result<AudioClip, AudioError> {
    let open_err = |source: Box<dyn std::error::Error + Send + Sync>| AudioError::Open {
        path: path.to_path_buf(),
        source,
    };
    let decode_err = |source: Box<dyn std::error::Error + Send + Sync>| AudioError::Decode {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(|e| open_err(Box::new(e)))?;
    let mss = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe()
        .format(
            &hint,
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| open_err(Box::new(e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::NoAudioTrack {
            path: path.to_path_buf(),
        })?;
    let track_id = track.id;
    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| decode_err("missing sample rate".into()))?;
    if sample_rate == 0 {
        return Err(decode_err("sample rate is zero".into()));
    }
    let channels = track
        .codec_params
        .channels
        .map_or(1, symphonia::core::audio::Channels::count);

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| decode_err(Box::new(e)))?;

    let mut samples = Vec::new();
    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(decode_err(Box::new(e))),
        };
        if packet.track_id() != track_id {
            continue;
        }
        let decoded = decoder
            .decode(&packet)
            .map_err(|e| decode_err(Box::new(e)))?;
        push_mono(&decoded, channels, &mut samples);
    }

    Ok(AudioClip {
        samples,
        sample_rate,
    })
}

/// Append a decoded buffer to `out`, downmixing to mono f32. Every sample
/// layout symphonia can emit is normalized to `[-1.0, 1.0]`.
fn push_mono(buffer: &AudioBufferRef, channels: usize, out: &mut Vec<f32>) {
    match buffer {
        AudioBufferRef::U8(buf) => mix(buf, channels, out, |s| (f32::from(s) - 128.0) / 128.0),
        AudioBufferRef::U16(buf) => {
            mix(buf, channels, out, |s| (f32::from(s) - 32_768.0) / 32_768.0)
        }
        AudioBufferRef::U24(buf) => mix(buf, channels, out, |s| {
            (s.inner() as f32 - 8_388_608.0) / 8_388_608.0
        }),
        AudioBufferRef::U32(buf) => mix(buf, channels, out, |s| {
            ((f64::from(s) - 2_147_483_648.0) / 2_147_483_648.0) as f32
        }),
        AudioBufferRef::S8(buf) => mix(buf, channels, out, |s| f32::from(s) / 128.0),
        AudioBufferRef::S16(buf) => mix(buf, channels, out, |s| f32::from(s) / 32_768.0),
        AudioBufferRef::S24(buf) => mix(buf, channels, out, |s| s.inner() as f32 / 8_388_608.0),
        AudioBufferRef::S32(buf) => mix(buf, channels, out, |s| s as f32 / 2_147_483_648.0),
        AudioBufferRef::F32(buf) => mix(buf, channels, out, |s| s),
        AudioBufferRef::F64(buf) => mix(buf, channels, out, |s| s as f32),
    }
}

fn mix<S, F>(buf: &AudioBuffer<S>, channels: usize, out: &mut Vec<f32>, to_f32: F)
where
    S: Sample,
    F: Fn(S) -> f32,
{
    if channels <= 1 {
        out.extend(buf.chan(0).iter().map(|&s| to_f32(s)));
        return;
    }
    for frame in 0..buf.frames() {
        let sum: f32 = (0..channels).map(|ch| to_f32(buf.chan(ch)[frame])).sum();
        out.push(sum / channels as f32);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // One sample per millisecond keeps offsets readable.
    fn clip_of_ms(duration_ms: usize) -> AudioClip {
        AudioClip {
            samples: vec![0.25; duration_ms],
            sample_rate: 1000,
        }
    }

    #[test]
    fn slices_requested_range() {
        let clip = clip_of_ms(10_000);
        assert_eq!(clip.slice_ms(2_000, 7_000).duration_ms(), 5_000);
    }

    #[test]
    fn out_of_range_end_is_clamped() {
        let clip = clip_of_ms(3_000);
        assert_eq!(clip.slice_ms(1_000, 60_000).duration_ms(), 2_000);
    }

    #[test]
    fn inverted_range_yields_empty_clip() {
        let clip = clip_of_ms(5_000);
        assert_eq!(clip.slice_ms(4_000, 1_000).duration_ms(), 0);
    }

    #[test]
    fn negative_offsets_count_from_the_end() {
        let clip = clip_of_ms(10_000);
        assert_eq!(clip.slice_ms(-3_000, -1_000).duration_ms(), 2_000);
    }

    #[test]
    fn extreme_offsets_do_not_panic() {
        let clip = clip_of_ms(1_000);
        assert_eq!(clip.slice_ms(i64::MIN, i64::MAX).duration_ms(), 1_000);
    }

    #[test]
    fn export_rejects_unknown_format() {
        let dir = tempfile::tempdir().unwrap();
        let clip = clip_of_ms(100);
        let err = clip
            .export(&dir.path().join("clip.xyz"), "xyz")
            .unwrap_err();
        assert!(matches!(err, AudioError::UnsupportedFormat { .. }));
    }

    #[test]
    fn wav_export_roundtrips_through_decoder() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let clip = AudioClip {
            samples: (0..8000)
                .map(|i| (i as f32 * 0.05).sin() * 0.5)
                .collect(),
            sample_rate: 8000,
        };
        clip.export(&path, "wav").unwrap();

        let reloaded = load_audio_file(&path).unwrap();
        assert_eq!(reloaded.sample_rate(), 8000);
        assert_eq!(reloaded.duration_ms(), 1_000);
    }

    #[test]
    fn decodes_24_bit_wav_input() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deep.wav");
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 24,
            sample_format: SampleFormat::Int,
        };
        let mut writer = WavWriter::create(&path, spec).unwrap();
        for i in 0..8000i32 {
            let sample = ((i as f32 * 0.05).sin() * 4_000_000.0) as i32;
            writer.write_sample(sample).unwrap();
        }
        writer.finalize().unwrap();

        let clip = load_audio_file(&path).unwrap();
        assert_eq!(clip.duration_ms(), 1_000);
        let peak = clip.samples.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        assert!(peak > 0.4, "24-bit samples lost in downmix: peak {peak}");
    }

    #[test]
    fn empty_clip_exports_a_valid_header_only_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.wav");
        clip_of_ms(0).export(&path, "wav").unwrap();

        let reloaded = load_audio_file(&path).unwrap();
        assert_eq!(reloaded.duration_ms(), 0);
    }

    #[test]
    fn load_fails_on_missing_file() {
        let err = load_audio_file(Path::new("no/such/file.wav")).unwrap_err();
        assert!(matches!(err, AudioError::Open { .. }));
    }

    #[test]
    fn load_fails_on_non_audio_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("not-audio.wav");
        std::fs::write(&path, b"definitely not a riff header").unwrap();
        assert!(load_audio_file(&path).is_err());
    }
}
