//! Decoding and playing synthesized audio

use std::{io::Cursor, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::Notify;
use tracing::debug;

use super::{AudioFormat, SpeechError, SpeechResult};

/// Assumed MP3 bitrate (128 kbps) for clips whose length can't be read from a header
const MP3_BYTES_PER_SEC: usize = 16_000;

/// Decoded (or, for MP3, sniffed) synthesis output
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub format: AudioFormat,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    /// Interleaved PCM; empty for MP3 and non 16-bit WAV
    pub samples: Vec<i16>,
    pub duration: Option<Duration>,
    pub encoded: Bytes,
}

impl AudioClip {
    /// Header duration, or a bitrate estimate for MP3
    pub fn play_time(&self) -> Duration {
        self.duration.unwrap_or_else(|| {
            Duration::from_millis((self.encoded.len() * 1000 / MP3_BYTES_PER_SEC) as u64)
        })
    }
}

fn is_mp3(bytes: &[u8]) -> bool {
    bytes.starts_with(b"ID3") || (bytes.len() > 1 && bytes[0] == 0xFF && bytes[1] & 0xE0 == 0xE0)
}

/// Decode backend synthesis output
pub fn decode_audio(bytes: Bytes) -> SpeechResult<AudioClip> {
    if bytes.starts_with(b"RIFF") {
        let mut reader = hound::WavReader::new(Cursor::new(bytes.clone()))
            .map_err(|e| SpeechError::Decode(e.to_string()))?;
        let spec = reader.spec();
        if spec.sample_rate == 0 {
            return Err(SpeechError::Decode("WAV header has zero sample rate".to_string()));
        }

        let frames = reader.duration() as u64;
        let duration = Duration::from_millis(frames * 1000 / spec.sample_rate as u64);

        let samples = if spec.sample_format == hound::SampleFormat::Int && spec.bits_per_sample == 16
        {
            reader
                .samples::<i16>()
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| SpeechError::Decode(e.to_string()))?
        } else {
            Vec::new()
        };

        return Ok(AudioClip {
            format: AudioFormat::Wav,
            sample_rate: Some(spec.sample_rate),
            channels: Some(spec.channels),
            samples,
            duration: Some(duration),
            encoded: bytes,
        });
    }

    if is_mp3(&bytes) {
        return Ok(AudioClip {
            format: AudioFormat::Mp3,
            sample_rate: None,
            channels: None,
            samples: Vec::new(),
            duration: None,
            encoded: bytes,
        });
    }

    Err(SpeechError::Decode(format!(
        "Unrecognized audio format ({} bytes)",
        bytes.len()
    )))
}

/// Audio output device
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Play the clip and resolve when it has finished or been stopped
    async fn play(&self, clip: &AudioClip) -> SpeechResult<()>;

    /// Stop whatever is currently playing
    fn stop(&self);
}

/// Sink without an output device; holds for the clip's play time
#[derive(Debug, Default)]
pub struct TimedSink {
    stopped: Notify,
}

impl TimedSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AudioSink for TimedSink {
    async fn play(&self, clip: &AudioClip) -> SpeechResult<()> {
        let play_time = clip.play_time();
        debug!(format = ?clip.format, ?play_time, "Playing synthesized audio");

        tokio::select! {
            _ = tokio::time::sleep(play_time) => {}
            _ = self.stopped.notified() => {
                debug!("Playback stopped");
            }
        }
        Ok(())
    }

    fn stop(&self) {
        self.stopped.notify_waiters();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// 16-bit mono WAV of `millis` silence
    pub(crate) fn silent_wav(sample_rate: u32, millis: u32) -> Bytes {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for _ in 0..(sample_rate * millis / 1000) {
                writer.write_sample(0i16).unwrap();
            }
            writer.finalize().unwrap();
        }
        Bytes::from(cursor.into_inner())
    }

    #[test]
    fn test_decode_wav() {
        let clip = decode_audio(silent_wav(16_000, 500)).unwrap();

        assert_eq!(clip.format, AudioFormat::Wav);
        assert_eq!(clip.sample_rate, Some(16_000));
        assert_eq!(clip.channels, Some(1));
        assert_eq!(clip.samples.len(), 8_000);
        assert_eq!(clip.duration, Some(Duration::from_millis(500)));
    }

    #[test]
    fn test_detect_mp3() {
        let mut id3 = b"ID3\x04\x00".to_vec();
        id3.resize(32_000, 0);
        let clip = decode_audio(Bytes::from(id3)).unwrap();
        assert_eq!(clip.format, AudioFormat::Mp3);
        assert_eq!(clip.duration, None);
        assert_eq!(clip.play_time(), Duration::from_secs(2));

        let frame_sync = Bytes::from_static(&[0xFF, 0xFB, 0x90, 0x00]);
        assert_eq!(decode_audio(frame_sync).unwrap().format, AudioFormat::Mp3);
    }

    #[test]
    fn test_reject_unknown_bytes() {
        let err = decode_audio(Bytes::from_static(b"<html>not audio</html>")).unwrap_err();
        assert!(matches!(err, SpeechError::Decode(_)));
    }

    #[test]
    fn test_reject_truncated_wav() {
        let err = decode_audio(Bytes::from_static(b"RIFF\x00\x00")).unwrap_err();
        assert!(matches!(err, SpeechError::Decode(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timed_sink_holds_for_clip() {
        let sink = TimedSink::new();
        let clip = decode_audio(silent_wav(8_000, 250)).unwrap();

        let start = tokio::time::Instant::now();
        sink.play(&clip).await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_millis(250));
    }
}
