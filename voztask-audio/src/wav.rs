use anyhow::Context;
use std::io::Cursor;

pub const WAV_MEDIA_TYPE: &str = "audio/wav";

/// Encodes mono f32 samples as 16-bit PCM WAV. Samples outside [-1, 1]
/// are clamped rather than wrapped.
pub fn encode_wav_mono(samples: &[f32], sample_rate_hz: u32) -> anyhow::Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: sample_rate_hz,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec).context("create wav writer")?;
    for &s in samples {
        let clamped = s.clamp(-1.0, 1.0);
        writer
            .write_sample((clamped * i16::MAX as f32) as i16)
            .context("write wav sample")?;
    }
    writer.finalize().context("finalize wav")?;

    Ok(cursor.into_inner())
}
