use anyhow::Context;
use rubato::{FastFixedIn, PolynomialDegree, Resampler};

/// Uploads are mono at this rate: it is what the backend's speech model
/// consumes, and it keeps recordings small on the wire.
pub const UPLOAD_SAMPLE_RATE_HZ: u32 = 16_000;

/// Resamples mono f32 PCM from the capture rate down to the upload rate.
pub fn resample_to_upload_rate(samples: &[f32], input_rate_hz: u32) -> anyhow::Result<Vec<f32>> {
    if input_rate_hz == UPLOAD_SAMPLE_RATE_HZ || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let ratio = f64::from(UPLOAD_SAMPLE_RATE_HZ) / f64::from(input_rate_hz);
    let mut resampler = FastFixedIn::<f32>::new(
        ratio,
        1.0,
        PolynomialDegree::Septic,
        samples.len(),
        1,
    )
    .context("create resampler")?;

    let out = resampler.process(&[samples], None).context("resample")?;
    Ok(out.into_iter().next().unwrap_or_default())
}
