use cpal::SampleFormat;

/// Capture preference, best first. Selection walks the list and takes the
/// first format the device supports; an empty intersection means the
/// caller falls back to the device's default configuration.
pub const FORMAT_PREFERENCE: [SampleFormat; 3] =
    [SampleFormat::F32, SampleFormat::I16, SampleFormat::U16];

pub fn negotiate_sample_format(supported: &[SampleFormat]) -> Option<SampleFormat> {
    FORMAT_PREFERENCE
        .iter()
        .copied()
        .find(|f| supported.contains(f))
}
