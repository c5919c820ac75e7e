use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Recording,
    Stopped,
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no hay audio para procesar")]
    NoArtifact,
}

/// A finalized take: the ordered concatenation of every fragment captured
/// between `start()` and `stop()`, still raw PCM at the capture rate.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedTake {
    pub sample_rate_hz: u32,
    pub samples: Vec<f32>,
}

/// An encoded recording tagged with its media type, ready for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioArtifact {
    pub filename: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for AudioArtifact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioArtifact")
            .field("filename", &self.filename)
            .field("media_type", &self.media_type)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}

/// The press-and-hold recording lifecycle.
///
/// At most one of these is live per application (the service owns the
/// singleton). The take exists if and only if the state is `Stopped`;
/// starting a new take discards any previous one.
#[derive(Debug)]
pub struct RecordingSession {
    state: SessionState,
    sample_rate_hz: u32,
    fragments: Vec<Vec<f32>>,
    take: Option<RecordedTake>,
}

impl Default for RecordingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingSession {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            sample_rate_hz: 0,
            fragments: Vec::new(),
            take: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_recording(&self) -> bool {
        self.state == SessionState::Recording
    }

    /// Begins a new take at the given capture rate.
    ///
    /// Returns `false` without touching anything while already recording,
    /// so overlapping input gestures cannot restart a take. Otherwise any
    /// previous take is discarded.
    pub fn start(&mut self, sample_rate_hz: u32) -> bool {
        if self.state == SessionState::Recording {
            return false;
        }
        self.state = SessionState::Recording;
        self.sample_rate_hz = sample_rate_hz;
        self.fragments.clear();
        self.take = None;
        true
    }

    /// Appends one captured fragment, preserving arrival order.
    /// Empty deliveries and fragments outside a recording are ignored.
    pub fn push_fragment(&mut self, samples: &[f32]) {
        if self.state != SessionState::Recording || samples.is_empty() {
            return;
        }
        self.fragments.push(samples.to_vec());
    }

    /// Finalizes the take as the ordered concatenation of all fragments.
    /// No-op (returns `None`) unless currently recording.
    pub fn stop(&mut self) -> Option<&RecordedTake> {
        if self.state != SessionState::Recording {
            return None;
        }

        let total: usize = self.fragments.iter().map(Vec::len).sum();
        let mut samples = Vec::with_capacity(total);
        for fragment in self.fragments.drain(..) {
            samples.extend_from_slice(&fragment);
        }

        self.take = Some(RecordedTake {
            sample_rate_hz: self.sample_rate_hz,
            samples,
        });
        self.state = SessionState::Stopped;
        self.take.as_ref()
    }

    /// Reverts to `Idle` discarding everything; used when device access
    /// fails after the session already left `Idle`.
    pub fn abort(&mut self) {
        self.state = SessionState::Idle;
        self.fragments.clear();
        self.take = None;
    }

    pub fn take(&self) -> Option<&RecordedTake> {
        self.take.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_is_ordered_concatenation_of_fragments() {
        let mut s = RecordingSession::new();
        assert!(s.start(16_000));
        s.push_fragment(&[0.1, 0.2]);
        s.push_fragment(&[]);
        s.push_fragment(&[0.3]);
        s.push_fragment(&[0.4, 0.5]);

        let take = s.stop().unwrap();
        assert_eq!(take.samples, vec![0.1, 0.2, 0.3, 0.4, 0.5]);
        assert_eq!(take.sample_rate_hz, 16_000);
        assert_eq!(s.state(), SessionState::Stopped);
    }

    #[test]
    fn start_while_recording_is_idempotent() {
        let mut s = RecordingSession::new();
        assert!(s.start(48_000));
        s.push_fragment(&[0.7]);

        assert!(!s.start(16_000));
        assert_eq!(s.state(), SessionState::Recording);

        let take = s.stop().unwrap();
        assert_eq!(take.samples, vec![0.7]);
        assert_eq!(take.sample_rate_hz, 48_000);
    }

    #[test]
    fn stop_outside_recording_is_a_noop() {
        let mut s = RecordingSession::new();
        assert!(s.stop().is_none());
        assert!(s.take().is_none());

        s.start(16_000);
        s.push_fragment(&[0.5]);
        assert!(s.stop().is_some());

        // Second stop must not disturb the finalized take.
        assert!(s.stop().is_none());
        assert_eq!(s.take().unwrap().samples, vec![0.5]);
    }

    #[test]
    fn take_exists_iff_stopped() {
        let mut s = RecordingSession::new();
        assert!(s.take().is_none());

        s.start(16_000);
        assert!(s.take().is_none());
        s.push_fragment(&[0.1]);
        s.stop();
        assert!(s.take().is_some());

        // Starting again invalidates the pending take.
        s.start(16_000);
        assert!(s.take().is_none());
    }

    #[test]
    fn fragments_outside_recording_are_dropped() {
        let mut s = RecordingSession::new();
        s.push_fragment(&[0.9]);
        s.start(16_000);
        s.push_fragment(&[0.1]);
        s.stop();
        s.push_fragment(&[0.9]);
        assert_eq!(s.take().unwrap().samples, vec![0.1]);
    }

    #[test]
    fn abort_reverts_to_idle_without_take() {
        let mut s = RecordingSession::new();
        s.start(16_000);
        s.push_fragment(&[0.1]);
        s.abort();
        assert_eq!(s.state(), SessionState::Idle);
        assert!(s.take().is_none());
    }
}
