use crate::request::{Body, HttpRequest, join_url};

/// A finished recording ready for upload.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioUpload {
    pub filename: String,
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl std::fmt::Debug for AudioUpload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AudioUpload")
            .field("filename", &self.filename)
            .field("media_type", &self.media_type)
            .field("bytes_len", &self.bytes.len())
            .finish()
    }
}

/// Builds the one multipart request for `POST /api/audio/process`.
///
/// The backend reads a single `audio` form file; the filename is free-form
/// but its extension must be one the server accepts.
pub fn build_audio_process_request(base_url: &str, audio: &AudioUpload) -> HttpRequest {
    let boundary = format!("Boundary-{}", uuid::Uuid::new_v4());

    let mut body: Vec<u8> = Vec::new();
    append_file(
        &mut body,
        &boundary,
        "audio",
        &audio.filename,
        &audio.media_type,
        &audio.bytes,
    );
    body.extend_from_slice(format!("--{}--\r\n", boundary).as_bytes());

    HttpRequest {
        method: "POST".into(),
        url: join_url(base_url, "/api/audio/process"),
        headers: vec![
            (
                "Content-Type".into(),
                format!("multipart/form-data; boundary={}", boundary),
            ),
            ("Accept".into(), "application/json".into()),
        ],
        body: Body::MultipartFormData {
            boundary,
            bytes: body,
        },
    }
}

fn append_file(
    body: &mut Vec<u8>,
    boundary: &str,
    name: &str,
    filename: &str,
    media_type: &str,
    bytes: &[u8],
) {
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(
        format!(
            "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
            name, filename
        )
        .as_bytes(),
    );
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", media_type).as_bytes());
    body.extend_from_slice(bytes);
    body.extend_from_slice(b"\r\n");
}
