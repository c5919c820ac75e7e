use serde::{Deserialize, Serialize};

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpRequest {
    pub method: String,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Body,
}

impl std::fmt::Debug for HttpRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Audio uploads carry whole recordings; never dump the raw body
        // into logs, only its shape.
        let body_summary = match &self.body {
            Body::Empty => "Empty".to_string(),
            Body::Json(s) => format!("Json(len={})", s.len()),
            Body::MultipartFormData { boundary, bytes } => {
                format!(
                    "MultipartFormData(boundary={}, bytes_len={})",
                    boundary,
                    bytes.len()
                )
            }
        };

        f.debug_struct("HttpRequest")
            .field("method", &self.method)
            .field("url", &self.url)
            .field("headers", &self.headers)
            .field("body", &body_summary)
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Body {
    Empty,
    Json(String),
    MultipartFormData { boundary: String, bytes: Vec<u8> },
}

impl HttpRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub(crate) fn join_url(base: &str, path: &str) -> String {
    let base = base.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    format!("{}/{}", base, path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_lookup_is_case_insensitive() {
        let req = HttpRequest {
            method: "GET".into(),
            url: "https://example.com".into(),
            headers: vec![("Content-Type".into(), "application/json".into())],
            body: Body::Empty,
        };
        assert_eq!(req.header("content-type"), Some("application/json"));
    }

    #[test]
    fn join_url_handles_trailing_slash() {
        assert_eq!(
            join_url("http://localhost:5000/", "/api/tasks"),
            "http://localhost:5000/api/tasks"
        );
        assert_eq!(
            join_url("http://localhost:5000", "api/tasks"),
            "http://localhost:5000/api/tasks"
        );
    }

    #[test]
    fn debug_summarizes_body_instead_of_dumping_it() {
        let req = HttpRequest {
            method: "POST".into(),
            url: "https://example.com".into(),
            headers: vec![],
            body: Body::MultipartFormData {
                boundary: "Boundary-x".into(),
                bytes: vec![0xAB; 4096],
            },
        };
        let s = format!("{req:?}");
        assert!(s.contains("bytes_len=4096"));
        assert!(!s.contains("171"));
    }
}
