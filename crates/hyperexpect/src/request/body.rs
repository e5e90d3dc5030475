//! Request body mechanisms.
//!
//! A request carries at most one body mechanism. Setting a second,
//! different mechanism is an error; repeating the same one replaces the
//! previous body, except form fields, which accumulate.

use bytes::{BufMut, Bytes, BytesMut};

use crate::engine::Payload;
use crate::error::ExpectError;
use crate::transport::RequestBody;

/// One part of a `multipart/form-data` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Part {
    name: String,
    filename: Option<String>,
    data: Bytes,
}

/// The body accumulated by the builder.
#[derive(Debug, Default)]
pub(crate) enum Body {
    #[default]
    None,
    Bytes(Bytes),
    Text(String),
    Json(Bytes),
    Form(Vec<(String, String)>),
    Multipart { boundary: String, parts: Vec<Part> },
    Chunked(RequestBody),
    WebsocketUpgrade,
}

impl Body {
    fn mechanism(&self) -> Option<&'static str> {
        match self {
            Self::None => None,
            Self::Bytes(_) => Some("bytes"),
            Self::Text(_) => Some("text"),
            Self::Json(_) => Some("JSON"),
            Self::Form(_) => Some("form"),
            Self::Multipart { .. } => Some("multipart"),
            Self::Chunked(_) => Some("chunked"),
            Self::WebsocketUpgrade => Some("websocket upgrade"),
        }
    }

    fn check_conflict(&self, next: &'static str) -> Result<(), ExpectError> {
        match self.mechanism() {
            Some(current) if current != next => Err(ExpectError::invalid_request(format!(
                "conflicting request bodies: {current} and {next}"
            ))),
            _ => Ok(()),
        }
    }

    /// Replace the body with `next`, unless another mechanism is set.
    pub(crate) fn set(&mut self, next: Self) -> Result<(), ExpectError> {
        if let Some(mechanism) = next.mechanism() {
            self.check_conflict(mechanism)?;
        }
        *self = next;
        Ok(())
    }

    pub(crate) fn is_websocket(&self) -> bool {
        matches!(self, Self::WebsocketUpgrade)
    }

    /// Switch to `multipart/form-data`, keeping parts added so far.
    pub(crate) fn start_multipart(&mut self) -> Result<(), ExpectError> {
        match self {
            Self::Multipart { .. } => Ok(()),
            Self::Form(fields) => {
                let parts = fields
                    .drain(..)
                    .map(|(name, value)| Part::field(name, value))
                    .collect();
                *self = Self::Multipart {
                    boundary: uuid::Uuid::new_v4().simple().to_string(),
                    parts,
                };
                Ok(())
            }
            _ => {
                self.check_conflict("multipart")?;
                *self = Self::Multipart {
                    boundary: uuid::Uuid::new_v4().simple().to_string(),
                    parts: Vec::new(),
                };
                Ok(())
            }
        }
    }

    /// Add a field to the form, or to the multipart body once started.
    pub(crate) fn add_field(&mut self, name: String, value: String) -> Result<(), ExpectError> {
        match self {
            Self::Form(fields) => fields.push((name, value)),
            Self::Multipart { parts, .. } => parts.push(Part::field(name, value)),
            _ => {
                self.check_conflict("form")?;
                *self = Self::Form(vec![(name, value)]);
            }
        }
        Ok(())
    }

    /// Add a file part; requires a multipart body.
    pub(crate) fn add_file(
        &mut self,
        name: String,
        filename: String,
        data: Bytes,
    ) -> Result<(), ExpectError> {
        match self {
            Self::Multipart { parts, .. } => {
                parts.push(Part {
                    name,
                    filename: Some(filename),
                    data,
                });
                Ok(())
            }
            _ => Err(ExpectError::invalid_request(
                "with_file requires with_multipart to be called first",
            )),
        }
    }

    /// The `Content-Type` implied by the body, if any.
    pub(crate) fn content_type(&self) -> Option<String> {
        match self {
            Self::None | Self::Bytes(_) | Self::Chunked(_) | Self::WebsocketUpgrade => None,
            Self::Text(_) => Some(mime::TEXT_PLAIN_UTF_8.to_string()),
            Self::Json(_) => Some(format!("{}; charset=utf-8", mime::APPLICATION_JSON)),
            Self::Form(_) => Some(mime::APPLICATION_WWW_FORM_URLENCODED.to_string()),
            Self::Multipart { boundary, .. } => {
                Some(format!("{}; boundary={boundary}", mime::MULTIPART_FORM_DATA))
            }
        }
    }

    /// Encode into what the engine sends.
    pub(crate) fn encode(self) -> Result<Payload, ExpectError> {
        let body = match self {
            Self::None | Self::WebsocketUpgrade => RequestBody::Empty,
            Self::Bytes(bytes) | Self::Json(bytes) => RequestBody::Full(bytes),
            Self::Text(text) => RequestBody::from(text),
            Self::Form(fields) => {
                let encoded = serde_urlencoded::to_string(&fields)
                    .map_err(|e| ExpectError::invalid_request(format!("invalid form: {e}")))?;
                RequestBody::from(encoded)
            }
            Self::Multipart { boundary, parts } => {
                RequestBody::Full(encode_multipart(&boundary, &parts))
            }
            Self::Chunked(stream) => stream,
        };
        Ok(Payload::from(body))
    }
}

impl Part {
    fn field(name: String, value: String) -> Self {
        Self {
            name,
            filename: None,
            data: Bytes::from(value),
        }
    }
}

fn quote(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

fn encode_multipart(boundary: &str, parts: &[Part]) -> Bytes {
    let mut buf = BytesMut::new();
    for part in parts {
        buf.put_slice(format!("--{boundary}\r\n").as_bytes());
        match &part.filename {
            Some(filename) => {
                buf.put_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                        quote(&part.name),
                        quote(filename)
                    )
                    .as_bytes(),
                );
                buf.put_slice(
                    format!("Content-Type: {}\r\n", mime::APPLICATION_OCTET_STREAM).as_bytes(),
                );
            }
            None => buf.put_slice(
                format!(
                    "Content-Disposition: form-data; name=\"{}\"\r\n",
                    quote(&part.name)
                )
                .as_bytes(),
            ),
        }
        buf.put_slice(b"\r\n");
        buf.put_slice(&part.data);
        buf.put_slice(b"\r\n");
    }
    buf.put_slice(format!("--{boundary}--\r\n").as_bytes());
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoded(body: Body) -> Bytes {
        match body.encode().unwrap() {
            Payload::Full(bytes) => bytes,
            Payload::Empty => Bytes::new(),
            Payload::Stream(_) => panic!("expected a buffered body"),
        }
    }

    #[test]
    fn test_same_mechanism_overwrites() {
        let mut body = Body::None;
        body.set(Body::Text("a".into())).unwrap();
        body.set(Body::Text("b".into())).unwrap();
        assert_eq!(encoded(body), Bytes::from("b"));
    }

    #[test]
    fn test_conflicting_mechanisms() {
        let mut body = Body::None;
        body.set(Body::Text("a".into())).unwrap();
        let err = body.add_field("k".into(), "v".into()).unwrap_err();
        assert!(err.to_string().contains("conflicting request bodies: text and form"));

        let mut upgrade = Body::WebsocketUpgrade;
        assert!(upgrade
            .set(Body::Chunked(RequestBody::chunked([Bytes::from("x")])))
            .is_err());
    }

    #[test]
    fn test_form_fields_accumulate() {
        let mut body = Body::None;
        body.add_field("a".into(), "1".into()).unwrap();
        body.add_field("b".into(), "x y".into()).unwrap();
        assert_eq!(
            body.content_type().as_deref(),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(encoded(body), Bytes::from("a=1&b=x+y"));
    }

    #[test]
    fn test_multipart_encoding() {
        let mut body = Body::None;
        body.add_field("title".into(), "report".into()).unwrap();
        body.start_multipart().unwrap();
        body.add_file("file".into(), "a.txt".into(), Bytes::from("hello"))
            .unwrap();
        let Body::Multipart { boundary, .. } = &body else {
            panic!("expected multipart body");
        };
        let boundary = boundary.clone();
        assert_eq!(
            body.content_type().unwrap(),
            format!("multipart/form-data; boundary={boundary}")
        );

        let text = String::from_utf8(encoded(body).to_vec()).unwrap();
        assert!(text.starts_with(&format!("--{boundary}\r\n")));
        assert!(text.contains("Content-Disposition: form-data; name=\"title\"\r\n\r\nreport\r\n"));
        assert!(text.contains("name=\"file\"; filename=\"a.txt\"\r\nContent-Type: application/octet-stream\r\n\r\nhello\r\n"));
        assert!(text.ends_with(&format!("--{boundary}--\r\n")));
    }

    #[test]
    fn test_file_requires_multipart() {
        let mut body = Body::None;
        assert!(body
            .add_file("f".into(), "a".into(), Bytes::new())
            .is_err());
    }
}
