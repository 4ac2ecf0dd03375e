//! Structured view over a request body, and the codecs behind it.

use bytes::Bytes;
use rq_container::{BoxError, Container, ContainerExt, ServiceError};
use rq_http::{Abort, MediaType};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ContentError {
    /// The body has no media type, so there is nothing to pick a decoder by.
    #[error("content has no media type; cannot decode body")]
    MissingMediaType,

    #[error("no coder configured for media type {0}")]
    UnsupportedMediaType(MediaType),

    #[error("failed to decode {media_type} content: {source}")]
    Decode {
        media_type: MediaType,
        #[source]
        source: BoxError,
    },

    #[error("failed to encode content as {media_type}: {source}")]
    Encode {
        media_type: MediaType,
        #[source]
        source: BoxError,
    },

    #[error("content has no field {0:?}")]
    MissingField(String),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl From<ContentError> for Abort {
    fn from(err: ContentError) -> Self {
        match err {
            ContentError::MissingMediaType | ContentError::UnsupportedMediaType(_) => {
                Abort::unsupported_media_type(err.to_string())
            }
            ContentError::Decode { .. } | ContentError::MissingField(_) => {
                Abort::unprocessable(err.to_string())
            }
            ContentError::Encode { .. } | ContentError::Service(_) => {
                Abort::internal(err.to_string())
            }
        }
    }
}

/// Built-in body codecs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCoder {
    Json,
    UrlEncodedForm,
    /// Body is a UTF-8 string; only string values round-trip.
    PlainText,
}

impl ContentCoder {
    pub fn decode<T: DeserializeOwned>(&self, body: &[u8]) -> Result<T, BoxError> {
        match self {
            Self::Json => Ok(serde_json::from_slice(body)?),
            Self::UrlEncodedForm => Ok(serde_urlencoded::from_bytes(body)?),
            Self::PlainText => {
                let text = std::str::from_utf8(body)?;
                Ok(serde_json::from_value(Value::String(text.to_string()))?)
            }
        }
    }

    pub fn encode<T: Serialize>(&self, value: &T) -> Result<Bytes, BoxError> {
        match self {
            Self::Json => Ok(serde_json::to_vec(value)?.into()),
            Self::UrlEncodedForm => Ok(serde_urlencoded::to_string(value)?.into()),
            Self::PlainText => match serde_json::to_value(value)? {
                Value::String(s) => Ok(s.into()),
                other => Err(format!("plain text can only hold strings, got {other}").into()),
            },
        }
    }
}

/// Media type → coder table, resolved from the container. When no
/// `ContentConfig` is registered the default table is used.
#[derive(Debug, Clone)]
pub struct ContentConfig {
    coders: Vec<(MediaType, ContentCoder)>,
}

impl Default for ContentConfig {
    fn default() -> Self {
        let mut config = Self::empty();
        config.use_coder(MediaType::json(), ContentCoder::Json);
        config.use_coder(MediaType::url_encoded_form(), ContentCoder::UrlEncodedForm);
        config.use_coder(MediaType::plain_text(), ContentCoder::PlainText);
        config
    }
}

impl ContentConfig {
    pub fn empty() -> Self {
        Self { coders: Vec::new() }
    }

    /// Use `coder` for `media_type` (parameters ignored). Later entries take
    /// precedence.
    pub fn use_coder(&mut self, media_type: MediaType, coder: ContentCoder) {
        self.coders.insert(0, (media_type, coder));
    }

    pub fn coder(&self, media_type: &MediaType) -> Result<ContentCoder, ContentError> {
        self.coders
            .iter()
            .find(|(m, _)| m.matches(media_type))
            .map(|(_, coder)| *coder)
            .ok_or_else(|| ContentError::UnsupportedMediaType(media_type.clone()))
    }

    fn resolve(container: &dyn Container) -> Result<ContentConfig, ContentError> {
        match container.make::<ContentConfig>() {
            Ok(config) => Ok((*config).clone()),
            Err(ServiceError::NotRegistered { .. }) => Ok(ContentConfig::default()),
            Err(e) => Err(e.into()),
        }
    }
}

type WriteBack<'a> = Box<dyn FnMut(Bytes, MediaType) + Send + 'a>;

/// Body view: a snapshot of body and media type plus a write-back that
/// replaces both on the owning message in one step.
pub struct ContentContainer<'a> {
    container: &'a dyn Container,
    body: Bytes,
    media_type: Option<MediaType>,
    update: WriteBack<'a>,
}

impl<'a> ContentContainer<'a> {
    pub fn new(
        container: &'a dyn Container,
        body: Bytes,
        media_type: Option<MediaType>,
        update: impl FnMut(Bytes, MediaType) + Send + 'a,
    ) -> Self {
        Self {
            container,
            body,
            media_type,
            update: Box::new(update),
        }
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn media_type(&self) -> Option<&MediaType> {
        self.media_type.as_ref()
    }

    /// Decode the body with the coder for its media type.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ContentError> {
        let media_type = self
            .media_type
            .as_ref()
            .ok_or(ContentError::MissingMediaType)?;
        let coder = ContentConfig::resolve(self.container)?.coder(media_type)?;
        coder
            .decode(&self.body)
            .map_err(|source| ContentError::Decode {
                media_type: media_type.clone(),
                source,
            })
    }

    /// Decode a single top-level field.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T, ContentError> {
        let mut fields: serde_json::Map<String, Value> = self.decode()?;
        let field = fields
            .remove(key)
            .ok_or_else(|| ContentError::MissingField(key.to_string()))?;
        serde_json::from_value(field).map_err(|e| ContentError::Decode {
            media_type: self.media_type.clone().unwrap_or_else(MediaType::json),
            source: e.into(),
        })
    }

    /// Encode `value` as `media_type` and write it back to the message.
    pub fn encode<T: Serialize>(
        &mut self,
        value: &T,
        media_type: MediaType,
    ) -> Result<(), ContentError> {
        let coder = ContentConfig::resolve(self.container)?.coder(&media_type)?;
        let body = coder.encode(value).map_err(|source| ContentError::Encode {
            media_type: media_type.clone(),
            source,
        })?;
        self.set_raw(body, media_type);
        Ok(())
    }

    /// Write raw bytes and their media type back to the message.
    pub fn set_raw(&mut self, body: impl Into<Bytes>, media_type: MediaType) {
        let body = body.into();
        debug!("Content replaced ({} bytes, {media_type})", body.len());
        (self.update)(body.clone(), media_type.clone());
        self.body = body;
        self.media_type = Some(media_type);
    }
}

impl std::fmt::Debug for ContentContainer<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentContainer")
            .field("media_type", &self.media_type)
            .field("body", &format_args!("<{} bytes>", self.body.len()))
            .finish_non_exhaustive()
    }
}
