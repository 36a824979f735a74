// Copyright 2025 Outbound Contributors
// SPDX-License-Identifier: Apache-2.0

//! Request and response bodies.
//!
//! A [`Body`] is either empty, a fully buffered chunk of bytes, or a live
//! byte stream. Streams are single-read; dropping a `Body` releases whatever
//! connection backs it.

use std::fmt;
use std::io;
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use futures::stream::{BoxStream, Stream, StreamExt};
use outbound_core::BoxError;
use serde::de::DeserializeOwned;
use tokio::io::AsyncRead;
use tokio_util::io::{ReaderStream, StreamReader, SyncIoBridge};

use crate::error::{DecodeError, HttpError, Result};

enum Kind {
    Empty,
    Full(Bytes),
    Stream(BoxStream<'static, io::Result<Bytes>>),
}

/// An HTTP body.
pub struct Body {
    kind: Kind,
}

impl Body {
    /// An empty body.
    pub fn empty() -> Self {
        Self { kind: Kind::Empty }
    }

    /// Wrap a stream of byte chunks.
    pub fn from_stream<S, B, E>(stream: S) -> Self
    where
        S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
        B: Into<Bytes>,
        E: Into<BoxError>,
    {
        let stream = stream.map(|chunk| chunk.map(Into::into).map_err(into_io_error));
        Self {
            kind: Kind::Stream(stream.boxed()),
        }
    }

    /// Wrap an async reader.
    pub fn from_reader<R>(reader: R) -> Self
    where
        R: AsyncRead + Send + 'static,
    {
        Self {
            kind: Kind::Stream(ReaderStream::new(reader).boxed()),
        }
    }

    /// Whether this body is backed by a live stream.
    pub fn is_stream(&self) -> bool {
        matches!(self.kind, Kind::Stream(_))
    }

    /// Whether this body is known to carry no bytes.
    pub fn is_empty(&self) -> bool {
        match &self.kind {
            Kind::Empty => true,
            Kind::Full(bytes) => bytes.is_empty(),
            Kind::Stream(_) => false,
        }
    }

    /// Read the whole body, consuming it. The underlying stream is dropped
    /// on return whether or not reading succeeded.
    pub async fn collect(mut self) -> io::Result<Bytes> {
        self.read_to_end().await
    }

    /// Drain the body in place. A stream is left exhausted but still owned
    /// by `self`, so dropping it stays the caller's responsibility.
    pub async fn read_to_end(&mut self) -> io::Result<Bytes> {
        match &mut self.kind {
            Kind::Empty => Ok(Bytes::new()),
            Kind::Full(bytes) => {
                let bytes = mem::take(bytes);
                self.kind = Kind::Empty;
                Ok(bytes)
            }
            Kind::Stream(stream) => {
                let mut buf = BytesMut::new();
                while let Some(chunk) = stream.next().await {
                    buf.extend_from_slice(&chunk?);
                }
                Ok(buf.freeze())
            }
        }
    }

    /// Decode the remaining body as JSON, parsing chunks as they arrive.
    ///
    /// The parser runs on the blocking pool and pulls from the stream through
    /// a sync bridge, so a syntax error surfaces without waiting for the rest
    /// of the body. The body is drained afterwards.
    pub async fn read_json<T>(&mut self) -> Result<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let reader = SyncIoBridge::new(StreamReader::new(mem::take(self)));
        let decoded = tokio::task::spawn_blocking(move || serde_json::from_reader(reader))
            .await
            .map_err(|e| HttpError::Read(io::Error::new(io::ErrorKind::Other, e)))?;
        decoded.map_err(|e: serde_json::Error| {
            if e.is_io() {
                HttpError::Read(e.into())
            } else {
                DecodeError::Json(e).into()
            }
        })
    }

    /// Decode the remaining body as YAML. `serde_yaml` parses whole
    /// documents, so the body is read to the end first.
    pub async fn read_yaml<T: DeserializeOwned>(&mut self) -> Result<T> {
        let bytes = self.read_to_end().await.map_err(HttpError::Read)?;
        serde_yaml::from_slice(&bytes).map_err(|e| DecodeError::Yaml(e).into())
    }

    pub(crate) fn into_reqwest(self) -> reqwest::Body {
        match self.kind {
            Kind::Empty => reqwest::Body::from(Bytes::new()),
            Kind::Full(bytes) => reqwest::Body::from(bytes),
            Kind::Stream(stream) => reqwest::Body::wrap_stream(stream),
        }
    }
}

fn into_io_error<E: Into<BoxError>>(err: E) -> io::Error {
    let err: BoxError = err.into();
    match err.downcast::<io::Error>() {
        Ok(err) => *err,
        Err(err) => io::Error::new(io::ErrorKind::Other, err),
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::empty()
    }
}

impl Stream for Body {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        match &mut this.kind {
            Kind::Empty => Poll::Ready(None),
            Kind::Full(bytes) => {
                let bytes = mem::take(bytes);
                this.kind = Kind::Empty;
                if bytes.is_empty() {
                    Poll::Ready(None)
                } else {
                    Poll::Ready(Some(Ok(bytes)))
                }
            }
            Kind::Stream(stream) => stream.as_mut().poll_next(cx),
        }
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            Kind::Empty => f.write_str("Body::Empty"),
            Kind::Full(bytes) => write!(f, "Body::Full({} bytes)", bytes.len()),
            Kind::Stream(_) => f.write_str("Body::Stream"),
        }
    }
}

impl From<Bytes> for Body {
    fn from(bytes: Bytes) -> Self {
        Self {
            kind: Kind::Full(bytes),
        }
    }
}

impl From<Vec<u8>> for Body {
    fn from(bytes: Vec<u8>) -> Self {
        Bytes::from(bytes).into()
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Bytes::from(text).into()
    }
}

impl From<&'static str> for Body {
    fn from(text: &'static str) -> Self {
        Bytes::from_static(text.as_bytes()).into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use serde::Deserialize;

    #[tokio::test]
    async fn test_collect_concatenates_chunks() {
        let chunks = vec![Ok::<_, io::Error>("hel"), Ok("lo")];
        let body = Body::from_stream(stream::iter(chunks));
        assert!(body.is_stream());
        assert_eq!(body.collect().await.unwrap(), Bytes::from("hello"));
    }

    #[tokio::test]
    async fn test_collect_surfaces_stream_errors() {
        let chunks = vec![
            Ok(Bytes::from("partial")),
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone")),
        ];
        let err = Body::from_stream(stream::iter(chunks))
            .collect()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }

    #[tokio::test]
    async fn test_from_reader() {
        let body = Body::from_reader(&b"from a reader"[..]);
        assert_eq!(body.collect().await.unwrap(), Bytes::from("from a reader"));
    }

    #[tokio::test]
    async fn test_read_json_leaves_body_drained() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Item {
            id: u32,
        }

        let mut body = Body::from_stream(stream::iter(vec![
            Ok::<_, io::Error>("{\"id\":"),
            Ok("7}"),
        ]));
        let item: Item = body.read_json().await.unwrap();
        assert_eq!(item, Item { id: 7 });
        assert!(body.read_to_end().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_read_json_rejects_syntax_before_stream_ends() {
        let mut body = Body::from_stream(stream::iter(vec![
            Ok(Bytes::from("{\"id\": x")),
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "never reached")),
        ]));
        let err = body.read_json::<serde_json::Value>().await.unwrap_err();
        assert!(matches!(err, HttpError::Decode(DecodeError::Json(_))));
    }

    #[tokio::test]
    async fn test_read_json_surfaces_stream_errors_as_read() {
        let mut body = Body::from_stream(stream::iter(vec![
            Ok(Bytes::from("{\"id\": ")),
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "gone")),
        ]));
        let err = body.read_json::<serde_json::Value>().await.unwrap_err();
        assert!(matches!(err, HttpError::Read(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
    }

    #[tokio::test]
    async fn test_full_body_streams_once() {
        let mut body = Body::from("once");
        assert_eq!(body.next().await.unwrap().unwrap(), Bytes::from("once"));
        assert!(body.next().await.is_none());
        assert!(body.is_empty());
    }
}
