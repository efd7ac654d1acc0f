//! Response body interceptor: content-encoding inflation and text decoding.
//!
//! # Responsibilities
//! - Inflate `gzip` and `deflate` bodies chunk by chunk
//! - Emit raw bytes until an encoding is requested, then text
//!
//! # Design Decisions
//! - Installed on every response before the first chunk is read, so
//!   compressed bytes never reach a consumer
//! - `deflate` accepts both zlib-wrapped and raw streams (servers disagree)
//! - Text decoding carries incomplete UTF-8 sequences across chunk boundaries

use std::io::Write;
use std::mem;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Bytes, BytesMut};
use flate2::write::{DeflateDecoder, GzDecoder, ZlibDecoder};
use futures_util::{Stream, StreamExt};

use super::normalize::RawBody;
use crate::request::options::ResponseEncoding;
use crate::transport::{ByteStream, TransportError};

/// One item of a response stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chunk {
    Bytes(Bytes),
    Text(String),
}

enum Inflater {
    Gzip(GzDecoder<Vec<u8>>),
    Zlib(ZlibDecoder<Vec<u8>>),
    Raw(DeflateDecoder<Vec<u8>>),
    /// `deflate` before the first byte reveals the framing.
    DeflatePending,
}

impl Inflater {
    fn for_encoding(content_encoding: &str) -> Option<Self> {
        let encoding = content_encoding.trim().to_ascii_lowercase();
        match encoding.as_str() {
            "gzip" => Some(Inflater::Gzip(GzDecoder::new(Vec::new()))),
            "deflate" => Some(Inflater::DeflatePending),
            _ => None,
        }
    }

    fn write(&mut self, input: &[u8]) -> std::io::Result<Vec<u8>> {
        if let Inflater::DeflatePending = self {
            let Some(&first) = input.first() else {
                return Ok(Vec::new());
            };
            // zlib header: CM = 8 in the low nibble
            *self = if first & 0x0f == 8 {
                Inflater::Zlib(ZlibDecoder::new(Vec::new()))
            } else {
                Inflater::Raw(DeflateDecoder::new(Vec::new()))
            };
        }
        match self {
            Inflater::Gzip(d) => {
                d.write_all(input)?;
                Ok(mem::take(d.get_mut()))
            }
            Inflater::Zlib(d) => {
                d.write_all(input)?;
                Ok(mem::take(d.get_mut()))
            }
            Inflater::Raw(d) => {
                d.write_all(input)?;
                Ok(mem::take(d.get_mut()))
            }
            Inflater::DeflatePending => Ok(Vec::new()),
        }
    }

    fn finish(self) -> std::io::Result<Vec<u8>> {
        match self {
            Inflater::Gzip(d) => d.finish(),
            Inflater::Zlib(d) => d.finish(),
            Inflater::Raw(d) => d.finish(),
            Inflater::DeflatePending => Ok(Vec::new()),
        }
    }
}

/// Incremental byte-to-text decoder.
#[derive(Debug)]
struct TextDecoder {
    encoding: ResponseEncoding,
    pending: Vec<u8>,
}

impl TextDecoder {
    fn new(encoding: ResponseEncoding) -> Option<Self> {
        match encoding {
            ResponseEncoding::Binary => None,
            other => Some(Self {
                encoding: other,
                pending: Vec::new(),
            }),
        }
    }

    fn decode(&mut self, bytes: &[u8]) -> String {
        if self.encoding == ResponseEncoding::Latin1 {
            return bytes.iter().map(|&b| char::from(b)).collect();
        }

        self.pending.extend_from_slice(bytes);
        let mut out = String::new();
        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.push_str(text);
                    self.pending.clear();
                    break;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[..valid]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.drain(..valid + len);
                        }
                        None => {
                            self.pending.drain(..valid);
                            break;
                        }
                    }
                }
            }
        }
        out
    }

    fn finish(&mut self) -> String {
        let tail = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        tail
    }
}

/// Decompressing, optionally decoding, view over a response body.
pub struct ResponseStream {
    inner: ByteStream,
    inflater: Option<Inflater>,
    decoder: Option<TextDecoder>,
    finished: bool,
}

impl ResponseStream {
    /// Wrap a raw body, installing an inflater when the encoding calls for one.
    pub fn new(body: ByteStream, content_encoding: Option<&str>) -> Self {
        Self {
            inner: body,
            inflater: content_encoding.and_then(Inflater::for_encoding),
            decoder: None,
            finished: false,
        }
    }

    /// Switch from byte chunks to text chunks. `Binary` switches back.
    pub fn set_encoding(&mut self, encoding: ResponseEncoding) {
        self.decoder = TextDecoder::new(encoding);
    }

    /// True when a content-encoding is being undone.
    pub fn is_decompressing(&self) -> bool {
        self.inflater.is_some()
    }

    /// Drain the stream into a single body.
    pub async fn collect(mut self) -> Result<RawBody, TransportError> {
        let text_mode = self.decoder.is_some();
        let mut bytes = BytesMut::new();
        let mut text = String::new();
        while let Some(chunk) = self.next().await {
            match chunk? {
                Chunk::Bytes(b) => bytes.extend_from_slice(&b),
                Chunk::Text(t) => text.push_str(&t),
            }
        }
        if text_mode {
            if !bytes.is_empty() {
                text.insert_str(0, &String::from_utf8_lossy(&bytes));
            }
            Ok(RawBody::Text(text))
        } else {
            Ok(RawBody::Bytes(bytes.freeze()))
        }
    }

    fn inflate(&mut self, bytes: Bytes) -> Result<Bytes, TransportError> {
        match self.inflater.as_mut() {
            Some(inflater) => inflater
                .write(&bytes)
                .map(Bytes::from)
                .map_err(|e| TransportError::Decompress(e.to_string())),
            None => Ok(bytes),
        }
    }

    fn finish_inflate(&mut self) -> Result<Bytes, TransportError> {
        match self.inflater.take() {
            Some(inflater) => inflater
                .finish()
                .map(Bytes::from)
                .map_err(|e| TransportError::Decompress(e.to_string())),
            None => Ok(Bytes::new()),
        }
    }

    fn emit(&mut self, bytes: Bytes, last: bool) -> Option<Chunk> {
        match self.decoder.as_mut() {
            Some(decoder) => {
                let mut text = decoder.decode(&bytes);
                if last {
                    text.push_str(&decoder.finish());
                }
                (!text.is_empty()).then_some(Chunk::Text(text))
            }
            None => (!bytes.is_empty()).then_some(Chunk::Bytes(bytes)),
        }
    }
}

impl Stream for ResponseStream {
    type Item = Result<Chunk, TransportError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            if this.finished {
                return Poll::Ready(None);
            }
            match this.inner.as_mut().poll_next(cx) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
                Poll::Ready(Some(Ok(bytes))) => {
                    let inflated = match this.inflate(bytes) {
                        Ok(b) => b,
                        Err(e) => {
                            this.finished = true;
                            return Poll::Ready(Some(Err(e)));
                        }
                    };
                    if let Some(chunk) = this.emit(inflated, false) {
                        return Poll::Ready(Some(Ok(chunk)));
                    }
                }
                Poll::Ready(None) => {
                    this.finished = true;
                    return match this.finish_inflate() {
                        Ok(tail) => Poll::Ready(this.emit(tail, true).map(Ok)),
                        Err(e) => Poll::Ready(Some(Err(e))),
                    };
                }
            }
        }
    }
}

impl std::fmt::Debug for ResponseStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseStream")
            .field("decompressing", &self.inflater.is_some())
            .field("decoder", &self.decoder)
            .field("finished", &self.finished)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
    use flate2::Compression;
    use futures_util::stream;

    fn chunked(data: Vec<u8>, size: usize) -> ByteStream {
        let chunks: Vec<Result<Bytes, TransportError>> = data
            .chunks(size)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();
        Box::pin(stream::iter(chunks))
    }

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(data).unwrap();
        enc.finish().unwrap()
    }

    #[tokio::test]
    async fn test_gzip_is_inflated_as_bytes() {
        let body = ResponseStream::new(chunked(gzip(b"hello gzip"), 3), Some("gzip"));
        assert!(body.is_decompressing());
        assert_eq!(body.collect().await.unwrap(), RawBody::Bytes(Bytes::from_static(b"hello gzip")));
    }

    #[tokio::test]
    async fn test_deflate_zlib_and_raw() {
        let mut zlib = ZlibEncoder::new(Vec::new(), Compression::default());
        zlib.write_all(b"zlib body").unwrap();
        let body = ResponseStream::new(chunked(zlib.finish().unwrap(), 4), Some("Deflate"));
        assert_eq!(body.collect().await.unwrap(), RawBody::Bytes(Bytes::from_static(b"zlib body")));

        let mut raw = DeflateEncoder::new(Vec::new(), Compression::default());
        raw.write_all(b"raw body").unwrap();
        let body = ResponseStream::new(chunked(raw.finish().unwrap(), 4), Some("deflate"));
        assert_eq!(body.collect().await.unwrap(), RawBody::Bytes(Bytes::from_static(b"raw body")));
    }

    #[tokio::test]
    async fn test_unknown_encoding_passes_through() {
        let body = ResponseStream::new(chunked(b"plain".to_vec(), 2), Some("br, gzip"));
        assert!(!body.is_decompressing());
        assert_eq!(body.collect().await.unwrap(), RawBody::Bytes(Bytes::from_static(b"plain")));
    }

    #[tokio::test]
    async fn test_text_decoding_across_chunk_boundaries() {
        let data = "héllo wörld €".as_bytes().to_vec();
        let mut body = ResponseStream::new(chunked(gzip(&data), 1), Some("gzip"));
        body.set_encoding(ResponseEncoding::Utf8);
        assert_eq!(body.collect().await.unwrap(), RawBody::Text("héllo wörld €".to_string()));
    }

    #[tokio::test]
    async fn test_streaming_chunks_are_text_after_set_encoding() {
        let data = "añb".as_bytes().to_vec();
        let mut body = ResponseStream::new(chunked(data, 2), None);
        body.set_encoding(ResponseEncoding::Utf8);
        let mut chunks = Vec::new();
        while let Some(chunk) = body.next().await {
            chunks.push(chunk.unwrap());
        }
        // "ñ" is split across the two chunks and held back until complete
        assert_eq!(chunks, vec![Chunk::Text("a".into()), Chunk::Text("ñb".into())]);
    }

    #[tokio::test]
    async fn test_corrupt_gzip_is_an_error() {
        let body = ResponseStream::new(chunked(b"definitely not gzip".to_vec(), 5), Some("gzip"));
        assert_eq!(body.collect().await.unwrap_err().code(), "EDECOMPRESS");
    }

    #[test]
    fn test_latin1_and_invalid_utf8() {
        let mut latin = TextDecoder::new(ResponseEncoding::Latin1).unwrap();
        assert_eq!(latin.decode(&[0x63, 0x61, 0x66, 0xe9]), "café");

        let mut utf8 = TextDecoder::new(ResponseEncoding::Utf8).unwrap();
        assert_eq!(utf8.decode(&[b'a', 0xff, b'b']), "a\u{FFFD}b");
        assert!(TextDecoder::new(ResponseEncoding::Binary).is_none());
    }
}
