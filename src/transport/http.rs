//! Server-Sent Events transport over HTTP.
//!
//! Issues a `GET` with `Accept: text/event-stream` and decodes the body
//! incrementally. Non-2xx responses fail the connect. Named events are
//! skipped, matching what an `onmessage` listener sees.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use reqwest::Client;
use reqwest::header::{ACCEPT, CACHE_CONTROL};

use crate::error::{AppError, Result};
use crate::models::ApiConfig;
use crate::transport::{EventTransport, PayloadStream};
use crate::utils::http::create_stream_client;
use crate::utils::sse::SseDecoder;

/// reqwest-backed event stream transport.
#[derive(Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport with a client built from the API settings.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        Ok(Self::with_client(create_stream_client(config)?))
    }

    /// Create a transport around an existing client.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventTransport for HttpTransport {
    async fn connect(&self, url: &str) -> Result<PayloadStream> {
        let response = self
            .client
            .get(url)
            .header(ACCEPT, "text/event-stream")
            .header(CACHE_CONTROL, "no-cache")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::transport(url, format!("unexpected status {status}")));
        }

        Ok(payload_stream(url.to_string(), Box::pin(response.bytes_stream())))
    }
}

struct DecodeState<S> {
    url: String,
    chunks: S,
    decoder: SseDecoder,
    ready: VecDeque<String>,
    failed: bool,
}

/// Decode a byte stream into message payloads. A read error is yielded once
/// and ends the stream.
fn payload_stream<S, B>(url: String, chunks: S) -> PayloadStream
where
    S: Stream<Item = reqwest::Result<B>> + Send + Unpin + 'static,
    B: AsRef<[u8]> + Send + 'static,
{
    let state = DecodeState {
        url,
        chunks,
        decoder: SseDecoder::new(),
        ready: VecDeque::new(),
        failed: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(payload) = state.ready.pop_front() {
                return Some((Ok(payload), state));
            }
            if state.failed {
                return None;
            }

            match state.chunks.next().await {
                Some(Ok(chunk)) => {
                    for frame in state.decoder.feed(chunk.as_ref()) {
                        if frame.is_message() {
                            state.ready.push_back(frame.data);
                        } else {
                            log::debug!(
                                "Skipping named event '{}'",
                                frame.event.as_deref().unwrap_or_default()
                            );
                        }
                    }
                }
                Some(Err(e)) => {
                    state.failed = true;
                    let error = AppError::transport(state.url.clone(), e);
                    return Some((Err(error), state));
                }
                None => return None,
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and return the stream URL.
    async fn serve_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        });

        format!("http://{addr}/live/matches/M1/stream")
    }

    fn transport() -> HttpTransport {
        HttpTransport::new(&ApiConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_stream_yields_message_payloads() {
        let url = serve_once(
            "HTTP/1.1 200 OK\r\n\
             Content-Type: text/event-stream\r\n\
             Connection: close\r\n\r\n\
             : welcome\n\n\
             data: {\"matchId\":\"M1\",\"message\":\"Toss\",\"eventType\":\"match-start\"}\n\n\
             event: ping\ndata: 1\n\n\
             data: second\n\n",
        )
        .await;

        let stream = transport().connect(&url).await.unwrap();
        let payloads: Vec<String> = stream.map(|item| item.unwrap()).collect().await;

        assert_eq!(payloads.len(), 2);
        assert!(payloads[0].contains("\"Toss\""));
        assert_eq!(payloads[1], "second");
    }

    #[tokio::test]
    async fn test_error_status_fails_connect() {
        let url = serve_once(
            "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n",
        )
        .await;

        let result = transport().connect(&url).await;
        assert!(matches!(result, Err(AppError::Transport { .. })));
    }

    #[tokio::test]
    async fn test_refused_connection_fails_connect() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let url = format!("http://{addr}/live/matches/M1/stream");
        assert!(transport().connect(&url).await.is_err());
    }

    #[tokio::test]
    async fn test_payload_stream_reassembles_chunks() {
        let chunks: Vec<reqwest::Result<Vec<u8>>> = vec![
            Ok(b"data: {\"a\"".to_vec()),
            Ok(b":1}\r".to_vec()),
            Ok(b"\n\r\ndata: b\n".to_vec()),
            Ok(b"\n".to_vec()),
            Ok(b"data: unfinished\n".to_vec()),
        ];

        let payloads: Vec<String> = payload_stream("test".into(), stream::iter(chunks))
            .map(|item| item.unwrap())
            .collect()
            .await;

        assert_eq!(payloads, vec!["{\"a\":1}".to_string(), "b".to_string()]);
    }
}
