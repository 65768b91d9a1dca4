// Copyright 2026 Rangeway Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Response body that relays exactly one byte window from the backend.

use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use futures_util::Stream;
use rangeway_core::ByteStream;
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Streaming,
    Complete,
    Failed,
}

/// Wraps a backend stream so that exactly `length` bytes reach the client.
///
/// - Extra bytes from the backend are cut off.
/// - A backend error, or the backend ending early, yields an I/O error; the
///   HTTP layer then aborts the connection since headers are already sent.
/// - The backend stream is dropped as soon as the window is complete or
///   fails. If the client goes away first, dropping this body drops it too.
pub struct WindowedStream {
    inner: Option<ByteStream>,
    remaining: u64,
    length: u64,
    label: String,
    state: State,
}

impl WindowedStream {
    /// Creates a body relaying `length` bytes of `inner`. `label` names the
    /// object in logs.
    pub fn new(inner: ByteStream, length: u64, label: impl Into<String>) -> Self {
        let state = if length == 0 {
            State::Complete
        } else {
            State::Streaming
        };
        Self {
            inner: if length == 0 { None } else { Some(inner) },
            remaining: length,
            length,
            label: label.into(),
            state,
        }
    }

    fn sent(&self) -> u64 {
        self.length - self.remaining
    }

    fn fail(&mut self, reason: &'static str, err: io::Error) -> Poll<Option<io::Result<Bytes>>> {
        self.inner = None;
        self.state = State::Failed;
        error!(
            "Stream aborted after {} of {} bytes ({}): {}: {}",
            self.sent(),
            self.length,
            reason,
            self.label,
            err
        );
        metrics::counter!("stream_aborted_total", "reason" => reason).increment(1);
        Poll::Ready(Some(Err(err)))
    }
}

impl Stream for WindowedStream {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.state != State::Streaming {
            return Poll::Ready(None);
        }

        loop {
            let Some(inner) = this.inner.as_mut() else {
                return Poll::Ready(None);
            };

            match ready!(inner.as_mut().poll_next(cx)) {
                Some(Ok(mut chunk)) => {
                    if chunk.is_empty() {
                        continue;
                    }
                    if chunk.len() as u64 > this.remaining {
                        debug!(
                            "Backend sent {} bytes past the window, truncating: {}",
                            chunk.len() as u64 - this.remaining,
                            this.label
                        );
                        chunk.truncate(this.remaining as usize);
                    }

                    this.remaining -= chunk.len() as u64;
                    metrics::counter!("stream_bytes_sent_total").increment(chunk.len() as u64);

                    if this.remaining == 0 {
                        this.inner = None;
                        this.state = State::Complete;
                        debug!("Stream complete ({} bytes): {}", this.length, this.label);
                    }
                    return Poll::Ready(Some(Ok(chunk)));
                }
                Some(Err(err)) => return this.fail("backend_error", err.into()),
                None => {
                    let err = io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        format!(
                            "backend stream ended after {} of {} bytes",
                            this.sent(),
                            this.length
                        ),
                    );
                    return this.fail("short_read", err);
                }
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.state {
            State::Streaming => (0, None),
            _ => (0, Some(0)),
        }
    }
}

impl Drop for WindowedStream {
    fn drop(&mut self) {
        if self.state == State::Streaming && self.inner.is_some() {
            debug!(
                "Client disconnected after {} of {} bytes: {}",
                self.sent(),
                self.length,
                self.label
            );
            metrics::counter!("stream_aborted_total", "reason" => "client_disconnect").increment(1);
        }
    }
}
