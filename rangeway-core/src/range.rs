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

//! HTTP byte-range parsing and window resolution.
//!
//! Two steps turn a `Range` request header into the byte window that is
//! relayed to the client:
//!
//! 1. [`parse_range`] accepts the single-range `bytes=` form and yields a
//!    [`RangeSpec`]. Anything it does not understand is treated as absent, so
//!    the caller falls back to a full-body response.
//! 2. [`resolve_window`] clamps the spec against the object size and yields a
//!    [`ResolvedWindow`], or [`RangeNotSatisfiable`] when no byte of the
//!    object falls inside the request.

use std::fmt;

/// Literal prefix of the only range unit understood here.
const BYTES_PREFIX: &str = "bytes=";

/// A parsed single byte range, before it is checked against the object size.
///
/// At least one bound is always present. Suffix requests (`bytes=-N`) are
/// converted into an absolute start by [`parse_range`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeSpec {
    /// First requested byte (inclusive).
    pub start: Option<u64>,
    /// Last requested byte (inclusive).
    pub end: Option<u64>,
}

/// The byte window that will be sent to the client.
///
/// For non-empty objects `start <= end <= size - 1` and
/// `length == end - start + 1`. Empty objects produce the empty full window
/// `{0, 0, 0, false}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedWindow {
    /// First byte (inclusive).
    pub start: u64,
    /// Last byte (inclusive). Meaningless when `length == 0`.
    pub end: u64,
    /// Number of bytes in the window.
    pub length: u64,
    /// Whether the response is 206 Partial Content.
    pub is_partial: bool,
}

impl ResolvedWindow {
    /// The full-object window.
    pub fn full(size: u64) -> Self {
        Self {
            start: 0,
            end: size.saturating_sub(1),
            length: size,
            is_partial: false,
        }
    }

    /// Renders the `Content-Range` value, e.g. `bytes 100-199/1000`.
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{}", self.start, self.end, size)
    }
}

/// The requested range lies entirely outside the object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangeNotSatisfiable {
    /// Size of the object the range was checked against.
    pub size: u64,
}

impl RangeNotSatisfiable {
    /// Renders the `Content-Range` value for a 416 response, e.g. `bytes */1000`.
    pub fn content_range(&self) -> String {
        format!("bytes */{}", self.size)
    }
}

impl fmt::Display for RangeNotSatisfiable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "requested range not satisfiable for object of {} bytes", self.size)
    }
}

impl std::error::Error for RangeNotSatisfiable {}

/// Parses a `Range` header value such as `bytes=0-499`, `bytes=500-` or `bytes=-200`.
///
/// Returns `None` for values that must be ignored: a missing `bytes=` prefix,
/// multiple ranges, both bounds absent, or bounds that are not unsigned
/// integers. No size validation happens here except for converting the suffix
/// form into an absolute start.
pub fn parse_range(value: &str, object_size: u64) -> Option<RangeSpec> {
    let value = value.trim().strip_prefix(BYTES_PREFIX)?;
    if value.contains(',') {
        return None;
    }
    let (start_str, end_str) = value.split_once('-')?;
    let (start_str, end_str) = (start_str.trim(), end_str.trim());

    match (start_str.is_empty(), end_str.is_empty()) {
        (true, true) => None,
        (true, false) => {
            // bytes=-N: the last N bytes. A zero-length suffix selects nothing.
            let suffix_len: u64 = parse_bound(end_str)?;
            let start = if suffix_len == 0 {
                object_size
            } else {
                object_size - suffix_len.min(object_size)
            };
            Some(RangeSpec {
                start: Some(start),
                end: None,
            })
        }
        (false, true) => Some(RangeSpec {
            start: Some(parse_bound(start_str)?),
            end: None,
        }),
        (false, false) => Some(RangeSpec {
            start: Some(parse_bound(start_str)?),
            end: Some(parse_bound(end_str)?),
        }),
    }
}

/// Digits only: `u64::from_str` would also accept a leading `+`.
fn parse_bound(s: &str) -> Option<u64> {
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

/// Resolves a parsed range against the object size.
///
/// - No spec: the full object, not partial.
/// - Empty object: always the empty full window, never 416.
/// - Otherwise missing bounds default to `0` and `size - 1`, the end is
///   clamped to `size - 1`, and a start past the end or past the object is
///   unsatisfiable.
pub fn resolve_window(
    spec: Option<&RangeSpec>,
    size: u64,
) -> Result<ResolvedWindow, RangeNotSatisfiable> {
    let spec = match spec {
        Some(spec) if size > 0 => spec,
        _ => return Ok(ResolvedWindow::full(size)),
    };

    let last = size - 1;
    let start = spec.start.unwrap_or(0);
    let end = spec.end.unwrap_or(last).min(last);

    if start >= size || start > end {
        return Err(RangeNotSatisfiable { size });
    }

    Ok(ResolvedWindow {
        start,
        end,
        length: end - start + 1,
        is_partial: true,
    })
}
