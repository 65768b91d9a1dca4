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

//! Range resolution checked exhaustively over small objects, and the
//! resulting windows read back from the in-memory backend.

use futures_util::StreamExt;
use rangeway_core::{
    parse_range, resolve_window, ByteStream, MemoryBackend, ObjectBackend, RangeNotSatisfiable,
    ResolvedWindow,
};

fn resolve(header: &str, size: u64) -> Result<ResolvedWindow, RangeNotSatisfiable> {
    let spec = parse_range(header, size);
    resolve_window(spec.as_ref(), size)
}

async fn read_all(mut stream: ByteStream) -> Vec<u8> {
    let mut out = Vec::new();
    while let Some(chunk) = stream.next().await {
        out.extend_from_slice(&chunk.expect("memory backend does not fail mid-stream"));
    }
    out
}

#[test]
fn test_closed_ranges_within_object() {
    for size in 1..=24u64 {
        for a in 0..size {
            for b in a..size {
                let window = resolve(&format!("bytes={}-{}", a, b), size).unwrap();
                assert_eq!(
                    window,
                    ResolvedWindow {
                        start: a,
                        end: b,
                        length: b - a + 1,
                        is_partial: true
                    },
                    "size={} a={} b={}",
                    size,
                    a,
                    b
                );
            }
        }
    }
}

#[test]
fn test_open_ranges_end_at_last_byte() {
    for size in 1..=24u64 {
        for a in 0..size {
            let window = resolve(&format!("bytes={}-", a), size).unwrap();
            assert_eq!(window.end, size - 1);
            assert_eq!(window.length, size - a);
        }
    }
}

#[test]
fn test_out_of_bounds_ranges_are_unsatisfiable() {
    for size in 1..=24u64 {
        for a in size..size + 5 {
            assert_eq!(
                resolve(&format!("bytes={}-{}", a, a + 3), size),
                Err(RangeNotSatisfiable { size })
            );
            assert_eq!(
                resolve(&format!("bytes={}-", a), size),
                Err(RangeNotSatisfiable { size })
            );
        }
        for a in 1..size {
            assert!(resolve(&format!("bytes={}-{}", a, a - 1), size).is_err());
        }
    }
}

#[test]
fn test_empty_object_never_unsatisfiable() {
    for header in ["bytes=0-0", "bytes=0-", "bytes=10-20", "bytes=-5", "bytes=-0"] {
        assert_eq!(resolve(header, 0), Ok(ResolvedWindow::full(0)), "{}", header);
    }
}

#[test]
fn test_windows_stay_inside_object() {
    let headers = [
        "bytes=0-0",
        "bytes=3-",
        "bytes=-1",
        "bytes=-100",
        "bytes=2-1000",
        "bytes=7-7",
    ];
    for size in 1..=16u64 {
        for header in headers {
            if let Ok(w) = resolve(header, size) {
                assert!(w.start <= w.end && w.end < size, "{} size={}", header, size);
                assert_eq!(w.length, w.end - w.start + 1);
            }
        }
    }
}

#[tokio::test]
async fn test_backend_windows_are_byte_exact() {
    let data: Vec<u8> = (0..300u32).map(|i| (i * 31 % 256) as u8).collect();
    let backend = MemoryBackend::with_chunk_size(7);
    backend
        .insert("bucket", "obj", data.clone(), "application/octet-stream")
        .await;

    let size = data.len() as u64;
    for header in ["bytes=0-0", "bytes=5-18", "bytes=299-", "bytes=-13", "bytes=100-999"] {
        let window = resolve(header, size).unwrap();
        let stream = backend
            .get_object_range("bucket", "obj", window.start, window.length)
            .await
            .unwrap();
        let bytes = read_all(stream).await;
        assert_eq!(
            bytes,
            &data[window.start as usize..=window.end as usize],
            "{}",
            header
        );
    }
}
