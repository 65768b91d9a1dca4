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

//! XML bodies exchanged with S3-compatible backends.

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;

use crate::error::BackendError;
use crate::types::BucketInfo;

/// Parses a `ListAllMyBucketsResult` document.
pub fn parse_list_buckets(xml: &str) -> Result<Vec<BucketInfo>, BackendError> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let mut buckets = Vec::new();
    let mut current: Option<BucketInfo> = None;
    let mut current_element = String::new();
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                current_element = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if current_element == "Bucket" {
                    current = Some(BucketInfo {
                        name: String::new(),
                        creation_date: None,
                    });
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(ref mut bucket) = current {
                    let text = e
                        .unescape()
                        .map_err(|e| BackendError::Io(format!("invalid bucket list XML: {}", e)))?
                        .to_string();
                    match current_element.as_str() {
                        "Name" => bucket.name = text,
                        "CreationDate" => bucket.creation_date = parse_timestamp(&text),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"Bucket" {
                    if let Some(bucket) = current.take() {
                        if !bucket.name.is_empty() {
                            buckets.push(bucket);
                        }
                    }
                }
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(BackendError::Io(format!("invalid bucket list XML: {}", e)));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(buckets)
}

/// Extracts `<Code>` from an S3 error document, if present.
pub fn parse_error_code(xml: &str) -> Option<String> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);
    let mut in_code = false;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => in_code = e.name().as_ref() == b"Code",
            Ok(Event::Text(e)) if in_code => {
                return e.unescape().ok().map(|t| t.to_string());
            }
            Ok(Event::End(_)) => in_code = false,
            Ok(Event::Eof) | Err(_) => return None,
            _ => {}
        }
        buf.clear();
    }
}

/// Body of a CreateBucket request for regions other than `us-east-1`.
pub fn create_bucket_configuration(region: &str) -> String {
    format!(
        r#"<CreateBucketConfiguration xmlns="http://s3.amazonaws.com/doc/2006-03-01/"><LocationConstraint>{}</LocationConstraint></CreateBucketConfiguration>"#,
        escape_xml(region)
    )
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text).ok().map(|dt| dt.with_timezone(&Utc))
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_buckets() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListAllMyBucketsResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Owner><ID>owner</ID><DisplayName>minio</DisplayName></Owner>
  <Buckets>
    <Bucket><Name>media</Name><CreationDate>2024-01-01T00:00:00.000Z</CreationDate></Bucket>
    <Bucket><Name>test-bucket</Name><CreationDate>2024-02-01T12:30:00.000Z</CreationDate></Bucket>
  </Buckets>
</ListAllMyBucketsResult>"#;

        let buckets = parse_list_buckets(xml).unwrap();
        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].name, "media");
        assert_eq!(buckets[1].name, "test-bucket");
        assert!(buckets[0].creation_date.is_some());
    }

    #[test]
    fn test_parse_list_buckets_empty() {
        let xml = r#"<ListAllMyBucketsResult><Owner><ID>x</ID></Owner><Buckets></Buckets></ListAllMyBucketsResult>"#;
        assert!(parse_list_buckets(xml).unwrap().is_empty());
    }

    #[test]
    fn test_parse_error_code() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<Error><Code>NoSuchBucket</Code><Message>The specified bucket does not exist</Message></Error>"#;
        assert_eq!(parse_error_code(xml).as_deref(), Some("NoSuchBucket"));
        assert_eq!(parse_error_code("not xml at all"), None);
    }

    #[test]
    fn test_create_bucket_configuration() {
        let body = create_bucket_configuration("eu-west-1");
        assert!(body.contains("<LocationConstraint>eu-west-1</LocationConstraint>"));
    }
}
