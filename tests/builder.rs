//! Builder behaviour observed through recording collaborators.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use unirest::request::RelatedPart;
use unirest::Unirest;

mod common;

use common::{MockFiles, MockTransport};

fn client(transport: &MockTransport, files: &MockFiles) -> Unirest {
    Unirest::builder()
        .transport(Arc::new(transport.clone()))
        .files(Arc::new(files.clone()))
        .build()
}

#[tokio::test]
async fn test_streamed_attachment_reaches_transport_as_one_stream_part() {
    let transport = MockTransport::new();
    let files = MockFiles::default();

    let response = client(&transport, &files)
        .post("http://upload.test/files")
        .attach("file", "/tmp/doesnotmatter.txt")
        .stream()
        .await
        .unwrap();
    assert!(response.ok());

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    assert!(!calls[0].direct);
    assert_eq!(calls[0].parts.len(), 1);
    let part = &calls[0].parts[0];
    assert_eq!(part.name, "file");
    assert!(part.attachment);
    assert!(part.is_stream);
    assert_eq!(part.filename.as_deref(), Some("doesnotmatter.txt"));
    assert_eq!(part.content_type.as_deref(), Some("text/plain"));

    assert_eq!(
        *files.opened.lock().unwrap(),
        vec![PathBuf::from("/tmp/doesnotmatter.txt")]
    );
}

#[tokio::test]
async fn test_buffered_multipart_is_dispatched_with_boundary() {
    let transport = MockTransport::new();
    let files = MockFiles::default();

    client(&transport, &files)
        .post("http://upload.test/files")
        .header("X-Custom-Header", "kept")
        .field("tags", json!(["a", "b"]))
        .attach("file", "/tmp/notes.txt")
        .await
        .unwrap();

    let calls = transport.calls();
    assert_eq!(calls.len(), 1);
    let call = &calls[0];
    assert!(call.direct);
    assert_eq!(call.headers.contains_key("x-custom-header"), Some("X-Custom-Header"));

    let content_type = call.headers.content_type().unwrap();
    let boundary = content_type
        .strip_prefix("multipart/form-data; boundary=")
        .unwrap();
    let body = String::from_utf8(call.body.clone().unwrap().to_vec()).unwrap();
    assert_eq!(body.matches("name=\"tags\"").count(), 2);
    assert!(body.contains("filename=\"notes.txt\"\r\nContent-Type: text/plain\r\n\r\nmock file\r\n"));
    assert!(body.ends_with(&format!("--{}--\r\n", boundary)));
}

#[tokio::test]
async fn test_plain_request_uses_generic_path() {
    let transport = MockTransport::new();
    let files = MockFiles::default();

    let response = client(&transport, &files)
        .get("http://api.test/items")
        .query(json!({"page": 2}))
        .header("Accept", "application/json")
        .await
        .unwrap();

    assert_eq!(response.body.as_parsed(), Some(&json!({"ok": true})));
    let calls = transport.calls();
    assert_eq!(calls[0].url, "http://api.test/items?page=2");
    assert_eq!(calls[0].method, http::Method::GET);
    assert!(calls[0].parts.is_empty());
    assert!(files.opened.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_related_parts_travel_in_options() {
    let transport = MockTransport::new();
    let files = MockFiles::default();

    let request = client(&transport, &files)
        .post("http://api.test/batch")
        .part_with("application/json", json!({"id": 1}))
        .part("plain text");
    let related: &Vec<RelatedPart> = &request.options().multipart;
    assert_eq!(related.len(), 2);
    assert_eq!(related[0].content_type.as_deref(), Some("application/json"));
    assert_eq!(related[1].content_type, None);

    request.await.unwrap();
    assert!(!transport.calls()[0].direct);
}

#[tokio::test]
async fn test_missing_response_is_an_error() {
    let transport = MockTransport::silent();
    let files = MockFiles::default();

    let err = client(&transport, &files)
        .get("http://api.test/")
        .await
        .unwrap_err();

    assert!(matches!(err, unirest::Error::NoResponse));
    assert_eq!(transport.calls().len(), 1);
}

#[tokio::test]
async fn test_unreadable_attachment_is_reported() {
    let transport = MockTransport::new();

    let err = Unirest::builder()
        .transport(Arc::new(transport.clone()))
        .build()
        .post("http://upload.test/")
        .attach("file", "/definitely/not/here.bin")
        .await
        .unwrap_err();

    assert!(matches!(err, unirest::Error::Attachment { .. }));
    assert!(transport.calls().is_empty());
}
