//! Integration tests for the multipart upload client
//!
//! Runs a one-shot TCP server per test that reads the request and replies
//! with a canned JSON body.

use std::io::{Cursor, Read, Write};
use std::net::TcpListener;
use std::thread::JoinHandle;

use needlestore::{upload, StoreError};

/// Serve exactly one request with the given JSON body, capturing the raw
/// request bytes
fn one_shot_server(body: &'static str) -> (String, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/3,01637037d6", listener.local_addr().unwrap());

    let handle = std::thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let mut request = Vec::new();
        let mut chunk = [0u8; 4096];
        // Multipart bodies end with a closing boundary "--\r\n"; under
        // chunked transfer encoding a zero-length chunk follows it.
        loop {
            let n = stream.read(&mut chunk).unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&chunk[..n]);
            if request.ends_with(b"--\r\n") || request.ends_with(b"0\r\n\r\n") {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).unwrap();
        request
    });

    (url, handle)
}

#[test]
fn upload_parses_size_from_response() {
    let (url, server) = one_shot_server(r#"{"Size": 2816}"#);

    let data = Cursor::new(vec![1u8; 2816]);
    let result = upload(&url, "photo.jpg", data, false, None).unwrap();
    assert_eq!(result.size, 2816);

    let request = server.join().unwrap();
    let request = String::from_utf8_lossy(&request).to_lowercase();
    assert!(request.starts_with("post /3,01637037d6"));
    assert!(request.contains(r#"name="file""#));
    assert!(request.contains(r#"filename="photo.jpg""#));
    assert!(request.contains("content-type: image/jpeg"));
}

#[test]
fn gzip_flag_sets_content_encoding() {
    let (url, server) = one_shot_server(r#"{"Size": 10}"#);

    let data = Cursor::new(vec![0u8; 10]);
    upload(&url, "blob.bin", data, true, Some("application/octet-stream")).unwrap();

    let request = String::from_utf8_lossy(&server.join().unwrap()).to_lowercase();
    assert!(request.contains("content-encoding: gzip"));
}

#[test]
fn server_side_error_fails_despite_http_200() {
    let (url, server) = one_shot_server(r#"{"Size": 0, "Error": "volume 3 is read only"}"#);

    let data = Cursor::new(vec![0u8; 4]);
    let result = upload(&url, "x.dat", data, false, None);
    match result {
        Err(StoreError::UploadRejected(message)) => {
            assert_eq!(message, "volume 3 is read only")
        }
        other => panic!("expected UploadRejected, got {other:?}"),
    }
    server.join().unwrap();
}

#[test]
fn connection_failure_surfaces_as_http_error() {
    // Nothing listens here.
    let data = Cursor::new(vec![0u8; 4]);
    let result = upload("http://127.0.0.1:1/x", "x.dat", data, false, None);
    assert!(matches!(result, Err(StoreError::Http(_))));
}
