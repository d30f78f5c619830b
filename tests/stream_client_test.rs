//! End-to-end tests for the stream client against a mock SSE backend.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use docchat_stream::{
    StaticTokenProvider, StreamClient, StreamConfig, StreamError, StreamEvent, StreamRequest,
};

fn client_for(server: &MockServer, token: &str) -> StreamClient {
    StreamClient::new(
        StreamConfig::with_base_url(server.uri()),
        Arc::new(StaticTokenProvider::new(token)),
    )
}

fn sse_response(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/event-stream")
}

async fn collect_events(
    client: &StreamClient,
    request: &StreamRequest,
) -> Vec<Result<StreamEvent, StreamError>> {
    let stream = client.stream(request).await.expect("stream opens");
    stream.collect().await
}

#[tokio::test]
async fn test_streams_cumulative_content_until_sentinel() {
    let server = MockServer::start().await;
    let body = "data: {\"content\": \"Die\"}\n\n\
                data: {\"content\": \"Die Antwort\"}\n\n\
                data: [DONE]\n\n";
    Mock::given(method("GET"))
        .and(path("/api/question/stream"))
        .respond_with(sse_response(body))
        .mount(&server)
        .await;

    let client = client_for(&server, "tok");
    let events = collect_events(&client, &StreamRequest::new("Was ist nscale?", "s1")).await;

    assert_eq!(events.len(), 3);
    assert_eq!(
        events[0].as_ref().expect("first"),
        &StreamEvent::Content {
            text: "Die".to_string()
        }
    );
    assert_eq!(
        events[1].as_ref().expect("second"),
        &StreamEvent::Content {
            text: "Die Antwort".to_string()
        }
    );
    assert_eq!(events[2].as_ref().expect("third"), &StreamEvent::Done);
}

#[tokio::test]
async fn test_sends_bearer_token_and_query_parameters() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/question/stream"))
        .and(header("Authorization", "Bearer secret-token"))
        .and(header("Accept", "text/event-stream"))
        .and(query_param("question", "Was ist nscale?"))
        .and(query_param("session_id", "s1"))
        .and(query_param("simple_language", "true"))
        .respond_with(sse_response("data: [DONE]\n\n"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "secret-token");
    let request = StreamRequest::new("Was ist nscale?", "s1").with_simple_language(true);
    let events = collect_events(&client, &request).await;

    assert_eq!(events.len(), 1);
    assert_eq!(events[0].as_ref().expect("done"), &StreamEvent::Done);
}

#[tokio::test]
async fn test_done_event_name_stops_before_trailing_frames() {
    let server = MockServer::start().await;
    // Bytes after the done frame must not surface as events.
    let body = "data: {\"content\": \"answer\"}\n\n\
                event: done\ndata: {}\n\n\
                data: {\"content\": \"stale\"}\n\n";
    Mock::given(method("GET"))
        .and(path("/api/question/stream"))
        .respond_with(sse_response(body))
        .mount(&server)
        .await;

    let client = client_for(&server, "tok");
    let events = collect_events(&client, &StreamRequest::new("q", "s1")).await;

    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0].as_ref().expect("content"),
        &StreamEvent::Content {
            text: "answer".to_string()
        }
    );
    assert_eq!(events[1].as_ref().expect("done"), &StreamEvent::Done);
}

#[tokio::test]
async fn test_plain_text_payload_passes_through() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/question/stream"))
        .respond_with(sse_response("data: not json at all\n\ndata: [DONE]\n\n"))
        .mount(&server)
        .await;

    let client = client_for(&server, "tok");
    let events = collect_events(&client, &StreamRequest::new("q", "s1")).await;

    assert_eq!(
        events[0].as_ref().expect("content"),
        &StreamEvent::Content {
            text: "not json at all".to_string()
        }
    );
}

#[tokio::test]
async fn test_multi_data_lines_join_with_newline() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/question/stream"))
        .respond_with(sse_response("data: line one\ndata: line two\n\n"))
        .mount(&server)
        .await;

    let client = client_for(&server, "tok");
    let events = collect_events(&client, &StreamRequest::new("q", "s1")).await;

    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].as_ref().expect("content"),
        &StreamEvent::Content {
            text: "line one\nline two".to_string()
        }
    );
}

#[tokio::test]
async fn test_unterminated_trailing_frame_flushes_on_close() {
    let server = MockServer::start().await;
    // The final frame has no blank-line terminator; the transport close
    // flushes it.
    Mock::given(method("GET"))
        .and(path("/api/question/stream"))
        .respond_with(sse_response(
            "data: {\"content\": \"first\"}\n\ndata: {\"content\": \"first and last\"}",
        ))
        .mount(&server)
        .await;

    let client = client_for(&server, "tok");
    let events = collect_events(&client, &StreamRequest::new("q", "s1")).await;

    assert_eq!(events.len(), 2);
    assert_eq!(
        events[1].as_ref().expect("flushed"),
        &StreamEvent::Content {
            text: "first and last".to_string()
        }
    );
}

#[tokio::test]
async fn test_backend_error_payload_surfaces_as_error_event() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/question/stream"))
        .respond_with(sse_response("data: {\"error\": \"index unavailable\"}\n\n"))
        .mount(&server)
        .await;

    let client = client_for(&server, "tok");
    let events = collect_events(&client, &StreamRequest::new("q", "s1")).await;

    assert_eq!(events.len(), 1);
    assert_eq!(
        events[0].as_ref().expect("error event"),
        &StreamEvent::Error {
            message: "index unavailable".to_string()
        }
    );
}

#[tokio::test]
async fn test_comment_frames_are_ignored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/question/stream"))
        .respond_with(sse_response(
            ": keep-alive\n\ndata: {\"content\": \"hi\"}\n\ndata: [DONE]\n\n",
        ))
        .mount(&server)
        .await;

    let client = client_for(&server, "tok");
    let events = collect_events(&client, &StreamRequest::new("q", "s1")).await;

    assert_eq!(events.len(), 2);
    assert!(matches!(
        events[0].as_ref().expect("content"),
        StreamEvent::Content { .. }
    ));
}

/// SSE server that writes the body in fixed chunks with a pause between
/// them, so transport chunk boundaries land exactly where the test puts
/// them. The mock server always sends its body in one piece.
async fn spawn_chunked_sse_server(chunks: &'static [&'static [u8]]) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        let mut buf = [0u8; 2048];
        let _ = socket.read(&mut buf).await;
        let head = "HTTP/1.1 200 OK\r\n\
                    content-type: text/event-stream\r\n\
                    connection: close\r\n\r\n";
        let _ = socket.write_all(head.as_bytes()).await;
        for chunk in chunks {
            let _ = socket.write_all(chunk).await;
            let _ = socket.flush().await;
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
    });
    format!("http://{}", addr)
}

#[tokio::test]
async fn test_frame_split_inside_multibyte_char_is_not_lost() {
    // "Grün" is G r 0xC3 0xBC n; the boundary falls between the umlaut's
    // two bytes, so neither chunk is valid UTF-8 on its own.
    let base_url = spawn_chunked_sse_server(&[
        b"data: {\"content\": \"Gr\xC3" as &[u8],
        b"\xBCn\"}\n\ndata: [DONE]\n\n",
    ])
    .await;

    let client = StreamClient::new(
        StreamConfig::with_base_url(&base_url),
        Arc::new(StaticTokenProvider::new("tok")),
    );
    let events = collect_events(&client, &StreamRequest::new("q", "s1")).await;

    assert_eq!(events.len(), 2);
    assert_eq!(
        events[0].as_ref().expect("content"),
        &StreamEvent::Content {
            text: "Gr\u{fc}n".to_string()
        }
    );
    assert_eq!(events[1].as_ref().expect("done"), &StreamEvent::Done);
}

#[tokio::test]
async fn test_non_success_status_is_server_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/question/stream"))
        .respond_with(ResponseTemplate::new(503).set_body_string("backend overloaded"))
        .mount(&server)
        .await;

    let client = client_for(&server, "tok");
    let result = client.stream(&StreamRequest::new("q", "s1")).await;

    match result {
        Err(StreamError::Server { status, message }) => {
            assert_eq!(status, 503);
            assert_eq!(message, "backend overloaded");
        }
        Err(other) => panic!("expected Server error, got {other}"),
        Ok(_) => panic!("expected Server error, got a stream"),
    }
}

#[tokio::test]
async fn test_missing_token_sends_no_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/question/stream"))
        .respond_with(sse_response("data: [DONE]\n\n"))
        .expect(0)
        .mount(&server)
        .await;

    let client = StreamClient::new(
        StreamConfig::with_base_url(server.uri()),
        Arc::new(StaticTokenProvider::empty()),
    );
    let result = client.stream(&StreamRequest::new("q", "s1")).await;

    assert!(matches!(result, Err(StreamError::Auth { .. })));
    server.verify().await;
}
