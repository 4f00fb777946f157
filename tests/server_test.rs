use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
    Router,
};
use tower::ServiceExt; // for oneshot

use slowreverb::audio::{self, AudioBuffer};
use slowreverb::config::Config;
use slowreverb::server::{create_router, AppState, ErrorResponse, HealthResponse};

const BOUNDARY: &str = "slowreverb-test-boundary";

fn router_with(config: Config) -> Router {
    create_router(Arc::new(AppState::new(config)))
}

fn router() -> Router {
    router_with(Config::default())
}

fn tone_wav(seconds: f32) -> Vec<u8> {
    let frames = (8000.0 * seconds) as usize;
    let data = (0..frames).map(|i| ((i as f32) * 0.05).sin() * 0.5).collect();
    audio::encode(&AudioBuffer::from_mono(8000, data).unwrap()).unwrap()
}

enum Part<'a> {
    File(&'a str, &'a [u8]),
    Text(&'a str, &'a str),
}

fn multipart_request(parts: &[Part]) -> Request<Body> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
        match part {
            Part::File(name, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: audio/wav\r\n\r\n",
                        name
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n{}", name, value).as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{}--\r\n", BOUNDARY).as_bytes());

    Request::builder()
        .method("POST")
        .uri("/process")
        .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={}", BOUNDARY))
        .body(Body::from(body))
        .unwrap()
}

async fn error_message(resp: axum::response::Response) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let err: ErrorResponse = serde_json::from_slice(&bytes).unwrap();
    err.error
}

#[tokio::test]
async fn health_and_index() {
    let resp = router()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let health: HealthResponse = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(health.status, "ok");
    assert_eq!(health.name, "slowreverb");

    let resp = router()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    assert!(String::from_utf8_lossy(&bytes).contains("Slow and Reverbifier"));
}

#[tokio::test]
async fn process_returns_slowed_wav() {
    let input = tone_wav(1.0);
    let req = multipart_request(&[
        Part::File("my song.wav", &input),
        Part::Text("speed_factor", "0.5"),
        Part::Text("wet_level", "0.3"),
    ]);

    let resp = router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "audio/wav");
    let disposition = resp.headers()[header::CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.contains("slowreverb_my_song.wav"));

    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let decoded = audio::decode(&bytes).unwrap();
    assert_eq!(decoded.sample_rate(), 8000);
    assert_eq!(decoded.frames(), 16000);
}

#[tokio::test]
async fn process_with_presets() {
    let input = tone_wav(0.5);
    let req = multipart_request(&[
        Part::File("clip.WAV", &input),
        Part::Text("speed", "0"),
        Part::Text("reverb", "3"),
    ]);

    let resp = router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let decoded = audio::decode(&bytes).unwrap();
    let expected = (4000.0 / (38000.0f32 / 44100.0)).round() as usize;
    assert!(decoded.frames().abs_diff(expected) <= 1);
}

#[tokio::test]
async fn missing_file_rejected() {
    let req = multipart_request(&[Part::Text("speed", "2")]);
    let resp = router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(resp).await, "No file provided");
}

#[tokio::test]
async fn empty_filename_rejected() {
    let input = tone_wav(0.1);
    let resp = router().oneshot(multipart_request(&[Part::File("", &input)])).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(resp).await, "No file selected");
}

#[tokio::test]
async fn non_wav_rejected() {
    let input = tone_wav(0.1);
    let resp = router().oneshot(multipart_request(&[Part::File("song.mp3", &input)])).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(error_message(resp).await, "Only WAV files are supported");
}

#[tokio::test]
async fn invalid_parameters_rejected() {
    let input = tone_wav(0.1);
    for field in [("speed", "10"), ("reverb", "-1"), ("speed_factor", "-1"), ("wet_level", "2.0")] {
        let req = multipart_request(&[Part::File("a.wav", &input), Part::Text(field.0, field.1)]);
        let resp = router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{:?}", field);
    }
}

#[tokio::test]
async fn undecodable_upload_is_unsupported_media() {
    let req = multipart_request(&[Part::File("fake.wav", b"this is not a wav file")]);
    let resp = router().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
    assert!(error_message(resp).await.contains("Unsupported format"));
}

#[tokio::test]
async fn oversized_upload_rejected() {
    let mut config = Config::default();
    config.limits.max_upload_bytes = 1024;

    let input = tone_wav(1.0);
    assert!(input.len() > 1024);
    let resp = router_with(config)
        .oneshot(multipart_request(&[Part::File("big.wav", &input)]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

#[tokio::test]
async fn overlong_audio_rejected() {
    let mut config = Config::default();
    config.limits.max_duration_secs = 0.5;

    let input = tone_wav(1.0);
    let resp = router_with(config)
        .oneshot(multipart_request(&[Part::File("long.wav", &input)]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(error_message(resp).await.contains("too long"));
}

#[tokio::test]
async fn body_over_transport_limit_rejected() {
    // the body overruns max_upload_bytes plus the form allowance, so the
    // multipart reader fails before the explicit size check is reached
    let mut config = Config::default();
    config.limits.max_upload_bytes = 1024;

    let input = tone_wav(10.0);
    assert!(input.len() > 1024 + 64 * 1024);
    let resp = router_with(config)
        .oneshot(multipart_request(&[Part::File("huge.wav", &input)]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(error_message(resp).await.starts_with("File too large"));
}

#[tokio::test]
async fn request_past_deadline_times_out() {
    let mut config = Config::default();
    config.server.request_timeout_secs = 0.001;

    let frames = 44100 * 5;
    let interleaved: Vec<f32> = (0..frames * 2).map(|i| ((i / 2) as f32 * 0.01).sin() * 0.5).collect();
    let input = audio::encode(&AudioBuffer::from_interleaved(44100, 2, &interleaved).unwrap()).unwrap();

    let resp = router_with(config)
        .oneshot(multipart_request(&[Part::File("slow.wav", &input), Part::Text("reverb", "3")]))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(error_message(resp).await, "Processing timed out");
}
