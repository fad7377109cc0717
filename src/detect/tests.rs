use super::*;
use crate::errors::TransportError;
use crate::prompt::{ContentPart, Message};
use reqwest::StatusCode;
use serde_json::json;
use std::sync::Mutex;

struct StubClient {
    reply: std::result::Result<String, TransportError>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl StubClient {
    fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            calls: Mutex::new(vec![]),
        }
    }

    fn failing(err: TransportError) -> Self {
        Self {
            reply: Err(err),
            calls: Mutex::new(vec![]),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

impl ChatCompletion for StubClient {
    async fn complete(
        &self,
        messages: Vec<Message>,
        _model: &ModelId,
        _options: &CompletionOptions,
    ) -> std::result::Result<String, TransportError> {
        self.calls.lock().unwrap().push(messages);
        self.reply.clone()
    }
}

fn detector(client: StubClient) -> Detector<StubClient> {
    Detector::new(
        client,
        ModelId::new("qwen-vl-max"),
        CompletionOptions::default(),
    )
}

fn status_error(status: StatusCode, message: &str) -> TransportError {
    TransportError::Status {
        status,
        code: None,
        message: message.to_string(),
    }
}

#[tokio::test]
async fn test_non_biological_end_to_end() {
    let detector = detector(StubClient::replying(
        r#"{"is_biological":false,"message":"no organism found"}"#,
    ));
    let outcome = detector.detect(Some("abc123==")).await;
    let response = ApiResponse::from(outcome);
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({
            "code": 200,
            "message": "识别成功",
            "data": {"is_biological": false, "message": "no organism found"}
        })
    );
}

#[tokio::test]
async fn test_biological_result() {
    let detector = detector(StubClient::replying(
        r#"{"is_biological":true,"name":"蒲公英","scientific_name":"Taraxacum officinale","type":"flower","confidence":0.92,"habitat":"温带","description":"多年生草本植物"}"#,
    ));
    let outcome = detector.detect(Some("data:image/webp;base64,UklGRg==")).await;
    let Outcome::Classified(RecognitionResult::Biological(bio)) = &outcome else {
        panic!("unexpected outcome: {outcome:?}");
    };
    assert_eq!(bio.scientific_name(), Some("Taraxacum officinale"));
    assert_eq!(outcome.code(), 200);
}

#[tokio::test]
async fn test_prompt_sent_to_model() {
    let client = StubClient::replying(r#"{"is_biological":false,"message":"x"}"#);
    let detector = detector(client);
    detector.detect(Some("data:image/jpeg;base64,/9j/4AAQ")).await;

    let calls = detector.client.calls.lock().unwrap();
    assert_eq!(calls.len(), 1);
    let content = &calls[0][0].content;
    assert_eq!(content.len(), 2);
    let ContentPart::ImageUrl { image_url } = &content[0] else {
        panic!("first part must be the image");
    };
    assert_eq!(image_url.url, "data:image/png;base64,/9j/4AAQ");
    assert!(matches!(content[1], ContentPart::Text { .. }));
}

#[tokio::test]
async fn test_missing_payload_never_calls_model() {
    for image_data in [None, Some("")] {
        let detector = detector(StubClient::replying("{}"));
        let outcome = detector.detect(image_data).await;
        assert_eq!(outcome, Outcome::Rejected(ValidationError::MissingPayload));
        assert_eq!(detector.client.call_count(), 0);

        let response = ApiResponse::from(outcome);
        assert_eq!(response.code, 400);
        assert_eq!(response.message, "参数错误");
        assert_eq!(
            serde_json::to_value(&response.data).unwrap(),
            json!({"is_biological": false, "detail": "缺少图片数据（imageData）"})
        );
    }
}

#[tokio::test]
async fn test_invalid_encoding_never_calls_model() {
    let detector = detector(StubClient::replying("{}"));
    let outcome = detector.detect(Some("not base64!")).await;
    assert_eq!(outcome, Outcome::Rejected(ValidationError::InvalidEncoding));
    assert_eq!(detector.client.call_count(), 0);

    let response = ApiResponse::from(outcome);
    assert_eq!(response.code, 400);
    assert_eq!(response.message, "格式错误");
}

#[tokio::test]
async fn test_unparseable_reply_is_200() {
    let detector = detector(StubClient::replying("这张图片里是一只猫"));
    let response = ApiResponse::from(detector.detect(Some("abc123==")).await);
    assert_eq!(
        serde_json::to_value(&response).unwrap(),
        json!({
            "code": 200,
            "message": "结果解析失败",
            "data": {"is_biological": false, "message": "识别结果格式异常，请上传清晰图片重试"}
        })
    );
}

#[tokio::test]
async fn test_reply_without_discriminant_is_200() {
    let detector = detector(StubClient::replying(r#"{"name":"cat"}"#));
    let outcome = detector.detect(Some("abc123==")).await;
    assert!(matches!(
        outcome,
        Outcome::Unreadable(ClassificationError::Unrecognized(_))
    ));
    let response = ApiResponse::from(outcome);
    assert_eq!(response.code, 200);
    assert_eq!(response.message, "结果解析失败");
}

#[tokio::test]
async fn test_transport_failures_are_classified() {
    let cases = [
        (
            status_error(StatusCode::UNAUTHORIZED, "Incorrect API key"),
            "API Key 无效，请检查配置",
        ),
        (
            status_error(StatusCode::NOT_FOUND, "model not found"),
            "模型不存在或无权限，请更换模型或检查权限",
        ),
        (
            status_error(StatusCode::BAD_REQUEST, "invalid argument: image"),
            "图片格式不支持，请上传正确的 Base64 或 URL",
        ),
        (
            TransportError::Request("connection reset".to_string()),
            "识别服务异常，请稍后重试",
        ),
    ];
    for (err, detail) in cases {
        let detector = detector(StubClient::failing(err));
        let response = ApiResponse::from(detector.detect(Some("abc123==")).await);
        assert_eq!(response.code, 500);
        assert_eq!(response.message, "服务异常");
        assert_eq!(
            serde_json::to_value(&response.data).unwrap(),
            json!({"is_biological": false, "detail": detail})
        );
    }
}
