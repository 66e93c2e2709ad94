use mock_interview::nats::messages::{RecognitionErrorMessage, TranscriptMessage, ERROR_SUBJECT_PREFIX, TRANSCRIPT_SUBJECT_PREFIX};
use mock_interview::{NatsTranscriber, SpeechSegment, TranscriptEvent};

#[test]
fn test_transcript_deserialization() {
    let json = r#"{
        "session_id": "session_abc",
        "text": "Tell me about yourself",
        "partial": false,
        "timestamp": "2025-10-27T14:30:05Z",
        "confidence": 0.95
    }"#;

    let msg: TranscriptMessage = serde_json::from_str(json).unwrap();
    assert_eq!(msg.session_id, "session_abc");
    assert_eq!(msg.text, "Tell me about yourself");
    assert!(!msg.partial);
    assert_eq!(msg.confidence, Some(0.95));
    assert_eq!(msg.timestamp, "2025-10-27T14:30:05Z");
}

#[test]
fn test_transcript_no_confidence() {
    let json = r#"{
        "session_id": "session_abc",
        "text": "No confidence score",
        "partial": true,
        "timestamp": "2025-10-27T14:30:05Z"
    }"#;

    let msg: TranscriptMessage = serde_json::from_str(json).unwrap();
    assert!(msg.partial);
    assert_eq!(msg.confidence, None);
}

#[test]
fn test_recognition_error_deserialization() {
    let msg: RecognitionErrorMessage =
        serde_json::from_str(r#"{"session_id": "session_abc", "error": "audio-capture"}"#).unwrap();
    assert_eq!(msg.session_id, "session_abc");
    assert_eq!(msg.error, "audio-capture");
}

#[test]
fn test_published_messages_route_to_events() {
    let final_msg = TranscriptMessage {
        session_id: "session_abc".to_string(),
        text: "  I have five years of experience ".to_string(),
        partial: false,
        timestamp: "2025-10-27T14:30:05Z".to_string(),
        confidence: None,
    };
    let payload = serde_json::to_vec(&final_msg).unwrap();
    let subject = format!("{}final", TRANSCRIPT_SUBJECT_PREFIX);

    // Text is passed through untouched; trimming is the accumulator's job
    assert_eq!(
        NatsTranscriber::route_message(&subject, &payload, "session_abc"),
        Some(TranscriptEvent::Results(vec![SpeechSegment::finalized(
            "  I have five years of experience "
        )]))
    );

    let error_msg = RecognitionErrorMessage {
        session_id: "session_abc".to_string(),
        error: "network".to_string(),
    };
    let payload = serde_json::to_vec(&error_msg).unwrap();
    let subject = format!("{}session_abc", ERROR_SUBJECT_PREFIX);

    assert_eq!(
        NatsTranscriber::route_message(&subject, &payload, "session_abc"),
        Some(TranscriptEvent::Error("network".to_string()))
    );
    assert_eq!(NatsTranscriber::route_message(&subject, &payload, "session_xyz"), None);
}
