// Wire-format tests for the streaming protocol
//
// The JSON field names are fixed: clients written against the original
// protocol must keep working, so these assert on the raw strings.

use whisper_relay::proto::{ClientCommand, ServerEvent, TranscriptionStatus};

#[test]
fn test_start_session_serialization() {
    let cmd = ClientCommand::StartSession {
        session_id: Some("test-session".to_string()),
    };

    let json = serde_json::to_string(&cmd).unwrap();
    assert!(json.contains("\"command\":\"start_session\""));
    assert!(json.contains("\"session_id\":\"test-session\""));

    let decoded: ClientCommand = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, cmd);
}

#[test]
fn test_start_session_without_id() {
    // The id is optional both ways: omitted on the wire means "generate".
    let decoded: ClientCommand =
        serde_json::from_str(r#"{"command": "start_session"}"#).unwrap();
    assert_eq!(decoded, ClientCommand::StartSession { session_id: None });

    let json = serde_json::to_string(&decoded).unwrap();
    assert!(!json.contains("session_id"));
}

#[test]
fn test_process_audio_deserialization() {
    let json = r#"{"command": "process_audio", "audio": "AAAAAA=="}"#;
    let decoded: ClientCommand = serde_json::from_str(json).unwrap();

    match decoded {
        ClientCommand::ProcessAudio { audio } => assert_eq!(audio, "AAAAAA=="),
        other => panic!("expected process_audio, got {other:?}"),
    }
}

#[test]
fn test_unknown_command_fails_to_parse() {
    let result = serde_json::from_str::<ClientCommand>(r#"{"command": "reticulate"}"#);
    assert!(result.is_err());
}

#[test]
fn test_transcription_event_serialization() {
    let event = ServerEvent::Transcription {
        start: 0.0,
        end: 1.5,
        text: "hello world".to_string(),
        is_final: false,
        status: TranscriptionStatus::Completed,
    };

    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("\"type\":\"transcription\""));
    assert!(json.contains("\"start\":0.0"));
    assert!(json.contains("\"end\":1.5"));
    assert!(json.contains("\"text\":\"hello world\""));
    assert!(json.contains("\"is_final\":false"));
    assert!(json.contains("\"status\":\"completed\""));
}

#[test]
fn test_partial_status_serialization() {
    let event = ServerEvent::Transcription {
        start: 1.0,
        end: 1.3,
        text: "wor".to_string(),
        is_final: false,
        status: TranscriptionStatus::Partial,
    };

    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("\"status\":\"partial\""));
}

#[test]
fn test_full_transcription_event_serialization() {
    let event = ServerEvent::FullTranscription {
        text: "hello world".to_string(),
        is_final: true,
    };

    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("\"type\":\"full_transcription\""));
    assert!(json.contains("\"is_final\":true"));
}

#[test]
fn test_lifecycle_event_serialization() {
    let started = serde_json::to_string(&ServerEvent::SessionStarted {
        session_id: "s1".to_string(),
    })
    .unwrap();
    assert!(started.contains("\"type\":\"session_started\""));
    assert!(started.contains("\"session_id\":\"s1\""));

    let ended = serde_json::to_string(&ServerEvent::SessionEnded {
        session_id: "s1".to_string(),
    })
    .unwrap();
    assert!(ended.contains("\"type\":\"session_ended\""));

    let error = serde_json::to_string(&ServerEvent::error("boom")).unwrap();
    assert!(error.contains("\"type\":\"error\""));
    assert!(error.contains("\"message\":\"boom\""));
}

#[test]
fn test_event_classification_helpers() {
    let transcription = ServerEvent::Transcription {
        start: 0.0,
        end: 1.0,
        text: "hi".to_string(),
        is_final: true,
        status: TranscriptionStatus::Completed,
    };
    assert!(transcription.is_transcription());
    assert!(transcription.is_final());

    let combined = ServerEvent::FullTranscription {
        text: "hi".to_string(),
        is_final: false,
    };
    assert!(combined.is_transcription());
    assert!(!combined.is_final());

    let ended = ServerEvent::SessionEnded {
        session_id: "s1".to_string(),
    };
    assert!(!ended.is_transcription());
    assert!(!ended.is_final());
}
