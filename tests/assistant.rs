//! Assistant pipeline integration tests
//!
//! Runs the coordinator against scripted stages; no audio hardware or network.

use std::time::Duration;

use lingua_voice::Error;
use lingua_voice::assistant::{INPUT_AUDIO_FILE, OUTPUT_AUDIO_FILE, TEXT_REPLY_AUDIO_FILE};
use lingua_voice::chat::{Exchange, Role};
use lingua_voice::voice::read_wav;

mod common;

use common::{Failures, MOCK_SAMPLE_RATE, calls, harness};

#[tokio::test]
async fn test_voice_turn_runs_every_stage_in_order() {
    let tmp = tempfile::tempdir().unwrap();
    let dest = tmp.path().join("session").join("1");
    let mut h = harness(tmp.path(), Failures::default());

    let turn = h
        .assistant
        .converse_by_voice(Duration::from_secs(2), Some(dest.as_path()))
        .await
        .unwrap();

    assert_eq!(calls(&h.log), ["record", "transcribe", "chat", "synthesize"]);
    assert_eq!(turn.user_text, "Qual é a capital da França?");
    assert_eq!(turn.assistant_text, "echo: Qual é a capital da França?");
    assert_eq!(turn.input_audio, dest.join(INPUT_AUDIO_FILE));
    assert_eq!(turn.output_audio, dest.join(OUTPUT_AUDIO_FILE));
    assert!(turn.output_audio.exists());

    // Clip has exactly the requested length
    let clip = read_wav(&turn.input_audio).unwrap();
    assert_eq!(clip.sample_rate, MOCK_SAMPLE_RATE);
    assert_eq!(clip.samples.len(), 2 * MOCK_SAMPLE_RATE as usize);

    assert_eq!(
        h.assistant.conversation().history(),
        &[
            Exchange::user("Qual é a capital da França?"),
            Exchange::assistant("echo: Qual é a capital da França?"),
        ]
    );
}

#[tokio::test]
async fn test_voice_turn_defaults_to_output_dir() {
    let tmp = tempfile::tempdir().unwrap();
    let output_dir = tmp.path().join("output");
    let mut h = harness(&output_dir, Failures::default());

    let turn = h
        .assistant
        .converse_by_voice(Duration::from_secs(1), None)
        .await
        .unwrap();

    assert!(output_dir.is_dir());
    assert_eq!(turn.output_audio, output_dir.join(OUTPUT_AUDIO_FILE));
}

#[tokio::test]
async fn test_transcription_failure_stops_pipeline() {
    let tmp = tempfile::tempdir().unwrap();
    let mut h = harness(
        tmp.path(),
        Failures {
            transcriber: true,
            ..Failures::default()
        },
    );

    let err = h
        .assistant
        .converse_by_voice(Duration::from_secs(1), None)
        .await
        .unwrap_err();

    match err {
        Error::Stt(msg) => assert_eq!(msg, "model overloaded"),
        other => panic!("expected STT error, got {other:?}"),
    }
    assert_eq!(calls(&h.log), ["record", "transcribe"]);
    assert!(h.assistant.conversation().history().is_empty());
    assert!(h.spoken.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_capture_backend_stops_pipeline() {
    let tmp = tempfile::tempdir().unwrap();
    let mut h = harness(
        tmp.path(),
        Failures {
            recorder: true,
            ..Failures::default()
        },
    );

    let err = h
        .assistant
        .converse_by_voice(Duration::from_secs(1), None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NoAudioBackendAvailable));
    assert_eq!(calls(&h.log), ["record"]);
}

#[tokio::test]
async fn test_chat_failure_skips_synthesis_and_keeps_history() {
    let tmp = tempfile::tempdir().unwrap();
    let mut h = harness(
        tmp.path(),
        Failures {
            chat: true,
            ..Failures::default()
        },
    );

    let err = h
        .assistant
        .converse_by_voice(Duration::from_secs(1), None)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Chat(_)));
    assert!(err.is_external_service());
    assert_eq!(calls(&h.log), ["record", "transcribe", "chat"]);
    assert!(h.assistant.conversation().history().is_empty());
    assert!(!tmp.path().join(OUTPUT_AUDIO_FILE).exists());
}

#[tokio::test]
async fn test_text_turn_without_speech() {
    let tmp = tempfile::tempdir().unwrap();
    let mut h = harness(tmp.path(), Failures::default());

    let reply = h
        .assistant
        .converse_by_text("What is 2+2?", false)
        .await
        .unwrap();

    assert_eq!(reply, "echo: What is 2+2?");
    assert_eq!(calls(&h.log), ["chat"]);
    assert!(!tmp.path().join(TEXT_REPLY_AUDIO_FILE).exists());
}

#[tokio::test]
async fn test_text_turn_with_speech_overwrites_reply_file() {
    let tmp = tempfile::tempdir().unwrap();
    let output_dir = tmp.path().join("output");
    let mut h = harness(&output_dir, Failures::default());

    h.assistant.converse_by_text("first", true).await.unwrap();
    h.assistant.converse_by_text("second", true).await.unwrap();

    assert_eq!(h.assistant.text_reply_path(), output_dir.join(TEXT_REPLY_AUDIO_FILE));
    assert!(h.assistant.text_reply_path().exists());

    let spoken = h.spoken.lock().unwrap();
    assert_eq!(spoken.len(), 2);
    assert_eq!(spoken[1], ("echo: second".to_string(), "pt".to_string()));
}

#[tokio::test]
async fn test_history_accumulates_across_turns() {
    let tmp = tempfile::tempdir().unwrap();
    let mut h = harness(tmp.path(), Failures::default());

    h.assistant.converse_by_text("one", false).await.unwrap();
    h.assistant
        .converse_by_voice(Duration::from_secs(1), None)
        .await
        .unwrap();
    h.assistant.converse_by_text("three", false).await.unwrap();

    let roles: Vec<Role> = h
        .assistant
        .conversation()
        .history()
        .iter()
        .map(Exchange::role)
        .collect();
    assert_eq!(roles.len(), 6);
    assert!(
        roles
            .chunks(2)
            .all(|pair| pair == [Role::User, Role::Assistant])
    );
}

#[tokio::test]
async fn test_change_language_propagates_and_keeps_history() {
    let tmp = tempfile::tempdir().unwrap();
    let mut h = harness(tmp.path(), Failures::default());

    // Construction applies the session language to both stages
    assert_eq!(h.assistant.transcriber().language(), "pt");
    assert_eq!(h.assistant.synthesizer().language(), "pt");

    h.assistant.converse_by_text("olá", false).await.unwrap();
    h.assistant.change_language("ja");

    assert_eq!(h.assistant.language(), "ja");
    assert_eq!(h.assistant.transcriber().language(), "ja");
    assert_eq!(h.assistant.synthesizer().language(), "ja");
    assert_eq!(h.assistant.conversation().history().len(), 2);
    assert_eq!(h.assistant.conversation().model(), "mock-model");

    h.assistant.converse_by_text("こんにちは", true).await.unwrap();
    let spoken = h.spoken.lock().unwrap();
    assert_eq!(spoken[0].1, "ja");
}

#[tokio::test]
async fn test_clear_history() {
    let tmp = tempfile::tempdir().unwrap();
    let mut h = harness(tmp.path(), Failures::default());

    h.assistant.converse_by_text("What is 2+2?", false).await.unwrap();
    assert_eq!(h.assistant.conversation().history().len(), 2);

    h.assistant.clear_history();
    assert!(h.assistant.conversation().history().is_empty());

    // The session keeps working after a clear
    h.assistant.converse_by_text("again", false).await.unwrap();
    assert_eq!(h.assistant.conversation().history().len(), 2);
}
