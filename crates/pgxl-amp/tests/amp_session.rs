//! End-to-end amplifier behaviour over a scripted transport.

use std::time::Duration;

use pgxl_amp::{BiasMode, PgxlBuilder, PowerGeniusXl};
use pgxl_core::Error;
use pgxl_line_io::SessionState;
use pgxl_test_harness::ScriptedTransport;

async fn amp(script: &ScriptedTransport) -> PowerGeniusXl {
    script.set_reply_terminator("\r\n");
    PgxlBuilder::new()
        .command_timeout(Duration::from_secs(1))
        .watch_field("state")
        .build_with_transport(Box::new(script.clone()))
        .await
        .unwrap()
}

#[tokio::test(start_paused = true)]
async fn telemetry_at_sequence_seven() {
    let script = ScriptedTransport::new();
    script.reply_to("operate=1", "0|");
    let mut amp = amp(&script).await;
    for _ in 0..6 {
        amp.operate().await.unwrap();
    }

    script.push_bytes(b"S status updating\r\n");
    script.push_bytes(b"R7|0|vdd=48.1 id=2.3 fanmode=AUTO\r\n");
    let telemetry = amp.telemetry().await.unwrap();

    assert_eq!(telemetry.drain_voltage, Some(48.1));
    assert_eq!(telemetry.drain_current, Some(2.3));
    assert_eq!(telemetry.fan_mode.as_deref(), Some("AUTO"));
    assert_eq!(telemetry.swr, None);
    assert_eq!(script.sent_sequences(), (1..=7).collect::<Vec<u32>>());
}

#[tokio::test(start_paused = true)]
async fn command_bodies_on_the_wire() {
    let script = ScriptedTransport::new();
    for body in [
        "operate=1",
        "operate=0",
        "setup biasA=RADIO_AAB biasB=RADIO_AAB",
        "setup bandA=40",
    ] {
        script.reply_to(body, "0|");
    }
    let mut amp = amp(&script).await;

    amp.operate().await.unwrap();
    amp.standby().await.unwrap();
    amp.set_bias_mode(BiasMode::AAB).await.unwrap();
    amp.set_band(40).await.unwrap();

    assert_eq!(
        script.sent_frames(),
        vec![
            "C1|operate=1\r\n",
            "C2|operate=0\r\n",
            "C3|setup biasA=RADIO_AAB biasB=RADIO_AAB\r\n",
            "C4|setup bandA=40\r\n",
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn unsupported_band_sends_nothing() {
    let script = ScriptedTransport::new();
    let mut amp = amp(&script).await;

    assert!(matches!(amp.set_band(2).await, Err(Error::UnsupportedBand(2))));
    assert!(matches!(amp.set_band(0).await, Err(Error::UnsupportedBand(0))));
    assert!(script.sent_frames().is_empty());
}

#[tokio::test(start_paused = true)]
async fn silent_amplifier_times_out_with_sequence() {
    let script = ScriptedTransport::new();
    let mut amp = amp(&script).await;

    match amp.telemetry().await {
        Err(Error::Timeout { seq, body }) => {
            assert_eq!(seq, 1);
            assert_eq!(body, "status");
        }
        other => panic!("expected Timeout, got {other:?}"),
    }
    assert_eq!(amp.state(), SessionState::Ready);
}

#[tokio::test(start_paused = true)]
async fn stray_reply_is_a_sequence_mismatch() {
    let script = ScriptedTransport::new();
    let mut amp = amp(&script).await;

    script.push_bytes(b"R5|0|vdd=1\r\n");
    assert!(matches!(
        amp.telemetry().await,
        Err(Error::SequenceMismatch { expected: 1, got: 5 })
    ));
    assert_eq!(amp.state(), SessionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn rejected_status() {
    let script = ScriptedTransport::new();
    script.reply_to("operate=1", "E0000001|fault active");
    let mut amp = amp(&script).await;

    assert!(matches!(
        amp.operate().await,
        Err(Error::Rejected { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn info_returns_raw_fields() {
    let script = ScriptedTransport::new();
    script.reply_to("info", "0|serial=1234-5678 model=PGXL fw=3.8.9");
    let mut amp = amp(&script).await;

    let info = amp.info().await.unwrap();
    assert_eq!(info.get("serial").map(String::as_str), Some("1234-5678"));
    assert_eq!(info.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn watched_field_follows_pushes() {
    let script = ScriptedTransport::new();
    script.reply_to("operate=1", "0|");
    let mut amp = amp(&script).await;
    assert_eq!(amp.cached_field("state"), None);

    script.push_bytes(b"S0|state=TRANSMIT_A\r\n");
    amp.operate().await.unwrap();
    assert_eq!(amp.cached_field("state"), Some("TRANSMIT_A"));

    amp.disconnect().await;
    assert_eq!(amp.cached_field("state"), None);
    assert_eq!(amp.state(), SessionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn dropped_connection_surfaces() {
    let script = ScriptedTransport::new();
    let mut amp = amp(&script).await;

    script.close_peer();
    let err = amp.telemetry().await.unwrap_err();
    assert!(err.is_connection_error());
    assert!(matches!(amp.operate().await, Err(Error::NotConnected)));
}
