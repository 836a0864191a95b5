//! Playback session integration tests: play/pause, resume strategies and
//! the outward event stream

mod helpers;

use helpers::{settle, test_config, TestSession};
use liveseek_common::PlayerEvent;
use liveseek_player::config::PlatformConfig;
use liveseek_player::engine::sim::SimEngineFactory;
use liveseek_player::engine::{EngineEvent, ReadyState, TimeRange};
use liveseek_player::PlayerConfig;
use std::time::Duration;

fn polling_config() -> PlayerConfig {
    PlayerConfig {
        platform: PlatformConfig {
            suppresses_auto_resume: true,
            resume_poll_interval_ms: 1000,
        },
        ..test_config()
    }
}

#[tokio::test(start_paused = true)]
async fn test_play_on_fresh_session_loads_and_plays() {
    let mut t = TestSession::new(SimEngineFactory::new().with_auto_events());
    assert!(!t.session.has_engine());

    t.session.play().await.unwrap();
    settle().await;

    assert!(t.session.has_engine());
    assert_eq!(t.factory.created_count(), 1);
    assert_eq!(t.factory.play_calls(), 1);
    assert!(!t.session.paused());
    assert!(!t.session.buffering());

    let events = t.drain_events();
    assert!(events
        .iter()
        .any(|event| matches!(event, PlayerEvent::Loaded { generation: 1, .. })));
}

#[tokio::test(start_paused = true)]
async fn test_load_without_play_stays_paused() {
    let t = TestSession::new(SimEngineFactory::new().with_auto_events());
    t.session.load(None).unwrap();
    settle().await;

    assert_eq!(t.factory.play_calls(), 0);
    assert!(t.session.paused());
    assert!(!t.session.buffering());
}

#[tokio::test(start_paused = true)]
async fn test_autoplay_starts_on_can_play() {
    let config = PlayerConfig {
        autoplay: true,
        ..test_config()
    };
    let t = TestSession::with_config(SimEngineFactory::new().with_auto_events(), config);
    t.session.load(None).unwrap();
    settle().await;

    assert_eq!(t.factory.play_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_play_after_ended_restarts_from_zero() {
    let factory = SimEngineFactory::new()
        .with_auto_events()
        .with_seekable(Some(TimeRange::new(0.0, 600.0)));
    let t = TestSession::new(factory);
    t.session.load(None).unwrap();
    settle().await;
    t.session.set_current_time(200.0);
    settle().await;
    assert_eq!(t.session.current_time(), 200.0);

    t.factory.set_ended(true);
    t.session.play().await.unwrap();
    settle().await;

    assert_eq!(t.factory.created_count(), 3);
    let descriptor = t.factory.last_descriptor().unwrap();
    assert_eq!(descriptor.offset_ms(), 0);
    assert_eq!(descriptor.url().query(), Some("speed=1&keyIndex=0&offset=0"));
    assert_eq!(t.session.current_time(), 0.0);
    assert!(!t.factory.is_paused());
}

#[tokio::test(start_paused = true)]
async fn test_resume_jumps_to_newest_data() {
    let t = TestSession::new(
        SimEngineFactory::new().with_seekable(Some(TimeRange::new(0.0, 42.37))),
    );
    t.session.load(None).unwrap();
    settle().await;

    t.session.play().await.unwrap();

    assert_eq!(t.factory.engine_time(), 42.3);
    assert_eq!(t.factory.play_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_resume_keeps_position_with_known_duration() {
    let factory = SimEngineFactory::new()
        .with_auto_events()
        .with_duration(120.0)
        .with_seekable(Some(TimeRange::new(0.0, 120.0)));
    let t = TestSession::new(factory);
    t.session.load(None).unwrap();
    settle().await;
    t.factory.set_engine_time(15.0);

    t.session.play().await.unwrap();

    assert_eq!(t.factory.engine_time(), 15.0);
    assert_eq!(t.factory.play_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_pause() {
    let t = TestSession::new(SimEngineFactory::new().with_auto_events());
    t.session.play().await.unwrap();
    settle().await;
    assert!(!t.session.paused());

    t.session.pause();
    assert!(t.session.paused());
    assert_eq!(t.factory.pause_calls(), 1);

    // Playing again resumes the same engine
    t.session.play().await.unwrap();
    assert_eq!(t.factory.created_count(), 1);
    assert!(!t.session.paused());
}

#[tokio::test(start_paused = true)]
async fn test_duration_and_live_flag() {
    let mut t = TestSession::new(SimEngineFactory::new().with_auto_events());
    t.session.load(None).unwrap();
    settle().await;

    assert!(t.session.is_live());
    assert!(t.session.duration().is_infinite());
    let events = t.drain_events();
    assert!(events
        .iter()
        .any(|event| matches!(event, PlayerEvent::DurationChanged { live: true, .. })));
}

#[tokio::test(start_paused = true)]
async fn test_buffering_events_only_on_change() {
    let mut t = TestSession::new(SimEngineFactory::new());
    t.session.load(None).unwrap();
    settle().await;

    t.factory.emit(EngineEvent::Playing);
    t.factory.emit(EngineEvent::Playing);
    t.factory.emit(EngineEvent::Waiting);
    settle().await;

    let buffering: Vec<bool> = t
        .drain_events()
        .into_iter()
        .filter_map(|event| match event {
            PlayerEvent::Buffering { active, .. } => Some(active),
            _ => None,
        })
        .collect();
    assert_eq!(buffering, vec![true, false, true]);
}

#[tokio::test(start_paused = true)]
async fn test_polling_resume_after_stall() {
    let t = TestSession::with_config(SimEngineFactory::new(), polling_config());
    t.session.load(None).unwrap();
    settle().await;
    t.factory.set_paused(false);

    t.factory.emit(EngineEvent::Waiting);
    settle().await;
    assert_eq!(t.factory.pause_calls(), 1);
    assert!(t.factory.is_paused());

    tokio::time::sleep(Duration::from_millis(1100)).await;
    assert_eq!(t.factory.play_calls(), 1);
    assert!(!t.factory.is_paused());
}

#[tokio::test(start_paused = true)]
async fn test_polling_resume_waits_for_ready_state() {
    let t = TestSession::with_config(SimEngineFactory::new(), polling_config());
    t.session.play().await.unwrap();
    settle().await;

    t.factory.emit(EngineEvent::CanPlay);
    tokio::time::sleep(Duration::from_millis(1100)).await;
    // Not enough data yet
    assert_eq!(t.factory.play_calls(), 0);

    t.factory.set_ready_state(ReadyState::HaveEnoughData);
    tokio::time::sleep(Duration::from_millis(1000)).await;
    assert_eq!(t.factory.play_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_polling_marks_ended_live_stream_as_buffering() {
    let t = TestSession::with_config(SimEngineFactory::new(), polling_config());
    t.session.load(None).unwrap();
    settle().await;

    t.factory.emit(EngineEvent::Playing);
    settle().await;
    assert!(!t.session.buffering());

    t.factory.emit(EngineEvent::Ended);
    settle().await;
    assert!(t.session.buffering());
}

#[tokio::test(start_paused = true)]
async fn test_resume_poll_stops_after_reset() {
    let t = TestSession::with_config(SimEngineFactory::new(), polling_config());
    t.session.play().await.unwrap();
    settle().await;

    t.factory.emit(EngineEvent::CanPlay);
    settle().await;
    t.factory.set_ready_state(ReadyState::HaveEnoughData);
    t.session.reset();

    tokio::time::sleep(Duration::from_millis(2100)).await;
    assert_eq!(t.factory.play_calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_events_serialize_for_the_host() {
    let mut t = TestSession::new(SimEngineFactory::new().with_auto_events());
    t.session.set_playback_rate(2.0);
    settle().await;

    let events = t.drain_events();
    let rate_change = events
        .iter()
        .find(|event| event.name() == "RateChange")
        .expect("rate change event");
    let json = serde_json::to_value(rate_change).unwrap();
    assert_eq!(json["rate"], 2.0);
}
