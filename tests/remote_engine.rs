// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Engine behaviour over the in-memory bus.
//!
//! Each test plays the remote's side by injecting messages into a
//! `MemoryBus` and checks the mirrored state, the subscriptions and what the
//! library published back.

use std::sync::{Arc, OnceLock};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rs90_lib::event::RemoteEvent;
use rs90_lib::protocol::{MemoryBus, QoS};
use rs90_lib::state::StateChange;
use rs90_lib::subscription::Subscribable;
use rs90_lib::types::{RemoteStatus, SwitchState};
use rs90_lib::{Error, Remote, RemoteConfig, ValueError};

const BASE: &str = "Haptique/r1";

fn topic(suffix: &str) -> String {
    format!("{BASE}/{suffix}")
}

fn commands_topic(device: &str) -> String {
    topic(&format!("device/{device}/commands"))
}

fn trigger_topic(name: &str) -> String {
    topic(&format!("macro/{name}/trigger"))
}

async fn start(bus: &MemoryBus) -> Remote {
    Remote::start(bus.clone(), RemoteConfig::new("r1"))
        .await
        .unwrap()
}

/// Lets spawned subscribe tasks run and waits until the engine has drained
/// everything queued so far.
async fn settle(remote: &Remote) {
    for _ in 0..3 {
        for _ in 0..16 {
            tokio::task::yield_now().await;
        }
        remote.diagnostics().await.unwrap();
    }
}

fn macro_list(names: &[&str]) -> String {
    let entries: Vec<_> = names
        .iter()
        .enumerate()
        .map(|(i, name)| serde_json::json!({ "id": format!("m{i}"), "name": name }))
        .collect();
    serde_json::Value::Array(entries).to_string()
}

// ============================================================================
// Startup
// ============================================================================

#[tokio::test]
async fn retained_lists_are_applied_at_startup() {
    let bus = MemoryBus::new();
    bus.inject_retained(&topic("status"), "online");
    bus.inject_retained(
        &topic("device/list"),
        r#"[{"id": "1", "name": "TV"}, {"Id": 2, "name": "Amp"}]"#,
    );
    bus.inject_retained(&topic("macro/list"), &macro_list(&["Movie"]));

    let remote = start(&bus).await;
    settle(&remote).await;

    let state = remote.state();
    assert_eq!(state.status(), RemoteStatus::Online);
    assert_eq!(state.devices().len(), 2);
    assert_eq!(state.devices()[1].id.as_deref(), Some("2"));
    assert_eq!(bus.subscribe_count(&commands_topic("TV")), 1);
    assert_eq!(bus.subscribe_count(&commands_topic("Amp")), 1);
    assert_eq!(bus.subscribe_count(&trigger_topic("Movie")), 1);

    let detail = bus.published_to(&topic("device/TV/detail"));
    assert_eq!(detail.len(), 1);
    assert!(detail[0].payload.is_empty());
    assert_eq!(detail[0].qos, QoS::AtMostOnce);

    remote.shutdown().await.unwrap();
}

#[tokio::test]
async fn rejected_global_subscription_is_skipped() {
    let bus = MemoryBus::new();
    bus.reject_subscriptions_to(&topic("keys"));

    let remote = start(&bus).await;
    let diagnostics = remote.diagnostics().await.unwrap();
    assert_eq!(diagnostics.subscriptions.global, 5);

    bus.inject(&topic("status"), "online");
    settle(&remote).await;
    assert_eq!(remote.state().status(), RemoteStatus::Online);

    remote.shutdown().await.unwrap();
}

// ============================================================================
// Reconciliation
// ============================================================================

#[tokio::test]
async fn repeated_snapshot_changes_no_subscription() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;
    let list = r#"[{"id": "1", "name": "TV"}, {"id": "2", "name": "Amp"}]"#;

    bus.inject_retained(&topic("device/list"), list);
    bus.inject_retained(&topic("macro/list"), &macro_list(&["Movie", "Music"]));
    settle(&remote).await;
    let before = bus.total_active_subscriptions();

    bus.inject_retained(&topic("device/list"), list);
    bus.inject_retained(&topic("macro/list"), &macro_list(&["Movie", "Music"]));
    settle(&remote).await;

    assert_eq!(bus.total_active_subscriptions(), before);
    for device in ["TV", "Amp"] {
        assert_eq!(bus.subscribe_count(&commands_topic(device)), 1);
        assert_eq!(bus.unsubscribe_count(&commands_topic(device)), 0);
    }
    for name in ["Movie", "Music"] {
        assert_eq!(bus.subscribe_count(&trigger_topic(name)), 1);
        assert_eq!(bus.unsubscribe_count(&trigger_topic(name)), 0);
    }

    remote.shutdown().await.unwrap();
}

#[tokio::test]
async fn macro_snapshot_diff_touches_only_changed_names() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;

    bus.inject_retained(&topic("macro/list"), &macro_list(&["A", "B"]));
    settle(&remote).await;
    bus.inject(&trigger_topic("A"), "on");
    bus.inject(&trigger_topic("B"), "on");
    settle(&remote).await;

    bus.inject_retained(&topic("macro/list"), &macro_list(&["B", "C"]));
    settle(&remote).await;

    assert_eq!(bus.subscribe_count(&trigger_topic("C")), 1);
    assert_eq!(bus.unsubscribe_count(&trigger_topic("A")), 1);
    assert_eq!(bus.subscribe_count(&trigger_topic("A")), 1);
    assert_eq!(bus.subscribe_count(&trigger_topic("B")), 1);
    assert_eq!(bus.unsubscribe_count(&trigger_topic("B")), 0);

    let state = remote.state();
    assert_eq!(state.macro_state("A"), None);
    assert_eq!(state.macro_state("B"), Some(SwitchState::On));
    assert_eq!(state.macro_state("C"), None);

    let tracked = remote.diagnostics().await.unwrap().tracked;
    assert_eq!(tracked.active_macros, vec!["B".to_string(), "C".to_string()]);

    remote.shutdown().await.unwrap();
}

#[tokio::test]
async fn device_removal_releases_commands() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;

    bus.inject_retained(
        &topic("device/list"),
        r#"[{"id": "1", "name": "TV"}, {"id": "2", "name": "Amp"}]"#,
    );
    settle(&remote).await;
    bus.inject_retained(&commands_topic("TV"), r#"[{"ID": "c1", "name": "POWER"}]"#);
    bus.inject_retained(&commands_topic("Amp"), r#"[{"id": "c9", "name": "MUTE"}]"#);
    settle(&remote).await;
    assert_eq!(remote.state().device_commands("TV").map(<[_]>::len), Some(1));

    bus.inject_retained(&topic("device/list"), r#"[{"id": "2", "name": "Amp"}]"#);
    settle(&remote).await;

    let state = remote.state();
    assert!(state.device_commands("TV").is_none());
    assert_eq!(state.device_commands("Amp").map(<[_]>::len), Some(1));
    assert_eq!(bus.unsubscribe_count(&commands_topic("TV")), 1);
    assert_eq!(bus.active_subscriptions(&commands_topic("TV")), 0);

    // Re-adding subscribes again and picks up the retained list
    bus.inject_retained(
        &topic("device/list"),
        r#"[{"id": "1", "name": "TV"}, {"id": "2", "name": "Amp"}]"#,
    );
    settle(&remote).await;
    assert_eq!(bus.subscribe_count(&commands_topic("TV")), 2);
    assert_eq!(remote.state().device_commands("TV").map(<[_]>::len), Some(1));

    remote.shutdown().await.unwrap();
}

#[tokio::test]
async fn macro_removal_unsubscribes_exactly_once() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;

    bus.inject_retained(&topic("macro/list"), &macro_list(&["Movie"]));
    settle(&remote).await;
    bus.inject(&trigger_topic("Movie"), "on");
    settle(&remote).await;
    assert_eq!(remote.state().macro_state("Movie"), Some(SwitchState::On));

    bus.inject_retained(&topic("macro/list"), "[]");
    settle(&remote).await;
    assert_eq!(remote.state().macro_state("Movie"), None);
    assert_eq!(bus.unsubscribe_count(&trigger_topic("Movie")), 1);

    bus.inject_retained(&topic("macro/list"), "[]");
    settle(&remote).await;
    remote.shutdown().await.unwrap();
    assert_eq!(bus.unsubscribe_count(&trigger_topic("Movie")), 1);
}

#[tokio::test]
async fn malformed_list_keeps_previous_snapshot() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;

    bus.inject(&topic("device/list"), r#"[{"id": "1", "name": "TV"}]"#);
    settle(&remote).await;
    bus.inject(&topic("device/list"), "{not json");
    settle(&remote).await;

    assert_eq!(remote.state().devices().len(), 1);
    assert_eq!(bus.unsubscribe_count(&commands_topic("TV")), 0);

    remote.shutdown().await.unwrap();
}

#[tokio::test]
async fn entries_without_name_are_listed_but_not_subscribed() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;

    bus.inject(&topic("device/list"), r#"[{"id": "1"}, {"id": "2", "name": ""}]"#);
    settle(&remote).await;

    let diagnostics = remote.diagnostics().await.unwrap();
    assert_eq!(diagnostics.device_count, 2);
    assert_eq!(diagnostics.subscriptions.devices, 0);
    assert!(diagnostics.tracked.active_devices.is_empty());

    remote.shutdown().await.unwrap();
}

#[tokio::test]
async fn lists_notify_once_per_snapshot() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    remote.on_lists_changed(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    bus.inject(&topic("macro/list"), &macro_list(&["A", "B"]));
    settle(&remote).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    bus.inject(&topic("macro/list"), &macro_list(&["B"]));
    settle(&remote).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    remote.shutdown().await.unwrap();
}

// ============================================================================
// Pending subscriptions
// ============================================================================

#[tokio::test(start_paused = true)]
async fn snapshot_during_pending_subscribe_does_not_duplicate() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;
    bus.set_subscribe_delay(Some(Duration::from_secs(1)));

    bus.inject(&topic("macro/list"), &macro_list(&["Movie"]));
    settle(&remote).await;
    let tracked = remote.diagnostics().await.unwrap().tracked;
    assert_eq!(tracked.pending_macros, vec!["Movie".to_string()]);

    bus.inject(&topic("macro/list"), &macro_list(&["Movie"]));
    settle(&remote).await;

    tokio::time::sleep(Duration::from_secs(2)).await;
    settle(&remote).await;

    assert_eq!(bus.subscribe_count(&trigger_topic("Movie")), 1);
    let tracked = remote.diagnostics().await.unwrap().tracked;
    assert_eq!(tracked.active_macros, vec!["Movie".to_string()]);
    assert!(tracked.pending_macros.is_empty());

    remote.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn removal_while_pending_releases_late_subscription() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;
    bus.set_subscribe_delay(Some(Duration::from_secs(1)));

    bus.inject(&topic("macro/list"), &macro_list(&["Movie"]));
    settle(&remote).await;
    bus.inject(&topic("macro/list"), "[]");
    settle(&remote).await;

    tokio::time::sleep(Duration::from_secs(2)).await;
    settle(&remote).await;

    assert_eq!(bus.subscribe_count(&trigger_topic("Movie")), 1);
    assert_eq!(bus.unsubscribe_count(&trigger_topic("Movie")), 1);
    assert_eq!(bus.active_subscriptions(&trigger_topic("Movie")), 0);
    let tracked = remote.diagnostics().await.unwrap().tracked;
    assert!(tracked.active_macros.is_empty());
    assert!(tracked.pending_macros.is_empty());

    remote.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn retained_state_arriving_with_subscription_is_applied() {
    let bus = MemoryBus::new();
    bus.inject_retained(&trigger_topic("Movie"), "on");
    let remote = start(&bus).await;
    bus.set_subscribe_delay(Some(Duration::from_millis(500)));

    bus.inject(&topic("macro/list"), &macro_list(&["Movie"]));
    tokio::time::sleep(Duration::from_secs(1)).await;
    settle(&remote).await;

    assert_eq!(remote.state().macro_state("Movie"), Some(SwitchState::On));

    remote.shutdown().await.unwrap();
}

#[tokio::test]
async fn failed_subscribe_is_retried_by_refresh() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;
    bus.reject_subscriptions_to(&trigger_topic("Movie"));

    bus.inject(&topic("macro/list"), &macro_list(&["Movie", "Music"]));
    settle(&remote).await;
    let tracked = remote.diagnostics().await.unwrap().tracked;
    assert_eq!(tracked.active_macros, vec!["Music".to_string()]);
    assert!(tracked.pending_macros.is_empty());

    bus.accept_subscriptions_to(&trigger_topic("Movie"));
    bus.clear_published();
    let report = remote.force_refresh_lists().await.unwrap();
    assert_eq!(report.macros_resubscribed, vec!["Movie".to_string()]);
    assert!(report.devices_resubscribed.is_empty());
    assert!(report.battery_requested);
    assert_eq!(bus.published_to(&topic("battery/status")).len(), 1);

    settle(&remote).await;
    assert_eq!(bus.subscribe_count(&trigger_topic("Movie")), 1);
    let report = remote.force_refresh_lists().await.unwrap();
    assert_eq!(report.resubscribed_count(), 0);

    remote.shutdown().await.unwrap();
}

// ============================================================================
// Status, battery, keys, test status
// ============================================================================

#[tokio::test]
async fn status_changes_are_debounced() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    remote.on_status_changed(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    for payload in ["online", " online\n", "sleeping", "offline"] {
        bus.inject(&topic("status"), payload);
    }
    settle(&remote).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(remote.state().status(), RemoteStatus::Offline);

    remote.shutdown().await.unwrap();
}

#[tokio::test]
async fn battery_payload_shapes() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;

    let cases = [
        ("85", 85),
        ("Level: 73 percent", 73),
        ("85%", 85),
        ("none", 85),
        ("150", 100),
        ("-5", 0),
    ];
    for (payload, expected) in cases {
        bus.inject(&topic("battery_level"), payload);
        settle(&remote).await;
        assert_eq!(
            remote.state().battery_level().map(|b| b.value()),
            Some(expected),
            "payload {payload:?}"
        );
    }

    remote.shutdown().await.unwrap();
}

#[tokio::test]
async fn repeated_key_presses_are_distinct_events() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;
    let mut events = remote.subscribe();
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    remote.on_key_pressed(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    bus.inject(&topic("keys"), "button:5");
    bus.inject(&topic("keys"), "button:5");
    bus.inject(&topic("keys"), "volume up");
    settle(&remote).await;

    let mut presses = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let RemoteEvent::KeyPressed(press) = event {
            presses.push(press);
        }
    }
    assert_eq!(presses.len(), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(presses[0].button.as_str(), "5");
    assert_eq!(presses[0].remote_id, "r1");
    assert_eq!(presses[0].sequence, 1);
    assert_eq!(presses[1].sequence, 2);
    assert!(presses[1].timestamp > presses[0].timestamp);
    assert_eq!(remote.state().last_key().map(|k| k.as_str()), Some("5"));

    remote.shutdown().await.unwrap();
}

#[tokio::test]
async fn one_shot_key_listener_keeps_engine_running() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;
    let calls = Arc::new(AtomicUsize::new(0));
    let own_id = Arc::new(OnceLock::new());

    let counter = Arc::clone(&calls);
    let listener = remote.clone();
    let listener_id = Arc::clone(&own_id);
    let id = remote.on_key_pressed(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        if let Some(id) = listener_id.get() {
            listener.unsubscribe(*id);
        }
    });
    own_id.set(id).unwrap();

    bus.inject(&topic("keys"), "button:1");
    bus.inject(&topic("keys"), "button:2");
    bus.inject(&topic("status"), "online");
    settle(&remote).await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(remote.state().last_key().map(|k| k.as_str()), Some("2"));
    assert_eq!(remote.state().status(), RemoteStatus::Online);

    remote.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_status_mirrors_text() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;

    bus.inject(&topic("test/status"), "Movie running");
    settle(&remote).await;
    assert_eq!(remote.state().running_macro(), Some("Movie running"));
    assert_eq!(remote.state().macro_state("Movie"), None);

    bus.inject(&topic("test/status"), "");
    settle(&remote).await;
    assert_eq!(remote.state().running_macro(), None);

    remote.shutdown().await.unwrap();
}

#[tokio::test]
async fn command_lists_distinguish_empty_from_unknown() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;

    bus.inject(&topic("device/list"), r#"[{"id": "1", "name": "TV"}]"#);
    settle(&remote).await;
    assert!(remote.state().device_commands("TV").is_none());

    bus.inject(&commands_topic("TV"), "");
    settle(&remote).await;
    assert_eq!(remote.state().device_commands("TV").map(<[_]>::len), Some(0));

    bus.inject(
        &commands_topic("TV"),
        r#"[{"id": "c1", "name": "POWER"}, {"Id": "c2", "name": "MUTE"}]"#,
    );
    bus.inject(&commands_topic("TV"), "[oops");
    settle(&remote).await;

    let diagnostics = remote.diagnostics().await.unwrap();
    assert_eq!(diagnostics.command_keys, vec!["TV".to_string()]);
    let summary = &diagnostics.device_commands["TV"];
    assert_eq!(summary.count, 2);
    assert_eq!(summary.ids, vec!["c1".to_string(), "c2".to_string()]);

    remote.shutdown().await.unwrap();
}

#[tokio::test]
async fn invalid_macro_state_is_ignored() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;

    bus.inject(&topic("macro/list"), &macro_list(&["Movie"]));
    settle(&remote).await;
    bus.inject(&trigger_topic("Movie"), " ON ");
    bus.inject(&trigger_topic("Movie"), "maybe");
    settle(&remote).await;

    assert_eq!(remote.state().macro_state("Movie"), Some(SwitchState::On));

    remote.shutdown().await.unwrap();
}

// ============================================================================
// Commands
// ============================================================================

#[tokio::test]
async fn macro_trigger_round_trip() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;
    bus.inject(&topic("macro/list"), &macro_list(&["Movie"]));
    settle(&remote).await;

    remote.trigger_macro("Movie", SwitchState::On).await.unwrap();
    assert_eq!(remote.state().macro_state("Movie"), Some(SwitchState::On));

    let published = bus.published_to(&trigger_topic("Movie"));
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].payload, "on");
    assert_eq!(published[0].qos, QoS::AtLeastOnce);
    assert!(published[0].retain);

    bus.inject(&trigger_topic("Movie"), "off");
    settle(&remote).await;
    assert_eq!(remote.state().macro_state("Movie"), Some(SwitchState::Off));

    remote.shutdown().await.unwrap();
}

#[tokio::test]
async fn device_command_is_published() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;

    remote.trigger_device_command("TV", "POWER").await.unwrap();

    let published = bus.published_to(&topic("device/TV/trigger"));
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].payload, "POWER");
    assert_eq!(published[0].qos, QoS::AtLeastOnce);
    assert!(!published[0].retain);

    remote.shutdown().await.unwrap();
}

#[tokio::test]
async fn commands_by_id_resolve_through_lists() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;
    bus.inject(&topic("device/list"), r#"[{"Id": "d1", "name": "TV"}]"#);
    bus.inject(&topic("macro/list"), r#"[{"id": "m1", "name": "Movie"}]"#);
    settle(&remote).await;

    remote
        .trigger_macro_by_id("m1", SwitchState::Off)
        .await
        .unwrap();
    assert_eq!(bus.retained(&trigger_topic("Movie")).as_deref(), Some("off"));

    remote
        .trigger_device_command_by_id("d1", "POWER")
        .await
        .unwrap();
    assert_eq!(bus.published_to(&topic("device/TV/trigger")).len(), 1);

    let err = remote
        .trigger_macro_by_id("m9", SwitchState::On)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::MacroNotFound { ref id } if id == "m9"));

    let err = remote
        .trigger_device_command_by_id("d9", "POWER")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::DeviceNotFound { ref id } if id == "d9"));

    remote.shutdown().await.unwrap();
}

#[tokio::test]
async fn empty_names_are_rejected() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;
    bus.clear_published();

    assert!(matches!(
        remote.trigger_macro("", SwitchState::On).await,
        Err(Error::Value(ValueError::EmptyName("macro")))
    ));
    assert!(matches!(
        remote.trigger_device_command("", "POWER").await,
        Err(Error::Value(ValueError::EmptyName("device")))
    ));
    assert!(matches!(
        remote.trigger_device_command("TV", "").await,
        Err(Error::Value(ValueError::EmptyName("command")))
    ));
    assert!(bus.published().is_empty());

    remote.shutdown().await.unwrap();
}

#[tokio::test]
async fn failed_publish_leaves_state_untouched() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;
    bus.reject_publishes(true);

    let err = remote
        .trigger_macro("Movie", SwitchState::On)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Protocol(_)));
    assert_eq!(remote.state().macro_state("Movie"), None);

    assert!(remote.ring_light_on(3).await.is_err());
    assert_eq!(remote.state().led_state(), SwitchState::Off);

    // Turning the light off never publishes
    remote.ring_light_off().await.unwrap();

    remote.shutdown().await.unwrap();
}

// ============================================================================
// Ring light
// ============================================================================

#[tokio::test]
async fn ring_light_duration_is_clamped() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;

    remote.ring_light_on(0).await.unwrap();
    assert_eq!(remote.state().led_duration(), 1);
    remote.ring_light_on(15).await.unwrap();
    assert_eq!(remote.state().led_duration(), 10);
    remote
        .control_ring_light(SwitchState::On, None)
        .await
        .unwrap();
    assert_eq!(remote.state().led_duration(), 5);

    let payloads: Vec<_> = bus
        .published_to(&topic("ledlight/on"))
        .into_iter()
        .map(|m| (m.payload, m.qos, m.retain))
        .collect();
    assert_eq!(
        payloads,
        vec![
            ("1".to_string(), QoS::AtLeastOnce, false),
            ("10".to_string(), QoS::AtLeastOnce, false),
            ("5".to_string(), QoS::AtLeastOnce, false),
        ]
    );

    remote.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn ring_light_turns_off_after_duration_without_publishing() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;
    let mut events = remote.subscribe();

    remote.ring_light_on(3).await.unwrap();
    assert_eq!(remote.state().led_state(), SwitchState::On);
    assert_eq!(remote.state().led_duration(), 3);
    bus.clear_published();

    tokio::time::sleep(Duration::from_millis(2900)).await;
    settle(&remote).await;
    assert_eq!(remote.state().led_state(), SwitchState::On);

    tokio::time::sleep(Duration::from_millis(200)).await;
    settle(&remote).await;
    assert_eq!(remote.state().led_state(), SwitchState::Off);
    assert_eq!(remote.state().led_duration(), 0);
    assert!(bus.published().is_empty());

    let mut ring_light_changes = 0;
    while let Ok(event) = events.try_recv() {
        if matches!(event.change(), Some(StateChange::RingLight { .. })) {
            ring_light_changes += 1;
        }
    }
    assert_eq!(ring_light_changes, 2);

    remote.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn ring_light_off_cancels_pending_timer() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    remote.on_ring_light_changed(move |_, _| {
        counter.fetch_add(1, Ordering::SeqCst);
    });

    remote.ring_light_on(5).await.unwrap();
    bus.clear_published();
    remote.ring_light_off().await.unwrap();
    assert_eq!(remote.state().led_state(), SwitchState::Off);
    assert_eq!(remote.state().led_duration(), 0);

    tokio::time::sleep(Duration::from_secs(6)).await;
    settle(&remote).await;

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(bus.published().is_empty());

    remote.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn ring_light_rearm_extends_timer() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;

    remote.ring_light_on(3).await.unwrap();
    tokio::time::sleep(Duration::from_secs(2)).await;
    remote.ring_light_on(3).await.unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    settle(&remote).await;
    assert_eq!(remote.state().led_state(), SwitchState::On);

    tokio::time::sleep(Duration::from_millis(1100)).await;
    settle(&remote).await;
    assert_eq!(remote.state().led_state(), SwitchState::Off);

    remote.shutdown().await.unwrap();
}

// ============================================================================
// Battery poll and shutdown
// ============================================================================

#[tokio::test(start_paused = true)]
async fn battery_is_polled_hourly() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;
    assert_eq!(bus.published_to(&topic("battery/status")).len(), 1);

    tokio::time::sleep(Duration::from_secs(3601)).await;
    settle(&remote).await;
    assert_eq!(bus.published_to(&topic("battery/status")).len(), 2);

    tokio::time::sleep(Duration::from_secs(3600)).await;
    settle(&remote).await;
    assert_eq!(bus.published_to(&topic("battery/status")).len(), 3);

    remote.shutdown().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn shutdown_releases_everything_and_stops_timers() {
    let bus = MemoryBus::new();
    bus.inject_retained(&topic("device/list"), r#"[{"id": "1", "name": "TV"}]"#);
    bus.inject_retained(&topic("macro/list"), &macro_list(&["Movie"]));
    let remote = start(&bus).await;
    settle(&remote).await;
    remote.ring_light_on(3).await.unwrap();
    assert_eq!(bus.total_active_subscriptions(), 8);

    remote.shutdown().await.unwrap();
    remote.shutdown().await.unwrap();
    assert_eq!(bus.total_active_subscriptions(), 0);
    assert_eq!(bus.unsubscribe_count(&trigger_topic("Movie")), 1);

    bus.clear_published();
    tokio::time::sleep(Duration::from_secs(7200)).await;
    assert!(bus.published().is_empty());
    assert_eq!(remote.state().led_state(), SwitchState::On);
    assert!(matches!(remote.ring_light_off().await, Err(Error::NotRunning)));
}

#[tokio::test(start_paused = true)]
async fn shutdown_with_subscribe_in_flight_leaks_nothing() {
    let bus = MemoryBus::new();
    let remote = start(&bus).await;
    bus.set_subscribe_delay(Some(Duration::from_secs(1)));

    bus.inject(&topic("macro/list"), &macro_list(&["Movie"]));
    settle(&remote).await;
    remote.shutdown().await.unwrap();

    tokio::time::sleep(Duration::from_secs(2)).await;
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
    assert_eq!(bus.total_active_subscriptions(), 0);
}
