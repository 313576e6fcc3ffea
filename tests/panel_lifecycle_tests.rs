mod common;

use common::{panel_events, result_with, PanelRecorder};
use complexity_watch::kernel::event::{Event, PanelEvent, Trigger};
use complexity_watch::panel::{PanelManager, PanelState, ViewSlot};
use complexity_watch::WatchConfig;
use pretty_assertions::assert_eq;

fn manager() -> (PanelManager, PanelRecorder, tokio::sync::mpsc::UnboundedReceiver<Event>) {
    let recorder = PanelRecorder::new();
    let (tx, rx) = panel_events();
    let manager = PanelManager::new(recorder.host(), WatchConfig::default().panel_spec(), tx);
    (manager, recorder, rx)
}

#[test]
fn test_background_never_opens_a_panel() {
    let (mut panels, recorder, _rx) = manager();

    for _ in 0..5 {
        assert!(panels.ensure_panel(false).is_none());
    }
    assert_eq!(panels.state(), PanelState::Absent);
    assert!(recorder.created().is_empty());
}

#[test]
fn test_forced_creation_is_idempotent() {
    let (mut panels, recorder, _rx) = manager();

    let first = panels.ensure_panel(true).expect("forced creation");
    assert!(first.fresh);
    assert_eq!(panels.state(), PanelState::Open);

    let again = panels.ensure_panel(true).expect("existing panel");
    let background = panels.ensure_panel(false).expect("existing panel");
    assert_eq!(again.id, first.id);
    assert_eq!(background.id, first.id);
    assert!(!again.fresh && !background.fresh);
    assert_eq!(recorder.created(), vec![first.id], "Single-panel invariant");
}

#[test]
fn test_delivery_reveals_fresh_hidden_or_manual() {
    let (mut panels, recorder, _rx) = manager();

    let fresh = panels.ensure_panel(true).unwrap();
    assert!(panels.deliver(fresh, result_with("a", 1), Trigger::Manual));
    assert_eq!(recorder.reveals(), vec![(fresh.id, ViewSlot::Beside)]);

    // Visible and background: post only
    let handle = panels.ensure_panel(false).unwrap();
    assert!(panels.deliver(handle, result_with("b", 2), Trigger::Background));
    assert_eq!(recorder.reveals().len(), 1);

    // Hidden: background delivery brings it back
    recorder.set_visible(handle.id, false);
    assert!(panels.deliver(handle, result_with("c", 3), Trigger::Background));
    assert_eq!(recorder.reveals().len(), 2);

    // Visible but manual: reveal anyway
    assert!(panels.deliver(handle, result_with("d", 4), Trigger::Manual));
    assert_eq!(recorder.reveals().len(), 3);

    let names: Vec<String> = recorder.results().iter().map(|r| r.methods[0].name.clone()).collect();
    assert_eq!(names, vec!["a", "b", "c", "d"]);
}

#[test]
fn test_disposal_hook_resets_slot() {
    let (mut panels, recorder, mut rx) = manager();

    let handle = panels.ensure_panel(true).unwrap();
    recorder.close_latest();

    // The hook travels through the loop channel
    match rx.try_recv() {
        Ok(Event::Panel(PanelEvent::Disposed(id))) => {
            assert_eq!(id, handle.id);
            assert!(panels.on_disposed(id));
        }
        other => panic!("expected disposal event, got {:?}", other),
    }

    assert_eq!(panels.state(), PanelState::Absent);
    assert!(panels.ensure_panel(false).is_none());
    assert!(!panels.deliver(handle, result_with("late", 1), Trigger::Background), "Stale handle is rejected");

    let reopened = panels.ensure_panel(true).unwrap();
    assert_ne!(reopened.id, handle.id);
    assert_eq!(recorder.created().len(), 2);
}

#[test]
fn test_stale_disposal_does_not_close_new_panel() {
    let (mut panels, _recorder, _rx) = manager();

    let old = panels.ensure_panel(true).unwrap();
    assert!(panels.on_disposed(old.id));
    let current = panels.ensure_panel(true).unwrap();

    assert!(!panels.on_disposed(old.id), "Second disposal of the old panel is ignored");
    assert_eq!(panels.current(), Some(current.id));
}

#[test]
fn test_shutdown_disposes_open_panel() {
    let (mut panels, recorder, _rx) = manager();

    let handle = panels.ensure_panel(true).unwrap();
    panels.shutdown();

    assert_eq!(panels.state(), PanelState::Absent);
    assert_eq!(recorder.disposed(), vec![handle.id]);

    panels.shutdown();
    assert_eq!(recorder.disposed().len(), 1, "Nothing left to dispose");
}
