//! Inbound event routing tests

mod common;

use std::sync::Arc;

use parking_lot::Mutex;

use anp_manager::{AnpEvent, BdAddr, Category, CategoryMask, ConnectionType};
use anp_protocol::records::{
    CategoryChangeMessage, ConnectionMessage, NewAlertNotificationMessage,
    UnreadStatusNotificationMessage,
};
use anp_protocol::MessageFunction;

use common::{register_client, running_manager, wait_until, Recorder, PEER};

fn connected() -> ConnectionMessage {
    ConnectionMessage {
        connection_type: ConnectionType::Client,
        remote_address: PEER,
    }
}

#[test]
fn test_connection_events_reach_server_then_client() {
    let (manager, transport) = running_manager();
    let order = Arc::new(Mutex::new(Vec::new()));

    let server_log = Arc::clone(&order);
    manager
        .register_server_callback(move |event| server_log.lock().push(("server", event.clone())))
        .unwrap();
    transport.script(MessageFunction::RegisterAnpClientEvents, common::Reply::Status(42));
    let client_log = Arc::clone(&order);
    manager
        .register_client_callback(move |event| client_log.lock().push(("client", event.clone())))
        .unwrap();

    transport.deliver(MessageFunction::Connected, &connected());
    transport.deliver(MessageFunction::Disconnected, &connected());

    assert!(wait_until(|| order.lock().len() == 4));
    let order = order.lock();
    let tags: Vec<_> = order.iter().map(|(tag, event)| (*tag, event.name())).collect();
    assert_eq!(
        tags,
        vec![
            ("server", "connected"),
            ("client", "connected"),
            ("server", "disconnected"),
            ("client", "disconnected"),
        ]
    );
    assert_eq!(
        order[0].1,
        AnpEvent::Connected {
            connection_type: ConnectionType::Client,
            remote_address: PEER,
        }
    );
}

#[test]
fn test_category_changes_reach_server_callbacks_only() {
    let (manager, transport) = running_manager();
    let (server_cb, server) = Recorder::new();
    manager.register_server_callback(server_cb).unwrap();
    let (_, client) = register_client(&manager, &transport, 42);

    let change = CategoryChangeMessage {
        remote_address: PEER,
        category: Category::SmsMms,
        enabled_categories: CategoryMask(0b0010_0001),
    };
    transport.deliver(MessageFunction::NewAlertCategoryEnabled, &change);
    transport.deliver(MessageFunction::UnreadAlertCategoryDisabled, &change);

    assert_eq!(
        server.next(),
        AnpEvent::NewAlertCategoryEnabled {
            remote_address: PEER,
            category: Category::SmsMms,
            enabled_categories: CategoryMask(0b0010_0001),
        }
    );
    assert!(matches!(
        server.next(),
        AnpEvent::UnreadStatusCategoryDisabled {
            category: Category::SmsMms,
            ..
        }
    ));
    client.assert_quiet();
}

#[test]
fn test_notifications_reach_client_callbacks_only() {
    let (manager, transport) = running_manager();
    let (server_cb, server) = Recorder::new();
    manager.register_server_callback(server_cb).unwrap();
    let (_, first) = register_client(&manager, &transport, 42);
    let (second_cb, second) = Recorder::new();
    manager.register_client_callback(second_cb).unwrap();

    transport.deliver(
        MessageFunction::NewAlertNotification,
        &NewAlertNotificationMessage {
            remote_address: PEER,
            category: Category::Email,
            number_new_alerts: 3,
            last_alert_text: Some("Lunch?".into()),
        },
    );

    for recorder in [&first, &second] {
        match recorder.next() {
            AnpEvent::NewAlertNotification {
                remote_address,
                category,
                number_new_alerts,
                last_alert_text,
            } => {
                assert_eq!(remote_address, PEER);
                assert_eq!(category, Category::Email);
                assert_eq!(number_new_alerts, 3);
                assert_eq!(last_alert_text.as_deref(), Some("Lunch?"));
            }
            other => panic!("Expected new alert notification, got {:?}", other),
        }
    }
    server.assert_quiet();
}

#[test]
fn test_malformed_messages_are_dropped() {
    let (manager, transport) = running_manager();
    let (_, client) = register_client(&manager, &transport, 42);

    // Shorter than the fixed part of the record
    transport.deliver_raw(MessageFunction::NewAlertNotification.as_u32(), &[1, 2, 3]);

    // Text length prefix runs past the end of the payload
    let mut lying = Vec::new();
    lying.extend_from_slice(PEER.as_bytes());
    lying.extend_from_slice(&Category::Email.as_u32().to_le_bytes());
    lying.extend_from_slice(&1u32.to_le_bytes());
    lying.push(1);
    lying.extend_from_slice(&200u64.to_le_bytes());
    lying.extend_from_slice(b"short");
    transport.deliver_raw(MessageFunction::NewAlertNotification.as_u32(), &lying);

    // Unknown function in the event range
    transport.deliver_raw(0x0003_0001, &[0; 32]);

    transport.deliver(
        MessageFunction::UnreadStatusNotification,
        &UnreadStatusNotificationMessage {
            remote_address: PEER,
            category: Category::VoiceMail,
            number_unread_alerts: 7,
        },
    );

    assert_eq!(
        client.next(),
        AnpEvent::UnreadStatusNotification {
            remote_address: PEER,
            category: Category::VoiceMail,
            number_unread_alerts: 7,
        }
    );
    client.assert_quiet();
}

#[test]
fn test_panicking_callback_does_not_stop_delivery() {
    let (manager, transport) = running_manager();
    manager
        .register_server_callback(|_| panic!("subscriber bug"))
        .unwrap();
    let (server_cb, server) = Recorder::new();
    manager.register_server_callback(server_cb).unwrap();

    transport.deliver(MessageFunction::Connected, &connected());
    transport.deliver(MessageFunction::Disconnected, &connected());

    assert_eq!(server.next().name(), "connected");
    assert_eq!(server.next().name(), "disconnected");
}

#[test]
fn test_callback_may_call_back_into_manager() {
    let (manager, transport) = running_manager();
    let (server_cb, server) = Recorder::new();

    let reentrant = manager.clone();
    let registered = Arc::new(Mutex::new(None));
    let slot = Arc::clone(&registered);
    let id = manager
        .register_server_callback(move |event| {
            server_cb(event);
            if let Some(id) = slot.lock().take() {
                reentrant.unregister_server_callback(id);
            }
        })
        .unwrap();
    *registered.lock() = Some(id);

    transport.deliver(MessageFunction::Connected, &connected());
    assert_eq!(server.next().name(), "connected");
    assert!(wait_until(|| manager.server_callback_count() == 0));

    transport.deliver(MessageFunction::Connected, &connected());
    server.assert_quiet();
}

#[test]
fn test_unregistered_callback_stops_receiving() {
    let (manager, transport) = running_manager();
    let (server_cb, server) = Recorder::new();
    let id = manager.register_server_callback(server_cb).unwrap();

    manager.unregister_server_callback(id);
    // Unknown and zero IDs are ignored
    manager.unregister_server_callback(id);
    manager.unregister_server_callback(anp_manager::CallbackId::new(0));

    transport.deliver(MessageFunction::Connected, &connected());
    server.assert_quiet();
}

#[test]
fn test_events_after_shutdown_are_not_delivered() {
    let (manager, transport) = running_manager();
    let (server_cb, server) = Recorder::new();
    manager.register_server_callback(server_cb).unwrap();

    let handler_message = anp_protocol::Message::encode(
        common::SERVER_ADDRESS_ID,
        0,
        anp_protocol::ANP_MESSAGE_GROUP,
        MessageFunction::Connected.as_u32(),
        &ConnectionMessage {
            connection_type: ConnectionType::Server,
            remote_address: BdAddr::new([9; 6]),
        },
    )
    .unwrap();
    manager.shutdown();
    assert!(!transport.has_handler());

    manager.initialize().unwrap();
    transport.deliver_message(handler_message);
    // The callback registered before shutdown was dropped with the session
    server.assert_quiet();
}
