use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

use mezcal_monitor::config::MonitorConfig;
use mezcal_monitor::connection::ConnectionManager;
use mezcal_monitor::events::{EventBus, callback};
use mezcal_monitor::transport::ws::WsTransport;

/// Poll `check` until it holds or a couple of seconds pass.
async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}

#[tokio::test]
async fn round_trip_over_a_real_socket() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    // Gateway: push a ping, a binary frame and one update, then echo back the
    // first text frame it receives.
    let gateway = tokio::spawn(async move {
        let (tcp, _) = listener.accept().await.unwrap();
        let mut ws = accept_async(tcp).await.unwrap();
        ws.send(Message::Ping(vec![1, 2])).await.unwrap();
        ws.send(Message::Binary(vec![0xff])).await.unwrap();
        ws.send(Message::Text(
            r#"{"type":"vat:vat-1:update","payload":{"id":"vat-1","temperature":28.4}}"#.to_string(),
        ))
        .await
        .unwrap();
        loop {
            match ws.next().await {
                Some(Ok(Message::Text(text))) => return text,
                Some(Ok(_)) => continue,
                other => panic!("gateway read failed: {other:?}"),
            }
        }
    });

    let bus = Arc::new(EventBus::new());
    let statuses = Arc::new(Mutex::new(Vec::new()));
    let updates = Arc::new(Mutex::new(Vec::new()));
    {
        let statuses = Arc::clone(&statuses);
        bus.subscribe(
            "connection:status",
            callback(move |p| statuses.lock().unwrap().push(p["connected"].as_bool().unwrap())),
        );
        let updates = Arc::clone(&updates);
        bus.subscribe(
            "vat:vat-1:update",
            callback(move |p| updates.lock().unwrap().push(p.clone())),
        );
    }

    let config = MonitorConfig {
        endpoint: format!("ws://{addr}"),
        ..MonitorConfig::default()
    };
    let manager = ConnectionManager::new(&config, Arc::clone(&bus), Arc::new(WsTransport));
    assert!(manager.connect());

    assert!(eventually(|| !updates.lock().unwrap().is_empty()).await);
    assert_eq!(*statuses.lock().unwrap(), vec![true]);
    assert_eq!(
        updates.lock().unwrap()[0],
        json!({ "id": "vat-1", "temperature": 28.4 })
    );

    manager
        .send("valve:set", &json!({ "id": "valve-vat-1-cold", "status": "cerrado" }))
        .unwrap();
    let echoed = tokio::time::timeout(Duration::from_secs(2), gateway)
        .await
        .unwrap()
        .unwrap();
    let echoed: Value = serde_json::from_str(&echoed).unwrap();
    assert_eq!(echoed["type"], "valve:set");
    assert_eq!(echoed["payload"]["id"], "valve-vat-1-cold");

    manager.disconnect();
    assert_eq!(*statuses.lock().unwrap(), vec![true, false]);
}

#[tokio::test]
async fn refused_endpoint_reports_disconnected_and_retries_later() {
    // Bind then drop so the port is almost certainly closed.
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let bus = Arc::new(EventBus::new());
    let statuses = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&statuses);
    bus.subscribe(
        "connection:status",
        callback(move |p| sink.lock().unwrap().push(p["connected"].as_bool().unwrap())),
    );

    let config = MonitorConfig {
        endpoint: format!("ws://{addr}"),
        reconnect_delay: Duration::from_secs(60),
        ..MonitorConfig::default()
    };
    let manager = ConnectionManager::new(&config, bus, Arc::new(WsTransport));
    manager.connect();

    assert!(eventually(|| manager.has_pending_reconnect()).await);
    assert_eq!(*statuses.lock().unwrap(), vec![false]);
    assert!(!manager.is_connected());
    manager.stop();
    assert!(!manager.has_pending_reconnect());
}
