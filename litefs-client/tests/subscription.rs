//! Event subscription against a scripted node
//!
//! Covers reconnect-on-next-read after every kind of failure, and closing a
//! subscription while a read is blocked.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockNode, INIT, PRIMARY_CHANGE_NODE_2, TIMEOUT, TX, UNKNOWN};
use litefs_client::{Error, Event, EventData, EventSubscription};
use tokio::sync::mpsc;

async fn next(es: &EventSubscription) -> litefs_client::Result<Event> {
    tokio::time::timeout(TIMEOUT, es.next())
        .await
        .expect("next() did not return in time")
}

async fn assert_read_event(es: &EventSubscription, expected: &str) {
    let event = next(es).await.unwrap_or_else(|e| panic!("unexpected error: {e}"));
    assert_eq!(event, Event::decode(expected).unwrap());
}

#[tokio::test]
async fn test_happy_path() {
    let node = MockNode::start().await;
    let conn = node.connection();
    conn.line(INIT);
    conn.line(TX);
    conn.line(PRIMARY_CHANGE_NODE_2);

    let es = node.client().subscribe_events();

    assert_read_event(&es, INIT).await;
    assert_read_event(&es, TX).await;
    assert_read_event(&es, PRIMARY_CHANGE_NODE_2).await;

    // Server finishes the response: plain end of stream
    drop(conn);
    assert!(matches!(next(&es).await, Err(Error::StreamEnded)));
}

#[tokio::test]
async fn test_error_status_then_reconnect() {
    let node = MockNode::start().await;
    node.connection().status(500);
    let conn = node.connection();
    conn.line(INIT);

    let es = node.client().subscribe_events();

    let err = next(&es).await.unwrap_err();
    assert!(matches!(err, Error::UnexpectedStatus(500)), "got {err:?}");
    assert!(err.is_retryable());

    assert_read_event(&es, INIT).await;
}

#[tokio::test]
async fn test_premature_hangup() {
    let node = MockNode::start().await;
    let first = node.connection();
    first.line(INIT);
    first.hangup();
    let second = node.connection();
    second.line(INIT);

    let es = node.client().subscribe_events();

    assert_read_event(&es, INIT).await;

    let err = next(&es).await.unwrap_err();
    assert!(matches!(err, Error::Truncated(_)), "got {err:?}");

    assert_read_event(&es, INIT).await;
}

#[tokio::test]
async fn test_bad_response() {
    let node = MockNode::start().await;
    let first = node.connection();
    first.line("beep boop");
    first.line(INIT);
    let second = node.connection();
    second.line(INIT);

    let es = node.client().subscribe_events();

    let err = next(&es).await.unwrap_err();
    assert!(matches!(err, Error::Decode(_)), "got {err:?}");

    // The rest of the broken stream is discarded; this comes from a new request
    assert_read_event(&es, INIT).await;
}

#[tokio::test]
async fn test_unknown_event_type_is_not_an_error() {
    let node = MockNode::start().await;
    let conn = node.connection();
    conn.line(UNKNOWN);
    conn.line(INIT);

    let es = node.client().subscribe_events();

    let event = next(&es).await.unwrap();
    assert_eq!(
        event.data,
        EventData::Unknown {
            event_type: "checkpoint".to_string()
        }
    );
    assert_read_event(&es, INIT).await;
}

#[tokio::test]
async fn test_connection_refused() {
    let url = common::unused_url().await;
    let es = common::client_for(&url).subscribe_events();

    let err = next(&es).await.unwrap_err();
    assert!(matches!(err, Error::Transport(_)), "got {err:?}");
}

#[tokio::test]
async fn test_close_unblocks_pending_next() {
    let node = MockNode::start().await;
    // Registered but silent: the request never gets a response
    let _conn = node.connection();

    let es = Arc::new(node.client().subscribe_events());
    let reader = tokio::spawn({
        let es = es.clone();
        async move { es.next().await }
    });

    tokio::time::sleep(Duration::from_millis(50)).await;
    es.close();

    let result = tokio::time::timeout(Duration::from_secs(1), reader)
        .await
        .expect("close did not unblock next()")
        .unwrap();
    assert!(matches!(result, Err(Error::Closed)));

    assert!(matches!(es.next().await, Err(Error::Closed)));
    es.close();
}

#[tokio::test]
async fn test_close_while_streaming() {
    let node = MockNode::start().await;
    let conn = node.connection();
    conn.line(INIT);

    let es = node.client().subscribe_events();
    assert_read_event(&es, INIT).await;

    es.close();
    conn.line(PRIMARY_CHANGE_NODE_2);
    assert!(matches!(es.next().await, Err(Error::Closed)));
}

#[tokio::test]
async fn test_channel_preserves_order() {
    let node = MockNode::start().await;
    let first = node.connection();
    first.line(INIT);
    first.line(PRIMARY_CHANGE_NODE_2);
    first.hangup();
    let second = node.connection();
    second.line(INIT);

    let (subscription, mut events) = node.client().subscribe_channel();

    assert_eq!(recv(&mut events).await.unwrap().unwrap(), Event::decode(INIT).unwrap());
    assert_eq!(
        recv(&mut events).await.unwrap().unwrap(),
        Event::decode(PRIMARY_CHANGE_NODE_2).unwrap()
    );
    assert!(matches!(recv(&mut events).await.unwrap(), Err(Error::Truncated(_))));
    assert_eq!(recv(&mut events).await.unwrap().unwrap(), Event::decode(INIT).unwrap());

    subscription.close();
    assert!(matches!(recv(&mut events).await.unwrap(), Err(Error::Closed)));
    assert!(recv(&mut events).await.is_none());
}

async fn recv(
    events: &mut mpsc::Receiver<litefs_client::Result<Event>>,
) -> Option<litefs_client::Result<Event>> {
    tokio::time::timeout(TIMEOUT, events.recv())
        .await
        .expect("channel did not deliver in time")
}
