//! End-to-end tests over TCP

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use notes_rt::client::{
    ChatClient, ChatEvent, ClientConfig, EventSubscriber, NotesClient, SubscriberEvent,
};
use notes_rt::protocol::StatusCode;
use notes_rt::session::{ChatConfig, SubscriptionConfig};
use notes_rt::{Error, NotesServer, ServerConfig};

const TOKEN: &str = "test-token";
const WAIT: Duration = Duration::from_secs(5);

struct TestServer {
    addr: String,
    shutdown: CancellationToken,
    handle: JoinHandle<notes_rt::Result<()>>,
    server: Arc<NotesServer>,
}

impl TestServer {
    async fn start() -> Self {
        let config = ServerConfig::default()
            .auth(TOKEN, 1)
            .chat(ChatConfig::default().content_interval(Duration::from_millis(50)))
            .subscription(SubscriptionConfig::default().heartbeat_interval(Duration::from_millis(200)));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let server = Arc::new(NotesServer::new(config));
        let shutdown = server.shutdown_token();

        let handle = tokio::spawn({
            let server = Arc::clone(&server);
            async move { server.serve(listener, std::future::pending()).await }
        });

        Self {
            addr,
            shutdown,
            handle,
            server,
        }
    }

    fn config(&self) -> ClientConfig {
        ClientConfig::new(self.addr.clone())
    }

    async fn stop(self) {
        self.shutdown.cancel();
        let result = tokio::time::timeout(WAIT, self.handle)
            .await
            .expect("server did not stop")
            .unwrap();
        assert!(result.is_ok());
    }
}

async fn next_ack(events: &mut mpsc::Receiver<ChatEvent>) -> String {
    loop {
        let event = tokio::time::timeout(WAIT, events.recv())
            .await
            .expect("timed out waiting for ack")
            .expect("event channel closed");
        match event {
            ChatEvent::Ack(id) => return id,
            ChatEvent::Message(_) => continue,
            other => panic!("unexpected chat event: {:?}", other),
        }
    }
}

async fn next_subscriber_event(events: &mut mpsc::Receiver<SubscriberEvent>) -> SubscriberEvent {
    tokio::time::timeout(WAIT, events.recv())
        .await
        .expect("timed out waiting for event")
        .expect("event channel closed")
}

#[tokio::test]
async fn test_chat_acks_every_message() {
    let server = TestServer::start().await;
    let (mut chat, mut events) = ChatClient::connect(server.config()).await.unwrap();

    let mut sent = Vec::new();
    for content in ["a", "b", "c"] {
        sent.push(chat.send(content).await.unwrap());
    }

    let mut acked = Vec::new();
    for _ in 0..3 {
        acked.push(next_ack(&mut events).await);
    }
    // Acks are correlated by id, not by position
    acked.sort();
    sent.sort();
    assert_eq!(acked, sent);

    chat.close().await.unwrap();
    loop {
        match tokio::time::timeout(WAIT, events.recv()).await.unwrap() {
            Some(ChatEvent::Closed) | None => break,
            Some(ChatEvent::Message(_)) => continue,
            Some(other) => panic!("unexpected chat event: {:?}", other),
        }
    }

    server.stop().await;
}

#[tokio::test]
async fn test_chat_pushes_content() {
    let server = TestServer::start().await;
    let (_chat, mut events) = ChatClient::connect(server.config()).await.unwrap();

    let event = tokio::time::timeout(WAIT, events.recv()).await.unwrap();
    match event {
        Some(ChatEvent::Message(text)) => assert!(!text.is_empty()),
        other => panic!("expected content, got {:?}", other),
    }

    server.stop().await;
}

#[tokio::test]
async fn test_subscription_receives_created_note() {
    let server = TestServer::start().await;
    let (mut subscriber, mut events) = EventSubscriber::connect(server.config(), 1).await.unwrap();

    // The first heartbeat is sent after the hub registration
    match next_subscriber_event(&mut events).await {
        SubscriberEvent::HealthCheck(_) => {}
        other => panic!("expected heartbeat, got {:?}", other),
    }

    let notes = NotesClient::new(server.config().bearer_token(TOKEN));
    let created = notes.create_note("groceries", "milk").await.unwrap();

    let received = loop {
        match next_subscriber_event(&mut events).await {
            SubscriberEvent::HealthCheck(_) => continue,
            SubscriberEvent::NoteCreated(note) => break note,
            other => panic!("unexpected event: {:?}", other),
        }
    };
    assert_eq!(received, created);

    subscriber.unsubscribe().await.unwrap();

    // Closing the stream releases the hub registration
    tokio::time::timeout(WAIT, async {
        while server.server.hub().subscriber_count() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("subscription was not released");

    server.stop().await;
}

#[tokio::test]
async fn test_unary_calls_require_token() {
    let server = TestServer::start().await;

    let anonymous = NotesClient::new(server.config());
    match anonymous.create_note("t", "c").await {
        Err(Error::Rpc(status)) => assert_eq!(status.code, StatusCode::Unauthenticated),
        other => panic!("expected unauthenticated, got {:?}", other),
    }

    let wrong = NotesClient::new(server.config().bearer_token("nope"));
    assert!(matches!(wrong.get_notes(1).await, Err(Error::Rpc(_))));

    server.stop().await;
}

#[tokio::test]
async fn test_note_crud() {
    let server = TestServer::start().await;
    let notes = NotesClient::new(server.config().bearer_token(TOKEN));

    let note = notes.create_note("title", "body").await.unwrap();
    assert_eq!(note.user_id, 1);
    assert_eq!(notes.get_note(note.id).await.unwrap(), note);
    assert_eq!(notes.get_notes(1).await.unwrap(), vec![note.clone()]);

    notes.delete_note(note.id).await.unwrap();
    match notes.get_note(note.id).await {
        Err(Error::Rpc(status)) => assert_eq!(status.code, StatusCode::NotFound),
        other => panic!("expected not found, got {:?}", other),
    }

    match notes.create_note("", "body").await {
        Err(Error::Rpc(status)) => assert_eq!(status.code, StatusCode::InvalidArgument),
        other => panic!("expected invalid argument, got {:?}", other),
    }

    server.stop().await;
}

#[tokio::test]
async fn test_upload_metrics_returns_sum() {
    let server = TestServer::start().await;
    let notes = NotesClient::new(server.config());

    let summary = tokio::time::timeout(WAIT, notes.upload_metrics(0..10))
        .await
        .expect("upload timed out")
        .unwrap();
    assert_eq!(summary.total_view, 45);

    let empty = notes.upload_metrics(std::iter::empty()).await.unwrap();
    assert_eq!(empty.total_view, 0);

    server.stop().await;
}

#[tokio::test]
async fn test_shutdown_closes_open_streams() {
    let server = TestServer::start().await;
    let (_chat, mut chat_events) = ChatClient::connect(server.config()).await.unwrap();
    let (_subscriber, mut sub_events) = EventSubscriber::connect(server.config(), 1).await.unwrap();

    assert!(matches!(
        next_subscriber_event(&mut sub_events).await,
        SubscriberEvent::HealthCheck(_)
    ));

    let stats_before = server.server.stats();
    assert_eq!(stats_before.active_connections, 2);

    server.stop().await;

    let closed = tokio::time::timeout(WAIT, async {
        while let Some(event) = chat_events.recv().await {
            if matches!(event, ChatEvent::Closed) {
                return true;
            }
        }
        true
    })
    .await
    .unwrap();
    assert!(closed);

    let sub_closed = tokio::time::timeout(WAIT, async {
        while let Some(event) = sub_events.recv().await {
            if matches!(event, SubscriberEvent::Closed | SubscriberEvent::Error(_)) {
                return true;
            }
        }
        true
    })
    .await
    .unwrap();
    assert!(sub_closed);
}
