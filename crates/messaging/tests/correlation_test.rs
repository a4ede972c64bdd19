//! Request/reply behaviour of the messaging layer.
//!
//! # Test Strategy
//!
//! 1. **Registry basics**: deliver unblocks, timeout expires, release is idempotent
//! 2. **Lifecycle**: send_and_wait always releases its wait
//! 3. **Concurrency**: many callers, one deliverer, shuffled replies
//! 4. **End to end**: two nodes over the loopback transport

use std::sync::Arc;
use std::time::{Duration, Instant};

use corelib::message::{DataSources, NoOp, Progress, PublishedItem, RequestConfig, RequestOptions};
use corelib::{Envelope, Message, MessageKind, NodeId, Packet};
use messaging::{
    serve_requests, start_node, CorrelationRegistry, Dispatcher, LoopbackNetwork, MessagingConfig,
    MessagingError, Messenger, StaticGate, WaitState,
};
use rand::seq::SliceRandom;
use tokio::sync::mpsc;

fn reply_packet(correlation_id: &str, note: &str) -> Packet {
    Packet::new(
        Envelope::new(NodeId(1), NodeId(2), correlation_id),
        NoOp::new(note),
    )
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Registry Basics
// ============================================================================

#[tokio::test]
async fn test_deliver_unblocks_waiter() {
    let registry = CorrelationRegistry::new();
    let mut handle = registry.create_wait("abc", Duration::from_secs(5)).unwrap();

    let deliverer = registry.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(deliverer.deliver(reply_packet("abc", "the reply")));
    });

    let started = Instant::now();
    let packet = handle.wait().await.expect("reply");
    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(packet, reply_packet("abc", "the reply"));
}

#[tokio::test]
async fn test_timeout_with_real_clock() {
    let registry = CorrelationRegistry::new();
    let mut handle = registry.create_wait("abc", Duration::from_millis(100)).unwrap();

    let started = Instant::now();
    let err = handle.wait().await.unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, MessagingError::Timeout { ref correlation_id, .. } if correlation_id == "abc"));
    assert!(elapsed >= Duration::from_millis(100), "returned early: {elapsed:?}");
    assert!(elapsed < Duration::from_millis(600), "returned late: {elapsed:?}");

    registry.release(&handle);
    assert!(!registry.contains("abc"));
}

#[tokio::test]
async fn test_deliver_after_release_is_noop() {
    let registry = CorrelationRegistry::new();
    let mut other = registry.create_wait("other", Duration::from_secs(5)).unwrap();

    let handle = registry.create_wait("abc", Duration::from_secs(5)).unwrap();
    registry.release(&handle);
    assert!(!registry.deliver(reply_packet("abc", "too late")));

    // The unrelated wait is untouched and still works
    assert_eq!(registry.state("other"), Some(WaitState::Created));
    assert!(registry.deliver(reply_packet("other", "mine")));
    assert_eq!(
        other.wait().await.unwrap().message,
        Message::from(NoOp::new("mine"))
    );
}

#[tokio::test]
async fn test_duplicate_correlation_id_rejected() {
    let registry = CorrelationRegistry::new();
    let _first = registry.create_wait("same", Duration::from_secs(5)).unwrap();
    let err = registry
        .create_wait("same", Duration::from_secs(5))
        .unwrap_err();
    assert!(matches!(err, MessagingError::DuplicateCorrelationId(_)));
    assert_eq!(registry.len(), 1);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[tokio::test]
async fn test_cancelled_caller_releases_wait() {
    let network = LoopbackNetwork::default();
    let _peer_inbox = network.register(NodeId(2));
    let messenger = Arc::new(
        Messenger::new(
            NodeId(1),
            network.transport(),
            &StaticGate::allow(),
            &MessagingConfig::default(),
        )
        .unwrap(),
    );

    let caller = {
        let messenger = messenger.clone();
        tokio::spawn(async move { messenger.request(NodeId(2), RequestConfig).await })
    };
    // Let the request register and send
    while messenger.registry().is_empty() {
        tokio::task::yield_now().await;
    }
    caller.abort();
    let _ = caller.await;

    assert!(messenger.registry().is_empty());
}

#[tokio::test]
async fn test_lossy_link_times_out() {
    init_tracing();
    let network = LoopbackNetwork::default();
    let _peer_inbox = network.register(NodeId(2));
    network.set_lossy(true);

    let messenger = Messenger::new(
        NodeId(1),
        network.transport(),
        &StaticGate::allow(),
        &MessagingConfig::default(),
    )
    .unwrap();

    let err = messenger
        .request_with_timeout(NodeId(2), NoOp::new("anyone?"), Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(err.is_retryable());
    assert!(messenger.registry().is_empty());
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_get_their_own_reply() {
    init_tracing();
    const CALLERS: usize = 200;

    let network = LoopbackNetwork::new(CALLERS * 2);
    let caller_inbox = network.register(NodeId(1));
    let mut peer_inbox = network.register(NodeId(2));

    let registry = CorrelationRegistry::new();
    let messenger = Arc::new(
        Messenger::with_registry(
            NodeId(1),
            network.transport(),
            &StaticGate::allow(),
            &MessagingConfig::default(),
            registry.clone(),
        )
        .unwrap(),
    );
    let receive_loop = tokio::spawn(Dispatcher::new(NodeId(1), registry).run(caller_inbox));

    let mut callers = Vec::with_capacity(CALLERS);
    for i in 0..CALLERS {
        let messenger = messenger.clone();
        callers.push(tokio::spawn(async move {
            let envelope = Envelope::new(NodeId(2), NodeId(1), format!("call-{i}"));
            let reply = messenger
                .send_and_wait(&envelope, &NoOp::new(format!("{i}")).into(), Duration::from_secs(10))
                .await
                .expect("reply");
            (envelope.correlation_id, reply)
        }));
    }

    // Single deliverer: collect every request, answer in random order
    let mut requests = Vec::with_capacity(CALLERS);
    while requests.len() < CALLERS {
        let frame = peer_inbox.recv().await.expect("request frame");
        requests.push(Packet::decode(frame).unwrap());
    }
    requests.shuffle(&mut rand::thread_rng());

    let peer_transport = network.transport();
    for request in requests {
        let note = match &request.message {
            Message::NoOp(noop) => format!("reply to {}", noop.note),
            other => panic!("unexpected request {other:?}"),
        };
        let reply = Packet::new(request.envelope.return_trip(), NoOp::new(note));
        corelib::Transport::send(peer_transport.as_ref(), NodeId(1), reply.encode())
            .await
            .unwrap();
    }

    for caller in callers {
        let (correlation_id, reply) = caller.await.unwrap();
        assert_eq!(reply.correlation_id(), correlation_id);
        let index = correlation_id.trim_start_matches("call-");
        assert_eq!(
            reply.message,
            Message::from(NoOp::new(format!("reply to {index}")))
        );
    }
    assert!(messenger.registry().is_empty());

    drop(messenger);
    network.unregister(NodeId(1));
    let stats = receive_loop.await.unwrap();
    assert_eq!(stats.delivered, CALLERS as u64);
    assert_eq!(stats.dropped, 0);
}

// ============================================================================
// End to End
// ============================================================================

#[tokio::test]
async fn test_two_nodes_request_reply() {
    init_tracing();
    let network = LoopbackNetwork::default();
    let config = MessagingConfig::default();
    let client_id = NodeId::random();
    let server_id = NodeId::random();

    let client = start_node(
        client_id,
        network.transport(),
        network.register(client_id),
        &StaticGate::allow(),
        &config,
    )
    .unwrap();
    let server = start_node(
        server_id,
        network.transport(),
        network.register(server_id),
        &StaticGate::allow(),
        &config,
    )
    .unwrap();

    let catalog = vec![PublishedItem {
        proc_ref: "67e55044-10b1-426f-9247-bb680e5fe0c8[1]".into(),
        name: "Rivers".into(),
        published: true,
        ..Default::default()
    }];
    let served = catalog.clone();
    let server_loop = tokio::spawn(serve_requests(
        server.messenger.clone(),
        server.requests,
        move |request| match &request.message {
            Message::NoOp(ping) => Some(NoOp::new(format!("pong: {}", ping.note)).into()),
            Message::RequestConfig(_) => Some(Progress::new("config", "ready").into()),
            Message::DataSources(query) => Some(
                DataSources {
                    published_items: served.clone(),
                    options: query.options.clone(),
                }
                .into(),
            ),
            _ => None,
        },
    ));

    let pong = client.messenger.request(server_id, NoOp::new("hi")).await.unwrap();
    assert_eq!(pong.envelope.source, server_id);
    assert_eq!(pong.envelope.destination, client_id);
    assert_eq!(pong.message, Message::from(NoOp::new("pong: hi")));

    let config_reply = client.messenger.request(server_id, RequestConfig).await.unwrap();
    assert_eq!(config_reply.kind(), MessageKind::Progress);

    let snapshot = client
        .messenger
        .request(
            server_id,
            DataSources {
                published_items: Vec::new(),
                options: RequestOptions::full(),
            },
        )
        .await
        .unwrap();
    match snapshot.message {
        Message::DataSources(ds) => {
            assert_eq!(ds.published_items, catalog);
            assert_eq!(ds.options, RequestOptions::full());
        }
        other => panic!("unexpected reply {other:?}"),
    }

    // No reply for Progress: the client times out
    let err = client
        .messenger
        .request_with_timeout(server_id, Progress::new("x", "y"), Duration::from_millis(50))
        .await
        .unwrap_err();
    assert!(matches!(err, MessagingError::Timeout { .. }));
    assert!(client.messenger.registry().is_empty());

    // Shut the server's inbound side down; its loops wind up
    network.unregister(server_id);
    let stats = server.receive_loop.await.unwrap();
    assert_eq!(stats.forwarded, 4);
    assert_eq!(server_loop.await.unwrap(), 3);
}

#[tokio::test]
async fn test_node_refused_without_credential() {
    let network = LoopbackNetwork::default();
    let (_tx, inbound) = mpsc::channel(1);
    let err = start_node(
        NodeId(1),
        network.transport(),
        inbound,
        &StaticGate::deny(),
        &MessagingConfig::default(),
    )
    .unwrap_err();
    assert!(matches!(err, MessagingError::NotAuthorized));
}
