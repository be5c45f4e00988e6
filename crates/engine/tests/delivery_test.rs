//! Delivery dispatcher behavior against a real local socket: retry budget,
//! backoff, signing headers and fan-out independence.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use engine::{Dispatcher, RealtimeBus};
use schema::{
    Backoff, DataMap, Destinations, OutputRecord, ProgramId, RetryPolicy, Value,
    WebhookDestination, WebsocketDestination,
};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn sample_output() -> OutputRecord {
    let mut data = DataMap::new();
    data.insert("direction".into(), Value::Str("buy".into()));
    OutputRecord {
        id: "sig:addr:0".into(),
        pipeline_id: "pl_1".into(),
        program: ProgramId::Pumpfun,
        signature: "sig".into(),
        timestamp: 1_700_000_000_000,
        data,
    }
}

fn webhook_destination(url: String, attempts: u32, backoff: Backoff) -> Destinations {
    Destinations {
        webhook: Some(WebhookDestination {
            enabled: true,
            url,
            headers: Default::default(),
            secret: Some("test-secret".into()),
            signature_header: None,
            retry: RetryPolicy { attempts, backoff },
        }),
        ..Default::default()
    }
}

/// Minimal HTTP responder: answers each accepted connection with the next
/// status from the script, capturing request heads for assertions.
async fn serve_script(
    listener: TcpListener,
    statuses: Vec<u16>,
    hits: Arc<AtomicUsize>,
    heads: Arc<tokio::sync::Mutex<Vec<String>>>,
) {
    for status in statuses {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };
        hits.fetch_add(1, Ordering::SeqCst);

        // Read until the full head plus content-length body arrived.
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let Ok(n) = socket.read(&mut chunk).await else {
                break;
            };
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(head_end) = find_head_end(&buf) {
                let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
                let content_length = head
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())?
                    })
                    .unwrap_or(0);
                if buf.len() >= head_end + content_length {
                    heads.lock().await.push(head);
                    break;
                }
            }
        }

        let response =
            format!("HTTP/1.1 {status} Scripted\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
        let _ = socket.write_all(response.as_bytes()).await;
        let _ = socket.shutdown().await;
    }
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

#[tokio::test]
async fn test_webhook_retries_until_success() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/hook", listener.local_addr().unwrap());
    let hits = Arc::new(AtomicUsize::new(0));
    let heads = Arc::new(tokio::sync::Mutex::new(Vec::new()));
    let server = tokio::spawn(serve_script(
        listener,
        vec![500, 500, 200],
        hits.clone(),
        heads.clone(),
    ));

    let dispatcher = Dispatcher::new(None);
    let started = Instant::now();
    let results = dispatcher
        .deliver(&sample_output(), &webhook_destination(url, 3, Backoff::Linear))
        .await;
    let elapsed = started.elapsed();

    assert_eq!(results.len(), 1);
    assert!(results[0].success, "final attempt succeeds: {:?}", results[0]);
    assert_eq!(hits.load(Ordering::SeqCst), 3);
    // Linear backoff sleeps 1s then 2s between the three attempts.
    assert!(elapsed >= Duration::from_millis(2900), "elapsed {elapsed:?}");

    let heads = heads.lock().await;
    let head = &heads[0];
    assert!(head.to_lowercase().contains("x-tada-pipeline-id: pl_1"));
    assert!(head.to_lowercase().contains("x-tada-event-id: sig:addr:0"));
    // Signing enabled: sha256= prefix in the default signature header.
    assert!(head.to_lowercase().contains("x-tada-signature: sha256="));

    server.abort();
}

#[tokio::test]
async fn test_webhook_4xx_aborts_immediately() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/hook", listener.local_addr().unwrap());
    let hits = Arc::new(AtomicUsize::new(0));
    let heads = Arc::new(tokio::sync::Mutex::new(Vec::new()));
    let server = tokio::spawn(serve_script(listener, vec![400, 200], hits.clone(), heads));

    let dispatcher = Dispatcher::new(None);
    let started = Instant::now();
    let results = dispatcher
        .deliver(&sample_output(), &webhook_destination(url, 3, Backoff::Exponential))
        .await;

    assert!(!results[0].success);
    assert!(results[0].error.as_deref().unwrap_or("").contains("non-retryable"));
    // One request, no backoff sleeps.
    assert_eq!(hits.load(Ordering::SeqCst), 1);
    assert!(started.elapsed() < Duration::from_millis(900));

    server.abort();
}

#[tokio::test]
async fn test_fanout_independence() {
    // A webhook aimed at a dead port plus a live realtime bus: the webhook
    // fails, the websocket result is unaffected.
    let dead = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let dead_addr = dead.local_addr().unwrap();
    drop(dead);

    let bus = Arc::new(RealtimeBus::new());
    let mut subscriber = bus.subscribe("pl_1");

    let mut destinations =
        webhook_destination(format!("http://{dead_addr}/hook"), 1, Backoff::Linear);
    destinations.websocket = Some(WebsocketDestination { enabled: true });

    let dispatcher = Dispatcher::new(Some(bus));
    let results = dispatcher.deliver(&sample_output(), &destinations).await;

    assert_eq!(results.len(), 2);
    let webhook = results.iter().find(|r| r.destination == "webhook").unwrap();
    let websocket = results.iter().find(|r| r.destination == "websocket").unwrap();
    assert!(!webhook.success);
    assert!(websocket.success);

    let message = subscriber.try_recv().unwrap();
    assert_eq!(message["pipelineId"], "pl_1");
    assert_eq!(message["type"], "event");
}

#[tokio::test]
async fn test_websocket_without_bus_reports_failure() {
    let dispatcher = Dispatcher::new(None);
    let destinations = Destinations {
        websocket: Some(WebsocketDestination { enabled: true }),
        ..Default::default()
    };
    let results = dispatcher.deliver(&sample_output(), &destinations).await;
    assert_eq!(results.len(), 1);
    assert!(!results[0].success);
}

#[tokio::test]
async fn test_disabled_destinations_are_skipped() {
    let dispatcher = Dispatcher::new(None);
    let destinations = Destinations {
        webhook: Some(WebhookDestination {
            enabled: false,
            url: "http://127.0.0.1:1/hook".into(),
            headers: Default::default(),
            secret: None,
            signature_header: None,
            retry: RetryPolicy::default(),
        }),
        ..Default::default()
    };
    let results = dispatcher.deliver(&sample_output(), &destinations).await;
    assert!(results.is_empty());
}
