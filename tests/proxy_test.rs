//! Integration tests for the streaming proxy pipeline.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::AsyncWriteExt;

use stream_relay::RelayConfig;

mod common;
use common::{start_origin, start_raw_origin, start_relay, OriginResponse, RequestHead};

fn test_config() -> RelayConfig {
    let mut config = RelayConfig::default();
    config.directory.enabled = false;
    config
}

fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

#[tokio::test]
async fn missing_url_returns_400_without_contacting_origin() {
    let hits = Arc::new(AtomicU32::new(0));
    let origin_hits = hits.clone();
    let _origin = start_origin(move |_head| {
        let origin_hits = origin_hits.clone();
        async move {
            origin_hits.fetch_add(1, Ordering::SeqCst);
            OriginResponse {
                status: 200,
                content_type: None,
                body: b"unexpected".to_vec(),
            }
        }
    })
    .await;

    let (addr, shutdown) = start_relay(test_config()).await;

    let res = client()
        .get(format!("http://{}/proxy", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    let res = client()
        .get(format!("http://{}/proxy?url=", addr))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    assert_eq!(hits.load(Ordering::SeqCst), 0, "No outbound request expected");
    shutdown.trigger();
}

#[tokio::test]
async fn relative_url_returns_400() {
    let (addr, shutdown) = start_relay(test_config()).await;

    let res = client()
        .get(format!("http://{}/proxy", addr))
        .query(&[("url", "segments/chunk-01.ts")])
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 400);
    shutdown.trigger();
}

#[tokio::test]
async fn successful_fetch_mirrors_status_content_type_and_body() {
    let playlist = b"#EXTM3U\n#EXT-X-VERSION:3\n#EXTINF:6.0,\nchunk-01.ts\n";
    let origin = start_origin(move |_head| async move {
        OriginResponse {
            status: 200,
            content_type: Some("application/x-mpegURL"),
            body: playlist.to_vec(),
        }
    })
    .await;

    let (addr, shutdown) = start_relay(test_config()).await;

    let res = client()
        .get(format!("http://{}/proxy", addr))
        .query(&[("url", format!("http://{}/playlist.m3u8", origin))])
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 200);
    assert_eq!(
        res.headers().get("content-type").unwrap(),
        "application/x-mpegURL"
    );
    let body = res.bytes().await.unwrap();
    assert_eq!(&body[..], &playlist[..], "Body must pass through byte-for-byte");

    shutdown.trigger();
}

#[tokio::test]
async fn origin_403_is_mirrored_with_error_body() {
    let origin = start_origin(|_head| async {
        OriginResponse {
            status: 403,
            content_type: None,
            body: b"forbidden".to_vec(),
        }
    })
    .await;

    let (addr, shutdown) = start_relay(test_config()).await;

    let res = client()
        .get(format!("http://{}/proxy", addr))
        .query(&[("url", format!("http://{}/stream.m3u8", origin))])
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 403);
    let body = res.text().await.unwrap();
    assert!(body.contains("403"), "Error body should name the status: {}", body);

    shutdown.trigger();
}

#[tokio::test]
async fn unreachable_origin_returns_500() {
    // Bind and immediately drop a listener to get a port nothing serves.
    let dead_addr = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        listener.local_addr().unwrap()
    };

    let (addr, shutdown) = start_relay(test_config()).await;

    let res = client()
        .get(format!("http://{}/proxy", addr))
        .query(&[("url", format!("http://{}/stream.m3u8", dead_addr))])
        .send()
        .await
        .unwrap();

    assert_eq!(res.status(), 500);
    assert!(!res.text().await.unwrap().is_empty());

    shutdown.trigger();
}

#[tokio::test]
async fn spoofed_headers_reach_the_origin() {
    let seen: Arc<Mutex<Option<RequestHead>>> = Arc::new(Mutex::new(None));
    let seen_origin = seen.clone();
    let origin = start_origin(move |head| {
        let seen_origin = seen_origin.clone();
        async move {
            *seen_origin.lock().unwrap() = Some(head);
            OriginResponse {
                status: 200,
                content_type: Some("video/mp4"),
                body: b"mp4".to_vec(),
            }
        }
    })
    .await;

    let (addr, shutdown) = start_relay(test_config()).await;

    let res = client()
        .get(format!("http://{}/proxy", addr))
        .query(&[("url", format!("http://{}/seg.mp4", origin))])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let head = seen.lock().unwrap().clone().expect("Origin saw no request");
    assert_eq!(head.headers.get("referer").unwrap(), "https://kick.com/");
    assert_eq!(head.headers.get("origin").unwrap(), "https://kick.com");
    assert!(
        head.headers.get("user-agent").unwrap().contains("Chrome"),
        "User-Agent should masquerade as a browser"
    );

    shutdown.trigger();
}

#[tokio::test]
async fn origin_drop_mid_body_terminates_the_client_stream() {
    // The origin promises 4096 bytes, delivers 512, then drops the socket.
    let origin = start_raw_origin(|mut socket| async move {
        let head = "HTTP/1.1 200 OK\r\nContent-Length: 4096\r\n\r\n";
        let _ = socket.write_all(head.as_bytes()).await;
        let _ = socket.write_all(&[0xAB; 512]).await;
        let _ = socket.flush().await;
    })
    .await;

    let (addr, shutdown) = start_relay(test_config()).await;

    let res = client()
        .get(format!("http://{}/proxy", addr))
        .query(&[("url", format!("http://{}/live.ts", origin))])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    // The client must see a terminated stream, never a hang and never a
    // silently completed body.
    let body = tokio::time::timeout(Duration::from_secs(5), res.bytes())
        .await
        .expect("Client stream should terminate after the origin drop");
    match body {
        Ok(bytes) => assert!(
            bytes.len() < 4096,
            "Truncated origin stream must not complete the client body"
        ),
        Err(_) => {}
    }

    shutdown.trigger();
}

#[tokio::test]
async fn client_drop_mid_relay_releases_the_origin_connection() {
    let (closed_tx, closed_rx) = tokio::sync::oneshot::channel();

    // An endless origin stream; the task ends when its writes start failing.
    let origin = start_raw_origin(move |mut socket| async move {
        let head = "HTTP/1.1 200 OK\r\nContent-Type: video/mp2t\r\n\r\n";
        if socket.write_all(head.as_bytes()).await.is_ok() {
            let chunk = vec![0u8; 16 * 1024];
            loop {
                if socket.write_all(&chunk).await.is_err() {
                    break;
                }
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
        let _ = closed_tx.send(());
    })
    .await;

    let (addr, shutdown) = start_relay(test_config()).await;

    let mut res = client()
        .get(format!("http://{}/proxy", addr))
        .query(&[("url", format!("http://{}/live.ts", origin))])
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    // Read one chunk to prove the relay is flowing, then walk away.
    let first = res.chunk().await.unwrap();
    assert!(first.is_some(), "Expected at least one relayed chunk");
    drop(res);

    tokio::time::timeout(Duration::from_secs(10), closed_rx)
        .await
        .expect("Origin never observed its connection close")
        .unwrap();

    shutdown.trigger();
}

#[tokio::test]
async fn connection_limit_gates_accepts() {
    let mut config = test_config();
    config.listener.max_connections = 1;
    let (addr, shutdown) = start_relay(config).await;

    // Occupies the only slot without ever issuing a request.
    let held = tokio::net::TcpStream::connect(addr).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let client = reqwest::Client::builder()
        .no_proxy()
        .timeout(Duration::from_millis(500))
        .build()
        .unwrap();
    let starved = client
        .get(format!("http://{}/api/online-count", addr))
        .send()
        .await;
    assert!(starved.is_err(), "Second connection should wait for a slot");

    drop(held);

    // The released slot lets new connections through.
    let deadline = std::time::Instant::now() + Duration::from_secs(5);
    loop {
        if client
            .get(format!("http://{}/api/online-count", addr))
            .send()
            .await
            .is_ok()
        {
            break;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "Connection slot was never released"
        );
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    shutdown.trigger();
}

#[tokio::test]
async fn concurrent_relays_are_independent() {
    let origin = start_origin(|head| async move {
        // Echo the requested path so each relay's body is distinguishable.
        OriginResponse {
            status: 200,
            content_type: Some("text/plain"),
            body: head.path.into_bytes(),
        }
    })
    .await;

    let (addr, shutdown) = start_relay(test_config()).await;
    let client = client();

    let mut tasks = Vec::new();
    for i in 0..10 {
        let client = client.clone();
        let url = format!("http://{}/proxy?url=http://{}/seg-{}.ts", addr, origin, i);
        tasks.push(tokio::spawn(async move {
            let res = client.get(&url).send().await.unwrap();
            assert_eq!(res.status(), 200);
            (i, res.text().await.unwrap())
        }));
    }

    for task in tasks {
        let (i, body) = task.await.unwrap();
        assert_eq!(body, format!("/seg-{}.ts", i));
    }

    shutdown.trigger();
}
