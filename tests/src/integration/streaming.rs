//! # Streaming and Catch-up
//!
//! Replay-then-live at the bus, and reconnecting SSE clients over a real
//! listener:
//!
//! 1. Subscribing with `after = S` while publishes continue yields exactly
//!    `(S, last]`, in order, with no duplicates.
//! 2. A subscriber that falls behind is disconnected without disturbing
//!    others, and resumes from its last sequence.
//! 3. An SSE client that reconnects with `Last-Event-ID` receives exactly
//!    the events it missed.
//! 4. Relayed messages reach context and subject streams, including ones
//!    opened after the post.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use mc_03_api_gateway::GatewayConfig;
    use serde_json::json;
    use shared_bus::{BusConfig, EventPublisher, EventType, NotificationBus, Topic};
    use tokio::net::TcpListener;
    use tokio::time::timeout;

    use crate::integration::fixtures::{Harness, ADDR_A, ADDR_B};

    fn publish_n(bus: &NotificationBus, topic: &Topic, n: u64) {
        for i in 0..n {
            bus.publish(topic.clone(), EventType::Utxo, json!({ "n": i }));
        }
    }

    // =========================================================================
    // BUS REPLAY
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_replay_then_live_has_no_gap_under_concurrent_publish() {
        let bus = Arc::new(NotificationBus::new());
        let topic = Topic::address(ADDR_A);
        publish_n(&bus, &topic, 200);

        let publisher = {
            let bus = bus.clone();
            let topic = topic.clone();
            tokio::spawn(async move {
                for _ in 0..300 {
                    publish_n(&bus, &topic, 1);
                    tokio::task::yield_now().await;
                }
            })
        };

        tokio::task::yield_now().await;
        let mut subscription = bus.subscribe(&[topic], Some(100));
        publisher.await.unwrap();

        let mut received = Vec::new();
        timeout(Duration::from_secs(5), async {
            while received.len() < 400 {
                let event = subscription.recv().await.expect("subscription ended");
                received.push(event.sequence);
            }
        })
        .await
        .expect("timeout waiting for events");

        let expected: Vec<u64> = (101..=500).collect();
        assert_eq!(received, expected);
        assert!(subscription.try_recv().unwrap().is_none());
        assert!(!subscription.replay_truncated());
    }

    #[tokio::test]
    async fn test_multi_topic_subscription_merges_in_sequence_order() {
        let bus = NotificationBus::new();
        let a = Topic::address(ADDR_A);
        let kind = Topic::kind("Coin");
        for _ in 0..5 {
            publish_n(&bus, &a, 1);
            publish_n(&bus, &kind, 1);
            publish_n(&bus, &Topic::address(ADDR_B), 1);
        }

        let mut subscription = bus.subscribe(&[a.clone(), kind.clone()], Some(3));
        publish_n(&bus, &kind, 1);

        let mut received = Vec::new();
        while let Some(event) = subscription.try_recv().unwrap() {
            assert_ne!(event.topic, Topic::address(ADDR_B));
            received.push(event.sequence);
        }
        assert_eq!(received, vec![4, 5, 7, 8, 10, 11, 13, 14, 16]);
    }

    #[tokio::test]
    async fn test_lagging_subscriber_disconnected_and_resumes() {
        let bus = NotificationBus::with_config(BusConfig {
            channel_capacity: 4,
            ..BusConfig::default()
        });
        let topic = Topic::address(ADDR_A);
        let mut fast = bus.subscribe(&[topic.clone()], None);
        let mut slow = bus.subscribe(&[topic.clone()], None);

        for expected in 1..=10u64 {
            publish_n(&bus, &topic, 1);
            let event = fast.try_recv().unwrap().expect("fast subscriber keeps up");
            assert_eq!(event.sequence, expected);
        }
        assert_eq!(bus.subscriber_count(), 1);

        // The slow sink keeps what it buffered, then ends.
        let mut last_seen = 0;
        while let Ok(Some(event)) = slow.try_recv() {
            last_seen = event.sequence;
        }
        assert_eq!(last_seen, 4);
        assert!(slow.try_recv().is_err());

        let mut resumed = bus.subscribe(&[topic], Some(last_seen));
        let mut replayed = Vec::new();
        while let Some(event) = resumed.try_recv().unwrap() {
            replayed.push(event.sequence);
        }
        assert_eq!(replayed, (5..=10).collect::<Vec<u64>>());
    }

    // =========================================================================
    // SSE RECONNECT
    // =========================================================================

    /// Read SSE frames until `count` ids have arrived.
    async fn read_ids(response: &mut reqwest::Response, count: usize) -> Vec<u64> {
        let mut buffer = String::new();
        let mut ids = Vec::new();
        timeout(Duration::from_secs(5), async {
            while ids.len() < count {
                let chunk = response.chunk().await.unwrap().expect("stream ended");
                buffer.push_str(&String::from_utf8_lossy(&chunk));
                while let Some(end) = buffer.find("\n\n") {
                    let frame: String = buffer.drain(..end + 2).collect();
                    if let Some(id) = frame.lines().find_map(|line| line.strip_prefix("id:")) {
                        ids.push(id.trim().parse().unwrap());
                    }
                }
            }
        })
        .await
        .expect("timeout waiting for events");
        ids
    }

    #[tokio::test]
    async fn test_sse_reconnect_receives_exactly_missed_events() {
        let h = Harness::served();
        let gateway = Arc::new(h.gateway(GatewayConfig::default()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        {
            let gateway = gateway.clone();
            tokio::spawn(async move { gateway.serve(listener).await });
        }
        let client = reqwest::Client::new();
        let fund = |satoshis: u64| {
            let client = client.clone();
            async move {
                let response = client
                    .get(format!("http://{addr}/fund/{ADDR_A}?satoshis={satoshis}"))
                    .send()
                    .await
                    .unwrap();
                assert!(response.status().is_success());
            }
        };

        let mut first = client
            .get(format!("http://{addr}/notify/{ADDR_A}"))
            .send()
            .await
            .unwrap();
        for satoshis in 1..=3 {
            fund(satoshis).await;
        }
        let seen = read_ids(&mut first, 3).await;
        assert_eq!(seen, vec![1, 2, 3]);
        drop(first);

        // Published while the client is away.
        fund(4).await;
        fund(5).await;
        gateway.state().pipeline.flush().await.unwrap();

        let mut second = client
            .get(format!("http://{addr}/notify/{ADDR_A}"))
            .header("Last-Event-ID", seen.last().unwrap().to_string())
            .send()
            .await
            .unwrap();
        let missed = read_ids(&mut second, 2).await;
        assert_eq!(missed, vec![4, 5]);

        // Live delivery continues on the same stream.
        fund(6).await;
        assert_eq!(read_ids(&mut second, 1).await, vec![6]);

        // The query parameter works as well as the header.
        let mut third = client
            .get(format!("http://{addr}/notify/{ADDR_A}?lastEventId=5"))
            .send()
            .await
            .unwrap();
        assert_eq!(read_ids(&mut third, 1).await, vec![6]);

        gateway.shutdown();
    }

    #[tokio::test]
    async fn test_sse_jig_stream_covers_kind_and_origin() {
        use crate::integration::fixtures::jig_script;
        use shared_types::{Location, TransactionBuilder};

        let h = Harness::served();
        let gateway = Arc::new(h.gateway(GatewayConfig::default()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        {
            let gateway = gateway.clone();
            tokio::spawn(async move { gateway.serve(listener).await });
        }

        let funding = h.fund(ADDR_A, 10_000).await;
        let first = h
            .submit(
                &TransactionBuilder::new()
                    .spend(funding.location)
                    .pay(jig_script("Coin", None, ADDR_A), 1_000)
                    .to_hex(),
            )
            .await
            .unwrap();
        let l1 = Location::new(first.txid, 0);
        h.submit(
            &TransactionBuilder::new()
                .spend(l1)
                .pay(jig_script("Coin", Some(l1), ADDR_B), 900)
                .to_hex(),
        )
        .await
        .unwrap();

        // Kind and origin both match each record; each event arrives once
        // per topic it was published on.
        let mut stream = reqwest::Client::new()
            .get(format!("http://{addr}/notify/jigs?kind=Coin&origin={l1}&lastEventId=0"))
            .send()
            .await
            .unwrap();
        assert!(stream.status().is_success());
        let ids = read_ids(&mut stream, 4).await;
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);

        gateway.shutdown();
    }

    #[tokio::test]
    async fn test_message_stream_replays_and_follows_context() {
        use mc_04_message_relay::MessageRelayApi;
        use shared_types::Message;

        let h = Harness::served();
        let gateway = Arc::new(h.gateway(GatewayConfig::default()));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        {
            let gateway = gateway.clone();
            tokio::spawn(async move { gateway.serve(listener).await });
        }
        let client = reqwest::Client::new();
        let post = |context: &str| {
            let client = client.clone();
            let body = json!({ "from": ADDR_A, "to": [ADDR_B], "context": [context], "payload": "hi" });
            async move {
                let response = client
                    .post(format!("http://{addr}/messages"))
                    .json(&body)
                    .send()
                    .await
                    .unwrap();
                assert!(response.status().is_success());
            }
        };

        // Sequence 1 (to B) and 2 (lobby context).
        post("lobby").await;

        let mut stream = client
            .get(format!("http://{addr}/notify/messages?context=lobby&subject=table&lastEventId=0"))
            .send()
            .await
            .unwrap();
        assert!(stream.status().is_success());
        assert_eq!(read_ids(&mut stream, 1).await, vec![2]);

        // Another context stays off this stream; the subject topic is on it.
        post("elsewhere").await;
        h.relay
            .post(Message {
                subject: "table".into(),
                payload: "dealt".into(),
                ..Message::default()
            })
            .await
            .unwrap();
        assert_eq!(read_ids(&mut stream, 1).await, vec![5]);

        gateway.shutdown();
    }
}
