//! Batching behavior: how calls are grouped into transport calls

mod common;

use common::{echoed_method, MockTransport};
use futures::future::join_all;
use jbatch_client::BatchClient;
use jbatch_core::RequestBody;
use serde_json::{json, Value};

#[tokio::test]
async fn test_joined_calls_share_one_transport_call() {
    let transport = MockTransport::echo();
    let client = BatchClient::new(transport.clone());

    let (a, b) = tokio::join!(
        client.call::<_, Value>("getData", ("test-id-1",)),
        client.call::<_, Value>("getData", ("test-id-2",)),
    );

    assert_eq!(transport.send_count(), 1);
    assert_eq!(a.unwrap()["params"], json!(["test-id-1"]));
    assert_eq!(b.unwrap()["params"], json!(["test-id-2"]));
}

#[tokio::test]
async fn test_call_after_settled_batch_starts_new_transport_call() {
    let transport = MockTransport::echo();
    let client = BatchClient::new(transport.clone());

    let first: Value = client.call("getData", ("test-id-1",)).await.unwrap();
    let second: Value = client.call("getData", ("test-id-2",)).await.unwrap();

    assert_eq!(transport.send_count(), 2);
    assert_eq!(first["params"], json!(["test-id-1"]));
    assert_eq!(second["params"], json!(["test-id-2"]));
}

#[tokio::test]
async fn test_single_call_is_sent_unwrapped() {
    let transport = MockTransport::echo();
    let client = BatchClient::new(transport.clone());

    let _: Value = client.call("getData", ("only",)).await.unwrap();

    let bodies = transport.bodies();
    assert_eq!(bodies.len(), 1);
    match &bodies[0] {
        RequestBody::Single(request) => {
            assert_eq!(request.method, "getData");
            assert_eq!(request.params, vec![json!("only")]);
        }
        RequestBody::Batch(_) => panic!("Expected a bare request"),
    }

    // The encoded body is an object, not a one-element array
    let encoded = jbatch_core::codec::encode_request_body(&bodies[0]).unwrap();
    assert!(encoded.starts_with('{'));
}

#[tokio::test]
async fn test_multiple_calls_are_sent_as_array_in_call_order() {
    let transport = MockTransport::echo();
    let client = BatchClient::new(transport.clone());

    let calls = ["a", "b", "c"]
        .iter()
        .map(|method| client.call::<_, Value>(*method, ()))
        .collect::<Vec<_>>();
    let results = join_all(calls).await;

    // Replies come back reversed; every call still gets its own result
    let methods: Vec<String> = results
        .iter()
        .map(|r| echoed_method(r.as_ref().unwrap()).to_string())
        .collect();
    assert_eq!(methods, vec!["a", "b", "c"]);

    let bodies = transport.bodies();
    assert_eq!(bodies.len(), 1);
    assert!(bodies[0].is_batch());
    let sent: Vec<String> = bodies[0]
        .clone()
        .into_requests()
        .into_iter()
        .map(|r| r.method)
        .collect();
    assert_eq!(sent, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_correlation_ids_are_unique_within_a_batch() {
    let transport = MockTransport::echo();
    let client = BatchClient::new(transport.clone());

    let calls = (0..5).map(|i| client.call::<_, Value>("n", (i,))).collect::<Vec<_>>();
    join_all(calls).await;

    let requests = transport.bodies()[0].clone().into_requests();
    let mut ids: Vec<String> = requests.iter().map(|r| r.id.to_string()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 5);
}

/// Yield until the transport has been asked for `sends` calls
async fn wait_for_sends(transport: &MockTransport, sends: usize) {
    while transport.send_count() < sends {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn test_call_issued_while_batch_in_flight_starts_new_batch() {
    let transport = MockTransport::gated_echo();
    let client = BatchClient::new(transport.clone());

    let first = tokio::spawn(client.call::<_, Value>("first", ()));
    wait_for_sends(&transport, 1).await;

    // The first send is blocked; the next call opens a fresh batch
    let second = client.call::<_, Value>("second", ());
    assert_eq!(client.pending_count(), 1);
    let second = tokio::spawn(second);
    wait_for_sends(&transport, 2).await;

    assert_eq!(transport.send_count(), 2);
    assert!(!first.is_finished());
    transport.release(2);

    let first = first.await.unwrap().unwrap();
    let second = second.await.unwrap().unwrap();
    assert_eq!(echoed_method(&first), "first");
    assert_eq!(echoed_method(&second), "second");

    let bodies = transport.bodies();
    assert_eq!(bodies[0].len(), 1);
    assert_eq!(bodies[1].len(), 1);
}

#[tokio::test]
async fn test_max_batch_size_splits_batches() {
    let transport = MockTransport::echo();
    let client = BatchClient::builder()
        .shared_transport(transport.clone())
        .max_batch_size(2)
        .build()
        .unwrap();

    let calls = (0..5).map(|i| client.call::<_, Value>("n", (i,))).collect::<Vec<_>>();
    let results = join_all(calls).await;

    assert!(results.iter().all(|r| r.is_ok()));
    let sizes: Vec<usize> = transport.bodies().iter().map(|b| b.len()).collect();
    assert_eq!(sizes, vec![2, 2, 1]);
}

#[tokio::test]
async fn test_clones_share_the_open_batch() {
    let transport = MockTransport::echo();
    let client = BatchClient::new(transport.clone());
    let other = client.clone();

    let (a, b) = tokio::join!(client.call::<_, Value>("a", ()), other.call::<_, Value>("b", ()));

    assert!(a.is_ok() && b.is_ok());
    assert_eq!(transport.send_count(), 1);
}

#[tokio::test]
async fn test_explicit_flush() {
    let transport = MockTransport::echo();
    let client = BatchClient::new(transport.clone());

    let call = client.call::<_, Value>("a", ());
    assert_eq!(client.pending_count(), 1);
    client.flush();
    assert_eq!(client.pending_count(), 0);

    assert!(call.await.is_ok());
    assert_eq!(transport.send_count(), 1);
}

#[tokio::test]
async fn test_flush_sends_before_unrelated_await() {
    let transport = MockTransport::echo();
    let client = BatchClient::new(transport.clone());

    let call = client.call::<_, Value>("a", ());
    client.flush();

    // The call itself has not been polled yet
    wait_for_sends(&transport, 1).await;
    assert_eq!(client.pending_count(), 0);

    assert!(call.await.is_ok());
    assert_eq!(transport.send_count(), 1);
}
