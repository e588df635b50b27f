//! Client and dispatcher wired together through the JSON encoding

use jbatch::client::MessageOptions;
use jbatch::macros::{handler, rpc_client};
use jbatch::server::BatchMode;
use jbatch::{BatchClient, Dispatcher, Endpoint, Error, LocalTransport, Result, RpcError};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

struct Session {
    user_id: String,
}

#[derive(Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Data {
    id: String,
    user_id: String,
}

#[handler]
async fn get_data(ctx: Arc<Session>, id: String) -> Result<Data> {
    Ok(Data {
        id,
        user_id: ctx.user_id.clone(),
    })
}

#[handler]
async fn fail(_ctx: Arc<Session>) -> Result<()> {
    Err(RpcError::new(123, "Test error").into())
}

#[handler]
async fn broken(_ctx: Arc<Session>) -> Result<()> {
    Err(Error::Internal("db down".into()))
}

#[rpc_client]
trait Api {
    #[rpc(name = "getData")]
    fn get_data(id: String) -> Data;
    fn fail();
    fn broken();
    fn missing();
}

fn dispatcher(mode: BatchMode) -> Dispatcher<Session> {
    Dispatcher::builder()
        .handler("getData", get_data())
        .handler("fail", fail())
        .handler("broken", broken())
        .batch_mode(mode)
        .build()
}

fn api(dispatcher: Dispatcher<Session>) -> ApiClient {
    let session = Session {
        user_id: "user-123".into(),
    };
    ApiClient::new(BatchClient::new(LocalTransport::new(
        Endpoint::new(dispatcher),
        session,
    )))
}

#[tokio::test]
async fn test_concurrent_calls_resolve_independently() {
    let api = api(dispatcher(BatchMode::Parallel));

    let (a, b) = tokio::join!(
        api.get_data("test-id-1".into()),
        api.get_data("test-id-2".into()),
    );

    assert_eq!(
        a.unwrap(),
        Data {
            id: "test-id-1".into(),
            user_id: "user-123".into()
        }
    );
    assert_eq!(b.unwrap().id, "test-id-2");
}

#[tokio::test]
async fn test_mixed_outcomes_in_one_batch() {
    for mode in [BatchMode::Parallel, BatchMode::Sequential] {
        let api = api(dispatcher(mode));

        let (ok, domain, generic, missing) = tokio::join!(
            api.get_data("x".into()),
            api.fail(),
            api.broken(),
            api.missing(),
        );

        assert_eq!(ok.unwrap().id, "x");

        let domain = domain.unwrap_err();
        assert!(matches!(domain, Error::Rpc(_)));
        assert_eq!(domain.code(), 123);
        let stack = domain.stack().unwrap();
        assert!(stack.starts_with("Server stack:\nRpcError: Test error"));
        assert!(stack.contains("Client stack:"));

        let generic = generic.unwrap_err();
        assert!(matches!(generic, Error::Remote(_)));
        assert_eq!(generic.message(), "db down");

        assert_eq!(missing.unwrap_err().code(), -32601);
    }
}

#[tokio::test]
async fn test_batch_limit_surfaces_as_batch_failure() {
    let dispatcher = Dispatcher::builder()
        .handler("getData", get_data())
        .max_batch_size(1)
        .build();
    let api = api(dispatcher);

    let (a, b) = tokio::join!(api.get_data("a".into()), api.get_data("b".into()));

    assert_eq!(a.unwrap_err().code(), -32600);
    assert_eq!(b.unwrap_err().code(), -32600);

    // A lone call is within the limit
    assert!(api.get_data("c".into()).await.is_ok());
}

#[tokio::test]
async fn test_messages_are_not_sent() {
    let api = api(dispatcher(BatchMode::Parallel));

    let message = api
        .messages()
        .get_data_with_options("test-id".into(), MessageOptions::sync())
        .unwrap();

    assert_eq!(
        serde_json::to_value(&message).unwrap(),
        json!({"method": "getData", "params": ["test-id"], "sync": true})
    );
    assert_eq!(api.inner().pending_count(), 0);
}
