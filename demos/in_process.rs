//! Client and dispatcher in one process
//!
//! Shows transparent batching, domain failures, generic failures and message
//! descriptors, all over the full JSON encoding.
//!
//! Run with: cargo run --example in_process

use jbatch::client::MessageOptions;
use jbatch::core::ObservabilityConfig;
use jbatch::macros::{handler, rpc_client};
use jbatch::{BatchClient, Dispatcher, Endpoint, Error, LocalTransport, Result, RpcError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

struct Session {
    user_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
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
async fn withdraw(_ctx: Arc<Session>, amount: u64) -> Result<u64> {
    if amount > 100 {
        return Err(RpcError::new(1001, "Insufficient funds")
            .with_data(serde_json::json!({"balance": 100}))
            .into());
    }
    Ok(100 - amount)
}

#[handler]
async fn flaky(_ctx: Arc<Session>) -> Result<()> {
    Err(Error::Internal("database unavailable".into()))
}

#[rpc_client]
trait Api {
    #[rpc(name = "getData")]
    fn get_data(id: String) -> Data;
    fn withdraw(amount: u64) -> u64;
    fn flaky();
}

#[tokio::main]
async fn main() -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    jbatch::core::init_observability(
        ObservabilityConfig::new("jbatch-demo").with_log_level("info,jbatch_client=debug"),
    )?;

    let dispatcher = Dispatcher::builder()
        .handler("getData", get_data())
        .handler("withdraw", withdraw())
        .handler("flaky", flaky())
        .build();

    let session = Session {
        user_id: "user-123".into(),
    };
    let client = BatchClient::builder()
        .transport(LocalTransport::new(Endpoint::new(dispatcher), session))
        .build()?;
    let api = ApiClient::new(client);

    // One transport call carrying three requests
    let (a, b, c) = tokio::join!(
        api.get_data("test-id-1".into()),
        api.get_data("test-id-2".into()),
        api.withdraw(30),
    );
    println!("getData -> {:?}", a?);
    println!("getData -> {:?}", b?);
    println!("withdraw -> {}", c?);

    // Domain failures keep their code
    match api.withdraw(500).await {
        Err(Error::Rpc(e)) => println!("withdraw failed with code {}: {}", e.code, e.message),
        other => println!("unexpected: {:?}", other),
    }

    // Anything else arrives as a generic remote failure
    match api.flaky().await {
        Err(Error::Remote(e)) => println!("flaky failed: {}", e),
        other => println!("unexpected: {:?}", other),
    }

    let message = api
        .messages()
        .get_data_with_options("test-id-3".into(), MessageOptions::sync())?;
    println!("message -> {}", serde_json::to_string(&message)?);

    jbatch::core::shutdown_observability();
    Ok(())
}
