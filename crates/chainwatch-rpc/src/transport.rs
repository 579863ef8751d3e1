//! The `RpcTransport` trait.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::TransportError;
use crate::request::{JsonRpcRequest, JsonRpcResponse};

/// A JSON-RPC transport.
///
/// Implementations must be `Send + Sync` so a single transport can be shared
/// between the poller task and startup checks.
#[async_trait]
pub trait RpcTransport: Send + Sync + 'static {
    /// Send a single JSON-RPC request and return the raw response.
    async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError>;

    /// Identifier of the endpoint, for logging.
    fn url(&self) -> &str;

    /// Allocate the id for the next request.
    fn next_id(&self) -> u64 {
        1
    }

    /// Call `method` and deserialize its result.
    async fn call<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<Value>,
    ) -> Result<T, TransportError> {
        let req = JsonRpcRequest::new(self.next_id(), method, params);
        let resp = self.send(req).await?;
        let result = resp.into_result().map_err(TransportError::Rpc)?;
        serde_json::from_value(result).map_err(TransportError::Deserialization)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::JsonRpcError;
    use serde_json::json;

    /// Answers every request with a fixed result or error.
    struct Fixed(Result<Value, JsonRpcError>);

    #[async_trait]
    impl RpcTransport for Fixed {
        async fn send(&self, req: JsonRpcRequest) -> Result<JsonRpcResponse, TransportError> {
            let (result, error) = match &self.0 {
                Ok(v) => (Some(v.clone()), None),
                Err(e) => (None, Some(e.clone())),
            };
            Ok(JsonRpcResponse { jsonrpc: "2.0".into(), id: req.id, result, error })
        }

        fn url(&self) -> &str {
            "fixed://"
        }
    }

    #[tokio::test]
    async fn call_deserializes_result() {
        let t = Fixed(Ok(json!("0x2a")));
        let v: String = t.call("eth_blockNumber", vec![]).await.unwrap();
        assert_eq!(v, "0x2a");
    }

    #[tokio::test]
    async fn call_surfaces_rpc_error() {
        let t = Fixed(Err(JsonRpcError { code: -32601, message: "method not found".into(), data: None }));
        let err = t.call::<String>("eth_foo", vec![]).await.unwrap_err();
        assert!(matches!(err, TransportError::Rpc(ref e) if e.code == -32601));
    }

    #[tokio::test]
    async fn call_reports_wrong_shape() {
        let t = Fixed(Ok(json!({"not": "a string"})));
        let err = t.call::<String>("eth_blockNumber", vec![]).await.unwrap_err();
        assert!(matches!(err, TransportError::Deserialization(_)));
    }
}
