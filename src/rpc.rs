use crate::error::{Error, JsonRpcError, Result};
use serde_json::Value;

/// A method name plus positional parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    pub method: String,
    pub params: Value,
}

impl RpcRequest {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }
}

/// Minimal JSON-RPC 2.0 client over HTTP POST.
///
/// Holds no session state besides the target URL, so one instance can be shared by
/// any number of concurrent submissions. No retries happen here.
#[derive(Debug, Clone)]
pub struct RpcProvider {
    url: String,
    http: reqwest::Client,
}

impl RpcProvider {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: reqwest::Client::new(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Send one request (id 1) and return its `result` member.
    pub async fn send(&self, method: &str, params: Value) -> Result<Value> {
        let req = serde_json::json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        tracing::debug!(url = %self.url, method, "json-rpc request");

        let (status, body) = self.post(&req).await?;

        // A JSON-RPC error object wins over the HTTP status.
        let parsed: Option<Value> = serde_json::from_str(&body).ok();
        if let Some(err) = parsed.as_ref().and_then(|v| v.get("error")) {
            if !err.is_null() {
                return Err(JsonRpcError::from_value(method, err).into());
            }
        }

        if !status.is_success() {
            return Err(Error::Http { status, body });
        }

        let parsed = parsed.ok_or_else(|| Error::invalid_response(method, "body is not JSON"))?;
        parsed
            .get("result")
            .cloned()
            .ok_or_else(|| Error::invalid_response(method, "missing result field"))
    }

    /// Send several requests in one HTTP call. Ids are assigned 1..=n and the
    /// responses are returned in request order.
    pub async fn send_batch(
        &self,
        requests: &[RpcRequest],
    ) -> Result<Vec<std::result::Result<Value, JsonRpcError>>> {
        let body: Vec<Value> = requests
            .iter()
            .enumerate()
            .map(|(i, r)| {
                serde_json::json!({
                    "jsonrpc": "2.0",
                    "id": i + 1,
                    "method": r.method,
                    "params": r.params,
                })
            })
            .collect();
        tracing::debug!(url = %self.url, count = requests.len(), "json-rpc batch request");

        let (status, text) = self.post(&Value::Array(body)).await?;
        if !status.is_success() {
            return Err(Error::Http { status, body: text });
        }

        let responses: Vec<Value> = serde_json::from_str(&text)
            .map_err(|e| Error::invalid_response("batch", format!("expected JSON array: {e}")))?;

        requests
            .iter()
            .enumerate()
            .map(|(i, req)| {
                let id = (i + 1) as u64;
                let resp = responses
                    .iter()
                    .find(|r| r.get("id").and_then(Value::as_u64) == Some(id))
                    .ok_or_else(|| {
                        Error::invalid_response(&req.method, format!("no response for id {id}"))
                    })?;
                match resp.get("error").filter(|e| !e.is_null()) {
                    Some(err) => Ok(Err(JsonRpcError::from_value(&req.method, err))),
                    None => Ok(Ok(resp.get("result").cloned().unwrap_or(Value::Null))),
                }
            })
            .collect()
    }

    async fn post(&self, body: &Value) -> Result<(reqwest::StatusCode, String)> {
        let transport = |source| Error::Transport {
            url: self.url.clone(),
            source,
        };

        let resp = self
            .http
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(transport)?;

        let status = resp.status();
        let text = resp.text().await.map_err(transport)?;
        Ok((status, text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn returns_result_field() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "id": 1, "method": "eth_chainId" })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": "0x539" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let rpc = RpcProvider::new(server.uri());
        let res = rpc.send("eth_chainId", json!([])).await.unwrap();
        assert_eq!(res, json!("0x539"));
    }

    #[tokio::test]
    async fn null_result_is_not_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "jsonrpc": "2.0", "id": 1, "result": null })),
            )
            .mount(&server)
            .await;

        let rpc = RpcProvider::new(server.uri());
        let res = rpc.send("eth_getUserOperationReceipt", json!(["0x01"])).await.unwrap();
        assert!(res.is_null());
    }

    #[tokio::test]
    async fn unreachable_url_is_transport_error() {
        let rpc = RpcProvider::new("http://127.0.0.1:1");
        let err = rpc.send("eth_chainId", json!([])).await.unwrap_err();
        assert!(err.is_transport(), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn invalid_url_is_transport_error() {
        let rpc = RpcProvider::new("invalid_url");
        let err = rpc.send("eth_chainId", json!([])).await.unwrap_err();
        assert!(err.is_transport(), "unexpected error: {err:?}");
    }

    #[tokio::test]
    async fn http_500_with_json_rpc_error_is_json_rpc_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32601, "message": "method not found" }
            })))
            .mount(&server)
            .await;

        let rpc = RpcProvider::new(server.uri());
        let err = rpc.send("invalid_method", json!([])).await.unwrap_err();
        let rpc_err = err.as_json_rpc().expect("expected JSON-RPC error");
        assert_eq!(rpc_err.code, Some(-32601));
        assert_eq!(rpc_err.method, "invalid_method");
    }

    #[tokio::test]
    async fn http_500_with_plain_text_is_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .mount(&server)
            .await;

        let rpc = RpcProvider::new(server.uri());
        let err = rpc.send("eth_chainId", json!([])).await.unwrap_err();
        match err {
            Error::Http { status, body } => {
                assert_eq!(status.as_u16(), 500);
                assert_eq!(body, "internal error");
            }
            other => panic!("expected HTTP error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn json_rpc_error_on_200() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32500, "message": "AA21 didn't pay prefund" }
            })))
            .mount(&server)
            .await;

        let rpc = RpcProvider::new(server.uri());
        let err = rpc.send("eth_sendUserOperation", json!([])).await.unwrap_err();
        assert!(matches!(err, Error::JsonRpc(_)));
        assert!(err.to_string().contains("AA21"));
    }

    #[tokio::test]
    async fn batch_assigns_sequential_ids_and_keeps_order() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                { "jsonrpc": "2.0", "id": 2, "error": { "code": -32000, "message": "nope" } },
                { "jsonrpc": "2.0", "id": 1, "result": "0x1" },
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let rpc = RpcProvider::new(server.uri());
        let out = rpc
            .send_batch(&[
                RpcRequest::new("eth_chainId", json!([])),
                RpcRequest::new("eth_gasPrice", json!([])),
            ])
            .await
            .unwrap();

        let received = server.received_requests().await.unwrap();
        let sent: Value = serde_json::from_slice(&received[0].body).unwrap();
        assert_eq!(sent[0]["id"], json!(1));
        assert_eq!(sent[0]["method"], json!("eth_chainId"));
        assert_eq!(sent[1]["id"], json!(2));

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ref().unwrap(), &json!("0x1"));
        let err = out[1].as_ref().unwrap_err();
        assert_eq!(err.method, "eth_gasPrice");
        assert_eq!(err.code, Some(-32000));
    }
}
