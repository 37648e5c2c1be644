//! Demo gate with a static token table.
//!
//! Two callers are hard-wired: `ian` (an admin) and `sally` (in sales).
//! A Cerbos PDP must be listening on `CERBOS_HOST` (default
//! `localhost:3592`) with a policy for the `mcp_server` resource kind.
//!
//! Run with: cargo run --example static_tokens

use async_trait::async_trait;
use serde_json::{json, Value};

use cerbos_gate_core::{
    AccessToken, BoxError, CallToolRequest, CerbosGate, GateError, Principal, RequestContext,
    ToolEntry, ToolHandler,
};

/// Stand-in for a real token verifier: bearer strings to decoded claims.
fn decode_token(bearer: &str) -> Option<AccessToken> {
    match bearer {
        "token-ian" => Some(
            AccessToken::new()
                .with_claim("sub", "ian")
                .with_claim("roles", json!(["admin"]))
                .with_claim("department", "engineering")
                .with_claim("region", "amer"),
        ),
        "token-sally" => Some(
            AccessToken::new()
                .with_claim("sub", "sally")
                .with_claim("roles", json!(["sales"]))
                .with_claim("department", "sales")
                .with_claim("region", "emea"),
        ),
        _ => None,
    }
}

async fn claims_principal(token: AccessToken) -> Result<Option<Principal>, BoxError> {
    let Some(sub) = token.subject() else {
        return Ok(None);
    };

    let mut principal = Principal::new(sub).with_roles(token.roles());
    for claim in ["department", "region"] {
        if let Some(value) = token.string_claim(claim) {
            principal = principal.with_attr(claim, value);
        }
    }
    Ok(Some(principal))
}

/// Downstream handler with two toy tools.
struct Greeter;

#[async_trait]
impl ToolHandler for Greeter {
    async fn call_tool(
        &self,
        _ctx: &RequestContext,
        request: &CallToolRequest,
    ) -> Result<Value, GateError> {
        let name = request
            .arguments
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or("world");

        match request.name.as_str() {
            "greet" => Ok(json!(format!("Hello, {name}!"))),
            "goodbye" => Ok(json!(format!("Goodbye, {name}."))),
            other => Err(GateError::Handler(format!("unknown tool: {other}"))),
        }
    }

    async fn list_tools(&self, _ctx: &RequestContext) -> Result<Vec<ToolEntry>, GateError> {
        Ok(vec![ToolEntry::new("greet"), ToolEntry::new("goodbye")])
    }
}

fn context_for(bearer: &str) -> RequestContext {
    let mut ctx = RequestContext::new("demo");
    if let Some(token) = decode_token(bearer) {
        ctx = ctx.with_token(token);
    }
    ctx
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cerbos_gate_core=debug".into()),
        )
        .init();

    let host = std::env::var("CERBOS_HOST").unwrap_or_else(|_| "localhost:3592".to_string());

    let gate = CerbosGate::builder()
        .host(host)
        .principal_builder(claims_principal)
        .build()?;

    gate.warm_up().await?;
    println!("Connected to Cerbos.\n");

    let handler = Greeter;

    for bearer in ["token-ian", "token-sally", "token-unknown"] {
        let ctx = context_for(bearer);
        println!("--- caller: {bearer} ---");

        match gate.on_list_tools(&ctx, &handler).await {
            Ok(tools) => {
                let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
                println!("visible tools: {names:?}");
            }
            Err(err) => println!("listing rejected: {err}"),
        }

        let request = CallToolRequest::new("greet").with_argument("name", "there");
        match gate.on_call_tool(&ctx, &request, &handler).await {
            Ok(result) => println!("greet -> {result}"),
            Err(err) => println!("greet rejected: {err}"),
        }
        println!();
    }

    gate.close().await?;
    Ok(())
}
