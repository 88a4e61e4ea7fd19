//! Line Transport - JSON Tool Calls over a Byte Stream
//!
//! One request per input line, `{id, tool, arguments}`; one reply per
//! output line, `{id, ok, result | error}`. Each request runs on its own
//! task, so replies may come back out of order.

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{error, info};

use super::{ToolContext, ToolError, ToolRegistry, ToolResponse};

/// One line of input.
#[derive(Debug, Deserialize)]
struct ToolRequest {
  #[serde(default)]
  id: Value,
  tool: String,
  #[serde(default)]
  arguments: Value,
}

/// One line of output, echoing the request id.
#[derive(Debug, Serialize)]
struct ToolReply {
  id: Value,
  #[serde(flatten)]
  response: ToolResponse,
}

/// Serve requests from `input` until EOF or `shutdown` resolves.
///
/// Either way no new request is read afterwards, and every call already
/// started runs to its outcome and has its reply written before this
/// returns. Replies are funnelled through one writer so lines never
/// interleave.
pub async fn serve_lines<R, W>(
  input: R,
  output: W,
  ctx: Arc<ToolContext>,
  tools: Arc<ToolRegistry>,
  shutdown: impl Future<Output = ()>,
) -> Result<()>
where
  R: AsyncBufRead + Unpin,
  W: AsyncWrite + Unpin + Send + 'static,
{
  let (reply_tx, mut reply_rx) = mpsc::channel::<ToolReply>(64);

  let writer = tokio::spawn(async move {
    let mut output = output;
    while let Some(reply) = reply_rx.recv().await {
      let mut line = match serde_json::to_vec(&reply) {
        Ok(line) => line,
        Err(e) => {
          error!(error = %e, "Failed to encode reply");
          continue;
        }
      };
      line.push(b'\n');
      if output.write_all(&line).await.is_err() || output.flush().await.is_err() {
        break;
      }
    }
  });

  let mut lines = input.lines();
  let mut inflight = JoinSet::new();
  tokio::pin!(shutdown);

  let mut outcome = Ok(());
  loop {
    let line = tokio::select! {
      () = &mut shutdown => {
        info!(inflight = inflight.len(), "Shutdown requested, finishing in-flight calls");
        break;
      }
      line = lines.next_line() => match line.context("Failed to read tool input") {
        Ok(line) => line,
        Err(e) => {
          outcome = Err(e);
          break;
        }
      },
    };
    let Some(line) = line else {
      info!(inflight = inflight.len(), "Input closed");
      break;
    };
    if line.trim().is_empty() {
      continue;
    }

    let request: ToolRequest = match serde_json::from_str(&line) {
      Ok(request) => request,
      Err(e) => {
        let reply = ToolReply {
          id: Value::Null,
          response: ToolResponse::from(Err(ToolError::new("invalid_request", e.to_string()))),
        };
        let _ = reply_tx.send(reply).await;
        continue;
      }
    };

    let ctx = Arc::clone(&ctx);
    let tools = Arc::clone(&tools);
    let reply_tx = reply_tx.clone();
    inflight.spawn(async move {
      let response = tools.call(&ctx, &request.tool, request.arguments).await;
      let _ = reply_tx
        .send(ToolReply {
          id: request.id,
          response,
        })
        .await;
    });
  }

  // Each call is bounded by its own trade deadline.
  while inflight.join_next().await.is_some() {}
  drop(reply_tx);
  let _ = writer.await;
  outcome
}
