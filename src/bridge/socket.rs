//! Newline-delimited JSON over a Unix socket.
//!
//! request:  {"request_id": 7, "method": "getSongMetadata", "args": ["/a.flac"]}
//! reply:    {"request_id": 7, "result": {...}}  or  {"request_id": 7, "error": "..."}
//! one-way:  {"channel": "set-rpc-state", "payload": {...}}

use super::MessageBridge;
use anyhow::Context;
use async_trait::async_trait;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::UnixStream,
    sync::oneshot,
    task::JoinHandle,
};

type ReplySender = oneshot::Sender<Result<Value, String>>;

#[derive(Default)]
struct Pending {
    waiting: std::sync::Mutex<HashMap<u64, ReplySender>>,
    closed: AtomicBool,
}

impl Pending {
    fn insert(&self, id: u64, tx: ReplySender) {
        if let Ok(mut w) = self.waiting.lock() {
            w.insert(id, tx);
        }
    }

    fn take(&self, id: u64) -> Option<ReplySender> {
        self.waiting.lock().ok()?.remove(&id)
    }

    /// Fail everything still waiting; later calls see `closed`.
    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        if let Ok(mut w) = self.waiting.lock() {
            w.clear();
        }
    }
}

#[derive(Debug)]
pub struct SocketBridge {
    socket_path: PathBuf,
    writer: tokio::sync::Mutex<tokio::io::WriteHalf<UnixStream>>,
    request_id: AtomicU64,
    pending: Arc<Pending>,
    reader: JoinHandle<()>,
}

impl std::fmt::Debug for Pending {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pending")
            .field("closed", &self.closed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl SocketBridge {
    pub async fn connect(socket_path: &Path) -> anyhow::Result<Self> {
        let stream = connect_with_retry(socket_path).await?;
        let (reader, writer) = tokio::io::split(stream);

        let pending = Arc::new(Pending::default());
        let reader = tokio::spawn(read_replies_loop(reader, pending.clone()));

        tracing::debug!("bridge connected to {}", socket_path.display());

        Ok(Self {
            socket_path: socket_path.to_path_buf(),
            writer: tokio::sync::Mutex::new(writer),
            request_id: AtomicU64::new(1),
            pending,
            reader,
        })
    }

    async fn write_line(&self, v: &Value) -> anyhow::Result<()> {
        let mut line = serde_json::to_vec(v).context("encode bridge json")?;
        line.push(b'\n');
        let mut w = self.writer.lock().await;
        w.write_all(&line)
            .await
            .with_context(|| format!("write {}", self.socket_path.display()))?;
        w.flush().await.context("flush bridge socket")?;
        Ok(())
    }
}

#[async_trait]
impl MessageBridge for SocketBridge {
    async fn invoke(&self, method: &str, args: Value) -> anyhow::Result<Value> {
        let id = self.request_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.insert(id, tx);

        if self.pending.closed.load(Ordering::SeqCst) {
            self.pending.take(id);
            anyhow::bail!("bridge closed");
        }

        let request = json!({"request_id": id, "method": method, "args": args});
        if let Err(e) = self.write_line(&request).await {
            self.pending.take(id);
            return Err(e).with_context(|| format!("send {method}"));
        }

        match rx.await {
            Ok(Ok(v)) => Ok(v),
            Ok(Err(msg)) => anyhow::bail!("{method} failed: {msg}"),
            Err(_) => anyhow::bail!("bridge closed before {method} replied"),
        }
    }

    async fn send(&self, channel: &str, payload: Value) -> anyhow::Result<()> {
        self.write_line(&json!({"channel": channel, "payload": payload}))
            .await
            .with_context(|| format!("send on {channel}"))
    }
}

impl Drop for SocketBridge {
    fn drop(&mut self) {
        self.reader.abort();
        self.pending.close();
    }
}

async fn connect_with_retry(path: &Path) -> anyhow::Result<UnixStream> {
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(5);
    loop {
        match UnixStream::connect(path).await {
            Ok(s) => return Ok(s),
            Err(e) => {
                if tokio::time::Instant::now() > deadline {
                    return Err(e)
                        .with_context(|| format!("connect to bridge {}", path.display()));
                }
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
        }
    }
}

async fn read_replies_loop(reader: tokio::io::ReadHalf<UnixStream>, pending: Arc<Pending>) {
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        let Ok(v) = serde_json::from_str::<Value>(&line) else {
            tracing::debug!("bridge: ignoring malformed line");
            continue;
        };
        let Some(id) = v.get("request_id").and_then(Value::as_u64) else {
            // Unsolicited backend traffic; nothing here subscribes to it.
            continue;
        };
        let Some(tx) = pending.take(id) else {
            tracing::debug!("bridge: reply for unknown request {id}");
            continue;
        };
        let _ = tx.send(map_reply(v));
    }
    tracing::debug!("bridge: connection closed");
    pending.close();
}

fn map_reply(mut v: Value) -> Result<Value, String> {
    match v.get_mut("error").map(Value::take) {
        None | Some(Value::Null) => Ok(v
            .get_mut("result")
            .map(Value::take)
            .unwrap_or(Value::Null)),
        Some(Value::String(s)) => Err(s),
        Some(other) => Err(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::UnixListener;

    type BackendLines = tokio::io::Lines<BufReader<tokio::io::ReadHalf<UnixStream>>>;
    type BackendWriter = tokio::io::WriteHalf<UnixStream>;

    /// Accept one connection and hand its lines/writer to `serve`.
    fn spawn_backend<F, Fut>(listener: UnixListener, serve: F)
    where
        F: FnOnce(BackendLines, BackendWriter) -> Fut + Send + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (r, w) = tokio::io::split(stream);
            serve(BufReader::new(r).lines(), w).await;
        });
    }

    async fn write_json(w: &mut BackendWriter, v: Value) {
        let mut line = serde_json::to_vec(&v).unwrap();
        line.push(b'\n');
        w.write_all(&line).await.unwrap();
    }

    #[test]
    fn test_map_reply() {
        assert_eq!(map_reply(json!({"request_id": 1, "result": 5})), Ok(json!(5)));
        assert_eq!(map_reply(json!({"request_id": 1})), Ok(Value::Null));
        assert_eq!(
            map_reply(json!({"request_id": 1, "error": "nope"})),
            Err("nope".to_string())
        );
        assert_eq!(
            map_reply(json!({"request_id": 1, "error": null, "result": true})),
            Ok(json!(true))
        );
    }

    #[tokio::test]
    async fn test_invoke_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.sock");
        let listener = UnixListener::bind(&path).unwrap();

        spawn_backend(listener, |mut lines, mut w| async move {
            let line = lines.next_line().await.unwrap().unwrap();
            let req: Value = serde_json::from_str(&line).unwrap();
            assert_eq!(req["method"], "getSongMetadata");
            assert_eq!(req["args"], json!(["/music/a.flac"]));
            let id = req["request_id"].clone();
            // Unrelated traffic first; it must be skipped.
            write_json(&mut w, json!({"event": "tick"})).await;
            write_json(&mut w, json!({"request_id": id, "result": {"favourite": true}})).await;
            let _ = lines.next_line().await;
        });

        let bridge = SocketBridge::connect(&path).await.unwrap();
        let reply = bridge
            .invoke("getSongMetadata", json!(["/music/a.flac"]))
            .await
            .unwrap();
        assert_eq!(reply, json!({"favourite": true}));
    }

    #[tokio::test]
    async fn test_replies_routed_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.sock");
        let listener = UnixListener::bind(&path).unwrap();

        spawn_backend(listener, |mut lines, mut w| async move {
            let mut reqs = Vec::new();
            for _ in 0..2 {
                let line = lines.next_line().await.unwrap().unwrap();
                reqs.push(serde_json::from_str::<Value>(&line).unwrap());
            }
            // Answer in reverse order, echoing the argument back.
            for req in reqs.iter().rev() {
                write_json(
                    &mut w,
                    json!({"request_id": req["request_id"], "result": req["args"][0]}),
                )
                .await;
            }
            let _ = lines.next_line().await;
        });

        let bridge = SocketBridge::connect(&path).await.unwrap();
        let (a, b) = tokio::join!(
            bridge.invoke("echo", json!(["a"])),
            bridge.invoke("echo", json!(["b"])),
        );
        assert_eq!(a.unwrap(), json!("a"));
        assert_eq!(b.unwrap(), json!("b"));
    }

    #[tokio::test]
    async fn test_error_reply_and_send() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.sock");
        let listener = UnixListener::bind(&path).unwrap();
        let (seen_tx, seen_rx) = oneshot::channel();

        spawn_backend(listener, |mut lines, mut w| async move {
            let line = lines.next_line().await.unwrap().unwrap();
            let req: Value = serde_json::from_str(&line).unwrap();
            let reply = json!({"request_id": req["request_id"], "error": "no such file"});
            write_json(&mut w, reply).await;

            let line = lines.next_line().await.unwrap().unwrap();
            let _ = seen_tx.send(serde_json::from_str::<Value>(&line).unwrap());
        });

        let bridge = SocketBridge::connect(&path).await.unwrap();
        let err = bridge
            .invoke("getSongMetadata", json!(["/missing.mp3"]))
            .await
            .unwrap_err();
        assert!(format!("{err:#}").contains("no such file"));

        bridge
            .send("set-rpc-state", json!({"details": "Idle..."}))
            .await
            .unwrap();
        let seen = seen_rx.await.unwrap();
        assert_eq!(
            seen,
            json!({"channel": "set-rpc-state", "payload": {"details": "Idle..."}})
        );
    }

    #[tokio::test]
    async fn test_pending_fails_when_backend_hangs_up() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bridge.sock");
        let listener = UnixListener::bind(&path).unwrap();

        spawn_backend(listener, |mut lines, w| async move {
            let _ = lines.next_line().await;
            drop(w);
            drop(lines);
        });

        let bridge = SocketBridge::connect(&path).await.unwrap();
        let err = bridge.invoke("getSongMetadata", json!(["/a.mp3"])).await;
        assert!(err.is_err());

        // Later calls fail fast instead of waiting forever.
        let again = bridge.invoke("getSongMetadata", json!(["/a.mp3"])).await;
        assert!(again.is_err());
    }
}
