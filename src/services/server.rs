//! Server lifecycle seam backing `Start`/`Stop`/`Listen`/`Connect`/`Close`
//! for `http-server`, `socket-server`, `file-monitor` targets (spec.md §4.D
//! Server/lifecycle family).

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::error::{ActionError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerKind {
    Http,
    Socket,
    FileMonitor,
}

impl ServerKind {
    pub fn default_descriptor(&self) -> &'static str {
        match self {
            ServerKind::Http => "8080",
            ServerKind::Socket => "9000",
            ServerKind::FileMonitor => ".",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerHandle {
    pub kind: ServerKind,
    pub descriptor: String,
    pub running: bool,
}

#[async_trait::async_trait]
pub trait ServerService: Send + Sync {
    async fn start(&self, kind: ServerKind, descriptor: &str) -> Result<ServerHandle>;
    async fn stop(&self, kind: ServerKind, descriptor: &str) -> Result<()>;
}

/// Binds a bare `TcpListener` for `http-server`/`socket-server` descriptors
/// and checks directory existence for `file-monitor` ones. No request
/// routing lives here — an embedding application registers its own
/// `ServerService` (an axum `Router`, a custom socket loop) when it needs one;
/// this is the "native shim" the statement falls back to (spec.md §4.D).
pub struct NativeServerService {
    listeners: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl NativeServerService {
    pub fn new() -> Self {
        Self { listeners: Mutex::new(HashMap::new()) }
    }

    fn key(kind: ServerKind, descriptor: &str) -> String {
        format!("{kind:?}:{descriptor}")
    }
}

impl Default for NativeServerService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl ServerService for NativeServerService {
    async fn start(&self, kind: ServerKind, descriptor: &str) -> Result<ServerHandle> {
        match kind {
            ServerKind::Http | ServerKind::Socket => {
                let addr = format!("127.0.0.1:{descriptor}");
                let listener = TcpListener::bind(&addr).await?;
                let handle = tokio::spawn(async move {
                    loop {
                        if listener.accept().await.is_err() {
                            break;
                        }
                    }
                });
                self.listeners.lock().unwrap().insert(Self::key(kind, descriptor), handle);
                Ok(ServerHandle { kind, descriptor: descriptor.to_string(), running: true })
            }
            ServerKind::FileMonitor => {
                if !tokio::fs::metadata(descriptor).await.map(|m| m.is_dir()).unwrap_or(false) {
                    return Err(ActionError::runtime(format!("file-monitor path does not exist: {descriptor}")));
                }
                Ok(ServerHandle { kind, descriptor: descriptor.to_string(), running: true })
            }
        }
    }

    async fn stop(&self, kind: ServerKind, descriptor: &str) -> Result<()> {
        if let Some(handle) = self.listeners.lock().unwrap().remove(&Self::key(kind, descriptor)) {
            handle.abort();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn start_then_stop_http_listener() {
        let service = NativeServerService::new();
        let handle = service.start(ServerKind::Http, "0").await.unwrap();
        assert!(handle.running);
        service.stop(ServerKind::Http, "0").await.unwrap();
    }

    #[tokio::test]
    async fn file_monitor_requires_existing_directory() {
        let service = NativeServerService::new();
        let err = service.start(ServerKind::FileMonitor, "/no/such/path").await.unwrap_err();
        assert!(matches!(err, ActionError::RuntimeError(_)));
    }
}
