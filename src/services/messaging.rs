//! Messaging/socket service seam backing `Send`, `Connect`, `Broadcast`,
//! `Close`, `Notify` (spec.md §4.D Response/Server families).

use crate::error::Result;
use crate::value::TypedValue;

#[derive(Debug, Clone)]
pub struct ConnectResult {
    pub connection_id: String,
    pub host: String,
    pub port: u16,
    pub success: bool,
}

#[async_trait::async_trait]
pub trait MessagingService: Send + Sync {
    async fn send(&self, destination: &str, data: &TypedValue) -> Result<()>;
    async fn notify(&self, message: &TypedValue) -> Result<()>;
    async fn connect(&self, host: &str, port: u16) -> Result<ConnectResult>;
    async fn broadcast(&self, data: &TypedValue) -> Result<usize>;
    async fn close(&self, connection_id: &str) -> Result<()>;
}
