//! Service-registry call seam backing `Call` (spec.md §4.D Source-read family).

use crate::error::Result;
use crate::value::TypedValue;

#[async_trait::async_trait]
pub trait CallableRegistry: Send + Sync {
    async fn call(&self, name: &str, args: &TypedValue) -> Result<TypedValue>;
}
