//! Terminal service seam backing the Terminal family (spec.md §4.D).

#[async_trait::async_trait]
pub trait TerminalService: Send + Sync {
    async fn prompt(&self, message: &str, hidden: bool) -> String;
    async fn select(&self, message: &str, options: &[String], multi: bool) -> Vec<String>;
    fn clear(&self, mode: &str);
}

/// Non-interactive default: prompts resolve to the empty string, selections
/// to an empty list. An embedding CLI registers a real terminal service.
pub struct NullTerminalService;

#[async_trait::async_trait]
impl TerminalService for NullTerminalService {
    async fn prompt(&self, _message: &str, _hidden: bool) -> String {
        String::new()
    }

    async fn select(&self, _message: &str, _options: &[String], _multi: bool) -> Vec<String> {
        Vec::new()
    }

    fn clear(&self, _mode: &str) {}
}
