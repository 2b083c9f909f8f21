//! Every action family named in spec.md §4.D, plus `register_all` which
//! wires one instance of each into a fresh `ActionRegistry`.

pub mod accept;
pub mod compare;
pub mod compute;
pub mod create;
pub mod delete;
pub mod extract;
pub mod file_ops;
pub mod filter;
pub mod map_reduce;
pub mod op_name;
pub mod parse_html;
pub mod read;
pub mod receive;
pub mod request;
pub mod response;
pub mod retrieve;
pub mod server;
pub mod sort;
pub mod split;
pub mod support;
pub mod terminal_actions;
pub mod test_actions;
pub mod transform;
pub mod update_merge;
pub mod validate;

use std::sync::Arc;

use crate::registry::ActionRegistry;

/// Registers every `ActionImpl` this crate ships. An embedding application
/// calls this once, then layers its own verbs on top if it has any
/// (later registration wins, spec.md §4.C).
pub fn register_all(registry: &ActionRegistry) {
    registry.register(Arc::new(compute::Compute));
    registry.register(Arc::new(validate::Validate));
    registry.register(Arc::new(compare::Compare));
    registry.register(Arc::new(transform::Transform));
    registry.register(Arc::new(create::Create));
    registry.register(Arc::new(update_merge::Update));
    registry.register(Arc::new(update_merge::Merge));
    registry.register(Arc::new(sort::Sort));
    registry.register(Arc::new(filter::Filter));
    registry.register(Arc::new(map_reduce::Map));
    registry.register(Arc::new(map_reduce::Reduce));
    registry.register(Arc::new(split::Split));
    registry.register(Arc::new(delete::Delete));
    registry.register(Arc::new(accept::Accept));

    registry.register(Arc::new(extract::Extract));
    registry.register(Arc::new(retrieve::Retrieve));
    registry.register(Arc::new(read::Read));
    registry.register(Arc::new(receive::Receive));
    registry.register(Arc::new(request::Request));
    registry.register(Arc::new(request::Call));
    registry.register(Arc::new(request::Execute));
    registry.register(Arc::new(parse_html::ParseHtml));

    registry.register(Arc::new(file_ops::List));
    registry.register(Arc::new(file_ops::Stat));
    registry.register(Arc::new(file_ops::Exists));
    registry.register(Arc::new(file_ops::Make));
    registry.register(Arc::new(file_ops::Copy));
    registry.register(Arc::new(file_ops::Move));
    registry.register(Arc::new(file_ops::Append));

    registry.register(Arc::new(response::Return));
    registry.register(Arc::new(response::Throw));
    registry.register(Arc::new(response::Log));
    registry.register(Arc::new(response::Send));
    registry.register(Arc::new(response::Store));
    registry.register(Arc::new(response::Write));
    registry.register(Arc::new(response::Publish));
    registry.register(Arc::new(response::Emit));
    registry.register(Arc::new(response::Notify));

    registry.register(Arc::new(server::Start));
    registry.register(Arc::new(server::Stop));
    registry.register(Arc::new(server::Listen));
    registry.register(Arc::new(server::Connect));
    registry.register(Arc::new(server::Broadcast));
    registry.register(Arc::new(server::Close));
    registry.register(Arc::new(server::Wait));

    registry.register(Arc::new(test_actions::Given));
    registry.register(Arc::new(test_actions::When));
    registry.register(Arc::new(test_actions::Then));
    registry.register(Arc::new(test_actions::Assert));

    registry.register(Arc::new(terminal_actions::Prompt));
    registry.register(Arc::new(terminal_actions::Select));
    registry.register(Arc::new(terminal_actions::Clear));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::Preposition;

    #[test]
    fn register_all_wires_every_verb() {
        let registry = ActionRegistry::new();
        register_all(&registry);
        for verb in [
            "compute", "validate", "compare", "transform", "create", "update", "merge", "sort",
            "filter", "map", "reduce", "split", "delete", "accept", "extract", "retrieve", "read",
            "receive", "request", "call", "execute", "parsehtml", "list", "stat", "exists", "make",
            "copy", "move", "append", "return", "throw", "log", "send", "store", "write", "publish",
            "emit", "notify", "start", "stop", "listen", "connect", "broadcast", "close", "wait",
            "given", "when", "then", "assert", "prompt", "select", "clear",
        ] {
            assert!(registry.lookup(verb).is_some(), "verb `{verb}` was not registered");
        }
        let _ = Preposition::With;
    }
}
