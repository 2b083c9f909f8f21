//! `ParseHtml` (own) (spec.md §4.D Source-read family). Backed by a minimal
//! tag scanner rather than a full HTML5 engine (SPEC_FULL.md §4.D supplement).

use regex::Regex;

use crate::context::ExecutionContext;
use crate::descriptors::{ActionRole, ObjectDescriptor, Preposition, ResultDescriptor};
use crate::error::{ActionError, Result};
use crate::registry::ActionImpl;
use crate::value::TypedValue;

pub struct ParseHtml;

#[async_trait::async_trait]
impl ActionImpl for ParseHtml {
    fn role(&self) -> ActionRole {
        ActionRole::Own
    }

    fn verbs(&self) -> &[&'static str] {
        &["parsehtml", "parse-html"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::From]
    }

    async fn execute(
        &self,
        result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let html = ctx
            .resolve(&object.base)
            .and_then(|v| v.to_plain_string())
            .ok_or_else(|| ActionError::UndefinedVariable(object.base.clone()))?;

        let selector = ctx.resolve("_expression_").and_then(|v| v.to_plain_string());
        let scoped = match &selector {
            Some(sel) => scope_to_selector(&html, sel),
            None => html,
        };

        match result.specifiers.first().map(String::as_str) {
            Some("links") => Ok(extract_links(&scoped)),
            Some("text") => Ok(TypedValue::String(strip_tags(&scoped))),
            Some("content") | None => Ok(TypedValue::String(scoped)),
            Some(other) => Err(ActionError::InvalidInput {
                message: format!("ParseHtml does not support specifier `{other}`"),
                received: other.to_string(),
            }),
        }
    }
}

struct Selector {
    tag: Option<String>,
    id: Option<String>,
    class: Option<String>,
}

fn parse_selector(sel: &str) -> Selector {
    let re = Regex::new(r"^([a-zA-Z0-9]*)(#[\w-]+)?(\.[\w-]+)?$").unwrap();
    if let Some(caps) = re.captures(sel.trim()) {
        Selector {
            tag: caps.get(1).map(|m| m.as_str().to_string()).filter(|s| !s.is_empty()),
            id: caps.get(2).map(|m| m.as_str()[1..].to_string()),
            class: caps.get(3).map(|m| m.as_str()[1..].to_string()),
        }
    } else {
        Selector { tag: None, id: None, class: None }
    }
}

/// Finds the first element matching the (simplified, non-nested) selector
/// and returns its full opening-to-closing-tag slice.
fn scope_to_selector(html: &str, sel: &str) -> String {
    let selector = parse_selector(sel);
    let tag_pattern = selector.tag.as_deref().unwrap_or("[a-zA-Z][a-zA-Z0-9]*");
    let open_re = match Regex::new(&format!(r"<({tag_pattern})\b([^>]*)>")) {
        Ok(re) => re,
        Err(_) => return html.to_string(),
    };
    for caps in open_re.captures_iter(html) {
        let attrs = caps.get(2).map(|m| m.as_str()).unwrap_or("");
        let id_ok = selector
            .id
            .as_ref()
            .map(|id| attrs.contains(&format!("id=\"{id}\"")) || attrs.contains(&format!("id='{id}'")))
            .unwrap_or(true);
        let class_ok = selector
            .class
            .as_ref()
            .map(|class| attrs.contains(class.as_str()))
            .unwrap_or(true);
        if id_ok && class_ok {
            let tag_name = caps.get(1).map(|m| m.as_str()).unwrap_or_default();
            let start = caps.get(0).unwrap().start();
            if let Some(close_idx) = html[start..].find(&format!("</{tag_name}>")) {
                return html[start..start + close_idx + format!("</{tag_name}>").len()].to_string();
            }
        }
    }
    html.to_string()
}

fn extract_links(html: &str) -> TypedValue {
    let re = Regex::new(r#"<a\b[^>]*\bhref\s*=\s*["']([^"']*)["']"#).unwrap();
    TypedValue::List(
        re.captures_iter(html)
            .map(|caps| TypedValue::String(caps[1].to_string()))
            .collect(),
    )
}

fn strip_tags(html: &str) -> String {
    let tag_re = Regex::new(r"<[^>]+>").unwrap();
    let whitespace_re = Regex::new(r"\s+").unwrap();
    let without_tags = tag_re.replace_all(html, " ");
    whitespace_re.replace_all(&without_tags, " ").trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_hrefs() {
        let html = r#"<a href="/one">One</a><a href="/two">Two</a>"#;
        let links = extract_links(html);
        assert_eq!(
            links,
            TypedValue::List(vec![
                TypedValue::String("/one".into()),
                TypedValue::String("/two".into())
            ])
        );
    }

    #[test]
    fn strips_tags_and_collapses_whitespace() {
        let html = "<div>Hello   <b>World</b></div>";
        assert_eq!(strip_tags(html), "Hello World");
    }
}
