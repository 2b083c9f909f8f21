//! `List`, `Stat`, `Exists`, `Make`/`Touch`/`CreateDirectory`/`Mkdir`,
//! `Copy`/`Move`/`Rename`, `Append` (spec.md §4.D File family).

use std::sync::Arc;

use crate::actions::support::resolve_path;
use crate::context::ExecutionContext;
use crate::descriptors::{ActionRole, ObjectDescriptor, Preposition, ResultDescriptor};
use crate::error::{ActionError, Result};
use crate::registry::ActionImpl;
use crate::services::fs::FileSystemService;
use crate::value::TypedValue;

fn fs(ctx: &ExecutionContext) -> Result<&Arc<dyn FileSystemService>> {
    ctx.require_service::<Arc<dyn FileSystemService>>("FileSystemService")
}

fn require_path(path: String) -> Result<String> {
    if path.is_empty() {
        Err(ActionError::runtime("requires a path"))
    } else {
        Ok(path)
    }
}

pub struct List;

#[async_trait::async_trait]
impl ActionImpl for List {
    fn role(&self) -> ActionRole {
        ActionRole::Request
    }

    fn verbs(&self) -> &[&'static str] {
        &["list"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::From]
    }

    async fn execute(
        &self,
        _result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let path = require_path(resolve_path(ctx, &object.specifiers, &object.base))?;
        let glob = ctx
            .resolve("_literal_")
            .and_then(|v| match v {
                TypedValue::Map(m) => m.get("matching").and_then(|g| g.to_plain_string()),
                _ => None,
            });
        let recursive = ctx
            .resolve("_literal_")
            .and_then(|v| match v {
                TypedValue::Map(m) => m.get("recursively").and_then(|r| r.to_bool()),
                _ => None,
            })
            .unwrap_or(false);
        let entries = fs(ctx)?.list(&path, glob.as_deref(), recursive).await?;
        Ok(TypedValue::List(entries.into_iter().map(TypedValue::String).collect()))
    }
}

pub struct Stat;

#[async_trait::async_trait]
impl ActionImpl for Stat {
    fn role(&self) -> ActionRole {
        ActionRole::Request
    }

    fn verbs(&self) -> &[&'static str] {
        &["stat"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::From]
    }

    async fn execute(
        &self,
        _result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let path = require_path(resolve_path(ctx, &object.specifiers, &object.base))?;
        Ok(fs(ctx)?.stat(&path).await?.into())
    }
}

pub struct Exists;

#[async_trait::async_trait]
impl ActionImpl for Exists {
    fn role(&self) -> ActionRole {
        ActionRole::Request
    }

    fn verbs(&self) -> &[&'static str] {
        &["exists"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::At]
    }

    async fn execute(
        &self,
        _result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let path = require_path(resolve_path(ctx, &object.specifiers, &object.base))?;
        let fs = fs(ctx)?;
        let present = fs.exists(&path).await;
        if !present {
            return Ok(TypedValue::Boolean(false));
        }
        let wants_dir = object.base.eq_ignore_ascii_case("directory");
        let wants_file = object.base.eq_ignore_ascii_case("file");
        let type_matches = if wants_dir {
            fs.is_dir(&path).await
        } else if wants_file {
            !fs.is_dir(&path).await
        } else {
            true
        };
        Ok(TypedValue::Boolean(type_matches))
    }
}

pub struct Make;

#[async_trait::async_trait]
impl ActionImpl for Make {
    fn role(&self) -> ActionRole {
        ActionRole::Own
    }

    fn verbs(&self) -> &[&'static str] {
        &["make", "touch", "createdirectory", "mkdir"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::At]
    }

    async fn execute(
        &self,
        result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let path = require_path(resolve_path(ctx, &object.specifiers, &object.base))?;
        if result.base.eq_ignore_ascii_case("file") {
            fs(ctx)?.make_file(&path).await?;
        } else {
            fs(ctx)?.make_dir(&path).await?;
        }
        Ok(TypedValue::String(path))
    }
}

pub struct Copy;

#[async_trait::async_trait]
impl ActionImpl for Copy {
    fn role(&self) -> ActionRole {
        ActionRole::Own
    }

    fn verbs(&self) -> &[&'static str] {
        &["copy"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::To]
    }

    async fn execute(
        &self,
        result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let from = require_path(resolve_path(ctx, &result.specifiers, &result.base))?;
        let to = require_path(resolve_path(ctx, &object.specifiers, &object.base))?;
        fs(ctx)?.copy(&from, &to).await?;
        Ok(TypedValue::String(to))
    }
}

pub struct Move;

#[async_trait::async_trait]
impl ActionImpl for Move {
    fn role(&self) -> ActionRole {
        ActionRole::Own
    }

    fn verbs(&self) -> &[&'static str] {
        &["move", "rename"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::To]
    }

    async fn execute(
        &self,
        result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let from = require_path(resolve_path(ctx, &result.specifiers, &result.base))?;
        let to = require_path(resolve_path(ctx, &object.specifiers, &object.base))?;
        fs(ctx)?.rename(&from, &to).await?;
        Ok(TypedValue::String(to))
    }
}

pub struct Append;

#[async_trait::async_trait]
impl ActionImpl for Append {
    fn role(&self) -> ActionRole {
        ActionRole::Own
    }

    fn verbs(&self) -> &[&'static str] {
        &["append"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::To]
    }

    async fn execute(
        &self,
        result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        let path = require_path(resolve_path(ctx, &object.specifiers, &object.base))?;
        let content = ctx
            .resolve("_literal_")
            .or_else(|| ctx.resolve("_expression_"))
            .or_else(|| ctx.resolve(&result.base))
            .map(|v| v.display_string())
            .unwrap_or_default();
        fs(ctx)?.append(&path, content.as_bytes()).await?;
        Ok(TypedValue::String(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptors::ObjectDescriptor as OD;
    use crate::error::Result as ActionResult;
    use crate::services::fs::FileStat;
    use std::sync::Mutex;

    struct FakeFs {
        existing: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl FileSystemService for FakeFs {
        async fn read(&self, _path: &str) -> ActionResult<Vec<u8>> {
            Ok(Vec::new())
        }
        async fn write(&self, _path: &str, _bytes: &[u8]) -> ActionResult<()> {
            Ok(())
        }
        async fn append(&self, _path: &str, _bytes: &[u8]) -> ActionResult<()> {
            Ok(())
        }
        async fn exists(&self, path: &str) -> bool {
            self.existing.lock().unwrap().iter().any(|p| p == path)
        }
        async fn is_dir(&self, _path: &str) -> bool {
            false
        }
        async fn stat(&self, _path: &str) -> ActionResult<FileStat> {
            Ok(FileStat { size: 0, is_dir: false, modified: None })
        }
        async fn list(&self, _path: &str, _glob: Option<&str>, _recursive: bool) -> ActionResult<Vec<String>> {
            Ok(Vec::new())
        }
        async fn make_dir(&self, _path: &str) -> ActionResult<()> {
            Ok(())
        }
        async fn make_file(&self, _path: &str) -> ActionResult<()> {
            Ok(())
        }
        async fn copy(&self, _from: &str, _to: &str) -> ActionResult<()> {
            Ok(())
        }
        async fn rename(&self, _from: &str, _to: &str) -> ActionResult<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn exists_is_false_for_missing_path() {
        let mut ctx = ExecutionContext::new("Orders", "fs");
        ctx.register::<Arc<dyn FileSystemService>>(Arc::new(FakeFs { existing: Mutex::new(vec![]) }));
        let object = OD::new("report.csv", Preposition::At);
        let result = ResultDescriptor::new("present");
        let outcome = Exists.execute(&result, &object, &mut ctx).await.unwrap();
        assert_eq!(outcome, TypedValue::Boolean(false));
    }

    #[tokio::test]
    async fn empty_path_fails_with_runtime_error() {
        let mut ctx = ExecutionContext::new("Orders", "fs");
        ctx.register::<Arc<dyn FileSystemService>>(Arc::new(FakeFs { existing: Mutex::new(vec![]) }));
        let object = OD::new("placeholder", Preposition::At).with_specifiers(vec![""]);
        let result = ResultDescriptor::new("present");
        let err = Exists.execute(&result, &object, &mut ctx).await.unwrap_err();
        assert!(matches!(err, ActionError::RuntimeError(_)));
    }
}
