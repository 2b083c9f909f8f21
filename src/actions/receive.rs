//! `Receive`: a simple identity lookup used by event-driven entry points
//! (spec.md §4.D Source-read family).

use crate::context::ExecutionContext;
use crate::descriptors::{ActionRole, ObjectDescriptor, Preposition, ResultDescriptor};
use crate::error::{ActionError, Result};
use crate::registry::ActionImpl;
use crate::value::TypedValue;

pub struct Receive;

#[async_trait::async_trait]
impl ActionImpl for Receive {
    fn role(&self) -> ActionRole {
        ActionRole::Request
    }

    fn verbs(&self) -> &[&'static str] {
        &["receive"]
    }

    fn valid_prepositions(&self) -> &[Preposition] {
        &[Preposition::From, Preposition::Via]
    }

    async fn execute(
        &self,
        _result: &ResultDescriptor,
        object: &ObjectDescriptor,
        ctx: &mut ExecutionContext,
    ) -> Result<TypedValue> {
        ctx.resolve(&object.base)
            .cloned()
            .ok_or_else(|| ActionError::UndefinedVariable(object.base.clone()))
    }
}
