//! Everything an embedding application typically needs in scope to
//! construct a `Runtime`, register services, and run `FeatureSet`s.

pub use crate::actions::register_all;
pub use crate::config::RuntimeConfig;
pub use crate::context::{ExecutionContext, OutputContext, Response};
pub use crate::descriptors::{
    Action, ActionRole, AroStatement, Expression, FeatureSet, ForEachLoop, Literal, MatchBranch,
    MatchStatement, ObjectDescriptor, Preposition, QueryModifiers, ResultDescriptor, Span,
    Statement, ValueSource, WhereClause,
};
pub use crate::error::{ActionError, Result};
pub use crate::events::{ChangeType, Event, EventBus, RepositoryChangedEvent};
pub use crate::executor::FeatureSetExecutor;
pub use crate::registry::{ActionImpl, ActionRegistry};
pub use crate::repository::{RepositoryStore, StoreResult};
pub use crate::shutdown::ShutdownCoordinator;
pub use crate::value::TypedValue;
