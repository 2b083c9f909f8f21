//! The ARO Runtime core action execution engine: a type-carrying variable
//! context, an action registry routing verbs to implementations, a
//! statement-loop executor, and the in-process event bus and repository
//! storage the actions read and write (spec.md §1–§2).

pub mod actions;
pub mod config;
pub mod context;
pub mod descriptors;
pub mod error;
pub mod events;
pub mod executor;
pub mod expr;
mod idgen;
pub mod predicate;
pub mod prelude;
pub mod registry;
pub mod repository;
pub mod services;
pub mod shutdown;
pub mod value;

// Flat re-exports — the public API surface an embedding application uses to
// construct a `Runtime`, register services, and run `FeatureSet`s.
pub use actions::register_all;
pub use config::RuntimeConfig;
pub use context::{ExecutionContext, OutputContext, Response};
pub use descriptors::{
    Action, ActionRole, AroStatement, Expression, FeatureSet, ForEachLoop, Literal, MatchBranch,
    MatchStatement, ObjectDescriptor, Preposition, QueryModifiers, ResultDescriptor, Span,
    Statement, ValueSource, WhereClause,
};
pub use error::{ActionError, Result};
pub use events::{ChangeType, DomainEvent, Event, EventBus, RepositoryChangedEvent};
pub use executor::FeatureSetExecutor;
pub use registry::{ActionImpl, ActionRegistry};
pub use repository::{RepositoryStore, StoreResult};
pub use shutdown::ShutdownCoordinator;
pub use value::TypedValue;
