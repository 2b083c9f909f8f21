//! The data model: descriptors, prepositions, roles and statement shapes that the
//! (out-of-scope) parser produces and that the engine consumes. See spec.md §3.

use crate::value::TypedValue;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A byte-offset + line/column range. The core never interprets this beyond
/// carrying it through to diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Closed enum of prepositions an object clause may carry (spec.md §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preposition {
    From,
    To,
    With,
    For,
    Into,
    On,
    Via,
    Against,
    At,
    Where,
    By,
}

impl fmt::Display for Preposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Preposition::From => "from",
            Preposition::To => "to",
            Preposition::With => "with",
            Preposition::For => "for",
            Preposition::Into => "into",
            Preposition::On => "on",
            Preposition::Via => "via",
            Preposition::Against => "against",
            Preposition::At => "at",
            Preposition::Where => "where",
            Preposition::By => "by",
        };
        write!(f, "{s}")
    }
}

/// The effect category of an action (spec.md §3). Informational: used by LSP-style
/// tooling and by the executor to classify effects; never a dispatch key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionRole {
    Request,
    Own,
    Response,
    Export,
    Server,
}

/// `article` on a descriptor (`a`/`an`/`the`). Purely surface sugar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Article {
    A,
    An,
    The,
}

/// `<result[: specifiers]>` phrase. `base` is the destination variable name;
/// `specifiers` is an ordered list of qualifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultDescriptor {
    pub base: String,
    pub specifiers: Vec<String>,
    pub article: Option<Article>,
    pub type_annotation: Option<String>,
    pub span: Span,
}

impl ResultDescriptor {
    pub fn new(base: impl Into<String>) -> Self {
        let base = base.into();
        debug_assert!(!base.is_empty(), "ResultDescriptor.base must be non-empty");
        Self {
            base,
            specifiers: Vec::new(),
            article: None,
            type_annotation: None,
            span: Span::default(),
        }
    }

    pub fn with_specifiers(mut self, specifiers: Vec<impl Into<String>>) -> Self {
        self.specifiers = specifiers.into_iter().map(Into::into).collect();
        self
    }

    pub fn specifier(&self, idx: usize) -> Option<&str> {
        self.specifiers.get(idx).map(String::as_str)
    }
}

/// `<object[: specifiers]>` phrase, always carrying the statement's preposition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectDescriptor {
    pub base: String,
    pub specifiers: Vec<String>,
    pub article: Option<Article>,
    pub preposition: Preposition,
    pub literal_value: Option<TypedValue>,
    pub span: Span,
}

impl ObjectDescriptor {
    pub fn new(base: impl Into<String>, preposition: Preposition) -> Self {
        let base = base.into();
        debug_assert!(!base.is_empty(), "ObjectDescriptor.base must be non-empty");
        Self {
            base,
            specifiers: Vec::new(),
            article: None,
            preposition,
            literal_value: None,
            span: Span::default(),
        }
    }

    pub fn with_specifiers(mut self, specifiers: Vec<impl Into<String>>) -> Self {
        self.specifiers = specifiers.into_iter().map(Into::into).collect();
        self
    }

    pub fn specifier(&self, idx: usize) -> Option<&str> {
        self.specifiers.get(idx).map(String::as_str)
    }

    /// `base` plus its first specifier, dotted — used in diagnostics
    /// (e.g. `AcceptStateError`'s "on order: status").
    pub fn full_name(&self) -> String {
        match self.specifiers.first() {
            Some(s) => format!("{}: {}", self.base, s),
            None => self.base.clone(),
        }
    }
}

/// A literal value carried by `with`/`to`/`from` clauses before it becomes
/// `_literal_`. Shares `TypedValue`'s shape by construction.
pub type Literal = TypedValue;

/// The minimal closed expression surface the clause-binding step needs to
/// discriminate on (spec.md SPEC_FULL §3 supplement).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expression {
    VarRef(String),
    Path(String, Vec<String>),
    Aggregate(String, String),
    Regex(String, String),
    Map(IndexMap<String, TypedValue>),
    List(Vec<TypedValue>),
    Binary(Box<Expression>, String, Box<Expression>),
}

/// What a clause (`with`/`to`/`from`/`by`) carries, before clause-binding.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub enum ValueSource {
    #[default]
    None,
    Literal(Literal),
    Expression(Expression),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhereClause {
    pub field: String,
    pub op: String,
    pub value: TypedValue,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QueryModifiers {
    pub where_clause: Option<WhereClause>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Action {
    pub verb: String,
    pub role: ActionRole,
    pub span: Span,
}

/// A single parsed ARO statement: `<Verb> the <result> prep the <object> [with …] [where …]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AroStatement {
    pub action: Action,
    pub result: ResultDescriptor,
    pub object: ObjectDescriptor,
    pub value_source: ValueSource,
    pub to_source: Option<Expression>,
    pub from_source: Option<Expression>,
    pub by_source: Option<Expression>,
    pub query_modifiers: QueryModifiers,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishStatement {
    pub result: ResultDescriptor,
    pub object: ObjectDescriptor,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchBranch {
    pub predicate: Expression,
    pub body: Vec<Statement>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchStatement {
    pub subject: Expression,
    pub branches: Vec<MatchBranch>,
    pub span: Span,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForEachLoop {
    pub item_variable: String,
    pub source: Expression,
    pub body: Vec<Statement>,
    pub span: Span,
}

/// The union of statement kinds a feature set's body is made of.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Statement {
    Aro(AroStatement),
    Publish(PublishStatement),
    Match(MatchStatement),
    ForEach(ForEachLoop),
}

/// A named, ordered sequence of ARO statements with a business activity tag
/// (spec.md GLOSSARY).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSet {
    pub name: String,
    pub business_activity: String,
    pub body: Vec<Statement>,
}
