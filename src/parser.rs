//! Parsing wrapper and operation classification.
//!
//! The crate never executes GraphQL; it wraps the ecosystem parser and only
//! reads the resulting document to classify and fingerprint operations.

use crate::error::SignatureError;
use async_graphql_parser::types::{
    DocumentOperations, ExecutableDocument, FragmentDefinition, OperationDefinition, OperationType,
};
use async_graphql_parser::Positioned;
use async_graphql_value::Name;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Placeholder name for operations the client did not name.
pub const ANONYMOUS_OPERATION: &str = "<anonymous>";

/// The kind of an executable GraphQL operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperationKind {
    Query,
    Mutation,
    Subscription,
}

impl OperationKind {
    /// The operation keyword as it appears in a document.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Query => "query",
            Self::Mutation => "mutation",
            Self::Subscription => "subscription",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<OperationType> for OperationKind {
    fn from(ty: OperationType) -> Self {
        match ty {
            OperationType::Query => Self::Query,
            OperationType::Mutation => Self::Mutation,
            OperationType::Subscription => Self::Subscription,
        }
    }
}

/// A parsed GraphQL request document.
///
/// Owns the underlying AST; borrow an operation out of it with
/// [`ParsedDocument::operation`].
pub struct ParsedDocument {
    document: ExecutableDocument,
}

/// Parse a GraphQL query string into a [`ParsedDocument`].
pub fn parse(query: &str) -> Result<ParsedDocument, SignatureError> {
    let document = async_graphql_parser::parse_query(query)?;
    Ok(ParsedDocument { document })
}

impl ParsedDocument {
    /// Resolve the executable operation for this request.
    ///
    /// Follows GraphQL-over-HTTP operation selection: a lone operation needs
    /// no name; multiple operations require `operation_name` to pick one.
    pub fn operation(&self, operation_name: Option<&str>) -> Result<OperationView<'_>, SignatureError> {
        let fragments = &self.document.fragments;
        match &self.document.operations {
            DocumentOperations::Single(op) => match operation_name {
                None => Ok(OperationView::new(None, &op.node, fragments)),
                Some(wanted) => Err(SignatureError::OperationNotFound(wanted.to_string())),
            },
            DocumentOperations::Multiple(ops) => match operation_name {
                Some(wanted) => ops
                    .iter()
                    .find(|(name, _)| name.as_str() == wanted)
                    .map(|(name, op)| OperationView::new(Some(name.as_str()), &op.node, fragments))
                    .ok_or_else(|| SignatureError::OperationNotFound(wanted.to_string())),
                None => {
                    let mut iter = ops.iter();
                    match (iter.next(), iter.next()) {
                        (Some((name, op)), None) => {
                            Ok(OperationView::new(Some(name.as_str()), &op.node, fragments))
                        }
                        (Some(_), Some(_)) => Err(SignatureError::AmbiguousOperation),
                        (None, _) => Err(SignatureError::UnknownOperationType),
                    }
                }
            },
        }
    }
}

/// A borrowed view of one executable operation plus the document's fragments.
pub struct OperationView<'a> {
    kind: OperationKind,
    name: Option<&'a str>,
    pub(crate) definition: &'a OperationDefinition,
    pub(crate) fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
}

impl<'a> OperationView<'a> {
    fn new(
        name: Option<&'a str>,
        definition: &'a OperationDefinition,
        fragments: &'a HashMap<Name, Positioned<FragmentDefinition>>,
    ) -> Self {
        Self {
            kind: definition.ty.into(),
            name,
            definition,
            fragments,
        }
    }

    /// Query, mutation, or subscription.
    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    /// The declared operation name, if the client supplied one.
    pub fn name(&self) -> Option<&'a str> {
        self.name
    }

    /// The declared name, or the `<anonymous>` placeholder.
    ///
    /// Unnamed operations stay distinguishable through their signature, so
    /// the shared placeholder never collapses differently shaped operations.
    pub fn display_name(&self) -> &'a str {
        self.name.unwrap_or(ANONYMOUS_OPERATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_shorthand_query() {
        let doc = parse("{ user { name } }").unwrap();
        let op = doc.operation(None).unwrap();
        assert_eq!(op.kind(), OperationKind::Query);
        assert_eq!(op.name(), None);
        assert_eq!(op.display_name(), ANONYMOUS_OPERATION);
    }

    #[test]
    fn test_classify_named_mutation() {
        let doc = parse("mutation AddUser { addUser { id } }").unwrap();
        let op = doc.operation(None).unwrap();
        assert_eq!(op.kind(), OperationKind::Mutation);
        assert_eq!(op.display_name(), "AddUser");
    }

    #[test]
    fn test_classify_subscription() {
        let doc = parse("subscription OnEvent { events { id } }").unwrap();
        let op = doc.operation(None).unwrap();
        assert_eq!(op.kind(), OperationKind::Subscription);
    }

    #[test]
    fn test_multiple_operations_require_name() {
        let doc = parse("query A { a } query B { b }").unwrap();
        assert!(matches!(
            doc.operation(None),
            Err(SignatureError::AmbiguousOperation)
        ));

        let op = doc.operation(Some("B")).unwrap();
        assert_eq!(op.display_name(), "B");
    }

    #[test]
    fn test_operation_not_found() {
        let doc = parse("query A { a }").unwrap();
        assert!(matches!(
            doc.operation(Some("Missing")),
            Err(SignatureError::OperationNotFound(name)) if name == "Missing"
        ));
    }

    #[test]
    fn test_fragment_only_document_is_rejected() {
        // Either the parser or operation resolution must refuse a document
        // with no executable operation.
        let result =
            parse("fragment F on User { name }").and_then(|doc| doc.operation(None).map(|_| ()));
        assert!(result.is_err());
    }

    #[test]
    fn test_operation_kind_display() {
        assert_eq!(OperationKind::Query.to_string(), "query");
        assert_eq!(OperationKind::Mutation.to_string(), "mutation");
        assert_eq!(OperationKind::Subscription.to_string(), "subscription");
    }
}
