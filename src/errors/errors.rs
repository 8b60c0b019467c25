use std::fmt::Display;

use thiserror::Error;

use crate::Position;

#[derive(Debug, Clone)]
pub struct Error {
    internal_error: ErrorImpl,
    position: Position,
}

impl Error {
    pub fn new(error_impl: ErrorImpl, position: Position) -> Self {
        Error {
            internal_error: error_impl,
            position,
        }
    }

    pub fn get_position(&self) -> &Position {
        &self.position
    }

    pub fn get_error(&self) -> &ErrorImpl {
        &self.internal_error
    }

    pub fn get_error_name(&self) -> &str {
        match &self.internal_error {
            ErrorImpl::UnresolvedName { .. } => "UnresolvedName",
            ErrorImpl::AmbiguousName { .. } => "AmbiguousName",
            ErrorImpl::AliasCycle { .. } => "AliasCycle",
            ErrorImpl::SearchTooDeep { .. } => "SearchTooDeep",
            ErrorImpl::InheritanceCycle { .. } => "InheritanceCycle",
            ErrorImpl::MemberContainmentCycle { .. } => "MemberContainmentCycle",
            ErrorImpl::TemplateArgumentCount { .. } => "TemplateArgumentCount",
            ErrorImpl::TemplatePredicateUnsatisfied { .. } => "TemplatePredicateUnsatisfied",
            ErrorImpl::DuplicateDefinition { .. } => "DuplicateDefinition",
            ErrorImpl::UnmatchedImplementation { .. } => "UnmatchedImplementation",
            ErrorImpl::UninstantiableType { .. } => "UninstantiableType",
            ErrorImpl::EntrySignatureMismatch { .. } => "EntrySignatureMismatch",
        }
    }

    pub fn get_tip(&self) -> ErrorTip {
        match &self.internal_error {
            ErrorImpl::UnresolvedName { name } => {
                ErrorTip::Suggestion(format!("Name `{}` could not be resolved", name))
            }
            ErrorImpl::AmbiguousName { name, candidates } => ErrorTip::Suggestion(format!(
                "Name `{}` is ambiguous: {} candidates where one was required",
                name, candidates
            )),
            ErrorImpl::AliasCycle { alias } => ErrorTip::Suggestion(format!(
                "Alias `{}` refers back to itself through its own target",
                alias
            )),
            ErrorImpl::SearchTooDeep { name } => ErrorTip::Suggestion(format!(
                "Resolving `{}` recursed too deeply, are two definitions mutually recursive?",
                name
            )),
            ErrorImpl::InheritanceCycle { class } => ErrorTip::Suggestion(format!(
                "Class `{}` inherits from itself through its superclass chain",
                class
            )),
            ErrorImpl::MemberContainmentCycle { class, member } => ErrorTip::Suggestion(format!(
                "Member `{}` embeds `{}` into itself by value, use a pointer",
                member, class
            )),
            ErrorImpl::TemplateArgumentCount { class, expected, received } => {
                ErrorTip::Suggestion(format!(
                    "Class `{}` takes {} template arguments, received {}",
                    class, expected, received
                ))
            }
            ErrorImpl::TemplatePredicateUnsatisfied { first, last } => ErrorTip::Suggestion(
                format!("No template predicate accepts arguments `{}` .. `{}`", first, last),
            ),
            ErrorImpl::DuplicateDefinition { name, symbol } => ErrorTip::Suggestion(format!(
                "`{}` is defined twice with the same signature ({})",
                name, symbol
            )),
            ErrorImpl::UnmatchedImplementation { name } => ErrorTip::Suggestion(format!(
                "Implementation of `{}` matches no declaration in its host class",
                name
            )),
            ErrorImpl::UninstantiableType { type_ } => ErrorTip::Suggestion(format!(
                "Type `{}` is abstract or an un-instantiated template and cannot be held by value",
                type_
            )),
            ErrorImpl::EntrySignatureMismatch { name } => ErrorTip::Suggestion(format!(
                "Entry method `{}` must have signature (int32, int8***) => int32",
                name
            )),
        }
    }
}

pub enum ErrorTip {
    None,
    Suggestion(String),
}

impl Display for ErrorTip {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorTip::None => write!(f, ""),
            ErrorTip::Suggestion(suggestion) => write!(f, "{}", suggestion),
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum ErrorImpl {
    #[error("unresolved name: {name:?}")]
    UnresolvedName { name: String },
    #[error("ambiguous name: {name:?} ({candidates:?} candidates)")]
    AmbiguousName { name: String, candidates: usize },
    #[error("alias cycle through {alias:?}")]
    AliasCycle { alias: String },
    #[error("search too deep while resolving {name:?}")]
    SearchTooDeep { name: String },
    #[error("inheritance cycle through {class:?}")]
    InheritanceCycle { class: String },
    #[error("member containment cycle: {member:?} contains {class:?} by value")]
    MemberContainmentCycle { class: String, member: String },
    #[error("template argument count mismatch for {class:?}: expected {expected:?}, received {received:?}")]
    TemplateArgumentCount {
        class: String,
        expected: usize,
        received: usize,
    },
    #[error("no template predicate satisfied for arguments {first:?} .. {last:?}")]
    TemplatePredicateUnsatisfied { first: String, last: String },
    #[error("duplicate definition of {name:?} ({symbol:?})")]
    DuplicateDefinition { name: String, symbol: String },
    #[error("implementation {name:?} matches no declaration")]
    UnmatchedImplementation { name: String },
    #[error("type {type_:?} cannot be instantiated by value")]
    UninstantiableType { type_: String },
    #[error("entry method {name:?} has the wrong signature")]
    EntrySignatureMismatch { name: String },
}
