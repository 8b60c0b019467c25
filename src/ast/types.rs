//! Type expressions and element prototypes.
//!
//! This module defines the type system surface the resolver works on:
//!
//! - Basic (machine) types
//! - Type expressions, of which only `Named` and `ThisClass` need resolution
//! - Element prototypes (how a value is held)
//! - Name expressions (dotted, possibly templated chains)
//!
//! Type expressions arrive from the parser with `Named` leaves and are
//! reduced by the resolver into canonical form. Once reduced, a type never
//! again contains `Named`.

use crate::Position;

use super::ast::NodeId;

/// Built-in machine types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BasicType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
}

impl BasicType {
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            BasicType::Int8
                | BasicType::Int16
                | BasicType::Int32
                | BasicType::Int64
                | BasicType::UInt8
                | BasicType::UInt16
                | BasicType::UInt32
                | BasicType::UInt64
        )
    }

    pub fn is_float(&self) -> bool {
        matches!(self, BasicType::Float32 | BasicType::Float64)
    }

    pub fn is_signed(&self) -> bool {
        matches!(
            self,
            BasicType::Int8 | BasicType::Int16 | BasicType::Int32 | BasicType::Int64
        )
    }

    /// Byte width, used for widening/narrowing decisions.
    pub fn width(&self) -> u32 {
        match self {
            BasicType::Bool => 1,
            BasicType::Int8 | BasicType::UInt8 => 1,
            BasicType::Int16 | BasicType::UInt16 => 2,
            BasicType::Int32 | BasicType::UInt32 | BasicType::Float32 => 4,
            BasicType::Int64 | BasicType::UInt64 | BasicType::Float64 => 8,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            BasicType::Bool => "bool",
            BasicType::Int8 => "int8",
            BasicType::Int16 => "int16",
            BasicType::Int32 => "int32",
            BasicType::Int64 => "int64",
            BasicType::UInt8 => "uint8",
            BasicType::UInt16 => "uint16",
            BasicType::UInt32 => "uint32",
            BasicType::UInt64 => "uint64",
            BasicType::Float32 => "float32",
            BasicType::Float64 => "float64",
        }
    }
}

/// One link of a possibly-qualified name, e.g. the `B<int32>` in `A::B<int32>::C`.
#[derive(Debug, Clone)]
pub struct NameLink {
    pub name: String,
    pub template_args: Vec<ElementProto>,
}

/// A possibly-qualified, possibly-templated name expression awaiting resolution.
#[derive(Debug, Clone)]
pub struct NameExpr {
    pub links: Vec<NameLink>,
    pub position: Position,
}

impl NameExpr {
    pub fn simple(name: &str) -> Self {
        NameExpr {
            links: vec![NameLink {
                name: String::from(name),
                template_args: vec![],
            }],
            position: Position::null(),
        }
    }

    pub fn chain(names: &[&str]) -> Self {
        NameExpr {
            links: names
                .iter()
                .map(|name| NameLink {
                    name: String::from(*name),
                    template_args: vec![],
                })
                .collect(),
            position: Position::null(),
        }
    }

    pub fn templated(name: &str, args: Vec<ElementProto>) -> Self {
        NameExpr {
            links: vec![NameLink {
                name: String::from(name),
                template_args: args,
            }],
            position: Position::null(),
        }
    }

    /// The full dotted spelling, for diagnostics.
    pub fn spelling(&self) -> String {
        self.links
            .iter()
            .map(|link| link.name.clone())
            .collect::<Vec<String>>()
            .join("::")
    }
}

/// A callable signature: argument prototypes, return prototype, variadic marker.
#[derive(Debug, Clone)]
pub struct CallableType {
    pub arguments: Vec<ElementProto>,
    pub return_proto: Box<ElementProto>,
    pub is_var_args: bool,
}

/// A type expression.
///
/// Only `Named` and `ThisClass` require resolution; all other tags are
/// already canonical. `Unknown` doubles as the unresolved placeholder and
/// the "accepts anything" type.
#[derive(Debug, Clone)]
pub enum TypeExpr {
    Unknown,
    Named(NameExpr),
    ThisClass,
    Unsolvable,
    Struct(NodeId),
    Entity(NodeId),
    Callable(CallableType),
    PointerConstrained(Box<TypeExpr>),
    PointerUnconstrained(Box<TypeExpr>),
    NullPointer,
    Void,
    Basic(BasicType),
    Enum(NodeId),
}

impl TypeExpr {
    pub fn is_pointer(&self) -> bool {
        matches!(
            self,
            TypeExpr::PointerConstrained(_)
                | TypeExpr::PointerUnconstrained(_)
                | TypeExpr::NullPointer
        )
    }

    pub fn needs_resolution(&self) -> bool {
        match self {
            TypeExpr::Named(_) | TypeExpr::ThisClass => true,
            TypeExpr::PointerConstrained(inner) | TypeExpr::PointerUnconstrained(inner) => {
                inner.needs_resolution()
            }
            TypeExpr::Callable(callable) => {
                callable
                    .arguments
                    .iter()
                    .any(|arg| arg.type_expr.needs_resolution())
                    || callable.return_proto.type_expr.needs_resolution()
            }
            _ => false,
        }
    }

    /// Structural identity.
    ///
    /// With `lenient_unknown`, `Unknown` matches anything on either side;
    /// usage deduplication passes `false`, conversion matching passes `true`.
    pub fn is_identical(&self, other: &TypeExpr, lenient_unknown: bool) -> bool {
        if lenient_unknown
            && (matches!(self, TypeExpr::Unknown) || matches!(other, TypeExpr::Unknown))
        {
            return true;
        }
        match (self, other) {
            (TypeExpr::Unknown, TypeExpr::Unknown) => true,
            (TypeExpr::ThisClass, TypeExpr::ThisClass) => true,
            (TypeExpr::Unsolvable, TypeExpr::Unsolvable) => true,
            (TypeExpr::Struct(a), TypeExpr::Struct(b)) => a == b,
            (TypeExpr::Entity(a), TypeExpr::Entity(b)) => a == b,
            (TypeExpr::Enum(a), TypeExpr::Enum(b)) => a == b,
            (TypeExpr::NullPointer, TypeExpr::NullPointer) => true,
            (TypeExpr::Void, TypeExpr::Void) => true,
            (TypeExpr::Basic(a), TypeExpr::Basic(b)) => a == b,
            (TypeExpr::PointerConstrained(a), TypeExpr::PointerConstrained(b)) => {
                a.is_identical(b, lenient_unknown)
            }
            (TypeExpr::PointerUnconstrained(a), TypeExpr::PointerUnconstrained(b)) => {
                a.is_identical(b, lenient_unknown)
            }
            (TypeExpr::Callable(a), TypeExpr::Callable(b)) => {
                a.is_var_args == b.is_var_args
                    && a.arguments.len() == b.arguments.len()
                    && a.arguments
                        .iter()
                        .zip(b.arguments.iter())
                        .all(|(x, y)| x.is_identical(y, lenient_unknown))
                    && a.return_proto.is_identical(&b.return_proto, lenient_unknown)
            }
            _ => false,
        }
    }
}

/// How a value is held.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// Not yet decided; must be narrowed to a concrete kind before use.
    Auto,
    /// Held by value.
    Object,
    /// Held through a constrained pointer.
    RefConstrained,
    /// Held through an unconstrained pointer.
    RefUnconstrained,
    /// Names an overload set rather than a single value.
    OverloadRef,
}

/// An element prototype: (element kind, type, const qualifier).
#[derive(Debug, Clone)]
pub struct ElementProto {
    pub kind: ElementKind,
    pub type_expr: TypeExpr,
    pub is_const: bool,
}

impl ElementProto {
    pub fn object(type_expr: TypeExpr) -> Self {
        ElementProto {
            kind: ElementKind::Object,
            type_expr,
            is_const: false,
        }
    }

    pub fn auto(type_expr: TypeExpr) -> Self {
        ElementProto {
            kind: ElementKind::Auto,
            type_expr,
            is_const: false,
        }
    }

    pub fn is_identical(&self, other: &ElementProto, lenient_unknown: bool) -> bool {
        self.kind == other.kind
            && self.is_const == other.is_const
            && self.type_expr.is_identical(&other.type_expr, lenient_unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_is_lenient_toward_unknown() {
        let unknown = TypeExpr::Unknown;
        let int32 = TypeExpr::Basic(BasicType::Int32);

        assert!(unknown.is_identical(&int32, true));
        assert!(!unknown.is_identical(&int32, false));
        assert!(int32.is_identical(&int32, false));
    }

    #[test]
    fn test_pointer_identity_is_structural() {
        let a = TypeExpr::PointerConstrained(Box::new(TypeExpr::Basic(BasicType::Int8)));
        let b = TypeExpr::PointerConstrained(Box::new(TypeExpr::Basic(BasicType::Int8)));
        let c = TypeExpr::PointerUnconstrained(Box::new(TypeExpr::Basic(BasicType::Int8)));

        assert!(a.is_identical(&b, false));
        assert!(!a.is_identical(&c, false));
    }

    #[test]
    fn test_name_expr_spelling() {
        let name = NameExpr::chain(&["A", "B", "C"]);
        assert_eq!(name.spelling(), "A::B::C");
    }
}
