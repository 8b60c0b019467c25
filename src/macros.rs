//! Utility macros for the resolver.
//!
//! This module defines helper macros used throughout the semantic engine:
//!
//! - `MK_PROTO!` - Creates an ElementProto instance
//!
//! These macros reduce boilerplate when building prototypes by hand, which
//! the validation driver and the tests both do a lot of.

/// Creates an ElementProto instance.
///
/// # Arguments
///
/// * `$kind` - The ElementKind
/// * `$ty` - The TypeExpr held by the prototype
///
/// # Example
///
/// ```ignore
/// let proto = MK_PROTO!(ElementKind::Object, TypeExpr::Basic(BasicType::Int32));
/// ```
#[macro_export]
macro_rules! MK_PROTO {
    ($kind:expr, $ty:expr) => {
        ElementProto {
            kind: $kind,
            type_expr: $ty,
            is_const: false,
        }
    };
    ($kind:expr, $ty:expr, const) => {
        ElementProto {
            kind: $kind,
            type_expr: $ty,
            is_const: true,
        }
    };
}
