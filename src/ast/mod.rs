//! AST (Abstract Syntax Tree) module.
//!
//! Contains all definitions related to the resolvable AST structure:
//!
//! - ast: The node arena, the Node sum type and scope traversal
//! - decl: Payload structs for declarations, statements and modules
//! - types: Type expressions, element prototypes and name expressions

pub mod ast;
pub mod decl;
pub mod types;
