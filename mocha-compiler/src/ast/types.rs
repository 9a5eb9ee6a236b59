use serde::{Deserialize, Serialize};

use super::ClassId;

/// A checked type.  The primitives compare by value, which stands in for the
/// front end's shared type singletons; class types carry the resolved class
/// id, so equivalence is plain equality all the way down.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Type {
    Int,
    Double,
    Bool,
    Str,
    Void,
    Null,
    Error,
    Named(ClassId),
    Array(Box<Type>),
}

impl Type {
    pub fn array_of(elem: Type) -> Type {
        Type::Array(Box::new(elem))
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Double => write!(f, "double"),
            Type::Bool => write!(f, "bool"),
            Type::Str => write!(f, "string"),
            Type::Void => write!(f, "void"),
            Type::Null => write!(f, "null"),
            Type::Error => write!(f, "error"),
            Type::Named(id) => write!(f, "class#{id}"),
            Type::Array(elem) => write!(f, "{elem}[]"),
        }
    }
}
