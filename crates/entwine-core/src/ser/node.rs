use crate::value::Value;
use indexmap::IndexMap;

///
/// Node
///
/// Format-neutral tree both codecs encode from and decode into. The
/// engine walks this tree; codecs only translate it to and from bytes.
///
/// `Text` carries scalars whose wire form is untyped text (every markup
/// scalar, JSON strings); the engine re-types them against the declared
/// field kind.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    Object(IndexMap<String, Node>),
    List(Vec<Node>),
    Scalar(Value),
    Text(String),
}

impl Node {
    #[must_use]
    pub const fn as_object(&self) -> Option<&IndexMap<String, Self>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_list(&self) -> Option<&[Self]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Scalar(Value::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Whether this node carries an explicit wire null.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(Value::Null))
    }
}
