use crate::{
    ser::{FormatCodec, Node, SerializeError, WireFormat},
    value::Value,
};
use serde_json::{Map, Number, Value as JsonValue};

///
/// JsonCodec
///
/// Tree-structured text format. One forward pass over the node tree in
/// each direction; object member order is preserved, so a discriminator
/// emitted first stays first on the wire.
///

pub struct JsonCodec;

impl FormatCodec for JsonCodec {
    fn format(&self) -> WireFormat {
        WireFormat::Json
    }

    fn encode(&self, node: &Node) -> Result<Vec<u8>, SerializeError> {
        let json = node_to_json(node)?;
        serde_json::to_vec(&json).map_err(|err| SerializeError::Encode(err.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<Node, SerializeError> {
        let json: JsonValue =
            serde_json::from_slice(bytes).map_err(|err| SerializeError::Decode(err.to_string()))?;

        Ok(json_to_node(&json))
    }
}

fn node_to_json(node: &Node) -> Result<JsonValue, SerializeError> {
    match node {
        Node::Object(map) => {
            let mut out = Map::with_capacity(map.len());
            for (name, child) in map {
                out.insert(name.clone(), node_to_json(child)?);
            }
            Ok(JsonValue::Object(out))
        }
        Node::List(items) => Ok(JsonValue::Array(
            items.iter().map(node_to_json).collect::<Result<_, _>>()?,
        )),
        Node::Scalar(value) => value_to_json(value),
        Node::Text(text) => Ok(JsonValue::String(text.clone())),
    }
}

fn value_to_json(value: &Value) -> Result<JsonValue, SerializeError> {
    match value {
        Value::Bool(v) => Ok(JsonValue::Bool(*v)),
        Value::Int(v) => Ok(JsonValue::Number(Number::from(*v))),
        Value::Uint(v) => Ok(JsonValue::Number(Number::from(*v))),
        Value::Float(v) => Number::from_f64(*v).map(JsonValue::Number).ok_or_else(|| {
            SerializeError::Encode("non-finite float has no JSON representation".to_string())
        }),
        Value::Text(v) => Ok(JsonValue::String(v.clone())),
        Value::Null => Ok(JsonValue::Null),
        Value::List(items) => Ok(JsonValue::Array(
            items.iter().map(value_to_json).collect::<Result<_, _>>()?,
        )),
        Value::Map(entries) => {
            let mut out = Map::with_capacity(entries.len());
            for (name, child) in entries {
                out.insert(name.clone(), value_to_json(child)?);
            }
            Ok(JsonValue::Object(out))
        }
        // Blob and Ulid travel as their canonical text form.
        Value::Blob(_) | Value::Ulid(_) => {
            let text = value
                .to_text()
                .map_err(|err| SerializeError::Encode(err.to_string()))?;
            Ok(JsonValue::String(text))
        }
    }
}

fn json_to_node(json: &JsonValue) -> Node {
    match json {
        JsonValue::Null => Node::Scalar(Value::Null),
        JsonValue::Bool(v) => Node::Scalar(Value::Bool(*v)),
        JsonValue::Number(n) => Node::Scalar(number_to_value(n)),
        // Strings stay untyped until the engine re-types them against
        // the declared field kind.
        JsonValue::String(s) => Node::Text(s.clone()),
        JsonValue::Array(items) => Node::List(items.iter().map(json_to_node).collect()),
        JsonValue::Object(map) => Node::Object(
            map.iter()
                .map(|(name, child)| (name.clone(), json_to_node(child)))
                .collect(),
        ),
    }
}

fn number_to_value(number: &Number) -> Value {
    if let Some(v) = number.as_i64() {
        Value::Int(v)
    } else if let Some(v) = number.as_u64() {
        Value::Uint(v)
    } else {
        Value::Float(number.as_f64().unwrap_or(f64::NAN))
    }
}
