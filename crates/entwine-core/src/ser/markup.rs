use crate::{
    ser::{FormatCodec, Node, SerializeError, WireFormat},
    value::Value,
};
use indexmap::IndexMap;
use quick_xml::{
    Reader, Writer,
    events::{BytesEnd, BytesStart, BytesText, Event},
};

/// Root element for a single entity payload.
const ROOT_ELEMENT: &str = "entity";

/// Root element for a list payload.
const LIST_ROOT_ELEMENT: &str = "entities";

/// Root element for a bare scalar payload.
const VALUE_ELEMENT: &str = "value";

/// Reserved child name for list items. A field element whose children
/// are all `item` elements decodes as a list.
const ITEM_ELEMENT: &str = "item";

///
/// MarkupCodec
///
/// Element-structured markup format. Writing walks the node tree once;
/// reading is an event loop where recursion depth mirrors element
/// depth. Self-closing (`Empty`) elements are the explicit null form
/// and never open a depth level.
///

pub struct MarkupCodec;

impl FormatCodec for MarkupCodec {
    fn format(&self) -> WireFormat {
        WireFormat::Markup
    }

    fn encode(&self, node: &Node) -> Result<Vec<u8>, SerializeError> {
        let mut writer = Writer::new(Vec::new());
        let root = match node {
            Node::Object(_) => ROOT_ELEMENT,
            Node::List(_) => LIST_ROOT_ELEMENT,
            Node::Scalar(_) | Node::Text(_) => VALUE_ELEMENT,
        };
        write_element(&mut writer, root, node)?;

        Ok(writer.into_inner())
    }

    fn decode(&self, bytes: &[u8]) -> Result<Node, SerializeError> {
        let mut reader = Reader::from_reader(bytes);
        reader.config_mut().trim_text(true);

        let mut buf = Vec::new();
        loop {
            match reader
                .read_event_into(&mut buf)
                .map_err(|err| SerializeError::Decode(err.to_string()))?
            {
                Event::Start(_) => return parse_element(&mut reader),
                Event::Empty(_) => return Ok(Node::Scalar(Value::Null)),
                Event::Eof => {
                    return Err(SerializeError::Decode(
                        "document contains no root element".to_string(),
                    ));
                }
                _ => {}
            }
            buf.clear();
        }
    }
}

// ── Writing ─────────────────

fn write_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    node: &Node,
) -> Result<(), SerializeError> {
    match node {
        Node::Object(map) => {
            write_start(writer, name)?;
            for (child_name, child) in map {
                write_element(writer, child_name, child)?;
            }
            write_end(writer, name)
        }
        Node::List(items) => {
            write_start(writer, name)?;
            for item in items {
                write_element(writer, ITEM_ELEMENT, item)?;
            }
            write_end(writer, name)
        }
        Node::Scalar(Value::Null) => writer
            .write_event(Event::Empty(BytesStart::new(name)))
            .map_err(|err| SerializeError::Encode(err.to_string())),
        Node::Scalar(Value::Map(entries)) => {
            write_start(writer, name)?;
            for (child_name, child) in entries {
                write_element(writer, child_name, &Node::Scalar(child.clone()))?;
            }
            write_end(writer, name)
        }
        Node::Scalar(Value::List(items)) => {
            write_start(writer, name)?;
            for item in items {
                write_element(writer, ITEM_ELEMENT, &Node::Scalar(item.clone()))?;
            }
            write_end(writer, name)
        }
        Node::Scalar(value) => {
            let text = value
                .to_text()
                .map_err(|err| SerializeError::Encode(err.to_string()))?;
            write_text_element(writer, name, &text)
        }
        Node::Text(text) => write_text_element(writer, name, text),
    }
}

fn write_start(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<(), SerializeError> {
    writer
        .write_event(Event::Start(BytesStart::new(name)))
        .map_err(|err| SerializeError::Encode(err.to_string()))
}

fn write_end(writer: &mut Writer<Vec<u8>>, name: &str) -> Result<(), SerializeError> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(|err| SerializeError::Encode(err.to_string()))
}

fn write_text_element(
    writer: &mut Writer<Vec<u8>>,
    name: &str,
    text: &str,
) -> Result<(), SerializeError> {
    write_start(writer, name)?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(|err| SerializeError::Encode(err.to_string()))?;
    write_end(writer, name)
}

// ── Reading ─────────────────

/// Parse the children of the element whose `Start` event was just
/// consumed, up to its matching `End`.
fn parse_element(reader: &mut Reader<&[u8]>) -> Result<Node, SerializeError> {
    let mut children: Vec<(String, Node)> = Vec::new();
    let mut text: Option<String> = None;

    let mut buf = Vec::new();
    loop {
        match reader
            .read_event_into(&mut buf)
            .map_err(|err| SerializeError::Decode(err.to_string()))?
        {
            Event::Start(event) => {
                let name = element_name(event.name().as_ref());
                let child = parse_element(reader)?;
                children.push((name, child));
            }
            // Self-closing elements are the explicit null form; they
            // never open a depth level.
            Event::Empty(event) => {
                let name = element_name(event.name().as_ref());
                children.push((name, Node::Scalar(Value::Null)));
            }
            Event::Text(event) => {
                let unescaped = event
                    .unescape()
                    .map_err(|err| SerializeError::Decode(err.to_string()))?;
                text = Some(unescaped.into_owned());
            }
            Event::CData(event) => {
                text = Some(String::from_utf8_lossy(&event).into_owned());
            }
            Event::End(_) => break,
            Event::Eof => {
                return Err(SerializeError::Decode(
                    "unexpected end of document inside an element".to_string(),
                ));
            }
            _ => {}
        }
        buf.clear();
    }

    if !children.is_empty() {
        if children.iter().all(|(name, _)| name == ITEM_ELEMENT) {
            return Ok(Node::List(
                children.into_iter().map(|(_, node)| node).collect(),
            ));
        }

        let map: IndexMap<String, Node> = children.into_iter().collect();
        return Ok(Node::Object(map));
    }

    Ok(Node::Text(text.unwrap_or_default()))
}

fn element_name(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw).into_owned()
}
