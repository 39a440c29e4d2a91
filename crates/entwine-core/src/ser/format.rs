use crate::ser::{Node, SerializeError, json::JsonCodec, markup::MarkupCodec};
use std::{
    fmt::{self, Display},
    sync::{Arc, LazyLock, RwLock},
};

///
/// WireFormat
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum WireFormat {
    /// Tree-structured text (JSON).
    Json,
    /// Element-structured markup (XML).
    Markup,
    /// An externally registered format.
    Custom(&'static str),
}

impl Display for WireFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Markup => f.write_str("markup"),
            Self::Custom(name) => f.write_str(name),
        }
    }
}

///
/// FormatCodec
///
/// Byte-level encoder/decoder for one wire format. Codecs translate
/// between bytes and the format-neutral node tree; the engine owns the
/// catalog walk.
///

pub trait FormatCodec: Send + Sync {
    fn format(&self) -> WireFormat;

    /// Reject option snapshots this codec cannot honor. The built-in
    /// codecs accept everything the engine itself understands.
    fn validate_options(&self, options: &crate::ser::SerializerOptions) -> Result<(), SerializeError> {
        let _ = options;
        Ok(())
    }

    fn encode(&self, node: &Node) -> Result<Vec<u8>, SerializeError>;

    fn decode(&self, bytes: &[u8]) -> Result<Node, SerializeError>;
}

///
/// CODECS
/// registered format handlers, built-ins first
///

static CODECS: LazyLock<RwLock<Vec<Arc<dyn FormatCodec>>>> = LazyLock::new(|| {
    RwLock::new(vec![
        Arc::new(JsonCodec) as Arc<dyn FormatCodec>,
        Arc::new(MarkupCodec),
    ])
});

/// Register a codec for an additional format.
pub fn register_codec(codec: Arc<dyn FormatCodec>) {
    CODECS
        .write()
        .expect("codec registry lock poisoned")
        .push(codec);
}

/// The codec claiming a format.
pub(crate) fn codec_for(format: WireFormat) -> Result<Arc<dyn FormatCodec>, SerializeError> {
    CODECS
        .read()
        .expect("codec registry lock poisoned")
        .iter()
        .find(|codec| codec.format() == format)
        .cloned()
        .ok_or(SerializeError::NoSerializerForType { format })
}
