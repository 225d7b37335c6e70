//! Payload transformers.

use std::io::{Cursor, Read, Write};

use base64::Engine;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::{StoreError, StoreResult};

/// How expensive a transform is to run.
///
/// Async stores run `Inline` transforms on the calling task and offload
/// `Blocking` ones to the blocking thread pool so the scheduler is not
/// stalled for the duration of, say, a compression pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransformCost {
    #[default]
    Inline,
    Blocking,
}

/// A reversible payload transformation.
///
/// Law: `reverse_transform(transform(x)?)? == x` for every `x` in the domain
/// the transformer targets.
pub trait DataTransformer: Send + Sync {
    /// The logical value exposed to callers of the transforming store.
    type Value;

    /// Turn a logical value into the bytes handed to the child store.
    fn transform(&self, value: Self::Value) -> StoreResult<Vec<u8>>;

    /// Turn bytes read from the child store back into a logical value.
    fn reverse_transform(&self, data: Vec<u8>) -> StoreResult<Self::Value>;

    /// Execution-cost hint for the async flavor.
    fn cost(&self) -> TransformCost {
        TransformCost::Inline
    }
}

/// The no-op transformer.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentityTransformer;

impl DataTransformer for IdentityTransformer {
    type Value = Vec<u8>;

    fn transform(&self, value: Vec<u8>) -> StoreResult<Vec<u8>> {
        Ok(value)
    }

    fn reverse_transform(&self, data: Vec<u8>) -> StoreResult<Vec<u8>> {
        Ok(data)
    }
}

// ---------------------------------------------------------------------------
// Text
// ---------------------------------------------------------------------------

/// Character encodings supported by [`TextEncodingTransformer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextEncoding {
    Utf8,
    Ascii,
    Latin1,
}

impl TextEncoding {
    /// Parse an encoding label such as `"utf-8"` or `"latin-1"`.
    pub fn from_label(label: &str) -> StoreResult<Self> {
        match label.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "ascii" | "us-ascii" => Ok(Self::Ascii),
            "latin-1" | "latin1" | "iso-8859-1" => Ok(Self::Latin1),
            other => Err(StoreError::Configuration(format!(
                "unsupported text encoding: {other}"
            ))),
        }
    }
}

/// Strings encoded to bytes with a configurable character encoding.
#[derive(Clone, Copy, Debug)]
pub struct TextEncodingTransformer {
    encoding: TextEncoding,
}

impl TextEncodingTransformer {
    /// A transformer for the given encoding.
    pub fn new(encoding: TextEncoding) -> Self {
        Self { encoding }
    }

    /// A transformer for an encoding label (see [`TextEncoding::from_label`]).
    pub fn from_label(label: &str) -> StoreResult<Self> {
        Ok(Self::new(TextEncoding::from_label(label)?))
    }

    pub fn encoding(&self) -> TextEncoding {
        self.encoding
    }
}

impl Default for TextEncodingTransformer {
    fn default() -> Self {
        Self::new(TextEncoding::Utf8)
    }
}

impl DataTransformer for TextEncodingTransformer {
    type Value = String;

    fn transform(&self, value: String) -> StoreResult<Vec<u8>> {
        match self.encoding {
            TextEncoding::Utf8 => Ok(value.into_bytes()),
            TextEncoding::Ascii => {
                if value.is_ascii() {
                    Ok(value.into_bytes())
                } else {
                    Err(StoreError::codec("text is not representable in ascii"))
                }
            }
            TextEncoding::Latin1 => value
                .chars()
                .map(|c| {
                    u8::try_from(u32::from(c)).map_err(|_| {
                        StoreError::codec(format!("character {c:?} is not representable in latin-1"))
                    })
                })
                .collect(),
        }
    }

    fn reverse_transform(&self, data: Vec<u8>) -> StoreResult<String> {
        match self.encoding {
            TextEncoding::Utf8 => String::from_utf8(data).map_err(StoreError::codec),
            TextEncoding::Ascii => {
                if data.is_ascii() {
                    String::from_utf8(data).map_err(StoreError::codec)
                } else {
                    Err(StoreError::codec("stored bytes are not ascii"))
                }
            }
            TextEncoding::Latin1 => Ok(data.into_iter().map(char::from).collect()),
        }
    }
}

// ---------------------------------------------------------------------------
// Compression
// ---------------------------------------------------------------------------

/// Gzip compression.
#[derive(Clone, Copy, Debug)]
pub struct GzipTransformer {
    level: u32,
}

impl GzipTransformer {
    /// Compression level 0-9.
    pub fn with_level(level: u32) -> StoreResult<Self> {
        if level > 9 {
            return Err(StoreError::Configuration(format!(
                "gzip level must be 0-9, got {level}"
            )));
        }
        Ok(Self { level })
    }
}

impl Default for GzipTransformer {
    fn default() -> Self {
        Self { level: 6 }
    }
}

impl DataTransformer for GzipTransformer {
    type Value = Vec<u8>;

    fn transform(&self, value: Vec<u8>) -> StoreResult<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::new(self.level));
        encoder.write_all(&value).map_err(StoreError::codec)?;
        encoder.finish().map_err(StoreError::codec)
    }

    fn reverse_transform(&self, data: Vec<u8>) -> StoreResult<Vec<u8>> {
        let mut decoder = GzDecoder::new(data.as_slice());
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).map_err(StoreError::codec)?;
        Ok(out)
    }

    fn cost(&self) -> TransformCost {
        TransformCost::Blocking
    }
}

/// Zstandard compression.
#[derive(Clone, Copy, Debug)]
pub struct ZstdTransformer {
    level: i32,
}

impl ZstdTransformer {
    pub fn with_level(level: i32) -> StoreResult<Self> {
        if !zstd::compression_level_range().contains(&level) {
            return Err(StoreError::Configuration(format!(
                "zstd level {level} out of range"
            )));
        }
        Ok(Self { level })
    }
}

impl Default for ZstdTransformer {
    fn default() -> Self {
        Self {
            level: zstd::DEFAULT_COMPRESSION_LEVEL,
        }
    }
}

impl DataTransformer for ZstdTransformer {
    type Value = Vec<u8>;

    fn transform(&self, value: Vec<u8>) -> StoreResult<Vec<u8>> {
        zstd::encode_all(value.as_slice(), self.level).map_err(StoreError::codec)
    }

    fn reverse_transform(&self, data: Vec<u8>) -> StoreResult<Vec<u8>> {
        zstd::decode_all(data.as_slice()).map_err(StoreError::codec)
    }

    fn cost(&self) -> TransformCost {
        TransformCost::Blocking
    }
}

// ---------------------------------------------------------------------------
// Buffers
// ---------------------------------------------------------------------------

/// A readable payload, as exposed by [`BufferTransformer`].
pub type Reader = Box<dyn Read + Send>;

/// Exposes a reader interface over a byte store.
///
/// `transform` drains the reader; `reverse_transform` hands back a fresh
/// cursor positioned at the start, independent of any earlier reader.
#[derive(Clone, Copy, Debug, Default)]
pub struct BufferTransformer;

impl DataTransformer for BufferTransformer {
    type Value = Reader;

    fn transform(&self, mut value: Reader) -> StoreResult<Vec<u8>> {
        let mut out = Vec::new();
        value.read_to_end(&mut out)?;
        Ok(out)
    }

    fn reverse_transform(&self, data: Vec<u8>) -> StoreResult<Reader> {
        Ok(Box::new(Cursor::new(data)))
    }
}

// ---------------------------------------------------------------------------
// Base64 / JSON
// ---------------------------------------------------------------------------

/// Standard-alphabet base64 of the payload.
#[derive(Clone, Copy, Debug, Default)]
pub struct Base64Transformer;

impl DataTransformer for Base64Transformer {
    type Value = Vec<u8>;

    fn transform(&self, value: Vec<u8>) -> StoreResult<Vec<u8>> {
        Ok(base64::engine::general_purpose::STANDARD
            .encode(value)
            .into_bytes())
    }

    fn reverse_transform(&self, data: Vec<u8>) -> StoreResult<Vec<u8>> {
        base64::engine::general_purpose::STANDARD
            .decode(data)
            .map_err(StoreError::codec)
    }
}

/// JSON documents serialized as UTF-8 text.
#[derive(Clone, Copy, Debug, Default)]
pub struct JsonTransformer;

impl DataTransformer for JsonTransformer {
    type Value = serde_json::Value;

    fn transform(&self, value: serde_json::Value) -> StoreResult<Vec<u8>> {
        serde_json::to_vec(&value).map_err(StoreError::codec)
    }

    fn reverse_transform(&self, data: Vec<u8>) -> StoreResult<serde_json::Value> {
        serde_json::from_slice(&data).map_err(StoreError::codec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn round_trip<T: DataTransformer>(t: &T, value: T::Value) -> T::Value {
        let encoded = t.transform(value).unwrap();
        t.reverse_transform(encoded).unwrap()
    }

    #[test]
    fn identity_is_noop() {
        let t = IdentityTransformer;
        let data = b"abc\x00\xff".to_vec();
        assert_eq!(t.transform(data.clone()).unwrap(), data);
        assert_eq!(t.reverse_transform(data.clone()).unwrap(), data);
        assert_eq!(t.cost(), TransformCost::Inline);
    }

    // -----------------------------------------------------------------------
    // Text
    // -----------------------------------------------------------------------

    #[test]
    fn utf8_round_trip() {
        let t = TextEncodingTransformer::default();
        assert_eq!(round_trip(&t, "Hello π 世界".into()), "Hello π 世界");
    }

    #[test]
    fn latin1_encodes_one_byte_per_char() {
        let t = TextEncodingTransformer::from_label("latin-1").unwrap();
        let bytes = t.transform("café".into()).unwrap();
        assert_eq!(bytes, vec![b'c', b'a', b'f', 0xe9]);
        assert_eq!(t.reverse_transform(bytes).unwrap(), "café");
        assert!(t.transform("π".into()).is_err());
    }

    #[test]
    fn ascii_rejects_non_ascii() {
        let t = TextEncodingTransformer::from_label("ascii").unwrap();
        assert!(t.transform("héllo".into()).is_err());
        assert!(t.reverse_transform(vec![0xff]).is_err());
    }

    #[test]
    fn invalid_utf8_is_codec_error() {
        let t = TextEncodingTransformer::default();
        let err = t.reverse_transform(vec![0xff, 0xfe]).unwrap_err();
        assert!(matches!(err, StoreError::Codec(_)));
    }

    #[test]
    fn unknown_label_is_configuration_error() {
        let err = TextEncodingTransformer::from_label("ebcdic").unwrap_err();
        assert!(matches!(err, StoreError::Configuration(_)));
    }

    // -----------------------------------------------------------------------
    // Compression
    // -----------------------------------------------------------------------

    #[test]
    fn gzip_shrinks_compressible_data() {
        let t = GzipTransformer::default();
        let data = vec![b'A'; 1024];
        let gz = t.transform(data.clone()).unwrap();
        assert!(gz.len() < data.len());
        assert_eq!(t.reverse_transform(gz).unwrap(), data);
        assert_eq!(t.cost(), TransformCost::Blocking);
    }

    #[test]
    fn gzip_rejects_garbage() {
        let t = GzipTransformer::default();
        assert!(t.reverse_transform(b"not gzip".to_vec()).is_err());
    }

    #[test]
    fn gzip_level_is_validated() {
        assert!(GzipTransformer::with_level(9).is_ok());
        assert!(GzipTransformer::with_level(10).is_err());
    }

    #[test]
    fn zstd_round_trip() {
        let t = ZstdTransformer::default();
        let data = b"zstd zstd zstd zstd zstd".repeat(20);
        assert_eq!(round_trip(&t, data.clone()), data);
        assert_eq!(t.cost(), TransformCost::Blocking);
    }

    // -----------------------------------------------------------------------
    // Buffers
    // -----------------------------------------------------------------------

    #[test]
    fn buffer_reverse_is_fresh_reader() {
        let t = BufferTransformer;
        let original = b"\x00\x01\x02hello".to_vec();
        let bytes = t.transform(Box::new(Cursor::new(original.clone()))).unwrap();
        assert_eq!(bytes, original);

        let mut first = t.reverse_transform(bytes.clone()).unwrap();
        let mut second = t.reverse_transform(bytes).unwrap();
        let mut a = Vec::new();
        first.read_to_end(&mut a).unwrap();
        let mut b = Vec::new();
        second.read_to_end(&mut b).unwrap();
        assert_eq!(a, original);
        assert_eq!(b, original);
    }

    // -----------------------------------------------------------------------
    // Base64 / JSON
    // -----------------------------------------------------------------------

    #[test]
    fn base64_encodes_to_ascii() {
        let t = Base64Transformer;
        let enc = t.transform(b"\x00\xffbinary".to_vec()).unwrap();
        assert!(enc.is_ascii());
        assert_eq!(t.reverse_transform(enc).unwrap(), b"\x00\xffbinary");
    }

    #[test]
    fn json_round_trip() {
        let t = JsonTransformer;
        let doc = serde_json::json!({"a": 1, "b": [true, null, "x"], "c": {"nested": "ok"}});
        assert_eq!(round_trip(&t, doc.clone()), doc);
    }

    #[test]
    fn json_rejects_invalid_document() {
        assert!(JsonTransformer.reverse_transform(b"{nope".to_vec()).is_err());
    }

    // -----------------------------------------------------------------------
    // Round-trip laws
    // -----------------------------------------------------------------------

    proptest! {
        #[test]
        fn gzip_law(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            prop_assert_eq!(round_trip(&GzipTransformer::default(), data.clone()), data);
        }

        #[test]
        fn zstd_law(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            prop_assert_eq!(round_trip(&ZstdTransformer::default(), data.clone()), data);
        }

        #[test]
        fn base64_law(data in proptest::collection::vec(any::<u8>(), 0..512)) {
            prop_assert_eq!(round_trip(&Base64Transformer, data.clone()), data);
        }

        #[test]
        fn utf8_law(text in ".*") {
            prop_assert_eq!(round_trip(&TextEncodingTransformer::default(), text.clone()), text);
        }

        #[test]
        fn latin1_law(text in "[\\x00-\\xff]*") {
            let t = TextEncodingTransformer::new(TextEncoding::Latin1);
            prop_assert_eq!(round_trip(&t, text.clone()), text);
        }
    }
}
