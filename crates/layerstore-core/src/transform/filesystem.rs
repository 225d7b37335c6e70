//! Filesystem-safe key encoding.
//!
//! Keys become RFC 4648 base32 (upper-case alphabet) of their UTF-8 bytes with
//! `=` padding replaced by `_`. The output never starts with a dot, never
//! contains a path separator, and a full 8-character block is longer than any
//! Windows reserved device name.

use data_encoding::BASE32;

use crate::error::{StoreError, StoreResult};
use crate::transform::KeyTransformer;

const PAD: char = '_';

/// Encodes arbitrary keys into names that are valid on every common filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FilesystemSafeKeyTransformer;

impl KeyTransformer for FilesystemSafeKeyTransformer {
    fn transform_key(&self, key: &str) -> StoreResult<String> {
        if key.is_empty() {
            return Ok(PAD.to_string());
        }
        Ok(BASE32.encode(key.as_bytes()).replace('=', "_"))
    }

    fn reverse_transform_key(&self, key: &str) -> StoreResult<String> {
        if key == "_" {
            return Ok(String::new());
        }
        let rejected = || StoreError::key_rejected(key, "not a filesystem-safe encoded name");
        // Padding is only valid as a trailing run; `=` never appears in our names.
        if key.is_empty() || key.contains('=') || key.trim_end_matches(PAD).contains(PAD) {
            return Err(rejected());
        }
        let bytes = BASE32
            .decode(key.replace(PAD, "=").as_bytes())
            .map_err(|_| rejected())?;
        String::from_utf8(bytes)
            .map_err(|_| StoreError::key_rejected(key, "decoded name is not valid UTF-8"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn rfc4648_vectors() {
        let t = FilesystemSafeKeyTransformer;
        let cases = [
            ("f", "MY______"),
            ("fo", "MZXQ____"),
            ("foo", "MZXW6___"),
            ("foob", "MZXW6YQ_"),
            ("fooba", "MZXW6YTB"),
            ("foobar", "MZXW6YTBOI______"),
        ];
        for (key, encoded) in cases {
            assert_eq!(t.transform_key(key).unwrap(), encoded);
            assert_eq!(t.reverse_transform_key(encoded).unwrap(), key);
        }
    }

    #[test]
    fn empty_key_is_a_single_underscore() {
        let t = FilesystemSafeKeyTransformer;
        assert_eq!(t.transform_key("").unwrap(), "_");
        assert_eq!(t.reverse_transform_key("_").unwrap(), "");
    }

    #[test]
    fn output_is_filesystem_safe() {
        let t = FilesystemSafeKeyTransformer;
        for key in ["../etc/passwd", ".hidden", "CON", "a\\b:c*d?", "名前"] {
            let name = t.transform_key(key).unwrap();
            assert!(!name.starts_with('.'));
            assert!(name
                .bytes()
                .all(|c| c.is_ascii_uppercase() || (b'2'..=b'7').contains(&c) || c == b'_'));
        }
    }

    #[test]
    fn reverse_rejects_foreign_names() {
        let t = FilesystemSafeKeyTransformer;
        for name in [
            "lowercase",
            "MZXW6",
            "MZXW6!__",
            "M_XW6___",
            "MY______MY______",
            "MY======",
            "MZ______",
            "",
        ] {
            let err = t.reverse_transform_key(name).unwrap_err();
            assert!(matches!(err, StoreError::KeyRejected { .. }), "{name}");
        }
    }

    proptest! {
        #[test]
        fn round_trips_arbitrary_unicode(key in "\\PC*") {
            let t = FilesystemSafeKeyTransformer;
            let name = t.transform_key(&key).unwrap();
            prop_assert_eq!(t.reverse_transform_key(&name).unwrap(), key);
        }
    }
}
