//! Hex encoding for byte fields.
//!
//! Human readable formats (JSON) get lowercase hex strings, binary formats (CBOR)
//! get byte strings so canonical encodings stay compact.

pub use hex_buffer_serde::{Hex, HexForm};
use serde::de::{Deserialize, Deserializer};
use serde::ser::{Serialize, Serializer};

/// `#[serde(with = "hex_array")]` for `[u8; 32]`, usable where `Hex` is not in scope
pub mod hex_array {
    use super::*;

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error> {
        HexForm::<[u8; 32]>::serialize(bytes, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 32], D::Error> {
        HexForm::<[u8; 32]>::deserialize(deserializer)
    }
}

/// `#[serde(with = "hex_list")]` for `Vec<Vec<u8>>`
pub mod hex_list {
    use super::*;

    struct Item<'a>(&'a Vec<u8>);

    impl Serialize for Item<'_> {
        fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
            HexForm::<Vec<u8>>::serialize(self.0, serializer)
        }
    }

    #[derive(Deserialize)]
    struct OwnedItem(#[serde(with = "HexForm::<Vec<u8>>")] Vec<u8>);

    pub fn serialize<S: Serializer>(items: &[Vec<u8>], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(items.iter().map(Item))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<u8>>, D::Error> {
        let items = Vec::<OwnedItem>::deserialize(deserializer)?;
        Ok(items.into_iter().map(|item| item.0).collect())
    }
}

/// Declare a 32-byte public identifier that prints and serializes as hex.
macro_rules! hex_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Serialize, Deserialize, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(#[serde(with = "crate::serde_hex::hex_array")] pub [u8; 32]);

        impl $name {
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                use std::convert::TryInto;
                let bytes = hex::decode(s).map_err(|_| crate::Error::BadHex)?;
                let bytes: [u8; 32] = bytes.try_into().map_err(|_| crate::Error::BadLength)?;
                Ok($name(bytes))
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Sample {
        #[serde(with = "HexForm::<Vec<u8>>")]
        bytes: Vec<u8>,
        #[serde(with = "hex_array")]
        array: [u8; 32],
        #[serde(with = "hex_list")]
        list: Vec<Vec<u8>>,
    }

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Buffer(#[serde(with = "HexForm::<Vec<u8>>")] Vec<u8>);

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Fingerprint(#[serde(with = "hex_array")] [u8; 32]);

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Chain(#[serde(with = "hex_list")] Vec<Vec<u8>>);

    #[test]
    fn json_uses_hex_strings() {
        let sample = Sample {
            bytes: vec![0xde, 0xad],
            array: [7; 32],
            list: vec![vec![1], vec![0xff, 0x00]],
        };

        let json = serde_json::to_value(&sample).unwrap();
        assert_eq!(json["bytes"], "dead");
        assert_eq!(json["list"][1], "ff00");

        let back: Sample = serde_json::from_value(json).unwrap();
        assert_eq!(back, sample);

        let cbor = serde_cbor::to_vec(&sample).unwrap();
        let back: Sample = serde_cbor::from_slice(&cbor).unwrap();
        assert_eq!(back, sample);
    }

    #[test]
    fn cbor_uses_byte_strings() {
        // Major type 2, one-byte length follows
        let cbor = serde_cbor::to_vec(&Buffer(vec![0xab; 64])).unwrap();
        assert_eq!(cbor.len(), 66);
        assert_eq!(&cbor[..2], &[0x58, 64]);
        assert_eq!(serde_cbor::from_slice::<Buffer>(&cbor).unwrap().0, vec![0xab; 64]);

        let cbor = serde_cbor::to_vec(&Fingerprint([1; 32])).unwrap();
        assert_eq!(cbor.len(), 34);
        assert_eq!(&cbor[..2], &[0x58, 32]);
        assert_eq!(serde_cbor::from_slice::<Fingerprint>(&cbor).unwrap().0, [1; 32]);

        // An array of two byte strings
        let chain = Chain(vec![vec![1], vec![0xff, 0x00]]);
        let cbor = serde_cbor::to_vec(&chain).unwrap();
        assert_eq!(cbor, vec![0x82, 0x41, 0x01, 0x42, 0xff, 0x00]);
        assert_eq!(serde_cbor::from_slice::<Chain>(&cbor).unwrap(), chain);
    }

    #[test]
    fn wrong_array_length_is_rejected() {
        let json = serde_json::json!({"bytes": "", "array": "abcd", "list": []});
        assert!(serde_json::from_value::<Sample>(json).is_err());

        let cbor = serde_cbor::to_vec(&Buffer(vec![1; 31])).unwrap();
        assert!(serde_cbor::from_slice::<Fingerprint>(&cbor).is_err());
    }
}
