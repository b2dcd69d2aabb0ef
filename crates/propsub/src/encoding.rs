//! text encodings for resource and property files
//!
//! Every file of a run is read and written with the same [Encoding]. Only
//! encodings that map one-to-one onto unicode scalar values without lookup
//! tables are supported:
//! - `UTF-8`
//! - `ISO-8859-1` (Latin-1, each byte is the code point)
//! - `US-ASCII` (7 bit)
//!
//! Names are matched case-insensitively with `-`/`_` ignored, so `utf8`,
//! `UTF-8` and `Utf_8` are all the same encoding.
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Encoding {
    #[default]
    Utf8,
    Latin1,
    Ascii,
}

impl Encoding {
    pub fn name(&self) -> &'static str {
        match self {
            Encoding::Utf8 => "UTF-8",
            Encoding::Latin1 => "ISO-8859-1",
            Encoding::Ascii => "US-ASCII",
        }
    }

    pub fn decode(&self, bytes: &[u8]) -> Result<String, EncodingError> {
        match self {
            Encoding::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|e| EncodingError::Malformed {
                    encoding: *self,
                    offset: e.valid_up_to(),
                }),
            Encoding::Latin1 => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            Encoding::Ascii => match bytes.iter().position(|b| !b.is_ascii()) {
                Some(offset) => Err(EncodingError::Malformed {
                    encoding: *self,
                    offset,
                }),
                None => Ok(bytes.iter().map(|&b| char::from(b)).collect()),
            },
        }
    }

    pub fn encode(&self, text: &str) -> Result<Vec<u8>, EncodingError> {
        let limit = match self {
            Encoding::Utf8 => return Ok(text.as_bytes().to_vec()),
            Encoding::Latin1 => 0xFF,
            Encoding::Ascii => 0x7F,
        };

        text.chars()
            .map(|character| {
                u8::try_from(u32::from(character))
                    .ok()
                    .filter(|byte| u32::from(*byte) <= limit)
                    .ok_or(EncodingError::Unmappable {
                        encoding: *self,
                        character,
                    })
            })
            .collect()
    }
}

impl FromStr for Encoding {
    type Err = UnsupportedEncoding;

    fn from_str(name: &str) -> Result<Self, Self::Err> {
        let normalized: String = name
            .chars()
            .filter(|c| !matches!(c, '-' | '_'))
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match normalized.as_str() {
            "utf8" => Ok(Encoding::Utf8),
            "iso88591" | "latin1" | "l1" | "cp819" => Ok(Encoding::Latin1),
            "usascii" | "ascii" => Ok(Encoding::Ascii),
            _ => Err(UnsupportedEncoding(name.to_string())),
        }
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("Unsupported encoding {0:?}")]
pub struct UnsupportedEncoding(pub String);

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Malformed {encoding} input at byte {offset}")]
    Malformed { encoding: Encoding, offset: usize },
    #[error("Character {character:?} cannot be encoded as {encoding}")]
    Unmappable { encoding: Encoding, character: char },
}
