// Transport decoders for diagram text received in query parameters.

use base64::{
    Engine as _, alphabet,
    engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig},
};
use thiserror::Error;

// URL-safe alphabet without padding. Unused bits in the final symbol are ignored, so
// encoders that leave them non-zero are still understood.
const BASE64_URL_LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::RequireNone)
        .with_decode_allow_trailing_bits(true),
);

/// How a diagram parameter was encoded by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    Identity,
    /// URL-safe alphabet, no `=` padding.
    Base64Url,
    Hex,
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid base64url data: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("invalid hex data: {0}")]
    Hex(#[from] hex::FromHexError),

    #[error("decoded diagram is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

impl Encoding {
    pub fn decode(self, input: &str) -> Result<String, DecodeError> {
        let bytes = match self {
            Encoding::Identity => return Ok(input.to_owned()),
            Encoding::Base64Url => BASE64_URL_LENIENT.decode(input)?,
            Encoding::Hex => hex::decode(input)?,
        };
        Ok(String::from_utf8(bytes)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::prelude::{BASE64_URL_SAFE_NO_PAD, Engine as _};

    #[test]
    fn test_identity_passes_text_through() {
        let text = "a -> b: \"hello\" %2B";
        assert_eq!(Encoding::Identity.decode(text).unwrap(), text);
    }

    #[test]
    fn test_base64url_decodes_unpadded_input() {
        let encoded = BASE64_URL_SAFE_NO_PAD.encode("x -> y?");
        assert!(!encoded.ends_with('='));
        assert_eq!(Encoding::Base64Url.decode(&encoded).unwrap(), "x -> y?");
    }

    #[test]
    fn test_base64url_ignores_trailing_bits() {
        // `YQ` is the canonical form; `YR` sets a bit past the end of the data
        assert_eq!(Encoding::Base64Url.decode("YQ").unwrap(), "a");
        assert_eq!(Encoding::Base64Url.decode("YR").unwrap(), "a");
    }

    #[test]
    fn test_base64url_rejects_standard_alphabet() {
        assert!(matches!(
            Encoding::Base64Url.decode("ab+/"),
            Err(DecodeError::Base64(_))
        ));
    }

    #[test]
    fn test_base64url_rejects_padding() {
        assert!(matches!(
            Encoding::Base64Url.decode("YQ=="),
            Err(DecodeError::Base64(_))
        ));
    }

    #[test]
    fn test_hex_decodes_mixed_case() {
        assert_eq!(Encoding::Hex.decode("612D3E62").unwrap(), "a->b");
        assert_eq!(Encoding::Hex.decode("612d3e62").unwrap(), "a->b");
    }

    #[test]
    fn test_hex_rejects_odd_length() {
        assert!(matches!(
            Encoding::Hex.decode("abc"),
            Err(DecodeError::Hex(hex::FromHexError::OddLength))
        ));
    }

    #[test]
    fn test_hex_rejects_non_hex_digit() {
        assert!(matches!(
            Encoding::Hex.decode("zz"),
            Err(DecodeError::Hex(hex::FromHexError::InvalidHexCharacter { .. }))
        ));
    }

    #[test]
    fn test_invalid_utf8_is_not_substituted() {
        assert!(matches!(
            Encoding::Hex.decode("ff00"),
            Err(DecodeError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn test_empty_input_decodes_to_empty_text() {
        assert_eq!(Encoding::Base64Url.decode("").unwrap(), "");
        assert_eq!(Encoding::Hex.decode("").unwrap(), "");
    }
}
