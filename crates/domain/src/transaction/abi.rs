//! Contract ABI encoding for call data.
//!
//! Covers the elementary Solidity types (`address`, `bool`, `uintN`, `intN`,
//! `bytesN`, `bytes`, `string`). Arrays and tuples are rejected.

use sha3::{Digest, Keccak256};

use crate::error::ConfigurationError;

type Word = [u8; 32];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamType {
    Address,
    Bool,
    Uint(usize),
    Int(usize),
    FixedBytes(usize),
    Bytes,
    String,
}

impl ParamType {
    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "address" => return Some(Self::Address),
            "bool" => return Some(Self::Bool),
            "string" => return Some(Self::String),
            "bytes" => return Some(Self::Bytes),
            "uint" => return Some(Self::Uint(256)),
            "int" => return Some(Self::Int(256)),
            _ => {}
        }
        if let Some(bits) = raw.strip_prefix("uint") {
            return integer_width(bits).map(Self::Uint);
        }
        if let Some(bits) = raw.strip_prefix("int") {
            return integer_width(bits).map(Self::Int);
        }
        if let Some(len) = raw.strip_prefix("bytes") {
            let len: usize = len.parse().ok()?;
            return (1..=32).contains(&len).then_some(Self::FixedBytes(len));
        }
        None
    }

    fn canonical(self) -> String {
        match self {
            Self::Address => "address".to_string(),
            Self::Bool => "bool".to_string(),
            Self::Uint(bits) => format!("uint{bits}"),
            Self::Int(bits) => format!("int{bits}"),
            Self::FixedBytes(len) => format!("bytes{len}"),
            Self::Bytes => "bytes".to_string(),
            Self::String => "string".to_string(),
        }
    }

    fn is_dynamic(self) -> bool {
        matches!(self, Self::Bytes | Self::String)
    }
}

fn integer_width(bits: &str) -> Option<usize> {
    let bits: usize = bits.parse().ok()?;
    (bits % 8 == 0 && (8..=256).contains(&bits)).then_some(bits)
}

/// Keccak-256 digest of `data`.
#[must_use]
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    Keccak256::digest(data).into()
}

/// ABI-encode a call to `function` with `args`, returning `0x`-prefixed hex
/// call data (4-byte selector followed by the encoded arguments).
///
/// # Errors
///
/// Returns [`ConfigurationError::InvalidAbi`] when the ABI is not an array,
/// declares no matching function, or uses an unsupported parameter type, and
/// [`ConfigurationError::InvalidArgument`] when an argument does not fit its
/// declared type.
pub fn encode_call(
    abi: &serde_json::Value,
    function: &str,
    args: &[serde_json::Value],
) -> Result<String, ConfigurationError> {
    let invalid = |reason: String| ConfigurationError::InvalidAbi {
        function: function.to_string(),
        reason,
    };

    let fragments = abi
        .as_array()
        .ok_or_else(|| invalid("ABI must be a JSON array".to_string()))?;
    let candidates: Vec<&serde_json::Value> = fragments
        .iter()
        .filter(|f| f.get("type").is_none_or(|t| t.as_str() == Some("function")))
        .filter(|f| f.get("name").and_then(|n| n.as_str()) == Some(function))
        .collect();
    if candidates.is_empty() {
        return Err(invalid("function not declared".to_string()));
    }
    let fragment = candidates
        .into_iter()
        .find(|f| input_count(f) == args.len())
        .ok_or_else(|| invalid(format!("no overload takes {} arguments", args.len())))?;

    let params = fragment
        .get("inputs")
        .and_then(|i| i.as_array())
        .map(Vec::as_slice)
        .unwrap_or_default()
        .iter()
        .map(|input| {
            let raw = input.get("type").and_then(|t| t.as_str()).unwrap_or_default();
            ParamType::parse(raw).ok_or_else(|| invalid(format!("unsupported parameter type `{raw}`")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let signature = format!(
        "{function}({})",
        params
            .iter()
            .map(|p| p.canonical())
            .collect::<Vec<_>>()
            .join(",")
    );
    let mut data = keccak256(signature.as_bytes())[..4].to_vec();
    data.extend(encode_params(&params, args)?);
    Ok(format!("0x{}", hex::encode(data)))
}

fn input_count(fragment: &serde_json::Value) -> usize {
    fragment
        .get("inputs")
        .and_then(|i| i.as_array())
        .map_or(0, Vec::len)
}

fn encode_params(
    params: &[ParamType],
    args: &[serde_json::Value],
) -> Result<Vec<u8>, ConfigurationError> {
    let head_size = params.len() * 32;
    let mut head = Vec::with_capacity(head_size);
    let mut tail = Vec::new();

    for (index, (param, arg)) in params.iter().zip(args).enumerate() {
        let argument_error = |reason: String| ConfigurationError::InvalidArgument {
            index,
            kind: param.canonical(),
            reason,
        };
        if param.is_dynamic() {
            let bytes = match param {
                ParamType::String => arg
                    .as_str()
                    .ok_or_else(|| argument_error("expected a string".to_string()))?
                    .as_bytes()
                    .to_vec(),
                _ => decode_hex(arg).map_err(argument_error)?,
            };
            head.extend(usize_word(head_size + tail.len()));
            tail.extend(usize_word(bytes.len()));
            tail.extend(pad_right(&bytes));
        } else {
            head.extend(encode_static(*param, arg).map_err(argument_error)?);
        }
    }

    head.extend(tail);
    Ok(head)
}

fn encode_static(param: ParamType, arg: &serde_json::Value) -> Result<Word, String> {
    match param {
        ParamType::Address => {
            let bytes = decode_hex(arg)?;
            if bytes.len() != 20 {
                return Err(format!("expected 20 bytes, got {}", bytes.len()));
            }
            let mut word = [0u8; 32];
            word[12..].copy_from_slice(&bytes);
            Ok(word)
        }
        ParamType::Bool => {
            let flag = match arg {
                serde_json::Value::Bool(b) => *b,
                serde_json::Value::String(s) if s == "true" => true,
                serde_json::Value::String(s) if s == "false" => false,
                _ => return Err("expected a boolean".to_string()),
            };
            let mut word = [0u8; 32];
            word[31] = u8::from(flag);
            Ok(word)
        }
        ParamType::Uint(bits) => {
            let (negative, word) = parse_integer(arg)?;
            if negative && !is_zero(&word) {
                return Err("negative value for unsigned type".to_string());
            }
            if bit_len(&word) > bits {
                return Err(format!("value does not fit in {bits} bits"));
            }
            Ok(word)
        }
        ParamType::Int(bits) => {
            let (negative, magnitude) = parse_integer(arg)?;
            let len = bit_len(&magnitude);
            let fits = len < bits || (negative && len == bits && is_power_of_two(&magnitude));
            if !fits {
                return Err(format!("value does not fit in {bits} bits"));
            }
            Ok(if negative {
                twos_complement(magnitude)
            } else {
                magnitude
            })
        }
        ParamType::FixedBytes(len) => {
            let bytes = decode_hex(arg)?;
            if bytes.len() != len {
                return Err(format!("expected {len} bytes, got {}", bytes.len()));
            }
            let mut word = [0u8; 32];
            word[..len].copy_from_slice(&bytes);
            Ok(word)
        }
        ParamType::Bytes | ParamType::String => Err("dynamic type in static position".to_string()),
    }
}

fn decode_hex(arg: &serde_json::Value) -> Result<Vec<u8>, String> {
    let text = arg.as_str().ok_or("expected a hex string")?;
    let digits = text.strip_prefix("0x").unwrap_or(text);
    hex::decode(digits).map_err(|err| err.to_string())
}

/// Parse a JSON number or decimal/hex string into `(is_negative, magnitude)`.
fn parse_integer(arg: &serde_json::Value) -> Result<(bool, Word), String> {
    match arg {
        serde_json::Value::Number(n) => {
            if let Some(v) = n.as_u64() {
                Ok((false, u64_word(v)))
            } else if let Some(v) = n.as_i64() {
                Ok((v < 0, u64_word(v.unsigned_abs())))
            } else {
                Err("expected an integer".to_string())
            }
        }
        serde_json::Value::String(s) => {
            let (negative, digits) = s
                .strip_prefix('-')
                .map_or((false, s.as_str()), |rest| (true, rest));
            let magnitude = match digits.strip_prefix("0x") {
                Some(hex_digits) => parse_radix(hex_digits, 16)?,
                None => parse_radix(digits, 10)?,
            };
            Ok((negative, magnitude))
        }
        _ => Err("expected an integer or integer string".to_string()),
    }
}

fn parse_radix(digits: &str, radix: u32) -> Result<Word, String> {
    if digits.is_empty() {
        return Err("empty integer".to_string());
    }
    let mut word = [0u8; 32];
    for c in digits.chars() {
        let digit = c
            .to_digit(radix)
            .ok_or_else(|| format!("invalid digit `{c}`"))?;
        if mul_add(&mut word, radix, digit) {
            return Err("integer exceeds 256 bits".to_string());
        }
    }
    Ok(word)
}

/// `word = word * mul + add`, returning whether it overflowed.
fn mul_add(word: &mut Word, mul: u32, add: u32) -> bool {
    let mut carry = add;
    for byte in word.iter_mut().rev() {
        let v = u32::from(*byte) * mul + carry;
        *byte = v.to_le_bytes()[0];
        carry = v >> 8;
    }
    carry != 0
}

fn bit_len(word: &Word) -> usize {
    word.iter()
        .position(|b| *b != 0)
        .map_or(0, |i| (32 - i) * 8 - word[i].leading_zeros() as usize)
}

fn is_zero(word: &Word) -> bool {
    word.iter().all(|b| *b == 0)
}

fn is_power_of_two(word: &Word) -> bool {
    word.iter().map(|b| b.count_ones()).sum::<u32>() == 1
}

fn twos_complement(mut word: Word) -> Word {
    for byte in &mut word {
        *byte = !*byte;
    }
    mul_add(&mut word, 1, 1);
    word
}

fn u64_word(v: u64) -> Word {
    let mut word = [0u8; 32];
    word[24..].copy_from_slice(&v.to_be_bytes());
    word
}

fn usize_word(v: usize) -> Word {
    u64_word(u64::try_from(v).unwrap_or(u64::MAX))
}

fn pad_right(bytes: &[u8]) -> Vec<u8> {
    let mut padded = bytes.to_vec();
    padded.resize(bytes.len().div_ceil(32) * 32, 0);
    padded
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn erc20_abi() -> serde_json::Value {
        json!([
            {
                "type": "function",
                "name": "transfer",
                "inputs": [
                    { "name": "to", "type": "address" },
                    { "name": "amount", "type": "uint256" }
                ],
                "outputs": [{ "name": "", "type": "bool" }]
            },
            { "type": "event", "name": "Transfer", "inputs": [] }
        ])
    }

    #[test]
    fn should_compute_known_keccak_selector() {
        let selector = &keccak256(b"transfer(address,uint256)")[..4];
        assert_eq!(hex::encode(selector), "a9059cbb");
    }

    #[test]
    fn should_encode_erc20_transfer() {
        let data = encode_call(
            &erc20_abi(),
            "transfer",
            &[
                json!("0x00000000000000000000000000000000000000ff"),
                json!("1000"),
            ],
        )
        .unwrap();
        assert_eq!(
            data,
            concat!(
                "0xa9059cbb",
                "00000000000000000000000000000000000000000000000000000000000000ff",
                "00000000000000000000000000000000000000000000000000000000000003e8",
            )
        );
    }

    #[test]
    fn should_encode_dynamic_string_after_static_head() {
        let abi = json!([{
            "name": "setName",
            "inputs": [{ "type": "uint8" }, { "type": "string" }]
        }]);
        let data = encode_call(&abi, "setName", &[json!(1), json!("hi")]).unwrap();
        let body = &data[10..];
        assert_eq!(body.len(), 64 * 4);
        assert!(body[64..128].ends_with("40"));
        assert!(body[128..192].ends_with("02"));
        assert!(body[192..].starts_with("6869"));
    }

    #[test]
    fn should_encode_negative_int_as_twos_complement() {
        let abi = json!([{ "name": "set", "inputs": [{ "type": "int256" }] }]);
        let data = encode_call(&abi, "set", &[json!(-1)]).unwrap();
        assert!(data[10..].chars().all(|c| c == 'f'));
    }

    #[test]
    fn should_reject_value_too_wide_for_uint8() {
        let abi = json!([{ "name": "set", "inputs": [{ "type": "uint8" }] }]);
        let err = encode_call(&abi, "set", &[json!(256)]).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidArgument { index: 0, .. }));
    }

    #[test]
    fn should_reject_undeclared_function() {
        let err = encode_call(&erc20_abi(), "approve", &[]).unwrap_err();
        assert!(matches!(err, ConfigurationError::InvalidAbi { .. }));
    }

    #[test]
    fn should_reject_wrong_argument_count() {
        let err = encode_call(&erc20_abi(), "transfer", &[json!("0x00")]).unwrap_err();
        assert!(err.to_string().contains("no overload takes 1 arguments"));
    }

    #[test]
    fn should_reject_tuple_parameters() {
        let abi = json!([{ "name": "f", "inputs": [{ "type": "tuple", "components": [] }] }]);
        let err = encode_call(&abi, "f", &[json!([])]).unwrap_err();
        assert!(err.to_string().contains("unsupported parameter type `tuple`"));
    }

    #[test]
    fn should_parse_large_decimal_strings() {
        let (negative, word) = parse_integer(&json!("340282366920938463463374607431768211456")).unwrap();
        assert!(!negative);
        assert_eq!(bit_len(&word), 129);
    }
}
