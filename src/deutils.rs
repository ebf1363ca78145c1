// src/deutils.rs
// Lenient deserializers for hand-written YAML config values.
use serde::{Deserialize, Deserializer};
use serde_yaml::Value;

/// Parse a 7-bit I2C address written as "0x27", "27h" or plain decimal "39"
pub fn parse_i2c_address(raw: &str) -> Result<u8, String> {
    let s = raw.trim().to_lowercase();
    let parsed = if let Some(hex) = s.strip_prefix("0x") {
        u8::from_str_radix(hex, 16)
    } else if let Some(hex) = s.strip_suffix('h') {
        u8::from_str_radix(hex, 16)
    } else {
        s.parse::<u8>()
    };
    let address = parsed.map_err(|e| format!("invalid I2C address '{}': {}", raw, e))?;
    if address > 0x7F {
        return Err(format!("I2C address 0x{:02X} is not a 7-bit address", address));
    }
    Ok(address)
}

pub fn deserialize_i2c_address<'de, D>(deserializer: D) -> Result<Option<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let v = Option::<Value>::deserialize(deserializer)?;
    match v {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => {
            let n = n.as_u64().ok_or_else(|| D::Error::custom("non-integer address"))?;
            let address = u8::try_from(n).map_err(|_| D::Error::custom("address overflow"))?;
            parse_i2c_address(&address.to_string()).map(Some).map_err(D::Error::custom)
        }
        Some(Value::String(s)) => parse_i2c_address(&s).map(Some).map_err(D::Error::custom),
        Some(_) => Err(D::Error::custom("expected integer or string address")),
    }
}

pub fn deserialize_bool_from_anything<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(deserializer)?;
    let s = match v {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Bool(b)) => return Ok(Some(b)),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::String(s)) => s.trim().to_lowercase(),
        Some(_) => String::new(),
    };
    match s.as_str() {
        "1" | "true" | "yes" | "y" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "n" | "off" => Ok(Some(false)),
        _ => Err(serde::de::Error::invalid_value(
            serde::de::Unexpected::Str(&s),
            &"expected boolean representation",
        )),
    }
}
