use std::io::Write;

use crate::error::EncodeError;

use super::Value;

/// Encode `value` into a fresh buffer.
pub fn encode(value: &Value) -> Result<Vec<u8>, EncodeError> {
  let mut out = Vec::new();
  encode_to(value, &mut out)?;
  Ok(out)
}

/// Encode `value` into `out`.
pub fn encode_to<W: Write>(value: &Value, out: &mut W) -> Result<(), EncodeError> {
  match value {
    Value::Integer(i) => write!(out, "i{}e", i)?,
    Value::Bytes(bytes) => write_bytes(out, bytes)?,
    Value::List(items) => {
      out.write_all(b"l")?;
      for item in items {
        encode_to(item, out)?;
      }
      out.write_all(b"e")?;
    }
    Value::Dict(entries) => {
      out.write_all(b"d")?;
      for (key, item) in entries {
        write_bytes(out, key)?;
        encode_to(item, out)?;
      }
      out.write_all(b"e")?;
    }
  }
  Ok(())
}

fn write_bytes<W: Write>(out: &mut W, bytes: &[u8]) -> std::io::Result<()> {
  write!(out, "{}:", bytes.len())?;
  out.write_all(bytes)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::bencode::decode;
  use std::collections::BTreeMap;

  #[test]
  fn test_encode_sorts_keys() {
    let mut entries = BTreeMap::new();
    entries.insert(b"zeta".to_vec(), Value::Integer(-3));
    entries.insert(b"alpha".to_vec(), Value::List(vec![Value::from("x")]));
    entries.insert(b"announce".to_vec(), Value::from("http://t/a"));

    let encoded = encode(&Value::Dict(entries)).unwrap();
    assert_eq!(
      encoded,
      b"d5:alphal1:xe8:announce10:http://t/a4:zetai-3ee".to_vec()
    );
  }

  #[test]
  fn test_canonical_payload_survives_unchanged() {
    let original: &[u8] =
      b"d8:announce9:http://t/7:comment2:hi4:infod6:lengthi1024e4:name5:a.bin6:pieces3:\x00\x01\x02ee";
    let value = decode(original).unwrap();
    assert_eq!(encode(&value).unwrap(), original);
  }

  struct BrokenSink;

  impl Write for BrokenSink {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
      Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
    }

    fn flush(&mut self) -> std::io::Result<()> {
      Ok(())
    }
  }

  #[test]
  fn test_sink_failure_is_an_encode_error() {
    let result = encode_to(&Value::Integer(1), &mut BrokenSink);
    assert!(matches!(result, Err(EncodeError::Io(_))));
  }
}
