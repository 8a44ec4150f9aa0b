use std::collections::BTreeMap;

use crate::error::DecodeError;

use super::Value;

/// Deepest list/dictionary nesting accepted before decoding gives up.
pub const MAX_DEPTH: usize = 512;

/// Decode a single bencoded value spanning the whole of `input`.
pub fn decode(input: &[u8]) -> Result<Value, DecodeError> {
  let mut decoder = Decoder { input, pos: 0 };
  let value = decoder.value(0)?;
  if decoder.pos != input.len() {
    return Err(DecodeError::TrailingData {
      offset: decoder.pos,
    });
  }
  Ok(value)
}

struct Decoder<'a> {
  input: &'a [u8],
  pos: usize,
}

impl Decoder<'_> {
  fn peek(&self) -> Result<u8, DecodeError> {
    self
      .input
      .get(self.pos)
      .copied()
      .ok_or(DecodeError::UnexpectedEof { offset: self.pos })
  }

  /// Position of the next `needle` at or after the cursor.
  fn find(&self, needle: u8) -> Result<usize, DecodeError> {
    self.input[self.pos..]
      .iter()
      .position(|&b| b == needle)
      .map(|i| self.pos + i)
      .ok_or(DecodeError::UnexpectedEof {
        offset: self.input.len(),
      })
  }

  fn enter(&self, depth: usize) -> Result<usize, DecodeError> {
    if depth >= MAX_DEPTH {
      return Err(DecodeError::TooDeep {
        limit: MAX_DEPTH,
        offset: self.pos,
      });
    }
    Ok(depth + 1)
  }

  fn value(&mut self, depth: usize) -> Result<Value, DecodeError> {
    match self.peek()? {
      b'i' => self.integer(),
      b'0'..=b'9' => self.bytes().map(Value::Bytes),
      b'l' => self.list(depth),
      b'd' => self.dict(depth),
      byte => Err(DecodeError::UnexpectedByte {
        byte,
        offset: self.pos,
      }),
    }
  }

  fn integer(&mut self) -> Result<Value, DecodeError> {
    let start = self.pos;
    self.pos += 1;
    let end = self.find(b'e')?;
    let digits = &self.input[self.pos..end];

    let well_formed = match digits {
      [] | [b'-'] => false,
      // "-0" and zero-padded values have no canonical form
      [b'-', b'0', ..] | [b'0', _, ..] => false,
      [b'-', rest @ ..] => rest.iter().all(u8::is_ascii_digit),
      all => all.iter().all(u8::is_ascii_digit),
    };
    if !well_formed {
      return Err(DecodeError::InvalidInteger { offset: start });
    }

    let n = std::str::from_utf8(digits)
      .ok()
      .and_then(|s| s.parse::<i64>().ok())
      .ok_or(DecodeError::InvalidInteger { offset: start })?;

    self.pos = end + 1;
    Ok(Value::Integer(n))
  }

  fn bytes(&mut self) -> Result<Vec<u8>, DecodeError> {
    let start = self.pos;
    let colon = self.find(b':')?;
    let digits = &self.input[start..colon];

    if digits.is_empty()
      || !digits.iter().all(u8::is_ascii_digit)
      || (digits.len() > 1 && digits[0] == b'0')
    {
      return Err(DecodeError::InvalidLength { offset: start });
    }
    let len = std::str::from_utf8(digits)
      .ok()
      .and_then(|s| s.parse::<usize>().ok())
      .ok_or(DecodeError::InvalidLength { offset: start })?;

    let data_start = colon + 1;
    let data_end = data_start
      .checked_add(len)
      .filter(|&end| end <= self.input.len())
      .ok_or(DecodeError::UnexpectedEof {
        offset: self.input.len(),
      })?;

    self.pos = data_end;
    Ok(self.input[data_start..data_end].to_vec())
  }

  fn list(&mut self, depth: usize) -> Result<Value, DecodeError> {
    let depth = self.enter(depth)?;
    self.pos += 1;

    let mut items = Vec::new();
    loop {
      if self.peek()? == b'e' {
        self.pos += 1;
        return Ok(Value::List(items));
      }
      items.push(self.value(depth)?);
    }
  }

  fn dict(&mut self, depth: usize) -> Result<Value, DecodeError> {
    let depth = self.enter(depth)?;
    self.pos += 1;

    let mut entries = BTreeMap::new();
    loop {
      match self.peek()? {
        b'e' => {
          self.pos += 1;
          return Ok(Value::Dict(entries));
        }
        b'0'..=b'9' => {}
        _ => return Err(DecodeError::NonStringKey { offset: self.pos }),
      }

      let key_offset = self.pos;
      let key = self.bytes()?;
      let value = self.value(depth)?;
      if entries.insert(key, value).is_some() {
        return Err(DecodeError::DuplicateKey { offset: key_offset });
      }
    }
  }
}
