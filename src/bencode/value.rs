use std::collections::BTreeMap;

/// A decoded bencode value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
  Integer(i64),
  Bytes(Vec<u8>),
  List(Vec<Value>),
  Dict(BTreeMap<Vec<u8>, Value>),
}

impl Value {
  pub fn as_dict_mut(&mut self) -> Option<&mut BTreeMap<Vec<u8>, Value>> {
    match self {
      Value::Dict(d) => Some(d),
      _ => None,
    }
  }
}

#[cfg(test)]
impl Value {
  pub fn as_bytes(&self) -> Option<&[u8]> {
    match self {
      Value::Bytes(b) => Some(b),
      _ => None,
    }
  }

  pub fn as_list(&self) -> Option<&[Value]> {
    match self {
      Value::List(l) => Some(l),
      _ => None,
    }
  }

  /// Look up a key in a dictionary value. Returns `None` for non-dictionaries.
  pub fn get(&self, key: &str) -> Option<&Value> {
    match self {
      Value::Dict(d) => d.get(key.as_bytes()),
      _ => None,
    }
  }
}

#[cfg(test)]
impl From<&str> for Value {
  fn from(s: &str) -> Self {
    Value::Bytes(s.as_bytes().to_vec())
  }
}
