use std::{collections::BTreeSet, fmt};

/// One parameter of a [`QueryKey`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyPart {
    Int(i64),
    Str(String),
    /// Unordered parameter set, compared independently of insertion order.
    Set(BTreeSet<String>),
}

impl fmt::Display for KeyPart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyPart::Int(value) => write!(f, "{}", value),
            KeyPart::Str(value) => write!(f, "{}", value),
            KeyPart::Set(values) => {
                let joined: Vec<&str> =
                    values.iter().map(String::as_str).collect();
                write!(f, "{{{}}}", joined.join(","))
            },
        }
    }
}

impl From<i64> for KeyPart {
    fn from(value: i64) -> Self {
        KeyPart::Int(value)
    }
}

impl From<u32> for KeyPart {
    fn from(value: u32) -> Self {
        KeyPart::Int(value.into())
    }
}

impl From<&str> for KeyPart {
    fn from(value: &str) -> Self {
        KeyPart::Str(value.to_owned())
    }
}

impl From<String> for KeyPart {
    fn from(value: String) -> Self {
        KeyPart::Str(value)
    }
}

/// Cache key: operation name followed by its parameters in call order.
///
/// Two keys address the same entry iff the operation and every part are
/// equal. Scalar parts are positional; [`KeyPart::Set`] parts are sorted
/// and de-duplicated on construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QueryKey {
    operation: String,
    parts: Vec<KeyPart>,
}

impl QueryKey {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_owned(),
            parts: vec![],
        }
    }

    pub fn with(mut self, part: impl Into<KeyPart>) -> Self {
        self.parts.push(part.into());
        self
    }

    pub fn with_set<I, S>(mut self, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let set = items.into_iter().map(Into::into).collect();
        self.parts.push(KeyPart::Set(set));
        self
    }

    pub fn operation(&self) -> &str {
        &self.operation
    }

    pub fn parts(&self) -> &[KeyPart] {
        &self.parts
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operation)?;
        for part in &self.parts {
            write!(f, ":{}", part)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_identical_arguments_share_a_key() {
        let first = QueryKey::new("coins").with(2u32).with(20u32).with("brl");
        let second = QueryKey::new("coins").with(2u32).with(20u32).with("brl");
        let other = QueryKey::new("coins").with(2u32).with(20u32).with("usd");

        assert_eq!(first, second);
        assert_ne!(first, other);

        let keys: HashSet<QueryKey> = [first, second, other].into();
        assert_eq!(keys.len(), 2);
    }

    #[test]
    fn test_scalar_parts_are_positional() {
        let page_two = QueryKey::new("coins").with(2u32).with(20u32);
        let swapped = QueryKey::new("coins").with(20u32).with(2u32);
        assert_ne!(page_two, swapped);
    }

    #[test]
    fn test_set_parts_ignore_order_and_duplicates() {
        let first = QueryKey::new("markets").with_set(["eth", "btc"]);
        let second = QueryKey::new("markets").with_set(["btc", "eth", "btc"]);
        assert_eq!(first, second);
        assert_eq!(first.to_string(), "markets:{btc,eth}");
    }

    #[test]
    fn test_operation_name_is_part_of_identity() {
        let details = QueryKey::new("coin-details").with("bitcoin");
        let chart = QueryKey::new("coin-chart").with("bitcoin");
        assert_ne!(details, chart);
        assert_eq!(details.operation(), "coin-details");
        assert_eq!(details.to_string(), "coin-details:bitcoin");
    }
}
