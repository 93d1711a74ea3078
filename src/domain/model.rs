use std::cmp::Ordering;

/// Anything addressed by a byte key. Keys order lexicographically by unsigned byte.
pub trait Keyed {
    fn key(&self) -> &[u8];
}

/// A live key/value pair returned by a [`Dao`](crate::domain::ports::Dao).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Record {
    key: Vec<u8>,
    value: Vec<u8>,
}

impl Record {
    pub fn of(key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn into_value(self) -> Vec<u8> {
        self.value
    }

    /// Orders by key only; two records with the same key compare equal here
    /// even if their values differ.
    pub fn cmp_key(&self, other: &Record) -> Ordering {
        self.key.cmp(&other.key)
    }
}

impl Keyed for Record {
    fn key(&self) -> &[u8] {
        &self.key
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_uses_key_and_value() {
        assert_eq!(Record::of("a", "1"), Record::of("a", "1"));
        assert_ne!(Record::of("a", "1"), Record::of("a", "2"));
    }

    #[test]
    fn test_cmp_key_ignores_value() {
        let a1 = Record::of("a", "1");
        let a2 = Record::of("a", "2");
        let b = Record::of("b", "0");
        assert_eq!(a1.cmp_key(&a2), Ordering::Equal);
        assert_eq!(a1.cmp_key(&b), Ordering::Less);
        // unsigned byte order
        let high = Record::of(vec![0xffu8], "");
        let low = Record::of(vec![0x01u8], "");
        assert_eq!(high.cmp_key(&low), Ordering::Greater);
    }
}
