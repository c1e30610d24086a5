//! Closed sets of named values with symbol ↔ value coercion.
//!
//! An `Enum` is defined once and never changes afterwards. Values must be
//! unique, so the definition works as a bidirectional map: `value_of` goes
//! from symbol to value, `name_of` from value back to symbol, and `coerce`
//! accepts either form and always yields the canonical value.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;

use crate::error::{CoercionError, EnumDefinitionError};

/// Values that may also spell a symbol name.
///
/// `Enum::coerce` first looks its input up as a value; if that fails and the
/// input reads as a symbol name, it is resolved through `value_of`.
pub trait Symbolic {
    fn as_symbol(&self) -> Option<&str>;
}

impl Symbolic for String {
    fn as_symbol(&self) -> Option<&str> {
        Some(self)
    }
}

impl Symbolic for i64 {
    fn as_symbol(&self) -> Option<&str> {
        None
    }
}

/// A named, immutable set of `(symbol, value)` pairs.
#[derive(Debug, Clone)]
pub struct Enum<V> {
    name: String,
    symbols: Vec<(String, V)>,
    by_symbol: HashMap<String, usize>,
    by_value: HashMap<V, usize>,
}

impl Enum<String> {
    /// Define an enum whose positional symbols are their own values, plus
    /// any explicitly valued symbols.
    pub fn define(
        name: &str,
        positional: &[&str],
        named: &[(&str, &str)],
    ) -> Result<Self, EnumDefinitionError> {
        let pairs = positional
            .iter()
            .map(|symbol| (*symbol, symbol.to_string()))
            .chain(named.iter().map(|(symbol, value)| (*symbol, value.to_string())));
        Self::from_pairs(name, pairs)
    }
}

impl<V> Enum<V>
where
    V: Clone + Eq + Hash + Debug,
{
    /// Define an enum from explicit `(symbol, value)` pairs, kept in order.
    pub fn from_pairs<'a>(
        name: &str,
        pairs: impl IntoIterator<Item = (&'a str, V)>,
    ) -> Result<Self, EnumDefinitionError> {
        let mut symbols: Vec<(String, V)> = Vec::new();
        let mut by_symbol = HashMap::new();
        let mut by_value = HashMap::new();

        for (symbol, value) in pairs {
            if by_symbol.contains_key(symbol) {
                return Err(EnumDefinitionError::DuplicateSymbol {
                    enum_name: name.to_string(),
                    symbol: symbol.to_string(),
                });
            }
            if let Some(&index) = by_value.get(&value) {
                let first: &(String, V) = &symbols[index];
                return Err(EnumDefinitionError::DuplicateValue {
                    enum_name: name.to_string(),
                    value: format!("{value:?}"),
                    first: first.0.clone(),
                    second: symbol.to_string(),
                });
            }
            let index = symbols.len();
            by_symbol.insert(symbol.to_string(), index);
            by_value.insert(value.clone(), index);
            symbols.push((symbol.to_string(), value));
        }

        Ok(Self {
            name: name.to_string(),
            symbols,
            by_symbol,
            by_value,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Symbols and their values in definition order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &V)> {
        self.symbols.iter().map(|(s, v)| (s.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn contains_value(&self, value: &V) -> bool {
        self.by_value.contains_key(value)
    }

    /// Value bound to `symbol`.
    pub fn value_of(&self, symbol: &str) -> Result<&V, CoercionError> {
        self.by_symbol
            .get(symbol)
            .map(|&i| &self.symbols[i].1)
            .ok_or_else(|| CoercionError::UnknownSymbol {
                enum_name: self.name.clone(),
                symbol: symbol.to_string(),
            })
    }

    /// Symbol bound to `value`.
    pub fn name_of(&self, value: &V) -> Result<&str, CoercionError> {
        self.by_value
            .get(value)
            .map(|&i| self.symbols[i].0.as_str())
            .ok_or_else(|| CoercionError::UnknownValue {
                enum_name: self.name.clone(),
                value: format!("{value:?}"),
            })
    }

    /// Canonical value for `raw`, which may be a value or a symbol name.
    pub fn coerce(&self, raw: &V) -> Result<V, CoercionError>
    where
        V: Symbolic,
    {
        if self.contains_value(raw) {
            return Ok(raw.clone());
        }
        match raw.as_symbol() {
            Some(symbol) if self.by_symbol.contains_key(symbol) => self.value_of(symbol).cloned(),
            _ => Err(CoercionError::UnknownValue {
                enum_name: self.name.clone(),
                value: format!("{raw:?}"),
            }),
        }
    }

    /// Value for a symbol name, for value types that never spell a symbol.
    pub fn coerce_symbol(&self, symbol: &str) -> Result<V, CoercionError> {
        self.value_of(symbol).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONTINENTS: [&str; 6] = ["EUROPE", "AFRICA", "OCEANIA", "AMERICA", "ANTARCTICA", "ASIA"];

    fn numbered_continents() -> Enum<i64> {
        Enum::from_pairs(
            "Continent",
            CONTINENTS.iter().enumerate().map(|(i, c)| (*c, i as i64)),
        )
        .unwrap()
    }

    #[test]
    fn positional_symbols_are_their_own_values() {
        let continent = Enum::define("Continent", &CONTINENTS, &[]).unwrap();
        assert_eq!(continent.name(), "Continent");
        for c in CONTINENTS {
            assert_eq!(continent.value_of(c).unwrap(), c);
        }
    }

    #[test]
    fn positional_and_named_symbols_mix() {
        let status = Enum::define(
            "Status",
            &["pending"],
            &[("COMPLETED", "completed")],
        )
        .unwrap();
        assert_eq!(status.value_of("pending").unwrap(), "pending");
        assert_eq!(status.value_of("COMPLETED").unwrap(), "completed");
        assert_eq!(status.len(), 2);
    }

    #[test]
    fn integer_values() {
        let continent = numbered_continents();
        for (i, c) in CONTINENTS.iter().enumerate() {
            assert_eq!(*continent.value_of(c).unwrap(), i as i64);
        }
    }

    #[test]
    fn opaque_values() {
        #[derive(Debug, Clone, PartialEq, Eq, Hash)]
        struct Sentinel(u8);

        impl Symbolic for Sentinel {
            fn as_symbol(&self) -> Option<&str> {
                None
            }
        }

        let unique = Sentinel(7);
        let e = Enum::from_pairs("E", [("Unique", unique.clone())]).unwrap();
        assert_eq!(e.value_of("Unique").unwrap(), &unique);
        assert_eq!(e.name_of(&unique).unwrap(), "Unique");
        assert_eq!(e.coerce(&unique).unwrap(), unique);
        assert_eq!(e.coerce_symbol("Unique").unwrap(), unique);
        assert!(e.coerce(&Sentinel(8)).is_err());
    }

    #[test]
    fn coercion_of_integers() {
        let continent = numbered_continents();
        assert_eq!(continent.coerce(&2).unwrap(), 2);
        assert_eq!(continent.coerce_symbol("OCEANIA").unwrap(), 2);
        assert!(matches!(
            continent.coerce_symbol("MARACAIBO"),
            Err(CoercionError::UnknownSymbol { .. })
        ));
        assert!(matches!(
            continent.coerce(&20),
            Err(CoercionError::UnknownValue { .. })
        ));
    }

    #[test]
    fn coercion_accepts_value_or_symbol() {
        let status = Enum::from_pairs("Status", [("PENDING", "pending".to_string())]).unwrap();
        assert_eq!(status.coerce(&"pending".to_string()).unwrap(), "pending");
        assert_eq!(status.coerce(&"PENDING".to_string()).unwrap(), "pending");
        assert!(status.coerce(&"bogus".to_string()).is_err());
    }

    #[test]
    fn reverse_lookup() {
        let priority = Enum::from_pairs(
            "Priority",
            [("HIGH", "H".to_string()), ("LOW", "L".to_string())],
        )
        .unwrap();
        assert_eq!(priority.name_of(&"L".to_string()).unwrap(), "LOW");
        assert!(priority.name_of(&"M".to_string()).is_err());
    }

    #[test]
    fn duplicate_values_are_rejected() {
        let err = Enum::from_pairs("E", [("A", 1i64), ("B", 1i64)]).unwrap_err();
        assert!(matches!(err, EnumDefinitionError::DuplicateValue { .. }));
    }

    #[test]
    fn duplicate_symbols_are_rejected() {
        let err = Enum::define("E", &["A", "A"], &[]).unwrap_err();
        assert!(matches!(err, EnumDefinitionError::DuplicateSymbol { .. }));
    }
}
