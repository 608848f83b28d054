//! # Tiered merge
//!
//! Configuration comes from up to four tiers, highest priority first: user
//! code, environment, declarative file and compiled defaults. Every tier
//! produces a [`ConfigurationFragment`]; [`ConfigMerger`] folds them field by
//! field and resolves the result into a [`ConfigurationModel`].

use crate::defaults::default_configuration;
use crate::error::ConfigError;
use crate::fragment::ConfigurationFragment;
use crate::model::ConfigurationModel;
use crate::resolve::resolve_configuration;

/// Field-wise combination of two values of the same shape.
pub trait Merge {
    /// Returns `self` with every unset field filled from `lower`.
    ///
    /// A field counts as unset only when it is `None`; `0`, `false` and empty
    /// strings are explicit values.
    fn merge(self, lower: Self) -> Self;
}

/// Merges two optional values, recursing when both are present.
pub fn merge_nested<T: Merge>(higher: Option<T>, lower: Option<T>) -> Option<T> {
    match (higher, lower) {
        (Some(higher), Some(lower)) => Some(higher.merge(lower)),
        (higher, lower) => higher.or(lower),
    }
}

/// Merges two lists element by element. Elements only present in the longer
/// list are kept as they are.
pub fn merge_indexwise<T: Merge>(higher: Option<Vec<T>>, lower: Option<Vec<T>>) -> Option<Vec<T>> {
    match (higher, lower) {
        (Some(higher), Some(lower)) => {
            let mut lower = lower.into_iter();
            let mut merged: Vec<T> = higher
                .into_iter()
                .map(|element| match lower.next() {
                    Some(lower_element) => element.merge(lower_element),
                    None => element,
                })
                .collect();
            merged.extend(lower);
            Some(merged)
        }
        (higher, lower) => higher.or(lower),
    }
}

/// An entry of a list that merges per name.
pub trait Named {
    /// Key the entry merges on.
    fn name(&self) -> &str;
    /// Whether the entry carries a value. Entries without one are dropped.
    fn has_value(&self) -> bool;
}

/// Additive per-name merge: every named entry of `higher` is kept and `lower`
/// contributes the names `higher` lacks. Entries without a value are dropped.
pub fn merge_by_name<T: Named>(higher: Option<Vec<T>>, lower: Option<Vec<T>>) -> Option<Vec<T>> {
    if higher.is_none() && lower.is_none() {
        return None;
    }
    let mut merged: Vec<T> = Vec::new();
    for entry in higher
        .into_iter()
        .flatten()
        .chain(lower.into_iter().flatten())
        .filter(Named::has_value)
    {
        if !merged.iter().any(|existing| existing.name() == entry.name()) {
            merged.push(entry);
        }
    }
    Some(merged)
}

/// Additive merge of two `key=value,...` lists. The lower list comes first so
/// that, with last-wins parsing, keys of the higher list take precedence.
pub fn merge_key_value_strings(higher: Option<String>, lower: Option<String>) -> Option<String> {
    match (higher, lower) {
        (Some(higher), Some(lower)) => Some(format!("{lower},{higher}")),
        (higher, lower) => higher.or(lower),
    }
}

/// Folds tiers given in priority order, highest first, into a single value.
pub fn fold_tiers<T, I>(tiers: I) -> Option<T>
where
    T: Merge,
    I: IntoIterator<Item = Option<T>>,
{
    tiers
        .into_iter()
        .fold(None, |merged, tier| merge_nested(merged, tier))
}

/// Resolves configuration fragments into a [`ConfigurationModel`].
#[derive(Clone, Debug)]
pub struct ConfigMerger {
    defaults: ConfigurationFragment,
}

impl ConfigMerger {
    /// Creates a merger backed by the given compiled defaults. The defaults
    /// must provide every required leaf.
    pub fn new(defaults: ConfigurationFragment) -> Self {
        ConfigMerger { defaults }
    }

    /// The compiled defaults this merger falls back to.
    pub fn defaults(&self) -> &ConfigurationFragment {
        &self.defaults
    }

    /// Merges `user > env > file > defaults` and resolves the result.
    ///
    /// Fails only when the defaults are incomplete or when the merged
    /// fragments describe something that cannot be resolved, such as a
    /// processor declaring no kind.
    pub fn merge(
        &self,
        user: Option<ConfigurationFragment>,
        env: Option<ConfigurationFragment>,
        file: Option<ConfigurationFragment>,
    ) -> Result<ConfigurationModel, ConfigError> {
        let explicit = fold_tiers([user, env, file]);
        resolve_configuration(explicit.unwrap_or_default(), &self.defaults)
    }
}

impl Default for ConfigMerger {
    fn default() -> Self {
        ConfigMerger::new(default_configuration())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Pair {
        a: Option<u32>,
        b: Option<bool>,
    }

    impl Merge for Pair {
        fn merge(self, lower: Self) -> Self {
            Pair {
                a: self.a.or(lower.a),
                b: self.b.or(lower.b),
            }
        }
    }

    #[test]
    fn test_fold_tiers_takes_highest_set_value() {
        let merged = fold_tiers([
            Some(Pair { a: None, b: Some(false) }),
            None,
            Some(Pair { a: Some(0), b: Some(true) }),
            Some(Pair { a: Some(7), b: None }),
        ]);
        // 0 and false are explicit values and win over lower tiers
        assert_eq!(merged, Some(Pair { a: Some(0), b: Some(false) }));
        assert_eq!(fold_tiers::<Pair, _>([None, None]), None);
    }

    #[test]
    fn test_merge_indexwise() {
        let merged = merge_indexwise(
            Some(vec![Pair { a: Some(1), b: None }]),
            Some(vec![
                Pair { a: Some(2), b: Some(true) },
                Pair { a: Some(3), b: None },
            ]),
        );
        assert_eq!(
            merged,
            Some(vec![
                Pair { a: Some(1), b: Some(true) },
                Pair { a: Some(3), b: None },
            ])
        );
    }

    #[test]
    fn test_merge_key_value_strings_prefers_higher() {
        let merged = merge_key_value_strings(Some("a=2".into()), Some("a=1,b=1".into()));
        assert_eq!(
            crate::kv_list::parse_key_value_list(&merged.unwrap()),
            vec![("a".to_string(), "2".to_string()), ("b".to_string(), "1".to_string())]
        );
    }
}
