//! Vote policy consulted by `prepare`

use crate::common::Operation;

/// Decides whether a replica votes yes on a transaction.
pub trait VoteValidator: Send + Sync {
    fn validate(&self, operation: &Operation, key: &str, value: Option<&str>) -> bool;
}

/// Votes yes on everything. The only "no" a cluster using this policy ever
/// sees is a replica that cannot be reached.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAgree;

impl VoteValidator for AlwaysAgree {
    fn validate(&self, _operation: &Operation, _key: &str, _value: Option<&str>) -> bool {
        true
    }
}

impl<F> VoteValidator for F
where
    F: Fn(&Operation, &str, Option<&str>) -> bool + Send + Sync,
{
    fn validate(&self, operation: &Operation, key: &str, value: Option<&str>) -> bool {
        self(operation, key, value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_always_agree() {
        assert!(AlwaysAgree.validate(&Operation::Put, "a", Some("1")));
        assert!(AlwaysAgree.validate(&Operation::from("???"), "", None));
    }

    #[test]
    fn test_closure_validator() {
        let no_empty_values =
            |_: &Operation, _: &str, value: Option<&str>| value.map_or(true, |v| !v.is_empty());
        assert!(no_empty_values.validate(&Operation::Put, "a", Some("1")));
        assert!(!no_empty_values.validate(&Operation::Put, "a", Some("")));
        assert!(no_empty_values.validate(&Operation::Delete, "a", None));
    }
}
