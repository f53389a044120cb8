//! Comparison operators available to derived queries.

use crate::repo::error::{RepoError, RepoResult};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    GreaterThanEqual,
    LessThan,
    LessThanEqual,
    /// Inclusive range; consumes two bindings.
    Between,
    /// Membership in a `Value::List` binding.
    In,
    NotIn,
    IsNull,
    IsNotNull,
    /// Caller-supplied `LIKE` pattern.
    Like,
    NotLike,
    StartingWith,
    EndingWith,
    Containing,
}

const KEYWORDS: &[(&str, Operator)] = &[
    ("Is", Operator::Equals),
    ("Equals", Operator::Equals),
    ("IsNot", Operator::NotEquals),
    ("Not", Operator::NotEquals),
    ("GreaterThan", Operator::GreaterThan),
    ("After", Operator::GreaterThan),
    ("GreaterThanEqual", Operator::GreaterThanEqual),
    ("LessThan", Operator::LessThan),
    ("Before", Operator::LessThan),
    ("LessThanEqual", Operator::LessThanEqual),
    ("Between", Operator::Between),
    ("In", Operator::In),
    ("NotIn", Operator::NotIn),
    ("IsNull", Operator::IsNull),
    ("Null", Operator::IsNull),
    ("IsNotNull", Operator::IsNotNull),
    ("NotNull", Operator::IsNotNull),
    ("Like", Operator::Like),
    ("NotLike", Operator::NotLike),
    ("StartingWith", Operator::StartingWith),
    ("StartsWith", Operator::StartingWith),
    ("EndingWith", Operator::EndingWith),
    ("EndsWith", Operator::EndingWith),
    ("Containing", Operator::Containing),
    ("Contains", Operator::Containing),
];

impl Operator {
    /// Parses a descriptor keyword such as `GreaterThan` or `IsNull`.
    ///
    /// An empty keyword means `Equals`. Anything outside the vocabulary
    /// fails with `UnsupportedOperator`.
    pub fn from_keyword(keyword: &str) -> RepoResult<Self> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Ok(Self::Equals);
        }
        KEYWORDS
            .iter()
            .find(|(candidate, _)| *candidate == keyword)
            .map(|(_, operator)| *operator)
            .ok_or_else(|| RepoError::UnsupportedOperator {
                operator: keyword.to_string(),
                reason: "not a recognized query keyword".to_string(),
            })
    }

    /// Canonical keyword, the inverse of `from_keyword`.
    pub fn keyword(self) -> &'static str {
        match self {
            Self::Equals => "Equals",
            Self::NotEquals => "Not",
            Self::GreaterThan => "GreaterThan",
            Self::GreaterThanEqual => "GreaterThanEqual",
            Self::LessThan => "LessThan",
            Self::LessThanEqual => "LessThanEqual",
            Self::Between => "Between",
            Self::In => "In",
            Self::NotIn => "NotIn",
            Self::IsNull => "IsNull",
            Self::IsNotNull => "IsNotNull",
            Self::Like => "Like",
            Self::NotLike => "NotLike",
            Self::StartingWith => "StartingWith",
            Self::EndingWith => "EndingWith",
            Self::Containing => "Containing",
        }
    }

    /// Number of bindings one comparison consumes.
    pub fn arity(self) -> usize {
        match self {
            Self::IsNull | Self::IsNotNull => 0,
            Self::Between => 2,
            _ => 1,
        }
    }

    /// Pattern operators only apply to text attributes.
    pub(crate) fn requires_text(self) -> bool {
        matches!(
            self,
            Self::Like | Self::NotLike | Self::StartingWith | Self::EndingWith | Self::Containing
        )
    }

    pub(crate) fn takes_list(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.keyword())
    }
}

#[cfg(test)]
mod tests {
    use super::Operator;
    use crate::repo::error::RepoError;

    #[test]
    fn parses_keywords_and_aliases() {
        assert_eq!(Operator::from_keyword("").unwrap(), Operator::Equals);
        assert_eq!(
            Operator::from_keyword("GreaterThan").unwrap(),
            Operator::GreaterThan
        );
        assert_eq!(
            Operator::from_keyword("StartsWith").unwrap(),
            Operator::StartingWith
        );
    }

    #[test]
    fn keyword_round_trips() {
        for operator in [Operator::NotEquals, Operator::Between, Operator::IsNotNull] {
            assert_eq!(Operator::from_keyword(operator.keyword()).unwrap(), operator);
        }
    }

    #[test]
    fn unknown_keyword_is_unsupported() {
        let err = Operator::from_keyword("Near").unwrap_err();
        assert!(matches!(err, RepoError::UnsupportedOperator { operator, .. } if operator == "Near"));
    }

    #[test]
    fn arity_matches_binding_needs() {
        assert_eq!(Operator::IsNull.arity(), 0);
        assert_eq!(Operator::Between.arity(), 2);
        assert_eq!(Operator::In.arity(), 1);
    }
}
