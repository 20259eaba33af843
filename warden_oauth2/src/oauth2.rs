//! OAuth2 scopes and the claims that carry them

use std::{convert::Infallible, str::FromStr};

use ahash::AHashSet;
use aliri_braid::braid;
use aliri_clock::UnixTime;
use serde::{de::IgnoredAny, Deserialize, Serialize};
use thiserror::Error;
use warden::jwt::{self, CoreClaims};

/// Why a string is not a valid scope token
#[derive(Debug, Error)]
pub enum InvalidScopeToken {
    /// Scope tokens must hold at least one character
    #[error("scope token cannot be empty")]
    EmptyString,
    /// Scope tokens are delimited by spaces and cannot contain one
    #[error("scope token cannot contain a space (position {position})")]
    ContainsSpace {
        /// Offset of the space
        position: usize,
    },
}

impl From<Infallible> for InvalidScopeToken {
    #[inline]
    fn from(x: Infallible) -> Self {
        match x {}
    }
}

/// A single OAuth2 scope name
///
/// Scope names are opaque: any non-empty string without a space is
/// accepted, and comparison is exact.
#[braid(
    serde,
    validator,
    ref_doc = "A borrowed reference to a [`ScopeToken`]"
)]
pub struct ScopeToken;

impl aliri_braid::Validator for ScopeToken {
    type Error = InvalidScopeToken;

    fn validate(s: &str) -> Result<(), Self::Error> {
        if s.is_empty() {
            return Err(InvalidScopeToken::EmptyString);
        }

        match s.bytes().position(|b| b == b' ') {
            Some(position) => Err(InvalidScopeToken::ContainsSpace { position }),
            None => Ok(()),
        }
    }
}

/// A set of scope tokens granted to, or required of, a token
///
/// When read from a `scope` claim, the value is split on single spaces and
/// empty fragments are ignored. A list of strings is read the same way, each
/// element split in turn. A missing or `null` claim, or one of any other
/// shape, is an empty scope. Membership checks are exact and case-sensitive.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "ScopeClaim", into = "String")]
pub struct Scope(AHashSet<ScopeToken>);

impl Scope {
    /// A scope holding no tokens
    #[inline]
    pub fn empty() -> Self {
        Self(AHashSet::new())
    }

    /// A scope holding exactly one token
    #[inline]
    pub fn single(scope_token: ScopeToken) -> Self {
        std::iter::once(scope_token).collect()
    }

    /// Adds a token
    #[inline]
    pub fn insert(&mut self, scope_token: ScopeToken) {
        self.0.insert(scope_token);
    }

    /// Whether the scope holds no tokens
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of distinct tokens in the scope
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the scope holds the given token
    #[inline]
    #[must_use]
    pub fn contains(&self, scope_token: &ScopeTokenRef) -> bool {
        self.0.contains(scope_token)
    }

    /// The tokens in the scope, in no particular order
    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &ScopeTokenRef> {
        self.0.iter().map(|token| -> &ScopeTokenRef { token })
    }

    /// Whether every token of `required` is also held by this scope
    #[inline]
    #[must_use]
    pub fn contains_all(&self, required: &Scope) -> bool {
        self.0.is_superset(&required.0)
    }
}

impl<S> Extend<S> for Scope
where
    S: Into<ScopeToken>,
{
    fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
        self.0.extend(iter.into_iter().map(Into::into));
    }
}

impl<S> FromIterator<S> for Scope
where
    S: Into<ScopeToken>,
{
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

impl Scope {
    fn extend_from_claim(&mut self, claim: &str) {
        self.0.extend(
            claim
                .split(' ')
                .filter_map(|fragment| ScopeToken::new(fragment.to_owned()).ok()),
        );
    }
}

impl FromStr for Scope {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut scope = Self::empty();
        scope.extend_from_claim(s);
        Ok(scope)
    }
}

impl From<&'_ str> for Scope {
    #[inline]
    fn from(s: &str) -> Self {
        let mut scope = Self::empty();
        scope.extend_from_claim(s);
        scope
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ScopeClaim {
    Text(String),
    List(Vec<String>),
    Other(IgnoredAny),
}

impl From<ScopeClaim> for Scope {
    fn from(claim: ScopeClaim) -> Self {
        let mut scope = Self::empty();
        match claim {
            ScopeClaim::Text(text) => scope.extend_from_claim(&text),
            ScopeClaim::List(list) => {
                for item in &list {
                    scope.extend_from_claim(item);
                }
            }
            ScopeClaim::Other(_) => {
                tracing::debug!("scope claim is neither a string nor a list; treating as empty");
            }
        }
        scope
    }
}

/// Renders the scope as a space-separated string, tokens sorted
impl From<Scope> for String {
    fn from(scope: Scope) -> Self {
        let mut tokens: Vec<String> = scope.0.into_iter().map(ScopeToken::take).collect();
        tokens.sort_unstable();
        tokens.join(" ")
    }
}

/// A convenience structure for payloads where the user only cares about the
/// scope and other basic claims
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasicClaimsWithScope {
    /// The basic claims
    #[serde(flatten)]
    pub basic: jwt::BasicClaims,

    /// The `scope` claim
    #[serde(default)]
    pub scope: Scope,
}

impl CoreClaims for BasicClaimsWithScope {
    #[inline]
    fn nbf(&self) -> Option<UnixTime> {
        self.basic.nbf()
    }

    #[inline]
    fn exp(&self) -> Option<UnixTime> {
        self.basic.exp()
    }

    #[inline]
    fn aud(&self) -> &jwt::Audiences {
        self.basic.aud()
    }

    #[inline]
    fn iss(&self) -> Option<&jwt::IssuerRef> {
        self.basic.iss()
    }

    #[inline]
    fn sub(&self) -> Option<&jwt::SubjectRef> {
        self.basic.sub()
    }
}

/// Indicates that the type has an OAuth2 scope claim
pub trait HasScope {
    /// OAuth2 scope
    ///
    /// Scope claimed by the underlying token, generally in the `scope`
    /// claim.
    fn scope(&self) -> &Scope;
}

impl HasScope for BasicClaimsWithScope {
    #[inline]
    fn scope(&self) -> &Scope {
        &self.scope
    }
}

impl HasScope for Scope {
    #[inline]
    fn scope(&self) -> &Scope {
        self
    }
}

#[cfg(test)]
mod tests {
    use color_eyre::Result;
    use tracing_test::traced_test;

    use super::*;

    fn token(s: &str) -> ScopeToken {
        ScopeToken::new(s.to_owned()).unwrap()
    }

    #[test]
    fn owned_handles_valid() {
        let x = ScopeToken::new("https://api.example.com/scopes/read:items".to_owned()).unwrap();
        assert_eq!(x.as_str(), "https://api.example.com/scopes/read:items");
    }

    #[test]
    fn owned_rejects_empty() {
        let x = ScopeToken::new(String::new());
        assert!(matches!(x, Err(InvalidScopeToken::EmptyString)));
    }

    #[test]
    fn owned_rejects_space() {
        let x = ScopeToken::new("read write".to_owned());
        assert!(matches!(
            x,
            Err(InvalidScopeToken::ContainsSpace { position: 4 })
        ));
    }

    #[test]
    fn owned_accepts_opaque_names() {
        for name in ["café", "\"read\"", "a\\b", "read\twrite"] {
            let x = ScopeToken::new(name.to_owned()).unwrap();
            assert_eq!(x.as_str(), name);
        }
    }

    #[test]
    fn splits_on_single_spaces_ignoring_empty_fragments() -> Result<()> {
        let scope: Scope = "read  write ".parse()?;
        assert_eq!(scope.len(), 2);
        assert!(scope.contains(&token("read")));
        assert!(scope.contains(&token("write")));
        Ok(())
    }

    #[test]
    fn membership_is_case_sensitive() -> Result<()> {
        let scope: Scope = "Read".parse()?;
        assert!(!scope.contains(&token("read")));
        Ok(())
    }

    #[test]
    fn contains_all_requires_every_token() -> Result<()> {
        let held: Scope = "read write".parse()?;
        assert!(held.contains_all(&"read".parse()?));
        assert!(held.contains_all(&"write read".parse()?));
        assert!(!held.contains_all(&"read delete".parse()?));
        assert!(held.contains_all(&Scope::empty()));
        Ok(())
    }

    #[test]
    fn deserializes_scope_claim() -> Result<()> {
        let claims: BasicClaimsWithScope =
            serde_json::from_str(r#"{"sub":"user-1","exp":100,"scope":"read write"}"#)?;
        assert_eq!(claims.scope().len(), 2);
        assert_eq!(claims.sub().map(jwt::SubjectRef::as_str), Some("user-1"));
        Ok(())
    }

    #[test]
    fn missing_scope_claim_is_empty() -> Result<()> {
        let claims: BasicClaimsWithScope = serde_json::from_str(r#"{"sub":"user-1"}"#)?;
        assert!(claims.scope().is_empty());

        let claims: BasicClaimsWithScope =
            serde_json::from_str(r#"{"sub":"user-1","scope":""}"#)?;
        assert!(claims.scope().is_empty());
        Ok(())
    }

    #[test]
    fn scope_claim_keeps_non_ascii_tokens() -> Result<()> {
        let claims: BasicClaimsWithScope =
            serde_json::from_str(r#"{"scope":"read café \"quoted\""}"#)?;
        assert_eq!(claims.scope().len(), 3);
        assert!(claims.scope().contains(&token("read")));
        assert!(claims.scope().contains(&token("café")));
        assert!(claims.scope().contains(&token("\"quoted\"")));
        Ok(())
    }

    #[test]
    fn scope_claim_as_list_is_accepted() -> Result<()> {
        let claims: BasicClaimsWithScope =
            serde_json::from_str(r#"{"scope":["read","write admin"]}"#)?;
        assert_eq!(claims.scope().len(), 3);
        assert!(claims.scope().contains(&token("admin")));
        Ok(())
    }

    #[test]
    #[traced_test]
    fn scope_claim_of_other_shape_is_empty() -> Result<()> {
        let claims: BasicClaimsWithScope =
            serde_json::from_str(r#"{"sub":"user-1","scope":{"read":true}}"#)?;
        assert!(claims.scope().is_empty());
        assert_eq!(claims.sub().map(jwt::SubjectRef::as_str), Some("user-1"));
        assert!(logs_contain("scope claim is neither a string nor a list"));

        let claims: BasicClaimsWithScope = serde_json::from_str(r#"{"scope":null}"#)?;
        assert!(claims.scope().is_empty());
        Ok(())
    }

    #[test]
    fn serializes_as_sorted_space_separated_string() -> Result<()> {
        let scope: Scope = "write admin read".parse()?;
        assert_eq!(serde_json::to_string(&scope)?, r#""admin read write""#);
        Ok(())
    }
}
