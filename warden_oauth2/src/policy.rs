use std::slice;

use thiserror::Error;

use crate::{Scope, ScopeToken};

/// Indicates the requester held insufficient scope to be granted access
/// to a controlled resource
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Error)]
#[error("insufficient scope")]
pub struct InsufficientScope;

/// An access policy based on OAuth2 scopes
///
/// This access policy takes the form of alternatives around required scopes.
/// This policy will allow access if any of the alternatives would allow
/// access. If the policy contains no alternatives, the default effect is to
/// deny access.
///
/// # Examples
///
/// ## Require a single scope token
/// ```
/// use warden_oauth2::{Scope, ScopePolicy, ScopeToken};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let policy = ScopePolicy::require(ScopeToken::from_static("read"));
///
/// let request: Scope = "read write".parse()?;
/// assert!(policy.evaluate(&request).is_ok());
///
/// let request: Scope = "delete".parse()?;
/// assert!(policy.evaluate(&request).is_err());
/// # Ok(())
/// # }
/// ```
///
/// ## Allow requests with multiple potential sets of scopes
/// ```
/// use warden_oauth2::{Scope, ScopePolicy};
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let policy = ScopePolicy::deny_all()
///     .or_allow("admin".parse()?)
///     .or_allow("special user".parse()?);
///
/// assert!(policy.evaluate(&"admin".parse()?).is_ok());
/// assert!(policy.evaluate(&"user".parse()?).is_err());
/// assert!(policy.evaluate(&"user special".parse()?).is_ok());
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[must_use]
pub struct ScopePolicy {
    // Empty denies everything. A lone empty scope allows everything.
    alternatives: Vec<Scope>,
}

impl ScopePolicy {
    /// A policy with no alternatives, denying every request
    #[inline]
    pub const fn deny_all() -> Self {
        Self {
            alternatives: Vec::new(),
        }
    }

    /// A policy that requires no scope at all
    #[inline]
    pub fn allow_any() -> Self {
        Self {
            alternatives: vec![Scope::empty()],
        }
    }

    /// A policy granting access to holders of every token in `scope`
    #[inline]
    pub fn allow_one(scope: Scope) -> Self {
        Self::deny_all().or_allow(scope)
    }

    /// A policy granting access to holders of `scope_token`
    #[inline]
    pub fn require(scope_token: ScopeToken) -> Self {
        Self::allow_one(Scope::single(scope_token))
    }

    /// Adds `scope` as an alternative way to be granted access
    #[inline]
    pub fn or_allow(mut self, scope: Scope) -> Self {
        self.allow(scope);
        self
    }

    /// Adds `scope` as an alternative way to be granted access
    pub fn allow(&mut self, scope: Scope) {
        if self.allows_any() {
            return;
        }

        if scope.is_empty() {
            *self = Self::allow_any();
        } else {
            self.alternatives.push(scope);
        }
    }

    /// [`allow_one`][Self::allow_one] from a space-separated string
    pub fn allow_one_from_static(scope: &'static str) -> Self {
        Self::allow_one(Scope::from(scope))
    }

    /// Checks the scope held by a token against this policy
    ///
    /// # Errors
    ///
    /// None of the alternatives is contained in `held`.
    pub fn evaluate(&self, held: &Scope) -> Result<(), InsufficientScope> {
        if self.iter().any(|required| held.contains_all(required)) {
            Ok(())
        } else {
            Err(InsufficientScope)
        }
    }

    /// The alternatives of this policy, in the order they were added
    pub fn iter(&self) -> slice::Iter<'_, Scope> {
        self.alternatives.iter()
    }

    fn allows_any(&self) -> bool {
        matches!(self.alternatives.as_slice(), [only] if only.is_empty())
    }
}

impl<'a> IntoIterator for &'a ScopePolicy {
    type Item = &'a Scope;
    type IntoIter = slice::Iter<'a, Scope>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl Extend<Scope> for ScopePolicy {
    fn extend<I: IntoIterator<Item = Scope>>(&mut self, iter: I) {
        for scope in iter {
            self.allow(scope);
        }
    }
}

impl FromIterator<Scope> for ScopePolicy {
    fn from_iter<I: IntoIterator<Item = Scope>>(iter: I) -> Self {
        let mut policy = Self::deny_all();
        policy.extend(iter);
        policy
    }
}

impl From<Scope> for ScopePolicy {
    #[inline]
    fn from(scope: Scope) -> Self {
        Self::allow_one(scope)
    }
}
