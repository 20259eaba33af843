use std::fmt;
use std::marker::PhantomData;

use tower_http::auth::AsyncRequireAuthorizationLayer;
use warden_oauth2::{Authority, BasicClaimsWithScope, ScopePolicy, ScopeToken};

use crate::{TerseErrorHandler, VerboseErrorHandler, VerifyJwt, VerifyScope};

/// Builder for generating layers that authenticate bearer tokens and
/// authorize access based on OAuth2 scope grants
///
/// Every layer produced by the same authorizer shares its [`Authority`],
/// so signing keys are fetched and cached once for all of them.
pub struct Authorizer<Claims = BasicClaimsWithScope, OnError = TerseErrorHandler> {
    authority: Authority,
    on_error: OnError,
    _claim: PhantomData<fn() -> Claims>,
}

impl<Claims, OnError> Clone for Authorizer<Claims, OnError>
where
    OnError: Clone,
{
    fn clone(&self) -> Self {
        Self {
            authority: self.authority.clone(),
            on_error: self.on_error.clone(),
            _claim: PhantomData,
        }
    }
}

impl<Claims, OnError> fmt::Debug for Authorizer<Claims, OnError>
where
    OnError: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Authorizer")
            .field("authority", &self.authority)
            .field("on_error", &self.on_error)
            .finish()
    }
}

impl Authorizer {
    /// Constructs an authorizer backed by the given authority
    ///
    /// Tokens are decoded as [`BasicClaimsWithScope`] and failures are
    /// reported by the [`TerseErrorHandler`].
    #[inline]
    pub fn new(authority: Authority) -> Self {
        Self {
            authority,
            on_error: TerseErrorHandler::new(),
            _claim: PhantomData,
        }
    }
}

impl<Claims, OnError> Authorizer<Claims, OnError> {
    /// Decodes token payloads into a custom claims type
    #[inline]
    pub fn with_claims<NewClaims>(self) -> Authorizer<NewClaims, OnError> {
        Authorizer {
            authority: self.authority,
            on_error: self.on_error,
            _claim: PhantomData,
        }
    }

    /// Attaches a custom error handler to generate responses
    /// in the event of a verification failure
    #[inline]
    pub fn with_error_handler<NewOnError>(
        self,
        on_error: NewOnError,
    ) -> Authorizer<Claims, NewOnError> {
        Authorizer {
            authority: self.authority,
            on_error,
            _claim: PhantomData,
        }
    }

    /// Attaches the [`VerboseErrorHandler`]
    ///
    /// Responses will describe why a token was rejected, and scope checks
    /// will distinguish an invalid token from one lacking scope.
    #[inline]
    pub fn with_verbose_error_handler<ResBody>(
        self,
    ) -> Authorizer<Claims, VerboseErrorHandler<ResBody>> {
        self.with_error_handler(VerboseErrorHandler::new())
    }

    /// The authority used to verify tokens
    #[inline]
    pub fn authority(&self) -> &Authority {
        &self.authority
    }
}

impl<Claims, OnError> Authorizer<Claims, OnError>
where
    OnError: Clone,
{
    /// Layer that requires a valid bearer token
    ///
    /// The token is taken from the `Authorization` header and verified by
    /// the [`Authority`]. On success the claims, the
    /// [`AuthenticatedIdentity`][crate::AuthenticatedIdentity], and the token
    /// are made available through
    /// [`Request::extensions`][http::Request::extensions].
    pub fn jwt_layer(&self) -> AsyncRequireAuthorizationLayer<VerifyJwt<Claims, OnError>> {
        AsyncRequireAuthorizationLayer::new(VerifyJwt::new(
            self.authority.clone(),
            self.on_error.clone(),
        ))
    }

    /// Layer that requires a bearer token whose scope satisfies `policy`
    ///
    /// The token is verified again by this layer, so it may be used with or
    /// without a preceding [`jwt_layer`][Self::jwt_layer].
    pub fn scope_layer(
        &self,
        policy: ScopePolicy,
    ) -> AsyncRequireAuthorizationLayer<VerifyScope<Claims, OnError>> {
        AsyncRequireAuthorizationLayer::new(VerifyScope::new(
            self.authority.clone(),
            policy,
            self.on_error.clone(),
        ))
    }

    /// Layer that requires a bearer token granting `scope`
    ///
    /// Shorthand for a [`scope_layer`][Self::scope_layer] with
    /// [`ScopePolicy::require`].
    pub fn require_scope(
        &self,
        scope: ScopeToken,
    ) -> AsyncRequireAuthorizationLayer<VerifyScope<Claims, OnError>> {
        self.scope_layer(ScopePolicy::require(scope))
    }
}
