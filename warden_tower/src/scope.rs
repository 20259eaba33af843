use std::{fmt, marker::PhantomData, sync::Arc};

use bytes::Bytes;
use http::{Request, Response};
use tower_http::auth::AsyncAuthorizeRequest;
use tracing::Instrument;
use warden::jwt::CoreClaims;
use warden_oauth2::{Authority, AuthorityError, HasScope, InsufficientScope, ScopePolicy};

use crate::{
    jwt::extract_jwt,
    request_id::request_id,
    response::{error_chain, forbidden, internal_error, unauthorized},
    BoxFuture, TerseErrorHandler, VerboseErrorHandler,
};

/// Authorizer that checks the access granted by a token's scope claim
/// against a scope policy
///
/// The bearer token is verified again with the [`Authority`]; nothing placed
/// in the request extensions by earlier middleware is trusted. The request
/// is forwarded unchanged when access is granted.
pub struct VerifyScope<Claims, OnError> {
    authority: Authority,
    policy: Arc<ScopePolicy>,
    on_error: OnError,
    _claim: PhantomData<fn() -> Claims>,
}

impl<Claims, OnError> Clone for VerifyScope<Claims, OnError>
where
    OnError: Clone,
{
    fn clone(&self) -> Self {
        Self {
            authority: self.authority.clone(),
            policy: Arc::clone(&self.policy),
            on_error: self.on_error.clone(),
            _claim: PhantomData,
        }
    }
}

impl<Claims, OnError> fmt::Debug for VerifyScope<Claims, OnError>
where
    OnError: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("VerifyScope")
            .field("authority", &self.authority)
            .field("policy", &self.policy)
            .field("on_error", &self.on_error)
            .finish()
    }
}

impl<Claims, OnError> VerifyScope<Claims, OnError> {
    #[inline]
    pub(crate) fn new(authority: Authority, policy: ScopePolicy, on_error: OnError) -> Self {
        Self {
            authority,
            policy: Arc::new(policy),
            on_error,
            _claim: PhantomData,
        }
    }
}

impl<Claims, OnError, ReqBody> AsyncAuthorizeRequest<ReqBody> for VerifyScope<Claims, OnError>
where
    OnError: OnScopeError + Clone + Send + Sync + 'static,
    OnError::Body: Send + 'static,
    Claims: for<'de> serde::Deserialize<'de> + CoreClaims + HasScope + Send + 'static,
    ReqBody: Send + 'static,
{
    type RequestBody = ReqBody;
    type ResponseBody = OnError::Body;
    type Future = BoxFuture<Result<Request<ReqBody>, Response<OnError::Body>>>;

    fn authorize(&mut self, request: Request<ReqBody>) -> Self::Future {
        let authority = self.authority.clone();
        let policy = Arc::clone(&self.policy);
        let on_error = self.on_error.clone();
        let span = tracing::debug_span!(
            "verify_scope",
            http.request_id = request_id(request.extensions()).unwrap_or_default(),
        );

        Box::pin(
            async move {
                let jwt = extract_jwt(request.headers())
                    .ok_or_else(|| on_error.on_missing_or_malformed())?;

                let claims = authority
                    .verify_token::<Claims>(&jwt)
                    .await
                    .map_err(|err| on_error.on_token_rejected(err))?;

                tracing::trace!(scope = ?claims.scope(), policy = ?policy, "evaluating scope policy");

                policy
                    .evaluate(claims.scope())
                    .map_err(|err| on_error.on_scope_policy_failure(err, &policy))?;

                tracing::trace!("scope policy satisfied");

                Ok(request)
            }
            .instrument(span),
        )
    }
}

/// Handler for responding to failures while verifying scope claims
///
/// Each cause of failure is reported separately so that a handler may
/// distinguish an invalid token from one that lacks scope.
pub trait OnScopeError {
    /// The body type returned on an error
    type Body;

    /// Response when the JWT was not found or was otherwise malformed
    fn on_missing_or_malformed(&self) -> Response<Self::Body>;

    /// Response when the token could not be verified
    fn on_token_rejected(&self, error: AuthorityError) -> Response<Self::Body>;

    /// Response when access is rejected due to insufficient permissions
    fn on_scope_policy_failure(
        &self,
        error: InsufficientScope,
        policy: &ScopePolicy,
    ) -> Response<Self::Body>;
}

/// Returns `403 Forbidden` with `{"message":"Insufficient scope."}` in all
/// cases
impl<ResBody> OnScopeError for TerseErrorHandler<ResBody>
where
    ResBody: From<Bytes>,
{
    type Body = ResBody;

    #[inline]
    fn on_missing_or_malformed(&self) -> Response<Self::Body> {
        tracing::debug!("scope check failed: authorization token is missing or malformed");
        forbidden(None)
    }

    #[inline]
    fn on_token_rejected(&self, error: AuthorityError) -> Response<Self::Body> {
        let error: &dyn std::error::Error = &error;
        tracing::debug!(error, "scope check failed: token rejected");
        forbidden(None)
    }

    #[inline]
    fn on_scope_policy_failure(
        &self,
        _: InsufficientScope,
        policy: &ScopePolicy,
    ) -> Response<Self::Body> {
        tracing::debug!("scope check failed: insufficient scope");
        forbidden(Some(policy))
    }
}

/// Splits failures by cause: `401` for an invalid token, `500` when the
/// token could not be checked, and `403` for insufficient scope
impl<ResBody> OnScopeError for VerboseErrorHandler<ResBody>
where
    ResBody: From<Bytes>,
{
    type Body = ResBody;

    #[inline]
    fn on_missing_or_malformed(&self) -> Response<Self::Body> {
        let message = "authorization token is missing or malformed";
        tracing::debug!("scope check failed: {message}");
        unauthorized(message, message)
    }

    #[inline]
    fn on_token_rejected(&self, error: AuthorityError) -> Response<Self::Body> {
        let description = error_chain(&error);
        tracing::debug!("scope check failed: {description}");
        if error.is_internal() {
            internal_error(&description)
        } else {
            unauthorized(&description, &description)
        }
    }

    #[inline]
    fn on_scope_policy_failure(
        &self,
        _: InsufficientScope,
        policy: &ScopePolicy,
    ) -> Response<Self::Body> {
        tracing::debug!("scope check failed: insufficient scope");
        forbidden(Some(policy))
    }
}
