use std::{fmt, marker::PhantomData};

use bytes::Bytes;
use http::{HeaderMap, Request, Response};
use tower_http::auth::AsyncAuthorizeRequest;
use tracing::Instrument;
use warden::{
    error::{JwtVerifyError, KeyRejected},
    jwt::CoreClaims,
    Jwt,
};
use warden_oauth2::{Authority, AuthorityError, RetrievalError};

use crate::{
    identity::AuthenticatedIdentity,
    request_id::request_id,
    response::{error_chain, internal_error, unauthorized, UNAUTHORIZED},
    BoxFuture, TerseErrorHandler, VerboseErrorHandler,
};

/// Authorizer that verifies the bearer token carried by a request
///
/// On success, the validated `Claims`, the [`AuthenticatedIdentity`] derived
/// from the `sub` claim, and the [`Jwt`] itself are added to the request
/// extensions.
pub struct VerifyJwt<Claims, OnError> {
    authority: Authority,
    on_error: OnError,
    _claim: PhantomData<fn() -> Claims>,
}

impl<Claims, OnError> Clone for VerifyJwt<Claims, OnError>
where
    OnError: Clone,
{
    #[inline]
    fn clone(&self) -> Self {
        Self {
            authority: self.authority.clone(),
            on_error: self.on_error.clone(),
            _claim: PhantomData,
        }
    }
}

impl<Claims, OnError> fmt::Debug for VerifyJwt<Claims, OnError>
where
    OnError: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("VerifyJwt")
            .field("authority", &self.authority)
            .field("on_error", &self.on_error)
            .finish()
    }
}

impl<Claims, OnError> VerifyJwt<Claims, OnError> {
    #[inline]
    pub(crate) fn new(authority: Authority, on_error: OnError) -> Self {
        Self {
            authority,
            on_error,
            _claim: PhantomData,
        }
    }
}

impl<Claims, OnError, ReqBody> AsyncAuthorizeRequest<ReqBody> for VerifyJwt<Claims, OnError>
where
    OnError: OnJwtError + Clone + Send + Sync + 'static,
    OnError::Body: Send + 'static,
    Claims: for<'de> serde::Deserialize<'de> + CoreClaims + Clone + Send + Sync + 'static,
    ReqBody: Send + 'static,
{
    type RequestBody = ReqBody;
    type ResponseBody = OnError::Body;
    type Future = BoxFuture<Result<Request<ReqBody>, Response<OnError::Body>>>;

    fn authorize(&mut self, mut request: Request<ReqBody>) -> Self::Future {
        let authority = self.authority.clone();
        let on_error = self.on_error.clone();
        let span = tracing::debug_span!(
            "verify_jwt",
            http.request_id = request_id(request.extensions()).unwrap_or_default(),
        );

        Box::pin(
            async move {
                tracing::trace!("extracting jwt from headers");
                let jwt = extract_jwt(request.headers())
                    .ok_or_else(|| on_error.on_missing_or_malformed())?;

                let claims = authority
                    .verify_token::<Claims>(&jwt)
                    .await
                    .map_err(|err| handle_authority_error(&on_error, err))?;

                if let Some(sub) = claims.sub() {
                    request
                        .extensions_mut()
                        .insert(AuthenticatedIdentity::new(sub.to_owned()));
                }
                request.extensions_mut().insert(claims);
                request.extensions_mut().insert(jwt);

                tracing::trace!("jwt was valid");

                Ok(request)
            }
            .instrument(span),
        )
    }
}

pub(crate) fn handle_authority_error<OnError>(
    on_error: &OnError,
    error: AuthorityError,
) -> Response<OnError::Body>
where
    OnError: OnJwtError,
{
    match error {
        AuthorityError::UnknownKeyId => on_error.on_no_matching_jwk(),
        AuthorityError::JwtVerifyError(err) => on_error.on_jwt_invalid(err),
        AuthorityError::KeySetUnavailable(err) => on_error.on_key_set_unavailable(err),
        AuthorityError::KeyRejected(err) => on_error.on_key_rejected(err),
        AuthorityError::PolicyDenial(_) => {
            tracing::debug!("token rejected by policy outside of scope enforcement");
            on_error.on_missing_or_malformed()
        }
    }
}

/// Handler for responding to failures while verifying a JWT
pub trait OnJwtError {
    /// The body type returned on an error
    type Body;

    /// Response when the JWT was not found or was otherwise malformed
    fn on_missing_or_malformed(&self) -> Response<Self::Body>;

    /// Response when the JWT names a JWK that was not found in the authority
    fn on_no_matching_jwk(&self) -> Response<Self::Body>;

    /// Response when the JWT was rejected by the authority as invalid
    fn on_jwt_invalid(&self, error: JwtVerifyError) -> Response<Self::Body>;

    /// Response when the key set could not be retrieved
    fn on_key_set_unavailable(&self, error: RetrievalError) -> Response<Self::Body>;

    /// Response when the matching key could not be used for verification
    fn on_key_rejected(&self, error: KeyRejected) -> Response<Self::Body>;
}

macro_rules! delegate_impls {
    ($($ty:ty)*) => {
        $(
            impl<T> OnJwtError for $ty
            where
                T: OnJwtError,
            {
                type Body = T::Body;

                fn on_missing_or_malformed(&self) -> Response<Self::Body> {
                    T::on_missing_or_malformed(self)
                }

                fn on_no_matching_jwk(&self) -> Response<Self::Body> {
                    T::on_no_matching_jwk(self)
                }

                fn on_jwt_invalid(&self, error: JwtVerifyError) -> Response<Self::Body> {
                    T::on_jwt_invalid(self, error)
                }

                fn on_key_set_unavailable(&self, error: RetrievalError) -> Response<Self::Body> {
                    T::on_key_set_unavailable(self, error)
                }

                fn on_key_rejected(&self, error: KeyRejected) -> Response<Self::Body> {
                    T::on_key_rejected(self, error)
                }
            }
        )*
    }
}

delegate_impls!(
    &'_ T
    Box<T>
    std::sync::Arc<T>
);

impl<ResBody> OnJwtError for TerseErrorHandler<ResBody>
where
    ResBody: From<Bytes>,
{
    type Body = ResBody;

    #[inline]
    fn on_missing_or_malformed(&self) -> Response<Self::Body> {
        tracing::debug!("JWT validation failed: authorization token is missing or malformed");
        unauthorized(UNAUTHORIZED, "")
    }

    #[inline]
    fn on_no_matching_jwk(&self) -> Response<Self::Body> {
        tracing::debug!("JWT validation failed: token signing key (kid) is not trusted");
        unauthorized(UNAUTHORIZED, "")
    }

    #[inline]
    fn on_jwt_invalid(&self, _: JwtVerifyError) -> Response<Self::Body> {
        tracing::debug!("JWT validation failed");
        unauthorized(UNAUTHORIZED, "")
    }

    #[inline]
    fn on_key_set_unavailable(&self, _: RetrievalError) -> Response<Self::Body> {
        tracing::debug!("JWT validation failed: key set unavailable");
        internal_error("unable to retrieve signing keys")
    }

    #[inline]
    fn on_key_rejected(&self, _: KeyRejected) -> Response<Self::Body> {
        tracing::debug!("JWT validation failed: signing key unusable");
        internal_error("signing key is unusable")
    }
}

impl<ResBody> OnJwtError for VerboseErrorHandler<ResBody>
where
    ResBody: From<Bytes>,
{
    type Body = ResBody;

    #[inline]
    fn on_missing_or_malformed(&self) -> Response<Self::Body> {
        let message = "authorization token is missing or malformed";
        tracing::debug!("JWT validation failed: {message}");
        unauthorized(message, message)
    }

    #[inline]
    fn on_no_matching_jwk(&self) -> Response<Self::Body> {
        let message = "token signing key (kid) is not trusted";
        tracing::debug!("JWT validation failed: {message}");
        unauthorized(message, message)
    }

    #[inline]
    fn on_jwt_invalid(&self, error: JwtVerifyError) -> Response<Self::Body> {
        let description = error_chain(&error);
        tracing::debug!("JWT validation failed: {description}");
        unauthorized(&description, &description)
    }

    #[inline]
    fn on_key_set_unavailable(&self, error: RetrievalError) -> Response<Self::Body> {
        let description = error_chain(&error);
        tracing::debug!("JWT validation failed: {description}");
        internal_error(&description)
    }

    #[inline]
    fn on_key_rejected(&self, error: KeyRejected) -> Response<Self::Body> {
        let description = error_chain(&error);
        tracing::debug!("JWT validation failed: {description}");
        internal_error(&description)
    }
}

/// Extracts the token from an `Authorization: Bearer <token>` header
///
/// The scheme is matched case-insensitively.
pub(crate) fn extract_jwt(headers: &HeaderMap) -> Option<Jwt> {
    let auth = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())?;

    if auth.len() <= 7 || !auth[..7].eq_ignore_ascii_case("bearer ") {
        return None;
    }

    let token = auth[7..].trim();
    if token.is_empty() {
        return None;
    }

    Some(Jwt::new(token.to_owned()))
}

#[cfg(test)]
mod tests {
    use axum_core::body::Body;
    use http::{HeaderValue, StatusCode};
    use warden_oauth2::InsufficientScope;

    use super::*;

    fn headers(auth: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(http::header::AUTHORIZATION, HeaderValue::from_static(auth));
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        let jwt = extract_jwt(&headers("Bearer abc.def.ghi")).unwrap();
        assert_eq!(jwt.as_str(), "abc.def.ghi");
    }

    #[test]
    fn scheme_is_case_insensitive() {
        assert!(extract_jwt(&headers("bearer abc.def.ghi")).is_some());
        assert!(extract_jwt(&headers("BEARER abc.def.ghi")).is_some());
    }

    #[test]
    fn rejects_other_schemes_and_empty_tokens() {
        assert!(extract_jwt(&headers("Basic dXNlcjpwYXNz")).is_none());
        assert!(extract_jwt(&headers("Bearer")).is_none());
        assert!(extract_jwt(&headers("Bearer    ")).is_none());
        assert!(extract_jwt(&HeaderMap::new()).is_none());
    }

    #[test]
    fn policy_denial_is_unauthorized() {
        let handler = TerseErrorHandler::<Body>::new();
        let response =
            handle_authority_error(&handler, AuthorityError::PolicyDenial(InsufficientScope));
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn unknown_key_is_unauthorized() {
        let handler = TerseErrorHandler::<Body>::new();
        let response = handle_authority_error(&handler, AuthorityError::UnknownKeyId);
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
