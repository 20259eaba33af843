//! Request correlation identifiers
//!
//! Each request is tagged with an `x-request-id`. A value supplied by the
//! client is kept; otherwise a fresh UUID is generated. The identifier is
//! echoed on the response and recorded on the authorization spans.

use http::Extensions;
use tower_http::request_id::{
    MakeRequestUuid, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_layer::Stack;

/// Layer that assigns and propagates the `x-request-id` header
pub type RequestIdLayer = Stack<PropagateRequestIdLayer, SetRequestIdLayer<MakeRequestUuid>>;

/// Constructs a [`RequestIdLayer`]
///
/// Apply it outside of the authorization layers so that their log output
/// can be correlated with the request.
pub fn layer() -> RequestIdLayer {
    Stack::new(
        PropagateRequestIdLayer::x_request_id(),
        SetRequestIdLayer::x_request_id(MakeRequestUuid),
    )
}

/// The request identifier assigned to a request, if any
pub fn request_id(extensions: &Extensions) -> Option<&str> {
    extensions
        .get::<RequestId>()
        .and_then(|id| id.header_value().to_str().ok())
}

#[cfg(test)]
mod tests {
    use http::{HeaderValue, Request};

    use super::*;

    #[test]
    fn reads_assigned_identifier() {
        let mut request = Request::new(());
        request
            .extensions_mut()
            .insert(RequestId::new(HeaderValue::from_static("req-42")));

        assert_eq!(request_id(request.extensions()), Some("req-42"));
    }

    #[test]
    fn missing_identifier_is_none() {
        let request = Request::new(());
        assert_eq!(request_id(request.extensions()), None);
    }
}
