//! Interceptor chains for request and response rewriting.
//!
//! Interceptors are ordered pure transforms: each receives a value and
//! returns a (possibly rewritten) value, composed in registration order by
//! a plain fold. Logging inside an interceptor is fine; mutating shared
//! state is not.

use super::descriptor::RequestDescriptor;
use super::transport::WireResponse;

pub type RequestInterceptor = Box<dyn Fn(RequestDescriptor) -> RequestDescriptor + Send + Sync>;
pub type ResponseInterceptor = Box<dyn Fn(WireResponse) -> WireResponse + Send + Sync>;

pub(crate) fn apply_request(
    chain: &[RequestInterceptor],
    descriptor: RequestDescriptor,
) -> RequestDescriptor {
    chain.iter().fold(descriptor, |desc, interceptor| interceptor(desc))
}

pub(crate) fn apply_response(chain: &[ResponseInterceptor], response: WireResponse) -> WireResponse {
    chain.iter().fold(response, |resp, interceptor| interceptor(resp))
}

/// Interceptor attaching a bearer credential.
///
/// The provider is consulted on every call; when it yields no token the
/// header is simply omitted, which is not an error.
pub fn bearer_interceptor<P>(provider: P) -> RequestInterceptor
where
    P: Fn() -> Option<String> + Send + Sync + 'static,
{
    Box::new(move |descriptor| match provider() {
        Some(token) => descriptor.with_header("Authorization", format!("Bearer {}", token)),
        None => descriptor,
    })
}
