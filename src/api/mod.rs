// Upstream API client module
// Author: kelexine (https://github.com/kelexine)

mod client;
pub mod transport;

pub use client::ApiClient;
pub use transport::{HttpRequest, HttpResponse, Method, ReqwestTransport, Transport};
