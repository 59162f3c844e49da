mod http;

pub mod driver;

pub use http::{Error, HttpClient, HttpRequest, HttpResponse, Result};
