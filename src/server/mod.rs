mod assets;
mod http;
mod stream;

pub use http::Server;
