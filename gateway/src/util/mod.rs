pub mod http;
pub mod net;
