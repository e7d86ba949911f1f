pub mod config;
pub mod transport;

pub use config::ClientConfig;
pub use transport::ReqwestTransport;
