pub mod http;
pub mod postgres;
pub mod stripe;
