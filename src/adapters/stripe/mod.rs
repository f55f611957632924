mod adapter;

pub use adapter::StripeAdapter;
