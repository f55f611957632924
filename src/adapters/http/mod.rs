mod dto;
mod handlers;
mod routes;
mod state;

pub use routes::router;
pub use state::AppState;
