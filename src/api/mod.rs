mod dto;
mod error;
mod handlers;
mod routes;

pub use error::AppError;
pub use routes::{create_router, AppState};
