pub mod discovery;
pub mod kinopoisk;
pub mod observe;
pub mod provider;
pub mod resolver;
pub mod scorer;
pub mod tmdb;

use cinebridge_gateway::GatewayError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("provider error: {0}")]
    Provider(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("not found")]
    NotFound,
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
}
