//! API access for the KCLoft front end.
//!
//! This crate provides:
//!
//! - **Transport**: the HTTP seam and its reqwest implementation
//! - **Request gateway**: bearer token attachment and a single retry on `401`
//! - **Questions API**: typed calls to the question bank

pub mod config;
pub mod error;
pub mod gateway;
pub mod questions;
pub mod transport;

pub use config::ApiConfig;
pub use error::ApiError;
pub use gateway::{MAX_RETRIES, RequestContext, RequestGateway, TokenSource};
pub use questions::{NewQuestion, Question, QuestionsApi};
pub use transport::{ApiRequest, ApiResponse, Method, ReqwestTransport, Transport};
