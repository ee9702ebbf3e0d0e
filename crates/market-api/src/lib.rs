//! # market-api
//!
//! HTTP API server for the plugin marketplace.
//!
//! ## Endpoints
//!
//! | Method | Path | Auth |
//! |---|---|---|
//! | GET | `/health` | no |
//! | GET | `/maintenance` | no |
//! | POST | `/api/chat` | no |
//! | POST | `/api/auth/signup`, `/api/auth/login` | no |
//! | POST | `/api/auth/logout` | yes |
//! | GET | `/api/auth/user` | yes |
//! | GET | `/api/auth/callback?code=&next=` | no |
//! | POST, GET | `/api/checkout` | yes |
//! | POST | `/api/webhooks/stripe` | signature |
//! | GET | `/api/plugins`, `/api/plugins/{id_or_slug}` | no |
//! | GET | `/api/plugins/mine`, `/api/plugins/{id}/ownership` | yes |
//! | POST, PATCH, DELETE | `/api/plugins[/{id}]` | yes (owner) |
//! | GET | `/api/purchases` | yes |
//! | GET | `/api/dashboard/stats`, `/api/dashboard/revenue` | yes |
//! | GET | `/api/profile` | yes |
//! | PATCH | `/api/profile/notifications` | yes |
//! | GET, POST | `/api/profile/api-keys` | yes |
//! | DELETE | `/api/profile/api-keys/{id}` | yes |
//!
//! Authenticated routes take `Authorization: Bearer <access token>`.

pub mod error;
pub mod extractors;
pub mod fulfillment;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult, ErrorResponse};
pub use routes::create_router;
pub use state::{AppConfig, AppState};
