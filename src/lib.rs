//! URL routing for a GNU social style site.

pub mod bootstrap;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod observability;
pub mod routing;
pub mod store;
pub mod stream;

pub use config::schema::AppConfig;
pub use error::{AppError, DeclarationError, RouteError};
pub use http::HttpServer;
pub use routing::{Router, RouteTable, RouterCache};
