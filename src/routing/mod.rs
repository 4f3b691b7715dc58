//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Bootstrap (once per configuration fingerprint):
//!     connect() declarations (core, then plugins)
//!     → route.rs (compile templates into regex + format)
//!     → table.rs (static map, ordered dynamic list, reverse indices)
//!     → cache.rs (shared by fingerprint, optional external snapshot)
//!
//! Incoming request path
//!     → router.rs (map)
//!     → table.rs (static lookup, then first dynamic match)
//!     → Return: action parameters or NoRoute
//!
//! Link building
//!     → router.rs (build / local_url)
//!     → generate.rs (pick candidate, fill slots, append query)
//! ```
//!
//! # Design Decisions
//! - Tables are immutable once built and shared via Arc
//! - Deterministic: same input always matches same route
//! - First match wins; no specificity ranking
//! - Accept-gated routes always take part in link building

pub mod cache;
pub mod generate;
pub mod matcher;
pub mod route;
pub mod router;
pub mod table;

pub use cache::{Fingerprint, RouterCache};
pub use generate::repair_query;
pub use matcher::AcceptMatcher;
pub use route::{params, Declaration, Params, Patterns, ACTION};
pub use router::{LinkBuilder, Router};
pub use table::RouteTable;
