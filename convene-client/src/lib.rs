//! Convene Client - Data Layer
//!
//! Typed access to the procedure endpoint plus the query cache that sits
//! between the dashboard and the server:
//!
//! - [`RpcClient`] speaks the envelope protocol over HTTP
//! - [`QueryCache`] keeps query results per session and can be dehydrated
//!   on the server and hydrated on the client
//! - [`DataClient`] ties the two together and applies the invalidation
//!   table after every successful mutation

pub mod cache;
pub mod config;
pub mod data;
pub mod error;
pub mod invalidation;
pub mod query;
pub mod rpc;

pub use cache::{DehydratedQuery, DehydratedState, QueryCache};
pub use config::{ClientConfig, ConfigError};
pub use data::DataClient;
pub use error::{ClientError, ClientResult};
pub use invalidation::Mutation;
pub use query::{InvalidationTarget, QueryKey};
pub use rpc::RpcClient;
