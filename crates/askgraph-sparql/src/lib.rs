//! SPARQL plumbing for askgraph.
//!
//! - [`StructuredQuery`]: a query body under the fixed namespace-prefix header.
//! - [`ResultTable`]: selected variables × rows, renderable as markdown.
//! - [`QueryEngine`]: query-in / table-out, with two transports:
//!   - [`LocalGraphStore`]: an in-process oxigraph store loaded once from Turtle,
//!   - [`HttpSparqlEndpoint`]: a remote endpoint with bounded retries that
//!     degrades transport failure into an empty result.

pub mod engine;
pub mod http;
pub mod local;
pub mod prefixes;
pub mod table;

pub use engine::{EngineError, QueryEngine};
pub use http::{EndpointConfig, HttpSparqlEndpoint, OEKG_SPARQL_ENDPOINT};
pub use local::{fetch_turtle, LocalGraphStore, OEKG_FALLBACK_TURTLE_URL};
pub use prefixes::{shorten_uri, StructuredQuery, PREFIX_HEADER};
pub use table::ResultTable;
