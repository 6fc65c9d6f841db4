//! Development server.
//!
//! One listener serves, in order of precedence:
//!
//! - the CI report sink (`POST /__unittests/report`, only under `kiln ci`)
//! - the unit-test harness (`/__unittests…`)
//! - instrumented sources (`/__coverage/…`) and coverage reports (`/coverage/…`)
//! - the client error sink (`/logerror?<json>`)
//! - fixture-mocked paths from `kiln.toml`
//! - everything else, compiled on demand from the source tree

pub mod coverage;
pub mod fixtures;
pub mod router;
pub mod server;
pub mod state;
pub mod telemetry;
pub mod tls;
pub mod unittests;

pub use coverage::{CoverageInstrumenter, PassthroughInstrumenter};
pub use fixtures::{FixtureHandler, FixtureRequest, StaticFixtureHandler};
pub use router::{RouteKind, build_router, normalize_path, route_request};
pub use server::DevServer;
pub use state::DevState;
pub use unittests::{TestReport, TestSuite};
