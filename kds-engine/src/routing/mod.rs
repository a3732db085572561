//! Order routing - decides which station(s) receive a new order

mod router;

pub use router::{RoutingEngine, RoutingOutcome, RoutingTarget};
