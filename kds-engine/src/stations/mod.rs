//! Active preparation station registry

mod registry;

pub use registry::StationRegistry;
