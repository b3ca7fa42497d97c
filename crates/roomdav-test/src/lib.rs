//! roomdav calendar bridge - integration test support.
//!
//! This crate re-exports the workspace crates to support integration tests
//! that use `roomdav::` paths.

#![allow(ambiguous_glob_reexports)]

pub mod component {
    // Re-export core and service modules at the component level
    pub use roomdav_core::*;
    pub use roomdav_service::*;

    // Re-export the host stores and backends
    pub mod host {
        pub use roomdav_host::*;
    }

    // Re-export app middleware and handlers
    pub mod middleware {
        pub use roomdav_app::middleware::*;
    }

    // Re-export config from both core and app
    pub mod config {
        pub use roomdav_app::config::ConfigHandler;
        pub use roomdav_core::config::*;
    }
}

// Re-export top-level modules for convenience
pub mod app {
    pub use roomdav_app::*;

    pub mod api {
        pub use roomdav_app::app::api::*;
    }
}
