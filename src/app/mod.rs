pub mod config;
pub mod router;
pub mod state;

pub use config::Config;
pub use router::build_router;
pub use state::AppState;
