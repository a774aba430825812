pub mod pool;
pub mod provision;
pub mod script;

pub use pool::{build_pools, load_ca_bundle, PoolPair, PoolParams};
pub use provision::{configure_database, ensure_database};
pub use script::{render_config_script, AppAccess, DbConfig};
