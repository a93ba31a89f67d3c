//! Petri-net core for CHP processes: graph model and composition, structural
//! reduction, branch flattening and a multi-valued simulator that reports
//! instability, interference, mutex and deadlock defects.
pub mod chp;
pub mod config;
pub mod logic;
pub mod net;

/// Logging driven by `CHP_LOG` / `CHP_LOG_STYLE`. Safe to call repeatedly.
pub fn init_logger() {
    let env = env_logger::Env::new()
        .filter("CHP_LOG")
        .write_style("CHP_LOG_STYLE");
    let _ = env_logger::Builder::from_env(env).try_init();
}
