pub mod clock;
pub mod config;
pub mod dew_point;
pub mod errors;
pub mod history;
pub mod logging;
pub mod manager_dwd;
pub mod manager_fan;
pub mod manager_sensor;
pub mod models;
pub mod shutdown;
pub mod smoothing;
pub mod store;
pub mod worker;
