pub mod config;
pub mod control;
pub mod device;
pub mod logging;
pub mod media;
pub mod prepare;
pub mod progress;
pub mod protocol;
pub mod reconciler;
pub mod store;
pub mod task;
pub mod trigger;
pub mod worker;
