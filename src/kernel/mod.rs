pub mod cancel;
pub mod event;
pub mod ingest;
pub mod lifecycle;
pub mod prefs;
pub mod reactor;
pub mod session;
pub mod telemetry;
pub mod time;
