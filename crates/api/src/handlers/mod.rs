//! One module per endpoint group, each exposing a `..._router()` function
//! returning a sub-`Router<Arc<AppState>>` that `server::build_app` mounts.

pub mod calendar_events;
pub mod calendars;
pub mod rules;
pub mod time_entries;
