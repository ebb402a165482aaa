//! Calendar provider adapters: OAuth token exchange and the
//! `CalendarProvider` implementations backing Google and Microsoft.

mod google;
mod microsoft;
mod oauth;
mod retry_policy;
pub mod sync_executor;

pub use google::GoogleCalendarProvider;
pub use microsoft::MicrosoftCalendarProvider;
pub use oauth::OAuthTokenClient;
pub use sync_executor::{SyncExecutor, SyncOutcome};
