pub mod marker;
pub mod notifier;
pub mod outcome;
pub mod poller;
pub mod status;

pub use marker::{OrderMarker, PageState, PageUrl};
pub use notifier::{LogNotifier, Notifier, RefreshingNotifier};
pub use outcome::{Notification, Outcome, Severity};
pub use poller::{PollHandle, ReconciliationPoller};
pub use status::{BookingStatus, VerificationStatus};
