pub mod clock;
pub mod notification;
pub mod state;
pub mod test_utils;

pub use clock::{Clock, FixedClock, SystemClock};
pub use notification::{dispatch_notification, NotificationKind, NotificationPort};
pub use state::AppState;
