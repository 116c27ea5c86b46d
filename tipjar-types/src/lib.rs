mod amount;
mod post;
mod time;
mod tip;
mod window;

pub use amount::{AmountError, ETHER_DECIMALS, format_amount, parse_amount, short_address};
pub use post::{Post, PostDraft};
pub use time::Timestamp;
pub use tip::TipRecord;
pub use window::{DonationWindow, WindowStatus};
