mod now;
mod offset;
mod offset_clock;

pub use now::{NowReceiver, SharedNow};
pub use offset::UtcOffset;
pub use offset_clock::{format_shifted, OffsetClock};
