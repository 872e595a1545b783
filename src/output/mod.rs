mod history;
mod status;
mod style;

pub use history::print_history;
pub use status::{StatusView, print_status};
pub use style::{accent, bold, configure, failure, info, muted, status, success, warning};

use time::OffsetDateTime;

pub fn format_timestamp(at: OffsetDateTime) -> String {
    at.format(time::macros::format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ))
    .unwrap_or_else(|_| "-".to_string())
}
