use time::OffsetDateTime;
use time::format_description::FormatItem;
use time::macros::format_description;

const MESSAGE_TIMESTAMP: &[FormatItem<'_>] =
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond digits:6]Z");

/// Current UTC time stamped on every stored message, matching the
/// original `datetime.datetime.utcnow().isoformat() + 'Z'` format with
/// microsecond precision.
pub(crate) fn now() -> String {
    OffsetDateTime::now_utc()
        .format(MESSAGE_TIMESTAMP)
        .expect("static format description never fails")
}
