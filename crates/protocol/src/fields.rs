/// Returns the command name: the bytes before the first space, or the
/// whole message if it has no space (a command with no fields).
pub fn command_name(message: &[u8]) -> &[u8] {
    match memchr::memchr(b' ', message) {
        Some(pos) => &message[..pos],
        None => message,
    }
}

/// Splits a message into its space-separated fields, dropping the command
/// name, and checks the result has exactly `nfields` of them.
///
/// When `ws_in_last_field` is set, only the first `nfields` spaces are
/// treated as separators, so the final field may itself contain spaces
/// (used by `send`'s message body and `register`/`login`'s password).
/// Otherwise every space is a separator, so embedded whitespace in any
/// field causes a field-count mismatch.
pub fn split_fields(message: &[u8], nfields: usize, ws_in_last_field: bool) -> Option<Vec<Vec<u8>>> {
    let mut parts = if ws_in_last_field {
        split_at_most(message, nfields + 1)
    } else {
        message.split(|&b| b == b' ').map(<[u8]>::to_vec).collect()
    };

    if parts.is_empty() {
        return None;
    }
    parts.remove(0);

    if parts.len() != nfields {
        return None;
    }
    Some(parts)
}

fn split_at_most(data: &[u8], max_parts: usize) -> Vec<Vec<u8>> {
    let mut parts = Vec::new();
    let mut rest = data;
    while parts.len() + 1 < max_parts {
        match memchr::memchr(b' ', rest) {
            Some(pos) => {
                parts.push(rest[..pos].to_vec());
                rest = &rest[pos + 1..];
            }
            None => break,
        }
    }
    parts.push(rest.to_vec());
    parts
}
