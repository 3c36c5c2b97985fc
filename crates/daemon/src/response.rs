/// The body of a successful reply, not yet CRLF-terminated.
///
/// `Text` covers every command except `download`, whose reply embeds the
/// raw contents of a file after a `file <name> <length>` header and so
/// cannot be represented as a `String`.
#[derive(Debug)]
pub enum Response {
    Text(String),
    Binary(Vec<u8>),
}

impl Response {
    pub fn ok() -> Self {
        Response::Text("success".to_string())
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Response::Text(text) => text.into_bytes(),
            Response::Binary(bytes) => bytes,
        }
    }
}
