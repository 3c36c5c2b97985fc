use storage::{Storage, StorageError};

use crate::error::HandlerError;
use crate::response::Response;
use crate::session::Session;

type Handler = fn(&Storage, &mut Session, Vec<Vec<u8>>) -> Result<Response, HandlerError>;

/// Static per-command metadata: how many fields it takes, whether the
/// last one may contain embedded whitespace, whether it requires (or
/// forbids) an active login, and whether its message bytes skip UTF-8
/// validation. Replaces a reflection-based dispatch table with one flat
/// array the connection worker walks linearly.
pub struct CommandSpec {
    pub name: &'static str,
    pub nfields: usize,
    pub ws_in_last_field: bool,
    pub requires_login: bool,
    pub binary: bool,
    pub handler: Handler,
}

pub static COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        name: "register",
        nfields: 2,
        ws_in_last_field: true,
        requires_login: false,
        binary: false,
        handler: handle_register,
    },
    CommandSpec {
        name: "login",
        nfields: 2,
        ws_in_last_field: true,
        requires_login: false,
        binary: false,
        handler: handle_login,
    },
    CommandSpec {
        name: "logout",
        nfields: 0,
        ws_in_last_field: false,
        requires_login: true,
        binary: false,
        handler: handle_logout,
    },
    CommandSpec {
        name: "send",
        nfields: 2,
        ws_in_last_field: true,
        requires_login: true,
        binary: false,
        handler: handle_send,
    },
    CommandSpec {
        name: "recv",
        nfields: 0,
        ws_in_last_field: false,
        requires_login: true,
        binary: false,
        handler: handle_recv,
    },
    CommandSpec {
        name: "upload",
        nfields: 3,
        ws_in_last_field: true,
        requires_login: true,
        binary: true,
        handler: handle_upload,
    },
    CommandSpec {
        name: "listfiles",
        nfields: 0,
        ws_in_last_field: false,
        requires_login: true,
        binary: false,
        handler: handle_listfiles,
    },
    CommandSpec {
        name: "download",
        nfields: 1,
        ws_in_last_field: false,
        requires_login: true,
        binary: false,
        handler: handle_download,
    },
];

fn find_command(name: &[u8]) -> Option<&'static CommandSpec> {
    COMMANDS.iter().find(|spec| spec.name.as_bytes() == name)
}

/// Validates and dispatches one raw wire message (without its trailing
/// CRLF), in the order the protocol requires: UTF-8 decode (unless the
/// command is binary) before the login check, and the login check before
/// field-count validation, so e.g. `recv` while logged out reports "must
/// be logged in" rather than a field-count error.
pub fn dispatch(
    storage: &Storage,
    session: &mut Session,
    message: &[u8],
) -> Result<Response, HandlerError> {
    let name = protocol::command_name(message);
    let spec = find_command(name).ok_or_else(|| HandlerError::new("no such command"))?;

    if !spec.binary && std::str::from_utf8(message).is_err() {
        return Err(HandlerError::new("invalid UTF-8"));
    }

    if spec.requires_login && session.uid.is_none() {
        return Err(HandlerError::new("must be logged in"));
    }
    if !spec.requires_login && session.uid.is_some() {
        return Err(HandlerError::new("must not be logged in"));
    }

    let fields = protocol::split_fields(message, spec.nfields, spec.ws_in_last_field)
        .ok_or_else(|| HandlerError::new("wrong number of fields"))?;

    (spec.handler)(storage, session, fields)
}

/// Fields of a non-binary command are already known to be valid UTF-8,
/// since the whole message was validated before splitting, and splitting
/// only ever breaks on an ASCII space, which never falls inside a
/// multi-byte sequence.
fn text_field(bytes: Vec<u8>) -> String {
    String::from_utf8(bytes).expect("message-level UTF-8 validated before field splitting")
}

fn handle_register(
    storage: &Storage,
    session: &mut Session,
    mut fields: Vec<Vec<u8>>,
) -> Result<Response, HandlerError> {
    let password = text_field(fields.pop().expect("register has 2 fields"));
    let username = text_field(fields.pop().expect("register has 2 fields"));

    if username.chars().count() > 30 {
        return Err(HandlerError::new("username longer than 30 chars"));
    }
    if password.chars().count() > 50 {
        return Err(HandlerError::new("password longer than 50 chars"));
    }

    match storage.create_user(&username, &password) {
        Ok(uid) => {
            session.uid = Some(uid);
            Ok(Response::ok())
        }
        Err(StorageError::UserAlreadyExists) => {
            Err(HandlerError::new("username is already registered"))
        }
        Err(err) => Err(err.into()),
    }
}

fn handle_login(
    storage: &Storage,
    session: &mut Session,
    mut fields: Vec<Vec<u8>>,
) -> Result<Response, HandlerError> {
    let password = text_field(fields.pop().expect("login has 2 fields"));
    let username = text_field(fields.pop().expect("login has 2 fields"));

    match storage.find_user_by_credentials(&username, &password)? {
        Some(uid) => {
            session.uid = Some(uid);
            Ok(Response::ok())
        }
        None => Err(HandlerError::new("invalid username or password")),
    }
}

fn handle_logout(
    _storage: &Storage,
    session: &mut Session,
    _fields: Vec<Vec<u8>>,
) -> Result<Response, HandlerError> {
    session.uid = None;
    Ok(Response::ok())
}

fn handle_send(
    storage: &Storage,
    session: &mut Session,
    mut fields: Vec<Vec<u8>>,
) -> Result<Response, HandlerError> {
    let body = text_field(fields.pop().expect("send has 2 fields"));
    let recipient = text_field(fields.pop().expect("send has 2 fields"));

    if body.chars().count() > 256 {
        return Err(HandlerError::new("message too long"));
    }

    let sender = session.uid.expect("send requires an active login");

    if recipient == "*" {
        for recipient_id in storage.list_user_ids()? {
            storage.insert_message(sender, "*", recipient_id, &body)?;
        }
    } else {
        let recipient_id = storage
            .find_user_by_name(&recipient)?
            .ok_or_else(|| HandlerError::new("recipient does not exist"))?;
        storage.insert_message(sender, &recipient, recipient_id, &body)?;
    }

    Ok(Response::ok())
}

fn handle_recv(
    storage: &Storage,
    session: &mut Session,
    _fields: Vec<Vec<u8>>,
) -> Result<Response, HandlerError> {
    let uid = session.uid.expect("recv requires an active login");
    let messages = storage.drain_inbox(uid)?;

    if messages.is_empty() {
        return Err(HandlerError::new("inbox is empty"));
    }

    let body = messages
        .into_iter()
        .map(|m| {
            format!(
                "message {} {} {} {}",
                m.timestamp, m.source_username, m.destination, m.body
            )
        })
        .collect::<Vec<_>>()
        .join("\r\n");
    Ok(Response::Text(body))
}

fn handle_upload(
    storage: &Storage,
    _session: &mut Session,
    mut fields: Vec<Vec<u8>>,
) -> Result<Response, HandlerError> {
    let filebytes = fields.pop().expect("upload has 3 fields");
    let _filelength = fields.pop().expect("upload has 3 fields");
    let filename_bytes = fields.pop().expect("upload has 3 fields");

    let filename =
        String::from_utf8(filename_bytes).map_err(|_| HandlerError::new("invalid UTF-8"))?;

    match storage.write_new_file(&filename, &filebytes) {
        Ok(()) => Ok(Response::ok()),
        Err(StorageError::FileAlreadyExists) => Err(HandlerError::new("file already exists")),
        Err(_) => Err(HandlerError::new("could not write to file")),
    }
}

fn handle_listfiles(
    storage: &Storage,
    _session: &mut Session,
    _fields: Vec<Vec<u8>>,
) -> Result<Response, HandlerError> {
    let files = storage.list_files()?;
    if files.is_empty() {
        Ok(Response::Text("filelist".to_string()))
    } else {
        Ok(Response::Text(format!("filelist {}", files.join(" "))))
    }
}

fn handle_download(
    storage: &Storage,
    _session: &mut Session,
    mut fields: Vec<Vec<u8>>,
) -> Result<Response, HandlerError> {
    let filename = text_field(fields.pop().expect("download has 1 field"));

    match storage.read_file(&filename) {
        Ok(contents) => {
            let mut response = format!("file {} {} ", filename, contents.len()).into_bytes();
            response.extend_from_slice(&contents);
            Ok(Response::Binary(response))
        }
        Err(_) => Err(HandlerError::new("could not read from file")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_storage() -> (tempfile::TempDir, Storage) {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Storage::open(&dir.path().join("chat.db"), &dir.path().join("files"))
            .expect("open storage");
        (dir, storage)
    }

    fn run(storage: &Storage, session: &mut Session, message: &[u8]) -> Result<Response, HandlerError> {
        dispatch(storage, session, message)
    }

    fn text(response: Response) -> String {
        String::from_utf8(response.into_bytes()).expect("text response")
    }

    #[test]
    fn register_logs_the_new_account_in() {
        let (_dir, storage) = temp_storage();
        let mut session = Session::new();
        let response = run(&storage, &mut session, b"register alice hunter2").unwrap();
        assert_eq!(text(response), "success");
        assert!(session.uid.is_some());
    }

    #[test]
    fn register_rejects_a_taken_username() {
        let (_dir, storage) = temp_storage();
        let mut session = Session::new();
        run(&storage, &mut session, b"register alice hunter2").unwrap();

        let mut other = Session::new();
        let err = run(&storage, &mut other, b"register alice different").unwrap_err();
        assert_eq!(err.0, "username is already registered");
    }

    #[test]
    fn register_rejects_oversized_username_by_code_points_not_bytes() {
        let (_dir, storage) = temp_storage();
        let mut session = Session::new();

        let exactly_30 = "\u{0434}".repeat(30);
        let response = run(
            &storage,
            &mut session,
            format!("register {exactly_30} pw").as_bytes(),
        )
        .unwrap();
        assert_eq!(text(response), "success");

        let mut other = Session::new();
        let too_long = "\u{0434}".repeat(31);
        let err = run(
            &storage,
            &mut other,
            format!("register {too_long} pw").as_bytes(),
        )
        .unwrap_err();
        assert_eq!(err.0, "username longer than 30 chars");
    }

    #[test]
    fn register_rejects_oversized_password() {
        let (_dir, storage) = temp_storage();
        let mut session = Session::new();
        let password = "a".repeat(51);
        let err = run(
            &storage,
            &mut session,
            format!("register alice {password}").as_bytes(),
        )
        .unwrap_err();
        assert_eq!(err.0, "password longer than 50 chars");
    }

    #[test]
    fn login_requires_not_already_being_logged_in() {
        let (_dir, storage) = temp_storage();
        let mut session = Session::new();
        run(&storage, &mut session, b"register alice hunter2").unwrap();

        let err = run(&storage, &mut session, b"login alice hunter2").unwrap_err();
        assert_eq!(err.0, "must not be logged in");
    }

    #[test]
    fn recv_while_logged_out_is_an_auth_error_not_a_field_count_error() {
        let (_dir, storage) = temp_storage();
        let mut session = Session::new();
        let err = run(&storage, &mut session, b"recv alice").unwrap_err();
        assert_eq!(err.0, "must be logged in");
    }

    #[test]
    fn direct_message_round_trips() {
        let (_dir, storage) = temp_storage();

        let mut alice = Session::new();
        run(&storage, &mut alice, b"register alice pw").unwrap();
        let mut bob = Session::new();
        run(&storage, &mut bob, b"register bob pw").unwrap();

        run(&storage, &mut alice, b"send bob hello there").unwrap();

        let response = run(&storage, &mut bob, b"recv").unwrap();
        let body = text(response);
        assert!(body.contains("alice"));
        assert!(body.contains("bob"));
        assert!(body.contains("hello there"));
    }

    #[test]
    fn broadcast_reaches_every_user_including_sender() {
        let (_dir, storage) = temp_storage();

        let mut alice = Session::new();
        run(&storage, &mut alice, b"register alice pw").unwrap();
        let mut bob = Session::new();
        run(&storage, &mut bob, b"register bob pw").unwrap();

        run(&storage, &mut alice, b"send * hi everyone").unwrap();

        assert!(text(run(&storage, &mut alice, b"recv").unwrap()).contains("hi everyone"));
        assert!(text(run(&storage, &mut bob, b"recv").unwrap()).contains("hi everyone"));
    }

    #[test]
    fn recv_reports_an_empty_inbox_as_an_error() {
        let (_dir, storage) = temp_storage();
        let mut alice = Session::new();
        run(&storage, &mut alice, b"register alice pw").unwrap();
        let err = run(&storage, &mut alice, b"recv").unwrap_err();
        assert_eq!(err.0, "inbox is empty");
    }

    #[test]
    fn send_to_unknown_recipient_is_rejected() {
        let (_dir, storage) = temp_storage();
        let mut alice = Session::new();
        run(&storage, &mut alice, b"register alice pw").unwrap();
        let err = run(&storage, &mut alice, b"send ghost hi").unwrap_err();
        assert_eq!(err.0, "recipient does not exist");
    }

    #[test]
    fn send_rejects_an_overlong_message() {
        let (_dir, storage) = temp_storage();
        let mut alice = Session::new();
        run(&storage, &mut alice, b"register alice pw").unwrap();

        let body = "a".repeat(257);
        let err = run(&storage, &mut alice, format!("send alice {body}").as_bytes()).unwrap_err();
        assert_eq!(err.0, "message too long");
    }

    #[test]
    fn upload_then_download_round_trips_binary_data() {
        let (_dir, storage) = temp_storage();
        let mut alice = Session::new();
        run(&storage, &mut alice, b"register alice pw").unwrap();

        let mut message = b"upload photo.bin 4 ".to_vec();
        message.extend_from_slice(&[0xff, 0x00, 0xfe, 0x01]);
        run(&storage, &mut alice, &message).unwrap();

        let response = run(&storage, &mut alice, b"download photo.bin").unwrap();
        let bytes = response.into_bytes();
        assert!(bytes.starts_with(b"file photo.bin 4 "));
        assert!(bytes.ends_with(&[0xff, 0x00, 0xfe, 0x01]));
    }

    #[test]
    fn upload_forbids_overwriting_an_existing_file() {
        let (_dir, storage) = temp_storage();
        let mut alice = Session::new();
        run(&storage, &mut alice, b"register alice pw").unwrap();

        run(&storage, &mut alice, b"upload a.bin 1 x").unwrap();
        let err = run(&storage, &mut alice, b"upload a.bin 1 y").unwrap_err();
        assert_eq!(err.0, "file already exists");
    }

    #[test]
    fn listfiles_reports_empty_listing() {
        let (_dir, storage) = temp_storage();
        let mut alice = Session::new();
        run(&storage, &mut alice, b"register alice pw").unwrap();
        let response = run(&storage, &mut alice, b"listfiles").unwrap();
        assert_eq!(text(response), "filelist");
    }

    #[test]
    fn download_missing_file_is_an_error() {
        let (_dir, storage) = temp_storage();
        let mut alice = Session::new();
        run(&storage, &mut alice, b"register alice pw").unwrap();
        let err = run(&storage, &mut alice, b"download ghost.bin").unwrap_err();
        assert_eq!(err.0, "could not read from file");
    }

    #[test]
    fn unknown_command_is_reported() {
        let (_dir, storage) = temp_storage();
        let mut session = Session::new();
        let err = run(&storage, &mut session, b"frobnicate").unwrap_err();
        assert_eq!(err.0, "no such command");
    }

    #[test]
    fn wrong_field_count_is_reported() {
        let (_dir, storage) = temp_storage();
        let mut alice = Session::new();
        run(&storage, &mut alice, b"register alice pw").unwrap();
        let err = run(&storage, &mut alice, b"download a.bin extra").unwrap_err();
        assert_eq!(err.0, "wrong number of fields");
    }

    #[test]
    fn invalid_utf8_in_a_text_command_is_reported() {
        let (_dir, storage) = temp_storage();
        let mut session = Session::new();
        let err = run(&storage, &mut session, b"login \xff\xfe bad").unwrap_err();
        assert_eq!(err.0, "invalid UTF-8");
    }
}
