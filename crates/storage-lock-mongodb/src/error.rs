use mongodb::error::{Error as MongoError, ErrorKind, WriteFailure};

/// Server error code for a unique index violation.
const DUPLICATE_KEY_CODE: i32 = 11000;

/// Whether an insert failed because the lock id is already taken.
///
/// Checks the server error code first and falls back to the message text for
/// servers or proxies that rewrap the write error.
pub(crate) fn is_duplicate_key(err: &MongoError) -> bool {
    if let ErrorKind::Write(WriteFailure::WriteError(write_error)) = &*err.kind {
        if write_error.code == DUPLICATE_KEY_CODE {
            return true;
        }
    }
    message_reports_duplicate_key(&err.to_string())
}

fn message_reports_duplicate_key(message: &str) -> bool {
    message.contains("id dup key") || message.contains("_id_ dup key")
}

#[cfg(test)]
mod tests {
    use mongodb::bson::{doc, from_document};
    use mongodb::error::WriteError;

    use super::*;

    #[test]
    fn test_duplicate_key_messages() {
        assert!(message_reports_duplicate_key(
            "E11000 duplicate key error collection: storage_lock.storage_lock index: _id_ dup key: { _id: \"L1\" }"
        ));
        assert!(message_reports_duplicate_key("id dup key: { : \"L1\" }"));
        assert!(!message_reports_duplicate_key("connection refused"));
        assert!(!message_reports_duplicate_key("duplicate key in owner_id index"));
    }

    fn write_error(code: i32, errmsg: &str) -> MongoError {
        let write_error: WriteError =
            from_document(doc! { "code": code, "errmsg": errmsg }).unwrap();
        MongoError::from(ErrorKind::Write(WriteFailure::WriteError(write_error)))
    }

    #[test]
    fn test_duplicate_key_write_error() {
        assert!(is_duplicate_key(&write_error(11000, "E11000 duplicate key error")));
    }

    #[test]
    fn test_other_write_errors_pass_through() {
        assert!(!is_duplicate_key(&write_error(121, "Document failed validation")));
    }
}
