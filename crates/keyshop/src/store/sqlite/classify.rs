use crate::store::{StoreError, TransientClassifier};

const SQLITE_BUSY: i32 = 5;
const SQLITE_LOCKED: i32 = 6;

/// Lock contention and connection trouble are worth another attempt;
/// constraint violations and decode failures are not.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteClassifier;

impl SqliteClassifier {
    fn is_transient_sqlx(error: &sqlx::Error) -> bool {
        match error {
            sqlx::Error::Database(db) => db
                .code()
                .and_then(|code| code.parse::<i32>().ok())
                // Extended codes (BUSY_SNAPSHOT = 517, ...) keep the primary code in the low byte.
                .is_some_and(|code| matches!(code & 0xff, SQLITE_BUSY | SQLITE_LOCKED)),
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) | sqlx::Error::WorkerCrashed => true,
            _ => false,
        }
    }
}

impl TransientClassifier for SqliteClassifier {
    fn is_transient(&self, error: &StoreError) -> bool {
        match error {
            StoreError::Backend(source) => source
                .downcast_ref::<sqlx::Error>()
                .is_some_and(Self::is_transient_sqlx),
            _ => false,
        }
    }
}
