//! User persistence. Identity is keyed by (oauth_provider, oauth_subject);
//! email is unique as well but never used for linking.

use anthology_common::{user::User, Error, Result, UserId};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{is_unique_violation, opt_ts, parse_opt_ts, parse_ts, parse_uuid, storage, ts};

const USER_COLUMNS: &str = "id, email, display_name, avatar_url, oauth_provider, oauth_subject, \
     created_at, updated_at, last_login_at";

pub(crate) fn row_to_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: UserId(parse_uuid(0, &row.get::<_, String>(0)?)?),
        email: row.get(1)?,
        display_name: row.get(2)?,
        avatar_url: row.get(3)?,
        oauth_provider: row.get(4)?,
        oauth_subject: row.get(5)?,
        created_at: parse_ts(6, &row.get::<_, String>(6)?)?,
        updated_at: parse_ts(7, &row.get::<_, String>(7)?)?,
        last_login_at: parse_opt_ts(8, row.get(8)?)?,
    })
}

pub fn insert(conn: &Connection, user: &User) -> Result<()> {
    conn.execute(
        "INSERT INTO users (id, email, display_name, avatar_url, oauth_provider, oauth_subject, \
         created_at, updated_at, last_login_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            user.id.to_string(),
            user.email,
            user.display_name,
            user.avatar_url,
            user.oauth_provider,
            user.oauth_subject,
            ts(user.created_at),
            ts(user.updated_at),
            opt_ts(user.last_login_at),
        ],
    )
    .map_err(|e| {
        if is_unique_violation(&e) {
            Error::conflict("a user with that email or identity already exists")
        } else {
            storage(e)
        }
    })?;
    Ok(())
}

pub fn find_by_id(conn: &Connection, id: UserId) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
        [id.to_string()],
        row_to_user,
    )
    .optional()
    .map_err(storage)
}

pub fn find_by_oauth(conn: &Connection, provider: &str, subject: &str) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE oauth_provider = ?1 AND oauth_subject = ?2"),
        params![provider, subject],
        row_to_user,
    )
    .optional()
    .map_err(storage)
}

pub fn find_by_email(conn: &Connection, email: &str) -> Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?1"),
        [email],
        row_to_user,
    )
    .optional()
    .map_err(storage)
}

/// Refresh the profile fields that track the upstream provider, in a single
/// update. Returns the refreshed user.
pub fn refresh_profile(
    conn: &Connection,
    id: UserId,
    display_name: &str,
    avatar_url: &str,
    now: DateTime<Utc>,
) -> Result<User> {
    let changed = conn
        .execute(
            "UPDATE users SET display_name = ?1, avatar_url = ?2, updated_at = ?3, \
             last_login_at = ?3 WHERE id = ?4",
            params![display_name, avatar_url, ts(now), id.to_string()],
        )
        .map_err(storage)?;
    if changed == 0 {
        return Err(Error::not_found("user"));
    }
    find_by_id(conn, id)?.ok_or_else(|| Error::not_found("user"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{open_db, seed_user};

    #[test]
    fn test_insert_and_find() {
        let db = open_db();
        let user = seed_user(&db, "a@example.com");

        let by_id = find_by_id(db.conn(), user.id).unwrap().unwrap();
        assert_eq!(by_id, user);

        let by_oauth = find_by_oauth(db.conn(), "google", &user.oauth_subject)
            .unwrap()
            .unwrap();
        assert_eq!(by_oauth.id, user.id);

        assert!(find_by_oauth(db.conn(), "github", &user.oauth_subject)
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_duplicate_email_conflicts() {
        let db = open_db();
        let first = seed_user(&db, "dup@example.com");
        let mut clone = first.clone();
        clone.id = UserId::new();
        clone.oauth_subject = "other-subject".to_string();
        let err = insert(db.conn(), &clone).unwrap_err();
        assert_eq!(err.http_status(), 409);
    }

    #[test]
    fn test_refresh_profile() {
        let db = open_db();
        let user = seed_user(&db, "r@example.com");
        let now = Utc::now();
        let updated =
            refresh_profile(db.conn(), user.id, "New Name", "https://img/p.png", now).unwrap();
        assert_eq!(updated.display_name, "New Name");
        assert_eq!(updated.avatar_url, "https://img/p.png");
        assert!(updated.last_login_at.is_some());
        // (provider, subject) is immutable.
        assert_eq!(updated.oauth_subject, user.oauth_subject);
    }

    #[test]
    fn test_refresh_missing_user() {
        let db = open_db();
        let err = refresh_profile(db.conn(), UserId::new(), "x", "", Utc::now()).unwrap_err();
        assert_eq!(err.http_status(), 404);
    }
}
