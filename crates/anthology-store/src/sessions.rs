//! Session persistence. Rows are looked up only by token hash; the
//! plaintext token never reaches this module.

use anthology_common::{user::SessionRecord, user::User, Result, SessionId, UserId};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::{parse_ts, parse_uuid, storage, ts};

fn row_to_session(row: &Row<'_>) -> rusqlite::Result<SessionRecord> {
    Ok(SessionRecord {
        id: SessionId(parse_uuid(0, &row.get::<_, String>(0)?)?),
        user_id: UserId(parse_uuid(1, &row.get::<_, String>(1)?)?),
        token_hash: row.get(2)?,
        expires_at: parse_ts(3, &row.get::<_, String>(3)?)?,
        created_at: parse_ts(4, &row.get::<_, String>(4)?)?,
        user_agent: row.get(5)?,
        ip_address: row.get(6)?,
    })
}

pub fn insert(conn: &Connection, record: &SessionRecord) -> Result<()> {
    conn.execute(
        "INSERT INTO user_sessions (id, user_id, token_hash, expires_at, created_at, \
         user_agent, ip_address) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            record.id.to_string(),
            record.user_id.to_string(),
            record.token_hash,
            ts(record.expires_at),
            ts(record.created_at),
            record.user_agent,
            record.ip_address,
        ],
    )
    .map_err(storage)?;
    Ok(())
}

/// Look a session up by token hash, joined with its owning user.
pub fn find_by_hash(conn: &Connection, token_hash: &str) -> Result<Option<(SessionRecord, User)>> {
    conn.query_row(
        "SELECT s.id, s.user_id, s.token_hash, s.expires_at, s.created_at, s.user_agent, \
         s.ip_address, \
         u.id, u.email, u.display_name, u.avatar_url, u.oauth_provider, u.oauth_subject, \
         u.created_at, u.updated_at, u.last_login_at \
         FROM user_sessions s JOIN users u ON u.id = s.user_id \
         WHERE s.token_hash = ?1",
        [token_hash],
        |row| {
            let session = row_to_session(row)?;
            // User columns start at offset 7.
            let user = User {
                id: UserId(parse_uuid(7, &row.get::<_, String>(7)?)?),
                email: row.get(8)?,
                display_name: row.get(9)?,
                avatar_url: row.get(10)?,
                oauth_provider: row.get(11)?,
                oauth_subject: row.get(12)?,
                created_at: parse_ts(13, &row.get::<_, String>(13)?)?,
                updated_at: parse_ts(14, &row.get::<_, String>(14)?)?,
                last_login_at: crate::db::parse_opt_ts(15, row.get(15)?)?,
            };
            Ok((session, user))
        },
    )
    .optional()
    .map_err(storage)
}

pub fn delete_by_id(conn: &Connection, id: SessionId) -> Result<u64> {
    let n = conn
        .execute("DELETE FROM user_sessions WHERE id = ?1", [id.to_string()])
        .map_err(storage)?;
    Ok(n as u64)
}

pub fn delete_by_hash(conn: &Connection, token_hash: &str) -> Result<u64> {
    let n = conn
        .execute("DELETE FROM user_sessions WHERE token_hash = ?1", [token_hash])
        .map_err(storage)?;
    Ok(n as u64)
}

/// Remove every session whose expiry is at or before `now`.
pub fn delete_expired(conn: &Connection, now: DateTime<Utc>) -> Result<u64> {
    let n = conn
        .execute("DELETE FROM user_sessions WHERE expires_at <= ?1", [ts(now)])
        .map_err(storage)?;
    Ok(n as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::{open_db, seed_user};
    use chrono::Duration;

    fn record(user_id: UserId, hash: &str, expires_at: DateTime<Utc>) -> SessionRecord {
        SessionRecord {
            id: SessionId::new(),
            user_id,
            token_hash: hash.to_string(),
            expires_at,
            created_at: Utc::now(),
            user_agent: "test-agent".to_string(),
            ip_address: "127.0.0.1".to_string(),
        }
    }

    #[test]
    fn test_insert_and_find_by_hash() {
        let db = open_db();
        let user = seed_user(&db, "s@example.com");
        let rec = record(user.id, &"a".repeat(64), Utc::now() + Duration::hours(12));
        insert(db.conn(), &rec).unwrap();

        let (found, owner) = find_by_hash(db.conn(), &rec.token_hash).unwrap().unwrap();
        assert_eq!(found, rec);
        assert_eq!(owner.id, user.id);

        assert!(find_by_hash(db.conn(), &"b".repeat(64)).unwrap().is_none());
    }

    #[test]
    fn test_duplicate_hash_rejected() {
        let db = open_db();
        let user = seed_user(&db, "h@example.com");
        let hash = "c".repeat(64);
        insert(db.conn(), &record(user.id, &hash, Utc::now())).unwrap();
        assert!(insert(db.conn(), &record(user.id, &hash, Utc::now())).is_err());
    }

    #[test]
    fn test_delete_expired_only() {
        let db = open_db();
        let user = seed_user(&db, "e@example.com");
        let now = Utc::now();
        insert(db.conn(), &record(user.id, &"d".repeat(64), now - Duration::hours(1))).unwrap();
        insert(db.conn(), &record(user.id, &"e".repeat(64), now)).unwrap();
        insert(db.conn(), &record(user.id, &"f".repeat(64), now + Duration::hours(1))).unwrap();

        // expires_at <= now is swept, strictly-future rows stay.
        assert_eq!(delete_expired(db.conn(), now).unwrap(), 2);
        assert!(find_by_hash(db.conn(), &"f".repeat(64)).unwrap().is_some());
    }

    #[test]
    fn test_delete_by_hash_counts_rows() {
        let db = open_db();
        let user = seed_user(&db, "d@example.com");
        let hash = "9".repeat(64);
        insert(db.conn(), &record(user.id, &hash, Utc::now())).unwrap();
        assert_eq!(delete_by_hash(db.conn(), &hash).unwrap(), 1);
        assert_eq!(delete_by_hash(db.conn(), &hash).unwrap(), 0);
    }

    #[test]
    fn test_user_delete_cascades_sessions() {
        let db = open_db();
        let user = seed_user(&db, "c@example.com");
        let hash = "8".repeat(64);
        insert(db.conn(), &record(user.id, &hash, Utc::now())).unwrap();
        db.conn()
            .execute("DELETE FROM users WHERE id = ?1", [user.id.to_string()])
            .unwrap();
        assert!(find_by_hash(db.conn(), &hash).unwrap().is_none());
    }
}
