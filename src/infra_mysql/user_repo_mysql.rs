use crate::application_port::AuthError;
use crate::domain_model::{Role, UserId, UserRecord};
use crate::domain_port::{NewUser, UserChanges, UserFilter, UserRepo};
use chrono::{DateTime, Utc};
use sqlx::mysql::{MySqlDatabaseError, MySqlRow};
use sqlx::{MySqlPool, Row};

const USER_COLUMNS: &str = "user_id, email, password_hash, first_name, last_name, phone, role, \
     is_active, is_email_verified, is_phone_verified, last_login, \
     reset_token_digest, reset_expires_at, created_at, updated_at";

pub struct MySqlUserRepo {
    pool: MySqlPool,
}

impl MySqlUserRepo {
    pub fn new(pool: MySqlPool) -> Self {
        MySqlUserRepo { pool }
    }

    fn row_to_record(row: MySqlRow) -> Result<UserRecord, AuthError> {
        let store_err = |e: sqlx::Error| AuthError::Store(e.to_string());

        let role: String = row.try_get("role").map_err(store_err)?;
        let role = role
            .parse::<Role>()
            .map_err(|e| AuthError::Store(format!("bad role column: {e}")))?;

        Ok(UserRecord {
            id: row.try_get("user_id").map_err(store_err)?,
            email: row.try_get("email").map_err(store_err)?,
            password_hash: row.try_get("password_hash").map_err(store_err)?,
            first_name: row.try_get("first_name").map_err(store_err)?,
            last_name: row.try_get("last_name").map_err(store_err)?,
            phone: row.try_get("phone").map_err(store_err)?,
            role,
            is_active: row.try_get("is_active").map_err(store_err)?,
            is_email_verified: row.try_get("is_email_verified").map_err(store_err)?,
            is_phone_verified: row.try_get("is_phone_verified").map_err(store_err)?,
            last_login: row.try_get("last_login").map_err(store_err)?,
            reset_token_digest: row.try_get("reset_token_digest").map_err(store_err)?,
            reset_expires_at: row.try_get("reset_expires_at").map_err(store_err)?,
            created_at: row.try_get("created_at").map_err(store_err)?,
            updated_at: row.try_get("updated_at").map_err(store_err)?,
        })
    }

    async fn fetch_by_id(&self, id: UserId) -> Result<Option<UserRecord>, AuthError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM user WHERE user_id = ?");
        let row = sqlx::query(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        row.map(Self::row_to_record).transpose()
    }

    /// Appends the WHERE tail for a [`UserFilter`]; bind order must match
    /// [`Self::bind_filter`].
    fn filter_sql(filter: &UserFilter) -> String {
        let mut sql = String::new();
        if filter.role.is_some() {
            sql.push_str(" AND role = ?");
        }
        if filter.is_active.is_some() {
            sql.push_str(" AND is_active = ?");
        }
        if filter.search.is_some() {
            sql.push_str(
                " AND (LOWER(first_name) LIKE ? OR LOWER(last_name) LIKE ? OR LOWER(email) LIKE ?)",
            );
        }
        sql
    }

    fn bind_filter<'q>(
        mut query: sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments>,
        filter: &'q UserFilter,
        pattern: &'q Option<String>,
    ) -> sqlx::query::Query<'q, sqlx::MySql, sqlx::mysql::MySqlArguments> {
        if let Some(role) = filter.role {
            query = query.bind(role.as_str());
        }
        if let Some(active) = filter.is_active {
            query = query.bind(active);
        }
        if let Some(pattern) = pattern {
            query = query.bind(pattern).bind(pattern).bind(pattern);
        }
        query
    }

    fn search_pattern(filter: &UserFilter) -> Option<String> {
        filter
            .search
            .as_ref()
            .map(|term| format!("%{}%", term.to_lowercase()))
    }
}

fn is_dup_key(err: &sqlx::Error) -> bool {
    if let sqlx::Error::Database(db) = err {
        if let Some(mysql_err) = db.try_downcast_ref::<MySqlDatabaseError>() {
            return mysql_err.number() == 1062; // ER_DUP_ENTRY
        }
    }

    false
}

#[async_trait::async_trait]
impl UserRepo for MySqlUserRepo {
    async fn create(&self, user: NewUser) -> Result<UserRecord, AuthError> {
        let now = Utc::now();

        // The email column carries a unique key with a binary collation, so
        // the race-loser lands here as ER_DUP_ENTRY and lookups stay
        // case-sensitive.
        sqlx::query(
            r#"
INSERT INTO user (user_id, email, password_hash, first_name, last_name, phone, role,
                  is_active, is_email_verified, is_phone_verified, created_at, updated_at)
VALUES (?, ?, ?, ?, ?, ?, ?, TRUE, FALSE, FALSE, ?, ?)
"#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(user.role.as_str())
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_dup_key(&e) {
                AuthError::EmailTaken
            } else {
                AuthError::Store(e.to_string())
            }
        })?;

        Ok(UserRecord {
            id: user.id,
            email: user.email,
            password_hash: user.password_hash,
            first_name: user.first_name,
            last_name: user.last_name,
            phone: user.phone,
            role: user.role,
            is_active: true,
            is_email_verified: false,
            is_phone_verified: false,
            last_login: None,
            reset_token_digest: None,
            reset_expires_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AuthError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM user WHERE email = ?");
        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        row.map(Self::row_to_record).transpose()
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<UserRecord>, AuthError> {
        self.fetch_by_id(id).await
    }

    async fn find_by_reset_digest(
        &self,
        digest: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<UserRecord>, AuthError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM user WHERE reset_token_digest = ? AND reset_expires_at > ?"
        );
        let row = sqlx::query(&sql)
            .bind(digest)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        row.map(Self::row_to_record).transpose()
    }

    async fn record_login(&self, id: UserId, at: DateTime<Utc>) -> Result<(), AuthError> {
        sqlx::query("UPDATE user SET last_login = ?, updated_at = ? WHERE user_id = ?")
            .bind(at)
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: UserId,
        digest: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError> {
        sqlx::query(
            r#"
UPDATE user
SET reset_token_digest = ?, reset_expires_at = ?, updated_at = ?
WHERE user_id = ?
"#,
        )
        .bind(digest)
        .bind(expires_at)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;
        Ok(())
    }

    async fn replace_password(&self, id: UserId, password_hash: &str) -> Result<(), AuthError> {
        // One statement: the new hash lands and the reset window closes
        // together or not at all.
        sqlx::query(
            r#"
UPDATE user
SET password_hash = ?, reset_token_digest = NULL, reset_expires_at = NULL, updated_at = ?
WHERE user_id = ?
"#,
        )
        .bind(password_hash)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;
        Ok(())
    }

    async fn update(
        &self,
        id: UserId,
        changes: UserChanges,
    ) -> Result<Option<UserRecord>, AuthError> {
        sqlx::query(
            r#"
UPDATE user
SET first_name = COALESCE(?, first_name),
    last_name = COALESCE(?, last_name),
    phone = COALESCE(?, phone),
    role = COALESCE(?, role),
    is_active = COALESCE(?, is_active),
    is_email_verified = COALESCE(?, is_email_verified),
    is_phone_verified = COALESCE(?, is_phone_verified),
    updated_at = ?
WHERE user_id = ?
"#,
        )
        .bind(&changes.first_name)
        .bind(&changes.last_name)
        .bind(&changes.phone)
        .bind(changes.role.map(|r| r.as_str()))
        .bind(changes.is_active)
        .bind(changes.is_email_verified)
        .bind(changes.is_phone_verified)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?;

        self.fetch_by_id(id).await
    }

    async fn set_active(
        &self,
        id: UserId,
        active: bool,
    ) -> Result<Option<UserRecord>, AuthError> {
        sqlx::query("UPDATE user SET is_active = ?, updated_at = ? WHERE user_id = ?")
            .bind(active)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;

        self.fetch_by_id(id).await
    }

    async fn delete(&self, id: UserId) -> Result<bool, AuthError> {
        let result = sqlx::query("DELETE FROM user WHERE user_id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        Ok(result.rows_affected() > 0)
    }

    async fn count(&self, filter: &UserFilter) -> Result<u64, AuthError> {
        let sql = format!(
            "SELECT COUNT(*) FROM user WHERE 1=1{}",
            Self::filter_sql(filter)
        );
        let pattern = Self::search_pattern(filter);
        let query = Self::bind_filter(sqlx::query(&sql), filter, &pattern);

        let row = query
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        let count: i64 = row.try_get(0).map_err(|e| AuthError::Store(e.to_string()))?;
        Ok(count as u64)
    }

    async fn list(
        &self,
        filter: &UserFilter,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<UserRecord>, AuthError> {
        let sql = format!(
            "SELECT {USER_COLUMNS} FROM user WHERE 1=1{} ORDER BY created_at DESC LIMIT ? OFFSET ?",
            Self::filter_sql(filter)
        );
        let pattern = Self::search_pattern(filter);
        let query = Self::bind_filter(sqlx::query(&sql), filter, &pattern)
            .bind(limit as i64)
            .bind(skip as i64);

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AuthError::Store(e.to_string()))?;
        rows.into_iter().map(Self::row_to_record).collect()
    }
}
