//! # User and Role Repositories
//!
//! Accounts with argon2 password hashes. The hash never leaves this module:
//! every read returns [`User`], which has no password field.
//!
//! ## Login Flow
//! ```text
//! POST /api/login {login, password}
//!      │
//!      ▼
//! verify_credentials(login, password)
//!      │
//!      ├── unknown login / wrong password ──► None  (401)
//!      │
//!      └── Some(user) ──► user.is_active()?
//!                             ├── no  ──► 403
//!                             └── yes ──► JWT
//! ```

use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::password::{hash_password, verify_password};
use kardex_core::{NewUser, PasswordReset, RoleRecord, User, UserUpdate};

const USER_SELECT: &str = r#"
    SELECT
        u.id,
        u.login,
        u.name,
        u.surname,
        u.role_id,
        r.name AS role_name,
        u.status
    FROM users u
    LEFT JOIN roles r ON r.id = u.role_id
"#;

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: User,
    password_hash: String,
}

// =============================================================================
// Roles
// =============================================================================

/// Read-only access to the fixed role table.
#[derive(Debug, Clone)]
pub struct RoleRepository {
    pool: SqlitePool,
}

impl RoleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RoleRepository { pool }
    }

    /// Lists roles in id order.
    pub async fn list(&self) -> DbResult<Vec<RoleRecord>> {
        let roles = sqlx::query_as::<_, RoleRecord>("SELECT id, name FROM roles ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(roles)
    }
}

// =============================================================================
// Users
// =============================================================================

/// Repository for user accounts.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Lists every user, ordered by login.
    pub async fn list(&self) -> DbResult<Vec<User>> {
        let sql = format!("{USER_SELECT} ORDER BY u.login");

        let users = sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.pool)
            .await?;

        debug!(count = users.len(), "Listed users");
        Ok(users)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<User>> {
        let sql = format!("{USER_SELECT} WHERE u.id = ?");

        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Checks a login/password pair.
    ///
    /// ## Returns
    /// - `Ok(Some(user))` if the password matches, whatever the user's status
    /// - `Ok(None)` for an unknown login or a wrong password
    pub async fn verify_credentials(&self, login: &str, password: &str) -> DbResult<Option<User>> {
        let row = sqlx::query_as::<_, CredentialRow>(
            r#"
            SELECT
                u.id,
                u.login,
                u.name,
                u.surname,
                u.role_id,
                r.name AS role_name,
                u.status,
                u.password_hash
            FROM users u
            LEFT JOIN roles r ON r.id = u.role_id
            WHERE u.login = ?
            "#,
        )
        .bind(login)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            debug!(login = %login, "Login attempt for unknown user");
            return Ok(None);
        };

        if !verify_password(password, &row.password_hash) {
            warn!(user_id = row.user.id, "Login attempt with wrong password");
            return Ok(None);
        }

        Ok(Some(row.user))
    }

    /// Creates an active user and returns its id. The password is hashed
    /// before it touches the database.
    ///
    /// ## Errors
    /// - `UniqueViolation` if the login is taken
    pub async fn insert(&self, user: &NewUser) -> DbResult<i64> {
        let password_hash = hash_password(&user.password)?;

        let id = sqlx::query(
            r#"
            INSERT INTO users (login, name, surname, password_hash, role_id, status)
            VALUES (?, ?, ?, ?, ?, 'Activo')
            "#,
        )
        .bind(&user.login)
        .bind(&user.name)
        .bind(&user.surname)
        .bind(&password_hash)
        .bind(user.role.id())
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(&user.login))?
        .last_insert_rowid();

        info!(user_id = id, login = %user.login, role = user.role.name(), "User created");
        Ok(id)
    }

    /// Updates profile, role and status. The password is left alone.
    pub async fn update(&self, id: i64, update: &UserUpdate) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET login = ?, name = ?, surname = ?, role_id = ?, status = ?
            WHERE id = ?
            "#,
        )
        .bind(&update.login)
        .bind(&update.name)
        .bind(&update.surname)
        .bind(update.role.id())
        .bind(update.status)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(&update.login))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        info!(user_id = id, status = update.status.as_str(), "User updated");
        Ok(())
    }

    /// Replaces the password of the account with the given login.
    pub async fn reset_password(&self, reset: &PasswordReset) -> DbResult<()> {
        let password_hash = hash_password(&reset.new_password)?;

        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE login = ?")
            .bind(&password_hash)
            .bind(&reset.login)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", &reset.login));
        }

        info!(login = %reset.login, "Password reset");
        Ok(())
    }
}
