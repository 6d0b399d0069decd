use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reclaim_core::identity::normalize_email;
use reclaim_core::repository::UserRepository;
use reclaim_core::{CoreResult, Role, User};
use reclaim_shared::Masked;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::{parse_column, storage_error};

pub struct StoreUserRepository {
    pool: PgPool,
}

impl StoreUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    address: Option<String>,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = reclaim_core::CoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone.map(Masked::new),
            address: row.address.map(Masked::new),
            password_hash: row.password_hash,
            role: parse_column(&row.role)?,
            created_at: row.created_at,
        })
    }
}

const USER_COLUMNS: &str = "id, name, email, phone, address, password_hash, role, created_at";

#[async_trait]
impl UserRepository for StoreUserRepository {
    async fn create_user(&self, user: &User) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, name, email, phone, address, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.phone.as_ref().map(|p| p.expose().as_str()))
        .bind(user.address.as_ref().map(|a| a.expose().as_str()))
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage_error)?;
        Ok(())
    }

    async fn get_user(&self, id: Uuid) -> CoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        row.map(User::try_from).transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE email = $1", USER_COLUMNS))
            .bind(normalize_email(email))
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_error)?;
        row.map(User::try_from).transpose()
    }

    async fn list_users(&self, role: Option<Role>) -> CoreResult<Vec<User>> {
        let rows = match role {
            Some(role) => {
                sqlx::query_as::<_, UserRow>(&format!(
                    "SELECT {} FROM users WHERE role = $1 ORDER BY created_at",
                    USER_COLUMNS
                ))
                .bind(role.as_str())
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users ORDER BY created_at", USER_COLUMNS))
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .map_err(storage_error)?;

        rows.into_iter().map(User::try_from).collect()
    }
}
