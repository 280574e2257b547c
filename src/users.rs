use crate::errors::{conflict_on_unique, AppError};
use crate::filters::ListOptions;
use crate::models::{CreateUserDto, UpdateUserDto, User};
use sqlx::{PgPool, QueryBuilder};
use uuid::Uuid;

pub const USER_SORTABLE: &[(&str, &str)] = &[
    ("createdAt", "created_at"),
    ("name", "name"),
    ("email", "email"),
];

/// Storage service for user accounts.
///
/// Authentication happens upstream; this store only manages the account
/// records and keeps password hashes out of every response.
pub struct UserStore {
    pool: PgPool,
}

/// Hash a plaintext password, passing through values that already look like
/// bcrypt hashes so seed tooling can import pre-hashed credentials.
fn hash_password(password: &str) -> Result<String, AppError> {
    if password.starts_with("$2") {
        return Ok(password.to_string());
    }
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::InternalError(format!("Failed to hash password: {}", e)))
}

impl UserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, dto: CreateUserDto) -> Result<User, AppError> {
        let password_hash = hash_password(&dto.password)?;
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, mobile, password_hash, role, is_active)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(&dto.name)
        .bind(&dto.email)
        .bind(&dto.mobile)
        .bind(&password_hash)
        .bind(dto.role)
        .bind(dto.is_active.unwrap_or(true))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "User with this email already exists"))
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = $1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn list(&self, opts: &ListOptions) -> Result<Vec<User>, AppError> {
        let mut qb = QueryBuilder::new("SELECT * FROM users WHERE 1=1");
        opts.push_sql(&mut qb);
        let users = qb.build_query_as::<User>().fetch_all(&self.pool).await?;
        Ok(users)
    }

    pub async fn update(&self, id: Uuid, dto: UpdateUserDto) -> Result<User, AppError> {
        let mut qb = QueryBuilder::new("UPDATE users SET updated_at = now()");
        if let Some(v) = &dto.name {
            qb.push(", name = ").push_bind(v.clone());
        }
        if let Some(v) = &dto.email {
            qb.push(", email = ").push_bind(v.clone());
        }
        if let Some(v) = &dto.mobile {
            qb.push(", mobile = ").push_bind(v.clone());
        }
        if let Some(v) = &dto.password {
            qb.push(", password_hash = ").push_bind(hash_password(v)?);
        }
        if let Some(v) = dto.role {
            qb.push(", role = ").push_bind(v);
        }
        if let Some(v) = dto.is_active {
            qb.push(", is_active = ").push_bind(v);
        }
        qb.push(" WHERE id = ").push_bind(id).push(" RETURNING *");

        qb.build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "User with this email already exists"))?
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("User not found".to_string()));
        }
        Ok(())
    }
}
