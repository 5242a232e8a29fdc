use sqlx::SqlitePool;

use crate::{
    authentication::{hash_password_argon2, verify_password_argon2},
    data_formats::{LoginRequest, RegisterRequest, UpdateUserRequest},
    errors::{RequestError, ALREADY_TAKEN},
    models::User,
};

use super::{get_user_by_email, get_user_by_id, QueryBuilder, USER_COLUMNS};

pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    /// Already hashed.
    pub password: &'a str,
    pub image: Option<&'a str>,
    pub demo: bool,
}

fn taken(e: sqlx::Error) -> RequestError {
    let e = RequestError::from(e);
    if e.is_unique_violation("users.username") {
        RequestError::unprocessable("username", ALREADY_TAKEN)
    } else if e.is_unique_violation("users.email") {
        RequestError::unprocessable("email", ALREADY_TAKEN)
    } else {
        e
    }
}

pub async fn insert_user(pool: &SqlitePool, user: NewUser<'_>) -> Result<User, RequestError> {
    sqlx::query_as::<_, User>(&format!(
        r#"
        INSERT INTO users (email, username, password, image, demo)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING {USER_COLUMNS}
        "#
    ))
    .bind(user.email)
    .bind(user.username)
    .bind(user.password)
    .bind(user.image)
    .bind(user.demo)
    .fetch_one(pool)
    .await
    .map_err(taken)
}

pub async fn register_user_in_db(
    pool: &SqlitePool,
    RegisterRequest {
        email,
        password,
        username,
    }: RegisterRequest,
) -> Result<User, RequestError> {
    if let Some(err) = RequestError::blank_fields([
        ("email", email.as_deref()),
        ("password", password.as_deref()),
        ("username", username.as_deref()),
    ]) {
        return Err(err);
    }
    let password = hash_password_argon2(password.unwrap_or_default())
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "password hashing failed");
            RequestError::ServerError
        })?;
    let user = insert_user(
        pool,
        NewUser {
            username: username.as_deref().unwrap_or_default().trim(),
            email: email.as_deref().unwrap_or_default().trim(),
            password: &password,
            image: None,
            demo: false,
        },
    )
    .await?;
    tracing::info!(username = %user.username, "registered user");
    Ok(user)
}

pub async fn login_user_in_db(
    pool: &SqlitePool,
    LoginRequest { email, password }: LoginRequest,
) -> Result<User, RequestError> {
    if let Some(err) = RequestError::blank_fields([
        ("email", email.as_deref()),
        ("password", password.as_deref()),
    ]) {
        return Err(err);
    }
    let invalid = || RequestError::unprocessable("email or password", "is invalid");

    let mut conn = pool.acquire().await?;
    let user = get_user_by_email(&mut conn, email.as_deref().unwrap_or_default().trim())
        .await?
        .ok_or_else(invalid)?;
    drop(conn);

    let is_password_correct =
        verify_password_argon2(password.unwrap_or_default(), &user.password)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "password verification failed");
                RequestError::ServerError
            })?;
    if !is_password_correct {
        return Err(invalid());
    }
    Ok(user)
}

pub async fn update_user_in_db(
    pool: &SqlitePool,
    id: i64,
    UpdateUserRequest {
        email,
        bio,
        image,
        username,
        password,
    }: UpdateUserRequest,
) -> Result<User, RequestError> {
    let non_blank = |value: Option<String>| value.filter(|v| !v.trim().is_empty());
    let password = match non_blank(password) {
        Some(password) => Some(hash_password_argon2(password).await.map_err(|e| {
            tracing::error!(error = %e, "password hashing failed");
            RequestError::ServerError
        })?),
        None => None,
    };

    let builder = QueryBuilder::new("UPDATE users SET ", Some(", "))
        .add_param("email", non_blank(email))
        .add_param("bio", bio)
        .add_param("image", image)
        .add_param("username", non_blank(username))
        .add_param("password", password);

    let mut conn = pool.acquire().await?;
    if !builder.is_empty() {
        let (query, params) = builder.build();
        let query = format!("{query} WHERE id = ${}", params.len() + 1);
        let mut query = sqlx::query(&query);
        for param in params {
            query = query.bind(param);
        }
        query.bind(id).execute(&mut *conn).await.map_err(taken)?;
    }

    get_user_by_id(&mut conn, id)
        .await?
        .ok_or(RequestError::NotFound("User not found"))
}
