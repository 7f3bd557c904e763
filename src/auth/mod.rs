use axum::{routing::get, Router};
use sqlx::SqlitePool;
use tower_sessions::Session;

mod clients;
mod lockin;
mod password;
mod signin;
mod signout;

pub use clients::{ClientProvider, Clients};

use crate::{
    config::Config,
    db::users::{self, Role, User},
    session::USER_ID,
    AppResult, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/signin", get(signin::signin_page).post(signin::signin))
        .route("/signup", get(signin::signup_page).post(signin::signup))
        .route("/signin/{provider}", get(signin::oauth_start))
        .route("/lockin/{provider}", get(lockin::lockin))
        .route("/signout", get(signout::signout))
        .route("/account/password", get(signin::password_page).post(signin::set_password))
}

pub(crate) fn role_for(config: &Config, email: &str) -> Role {
    if config.is_admin_email(email) { Role::Admin } else { Role::User }
}

/// Only same-site paths are followed after signing in.
pub(crate) fn safe_return_url(return_url: Option<String>) -> Option<String> {
    return_url.filter(|url| url.starts_with('/') && !url.starts_with("//") && !url.starts_with("/\\"))
}

/// Where a fresh sign-in goes: back where it came from, else admins to the
/// dashboard and guests to the booking page.
pub(crate) fn landing_url(return_url: Option<String>, user: &User) -> String {
    safe_return_url(return_url).unwrap_or_else(|| {
        if user.is_admin() { "/dashboard" } else { "/booking" }.to_owned()
    })
}

/// Fetches or lazily creates the user row for `email` and binds it to the session.
pub(crate) async fn start_session(
    db_pool: &SqlitePool,
    config: &Config,
    session: &Session,
    email: &str,
) -> AppResult<User> {
    let user = users::ensure(db_pool, email, role_for(config, email)).await?;

    session.cycle_id().await?;
    session.insert(USER_ID, user.id.clone()).await?;
    tracing::info!(user_id = %user.id, role = ?user.role, "welcome {}", user.email);

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn return_urls_stay_on_site() {
        assert_eq!(
            safe_return_url(Some("/dashboard?status=pending".to_owned())).as_deref(),
            Some("/dashboard?status=pending")
        );
        assert_eq!(safe_return_url(Some("https://evil.example".to_owned())), None);
        assert_eq!(safe_return_url(Some("//evil.example".to_owned())), None);
        assert_eq!(safe_return_url(Some(String::new())), None);
        assert_eq!(safe_return_url(None), None);
    }

    #[test]
    fn sign_in_lands_by_role() {
        let admin = User::test("boss@hotel.com", Role::Admin);
        let guest = User::test("guest@hotel.com", Role::User);

        assert_eq!(landing_url(None, &admin), "/dashboard");
        assert_eq!(landing_url(Some(String::new()), &guest), "/booking");
        assert_eq!(landing_url(Some("//evil.example".to_owned()), &guest), "/booking");
        assert_eq!(landing_url(Some("/rooms/3".to_owned()), &admin), "/rooms/3");
    }

    #[test]
    fn admins_come_from_config() {
        let config = Config {
            admin_emails: vec!["boss@hotel.com".to_owned()],
            ..Config::default()
        };
        assert_eq!(role_for(&config, "Boss@Hotel.com"), Role::Admin);
        assert_eq!(role_for(&config, "guest@hotel.com"), Role::User);
    }
}
