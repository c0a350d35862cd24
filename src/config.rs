use crate::errors::AppError;
use crate::utils::fold_email;

/// Credentials and knobs injected by the environment. The bootstrap admin
/// pair lets an operator sign in before any user row exists; leaving it unset
/// disables that path entirely.
#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub bootstrap_admin_email: Option<String>,
    pub bootstrap_admin_password: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        let email = std::env::var("BOOTSTRAP_ADMIN_EMAIL").ok().map(|e| fold_email(&e));
        let password = std::env::var("BOOTSTRAP_ADMIN_PASSWORD").ok();

        if email.is_some() != password.is_some() {
            return Err(AppError::configuration(
                "BOOTSTRAP_ADMIN_EMAIL and BOOTSTRAP_ADMIN_PASSWORD must be set together",
            ));
        }

        Ok(Self {
            bootstrap_admin_email: email,
            bootstrap_admin_password: password,
        })
    }

    pub fn matches_bootstrap(&self, email: &str, password: &str) -> bool {
        match (&self.bootstrap_admin_email, &self.bootstrap_admin_password) {
            (Some(e), Some(p)) => fold_email(email) == *e && password == p,
            _ => false,
        }
    }
}
