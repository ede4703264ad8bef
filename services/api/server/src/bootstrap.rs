use anyhow::Context;

use crate::Config;
use crate::service::users::UserService;

/// Creates the administrator named by `ADMIN_USERNAME`/`ADMIN_PASSWORD`.
///
/// Both must be set for anything to happen. An existing user with that name
/// is left untouched.
pub async fn ensure_admin(config: &Config, users: &UserService) -> anyhow::Result<()> {
    match (config.admin_username.as_deref(), config.admin_password.as_deref()) {
        (Some(name), Some(password)) => {
            let created = users
                .ensure_admin(name, password)
                .await
                .context("Failed to bootstrap admin user")?;

            if created {
                tracing::info!(name, "Created admin user");
            } else {
                tracing::info!(name, "Admin user already present");
            }
        }
        (None, None) => tracing::debug!("No admin credentials configured"),
        _ => tracing::warn!(
            "Only one of ADMIN_USERNAME and ADMIN_PASSWORD is set, skipping admin bootstrap"
        ),
    }

    Ok(())
}
