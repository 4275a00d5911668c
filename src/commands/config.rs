use anyhow::{Context as _, Result};
use log::info;
use std::path::PathBuf;

use crate::config::AppFolder;
use crate::runtime::Runtime;

use super::Context;

/// Print the effective configuration with secrets masked.
#[tracing::instrument(skip(ctx))]
pub fn show<R: Runtime>(ctx: &Context<R>) -> Result<()> {
    let yaml = serde_yaml::to_string(&ctx.config.redacted())
        .context("Failed to serialize configuration")?;
    println!("# {}", ctx.app.config_file().display());
    print!("{}", yaml);
    Ok(())
}

/// Values given to `config set`; `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigUpdate {
    pub packages_path: Option<PathBuf>,
    pub github_token: Option<String>,
    pub github_user_link: Option<String>,
    pub registry_url: Option<String>,
    pub registry_username: Option<String>,
    pub registry_password: Option<String>,
    pub app_path: Option<PathBuf>,
}

impl ConfigUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[tracing::instrument(skip(ctx, update))]
pub fn set<R: Runtime>(ctx: &mut Context<R>, update: ConfigUpdate) -> Result<()> {
    if update.is_empty() {
        println!("Nothing to set.");
        return Ok(());
    }

    if let Some(app_path) = &update.app_path {
        let app = AppFolder::new(app_path);
        app.ensure(&ctx.runtime)?;
        app.save_as_global(&ctx.runtime)?;
    }

    ctx.update_config(|c| {
        if let Some(v) = &update.packages_path {
            c.packages_path = Some(v.clone());
        }
        if let Some(v) = &update.github_token {
            c.github_token = Some(v.clone());
        }
        if let Some(v) = &update.github_user_link {
            c.github_profile_url = Some(v.clone());
        }
        if let Some(v) = &update.registry_url {
            c.registry_url = Some(v.clone());
        }
        if let Some(v) = &update.registry_username {
            c.registry_username = Some(v.clone());
        }
        if let Some(v) = &update.registry_password {
            c.registry_password = Some(v.clone());
        }
        if let Some(v) = &update.app_path {
            c.app_path = Some(v.clone());
        }
    })?;

    info!("Configuration updated");
    println!("Configuration saved to {}", ctx.app.config_file().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::context::tests::temp_context;
    use crate::config::Config;
    use crate::runtime::RealRuntime;

    #[test]
    fn test_show() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = temp_context(dir.path());
        assert!(show(&ctx).is_ok());
    }

    #[test]
    fn test_set_registry_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = temp_context(dir.path());

        set(
            &mut ctx,
            ConfigUpdate {
                registry_url: Some("http://npm.local:4873".into()),
                registry_username: Some("admin".into()),
                registry_password: Some("secret".into()),
                github_user_link: Some("https://github.com/me".into()),
                ..Default::default()
            },
        )
        .unwrap();

        let saved = Config::load(&RealRuntime, &ctx.app).unwrap();
        assert_eq!(saved.registry_url.as_deref(), Some("http://npm.local:4873"));
        assert_eq!(saved.registry_username.as_deref(), Some("admin"));
        assert_eq!(saved.registry_password.as_deref(), Some("secret"));
        assert_eq!(saved.github_profile_url.as_deref(), Some("https://github.com/me"));
    }

    #[test]
    fn test_set_nothing_leaves_file_alone() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = temp_context(dir.path());
        let before = std::fs::read_to_string(ctx.app.config_file()).unwrap();

        set(&mut ctx, ConfigUpdate::default()).unwrap();

        assert_eq!(std::fs::read_to_string(ctx.app.config_file()).unwrap(), before);
    }
}
