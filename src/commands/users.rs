//! Implementations of the record commands: `list`, `show`, `add`, `update`
//! and `delete`.
//!
//! Results are printed to stdout as pretty JSON.

use super::{Environment, to_pretty_json};
use crate::cli::{AddArgs, IdArgs, ListArgs, UpdateArgs};
use crate::config::Config;
use crate::error::Result;
use crate::record::{NewUser, UserPatch};

pub async fn cmd_list(env: &Environment, args: ListArgs) -> Result<()> {
    let users = env
        .user_service()
        .list(effective_limit(&args, &env.config))
        .await?;
    println!("{}", to_pretty_json(&users)?);
    Ok(())
}

pub async fn cmd_show(env: &Environment, args: IdArgs) -> Result<()> {
    let user = env.user_service().get(&args.id).await?;
    println!("{}", to_pretty_json(&user)?);
    Ok(())
}

pub async fn cmd_add(env: &Environment, args: AddArgs) -> Result<()> {
    let user = env.user_service().create(new_user(args)).await?;
    println!("{}", to_pretty_json(&user)?);
    Ok(())
}

pub async fn cmd_update(env: &Environment, args: UpdateArgs) -> Result<()> {
    let id = args.id.clone();
    let user = env.user_service().update(&id, &patch(args)).await?;
    println!("{}", to_pretty_json(&user)?);
    Ok(())
}

pub async fn cmd_delete(env: &Environment, args: IdArgs) -> Result<()> {
    let user = env.user_service().delete(&args.id).await?;
    println!("Deleted user {}", user.id);
    Ok(())
}

/// The limit given on the command line, else the configured default.
fn effective_limit(args: &ListArgs, config: &Config) -> i64 {
    args.limit.unwrap_or(config.default_limit)
}

fn new_user(args: AddArgs) -> NewUser {
    NewUser {
        name: args.name,
        age: args.age,
        address: args.address,
        email: args.email,
    }
}

fn patch(args: UpdateArgs) -> UserPatch {
    UserPatch {
        name: args.name,
        age: args.age,
        address: args.address,
        email: args.email,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_env::temp_env;
    use crate::error::UserDbError;

    fn add_args(name: &str) -> AddArgs {
        AddArgs {
            name: name.to_string(),
            age: 40,
            address: "1 Loop".to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
        }
    }

    #[tokio::test]
    async fn test_add_then_list_and_show() {
        let (_temp_dir, env) = temp_env();

        cmd_add(&env, add_args("Ada")).await.unwrap();
        cmd_list(&env, ListArgs { limit: None }).await.unwrap();

        let users = env.user_service().list(0).await.unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].name, "Ada");

        cmd_show(&env, IdArgs { id: users[0].id.clone() }).await.unwrap();
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (_temp_dir, env) = temp_env();
        cmd_add(&env, add_args("Ada")).await.unwrap();
        let id = env.user_service().list(0).await.unwrap()[0].id.clone();

        cmd_update(
            &env,
            UpdateArgs {
                id: id.clone(),
                name: None,
                age: Some(37),
                address: None,
                email: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(
            env.user_service().get(&id).await.unwrap().age,
            serde_json::Number::from(37)
        );

        cmd_delete(&env, IdArgs { id: id.clone() }).await.unwrap();
        assert!(env.user_service().list(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_ids_report_not_found() {
        let (_temp_dir, env) = temp_env();

        let err = cmd_show(&env, IdArgs { id: "nope".to_string() }).await.unwrap_err();
        assert!(matches!(err, UserDbError::NotFound(_)));

        let err = cmd_delete(&env, IdArgs { id: "nope".to_string() }).await.unwrap_err();
        assert_eq!(err.exit_code(), crate::exit_codes::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_uses_default_limit() {
        let (_temp_dir, mut env) = temp_env();
        for name in ["Ada", "Grace", "Edsger"] {
            cmd_add(&env, add_args(name)).await.unwrap();
        }
        env.config.default_limit = 2;

        assert_eq!(effective_limit(&ListArgs { limit: None }, &env.config), 2);
        assert_eq!(effective_limit(&ListArgs { limit: Some(0) }, &env.config), 0);

        cmd_list(&env, ListArgs { limit: None }).await.unwrap();
        let listed = env
            .user_service()
            .list(effective_limit(&ListArgs { limit: None }, &env.config))
            .await
            .unwrap();
        assert_eq!(listed.len(), 2);
    }
}
