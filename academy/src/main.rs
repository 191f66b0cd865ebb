//! Main entry point for the academy console.
//!
//! This file loads configuration, sets up logging, connects to the hosted
//! platform and restores the persisted session, then runs one command.

use std::process::ExitCode;
use std::sync::Arc;

use academy::api::category::routes::{self as category_routes, CategoryCommand};
use academy::api::course::routes::{self as course_routes, CourseCommand};
use academy::api::user::routes::{self as user_routes, UserCommand};
use academy::auth::{
    handlers as auth_handlers, AuthChangeListener, AuthSnapshot, GateDecision, ProfileUpdate, SignUpForm,
};
use academy::config::Config;
use academy::context::{AppContext, ContextOptions};
use academy::errors::AppError;
use academy_adapters::{AuthAdapter, FileSessionStorage, SupabaseAdapter, SupabaseConfig};
use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info,academy=debug,academy_adapters=debug";

#[derive(Debug, Parser)]
#[command(name = "academy", version, about = "Academy platform console")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Sign in with email and password
    SignIn {
        email: String,
        #[arg(long, env = "ACADEMY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Register a new account
    SignUp {
        email: String,
        #[arg(long)]
        full_name: String,
        #[arg(long, env = "ACADEMY_PASSWORD", hide_env_values = true)]
        password: String,
        #[arg(long)]
        confirm_password: String,
    },
    SignOut,
    /// Print the URL for signing in with Google
    Google,
    /// Show the signed-in user and profile
    Whoami,
    /// Change your display name or avatar
    Profile {
        #[arg(long)]
        full_name: Option<String>,
        #[arg(long)]
        avatar_url: Option<String>,
    },
    /// Check whether the current user may open a screen
    Gate { path: String },
    #[command(subcommand)]
    Users(UserCommand),
    #[command(subcommand)]
    Courses(CourseCommand),
    #[command(subcommand)]
    Categories(CategoryCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return Ok(ExitCode::FAILURE);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER)),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    info!(config = ?config, "starting academy console");

    let storage = Arc::new(FileSessionStorage::new(&config.session_file));
    let platform = SupabaseConfig::new(&config.supabase_url, &config.supabase_anon_key)
        .with_request_timeout(config.request_timeout)
        .with_storage_key(&config.storage_key);
    let backend = Arc::new(
        SupabaseAdapter::new(platform, storage).context("failed to create platform client")?,
    );

    let ctx = AppContext::new(backend.clone(), ContextOptions::from(&config));
    let listener = AuthChangeListener::spawn(ctx.store.clone(), backend.subscribe());
    ctx.store.initialize().await;

    let result = run(&ctx, cli.command).await;

    ctx.store.teardown();
    let _ = listener.shutdown().await;

    match result {
        Ok(()) => Ok(ExitCode::SUCCESS),
        Err(e) => {
            error!(error = %e, kind = ?e.kind(), "command failed");
            eprintln!("{}", e.user_message());
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run(ctx: &AppContext, command: Command) -> Result<(), AppError> {
    match command {
        Command::SignIn { email, password } => {
            let snapshot = auth_handlers::sign_in(ctx, &email, &password).await?;
            println!("تم تسجيل الدخول بنجاح");
            print_identity(&snapshot);
        }
        Command::SignUp {
            email,
            full_name,
            password,
            confirm_password,
        } => {
            let form = SignUpForm {
                email,
                password,
                confirm_password,
                full_name,
            };
            println!("{}", auth_handlers::sign_up(ctx, &form).await?.user_message());
        }
        Command::SignOut => {
            auth_handlers::sign_out(ctx).await?;
            println!("تم تسجيل الخروج");
        }
        Command::Google => println!("{}", auth_handlers::google(ctx)?),
        Command::Whoami => {
            print_identity(&auth_handlers::whoami(ctx)?);
            if ctx.store.is_admin() {
                println!("مدير النظام");
            }
        }
        Command::Profile {
            full_name,
            avatar_url,
        } => {
            let update = ProfileUpdate {
                full_name,
                avatar_url,
                ..ProfileUpdate::default()
            };
            let snapshot = auth_handlers::update_profile(ctx, &update).await?;
            println!("تم تحديث الملف الشخصي");
            print_identity(&snapshot);
        }
        Command::Gate { path } => match auth_handlers::gate(ctx, &path)? {
            GateDecision::Allow => println!("allow"),
            GateDecision::Pending => println!("pending"),
            GateDecision::Deny(reason) => {
                println!("redirect {} ({})", reason.redirect_to(), reason.user_message())
            }
        },
        Command::Users(command) => user_routes::dispatch(ctx, command).await?,
        Command::Courses(command) => course_routes::dispatch(ctx, command).await?,
        Command::Categories(command) => category_routes::dispatch(ctx, command).await?,
    }
    Ok(())
}

fn print_identity(snapshot: &AuthSnapshot) {
    let Some(user) = &snapshot.user else {
        return;
    };
    println!("{}  {}", user.id, user.email.as_deref().unwrap_or("-"));
    match &snapshot.profile {
        Some(profile) => println!(
            "[{}] {}  {}  {}",
            profile.initials(),
            profile.full_name.as_deref().unwrap_or("-"),
            profile.role,
            profile.status.label()
        ),
        None => println!("(no profile)"),
    }
}
