//! Console commands for user administration.

use std::path::PathBuf;

use clap::Subcommand;

use super::handlers::{self, UserFilter, UserStats};
use crate::context::AppContext;
use crate::database::models::{ProfileStatus, Role};
use crate::errors::AppError;
use crate::services::spreadsheet::{self, DEFAULT_ROLE, DEFAULT_STATUS};
use crate::services::ImportRecord;

#[derive(Debug, Subcommand)]
pub enum UserCommand {
    /// List users, newest first
    List {
        /// Match against email or full name
        #[arg(long)]
        search: Option<String>,
        /// pending, approved or rejected
        #[arg(long)]
        status: Option<ProfileStatus>,
    },
    /// Change a user's status
    Status { user_id: String, status: ProfileStatus },
    /// Create one account
    Create {
        #[arg(long)]
        email: String,
        #[arg(long)]
        password: String,
        #[arg(long)]
        full_name: String,
        #[arg(long, default_value = DEFAULT_ROLE)]
        role: Role,
        #[arg(long, default_value = DEFAULT_STATUS)]
        status: ProfileStatus,
    },
    /// Create accounts from a spreadsheet (.xlsx, .xls, .ods or .csv)
    Import { file: PathBuf },
    /// Write an import template
    Template {
        #[arg(default_value = "users-template.csv")]
        path: PathBuf,
    },
}

pub async fn dispatch(ctx: &AppContext, command: UserCommand) -> Result<(), AppError> {
    match command {
        UserCommand::List { search, status } => {
            let users = handlers::list_users(ctx).await?;
            let stats = UserStats::from_users(&users);
            println!(
                "المجموع: {}  قيد المراجعة: {}  مقبول: {}  مرفوض: {}",
                stats.total, stats.pending, stats.approved, stats.rejected
            );
            for user in handlers::filter_users(&users, &UserFilter { search, status }) {
                println!(
                    "[{}] {}  {}  {}  {}  ({})",
                    user.initials(),
                    user.id,
                    user.email.as_deref().unwrap_or("-"),
                    user.full_name.as_deref().unwrap_or("-"),
                    user.role,
                    user.status.label(),
                );
            }
        }
        UserCommand::Status { user_id, status } => {
            println!("{}", handlers::change_status(ctx, &user_id, status).await?);
        }
        UserCommand::Create {
            email,
            password,
            full_name,
            role,
            status,
        } => {
            let record = ImportRecord {
                email,
                password,
                full_name,
                role: role.to_string(),
                status: status.to_string(),
            };
            handlers::create_user(ctx, record).await?;
            println!("تم إنشاء المستخدم بنجاح");
        }
        UserCommand::Import { file } => {
            let outcome = handlers::import_users(ctx, &file).await?;
            for line in outcome.result.summary() {
                println!("{line}");
            }
            for created in &outcome.result.success {
                println!("  + {}", created.email);
            }
            for failure in &outcome.result.errors {
                println!("  {}: {}", failure.email, failure.error);
            }
            if let Some(users) = outcome.users {
                println!("عدد المستخدمين: {}", users.len());
            }
        }
        UserCommand::Template { path } => {
            spreadsheet::write_template(&path)?;
            println!("تم تنزيل ملف النموذج: {}", path.display());
        }
    }
    Ok(())
}
