//! Console commands for course categories.

use clap::{Args, Subcommand};

use super::handlers::{self, CategoryForm};
use crate::context::AppContext;
use crate::errors::AppError;

#[derive(Debug, Args)]
pub struct CategoryArgs {
    /// English name
    #[arg(long)]
    pub name: String,
    /// Arabic name
    #[arg(long)]
    pub name_ar: String,
    /// Derived from the English name when omitted
    #[arg(long, default_value = "")]
    pub slug: String,
    #[arg(long, default_value = "")]
    pub icon: String,
    #[arg(long, default_value = "")]
    pub description: String,
}

impl From<CategoryArgs> for CategoryForm {
    fn from(args: CategoryArgs) -> Self {
        Self {
            name: args.name,
            name_ar: args.name_ar,
            slug: args.slug,
            icon: args.icon,
            description: args.description,
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum CategoryCommand {
    List,
    /// Create a category, or update one with --id
    Save {
        #[arg(long)]
        id: Option<String>,
        #[command(flatten)]
        fields: CategoryArgs,
    },
    Delete { id: String },
}

pub async fn dispatch(ctx: &AppContext, command: CategoryCommand) -> Result<(), AppError> {
    match command {
        CategoryCommand::List => {
            for category in handlers::list_categories(ctx).await? {
                println!(
                    "{}  {}  {}  ({})",
                    category.id, category.name_ar, category.name, category.slug
                );
            }
        }
        CategoryCommand::Save { id, fields } => {
            let message = handlers::save_category(ctx, id.as_deref(), fields.into()).await?;
            println!("{message}");
        }
        CategoryCommand::Delete { id } => {
            handlers::delete_category(ctx, &id).await?;
            println!("تم حذف الفئة بنجاح");
        }
    }
    Ok(())
}
