//! Artistic Gurl CLI - scripted edits of the site content document.
//!
//! Every editing command runs a whole hydrate, mutate, save cycle against
//! the content repository, so a save is always guarded by the version token
//! read a moment earlier.
//!
//! # Usage
//!
//! ```bash
//! # Store the access token for later commands
//! ag-cli login --token ghp_xxx
//!
//! # Print the document and its version token
//! ag-cli show
//!
//! # List validation findings (exit code 1 on errors)
//! ag-cli validate
//!
//! # Preview the gallery
//! ag-cli gallery --category Birthday --search pop
//!
//! # Edit a text field
//! ag-cli set siteConfig.announcement "Eid orders close Friday"
//!
//! # Products
//! ag-cli product add --title "Pop-up Heart" --price "PKR 1500" --category Love
//! ag-cli product update 7 --icon Star
//! ag-cli product remove 3
//!
//! # Upload an image and attach it to product 7
//! ag-cli upload 7 ./confetti.png
//! ```
//!
//! # Environment Variables
//!
//! - `CONTENT_REPO_OWNER`, `CONTENT_REPO_NAME` - Content repository (required)
//! - `ADMIN_CREDENTIAL_FILE` - Token file (default `.artistic-gurl-token`)
//! - `GITHUB_TOKEN` - Used when no token file exists

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use artistic_gurl_admin::{ProductPatch, SiteField};
use artistic_gurl_core::{ColorToken, IconToken, ProductId};
use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "ag-cli")]
#[command(author, version, about = "Artistic Gurl content tools")]
struct Cli {
    /// Token file (overrides `ADMIN_CREDENTIAL_FILE`)
    #[arg(long, global = true)]
    credential_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Store the repository access token
    Login {
        /// Token with contents write access
        #[arg(short, long)]
        token: String,
    },
    /// Print the current document and version token
    Show,
    /// Validate the current document
    Validate,
    /// Preview the product gallery
    Gallery {
        /// Category tab ("All" for every product)
        #[arg(short, long)]
        category: Option<String>,

        /// Search phrase matched against title and description
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Set a text field, e.g. `siteConfig.title` or `contact.email`
    Set {
        field: SiteField,
        value: String,
    },
    /// Add, update or remove products
    Product {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Upload an image and attach it to a product
    Upload {
        /// Product to attach the image to
        id: ProductId,

        /// Image file
        file: PathBuf,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// Add a product with the next free ID
    Add {
        #[command(flatten)]
        fields: ProductFields,
    },
    /// Update fields of a product
    Update {
        id: ProductId,

        #[command(flatten)]
        fields: ProductFields,
    },
    /// Remove a product
    Remove { id: ProductId },
}

#[derive(Args)]
struct ProductFields {
    #[arg(long)]
    title: Option<String>,

    /// Free-text price, e.g. "PKR 1500"
    #[arg(long)]
    price: Option<String>,

    #[arg(long)]
    category: Option<String>,

    #[arg(long)]
    desc: Option<String>,

    /// Card background class, e.g. bg-pink-50
    #[arg(long)]
    color: Option<String>,

    /// Icon name, e.g. Heart
    #[arg(long)]
    icon: Option<String>,

    /// Image reference, e.g. /uploads/card.png
    #[arg(long, conflicts_with = "clear_image")]
    image: Option<String>,

    /// Drop the image so the card shows its icon again
    #[arg(long)]
    clear_image: bool,
}

impl From<ProductFields> for ProductPatch {
    fn from(fields: ProductFields) -> Self {
        Self {
            title: fields.title,
            price: fields.price,
            category: fields.category,
            description: fields.desc,
            color: fields.color.map(|c| ColorToken::from_class(&c)),
            icon: fields.icon.map(|i| IconToken::from_name(&i)),
            image: if fields.clear_image {
                Some(None)
            } else {
                fields.image.map(Some)
            },
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "artistic_gurl_admin=info,ag_cli=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let credentials = commands::credential_store(cli.credential_file);

    if let Commands::Login { token } = &cli.command {
        commands::login::run(&credentials, token)?;
        return Ok(());
    }

    let ctx = commands::Context::from_env(credentials)?;
    match cli.command {
        Commands::Login { .. } => {}
        Commands::Show => commands::content::show(&ctx).await?,
        Commands::Validate => commands::content::validate(&ctx).await?,
        Commands::Gallery { category, search } => {
            commands::content::gallery(&ctx, category, search).await?;
        }
        Commands::Set { field, value } => {
            commands::edit::set_field(&ctx, field, &value).await?;
        }
        Commands::Product { action } => match action {
            ProductAction::Add { fields } => {
                commands::edit::add_product(&ctx, fields.into()).await?;
            }
            ProductAction::Update { id, fields } => {
                commands::edit::update_product(&ctx, id, &fields.into()).await?;
            }
            ProductAction::Remove { id } => {
                commands::edit::remove_product(&ctx, id).await?;
            }
        },
        Commands::Upload { id, file } => {
            commands::upload::run(&ctx, id, &file).await?;
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_product_fields_into_patch() {
        let cli = Cli::parse_from([
            "ag-cli",
            "product",
            "update",
            "7",
            "--desc",
            "Bright",
            "--color",
            "bg-sky-50",
            "--icon",
            "Unicorn",
        ]);
        let Commands::Product {
            action: ProductAction::Update { id, fields },
        } = cli.command
        else {
            panic!("expected product update");
        };
        assert_eq!(id.get(), 7);

        let patch = ProductPatch::from(fields);
        assert_eq!(patch.description.as_deref(), Some("Bright"));
        assert_eq!(patch.color, Some(ColorToken::from_class("bg-sky-50")));
        // unknown icon names fall back to the default
        assert_eq!(patch.icon, Some(IconToken::Heart));
        assert!(patch.title.is_none());
        assert!(patch.image.is_none());
    }

    #[test]
    fn test_clear_image_flag() {
        let fields = |args: &[&str]| {
            let cli = Cli::try_parse_from(["ag-cli", "product", "update", "7"].iter().chain(args).copied())?;
            let Commands::Product {
                action: ProductAction::Update { fields, .. },
            } = cli.command
            else {
                panic!("expected product update");
            };
            Ok::<_, clap::Error>(ProductPatch::from(fields))
        };

        assert_eq!(fields(&["--clear-image"]).unwrap().image, Some(None));
        assert_eq!(
            fields(&["--image", "/uploads/a.png"]).unwrap().image,
            Some(Some("/uploads/a.png".to_string()))
        );
        assert!(fields(&["--image", "/uploads/a.png", "--clear-image"]).is_err());
    }

    #[test]
    fn test_set_parses_field_paths() {
        assert!(Cli::try_parse_from(["ag-cli", "set", "siteConfig.colour", "x"]).is_err());
        assert!(Cli::try_parse_from(["ag-cli", "product", "remove", "0"]).is_err());

        let cli = Cli::parse_from(["ag-cli", "set", "contact.email", "hello@artisticgurl.pk"]);
        assert!(matches!(
            cli.command,
            Commands::Set {
                field: SiteField::ContactEmail,
                ..
            }
        ));
    }
}
