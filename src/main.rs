//! Tindahan CLI - Lightweight campus marketplace client
//!
//! A terminal-based client for the Tindahan REST API and its push channel.

mod api;
mod auth;
mod chat;
mod config;
mod models;
mod realtime;
mod tui;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tindahan-cli")]
#[command(about = "Lightweight CLI client for the Tindahan campus marketplace", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Authenticate against the marketplace API
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password (read from stdin when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },

    /// Log out and clear the stored session
    Logout,

    /// Show current authentication status
    Status,

    /// Show current user info (verify auth works)
    Whoami,

    /// List users (the conversation directory)
    Users {
        /// Page number
        #[arg(short, long, default_value = "1")]
        page: u32,

        /// Page size
        #[arg(long, default_value = "10")]
        page_size: u32,

        /// Search keyword
        #[arg(short, long)]
        search: Option<String>,

        /// Sort column (e.g. first_name, email)
        #[arg(long)]
        sort: Option<String>,

        /// Sort descending
        #[arg(long)]
        desc: bool,
    },

    /// Manage a single user (admin)
    #[command(subcommand)]
    User(UserCommands),

    /// List categories
    Categories {
        /// Page number
        #[arg(short, long, default_value = "1")]
        page: u32,

        /// Search keyword
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Manage a single category (admin)
    #[command(subcommand)]
    Category(CategoryCommands),

    /// List items for sale
    Items {
        /// Page number
        #[arg(short, long, default_value = "1")]
        page: u32,

        /// Page size
        #[arg(long, default_value = "10")]
        page_size: u32,

        /// Search keyword
        #[arg(short, long)]
        search: Option<String>,
    },

    /// Manage a single item
    #[command(subcommand)]
    Item(ItemCommands),

    /// Read the conversation with a peer
    Messages {
        /// Peer user ID
        peer_id: i64,
    },

    /// Send a direct message
    Send {
        /// Recipient user ID
        #[arg(short, long)]
        to: i64,

        /// Message content
        message: String,
    },

    /// Connect to the push channel and print incoming messages
    Listen,

    /// Launch the terminal user interface
    Tui,
}

#[derive(Subcommand)]
enum UserCommands {
    /// Create a user
    Add {
        #[arg(long)]
        first_name: String,

        #[arg(long)]
        last_name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        password: String,

        #[arg(long)]
        phone: Option<String>,

        /// Role: admin or user
        #[arg(long)]
        role: Option<String>,

        /// Profile image file
        #[arg(long)]
        image: Option<std::path::PathBuf>,
    },

    /// Update a user
    Update {
        id: i64,

        #[arg(long)]
        first_name: Option<String>,

        #[arg(long)]
        last_name: Option<String>,

        #[arg(long)]
        email: Option<String>,

        #[arg(long)]
        phone: Option<String>,

        /// Role: admin or user
        #[arg(long)]
        role: Option<String>,

        /// Profile image file
        #[arg(long)]
        image: Option<std::path::PathBuf>,
    },

    /// Delete a user (may require password confirmation)
    Delete {
        id: i64,

        /// Password confirmation
        #[arg(short, long)]
        password: Option<String>,
    },
}

#[derive(Subcommand)]
enum CategoryCommands {
    /// Show a category
    Show { id: i64 },

    /// Create a category
    Add {
        name: String,

        /// Optional description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Update a category
    Update {
        id: i64,
        name: String,

        /// Optional description
        #[arg(short, long)]
        description: Option<String>,
    },

    /// Delete a category
    Delete { id: i64 },
}

#[derive(Subcommand)]
enum ItemCommands {
    /// Show an item with its attachments
    Show { id: i64 },

    /// Create an item listing
    Add {
        /// Item title
        #[arg(long)]
        title: String,

        /// Category ID
        #[arg(long)]
        category: i64,

        /// Description
        #[arg(long)]
        description: String,

        /// Condition (e.g. "new", "used")
        #[arg(long)]
        condition: String,

        /// Price
        #[arg(long)]
        price: f64,

        /// Meetup location
        #[arg(long)]
        location: String,

        /// Image attachments (repeatable)
        #[arg(long = "file")]
        files: Vec<std::path::PathBuf>,
    },

    /// Update an item listing
    Update {
        id: i64,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        category: Option<i64>,

        #[arg(long)]
        description: Option<String>,

        #[arg(long)]
        condition: Option<String>,

        #[arg(long)]
        price: Option<f64>,

        #[arg(long)]
        location: Option<String>,

        /// Image attachments (repeatable)
        #[arg(long = "file")]
        files: Vec<std::path::PathBuf>,
    },

    /// Delete an item
    Delete { id: i64 },

    /// List items posted by a user
    Mine {
        /// User ID (defaults to the session user)
        #[arg(long)]
        user: Option<i64>,

        /// Search keyword
        #[arg(short, long)]
        search: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    match cli.command {
        Commands::Login { email, password } => {
            tracing::info!("Logging in...");
            auth::login(&email, password.as_deref()).await?;
        }
        Commands::Logout => {
            tracing::info!("Logging out...");
            auth::logout()?;
        }
        Commands::Status => {
            auth::status()?;
        }
        Commands::Whoami => {
            api::whoami().await?;
        }
        Commands::Users {
            page,
            page_size,
            search,
            sort,
            desc,
        } => {
            api::list_users(page, page_size, search.as_deref(), sort.as_deref(), desc).await?;
        }
        Commands::User(cmd) => match cmd {
            UserCommands::Add {
                first_name,
                last_name,
                email,
                password,
                phone,
                role,
                image,
            } => {
                let draft = api::UserDraft {
                    first_name: Some(first_name),
                    last_name: Some(last_name),
                    email: Some(email),
                    password: Some(password),
                    phone,
                    role,
                };
                api::create_user(&draft, image.as_deref()).await?;
            }
            UserCommands::Update {
                id,
                first_name,
                last_name,
                email,
                phone,
                role,
                image,
            } => {
                let draft = api::UserDraft {
                    first_name,
                    last_name,
                    email,
                    phone,
                    role,
                    password: None,
                };
                api::update_user(id, &draft, image.as_deref()).await?;
            }
            UserCommands::Delete { id, password } => {
                api::delete_user(id, password.as_deref()).await?;
            }
        },
        Commands::Categories { page, search } => {
            api::list_categories(page, search.as_deref()).await?;
        }
        Commands::Category(cmd) => match cmd {
            CategoryCommands::Show { id } => api::show_category(id).await?,
            CategoryCommands::Add { name, description } => {
                api::create_category(&name, description.as_deref()).await?;
            }
            CategoryCommands::Update {
                id,
                name,
                description,
            } => {
                api::update_category(id, &name, description.as_deref()).await?;
            }
            CategoryCommands::Delete { id } => api::delete_category(id).await?,
        },
        Commands::Items {
            page,
            page_size,
            search,
        } => {
            api::list_items(page, page_size, search.as_deref()).await?;
        }
        Commands::Item(cmd) => match cmd {
            ItemCommands::Show { id } => api::show_item(id).await?,
            ItemCommands::Add {
                title,
                category,
                description,
                condition,
                price,
                location,
                files,
            } => {
                let draft = api::ItemDraft {
                    title: Some(title),
                    category_id: Some(category),
                    description: Some(description),
                    condition: Some(condition),
                    price: Some(price),
                    location: Some(location),
                };
                api::create_item(&draft, &files).await?;
            }
            ItemCommands::Update {
                id,
                title,
                category,
                description,
                condition,
                price,
                location,
                files,
            } => {
                let draft = api::ItemDraft {
                    title,
                    category_id: category,
                    description,
                    condition,
                    price,
                    location,
                };
                api::update_item(id, &draft, &files).await?;
            }
            ItemCommands::Delete { id } => api::delete_item(id).await?,
            ItemCommands::Mine { user, search } => {
                api::list_user_items(user, search.as_deref()).await?;
            }
        },
        Commands::Messages { peer_id } => {
            api::read_messages(peer_id).await?;
        }
        Commands::Send { to, message } => {
            tracing::info!("Sending message...");
            api::send_message(to, &message).await?;
        }
        Commands::Listen => {
            realtime::connect_and_run().await?;
        }
        Commands::Tui => {
            tui::run().await?;
        }
    }

    Ok(())
}
