use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use estate_listings::models::{ListingType, PropertyType};
use estate_listings::PropertyFilters;

#[derive(Parser, Debug)]
#[command(
    name = "estate-listings",
    about = "Browse listings, save favourites and contact agents from the command line",
    version
)]
pub(crate) struct Cli {
    /// Write the result as pretty JSON to this file
    #[arg(long, global = true)]
    pub(crate) out: Option<PathBuf>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand, Debug)]
pub(crate) enum Command {
    /// List active properties (up to 20)
    List(ListArgs),
    /// Show featured properties (up to 6)
    Featured,
    /// Search titles, descriptions and cities
    Search { query: String },
    /// Show one property with images, features and agent
    Show { id: Uuid },
    /// Send an inquiry about a property
    Inquire(InquireArgs),
    /// Save a property for the signed-in user
    Save(UserPropertyArgs),
    /// Remove a saved property
    Unsave(UserPropertyArgs),
    /// List the signed-in user's saved properties
    Saved {
        #[arg(long)]
        user: Uuid,
    },
    /// List agents, best rated first
    Agents,
    /// Print the SQL migration (tables, indexes, policies)
    Schema,
}

#[derive(Args, Debug, Default)]
pub(crate) struct ListArgs {
    /// Substring of the city
    #[arg(long)]
    pub(crate) city: Option<String>,
    #[arg(long, value_parser = parse_property_type)]
    pub(crate) property_type: Option<PropertyType>,
    #[arg(long, value_parser = parse_listing_type)]
    pub(crate) listing_type: Option<ListingType>,
    #[arg(long)]
    pub(crate) min_price: Option<f64>,
    #[arg(long)]
    pub(crate) max_price: Option<f64>,
    #[arg(long)]
    pub(crate) min_bedrooms: Option<i32>,
    /// Only featured listings
    #[arg(long)]
    pub(crate) featured: bool,
}

impl From<ListArgs> for PropertyFilters {
    fn from(args: ListArgs) -> Self {
        Self {
            city: args.city,
            property_type: args.property_type,
            listing_type: args.listing_type,
            min_price: args.min_price,
            max_price: args.max_price,
            min_bedrooms: args.min_bedrooms,
            featured: args.featured.then_some(true),
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct InquireArgs {
    #[arg(long)]
    pub(crate) property: Uuid,
    #[arg(long)]
    pub(crate) name: String,
    #[arg(long)]
    pub(crate) email: String,
    #[arg(long)]
    pub(crate) phone: Option<String>,
    #[arg(long)]
    pub(crate) message: String,
}

#[derive(Args, Debug)]
pub(crate) struct UserPropertyArgs {
    #[arg(long)]
    pub(crate) user: Uuid,
    #[arg(long)]
    pub(crate) property: Uuid,
}

fn parse_property_type(raw: &str) -> Result<PropertyType, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_ascii_lowercase()))
        .map_err(|_| format!("unknown property type '{raw}'"))
}

fn parse_listing_type(raw: &str) -> Result<ListingType, String> {
    serde_json::from_value(serde_json::Value::String(raw.to_ascii_lowercase()))
        .map_err(|_| format!("unknown listing type '{raw}'"))
}
