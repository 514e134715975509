mod cli;

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::info;

use cli::{Cli, Command};
use estate_listings::config::AppConfig;
use estate_listings::models::{NewInquiry, Property};
use estate_listings::schema::MIGRATION_SQL;
use estate_listings::{telemetry, ListingService, RestBackend};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Command::Schema = cli.command {
        print!("{MIGRATION_SQL}");
        return Ok(());
    }

    let config = AppConfig::load().context("Failed to load configuration")?;
    telemetry::init(&config.telemetry).context("Failed to initialise logging")?;

    let backend = RestBackend::new(&config.backend).context("Failed to create HTTP client")?;
    let service = ListingService::new(backend);
    info!("Connected to {}", config.backend.url);

    match cli.command {
        Command::List(args) => {
            let properties = service.list_properties(&args.into()).await?;
            print_properties(&properties);
            write_json(cli.out, &properties).await?;
        }
        Command::Featured => {
            let properties = service.featured_properties().await?;
            print_properties(&properties);
            write_json(cli.out, &properties).await?;
        }
        Command::Search { query } => {
            let properties = service.search_properties(&query).await?;
            print_properties(&properties);
            write_json(cli.out, &properties).await?;
        }
        Command::Show { id } => match service.property(id).await? {
            Some(property) => {
                print_properties(std::slice::from_ref(&property));
                write_json(cli.out, &property).await?;
            }
            None => println!("No property with id {id}"),
        },
        Command::Inquire(args) => {
            let inquiry = NewInquiry {
                property_id: args.property,
                name: args.name,
                email: args.email,
                phone: args.phone,
                message: args.message,
            };
            service.create_inquiry(&inquiry).await?;
            println!("Inquiry sent");
        }
        Command::Save(args) => {
            service.save_property(args.user, args.property).await?;
            println!("Saved {}", args.property);
        }
        Command::Unsave(args) => {
            service.remove_saved_property(args.user, args.property).await?;
            println!("Removed {}", args.property);
        }
        Command::Saved { user } => {
            let properties = service.saved_properties(user).await?;
            print_properties(&properties);
            write_json(cli.out, &properties).await?;
        }
        Command::Agents => {
            let agents = service.agents().await?;
            for agent in &agents {
                println!(
                    "{} ({}) rating {:.1}, {} sales",
                    agent.full_name, agent.email, agent.rating, agent.total_sales
                );
            }
            write_json(cli.out, &agents).await?;
        }
        Command::Schema => {}
    }

    Ok(())
}

fn print_properties(properties: &[Property]) {
    info!("Fetched {} properties", properties.len());
    for (i, property) in properties.iter().enumerate() {
        println!(
            "{}. {} ({:.0}, {})",
            i + 1,
            property.title,
            property.price,
            property.status.as_str()
        );
        println!(
            "   {} {} for {}, {} bd / {} ba",
            property.city,
            property.property_type.as_str(),
            property.listing_type.as_str(),
            property.bedrooms,
            property.bathrooms
        );
        if let Some(agent) = &property.agent {
            println!("   Agent: {}", agent.full_name);
        }
        if !property.features.is_empty() {
            let names: Vec<_> = property.features.iter().map(|f| f.feature_name.as_str()).collect();
            println!("   Features: {}", names.join(", "));
        }
        if let Some(image) = property.primary_image() {
            println!("   Image: {}", image);
        }
        println!("   ID: {}", property.id);
        println!();
    }
}

async fn write_json<T: Serialize>(out: Option<std::path::PathBuf>, value: &T) -> Result<()> {
    let Some(path) = out else {
        return Ok(());
    };
    let json = serde_json::to_string_pretty(value)?;
    tokio::fs::write(&path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    info!("💾 Saved results to {}", path.display());
    Ok(())
}
