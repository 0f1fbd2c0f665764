use std::sync::Arc;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use client_core::{
    load_settings, normalize_base_url, BootstrapSettings, CatalogBootstrapController,
    CatalogPhase, CatalogTransport, ChannelNavigator, ClientSettings, ConversationController,
    DetailView, HttpTransport, PopulationDecision, SubmitOutcome,
};
use shared::domain::{Product, ProductId};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod view;

#[derive(Parser, Debug)]
#[command(about = "Furniture shopping assistant client")]
struct Args {
    /// Backend base url, e.g. http://localhost:8000/api
    #[arg(long, global = true)]
    api_url: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Talk to the recommendation assistant.
    Chat,
    /// Bootstrap and list the catalog, populating an empty store once.
    Catalog {
        #[arg(long)]
        load_samples: bool,
        /// Retry the listing once if it fails.
        #[arg(long)]
        retry: bool,
        #[arg(long)]
        json: bool,
    },
    Product {
        id: i64,
        #[arg(long)]
        json: bool,
    },
    Category {
        name: String,
    },
    Search {
        query: String,
    },
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(api_url) = args.api_url {
        settings.api_base_url = api_url;
    }
    settings.api_base_url = normalize_base_url(&settings.api_base_url)?;
    info!(api = %settings.api_base_url, "using backend");

    let transport = Arc::new(HttpTransport::new(&settings)?);

    match args.command {
        Command::Chat => run_chat(transport).await,
        Command::Catalog {
            load_samples,
            retry,
            json,
        } => run_catalog(&settings, transport, load_samples, retry, json).await,
        Command::Product { id, json } => match transport.get_product(ProductId(id)).await {
            Ok(product) if json => {
                println!("{}", serde_json::to_string_pretty(&product)?);
                Ok(())
            }
            Ok(product) => {
                print!("{}", view::product_sheet(&product));
                Ok(())
            }
            Err(error) if error.is_not_found() => {
                println!("No product with id {id}.");
                Ok(())
            }
            Err(error) => Err(error.into()),
        },
        Command::Category { name } => {
            let products = transport.products_by_category(&name).await?;
            print_rows(&products);
            Ok(())
        }
        Command::Search { query } => {
            let products = transport.search_products(&query).await?;
            print_rows(&products);
            Ok(())
        }
    }
}

fn print_rows(products: &[Product]) {
    if products.is_empty() {
        println!("No products found.");
    }
    for product in products {
        println!("{}", view::product_row(product));
    }
}

async fn run_chat(transport: Arc<HttpTransport>) -> Result<()> {
    let (navigator, mut navigation) = ChannelNavigator::new();
    let controller = ConversationController::new(transport, Arc::new(navigator));

    let mut printed = 0;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        let snapshot = controller.snapshot().await;
        for turn in snapshot.transcript.turns().iter().skip(printed) {
            print!("{}", view::turn(turn));
        }
        printed = snapshot.transcript.len();

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line == "/quit" {
            break;
        }

        if let Some(choice) = line.strip_prefix("/open") {
            let recommendations = snapshot.transcript.last_recommendations();
            let picked = choice
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|idx| recommendations.get(idx));
            match picked {
                Some(product) => controller.select_product(product.clone()),
                None => println!("No recommendation with that number."),
            }
            while let Ok(request) = navigation.try_recv() {
                println!("-- {} --", request.route);
                print!("{}", view::detail(&DetailView::from(Some(request))));
            }
            continue;
        }

        match controller.submit(line).await {
            SubmitOutcome::Rejected(reason) => tracing::debug!(?reason, "submission ignored"),
            SubmitOutcome::Discarded => break,
            SubmitOutcome::Answered | SubmitOutcome::FellBack => {}
        }
    }

    controller.shutdown();
    Ok(())
}

async fn run_catalog(
    settings: &ClientSettings,
    transport: Arc<HttpTransport>,
    load_samples: bool,
    retry: bool,
    json: bool,
) -> Result<()> {
    let bootstrap = CatalogBootstrapController::new(
        Arc::clone(&transport) as Arc<dyn CatalogTransport>,
        transport,
        BootstrapSettings::from(settings),
    );

    bootstrap.activate().await;

    if retry && matches!(bootstrap.snapshot().await.phase, CatalogPhase::Failed(_)) {
        bootstrap.retry().await;
    }

    if load_samples {
        match bootstrap.load_sample_products().await {
            PopulationDecision::Issued => println!("Loading sample products..."),
            PopulationDecision::AlreadyIssued => {
                println!("Sample products were already requested this session.")
            }
            PopulationDecision::NotNeeded => println!("The catalog already has products."),
        }
    }

    if bootstrap.snapshot().await.trigger_issued {
        info!(
            delay_ms = settings.population_recheck_delay.as_millis() as u64,
            "waiting for the catalog recheck"
        );
        bootstrap.wait_for_recheck().await;
    }

    let snapshot = bootstrap.snapshot().await;
    bootstrap.shutdown();

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot.products)?);
    } else {
        print!("{}", view::catalog(&snapshot));
    }

    if let CatalogPhase::Failed(message) = snapshot.phase {
        bail!("{message}");
    }
    Ok(())
}
