use anyhow::Context;
use serde::Serialize;
use stay_scout::config::Config;
use stay_scout::geo::{geocode, Coordinates};
use stay_scout::rates::{fetch_rate_table, CurrencyRates};
use stay_scout::recommend::{recommend, Recommendations};
use stay_scout::scrapers::{airbnb, booking, AirbnbAdapter, BookingAdapter, ChromeFactory, PlatformAdapter};
use stay_scout::{PropertyDetails, ScoredListing, SearchCriteria, SearchOrchestrator, SearchResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Serialize)]
struct Report<'a> {
    result: &'a SearchResult,
    ranked: &'a [ScoredListing],
    recommendations: &'a Recommendations,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("stay_scout=info")))
        .init();

    info!("🏖️  Stay Scout - short-term rental search");
    info!("==========================================");

    let config = Config::load()?;
    let criteria = config.criteria.build().context("Invalid search criteria")?;

    info!("🔍 {} | {} → {} ({} nights)", criteria.location(), criteria.check_in(), criteria.check_out(), criteria.nights());
    info!("   Guests: {}", criteria.guests());
    if let Some(max) = criteria.max_price_per_night() {
        info!("   Max price: {:.0} {}/night", max, config.search.reference_currency);
    }

    let client = reqwest::Client::builder()
        .user_agent(concat!("stay-scout/", env!("CARGO_PKG_VERSION")))
        .timeout(Duration::from_secs(20))
        .build()
        .context("Failed to build HTTP client")?;

    let target = resolve_target(&client, &config, &criteria).await;
    let rates = load_rates(&client, &config, &criteria).await;

    let factory = ChromeFactory::launch(&config.browser).await?;

    let currency = &config.search.reference_currency;
    let mut adapters: Vec<Arc<dyn PlatformAdapter>> = Vec::new();
    if config.platforms.booking.enabled {
        let settings = config.platforms.booking.settings(booking::DEFAULT_BASE_URL, currency);
        adapters.push(Arc::new(BookingAdapter::new(settings)));
    }
    if config.platforms.airbnb.enabled {
        let settings = config.platforms.airbnb.settings(airbnb::DEFAULT_BASE_URL, currency);
        adapters.push(Arc::new(AirbnbAdapter::new(settings)));
    }
    if adapters.is_empty() {
        anyhow::bail!("No platform enabled in config");
    }

    let orchestrator = SearchOrchestrator::new(Arc::new(factory), rates)
        .with_retry_policy(config.retry.policy())
        .with_max_pages(config.search.max_pages)
        .with_details_limit(config.search.details_per_platform)
        .with_timeout(config.search.timeout())
        .with_reference_currency(currency)
        .with_target(target);

    let result = orchestrator.run(&criteria, &adapters).await;
    let ranked = config.scoring.scorer().score(&result, &criteria);
    let recommendations = recommend(&result, &ranked, config.search.alternatives);

    info!("\n✅ Found {} listings, {} within reach of the budget\n", result.listings.len(), ranked.len());
    print_report(&result, &recommendations, currency);

    let report = Report {
        result: &result,
        ranked: &ranked,
        recommendations: &recommendations,
    };
    let json = serde_json::to_string_pretty(&report)?;
    tokio::fs::write(&config.search.output, json)
        .await
        .with_context(|| format!("Failed to write {}", config.search.output.display()))?;
    info!("💾 Saved results to {}", config.search.output.display());

    Ok(())
}

async fn resolve_target(client: &reqwest::Client, config: &Config, criteria: &SearchCriteria) -> Option<Coordinates> {
    if let Some(target) = config.criteria.target() {
        return Some(target);
    }
    match geocode(client, criteria.location()).await {
        Ok(coordinates) => Some(coordinates),
        Err(e) => {
            warn!("Could not geocode {}: {:#}. Distances will be neutral.", criteria.location(), e);
            None
        }
    }
}

async fn load_rates(client: &reqwest::Client, config: &Config, criteria: &SearchCriteria) -> Arc<dyn CurrencyRates> {
    let base = &config.search.reference_currency;
    if let Some(endpoint) = &config.rates.endpoint {
        match fetch_rate_table(client, endpoint, base).await {
            Ok(table) => return Arc::new(table),
            Err(e) => warn!("Live exchange rates unavailable: {:#}. Using configured table.", e),
        }
    }
    Arc::new(config.rates.static_table(base, criteria.check_in()))
}

fn print_listing(entry: &ScoredListing, currency: &str) {
    let listing = &entry.listing;
    println!("{}. {} [{}]", entry.rank, listing.title, listing.platform);
    println!("   {:.2} {}/night", listing.price_per_night, currency);
    if let Some(total) = listing.total_price {
        println!("   Total: {:.2} {}", total, currency);
    }
    match (listing.rating, listing.review_count) {
        (Some(rating), Some(reviews)) => println!("   Rating: {:.2}/5 ({} reviews)", rating, reviews),
        (Some(rating), None) => println!("   Rating: {:.2}/5", rating),
        _ => {}
    }
    if let Some(distance) = listing.distance_to_target {
        println!("   Distance: {:.1} km", distance);
    }
    println!(
        "   Score: {:.3} (value {:.3}, location {:.3})",
        entry.composite_score, entry.value_score, entry.location_score
    );
    println!("   Amenities: {}", listing.amenities.iter().cloned().collect::<Vec<_>>().join(", "));
    if let Some(details) = &listing.details {
        print_details(details, currency);
    }
    println!("   URL: {}", listing.url);
    println!();
}

fn print_details(details: &PropertyDetails, currency: &str) {
    let rooms: Vec<String> = [
        details.bedrooms.map(|n| format!("{} bedrooms", n)),
        details.bathrooms.map(|n| format!("{} baths", n)),
        details.max_guests.map(|n| format!("sleeps {}", n)),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !rooms.is_empty() {
        println!("   Rooms: {}", rooms.join(", "));
    }
    for (label, fee) in [
        ("Cleaning fee", details.cleaning_fee),
        ("Service fee", details.service_fee),
        ("Taxes", details.taxes),
    ] {
        if let Some(fee) = fee {
            println!("   {}: {:.2} {}", label, fee, currency);
        }
    }
    if let Some(host) = &details.host_name {
        match details.host_rating {
            Some(rating) => println!("   Host: {} ({:.2}/5)", host, rating),
            None => println!("   Host: {}", host),
        }
    }
    if details.instant_book {
        println!("   Instant booking");
    }
}

fn print_report(result: &SearchResult, recommendations: &Recommendations, currency: &str) {
    for (platform, report) in &result.platform_status {
        match report.status.reason() {
            Some(reason) => println!("{}: {} listings ({})", platform, report.listings, reason),
            None => println!("{}: {} listings", platform, report.listings),
        }
    }
    println!();

    if let Some(top) = &recommendations.top {
        println!("🏆 Top recommendation");
        print_listing(top, currency);
    }

    if !recommendations.alternatives.is_empty() {
        println!("🔄 Alternatives");
        for alternative in &recommendations.alternatives {
            print_listing(alternative, currency);
        }
    }

    let insights = &recommendations.insights;
    if let Some(price) = &insights.price {
        println!("📊 Market: {} listings", insights.total_listings);
        println!(
            "   Price/night: min {:.2}, median {:.2}, max {:.2}",
            price.min, price.median, price.max
        );
        println!(
            "   Budget options: {}, premium: {}, over budget: {}",
            insights.budget_options, insights.premium_options, insights.excluded_over_budget
        );
        let popular: Vec<_> = insights
            .amenity_frequency
            .iter()
            .take(10)
            .map(|a| format!("{} ({})", a.amenity, a.count))
            .collect();
        println!("   Popular amenities: {}", popular.join(", "));
        println!();
    }

    for note in &recommendations.notes {
        println!("💡 {}", note);
    }
}
