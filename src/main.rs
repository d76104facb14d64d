use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;
use tracing_subscriber::EnvFilter;

use staycart::api::BookingApi;
use staycart::client::HttpBookingApi;
use staycart::config::Config;
use staycart::context::SessionContext;
use staycart::engine::{check_no_conflict, validate_range, SnapshotStore};
use staycart::model::{CatalogId, DateRange, SessionId};
use staycart::validator::{BookingCodeValidator, Lookup};

const USAGE: &str = "usage:
  staycart availability <unit> <check-in> <check-out>
  staycart validate <code>
  staycart cart [session]";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = Config::from_env();
    staycart::observability::init(config.metrics_port)?;

    let args: Vec<String> = std::env::args().skip(1).collect();
    let args: Vec<&str> = args.iter().map(String::as_str).collect();

    let mut ctx = SessionContext::from_config(&config);
    if let ["cart", session] = args.as_slice() {
        let ulid = session.parse().map_err(|e| format!("bad session id {session:?}: {e}"))?;
        ctx = ctx.with_session(SessionId(ulid));
    }
    let api: Arc<dyn BookingApi> = Arc::new(HttpBookingApi::from_config(&config, &ctx)?);
    info!(api_url = %config.api_url, session = %ctx.session_id, "staycart");

    match args.as_slice() {
        ["availability", unit, check_in, check_out] => {
            let range = DateRange::new(parse_day(check_in)?, parse_day(check_out)?)?;
            validate_range(&range, ctx.today())?;
            let store = SnapshotStore::new(api);
            let index = store.get_or_fetch(&CatalogId::from(*unit)).await?;
            for blocked in index.blocked_ranges() {
                println!("blocked {blocked}");
            }
            match check_no_conflict(&index, &range) {
                Ok(()) => println!("{range}: available ({} nights)", range.nights()),
                Err(e) => println!("{range}: {e}"),
            }
        }
        ["validate", code] => {
            let validator = BookingCodeValidator::from_config(api, &config);
            let Lookup::Resolved(resolved) = validator.validate(code).await? else {
                return Ok(());
            };
            println!(
                "{} ({}): services allowed {} to {}",
                resolved.code,
                resolved.code.display_form(validator.prefix()),
                resolved.window.start(),
                resolved.window.end()
            );
        }
        ["cart"] | ["cart", _] => {
            let remote = api.get_cart(ctx.session_id).await?;
            for item in remote.cart.items() {
                println!(
                    "{}  {:?}  {}  {}",
                    item.line_id(),
                    item.kind(),
                    item.snapshot().title,
                    item.total_price()
                );
            }
            println!("total {} (server reported {})", remote.cart.grand_total(), remote.reported_total);
        }
        _ => {
            eprintln!("{USAGE}");
            std::process::exit(2);
        }
    }
    Ok(())
}

fn parse_day(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|e| format!("bad date {raw:?}: {e}"))
}
