use anyhow::Context;
use clap::Parser;

use baggage_calc::adapters::file::JsonlHistoryStore;
use baggage_calc::adapters::memory::MemoryCatalogStore;
use baggage_calc::core::analytics::{self, CancelFlag};
use baggage_calc::core::{limits, system};
use baggage_calc::domain::model::{FlightType, SelectedItem, TripDirection};
use baggage_calc::domain::ports::{CatalogStore, HistoryStore, ReferenceStore};
use baggage_calc::utils::error::{CalcError, ErrorSeverity};
use baggage_calc::utils::{logger, validation::Validate};
use baggage_calc::{CalculationEngine, CliConfig, Dataset};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CliConfig::parse();

    // 初始化日誌
    logger::init_cli_logger(config.verbose);

    tracing::info!("Starting baggage-calc CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    // 載入參考資料集並建立引擎
    let dataset = match Dataset::from_file(&config.dataset) {
        Ok(dataset) => dataset,
        Err(e) => {
            tracing::error!("❌ Failed to load dataset: {}", e);
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    let catalog = dataset.catalog_store();
    let history = JsonlHistoryStore::new(&config.history);
    let engine = CalculationEngine::new(dataset.reference_store(), history);

    let wants_calculation = config.airline.is_some() || !config.items.is_empty();

    if wants_calculation {
        if let Err(e) = run_calculation(&engine, &catalog, &config).await {
            tracing::error!(
                "❌ Calculation failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,      // 有效但不支援，仍算成功結束
                ErrorSeverity::Medium => 2,   // 選擇不完整，可重試
                ErrorSeverity::High => 1,     // 參考資料問題
                ErrorSeverity::Critical => 3, // 系統錯誤
            };
            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }

    if config.analytics {
        print_analytics(&engine, &config)
            .await
            .context("Analytics refresh failed")?;
    }

    if !wants_calculation && !config.analytics {
        eprintln!("Nothing to do: pass a selection with --airline/--item, or --analytics.");
        if let Ok(airlines) = engine.reference().airlines().await {
            let ids: Vec<&str> = airlines.iter().map(|a| a.id.as_str()).collect();
            eprintln!("Available airlines: {}", ids.join(", "));
        }
        std::process::exit(2);
    }

    Ok(())
}

async fn run_calculation<R, H>(
    engine: &CalculationEngine<R, H>,
    catalog: &MemoryCatalogStore,
    config: &CliConfig,
) -> baggage_calc::Result<()>
where
    R: ReferenceStore,
    H: HistoryStore,
{
    let selection = config.selection_draft()?.finalize()?;
    let items = resolve_items(catalog, config).await?;

    // 跟原介面一樣，先給 piece system 與航班選項的提示
    let origin = engine.reference().country(&selection.origin).await?;
    let destination = engine.reference().country(&selection.destination).await?;
    if let (Some(origin), Some(destination)) = (&origin, &destination) {
        if let Some(notice) = system::piece_system_notice(origin, destination) {
            println!("ℹ️  {}", notice);
        }
        if let Some(airline) = engine.reference().airline(&selection.airline).await? {
            let resolution = system::resolve_system(origin, destination);
            let options = limits::flight_options(&airline, Some(&resolution));
            if selection.flight_type == FlightType::Domestic && !options.domestic_enabled {
                println!(
                    "⚠️  {} does not offer domestic flights for this country pair.",
                    airline.name
                );
            }
        }
    }

    let outcome = engine.run(&selection, &items).await?;

    println!("✅ Calculation complete!");
    println!("{}", outcome.summary);
    if outcome.limit_exceeded {
        println!("⚠️  {}", outcome.fee_detail);
    } else {
        println!("{}", outcome.fee_detail);
    }

    Ok(())
}

/// Matches the `name=count` arguments against the catalog, by id first and
/// display name second.
async fn resolve_items(
    catalog: &MemoryCatalogStore,
    config: &CliConfig,
) -> baggage_calc::Result<Vec<SelectedItem>> {
    let available = catalog.items().await?;
    let mut selected = Vec::new();

    for (name, count) in config.parsed_items()? {
        let found = available
            .iter()
            .find(|item| item.id == name)
            .or_else(|| {
                available
                    .iter()
                    .find(|item| item.name.eq_ignore_ascii_case(&name))
            })
            .ok_or_else(|| CalcError::ReferenceDataMissingError {
                kind: "catalog item".to_string(),
                id: name.clone(),
            })?;

        selected.push(SelectedItem {
            item_id: found.id.clone(),
            name: found.name.clone(),
            unit_weight: found.weight,
            count,
        });
    }

    Ok(selected)
}

async fn print_analytics<R, H>(
    engine: &CalculationEngine<R, H>,
    config: &CliConfig,
) -> baggage_calc::Result<()>
where
    R: ReferenceStore,
    H: HistoryStore,
{
    let cancel = CancelFlag::new();
    let records = engine.history().records().await?;
    let usage = engine.history().item_usage().await?;

    if records.is_empty() {
        println!("📊 Make calculations to have a history.");
        return Ok(());
    }

    println!("📊 Analytics ({} calculations)", records.len());

    for direction in [TripDirection::Outbound, TripDirection::Inbound] {
        if let Some(average) = analytics::recency_average(&records, direction, &cancel)? {
            println!("   {}", average.message());
        }
    }

    if let Some(delta) = analytics::directional_delta(&records, &cancel)? {
        println!("   {}", delta.message());
    }

    let histogram = analytics::weight_histogram(&records, &cancel)?;
    println!("📊 Weight ranges:");
    for (label, count) in histogram.rows() {
        if count > 0 {
            println!("   {:>8}: {}", label, count);
        }
    }

    let ranking = analytics::violation_ranking(&records, engine.reference(), &cancel).await?;
    if !ranking.is_empty() {
        println!("🚨 Most violated policies:");
        for (index, group) in ranking.iter().enumerate() {
            let limit = match group.current_limit {
                Some(limit) => format!("current limit {} kg", limit),
                None => "no longer offered".to_string(),
            };
            println!(
                "   {}. {} {} {}: {} violations ({})",
                index + 1,
                group.airline,
                group.class_type,
                group.flight_type,
                group.count,
                limit
            );
        }
    }

    let violations = analytics::recent_violations(&records, engine.reference(), &cancel).await?;
    if !violations.is_empty() {
        println!("🚨 Recent violations:");
        for (index, violation) in violations.iter().enumerate() {
            println!(
                "   {}. {} {} {} | {} -> {} | {:.1} kg over | {}",
                index + 1,
                violation.airline_name,
                violation.class_type,
                violation.flight_type,
                violation.origin,
                violation.destination,
                violation.excess(),
                violation.fee_line()
            );
            if let Some(total) = violation.total_fee() {
                println!("      Total Fee: {}{}", total, violation.currency);
            }
        }
    }

    for direction in [TripDirection::Outbound, TripDirection::Inbound] {
        let flights = analytics::recent_by_direction(&records, direction);
        if !flights.is_empty() {
            println!("✈️  Recent {} flights:", direction);
            for (index, flight) in flights.iter().enumerate() {
                println!(
                    "   {}. {}: {} -> {} ({:.1} kg)",
                    index + 1,
                    flight.airline,
                    flight.origin,
                    flight.destination,
                    flight.total_weight
                );
            }
        }
    }

    for flight_type in [FlightType::International, FlightType::Domestic] {
        let flights = analytics::recent_by_flight_type(&records, flight_type);
        if !flights.is_empty() {
            println!("✈️  Recent {} flights:", flight_type);
            for (index, flight) in flights.iter().enumerate() {
                println!(
                    "   {}. {}: {} -> {} ({:.1} kg)",
                    index + 1,
                    flight.airline,
                    flight.origin,
                    flight.destination,
                    flight.total_weight
                );
            }
        }
    }

    let top_items = analytics::most_used_items(&usage);
    if !top_items.is_empty() {
        println!("🧳 Items added most:");
        for (index, (name, count)) in top_items.iter().enumerate() {
            println!("   {}. {} ({})", index + 1, name, count);
        }
    }

    let countries = analytics::country_usage(&records, &cancel)?;
    if !countries.departed.is_empty() {
        println!("🌍 Departed from most:");
        for (index, (name, count)) in countries.departed.iter().enumerate() {
            println!("   {}. {} ({})", index + 1, name, count);
        }
        println!("🌍 Traveled to most:");
        for (index, (name, count)) in countries.traveled.iter().enumerate() {
            println!("   {}. {} ({})", index + 1, name, count);
        }
    }

    if let Some(airline) = &config.airline {
        let weights = analytics::weights_for_airline(&records, airline);
        if !weights.is_empty() {
            println!("🧳 Previous weights with {}:", airline);
            for record in &weights {
                println!(
                    "   {:.1} kg on {} ({} -> {})",
                    record.total_weight,
                    record.calculated_at.format("%Y-%m-%d"),
                    record.origin,
                    record.destination
                );
            }
        }
    }

    Ok(())
}
