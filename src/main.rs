use accrete::custody::SimulatedBank;
use accrete::events::TracingSink;
use accrete::orchestration::PositionManager;
use accrete::{config::Config, AccountId, AssetId, EngineError, StrategyKind, Timestamp};
use anyhow::Context;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Arc;

const SECS_PER_DAY: u64 = 86_400;
const PARTICIPANT_BUDGET: u64 = 1_000_000;
const REWARD_BUDGET: u64 = 1_000_000;

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing_subscriber::filter::LevelFilter::INFO.into()),
        )
        .init();

    // Load configuration
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(config) {
        eprintln!("Simulation error: {:#}", e);
        std::process::exit(1);
    }
}

/// Drive random participant traffic through every configured strategy,
/// then audit the books and print one JSON summary per strategy.
fn run(config: Config) -> anyhow::Result<()> {
    let bank = Arc::new(SimulatedBank::new());
    let manager = PositionManager::new(bank.clone(), Arc::new(TracingSink));
    let ops = AccountId::new("ops".to_string());
    let start = Timestamp::new(1_700_000_000);

    let participants: Vec<AccountId> = (0..config.sim_participants)
        .map(|i| AccountId::new(format!("user-{}", i)))
        .collect();

    // Register strategies and seed balances: participants hold the
    // principal asset, ops funds each staking strategy's reward reserve.
    for def in &config.strategies {
        manager
            .create_strategy(def.clone(), ops.clone(), start)
            .with_context(|| format!("registering strategy {}", def.id))?;
        for participant in &participants {
            bank.credit_account(participant, def.assets.principal_asset(), PARTICIPANT_BUDGET);
        }
        if def.kind == StrategyKind::Staking {
            bank.credit_account(&ops, def.assets.reward_asset(), REWARD_BUDGET);
            manager
                .add_reward_supply(&def.id, &ops, REWARD_BUDGET, start)
                .with_context(|| format!("funding rewards for {}", def.id))?;
        }
    }

    let steps = (config.sim_days as u64 * SECS_PER_DAY) / config.sim_step_secs;
    let mut rng = StdRng::seed_from_u64(config.sim_seed);
    let mut now = start;
    let mut actions: u64 = 0;
    let mut skipped: u64 = 0;

    for _ in 0..steps {
        now = now.plus_secs(config.sim_step_secs);
        for participant in &participants {
            let def = &config.strategies[rng.gen_range(0..config.strategies.len())];
            let outcome = match rng.gen_range(0..10) {
                0..=4 => manager
                    .deposit(&def.id, participant, rng.gen_range(1..=5_000), now)
                    .map(|_| ()),
                5..=7 => manager
                    .withdraw(&def.id, participant, rng.gen_range(1..=2_000), now)
                    .map(|_| ()),
                _ => manager.claim(&def.id, participant, now).map(|_| ()),
            };
            match outcome {
                Ok(()) => actions += 1,
                // Overdrawn participants and exhausted reserves are
                // expected traffic, not failures.
                Err(EngineError::InsufficientBalance) | Err(EngineError::TransferFailed(_)) => {
                    skipped += 1;
                }
                Err(e) => return Err(e).context("unexpected engine failure"),
            }
        }
        for def in &config.strategies {
            if !manager.conservation_holds(&def.id)? {
                anyhow::bail!("conservation violated in strategy {} at {}", def.id, now);
            }
        }
    }

    tracing::info!(steps, actions, skipped, "simulation complete");

    // Audit: per-strategy conservation, then custody against the books.
    let mut expected: HashMap<AssetId, u64> = HashMap::new();
    for def in &config.strategies {
        if !manager.conservation_holds(&def.id)? {
            anyhow::bail!("conservation violated in strategy {}", def.id);
        }
        let summary = manager.strategy_summary(&def.id, now)?;
        *expected
            .entry(def.assets.principal_asset().clone())
            .or_insert(0) += summary.total_principal;
        *expected
            .entry(def.assets.reward_asset().clone())
            .or_insert(0) += summary.reward_reserve;
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    for (asset, amount) in &expected {
        let held = bank.vault_balance(asset);
        if held != *amount {
            anyhow::bail!(
                "custody mismatch for {}: vault holds {}, books say {}",
                asset,
                held,
                amount
            );
        }
    }

    Ok(())
}
