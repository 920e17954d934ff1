// src/seed.rs
use crate::auth::create_token;
use crate::db::{find_as, insert_all, Collection, Filter, Store, StoreResult};
use crate::models::{
    new_id, Alert, AlertType, OrderStatus, OrderType, Portfolio, Role, Stock, TradeOrder, User,
};
use chrono::{Duration, Utc};
use log::info;
use rand::seq::SliceRandom;
use rand::Rng;

/// symbol, company, price, daily change, volume, market cap
pub const STOCK_CATALOGUE: [(&str, &str, f64, f64, u64, f64); 25] = [
    ("AAPL", "Apple Inc.", 175.43, 2.1, 50234567, 2750000000000.0),
    ("GOOGL", "Alphabet Inc.", 2847.52, -15.23, 1234567, 1800000000000.0),
    ("MSFT", "Microsoft Corporation", 378.85, 5.67, 25467891, 2820000000000.0),
    ("AMZN", "Amazon.com Inc.", 3102.15, -8.45, 3456789, 1580000000000.0),
    ("TSLA", "Tesla Inc.", 267.89, 12.34, 89567234, 850000000000.0),
    ("META", "Meta Platforms Inc.", 312.45, -3.21, 12345678, 790000000000.0),
    ("NVDA", "NVIDIA Corporation", 445.67, 18.92, 34567891, 1100000000000.0),
    ("NFLX", "Netflix Inc.", 389.12, -7.83, 5678912, 170000000000.0),
    ("AMD", "Advanced Micro Devices", 98.76, 4.32, 23456789, 160000000000.0),
    ("CRM", "Salesforce Inc.", 189.45, -2.11, 8901234, 180000000000.0),
    ("INTC", "Intel Corporation", 52.34, 1.89, 45678901, 210000000000.0),
    ("ORCL", "Oracle Corporation", 87.65, -1.23, 12789345, 230000000000.0),
    ("IBM", "International Business Machines", 145.23, 2.45, 6789012, 130000000000.0),
    ("WMT", "Walmart Inc.", 154.78, 0.89, 8901345, 420000000000.0),
    ("JPM", "JPMorgan Chase & Co.", 168.91, 3.45, 15678902, 490000000000.0),
    ("V", "Visa Inc.", 234.56, 1.78, 9012346, 480000000000.0),
    ("JNJ", "Johnson & Johnson", 163.45, -0.67, 7890123, 430000000000.0),
    ("PG", "Procter & Gamble Co.", 145.67, 0.34, 5678901, 340000000000.0),
    ("UNH", "UnitedHealth Group Inc.", 523.12, 8.91, 2345678, 490000000000.0),
    ("HD", "The Home Depot Inc.", 318.90, 2.56, 11234567, 330000000000.0),
    ("PYPL", "PayPal Holdings Inc.", 67.89, -1.45, 18901234, 78000000000.0),
    ("DIS", "The Walt Disney Company", 95.43, -2.78, 13456789, 170000000000.0),
    ("ADBE", "Adobe Inc.", 487.65, 6.23, 4567890, 220000000000.0),
    ("XOM", "Exxon Mobil Corporation", 109.87, 1.34, 89012345, 460000000000.0),
    ("KO", "The Coca-Cola Company", 58.76, 0.45, 16789012, 250000000000.0),
];

/// username, email, role, balance
pub const USER_CATALOGUE: [(&str, &str, Role, f64); 10] = [
    ("admin_user", "admin@broker.com", Role::Admin, 1000000.0),
    ("john_trader", "john@email.com", Role::Trader, 50000.0),
    ("jane_basic", "jane@email.com", Role::Basic, 10000.0),
    ("bob_whale", "bob@email.com", Role::Trader, 500000.0),
    ("alice_newbie", "alice@email.com", Role::Basic, 5000.0),
    ("mike_pro", "mike@email.com", Role::Trader, 100000.0),
    ("sarah_investor", "sarah@email.com", Role::Trader, 75000.0),
    ("tom_day_trader", "tom@email.com", Role::Trader, 25000.0),
    ("lisa_analyst", "lisa@email.com", Role::Trader, 150000.0),
    ("david_crypto", "david@email.com", Role::Basic, 8000.0),
];

pub const MIN_HOLDINGS: usize = 3;
pub const MAX_HOLDINGS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedSummary {
    pub users: usize,
    pub stocks: usize,
    pub portfolios: usize,
    pub trades: usize,
    pub alerts: usize,
}

fn catalogue_stocks() -> Vec<Stock> {
    let now = Utc::now();
    STOCK_CATALOGUE
        .iter()
        .map(|&(symbol, name, price, change, volume, market_cap)| Stock {
            id: new_id(),
            symbol: symbol.to_string(),
            company_name: name.to_string(),
            current_price: price,
            daily_change: change,
            volume,
            market_cap,
            last_updated: now,
        })
        .collect()
}

fn catalogue_users() -> StoreResult<Vec<User>> {
    let now = Utc::now();
    let mut users = Vec::with_capacity(USER_CATALOGUE.len());
    for &(username, email, role, balance) in USER_CATALOGUE.iter() {
        let id = new_id();
        users.push(User {
            api_token: create_token(&id)?,
            id,
            username: username.to_string(),
            email: email.to_string(),
            role,
            balance,
            created_at: now,
        });
    }
    Ok(users)
}

/// Clears all five collections and repopulates them. Runs once, before serving.
pub async fn init_dummy_data<R: Rng + Send>(
    store: &dyn Store,
    rng: &mut R,
) -> StoreResult<SeedSummary> {
    for collection in Collection::ALL {
        let removed = store.delete_many(collection, &Filter::all()).await?;
        info!("Cleared {} documents from {}", removed, collection.name());
    }

    insert_all(store, Collection::Stocks, &catalogue_stocks()).await?;
    insert_all(store, Collection::Users, &catalogue_users()?).await?;

    let users: Vec<User> = find_as(store, Collection::Users, &Filter::all(), 100).await?;
    let stocks: Vec<Stock> = find_as(store, Collection::Stocks, &Filter::all(), 100).await?;

    let mut portfolios = Vec::new();
    let mut trades = Vec::new();
    let mut alerts = Vec::new();
    let now = Utc::now();

    for user in &users {
        let holdings = rng.gen_range(MIN_HOLDINGS..=MAX_HOLDINGS);
        let picked: Vec<&Stock> = stocks.choose_multiple(rng, holdings).collect();

        for stock in picked {
            let quantity = rng.gen_range(1..=100);
            portfolios.push(Portfolio {
                id: new_id(),
                user_id: user.id.clone(),
                stock_symbol: stock.symbol.clone(),
                quantity,
                avg_cost: stock.current_price * rng.gen_range(0.8..1.2),
                current_value: quantity as f64 * stock.current_price,
                last_updated: now,
            });

            for _ in 0..rng.gen_range(1..=5) {
                let order_type = if rng.gen_bool(0.5) {
                    OrderType::Buy
                } else {
                    OrderType::Sell
                };
                trades.push(TradeOrder {
                    id: new_id(),
                    user_id: user.id.clone(),
                    stock_symbol: stock.symbol.clone(),
                    order_type,
                    quantity: rng.gen_range(1..=50),
                    price: stock.current_price * rng.gen_range(0.9..1.1),
                    status: OrderStatus::Executed,
                    timestamp: now - Duration::days(rng.gen_range(1..=30)),
                });
            }

            if rng.gen::<f64>() > 0.5 {
                let alert_type = if rng.gen_bool(0.5) {
                    AlertType::StopLoss
                } else {
                    AlertType::Target
                };
                alerts.push(Alert {
                    id: new_id(),
                    user_id: user.id.clone(),
                    stock_symbol: stock.symbol.clone(),
                    alert_type,
                    trigger_price: stock.current_price * rng.gen_range(0.8..1.3),
                    is_active: true,
                    created_at: now,
                });
            }
        }
    }

    insert_all(store, Collection::Portfolios, &portfolios).await?;
    insert_all(store, Collection::Trades, &trades).await?;
    insert_all(store, Collection::Alerts, &alerts).await?;

    let summary = SeedSummary {
        users: users.len(),
        stocks: stocks.len(),
        portfolios: portfolios.len(),
        trades: trades.len(),
        alerts: alerts.len(),
    };
    info!("Seeded dummy data: {:?}", summary);
    Ok(summary)
}
