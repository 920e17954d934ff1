// src/trading.rs
use crate::db::{find_as, find_one_as, Collection, Filter, Store};
use crate::error::ApiError;
use crate::models::{new_id, OrderStatus, Portfolio, Role, TradeOrder, TradeRequest, User};
use chrono::Utc;
use log::{error, info, warn};
use serde::{Deserialize, Serialize};

pub const PORTFOLIO_LIMIT: usize = 100;

/// Quantity above which a `basic` user's order is logged (and still executed).
pub const BASIC_QUANTITY_WARNING: i64 = 1000;

#[derive(Debug, Serialize, Deserialize)]
pub struct PortfolioView {
    pub portfolios: Vec<Portfolio>,
    pub user_info: Option<User>,
    pub requesting_user: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TradeDebugInfo {
    pub user_balance_check: String,
    pub role_validation: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TradeReceipt {
    pub success: bool,
    pub trade: TradeOrder,
    pub debug_info: TradeDebugInfo,
}

pub fn requesting_name(caller: Option<&User>) -> String {
    caller
        .map(|u| u.username.clone())
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Holdings and profile of `user_id`. The caller only shows up in `requesting_user`.
pub async fn get_portfolio(
    store: &dyn Store,
    user_id: &str,
    caller: Option<&User>,
) -> Result<PortfolioView, ApiError> {
    let portfolios: Vec<Portfolio> = find_as(
        store,
        Collection::Portfolios,
        &Filter::all().eq("user_id", user_id),
        PORTFOLIO_LIMIT,
    )
    .await
    .map_err(|e| {
        error!("Failed to retrieve portfolio for {}: {}", user_id, e);
        ApiError::internal(e)
    })?;

    let user_info: Option<User> =
        find_one_as(store, Collection::Users, &Filter::all().eq("id", user_id))
            .await
            .map_err(|e| {
                error!("Failed to retrieve user {}: {}", user_id, e);
                ApiError::internal(e)
            })?;

    info!(
        "Portfolio for {} retrieved by {}",
        user_id,
        requesting_name(caller)
    );
    Ok(PortfolioView {
        portfolios,
        user_info,
        requesting_user: requesting_name(caller),
    })
}

/// Appends an executed order. The raw body is parsed only once a caller is known.
/// The body's `user_id` wins over the caller's id;
/// balance and role are never checked.
pub async fn place_trade(
    store: &dyn Store,
    body: &[u8],
    caller: Option<&User>,
) -> Result<TradeReceipt, ApiError> {
    let caller =
        caller.ok_or_else(|| ApiError::Unauthorized("Authentication required".to_string()))?;

    let request: TradeRequest = serde_json::from_slice(body).map_err(|e| {
        error!("Malformed trade from {}: {}", caller.username, e);
        ApiError::internal(e)
    })?;

    if caller.role == Role::Basic && request.quantity > BASIC_QUANTITY_WARNING {
        warn!(
            "Basic user {} attempting large trade ({} shares) - allowing anyway",
            caller.username, request.quantity
        );
    }

    let trade = TradeOrder {
        id: new_id(),
        user_id: request.user_id.unwrap_or_else(|| caller.id.clone()),
        stock_symbol: request.stock_symbol,
        order_type: request.order_type,
        quantity: request.quantity,
        price: request.price,
        status: OrderStatus::Executed,
        timestamp: Utc::now(),
    };

    let doc = serde_json::to_value(&trade).map_err(ApiError::internal)?;
    store
        .insert_one(Collection::Trades, doc)
        .await
        .map_err(|e| {
            error!("Failed to record trade {:?}: {}", trade, e);
            ApiError::internal(e)
        })?;

    info!("Trade executed: {:?}", trade);
    Ok(TradeReceipt {
        success: true,
        trade,
        debug_info: TradeDebugInfo {
            user_balance_check: "skipped".to_string(),
            role_validation: "bypassed".to_string(),
        },
    })
}
