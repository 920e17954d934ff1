// src/market.rs
use crate::db::{find_as, find_one_as, Collection, Filter, Store};
use crate::error::ApiError;
use crate::models::Stock;
use log::error;

const STOCK_LIMIT: usize = 1000;

pub async fn list_stocks(store: &dyn Store) -> Result<Vec<Stock>, ApiError> {
    find_as(store, Collection::Stocks, &Filter::all(), STOCK_LIMIT)
        .await
        .map_err(|e| {
            error!("Failed to list stocks: {}", e);
            ApiError::internal(e)
        })
}

/// Case-insensitive symbol lookup.
pub async fn get_stock(store: &dyn Store, symbol: &str) -> Result<Stock, ApiError> {
    let symbol = symbol.to_uppercase();
    let stock: Option<Stock> =
        find_one_as(store, Collection::Stocks, &Filter::all().eq("symbol", symbol.as_str()))
            .await
            .map_err(|e| {
                error!("Failed to look up stock {}: {}", symbol, e);
                ApiError::internal(e)
            })?;
    stock.ok_or_else(|| ApiError::NotFound("Stock not found".to_string()))
}
