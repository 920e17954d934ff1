// src/api.rs
use crate::admin::{list_all_users, system_info};
use crate::assistant::Assistant;
use crate::auth::{bearer_token, login, resolve_bearer};
use crate::config::Config;
use crate::db::Store;
use crate::error::handle_rejection;
use crate::market::{get_stock, list_stocks};
use crate::models::{ChatMessage, LoginRequest, User};
use crate::trading::{get_portfolio, place_trade};
use log::info;
use std::convert::Infallible;
use std::sync::Arc;
use warp::hyper::body::Bytes;
use warp::{Filter, Rejection, Reply};

pub struct AppState {
    pub store: Arc<dyn Store>,
    pub assistant: Assistant,
    pub config: Config,
}

/// Full route tree under `/api`, with CORS, access logging and error mapping.
pub fn app(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl Reply, Error = Infallible> + Clone {
    let cors = cors(&state.config);
    routes(state)
        .with(cors)
        .recover(handle_rejection)
        .with(warp::log("brokercorp::access"))
}

pub fn routes(
    state: Arc<AppState>,
) -> impl Filter<Extract = impl Reply, Error = Rejection> + Clone {
    let login = warp::path!("api" / "login")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(warp::body::json())
        .and_then(login_handler);

    let chat = warp::path!("api" / "chat")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(warp::body::json())
        .and_then(chat_handler);

    let stocks = warp::path!("api" / "stocks")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(list_stocks_handler);

    let stock = warp::path!("api" / "stocks" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and_then(get_stock_handler);

    let portfolio = warp::path!("api" / "portfolio" / String)
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_caller(state.clone()))
        .and_then(get_portfolio_handler);

    let trade = warp::path!("api" / "trade")
        .and(warp::post())
        .and(with_state(state.clone()))
        .and(with_caller(state.clone()))
        .and(warp::body::bytes())
        .and_then(place_trade_handler);

    let admin_users = warp::path!("api" / "admin" / "users")
        .and(warp::get())
        .and(with_state(state.clone()))
        .and(with_caller(state.clone()))
        .and_then(admin_users_handler);

    let system = warp::path!("api" / "system" / "info")
        .and(warp::get())
        .and(with_state(state))
        .and_then(system_info_handler);

    login
        .or(chat)
        .or(stocks)
        .or(stock)
        .or(portfolio)
        .or(trade)
        .or(admin_users)
        .or(system)
}

fn cors(config: &Config) -> warp::filters::cors::Builder {
    let builder = warp::cors()
        .allow_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allow_headers(vec!["authorization", "content-type"])
        .allow_credentials(true);
    if config.allows_any_origin() {
        builder.allow_any_origin()
    } else {
        let origins = config.allowed_origins();
        builder.allow_origins(origins.iter().map(|o| o.as_str()))
    }
}

fn with_state(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Arc<AppState>,), Error = Infallible> + Clone {
    warp::any().map(move || state.clone())
}

/// Resolves the bearer credential, if any. Never rejects for a bad token.
fn with_caller(
    state: Arc<AppState>,
) -> impl Filter<Extract = (Option<User>,), Error = Rejection> + Clone {
    warp::header::optional::<String>("authorization")
        .and(with_state(state))
        .and_then(|header: Option<String>, state: Arc<AppState>| async move {
            resolve_bearer(state.store.as_ref(), bearer_token(header.as_deref()))
                .await
                .map_err(warp::reject::custom)
        })
}

async fn login_handler(
    state: Arc<AppState>,
    request: LoginRequest,
) -> Result<impl Reply, Rejection> {
    let response = login(state.store.as_ref(), &request)
        .await
        .map_err(warp::reject::custom)?;
    Ok(warp::reply::json(&response))
}

async fn chat_handler(
    state: Arc<AppState>,
    request: ChatMessage,
) -> Result<impl Reply, Rejection> {
    let reply = state
        .assistant
        .chat(request)
        .await
        .map_err(warp::reject::custom)?;
    Ok(warp::reply::json(&reply))
}

async fn list_stocks_handler(state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    let stocks = list_stocks(state.store.as_ref())
        .await
        .map_err(warp::reject::custom)?;
    info!("Listed {} stocks.", stocks.len());
    Ok(warp::reply::json(&stocks))
}

async fn get_stock_handler(
    symbol: String,
    state: Arc<AppState>,
) -> Result<impl Reply, Rejection> {
    let stock = get_stock(state.store.as_ref(), &symbol)
        .await
        .map_err(warp::reject::custom)?;
    Ok(warp::reply::json(&stock))
}

async fn get_portfolio_handler(
    user_id: String,
    state: Arc<AppState>,
    caller: Option<User>,
) -> Result<impl Reply, Rejection> {
    let view = get_portfolio(state.store.as_ref(), &user_id, caller.as_ref())
        .await
        .map_err(warp::reject::custom)?;
    Ok(warp::reply::json(&view))
}

async fn place_trade_handler(
    state: Arc<AppState>,
    caller: Option<User>,
    body: Bytes,
) -> Result<impl Reply, Rejection> {
    let receipt = place_trade(state.store.as_ref(), &body, caller.as_ref())
        .await
        .map_err(warp::reject::custom)?;
    Ok(warp::reply::json(&receipt))
}

async fn admin_users_handler(
    state: Arc<AppState>,
    caller: Option<User>,
) -> Result<impl Reply, Rejection> {
    let listing = list_all_users(state.store.as_ref(), caller.as_ref())
        .await
        .map_err(warp::reject::custom)?;
    Ok(warp::reply::json(&listing))
}

async fn system_info_handler(state: Arc<AppState>) -> Result<impl Reply, Rejection> {
    let info = system_info(state.store.as_ref(), &state.config)
        .await
        .map_err(warp::reject::custom)?;
    Ok(warp::reply::json(&info))
}
