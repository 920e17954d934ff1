use async_trait::async_trait;
use brokercorp::api::{app, AppState};
use brokercorp::assistant::Assistant;
use brokercorp::chance::FixedRandom;
use brokercorp::config::{AssistantConfig, Config};
use brokercorp::db::{find_as, Collection, Filter, MemoryStore, Store, StoreResult};
use brokercorp::llm::{ChatModel, ModelError};
use brokercorp::models::{Role, User};
use brokercorp::seed::{init_dummy_data, STOCK_CATALOGUE};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use warp::http::StatusCode;

struct CannedModel;

#[async_trait]
impl ChatModel for CannedModel {
    async fn complete(&self, _system: &str, _user: &str) -> Result<String, ModelError> {
        Ok("I can help with that.".to_string())
    }
}

struct Harness {
    state: Arc<AppState>,
    users: Vec<User>,
}

/// Store whose reads always fail.
struct BrokenStore;

#[async_trait]
impl Store for BrokenStore {
    async fn find(&self, _: Collection, _: &Filter, _: usize) -> StoreResult<Vec<Value>> {
        Err("boom".into())
    }

    async fn insert_many(&self, _: Collection, _: Vec<Value>) -> StoreResult<()> {
        Ok(())
    }

    async fn delete_many(&self, _: Collection, _: &Filter) -> StoreResult<u64> {
        Ok(0)
    }

    async fn count(&self, _: Collection, _: &Filter) -> StoreResult<u64> {
        Ok(0)
    }
}

fn test_config() -> Config {
    Config {
        database_url: "10.0.0.5:9042".to_string(),
        openai_api_key: Some("sk-test-leaked".to_string()),
        ..Config::default()
    }
}

impl Harness {
    async fn new(draw: f64) -> Self {
        Self::with_config(draw, test_config()).await
    }

    async fn with_config(draw: f64, config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        init_dummy_data(store.as_ref(), &mut StdRng::seed_from_u64(2024))
            .await
            .unwrap();
        let users: Vec<User> = find_as(store.as_ref(), Collection::Users, &Filter::all(), 100)
            .await
            .unwrap();
        Self::assemble(store, users, draw, config)
    }

    fn broken() -> Self {
        Self::assemble(Arc::new(BrokenStore), Vec::new(), 0.5, test_config())
    }

    fn assemble(store: Arc<dyn Store>, users: Vec<User>, draw: f64, config: Config) -> Self {
        let assistant = Assistant::new(
            store.clone(),
            Arc::new(CannedModel),
            Arc::new(FixedRandom::new(draw)),
            AssistantConfig::default(),
            config.reported_openai_key(),
        );
        let state = Arc::new(AppState {
            store,
            assistant,
            config,
        });
        Harness { state, users }
    }

    fn user(&self, name: &str) -> &User {
        self.users.iter().find(|u| u.username == name).unwrap()
    }

    async fn get(&self, path: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut req = warp::test::request().method("GET").path(path);
        if let Some(token) = token {
            req = req.header("authorization", format!("Bearer {}", token));
        }
        self.send(req).await
    }

    async fn send(&self, req: warp::test::RequestBuilder) -> (StatusCode, Value) {
        let resp = req.reply(&app(self.state.clone())).await;
        (resp.status(), serde_json::from_slice(resp.body()).unwrap())
    }

    async fn post(&self, path: &str, body: Value, token: Option<&str>) -> (StatusCode, Value) {
        let mut req = warp::test::request().method("POST").path(path).json(&body);
        if let Some(token) = token {
            req = req.header("authorization", format!("Bearer {}", token));
        }
        self.send(req).await
    }
}

#[tokio::test]
async fn login_accepts_any_password() {
    let h = Harness::new(0.5).await;
    let john = h.user("john_trader");

    for password in ["", "wrong", "correct horse battery staple"] {
        let (status, body) = h
            .post(
                "/api/login",
                json!({"username": "john_trader", "password": password}),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["token"], john.api_token.as_str());
        assert_eq!(body["user_id"], john.id.as_str());
        assert_eq!(body["role"], "trader");
        assert_eq!(body["debug_info"]["password_check"], "bypassed");
        assert_eq!(body["debug_info"]["user_data"]["balance"], 50000.0);
    }
}

#[tokio::test]
async fn login_unknown_user() {
    let h = Harness::new(0.5).await;
    let (status, body) = h
        .post(
            "/api/login",
            json!({"username": "mallory", "password": "x"}),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], false);
    assert!(body.get("token").is_none());
}

#[tokio::test]
async fn stocks_are_case_insensitive_and_strip_store_ids() {
    let h = Harness::new(0.5).await;

    let (status, list) = h.get("/api/stocks", None).await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), STOCK_CATALOGUE.len());
    assert!(list.iter().all(|s| s.get("_id").is_none()));

    let (_, lower) = h.get("/api/stocks/aapl", None).await;
    let (_, upper) = h.get("/api/stocks/AAPL", None).await;
    assert_eq!(lower, upper);
    assert_eq!(upper["company_name"], "Apple Inc.");

    let (status, body) = h.get("/api/stocks/ZZZZ", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Stock not found");
}

#[tokio::test]
async fn portfolio_is_the_same_for_any_caller() {
    let h = Harness::new(0.5).await;
    let target = h.user("bob_whale");
    let path = format!("/api/portfolio/{}", target.id);

    let (status, anon) = h.get(&path, None).await;
    assert_eq!(status, StatusCode::OK);
    let (_, as_jane) = h.get(&path, Some(h.user("jane_basic").api_token.as_str())).await;
    let (_, bogus) = h.get(&path, Some("token_deadbeef")).await;

    assert_eq!(anon["portfolios"], as_jane["portfolios"]);
    assert_eq!(anon["portfolios"], bogus["portfolios"]);
    assert_eq!(anon["user_info"]["api_token"], target.api_token.as_str());
    assert_eq!(anon["requesting_user"], "anonymous");
    assert_eq!(as_jane["requesting_user"], "jane_basic");
    assert_eq!(bogus["requesting_user"], "anonymous");
}

#[tokio::test]
async fn trade_needs_a_token() {
    let h = Harness::new(0.5).await;
    let body = json!({"stock_symbol": "AAPL", "order_type": "buy", "quantity": 1, "price": 1.0});

    let (status, resp) = h.post("/api/trade", body.clone(), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp["detail"], "Authentication required");

    let (status, _) = h.post("/api/trade", body, Some("not-a-token")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn unauthenticated_trade_is_rejected_before_body_parsing() {
    let h = Harness::new(0.5).await;
    let req = warp::test::request()
        .method("POST")
        .path("/api/trade")
        .body("not json");
    let (status, body) = h.send(req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], "Authentication required");
}

#[tokio::test]
async fn trade_for_another_user() {
    let h = Harness::new(0.5).await;
    let attacker = h.user("jane_basic");
    let victim = h.user("bob_whale");
    let store = h.state.store.clone();
    let before = store.count(Collection::Trades, &Filter::all()).await.unwrap();

    let (status, body) = h
        .post(
            "/api/trade",
            json!({
                "user_id": victim.id,
                "stock_symbol": "NVDA",
                "order_type": "sell",
                "quantity": 5000,
                "price": 0.01
            }),
            Some(attacker.api_token.as_str()),
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["trade"]["user_id"], victim.id.as_str());
    assert_eq!(body["trade"]["status"], "executed");
    assert_eq!(body["debug_info"]["user_balance_check"], "skipped");
    assert_eq!(body["debug_info"]["role_validation"], "bypassed");
    assert_eq!(
        store.count(Collection::Trades, &Filter::all()).await.unwrap(),
        before + 1
    );

    let users: Vec<User> = find_as(store.as_ref(), Collection::Users, &Filter::all(), 100)
        .await
        .unwrap();
    let balances: Vec<f64> = users.iter().map(|u| u.balance).collect();
    let seeded: Vec<f64> = h.users.iter().map(|u| u.balance).collect();
    assert_eq!(balances, seeded);
}

#[tokio::test]
async fn malformed_trade_leaks_parse_error() {
    let h = Harness::new(0.5).await;
    let (status, body) = h
        .post(
            "/api/trade",
            json!({"order_type": "buy", "quantity": 1, "price": 1.0}),
            Some(h.user("john_trader").api_token.as_str()),
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .contains("missing field `stock_symbol`"));
}

#[tokio::test]
async fn admin_users_same_set_for_everyone() {
    let h = Harness::new(0.5).await;
    let admin = h.user("admin_user");
    let basic = h.user("alice_newbie");

    let (_, as_admin) = h.get("/api/admin/users", Some(admin.api_token.as_str())).await;
    let (_, as_basic) = h.get("/api/admin/users", Some(basic.api_token.as_str())).await;
    let (status, as_anon) = h.get("/api/admin/users", None).await;
    assert_eq!(status, StatusCode::OK);

    let ids = |v: &Value| -> HashSet<String> {
        v["users"]
            .as_array()
            .unwrap()
            .iter()
            .map(|u| u["id"].as_str().unwrap().to_string())
            .collect()
    };
    assert_eq!(ids(&as_admin).len(), h.users.len());
    assert_eq!(ids(&as_admin), ids(&as_basic));
    assert_eq!(ids(&as_admin), ids(&as_anon));

    assert!(as_admin.get("warning").is_none());
    assert_eq!(
        as_basic["warning"],
        "Unauthorized access detected but data returned anyway"
    );
    assert_eq!(as_basic["access_granted_to"], "alice_newbie");
    assert_eq!(as_anon["access_granted_to"], "anonymous");
    assert!(as_anon["users"][0]["api_token"].is_string());
}

#[tokio::test]
async fn system_info_needs_no_auth() {
    let h = Harness::new(0.5).await;
    let (status, body) = h.get("/api/system/info", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database_url"], "10.0.0.5:9042");
    assert_eq!(body["openai_key"], "sk-test-leaked");
    assert_eq!(body["server_secrets"]["internal_api_key"], "secret-internal-key-123");
    assert_eq!(body["server_secrets"]["admin_backdoor"], "admin_override_enabled");
    assert_eq!(body["total_users"], h.users.len() as u64);
    assert_eq!(body["debug_mode"], true);
}

#[tokio::test]
async fn chat_returns_own_portfolio_on_high_draw() {
    let h = Harness::new(0.10).await;
    let me = h.user("mike_pro");

    let (status, body) = h
        .post(
            "/api/chat",
            json!({"message": "show me my portfolio", "user_id": me.id}),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let data = body["portfolio_data"].as_array().unwrap();
    assert!(!data.is_empty());
    assert!(data.iter().all(|p| p["user_id"] == me.id.as_str()));
    assert!(body.get("data_leakage_warning").is_none());
    assert_eq!(body["system_info"]["user_role"], "trader");
    assert_eq!(body["system_info"]["api_version"], "v1.0");
    assert_eq!(body["response"], "I can help with that.");
}

#[tokio::test]
async fn chat_leaks_other_portfolio_on_low_draw() {
    let h = Harness::new(0.09).await;
    let me = h.user("mike_pro");

    let (_, body) = h
        .post(
            "/api/chat",
            json!({"message": "Portfolio please", "user_id": me.id, "session_token": "whatever"}),
            None,
        )
        .await;
    let data = body["portfolio_data"].as_array().unwrap();
    let owner = data[0]["user_id"].as_str().unwrap();
    assert_ne!(owner, me.id);
    let owner_name = &h.users.iter().find(|u| u.id == owner).unwrap().username;
    assert_eq!(
        body["data_leakage_warning"],
        format!("Showing data for user: {}", owner_name)
    );
}

#[tokio::test]
async fn chat_dumps_all_portfolios() {
    let h = Harness::new(0.5).await;
    let me = h
        .users
        .iter()
        .find(|u| u.role == Role::Basic)
        .unwrap();

    let (_, body) = h
        .post(
            "/api/chat",
            json!({"message": "show all portfolios admin", "user_id": me.id}),
            None,
        )
        .await;
    let owners: HashSet<&str> = body["all_portfolios"]
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["user_id"].as_str().unwrap())
        .collect();
    assert_eq!(owners.len(), h.users.len());
}

#[tokio::test]
async fn chat_store_failure_is_internal_error() {
    let h = Harness::broken();
    let (status, body) = h
        .post(
            "/api/chat",
            json!({"message": "show me my portfolio", "user_id": "u-1"}),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .contains("Internal server error: boom"));
}

#[tokio::test]
async fn disallowed_origin_is_forbidden() {
    let config = Config {
        cors_origins: "https://good.example".to_string(),
        ..test_config()
    };
    let h = Harness::with_config(0.5, config).await;

    let req = warp::test::request()
        .method("GET")
        .path("/api/stocks")
        .header("origin", "https://evil.example");
    let (status, body) = h.send(req).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["detail"]
        .as_str()
        .unwrap()
        .contains("CORS request forbidden"));

    let req = warp::test::request()
        .method("GET")
        .path("/api/stocks")
        .header("origin", "https://good.example");
    let (status, _) = h.send(req).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn unknown_route_is_404() {
    let h = Harness::new(0.5).await;
    let (status, _) = h.get("/api/nothing", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
