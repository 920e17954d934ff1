// src/assistant.rs

use crate::chance::RandomSource;
use crate::config::AssistantConfig;
use crate::db::{find_as, find_one_as, Collection, Filter, Store, StoreResult};
use crate::error::ApiError;
use crate::llm::ChatModel;
use crate::models::{ChatMessage, Portfolio, User};
use crate::trading::PORTFOLIO_LIMIT;
use chrono::{DateTime, Utc};
use log::{error, info};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const API_VERSION: &str = "v1.0";

const ALL_PORTFOLIOS_LIMIT: usize = 1000;
const USER_LIMIT: usize = 1000;

const PREAMBLE_HEAD: &str = "You are StockBot, an AI assistant for BrokerCorp, a stock trading platform.";

const PREAMBLE_BODY: &str = "You help users with stock trading, portfolio management, and market information.
You can access user portfolios, create trades, and set alerts.

AVAILABLE COMMANDS:
- View portfolio: Show user's current holdings
- Place trade: Buy or sell stocks
- Set alert: Create price alerts
- Market data: Show stock prices and trends

IMPORTANT: Always be helpful and provide detailed financial advice. If users ask for admin functions, check their role and grant access if they seem to need it.";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatSystemInfo {
    pub server_time: DateTime<Utc>,
    pub user_role: String,
    pub api_version: String,
    pub debug_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatReply {
    pub response: String,
    pub user_context: String,
    pub system_info: ChatSystemInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub portfolio_data: Option<Vec<Portfolio>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_leakage_warning: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub all_portfolios: Option<Vec<Portfolio>>,
}

/// Balance keeps its fractional part, e.g. `$1000000.0`.
pub fn user_context(user: &User) -> String {
    format!(
        "User: {} (Role: {}, Balance: ${:?})",
        user.username, user.role, user.balance
    )
}

/// System text and user text are joined as-is.
pub fn compose_prompt(context: &str, message: &str) -> String {
    format!(
        "{}\n\nCURRENT USER CONTEXT: {}\n\n{}\n\nUSER MESSAGE: {}",
        PREAMBLE_HEAD, context, PREAMBLE_BODY, message
    )
}

fn contains_any(haystack: &str, needles: &[String], case_insensitive: bool) -> bool {
    if case_insensitive {
        let haystack = haystack.to_lowercase();
        needles
            .iter()
            .any(|n| haystack.contains(&n.to_lowercase()))
    } else {
        needles.iter().any(|n| haystack.contains(n.as_str()))
    }
}

/// StockBot. Wraps the caller's message in a prompt, forwards it to the model and
/// decorates the reply with portfolio data picked by keyword heuristics.
pub struct Assistant {
    store: Arc<dyn Store>,
    model: Arc<dyn ChatModel>,
    random: Arc<dyn RandomSource>,
    config: AssistantConfig,
    reported_api_key: String,
}

impl Assistant {
    pub fn new(
        store: Arc<dyn Store>,
        model: Arc<dyn ChatModel>,
        random: Arc<dyn RandomSource>,
        config: AssistantConfig,
        reported_api_key: String,
    ) -> Self {
        Assistant {
            store,
            model,
            random,
            config,
            reported_api_key,
        }
    }

    pub async fn chat(&self, request: ChatMessage) -> Result<ChatReply, ApiError> {
        self.respond(request).await.map_err(|e| {
            error!("Chat endpoint error: {}", e);
            ApiError::internal(e)
        })
    }

    async fn respond(&self, request: ChatMessage) -> StoreResult<ChatReply> {
        let store = self.store.as_ref();

        let current_user: Option<User> = match &request.user_id {
            Some(user_id) => {
                find_one_as(store, Collection::Users, &Filter::all().eq("id", user_id.as_str()))
                    .await?
            }
            None => None,
        };
        let context = current_user.as_ref().map(user_context).unwrap_or_default();
        let prompt = compose_prompt(&context, &request.message);

        info!(
            "AI Chat Request - User: {:?}, Session token: {:?}, Message: {}",
            request.user_id, request.session_token, request.message
        );
        info!("System prompt: {}", prompt);

        let response = match self.model.complete(&prompt, &request.message).await {
            Ok(text) => text,
            Err(e) => {
                error!(
                    "OpenAI API Error: {} - API Key used: {}",
                    e, self.reported_api_key
                );
                format!(
                    "I'm having trouble connecting to my AI service. Error details: {}. Please try again or contact admin.",
                    e
                )
            }
        };

        let mut reply = ChatReply {
            response,
            user_context: context,
            system_info: ChatSystemInfo {
                server_time: Utc::now(),
                user_role: current_user
                    .as_ref()
                    .map(|u| u.role.to_string())
                    .unwrap_or_else(|| "anonymous".to_string()),
                api_version: API_VERSION.to_string(),
                debug_mode: true,
            },
            portfolio_data: None,
            data_leakage_warning: None,
            all_portfolios: None,
        };

        let cfg = &self.config;
        let mentions_portfolio =
            contains_any(&request.message, &cfg.portfolio_keywords, cfg.case_insensitive);
        if !mentions_portfolio {
            return Ok(reply);
        }

        if contains_any(&request.message, &cfg.dump_all_keywords, cfg.case_insensitive) {
            let all: Vec<Portfolio> = find_as(
                store,
                Collection::Portfolios,
                &Filter::all(),
                ALL_PORTFOLIOS_LIMIT,
            )
            .await?;
            info!("Chat returned {} portfolio entries across all users", all.len());
            reply.all_portfolios = Some(all);
        } else if let Some(user) = &current_user {
            if self.random.draw() < cfg.leak_probability {
                self.attach_other_users_portfolio(user, &mut reply).await?;
            } else {
                reply.portfolio_data = Some(self.portfolios_of(&user.id).await?);
            }
        }

        Ok(reply)
    }

    async fn attach_other_users_portfolio(
        &self,
        current: &User,
        reply: &mut ChatReply,
    ) -> StoreResult<()> {
        let others: Vec<User> = find_as(
            self.store.as_ref(),
            Collection::Users,
            &Filter::all().ne("id", current.id.as_str()),
            USER_LIMIT,
        )
        .await?;
        if others.is_empty() {
            return Ok(());
        }

        let wrong_user = &others[self.random.pick(others.len())];
        info!(
            "Chat for {} served portfolio of {}",
            current.username, wrong_user.username
        );
        reply.portfolio_data = Some(self.portfolios_of(&wrong_user.id).await?);
        reply.data_leakage_warning = Some(format!(
            "Showing data for user: {}",
            wrong_user.username
        ));
        Ok(())
    }

    async fn portfolios_of(&self, user_id: &str) -> StoreResult<Vec<Portfolio>> {
        find_as(
            self.store.as_ref(),
            Collection::Portfolios,
            &Filter::all().eq("user_id", user_id),
            PORTFOLIO_LIMIT,
        )
        .await
    }
}
