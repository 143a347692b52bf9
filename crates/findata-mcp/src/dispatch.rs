//! Tool dispatch.
//!
//! [`ToolDispatcher`] is the single entry point shared by the MCP handler and
//! the REST façade. A call goes through the tool lookup, then the rate limit,
//! then argument validation, then the store query. Each step short-circuits
//! into an envelope. Only internal failures (storage, pool, task) come back as
//! `Err`.

use std::sync::Arc;
use std::time::Instant;

use findata_core::config::{RateLimitConfig, Settings};
use findata_core::envelope::{ErrorCode, ToolResponse};
use findata_core::rate_limit::{denial_message, RateLimitPolicy, RateLimiter};
use findata_core::request::{Arguments, ToolRequest};
use findata_core::tools::{tool_names, ToolName};
use findata_core::{FindataError, FindataResult};
use findata_store::financials::{self, FinancialReportResult};
use findata_store::{analysts, companies, compare, sectors, stocks};
use findata_store::{Database, UserContext};
use serde::Serialize;
use serde_json::Value;
use tracing::{error, info, warn};

/// Outcome of one call, with the admission detail transports need.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub response: ToolResponse,
    /// Seconds until the next admission, set on rate-limit denials.
    pub retry_after_seconds: Option<u64>,
}

impl Dispatched {
    fn plain(response: ToolResponse) -> Self {
        Self {
            response,
            retry_after_seconds: None,
        }
    }
}

/// Routes tool calls to the store.
#[derive(Debug, Clone)]
pub struct ToolDispatcher {
    db: Database,
    limiter: Arc<RateLimiter>,
    rate_limits: RateLimitConfig,
    context: UserContext,
}

impl ToolDispatcher {
    /// Dispatcher configured from settings, with its own limiter.
    pub fn new(db: Database, settings: &Settings) -> Self {
        let rate_limits = settings.rate_limit();
        let limiter = Arc::new(RateLimiter::new(RateLimitPolicy::new(
            rate_limits.default,
            rate_limits.window_seconds,
        )));
        Self {
            db,
            limiter,
            rate_limits,
            context: UserContext::for_service(settings.enable_rls),
        }
    }

    /// Dispatcher over an explicit limiter and caller context.
    pub fn with_limiter(
        db: Database,
        limiter: Arc<RateLimiter>,
        rate_limits: RateLimitConfig,
        context: UserContext,
    ) -> Self {
        Self {
            db,
            limiter,
            rate_limits,
            context,
        }
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn context(&self) -> &UserContext {
        &self.context
    }

    /// Run a tool call under the dispatcher's context and return the envelope.
    pub async fn dispatch(&self, name: &str, args: Option<Arguments>) -> FindataResult<ToolResponse> {
        Ok(self.call(name, args).await?.response)
    }

    /// Run a tool call under the dispatcher's context.
    pub async fn call(&self, name: &str, args: Option<Arguments>) -> FindataResult<Dispatched> {
        let ctx = self.context.clone();
        self.call_as(name, args, ctx).await
    }

    /// Run a tool call on behalf of `ctx`.
    pub async fn call_as(
        &self,
        name: &str,
        args: Option<Arguments>,
        ctx: UserContext,
    ) -> FindataResult<Dispatched> {
        let started = Instant::now();

        let tool: ToolName = match name.parse() {
            Ok(tool) => tool,
            Err(message) => {
                return Ok(Dispatched::plain(ToolResponse::failure(
                    name,
                    ErrorCode::UnknownTool,
                    message,
                    Some(format!("Available tools: {}", tool_names().join(", "))),
                    started,
                )));
            }
        };

        if self.rate_limits.enabled {
            let policy = tool.rate_limit(&self.rate_limits);
            let decision = self.limiter.check_policy(tool.as_str(), policy);
            if !decision.allowed {
                let retry = decision.retry_after_seconds.unwrap_or(policy.window_seconds);
                warn!(
                    tool = tool.as_str(),
                    max_requests = policy.max_requests,
                    window_seconds = policy.window_seconds,
                    retry_after = retry,
                    "Rate limit exceeded"
                );
                return Ok(Dispatched {
                    response: ToolResponse::failure(
                        tool.as_str(),
                        ErrorCode::RateLimitExceeded,
                        denial_message(tool.as_str(), policy, retry),
                        Some(format!("Retry after {retry}s.")),
                        started,
                    ),
                    retry_after_seconds: Some(retry),
                });
            }
        }

        let args = args.unwrap_or_default();
        let request = match ToolRequest::parse(tool, &args) {
            Ok(request) => request,
            Err(err) => {
                return Ok(Dispatched::plain(ToolResponse::from_error(
                    tool.as_str(),
                    &err,
                    started,
                )));
            }
        };

        match self.execute(request, ctx).await {
            Ok((data, row_count)) => {
                let response = ToolResponse::success(tool.as_str(), data, started, row_count);
                info!(
                    tool = tool.as_str(),
                    row_count = ?row_count,
                    execution_ms = response.meta.execution_ms,
                    "Tool call completed"
                );
                Ok(Dispatched::plain(response))
            }
            Err(err) if err.error_code().is_some() => {
                info!(tool = tool.as_str(), error = %err, "Tool call rejected");
                Ok(Dispatched::plain(ToolResponse::from_error(
                    tool.as_str(),
                    &err,
                    started,
                )))
            }
            Err(err) => {
                error!(tool = tool.as_str(), error = %err, "Tool call failed");
                Err(err)
            }
        }
    }

    async fn execute(
        &self,
        request: ToolRequest,
        ctx: UserContext,
    ) -> FindataResult<(Value, Option<usize>)> {
        match request {
            ToolRequest::SearchCompanies(args) => {
                let results = self
                    .db
                    .run(move |conn| companies::search(conn, &ctx, &args))
                    .await?;
                let rows = results.results.len();
                to_data(&results, rows)
            }
            ToolRequest::GetCompanyProfile { ticker } => {
                let profile = self
                    .db
                    .run(move |conn| companies::get_profile(conn, &ctx, &ticker))
                    .await?;
                to_data(&profile, 1)
            }
            ToolRequest::GetFinancialReport(args) => {
                let result = self
                    .db
                    .run(move |conn| financials::get_financial_report(conn, &ctx, &args))
                    .await?;
                match result {
                    FinancialReportResult::Report(report) => to_data(&report, 1),
                    FinancialReportResult::Summary(summary) => {
                        let rows = summary.years_covered;
                        to_data(&summary, rows)
                    }
                }
            }
            ToolRequest::CompareCompanies(args) => {
                let comparison = self
                    .db
                    .run(move |conn| compare::compare(conn, &ctx, &args))
                    .await?;
                let rows = comparison.comparison.len();
                to_data(&comparison, rows)
            }
            ToolRequest::GetStockPriceHistory(args) => {
                let history = self
                    .db
                    .run(move |conn| stocks::price_history(conn, &ctx, &args))
                    .await?;
                let rows = history.prices.len();
                to_data(&history, rows)
            }
            ToolRequest::GetAnalystRatings(args) => {
                let consensus = self
                    .db
                    .run(move |conn| analysts::consensus(conn, &ctx, &args))
                    .await?;
                let rows = consensus.total_ratings;
                to_data(&consensus, rows)
            }
            ToolRequest::ScreenStocks(criteria) => {
                let results = self
                    .db
                    .run(move |conn| companies::screen(conn, &ctx, &criteria))
                    .await?;
                let rows = results.results.len();
                to_data(&results, rows)
            }
            ToolRequest::GetSectorOverview { sector } => {
                let overview = self
                    .db
                    .run(move |conn| sectors::overview(conn, &ctx, sector.as_deref()))
                    .await?;
                let rows = overview.row_count();
                match overview {
                    sectors::SectorOverview::All(list) => to_data(&list, rows),
                    sectors::SectorOverview::One(detail) => to_data(&detail, rows),
                }
            }
        }
    }
}

fn to_data<T: Serialize>(value: &T, rows: usize) -> FindataResult<(Value, Option<usize>)> {
    let data = serde_json::to_value(value).map_err(FindataError::from)?;
    Ok((data, Some(rows)))
}
