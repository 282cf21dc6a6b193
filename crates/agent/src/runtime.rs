use std::sync::Arc;

use anyhow::Result;
use serde_json::Value;
use tracing::{info, info_span, Instrument};
use uuid::Uuid;

use scudo_core::briefing::{BriefingEngine, BriefingOutcome, ContextAction};
use scudo_core::config::{AppConfig, DataSourceConfig};
use scudo_core::errors::ApplicationError;

use crate::actions::{ActionDispatcher, ActionError, DispatchOutcome, EmailSender, PromotionStore};
use crate::guardrails::{ActionPolicy, DEFAULT_MAX_DISCOUNT_PERCENT};
use crate::sources::{CustomerDataSource, SourceFilter};
use crate::tools::{
    AnalyzeCustomerSegmentsTool, AnalyzeDailyBriefingTool, CalculateRfmScoresTool,
    CreatePromotionTool, GetDataTool, GetSegmentInsightsTool, SendEmailTool, ToolRegistry,
};

/// Injected side-effecting collaborators.
#[derive(Clone)]
pub struct Collaborators {
    pub source: Arc<dyn CustomerDataSource>,
    pub email: Arc<dyn EmailSender>,
    pub promotions: Arc<dyn PromotionStore>,
}

pub struct AgentRuntime {
    engine: BriefingEngine,
    source: Arc<dyn CustomerDataSource>,
    tables: DataSourceConfig,
    dispatcher: ActionDispatcher,
    tools: ToolRegistry,
}

impl AgentRuntime {
    pub fn new(config: &AppConfig, collaborators: Collaborators) -> Result<Self, ApplicationError> {
        config.validate().map_err(|error| ApplicationError::Configuration(error.to_string()))?;
        let policy = ActionPolicy::new(config.email.enabled, DEFAULT_MAX_DISCOUNT_PERCENT)?;
        let engine = BriefingEngine::new(config.briefing);
        let from_address = config.email.from_address.clone();
        let tables = config.data_sources.clone();
        let source = collaborators.source;

        let mut tools = ToolRegistry::default();
        tools.register(AnalyzeDailyBriefingTool::new(engine.clone(), source.clone(), tables.clone()));
        tools.register(GetDataTool::new(source.clone(), tables.clone()));
        tools.register(SendEmailTool::new(
            collaborators.email.clone(),
            policy.clone(),
            from_address.clone(),
        ));
        tools.register(CreatePromotionTool::new(collaborators.promotions.clone(), policy.clone()));
        tools.register(AnalyzeCustomerSegmentsTool::new(source.clone(), tables.clone()));
        tools.register(CalculateRfmScoresTool::new(source.clone(), tables.clone()));
        tools.register(GetSegmentInsightsTool::new(source.clone(), tables.clone()));

        let dispatcher = ActionDispatcher::new(
            source.clone(),
            collaborators.email,
            collaborators.promotions,
            policy,
        )
        .with_from_address(from_address)
        .with_tables(tables.clone());

        Ok(Self { engine, source, tables, dispatcher, tools })
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Scans the customer table and produces today's briefing.
    pub async fn daily_briefing(&self) -> Result<BriefingOutcome> {
        let correlation_id = Uuid::new_v4();
        let span = info_span!("daily_briefing", %correlation_id);

        async {
            let payload = self.source.fetch(&self.tables.customers_table, &SourceFilter::All).await?;
            let outcome = self.engine.analyze(payload);
            info!(
                event_name = "runtime.briefing.completed",
                success = outcome.is_success(),
                "daily briefing produced"
            );
            Ok::<_, anyhow::Error>(outcome)
        }
        .instrument(span)
        .await
    }

    pub async fn run_tool(&self, name: &str, input: Value) -> Result<Value> {
        let correlation_id = Uuid::new_v4();
        self.tools
            .execute(name, input)
            .instrument(info_span!("tool", tool = name, %correlation_id))
            .await
    }

    pub async fn dispatch(&self, action: &ContextAction) -> Result<DispatchOutcome, ActionError> {
        let correlation_id = Uuid::new_v4();
        self.dispatcher
            .dispatch(action)
            .instrument(info_span!("dispatch", action = action.action.as_str(), %correlation_id))
            .await
    }
}
