// Generation orchestration: context sampling, prompting, retries, persistence

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::core::gateway::ModelGateway;
use crate::core::prompts::{generation_prompt, PromptSynthesizer};
use crate::core::store::ExampleSink;
use crate::core::validate::CodeValidator;
use crate::error::SoftFailure;
use crate::models::{Config, GenerationConfig, GenerationContext, TargetMode, Taxonomy, WorkItem};

mod attempt;

use attempt::{AcceptanceChecks, Evaluation};

/// Drives each work item through prompting, generation and validation
pub struct Orchestrator<'a> {
    gateway: &'a dyn ModelGateway,
    sink: &'a mut dyn ExampleSink,
    taxonomy: &'a Taxonomy,
    validator: CodeValidator,
    generation: GenerationConfig,
    compiler: Option<String>,
    mode: TargetMode,
    rng: ChaCha8Rng,
}

/// How a work item ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemOutcome {
    Accepted,
    /// Attempt budget used up; nothing persisted
    Exhausted,
    /// Accepted but the store rejected the write
    NotSaved,
}

/// Result of processing one work item
#[derive(Debug, Clone, Serialize)]
pub struct ItemResult {
    pub id: String,
    pub category: String,
    pub subcategory: String,
    pub outcome: ItemOutcome,
    pub attempts: u32,
    /// Most recent rejection or failure reason, if any
    pub last_reason: Option<String>,
}

impl ItemResult {
    pub fn is_accepted(&self) -> bool {
        self.outcome == ItemOutcome::Accepted
    }
}

/// Summary of a run
#[derive(Debug, Default, Serialize)]
pub struct RunSummary {
    pub processed: usize,
    pub accepted: usize,
    pub failed: usize,
    pub results: Vec<ItemResult>,
}

impl<'a> Orchestrator<'a> {
    /// `seed` fixes context sampling and backoff jitter; `None` seeds from entropy
    pub fn new(
        config: &Config,
        taxonomy: &'a Taxonomy,
        gateway: &'a dyn ModelGateway,
        sink: &'a mut dyn ExampleSink,
        seed: Option<u64>,
    ) -> Self {
        let mode = config.target.mode;
        let compiler = config
            .validation
            .compile_check
            .then(|| config.validation.compiler.clone());

        Self {
            gateway,
            sink,
            taxonomy,
            validator: CodeValidator::new(&config.validation, mode),
            generation: config.generation.clone(),
            compiler,
            mode,
            rng: seed.map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64),
        }
    }

    /// Process every item in order; no single item can abort the batch
    pub async fn run(&mut self, items: &[WorkItem]) -> RunSummary {
        let mut summary = RunSummary::default();
        info!("Processing {} work items", items.len());

        for (i, item) in items.iter().enumerate() {
            info!(
                "[{}/{}] {} / {} (id {})",
                i + 1,
                items.len(),
                item.category,
                item.subcategory,
                item.id
            );
            let result = self.process(item).await;
            summary.processed += 1;
            if result.is_accepted() {
                summary.accepted += 1;
            } else {
                summary.failed += 1;
            }
            summary.results.push(result);
        }

        info!(
            "Run complete: {} accepted, {} failed",
            summary.accepted, summary.failed
        );
        summary
    }

    /// Sample a context, synthesize prompts, then retry until accepted or exhausted
    pub async fn process(&mut self, item: &WorkItem) -> ItemResult {
        let ctx = GenerationContext::sample(self.taxonomy, &mut self.rng);

        let synthesizer = PromptSynthesizer::new(
            self.gateway,
            self.mode,
            self.generation.base_prompt_temperature,
            self.generation.enrichment_temperature,
        );
        let (base, enriched) = synthesizer.synthesize(item, &ctx).await;
        let ctx = ctx.with_prompts(base, enriched);

        let max_attempts = self.generation.max_retries;
        let mut fail_reason: Option<String> = None;
        let mut last_reason: Option<String> = None;

        for attempt in 1..=max_attempts {
            let prompt = generation_prompt(&ctx.enriched_prompt, self.mode, fail_reason.as_deref());
            info!("Generating code (attempt {}/{})", attempt, max_attempts);

            let response = match self
                .gateway
                .invoke(&prompt, self.generation.code_temperature)
                .await
            {
                Ok(text) if !text.trim().is_empty() => text,
                other => {
                    let failure = other.err().unwrap_or(SoftFailure::EmptyResponse);
                    warn!(
                        "Empty response from API ({}), retrying ({}/{})",
                        failure, attempt, max_attempts
                    );
                    last_reason = Some(failure.to_string());
                    tokio::time::sleep(self.generation.base_delay()).await;
                    continue;
                }
            };

            let checks = AcceptanceChecks {
                validator: &self.validator,
                compiler: self.compiler.as_deref(),
            };

            let reason = match checks.evaluate(&response, &item.subcategory, &ctx.platform) {
                Evaluation::Accepted(extracted) => {
                    let mut record = extracted.record;
                    record.output = Some(extracted.code);
                    return match self.sink.append(item, &record, &ctx) {
                        Ok(_) => ItemResult {
                            id: item.id.clone(),
                            category: item.category.clone(),
                            subcategory: item.subcategory.clone(),
                            outcome: ItemOutcome::Accepted,
                            attempts: attempt,
                            last_reason: None,
                        },
                        Err(e) => {
                            error!("Failed to save example {}: {}", item.id, e);
                            ItemResult {
                                id: item.id.clone(),
                                category: item.category.clone(),
                                subcategory: item.subcategory.clone(),
                                outcome: ItemOutcome::NotSaved,
                                attempts: attempt,
                                last_reason: Some(e.to_string()),
                            }
                        }
                    };
                }
                Evaluation::Malformed(e) => {
                    if let Err(store_err) = self.sink.append_error(&item.id, &response) {
                        error!("Failed to record raw response for {}: {}", item.id, store_err);
                    }
                    e.retry_reason()
                }
                Evaluation::Rejected(reason) => reason,
            };

            warn!(
                "Generated code failed validation, retrying ({}/{})",
                attempt, max_attempts
            );
            last_reason = Some(reason.clone());
            fail_reason = Some(reason);

            if attempt < max_attempts {
                tokio::time::sleep(self.backoff()).await;
            }
        }

        error!(
            "Failed to generate valid example for {}/{} after {} attempts",
            item.category, item.subcategory, max_attempts
        );
        ItemResult {
            id: item.id.clone(),
            category: item.category.clone(),
            subcategory: item.subcategory.clone(),
            outcome: ItemOutcome::Exhausted,
            attempts: max_attempts,
            last_reason,
        }
    }

    /// `base_delay + uniform(0, jitter)`
    fn backoff(&mut self) -> Duration {
        let jitter = self.generation.jitter_seconds.max(0.0);
        let extra = if jitter > 0.0 {
            self.rng.gen_range(0.0..=jitter)
        } else {
            0.0
        };
        self.generation.base_delay() + Duration::from_secs_f64(extra)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StoreError;
    use crate::models::{SavedExample, StructuredRecord};
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct Silent;

    #[async_trait]
    impl ModelGateway for Silent {
        async fn invoke(&self, _prompt: &str, _temperature: f32) -> Result<String, SoftFailure> {
            Err(SoftFailure::Transport("offline".to_string()))
        }
    }

    #[derive(Default)]
    struct Counting {
        appended: usize,
        errors: usize,
    }

    impl ExampleSink for Counting {
        fn append(
            &mut self,
            _item: &WorkItem,
            _record: &StructuredRecord,
            _ctx: &GenerationContext,
        ) -> Result<SavedExample, StoreError> {
            self.appended += 1;
            Err(StoreError::SerializeError("not stored in tests".to_string()))
        }

        fn append_error(&mut self, _id: &str, _raw: &str) -> Result<(), StoreError> {
            self.errors += 1;
            Ok(())
        }
    }

    struct Echo(Mutex<Vec<f32>>);

    #[async_trait]
    impl ModelGateway for Echo {
        async fn invoke(&self, _prompt: &str, temperature: f32) -> Result<String, SoftFailure> {
            self.0.lock().unwrap().push(temperature);
            Ok("not json".to_string())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_gateway_exhausts() {
        let config = Config::default();
        let taxonomy = Taxonomy::builtin(TargetMode::Standard);
        let mut sink = Counting::default();
        let mut orchestrator = Orchestrator::new(&config, &taxonomy, &Silent, &mut sink, Some(1));

        let result = orchestrator.process(&WorkItem::new("actuators", "LED", 1)).await;
        assert_eq!(result.outcome, ItemOutcome::Exhausted);
        assert_eq!(result.attempts, 3);
        drop(orchestrator);
        assert_eq!(sink.appended, 0);
        assert_eq!(sink.errors, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_malformed_responses_logged_and_temperatures_used() {
        let config = Config::default();
        let taxonomy = Taxonomy::builtin(TargetMode::Standard);
        let gateway = Echo(Mutex::new(Vec::new()));
        let mut sink = Counting::default();
        let mut orchestrator = Orchestrator::new(&config, &taxonomy, &gateway, &mut sink, Some(2));

        let result = orchestrator.process(&WorkItem::new("actuators", "LED", 1)).await;
        assert_eq!(result.outcome, ItemOutcome::Exhausted);
        assert!(result.last_reason.unwrap().contains("valid JSON object"));
        drop(orchestrator);
        assert_eq!(sink.errors, 3);

        let temps = gateway.0.lock().unwrap().clone();
        assert_eq!(temps, vec![0.8, 0.7, 0.75, 0.75, 0.75]);
    }

    #[test]
    fn test_backoff_bounds() {
        let mut config = Config::default();
        config.generation.base_delay_seconds = 1.0;
        config.generation.jitter_seconds = 0.5;
        let taxonomy = Taxonomy::builtin(TargetMode::Standard);
        let mut sink = Counting::default();
        let mut orchestrator = Orchestrator::new(&config, &taxonomy, &Silent, &mut sink, Some(5));
        for _ in 0..50 {
            let d = orchestrator.backoff();
            assert!(d >= Duration::from_secs(1) && d <= Duration::from_millis(1500));
        }

        orchestrator.generation.jitter_seconds = 0.0;
        assert_eq!(orchestrator.backoff(), Duration::from_secs(1));
    }
}
