use async_trait::async_trait;

use crate::domain::error::GatewayError;

/// One forward step plus its compensation (spec §4.7). Steps that the
/// spec marks as non-compensable (§4.1 steps 3-5: tokenization, fraud,
/// 3DS) simply keep the default no-op `compensate`.
#[async_trait]
pub trait SagaStep<Ctx: Send>: Send + Sync {
    fn name(&self) -> &'static str;
    async fn forward(&self, ctx: &mut Ctx) -> Result<(), GatewayError>;
    async fn compensate(&self, _ctx: &mut Ctx) -> Result<(), GatewayError> {
        Ok(())
    }
}

/// Full accounting of a saga run (spec §4.7 exact result shape).
#[derive(Debug, Default)]
pub struct SagaOutcome {
    pub executed: Vec<&'static str>,
    pub compensated: Vec<&'static str>,
    pub failed_compensations: Vec<&'static str>,
    pub failed_step: Option<&'static str>,
}

#[derive(Debug)]
pub enum SagaResult {
    Success(SagaOutcome),
    Failed(SagaOutcome),
}

/// Runs `steps` in order. On the first failure, compensates every
/// already-executed step in LIFO order (spec §4.7, grounded in the
/// `cdk` swap-saga's `VecDeque` LIFO compensation list, reworked here
/// from a typestate builder into the spec's plain step-list contract
/// since nothing here needs compile-time state enforcement). A failed
/// compensation is recorded but does not stop the rest from running —
/// partial rollback is still better than none.
pub async fn run_saga<Ctx: Send>(steps: &[Box<dyn SagaStep<Ctx>>], ctx: &mut Ctx) -> SagaResult {
    let mut executed = Vec::new();

    for step in steps {
        match step.forward(ctx).await {
            Ok(()) => executed.push(step.name()),
            Err(_) => {
                let mut compensated = Vec::new();
                let mut failed_compensations = Vec::new();

                for name in executed.iter().rev() {
                    let failed_step = steps.iter().find(|s| s.name() == *name).expect("name came from steps");
                    match failed_step.compensate(ctx).await {
                        Ok(()) => compensated.push(*name),
                        Err(e) => {
                            tracing::error!(step = *name, error = %e, "saga compensation failed");
                            failed_compensations.push(*name);
                        }
                    }
                }

                return SagaResult::Failed(SagaOutcome {
                    executed,
                    compensated,
                    failed_compensations,
                    failed_step: Some(step.name()),
                });
            }
        }
    }

    SagaResult::Success(SagaOutcome { executed, ..Default::default() })
}
