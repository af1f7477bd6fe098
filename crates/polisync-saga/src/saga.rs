//! Ordered commit/compensate execution across stores.
//!
//! A saga is a list of steps committed front to back. When a step reports a
//! business-key conflict, every step committed before it is compensated in
//! reverse order. Store failures are not compensated; they abort the saga and
//! propagate to the caller.

use async_trait::async_trait;

use polisync_core::{Entity, EntityStore, InsertOutcome, StoreError, WriteAck};

/// Result of committing a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepResult {
    Committed(WriteAck),
    Conflict,
}

/// One reversible unit of work in a saga.
#[async_trait]
pub trait SagaStep: Send + Sync {
    /// Short label for logs, e.g. `insert client CLI-1 into graph`.
    fn describe(&self) -> String;

    async fn commit(&self) -> Result<StepResult, StoreError>;

    /// Undo a successful commit. Returns the number of records removed.
    async fn compensate(&self) -> Result<u64, StoreError>;
}

/// Insert an entity into one store; compensation deletes it by key.
pub struct InsertStep<'a> {
    store: &'a dyn EntityStore,
    entity: &'a Entity,
}

impl<'a> InsertStep<'a> {
    pub fn new(store: &'a dyn EntityStore, entity: &'a Entity) -> Self {
        Self { store, entity }
    }
}

#[async_trait]
impl SagaStep for InsertStep<'_> {
    fn describe(&self) -> String {
        format!(
            "insert {} {} into {}",
            self.entity.kind(),
            self.entity.key(),
            self.store.kind()
        )
    }

    async fn commit(&self) -> Result<StepResult, StoreError> {
        Ok(match self.store.insert(self.entity).await? {
            InsertOutcome::Inserted(ack) => StepResult::Committed(ack),
            InsertOutcome::Conflict => StepResult::Conflict,
        })
    }

    async fn compensate(&self) -> Result<u64, StoreError> {
        self.store
            .delete(self.entity.kind(), self.entity.key())
            .await
    }
}

/// A point in a saga's execution, recorded in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Committed(usize),
    Conflict(usize),
    Compensating(usize),
    Compensated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SagaOutcome {
    /// Every step committed; acks are in step order.
    Completed(Vec<WriteAck>),
    /// Step `failed_step` conflicted and all earlier steps were undone.
    Compensated { failed_step: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SagaReport {
    pub outcome: SagaOutcome,
    pub trace: Vec<Phase>,
}

/// Run `steps` in order, unwinding committed steps on the first conflict.
pub async fn run_saga(name: &str, steps: &[&dyn SagaStep]) -> Result<SagaReport, StoreError> {
    let mut trace = Vec::with_capacity(steps.len() * 2);
    let mut acks = Vec::with_capacity(steps.len());

    for (index, step) in steps.iter().enumerate() {
        match step.commit().await? {
            StepResult::Committed(ack) => {
                tracing::debug!(
                    saga = name,
                    step = index,
                    action = %step.describe(),
                    "Step committed"
                );
                trace.push(Phase::Committed(index));
                acks.push(ack);
            }
            StepResult::Conflict => {
                tracing::info!(
                    saga = name,
                    step = index,
                    action = %step.describe(),
                    "Step conflicted, unwinding"
                );
                trace.push(Phase::Conflict(index));
                unwind(name, &steps[..index], &mut trace).await?;
                trace.push(Phase::Compensated);
                return Ok(SagaReport {
                    outcome: SagaOutcome::Compensated { failed_step: index },
                    trace,
                });
            }
        }
    }

    Ok(SagaReport {
        outcome: SagaOutcome::Completed(acks),
        trace,
    })
}

async fn unwind(
    name: &str,
    committed: &[&dyn SagaStep],
    trace: &mut Vec<Phase>,
) -> Result<(), StoreError> {
    for (index, step) in committed.iter().enumerate().rev() {
        trace.push(Phase::Compensating(index));
        match step.compensate().await {
            Ok(0) => {
                tracing::warn!(
                    saga = name,
                    step = index,
                    action = %step.describe(),
                    "Compensation removed nothing; stores already diverged"
                );
            }
            Ok(removed) => {
                tracing::info!(saga = name, step = index, removed, "Step compensated");
            }
            Err(e) => {
                tracing::error!(
                    saga = name,
                    step = index,
                    action = %step.describe(),
                    error = %e,
                    "Compensation failed"
                );
                return Err(e);
            }
        }
    }
    Ok(())
}
