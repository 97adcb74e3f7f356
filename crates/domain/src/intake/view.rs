use std::sync::Arc;
use async_trait::async_trait;
use cqrs_es::{
    persist::{PersistenceError, ViewContext, ViewRepository},
    Aggregate, EventEnvelope, View as CqrsView,
};
use serde::{Deserialize, Serialize};
use super::{Intake, AGGREGATE_TYPE};

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
pub struct View {
    pub aggregate_type: String,
    pub command_id: String,
    pub id: String,
    pub intake: Intake,
}

impl CqrsView<Intake> for View {
    fn update(&mut self, event: &EventEnvelope<Intake>) {
        self.id.clone_from(&event.aggregate_id);
        self.aggregate_type = AGGREGATE_TYPE.to_string();
        self.command_id = event
            .metadata
            .get("command_id")
            .cloned()
            .unwrap_or_default();
        self.intake.apply(event.payload.clone());
    }
}

pub struct Query {
    repo: Arc<Box<dyn ViewRepository<View, Intake>>>,
}

impl Query {
    pub fn new(repo: Arc<Box<dyn ViewRepository<View, Intake>>>) -> Self {
        Self { repo }
    }

    async fn update(
        &self,
        intake_id: &str,
        events: &[EventEnvelope<Intake>],
    ) -> Result<(), PersistenceError> {
        let (mut view, view_context) = match self.repo.load_with_context(intake_id).await? {
            None => {
                let view_context = ViewContext::new(intake_id.to_string(), 0);
                (Default::default(), view_context)
            }
            Some((view, context)) => (view, context),
        };

        for event in events {
            view.update(event);
        }

        self.repo.update_view(view, view_context).await
    }
}

#[async_trait]
impl cqrs_es::Query<Intake> for Query {
    async fn dispatch(&self, intake_id: &str, events: &[EventEnvelope<Intake>]) {
        if let Err(err) = self.update(intake_id, events).await {
            tracing::error!("IntakeQuery error for {}: {}", intake_id, err);
        }
    }
}
