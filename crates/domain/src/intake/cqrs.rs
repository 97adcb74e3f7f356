use std::{env, sync::Arc};
use cqrs_es::{
    mem_store::MemStore,
    persist::{PersistedEventStore, ViewRepository},
    CqrsFramework,
};
use dynamo_es::{DynamoEventRepository, DynamoViewRepository};
use super::{view_cache::{MemViewRepository, ViewCache}, Intake, Query, Services, View};

pub type DynamoIntakeStore = PersistedEventStore<DynamoEventRepository, Intake>;

pub fn init(
    client: aws_sdk_dynamodb::Client,
    repo: Arc<Box<dyn ViewRepository<View, Intake>>>,
) -> Arc<CqrsFramework<Intake, DynamoIntakeStore>> {
    let event_log_table = env::var("DYNAMODB_EVENT_LOG_TABLE")
        .unwrap_or("pillpal-event-log".to_string());

    let event_snapshots_table = env::var("DYNAMODB_EVENT_SNAPSHOTS_TABLE")
        .unwrap_or("pillpal-event-snapshots".to_string());

    let store: DynamoIntakeStore = PersistedEventStore::new_snapshot_store(
        DynamoEventRepository::new(client).with_tables(&event_log_table, &event_snapshots_table),
        5,
    );

    let query = Box::new(Query::new(repo));

    Arc::new(CqrsFramework::new(store, vec![query], Services::default()))
}

pub fn init_repo(client: aws_sdk_dynamodb::Client) -> Arc<Box<dyn ViewRepository<View, Intake>>> {
    let view_table = env::var("DYNAMODB_INTAKES_VIEW_TABLE")
        .unwrap_or("pillpal-intakes-view".to_string());

    let dynamo = DynamoViewRepository::<View, Intake>::new(&view_table, client);
    Arc::new(Box::new(ViewCache::new(Box::new(dynamo))))
}

/// Event store and views held in process memory
pub fn init_in_memory(
    repo: Arc<Box<dyn ViewRepository<View, Intake>>>,
) -> Arc<CqrsFramework<Intake, MemStore<Intake>>> {
    let query = Box::new(Query::new(repo));

    Arc::new(CqrsFramework::new(
        MemStore::<Intake>::default(),
        vec![query],
        Services::default(),
    ))
}

pub fn init_mem_repo() -> Arc<Box<dyn ViewRepository<View, Intake>>> {
    Arc::new(Box::new(MemViewRepository::new()))
}
