use async_trait::async_trait;
use bson::{Bson, Document, doc};
use chrono::{TimeZone, Utc};
use std::sync::{
    Arc,
    atomic::{AtomicUsize, Ordering},
};

use docmodel_core::{
    backend::{StoreBackend, StoreConnector, UpdateOutcome},
    connection::{Connection, ConnectionConfig, ConnectionEvents, ConnectionRegistry, NoEvents},
    error::{DocumentStoreError, DocumentStoreResult},
    listing::{DateFilter, ListQuery, ListSort, Search, SortMode, SortOrder},
    model::{Model, ModelExtension},
    query::Filter,
    schema::{FieldDef, FieldType, Schema},
};
use docmodel_memory::{InMemoryConnector, InMemoryStore};

#[derive(Debug, Clone, Default)]
struct CountingConnector {
    opens: Arc<AtomicUsize>,
}

#[async_trait]
impl StoreConnector for CountingConnector {
    async fn connect(&self, config: &ConnectionConfig) -> DocumentStoreResult<Arc<dyn StoreBackend>> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        InMemoryConnector::new().connect(config).await
    }
}

#[derive(Clone, Default)]
struct OpenCounter(Arc<AtomicUsize>);

impl ConnectionEvents for OpenCounter {
    fn on_connection(&self, _connection: &Connection) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

async fn registry() -> Arc<ConnectionRegistry> {
    let registry = Arc::new(ConnectionRegistry::new(InMemoryConnector::new()));
    registry
        .create_connection(ConnectionConfig::new("memory://"), NoEvents)
        .await;
    registry
}

async fn users() -> Model {
    Model::builder(registry().await, "users")
        .build()
        .await
        .unwrap()
}

fn names(documents: &[Document]) -> Vec<&str> {
    documents
        .iter()
        .map(|d| d.get_str("name").unwrap())
        .collect()
}

#[tokio::test]
async fn concurrent_creates_share_one_open() {
    let connector = CountingConnector::default();
    let opens = connector.opens.clone();
    let connected = OpenCounter::default();
    let registry = ConnectionRegistry::new(connector);

    let (first, second) = tokio::join!(
        registry.create_connection(ConnectionConfig::new("memory://").with_db_name("app"), connected.clone()),
        registry.create_connection(ConnectionConfig::new("memory://").with_db_name("app"), connected.clone()),
    );
    let third = registry
        .create_connection(ConnectionConfig::new("memory://").with_db_name("app"), connected.clone())
        .await;

    first.ready().await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert!(Arc::ptr_eq(&first, &third));
    assert_eq!(opens.load(Ordering::SeqCst), 1);
    assert_eq!(connected.0.load(Ordering::SeqCst), 1);
    assert_eq!(registry.connection_names().await, vec!["app".to_string()]);
}

#[tokio::test]
async fn create_then_find_by_id() {
    let users = users().await;

    let created = users
        .create(doc! { "name": "Jo", "age": 30 })
        .await
        .unwrap();
    let id = created.get_str("id").unwrap();
    let found = users.find_by_id(id).await.unwrap().unwrap();

    assert_eq!(found, created);
    assert_eq!(found.keys().collect::<Vec<_>>(), vec!["name", "age", "id", "createdDate"]);
    assert_eq!(found.get_str("name").unwrap(), "Jo");
    assert_eq!(found.get_i32("age").unwrap(), 30);
    assert!(found.get_datetime("createdDate").is_ok());
    assert!(users.is_id_exist(id).await.unwrap());
    assert!(!users.is_id_exist("nope").await.unwrap());
    assert_eq!(users.find_by_field("age", 30).await.unwrap(), Some(found));
}

#[tokio::test]
async fn update_drops_id_and_undefined_fields() {
    let users = users().await;
    let created = users
        .create(doc! { "name": "Jo", "city": "Izmir" })
        .await
        .unwrap();
    let id = created.get_str("id").unwrap();

    let outcome = users
        .update_by_id(id, doc! { "id": "hijacked", "name": Bson::Undefined, "city": "Ankara" })
        .await
        .unwrap();
    let updated = users.find_by_id(id).await.unwrap().unwrap();

    assert_eq!(outcome, UpdateOutcome { matched: 1, modified: 1 });
    assert_eq!(updated.get_str("id").unwrap(), id);
    assert_eq!(updated.get_str("name").unwrap(), "Jo");
    assert_eq!(updated.get_str("city").unwrap(), "Ankara");
    assert!(updated.get_datetime("updatedDate").is_ok());
    assert!(users.find_by_id("hijacked").await.unwrap().is_none());
}

#[tokio::test]
async fn search_values_match_literally() {
    let users = users().await;
    for name in ["xa.b*cx", "aXb*c", "abbbc"] {
        users.create(doc! { "name": name }).await.unwrap();
    }

    let found = users
        .find_listable(&ListQuery::new().search(Search::new("name", "a.b*c")))
        .await
        .unwrap();

    assert_eq!(names(&found), vec!["xa.b*cx"]);
}

#[tokio::test]
async fn search_is_a_case_sensitive_substring_match() {
    let users = users().await;
    for name in ["John", "jo", "Mojo", "Bob"] {
        users.create(doc! { "name": name }).await.unwrap();
    }

    let found = users
        .find_listable(&ListQuery::new().search(Search::new("name", "jo")))
        .await
        .unwrap();

    assert_eq!(names(&found), vec!["jo", "Mojo"]);
}

#[tokio::test]
async fn search_spans_several_fields() {
    let users = users().await;
    users.create(doc! { "name": "Ada", "email": "first@x" }).await.unwrap();
    users.create(doc! { "name": "Bob", "email": "bob@ada.org" }).await.unwrap();
    users.create(doc! { "name": "Canada", "email": "cy@x" }).await.unwrap();

    let found = users
        .find_listable(&ListQuery::new().search(Search::new(vec!["name", "email"], "ada")))
        .await
        .unwrap();

    assert_eq!(names(&found), vec!["Bob", "Canada"]);
}

#[tokio::test]
async fn search_matches_turkish_letter_variants() {
    let users = users().await;
    for name in ["Işık", "Isik", "Ilık"] {
        users.create(doc! { "name": name }).await.unwrap();
    }

    let found = users
        .find_listable(&ListQuery::new().search(Search::new("name", "Işik")))
        .await
        .unwrap();

    assert_eq!(names(&found), vec!["Işık", "Isik"]);
}

#[tokio::test]
async fn pagination_returns_the_requested_window() {
    let users = users().await;
    for n in 1..=5 {
        users.create(doc! { "name": format!("u{n}"), "n": n }).await.unwrap();
    }

    let page = users
        .find_listable(&ListQuery::new().take(2).skip(1))
        .await
        .unwrap();

    assert_eq!(names(&page), vec!["u2", "u3"]);
    assert_eq!(users.find_listable(&ListQuery::new()).await.unwrap().len(), 5);
}

#[tokio::test]
async fn sort_follows_the_model_sort_mode() {
    let registry = registry().await;
    let natural = Model::builder(registry.clone(), "scores").build().await.unwrap();
    let legacy = Model::builder(registry, "scores")
        .sort_mode(SortMode::Legacy)
        .build()
        .await
        .unwrap();
    for (name, n) in [("b", 2), ("c", 3), ("a", 1)] {
        natural.create(doc! { "name": name, "n": n }).await.unwrap();
    }

    let descending = ListQuery::new().sort(ListSort::new("n", SortOrder::Desc));

    assert_eq!(names(&natural.find_listable(&descending).await.unwrap()), vec!["c", "b", "a"]);
    assert_eq!(names(&legacy.find_listable(&descending).await.unwrap()), vec!["a", "b", "c"]);
}

#[tokio::test]
async fn date_filter_bounds_are_inclusive() {
    let events = Model::builder(registry().await, "events").build().await.unwrap();
    for day in 1..=4 {
        let at = Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap();
        events
            .create(doc! { "name": format!("d{day}"), "at": bson::DateTime::from_chrono(at) })
            .await
            .unwrap();
    }

    let start = Utc.with_ymd_and_hms(2024, 3, 2, 12, 0, 0).unwrap();
    let end = Utc.with_ymd_and_hms(2024, 3, 3, 12, 0, 0).unwrap();
    let between = events
        .find_listable(&ListQuery::new().date_filter(DateFilter::new("at", Some(start), Some(end))))
        .await
        .unwrap();
    let from = events
        .find_listable(&ListQuery::new().date_filter(DateFilter::new("at", Some(end), None)))
        .await
        .unwrap();

    assert_eq!(names(&between), vec!["d2", "d3"]);
    assert_eq!(names(&from), vec!["d3", "d4"]);
}

#[tokio::test]
async fn empty_queries_never_delete_or_update() {
    let users = users().await;
    users.create(doc! { "name": "a" }).await.unwrap();
    users.create(doc! { "name": "b" }).await.unwrap();

    assert_eq!(users.delete_by_query(None).await.unwrap(), 0);
    assert_eq!(users.delete_by_query(Some(Filter::all())).await.unwrap(), 0);
    assert_eq!(
        users.update_by_query(None, doc! { "name": "z" }).await.unwrap(),
        UpdateOutcome::default()
    );
    assert_eq!(
        users.update_by_query(Some(Filter::all()), doc! { "name": "z" }).await.unwrap(),
        UpdateOutcome::default()
    );
    assert_eq!(names(&users.list(None).await.unwrap()), vec!["a", "b"]);
}

#[tokio::test]
async fn queries_update_and_delete_matching_documents() {
    let users = users().await;
    for (name, role) in [("a", "admin"), ("b", "user"), ("c", "user")] {
        users.create(doc! { "name": name, "role": role }).await.unwrap();
    }

    let outcome = users
        .update_by_query(Some(Filter::eq("role", "user")), doc! { "active": false })
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome { matched: 2, modified: 2 });
    assert!(users.is_query_exist(Filter::eq("active", false)).await.unwrap());

    assert_eq!(users.delete_by_query(Some(Filter::eq("role", "user"))).await.unwrap(), 2);
    assert_eq!(names(&users.list(None).await.unwrap()), vec!["a"]);

    let a = users.find_by_field("name", "a").await.unwrap().unwrap();
    assert_eq!(users.delete_by_id(a.get_str("id").unwrap()).await.unwrap(), 1);
    assert_eq!(users.delete_by_id("missing").await.unwrap(), 0);
    assert!(users.list(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn removed_connections_report_not_connected() {
    let registry = registry().await;
    let users = Model::builder(registry.clone(), "users").build().await.unwrap();
    users.create(doc! { "name": "a" }).await.unwrap();

    assert!(registry.delete_connection("default").await);
    assert!(!registry.delete_connection("default").await);

    assert_eq!(
        users.list(None).await.unwrap_err(),
        DocumentStoreError::NotConnected("default".to_string())
    );
    assert_eq!(
        users.delete_by_query(None).await.unwrap_err(),
        DocumentStoreError::NotConnected("default".to_string())
    );
}

#[tokio::test]
async fn teardown_empties_the_registry() {
    let registry = registry().await;
    registry
        .create_connection(ConnectionConfig::new("memory://").with_db_name("audit"), NoEvents)
        .await;
    let users = Model::builder(registry.clone(), "users").build().await.unwrap();
    users.create(doc! { "name": "a" }).await.unwrap();

    registry.teardown().await.unwrap();

    assert!(registry.connection_names().await.is_empty());
    assert!(users.connection().await.is_err());
}

#[tokio::test]
async fn raw_driver_is_reachable_through_the_connection() {
    let users = users().await;
    users.create(doc! { "name": "a" }).await.unwrap();

    let connection = users.connection().await.unwrap();
    let store = connection.backend_as::<InMemoryStore>().unwrap();

    assert_eq!(connection.name(), "default");
    assert_eq!(store.count("users").await, 1);
}

#[tokio::test]
async fn unique_schema_fields_are_enforced_after_sync() {
    let users = Model::builder(registry().await, "users")
        .schema(
            Schema::new()
                .field("email", FieldDef::new(FieldType::String).unique())
                .field("name", FieldType::String),
        )
        .build()
        .await
        .unwrap();

    users.sync_indexes().await.unwrap();
    users.create(doc! { "email": "a@x" }).await.unwrap();

    assert!(matches!(
        users.create(doc! { "email": "a@x" }).await,
        Err(DocumentStoreError::Store(_))
    ));
}

struct CountByRole;

#[async_trait]
impl ModelExtension for CountByRole {
    async fn call(&self, model: &Model, args: Bson) -> DocumentStoreResult<Bson> {
        let found = model.list(Some(Filter::eq("role", args))).await?;
        Ok(Bson::Int64(found.len() as i64))
    }
}

#[tokio::test]
async fn extensions_receive_the_model() {
    let users = Model::builder(registry().await, "users")
        .extension("countByRole", CountByRole)
        .build()
        .await
        .unwrap();
    for role in ["admin", "user", "user"] {
        users.create(doc! { "role": role }).await.unwrap();
    }

    assert!(users.has_extension("countByRole"));
    assert_eq!(
        users.call_extension("countByRole", Bson::from("user")).await.unwrap(),
        Bson::Int64(2)
    );
}
