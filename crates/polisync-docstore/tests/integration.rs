//! Integration tests for polisync-docstore against a live MongoDB instance.
//!
//! Requires MongoDB at mongodb://localhost:27017.
//! Run with: cargo test --package polisync-docstore --test integration -- --ignored
//!
//! Each test uses its own throwaway database and skips if MongoDB is not available.

use polisync_core::{
    Claim, Client, Entity, EntityKind, EntityStore, InsertOutcome, Patch, Policy, UpdateOutcome,
};
use polisync_docstore::{DocClient, DocConfig};
use uuid::Uuid;

async fn connect_or_skip() -> Option<DocClient> {
    let config = DocConfig {
        database: format!("polisync_it_{}", Uuid::new_v4().simple()),
        ..DocConfig::default()
    };
    match DocClient::connect(&config).await {
        Ok(client) => Some(client),
        Err(e) => {
            eprintln!("Skipping integration test (MongoDB not available): {e}");
            None
        }
    }
}

fn make_client(id: &str) -> Client {
    Client {
        id: id.to_string(),
        first_name: "Ana".to_string(),
        last_name: "Pérez".to_string(),
        national_id: "30111222".to_string(),
        email: "ana@example.com".to_string(),
        phone: "1155550000".to_string(),
        address: "Av. Siempreviva 742".to_string(),
        city: "Rosario".to_string(),
        province: "Santa Fe".to_string(),
        active: "True".to_string(),
    }
}

fn make_policy(number: &str, client_id: &str, status: &str) -> Policy {
    Policy {
        number: number.to_string(),
        client_id: client_id.to_string(),
        policy_type: "Auto".to_string(),
        start_date: "01/01/2025".to_string(),
        end_date: "01/01/2026".to_string(),
        monthly_premium: "15000".to_string(),
        total_coverage: "2000000".to_string(),
        agent_id: "AGE-1".to_string(),
        status: status.to_string(),
    }
}

fn make_claim(id: &str, policy_number: &str) -> Claim {
    Claim {
        id: id.to_string(),
        policy_number: policy_number.to_string(),
        date: "12/03/2025".to_string(),
        claim_type: "Accidente".to_string(),
        estimated_amount: "450000".to_string(),
        description: "Choque trasero".to_string(),
        status: "Abierto".to_string(),
    }
}

#[tokio::test]
#[ignore = "requires live MongoDB"]
async fn test_insert_find_and_conflict() {
    let Some(docs) = connect_or_skip().await else {
        return;
    };
    docs.ensure_indexes().await.unwrap();
    let entity = Entity::Client(make_client("CLI-1"));

    let first = docs.insert(&entity).await.unwrap();
    assert!(matches!(first, InsertOutcome::Inserted(ref ack) if ack.affected == 1));
    assert_eq!(docs.insert(&entity).await.unwrap(), InsertOutcome::Conflict);

    let record = docs.find(EntityKind::Client, "CLI-1").await.unwrap().unwrap();
    assert_eq!(record.key, "CLI-1");
    assert_eq!(
        record.fields.get("provincia").and_then(|v| v.as_str()),
        Some("Santa Fe")
    );
    assert_eq!(docs.count_documents(EntityKind::Client).await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires live MongoDB"]
async fn test_set_fields_never_touches_key() {
    let Some(docs) = connect_or_skip().await else {
        return;
    };
    docs.insert(&Entity::Client(make_client("CLI-1")))
        .await
        .unwrap();

    let mut patch = Patch::new();
    patch.set("email", "ana@nuevo.com");
    patch.set("id_cliente", "CLI-2");
    let outcome = docs.update(EntityKind::Client, "CLI-1", &patch).await.unwrap();
    assert!(matches!(outcome, UpdateOutcome::Updated(_)));

    let record = docs.find(EntityKind::Client, "CLI-1").await.unwrap().unwrap();
    assert_eq!(
        record.fields.get("email").and_then(|v| v.as_str()),
        Some("ana@nuevo.com")
    );
    assert!(docs.find(EntityKind::Client, "CLI-2").await.unwrap().is_none());

    let missing = docs.update(EntityKind::Client, "CLI-9", &patch).await.unwrap();
    assert_eq!(missing, UpdateOutcome::NotFound);
}

#[tokio::test]
#[ignore = "requires live MongoDB"]
async fn test_cascade_lookups_and_reports() {
    let Some(docs) = connect_or_skip().await else {
        return;
    };
    docs.insert(&Entity::Client(make_client("CLI-1")))
        .await
        .unwrap();
    docs.insert(&Entity::Policy(make_policy("POL-1", "CLI-1", "Activa")))
        .await
        .unwrap();
    docs.insert(&Entity::Policy(make_policy("POL-2", "CLI-1", "Vencida")))
        .await
        .unwrap();
    docs.insert(&Entity::Claim(make_claim("SIN-1", "POL-1")))
        .await
        .unwrap();

    let mut policies = docs.policies_for_client("CLI-1").await.unwrap();
    policies.sort();
    assert_eq!(policies, vec!["POL-1", "POL-2"]);
    assert_eq!(docs.claims_for_policy("POL-1").await.unwrap(), vec!["SIN-1"]);

    let active = docs.active_clients().await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].polizas_vigentes, vec!["POL-1"]);

    let expired = docs.expired_policies().await.unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].nro_poliza, "POL-2");

    let top = docs.top_clients_by_coverage().await.unwrap();
    assert_eq!(top[0].cliente, "Ana");
    assert_eq!(top[0].total_cobertura, 4_000_000);

    assert_eq!(docs.delete(EntityKind::Claim, "SIN-1").await.unwrap(), 1);
    assert!(docs.claims_for_policy("POL-1").await.unwrap().is_empty());
}

#[tokio::test]
#[ignore = "requires live MongoDB"]
async fn test_standing_and_accident_reports() {
    let Some(docs) = connect_or_skip().await else {
        return;
    };
    let mut inactive = make_client("CLI-2");
    inactive.first_name = "Bruno".to_string();
    inactive.active = "false".to_string();
    for entity in [
        Entity::Client(make_client("CLI-1")),
        Entity::Client(inactive),
        Entity::Policy(make_policy("POL-1", "CLI-1", "Activa")),
        Entity::Policy(make_policy("POL-2", "CLI-2", "Suspendida")),
    ] {
        docs.insert(&entity).await.unwrap();
    }
    let mut recent = make_claim("SIN-1", "POL-1");
    recent.date = chrono::Utc::now().format("%d/%m/%Y").to_string();
    let mut old = make_claim("SIN-2", "POL-1");
    old.date = "01/01/2000".to_string();
    let mut theft = make_claim("SIN-3", "POL-1");
    theft.date = recent.date.clone();
    theft.claim_type = "Robo".to_string();
    for claim in [recent, old, theft] {
        docs.insert(&Entity::Claim(claim)).await.unwrap();
    }

    let without = docs.clients_without_active_policies().await.unwrap();
    assert_eq!(without.len(), 1);
    assert_eq!(without[0].nombre, "Bruno");

    let accidents = docs.recent_accident_claims().await.unwrap();
    assert_eq!(accidents.len(), 1);
    assert_eq!(accidents[0].id_siniestro, "SIN-1");

    let suspended = docs.suspended_policies().await.unwrap();
    assert_eq!(suspended.len(), 1);
    assert_eq!(suspended[0].nro_poliza, "POL-2");
    assert_eq!(suspended[0].estado_cliente.as_deref(), Some("Inactivo"));
}
