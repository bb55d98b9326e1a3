//! Activities over a repository wired to the in-memory backends.

use std::sync::Arc;

use serde_json::{Value, json};

use adstore_activities::activity::{
    ACTIVE, ENTITIES_RESULT, ENTITY_CATEGORY_FILTER, ENTITY_ID, ENTITY_IDS, ENTITY_RESULT, EXTERNAL_TYPE_FILTER,
    PARENT_ENTITY_ID, PAYLOAD, VERSION_FILTER, AUTH_USER_ID,
};
use adstore_activities::{
    Activity, ActivityErrorId, ActivityRequest, GetEntitiesByCategoryActivity, GetEntityActivity,
    SaveEntityActivity, SetEntityStatusActivity,
};
use adstore_core::{EntityId, RawEntity};
use adstore_infra::{InMemoryRepository, RequestContext, ResourceAccessHandler, StoreConfig, in_memory_repository};
use adstore_json::{EntityJsonSerializer, PropertyTypeMap};

type Repo = Arc<InMemoryRepository>;

const ACCOUNT: &str = "defaultaccount";

fn company() -> EntityId {
    EntityId::from_i32(1)
}

fn repository() -> Repo {
    adstore_observability::init();
    let repo = Arc::new(in_memory_repository(StoreConfig::default()));
    repo.setup_new_company(company()).unwrap();
    repo
}

fn serializer() -> EntityJsonSerializer {
    EntityJsonSerializer::new(PropertyTypeMap::default())
}

fn save(repo: &Repo, id: EntityId, payload: Value, flags: Option<&str>) -> adstore_activities::ActivityResult {
    let activity = SaveEntityActivity::new(repo.clone(), serializer(), ACCOUNT);
    let mut request = ActivityRequest::new()
        .with_value(PAYLOAD, payload.to_string())
        .with_value(ENTITY_ID, id.to_string())
        .with_value(PARENT_ENTITY_ID, company().to_string())
        .with_value(AUTH_USER_ID, "planner@example.com");
    if let Some(flags) = flags {
        request = request.with_query("Flags", flags);
    }
    activity.process(&request)
}

fn get(repo: &Repo, request: ActivityRequest) -> adstore_activities::ActivityResult {
    let request = request.with_value(PARENT_ENTITY_ID, company().to_string());
    GetEntityActivity::new(repo.clone(), serializer(), ACCOUNT).process(&request)
}

fn entity_json(values: &adstore_activities::ActivityValues) -> Value {
    serde_json::from_str(&values[ENTITY_RESULT]).unwrap()
}

fn campaign_payload(name: &str, external_type: &str, budget: f64) -> Value {
    json!({
        "EntityCategory": "Campaign",
        "ExternalName": name,
        "ExternalType": external_type,
        "Properties": { "Budget": budget }
    })
}

#[test]
fn saved_entity_is_returned_and_fetchable() {
    let repo = repository();
    let id = EntityId::from_i32(10);

    let saved = entity_json(&save(&repo, id, campaign_payload("Launch", "Display", 1000.0), None).unwrap());
    assert_eq!(saved["ExternalEntityId"], json!(id.to_string()));
    assert_eq!(saved["LocalVersion"], json!(0));
    assert_eq!(saved["LastModifiedUser"], json!("planner@example.com"));

    let fetched = entity_json(&get(&repo, ActivityRequest::new().with_value(ENTITY_ID, id.to_string())).unwrap());
    assert_eq!(fetched["ExternalName"], json!("Launch"));
    assert_eq!(fetched["Properties"]["Budget"].as_f64(), Some(1000.0));
}

#[test]
fn payload_without_id_takes_the_route_id() {
    let repo = repository();
    let id = EntityId::from_i32(11);
    save(&repo, id, campaign_payload("Launch", "Display", 1.0), None).unwrap();
    assert!(repo.get_entity(&RequestContext::new(ACCOUNT), id).is_ok());
}

#[test]
fn updates_advance_the_version_and_history_stays_fetchable() {
    let repo = repository();
    let id = EntityId::from_i32(10);
    save(&repo, id, campaign_payload("Launch", "Display", 1000.0), None).unwrap();

    let update = json!({ "EntityCategory": "Campaign", "Properties": { "Budget": 2500.0 } });
    let updated = entity_json(&save(&repo, id, update, None).unwrap());
    assert_eq!(updated["LocalVersion"], json!(1));
    assert_eq!(updated["ExternalName"], json!("Launch"));
    assert_eq!(updated["Properties"]["Budget"].as_f64(), Some(2500.0));

    let original = entity_json(
        &get(
            &repo,
            ActivityRequest::new()
                .with_value(ENTITY_ID, id.to_string())
                .with_query(VERSION_FILTER, "0"),
        )
        .unwrap(),
    );
    assert_eq!(original["LocalVersion"], json!(0));
    assert_eq!(original["Properties"]["Budget"].as_f64(), Some(1000.0));

    let missing = get(
        &repo,
        ActivityRequest::new()
            .with_value(ENTITY_ID, id.to_string())
            .with_query(VERSION_FILTER, "7"),
    )
    .unwrap_err();
    assert_eq!(missing.error_id, ActivityErrorId::EntityNotFound);
}

#[test]
fn filtered_update_leaves_hidden_tiers_alone() {
    let repo = repository();
    let id = EntityId::from_i32(10);
    let mut payload = campaign_payload("Launch", "Display", 10.0);
    payload["ExtendedProperties"] = json!({ "foo": "orig" });
    save(&repo, id, payload, Some("WithExtendedProperties")).unwrap();

    let update = json!({
        "EntityCategory": "Campaign",
        "ExtendedProperties": { "foo": "new" }
    });
    let response = entity_json(&save(&repo, id, update, None).unwrap());
    assert!(response.get("ExtendedProperties").is_none());

    let fetched = entity_json(
        &get(
            &repo,
            ActivityRequest::new()
                .with_value(ENTITY_ID, id.to_string())
                .with_query("Flags", "WithExtendedProperties"),
        )
        .unwrap(),
    );
    assert_eq!(fetched["ExtendedProperties"]["foo"], json!("orig"));
}

#[test]
fn save_rejects_bad_input_with_typed_codes() {
    let repo = repository();
    let id = EntityId::from_i32(10);

    let mut mismatched = campaign_payload("Launch", "Display", 1.0);
    mismatched["ExternalEntityId"] = json!(EntityId::from_i32(99).to_string());
    assert_eq!(
        save(&repo, id, mismatched, None).unwrap_err().error_id,
        ActivityErrorId::InvalidEntityId
    );

    let activity = SaveEntityActivity::new(repo.clone(), serializer(), ACCOUNT);
    let no_payload = ActivityRequest::new().with_value(ENTITY_ID, id.to_string());
    assert_eq!(activity.process(&no_payload).unwrap_err().error_id, ActivityErrorId::InvalidJson);

    let garbage = ActivityRequest::new()
        .with_value(ENTITY_ID, id.to_string())
        .with_value(PAYLOAD, "{not json");
    assert_eq!(activity.process(&garbage).unwrap_err().error_id, ActivityErrorId::InvalidJson);

    let bad_id = ActivityRequest::new()
        .with_value(ENTITY_ID, "campaign-10")
        .with_value(PAYLOAD, "{}");
    assert_eq!(activity.process(&bad_id).unwrap_err().error_id, ActivityErrorId::InvalidEntityId);
}

#[test]
fn get_reports_missing_and_malformed_requests() {
    let repo = repository();

    let unknown = get(&repo, ActivityRequest::new().with_value(ENTITY_ID, EntityId::from_i32(404).to_string()));
    assert_eq!(unknown.unwrap_err().error_id, ActivityErrorId::EntityNotFound);

    let malformed = get(&repo, ActivityRequest::new().with_value(ENTITY_ID, "404"));
    assert_eq!(malformed.unwrap_err().error_id, ActivityErrorId::InvalidEntityId);

    let id = EntityId::from_i32(10);
    save(&repo, id, campaign_payload("Launch", "Display", 1.0), None).unwrap();
    let bad_version = get(
        &repo,
        ActivityRequest::new()
            .with_value(ENTITY_ID, id.to_string())
            .with_query(VERSION_FILTER, "latest"),
    );
    assert_eq!(bad_version.unwrap_err().error_id, ActivityErrorId::InvalidRequest);
}

#[test]
fn get_applies_the_query_gate() {
    let repo = repository();
    let id = EntityId::from_i32(10);
    save(&repo, id, campaign_payload("Launch", "Display", 1.0), None).unwrap();

    let matching = get(
        &repo,
        ActivityRequest::new()
            .with_value(ENTITY_ID, id.to_string())
            .with_query("ExternalName", "^Lau"),
    );
    assert!(matching.is_ok());

    let rejected = get(
        &repo,
        ActivityRequest::new()
            .with_value(ENTITY_ID, id.to_string())
            .with_query("ExternalName", "^Other$"),
    );
    assert_eq!(rejected.unwrap_err().error_id, ActivityErrorId::EntityNotFound);

    let bad_regex = get(
        &repo,
        ActivityRequest::new()
            .with_value(ENTITY_ID, id.to_string())
            .with_query("ExternalName", "("),
    );
    assert_eq!(bad_regex.unwrap_err().error_id, ActivityErrorId::InvalidRequest);
}

fn seed_campaigns(repo: &Repo) -> Vec<EntityId> {
    let ids: Vec<EntityId> = (10..13).map(EntityId::from_i32).collect();
    save(repo, ids[0], campaign_payload("Alpha", "Video", 1.0), None).unwrap();
    save(repo, ids[1], campaign_payload("Beta", "Display", 2.0), None).unwrap();
    save(repo, ids[2], campaign_payload("Gamma", "Video", 3.0), None).unwrap();
    ids
}

fn list(repo: &Repo, request: ActivityRequest) -> Result<Vec<Value>, adstore_activities::ActivityError> {
    list_with(GetEntitiesByCategoryActivity::new(repo.clone(), serializer(), ACCOUNT), request)
}

fn list_with(
    activity: GetEntitiesByCategoryActivity<Repo>,
    request: ActivityRequest,
) -> Result<Vec<Value>, adstore_activities::ActivityError> {
    let values = activity.process(&request.with_value(PARENT_ENTITY_ID, company().to_string()))?;
    Ok(serde_json::from_str(&values[ENTITIES_RESULT]).unwrap())
}

fn names(entities: &[Value]) -> Vec<&str> {
    entities.iter().map(|e| e["ExternalName"].as_str().unwrap()).collect()
}

#[test]
fn listing_filters_by_category_and_type_in_id_order() {
    let repo = repository();
    seed_campaigns(&repo);

    let all = list(&repo, ActivityRequest::new().with_query(ENTITY_CATEGORY_FILTER, "campaign")).unwrap();
    assert_eq!(names(&all), vec!["Alpha", "Beta", "Gamma"]);

    let videos = list(
        &repo,
        ActivityRequest::new()
            .with_query(ENTITY_CATEGORY_FILTER, "Campaign")
            .with_query(EXTERNAL_TYPE_FILTER, "Video"),
    )
    .unwrap();
    assert_eq!(names(&videos), vec!["Alpha", "Gamma"]);

    let creatives = list(&repo, ActivityRequest::new().with_query(ENTITY_CATEGORY_FILTER, "Creative")).unwrap();
    assert!(creatives.is_empty());
}

#[test]
fn listing_pages_over_the_sorted_entities() {
    let repo = repository();
    seed_campaigns(&repo);

    let page = list(
        &repo,
        ActivityRequest::new()
            .with_query(ENTITY_CATEGORY_FILTER, "Campaign")
            .with_query("skip", "1")
            .with_query("top", "1"),
    )
    .unwrap();
    assert_eq!(names(&page), vec!["Beta"]);

    let bad = list(
        &repo,
        ActivityRequest::new()
            .with_query(ENTITY_CATEGORY_FILTER, "Campaign")
            .with_query("skip", "-1"),
    );
    assert_eq!(bad.unwrap_err().error_id, ActivityErrorId::InvalidRequest);
}

#[test]
fn listing_requires_a_known_category() {
    let repo = repository();
    assert_eq!(list(&repo, ActivityRequest::new()).unwrap_err().error_id, ActivityErrorId::InvalidRequest);
    assert_eq!(
        list(&repo, ActivityRequest::new().with_query(ENTITY_CATEGORY_FILTER, "Widget"))
            .unwrap_err()
            .error_id,
        ActivityErrorId::InvalidRequest
    );
}

struct HideEntity(EntityId);

impl ResourceAccessHandler for HideEntity {
    fn check_access(&self, _context: &RequestContext, entity: &RawEntity) -> bool {
        entity.external_entity_id != Some(self.0)
    }
}

#[test]
fn listing_drops_entities_the_caller_cannot_see() {
    let repo = repository();
    let ids = seed_campaigns(&repo);

    let activity = GetEntitiesByCategoryActivity::new(repo.clone(), serializer(), ACCOUNT)
        .with_access_handler(Arc::new(HideEntity(ids[1])));
    let visible = list_with(activity, ActivityRequest::new().with_query(ENTITY_CATEGORY_FILTER, "Campaign")).unwrap();
    assert_eq!(names(&visible), vec!["Alpha", "Gamma"]);
}

#[test]
fn deactivated_entities_leave_the_listing() {
    let repo = repository();
    let ids = seed_campaigns(&repo);
    let status = SetEntityStatusActivity::new(repo.clone(), ACCOUNT);

    let result = status
        .process(
            &ActivityRequest::new()
                .with_value(ENTITY_IDS, format!("{},{}", ids[0], ids[2]))
                .with_value(ACTIVE, "false"),
        )
        .unwrap();
    assert_eq!(result[ACTIVE], "false");

    let listed = list(&repo, ActivityRequest::new().with_query(ENTITY_CATEGORY_FILTER, "Campaign")).unwrap();
    assert_eq!(names(&listed), vec!["Beta"]);

    status
        .process(
            &ActivityRequest::new()
                .with_value(ENTITY_ID, ids[0].to_string())
                .with_value(ACTIVE, "TRUE"),
        )
        .unwrap();
    let listed = list(&repo, ActivityRequest::new().with_query(ENTITY_CATEGORY_FILTER, "Campaign")).unwrap();
    assert_eq!(names(&listed), vec!["Alpha", "Beta"]);
}

#[test]
fn status_changes_reject_unknown_ids_and_flags() {
    let repo = repository();
    let ids = seed_campaigns(&repo);
    let status = SetEntityStatusActivity::new(repo.clone(), ACCOUNT);

    let unknown = status.process(
        &ActivityRequest::new()
            .with_value(ENTITY_IDS, format!("{},{}", ids[0], EntityId::from_i32(404)))
            .with_value(ACTIVE, "false"),
    );
    assert_eq!(unknown.unwrap_err().error_id, ActivityErrorId::EntityNotFound);

    // Nothing was deactivated by the failed batch.
    let listed = list(&repo, ActivityRequest::new().with_query(ENTITY_CATEGORY_FILTER, "Campaign")).unwrap();
    assert_eq!(listed.len(), 3);

    let bad_flag = status.process(
        &ActivityRequest::new()
            .with_value(ENTITY_ID, ids[0].to_string())
            .with_value(ACTIVE, "maybe"),
    );
    assert_eq!(bad_flag.unwrap_err().error_id, ActivityErrorId::InvalidRequest);
}
