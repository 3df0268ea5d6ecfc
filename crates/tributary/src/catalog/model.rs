//! Wire types for the catalog's search and entity APIs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{
    AssetRef, BUCKET_TYPE, BucketSpec, CONNECTION_TYPE, ConnectionSpec, OBJECT_TYPE, ObjectSpec,
    PROCESS_TYPE, ProcessSpec, Provisioned, connector_of,
};
use tributary_core::types::AssetRecord;

pub const QUALIFIED_NAME: &str = "qualifiedName";
pub const NAME: &str = "name";

/// Body of `POST /api/meta/search/indexsearch`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSearchRequest {
    pub dsl: SearchDsl,
    pub attributes: Vec<String>,
    pub suppress_logs: bool,
}

impl IndexSearchRequest {
    pub fn new(query: Value, from: usize, size: usize) -> Self {
        Self {
            dsl: SearchDsl {
                from,
                size,
                query,
                track_total_hits: true,
                sort: vec![json!({"__guid": {"order": "asc"}})],
            },
            attributes: vec![QUALIFIED_NAME.to_string(), NAME.to_string()],
            suppress_logs: true,
        }
    }
}

/// Elasticsearch request wrapped by the catalog.
#[derive(Debug, Clone, Serialize)]
pub struct SearchDsl {
    pub from: usize,
    pub size: usize,
    pub query: Value,
    pub track_total_hits: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub sort: Vec<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSearchResponse {
    #[serde(default)]
    pub approximate_count: u64,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

/// An entity header as returned by search and mutation responses.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entity {
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(default)]
    pub attributes: Map<String, Value>,
}

impl Entity {
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).and_then(Value::as_str)
    }

    pub fn qualified_name(&self) -> Option<&str> {
        self.attribute(QUALIFIED_NAME)
    }

    pub fn name(&self) -> &str {
        self.attribute(NAME).unwrap_or_default()
    }

    pub fn to_asset_ref(&self) -> Option<AssetRef> {
        self.qualified_name()
            .map(|qn| AssetRef::new(&self.type_name, qn, self.name()))
    }

    pub fn to_record(&self) -> Option<AssetRecord> {
        self.qualified_name()
            .map(|qn| AssetRecord::new(qn, self.name(), &self.type_name))
    }
}

/// Body of `POST /api/meta/entity/bulk`.
#[derive(Debug, Clone, Serialize)]
pub struct BulkRequest {
    pub entities: Vec<Entity>,
}

impl BulkRequest {
    pub fn single(entity: Entity) -> Self {
        Self {
            entities: vec![entity],
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResponse {
    #[serde(default)]
    pub mutated_entities: MutatedEntities,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MutatedEntities {
    #[serde(rename = "CREATE", default)]
    pub create: Vec<Entity>,
    #[serde(rename = "UPDATE", default)]
    pub update: Vec<Entity>,
    #[serde(rename = "PARTIAL_UPDATE", default)]
    pub partial_update: Vec<Entity>,
}

impl MutationResponse {
    /// Classify the outcome for the entity of `requested`'s type.
    ///
    /// Mutations also report touched relatives (a bucket gains an object),
    /// so only entities of the requested type count. No mutation means the
    /// catalog already held an identical asset.
    pub fn outcome(&self, requested: AssetRef) -> Provisioned<AssetRef> {
        let of_type = |entities: &[Entity]| {
            entities
                .iter()
                .filter(|entity| entity.type_name == requested.type_name)
                .find_map(Entity::to_asset_ref)
        };

        let updated = || {
            of_type(&self.mutated_entities.update)
                .or_else(|| of_type(&self.mutated_entities.partial_update))
        };

        if let Some(asset) = of_type(&self.mutated_entities.create) {
            Provisioned::Created(asset)
        } else if let Some(asset) = updated() {
            Provisioned::Updated(asset)
        } else {
            Provisioned::Found(requested)
        }
    }
}

// ============ Query builders ============

pub fn term(field: &str, value: &str) -> Value {
    json!({ "term": { field: value } })
}

pub fn type_is(type_name: &str) -> Value {
    term("__typeName.keyword", type_name)
}

pub fn active() -> Value {
    term("__state", "ACTIVE")
}

pub fn all_of(filters: Vec<Value>) -> Value {
    json!({ "bool": { "filter": filters } })
}

pub fn match_all() -> Value {
    json!({ "match_all": {} })
}

pub fn connection_query(name: &str, connector: &str) -> Value {
    all_of(vec![
        type_is(CONNECTION_TYPE),
        active(),
        term("name.keyword", name),
        term("connectorName", connector),
    ])
}

pub fn bucket_by_arn_query(arn: &str) -> Value {
    all_of(vec![type_is(BUCKET_TYPE), active(), term("awsArn", arn)])
}

pub fn objects_in_bucket_query(bucket_qualified_name: &str) -> Value {
    all_of(vec![
        type_is(OBJECT_TYPE),
        active(),
        term("s3BucketQualifiedName", bucket_qualified_name),
    ])
}

pub fn qualified_name_prefix_query(prefix: &str) -> Value {
    all_of(vec![
        active(),
        json!({ "prefix": { QUALIFIED_NAME: prefix } }),
    ])
}

// ============ Entity builders ============

fn reference(asset: &AssetRef) -> Value {
    json!({
        "typeName": asset.type_name,
        "uniqueAttributes": { QUALIFIED_NAME: asset.qualified_name },
    })
}

fn entity(type_name: &str, attributes: Value) -> Entity {
    let attributes = match attributes {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    Entity {
        type_name: type_name.to_string(),
        guid: None,
        attributes,
    }
}

fn insert_opt(entity: &mut Entity, key: &str, value: Option<Value>) {
    if let Some(value) = value {
        entity.attributes.insert(key.to_string(), value);
    }
}

pub fn connection_entity(spec: &ConnectionSpec, qualified_name: &str) -> Entity {
    entity(
        CONNECTION_TYPE,
        json!({
            QUALIFIED_NAME: qualified_name,
            NAME: spec.name,
            "connectorName": spec.connector,
            "category": "ObjectStore",
            "adminUsers": spec.admin_users,
        }),
    )
}

pub fn bucket_entity(spec: &BucketSpec) -> Entity {
    entity(
        BUCKET_TYPE,
        json!({
            QUALIFIED_NAME: spec.qualified_name(),
            NAME: spec.name,
            "connectionQualifiedName": spec.connection_qualified_name,
            "connectorName": connector_of(&spec.connection_qualified_name),
            "awsArn": spec.arn,
        }),
    )
}

pub fn object_entity(spec: &ObjectSpec) -> Entity {
    let bucket = AssetRef::new(BUCKET_TYPE, &spec.bucket_qualified_name, &spec.bucket_name);
    let mut object = entity(
        OBJECT_TYPE,
        json!({
            QUALIFIED_NAME: spec.qualified_name(),
            NAME: spec.object_key(),
            "connectionQualifiedName": spec.connection_qualified_name,
            "connectorName": connector_of(&spec.connection_qualified_name),
            "s3BucketName": spec.bucket_name,
            "s3BucketQualifiedName": spec.bucket_qualified_name,
            "s3ObjectKey": spec.object_key(),
            "bucket": reference(&bucket),
        }),
    );
    insert_opt(&mut object, "s3ObjectSize", spec.size.map(Value::from));
    insert_opt(
        &mut object,
        "s3ObjectContentType",
        spec.content_type.clone().map(Value::from),
    );
    insert_opt(&mut object, "description", spec.description.clone().map(Value::from));
    object
}

pub fn process_entity(spec: &ProcessSpec) -> Entity {
    let mut process = entity(
        PROCESS_TYPE,
        json!({
            QUALIFIED_NAME: spec.qualified_name(),
            NAME: spec.name,
            "connectionQualifiedName": spec.connection_qualified_name,
            "connectorName": connector_of(&spec.connection_qualified_name),
            "inputs": spec.inputs.iter().map(reference).collect::<Vec<_>>(),
            "outputs": spec.outputs.iter().map(reference).collect::<Vec<_>>(),
        }),
    );
    insert_opt(&mut process, "description", spec.description.clone().map(Value::from));
    process
}
