//! End to end against PostgreSQL. Set CONNECTOR_POSTGRES_URL to run; skipped otherwise.
//! Every test works on its own uniquely named tables and drops them at the end.

use axum::{
    body::Body,
    http::{header::CONTENT_TYPE, Request, StatusCode},
    Router,
};
use serde_json::{json, Value as Json};
use tower::ServiceExt;
use workflow_connector::sql::ScalarKind;
use workflow_connector::{connector_routes, load, AppState, BackendKind, Database};

const URL_VAR: &str = "CONNECTOR_POSTGRES_URL";
const SERIAL: &str = "67e55044-10b1-426f-9247-bb680e5fe0c8";

fn descriptor(equipment: &str, recipes: &str, manuals: &str) -> String {
    format!(
        r#"{{
        "key": "kitchen",
        "name": "Kitchen",
        "typeDescriptors": [
            {{
                "key": "equipment",
                "name": "Equipment",
                "tableName": "{equipment}",
                "columnAsOptionName": "name",
                "uniqueIdColumn": "id",
                "fields": [
                    {{ "key": "id", "fromColumn": "id", "type": {{ "name": "text" }} }},
                    {{ "key": "name", "fromColumn": "name", "type": {{ "name": "text" }} }},
                    {{
                        "key": "acquisitionCost",
                        "type": {{
                            "name": "money",
                            "amount": {{ "key": "acquisitionCost", "fromColumn": "acquisition_cost" }},
                            "currency": {{ "key": "currency", "fromColumn": "currency" }}
                        }}
                    }},
                    {{ "key": "purchaseDate", "fromColumn": "purchase_date", "type": {{ "name": "date", "kind": "date" }} }},
                    {{ "key": "serial", "fromColumn": "serial", "type": {{ "name": "text" }} }},
                    {{ "key": "specs", "fromColumn": "specs", "type": {{ "name": "text" }} }},
                    {{ "key": "warranty", "fromColumn": "warranty", "type": {{ "name": "text" }} }},
                    {{ "key": "readyAt", "fromColumn": "ready_at", "type": {{ "name": "date", "kind": "time" }} }},
                    {{
                        "key": "recipes",
                        "type": {{ "name": "text" }},
                        "relationship": {{
                            "kind": "oneToMany",
                            "withTable": "{recipes}",
                            "localTableUniqueIdColumn": "id",
                            "foreignTableUniqueIdColumn": "equipment_id"
                        }}
                    }}
                ]
            }},
            {{
                "key": "recipes",
                "name": "Recipes",
                "tableName": "{recipes}",
                "columnAsOptionName": "name",
                "uniqueIdColumn": "id",
                "fields": [
                    {{ "key": "id", "fromColumn": "id", "type": {{ "name": "text" }} }},
                    {{ "key": "name", "fromColumn": "name", "type": {{ "name": "text" }} }}
                ]
            }},
            {{
                "key": "manuals",
                "name": "Manuals",
                "tableName": "{manuals}",
                "columnAsOptionName": "title",
                "uniqueIdColumn": "id",
                "fields": [
                    {{ "key": "id", "fromColumn": "id", "type": {{ "name": "text" }} }},
                    {{ "key": "title", "fromColumn": "title", "type": {{ "name": "text" }} }}
                ]
            }}
        ]
    }}"#
    )
}

struct Kitchen {
    app: Router,
    state: AppState,
    equipment: String,
    recipes: String,
    manuals: String,
}

impl Kitchen {
    async fn open() -> Option<Kitchen> {
        let Ok(url) = std::env::var(URL_VAR) else {
            eprintln!("{URL_VAR} not set; skipping");
            return None;
        };
        let suffix = uuid::Uuid::new_v4().simple().to_string();
        let equipment = format!("equipment_{suffix}");
        let recipes = format!("recipes_{suffix}");
        let manuals = format!("manuals_{suffix}");

        let db = Database::connect(BackendKind::Postgres, &url, 2).await.unwrap();
        let Database::Postgres(pool) = &db else { panic!("expected postgres") };
        let statements = [
            format!(
                "CREATE TABLE {equipment} (id SERIAL PRIMARY KEY, name TEXT NOT NULL, \
                 acquisition_cost NUMERIC(10, 2), currency TEXT, purchase_date DATE, serial TEXT, \
                 specs JSONB, warranty INTERVAL, ready_at TIMETZ)"
            ),
            format!("CREATE TABLE {recipes} (id SERIAL PRIMARY KEY, equipment_id INTEGER, name TEXT)"),
            format!("CREATE TABLE {manuals} (id UUID PRIMARY KEY, title TEXT)"),
            format!(
                "INSERT INTO {equipment} (name, acquisition_cost, currency, purchase_date, serial, specs, warranty, ready_at) \
                 VALUES ('Oven', 500.00, 'EUR', '2020-01-02', '{SERIAL}', '{{\"watts\": 3000}}', '2 years', '08:30:00+02')"
            ),
            format!("INSERT INTO {equipment} (name) VALUES ('Mixer')"),
            format!("INSERT INTO {recipes} (equipment_id, name) VALUES (1, 'Bread'), (1, 'Pizza')"),
            format!("INSERT INTO {manuals} (id, title) VALUES ('{SERIAL}', 'Oven manual')"),
        ];
        for stmt in &statements {
            sqlx::query(stmt).execute(pool).await.unwrap();
        }

        let doc = descriptor(&equipment, &recipes, &manuals);
        let state = AppState::initialize(db, load(doc.as_bytes()).unwrap()).await.unwrap();
        Some(Kitchen {
            app: connector_routes(state.clone()),
            state,
            equipment,
            recipes,
            manuals,
        })
    }

    async fn get(&self, uri: &str) -> (StatusCode, Json) {
        self.call(Request::get(uri).body(Body::empty()).unwrap()).await
    }

    async fn call(&self, req: Request<Body>) -> (StatusCode, Json) {
        let resp = self.app.clone().oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    async fn drop_tables(self) {
        let Database::Postgres(pool) = &self.state.db else { return };
        let stmt = format!("DROP TABLE {}, {}, {}", self.equipment, self.recipes, self.manuals);
        sqlx::query(&stmt).execute(pool).await.unwrap();
    }
}

#[tokio::test]
async fn postgres_types_are_classified() {
    let Some(kitchen) = Kitchen::open().await else { return };
    let schemas = &kitchen.state.schemas;
    let t = kitchen.equipment.as_str();
    assert_eq!(schemas.kind_of(t, "id"), Some(ScalarKind::Integer));
    assert_eq!(schemas.kind_of(t, "acquisition_cost"), Some(ScalarKind::Float));
    assert_eq!(schemas.kind_of(t, "purchase_date"), Some(ScalarKind::Timestamp));
    assert_eq!(schemas.kind_of(t, "ready_at"), Some(ScalarKind::Timestamp));
    assert_eq!(schemas.kind_of(t, "specs"), Some(ScalarKind::String));
    assert_eq!(schemas.kind_of(t, "warranty"), Some(ScalarKind::String));
    assert!(schemas.is_uuid(&kitchen.manuals, "id"));
    assert!(!schemas.is_uuid(t, "serial"));
    kitchen.drop_tables().await;
}

#[tokio::test]
async fn collection_decodes_every_column() {
    let Some(kitchen) = Kitchen::open().await else { return };
    let (status, body) = kitchen.get("/equipment").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(
        body[0],
        json!({
            "id": "1",
            "name": "Oven",
            "acquisitionCost": { "amount": 500, "currency": "EUR" },
            "purchaseDate": "2020-01-02T00:00:00.000Z",
            "serial": SERIAL,
            "specs": "{\"watts\":3000}",
            "warranty": "2 years",
            "readyAt": "1970-01-01T08:30:00.000Z"
        })
    );
    assert_eq!(body[1]["acquisitionCost"], Json::Null);
    assert_eq!(body[1]["specs"], Json::Null);
    kitchen.drop_tables().await;
}

#[tokio::test]
async fn uuid_looking_text_filters_bind_as_text() {
    let Some(kitchen) = Kitchen::open().await else { return };
    let (status, body) = kitchen.get(&format!("/equipment?filter=serial+eq+{SERIAL}")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["name"], json!("Oven"));

    let (status, body) = kitchen.get(&format!("/equipment/options?serial={SERIAL}")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body, json!([{ "id": "1", "name": "Oven" }]));

    let (status, body) = kitchen.get(&format!("/manuals/{SERIAL}")).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body, json!({ "id": SERIAL, "name": "Oven manual" }));

    let (status, _) = kitchen.get("/manuals/not-a-uuid").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    kitchen.drop_tables().await;
}

#[tokio::test]
async fn option_search_casts_the_name_column() {
    let Some(kitchen) = Kitchen::open().await else { return };
    let (status, body) = kitchen.get("/equipment/options?filter=ix").await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body, json!([{ "id": "2", "name": "Mixer" }]));

    let (_, body) = kitchen.get("/equipment/1").await;
    let mut ids: Vec<&str> = body["recipes"].as_array().unwrap().iter().map(|v| v.as_str().unwrap()).collect();
    ids.sort();
    assert_eq!(ids, vec!["1", "2"]);
    kitchen.drop_tables().await;
}

#[tokio::test]
async fn create_reads_the_id_from_returning() {
    let Some(kitchen) = Kitchen::open().await else { return };
    let req = Request::post("/equipment")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "name": "Stove", "acquisitionCost": "80.5", "currency": "USD" }).to_string(),
        ))
        .unwrap();
    let (status, body) = kitchen.call(req).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["id"], json!("3"));
    assert_eq!(body["acquisitionCost"], json!({ "amount": 80.5, "currency": "USD" }));
    assert_eq!(body["recipes"], json!([]));

    let req = Request::post("/manuals")
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "id": "0b7f3e4a-2c1d-4e5f-8a9b-1c2d3e4f5a6b", "title": "Stove manual" }).to_string(),
        ))
        .unwrap();
    let (status, body) = kitchen.call(req).await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["id"], json!("0b7f3e4a-2c1d-4e5f-8a9b-1c2d3e4f5a6b"));
    kitchen.drop_tables().await;
}
