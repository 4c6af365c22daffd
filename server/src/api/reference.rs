use crate::api::UnpagedResponse;
use crate::api::extract::{Json, Path};
use crate::app::AppState;
use axum::extract::State;
use axum::{Router, routing};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/makes", routing::get(list_makes))
        .route("/make/{make}/models", routing::get(list_models))
        .route("/years", routing::get(list_years))
}

async fn list_makes(State(state): State<AppState>) -> Json<UnpagedResponse<String>> {
    let results = state.reference.makes().into_iter().map(String::from).collect();
    Json(UnpagedResponse { results })
}

/// Unknown makes have no models rather than being an error, so pickers can query freely.
async fn list_models(State(state): State<AppState>, Path(make): Path<String>) -> Json<UnpagedResponse<String>> {
    let results = state
        .reference
        .models_for_make(&make)
        .into_iter()
        .map(String::from)
        .collect();
    Json(UnpagedResponse { results })
}

async fn list_years(State(state): State<AppState>) -> Json<UnpagedResponse<i32>> {
    Json(UnpagedResponse {
        results: state.reference.years(),
    })
}

#[cfg(test)]
mod test {
    use crate::test::*;
    use crate::time::DateTime;
    use serde_json::{Value, json};

    #[tokio::test]
    async fn makes_and_models() {
        let server = test_server();

        let makes: Value = server.get("/makes").await.json();
        let makes = makes["results"].as_array().unwrap();
        assert!(makes.contains(&json!("Toyota")));
        assert!(makes.windows(2).all(|pair| pair[0].as_str() < pair[1].as_str()));

        let models: Value = server.get("/make/Toyota/models").await.json();
        assert!(models["results"].as_array().unwrap().contains(&json!("Supra")));

        let unknown: Value = server.get("/make/Yugo/models").await.json();
        assert_eq!(unknown, json!({ "results": [] }));
    }

    #[tokio::test]
    async fn years() {
        let years: Value = test_server().get("/years").await.json();
        let years = years["results"].as_array().unwrap();
        assert_eq!(years.first(), Some(&json!(DateTime::current_year() + 1)));
        assert_eq!(years.last(), Some(&json!(1900)));
    }
}
