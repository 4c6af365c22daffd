use crate::api::extract::{Json, Path};
use crate::api::{ApiResult, UnpagedResponse};
use crate::app::AppState;
use crate::auth::Client;
use crate::model::enums::TagType;
use crate::string::SmallString;
use crate::{api, update};
use axum::extract::{Extension, State};
use axum::{Router, routing};

pub fn routes() -> Router<AppState> {
    Router::new().route("/tags/{tag_type}", routing::get(list_values))
}

/// Lists the distinct values used for tags of one type, for populating feed filters.
/// Years come newest first, everything else alphabetically.
async fn list_values(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(tag_type): Path<TagType>,
) -> ApiResult<Json<UnpagedResponse<SmallString>>> {
    api::verify_privilege(client, state.config.privileges().tag_list)?;

    let mut conn = state.get_connection()?;
    let results = update::tag::unique_values(&mut conn, tag_type)?;
    Ok(Json(UnpagedResponse { results }))
}

#[cfg(test)]
mod test {
    use crate::test::*;
    use axum::http::StatusCode;

    #[tokio::test]
    async fn unknown_tag_type() {
        let response = test_server().get("/tags/colour").await;
        response.assert_status(StatusCode::BAD_REQUEST);
    }
}
