use crate::api::error::{ApiError, ApiResult};
use crate::api::extract::{Json, Path, Query};
use crate::api::{DeleteBody, ResourceParams, UnpagedResponse, user};
use crate::app::AppState;
use crate::auth::Client;
use crate::config::{Config, TagPolicy};
use crate::model::car::{Car, NewCar};
use crate::model::enums::{ResourceType, TagType};
use crate::reference::{self, MIN_YEAR, ReferenceData};
use crate::resource::car::CarInfo;
use crate::schema::car;
use crate::string::SmallString;
use crate::time::DateTime;
use crate::{api, resource};
use axum::extract::{Extension, State};
use axum::{Router, routing};
use diesel::{
    Connection, ExpressionMethods, Insertable, OptionalExtension, PgConnection, QueryDsl, RunQueryDsl,
    SelectableHelper,
};
use serde::Deserialize;
use tracing::debug;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user/{name}/cars", routing::get(list))
        .route("/cars", routing::post(create))
        .route("/car/{id}", routing::get(get).put(update).delete(delete))
}

/// Checks the identifying attributes of a car and returns the trimmed make and model.
fn validate<'a>(
    config: &Config,
    reference: &dyn ReferenceData,
    year: i32,
    make: &'a str,
    model: &'a str,
) -> ApiResult<(&'a str, &'a str)> {
    if !(MIN_YEAR..=reference::default_max_year()).contains(&year) {
        return Err(ApiError::InvalidYear(year));
    }
    let make = api::non_empty(make, "Make")?;
    let model = api::non_empty(model, "Model")?;

    if config.tag_policy == TagPolicy::Curated {
        if !reference.is_valid_make(make) {
            return Err(ApiError::UnknownReference(TagType::Make, SmallString::new(make)));
        }
        if !reference.is_valid_model(make, model) {
            return Err(ApiError::UnknownReference(TagType::Model, SmallString::new(model)));
        }
    }
    Ok((make, model))
}

/// Trims an optional attribute. Blank attributes are treated as absent.
fn optional(text: Option<&String>) -> Option<&str> {
    text.map(|text| text.trim()).filter(|text| !text.is_empty())
}

/// Lists the cars in a user's garage, oldest addition first.
async fn list(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(name): Path<String>,
    Query(params): Query<ResourceParams>,
) -> ApiResult<Json<UnpagedResponse<CarInfo>>> {
    api::verify_privilege(client, state.config.privileges().car_list)?;

    let fields = resource::create_table(params.fields()).map_err(Box::from)?;
    state.get_connection()?.transaction(|conn| {
        let user_id = user::id_from_name(conn, &name)?;
        let cars: Vec<Car> = car::table
            .select(Car::as_select())
            .filter(car::user_id.eq(user_id))
            .order_by((car::creation_time, car::id))
            .load(conn)?;
        let results = cars.into_iter().map(|car| CarInfo::new(car, &fields)).collect();
        Ok(Json(UnpagedResponse { results }))
    })
}

async fn get(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(car_id): Path<i64>,
    Query(params): Query<ResourceParams>,
) -> ApiResult<Json<CarInfo>> {
    api::verify_privilege(client, state.config.privileges().car_list)?;

    let fields = resource::create_table(params.fields()).map_err(Box::from)?;
    let mut conn = state.get_connection()?;
    let car = load(&mut conn, car_id)?;
    Ok(Json(CarInfo::new(car, &fields)))
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct CreateBody {
    year: i32,
    make: String,
    model: String,
    trim: Option<String>,
    color: Option<String>,
    drivetrain: Option<String>,
    transmission: Option<String>,
}

/// Adds a car to the client's garage.
async fn create(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Query(params): Query<ResourceParams>,
    Json(body): Json<CreateBody>,
) -> ApiResult<Json<CarInfo>> {
    api::verify_privilege(client, state.config.privileges().car_create)?;
    let user_id = api::require_login(client)?;
    let (make, model) = validate(&state.config, state.reference.as_ref(), body.year, &body.make, &body.model)?;

    let fields = resource::create_table(params.fields()).map_err(Box::from)?;
    let new_car = NewCar {
        user_id,
        year: body.year,
        make,
        model,
        trim: optional(body.trim.as_ref()),
        color: optional(body.color.as_ref()),
        drivetrain: optional(body.drivetrain.as_ref()),
        transmission: optional(body.transmission.as_ref()),
    };

    let mut conn = state.get_connection()?;
    let car: Car = new_car
        .insert_into(car::table)
        .returning(Car::as_returning())
        .get_result(&mut conn)?;
    debug!("User {user_id} added car {} to their garage", car.id);
    Ok(Json(CarInfo::new(car, &fields)))
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct UpdateBody {
    version: DateTime,
    year: i32,
    make: String,
    model: String,
    trim: Option<String>,
    color: Option<String>,
    drivetrain: Option<String>,
    transmission: Option<String>,
}

/// Replaces every attribute of a car. Omitted optional attributes are cleared.
async fn update(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(car_id): Path<i64>,
    Query(params): Query<ResourceParams>,
    Json(body): Json<UpdateBody>,
) -> ApiResult<Json<CarInfo>> {
    let (make, model) = validate(&state.config, state.reference.as_ref(), body.year, &body.make, &body.model)?;

    let fields = resource::create_table(params.fields()).map_err(Box::from)?;
    state.get_connection()?.transaction(|conn| {
        let mut car = load(conn, car_id)?;
        let privileges = state.config.privileges();
        api::verify_ownership(client, car.user_id, privileges.car_edit_own, privileges.car_edit_any)?;
        api::verify_version(car.last_edit_time, body.version)?;

        car.year = body.year;
        car.make = String::from(make);
        car.model = String::from(model);
        car.trim = optional(body.trim.as_ref()).map(String::from);
        car.color = optional(body.color.as_ref()).map(String::from);
        car.drivetrain = optional(body.drivetrain.as_ref()).map(String::from);
        car.transmission = optional(body.transmission.as_ref()).map(String::from);
        car.last_edit_time = DateTime::now();

        let car: Car = diesel::update(car::table.find(car_id))
            .set(&car)
            .returning(Car::as_returning())
            .get_result(conn)?;
        Ok(Json(CarInfo::new(car, &fields)))
    })
}

async fn delete(
    State(state): State<AppState>,
    Extension(client): Extension<Client>,
    Path(car_id): Path<i64>,
    Json(body): Json<DeleteBody>,
) -> ApiResult<Json<()>> {
    state.get_connection()?.transaction(|conn| {
        let car = load(conn, car_id)?;
        let privileges = state.config.privileges();
        api::verify_ownership(client, car.user_id, privileges.car_delete_own, privileges.car_delete_any)?;
        api::verify_version(car.last_edit_time, body.version)?;

        diesel::delete(car::table.find(car_id)).execute(conn)?;
        Ok(Json(()))
    })
}

fn load(conn: &mut PgConnection, car_id: i64) -> ApiResult<Car> {
    car::table
        .find(car_id)
        .select(Car::as_select())
        .first(conn)
        .optional()?
        .ok_or(ApiError::NotFound(ResourceType::Car))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::reference::StaticCatalog;
    use crate::test::*;
    use axum::http::StatusCode;
    use serde_json::json;

    #[test]
    fn year_range() {
        let config = crate::config::test_config(None);
        let catalog = StaticCatalog::default();
        let next_year = DateTime::current_year() + 1;

        assert!(validate(&config, &catalog, 1900, "Ford", "Model T").is_ok());
        assert!(validate(&config, &catalog, next_year, "Toyota", "GR86").is_ok());
        assert!(matches!(validate(&config, &catalog, 1899, "Ford", "Model T"), Err(ApiError::InvalidYear(1899))));
        assert!(matches!(
            validate(&config, &catalog, next_year + 1, "Toyota", "GR86"),
            Err(ApiError::InvalidYear(_))
        ));
    }

    #[test]
    fn required_attributes() {
        let config = crate::config::test_config(None);
        let catalog = StaticCatalog::default();

        assert_eq!(validate(&config, &catalog, 1999, " Nissan ", "Skyline ").ok(), Some(("Nissan", "Skyline")));
        assert!(matches!(validate(&config, &catalog, 1999, "  ", "Skyline"), Err(ApiError::EmptyField("Make"))));
        assert!(matches!(validate(&config, &catalog, 1999, "Nissan", ""), Err(ApiError::EmptyField("Model"))));

        assert_eq!(optional(Some(&String::from("  Red "))), Some("Red"));
        assert_eq!(optional(Some(&String::from("   "))), None);
        assert_eq!(optional(None), None);
    }

    #[test]
    fn curated_catalog() {
        let config = crate::config::test_config(Some(TagPolicy::Curated));
        let catalog = StaticCatalog::default();

        assert!(validate(&config, &catalog, 1995, "Toyota", "Supra").is_ok());
        assert!(matches!(
            validate(&config, &catalog, 1995, "Yugo", "GV"),
            Err(ApiError::UnknownReference(TagType::Make, _))
        ));
        assert!(matches!(
            validate(&config, &catalog, 1995, "Toyota", "Civic"),
            Err(ApiError::UnknownReference(TagType::Model, _))
        ));
    }

    #[tokio::test]
    async fn anonymous_garage_changes() {
        let server = test_server();
        let car = json!({ "year": 1991, "make": "Mazda", "model": "MX-5" });
        server.post("/cars").json(&car).await.assert_status(StatusCode::UNAUTHORIZED);
    }
}
