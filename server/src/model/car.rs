use crate::model::user::User;
use crate::schema::car;
use crate::time::DateTime;
use diesel::pg::Pg;
use diesel::prelude::*;

#[derive(Insertable)]
#[diesel(table_name = car)]
#[diesel(check_for_backend(Pg))]
pub struct NewCar<'a> {
    pub user_id: i64,
    pub year: i32,
    pub make: &'a str,
    pub model: &'a str,
    pub trim: Option<&'a str>,
    pub color: Option<&'a str>,
    pub drivetrain: Option<&'a str>,
    pub transmission: Option<&'a str>,
}

#[derive(Clone, AsChangeset, Associations, Identifiable, Queryable, Selectable)]
#[diesel(treat_none_as_null = true)]
#[diesel(belongs_to(User))]
#[diesel(table_name = car)]
#[diesel(check_for_backend(Pg))]
pub struct Car {
    pub id: i64,
    pub user_id: i64,
    pub year: i32,
    pub make: String,
    pub model: String,
    pub trim: Option<String>,
    pub color: Option<String>,
    pub drivetrain: Option<String>,
    pub transmission: Option<String>,
    pub creation_time: DateTime,
    pub last_edit_time: DateTime,
}
