use crate::model::car::Car;
use crate::resource::BoolFill;
use crate::time::DateTime;
use serde::Serialize;
use serde_with::skip_serializing_none;
use strum::{EnumString, EnumTable};

#[derive(Clone, Copy, EnumString, EnumTable)]
#[strum(serialize_all = "camelCase")]
pub enum Field {
    Version,
    Id,
    Year,
    Make,
    Model,
    Trim,
    Color,
    Drivetrain,
    Transmission,
    CreationTime,
}

impl BoolFill for FieldTable<bool> {
    fn filled(val: bool) -> Self {
        Self::filled(val)
    }
}

/// A car in a user's garage.
#[skip_serializing_none]
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarInfo {
    version: Option<DateTime>,
    id: Option<i64>,
    year: Option<i32>,
    make: Option<String>,
    model: Option<String>,
    trim: Option<Option<String>>,
    color: Option<Option<String>>,
    drivetrain: Option<Option<String>>,
    transmission: Option<Option<String>>,
    creation_time: Option<DateTime>,
}

impl CarInfo {
    pub fn new(car: Car, fields: &FieldTable<bool>) -> Self {
        Self {
            version: fields[Field::Version].then_some(car.last_edit_time),
            id: fields[Field::Id].then_some(car.id),
            year: fields[Field::Year].then_some(car.year),
            make: fields[Field::Make].then_some(car.make),
            model: fields[Field::Model].then_some(car.model),
            trim: fields[Field::Trim].then_some(car.trim),
            color: fields[Field::Color].then_some(car.color),
            drivetrain: fields[Field::Drivetrain].then_some(car.drivetrain),
            transmission: fields[Field::Transmission].then_some(car.transmission),
            creation_time: fields[Field::CreationTime].then_some(car.creation_time),
        }
    }
}
