use crate::api::error::{ApiError, ApiResult};
use crate::config::{Config, TagPolicy};
use crate::model::enums::TagType;
use crate::model::post::NewPostTag;
use crate::model::tag::NewTag;
use crate::reference::ReferenceData;
use crate::schema::{post_tag, tag};
use crate::string::SmallString;
use diesel::{ExpressionMethods, PgConnection, QueryDsl, QueryResult, RunQueryDsl};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// The tags requested for a post, at most one value per tag type.
/// Deserializes from objects like `{ "year": "2023", "make": "Toyota" }`.
pub type TagSelection = BTreeMap<TagType, SmallString>;

/// Normalizes a tag selection by trimming values and dropping blank ones.
///
/// A model year alone is too ambiguous to identify a vehicle, so a selection
/// containing both a year and a model must also contain a make.
pub fn validate(selection: TagSelection) -> ApiResult<Vec<(TagType, SmallString)>> {
    let tags: Vec<_> = selection
        .into_iter()
        .map(|(tag_type, name)| (tag_type, name.trimmed()))
        .filter(|(_, name)| !name.is_empty())
        .collect();

    let has = |tag_type: TagType| tags.iter().any(|&(present, _)| present == tag_type);
    if has(TagType::Year) && has(TagType::Model) && !has(TagType::Make) {
        return Err(ApiError::MissingMake);
    }
    Ok(tags)
}

/// Checks vehicle names against the reference catalog when the curated tag policy is active.
/// Trims, drivetrains and transmissions are never restricted.
pub fn verify_reference(
    config: &Config,
    reference: &dyn ReferenceData,
    tags: &[(TagType, SmallString)],
) -> ApiResult<()> {
    if config.tag_policy == TagPolicy::Open {
        return Ok(());
    }

    let make = tags
        .iter()
        .find(|&&(tag_type, _)| tag_type == TagType::Make)
        .map(|(_, name)| name.as_str());
    for (tag_type, name) in tags {
        let known = match tag_type {
            TagType::Year => name.parse().is_ok_and(|year| reference.is_valid_year(year)),
            TagType::Make => reference.is_valid_make(name),
            TagType::Model => match make {
                Some(make) => reference.is_valid_model(make, name),
                None => reference.makes().into_iter().any(|make| reference.is_valid_model(make, name)),
            },
            TagType::Trim | TagType::Drivetrain | TagType::Transmission => true,
        };
        if !known {
            return Err(ApiError::UnknownReference(*tag_type, name.clone()));
        }
    }
    Ok(())
}

/// Returns the ids of the given tags, creating any that don't exist yet.
///
/// Concurrent requests creating the same tag both succeed and receive the same id.
pub fn get_or_create_ids(conn: &mut PgConnection, tags: &[(TagType, SmallString)]) -> QueryResult<Vec<i64>> {
    tags.iter()
        .map(|(category, name)| {
            diesel::insert_into(tag::table)
                .values(NewTag {
                    name: name.as_str(),
                    category: *category,
                })
                .on_conflict((tag::name, tag::category))
                .do_nothing()
                .execute(conn)?;
            tag::table
                .select(tag::id)
                .filter(tag::name.eq(name.as_str()))
                .filter(tag::category.eq(*category))
                .first(conn)
        })
        .collect()
}

/// Replaces all tags on the post with id `post_id`.
pub fn set_post_tags(conn: &mut PgConnection, post_id: i64, tag_ids: &[i64]) -> QueryResult<()> {
    diesel::delete(post_tag::table)
        .filter(post_tag::post_id.eq(post_id))
        .execute(conn)?;

    let new_post_tags: Vec<_> = tag_ids
        .iter()
        .map(|&tag_id| NewPostTag { post_id, tag_id })
        .collect();
    diesel::insert_into(post_tag::table)
        .values(new_post_tags)
        .on_conflict_do_nothing()
        .execute(conn)?;
    Ok(())
}

/// Returns every distinct name used by tags of the given type.
/// Years are listed newest first. Everything else is alphabetical.
pub fn unique_values(conn: &mut PgConnection, tag_type: TagType) -> QueryResult<Vec<SmallString>> {
    let mut names: Vec<SmallString> = tag::table
        .select(tag::name)
        .filter(tag::category.eq(tag_type))
        .distinct()
        .order_by(tag::name.asc())
        .load(conn)?;
    if tag_type == TagType::Year {
        names.sort_by(|a, b| compare_years(a, b));
    }
    Ok(names)
}

/// Orders year names numerically, newest first. Names that aren't integers
/// can exist under the open tag policy and are placed last.
fn compare_years(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(a), Ok(b)) => b.cmp(&a),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.cmp(b),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::config;
    use crate::reference::StaticCatalog;
    use crate::test::*;
    use serial_test::serial;

    fn selection(pairs: &[(TagType, &str)]) -> TagSelection {
        pairs
            .iter()
            .map(|&(tag_type, name)| (tag_type, SmallString::new(name)))
            .collect()
    }

    #[test]
    fn make_required() {
        let missing_make = selection(&[(TagType::Year, "2023"), (TagType::Model, "Camry")]);
        assert!(matches!(validate(missing_make), Err(ApiError::MissingMake)));

        let blank_make = selection(&[(TagType::Year, "2023"), (TagType::Make, "  "), (TagType::Model, "Camry")]);
        assert!(matches!(validate(blank_make), Err(ApiError::MissingMake)));

        let complete = selection(&[(TagType::Year, "2023"), (TagType::Make, "Toyota"), (TagType::Model, "Camry")]);
        assert_eq!(validate(complete).unwrap().len(), 3);

        let year_only = selection(&[(TagType::Year, "2023")]);
        assert!(validate(year_only).is_ok());
        let model_only = selection(&[(TagType::Model, "Camry")]);
        assert!(validate(model_only).is_ok());
    }

    #[test]
    fn normalization() {
        let tags = validate(selection(&[(TagType::Make, " Honda "), (TagType::Trim, ""), (TagType::Year, "1999")]))
            .unwrap();
        assert_eq!(
            tags,
            vec![(TagType::Year, SmallString::new("1999")), (TagType::Make, SmallString::new("Honda"))]
        );
    }

    #[test]
    fn selection_from_json() {
        let parsed: TagSelection = serde_json::from_str(r#"{ "make": "Mazda", "drivetrain": "RWD" }"#).unwrap();
        assert_eq!(parsed.get(&TagType::Make).map(SmallString::as_str), Some("Mazda"));
        assert!(serde_json::from_str::<TagSelection>(r#"{ "color": "red" }"#).is_err());
    }

    #[test]
    fn year_ordering() {
        let mut years = vec!["1999a", "99", "2004", "1999", "800", "Classic"];
        years.sort_by(|a, b| compare_years(a, b));
        assert_eq!(years, ["2004", "1999", "800", "99", "1999a", "Classic"]);
    }

    #[test]
    fn curated_policy() {
        let catalog = StaticCatalog::default();
        let open = config::test_config(Some(TagPolicy::Open));
        let curated = config::test_config(Some(TagPolicy::Curated));

        let unknown_make = validate(selection(&[(TagType::Make, "Yugo")])).unwrap();
        assert!(verify_reference(&open, &catalog, &unknown_make).is_ok());
        assert!(matches!(
            verify_reference(&curated, &catalog, &unknown_make),
            Err(ApiError::UnknownReference(TagType::Make, _))
        ));

        let mismatched = validate(selection(&[(TagType::Make, "Honda"), (TagType::Model, "Camry")])).unwrap();
        assert!(verify_reference(&curated, &catalog, &mismatched).is_err());

        let known = validate(selection(&[
            (TagType::Year, "2004"),
            (TagType::Make, "Subaru"),
            (TagType::Model, "WRX STI"),
            (TagType::Transmission, "6MT"),
        ]))
        .unwrap();
        assert!(verify_reference(&curated, &catalog, &known).is_ok());

        let model_without_make = validate(selection(&[(TagType::Model, "Supra")])).unwrap();
        assert!(verify_reference(&curated, &catalog, &model_without_make).is_ok());

        let bad_year = validate(selection(&[(TagType::Year, "nineteen")])).unwrap();
        assert!(verify_reference(&curated, &catalog, &bad_year).is_err());
        assert!(verify_reference(&open, &catalog, &bad_year).is_ok());
    }

    #[test]
    #[serial]
    fn get_or_create() {
        test_transaction(|conn| {
            let tags = vec![
                (TagType::Model, SmallString::new("2023 Special")),
                (TagType::Trim, SmallString::new("2023 Special")),
            ];
            let first = get_or_create_ids(conn, &tags)?;
            let second = get_or_create_ids(conn, &tags)?;
            assert_eq!(first, second);
            assert_ne!(first[0], first[1]);

            let models = unique_values(conn, TagType::Model)?;
            assert!(models.iter().any(|name| name.as_str() == "2023 Special"));
            Ok(())
        });
    }

    #[test]
    #[serial]
    fn years_newest_first() {
        test_transaction(|conn| {
            let years = ["99", "2004", "1999"].map(|year| (TagType::Year, SmallString::new(year)));
            get_or_create_ids(conn, &years)?;

            let listed = unique_values(conn, TagType::Year)?;
            let position = |year: &str| listed.iter().position(|name| name.as_str() == year);
            assert!(position("2004").is_some());
            assert!(position("2004") < position("1999"));
            assert!(position("1999") < position("99"));
            Ok(())
        });
    }
}
