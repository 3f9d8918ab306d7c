use crate::model::{Record, Value};

/// Materializes a deferred partial record against its owner's real id.
///
/// Readmes and links become records of their own, keyed under the owner and
/// related back to it through `asset`. Any other partial is an update of the
/// owner itself.
pub fn build_related(owner: &Record, partial: &Record) -> Record {
    let mut related = match partial.type_tag.as_str() {
        "Readme" => {
            let mut readme = Record::new("Readme", format!("{}/readme", owner.id));
            let owner_name = owner.name().unwrap_or(&owner.natural_key);
            readme.set_attribute("name", Value::Str(format!("{owner_name} Readme")));
            readme
        }
        "Link" => {
            let url = partial
                .attributes
                .get("link")
                .and_then(|state| state.value())
                .and_then(Value::as_str)
                .unwrap_or_default();
            Record::new("Link", format!("{}/link/{}", owner.id, url))
        }
        _ => {
            let mut update = partial.clone();
            update.type_tag = owner.type_tag.clone();
            update.natural_key = owner.natural_key.clone();
            update.id = owner.id.clone();
            return update;
        }
    };
    for (name, state) in &partial.attributes {
        related.attributes.insert(name.clone(), state.clone());
    }
    related.set_relation("asset", Value::Ref(owner.to_ref()));
    related
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::FieldState;

    fn owner() -> Record {
        let mut owner = Record::with_id("Table", "default/db/t1", "owner-id");
        owner.set_attribute("name", Value::Str("orders".into()));
        owner
    }

    #[test]
    fn test_readme_keyed_and_named_after_owner() {
        let mut partial = Record::new("Readme", "");
        partial.set_attribute("description", Value::Str("<h1>Orders</h1>".into()));

        let readme = build_related(&owner(), &partial);

        assert_eq!(readme.natural_key, "owner-id/readme");
        assert_eq!(readme.name(), Some("orders Readme"));
        assert!(readme.has_placeholder_id());
        let asset = readme.relations.get("asset").and_then(FieldState::value).unwrap();
        assert_eq!(asset.refs()[0].id.as_deref(), Some("owner-id"));
    }

    #[test]
    fn test_link_keyed_by_url() {
        let mut partial = Record::new("Link", "");
        partial.set_attribute("name", Value::Str("Runbook".into()));
        partial.set_attribute("link", Value::Str("https://example.com/r".into()));

        let link = build_related(&owner(), &partial);

        assert_eq!(link.natural_key, "owner-id/link/https://example.com/r");
        assert_eq!(link.name(), Some("Runbook"));
    }

    #[test]
    fn test_other_partials_update_owner() {
        let mut partial = Record::new("Table", "default/db/t1");
        partial.set_relation("seeAlso", Value::List(Vec::new()));

        let update = build_related(&owner(), &partial);

        assert_eq!(update.id, "owner-id");
        assert!(update.relations.contains_key("seeAlso"));
        assert!(!update.relations.contains_key("asset"));
    }
}
