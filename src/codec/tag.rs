use crate::model::{Propagation, TagAssignment};

/// Separates a tag's name from its propagation mode.
pub const TAG_SEPARATOR: &str = ">>";

/// Inherited tags encode as empty text.
pub(super) fn encode(owner_id: &str, assignment: &TagAssignment) -> String {
    if !assignment.is_direct_on(owner_id) {
        return String::new();
    }
    format!(
        "{}{}{}",
        assignment.tag_name,
        TAG_SEPARATOR,
        assignment.propagation.as_str()
    )
}

pub(super) fn decode(text: &str) -> TagAssignment {
    let mut tokens = text.split(TAG_SEPARATOR);
    let tag_name = tokens.next().unwrap_or_default();
    let propagation = tokens.next().map(Propagation::parse).unwrap_or_default();
    TagAssignment::direct(tag_name, propagation)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_modes() {
        assert_eq!(decode("PII>>FULL").propagation, Propagation::Full);
        assert_eq!(decode("PII>>hierarchy_only").propagation, Propagation::HierarchyOnly);
        assert_eq!(decode("PII>>").propagation, Propagation::None);
        assert_eq!(decode("PII").propagation, Propagation::None);
        assert_eq!(decode("PII>>SIDEWAYS").propagation, Propagation::None);
        assert_eq!(decode("PII>>FULL").tag_name, "PII");
    }

    #[test]
    fn test_encode_only_direct_assignments() {
        let direct = TagAssignment {
            tag_name: "PII".into(),
            propagation: Propagation::Full,
            origin: Some("a1".into()),
        };
        assert_eq!(encode("a1", &direct), "PII>>FULL");
        assert_eq!(encode("a2", &direct), "");
        assert_eq!(
            encode("a2", &TagAssignment::direct("PII", Propagation::None)),
            "PII>>"
        );
    }
}
