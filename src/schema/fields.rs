use super::{EmbedKind, FieldDescriptor, Kind};

pub const CERTIFICATE_STATUSES: &[&str] = &["VERIFIED", "DRAFT", "DEPRECATED"];
pub const ANNOUNCEMENT_TYPES: &[&str] = &["information", "warning", "issue"];

static STR: Kind = Kind::Str;
static TERM_REFERENCE: Kind = Kind::TermReference;
static REFERENCE: Kind = Kind::Reference;
static TAG: Kind = Kind::Tag;
static LINK: Kind = Kind::Embedded(EmbedKind::Link);
static STARRED: Kind = Kind::Struct("StarredDetails");

pub static NAME: FieldDescriptor = FieldDescriptor::new("name", Kind::Str);
pub static DISPLAY_NAME: FieldDescriptor = FieldDescriptor::new("displayName", Kind::Str);
pub static DESCRIPTION: FieldDescriptor = FieldDescriptor::new("description", Kind::Str);
pub static USER_DESCRIPTION: FieldDescriptor = FieldDescriptor::new("userDescription", Kind::Str);
pub static OWNERS: FieldDescriptor = FieldDescriptor::new("owners", Kind::Collection(&STR));
pub static OWNER_GROUPS: FieldDescriptor =
    FieldDescriptor::new("ownerGroups", Kind::Collection(&STR));
pub static CERTIFICATE_STATUS: FieldDescriptor =
    FieldDescriptor::new("certificateStatus", Kind::Enum(CERTIFICATE_STATUSES));
pub static CERTIFICATE_STATUS_MESSAGE: FieldDescriptor =
    FieldDescriptor::new("certificateStatusMessage", Kind::Str);
pub static ANNOUNCEMENT_TYPE: FieldDescriptor =
    FieldDescriptor::new("announcementType", Kind::Enum(ANNOUNCEMENT_TYPES));
pub static ANNOUNCEMENT_TITLE: FieldDescriptor =
    FieldDescriptor::new("announcementTitle", Kind::Str);
pub static ANNOUNCEMENT_MESSAGE: FieldDescriptor =
    FieldDescriptor::new("announcementMessage", Kind::Str);
pub static ASSIGNED_TERMS: FieldDescriptor =
    FieldDescriptor::new("assignedTerms", Kind::Collection(&TERM_REFERENCE));
pub static TAGS: FieldDescriptor = FieldDescriptor::new("tags", Kind::Collection(&TAG));
pub static LINKS: FieldDescriptor = FieldDescriptor::new("links", Kind::Collection(&LINK));
pub static README: FieldDescriptor =
    FieldDescriptor::new("readme", Kind::Embedded(EmbedKind::Readme));
pub static STARRED_DETAILS: FieldDescriptor =
    FieldDescriptor::new("starredDetails", Kind::Collection(&STARRED));
pub static SOURCE_PROPERTIES: FieldDescriptor =
    FieldDescriptor::new("sourceProperties", Kind::Map(&STR));
pub static POPULARITY_SCORE: FieldDescriptor =
    FieldDescriptor::new("popularityScore", Kind::Float);
pub static SOURCE_READ_COUNT: FieldDescriptor = FieldDescriptor::new("sourceReadCount", Kind::Int);
pub static IS_DISCOVERABLE: FieldDescriptor = FieldDescriptor::new("isDiscoverable", Kind::Bool);

/// Fields every record type carries.
pub static COMMON_FIELDS: &[&FieldDescriptor] = &[
    &NAME,
    &DISPLAY_NAME,
    &DESCRIPTION,
    &USER_DESCRIPTION,
    &OWNERS,
    &OWNER_GROUPS,
    &CERTIFICATE_STATUS,
    &CERTIFICATE_STATUS_MESSAGE,
    &ANNOUNCEMENT_TYPE,
    &ANNOUNCEMENT_TITLE,
    &ANNOUNCEMENT_MESSAGE,
    &ASSIGNED_TERMS,
    &TAGS,
    &LINKS,
    &README,
    &STARRED_DETAILS,
    &SOURCE_PROPERTIES,
    &POPULARITY_SCORE,
    &SOURCE_READ_COUNT,
    &IS_DISCOVERABLE,
];

pub static ANCHOR: FieldDescriptor = FieldDescriptor::new("anchor", Kind::Reference);
/// Terms in the same file may not exist until the primary flush.
pub static SEE_ALSO: FieldDescriptor =
    FieldDescriptor::new("seeAlso", Kind::Collection(&REFERENCE)).related_after_create();
pub static TABLE: FieldDescriptor = FieldDescriptor::new("table", Kind::Reference);
pub static ORDER: FieldDescriptor = FieldDescriptor::new("order", Kind::Int);
pub static SCHEMA: FieldDescriptor = FieldDescriptor::new("atlanSchema", Kind::Reference);
pub static ROW_COUNT: FieldDescriptor = FieldDescriptor::new("rowCount", Kind::Int);
pub static ASSET: FieldDescriptor = FieldDescriptor::new("asset", Kind::Reference);
pub static LINK_URL: FieldDescriptor = FieldDescriptor::new("link", Kind::Str);

static GLOSSARY_TERM_FIELDS: &[&FieldDescriptor] = &[&ANCHOR, &SEE_ALSO];
static COLUMN_FIELDS: &[&FieldDescriptor] = &[&TABLE, &ORDER];
static TABLE_FIELDS: &[&FieldDescriptor] = &[&SCHEMA, &ROW_COUNT];
static README_FIELDS: &[&FieldDescriptor] = &[&ASSET];
static LINK_FIELDS: &[&FieldDescriptor] = &[&ASSET, &LINK_URL];

/// Fields specific to a type, on top of [`COMMON_FIELDS`].
pub fn type_fields(type_tag: &str) -> &'static [&'static FieldDescriptor] {
    match type_tag {
        "GlossaryTerm" => GLOSSARY_TERM_FIELDS,
        "Column" => COLUMN_FIELDS,
        "Table" => TABLE_FIELDS,
        "Readme" => README_FIELDS,
        "Link" => LINK_FIELDS,
        _ => &[],
    }
}

/// Columns written by an export when the caller does not pick its own.
pub static DEFAULT_EXPORT_FIELDS: &[&FieldDescriptor] = &[
    &NAME,
    &DESCRIPTION,
    &USER_DESCRIPTION,
    &OWNERS,
    &OWNER_GROUPS,
    &CERTIFICATE_STATUS,
    &CERTIFICATE_STATUS_MESSAGE,
    &ANNOUNCEMENT_TYPE,
    &ANNOUNCEMENT_TITLE,
    &ANNOUNCEMENT_MESSAGE,
    &ASSIGNED_TERMS,
    &TAGS,
    &LINKS,
    &README,
    &STARRED_DETAILS,
];

/// Fields that count as enrichment when exporting enriched records only.
pub static ENRICHMENT_FIELDS: &[&FieldDescriptor] = &[
    &DESCRIPTION,
    &USER_DESCRIPTION,
    &CERTIFICATE_STATUS,
    &ANNOUNCEMENT_TYPE,
    &ASSIGNED_TERMS,
    &TAGS,
    &LINKS,
    &README,
    &STARRED_DETAILS,
];
