// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

const BUFFER: &str = "<connstr>/data/db/source.db</connstr><timetvl>10</timetvl>\
                      <andchild>true</andchild><port>5005</port><empty></empty>";

#[test]
fn extracts_string_values() {
    assert_eq!(
        tag_str(BUFFER, "connstr").as_deref(),
        Some("/data/db/source.db")
    );
    assert_eq!(tag_str(BUFFER, "missing"), None);
    assert_eq!(tag_str(BUFFER, "empty").as_deref(), Some(""));
}

#[test]
fn extracts_numbers_and_bools() {
    assert_eq!(tag_u64(BUFFER, "timetvl"), Some(10));
    assert_eq!(tag_u16(BUFFER, "port"), Some(5005));
    assert!(tag_bool(BUFFER, "andchild"));
    assert!(!tag_bool(BUFFER, "missing"));
    assert!(!tag_bool("<andchild>yes</andchild>", "andchild"));
}

#[test]
fn unknown_tags_are_ignored() {
    // A buffer full of tags we never ask about parses fine.
    let buffer = "<future>1</future><connstr>x</connstr>";
    assert_eq!(tag_str(buffer, "connstr").as_deref(), Some("x"));
}

#[test]
fn require_rejects_missing_and_empty() {
    assert!(matches!(
        require_tag(BUFFER, "missing"),
        Err(ConfigError::Missing("missing"))
    ));
    assert!(matches!(
        require_tag(BUFFER, "empty"),
        Err(ConfigError::Missing("empty"))
    ));
    assert_eq!(require_tag(BUFFER, "connstr").unwrap(), "/data/db/source.db");
}

#[yare::parameterized(
    plain    = { "<a>v</a>", "a", Some("v") },
    first_of_two = { "<a>1</a><a>2</a>", "a", Some("1") },
    unclosed = { "<a>v", "a", None },
    angle_in_value = { "<sql>select 1 from t where x<2 </sql>", "sql", Some("select 1 from t where x<2 ") },
)]
fn tag_extraction(buffer: &str, name: &str, expected: Option<&str>) {
    assert_eq!(tag_str(buffer, name).as_deref(), expected);
}
