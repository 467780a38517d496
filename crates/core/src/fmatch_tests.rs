// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    star            = { "*", "anything.dat", true },
    xml_upper       = { "*.XML", "zhobtmind_20240519_1.xml", true },
    xml_lower       = { "*.xml", "SURF.XML", true },
    csv_first       = { "*.TXT,*.XML", "a.txt", true },
    csv_second      = { "*.TXT,*.XML", "a.xml", true },
    csv_miss        = { "*.TXT,*.XML", "a.json", false },
    prefix          = { "ZHOBTCODE_*.xml", "ZHOBTCODE_20240519162835_togxpt_1.xml", true },
    prefix_miss     = { "ZHOBTCODE_*.xml", "ZHOBTMIND_20240519162835_togxpt_1.xml", false },
    gz              = { "*.gz", "app.log.20240518.gz", true },
    spaces_in_csv   = { "*.TXT, *.XML", "a.xml", true },
)]
fn matching(patterns: &str, name: &str, expected: bool) {
    let matcher = NameMatcher::new(patterns).unwrap();
    assert_eq!(matcher.matches(name), expected);
}

#[test]
fn bad_pattern_is_an_error() {
    assert!(NameMatcher::new("[").is_err());
}
