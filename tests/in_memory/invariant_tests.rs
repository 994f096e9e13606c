//! Universal invariants of the lexical and catalog layers.

use pgmi::catalog::{checksum, param_file, path};
use pgmi::script::{SourceMap, find_invocations, lexer};
use rstest::rstest;

#[rstest]
#[case("plain.sql")]
#[case("  a\\b//c.sql ")]
#[case("./already/canonical.sql")]
#[case("x/__test__/t.sql")]
fn path_normalization_is_a_fixed_point(#[case] input: &str) {
    let once = path::normalize(input).expect("valid path");
    let twice = path::normalize(&once).expect("still valid");
    assert_eq!(once, twice);
    assert!(once.starts_with("./"));
    assert!(!once.contains("//"));
    assert!(!once.contains('\\'));
}

#[rstest]
#[case("SELECT 1;")]
#[case("-- lone comment\n")]
#[case("a /* b\nc */ d -- e\nf")]
#[case("SELECT 'literal -- kept', $$body /* kept */$$;")]
#[case("/* nested /* deeply /* very */ */ */ SELECT 1;")]
fn stripping_preserves_line_count_and_is_idempotent(#[case] sql: &str) {
    let stripped = lexer::strip(sql);
    assert_eq!(
        stripped.matches('\n').count(),
        sql.matches('\n').count(),
        "line count changed for {sql:?}"
    );
    assert_eq!(lexer::strip(&stripped), stripped, "not idempotent for {sql:?}");
}

#[rstest]
#[case("it''s a -- trap")]
#[case("nothing special")]
#[case("/* not a comment in a string */")]
fn quoted_literals_survive_stripping_byte_exact(#[case] literal: &str) {
    let sql = format!("SELECT '{literal}' AS v; -- comment\n");
    let stripped = lexer::strip(&sql);
    assert!(
        stripped.contains(&format!("'{literal}'")),
        "literal lost in {stripped:?}"
    );
}

#[test]
fn macro_matches_come_back_in_ascending_offset_order() {
    let sql = "\
CALL pgmi_test('z');
SELECT 1;
CALL pgmi_test(NULL, 'cb');
SELECT 2;
CALL pgmi_test();
";
    let found = find_invocations(&lexer::strip(sql));
    assert_eq!(found.len(), 3);
    assert!(found.windows(2).all(|w| match w {
        [a, b] => a.start < b.start && a.end <= b.start,
        _ => true,
    }));
}

#[test]
fn checksums_keep_the_format_contract() {
    for content in ["", "x", "line one\r\nline two", &"y".repeat(10_000)] {
        let raw = checksum::raw_digest(content.as_bytes());
        let normalized = checksum::normalized_digest(content);
        assert!(checksum::is_valid_digest(&raw));
        assert!(checksum::is_valid_digest(&normalized));
    }
}

#[test]
fn source_maps_resolve_inside_and_only_inside_their_ranges() {
    let mut map = SourceMap::new();
    map.add(5, 9, "./deploy.sql", 2, "expansion");
    let mut merged = SourceMap::new();
    merged.merge(map, 100);

    assert!(merged.resolve(7).is_none());
    let (file, line, _) = merged.resolve(107).expect("shifted range");
    assert_eq!((file, line), ("./deploy.sql", 2));
    assert!(merged.resolve(110).is_none());
}

#[test]
fn parameter_files_round_trip_values_with_equals_signs() {
    let parsed = param_file::parse("a=1\nurl=postgres://h?x=1&y=2\nquoted=\" spaced \"\n")
        .expect("valid file");
    assert_eq!(
        parsed,
        vec![
            ("a".to_owned(), "1".to_owned()),
            ("url".to_owned(), "postgres://h?x=1&y=2".to_owned()),
            ("quoted".to_owned(), " spaced ".to_owned()),
        ]
    );
}
