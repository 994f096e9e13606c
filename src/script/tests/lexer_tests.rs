//! Comment stripper tests.

use crate::script::lexer::strip;
use rstest::rstest;

fn newline_count(s: &str) -> usize {
    s.matches('\n').count()
}

#[test]
fn removes_line_comments_but_keeps_the_newline() {
    let sql = "SELECT 1; -- trailing\nSELECT 2;";
    assert_eq!(strip(sql), "SELECT 1; \nSELECT 2;");
}

#[test]
fn removes_block_comments_and_keeps_token_separation() {
    assert_eq!(strip("SELECT/*x*/1;"), "SELECT 1;");
}

#[test]
fn nested_block_comments_close_only_at_depth_zero() {
    let sql = "a /* outer /* inner */ still outer */ b";
    assert_eq!(strip(sql), "a   b");
}

#[test]
fn newlines_inside_comments_survive() {
    let sql = "a /* one\ntwo\nthree */ b\n-- tail\nc";
    let stripped = strip(sql);
    assert_eq!(newline_count(&stripped), newline_count(sql));
    assert_eq!(stripped, "a  \n\n b\n\nc");
}

#[rstest]
#[case("SELECT '-- not a comment';")]
#[case("SELECT 'a /* neither */ b';")]
#[case("SELECT 'it''s quoted -- still';")]
fn single_quoted_literals_pass_through_byte_exact(#[case] sql: &str) {
    assert_eq!(strip(sql), sql);
}

#[rstest]
#[case("DO $$ BEGIN -- not stripped\nEND $$;")]
#[case("SELECT $tag$ /* kept */ $nested$ $tag$;")]
#[case("SELECT $_t1$body$_t1$;")]
fn dollar_quoted_bodies_pass_through_byte_exact(#[case] sql: &str) {
    assert_eq!(strip(sql), sql);
}

#[test]
fn a_lone_dollar_is_not_a_quote_opener() {
    let sql = "SELECT $1 + $2; -- positional\n";
    assert_eq!(strip(sql), "SELECT $1 + $2; \n");
}

#[rstest]
#[case("")]
#[case("SELECT 1;")]
#[case("-- only a comment")]
#[case("a /* b */ c -- d\ne '--' $$--$$")]
#[case("BEGIN;\nCALL pgmi_test();\nCOMMIT;")]
fn stripping_preserves_line_count(#[case] sql: &str) {
    assert_eq!(newline_count(&strip(sql)), newline_count(sql));
}

#[rstest]
#[case("a /* b */ c")]
#[case("-/*x*/- adjacent dashes stay separated")]
#[case("SELECT 'lit' /* c */ -- d\n;")]
fn stripping_is_idempotent(#[case] sql: &str) {
    let once = strip(sql);
    assert_eq!(strip(&once), once);
}

#[test]
fn crlf_line_comments_keep_their_line_ending() {
    let sql = "SELECT 1; -- c\r\nSELECT 2;";
    assert_eq!(strip(sql), "SELECT 1; \r\nSELECT 2;");
}

#[test]
fn unterminated_block_comment_consumes_to_end() {
    assert_eq!(strip("a /* never closed"), "a  ");
}

#[test]
fn unterminated_literal_consumes_to_end() {
    let sql = "SELECT 'open";
    assert_eq!(strip(sql), sql);
}
