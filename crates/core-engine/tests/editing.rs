mod common;

use common::{cursor, engine_with, engine_with_config, feed, line, lines};
use core_engine::{EngineConfig, Mode, RegisterKind};
use pretty_assertions::assert_eq;

const FOUR_LINES: &[&str] = &[
    "First line of text",
    "Second line with more text",
    "Third line is here",
    "Fourth and final line",
];

#[test]
fn count_prefixed_motions() {
    let mut engine = engine_with(FOUR_LINES);
    feed(&mut engine, "3j");
    assert_eq!(cursor(&engine), (4, 0));
    feed(&mut engine, "gg");
    assert_eq!(cursor(&engine), (1, 0));
    feed(&mut engine, "5l");
    assert_eq!(cursor(&engine), (1, 5));
}

#[test]
fn gg_with_count_targets_line() {
    let mut engine = engine_with(FOUR_LINES);
    feed(&mut engine, "G");
    assert_eq!(cursor(&engine), (4, 0));
    feed(&mut engine, "3gg");
    assert_eq!(cursor(&engine), (3, 0));
    feed(&mut engine, "gg");
    assert_eq!(cursor(&engine), (1, 0));
}

#[test]
fn dw_deletes_word_and_trailing_space() {
    let mut engine = engine_with(FOUR_LINES);
    engine.set_cursor(1, 6);
    feed(&mut engine, "dw");
    assert_eq!(line(&engine, 1), "First of text");
    assert_eq!(cursor(&engine), (1, 6));
    assert_eq!(engine.register().text, "line ");
    assert_eq!(engine.register().kind, RegisterKind::Charwise);
}

#[test]
fn dd_removes_line_and_lands_on_successor() {
    let mut engine = engine_with(FOUR_LINES);
    engine.set_cursor(2, 5);
    feed(&mut engine, "dd");
    assert_eq!(
        lines(&engine),
        vec!["First line of text", "Third line is here", "Fourth and final line"]
    );
    assert_eq!(cursor(&engine), (2, 0));
    assert_eq!(engine.register().text, "Second line with more text");
    assert_eq!(engine.register().kind, RegisterKind::Linewise);
}

#[test]
fn dd_with_count_takes_multiple_lines() {
    let mut engine = engine_with(FOUR_LINES);
    feed(&mut engine, "2dd");
    assert_eq!(
        lines(&engine),
        vec!["Third line is here", "Fourth and final line"]
    );
    assert_eq!(
        engine.register().text,
        "First line of text\nSecond line with more text"
    );
}

#[test]
fn dd_on_only_line_leaves_one_empty_line() {
    let mut engine = engine_with(&["solo"]);
    feed(&mut engine, "dd");
    assert_eq!(lines(&engine), vec![""]);
    assert_eq!(cursor(&engine), (1, 0));
}

#[test]
fn yank_word_then_paste_charwise() {
    let mut engine = engine_with(FOUR_LINES);
    engine.set_cursor(3, 6);
    feed(&mut engine, "yw");
    assert_eq!(engine.register().text, "line ");
    assert_eq!(cursor(&engine), (3, 6));
    engine.set_cursor(4, 6);
    feed(&mut engine, "p");
    assert_eq!(line(&engine, 4), "Fourth line and final line");
    assert_eq!(cursor(&engine), (4, 11));
}

#[test]
fn yank_line_then_paste_linewise() {
    let mut engine = engine_with(&["alpha", "beta"]);
    feed(&mut engine, "yy");
    assert_eq!(engine.register().kind, RegisterKind::Linewise);
    feed(&mut engine, "jp");
    assert_eq!(lines(&engine), vec!["alpha", "beta", "alpha"]);
    assert_eq!(cursor(&engine), (3, 0));
}

#[test]
fn cw_changes_word_without_trailing_space() {
    let mut engine = engine_with(FOUR_LINES);
    engine.set_cursor(1, 6);
    feed(&mut engine, "cw");
    assert_eq!(engine.mode(), Mode::Insert);
    assert_eq!(line(&engine, 1), "First  of text");
    feed(&mut engine, "word<esc>");
    assert_eq!(line(&engine, 1), "First word of text");
    assert_eq!(cursor(&engine), (1, 9));
}

#[test]
fn change_to_end_of_line() {
    let mut engine = engine_with(&["hello world"]);
    engine.set_cursor(1, 6);
    feed(&mut engine, "c$there<esc>");
    assert_eq!(line(&engine, 1), "hello there");
}

#[test]
fn cc_blanks_line_and_inserts() {
    let mut engine = engine_with(&["one", "two", "three"]);
    engine.set_cursor(2, 2);
    feed(&mut engine, "ccTWO<esc>");
    assert_eq!(lines(&engine), vec!["one", "TWO", "three"]);
}

#[test]
fn x_deletes_count_chars() {
    let mut engine = engine_with(&["abcdef"]);
    feed(&mut engine, "3x");
    assert_eq!(line(&engine, 1), "def");
    assert_eq!(engine.register().text, "abc");
    assert_eq!(cursor(&engine), (1, 0));
}

#[test]
fn replace_char_with_count() {
    let mut engine = engine_with(&["abc"]);
    feed(&mut engine, "2ra");
    assert_eq!(line(&engine, 1), "aac");
    assert_eq!(cursor(&engine), (1, 1));
}

#[test]
fn replace_past_line_end_is_a_no_op() {
    let mut engine = engine_with(&["abc"]);
    feed(&mut engine, "5rz");
    assert_eq!(line(&engine, 1), "abc");
}

#[test]
fn tilde_toggles_case_and_advances() {
    let mut engine = engine_with(&["abc"]);
    feed(&mut engine, "~");
    assert_eq!(line(&engine, 1), "Abc");
    assert_eq!(cursor(&engine), (1, 1));
    feed(&mut engine, "~~");
    assert_eq!(line(&engine, 1), "ABC");
    // Cursor pinned to the last char once it runs out of line.
    assert_eq!(cursor(&engine), (1, 2));
}

#[test]
fn substitute_deletes_then_inserts_as_one_undo_step() {
    let mut engine = engine_with(&["abc"]);
    feed(&mut engine, "sX<esc>");
    assert_eq!(line(&engine, 1), "Xbc");
    assert_eq!(cursor(&engine), (1, 0));
    feed(&mut engine, "u");
    assert_eq!(line(&engine, 1), "abc");
}

#[test]
fn open_below_and_above() {
    let mut engine = engine_with(&["first", "second"]);
    feed(&mut engine, "onew<esc>");
    assert_eq!(lines(&engine), vec!["first", "new", "second"]);
    assert_eq!(cursor(&engine), (2, 2));
    feed(&mut engine, "Otop<esc>");
    assert_eq!(lines(&engine), vec!["first", "top", "new", "second"]);
    assert_eq!(cursor(&engine), (2, 2));
}

#[test]
fn delete_to_line_ends() {
    let mut engine = engine_with(&["abcdef"]);
    engine.set_cursor(1, 2);
    feed(&mut engine, "d$");
    assert_eq!(line(&engine, 1), "ab");
    assert_eq!(cursor(&engine), (1, 1));
    let mut engine = engine_with(&["abcdef"]);
    engine.set_cursor(1, 3);
    feed(&mut engine, "d0");
    assert_eq!(line(&engine, 1), "def");
    assert_eq!(cursor(&engine), (1, 0));
}

#[test]
fn delete_to_word_end_is_inclusive() {
    let mut engine = engine_with(FOUR_LINES);
    engine.set_cursor(1, 6);
    feed(&mut engine, "de");
    assert_eq!(line(&engine, 1), "First  of text");
    assert_eq!(cursor(&engine), (1, 6));
}

#[test]
fn delete_word_backward() {
    let mut engine = engine_with(FOUR_LINES);
    engine.set_cursor(1, 11);
    feed(&mut engine, "db");
    assert_eq!(line(&engine, 1), "First of text");
    assert_eq!(cursor(&engine), (1, 6));
}

#[test]
fn generic_compose_with_backward_motion() {
    let mut engine = engine_with(&["abcdef"]);
    engine.set_cursor(1, 2);
    feed(&mut engine, "dh");
    assert_eq!(line(&engine, 1), "acdef");
    assert_eq!(cursor(&engine), (1, 1));
}

#[test]
fn generic_compose_across_lines_joins() {
    let mut engine = engine_with(&["alpha beta", "gamma delta"]);
    engine.set_cursor(1, 6);
    feed(&mut engine, "dj");
    assert_eq!(lines(&engine), vec!["alpha delta"]);
    assert_eq!(cursor(&engine), (1, 6));
}

#[test]
fn shift_commands_honor_shift_width() {
    let mut engine = engine_with(&["foo", "bar"]);
    feed(&mut engine, ">>");
    assert_eq!(line(&engine, 1), "    foo");
    assert_eq!(cursor(&engine), (1, 4));
    feed(&mut engine, "2>>");
    assert_eq!(lines(&engine), vec!["        foo", "    bar"]);
    feed(&mut engine, "<<");
    assert_eq!(line(&engine, 1), "    foo");
}

#[test]
fn shift_uses_tab_when_expand_tab_off() {
    let config = EngineConfig {
        expand_tab: false,
        ..EngineConfig::default()
    };
    let mut engine = engine_with_config(&["foo"], config);
    feed(&mut engine, ">>");
    assert_eq!(line(&engine, 1), "\tfoo");
    feed(&mut engine, "<<");
    assert_eq!(line(&engine, 1), "foo");
}

#[test]
fn indent_skips_empty_lines() {
    let mut engine = engine_with(&["foo", "", "bar"]);
    feed(&mut engine, "3>>");
    assert_eq!(lines(&engine), vec!["    foo", "", "    bar"]);
}

#[test]
fn percent_jumps_between_brackets() {
    let mut engine = engine_with(&["if (a == b) {"]);
    engine.set_cursor(1, 3);
    feed(&mut engine, "%");
    assert_eq!(cursor(&engine), (1, 10));
    feed(&mut engine, "%");
    assert_eq!(cursor(&engine), (1, 3));
}

#[test]
fn percent_hunts_for_a_bracket_on_the_line() {
    let mut engine = engine_with(&["if (a == b) {"]);
    // Not on a bracket: scan right finds '(' and jumps to its match.
    feed(&mut engine, "%");
    assert_eq!(cursor(&engine), (1, 10));
}

#[test]
fn huge_counts_saturate_instead_of_overflowing() {
    let mut engine = engine_with(&["abc", "def"]);
    let digits = "9".repeat(30);
    feed(&mut engine, &digits);
    feed(&mut engine, "j");
    assert_eq!(cursor(&engine), (2, 0));
    feed(&mut engine, &digits);
    feed(&mut engine, "x");
    assert_eq!(line(&engine, 2), "");

    let mut engine = engine_with(&["abcdef"]);
    feed(&mut engine, "v");
    feed(&mut engine, &digits);
    feed(&mut engine, "ly");
    assert_eq!(engine.register().text, "abcdef");
}

#[test]
fn dot_repeats_char_delete() {
    let mut engine = engine_with(&["abcd"]);
    feed(&mut engine, "x.");
    assert_eq!(line(&engine, 1), "cd");
}

#[test]
fn dot_repeats_dd_and_insert() {
    let mut engine = engine_with(&["one", "two", "three", "four"]);
    feed(&mut engine, "dd.");
    assert_eq!(lines(&engine), vec!["three", "four"]);

    let mut engine = engine_with(&["x y"]);
    feed(&mut engine, "iab<esc>");
    assert_eq!(line(&engine, 1), "abx y");
    engine.set_cursor(1, 4);
    feed(&mut engine, ".");
    assert_eq!(line(&engine, 1), "abx aby");
}

#[test]
fn dot_repeats_open_below() {
    let mut engine = engine_with(&["top", "bottom"]);
    feed(&mut engine, "omid<esc>");
    feed(&mut engine, ".");
    assert_eq!(lines(&engine), vec!["top", "mid", "mid", "bottom"]);
}
