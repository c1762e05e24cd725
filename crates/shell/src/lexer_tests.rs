// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Word splitting tests: separators, quoting, escapes, and error cases.

use super::*;
use proptest::prelude::*;

/// Generate split success tests.
///
/// ```ignore
/// split_tests! {
///     name: "input" => ["word1", "word2"],
/// }
/// ```
macro_rules! split_tests {
    ($($name:ident: $input:expr => [$($word:expr),* $(,)?]),* $(,)?) => {
        $(
            #[test]
            fn $name() {
                let words = split($input).expect(concat!("failed to split: ", $input));
                let expected: Vec<String> = vec![$($word.to_string()),*];
                assert_eq!(words, expected, "input: {:?}", $input);
            }
        )*
    };
}

// =============================================================================
// Separators
// =============================================================================

split_tests! {
    empty_input: "" => [],
    whitespace_only: " \t\n " => [],
    single_word: "make" => ["make"],
    two_words: "make all" => ["make", "all"],
    collapses_runs_of_whitespace: "  make \t  -j4\n  all " => ["make", "-j4", "all"],
    crlf_separates: "a\r\nb" => ["a", "b"],
}

// =============================================================================
// Quoting
// =============================================================================

split_tests! {
    single_quotes_group: "echo 'hello world'" => ["echo", "hello world"],
    single_quotes_are_literal: r#"echo '$HOME \n "x"'"# => ["echo", r#"$HOME \n "x""#],
    double_quotes_group: r#"make -C "my dir""# => ["make", "-C", "my dir"],
    double_quote_escapes: r#"echo "a \"b\" \\ \$c""# => ["echo", r#"a "b" \ $c"#],
    double_quote_keeps_other_backslashes: r#"echo "a\nb""# => ["echo", r"a\nb"],
    empty_quotes_make_a_word: "cmd '' \"\"" => ["cmd", "", ""],
    adjacent_pieces_join: r#"--define='copr_user x'"y"z"# => ["--define=copr_user xyz"],
    mock_style_define: "mockchain -m '--define=vendor Fedora Project' pkg.src.rpm" => [
        "mockchain", "-m", "--define=vendor Fedora Project", "pkg.src.rpm",
    ],
    unicode_survives: "echo 'héllo wörld' ✓" => ["echo", "héllo wörld", "✓"],
}

// =============================================================================
// Escapes outside quotes
// =============================================================================

split_tests! {
    backslash_escapes_space: r"touch my\ file" => ["touch", "my file"],
    backslash_escapes_quote: r"echo \'x" => ["echo", "'x"],
    line_continuation_joins: "make \\\n  all" => ["make", "all"],
    continuation_inside_word: "ab\\\ncd" => ["abcd"],
    continuation_inside_double_quotes: "\"ab\\\ncd\"" => ["abcd"],
    lone_continuation: "\\\n" => [],
}

// =============================================================================
// Spans and errors
// =============================================================================

#[test]
fn word_spans_cover_quotes() {
    let input = r#"make "a b" c"#;
    let words = Lexer::tokenize(input).unwrap();
    assert_eq!(words.len(), 3);
    assert_eq!(words[1].text, "a b");
    assert_eq!(words[1].span.slice(input), r#""a b""#);
    assert_eq!(words[2].span, Span::new(11, 12));
}

#[test]
fn long_runs_of_bare_continuations_are_skipped() {
    let input = format!("{}make", "\\\n ".repeat(200_000));
    assert_eq!(split(&input).unwrap(), vec!["make".to_string()]);
}

#[yare::parameterized(
    single_quote = { "echo 'oops", LexerError::UnterminatedSingleQuote { span: Span::new(5, 10) } },
    double_quote = { "echo \"oops", LexerError::UnterminatedDoubleQuote { span: Span::new(5, 10) } },
    trailing_backslash = { "echo \\", LexerError::TrailingBackslash { span: Span::new(5, 6) } },
    backslash_inside_open_double = { "\"a\\", LexerError::UnterminatedDoubleQuote { span: Span::new(0, 3) } },
)]
fn errors(input: &str, expected: LexerError) {
    assert_eq!(split(input).unwrap_err(), expected);
}

fn plain_word() -> impl Strategy<Value = String> {
    "[A-Za-z0-9_./=:+-]{1,12}"
}

proptest! {
    #[test]
    fn plain_words_split_on_whitespace(words in proptest::collection::vec(plain_word(), 0..8)) {
        let input = words.join(" ");
        prop_assert_eq!(split(&input).unwrap(), words);
    }

    #[test]
    fn single_quoting_preserves_any_text_without_quotes(text in "[^']{0,24}") {
        let input = format!("cmd '{}'", text);
        prop_assert_eq!(split(&input).unwrap(), vec!["cmd".to_string(), text]);
    }
}
