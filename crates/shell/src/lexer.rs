// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Word splitter for build command strings.

use crate::error::LexerError;
use crate::span::Span;

/// One argv entry with the source range it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub text: String,
    pub span: Span,
}

/// Split a command string into argv.
///
/// Empty or whitespace-only input yields an empty vector; callers decide
/// whether that is an error.
pub fn split(input: &str) -> Result<Vec<String>, LexerError> {
    Ok(Lexer::tokenize(input)?.into_iter().map(|w| w.text).collect())
}

/// Shell word lexer.
///
/// Unquoted whitespace separates words. Single quotes preserve everything
/// literally. Inside double quotes a backslash escapes only `\`, `"`, `$`,
/// `` ` `` and newline; before any other character it is kept. Outside quotes
/// a backslash escapes the next character, and backslash-newline is a line
/// continuation. Adjacent quoted and unquoted pieces join into one word.
pub struct Lexer<'a> {
    /// The input string being lexed.
    input: &'a str,
    /// Peekable iterator over character indices.
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self { input, chars: input.char_indices().peekable() }
    }

    /// Tokenize the entire input into words.
    pub fn tokenize(input: &str) -> Result<Vec<Word>, LexerError> {
        let mut lexer = Lexer::new(input);
        let mut words = Vec::new();
        while let Some(word) = lexer.next_word()? {
            words.push(word);
        }
        Ok(words)
    }

    #[inline]
    fn peek_char(&mut self) -> Option<char> {
        self.chars.peek().map(|(_, c)| *c)
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek_char() {
            if !is_separator(ch) {
                break;
            }
            self.chars.next();
        }
    }

    /// Lex the next word, or `None` at end of input.
    pub fn next_word(&mut self) -> Result<Option<Word>, LexerError> {
        loop {
            self.skip_whitespace();
            let Some(&(start, _)) = self.chars.peek() else {
                return Ok(None);
            };

            let mut text = String::new();
            // A quoted empty string (`''`) still produces a word.
            let mut has_word = false;
            let mut end = start;

            while let Some(&(pos, ch)) = self.chars.peek() {
                match ch {
                    c if is_separator(c) => break,
                    '\'' => {
                        end = self.lex_single_quote(pos, &mut text)?;
                        has_word = true;
                    }
                    '"' => {
                        end = self.lex_double_quote(pos, &mut text)?;
                        has_word = true;
                    }
                    '\\' => {
                        self.chars.next();
                        match self.chars.next() {
                            Some((_, '\n')) => {}
                            Some((esc_pos, esc)) => {
                                text.push(esc);
                                has_word = true;
                                end = esc_pos + esc.len_utf8();
                            }
                            None => {
                                return Err(LexerError::TrailingBackslash {
                                    span: Span::new(pos, pos + 1),
                                })
                            }
                        }
                    }
                    _ => {
                        text.push(ch);
                        has_word = true;
                        end = pos + ch.len_utf8();
                        self.chars.next();
                    }
                }
            }

            if has_word {
                return Ok(Some(Word { text, span: Span::new(start, end) }));
            }
            // Only line continuations were consumed; keep scanning.
        }
    }

    /// Consume `'...'`, appending its contents. Returns the end offset.
    fn lex_single_quote(&mut self, start: usize, out: &mut String) -> Result<usize, LexerError> {
        self.chars.next();
        for (pos, ch) in self.chars.by_ref() {
            if ch == '\'' {
                return Ok(pos + 1);
            }
            out.push(ch);
        }
        Err(LexerError::UnterminatedSingleQuote { span: Span::new(start, self.input.len()) })
    }

    /// Consume `"..."`, appending its contents. Returns the end offset.
    fn lex_double_quote(&mut self, start: usize, out: &mut String) -> Result<usize, LexerError> {
        self.chars.next();
        while let Some((pos, ch)) = self.chars.next() {
            match ch {
                '"' => return Ok(pos + 1),
                '\\' => match self.peek_char() {
                    Some('\n') => {
                        self.chars.next();
                    }
                    Some(esc @ ('\\' | '"' | '$' | '`')) => {
                        out.push(esc);
                        self.chars.next();
                    }
                    _ => out.push('\\'),
                },
                _ => out.push(ch),
            }
        }
        Err(LexerError::UnterminatedDoubleQuote { span: Span::new(start, self.input.len()) })
    }
}

fn is_separator(ch: char) -> bool {
    matches!(ch, ' ' | '\t' | '\n' | '\r')
}

#[cfg(test)]
#[path = "lexer_tests.rs"]
mod tests;
