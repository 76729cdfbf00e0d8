use std::borrow::Cow;
use std::iter::Peekable;
use std::str::Chars;

use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

const ELLIPSIS: &str = "...";

/// Shortens `s` to at most `max_width` display columns, ending in `...`.
///
/// Width is Unicode-aware (CJK and emoji take two columns). Chat clients
/// render alert titles on one line, so attachments stay bounded. Text that
/// already fits is returned borrowed. Widths are expected to be larger than
/// the ellipsis; smaller ones still return the ellipsis alone.
///
/// # Examples
///
/// ```
/// use feedwatch::util::truncate_to_width;
///
/// assert_eq!(truncate_to_width("Short", 10), "Short");
/// assert_eq!(truncate_to_width("Hello World", 8), "Hello...");
/// ```
pub fn truncate_to_width(s: &str, max_width: usize) -> Cow<'_, str> {
    if s.width() <= max_width {
        return Cow::Borrowed(s);
    }

    let budget = max_width.saturating_sub(ELLIPSIS.len());
    let mut used = 0;
    let mut end = 0;
    for (idx, c) in s.char_indices() {
        let w = c.width().unwrap_or(0);
        if used + w > budget {
            break;
        }
        used += w;
        end = idx + c.len_utf8();
    }

    Cow::Owned(format!("{}{}", &s[..end], ELLIPSIS))
}

/// Removes control characters and ANSI escape sequences from feed text.
///
/// Titles are forwarded verbatim into webhook messages, where raw control
/// characters break some chat renderers. Tab, newline and carriage return
/// are kept. CSI (`ESC [ ... final`) and OSC (`ESC ] ... BEL|ST`) sequences
/// are dropped whole; a lone ESC is dropped by itself.
pub fn strip_control_chars(s: &str) -> Cow<'_, str> {
    if !s.chars().any(is_stripped) {
        return Cow::Borrowed(s);
    }

    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\x1b' => skip_escape(&mut chars),
            c if is_stripped(c) => {}
            c => out.push(c),
        }
    }

    Cow::Owned(out)
}

/// Consumes the body of an escape sequence whose ESC was just read.
fn skip_escape(chars: &mut Peekable<Chars<'_>>) {
    match chars.peek() {
        Some('[') => {
            chars.next();
            for c in chars.by_ref() {
                if ('\x40'..='\x7e').contains(&c) {
                    break;
                }
            }
        }
        Some(']') => {
            chars.next();
            while let Some(c) = chars.next() {
                if c == '\x07' {
                    break;
                }
                if c == '\x1b' && chars.peek() == Some(&'\\') {
                    chars.next();
                    break;
                }
            }
        }
        _ => {}
    }
}

fn is_stripped(c: char) -> bool {
    c.is_control() && !matches!(c, '\t' | '\n' | '\r')
}
