//! Go string literal quoting and unquoting.

/// Quote `s` as a double-quoted Go string literal.
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\x07' => out.push_str("\\a"),
            '\x08' => out.push_str("\\b"),
            '\x0c' => out.push_str("\\f"),
            '\x0b' => out.push_str("\\v"),
            c if (c as u32) < 0x20 || c == '\x7f' => {
                out.push_str(&format!("\\x{:02x}", c as u32));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Decode a Go string or rune literal. Returns `None` for malformed input.
pub fn unquote(lit: &str) -> Option<String> {
    let first = lit.chars().next()?;
    let last = lit.chars().last()?;
    if lit.len() < 2 || first != last {
        return None;
    }
    let body = &lit[1..lit.len() - 1];
    match first {
        '`' => {
            if body.contains('`') {
                return None;
            }
            Some(body.replace('\r', ""))
        }
        '"' => unescape(body, '"'),
        '\'' => {
            let s = unescape(body, '\'')?;
            (s.chars().count() == 1).then_some(s)
        }
        _ => None,
    }
}

/// Decode a literal, or just strip surrounding double quotes when it does not parse.
pub fn unquote_or_trim(lit: &str) -> String {
    unquote(lit).unwrap_or_else(|| lit.trim_matches('"').to_string())
}

fn unescape(body: &str, delim: char) -> Option<String> {
    let mut out = String::with_capacity(body.len());
    let mut bytes: Vec<u8> = Vec::new();
    let mut chars = body.chars().peekable();

    while let Some(c) = chars.next() {
        if c == delim || c == '\n' {
            return None;
        }
        if c != '\\' {
            flush_bytes(&mut bytes, &mut out);
            out.push(c);
            continue;
        }
        let esc = chars.next()?;
        match esc {
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\x0b'),
            '\\' => out.push('\\'),
            '"' | '\'' if esc == delim => out.push(esc),
            'x' => {
                bytes.push(u8::try_from(read_radix(&mut chars, 2, 16)?).ok()?);
                continue;
            }
            '0'..='7' => {
                let rest = read_radix(&mut chars, 2, 8)?;
                let v = (esc as u32 - '0' as u32) * 64 + rest;
                bytes.push(u8::try_from(v).ok()?);
                continue;
            }
            'u' => out.push(char::from_u32(read_radix(&mut chars, 4, 16)?)?),
            'U' => out.push(char::from_u32(read_radix(&mut chars, 8, 16)?)?),
            _ => return None,
        }
        flush_bytes(&mut bytes, &mut out);
    }
    flush_bytes(&mut bytes, &mut out);
    Some(out)
}

fn read_radix(chars: &mut std::iter::Peekable<std::str::Chars<'_>>, n: usize, radix: u32) -> Option<u32> {
    let mut v = 0u32;
    for _ in 0..n {
        v = v * radix + chars.next()?.to_digit(radix)?;
    }
    Some(v)
}

/// Byte escapes may form multi-byte UTF-8 sequences; decode them lossily.
fn flush_bytes(bytes: &mut Vec<u8>, out: &mut String) {
    if !bytes.is_empty() {
        out.push_str(&String::from_utf8_lossy(bytes));
        bytes.clear();
    }
}
