/*
** This file is a part of Ikstream (XMPP stream core)
** Copyright (C) 2000-2025 Gurer Ozen
**
** Ikstream is free software: you can redistribute it and/or modify it
** under the terms of the GNU Lesser General Public License as
** published by the Free Software Foundation, either version 3 of
** the License, or (at your option) any later version.
*/

pub mod predefined {
    pub const LT: &str = "&lt;";
    pub const GT: &str = "&gt;";
    pub const AMP: &str = "&amp;";
    pub const APOS: &str = "&apos;";
    pub const QUOT: &str = "&quot;";
}

pub fn escaped_size(s: &str) -> usize {
    let mut size = 0;
    for c in s.chars() {
        match c {
            '<' => size += predefined::LT.len(),
            '>' => size += predefined::GT.len(),
            '&' => size += predefined::AMP.len(),
            '\'' => size += predefined::APOS.len(),
            '"' => size += predefined::QUOT.len(),
            _ => size += c.len_utf8(),
        }
    }

    size
}

/// Appends the string to the buffer with the predefined XML entities
/// substituted. Safe for both character data and quoted attribute values.
pub fn escape(s: &str, buf: &mut String) {
    let mut last = 0;
    for (pos, c) in s.char_indices() {
        let entity = match c {
            '<' => predefined::LT,
            '>' => predefined::GT,
            '&' => predefined::AMP,
            '\'' => predefined::APOS,
            '"' => predefined::QUOT,
            _ => continue,
        };
        buf.push_str(&s[last..pos]);
        buf.push_str(entity);
        last = pos + 1;
    }
    buf.push_str(&s[last..]);
}

pub fn escaped(s: &str) -> String {
    let mut buf = String::with_capacity(escaped_size(s));
    escape(s, &mut buf);
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_size() {
        const NOESCAPE: &str = "abc$#@!%^*(){}[]=-+/.,;:FDSF3443";
        assert_eq!(escaped_size(NOESCAPE), NOESCAPE.len());
        assert_eq!(escaped_size("abc&def"), "abc&amp;def".len());
        assert_eq!(escaped_size("<>&'\""), "&lt;&gt;&amp;&apos;&quot;".len());
        assert_eq!(escaped_size("şç<"), "şç&lt;".len());
    }

    #[test]
    fn escape_text() {
        assert_eq!(escaped("plain"), "plain");
        assert_eq!(escaped("a<b>&'c\""), "a&lt;b&gt;&amp;&apos;c&quot;");
        assert_eq!(escaped("ğüş & ö"), "ğüş &amp; ö");
        assert_eq!(escaped(""), "");
    }
}
