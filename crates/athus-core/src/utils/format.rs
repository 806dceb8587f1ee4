fn digits(value: &str) -> impl Iterator<Item = char> + '_ {
    value.chars().filter(|c| c.is_ascii_digit())
}

/// Mask a CPF as the user types: `000.000.000-00`
pub fn mask_cpf(value: &str) -> String {
    let mut out = String::with_capacity(14);
    for (i, c) in digits(value).take(11).enumerate() {
        match i {
            3 | 6 => out.push('.'),
            9 => out.push('-'),
            _ => {}
        }
        out.push(c);
    }
    out
}

/// Mask a CEP as the user types: `00000-000`
pub fn mask_cep(value: &str) -> String {
    let mut out = String::with_capacity(9);
    for (i, c) in digits(value).take(8).enumerate() {
        if i == 5 {
            out.push('-');
        }
        out.push(c);
    }
    out
}

/// Mask a mobile phone as the user types: `(00) 9 0000-0000`
pub fn mask_phone(value: &str) -> String {
    let mut out = String::with_capacity(16);
    for (i, c) in digits(value).take(11).enumerate() {
        match i {
            0 => out.push('('),
            2 => out.push_str(") "),
            3 => out.push(' '),
            7 => out.push('-'),
            _ => {}
        }
        out.push(c);
    }
    out
}

/// Truncate a string to a maximum length, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Lowercase and strip Portuguese diacritics for search comparisons
pub fn normalize_for_search(s: &str) -> String {
    s.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
            'é' | 'è' | 'ê' | 'ë' => 'e',
            'í' | 'ì' | 'î' | 'ï' => 'i',
            'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
            'ú' | 'ù' | 'û' | 'ü' => 'u',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

/// Case- and accent-insensitive substring match
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    normalize_for_search(haystack).contains(&normalize_for_search(needle))
}
