/// Check a CPF number (masked or bare digits).
///
/// Requires 11 digits, not all identical, with both check digits correct.
pub fn is_valid_cpf(cpf: &str) -> bool {
    let digits: Vec<u32> = cpf.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() != 11 || digits.iter().all(|&d| d == digits[0]) {
        return false;
    }

    check_digit(&digits[..9]) == digits[9] && check_digit(&digits[..10]) == digits[10]
}

/// Weighted sum from `len + 1` down to 2, then `(sum * 10) % 11` with 10 -> 0
fn check_digit(digits: &[u32]) -> u32 {
    let top = digits.len() as u32 + 1;
    let sum: u32 = digits
        .iter()
        .enumerate()
        .map(|(i, d)| d * (top - i as u32))
        .sum();
    match (sum * 10) % 11 {
        10 => 0,
        d => d,
    }
}
