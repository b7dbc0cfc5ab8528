// CPF / CNPJ: só checamos presença e formato básico; o gateway faz a validação completa.

pub fn digits(tax_id: &str) -> String {
    tax_id.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// True when `tax_id` looks like a real CPF (11 digits) or CNPJ (14 digits).
///
/// Empty values and placeholders such as `000.000.000-00` or
/// `111.111.111-11` are rejected. Check digits are not verified.
pub fn is_usable(tax_id: &str) -> bool {
    let digits = digits(tax_id);
    if digits.len() != 11 && digits.len() != 14 {
        return false;
    }

    let first = digits.as_bytes()[0];
    !digits.bytes().all(|b| b == first)
}
