// Utilitários para manipulação de valores monetários (BRL, em centavos)

use crate::services::error::PixError;

/// Largest amount a ledger transaction (signed centavos) can carry.
pub const MAX_AMOUNT_CENTS: u64 = i64::MAX as u64;

/// Converts a decimal reais amount (as sent by the client) into centavos.
///
/// Rounds to the nearest centavo. Rejects non-finite, zero and negative
/// amounts, amounts that round down to zero centavos, and amounts above
/// [`MAX_AMOUNT_CENTS`].
pub fn reais_to_centavos(amount: f64) -> Result<u64, PixError> {
    if !amount.is_finite() || amount <= 0.0 {
        return Err(PixError::Validation(
            "amount must be greater than zero".to_string(),
        ));
    }

    let cents = (amount * 100.0).round();
    if cents < 1.0 {
        return Err(PixError::Validation(
            "amount must be greater than zero".to_string(),
        ));
    }
    // i64::MAX não é representável em f64: compara com o primeiro valor acima
    if cents >= MAX_AMOUNT_CENTS as f64 {
        return Err(PixError::Validation("amount out of range".to_string()));
    }

    Ok(cents as u64)
}

/// Checks that a centavo amount fits a signed ledger transaction.
pub fn signed_centavos(cents: u64) -> Result<i64, PixError> {
    i64::try_from(cents).map_err(|_| PixError::Validation("amount out of range".to_string()))
}

pub fn centavos_to_reais(cents: u64) -> f64 {
    cents as f64 / 100.0
}

pub fn signed_centavos_to_reais(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Formata no padrão brasileiro: `R$ 1.234,56`.
pub fn format_brl(cents: u64) -> String {
    let reais = cents / 100;
    let centavos = cents % 100;

    let digits = reais.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    format!("R$ {},{:02}", grouped, centavos)
}
