//! CPF, phone and date rendering helpers shared by every screen-equivalent.
use chrono::NaiveDateTime;
use once_cell::sync::Lazy;
use regex::Regex;

static NAO_DIGITO: Lazy<Regex> = Lazy::new(|| Regex::new(r"\D").expect("valid regex"));
static DATA_BR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4}$").expect("valid regex"));

/// Normalize a CPF to its canonical 11-digit form: strip everything that is
/// not a digit and left-pad with zeros (leading zeros are routinely lost by
/// spreadsheet exports).
pub fn formatar_cpf(cpf: &str) -> String {
    let digitos = NAO_DIGITO.replace_all(cpf, "");
    format!("{:0>11}", digitos)
}

/// Render an 11-digit CPF as `XXX.XXX.XXX-XX`. Anything that does not have
/// exactly 11 digits is returned unchanged.
pub fn mascarar_cpf(cpf: &str) -> String {
    let digitos = NAO_DIGITO.replace_all(cpf, "");
    if digitos.len() != 11 {
        return cpf.to_string();
    }
    format!(
        "{}.{}.{}-{}",
        &digitos[0..3],
        &digitos[3..6],
        &digitos[6..9],
        &digitos[9..11]
    )
}

/// Render a Brazilian phone number: `(DD) NNNNN-NNNN` for mobile (11
/// digits), `(DD) NNNN-NNNN` for landline (10 digits), unchanged otherwise.
/// Missing numbers render as `-`.
pub fn formatar_telefone(telefone: Option<&str>) -> String {
    let Some(telefone) = telefone.filter(|t| !t.trim().is_empty()) else {
        return "-".to_string();
    };
    let digitos = NAO_DIGITO.replace_all(telefone, "");
    match digitos.len() {
        11 => format!("({}) {}-{}", &digitos[0..2], &digitos[2..7], &digitos[7..11]),
        10 => format!("({}) {}-{}", &digitos[0..2], &digitos[2..6], &digitos[6..10]),
        _ => telefone.to_string(),
    }
}

/// Render a timestamp in pt-BR `DD/MM/YYYY HH:MM:SS`. Accepts RFC 3339 and
/// the partner's `YYYY-MM-DD HH:MM:SS`; anything unparseable comes back
/// verbatim so raw partner data is never lost in tables.
pub fn formatar_data_hora(data: &str) -> String {
    if data.trim().is_empty() {
        return "-".to_string();
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(data) {
        return dt.format("%d/%m/%Y %H:%M:%S").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(data, "%Y-%m-%d %H:%M:%S") {
        return dt.format("%d/%m/%Y %H:%M:%S").to_string();
    }
    data.to_string()
}

/// Render a date in pt-BR `DD/MM/YYYY`. Dates already in that shape pass
/// through untouched (the installment schedule sometimes arrives
/// pre-formatted).
pub fn formatar_data(data: &str) -> String {
    if data.trim().is_empty() {
        return String::new();
    }
    if DATA_BR.is_match(data) {
        return data.to_string();
    }
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(data) {
        return dt.format("%d/%m/%Y").to_string();
    }
    if let Ok(d) = chrono::NaiveDate::parse_from_str(data, "%Y-%m-%d") {
        return d.format("%d/%m/%Y").to_string();
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(data, "%Y-%m-%d %H:%M:%S") {
        return dt.format("%d/%m/%Y").to_string();
    }
    data.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpf_remove_pontuacao() {
        assert_eq!(formatar_cpf("123.456.789-00"), "12345678900");
    }

    #[test]
    fn cpf_preenche_zeros() {
        assert_eq!(formatar_cpf("1"), "00000000001");
        assert_eq!(formatar_cpf(""), "00000000000");
    }

    #[test]
    fn cpf_longo_fica_intacto() {
        assert_eq!(formatar_cpf("123456789001"), "123456789001");
    }

    #[test]
    fn mascara_cpf() {
        assert_eq!(mascarar_cpf("12345678900"), "123.456.789-00");
        assert_eq!(mascarar_cpf("123"), "123");
    }

    #[test]
    fn telefone_celular_e_fixo() {
        assert_eq!(formatar_telefone(Some("11987654321")), "(11) 98765-4321");
        assert_eq!(formatar_telefone(Some("1133334444")), "(11) 3333-4444");
        assert_eq!(formatar_telefone(Some("999")), "999");
        assert_eq!(formatar_telefone(None), "-");
        assert_eq!(formatar_telefone(Some("  ")), "-");
    }

    #[test]
    fn data_hora_formatos() {
        assert_eq!(
            formatar_data_hora("2023-11-10 14:30:00"),
            "10/11/2023 14:30:00"
        );
        assert_eq!(
            formatar_data_hora("2023-11-10T14:30:00Z"),
            "10/11/2023 14:30:00"
        );
        assert_eq!(formatar_data_hora("sem data"), "sem data");
        assert_eq!(formatar_data_hora(""), "-");
    }

    #[test]
    fn data_passa_direto_quando_ja_formatada() {
        assert_eq!(formatar_data("10/01/2023"), "10/01/2023");
        assert_eq!(formatar_data("2023-01-10"), "10/01/2023");
    }
}
