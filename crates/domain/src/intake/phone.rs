pub const DEFAULT_DIAL_CODE: &str = "+1";

/// Country dial codes offered by the phone step
pub const DIAL_CODES: &[(&str, &str)] = &[
    ("US", "+1"),
    ("CA", "+1"),
    ("MX", "+52"),
    ("ES", "+34"),
    ("AR", "+54"),
    ("CO", "+57"),
    ("CL", "+56"),
    ("PE", "+51"),
    ("GB", "+44"),
];

pub fn dial_code_for(country: &str) -> Option<&'static str> {
    DIAL_CODES
        .iter()
        .find(|(c, _)| c.eq_ignore_ascii_case(country.trim()))
        .map(|(_, code)| *code)
}

fn strip_separators(s: &str) -> String {
    s.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect()
}

/// Build the destination number from a dial code and the locally typed number.
/// A local number that already carries `+` is taken as complete.
pub fn compose_phone(dial_code: &str, local_number: &str) -> Option<String> {
    let local = strip_separators(local_number);
    if local.is_empty() {
        return None;
    }
    if local.starts_with('+') {
        return Some(local);
    }

    let code: String = dial_code.chars().filter(char::is_ascii_digit).collect();
    Some(format!("+{code}{local}"))
}
