use sha2::Digest;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

pub fn display_path(path: &Path, base: Option<&Path>) -> String {
    if let Some(base) = base {
        if let Ok(relative) = path.strip_prefix(base) {
            return relative.display().to_string();
        }
    }
    path.display().to_string()
}

pub fn truncate_string(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut truncated = String::new();
    for ch in text.chars() {
        if truncated.len() + ch.len_utf8() > max_bytes {
            break;
        }
        truncated.push(ch);
    }
    truncated
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = sha2::Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Current epoch time in milliseconds; zero if the clock is before 1970.
pub fn now_epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or_default()
}

/// Format an amount as Brazilian reais, e.g. `R$ 100.000,00`.
pub fn format_brl(amount: f64) -> String {
    let cents = (amount * 100.0).round() as i128;
    let sign = if cents < 0 { "-" } else { "" };
    let cents = cents.abs();
    format!(
        "R$ {sign}{},{:02}",
        group_thousands(cents / 100),
        cents % 100
    )
}

/// Format a metric target: integers with `.` grouping, fractions with two
/// decimals and a `,` separator.
pub fn format_quantity(value: f64) -> String {
    if value.fract() == 0.0 {
        return group_thousands(value as i128);
    }
    let cents = (value * 100.0).round() as i128;
    format!("{},{:02}", group_thousands(cents / 100), (cents % 100).abs())
}

fn group_thousands(value: i128) -> String {
    let digits = value.abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, ch) in digits.chars().enumerate() {
        if index > 0 && (digits.len() - index) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if value < 0 {
        grouped.insert(0, '-');
    }
    grouped
}

/// Lower-case ASCII slug with `_` separators, used in export file names.
pub fn slugify(text: &str) -> String {
    let mut slug = String::new();
    let mut pending_separator = false;
    for ch in text.chars() {
        let ch = fold_accent(ch);
        if ch.is_ascii_alphanumeric() {
            if pending_separator && !slug.is_empty() {
                slug.push('_');
            }
            pending_separator = false;
            slug.push(ch.to_ascii_lowercase());
        } else {
            pending_separator = true;
        }
    }
    if slug.is_empty() {
        slug.push_str("campanha");
    }
    slug
}

fn fold_accent(ch: char) -> char {
    match ch {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'a',
        'é' | 'ê' | 'è' | 'É' | 'Ê' | 'È' => 'e',
        'í' | 'Í' => 'i',
        'ó' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ô' | 'Õ' | 'Ö' => 'o',
        'ú' | 'ü' | 'Ú' | 'Ü' => 'u',
        'ç' | 'Ç' => 'c',
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_brl_groups_thousands() {
        assert_eq!(format_brl(100000.0), "R$ 100.000,00");
        assert_eq!(format_brl(1234.5), "R$ 1.234,50");
        assert_eq!(format_brl(999.0), "R$ 999,00");
    }

    #[test]
    fn format_quantity_handles_fractions() {
        assert_eq!(format_quantity(2500000.0), "2.500.000");
        assert_eq!(format_quantity(2.5), "2,50");
    }

    #[test]
    fn slugify_folds_accents_and_separators() {
        assert_eq!(slugify("Awareness Campaign - Brand X"), "awareness_campaign_brand_x");
        assert_eq!(slugify("Conversão Verão!"), "conversao_verao");
        assert_eq!(slugify("---"), "campanha");
    }

    #[test]
    fn truncate_string_respects_char_boundaries() {
        assert_eq!(truncate_string("ação", 2), "a");
        assert_eq!(truncate_string("abc", 10), "abc");
    }
}
